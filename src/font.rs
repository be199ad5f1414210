// Copyright 2025 the Tiledraw Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pre-baked font atlas parsing.
//!
//! The renderer does not rasterize glyphs; it consumes a blob produced by an
//! offline baking tool. The blob is a packed alphabet record (glyph metrics
//! and atlas dimensions) immediately followed by the BC4-compressed
//! single-channel atlas at 8 bytes per 4x4 block.

use bytemuck::{Pod, Zeroable};

use crate::encoding::MAX_GLYPHS;
use crate::Error;

/// Code of the first baked glyph (`'!'`).
pub const FIRST_GLYPH: u16 = 33;

/// Fraction of the underscore advance used for characters outside the baked
/// range.
const FALLBACK_ADVANCE: f32 = 0.65;

/// Metrics of a single baked glyph. Coordinates address the atlas in texels.
#[derive(Clone, Copy, Default, Debug, Pod, Zeroable)]
#[repr(C)]
pub struct GlyphRecord {
    pub x0: u16,
    pub y0: u16,
    pub x1: u16,
    pub y1: u16,
    pub bearing_x: f32,
    pub bearing_y: f32,
    pub advance_x: f32,
}

impl GlyphRecord {
    pub fn width(&self) -> f32 {
        (self.x1 - self.x0) as f32
    }

    pub fn height(&self) -> f32 {
        (self.y1 - self.y0) as f32
    }
}

/// The packed header at the front of a font blob.
#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct AlphabetHeader {
    glyphs: [GlyphRecord; MAX_GLYPHS],
    font_height: f32,
    num_glyphs: u16,
    first_glyph: u16,
    texture_width: u16,
    texture_height: u16,
}

/// Glyph record uploaded to the GPU alongside the atlas texture.
#[derive(Clone, Copy, Default, Debug, Pod, Zeroable)]
#[repr(C)]
pub struct FontChar {
    pub uv_topleft: [f32; 2],
    pub uv_bottomright: [f32; 2],
    pub width: f32,
    pub height: f32,
}

/// A parsed font atlas: glyph metrics plus the BC4 texture payload.
pub struct Alphabet {
    header: AlphabetHeader,
    atlas: Vec<u8>,
}

impl Alphabet {
    /// Parses a baked font blob, validating the header against the atlas
    /// payload that follows it.
    pub fn from_blob(blob: &[u8]) -> Result<Self, Error> {
        let header_size = std::mem::size_of::<AlphabetHeader>();
        if blob.len() < header_size {
            return Err(Error::InvalidFontData("blob is shorter than the alphabet header"));
        }
        let header: AlphabetHeader = bytemuck::pod_read_unaligned(&blob[..header_size]);
        if header.num_glyphs as usize > MAX_GLYPHS {
            return Err(Error::InvalidFontData("glyph count exceeds the table capacity"));
        }
        if header.first_glyph != FIRST_GLYPH {
            return Err(Error::InvalidFontData("first glyph code must be 33"));
        }
        let (w, h) = (header.texture_width as usize, header.texture_height as usize);
        if w == 0 || h == 0 || w % 4 != 0 || h % 4 != 0 {
            return Err(Error::InvalidFontData("atlas dimensions must be non-zero multiples of 4"));
        }
        let atlas_size = (w / 4) * (h / 4) * 8;
        if blob.len() < header_size + atlas_size {
            return Err(Error::InvalidFontData("blob is shorter than the declared atlas"));
        }
        Ok(Self {
            header,
            atlas: blob[header_size..header_size + atlas_size].to_vec(),
        })
    }

    pub fn font_height(&self) -> f32 {
        self.header.font_height
    }

    pub fn texture_width(&self) -> u32 {
        self.header.texture_width as u32
    }

    pub fn texture_height(&self) -> u32 {
        self.header.texture_height as u32
    }

    /// BC4 atlas payload, `(width / 4) * 8` bytes per block row.
    pub fn atlas_data(&self) -> &[u8] {
        &self.atlas
    }

    /// Index of `c` in the glyph table, or `None` when it was not baked.
    pub fn glyph_index(&self, c: char) -> Option<usize> {
        let code = u32::from(c);
        let first = self.header.first_glyph as u32;
        if code < first {
            return None;
        }
        let index = (code - first) as usize;
        (index < self.header.num_glyphs as usize).then_some(index)
    }

    pub fn glyph(&self, index: usize) -> &GlyphRecord {
        &self.header.glyphs[index]
    }

    /// Horizontal advance for `c`, falling back to 65% of the underscore
    /// advance for characters outside the baked range.
    pub fn advance(&self, c: char) -> f32 {
        match self.glyph_index(c) {
            Some(index) => self.header.glyphs[index].advance_x,
            None => self.fallback_advance(),
        }
    }

    pub fn fallback_advance(&self) -> f32 {
        let underscore = ('_' as usize) - self.header.first_glyph as usize;
        self.header.glyphs[underscore].advance_x * FALLBACK_ADVANCE
    }

    pub fn text_width(&self, text: &str) -> f32 {
        text.chars().map(|c| self.advance(c)).sum()
    }

    /// Builds the GPU glyph table with atlas coordinates normalized to UVs.
    pub fn glyph_table(&self) -> Vec<FontChar> {
        let w = self.header.texture_width as f32;
        let h = self.header.texture_height as f32;
        let mut table = vec![FontChar::default(); MAX_GLYPHS];
        for (slot, glyph) in table
            .iter_mut()
            .zip(&self.header.glyphs[..self.header.num_glyphs as usize])
        {
            *slot = FontChar {
                uv_topleft: [glyph.x0 as f32 / w, glyph.y0 as f32 / h],
                uv_bottomright: [glyph.x1 as f32 / w, glyph.y1 as f32 / h],
                width: glyph.width(),
                height: glyph.height(),
            };
        }
        table
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Builds a minimal valid blob: 8x8 atlas, glyphs with advance 10 for the
    /// printable ASCII range.
    pub(crate) fn synthetic_blob() -> Vec<u8> {
        let mut header = AlphabetHeader {
            glyphs: [GlyphRecord::default(); MAX_GLYPHS],
            font_height: 16.0,
            num_glyphs: 94,
            first_glyph: FIRST_GLYPH,
            texture_width: 8,
            texture_height: 8,
        };
        for (i, glyph) in header.glyphs[..94].iter_mut().enumerate() {
            *glyph = GlyphRecord {
                x0: 0,
                y0: 0,
                x1: 4,
                y1: 8,
                bearing_x: 1.0,
                bearing_y: -12.0,
                advance_x: 10.0 + (i % 3) as f32,
            };
        }
        let mut blob = bytemuck::bytes_of(&header).to_vec();
        blob.extend_from_slice(&[0u8; 2 * 2 * 8]);
        blob
    }

    pub(crate) fn synthetic_alphabet() -> Alphabet {
        Alphabet::from_blob(&synthetic_blob()).unwrap()
    }

    #[test]
    fn header_layout() {
        assert_eq!(std::mem::size_of::<GlyphRecord>(), 20);
        assert_eq!(std::mem::size_of::<AlphabetHeader>(), 20 * MAX_GLYPHS + 12);
        assert_eq!(std::mem::size_of::<FontChar>(), 24);
    }

    #[test]
    fn parses_synthetic_blob() {
        let alphabet = synthetic_alphabet();
        assert_eq!(alphabet.font_height(), 16.0);
        assert_eq!(alphabet.texture_width(), 8);
        assert_eq!(alphabet.atlas_data().len(), 32);
    }

    #[test]
    fn rejects_truncated_blob() {
        let blob = synthetic_blob();
        assert!(Alphabet::from_blob(&blob[..100]).is_err());
        assert!(Alphabet::from_blob(&blob[..blob.len() - 1]).is_err());
    }

    #[test]
    fn glyph_range() {
        let alphabet = synthetic_alphabet();
        assert_eq!(alphabet.glyph_index('!'), Some(0));
        assert_eq!(alphabet.glyph_index('"'), Some(1));
        assert_eq!(alphabet.glyph_index(' '), None);
        assert_eq!(alphabet.glyph_index('\u{20ac}'), None);
    }

    #[test]
    fn unknown_chars_use_fallback_advance() {
        let alphabet = synthetic_alphabet();
        let underscore = alphabet.advance('_');
        let fallback = alphabet.advance(' ');
        assert!((fallback - underscore * 0.65).abs() < 1e-5);
        let expected = alphabet.advance('a') + fallback + alphabet.advance('b');
        assert!((alphabet.text_width("a b") - expected).abs() < 1e-5);
    }

    #[test]
    fn glyph_table_normalizes_uvs() {
        let alphabet = synthetic_alphabet();
        let table = alphabet.glyph_table();
        assert_eq!(table.len(), MAX_GLYPHS);
        assert_eq!(table[0].uv_bottomright, [0.5, 1.0]);
        assert_eq!(table[0].width, 4.0);
        assert_eq!(table[0].height, 8.0);
    }
}
