// Copyright 2025 the Tiledraw Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Packed colors and sRGB transfer functions.

use bytemuck::{Pod, Zeroable};

/// A packed 32-bit color in sRGB space.
///
/// The red channel occupies the least significant byte, alpha the most
/// significant one. This is the wire format of every color crossing the API;
/// conversion to linear space happens on the GPU where blending requires it.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Pod, Zeroable)]
#[repr(transparent)]
pub struct Color(pub u32);

impl Color {
    pub const TRANSPARENT: Self = Self(0);
    pub const BLACK: Self = Self(0xff00_0000);
    pub const WHITE: Self = Self(0xffff_ffff);

    pub const fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self((a as u32) << 24 | (b as u32) << 16 | (g as u32) << 8 | r as u32)
    }

    pub const fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::from_rgba8(r, g, b, 0xff)
    }

    pub const fn r(self) -> u8 {
        self.0 as u8
    }

    pub const fn g(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn b(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub const fn a(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Unpacks into `[r, g, b, a]` with each channel in `0.0..=1.0`, still in
    /// sRGB space.
    pub fn to_f32(self) -> [f32; 4] {
        [
            self.r() as f32 / 255.0,
            self.g() as f32 / 255.0,
            self.b() as f32 / 255.0,
            self.a() as f32 / 255.0,
        ]
    }
}

/// The standard sRGB decoding function for one channel.
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// The standard sRGB encoding function for one channel.
pub fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packing_round_trip() {
        let c = Color::from_rgba8(0x12, 0x34, 0x56, 0x78);
        assert_eq!(c.r(), 0x12);
        assert_eq!(c.g(), 0x34);
        assert_eq!(c.b(), 0x56);
        assert_eq!(c.a(), 0x78);
        assert_eq!(c.0, 0x7856_3412);
    }

    #[test]
    fn transfer_round_trip() {
        // Within two 8-bit steps over the full range.
        for i in 0..=255u32 {
            let c = i as f32 / 255.0;
            let back = linear_to_srgb(srgb_to_linear(c));
            assert!(
                (c - back).abs() < 2.0 / 255.0,
                "channel {c} came back as {back}"
            );
        }
    }

    #[test]
    fn transfer_endpoints() {
        assert_eq!(srgb_to_linear(0.0), 0.0);
        assert!((srgb_to_linear(1.0) - 1.0).abs() < 1e-6);
        assert_eq!(linear_to_srgb(0.0), 0.0);
        assert!((linear_to_srgb(1.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn opaque_helpers() {
        assert_eq!(Color::from_rgb8(1, 2, 3).a(), 0xff);
        assert_eq!(Color::WHITE.to_f32(), [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(Color::TRANSPARENT.a(), 0);
    }
}
