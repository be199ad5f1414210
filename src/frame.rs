// Copyright 2025 the Tiledraw Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The immediate-mode command front end.
//!
//! A [`Frame`] collects one frame's worth of drawing calls into parallel
//! append-only arrays: fixed-width command headers, primary colors, quantized
//! bounding boxes and a variable-length float payload, plus a small deduped
//! clip-shape table. Every draw call is a total function: when any of the
//! bounded arrays is full the primitive is dropped with a log message and the
//! arrays stay consistent.

use std::sync::Arc;

use crate::color::Color;
use crate::encoding::{
    payload_size, ClipShape, CommandType, DrawCommand, FillMode, GroupOp, QuantizedAabb,
    MAX_CLIPS, MAX_COMMANDS, MAX_DRAWDATA,
};
use crate::font::Alphabet;
use crate::math::{Aabb, Vec2};

/// Primitives closer to degenerate than this are dropped before encoding.
const HALF_PIXEL: f32 = 0.5;
/// Width of the anti-aliasing ramp, in pixels.
const AA_WIDTH: f32 = std::f32::consts::SQRT_2;

/// Texture coordinates of a quad's top-left and bottom-right corners.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct QuadUv {
    pub u0: f32,
    pub v0: f32,
    pub u1: f32,
    pub v1: f32,
}

impl QuadUv {
    pub const FULL: Self = Self {
        u0: 0.0,
        v0: 0.0,
        u1: 1.0,
        v1: 1.0,
    };
}

#[derive(Clone, Copy)]
struct GroupScope {
    aabb_slot: usize,
    smoothness: f32,
    outline_width: f32,
    op: GroupOp,
}

/// One frame of encoded drawing commands.
pub struct Frame {
    alphabet: Arc<Alphabet>,
    num_slices: u32,
    width: f32,
    height: f32,
    aa_width: f32,
    commands: Vec<DrawCommand>,
    colors: Vec<Color>,
    aabbs: Vec<QuantizedAabb>,
    draw_data: Vec<f32>,
    clips: Vec<ClipShape>,
    group: Option<GroupScope>,
}

impl Frame {
    pub fn new(alphabet: Arc<Alphabet>, num_slices: u32) -> Self {
        Self {
            alphabet,
            num_slices,
            width: 0.0,
            height: 0.0,
            aa_width: AA_WIDTH,
            commands: Vec::new(),
            colors: Vec::new(),
            aabbs: Vec::new(),
            draw_data: Vec::new(),
            clips: Vec::new(),
            group: None,
        }
    }

    /// Resets the frame for a new round of recording and installs the
    /// full-viewport clip.
    pub fn begin(&mut self, width: u32, height: u32) {
        if self.group.is_some() {
            log::error!("frame restarted with an open group; did you forget end_group?");
            debug_assert!(self.group.is_none(), "open group across frames");
            self.group = None;
        }
        self.width = width as f32;
        self.height = height as f32;
        self.commands.clear();
        self.colors.clear();
        self.aabbs.clear();
        self.draw_data.clear();
        self.clips.clear();
        self.set_cliprect(0.0, 0.0, self.width, self.height);
    }

    pub fn num_commands(&self) -> u32 {
        self.commands.len() as u32
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn aabbs(&self) -> &[QuantizedAabb] {
        &self.aabbs
    }

    pub fn draw_data(&self) -> &[f32] {
        &self.draw_data
    }

    pub fn clips(&self) -> &[ClipShape] {
        &self.clips
    }

    pub fn has_open_group(&self) -> bool {
        self.group.is_some()
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    /// Margin added around a primitive's bounds so anti-aliasing, outlines
    /// and smooth blending never read outside its binned tiles.
    fn bump(&self) -> f32 {
        let mut bump = self.aa_width;
        if let Some(group) = &self.group {
            bump += group.outline_width;
            if group.op == GroupOp::Blend {
                bump += group.smoothness;
            }
        }
        bump
    }

    fn last_clip_index(&self) -> u8 {
        (self.clips.len() - 1) as u8
    }

    /// Appends one primitive across all four parallel arrays, or none of
    /// them. Returns false when capacity ran out.
    fn append(
        &mut self,
        kind: CommandType,
        fillmode: FillMode,
        extra: u8,
        color: Color,
        payload: &[f32],
        bounds: Aabb,
    ) -> bool {
        debug_assert_eq!(payload.len(), payload_size(kind, fillmode));
        if self.commands.len() >= MAX_COMMANDS
            || self.draw_data.len() + payload.len() > MAX_DRAWDATA
        {
            log::warn!("out of draw command or payload space, dropping primitive");
            return false;
        }
        self.commands.push(DrawCommand::new(
            kind,
            fillmode,
            extra,
            self.last_clip_index(),
            self.draw_data.len() as u32,
        ));
        self.colors.push(color);
        self.draw_data.extend_from_slice(payload);
        let quantized = QuantizedAabb::from_pixels(bounds);
        self.aabbs.push(quantized);
        if let Some(group) = &self.group {
            self.aabbs[group.aabb_slot].merge(&quantized);
        }
        true
    }

    // ------------------------------------------------------------------
    // Clips
    // ------------------------------------------------------------------

    /// Installs a rectangular clip for subsequent commands. Identical
    /// consecutive clips do not grow the table.
    pub fn set_cliprect(&mut self, min_x: f32, min_y: f32, max_x: f32, max_y: f32) {
        self.push_clip(ClipShape::rect(min_x, min_y, max_x, max_y));
    }

    /// Installs a disc clip for subsequent commands.
    pub fn set_clipdisc(&mut self, cx: f32, cy: f32, radius: f32) {
        self.push_clip(ClipShape::disc(cx, cy, radius));
    }

    fn push_clip(&mut self, clip: ClipShape) {
        if self.clips.last() == Some(&clip) {
            return;
        }
        if self.clips.len() >= MAX_CLIPS {
            log::warn!("too many clip shapes, maximum is {MAX_CLIPS}");
            return;
        }
        self.clips.push(clip);
    }

    // ------------------------------------------------------------------
    // Groups
    // ------------------------------------------------------------------

    /// Opens a group: subsequent primitives are composed with a shared
    /// operator and rendered as one shape. Only one group may be open.
    pub fn begin_group(&mut self, smooth_blend: bool, smoothness: f32, outline_width: f32) {
        if self.group.is_some() {
            log::error!("begin_group while a group is already open");
            debug_assert!(false, "nested groups are not supported");
            return;
        }
        debug_assert!(smoothness >= 0.0, "smoothness cannot be negative");
        let smoothness = if smooth_blend { smoothness.max(0.0) } else { 0.0 };
        let op = if smooth_blend {
            GroupOp::Blend
        } else {
            GroupOp::Overwrite
        };
        if self.commands.len() >= MAX_COMMANDS || self.draw_data.len() + 2 > MAX_DRAWDATA {
            log::warn!("out of draw command or payload space, dropping group");
            return;
        }
        self.commands.push(DrawCommand::new(
            CommandType::BeginGroup,
            FillMode::Solid,
            op as u8,
            self.last_clip_index(),
            self.draw_data.len() as u32,
        ));
        self.colors.push(Color::TRANSPARENT);
        self.draw_data
            .extend_from_slice(&[smoothness + outline_width, outline_width]);
        // The marker's box doubles as the group accumulator; children merge
        // their extents into it.
        self.aabbs.push(QuantizedAabb::invalid());
        self.group = Some(GroupScope {
            aabb_slot: self.aabbs.len() - 1,
            smoothness,
            outline_width,
            op,
        });
    }

    /// Closes the open group. The marker carries the merged child bounds and
    /// the outline color.
    pub fn end_group(&mut self, outline_color: Color) {
        let Some(scope) = self.group else {
            log::error!("end_group without a matching begin_group");
            debug_assert!(false, "unbalanced end_group");
            return;
        };
        if self.commands.len() >= MAX_COMMANDS || self.draw_data.len() + 1 > MAX_DRAWDATA {
            log::warn!("out of draw command or payload space, dropping group");
            return;
        }
        let fillmode = if scope.outline_width > 0.0 {
            FillMode::Outline
        } else {
            FillMode::Solid
        };
        self.commands.push(DrawCommand::new(
            CommandType::EndGroup,
            fillmode,
            scope.op as u8,
            self.last_clip_index(),
            self.draw_data.len() as u32,
        ));
        self.colors.push(outline_color);
        // The list is traversed in reverse on the GPU, so the end marker
        // repeats the smoothing radius.
        self.draw_data
            .push(scope.smoothness + scope.outline_width);
        self.aabbs.push(self.aabbs[scope.aabb_slot]);
        self.group = None;
    }

    // ------------------------------------------------------------------
    // Discs
    // ------------------------------------------------------------------

    fn disc_inner(
        &mut self,
        center: Vec2,
        radius: f32,
        thickness: f32,
        fillmode: FillMode,
        primary: Color,
        secondary: Color,
    ) {
        let thickness = thickness * 0.5;
        let mut max_radius = radius + self.bump();
        let mut payload = [center.x, center.y, radius, 0.0];
        let len = match fillmode {
            FillMode::Hollow => {
                max_radius += thickness;
                payload[3] = thickness;
                4
            }
            FillMode::Gradient => {
                payload[3] = f32::from_bits(secondary.0);
                4
            }
            _ => 3,
        };
        self.append(
            CommandType::Disc,
            fillmode,
            0,
            primary,
            &payload[..len],
            Aabb::from_circle(center, max_radius),
        );
    }

    pub fn draw_disc(&mut self, cx: f32, cy: f32, radius: f32, color: Color) {
        self.disc_inner(
            Vec2::new(cx, cy),
            radius,
            0.0,
            FillMode::Solid,
            color,
            Color::TRANSPARENT,
        );
    }

    pub fn draw_ring(&mut self, cx: f32, cy: f32, radius: f32, thickness: f32, color: Color) {
        self.disc_inner(
            Vec2::new(cx, cy),
            radius,
            thickness,
            FillMode::Hollow,
            color,
            Color::TRANSPARENT,
        );
    }

    /// Disc graded radially from `inner_color` at the center to `outer_color`
    /// at the rim.
    pub fn draw_disc_gradient(
        &mut self,
        cx: f32,
        cy: f32,
        radius: f32,
        outer_color: Color,
        inner_color: Color,
    ) {
        self.disc_inner(
            Vec2::new(cx, cy),
            radius,
            0.0,
            FillMode::Gradient,
            outer_color,
            inner_color,
        );
    }

    // ------------------------------------------------------------------
    // Oriented boxes, lines, capsules
    // ------------------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    fn oriented_box_inner(
        &mut self,
        p0: Vec2,
        p1: Vec2,
        width: f32,
        roundness: f32,
        thickness: f32,
        fillmode: FillMode,
        primary: Color,
        secondary: Color,
    ) {
        if p0.similar(p1, HALF_PIXEL) {
            return;
        }
        let thickness = thickness * 0.5;
        let round_or_thick = if fillmode == FillMode::Hollow {
            thickness
        } else {
            roundness
        };
        let bounds = Aabb::from_rounded_obb(p0, p1, width, round_or_thick + self.bump());
        let mut payload = [p0.x, p0.y, p1.x, p1.y, width, round_or_thick, 0.0];
        let len = if fillmode == FillMode::Gradient {
            payload[6] = f32::from_bits(secondary.0);
            7
        } else {
            6
        };
        self.append(
            CommandType::OrientedBox,
            fillmode,
            0,
            primary,
            &payload[..len],
            bounds,
        );
    }

    pub fn draw_oriented_box(
        &mut self,
        ax: f32,
        ay: f32,
        bx: f32,
        by: f32,
        width: f32,
        roundness: f32,
        color: Color,
    ) {
        self.oriented_box_inner(
            Vec2::new(ax, ay),
            Vec2::new(bx, by),
            width,
            roundness,
            0.0,
            FillMode::Solid,
            color,
            Color::TRANSPARENT,
        );
    }

    /// Hollow oriented rectangle; `thickness` is the full wall width.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_oriented_rect(
        &mut self,
        ax: f32,
        ay: f32,
        bx: f32,
        by: f32,
        width: f32,
        thickness: f32,
        color: Color,
    ) {
        self.oriented_box_inner(
            Vec2::new(ax, ay),
            Vec2::new(bx, by),
            width,
            0.0,
            thickness,
            FillMode::Hollow,
            color,
            Color::TRANSPARENT,
        );
    }

    pub fn draw_line(&mut self, ax: f32, ay: f32, bx: f32, by: f32, width: f32, color: Color) {
        self.oriented_box_inner(
            Vec2::new(ax, ay),
            Vec2::new(bx, by),
            width,
            0.0,
            0.0,
            FillMode::Solid,
            color,
            Color::TRANSPARENT,
        );
    }

    /// A capsule is an oriented box of zero width whose roundness is the
    /// capsule radius; the fragment stage picks the cheaper segment distance.
    pub fn draw_capsule(&mut self, ax: f32, ay: f32, bx: f32, by: f32, radius: f32, color: Color) {
        self.oriented_box_inner(
            Vec2::new(ax, ay),
            Vec2::new(bx, by),
            0.0,
            radius,
            0.0,
            FillMode::Solid,
            color,
            Color::TRANSPARENT,
        );
    }

    /// Capsule graded from `color_a` at the first endpoint to `color_b` at
    /// the second.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_capsule_gradient(
        &mut self,
        ax: f32,
        ay: f32,
        bx: f32,
        by: f32,
        radius: f32,
        color_a: Color,
        color_b: Color,
    ) {
        self.oriented_box_inner(
            Vec2::new(ax, ay),
            Vec2::new(bx, by),
            0.0,
            radius,
            0.0,
            FillMode::Gradient,
            color_a,
            color_b,
        );
    }

    // ------------------------------------------------------------------
    // Ellipses
    // ------------------------------------------------------------------

    fn ellipse_inner(
        &mut self,
        p0: Vec2,
        p1: Vec2,
        width: f32,
        thickness: f32,
        fillmode: FillMode,
        color: Color,
    ) {
        if p0.similar(p1, HALF_PIXEL) {
            return;
        }
        // A hairline ellipse is indistinguishable from a line.
        if width <= HALF_PIXEL {
            self.oriented_box_inner(
                p0,
                p1,
                0.0,
                0.0,
                0.0,
                FillMode::Solid,
                color,
                Color::TRANSPARENT,
            );
            return;
        }
        let thickness = (thickness * 0.5).max(0.0);
        let bounds = Aabb::from_rounded_obb(p0, p1, width, self.bump() + thickness);
        let mut payload = [p0.x, p0.y, p1.x, p1.y, width, 0.0];
        let len = if fillmode == FillMode::Hollow {
            payload[5] = thickness;
            6
        } else {
            5
        };
        self.append(
            CommandType::Ellipse,
            fillmode,
            0,
            color,
            &payload[..len],
            bounds,
        );
    }

    pub fn draw_ellipse(&mut self, ax: f32, ay: f32, bx: f32, by: f32, width: f32, color: Color) {
        self.ellipse_inner(
            Vec2::new(ax, ay),
            Vec2::new(bx, by),
            width,
            0.0,
            FillMode::Solid,
            color,
        );
    }

    #[allow(clippy::too_many_arguments)]
    pub fn draw_ellipse_ring(
        &mut self,
        ax: f32,
        ay: f32,
        bx: f32,
        by: f32,
        width: f32,
        thickness: f32,
        color: Color,
    ) {
        self.ellipse_inner(
            Vec2::new(ax, ay),
            Vec2::new(bx, by),
            width,
            thickness,
            FillMode::Hollow,
            color,
        );
    }

    // ------------------------------------------------------------------
    // Triangles
    // ------------------------------------------------------------------

    fn triangle_inner(
        &mut self,
        v: [Vec2; 3],
        roundness: f32,
        thickness: f32,
        fillmode: FillMode,
        color: Color,
    ) {
        if v[0].similar(v[1], HALF_PIXEL)
            || v[2].similar(v[1], HALF_PIXEL)
            || v[0].similar(v[2], HALF_PIXEL)
        {
            return;
        }
        let thickness = thickness * 0.5;
        let round_or_thick = if fillmode == FillMode::Hollow {
            thickness
        } else {
            roundness
        };
        let mut bounds = Aabb::from_triangle(v[0], v[1], v[2]);
        bounds.grow(Vec2::splat(round_or_thick + self.bump()));
        let payload = [
            v[0].x,
            v[0].y,
            v[1].x,
            v[1].y,
            v[2].x,
            v[2].y,
            round_or_thick,
        ];
        self.append(CommandType::Triangle, fillmode, 0, color, &payload, bounds);
    }

    pub fn draw_triangle(&mut self, vertices: [Vec2; 3], roundness: f32, color: Color) {
        self.triangle_inner(vertices, roundness, 0.0, FillMode::Solid, color);
    }

    pub fn draw_triangle_ring(&mut self, vertices: [Vec2; 3], thickness: f32, color: Color) {
        self.triangle_inner(vertices, 0.0, thickness, FillMode::Hollow, color);
    }

    // ------------------------------------------------------------------
    // Pies and arcs
    // ------------------------------------------------------------------

    fn pie_inner(
        &mut self,
        center: Vec2,
        direction: Vec2,
        radius: f32,
        aperture: f32,
        thickness: f32,
        fillmode: FillMode,
        color: Color,
    ) {
        if aperture <= f32::EPSILON {
            return;
        }
        let aperture = aperture.clamp(0.0, std::f32::consts::PI);
        let thickness = (thickness * 0.5).max(0.0);
        let mut bounds = Aabb::from_circle(center, radius);
        bounds.grow(Vec2::splat(thickness + self.bump()));
        let mut payload = [
            center.x,
            center.y,
            radius,
            direction.x,
            direction.y,
            aperture.sin(),
            aperture.cos(),
            0.0,
        ];
        let len = if fillmode == FillMode::Hollow {
            payload[7] = thickness;
            8
        } else {
            7
        };
        self.append(
            CommandType::Pie,
            fillmode,
            0,
            color,
            &payload[..len],
            bounds,
        );
    }

    /// Filled circle sector from `start_angle` sweeping `sweep_angle`
    /// radians.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_sector(
        &mut self,
        cx: f32,
        cy: f32,
        radius: f32,
        start_angle: f32,
        sweep_angle: f32,
        color: Color,
    ) {
        let aperture = sweep_angle * 0.5;
        let direction = Vec2::from_angle(start_angle + aperture);
        self.pie_inner(
            Vec2::new(cx, cy),
            direction,
            radius,
            aperture.abs(),
            0.0,
            FillMode::Solid,
            color,
        );
    }

    #[allow(clippy::too_many_arguments)]
    pub fn draw_sector_ring(
        &mut self,
        cx: f32,
        cy: f32,
        radius: f32,
        start_angle: f32,
        sweep_angle: f32,
        thickness: f32,
        color: Color,
    ) {
        let aperture = sweep_angle * 0.5;
        let direction = Vec2::from_angle(start_angle + aperture);
        self.pie_inner(
            Vec2::new(cx, cy),
            direction,
            radius,
            aperture.abs(),
            thickness,
            FillMode::Hollow,
            color,
        );
    }

    /// Circular arc around `direction` with half-angle `aperture` and the
    /// given stroke thickness.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_arc(
        &mut self,
        cx: f32,
        cy: f32,
        dx: f32,
        dy: f32,
        aperture: f32,
        radius: f32,
        thickness: f32,
        color: Color,
    ) {
        let center = Vec2::new(cx, cy);
        let aperture = aperture.clamp(0.0, std::f32::consts::PI);
        let thickness = thickness.max(0.0);
        let mut bounds = Aabb::from_circle(center, radius);
        bounds.grow(Vec2::splat(thickness + self.bump()));
        let payload = [
            center.x,
            center.y,
            radius,
            dx,
            dy,
            aperture.sin(),
            aperture.cos(),
            thickness,
        ];
        self.append(
            CommandType::Arc,
            FillMode::Solid,
            0,
            color,
            &payload,
            bounds,
        );
    }

    // ------------------------------------------------------------------
    // Boxes
    // ------------------------------------------------------------------

    /// Axis-aligned box with rounded corners of the given radius.
    pub fn draw_box(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, radius: f32, color: Color) {
        let (x0, x1) = if x0 > x1 { (x1, x0) } else { (x0, x1) };
        let (y0, y1) = if y0 > y1 { (y1, y0) } else { (y0, y1) };
        let min = Vec2::new(x0, y0);
        let max = Vec2::new(x1, y1);
        let center = (min + max) * 0.5;
        let half_extents = (max - min) * 0.5;
        let mut bounds = Aabb::new(min, max);
        bounds.grow(Vec2::splat(self.bump()));
        let payload = [center.x, center.y, half_extents.x, half_extents.y, radius];
        self.append(
            CommandType::AlignedBox,
            FillMode::Solid,
            0,
            color,
            &payload,
            bounds,
        );
    }

    /// Soft drop-shadow style box; `roundness` is both the corner radius and
    /// the falloff width.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_blurred_box(
        &mut self,
        cx: f32,
        cy: f32,
        width: f32,
        height: f32,
        roundness: f32,
        color: Color,
    ) {
        let half_width = width * 0.5;
        let half_height = height * 0.5;
        let bounds = Aabb::new(
            Vec2::new(cx - half_width - roundness, cy - half_height - roundness),
            Vec2::new(cx + half_width + roundness, cy + half_height + roundness),
        );
        let payload = [cx, cy, half_width, half_height, roundness];
        self.append(
            CommandType::BlurredBox,
            FillMode::Solid,
            0,
            color,
            &payload,
            bounds,
        );
    }

    // ------------------------------------------------------------------
    // Text
    // ------------------------------------------------------------------

    /// Draws one glyph with its top-left reference point at `(x, y)`.
    /// Characters outside the baked range are ignored.
    pub fn draw_char(&mut self, x: f32, y: f32, c: char, color: Color) {
        let Some(glyph_index) = self.alphabet.glyph_index(c) else {
            return;
        };
        let glyph = *self.alphabet.glyph(glyph_index);
        let x = x + glyph.bearing_x;
        let y = y + glyph.bearing_y + self.alphabet.font_height();
        let bounds = Aabb::new(
            Vec2::new(x, y),
            Vec2::new(x + glyph.width(), y + glyph.height()),
        );
        self.append(
            CommandType::Char,
            FillMode::Solid,
            glyph_index as u8,
            color,
            &[x, y],
            bounds,
        );
    }

    /// Draws a text run starting at `(x, y)`, handling line breaks and
    /// advancing past unknown characters without drawing them.
    pub fn draw_text(&mut self, x: f32, y: f32, text: &str, color: Color) {
        let left = x;
        let mut x = x;
        let mut y = y;
        for c in text.chars() {
            if c == '\n' {
                y += self.alphabet.font_height();
                x = left;
            } else if self.alphabet.glyph_index(c).is_some() {
                self.draw_char(x, y, c, color);
                x += self.alphabet.advance(c);
            } else {
                x += self.alphabet.fallback_advance();
            }
        }
    }

    pub fn text_height(&self) -> f32 {
        self.alphabet.font_height()
    }

    pub fn text_width(&self, text: &str) -> f32 {
        self.alphabet.text_width(text)
    }

    // ------------------------------------------------------------------
    // Textured quads
    // ------------------------------------------------------------------

    fn check_slice(&self, slice_index: u8) -> bool {
        if (slice_index as u32) < self.num_slices {
            return true;
        }
        log::error!(
            "atlas slice {slice_index} out of bounds ({} slices)",
            self.num_slices
        );
        debug_assert!(false, "atlas slice index out of bounds");
        false
    }

    /// Axis-aligned textured quad sampling the given atlas slice.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_quad(
        &mut self,
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        uv: QuadUv,
        slice_index: u8,
        color: Color,
    ) {
        if !self.check_slice(slice_index) {
            return;
        }
        if (x0 - x1).abs() < HALF_PIXEL || (y0 - y1).abs() < HALF_PIXEL {
            return;
        }
        let payload = [x0, y0, x1, y1, uv.u0, uv.v0, uv.u1, uv.v1];
        let bounds = Aabb::new(Vec2::new(x0, y0), Vec2::new(x1, y1));
        self.append(
            CommandType::Quad,
            FillMode::Solid,
            slice_index,
            color,
            &payload,
            bounds,
        );
    }

    /// Textured quad centered at `(cx, cy)`, rotated by `angle` radians.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_oriented_quad(
        &mut self,
        cx: f32,
        cy: f32,
        width: f32,
        height: f32,
        angle: f32,
        uv: QuadUv,
        slice_index: u8,
        color: Color,
    ) {
        if !self.check_slice(slice_index) {
            return;
        }
        if width < HALF_PIXEL || height < HALF_PIXEL {
            return;
        }
        let center = Vec2::new(cx, cy);
        let axis = Vec2::from_angle(angle);
        let dir = axis * (width * 0.5);
        let p0 = center - dir;
        let p1 = center + dir;
        let payload = [
            cx,
            cy,
            1.0 / width,
            1.0 / height,
            axis.x,
            axis.y,
            uv.u0,
            uv.v0,
            uv.u1,
            uv.v1,
        ];
        let bounds = Aabb::from_rounded_obb(p0, p1, height, 0.0);
        self.append(
            CommandType::OrientedQuad,
            FillMode::Solid,
            slice_index,
            color,
            &payload,
            bounds,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::tests::synthetic_alphabet;

    fn test_frame() -> Frame {
        let mut frame = Frame::new(Arc::new(synthetic_alphabet()), 4);
        frame.begin(1280, 720);
        frame
    }

    fn assert_parallel(frame: &Frame) {
        assert_eq!(frame.commands().len(), frame.colors().len());
        assert_eq!(frame.commands().len(), frame.aabbs().len());
    }

    #[test]
    fn begin_installs_default_clip() {
        let frame = test_frame();
        assert_eq!(frame.clips().len(), 1);
        assert_eq!(frame.clips()[0], ClipShape::rect(0.0, 0.0, 1280.0, 720.0));
        assert_eq!(frame.num_commands(), 0);
    }

    #[test]
    fn payload_offsets_are_monotonic() {
        let mut frame = test_frame();
        frame.draw_disc(100.0, 100.0, 10.0, Color::WHITE);
        frame.draw_ring(100.0, 100.0, 10.0, 2.0, Color::WHITE);
        frame.draw_box(0.0, 0.0, 50.0, 50.0, 4.0, Color::BLACK);
        assert_parallel(&frame);
        let cmds = frame.commands();
        assert_eq!(cmds[0].data_index, 0);
        assert_eq!(cmds[1].data_index, 3);
        assert_eq!(cmds[2].data_index, 7);
        assert_eq!(frame.draw_data().len(), 12);
        for c in cmds {
            assert!(c.data_index as usize <= frame.draw_data().len());
        }
    }

    #[test]
    fn degenerate_primitives_are_dropped() {
        let mut frame = test_frame();
        frame.draw_capsule(10.0, 10.0, 10.2, 10.2, 3.0, Color::WHITE);
        frame.draw_ellipse(10.0, 10.0, 10.1, 10.1, 8.0, Color::WHITE);
        frame.draw_quad(0.0, 0.0, 0.3, 50.0, QuadUv::FULL, 0, Color::WHITE);
        frame.draw_sector(0.0, 0.0, 10.0, 0.0, 0.0, Color::WHITE);
        assert_eq!(frame.num_commands(), 0);
        assert_parallel(&frame);
    }

    #[test]
    fn hairline_ellipse_becomes_line() {
        let mut frame = test_frame();
        frame.draw_ellipse(0.0, 0.0, 100.0, 0.0, 0.4, Color::WHITE);
        assert_eq!(frame.commands()[0].kind, CommandType::OrientedBox as u8);
    }

    #[test]
    fn command_capacity_is_enforced() {
        let mut frame = test_frame();
        for _ in 0..MAX_COMMANDS + 1 {
            frame.draw_disc(8.0, 8.0, 4.0, Color::WHITE);
        }
        assert_eq!(frame.num_commands() as usize, MAX_COMMANDS);
        assert_parallel(&frame);
    }

    #[test]
    fn payload_capacity_rolls_back_whole_primitive() {
        let mut frame = test_frame();
        // Quads carry 8 floats, so the payload array fills first.
        for _ in 0..MAX_DRAWDATA / 8 + 1 {
            frame.draw_quad(0.0, 0.0, 32.0, 32.0, QuadUv::FULL, 0, Color::WHITE);
        }
        assert_eq!(frame.num_commands() as usize, MAX_DRAWDATA / 8);
        assert_eq!(frame.draw_data().len(), MAX_DRAWDATA);
        assert_parallel(&frame);
    }

    #[test]
    fn redundant_clips_are_deduped() {
        let mut frame = test_frame();
        frame.set_cliprect(10.0, 10.0, 20.0, 20.0);
        frame.set_cliprect(10.0, 10.0, 20.0, 20.0);
        assert_eq!(frame.clips().len(), 2);
        frame.set_clipdisc(50.0, 50.0, 10.0);
        frame.set_clipdisc(50.0, 50.0, 10.0);
        assert_eq!(frame.clips().len(), 3);
        frame.draw_disc(50.0, 50.0, 5.0, Color::WHITE);
        assert_eq!(frame.commands()[0].clip_index, 2);
    }

    #[test]
    fn clip_table_is_bounded() {
        let mut frame = test_frame();
        for i in 0..MAX_CLIPS + 10 {
            frame.set_cliprect(i as f32, 0.0, i as f32 + 1.0, 1.0);
        }
        assert_eq!(frame.clips().len(), MAX_CLIPS);
        // Drawing still works against the last accepted clip.
        frame.draw_disc(8.0, 8.0, 4.0, Color::WHITE);
        assert_eq!(frame.commands()[0].clip_index as usize, MAX_CLIPS - 1);
    }

    #[test]
    fn group_markers_bracket_and_merge_bounds() {
        let mut frame = test_frame();
        frame.begin_group(true, 10.0, 2.0);
        frame.draw_disc(100.0, 100.0, 30.0, Color::WHITE);
        frame.draw_disc(140.0, 100.0, 30.0, Color::WHITE);
        frame.end_group(Color::BLACK);
        assert_parallel(&frame);
        assert!(!frame.has_open_group());

        let cmds = frame.commands();
        assert_eq!(cmds[0].kind, CommandType::BeginGroup as u8);
        assert_eq!(cmds[3].kind, CommandType::EndGroup as u8);
        assert_eq!(cmds[0].extra, GroupOp::Blend as u8);
        assert_eq!(cmds[3].fillmode, FillMode::Outline as u8);

        // Marker boxes hold the union of both children.
        let begin = frame.aabbs()[0];
        let end = frame.aabbs()[3];
        assert_eq!(begin, end);
        let child0 = frame.aabbs()[1];
        let child1 = frame.aabbs()[2];
        assert!(begin.min_x <= child0.min_x && begin.max_x >= child1.max_x);
        // Effective smoothness includes the outline width on both markers.
        assert_eq!(frame.draw_data()[cmds[0].data_index as usize], 12.0);
        assert_eq!(frame.draw_data()[cmds[3].data_index as usize], 12.0);
    }

    #[test]
    fn group_bump_grows_child_bounds() {
        let mut frame = test_frame();
        frame.draw_disc(100.0, 100.0, 30.0, Color::WHITE);
        let plain = frame.aabbs()[0];
        frame.begin_group(true, 32.0, 0.0);
        frame.draw_disc(100.0, 100.0, 30.0, Color::WHITE);
        frame.end_group(Color::BLACK);
        let grouped = frame.aabbs()[2];
        assert!(grouped.min_x < plain.min_x);
        assert!(grouped.max_x > plain.max_x);
    }

    #[test]
    fn unknown_glyphs_do_not_append() {
        let mut frame = test_frame();
        frame.draw_char(0.0, 0.0, ' ', Color::WHITE);
        assert_eq!(frame.num_commands(), 0);
        frame.draw_text(0.0, 0.0, "a b", Color::WHITE);
        assert_eq!(frame.num_commands(), 2);
        assert_eq!(frame.commands()[0].kind, CommandType::Char as u8);
    }

    #[test]
    fn char_extra_stores_glyph_index() {
        let mut frame = test_frame();
        frame.draw_char(0.0, 0.0, '#', Color::WHITE);
        assert_eq!(frame.commands()[0].extra, ('#' as u8) - 33);
    }

    #[test]
    fn payload_lengths_match_table() {
        let mut frame = test_frame();
        frame.draw_disc(8.0, 8.0, 4.0, Color::WHITE);
        frame.draw_arc(50.0, 50.0, 0.0, 1.0, 1.0, 20.0, 3.0, Color::WHITE);
        frame.draw_triangle(
            [
                Vec2::new(0.0, 0.0),
                Vec2::new(20.0, 0.0),
                Vec2::new(10.0, 20.0),
            ],
            0.0,
            Color::WHITE,
        );
        let mut expected = 0;
        for cmd in frame.commands() {
            assert_eq!(cmd.data_index as usize, expected);
            let kind = match cmd.kind {
                3 => CommandType::Disc,
                7 => CommandType::Arc,
                4 => CommandType::Triangle,
                k => panic!("unexpected kind {k}"),
            };
            expected += payload_size(kind, FillMode::Solid);
        }
        assert_eq!(frame.draw_data().len(), expected);
    }
}
