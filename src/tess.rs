// Copyright 2025 the Tiledraw Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Adaptive Bézier tessellation.
//!
//! Curves are flattened into capsule primitives by subdividing on an explicit
//! bounded stack. Each step splits at a parameter proportional to the control
//! polygon's segment lengths; once the midpoint is within a fraction of a
//! pixel of the chord, the segment is emitted as a capsule.

use crate::color::Color;
use crate::frame::Frame;
use crate::math::{is_colinear, Vec2};

/// Maximum depth of the subdivision stack.
pub const TESSELATION_STACK_MAX: usize = 1024;

/// Squared-distance threshold (in pixels) below which a midpoint counts as
/// lying on the chord.
const COLINEAR_THRESHOLD: f32 = 0.1;

#[derive(Clone, Copy)]
struct Quadratic {
    c0: Vec2,
    c1: Vec2,
    c2: Vec2,
}

#[derive(Clone, Copy)]
struct Cubic {
    c0: Vec2,
    c1: Vec2,
    c2: Vec2,
    c3: Vec2,
}

impl Frame {
    /// Tessellates a quadratic Bézier curve into capsules of the given
    /// stroke width. Returns the number of capsules emitted, or `None` when
    /// the subdivision stack overflowed.
    pub fn draw_quadratic_bezier(
        &mut self,
        control_points: [Vec2; 3],
        width: f32,
        color: Color,
    ) -> Option<u32> {
        let radius = width * 0.5;
        let mut num_capsules = 0;
        let mut stack = Vec::with_capacity(64);
        stack.push(Quadratic {
            c0: control_points[0],
            c1: control_points[1],
            c2: control_points[2],
        });

        while let Some(c) = stack.pop() {
            // Split proportionally to the control polygon segment lengths so
            // both halves cover similar arc lengths.
            let d0 = c.c0.distance(c.c1);
            let d1 = c.c1.distance(c.c2);
            let split = d0 / (d0 + d1);

            let left = c.c0.mix(c.c1, split);
            let right = c.c1.mix(c.c2, split);
            let middle = left.mix(right, split);

            if is_colinear(c.c0, c.c2, middle, COLINEAR_THRESHOLD) {
                self.draw_capsule(c.c0.x, c.c0.y, c.c2.x, c.c2.y, radius, color);
                num_capsules += 1;
            } else {
                if stack.len() + 2 > TESSELATION_STACK_MAX {
                    return None;
                }
                stack.push(Quadratic {
                    c0: c.c0,
                    c1: left,
                    c2: middle,
                });
                stack.push(Quadratic {
                    c0: middle,
                    c1: right,
                    c2: c.c2,
                });
            }
        }
        Some(num_capsules)
    }

    /// Tessellates a cubic Bézier curve into capsules of the given stroke
    /// width. Returns the number of capsules emitted, or `None` when the
    /// subdivision stack overflowed.
    pub fn draw_cubic_bezier(
        &mut self,
        control_points: [Vec2; 4],
        width: f32,
        color: Color,
    ) -> Option<u32> {
        let radius = width * 0.5;
        let mut num_capsules = 0;
        let mut stack = Vec::with_capacity(64);
        stack.push(Cubic {
            c0: control_points[0],
            c1: control_points[1],
            c2: control_points[2],
            c3: control_points[3],
        });

        while let Some(c) = stack.pop() {
            // The halfway point along the control polygon roughly corresponds
            // to halfway along the curve's arc length.
            let d0 = c.c0.distance(c.c1);
            let d1 = c.c1.distance(c.c2);
            let d2 = c.c2.distance(c.c3);
            let total = d0 + d1 + d2;
            let split = (d0 + 0.5 * d1) / total;

            let c01 = c.c0.mix(c.c1, split);
            let c12 = c.c1.mix(c.c2, split);
            let c23 = c.c2.mix(c.c3, split);
            let c01c12 = c01.mix(c12, split);
            let c12c23 = c12.mix(c23, split);
            let middle = c01c12.mix(c12c23, split);

            if is_colinear(c.c0, c.c3, middle, COLINEAR_THRESHOLD) {
                self.draw_capsule(c.c0.x, c.c0.y, c.c3.x, c.c3.y, radius, color);
                num_capsules += 1;
            } else {
                if stack.len() + 2 > TESSELATION_STACK_MAX {
                    return None;
                }
                stack.push(Cubic {
                    c0: c.c0,
                    c1: c01,
                    c2: c01c12,
                    c3: middle,
                });
                stack.push(Cubic {
                    c0: middle,
                    c1: c12c23,
                    c2: c23,
                    c3: c.c3,
                });
            }
        }
        Some(num_capsules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::CommandType;
    use crate::font::tests::synthetic_alphabet;
    use std::sync::Arc;

    fn test_frame() -> Frame {
        let mut frame = Frame::new(Arc::new(synthetic_alphabet()), 0);
        frame.begin(1280, 720);
        frame
    }

    #[test]
    fn straight_quadratic_emits_one_capsule() {
        let mut frame = test_frame();
        let n = frame.draw_quadratic_bezier(
            [
                Vec2::new(10.0, 10.0),
                Vec2::new(60.0, 10.0),
                Vec2::new(110.0, 10.0),
            ],
            4.0,
            Color::WHITE,
        );
        assert_eq!(n, Some(1));
        assert_eq!(frame.num_commands(), 1);
        assert_eq!(frame.commands()[0].kind, CommandType::OrientedBox as u8);
    }

    #[test]
    fn curved_quadratic_subdivides() {
        let mut frame = test_frame();
        let n = frame
            .draw_quadratic_bezier(
                [
                    Vec2::new(10.0, 300.0),
                    Vec2::new(400.0, 10.0),
                    Vec2::new(790.0, 300.0),
                ],
                4.0,
                Color::WHITE,
            )
            .unwrap();
        assert!(n > 4, "expected several capsules, got {n}");
        assert_eq!(frame.num_commands(), n);
    }

    #[test]
    fn cubic_endpoints_are_joined() {
        let mut frame = test_frame();
        let n = frame
            .draw_cubic_bezier(
                [
                    Vec2::new(10.0, 300.0),
                    Vec2::new(200.0, 10.0),
                    Vec2::new(600.0, 590.0),
                    Vec2::new(790.0, 300.0),
                ],
                4.0,
                Color::WHITE,
            )
            .unwrap();
        assert!(n > 4);
        // Consecutive capsules share endpoints: the whole run starts and
        // ends at the curve endpoints.
        let data = frame.draw_data();
        let first = frame.commands()[0].data_index as usize;
        let last = frame.commands()[frame.commands().len() - 1].data_index as usize;
        assert_eq!((data[first], data[first + 1]), (10.0, 300.0));
        assert_eq!((data[last + 2], data[last + 3]), (790.0, 300.0));
    }

    #[test]
    fn flat_curve_capsules_cover_chord() {
        let mut frame = test_frame();
        let n = frame
            .draw_quadratic_bezier(
                [
                    Vec2::new(0.0, 100.0),
                    Vec2::new(50.0, 100.05),
                    Vec2::new(100.0, 100.0),
                ],
                2.0,
                Color::WHITE,
            )
            .unwrap();
        assert_eq!(n, 1);
    }
}
