// Copyright 2025 the Tiledraw Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! CPU implementations of the binning shader stages.
//!
//! Each function mirrors the WGSL kernel of the same name and is wired up
//! when the engine runs with `use_cpu`. They share the bind order of their
//! GPU counterparts, so the recording layer can dispatch either one. Fine
//! rasterization has no CPU equivalent.

mod exclusive_scan;
mod predicate;
mod region_bin;
mod tile_bin;
mod write_icb;

pub use exclusive_scan::exclusive_scan;
pub use predicate::predicate;
pub use region_bin::region_bin;
pub use tile_bin::tile_bin;
pub use write_icb::write_icb;

use crate::cpu_dispatch::CpuBufGuard;
use crate::encoding::ConfigUniform;

pub(crate) fn read_config(guard: &CpuBufGuard) -> ConfigUniform {
    *bytemuck::from_bytes(&guard[..std::mem::size_of::<ConfigUniform>()])
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::sync::Arc;

    use bytemuck::{bytes_of, cast_slice};

    use super::*;
    use crate::color::Color;
    use crate::cpu_dispatch::CpuBinding;
    use crate::encoding::{
        CommandType, Counters, DrawCommand, QuantizedAabb, TileNode, INVALID_INDEX, MAX_NODES,
        REGION_SIZE, TILE_SIZE,
    };
    use crate::font::tests::synthetic_alphabet;
    use crate::frame::Frame;

    struct Binned {
        config: ConfigUniform,
        commands: Vec<DrawCommand>,
        aabbs: Vec<QuantizedAabb>,
        predicate: Vec<u32>,
        scan: Vec<u32>,
        region_indices: Vec<u32>,
        heads: Vec<u32>,
        nodes: Vec<TileNode>,
        tile_indices: Vec<u32>,
        counters: Counters,
        indirect: Vec<u32>,
    }

    fn test_frame(width: u32, height: u32) -> Frame {
        let mut frame = Frame::new(Arc::new(synthetic_alphabet()), 4);
        frame.begin(width, height);
        frame
    }

    /// Runs the full CPU binning pipeline over an encoded frame.
    fn bin(frame: &Frame, width: u32, height: u32, max_nodes: u32) -> Binned {
        let tiles_x = width.div_ceil(TILE_SIZE);
        let tiles_y = height.div_ceil(TILE_SIZE);
        let regions_x = tiles_x.div_ceil(REGION_SIZE);
        let regions_y = tiles_y.div_ceil(REGION_SIZE);
        let n = frame.num_commands() as usize;
        let num_regions = (regions_x * regions_y) as usize;
        let num_tiles = (tiles_x * tiles_y) as usize;

        let config = ConfigUniform {
            clear_color: [0.0, 0.0, 0.0, 1.0],
            num_commands: n as u32,
            max_nodes,
            tiles_x,
            tiles_y,
            regions_x,
            regions_y,
            num_elements_per_thread: crate::render::scan_elements_per_thread(n as u32),
            aa_width: std::f32::consts::SQRT_2,
            screen_width: width as f32,
            screen_height: height as f32,
            culling_debug: 0,
            srgb_backbuffer: 1,
            font_height: 16.0,
            _pad: [0; 3],
        };

        let config_bytes = bytes_of(&config).to_vec();
        let commands_bytes = cast_slice::<_, u8>(frame.commands()).to_vec();
        let aabbs_bytes = cast_slice::<_, u8>(frame.aabbs()).to_vec();
        let pair_bytes = (num_regions * n.max(1)) * 4;
        let predicate_buf = RefCell::new(vec![0u8; pair_bytes]);
        let scan_buf = RefCell::new(vec![0u8; pair_bytes]);
        let region_indices_buf = RefCell::new(vec![0u8; pair_bytes]);
        let heads_buf = RefCell::new(vec![0u8; num_tiles * 4]);
        let nodes_buf = RefCell::new(vec![0u8; max_nodes as usize * 8]);
        let tile_indices_buf = RefCell::new(vec![0u8; num_tiles * 4]);
        let counters_buf = RefCell::new(vec![0u8; std::mem::size_of::<Counters>()]);
        let indirect_buf = RefCell::new(vec![0u8; 16]);

        if n > 0 {
            predicate(
                0,
                &[
                    CpuBinding::Buffer(&config_bytes),
                    CpuBinding::Buffer(&aabbs_bytes),
                    CpuBinding::BufferRW(&predicate_buf),
                ],
            );
            exclusive_scan(
                0,
                &[
                    CpuBinding::Buffer(&config_bytes),
                    CpuBinding::BufferRW(&predicate_buf),
                    CpuBinding::BufferRW(&scan_buf),
                ],
            );
            region_bin(
                0,
                &[
                    CpuBinding::Buffer(&config_bytes),
                    CpuBinding::BufferRW(&predicate_buf),
                    CpuBinding::BufferRW(&scan_buf),
                    CpuBinding::BufferRW(&region_indices_buf),
                ],
            );
            tile_bin(
                0,
                &[
                    CpuBinding::Buffer(&config_bytes),
                    CpuBinding::Buffer(&commands_bytes),
                    CpuBinding::Buffer(&aabbs_bytes),
                    CpuBinding::BufferRW(&region_indices_buf),
                    CpuBinding::BufferRW(&scan_buf),
                    CpuBinding::BufferRW(&predicate_buf),
                    CpuBinding::BufferRW(&heads_buf),
                    CpuBinding::BufferRW(&nodes_buf),
                    CpuBinding::BufferRW(&tile_indices_buf),
                    CpuBinding::BufferRW(&counters_buf),
                ],
            );
        }
        write_icb(
            0,
            &[
                CpuBinding::BufferRW(&counters_buf),
                CpuBinding::BufferRW(&indirect_buf),
            ],
        );

        let predicate = cast_slice(&predicate_buf.borrow()).to_vec();
        let scan = cast_slice(&scan_buf.borrow()).to_vec();
        let region_indices = cast_slice(&region_indices_buf.borrow()).to_vec();
        let heads = cast_slice(&heads_buf.borrow()).to_vec();
        let nodes = cast_slice(&nodes_buf.borrow()).to_vec();
        let tile_indices = cast_slice(&tile_indices_buf.borrow()).to_vec();
        let counters = *bytemuck::from_bytes(&counters_buf.borrow());
        let indirect = cast_slice(&indirect_buf.borrow()).to_vec();

        Binned {
            config,
            commands: frame.commands().to_vec(),
            aabbs: frame.aabbs().to_vec(),
            predicate,
            scan,
            region_indices,
            heads,
            nodes,
            tile_indices,
            counters,
            indirect,
        }
    }

    impl Binned {
        fn region_list(&self, region: usize) -> Vec<u32> {
            let n = self.config.num_commands as usize;
            let base = region * n;
            let count = (self.scan[base + n - 1] + self.predicate[base + n - 1]) as usize;
            self.region_indices[base..base + count].to_vec()
        }

        /// Commands of one tile's list in walk order (front-most first).
        fn tile_list(&self, tile_x: u32, tile_y: u32) -> Vec<(u32, u8)> {
            let mut out = Vec::new();
            let mut node_ix = self.heads[(tile_y * self.config.tiles_x + tile_x) as usize];
            while node_ix != INVALID_INDEX {
                let node = self.nodes[node_ix as usize];
                out.push((node.command_index(), node.kind()));
                node_ix = node.next;
            }
            out
        }
    }

    #[test]
    fn empty_frame_draws_no_tiles() {
        let frame = test_frame(1280, 720);
        let binned = bin(&frame, 1280, 720, MAX_NODES);
        assert_eq!(binned.counters.num_tiles, 0);
        assert_eq!(binned.indirect, vec![4, 0, 0, 0]);
    }

    #[test]
    fn region_lists_are_sorted_and_predicated() {
        let mut frame = test_frame(1280, 720);
        // Spread commands over several regions, some spanning boundaries.
        frame.draw_disc(100.0, 100.0, 40.0, Color::WHITE);
        frame.draw_disc(600.0, 300.0, 200.0, Color::WHITE);
        frame.draw_box(250.0, 250.0, 270.0, 270.0, 0.0, Color::WHITE);
        frame.draw_line(0.0, 0.0, 1279.0, 719.0, 3.0, Color::WHITE);
        let binned = bin(&frame, 1280, 720, MAX_NODES);
        let n = binned.config.num_commands as usize;
        for region in 0..(binned.config.regions_x * binned.config.regions_y) as usize {
            let list = binned.region_list(region);
            for pair in list.windows(2) {
                assert!(pair[0] < pair[1], "region list not strictly increasing");
            }
            for &cmd in &list {
                assert_eq!(binned.predicate[region * n + cmd as usize], 1);
            }
        }
    }

    #[test]
    fn straddling_box_sets_both_regions() {
        let mut frame = test_frame(1280, 720);
        // A 256 px region boundary sits at x = 256.
        frame.draw_disc(256.0, 100.0, 10.0, Color::WHITE);
        let binned = bin(&frame, 1280, 720, MAX_NODES);
        let n = binned.config.num_commands as usize;
        assert_eq!(binned.predicate[0], 1);
        assert_eq!(binned.predicate[n], 1);
    }

    #[test]
    fn tile_lists_only_hold_overlapping_commands() {
        let mut frame = test_frame(1280, 720);
        frame.draw_disc(200.0, 200.0, 50.0, Color::WHITE);
        frame.draw_box(700.0, 400.0, 900.0, 500.0, 4.0, Color::WHITE);
        frame.draw_ring(640.0, 360.0, 300.0, 8.0, Color::WHITE);
        let binned = bin(&frame, 1280, 720, MAX_NODES);
        let mut found = 0;
        for tile_y in 0..binned.config.tiles_y {
            for tile_x in 0..binned.config.tiles_x {
                for (cmd_ix, kind) in binned.tile_list(tile_x, tile_y) {
                    assert!(
                        binned.aabbs[cmd_ix as usize].contains_tile(tile_x, tile_y),
                        "command {cmd_ix} in tile ({tile_x},{tile_y}) without overlap"
                    );
                    assert_eq!(kind, binned.commands[cmd_ix as usize].kind);
                    found += 1;
                }
            }
        }
        assert!(found > 0);
    }

    #[test]
    fn walk_order_is_reverse_submission() {
        let mut frame = test_frame(1280, 720);
        for i in 0..5 {
            frame.draw_disc(100.0 + i as f32, 100.0, 20.0, Color::WHITE);
        }
        let binned = bin(&frame, 1280, 720, MAX_NODES);
        let list = binned.tile_list(6, 6);
        assert_eq!(list.len(), 5);
        for pair in list.windows(2) {
            assert!(pair[0].0 > pair[1].0, "list must be prepended");
        }
    }

    #[test]
    fn exact_tile_primitive_lands_in_one_tile() {
        let mut frame = test_frame(1280, 720);
        frame.draw_quad(
            32.0,
            32.0,
            48.0,
            48.0,
            crate::frame::QuadUv::FULL,
            0,
            Color::WHITE,
        );
        let binned = bin(&frame, 1280, 720, MAX_NODES);
        assert_eq!(binned.counters.num_tiles, 1);
        assert_eq!(binned.tile_list(2, 2).len(), 1);
        assert!(binned.tile_list(1, 1).is_empty());
        assert!(binned.tile_list(3, 3).is_empty());
    }

    #[test]
    fn group_markers_bracket_overlapping_children() {
        let mut frame = test_frame(1280, 720);
        frame.begin_group(true, 10.0, 0.0);
        frame.draw_disc(100.0, 100.0, 30.0, Color::WHITE);
        frame.draw_disc(1000.0, 600.0, 30.0, Color::WHITE);
        frame.end_group(Color::BLACK);
        let binned = bin(&frame, 1280, 720, MAX_NODES);

        let begin = CommandType::BeginGroup as u8;
        let end = CommandType::EndGroup as u8;
        // A tile under the first child sees end, child, begin (walk order).
        let list = binned.tile_list(6, 6);
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].1, end);
        assert_eq!(list[1].0, 1);
        assert_eq!(list[2].1, begin);
        // A tile under the second child gets its own balanced bracket.
        let list = binned.tile_list(62, 37);
        assert_eq!(list.len(), 3);
        assert_eq!(list[1].0, 2);
        // A tile inside the group bounds but away from both children holds
        // nothing.
        assert!(binned.tile_list(30, 20).is_empty());
    }

    #[test]
    fn node_exhaustion_drops_but_keeps_counting() {
        let mut frame = test_frame(1280, 720);
        // One disc covering ~4 tiles, repeated; a tiny arena overflows.
        for _ in 0..16 {
            frame.draw_disc(24.0, 24.0, 12.0, Color::WHITE);
        }
        let binned = bin(&frame, 1280, 720, 8);
        assert!(binned.counters.num_nodes > 8);
        // Every stored node still references a valid command.
        for node in &binned.nodes {
            assert!((node.command_index() as usize) < binned.commands.len());
        }
        // Lists remain terminated: walking any tile never reads past the
        // arena.
        for tile_y in 0..binned.config.tiles_y {
            for tile_x in 0..binned.config.tiles_x {
                let head =
                    binned.heads[(tile_y * binned.config.tiles_x + tile_x) as usize];
                assert!(head == INVALID_INDEX || (head as usize) < 8);
            }
        }
    }

    #[test]
    fn icb_reflects_non_empty_tiles() {
        let mut frame = test_frame(1280, 720);
        frame.draw_disc(24.0, 24.0, 4.0, Color::WHITE);
        frame.draw_disc(1000.0, 600.0, 4.0, Color::WHITE);
        let binned = bin(&frame, 1280, 720, MAX_NODES);
        assert_eq!(binned.indirect[0], 4);
        assert_eq!(binned.indirect[1], binned.counters.num_tiles);
        let listed: std::collections::HashSet<_> = binned.tile_indices
            [..binned.counters.num_tiles as usize]
            .iter()
            .copied()
            .collect();
        for tile_y in 0..binned.config.tiles_y {
            for tile_x in 0..binned.config.tiles_x {
                let tile_id = tile_y * binned.config.tiles_x + tile_x;
                let empty = binned.heads[tile_id as usize] == INVALID_INDEX;
                assert_eq!(listed.contains(&tile_id), !empty);
            }
        }
    }
}
