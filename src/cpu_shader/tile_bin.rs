// Copyright 2025 the Tiledraw Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use super::read_config;
use crate::cpu_dispatch::CpuBinding;
use crate::encoding::{
    CommandType, Counters, DrawCommand, QuantizedAabb, TileNode, INVALID_INDEX, REGION_SIZE,
};

struct TileState<'a> {
    nodes: &'a mut [TileNode],
    counters: &'a mut Counters,
    max_nodes: u32,
}

impl TileState<'_> {
    /// Prepends a node for the command, returning the new list head. The
    /// node is dropped when the arena is exhausted.
    fn push_node(&mut self, head: u32, cmd_ix: u32, kind: u8) -> u32 {
        let node_ix = self.counters.num_nodes;
        self.counters.num_nodes += 1;
        if node_ix >= self.max_nodes {
            return head;
        }
        self.nodes[node_ix as usize] = TileNode::new(head, cmd_ix as u16, kind);
        node_ix
    }
}

#[allow(clippy::too_many_arguments)]
fn main(
    config_buf: &CpuBinding,
    commands_buf: &CpuBinding,
    aabbs_buf: &CpuBinding,
    region_indices_buf: &CpuBinding,
    scan_buf: &CpuBinding,
    predicate_buf: &CpuBinding,
    heads_buf: &CpuBinding,
    nodes_buf: &CpuBinding,
    tile_indices_buf: &CpuBinding,
    counters_buf: &CpuBinding,
) {
    let config = read_config(&config_buf.as_buf());
    let commands_guard = commands_buf.as_buf();
    let commands: &[DrawCommand] = bytemuck::cast_slice(&commands_guard);
    let aabbs_guard = aabbs_buf.as_buf();
    let aabbs: &[QuantizedAabb] = bytemuck::cast_slice(&aabbs_guard);
    let region_indices_guard = region_indices_buf.as_buf();
    let region_indices: &[u32] = bytemuck::cast_slice(&region_indices_guard);
    let scan_guard = scan_buf.as_buf();
    let scan: &[u32] = bytemuck::cast_slice(&scan_guard);
    let predicate_guard = predicate_buf.as_buf();
    let predicate: &[u32] = bytemuck::cast_slice(&predicate_guard);
    let mut heads_guard = heads_buf.as_buf();
    let heads: &mut [u32] = bytemuck::cast_slice_mut(heads_guard.as_mut());
    let mut nodes_guard = nodes_buf.as_buf();
    let mut tile_indices_guard = tile_indices_buf.as_buf();
    let tile_indices: &mut [u32] = bytemuck::cast_slice_mut(tile_indices_guard.as_mut());
    let mut counters_guard = counters_buf.as_buf();

    let mut state = TileState {
        nodes: bytemuck::cast_slice_mut(nodes_guard.as_mut()),
        counters: bytemuck::from_bytes_mut(
            &mut counters_guard.as_mut()[..std::mem::size_of::<Counters>()],
        ),
        max_nodes: config.max_nodes,
    };

    let n = config.num_commands as usize;
    if n == 0 {
        return;
    }
    let num_regions = config.regions_x * config.regions_y;
    for region in 0..num_regions {
        let base = region as usize * n;
        let count = scan[base + n - 1] + predicate[base + n - 1];
        for local_y in 0..REGION_SIZE {
            for local_x in 0..REGION_SIZE {
                let tile_x = (region % config.regions_x) * REGION_SIZE + local_x;
                let tile_y = (region / config.regions_x) * REGION_SIZE + local_y;
                if tile_x >= config.tiles_x || tile_y >= config.tiles_y {
                    continue;
                }
                let tile_id = tile_y * config.tiles_x + tile_x;

                let mut head = INVALID_INDEX;
                let mut pending_begin = INVALID_INDEX;
                let mut begin_inserted = false;
                for j in 0..count {
                    let cmd_ix = region_indices[base + j as usize];
                    let kind = commands[cmd_ix as usize].kind;
                    if kind == CommandType::BeginGroup as u8 {
                        pending_begin = cmd_ix;
                        begin_inserted = false;
                        continue;
                    }
                    if kind == CommandType::EndGroup as u8 {
                        if begin_inserted {
                            head = state.push_node(head, cmd_ix, kind);
                        }
                        pending_begin = INVALID_INDEX;
                        begin_inserted = false;
                        continue;
                    }
                    if aabbs[cmd_ix as usize].contains_tile(tile_x, tile_y) {
                        // A bracketing begin marker goes in right before the
                        // first overlapping child.
                        if pending_begin != INVALID_INDEX && !begin_inserted {
                            head = state.push_node(
                                head,
                                pending_begin,
                                CommandType::BeginGroup as u8,
                            );
                            begin_inserted = true;
                        }
                        head = state.push_node(head, cmd_ix, kind);
                    }
                }
                heads[tile_id as usize] = head;
                if head != INVALID_INDEX {
                    let slot = state.counters.num_tiles;
                    state.counters.num_tiles += 1;
                    tile_indices[slot as usize] = tile_id;
                }
            }
        }
    }
}

/// Builds each tile's command list by walking its region's compact list and
/// prepending nodes from the shared arena. Group markers are injected
/// wherever a bracketed child landed.
pub fn tile_bin(_n_wg: u32, resources: &[CpuBinding]) {
    main(
        &resources[0],
        &resources[1],
        &resources[2],
        &resources[3],
        &resources[4],
        &resources[5],
        &resources[6],
        &resources[7],
        &resources[8],
        &resources[9],
    );
}
