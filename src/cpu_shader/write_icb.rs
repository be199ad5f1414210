// Copyright 2025 the Tiledraw Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::cpu_dispatch::CpuBinding;
use crate::encoding::Counters;

fn main(counters_buf: &CpuBinding, indirect_buf: &CpuBinding) {
    let counters_guard = counters_buf.as_buf();
    let counters: &Counters =
        bytemuck::from_bytes(&counters_guard[..std::mem::size_of::<Counters>()]);
    let mut indirect_guard = indirect_buf.as_buf();
    let indirect: &mut [u32] = bytemuck::cast_slice_mut(indirect_guard.as_mut());

    // DrawIndirectArgs: vertex_count, instance_count, first_vertex,
    // first_instance. One quad instance per non-empty tile.
    indirect[0] = 4;
    indirect[1] = counters.num_tiles;
    indirect[2] = 0;
    indirect[3] = 0;
}

/// Publishes the non-empty tile count as the rasterizer's indirect draw
/// arguments.
pub fn write_icb(_n_wg: u32, resources: &[CpuBinding]) {
    main(&resources[0], &resources[1]);
}
