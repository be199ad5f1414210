// Copyright 2025 the Tiledraw Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use super::read_config;
use crate::cpu_dispatch::CpuBinding;
use crate::encoding::{QuantizedAabb, REGION_SIZE};

fn main(config_buf: &CpuBinding, aabbs_buf: &CpuBinding, predicate_buf: &CpuBinding) {
    let config = read_config(&config_buf.as_buf());
    let aabbs_guard = aabbs_buf.as_buf();
    let aabbs: &[QuantizedAabb] = bytemuck::cast_slice(&aabbs_guard);
    let mut predicate_guard = predicate_buf.as_buf();
    let predicate: &mut [u32] = bytemuck::cast_slice_mut(predicate_guard.as_mut());

    let n = config.num_commands as usize;
    let num_regions = (config.regions_x * config.regions_y) as usize;
    for cmd_ix in 0..n {
        let aabb = aabbs[cmd_ix];
        for region in 0..num_regions {
            let rx = region as u32 % config.regions_x;
            let ry = region as u32 / config.regions_x;
            let min_x = rx * REGION_SIZE;
            let min_y = ry * REGION_SIZE;
            let hit = aabb.intersects(
                min_x,
                min_y,
                min_x + REGION_SIZE - 1,
                min_y + REGION_SIZE - 1,
            );
            predicate[region * n + cmd_ix] = hit as u32;
        }
    }
}

/// One flag per (region, command) pair: does the command's box overlap the
/// region?
pub fn predicate(_n_wg: u32, resources: &[CpuBinding]) {
    main(&resources[0], &resources[1], &resources[2]);
}
