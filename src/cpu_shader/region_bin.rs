// Copyright 2025 the Tiledraw Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use super::read_config;
use crate::cpu_dispatch::CpuBinding;

fn main(
    config_buf: &CpuBinding,
    predicate_buf: &CpuBinding,
    scan_buf: &CpuBinding,
    indices_buf: &CpuBinding,
) {
    let config = read_config(&config_buf.as_buf());
    let predicate_guard = predicate_buf.as_buf();
    let predicate: &[u32] = bytemuck::cast_slice(&predicate_guard);
    let scan_guard = scan_buf.as_buf();
    let scan: &[u32] = bytemuck::cast_slice(&scan_guard);
    let mut indices_guard = indices_buf.as_buf();
    let indices: &mut [u32] = bytemuck::cast_slice_mut(indices_guard.as_mut());

    let n = config.num_commands as usize;
    let num_regions = (config.regions_x * config.regions_y) as usize;
    for region in 0..num_regions {
        let base = region * n;
        for cmd_ix in 0..n {
            if predicate[base + cmd_ix] == 1 {
                indices[base + scan[base + cmd_ix] as usize] = cmd_ix as u32;
            }
        }
    }
}

/// Scatters surviving command indices into each region's compact list,
/// preserving submission order.
pub fn region_bin(_n_wg: u32, resources: &[CpuBinding]) {
    main(&resources[0], &resources[1], &resources[2], &resources[3]);
}
