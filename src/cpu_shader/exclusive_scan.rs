// Copyright 2025 the Tiledraw Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use super::read_config;
use crate::cpu_dispatch::CpuBinding;

fn main(config_buf: &CpuBinding, predicate_buf: &CpuBinding, scan_buf: &CpuBinding) {
    let config = read_config(&config_buf.as_buf());
    let predicate_guard = predicate_buf.as_buf();
    let predicate: &[u32] = bytemuck::cast_slice(&predicate_guard);
    let mut scan_guard = scan_buf.as_buf();
    let scan: &mut [u32] = bytemuck::cast_slice_mut(scan_guard.as_mut());

    let n = config.num_commands as usize;
    let num_regions = (config.regions_x * config.regions_y) as usize;
    for region in 0..num_regions {
        let base = region * n;
        let mut prefix = 0;
        for i in 0..n {
            scan[base + i] = prefix;
            prefix += predicate[base + i];
        }
    }
}

/// Exclusive prefix sum of each region's predicate vector. The GPU version
/// splits the work across a cooperating workgroup; the result is identical.
pub fn exclusive_scan(_n_wg: u32, resources: &[CpuBinding]) {
    main(&resources[0], &resources[1], &resources[2]);
}
