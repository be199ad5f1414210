// Copyright 2025 the Tiledraw Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Load the binning and rasterization shaders.

mod preprocess;

use std::collections::HashMap;

use wgpu::Device;

use crate::cpu_shader;
use crate::recording::{BindType, ShaderId};
use crate::wgpu_engine::WgpuEngine;

macro_rules! shader {
    ($name:expr) => {
        include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/shader/",
            $name,
            ".wgsl"
        ))
    };
}

macro_rules! shared_shader {
    ($name:expr) => {
        (
            $name,
            include_str!(concat!(
                env!("CARGO_MANIFEST_DIR"),
                "/shader/shared/",
                $name,
                ".wgsl"
            )),
        )
    };
}

const SHARED_SHADERS: &[(&str, &str)] = &[
    shared_shader!("config"),
    shared_shader!("command"),
    shared_shader!("tile"),
    shared_shader!("sdf"),
];

/// One pipeline per pass of the frame.
pub struct FullShaders {
    pub predicate: ShaderId,
    pub exclusive_scan: ShaderId,
    pub region_bin: ShaderId,
    pub tile_bin: ShaderId,
    pub write_icb: ShaderId,
    pub rasterize: ShaderId,
}

impl FullShaders {
    pub(crate) fn new(
        device: &Device,
        engine: &mut WgpuEngine,
        target_format: wgpu::TextureFormat,
    ) -> FullShaders {
        let imports = SHARED_SHADERS.iter().copied().collect::<HashMap<_, _>>();
        let predicate = engine.add_shader(
            device,
            "predicate",
            preprocess::preprocess(shader!("predicate"), &imports).into(),
            &[BindType::Uniform, BindType::BufReadOnly, BindType::Buffer],
            cpu_shader::predicate,
        );
        let exclusive_scan = engine.add_shader(
            device,
            "exclusive_scan",
            preprocess::preprocess(shader!("exclusive_scan"), &imports).into(),
            &[BindType::Uniform, BindType::BufReadOnly, BindType::Buffer],
            cpu_shader::exclusive_scan,
        );
        let region_bin = engine.add_shader(
            device,
            "region_bin",
            preprocess::preprocess(shader!("region_bin"), &imports).into(),
            &[
                BindType::Uniform,
                BindType::BufReadOnly,
                BindType::BufReadOnly,
                BindType::Buffer,
            ],
            cpu_shader::region_bin,
        );
        let tile_bin = engine.add_shader(
            device,
            "tile_bin",
            preprocess::preprocess(shader!("tile_bin"), &imports).into(),
            &[
                BindType::Uniform,
                BindType::BufReadOnly,
                BindType::BufReadOnly,
                BindType::BufReadOnly,
                BindType::BufReadOnly,
                BindType::BufReadOnly,
                BindType::Buffer,
                BindType::Buffer,
                BindType::Buffer,
                BindType::Buffer,
            ],
            cpu_shader::tile_bin,
        );
        let write_icb = engine.add_shader(
            device,
            "write_icb",
            preprocess::preprocess(shader!("write_icb"), &imports).into(),
            &[BindType::BufReadOnly, BindType::Buffer],
            cpu_shader::write_icb,
        );
        use crate::recording::ImageFormat;
        use wgpu::ShaderStages;
        let rasterize = engine.add_render_shader(
            device,
            "rasterize",
            preprocess::preprocess(shader!("rasterize"), &imports).into(),
            "tile_vs",
            "tile_fs",
            target_format,
            &[
                (BindType::Uniform, ShaderStages::VERTEX_FRAGMENT),
                (BindType::BufReadOnly, ShaderStages::FRAGMENT),
                (BindType::BufReadOnly, ShaderStages::FRAGMENT),
                (BindType::BufReadOnly, ShaderStages::FRAGMENT),
                (BindType::BufReadOnly, ShaderStages::FRAGMENT),
                (BindType::BufReadOnly, ShaderStages::FRAGMENT),
                (BindType::BufReadOnly, ShaderStages::FRAGMENT),
                (BindType::BufReadOnly, ShaderStages::VERTEX),
                (BindType::BufReadOnly, ShaderStages::FRAGMENT),
                (BindType::ImageRead(ImageFormat::Bc4), ShaderStages::FRAGMENT),
                (
                    BindType::ImageArrayRead(ImageFormat::Rgba8Srgb),
                    ShaderStages::FRAGMENT,
                ),
                (BindType::Sampler, ShaderStages::FRAGMENT),
            ],
        );
        FullShaders {
            predicate,
            exclusive_scan,
            region_bin,
            tile_bin,
            write_icb,
            rasterize,
        }
    }
}
