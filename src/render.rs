// Copyright 2025 the Tiledraw Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Builds the per-frame recording: buffer uploads, the two-level binning
//! dispatch chain and the indirect tile rasterization pass.

use bytemuck::{bytes_of, cast_slice};

use crate::encoding::{
    ConfigUniform, Counters, TileNode, MAX_COMMANDS, MAX_GLYPHS, MAX_NODES, REGION_SIZE, SCAN_WG,
    SIMD_GROUP_SIZE, TILE_SIZE,
};
use crate::font::{Alphabet, FontChar};
use crate::frame::Frame;
use crate::recording::{BufferProxy, DrawParams, ImageFormat, ImageProxy, Recording, ResourceProxy};
use crate::shaders::FullShaders;

/// Resources that persist across frames: the font and atlas textures and the
/// tile/region grid derived from the viewport. The binning buffers themselves
/// are recorded per frame and rotate through the engine's pool.
pub(crate) struct GpuResources {
    pub glyph_table: BufferProxy,
    pub font_tex: ImageProxy,
    pub atlas_tex: ImageProxy,
    pub tiles_x: u32,
    pub tiles_y: u32,
    pub regions_x: u32,
    pub regions_y: u32,
}

fn div_round_up(n: u32, d: u32) -> u32 {
    (n + d - 1) / d
}

impl GpuResources {
    pub fn new(width: u32, height: u32, font: &Alphabet, atlas: Option<(u32, u32, u32)>) -> Self {
        let (atlas_w, atlas_h, slices) = atlas.unwrap_or((1, 1, 1));
        let mut resources = Self {
            glyph_table: BufferProxy::new(
                (MAX_GLYPHS * std::mem::size_of::<FontChar>()) as u64,
                "glyph_table",
            ),
            font_tex: ImageProxy::new(
                font.texture_width(),
                font.texture_height(),
                ImageFormat::Bc4,
            ),
            atlas_tex: ImageProxy::new_array(atlas_w, atlas_h, slices, ImageFormat::Rgba8Srgb),
            tiles_x: 0,
            tiles_y: 0,
            regions_x: 0,
            regions_y: 0,
        };
        resources.resize(width, height);
        resources
    }

    /// Recomputes the tile and region grid for a new viewport.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.tiles_x = div_round_up(width, TILE_SIZE);
        self.tiles_y = div_round_up(height, TILE_SIZE);
        self.regions_x = div_round_up(self.tiles_x, REGION_SIZE);
        self.regions_y = div_round_up(self.tiles_y, REGION_SIZE);
    }

    pub fn num_regions(&self) -> u32 {
        self.regions_x * self.regions_y
    }

    pub fn num_tiles(&self) -> u32 {
        self.tiles_x * self.tiles_y
    }
}

/// Uploads the baked font: the glyph table and the BC4 atlas texture.
pub(crate) fn record_font_upload(font: &Alphabet, resources: &GpuResources) -> Recording {
    let mut recording = Recording::default();
    recording.push(crate::recording::Command::Upload(
        resources.glyph_table,
        cast_slice(&font.glyph_table()).to_vec(),
    ));
    recording.write_image_layer(resources.font_tex, 0, font.atlas_data().to_vec());
    recording
}

/// Records one frame: per-frame uploads, the binning chain and the tile
/// rasterization pass into `target`.
pub(crate) fn record_frame(
    frame: &Frame,
    config: &ConfigUniform,
    resources: &GpuResources,
    shaders: &FullShaders,
    target: ImageProxy,
    pass_clear_color: [f64; 4],
) -> Recording {
    let mut recording = Recording::default();
    let num_commands = config.num_commands;

    let config_buf = recording.upload_uniform("config", bytes_of(config).to_vec());
    let commands_buf = recording.upload("commands", cast_slice(frame.commands()).to_vec());
    let colors_buf = recording.upload("colors", cast_slice(frame.colors()).to_vec());
    let aabbs_buf = recording.upload("commands_aabb", cast_slice(frame.aabbs()).to_vec());
    let draw_data_buf = recording.upload("draw_data", cast_slice(frame.draw_data()).to_vec());
    let clips_buf = recording.upload("clips", cast_slice(frame.clips()).to_vec());

    let pair_bytes = resources.num_regions() as u64 * MAX_COMMANDS as u64 * 4;
    let predicate = BufferProxy::new(pair_bytes, "predicate");
    let scan = BufferProxy::new(pair_bytes, "scan");
    let region_indices = BufferProxy::new(pair_bytes, "region_indices");
    let tile_heads = BufferProxy::new(resources.num_tiles() as u64 * 4, "tile_heads");
    let tile_nodes = BufferProxy::new(
        MAX_NODES as u64 * std::mem::size_of::<TileNode>() as u64,
        "tile_nodes",
    );
    let tile_indices = BufferProxy::new(resources.num_tiles() as u64 * 4, "tile_indices");
    let counters = BufferProxy::new(std::mem::size_of::<Counters>() as u64, "counters");
    let indirect = BufferProxy::new(16, "indirect");

    if num_commands > 0 {
        recording.clear_all(counters);
        recording.dispatch(
            shaders.predicate,
            (div_round_up(num_commands, SIMD_GROUP_SIZE), 1, 1),
            [config_buf, aabbs_buf, predicate],
        );
        recording.dispatch(
            shaders.exclusive_scan,
            (1, resources.num_regions(), 1),
            [config_buf, predicate, scan],
        );
        recording.dispatch(
            shaders.region_bin,
            (
                div_round_up(num_commands, 16),
                div_round_up(resources.num_regions(), 16),
                1,
            ),
            [config_buf, predicate, scan, region_indices],
        );
        recording.dispatch(
            shaders.tile_bin,
            (1, 1, resources.num_regions()),
            [
                config_buf,
                commands_buf,
                aabbs_buf,
                region_indices,
                scan,
                predicate,
                tile_heads,
                tile_nodes,
                tile_indices,
                counters,
            ],
        );
        recording.dispatch(shaders.write_icb, (1, 1, 1), [counters, indirect]);
    }

    recording.draw(DrawParams {
        shader_id: shaders.rasterize,
        vertex_count: 4,
        instance_count: 0,
        indirect: (num_commands > 0).then_some(indirect),
        resources: vec![
            ResourceProxy::Buffer(config_buf),
            ResourceProxy::Buffer(commands_buf),
            ResourceProxy::Buffer(colors_buf),
            ResourceProxy::Buffer(draw_data_buf),
            ResourceProxy::Buffer(clips_buf),
            ResourceProxy::Buffer(tile_heads),
            ResourceProxy::Buffer(tile_nodes),
            ResourceProxy::Buffer(tile_indices),
            ResourceProxy::Buffer(resources.glyph_table),
            ResourceProxy::Image(resources.font_tex),
            ResourceProxy::Image(resources.atlas_tex),
            ResourceProxy::Sampler,
        ],
        target,
        clear_color: Some(pass_clear_color),
    });

    // Everything per-frame rotates through the engine's buffer pool; with
    // three frames in flight this settles into a small ring.
    recording.free_buffer(config_buf);
    recording.free_buffer(commands_buf);
    recording.free_buffer(colors_buf);
    recording.free_buffer(aabbs_buf);
    recording.free_buffer(draw_data_buf);
    recording.free_buffer(clips_buf);
    recording.free_buffer(predicate);
    recording.free_buffer(scan);
    recording.free_buffer(region_indices);
    recording.free_buffer(tile_heads);
    recording.free_buffer(tile_nodes);
    recording.free_buffer(tile_indices);
    recording.free_buffer(counters);
    recording.free_buffer(indirect);
    recording
}

/// Scan workgroups each cover the whole command range; this is the serial
/// span per thread.
pub(crate) fn scan_elements_per_thread(num_commands: u32) -> u32 {
    div_round_up(num_commands.max(1), SCAN_WG)
}
