// Copyright 2025 the Tiledraw Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tiledraw is an immediate-mode, GPU-driven 2D renderer built on [`wgpu`].
//!
//! A host application submits drawing calls (discs, capsules, boxes,
//! ellipses, triangles, pies, arcs, blurred boxes, textured quads, glyphs,
//! Bézier curves and grouped composites) between `begin_frame` and
//! `end_frame`. The calls are packed into compact parallel buffers,
//! distributed to screen tiles by a two-level GPU binning pass (region
//! filter, exclusive scan, tile scatter into per-tile linked lists) and
//! rasterized by one indirect draw that evaluates each primitive's signed
//! distance field per pixel.
//!
//! The host owns the window, the `wgpu` device/queue and the swap chain;
//! tiledraw owns everything in between:
//!
//! ```ignore
//! let mut renderer = tiledraw::Renderer::new(
//!     &device,
//!     &queue,
//!     tiledraw::RendererOptions {
//!         surface_format: wgpu::TextureFormat::Bgra8UnormSrgb,
//!         width: 1280,
//!         height: 720,
//!         allow_screenshot: false,
//!         use_cpu: false,
//!         font_data: std::fs::read("font.bin")?,
//!         atlas: None,
//!     },
//! )?;
//!
//! renderer.begin_frame();
//! renderer.draw_disc(640.0, 360.0, 120.0, tiledraw::Color::from_rgb8(242, 140, 168));
//! renderer.draw_text(16.0, 16.0, "hello", tiledraw::Color::WHITE);
//! let frame = surface.get_current_texture()?;
//! renderer.end_frame(&device, &queue, &frame.texture)?;
//! frame.present();
//! ```

mod color;
mod cpu_dispatch;
mod cpu_shader;
mod encoding;
mod font;
mod frame;
mod math;
mod recording;
mod render;
mod shaders;
mod tess;
mod wgpu_engine;

pub mod util;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use thiserror::Error;
use wgpu::{Device, Queue, Texture, TextureFormat};

pub use color::{linear_to_srgb, srgb_to_linear, Color};
pub use encoding::{
    CommandType, FillMode, GroupOp, MAX_CLIPS, MAX_COMMANDS, MAX_DRAWDATA, MAX_GLYPHS, MAX_NODES,
    REGION_SIZE, TILE_SIZE,
};
pub use font::{Alphabet, GlyphRecord, FIRST_GLYPH};
pub use frame::{Frame, QuadUv};
pub use math::Vec2;
pub use recording::{
    BindType, BufferProxy, Command, DrawParams, ImageFormat, ImageProxy, Recording, ResourceId,
    ResourceProxy, ShaderId,
};
pub use shaders::FullShaders;
pub use tess::TESSELATION_STACK_MAX;

use encoding::{ConfigUniform, SCAN_WG, SIMD_GROUP_SIZE};
use render::GpuResources;
use wgpu_engine::{ExternalResource, WgpuEngine};

/// Frames that may be in flight before `end_frame` blocks.
const FRAMES_IN_FLIGHT: u32 = 3;
/// The running GPU time is folded into an average every this many frames.
const GPU_TIME_WINDOW: u32 = 60;

/// Errors that can occur in tiledraw.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The device cannot sample the BC4-compressed font atlas.
    #[error("device does not support BC texture compression (required for the font atlas)")]
    UnsupportedDevice,
    /// The target surface format has no 8-bit RGBA/BGRA equivalent.
    #[error("couldn't find a supported texture format for the target surface")]
    UnsupportedSurfaceFormat,
    /// The baked font blob failed validation.
    #[error("font atlas blob is malformed: {0}")]
    InvalidFontData(&'static str),
    /// More texture-array slices than the command encoding can address.
    #[error("texture array slice count {0} exceeds the maximum of 256")]
    TooManySlices(u32),
    /// Used a buffer inside a recording while it was not available.
    /// Check if you have created it and not freed before its last usage.
    #[error("buffer '{0}' is not available but used for {1}")]
    UnavailableBufferUsed(&'static str, &'static str),
    /// Failed to async map a buffer.
    /// See [`wgpu::BufferAsyncError`] for more information.
    #[error("failed to async map a buffer")]
    BufferAsyncError(#[from] wgpu::BufferAsyncError),
}

#[allow(dead_code)]
pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;

/// Dimensions of the optional RGBA texture array sampled by quads.
#[derive(Clone, Copy, Debug)]
pub struct AtlasConfig {
    pub width: u32,
    pub height: u32,
    /// At most 256; each quad addresses one slice.
    pub num_slices: u32,
}

/// Construction parameters for a [`Renderer`].
pub struct RendererOptions {
    /// Format of the swap-chain textures handed to `end_frame`. An sRGB
    /// format moves the final conversion into the hardware store.
    pub surface_format: TextureFormat,
    /// Initial viewport size in pixels.
    pub width: u32,
    pub height: u32,
    /// Allocate the capture texture needed by [`Renderer::take_screenshot`].
    pub allow_screenshot: bool,
    /// Run the binning stages on the CPU instead of compute shaders.
    pub use_cpu: bool,
    /// Pre-baked font atlas blob (alphabet record + BC4 payload).
    pub font_data: Vec<u8>,
    /// Optional texture array for quad sampling.
    pub atlas: Option<AtlasConfig>,
}

/// Per-frame statistics.
#[derive(Clone, Copy, Debug, Default)]
pub struct Stats {
    pub frame_index: u32,
    /// Commands submitted in the last finished frame.
    pub num_draw_cmd: u32,
    pub peak_num_draw_cmd: u32,
    /// Queue latency of a frame's GPU work, averaged over the last window.
    pub gpu_time_ms: f32,
    /// Analytic footprint of the renderer-owned GPU resources, in bytes.
    pub gpu_memory_usage: u64,
}

/// Bytes needed for the renderer handle itself; GPU allocations come on top
/// and scale with the resolution.
pub fn min_memory_size() -> usize {
    std::mem::size_of::<Renderer>()
}

/// Counting semaphore pacing the CPU at most [`FRAMES_IN_FLIGHT`] frames
/// ahead of the GPU. Waiting is driven by device polls, since wgpu only
/// fires completion callbacks while the device is being maintained.
struct FrameSemaphore {
    count: Mutex<u32>,
}

impl FrameSemaphore {
    fn new(count: u32) -> Self {
        Self {
            count: Mutex::new(count),
        }
    }

    fn try_acquire(&self) -> bool {
        let mut count = self.count.lock().unwrap();
        if *count == 0 {
            return false;
        }
        *count -= 1;
        true
    }

    fn release(&self) {
        *self.count.lock().unwrap() += 1;
    }
}

struct ScreenshotState {
    texture: Option<Texture>,
    region: (u32, u32, u32, u32),
    armed: bool,
    data: Option<Vec<u8>>,
}

struct FrameStats {
    frame_index: u32,
    num_draw_cmd: u32,
    peak_num_draw_cmd: u32,
    accumulated_gpu_time: f32,
    average_gpu_time: f32,
}

/// The renderer: immediate-mode front end, GPU binning and tile
/// rasterization behind one handle.
pub struct Renderer {
    engine: WgpuEngine,
    shaders: FullShaders,
    resources: GpuResources,
    frame: Frame,
    alphabet: Arc<Alphabet>,
    surface_format: ImageFormat,
    width: u32,
    height: u32,
    num_slices: u32,
    atlas_config: Option<AtlasConfig>,
    /// Stored per the backbuffer convention: linear for an sRGB backbuffer,
    /// raw sRGB otherwise, so the pass clear can use it unconverted.
    clear_color: [f32; 4],
    culling_debug: bool,
    in_frame: bool,
    in_flight: Arc<FrameSemaphore>,
    gpu_time: Arc<AtomicU32>,
    screenshot: ScreenshotState,
    stats: FrameStats,
    allow_screenshot: bool,
}

#[cfg(not(target_arch = "wasm32"))]
static_assertions::assert_impl_all!(Renderer: Send);

impl Renderer {
    /// Creates a renderer for the given device. Fails on configuration
    /// errors: an unusable surface format, a device without BC texture
    /// support, a malformed font blob or an oversized atlas.
    pub fn new(device: &Device, queue: &Queue, options: RendererOptions) -> Result<Self> {
        let surface_format = ImageFormat::from_wgpu(options.surface_format)
            .ok_or(Error::UnsupportedSurfaceFormat)?;
        if !device
            .features()
            .contains(wgpu::Features::TEXTURE_COMPRESSION_BC)
        {
            return Err(Error::UnsupportedDevice);
        }
        if let Some(atlas) = &options.atlas {
            if atlas.num_slices > 256 {
                return Err(Error::TooManySlices(atlas.num_slices));
            }
        }
        let alphabet = Arc::new(Alphabet::from_blob(&options.font_data)?);
        let num_slices = options.atlas.as_ref().map_or(0, |a| a.num_slices);

        let mut engine = WgpuEngine::new(options.use_cpu);
        let shaders = FullShaders::new(device, &mut engine, options.surface_format);
        let resources = GpuResources::new(
            options.width,
            options.height,
            &alphabet,
            options
                .atlas
                .as_ref()
                .map(|a| (a.width, a.height, a.num_slices)),
        );
        engine.run_recording(
            device,
            queue,
            &render::record_font_upload(&alphabet, &resources),
            &[],
            "tiledraw_init",
        )?;

        let frame = Frame::new(alphabet.clone(), num_slices);
        let mut renderer = Self {
            engine,
            shaders,
            resources,
            frame,
            alphabet,
            surface_format,
            width: options.width,
            height: options.height,
            num_slices,
            atlas_config: options.atlas,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            culling_debug: false,
            in_frame: false,
            in_flight: Arc::new(FrameSemaphore::new(FRAMES_IN_FLIGHT)),
            gpu_time: Arc::new(AtomicU32::new(0)),
            screenshot: ScreenshotState {
                texture: None,
                region: (0, 0, options.width, options.height),
                armed: false,
                data: None,
            },
            stats: FrameStats {
                frame_index: 0,
                num_draw_cmd: 0,
                peak_num_draw_cmd: 0,
                accumulated_gpu_time: 0.0,
                average_gpu_time: 0.0,
            },
            allow_screenshot: options.allow_screenshot,
        };
        renderer.alloc_screenshot_resources(device);
        Ok(renderer)
    }

    /// Resizes the renderer output (call when the window size changes).
    pub fn resize(&mut self, device: &Device, width: u32, height: u32) {
        log::info!("resizing the framebuffer to {width}x{height}");
        self.width = width;
        self.height = height;
        self.resources.resize(width, height);
        self.screenshot.region = (0, 0, width, height);
        self.alloc_screenshot_resources(device);
        log::info!(
            "{}x{} tiles, {}x{} regions",
            self.resources.tiles_x,
            self.resources.tiles_y,
            self.resources.regions_x,
            self.resources.regions_y
        );
    }

    /// Opens command recording for a new frame and installs the
    /// full-viewport clip.
    pub fn begin_frame(&mut self) {
        if self.in_frame {
            log::error!("begin_frame while a frame is already open");
            debug_assert!(!self.in_frame, "unbalanced begin_frame");
        }
        self.stats.frame_index = self.stats.frame_index.wrapping_add(1);
        self.frame.begin(self.width, self.height);
        self.in_frame = true;
    }

    /// Ends recording: bins the frame's commands on the GPU, rasterizes the
    /// tiles into `drawable` and hands the submission off to the queue. The
    /// call blocks only when three frames are already in flight.
    pub fn end_frame(&mut self, device: &Device, queue: &Queue, drawable: &Texture) -> Result<()> {
        if !self.in_frame {
            log::error!("end_frame without begin_frame");
            debug_assert!(self.in_frame, "unbalanced end_frame");
            return Ok(());
        }
        if self.frame.has_open_group() {
            log::error!("end_frame with an open group; call end_group first");
            debug_assert!(!self.frame.has_open_group(), "open group at end_frame");
        }
        if drawable.width() != self.width || drawable.height() != self.height {
            log::error!(
                "drawable size {}x{} does not match the renderer ({}x{})",
                drawable.width(),
                drawable.height(),
                self.width,
                self.height
            );
            debug_assert!(false, "drawable/renderer size mismatch");
        }
        self.in_frame = false;

        let num_commands = self.frame.num_commands();
        self.stats.num_draw_cmd = num_commands;
        self.stats.peak_num_draw_cmd = self.stats.peak_num_draw_cmd.max(num_commands);
        self.stats.accumulated_gpu_time += f32::from_bits(self.gpu_time.load(Ordering::Relaxed));
        if self.stats.frame_index % GPU_TIME_WINDOW == 0 {
            self.stats.average_gpu_time =
                self.stats.accumulated_gpu_time / GPU_TIME_WINDOW as f32;
            self.stats.accumulated_gpu_time = 0.0;
        }

        let config = self.build_config(num_commands);
        let target = ImageProxy::new(self.width, self.height, self.surface_format);
        let recording = render::record_frame(
            &self.frame,
            &config,
            &self.resources,
            &self.shaders,
            target,
            self.clear_color.map(f64::from),
        );

        let view = drawable.create_view(&wgpu::TextureViewDescriptor::default());
        // Retiring a slot requires a completion callback, which wgpu only
        // delivers while the device is polled.
        while !self.in_flight.try_acquire() {
            let _ = device.poll(wgpu::PollType::Wait);
        }
        let submitted = Instant::now();
        if let Err(e) = self.engine.run_recording(
            device,
            queue,
            &recording,
            &[ExternalResource::Image(target, &view)],
            "tiledraw_frame",
        ) {
            self.in_flight.release();
            return Err(e);
        }
        let in_flight = self.in_flight.clone();
        let gpu_time = self.gpu_time.clone();
        queue.on_submitted_work_done(move || {
            gpu_time.store(
                submitted.elapsed().as_secs_f32().to_bits(),
                Ordering::Relaxed,
            );
            in_flight.release();
        });

        if self.screenshot.armed {
            self.capture_screenshot(device, queue, drawable)?;
        }
        Ok(())
    }

    fn build_config(&self, num_commands: u32) -> ConfigUniform {
        // The shader blends in linear space; undo the stored raw-sRGB
        // convention when the backbuffer is linear.
        let clear_color = if self.surface_format.is_srgb() {
            self.clear_color
        } else {
            let [r, g, b, a] = self.clear_color;
            [srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b), a]
        };
        ConfigUniform {
            clear_color,
            num_commands,
            max_nodes: MAX_NODES,
            tiles_x: self.resources.tiles_x,
            tiles_y: self.resources.tiles_y,
            regions_x: self.resources.regions_x,
            regions_y: self.resources.regions_y,
            num_elements_per_thread: render::scan_elements_per_thread(num_commands),
            aa_width: std::f32::consts::SQRT_2,
            screen_width: self.width as f32,
            screen_height: self.height as f32,
            culling_debug: self.culling_debug as u32,
            srgb_backbuffer: self.surface_format.is_srgb() as u32,
            font_height: self.alphabet.font_height(),
            _pad: [0; 3],
        }
    }

    /// Sets the clear color (sRGB, packed like every other color).
    pub fn set_clear_color(&mut self, color: Color) {
        let [r, g, b, a] = color.to_f32();
        self.clear_color = if self.surface_format.is_srgb() {
            [srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b), a]
        } else {
            [r, g, b, a]
        };
    }

    /// Tints every pixel of a non-empty tile; for inspecting the binning.
    pub fn set_culling_debug(&mut self, enabled: bool) {
        self.culling_debug = enabled;
    }

    pub fn stats(&self) -> Stats {
        Stats {
            frame_index: self.stats.frame_index,
            num_draw_cmd: self.stats.num_draw_cmd,
            peak_num_draw_cmd: self.stats.peak_num_draw_cmd,
            gpu_time_ms: self.stats.average_gpu_time * 1000.0,
            gpu_memory_usage: self.gpu_memory_usage(),
        }
    }

    fn gpu_memory_usage(&self) -> u64 {
        let per_frame = (MAX_COMMANDS * (8 + 4 + 4)
            + MAX_DRAWDATA * 4
            + MAX_CLIPS * 32
            + std::mem::size_of::<ConfigUniform>()) as u64;
        let regions = 3 * self.resources.num_regions() as u64 * MAX_COMMANDS as u64 * 4;
        let num_tiles = (self.resources.tiles_x * self.resources.tiles_y) as u64;
        let tiles = num_tiles * 8 + MAX_NODES as u64 * 8 + 32;
        let font = (MAX_GLYPHS * std::mem::size_of::<font::FontChar>()) as u64
            + self.alphabet.atlas_data().len() as u64;
        let atlas = self
            .atlas_config
            .as_ref()
            .map_or(0, |a| a.width as u64 * a.height as u64 * 4 * a.num_slices as u64);
        let capture = self
            .screenshot
            .texture
            .as_ref()
            .map_or(0, |_| self.width as u64 * self.height as u64 * 4);
        per_frame * FRAMES_IN_FLIGHT as u64 + regions + tiles + font + atlas + capture
    }

    // ------------------------------------------------------------------
    // Atlas
    // ------------------------------------------------------------------

    /// Replaces one slice of the texture array with B8G8R8A8 sRGB pixels.
    ///
    /// Slices are stored in shared memory from the GPU's point of view:
    /// rewriting a slice that the GPU is currently sampling is a data race
    /// the caller must prevent.
    pub fn upload_slice(
        &mut self,
        device: &Device,
        queue: &Queue,
        slice_index: u32,
        pixels: &[u8],
    ) -> Result<()> {
        if slice_index >= self.num_slices {
            log::error!("slice {slice_index} out of bounds ({} slices)", self.num_slices);
            debug_assert!(false, "slice index out of bounds");
            return Ok(());
        }
        let expected =
            self.resources.atlas_tex.width as usize * self.resources.atlas_tex.height as usize * 4;
        if pixels.len() != expected {
            log::error!(
                "slice upload of {} bytes does not match the atlas ({expected} bytes)",
                pixels.len()
            );
            debug_assert!(false, "slice data size mismatch");
            return Ok(());
        }
        let mut recording = Recording::default();
        recording.write_image_layer(self.resources.atlas_tex, slice_index, pixels.to_vec());
        self.engine
            .run_recording(device, queue, &recording, &[], "tiledraw_upload_slice")
    }

    // ------------------------------------------------------------------
    // Screenshots
    // ------------------------------------------------------------------

    fn alloc_screenshot_resources(&mut self, device: &Device) {
        if !self.allow_screenshot {
            return;
        }
        self.screenshot.texture = Some(device.create_texture(&wgpu::TextureDescriptor {
            label: Some("tiledraw capture"),
            size: wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::COPY_DST,
            format: self.surface_format.to_wgpu(),
            view_formats: &[],
        }));
    }

    /// Restricts subsequent captures to a rectangle of the viewport.
    pub fn set_capture_region(&mut self, x: u32, y: u32, width: u32, height: u32) {
        if x + width > self.width || y + height > self.height {
            log::error!("capture region cannot be bigger than the render target");
            debug_assert!(false, "capture region out of bounds");
            return;
        }
        self.screenshot.region = (x, y, width, height);
    }

    pub fn capture_region(&self) -> (u32, u32, u32, u32) {
        self.screenshot.region
    }

    /// Arms a one-shot capture of the next `end_frame`. Requires
    /// `allow_screenshot` at construction.
    pub fn take_screenshot(&mut self) {
        if self.screenshot.texture.is_none() {
            log::error!("set allow_screenshot to true when creating the renderer");
            debug_assert!(false, "screenshot support not enabled");
            return;
        }
        self.screenshot.armed = true;
    }

    /// Returns the pixels of the last armed capture (4 bytes per pixel,
    /// capture-region rows tightly packed), consuming them.
    pub fn take_screenshot_data(&mut self) -> Option<Vec<u8>> {
        self.screenshot.data.take()
    }

    fn capture_screenshot(
        &mut self,
        device: &Device,
        queue: &Queue,
        drawable: &Texture,
    ) -> Result<()> {
        let Some(capture) = &self.screenshot.texture else {
            return Ok(());
        };
        let (x, y, width, height) = self.screenshot.region;
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("tiledraw_screenshot"),
        });
        encoder.copy_texture_to_texture(
            drawable.as_image_copy(),
            capture.as_image_copy(),
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_row = (width * 4).div_ceil(align) * align;
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tiledraw_readback"),
            size: padded_row as u64 * height as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: capture,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: None,
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        queue.submit(Some(encoder.finish()));

        let slice = readback.slice(..);
        let (sender, receiver) = futures_intrusive::channel::shared::oneshot_channel();
        slice.map_async(wgpu::MapMode::Read, move |v| sender.send(v).unwrap());
        util::block_on_wgpu(device, receiver.receive()).expect("channel was closed")?;
        let mapped = slice.get_mapped_range();
        let mut pixels = vec![0u8; width as usize * height as usize * 4];
        for row in 0..height as usize {
            let src = row * padded_row as usize;
            let dst = row * width as usize * 4;
            pixels[dst..dst + width as usize * 4]
                .copy_from_slice(&mapped[src..src + width as usize * 4]);
        }
        drop(mapped);
        readback.unmap();
        self.screenshot.data = Some(pixels);
        self.screenshot.armed = false;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Drawing
    // ------------------------------------------------------------------

    fn in_frame_guard(&self) -> bool {
        if !self.in_frame {
            log::error!("drawing outside begin_frame/end_frame");
            debug_assert!(self.in_frame, "drawing outside a frame");
            return false;
        }
        true
    }

    /// Direct access to the frame under construction.
    pub fn frame_mut(&mut self) -> &mut Frame {
        &mut self.frame
    }

    pub fn set_cliprect(&mut self, min_x: f32, min_y: f32, max_x: f32, max_y: f32) {
        if self.in_frame_guard() {
            self.frame.set_cliprect(min_x, min_y, max_x, max_y);
        }
    }

    pub fn set_clipdisc(&mut self, cx: f32, cy: f32, radius: f32) {
        if self.in_frame_guard() {
            self.frame.set_clipdisc(cx, cy, radius);
        }
    }

    pub fn begin_group(&mut self, smooth_blend: bool, smoothness: f32, outline_width: f32) {
        if self.in_frame_guard() {
            self.frame.begin_group(smooth_blend, smoothness, outline_width);
        }
    }

    pub fn end_group(&mut self, outline_color: Color) {
        if self.in_frame_guard() {
            self.frame.end_group(outline_color);
        }
    }

    pub fn draw_disc(&mut self, cx: f32, cy: f32, radius: f32, color: Color) {
        if self.in_frame_guard() {
            self.frame.draw_disc(cx, cy, radius, color);
        }
    }

    pub fn draw_ring(&mut self, cx: f32, cy: f32, radius: f32, thickness: f32, color: Color) {
        if self.in_frame_guard() {
            self.frame.draw_ring(cx, cy, radius, thickness, color);
        }
    }

    pub fn draw_disc_gradient(
        &mut self,
        cx: f32,
        cy: f32,
        radius: f32,
        outer_color: Color,
        inner_color: Color,
    ) {
        if self.in_frame_guard() {
            self.frame
                .draw_disc_gradient(cx, cy, radius, outer_color, inner_color);
        }
    }

    pub fn draw_line(&mut self, ax: f32, ay: f32, bx: f32, by: f32, width: f32, color: Color) {
        if self.in_frame_guard() {
            self.frame.draw_line(ax, ay, bx, by, width, color);
        }
    }

    pub fn draw_capsule(&mut self, ax: f32, ay: f32, bx: f32, by: f32, radius: f32, color: Color) {
        if self.in_frame_guard() {
            self.frame.draw_capsule(ax, ay, bx, by, radius, color);
        }
    }

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
        if self.in_frame_guard() {
            self.frame
                .draw_capsule_gradient(ax, ay, bx, by, radius, color_a, color_b);
        }
    }

    #[allow(clippy::too_many_arguments)]
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
        if self.in_frame_guard() {
            self.frame
                .draw_oriented_box(ax, ay, bx, by, width, roundness, color);
        }
    }

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
        if self.in_frame_guard() {
            self.frame
                .draw_oriented_rect(ax, ay, bx, by, width, thickness, color);
        }
    }

    pub fn draw_ellipse(&mut self, ax: f32, ay: f32, bx: f32, by: f32, width: f32, color: Color) {
        if self.in_frame_guard() {
            self.frame.draw_ellipse(ax, ay, bx, by, width, color);
        }
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
        if self.in_frame_guard() {
            self.frame
                .draw_ellipse_ring(ax, ay, bx, by, width, thickness, color);
        }
    }

    pub fn draw_triangle(&mut self, vertices: [Vec2; 3], roundness: f32, color: Color) {
        if self.in_frame_guard() {
            self.frame.draw_triangle(vertices, roundness, color);
        }
    }

    pub fn draw_triangle_ring(&mut self, vertices: [Vec2; 3], thickness: f32, color: Color) {
        if self.in_frame_guard() {
            self.frame.draw_triangle_ring(vertices, thickness, color);
        }
    }

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
        if self.in_frame_guard() {
            self.frame
                .draw_sector(cx, cy, radius, start_angle, sweep_angle, color);
        }
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
        if self.in_frame_guard() {
            self.frame
                .draw_sector_ring(cx, cy, radius, start_angle, sweep_angle, thickness, color);
        }
    }

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
        if self.in_frame_guard() {
            self.frame
                .draw_arc(cx, cy, dx, dy, aperture, radius, thickness, color);
        }
    }

    pub fn draw_box(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, radius: f32, color: Color) {
        if self.in_frame_guard() {
            self.frame.draw_box(x0, y0, x1, y1, radius, color);
        }
    }

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
        if self.in_frame_guard() {
            self.frame
                .draw_blurred_box(cx, cy, width, height, roundness, color);
        }
    }

    pub fn draw_char(&mut self, x: f32, y: f32, c: char, color: Color) {
        if self.in_frame_guard() {
            self.frame.draw_char(x, y, c, color);
        }
    }

    pub fn draw_text(&mut self, x: f32, y: f32, text: &str, color: Color) {
        if self.in_frame_guard() {
            self.frame.draw_text(x, y, text, color);
        }
    }

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
        if self.in_frame_guard() {
            self.frame.draw_quad(x0, y0, x1, y1, uv, slice_index, color);
        }
    }

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
        if self.in_frame_guard() {
            self.frame
                .draw_oriented_quad(cx, cy, width, height, angle, uv, slice_index, color);
        }
    }

    pub fn draw_quadratic_bezier(
        &mut self,
        control_points: [Vec2; 3],
        width: f32,
        color: Color,
    ) -> Option<u32> {
        if !self.in_frame_guard() {
            return Some(0);
        }
        self.frame.draw_quadratic_bezier(control_points, width, color)
    }

    pub fn draw_cubic_bezier(
        &mut self,
        control_points: [Vec2; 4],
        width: f32,
        color: Color,
    ) -> Option<u32> {
        if !self.in_frame_guard() {
            return Some(0);
        }
        self.frame.draw_cubic_bezier(control_points, width, color)
    }

    pub fn text_height(&self) -> f32 {
        self.alphabet.font_height()
    }

    pub fn text_width(&self, text: &str) -> f32 {
        self.alphabet.text_width(text)
    }
}

// Unused constant checks keep the CPU and WGSL sides honest about the values
// they both hardcode.
const _: () = assert!(SCAN_WG == 256);
const _: () = assert!(SIMD_GROUP_SIZE == 32);
