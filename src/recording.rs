// Copyright 2025 the Tiledraw Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A list of GPU commands assembled on the CPU and replayed by the engine.

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ShaderId(pub usize);

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(pub NonZeroU64);

impl ResourceId {
    pub fn next() -> Self {
        // We initialize with 1 so that the conversion below succeeds
        static ID_COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(NonZeroU64::new(ID_COUNTER.fetch_add(1, Ordering::Relaxed)).unwrap())
    }
}

/// List of [`Command`]s for an engine to execute in order.
#[derive(Default)]
pub struct Recording {
    pub commands: Vec<Command>,
}

/// Proxy used as a handle to a buffer.
#[derive(Clone, Copy)]
pub struct BufferProxy {
    pub size: u64,
    pub id: ResourceId,
    pub name: &'static str,
}

#[derive(Copy, Clone, PartialEq, Eq)]
pub enum ImageFormat {
    Rgba8,
    Rgba8Srgb,
    Bgra8,
    Bgra8Srgb,
    /// Single-channel block compressed, 8 bytes per 4x4 block.
    Bc4,
}

impl ImageFormat {
    pub fn to_wgpu(self) -> wgpu::TextureFormat {
        match self {
            Self::Rgba8 => wgpu::TextureFormat::Rgba8Unorm,
            Self::Rgba8Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            Self::Bgra8 => wgpu::TextureFormat::Bgra8Unorm,
            Self::Bgra8Srgb => wgpu::TextureFormat::Bgra8UnormSrgb,
            Self::Bc4 => wgpu::TextureFormat::Bc4RUnorm,
        }
    }

    pub fn from_wgpu(format: wgpu::TextureFormat) -> Option<Self> {
        match format {
            wgpu::TextureFormat::Rgba8Unorm => Some(Self::Rgba8),
            wgpu::TextureFormat::Rgba8UnormSrgb => Some(Self::Rgba8Srgb),
            wgpu::TextureFormat::Bgra8Unorm => Some(Self::Bgra8),
            wgpu::TextureFormat::Bgra8UnormSrgb => Some(Self::Bgra8Srgb),
            _ => None,
        }
    }

    pub fn is_srgb(self) -> bool {
        matches!(self, Self::Rgba8Srgb | Self::Bgra8Srgb)
    }

    /// Bytes per row of texels (per row of blocks for compressed formats).
    pub fn bytes_per_row(self, width: u32) -> u32 {
        match self {
            Self::Bc4 => width / 4 * 8,
            _ => width * 4,
        }
    }
}

/// Proxy used as a handle to an image or image array.
#[derive(Clone, Copy)]
pub struct ImageProxy {
    pub width: u32,
    pub height: u32,
    pub layers: u32,
    /// Arrays bind as `texture_2d_array` even with a single layer.
    pub array: bool,
    pub format: ImageFormat,
    pub id: ResourceId,
}

#[derive(Clone, Copy)]
pub enum ResourceProxy {
    Buffer(BufferProxy),
    Image(ImageProxy),
    /// The engine's shared linear-filtering sampler.
    Sampler,
}

/// Parameters of a rasterization pass targeting an externally provided image.
pub struct DrawParams {
    pub shader_id: ShaderId,
    pub instance_count: u32,
    pub vertex_count: u32,
    /// When set, the instance count is read from this buffer as
    /// `DrawIndirectArgs` instead of `instance_count`.
    pub indirect: Option<BufferProxy>,
    pub resources: Vec<ResourceProxy>,
    pub target: ImageProxy,
    pub clear_color: Option<[f64; 4]>,
}

/// Single command inside a [`Recording`] to get executed by an engine.
pub enum Command {
    /// Commands the data to be uploaded to the given buffer.
    Upload(BufferProxy, Vec<u8>),
    /// Commands the data to be uploaded to the given buffer as a uniform.
    UploadUniform(BufferProxy, Vec<u8>),
    /// Writes a rectangle of one layer of the given image.
    WriteImage(ImageProxy, [u32; 4], u32, Vec<u8>),
    /// Commands to zero the buffer from an offset on for a length of the
    /// given size. If the size is [None], it clears until the end.
    Clear(BufferProxy, u64, Option<u64>),
    /// Commands to free the buffer.
    FreeBuffer(BufferProxy),
    /// Commands to free the image.
    FreeImage(ImageProxy),
    Dispatch(ShaderId, (u32, u32, u32), Vec<ResourceProxy>),
    Draw(DrawParams),
}

/// The type of resource that will be bound to a slot in a shader.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum BindType {
    /// A storage buffer with read/write access.
    Buffer,
    /// A storage buffer with read only access.
    BufReadOnly,
    /// A small storage buffer to be used as uniforms.
    Uniform,
    /// A sampled image.
    ImageRead(ImageFormat),
    /// A sampled image array.
    ImageArrayRead(ImageFormat),
    /// A filtering sampler.
    Sampler,
}

impl Recording {
    /// Appends a [`Command`] to the back of the [`Recording`].
    pub fn push(&mut self, cmd: Command) {
        self.commands.push(cmd);
    }

    /// Commands to upload the given data to a new buffer with the given name.
    /// Returns a [`BufferProxy`] to the buffer.
    pub fn upload(&mut self, name: &'static str, data: impl Into<Vec<u8>>) -> BufferProxy {
        let data = data.into();
        let buf_proxy = BufferProxy::new(data.len() as u64, name);
        self.push(Command::Upload(buf_proxy, data));
        buf_proxy
    }

    /// Commands to upload the given data to a new buffer as a uniform with
    /// the given name. Returns a [`BufferProxy`] to the buffer.
    pub fn upload_uniform(&mut self, name: &'static str, data: impl Into<Vec<u8>>) -> BufferProxy {
        let data = data.into();
        let buf_proxy = BufferProxy::new(data.len() as u64, name);
        self.push(Command::UploadUniform(buf_proxy, data));
        buf_proxy
    }

    /// Writes a full layer of the given image.
    pub fn write_image_layer(&mut self, proxy: ImageProxy, layer: u32, data: impl Into<Vec<u8>>) {
        self.push(Command::WriteImage(
            proxy,
            [0, 0, proxy.width, proxy.height],
            layer,
            data.into(),
        ));
    }

    pub fn dispatch<R>(&mut self, shader: ShaderId, wg_size: (u32, u32, u32), resources: R)
    where
        R: IntoIterator,
        R::Item: Into<ResourceProxy>,
    {
        let r = resources.into_iter().map(|r| r.into()).collect();
        self.push(Command::Dispatch(shader, wg_size, r));
    }

    /// Issue a draw call.
    pub fn draw(&mut self, params: DrawParams) {
        self.push(Command::Draw(params));
    }

    /// Commands to zero out the whole buffer.
    pub fn clear_all(&mut self, buf: BufferProxy) {
        self.push(Command::Clear(buf, 0, None));
    }

    /// Commands to free the given buffer.
    pub fn free_buffer(&mut self, buf: BufferProxy) {
        self.push(Command::FreeBuffer(buf));
    }

    /// Commands to free the given image.
    pub fn free_image(&mut self, image: ImageProxy) {
        self.push(Command::FreeImage(image));
    }

    /// Commands to free the given resource.
    pub fn free_resource(&mut self, resource: ResourceProxy) {
        match resource {
            ResourceProxy::Buffer(buf) => self.free_buffer(buf),
            ResourceProxy::Image(image) => self.free_image(image),
            ResourceProxy::Sampler => {}
        }
    }

    /// Returns [`Command`]s of the recording.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }
}

impl BufferProxy {
    pub fn new(size: u64, name: &'static str) -> Self {
        let id = ResourceId::next();
        Self {
            // Zero-sized buffers aren't valid bindings.
            size: size.max(16),
            id,
            name,
        }
    }
}

impl ImageProxy {
    pub fn new(width: u32, height: u32, format: ImageFormat) -> Self {
        let id = ResourceId::next();
        Self {
            width,
            height,
            layers: 1,
            array: false,
            format,
            id,
        }
    }

    pub fn new_array(width: u32, height: u32, layers: u32, format: ImageFormat) -> Self {
        let id = ResourceId::next();
        Self {
            width,
            height,
            layers,
            array: true,
            format,
            id,
        }
    }
}

impl From<BufferProxy> for ResourceProxy {
    fn from(value: BufferProxy) -> Self {
        Self::Buffer(value)
    }
}

impl From<ImageProxy> for ResourceProxy {
    fn from(value: ImageProxy) -> Self {
        Self::Image(value)
    }
}
