// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The process-scoped render context: the whole public surface of the
//! submission pipeline.

use crate::api::{
    BufferDescriptor, BufferUsage, CullMode, DepthStencilDescriptor, PipelineStateDescriptor,
    PrimitiveType, QueryBufferDescriptor, RenderPassConfig, SamplerDescriptor, ScissorRect,
    TextureDescriptor, Viewport,
};
use crate::command::CommandBuffer;
use crate::config::{BackendApi, PipelineConfig, ResetParam};
use crate::engine::{self, render_loop, FrameStats, PipelineShared};
use crate::error::{DeviceError, InitError, ResourceError};
use crate::handle::{Handle, HandleKind, HandlePool};
use crate::pass::RenderPass;
use crate::queue::{immediate, ImmediateOp, SubmissionQueue};
use crate::traits::DeviceBackend;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// Producer-side pools, one per resource kind.
///
/// These never cross the execution boundary (the engine only ever sees
/// the handles), but they still sit behind locks so several producer
/// threads can create resources concurrently.
struct ResourceStore {
    vertex_buffers: Mutex<HandlePool<BufferDescriptor>>,
    index_buffers: Mutex<HandlePool<BufferDescriptor>>,
    const_buffers: Mutex<HandlePool<BufferDescriptor>>,
    textures: Mutex<HandlePool<TextureDescriptor>>,
    pipeline_states: Mutex<HandlePool<PipelineStateDescriptor>>,
    depth_stencil_states: Mutex<HandlePool<DepthStencilDescriptor>>,
    sampler_states: Mutex<HandlePool<SamplerDescriptor>>,
    query_buffers: Mutex<HandlePool<QueryBufferDescriptor>>,
}

impl ResourceStore {
    fn new() -> Self {
        Self {
            vertex_buffers: Mutex::new(HandlePool::new(HandleKind::VertexBuffer)),
            index_buffers: Mutex::new(HandlePool::new(HandleKind::IndexBuffer)),
            const_buffers: Mutex::new(HandlePool::new(HandleKind::ConstBuffer)),
            textures: Mutex::new(HandlePool::new(HandleKind::Texture)),
            pipeline_states: Mutex::new(HandlePool::new(HandleKind::PipelineState)),
            depth_stencil_states: Mutex::new(HandlePool::new(HandleKind::DepthStencilState)),
            sampler_states: Mutex::new(HandlePool::new(HandleKind::SamplerState)),
            query_buffers: Mutex::new(HandlePool::new(HandleKind::QueryBuffer)),
        }
    }
}

/// The explicitly constructed, process-scoped pipeline context.
///
/// Owns the selected [`DeviceBackend`], every resource pool, the
/// submission queue, and (when enabled) the dedicated render thread.
/// All methods take `&self`, so the context can be shared by reference
/// across producer threads; recording a single command buffer remains
/// single-threaded per buffer, distinct buffers may be recorded
/// concurrently.
///
/// There is deliberately no global instance: callers construct one
/// context per device and pass it where it is needed, which keeps backend
/// selection testable and permits independent contexts side by side.
#[derive(Debug)]
pub struct RenderContext {
    shared: Arc<PipelineShared>,
    resources: ResourceStore,
    render_thread: Option<JoinHandle<()>>,
    shut_down: bool,
}

impl std::fmt::Debug for ResourceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceStore").finish_non_exhaustive()
    }
}

impl RenderContext {
    /// Wraps an already-selected backend into a running pipeline.
    ///
    /// Backend crates call this from their `initialize` entry point after
    /// the API selection succeeded; the render thread (when configured)
    /// starts here and is joined on [`shutdown`](RenderContext::shutdown).
    pub fn new(backend: Box<dyn DeviceBackend>, config: &PipelineConfig) -> Result<Self, InitError> {
        let api = backend.api();
        let shared = Arc::new(PipelineShared {
            backend,
            queue: SubmissionQueue::new(config.frame_queue_depth),
            command_buffers: Mutex::new(HandlePool::new(HandleKind::CommandBuffer)),
            render_passes: Mutex::new(HandlePool::new(HandleKind::RenderPass)),
            stats: Mutex::new(FrameStats::default()),
        });
        let render_thread = if config.use_render_thread {
            Some(render_loop::spawn(Arc::clone(&shared))?)
        } else {
            None
        };
        log::info!(
            "render context up: api {api:?}, queue depth {}, render thread {}",
            config.frame_queue_depth,
            if render_thread.is_some() { "on" } else { "off" },
        );
        Ok(Self {
            shared,
            resources: ResourceStore::new(),
            render_thread,
            shut_down: false,
        })
    }

    /// The API of the active backend.
    pub fn api(&self) -> BackendApi {
        self.shared.backend.api()
    }

    /// Cumulative execution statistics.
    pub fn stats(&self) -> FrameStats {
        *self.shared.stats.lock().unwrap()
    }

    /// Routes a device operation to the engine's thread: through the
    /// immediate mailbox when the render thread is on, directly otherwise.
    fn device_op(&self, op: ImmediateOp) -> Result<(), DeviceError> {
        if self.render_thread.is_some() {
            self.shared
                .queue
                .submit_immediate(vec![op])
                .pop()
                .unwrap_or(Ok(()))
        } else {
            immediate::dispatch(&op, &*self.shared.backend)
        }
    }

    fn create_failed(kind: HandleKind, err: DeviceError) -> ResourceError {
        ResourceError::CreationFailed {
            kind,
            details: err.to_string(),
        }
    }

    // --- Buffers ---------------------------------------------------------

    fn validate_buffer_desc(desc: &BufferDescriptor) -> Result<(), ResourceError> {
        if desc.size == 0 {
            return Err(ResourceError::InvalidDescriptor {
                reason: "buffer size must be non-zero".to_owned(),
            });
        }
        Ok(())
    }

    /// Creates a vertex buffer.
    pub fn create_vertex_buffer(&self, desc: &BufferDescriptor) -> Result<Handle, ResourceError> {
        Self::validate_buffer_desc(desc)?;
        let handle = self.resources.vertex_buffers.lock().unwrap().alloc(desc.clone());
        match self.device_op(ImmediateOp::CreateVertexBuffer {
            handle,
            desc: desc.clone(),
        }) {
            Ok(()) => Ok(handle),
            Err(err) => {
                self.resources.vertex_buffers.lock().unwrap().free(handle);
                Err(Self::create_failed(HandleKind::VertexBuffer, err))
            }
        }
    }

    /// Uploads `data` into a vertex buffer at `offset`.
    pub fn update_vertex_buffer(
        &self,
        handle: Handle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), ResourceError> {
        let size = self.resources.vertex_buffers.lock().unwrap().get(handle).size;
        Self::check_range(handle, offset, data.len() as u64, size)?;
        self.device_op(ImmediateOp::UpdateVertexBuffer {
            handle,
            offset,
            data: data.to_vec(),
        })
        .map_err(|err| ResourceError::UploadFailed {
            handle,
            details: err.to_string(),
        })
    }

    /// Maps `len` bytes of a vertex buffer at `offset` for CPU writing.
    /// The writes flush to the device when the guard drops.
    pub fn map_vertex_buffer(
        &self,
        handle: Handle,
        offset: u64,
        len: u64,
    ) -> Result<MappedBuffer<'_>, ResourceError> {
        let desc = self.resources.vertex_buffers.lock().unwrap().get(handle).clone();
        self.map_impl(handle, &desc, offset, len)
    }

    /// Destroys a vertex buffer. Outstanding handles become stale
    /// immediately.
    pub fn destroy_vertex_buffer(&self, handle: Handle) {
        self.resources.vertex_buffers.lock().unwrap().free(handle);
        if let Err(err) = self.device_op(ImmediateOp::DestroyVertexBuffer { handle }) {
            log::error!("destroying vertex buffer failed: {err}");
        }
    }

    /// Creates an index buffer.
    pub fn create_index_buffer(&self, desc: &BufferDescriptor) -> Result<Handle, ResourceError> {
        Self::validate_buffer_desc(desc)?;
        let handle = self.resources.index_buffers.lock().unwrap().alloc(desc.clone());
        match self.device_op(ImmediateOp::CreateIndexBuffer {
            handle,
            desc: desc.clone(),
        }) {
            Ok(()) => Ok(handle),
            Err(err) => {
                self.resources.index_buffers.lock().unwrap().free(handle);
                Err(Self::create_failed(HandleKind::IndexBuffer, err))
            }
        }
    }

    /// Uploads `data` into an index buffer at `offset`.
    pub fn update_index_buffer(
        &self,
        handle: Handle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), ResourceError> {
        let size = self.resources.index_buffers.lock().unwrap().get(handle).size;
        Self::check_range(handle, offset, data.len() as u64, size)?;
        self.device_op(ImmediateOp::UpdateIndexBuffer {
            handle,
            offset,
            data: data.to_vec(),
        })
        .map_err(|err| ResourceError::UploadFailed {
            handle,
            details: err.to_string(),
        })
    }

    /// Maps `len` bytes of an index buffer at `offset` for CPU writing.
    pub fn map_index_buffer(
        &self,
        handle: Handle,
        offset: u64,
        len: u64,
    ) -> Result<MappedBuffer<'_>, ResourceError> {
        let desc = self.resources.index_buffers.lock().unwrap().get(handle).clone();
        self.map_impl(handle, &desc, offset, len)
    }

    /// Destroys an index buffer.
    pub fn destroy_index_buffer(&self, handle: Handle) {
        self.resources.index_buffers.lock().unwrap().free(handle);
        if let Err(err) = self.device_op(ImmediateOp::DestroyIndexBuffer { handle }) {
            log::error!("destroying index buffer failed: {err}");
        }
    }

    /// Creates a shader constant buffer.
    pub fn create_const_buffer(&self, desc: &BufferDescriptor) -> Result<Handle, ResourceError> {
        Self::validate_buffer_desc(desc)?;
        let handle = self.resources.const_buffers.lock().unwrap().alloc(desc.clone());
        match self.device_op(ImmediateOp::CreateConstBuffer {
            handle,
            desc: desc.clone(),
        }) {
            Ok(()) => Ok(handle),
            Err(err) => {
                self.resources.const_buffers.lock().unwrap().free(handle);
                Err(Self::create_failed(HandleKind::ConstBuffer, err))
            }
        }
    }

    /// Uploads `data` into a constant buffer at `offset`.
    pub fn update_const_buffer(
        &self,
        handle: Handle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), ResourceError> {
        let size = self.resources.const_buffers.lock().unwrap().get(handle).size;
        Self::check_range(handle, offset, data.len() as u64, size)?;
        self.device_op(ImmediateOp::UpdateConstBuffer {
            handle,
            offset,
            data: data.to_vec(),
        })
        .map_err(|err| ResourceError::UploadFailed {
            handle,
            details: err.to_string(),
        })
    }

    /// Destroys a constant buffer.
    pub fn destroy_const_buffer(&self, handle: Handle) {
        self.resources.const_buffers.lock().unwrap().free(handle);
        if let Err(err) = self.device_op(ImmediateOp::DestroyConstBuffer { handle }) {
            log::error!("destroying const buffer failed: {err}");
        }
    }

    fn check_range(
        handle: Handle,
        offset: u64,
        len: u64,
        size: u64,
    ) -> Result<(), ResourceError> {
        match offset.checked_add(len) {
            Some(end) if end <= size => Ok(()),
            _ => Err(ResourceError::OutOfBounds {
                handle,
                offset,
                len,
                size,
            }),
        }
    }

    fn map_impl(
        &self,
        handle: Handle,
        desc: &BufferDescriptor,
        offset: u64,
        len: u64,
    ) -> Result<MappedBuffer<'_>, ResourceError> {
        if !desc.usage.contains(BufferUsage::MAP_WRITE) {
            return Err(ResourceError::InvalidDescriptor {
                reason: format!("{handle:?} was not created with MAP_WRITE"),
            });
        }
        Self::check_range(handle, offset, len, desc.size)?;
        Ok(MappedBuffer {
            ctx: self,
            handle,
            offset,
            data: vec![0; len as usize],
        })
    }

    // --- Textures --------------------------------------------------------

    /// Creates a texture.
    pub fn create_texture(&self, desc: &TextureDescriptor) -> Result<Handle, ResourceError> {
        if desc.width == 0 || desc.height == 0 || desc.mip_levels == 0 {
            return Err(ResourceError::InvalidDescriptor {
                reason: "texture extents and mip count must be non-zero".to_owned(),
            });
        }
        let handle = self.resources.textures.lock().unwrap().alloc(desc.clone());
        match self.device_op(ImmediateOp::CreateTexture {
            handle,
            desc: desc.clone(),
        }) {
            Ok(()) => Ok(handle),
            Err(err) => {
                self.resources.textures.lock().unwrap().free(handle);
                Err(Self::create_failed(HandleKind::Texture, err))
            }
        }
    }

    /// Uploads the full texel payload of mip `level`.
    pub fn update_texture(
        &self,
        handle: Handle,
        level: u32,
        data: &[u8],
    ) -> Result<(), ResourceError> {
        let desc = self.resources.textures.lock().unwrap().get(handle).clone();
        let expected = crate::api::texture_size(desc.format, desc.width, desc.height, level);
        if level >= desc.mip_levels || data.len() as u64 != expected {
            return Err(ResourceError::OutOfBounds {
                handle,
                offset: u64::from(level),
                len: data.len() as u64,
                size: expected,
            });
        }
        self.device_op(ImmediateOp::UpdateTexture {
            handle,
            level,
            data: data.to_vec(),
        })
        .map_err(|err| ResourceError::UploadFailed {
            handle,
            details: err.to_string(),
        })
    }

    /// Destroys a texture.
    pub fn destroy_texture(&self, handle: Handle) {
        self.resources.textures.lock().unwrap().free(handle);
        if let Err(err) = self.device_op(ImmediateOp::DestroyTexture { handle }) {
            log::error!("destroying texture failed: {err}");
        }
    }

    // --- State objects ---------------------------------------------------

    /// Creates a pipeline state object.
    pub fn create_pipeline_state(
        &self,
        desc: &PipelineStateDescriptor,
    ) -> Result<Handle, ResourceError> {
        let handle = self.resources.pipeline_states.lock().unwrap().alloc(desc.clone());
        match self.device_op(ImmediateOp::CreatePipelineState {
            handle,
            desc: desc.clone(),
        }) {
            Ok(()) => Ok(handle),
            Err(err) => {
                self.resources.pipeline_states.lock().unwrap().free(handle);
                Err(Self::create_failed(HandleKind::PipelineState, err))
            }
        }
    }

    /// Destroys a pipeline state object.
    pub fn destroy_pipeline_state(&self, handle: Handle) {
        self.resources.pipeline_states.lock().unwrap().free(handle);
        if let Err(err) = self.device_op(ImmediateOp::DestroyPipelineState { handle }) {
            log::error!("destroying pipeline state failed: {err}");
        }
    }

    /// Creates a depth/stencil state object.
    pub fn create_depth_stencil_state(
        &self,
        desc: &DepthStencilDescriptor,
    ) -> Result<Handle, ResourceError> {
        let handle = self
            .resources
            .depth_stencil_states
            .lock()
            .unwrap()
            .alloc(desc.clone());
        match self.device_op(ImmediateOp::CreateDepthStencilState {
            handle,
            desc: desc.clone(),
        }) {
            Ok(()) => Ok(handle),
            Err(err) => {
                self.resources.depth_stencil_states.lock().unwrap().free(handle);
                Err(Self::create_failed(HandleKind::DepthStencilState, err))
            }
        }
    }

    /// Destroys a depth/stencil state object.
    pub fn destroy_depth_stencil_state(&self, handle: Handle) {
        self.resources.depth_stencil_states.lock().unwrap().free(handle);
        if let Err(err) = self.device_op(ImmediateOp::DestroyDepthStencilState { handle }) {
            log::error!("destroying depth/stencil state failed: {err}");
        }
    }

    /// Creates a sampler state object.
    pub fn create_sampler_state(&self, desc: &SamplerDescriptor) -> Result<Handle, ResourceError> {
        let handle = self.resources.sampler_states.lock().unwrap().alloc(desc.clone());
        match self.device_op(ImmediateOp::CreateSamplerState {
            handle,
            desc: desc.clone(),
        }) {
            Ok(()) => Ok(handle),
            Err(err) => {
                self.resources.sampler_states.lock().unwrap().free(handle);
                Err(Self::create_failed(HandleKind::SamplerState, err))
            }
        }
    }

    /// Destroys a sampler state object.
    pub fn destroy_sampler_state(&self, handle: Handle) {
        self.resources.sampler_states.lock().unwrap().free(handle);
        if let Err(err) = self.device_op(ImmediateOp::DestroySamplerState { handle }) {
            log::error!("destroying sampler state failed: {err}");
        }
    }

    // --- Query buffers ---------------------------------------------------

    /// Creates a query buffer with room for `max_object_count` objects.
    pub fn create_query_buffer(
        &self,
        desc: &QueryBufferDescriptor,
    ) -> Result<Handle, ResourceError> {
        if desc.max_object_count == 0 {
            return Err(ResourceError::InvalidDescriptor {
                reason: "query buffer needs at least one object".to_owned(),
            });
        }
        let handle = self.resources.query_buffers.lock().unwrap().alloc(desc.clone());
        match self.device_op(ImmediateOp::CreateQueryBuffer {
            handle,
            desc: desc.clone(),
        }) {
            Ok(()) => Ok(handle),
            Err(err) => {
                self.resources.query_buffers.lock().unwrap().free(handle);
                Err(Self::create_failed(HandleKind::QueryBuffer, err))
            }
        }
    }

    /// Destroys a query buffer.
    pub fn destroy_query_buffer(&self, handle: Handle) {
        self.resources.query_buffers.lock().unwrap().free(handle);
        if let Err(err) = self.device_op(ImmediateOp::DestroyQueryBuffer { handle }) {
            log::error!("destroying query buffer failed: {err}");
        }
    }

    /// Returns `true` once the result for `object_index` is available.
    pub fn query_is_ready(&self, handle: Handle, object_index: u32) -> bool {
        debug_assert!(self.resources.query_buffers.lock().unwrap().contains(handle));
        self.shared.backend.query_is_ready(handle, object_index)
    }

    /// Reads the result for `object_index`, or 0 if not ready.
    pub fn query_value(&self, handle: Handle, object_index: u32) -> i32 {
        debug_assert!(self.resources.query_buffers.lock().unwrap().contains(handle));
        self.shared.backend.query_value(handle, object_index)
    }

    // --- Render passes and command buffers -------------------------------

    /// Reserves a render pass with `buffer_count` command buffers.
    ///
    /// The first buffer carries the pass-wide clear, the last the
    /// pass-wide flush; buffers replay in the returned order. Both the
    /// pass and its buffers are transient; the execution engine frees
    /// them right after replay.
    pub fn allocate_render_pass(
        &self,
        config: &RenderPassConfig,
        buffer_count: usize,
    ) -> (Handle, Vec<Handle>) {
        assert!(buffer_count >= 1, "a render pass needs at least one command buffer");
        let mut buffers = Vec::with_capacity(buffer_count);
        {
            let mut pool = self.shared.command_buffers.lock().unwrap();
            for i in 0..buffer_count {
                buffers.push(pool.alloc(CommandBuffer::new(
                    config.clone(),
                    i == 0,
                    i == buffer_count - 1,
                )));
            }
        }
        let pass = self
            .shared
            .render_passes
            .lock()
            .unwrap()
            .alloc(RenderPass::new(buffers.clone(), config.priority));
        (pass, buffers)
    }

    /// Registers `pass` into the current frame, opening the frame slot if
    /// this is the first pass since the last `present`.
    pub fn begin_render_pass(&self, pass: Handle) {
        debug_assert!(self.shared.render_passes.lock().unwrap().contains(pass));
        self.shared.queue.register_pass(pass);
    }

    /// Closes `pass` on the recording side. Ordering is fixed at
    /// allocation, so this is bookkeeping-free; it exists so call sites
    /// read as a balanced bracket.
    pub fn end_render_pass(&self, pass: Handle) {
        debug_assert!(self.shared.render_passes.lock().unwrap().contains(pass));
    }

    fn with_command_buffer<R>(&self, handle: Handle, f: impl FnOnce(&mut CommandBuffer) -> R) -> R {
        let mut pool = self.shared.command_buffers.lock().unwrap();
        f(pool.get_mut(handle))
    }

    /// Starts recording into `cb`.
    pub fn begin_command_buffer(&self, cb: Handle) {
        self.with_command_buffer(cb, |b| b.begin());
    }

    /// Finishes recording into `cb`; the buffer becomes executable.
    pub fn end_command_buffer(&self, cb: Handle) {
        self.with_command_buffer(cb, |b| b.end());
    }

    /// Selects the pipeline state for subsequent draws in `cb`.
    pub fn set_pipeline_state(&self, cb: Handle, pipeline: Handle, layout: u32) {
        self.with_command_buffer(cb, |b| b.set_pipeline_state(pipeline, layout));
    }

    /// Sets the cull mode in `cb`.
    pub fn set_cull_mode(&self, cb: Handle, mode: CullMode) {
        self.with_command_buffer(cb, |b| b.set_cull_mode(mode));
    }

    /// Sets the scissor rectangle in `cb`.
    pub fn set_scissor_rect(&self, cb: Handle, rect: ScissorRect) {
        self.with_command_buffer(cb, |b| b.set_scissor_rect(rect));
    }

    /// Sets the viewport in `cb`.
    pub fn set_viewport(&self, cb: Handle, viewport: Viewport) {
        self.with_command_buffer(cb, |b| b.set_viewport(viewport));
    }

    /// Binds a vertex buffer to input `stream` in `cb`.
    pub fn set_vertex_data(&self, cb: Handle, buffer: Handle, stream: u32) {
        self.with_command_buffer(cb, |b| b.set_vertex_data(buffer, stream));
    }

    /// Binds the index buffer in `cb`.
    pub fn set_indices(&self, cb: Handle, buffer: Handle) {
        self.with_command_buffer(cb, |b| b.set_indices(buffer));
    }

    /// Binds a vertex-stage constant buffer in `cb`. An invalid handle
    /// leaves the previous binding unchanged.
    pub fn set_vertex_const_buffer(&self, cb: Handle, slot: u32, buffer: Handle) {
        self.with_command_buffer(cb, |b| b.set_vertex_const_buffer(slot, buffer));
    }

    /// Binds a fragment-stage constant buffer in `cb`.
    pub fn set_fragment_const_buffer(&self, cb: Handle, slot: u32, buffer: Handle) {
        self.with_command_buffer(cb, |b| b.set_fragment_const_buffer(slot, buffer));
    }

    /// Binds a vertex-stage texture in `cb`.
    pub fn set_vertex_texture(&self, cb: Handle, unit: u32, texture: Handle) {
        self.with_command_buffer(cb, |b| b.set_vertex_texture(unit, texture));
    }

    /// Binds a fragment-stage texture in `cb`.
    pub fn set_fragment_texture(&self, cb: Handle, unit: u32, texture: Handle) {
        self.with_command_buffer(cb, |b| b.set_fragment_texture(unit, texture));
    }

    /// Sets the depth/stencil state in `cb`.
    pub fn set_depth_stencil_state(&self, cb: Handle, state: Handle) {
        self.with_command_buffer(cb, |b| b.set_depth_stencil_state(state));
    }

    /// Sets the sampler state in `cb`.
    pub fn set_sampler_state(&self, cb: Handle, state: Handle) {
        self.with_command_buffer(cb, |b| b.set_sampler_state(state));
    }

    /// Selects the query buffer in `cb`.
    pub fn set_query_buffer(&self, cb: Handle, buffer: Handle) {
        self.with_command_buffer(cb, |b| b.set_query_buffer(buffer));
    }

    /// Selects the query object in `cb`.
    pub fn set_query_index(&self, cb: Handle, index: u32) {
        self.with_command_buffer(cb, |b| b.set_query_index(index));
    }

    /// Records a non-indexed draw into `cb`.
    pub fn draw_primitive(&self, cb: Handle, primitive: PrimitiveType, count: u32) {
        self.with_command_buffer(cb, |b| b.draw_primitive(primitive, count));
    }

    /// Records an indexed draw into `cb`.
    pub fn draw_indexed_primitive(
        &self,
        cb: Handle,
        primitive: PrimitiveType,
        count: u32,
        first_vertex: u32,
        start_index: u32,
    ) {
        self.with_command_buffer(cb, |b| {
            b.draw_indexed_primitive(primitive, count, first_vertex, start_index)
        });
    }

    /// Records a debug marker into `cb`.
    pub fn set_marker(&self, cb: Handle, text: &str) {
        self.with_command_buffer(cb, |b| b.set_marker(text));
    }

    // --- Frame boundary --------------------------------------------------

    /// Hands the frame's render passes to the execution engine.
    ///
    /// With the render thread on, this seals the frame and blocks only
    /// when more than the configured depth of frames is outstanding; this is the
    /// pipeline's sole flow-control point. Without it, the queue drains
    /// synchronously right here. A `present` with nothing recorded does
    /// nothing.
    pub fn present(&self) {
        if !self.shared.queue.finish_frame() {
            return;
        }
        if self.render_thread.is_some() {
            self.shared.queue.wait_for_capacity();
        } else {
            while let Some((number, passes)) = self.shared.queue.front_ready_frame() {
                engine::execute_frame(&self.shared, number, &passes);
            }
        }
    }

    /// Applies new surface parameters (e.g. window resize) between
    /// frames. Failures are logged; the next frame proceeds against the
    /// old surface.
    pub fn reset(&self, param: &ResetParam) {
        if let Err(err) = self.device_op(ImmediateOp::Reset(*param)) {
            log::error!("device reset failed: {err}");
        }
    }

    /// Stops the render thread (draining pending work) and releases the
    /// backend. Runs at most once; `Drop` calls it too.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        if let Some(handle) = self.render_thread.take() {
            self.shared.queue.request_exit();
            if handle.join().is_err() {
                log::error!("render thread panicked during shutdown");
            }
        }
        self.shared.backend.uninitialize();
        log::info!("render context shut down");
    }
}

impl Drop for RenderContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// A scoped CPU-side view into a mappable buffer.
///
/// Dereferences to `[u8]`; dropping the guard flushes the written bytes
/// through the backend, so the unmap is implicit and cannot be forgotten.
pub struct MappedBuffer<'a> {
    ctx: &'a RenderContext,
    handle: Handle,
    offset: u64,
    data: Vec<u8>,
}

impl Deref for MappedBuffer<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl DerefMut for MappedBuffer<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Drop for MappedBuffer<'_> {
    fn drop(&mut self) {
        let op = match self.handle.kind() {
            Some(HandleKind::VertexBuffer) => ImmediateOp::UpdateVertexBuffer {
                handle: self.handle,
                offset: self.offset,
                data: std::mem::take(&mut self.data),
            },
            Some(HandleKind::IndexBuffer) => ImmediateOp::UpdateIndexBuffer {
                handle: self.handle,
                offset: self.offset,
                data: std::mem::take(&mut self.data),
            },
            Some(HandleKind::ConstBuffer) => ImmediateOp::UpdateConstBuffer {
                handle: self.handle,
                offset: self.offset,
                data: std::mem::take(&mut self.data),
            },
            _ => {
                log::error!("mapped buffer with non-buffer handle {:?}", self.handle);
                return;
            }
        };
        if let Err(err) = self.ctx.device_op(op) {
            log::error!("unmap flush failed: {err}");
        }
    }
}

impl std::fmt::Debug for MappedBuffer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedBuffer")
            .field("handle", &self.handle)
            .field("offset", &self.offset)
            .field("len", &self.data.len())
            .finish()
    }
}
