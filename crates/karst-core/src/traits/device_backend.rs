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

//! The dispatch contract every graphics backend satisfies.

use crate::api::{
    BufferDescriptor, CullMode, DepthStencilDescriptor, PipelineStateDescriptor, PrimitiveType,
    QueryBufferDescriptor, RenderPassConfig, SamplerDescriptor, ScissorRect, ShaderStage,
    TextureDescriptor, Viewport,
};
use crate::config::{BackendApi, ResetParam};
use crate::error::DeviceError;
use crate::handle::Handle;
use std::fmt::Debug;

/// The complete set of device operations a backend implements.
///
/// Exactly one implementation is selected at initialization and installed
/// behind the context; every public operation of the pipeline forwards
/// through it, so no call site outside initialization ever branches on the
/// active API. Adding a backend means providing one more implementation of
/// this trait; nothing else changes.
///
/// All methods take `&self`: the execution engine and (through the
/// immediate channel) producer threads share the backend, so concrete
/// implementations use interior mutability for their native state.
///
/// Handles passed in are pool-issued and kind-correct by construction; the
/// backend keys its native objects by handle and reports a
/// [`DeviceError::InvalidHandle`] when one does not resolve. Replay-side
/// failures are logged by the engine and never abort the frame.
pub trait DeviceBackend: Send + Sync + Debug + 'static {
    /// The native API this backend drives.
    fn api(&self) -> BackendApi;

    /// Applies new surface parameters (e.g. after a window resize).
    /// Always executed on the engine's thread, between frames.
    fn reset(&self, param: &ResetParam) -> Result<(), DeviceError>;

    /// Releases every native object. Called once during shutdown, after
    /// the render loop has drained.
    fn uninitialize(&self);

    // --- Resource creation / update / destruction ------------------------

    /// Creates the native vertex buffer behind `handle`.
    ///
    /// ## Errors
    /// * `DeviceError` - If the native allocation fails.
    fn create_vertex_buffer(
        &self,
        handle: Handle,
        desc: &BufferDescriptor,
    ) -> Result<(), DeviceError>;

    /// Uploads `data` into the vertex buffer at byte `offset`.
    fn update_vertex_buffer(
        &self,
        handle: Handle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), DeviceError>;

    /// Destroys the vertex buffer behind `handle`.
    fn destroy_vertex_buffer(&self, handle: Handle) -> Result<(), DeviceError>;

    /// Creates the native index buffer behind `handle`.
    fn create_index_buffer(
        &self,
        handle: Handle,
        desc: &BufferDescriptor,
    ) -> Result<(), DeviceError>;

    /// Uploads `data` into the index buffer at byte `offset`.
    fn update_index_buffer(
        &self,
        handle: Handle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), DeviceError>;

    /// Destroys the index buffer behind `handle`.
    fn destroy_index_buffer(&self, handle: Handle) -> Result<(), DeviceError>;

    /// Creates the native constant buffer behind `handle`.
    fn create_const_buffer(
        &self,
        handle: Handle,
        desc: &BufferDescriptor,
    ) -> Result<(), DeviceError>;

    /// Uploads `data` into the constant buffer at byte `offset`.
    fn update_const_buffer(
        &self,
        handle: Handle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), DeviceError>;

    /// Destroys the constant buffer behind `handle`.
    fn destroy_const_buffer(&self, handle: Handle) -> Result<(), DeviceError>;

    /// Creates the native texture behind `handle`.
    fn create_texture(&self, handle: Handle, desc: &TextureDescriptor) -> Result<(), DeviceError>;

    /// Uploads texel `data` into mip `level` of the texture.
    fn update_texture(&self, handle: Handle, level: u32, data: &[u8]) -> Result<(), DeviceError>;

    /// Destroys the texture behind `handle`.
    fn destroy_texture(&self, handle: Handle) -> Result<(), DeviceError>;

    /// Creates the pipeline state object behind `handle`.
    ///
    /// ## Errors
    /// * `DeviceError` - If program construction fails. The caller treats
    ///   the handle as never-created; binding it draws nothing.
    fn create_pipeline_state(
        &self,
        handle: Handle,
        desc: &PipelineStateDescriptor,
    ) -> Result<(), DeviceError>;

    /// Destroys the pipeline state behind `handle`.
    fn destroy_pipeline_state(&self, handle: Handle) -> Result<(), DeviceError>;

    /// Creates the depth/stencil state behind `handle`.
    fn create_depth_stencil_state(
        &self,
        handle: Handle,
        desc: &DepthStencilDescriptor,
    ) -> Result<(), DeviceError>;

    /// Destroys the depth/stencil state behind `handle`.
    fn destroy_depth_stencil_state(&self, handle: Handle) -> Result<(), DeviceError>;

    /// Creates the sampler state behind `handle`.
    fn create_sampler_state(
        &self,
        handle: Handle,
        desc: &SamplerDescriptor,
    ) -> Result<(), DeviceError>;

    /// Destroys the sampler state behind `handle`.
    fn destroy_sampler_state(&self, handle: Handle) -> Result<(), DeviceError>;

    /// Creates the query buffer behind `handle`.
    fn create_query_buffer(
        &self,
        handle: Handle,
        desc: &QueryBufferDescriptor,
    ) -> Result<(), DeviceError>;

    /// Destroys the query buffer behind `handle`.
    fn destroy_query_buffer(&self, handle: Handle) -> Result<(), DeviceError>;

    /// Returns `true` once the result for `object_index` is available.
    fn query_is_ready(&self, handle: Handle, object_index: u32) -> bool;

    /// Reads the result for `object_index`, or 0 if not ready.
    fn query_value(&self, handle: Handle, object_index: u32) -> i32;

    // --- Replay-side operations ------------------------------------------

    /// Sets up the pass target and performs its configured clears.
    /// Called once per pass, for the first command buffer only.
    fn begin_pass(&self, config: &RenderPassConfig) -> Result<(), DeviceError>;

    /// Flushes the pass. Called once per pass, for the last command buffer
    /// only.
    fn end_pass(&self, config: &RenderPassConfig) -> Result<(), DeviceError>;

    /// Makes `pipeline` with vertex layout `layout` current.
    fn bind_pipeline_state(&self, pipeline: Handle, layout: u32) -> Result<(), DeviceError>;

    /// Applies a cull mode.
    fn set_cull_mode(&self, mode: CullMode) -> Result<(), DeviceError>;

    /// Applies a scissor rectangle; the all-zero rect disables the test.
    fn set_scissor_rect(&self, rect: ScissorRect) -> Result<(), DeviceError>;

    /// Applies a viewport; the all-zero viewport restores the pass default.
    fn set_viewport(&self, viewport: Viewport) -> Result<(), DeviceError>;

    /// Binds a vertex buffer to input `stream`.
    fn bind_vertex_buffer(&self, buffer: Handle, stream: u32) -> Result<(), DeviceError>;

    /// Binds the index buffer.
    fn bind_index_buffer(&self, buffer: Handle) -> Result<(), DeviceError>;

    /// Binds a constant buffer to `slot` of `stage`.
    fn bind_const_buffer(
        &self,
        stage: ShaderStage,
        slot: u32,
        buffer: Handle,
    ) -> Result<(), DeviceError>;

    /// Binds a texture to `unit` of `stage`.
    fn bind_texture(&self, stage: ShaderStage, unit: u32, texture: Handle)
        -> Result<(), DeviceError>;

    /// Applies a depth/stencil state.
    fn bind_depth_stencil_state(&self, state: Handle) -> Result<(), DeviceError>;

    /// Applies a sampler state. Expected before the texture bind it
    /// qualifies.
    fn bind_sampler_state(&self, state: Handle) -> Result<(), DeviceError>;

    /// Opens query `object_index` of `buffer` around subsequent draws.
    fn begin_query(&self, buffer: Handle, object_index: u32) -> Result<(), DeviceError>;

    /// Closes query `object_index` of `buffer`.
    fn end_query(&self, buffer: Handle, object_index: u32) -> Result<(), DeviceError>;

    /// Issues a non-indexed draw of `primitive_count` primitives.
    fn draw(&self, primitive: PrimitiveType, primitive_count: u32) -> Result<(), DeviceError>;

    /// Issues an indexed draw.
    fn draw_indexed(
        &self,
        primitive: PrimitiveType,
        primitive_count: u32,
        first_vertex: u32,
        start_index: u32,
    ) -> Result<(), DeviceError>;

    /// Emits a debug marker into the native stream, if supported.
    fn marker(&self, text: &str);

    /// Presents the completed frame (swap/flush).
    fn present_frame(&self) -> Result<(), DeviceError>;

    /// Invalidates per-frame caches after present.
    fn finish_frame(&self);
}
