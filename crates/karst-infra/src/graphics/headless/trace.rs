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

//! The typed device-call trace the headless backend records.

use karst_core::api::{CullMode, PrimitiveType, ScissorRect, ShaderStage, Viewport};
use karst_core::Handle;

/// One device call observed by the headless backend, in dispatch order.
///
/// The trace is what integration tests assert against: ordering,
/// redundant-bind elision, and immediate-batch placement are all visible
/// here without a real GPU.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent {
    /// A pass began (first buffer of the pass).
    BeginPass {
        /// The pass priority.
        priority: i32,
        /// Whether the color attachment was cleared on load.
        cleared: bool,
    },
    /// A pass flushed (last buffer of the pass).
    EndPass,
    /// A pipeline state reached the device.
    BindPipeline {
        /// The pipeline state bound.
        pipeline: Handle,
        /// The vertex layout paired with it.
        layout: u32,
    },
    /// A cull mode was applied.
    SetCullMode(CullMode),
    /// A scissor rect was applied.
    SetScissorRect(ScissorRect),
    /// A viewport was applied.
    SetViewport(Viewport),
    /// A vertex buffer was bound.
    BindVertexBuffer {
        /// The buffer bound.
        buffer: Handle,
        /// The input stream it feeds.
        stream: u32,
    },
    /// The index buffer was bound.
    BindIndexBuffer {
        /// The buffer bound.
        buffer: Handle,
    },
    /// A constant buffer reached a stage slot.
    BindConstBuffer {
        /// The target stage.
        stage: ShaderStage,
        /// The target slot.
        slot: u32,
        /// The buffer bound.
        buffer: Handle,
    },
    /// A texture reached a stage unit.
    BindTexture {
        /// The target stage.
        stage: ShaderStage,
        /// The target unit.
        unit: u32,
        /// The texture bound.
        texture: Handle,
    },
    /// A depth/stencil state was applied.
    BindDepthStencilState {
        /// The state applied.
        state: Handle,
    },
    /// A sampler state was applied.
    BindSamplerState {
        /// The state applied.
        state: Handle,
    },
    /// A query bracket opened.
    BeginQuery {
        /// The query buffer.
        buffer: Handle,
        /// The query object index.
        index: u32,
    },
    /// A query bracket closed.
    EndQuery {
        /// The query buffer.
        buffer: Handle,
        /// The query object index.
        index: u32,
    },
    /// A non-indexed draw dispatched.
    Draw {
        /// Primitive topology.
        primitive: PrimitiveType,
        /// Primitive count.
        count: u32,
        /// Vertices consumed.
        vertices: u32,
    },
    /// An indexed draw dispatched.
    DrawIndexed {
        /// Primitive topology.
        primitive: PrimitiveType,
        /// Primitive count.
        count: u32,
        /// Vertices consumed.
        vertices: u32,
        /// First vertex offset.
        first_vertex: u32,
        /// First index offset.
        start_index: u32,
    },
    /// A debug marker.
    Marker(String),
    /// The frame presented.
    Present,
    /// Per-frame caches invalidated after present.
    FinishFrame,
    /// The surface was reset.
    Reset {
        /// New width in pixels.
        width: u32,
        /// New height in pixels.
        height: u32,
    },
    /// A resource was created.
    Create {
        /// The new resource's handle.
        handle: Handle,
    },
    /// A resource was updated.
    Update {
        /// The resource written.
        handle: Handle,
        /// Bytes uploaded.
        bytes: usize,
    },
    /// A resource was destroyed.
    Destroy {
        /// The destroyed resource's handle.
        handle: Handle,
    },
}
