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

//! Out-of-band device operations carried through the immediate mailbox.

use crate::api::{
    BufferDescriptor, DepthStencilDescriptor, PipelineStateDescriptor, QueryBufferDescriptor,
    SamplerDescriptor, TextureDescriptor,
};
use crate::config::ResetParam;
use crate::error::DeviceError;
use crate::handle::Handle;
use crate::traits::DeviceBackend;

/// One synchronous device operation published through the immediate
/// channel.
///
/// These are the calls that must execute on the engine's thread but cannot
/// wait for command-buffer replay: typically one-off resource setup a
/// command buffer depends on. The batch is owned data so it can cross the
/// producer/engine thread boundary.
#[derive(Debug)]
pub enum ImmediateOp {
    /// Create a vertex buffer.
    CreateVertexBuffer {
        /// Pool handle naming the new buffer.
        handle: Handle,
        /// Creation parameters.
        desc: BufferDescriptor,
    },
    /// Upload into a vertex buffer.
    UpdateVertexBuffer {
        /// The buffer to write.
        handle: Handle,
        /// Byte offset of the write.
        offset: u64,
        /// The bytes to write.
        data: Vec<u8>,
    },
    /// Destroy a vertex buffer.
    DestroyVertexBuffer {
        /// The buffer to destroy.
        handle: Handle,
    },
    /// Create an index buffer.
    CreateIndexBuffer {
        /// Pool handle naming the new buffer.
        handle: Handle,
        /// Creation parameters.
        desc: BufferDescriptor,
    },
    /// Upload into an index buffer.
    UpdateIndexBuffer {
        /// The buffer to write.
        handle: Handle,
        /// Byte offset of the write.
        offset: u64,
        /// The bytes to write.
        data: Vec<u8>,
    },
    /// Destroy an index buffer.
    DestroyIndexBuffer {
        /// The buffer to destroy.
        handle: Handle,
    },
    /// Create a constant buffer.
    CreateConstBuffer {
        /// Pool handle naming the new buffer.
        handle: Handle,
        /// Creation parameters.
        desc: BufferDescriptor,
    },
    /// Upload into a constant buffer.
    UpdateConstBuffer {
        /// The buffer to write.
        handle: Handle,
        /// Byte offset of the write.
        offset: u64,
        /// The bytes to write.
        data: Vec<u8>,
    },
    /// Destroy a constant buffer.
    DestroyConstBuffer {
        /// The buffer to destroy.
        handle: Handle,
    },
    /// Create a texture.
    CreateTexture {
        /// Pool handle naming the new texture.
        handle: Handle,
        /// Creation parameters.
        desc: TextureDescriptor,
    },
    /// Upload texels into one mip level.
    UpdateTexture {
        /// The texture to write.
        handle: Handle,
        /// Destination mip level.
        level: u32,
        /// The texels to write.
        data: Vec<u8>,
    },
    /// Destroy a texture.
    DestroyTexture {
        /// The texture to destroy.
        handle: Handle,
    },
    /// Create a pipeline state object.
    CreatePipelineState {
        /// Pool handle naming the new state.
        handle: Handle,
        /// Creation parameters.
        desc: PipelineStateDescriptor,
    },
    /// Destroy a pipeline state object.
    DestroyPipelineState {
        /// The state to destroy.
        handle: Handle,
    },
    /// Create a depth/stencil state object.
    CreateDepthStencilState {
        /// Pool handle naming the new state.
        handle: Handle,
        /// Creation parameters.
        desc: DepthStencilDescriptor,
    },
    /// Destroy a depth/stencil state object.
    DestroyDepthStencilState {
        /// The state to destroy.
        handle: Handle,
    },
    /// Create a sampler state object.
    CreateSamplerState {
        /// Pool handle naming the new state.
        handle: Handle,
        /// Creation parameters.
        desc: SamplerDescriptor,
    },
    /// Destroy a sampler state object.
    DestroySamplerState {
        /// The state to destroy.
        handle: Handle,
    },
    /// Create a query buffer.
    CreateQueryBuffer {
        /// Pool handle naming the new buffer.
        handle: Handle,
        /// Creation parameters.
        desc: QueryBufferDescriptor,
    },
    /// Destroy a query buffer.
    DestroyQueryBuffer {
        /// The buffer to destroy.
        handle: Handle,
    },
    /// Apply new surface parameters between frames.
    Reset(ResetParam),
}

/// The per-operation outcome handed back to the publisher.
pub type ImmediateResult = Result<(), DeviceError>;

/// Executes one immediate operation against the backend.
pub(crate) fn dispatch(op: &ImmediateOp, backend: &dyn DeviceBackend) -> ImmediateResult {
    match op {
        ImmediateOp::CreateVertexBuffer { handle, desc } => {
            backend.create_vertex_buffer(*handle, desc)
        }
        ImmediateOp::UpdateVertexBuffer {
            handle,
            offset,
            data,
        } => backend.update_vertex_buffer(*handle, *offset, data),
        ImmediateOp::DestroyVertexBuffer { handle } => backend.destroy_vertex_buffer(*handle),
        ImmediateOp::CreateIndexBuffer { handle, desc } => {
            backend.create_index_buffer(*handle, desc)
        }
        ImmediateOp::UpdateIndexBuffer {
            handle,
            offset,
            data,
        } => backend.update_index_buffer(*handle, *offset, data),
        ImmediateOp::DestroyIndexBuffer { handle } => backend.destroy_index_buffer(*handle),
        ImmediateOp::CreateConstBuffer { handle, desc } => {
            backend.create_const_buffer(*handle, desc)
        }
        ImmediateOp::UpdateConstBuffer {
            handle,
            offset,
            data,
        } => backend.update_const_buffer(*handle, *offset, data),
        ImmediateOp::DestroyConstBuffer { handle } => backend.destroy_const_buffer(*handle),
        ImmediateOp::CreateTexture { handle, desc } => backend.create_texture(*handle, desc),
        ImmediateOp::UpdateTexture {
            handle,
            level,
            data,
        } => backend.update_texture(*handle, *level, data),
        ImmediateOp::DestroyTexture { handle } => backend.destroy_texture(*handle),
        ImmediateOp::CreatePipelineState { handle, desc } => {
            backend.create_pipeline_state(*handle, desc)
        }
        ImmediateOp::DestroyPipelineState { handle } => backend.destroy_pipeline_state(*handle),
        ImmediateOp::CreateDepthStencilState { handle, desc } => {
            backend.create_depth_stencil_state(*handle, desc)
        }
        ImmediateOp::DestroyDepthStencilState { handle } => {
            backend.destroy_depth_stencil_state(*handle)
        }
        ImmediateOp::CreateSamplerState { handle, desc } => {
            backend.create_sampler_state(*handle, desc)
        }
        ImmediateOp::DestroySamplerState { handle } => backend.destroy_sampler_state(*handle),
        ImmediateOp::CreateQueryBuffer { handle, desc } => {
            backend.create_query_buffer(*handle, desc)
        }
        ImmediateOp::DestroyQueryBuffer { handle } => backend.destroy_query_buffer(*handle),
        ImmediateOp::Reset(param) => backend.reset(param),
    }
}
