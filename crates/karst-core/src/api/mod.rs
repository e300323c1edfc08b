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

//! Public, backend-agnostic data types: enums, descriptors, and render-pass
//! configuration shared by recording code and backends.

pub mod common;
pub mod pass;
pub mod resource;

pub use common::{
    Color, CullMode, PrimitiveType, ScissorRect, ShaderStage, Viewport, MAX_CONST_BUFFER_COUNT,
    MAX_TEXTURE_UNIT_COUNT, MAX_VERTEX_STREAM_COUNT,
};
pub use pass::{
    ColorAttachment, DepthStencilAttachment, LoadOp, Operations, RenderPassConfig, StoreOp,
};
pub use resource::{
    texture_extents, texture_size, AddressMode, BlendMode, BufferDescriptor, BufferUsage,
    CompareFunc, DepthStencilDescriptor, FilterMode, PipelineStateDescriptor,
    QueryBufferDescriptor, SamplerDescriptor, TextureDescriptor, TextureFormat,
};
