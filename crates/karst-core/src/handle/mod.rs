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

//! Opaque, generation-tagged handles for pooled pipeline resources.

mod pool;

pub use pool::HandlePool;

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of resource a [`Handle`] refers to.
///
/// Every pool issues handles of exactly one kind; presenting a handle to a
/// pool of a different kind is a programming error and fails loudly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum HandleKind {
    /// A vertex buffer.
    VertexBuffer = 1,
    /// An index buffer.
    IndexBuffer = 2,
    /// A shader constant (uniform) buffer.
    ConstBuffer = 3,
    /// A texture.
    Texture = 4,
    /// A pipeline state object.
    PipelineState = 5,
    /// A depth/stencil state object.
    DepthStencilState = 6,
    /// A sampler state object.
    SamplerState = 7,
    /// A query buffer.
    QueryBuffer = 8,
    /// A recorded command buffer.
    CommandBuffer = 9,
    /// A render pass grouping command buffers.
    RenderPass = 10,
}

impl HandleKind {
    fn from_bits(bits: u8) -> Option<Self> {
        Some(match bits {
            1 => HandleKind::VertexBuffer,
            2 => HandleKind::IndexBuffer,
            3 => HandleKind::ConstBuffer,
            4 => HandleKind::Texture,
            5 => HandleKind::PipelineState,
            6 => HandleKind::DepthStencilState,
            7 => HandleKind::SamplerState,
            8 => HandleKind::QueryBuffer,
            9 => HandleKind::CommandBuffer,
            10 => HandleKind::RenderPass,
            _ => return None,
        })
    }
}

/// An opaque identifier for a pooled resource.
///
/// A handle packs a [`HandleKind`], a slot index, and a generation counter
/// into a single word. Callers hold handles by value and never dereference
/// them; the generation solves the ABA problem: once a slot is freed and
/// recycled, handles minted for the old occupant stop resolving instead of
/// silently aliasing the new one.
///
/// The all-zero value is [`Handle::INVALID`]. Binding operations treat an
/// invalid handle as "leave the previous binding unchanged", which lets
/// callers rebind only the slots they care about.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u64);

const INDEX_BITS: u64 = 32;
const GENERATION_BITS: u64 = 16;
const INDEX_MASK: u64 = (1 << INDEX_BITS) - 1;
const GENERATION_MASK: u64 = (1 << GENERATION_BITS) - 1;
const KIND_SHIFT: u64 = INDEX_BITS + GENERATION_BITS;

impl Handle {
    /// The reserved "no resource" handle.
    pub const INVALID: Handle = Handle(0);

    /// Builds a handle from its parts. Only pools mint handles.
    pub(crate) fn new(kind: HandleKind, index: u32, generation: u16) -> Self {
        debug_assert!(index < u32::MAX, "handle index space exhausted");
        // Index is stored off-by-one so the all-zero word stays reserved
        // for INVALID.
        let word = (u64::from(index) + 1)
            | (u64::from(generation) << INDEX_BITS)
            | ((kind as u64) << KIND_SHIFT);
        Handle(word)
    }

    /// Returns `true` unless this is [`Handle::INVALID`].
    pub fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// The slot index within the issuing pool.
    ///
    /// # Panics
    /// Panics if called on [`Handle::INVALID`].
    pub fn index(self) -> u32 {
        assert!(self.is_valid(), "index() on invalid handle");
        ((self.0 & INDEX_MASK) - 1) as u32
    }

    /// The generation the slot had when this handle was issued.
    pub fn generation(self) -> u16 {
        ((self.0 >> INDEX_BITS) & GENERATION_MASK) as u16
    }

    /// The resource kind encoded in the handle, if any.
    pub fn kind(self) -> Option<HandleKind> {
        HandleKind::from_bits((self.0 >> KIND_SHIFT) as u8)
    }

    /// The raw word form used by the command stream.
    pub fn to_word(self) -> u64 {
        self.0
    }

    /// Rebuilds a handle from its command-stream word form.
    pub fn from_word(word: u64) -> Self {
        Handle(word)
    }
}

impl Default for Handle {
    fn default() -> Self {
        Handle::INVALID
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return write!(f, "Handle(INVALID)");
        }
        match self.kind() {
            Some(kind) => write!(
                f,
                "Handle({kind:?}#{}g{})",
                self.index(),
                self.generation()
            ),
            None => write!(f, "Handle(raw {:#x})", self.0),
        }
    }
}
