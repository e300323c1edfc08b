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

//! Render-pass target configuration: load/store operations, attachments,
//! and the pass-wide settings shared by every command buffer in a pass.

use crate::api::common::{Color, Viewport};
use crate::handle::Handle;
use std::borrow::Cow;

/// Describes the operation to perform on an attachment at the start of a
/// render pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LoadOp<V> {
    /// The existing contents of the attachment are loaded into the pass.
    Load,
    /// The attachment is cleared to the given value before the pass begins.
    Clear(V),
}

/// Describes the operation to perform on an attachment at the end of a
/// render pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreOp {
    /// The results of the pass are stored to the attachment's memory.
    Store,
    /// The results are discarded, leaving the attachment undefined.
    /// A performance win on tile-based architectures.
    Discard,
}

/// The load and store operations for a single attachment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Operations<V> {
    /// The operation performed at the beginning of the pass.
    pub load: LoadOp<V>,
    /// The operation performed at the end of the pass.
    pub store: StoreOp,
}

impl<V> Default for Operations<V> {
    fn default() -> Self {
        Self {
            load: LoadOp::Load,
            store: StoreOp::Store,
        }
    }
}

/// The color attachment of a render pass.
#[derive(Clone, Debug)]
pub struct ColorAttachment {
    /// The texture rendered to. [`Handle::INVALID`] targets the backbuffer.
    pub target: Handle,
    /// Load/store operations for the attachment.
    pub ops: Operations<Color>,
}

impl Default for ColorAttachment {
    fn default() -> Self {
        Self {
            target: Handle::INVALID,
            ops: Operations {
                load: LoadOp::Clear(Color::BLACK),
                store: StoreOp::Store,
            },
        }
    }
}

/// The depth/stencil attachment of a render pass. Stencil is cleared to
/// zero whenever depth is cleared.
#[derive(Clone, Debug)]
pub struct DepthStencilAttachment {
    /// The depth/stencil texture. [`Handle::INVALID`] targets the default
    /// depth buffer.
    pub target: Handle,
    /// Load/store operations for the depth aspect.
    pub depth_ops: Operations<f32>,
}

impl Default for DepthStencilAttachment {
    fn default() -> Self {
        Self {
            target: Handle::INVALID,
            depth_ops: Operations {
                load: LoadOp::Clear(1.0),
                store: StoreOp::Discard,
            },
        }
    }
}

/// Target configuration shared by every command buffer in a render pass.
///
/// Only the first buffer in a pass performs the configured clears and only
/// the last performs the end-of-pass flush, so several buffers can be
/// recorded in parallel without duplicating either.
#[derive(Clone, Debug, Default)]
pub struct RenderPassConfig {
    /// An optional debug label for the pass.
    pub label: Option<Cow<'static, str>>,
    /// The color attachment.
    pub color: ColorAttachment,
    /// The optional depth/stencil attachment.
    pub depth_stencil: Option<DepthStencilAttachment>,
    /// Initial viewport; `None` uses the target's full extent.
    pub viewport: Option<Viewport>,
    /// Execution priority relative to other passes in the same frame.
    /// Higher priorities replay first; ties keep submission order.
    pub priority: i32,
}
