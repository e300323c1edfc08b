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

//! A render pass: an ordered group of command buffers sharing one target
//! configuration and an execution priority.

use crate::handle::Handle;

/// A transient group of command buffers submitted together.
///
/// Allocated with a fixed buffer count up front so callers can record the
/// buffers from worker threads; the first buffer carries the pass-wide
/// clear, the last the pass-wide flush. The execution engine destroys the
/// pass right after its buffers are replayed.
#[derive(Debug)]
pub struct RenderPass {
    command_buffers: Vec<Handle>,
    priority: i32,
}

impl RenderPass {
    /// Creates a pass owning `command_buffers` in registration order.
    pub fn new(command_buffers: Vec<Handle>, priority: i32) -> Self {
        Self {
            command_buffers,
            priority,
        }
    }

    /// The pass's command buffers, in the order they replay.
    pub fn command_buffers(&self) -> &[Handle] {
        &self.command_buffers
    }

    /// Execution priority; higher replays earlier within the frame.
    pub fn priority(&self) -> i32 {
        self.priority
    }
}
