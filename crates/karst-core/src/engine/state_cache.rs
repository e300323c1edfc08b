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

//! The engine-local state cache used to elide redundant device calls.

use crate::api::{
    ShaderStage, MAX_CONST_BUFFER_COUNT, MAX_TEXTURE_UNIT_COUNT, MAX_VERTEX_STREAM_COUNT,
};
use crate::handle::Handle;

fn stage_index(stage: ShaderStage) -> usize {
    match stage {
        ShaderStage::Vertex => 0,
        ShaderStage::Fragment => 1,
    }
}

/// Replay-local memory of current device bindings.
///
/// Purely an optimization with no identity of its own: it tracks what the
/// device was last told so the engine can skip calls that would not change
/// anything. Pipeline and constant-buffer binds are deferred to the next
/// draw (most streams rebind far more than they draw); everything resets
/// when the pipeline state or vertex layout changes, since a new program
/// invalidates the slot meanings.
#[derive(Debug)]
pub(crate) struct ExecState {
    current_pipeline: Handle,
    current_layout: u32,
    pipeline_bound: bool,
    vertex_buffers: [Handle; MAX_VERTEX_STREAM_COUNT],
    pending_const: [[Handle; MAX_CONST_BUFFER_COUNT]; 2],
    bound_const: [[Handle; MAX_CONST_BUFFER_COUNT]; 2],
    bound_textures: [[Handle; MAX_TEXTURE_UNIT_COUNT]; 2],
    query_buffer: Handle,
    query_index: Option<u32>,
}

impl ExecState {
    pub(crate) fn new() -> Self {
        Self {
            current_pipeline: Handle::INVALID,
            current_layout: 0,
            pipeline_bound: false,
            vertex_buffers: [Handle::INVALID; MAX_VERTEX_STREAM_COUNT],
            pending_const: [[Handle::INVALID; MAX_CONST_BUFFER_COUNT]; 2],
            bound_const: [[Handle::INVALID; MAX_CONST_BUFFER_COUNT]; 2],
            bound_textures: [[Handle::INVALID; MAX_TEXTURE_UNIT_COUNT]; 2],
            query_buffer: Handle::INVALID,
            query_index: None,
        }
    }

    /// Makes `pipeline` + `layout` current. A change resets every binding
    /// cache; re-selecting the current pair is a no-op.
    pub(crate) fn select_pipeline(&mut self, pipeline: Handle, layout: u32) {
        if self.current_pipeline == pipeline && self.current_layout == layout {
            return;
        }
        self.current_pipeline = pipeline;
        self.current_layout = layout;
        self.pipeline_bound = false;
        self.vertex_buffers = [Handle::INVALID; MAX_VERTEX_STREAM_COUNT];
        self.pending_const = [[Handle::INVALID; MAX_CONST_BUFFER_COUNT]; 2];
        self.bound_const = [[Handle::INVALID; MAX_CONST_BUFFER_COUNT]; 2];
        self.bound_textures = [[Handle::INVALID; MAX_TEXTURE_UNIT_COUNT]; 2];
    }

    /// The pipeline to lazily bind at the next draw, if it is not bound
    /// yet.
    pub(crate) fn pipeline_to_bind(&self) -> Option<(Handle, u32)> {
        if !self.pipeline_bound && self.current_pipeline.is_valid() {
            Some((self.current_pipeline, self.current_layout))
        } else {
            None
        }
    }

    /// Marks the current pipeline as bound on the device.
    pub(crate) fn note_pipeline_bound(&mut self) {
        self.pipeline_bound = true;
    }

    /// Returns `true` if binding `buffer` to `stream` changes device state,
    /// updating the cache.
    pub(crate) fn vertex_buffer_changed(&mut self, buffer: Handle, stream: u32) -> bool {
        let slot = stream as usize;
        debug_assert!(slot < MAX_VERTEX_STREAM_COUNT, "vertex stream {stream} out of range");
        if self.vertex_buffers[slot] == buffer {
            return false;
        }
        self.vertex_buffers[slot] = buffer;
        true
    }

    /// Defers a constant-buffer binding to the next draw.
    pub(crate) fn set_pending_const(&mut self, stage: ShaderStage, slot: u32, buffer: Handle) {
        let slot = slot as usize;
        debug_assert!(slot < MAX_CONST_BUFFER_COUNT, "const-buffer slot out of range");
        self.pending_const[stage_index(stage)][slot] = buffer;
    }

    /// Drains the constant-buffer binds the next draw actually needs.
    pub(crate) fn const_buffers_to_bind(&mut self) -> Vec<(ShaderStage, u32, Handle)> {
        let mut binds = Vec::new();
        for (si, stage) in [(0, ShaderStage::Vertex), (1, ShaderStage::Fragment)] {
            for slot in 0..MAX_CONST_BUFFER_COUNT {
                let pending = self.pending_const[si][slot];
                if pending.is_valid() && pending != self.bound_const[si][slot] {
                    self.bound_const[si][slot] = pending;
                    binds.push((stage, slot as u32, pending));
                }
            }
        }
        binds
    }

    /// Returns `true` if binding `texture` to `unit` changes device state,
    /// updating the cache.
    pub(crate) fn texture_changed(&mut self, stage: ShaderStage, unit: u32, texture: Handle) -> bool {
        let unit = unit as usize;
        debug_assert!(unit < MAX_TEXTURE_UNIT_COUNT, "texture unit out of range");
        let cache = &mut self.bound_textures[stage_index(stage)];
        if cache[unit] == texture {
            return false;
        }
        cache[unit] = texture;
        true
    }

    /// Selects the query buffer subsequent indices refer to.
    pub(crate) fn set_query_buffer(&mut self, buffer: Handle) {
        debug_assert!(
            !self.query_buffer.is_valid(),
            "query buffer selected twice in one command buffer"
        );
        self.query_buffer = buffer;
    }

    /// Selects the query object bracketing subsequent draws.
    pub(crate) fn set_query_index(&mut self, index: u32) {
        self.query_index = Some(index);
    }

    /// The query bracket to open around the next draw, if any.
    pub(crate) fn query_bracket(&self) -> Option<(Handle, u32)> {
        match (self.query_buffer.is_valid(), self.query_index) {
            (true, Some(index)) => Some((self.query_buffer, index)),
            _ => None,
        }
    }
}
