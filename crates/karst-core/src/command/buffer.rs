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

//! A pooled command buffer: one recorded stream plus the pass context it
//! replays under.

use crate::api::{CullMode, PrimitiveType, RenderPassConfig, ScissorRect, Viewport};
use crate::command::stream::{CommandIter, CommandStream};
use crate::handle::Handle;

/// Recording lifecycle of a command buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Allocated, not yet recording.
    Initial,
    /// Between `begin` and `end`.
    Recording,
    /// Fully recorded, ready for the execution engine.
    Executable,
}

/// An append-only encoder for one command buffer of a render pass.
///
/// A command buffer belongs to exactly one pass and is fully recorded
/// (`begin`..`end`) before the pass is presented. Recording a single buffer
/// is single-threaded; distinct buffers of the same pass may be recorded
/// concurrently from distinct threads. The execution engine consumes and
/// frees the buffer after replay.
///
/// Verbs outside a `begin`..`end` bracket are a programming error; they
/// are debug-asserted, matching the fail-loud-in-debug misuse policy.
#[derive(Debug)]
pub struct CommandBuffer {
    stream: CommandStream,
    pass_config: RenderPassConfig,
    is_first_in_pass: bool,
    is_last_in_pass: bool,
    state: RecordState,
}

impl CommandBuffer {
    /// Creates a buffer bound to `pass_config`, with its position flags.
    pub fn new(pass_config: RenderPassConfig, is_first_in_pass: bool, is_last_in_pass: bool) -> Self {
        Self {
            stream: CommandStream::new(),
            pass_config,
            is_first_in_pass,
            is_last_in_pass,
            state: RecordState::Initial,
        }
    }

    /// The pass configuration this buffer replays under.
    pub fn pass_config(&self) -> &RenderPassConfig {
        &self.pass_config
    }

    /// `true` if this buffer performs the pass-wide target setup and clear.
    pub fn is_first_in_pass(&self) -> bool {
        self.is_first_in_pass
    }

    /// `true` if this buffer performs the pass-wide flush.
    pub fn is_last_in_pass(&self) -> bool {
        self.is_last_in_pass
    }

    /// Current recording state.
    pub fn state(&self) -> RecordState {
        self.state
    }

    fn recording(&mut self) -> &mut CommandStream {
        debug_assert_eq!(
            self.state,
            RecordState::Recording,
            "command-buffer verb outside begin/end"
        );
        &mut self.stream
    }

    /// Starts a recording session, discarding any previous content.
    pub fn begin(&mut self) {
        debug_assert_ne!(self.state, RecordState::Recording, "begin while recording");
        self.stream.begin();
        self.state = RecordState::Recording;
    }

    /// Ends the recording session; the buffer becomes executable.
    pub fn end(&mut self) {
        debug_assert_eq!(self.state, RecordState::Recording, "end while not recording");
        self.stream.end();
        self.state = RecordState::Executable;
    }

    /// Selects the pipeline state for subsequent draws.
    pub fn set_pipeline_state(&mut self, pipeline: Handle, layout: u32) {
        self.recording().set_pipeline_state(pipeline, layout);
    }

    /// Sets the cull mode.
    pub fn set_cull_mode(&mut self, mode: CullMode) {
        self.recording().set_cull_mode(mode);
    }

    /// Sets the scissor rectangle.
    pub fn set_scissor_rect(&mut self, rect: ScissorRect) {
        self.recording().set_scissor_rect(rect);
    }

    /// Sets the viewport.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.recording().set_viewport(viewport);
    }

    /// Binds a vertex buffer to an input stream.
    pub fn set_vertex_data(&mut self, buffer: Handle, stream: u32) {
        self.recording().set_vertex_data(buffer, stream);
    }

    /// Binds the index buffer.
    pub fn set_indices(&mut self, buffer: Handle) {
        self.recording().set_indices(buffer);
    }

    /// Binds a vertex-stage constant buffer. An invalid handle leaves the
    /// previous binding unchanged, allowing partial rebinding.
    pub fn set_vertex_const_buffer(&mut self, slot: u32, buffer: Handle) {
        if buffer.is_valid() {
            self.recording().set_vertex_const_buffer(slot, buffer);
        }
    }

    /// Binds a fragment-stage constant buffer. An invalid handle leaves the
    /// previous binding unchanged.
    pub fn set_fragment_const_buffer(&mut self, slot: u32, buffer: Handle) {
        if buffer.is_valid() {
            self.recording().set_fragment_const_buffer(slot, buffer);
        }
    }

    /// Binds a vertex-stage texture. An invalid handle leaves the previous
    /// binding unchanged.
    pub fn set_vertex_texture(&mut self, unit: u32, texture: Handle) {
        if texture.is_valid() {
            self.recording().set_vertex_texture(unit, texture);
        }
    }

    /// Binds a fragment-stage texture. An invalid handle leaves the
    /// previous binding unchanged.
    pub fn set_fragment_texture(&mut self, unit: u32, texture: Handle) {
        if texture.is_valid() {
            self.recording().set_fragment_texture(unit, texture);
        }
    }

    /// Sets the depth/stencil state.
    pub fn set_depth_stencil_state(&mut self, state: Handle) {
        self.recording().set_depth_stencil_state(state);
    }

    /// Sets the sampler state. Expected before the texture bind it
    /// qualifies.
    pub fn set_sampler_state(&mut self, state: Handle) {
        self.recording().set_sampler_state(state);
    }

    /// Selects the query buffer for subsequent query indices.
    pub fn set_query_buffer(&mut self, buffer: Handle) {
        self.recording().set_query_buffer(buffer);
    }

    /// Selects the query object bracketing subsequent draws.
    pub fn set_query_index(&mut self, index: u32) {
        self.recording().set_query_index(index);
    }

    /// Records a non-indexed draw of `count` primitives.
    pub fn draw_primitive(&mut self, primitive: PrimitiveType, count: u32) {
        self.recording().draw_primitive(primitive, count);
    }

    /// Records an indexed draw.
    pub fn draw_indexed_primitive(
        &mut self,
        primitive: PrimitiveType,
        count: u32,
        first_vertex: u32,
        start_index: u32,
    ) {
        self.recording()
            .draw_indexed_primitive(primitive, count, first_vertex, start_index);
    }

    /// Records a debug marker.
    pub fn set_marker(&mut self, text: &str) {
        self.recording().set_marker(text);
    }

    /// Iterates the recorded commands for replay.
    pub fn commands(&self) -> CommandIter<'_> {
        self.stream.iter()
    }

    /// Number of words recorded.
    pub fn word_len(&self) -> usize {
        self.stream.word_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::handle::HandleKind;

    fn buffer() -> CommandBuffer {
        CommandBuffer::new(RenderPassConfig::default(), true, true)
    }

    #[test]
    fn invalid_handle_bindings_are_skipped() {
        let tex = Handle::new(HandleKind::Texture, 0, 0);
        let mut cb = buffer();
        cb.begin();
        cb.set_fragment_texture(0, Handle::INVALID);
        cb.set_fragment_texture(1, tex);
        cb.set_vertex_const_buffer(2, Handle::INVALID);
        cb.end();

        let decoded: Vec<_> = cb.commands().collect();
        assert_eq!(
            decoded,
            vec![
                Command::Begin,
                Command::SetFragmentTexture {
                    unit: 1,
                    texture: tex
                },
                Command::End,
            ]
        );
    }

    #[test]
    fn lifecycle_reaches_executable() {
        let mut cb = buffer();
        assert_eq!(cb.state(), RecordState::Initial);
        cb.begin();
        assert_eq!(cb.state(), RecordState::Recording);
        cb.draw_primitive(PrimitiveType::LineList, 4);
        cb.end();
        assert_eq!(cb.state(), RecordState::Executable);
    }

    #[test]
    #[should_panic(expected = "verb outside begin/end")]
    fn recording_before_begin_is_a_misuse() {
        let mut cb = buffer();
        cb.draw_primitive(PrimitiveType::TriangleList, 1);
    }

    #[test]
    fn first_and_last_flags_stick() {
        let cb = CommandBuffer::new(RenderPassConfig::default(), true, false);
        assert!(cb.is_first_in_pass());
        assert!(!cb.is_last_in_pass());
    }
}
