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

//! The flat word stream a command buffer records into, and its decoder.

use crate::api::{CullMode, PrimitiveType, ScissorRect, Viewport};
use crate::command::opcode::{Opcode, END_SENTINEL};
use crate::handle::Handle;

/// An append-only sequence of command words.
///
/// Every recorded operation is one opcode word followed by a fixed number
/// of argument words; no device call happens at record time. Marker text is
/// interned into a side table and referenced from the stream by index, so
/// the word stream itself stays plain integers.
#[derive(Debug, Default)]
pub struct CommandStream {
    words: Vec<u64>,
    markers: Vec<String>,
}

impl CommandStream {
    /// Creates an empty stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards all recorded words and markers.
    pub fn clear(&mut self) {
        self.words.clear();
        self.markers.clear();
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Number of words recorded so far, sentinel included.
    pub fn word_len(&self) -> usize {
        self.words.len()
    }

    fn push(&mut self, op: Opcode, args: &[u64]) {
        debug_assert_eq!(args.len(), op.arg_count(), "arity mismatch for {op:?}");
        self.words.push(op as u64);
        self.words.extend_from_slice(args);
    }

    /// Records the start of a session, discarding any previous recording.
    pub fn begin(&mut self) {
        self.clear();
        self.push(Opcode::Begin, &[]);
    }

    /// Records the end of the session and the stream terminator.
    pub fn end(&mut self) {
        self.push(Opcode::End, &[]);
        self.words.push(END_SENTINEL);
    }

    /// Records a pipeline-state selection.
    pub fn set_pipeline_state(&mut self, pipeline: Handle, layout: u32) {
        self.push(
            Opcode::SetPipelineState,
            &[pipeline.to_word(), u64::from(layout)],
        );
    }

    /// Records a cull-mode change.
    pub fn set_cull_mode(&mut self, mode: CullMode) {
        self.push(Opcode::SetCullMode, &[mode.to_word()]);
    }

    /// Records a scissor-rect change.
    pub fn set_scissor_rect(&mut self, rect: ScissorRect) {
        self.push(
            Opcode::SetScissorRect,
            &[
                rect.x as u64,
                rect.y as u64,
                u64::from(rect.width),
                u64::from(rect.height),
            ],
        );
    }

    /// Records a viewport change.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.push(
            Opcode::SetViewport,
            &[
                u64::from(viewport.x),
                u64::from(viewport.y),
                u64::from(viewport.width),
                u64::from(viewport.height),
            ],
        );
    }

    /// Records a vertex-buffer binding for `stream`.
    pub fn set_vertex_data(&mut self, buffer: Handle, stream: u32) {
        self.push(
            Opcode::SetVertexData,
            &[buffer.to_word(), u64::from(stream)],
        );
    }

    /// Records an index-buffer binding.
    pub fn set_indices(&mut self, buffer: Handle) {
        self.push(Opcode::SetIndices, &[buffer.to_word()]);
    }

    /// Records a vertex-stage constant-buffer binding.
    pub fn set_vertex_const_buffer(&mut self, slot: u32, buffer: Handle) {
        self.push(
            Opcode::SetVertexConstBuffer,
            &[u64::from(slot), buffer.to_word()],
        );
    }

    /// Records a fragment-stage constant-buffer binding.
    pub fn set_fragment_const_buffer(&mut self, slot: u32, buffer: Handle) {
        self.push(
            Opcode::SetFragmentConstBuffer,
            &[u64::from(slot), buffer.to_word()],
        );
    }

    /// Records a vertex-stage texture binding.
    pub fn set_vertex_texture(&mut self, unit: u32, texture: Handle) {
        self.push(
            Opcode::SetVertexTexture,
            &[u64::from(unit), texture.to_word()],
        );
    }

    /// Records a fragment-stage texture binding.
    pub fn set_fragment_texture(&mut self, unit: u32, texture: Handle) {
        self.push(
            Opcode::SetFragmentTexture,
            &[u64::from(unit), texture.to_word()],
        );
    }

    /// Records a depth/stencil-state change.
    pub fn set_depth_stencil_state(&mut self, state: Handle) {
        self.push(Opcode::SetDepthStencilState, &[state.to_word()]);
    }

    /// Records a sampler-state change.
    pub fn set_sampler_state(&mut self, state: Handle) {
        self.push(Opcode::SetSamplerState, &[state.to_word()]);
    }

    /// Records a query-buffer selection.
    pub fn set_query_buffer(&mut self, buffer: Handle) {
        self.push(Opcode::SetQueryBuffer, &[buffer.to_word()]);
    }

    /// Records a query-object selection.
    pub fn set_query_index(&mut self, index: u32) {
        self.push(Opcode::SetQueryIndex, &[u64::from(index)]);
    }

    /// Records a non-indexed draw.
    pub fn draw_primitive(&mut self, primitive: PrimitiveType, count: u32) {
        self.push(
            Opcode::DrawPrimitive,
            &[primitive.to_word(), u64::from(count)],
        );
    }

    /// Records an indexed draw.
    pub fn draw_indexed_primitive(
        &mut self,
        primitive: PrimitiveType,
        count: u32,
        first_vertex: u32,
        start_index: u32,
    ) {
        self.push(
            Opcode::DrawIndexedPrimitive,
            &[
                primitive.to_word(),
                u64::from(count),
                u64::from(first_vertex),
                u64::from(start_index),
            ],
        );
    }

    /// Interns `text` and records a marker referencing it.
    pub fn set_marker(&mut self, text: &str) {
        let index = self.markers.len() as u64;
        self.markers.push(text.to_owned());
        self.push(Opcode::SetMarker, &[index]);
    }

    /// Iterates the recorded stream as typed commands.
    pub fn iter(&self) -> CommandIter<'_> {
        CommandIter {
            words: &self.words,
            markers: &self.markers,
            pos: 0,
        }
    }
}

/// A decoded command, borrowed from the stream that recorded it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command<'a> {
    /// Start of the recording session.
    Begin,
    /// End of the recording session.
    End,
    /// Pipeline-state selection.
    SetPipelineState {
        /// The pipeline state to make current.
        pipeline: Handle,
        /// The vertex layout to pair it with.
        layout: u32,
    },
    /// Cull-mode change.
    SetCullMode(CullMode),
    /// Scissor-rect change.
    SetScissorRect(ScissorRect),
    /// Viewport change.
    SetViewport(Viewport),
    /// Vertex-buffer binding.
    SetVertexData {
        /// The buffer bound.
        buffer: Handle,
        /// The input stream it feeds.
        stream: u32,
    },
    /// Index-buffer binding.
    SetIndices {
        /// The buffer bound.
        buffer: Handle,
    },
    /// Vertex-stage constant-buffer binding.
    SetVertexConstBuffer {
        /// Destination slot.
        slot: u32,
        /// The buffer bound.
        buffer: Handle,
    },
    /// Fragment-stage constant-buffer binding.
    SetFragmentConstBuffer {
        /// Destination slot.
        slot: u32,
        /// The buffer bound.
        buffer: Handle,
    },
    /// Vertex-stage texture binding.
    SetVertexTexture {
        /// Destination unit.
        unit: u32,
        /// The texture bound.
        texture: Handle,
    },
    /// Fragment-stage texture binding.
    SetFragmentTexture {
        /// Destination unit.
        unit: u32,
        /// The texture bound.
        texture: Handle,
    },
    /// Depth/stencil-state change.
    SetDepthStencilState(Handle),
    /// Sampler-state change.
    SetSamplerState(Handle),
    /// Query-buffer selection.
    SetQueryBuffer(Handle),
    /// Query-object selection.
    SetQueryIndex(u32),
    /// Non-indexed draw.
    DrawPrimitive {
        /// Primitive topology.
        primitive: PrimitiveType,
        /// Primitive count.
        count: u32,
    },
    /// Indexed draw.
    DrawIndexedPrimitive {
        /// Primitive topology.
        primitive: PrimitiveType,
        /// Primitive count.
        count: u32,
        /// First vertex offset.
        first_vertex: u32,
        /// First index offset.
        start_index: u32,
    },
    /// Debug marker.
    SetMarker(&'a str),
}

/// Iterator decoding a [`CommandStream`] word by word.
///
/// Stops at the end sentinel or the end of the words. The stream is
/// producer-controlled, so a malformed word means the recorder itself is
/// broken; decoding panics rather than guessing.
#[derive(Debug)]
pub struct CommandIter<'a> {
    words: &'a [u64],
    markers: &'a [String],
    pos: usize,
}

impl<'a> Iterator for CommandIter<'a> {
    type Item = Command<'a>;

    fn next(&mut self) -> Option<Command<'a>> {
        let word = *self.words.get(self.pos)?;
        if word == END_SENTINEL {
            return None;
        }
        let op = Opcode::from_word(word)
            .unwrap_or_else(|| panic!("corrupt command stream: opcode word {word:#x}"));
        let args = &self.words[self.pos + 1..self.pos + 1 + op.arg_count()];
        self.pos += 1 + op.arg_count();

        Some(match op {
            Opcode::Begin => Command::Begin,
            Opcode::End => Command::End,
            Opcode::SetPipelineState => Command::SetPipelineState {
                pipeline: Handle::from_word(args[0]),
                layout: args[1] as u32,
            },
            Opcode::SetCullMode => Command::SetCullMode(
                CullMode::from_word(args[0]).expect("corrupt command stream: cull mode"),
            ),
            Opcode::SetScissorRect => Command::SetScissorRect(ScissorRect {
                x: args[0] as i32,
                y: args[1] as i32,
                width: args[2] as u32,
                height: args[3] as u32,
            }),
            Opcode::SetViewport => Command::SetViewport(Viewport {
                x: args[0] as u32,
                y: args[1] as u32,
                width: args[2] as u32,
                height: args[3] as u32,
            }),
            Opcode::SetVertexData => Command::SetVertexData {
                buffer: Handle::from_word(args[0]),
                stream: args[1] as u32,
            },
            Opcode::SetIndices => Command::SetIndices {
                buffer: Handle::from_word(args[0]),
            },
            Opcode::SetVertexConstBuffer => Command::SetVertexConstBuffer {
                slot: args[0] as u32,
                buffer: Handle::from_word(args[1]),
            },
            Opcode::SetFragmentConstBuffer => Command::SetFragmentConstBuffer {
                slot: args[0] as u32,
                buffer: Handle::from_word(args[1]),
            },
            Opcode::SetVertexTexture => Command::SetVertexTexture {
                unit: args[0] as u32,
                texture: Handle::from_word(args[1]),
            },
            Opcode::SetFragmentTexture => Command::SetFragmentTexture {
                unit: args[0] as u32,
                texture: Handle::from_word(args[1]),
            },
            Opcode::SetDepthStencilState => {
                Command::SetDepthStencilState(Handle::from_word(args[0]))
            }
            Opcode::SetSamplerState => Command::SetSamplerState(Handle::from_word(args[0])),
            Opcode::SetQueryBuffer => Command::SetQueryBuffer(Handle::from_word(args[0])),
            Opcode::SetQueryIndex => Command::SetQueryIndex(args[0] as u32),
            Opcode::DrawPrimitive => Command::DrawPrimitive {
                primitive: PrimitiveType::from_word(args[0])
                    .expect("corrupt command stream: primitive type"),
                count: args[1] as u32,
            },
            Opcode::DrawIndexedPrimitive => Command::DrawIndexedPrimitive {
                primitive: PrimitiveType::from_word(args[0])
                    .expect("corrupt command stream: primitive type"),
                count: args[1] as u32,
                first_vertex: args[2] as u32,
                start_index: args[3] as u32,
            },
            Opcode::SetMarker => {
                let index = args[0] as usize;
                Command::SetMarker(&self.markers[index])
            }
        })
    }
}
