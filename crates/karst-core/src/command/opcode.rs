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

//! Operation codes of the recorded command stream.

/// Terminator word appended by `end()`; replay stops here.
pub const END_SENTINEL: u64 = u64::MAX;

/// The tagged operation codes of the command stream.
///
/// Each opcode word is followed by a fixed number of argument words given
/// by [`Opcode::arg_count`]. The numbering groups related operations in
/// decades, leaving room to extend a group without renumbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u64)]
pub enum Opcode {
    /// Start of a recording session.
    Begin = 1,
    /// End of a recording session.
    End = 2,

    /// Bind a vertex buffer to a stream. Args: buffer, stream.
    SetVertexData = 11,
    /// Bind the index buffer. Args: buffer.
    SetIndices = 12,
    /// Select the query buffer. Args: buffer.
    SetQueryBuffer = 13,
    /// Select the active query object. Args: index.
    SetQueryIndex = 14,

    /// Select the pipeline state. Args: pipeline, vertex layout.
    SetPipelineState = 21,
    /// Apply a depth/stencil state. Args: state.
    SetDepthStencilState = 22,
    /// Apply a sampler state. Args: state.
    SetSamplerState = 23,
    /// Apply a cull mode. Args: mode.
    SetCullMode = 24,
    /// Apply a scissor rect. Args: x, y, width, height.
    SetScissorRect = 25,
    /// Apply a viewport. Args: x, y, width, height.
    SetViewport = 26,

    /// Bind a vertex-stage constant buffer. Args: slot, buffer.
    SetVertexConstBuffer = 31,
    /// Bind a fragment-stage constant buffer. Args: slot, buffer.
    SetFragmentConstBuffer = 32,
    /// Bind a vertex-stage texture. Args: unit, texture.
    SetVertexTexture = 33,
    /// Bind a fragment-stage texture. Args: unit, texture.
    SetFragmentTexture = 34,

    /// Non-indexed draw. Args: primitive, count.
    DrawPrimitive = 41,
    /// Indexed draw. Args: primitive, count, first vertex, start index.
    DrawIndexedPrimitive = 42,

    /// Debug marker. Args: marker-table index.
    SetMarker = 51,
}

impl Opcode {
    /// Number of argument words following the opcode word.
    pub fn arg_count(self) -> usize {
        match self {
            Opcode::Begin | Opcode::End => 0,
            Opcode::SetIndices
            | Opcode::SetQueryBuffer
            | Opcode::SetQueryIndex
            | Opcode::SetDepthStencilState
            | Opcode::SetSamplerState
            | Opcode::SetCullMode
            | Opcode::SetMarker => 1,
            Opcode::SetVertexData
            | Opcode::SetPipelineState
            | Opcode::SetVertexConstBuffer
            | Opcode::SetFragmentConstBuffer
            | Opcode::SetVertexTexture
            | Opcode::SetFragmentTexture
            | Opcode::DrawPrimitive => 2,
            Opcode::SetScissorRect | Opcode::SetViewport | Opcode::DrawIndexedPrimitive => 4,
        }
    }

    /// Decodes an opcode word.
    pub fn from_word(word: u64) -> Option<Self> {
        Some(match word {
            1 => Opcode::Begin,
            2 => Opcode::End,
            11 => Opcode::SetVertexData,
            12 => Opcode::SetIndices,
            13 => Opcode::SetQueryBuffer,
            14 => Opcode::SetQueryIndex,
            21 => Opcode::SetPipelineState,
            22 => Opcode::SetDepthStencilState,
            23 => Opcode::SetSamplerState,
            24 => Opcode::SetCullMode,
            25 => Opcode::SetScissorRect,
            26 => Opcode::SetViewport,
            31 => Opcode::SetVertexConstBuffer,
            32 => Opcode::SetFragmentConstBuffer,
            33 => Opcode::SetVertexTexture,
            34 => Opcode::SetFragmentTexture,
            41 => Opcode::DrawPrimitive,
            42 => Opcode::DrawIndexedPrimitive,
            51 => Opcode::SetMarker,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_opcode_round_trips() {
        let all = [
            Opcode::Begin,
            Opcode::End,
            Opcode::SetVertexData,
            Opcode::SetIndices,
            Opcode::SetQueryBuffer,
            Opcode::SetQueryIndex,
            Opcode::SetPipelineState,
            Opcode::SetDepthStencilState,
            Opcode::SetSamplerState,
            Opcode::SetCullMode,
            Opcode::SetScissorRect,
            Opcode::SetViewport,
            Opcode::SetVertexConstBuffer,
            Opcode::SetFragmentConstBuffer,
            Opcode::SetVertexTexture,
            Opcode::SetFragmentTexture,
            Opcode::DrawPrimitive,
            Opcode::DrawIndexedPrimitive,
            Opcode::SetMarker,
        ];
        for op in all {
            assert_eq!(Opcode::from_word(op as u64), Some(op));
        }
        assert_eq!(Opcode::from_word(0), None);
        assert_eq!(Opcode::from_word(END_SENTINEL), None);
    }
}
