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

//! Small shared enums and plain-data types used throughout the pipeline.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Number of constant-buffer slots per shader stage.
pub const MAX_CONST_BUFFER_COUNT: usize = 8;
/// Number of texture units per shader stage.
pub const MAX_TEXTURE_UNIT_COUNT: usize = 8;
/// Number of vertex input streams.
pub const MAX_VERTEX_STREAM_COUNT: usize = 4;

/// The primitive topology of a draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveType {
    /// Independent triangles; 3 vertices per primitive.
    TriangleList,
    /// A triangle strip; 2 + count vertices.
    TriangleStrip,
    /// Independent lines; 2 vertices per primitive.
    LineList,
}

impl PrimitiveType {
    /// Number of vertices a draw of `primitive_count` primitives consumes.
    pub fn vertex_count(self, primitive_count: u32) -> u32 {
        match self {
            PrimitiveType::TriangleList => primitive_count * 3,
            PrimitiveType::TriangleStrip => primitive_count + 2,
            PrimitiveType::LineList => primitive_count * 2,
        }
    }

    pub(crate) fn to_word(self) -> u64 {
        match self {
            PrimitiveType::TriangleList => 0,
            PrimitiveType::TriangleStrip => 1,
            PrimitiveType::LineList => 2,
        }
    }

    pub(crate) fn from_word(word: u64) -> Option<Self> {
        Some(match word {
            0 => PrimitiveType::TriangleList,
            1 => PrimitiveType::TriangleStrip,
            2 => PrimitiveType::LineList,
            _ => return None,
        })
    }
}

/// Face culling applied to subsequent draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CullMode {
    /// No culling.
    None,
    /// Cull clockwise-wound faces.
    Clockwise,
    /// Cull counter-clockwise-wound faces.
    CounterClockwise,
}

impl CullMode {
    pub(crate) fn to_word(self) -> u64 {
        match self {
            CullMode::None => 0,
            CullMode::Clockwise => 1,
            CullMode::CounterClockwise => 2,
        }
    }

    pub(crate) fn from_word(word: u64) -> Option<Self> {
        Some(match word {
            0 => CullMode::None,
            1 => CullMode::Clockwise,
            2 => CullMode::CounterClockwise,
            _ => return None,
        })
    }
}

/// The shader stage a binding targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShaderStage {
    /// Vertex stage.
    Vertex,
    /// Fragment stage.
    Fragment,
}

/// A viewport rectangle in framebuffer pixels.
///
/// The all-zero viewport means "use the render target's full extent";
/// callers reset to the pass default by setting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Viewport {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Viewport {
    /// Returns `true` for the all-zero "pass default" viewport.
    pub fn is_default(self) -> bool {
        self == Viewport::default()
    }
}

/// A scissor rectangle in framebuffer pixels.
///
/// The all-zero rectangle disables scissor testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScissorRect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ScissorRect {
    /// Returns `true` for the all-zero "scissor off" rectangle.
    pub fn is_disabled(self) -> bool {
        self == ScissorRect::default()
    }
}

/// A linear RGBA color, used for clear values and debug uploads.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Color {
    /// Red component.
    pub r: f32,
    /// Green component.
    pub g: f32,
    /// Blue component.
    pub b: f32,
    /// Alpha component.
    pub a: f32,
}

impl Color {
    /// Opaque black.
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    /// Fully transparent black.
    pub const TRANSPARENT: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}
