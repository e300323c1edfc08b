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

//! Descriptors for the pooled resource kinds.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// A set of flags describing the allowed usages of a buffer.
///
/// The backend uses them to place the buffer in the most suitable memory
/// type and to validate that it is bound correctly at replay time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BufferUsage {
    bits: u32,
}

impl BufferUsage {
    /// No declared usage.
    pub const NONE: Self = Self { bits: 0 };
    /// The buffer can be bound as a vertex buffer.
    pub const VERTEX: Self = Self { bits: 1 << 0 };
    /// The buffer can be bound as an index buffer.
    pub const INDEX: Self = Self { bits: 1 << 1 };
    /// The buffer can be bound as a shader constant buffer.
    pub const UNIFORM: Self = Self { bits: 1 << 2 };
    /// The buffer can be mapped for writing on the CPU.
    pub const MAP_WRITE: Self = Self { bits: 1 << 3 };
    /// The buffer can be the destination of an update.
    pub const COPY_DST: Self = Self { bits: 1 << 4 };

    /// Creates a usage set from raw bits.
    pub const fn from_bits(bits: u32) -> Self {
        Self { bits }
    }

    /// Returns the raw bits.
    pub const fn bits(self) -> u32 {
        self.bits
    }

    /// Returns `true` if every flag in `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.bits & other.bits == other.bits
    }
}

impl std::ops::BitOr for BufferUsage {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            bits: self.bits | rhs.bits,
        }
    }
}

/// A descriptor used to create a vertex, index, or constant buffer.
#[derive(Debug, Clone)]
pub struct BufferDescriptor {
    /// An optional debug label for the buffer.
    pub label: Option<Cow<'static, str>>,
    /// The total size of the buffer in bytes.
    pub size: u64,
    /// How the buffer will be used.
    pub usage: BufferUsage,
}

/// The subset of texture formats this layer knows how to size.
///
/// Format conversion is a collaborator concern; the pipeline only needs
/// enough format awareness to compute upload strides and extents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureFormat {
    /// 8-bit RGBA, 4 bytes per texel.
    Rgba8,
    /// 5-6-5 packed RGB, 2 bytes per texel.
    Rgb565,
    /// Single 8-bit channel.
    R8,
    /// 16-bit depth.
    D16,
    /// 24-bit depth with 8-bit stencil.
    D24S8,
}

impl TextureFormat {
    /// Bytes per texel.
    pub fn bytes_per_texel(self) -> u32 {
        match self {
            TextureFormat::Rgba8 => 4,
            TextureFormat::Rgb565 => 2,
            TextureFormat::R8 => 1,
            TextureFormat::D16 => 2,
            TextureFormat::D24S8 => 4,
        }
    }

    /// Returns `true` for depth/stencil formats.
    pub fn is_depth(self) -> bool {
        matches!(self, TextureFormat::D16 | TextureFormat::D24S8)
    }
}

/// Extents of mip `level` of a `width` x `height` texture, clamped to 1.
pub fn texture_extents(width: u32, height: u32, level: u32) -> (u32, u32) {
    ((width >> level).max(1), (height >> level).max(1))
}

/// Byte size of mip `level` of a texture in `format`.
pub fn texture_size(format: TextureFormat, width: u32, height: u32, level: u32) -> u64 {
    let (w, h) = texture_extents(width, height, level);
    u64::from(w) * u64::from(h) * u64::from(format.bytes_per_texel())
}

/// A descriptor used to create a texture.
#[derive(Debug, Clone)]
pub struct TextureDescriptor {
    /// An optional debug label for the texture.
    pub label: Option<Cow<'static, str>>,
    /// Width of mip 0 in texels.
    pub width: u32,
    /// Height of mip 0 in texels.
    pub height: u32,
    /// The texel format.
    pub format: TextureFormat,
    /// Number of mip levels, at least 1.
    pub mip_levels: u32,
}

/// Fixed-function blending applied by a pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendMode {
    /// No blending.
    Opaque,
    /// Classic source-alpha blending.
    Alpha,
    /// Additive blending.
    Additive,
}

/// A descriptor used to create a pipeline state object.
///
/// Shader program construction and caching live behind the backend; the
/// pipeline only carries the opaque vertex-layout id the backend needs to
/// re-derive attribute bindings when the vertex stream changes.
#[derive(Debug, Clone)]
pub struct PipelineStateDescriptor {
    /// An optional debug label for the pipeline state.
    pub label: Option<Cow<'static, str>>,
    /// Opaque vertex layout id understood by the backend.
    pub vertex_layout: u32,
    /// Fixed-function blend mode.
    pub blending: BlendMode,
}

impl Default for PipelineStateDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            vertex_layout: 0,
            blending: BlendMode::Opaque,
        }
    }
}

/// Texture filtering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterMode {
    /// Nearest-texel sampling.
    Nearest,
    /// Linear interpolation.
    Linear,
}

/// Texture coordinate addressing outside [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressMode {
    /// Clamp to the edge texel.
    Clamp,
    /// Repeat the texture.
    Repeat,
    /// Repeat, mirrored.
    Mirror,
}

/// A descriptor used to create a sampler state object.
#[derive(Debug, Clone)]
pub struct SamplerDescriptor {
    /// An optional debug label for the sampler.
    pub label: Option<Cow<'static, str>>,
    /// Minification filter.
    pub min_filter: FilterMode,
    /// Magnification filter.
    pub mag_filter: FilterMode,
    /// Addressing for both axes.
    pub address_mode: AddressMode,
}

impl Default for SamplerDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            min_filter: FilterMode::Linear,
            mag_filter: FilterMode::Linear,
            address_mode: AddressMode::Clamp,
        }
    }
}

/// Depth/stencil comparison function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareFunc {
    /// Never passes.
    Never,
    /// Passes when incoming < stored.
    Less,
    /// Passes when equal.
    Equal,
    /// Passes when incoming <= stored.
    LessEqual,
    /// Passes when incoming > stored.
    Greater,
    /// Passes when not equal.
    NotEqual,
    /// Passes when incoming >= stored.
    GreaterEqual,
    /// Always passes.
    Always,
}

/// A descriptor used to create a depth/stencil state object.
#[derive(Debug, Clone)]
pub struct DepthStencilDescriptor {
    /// An optional debug label.
    pub label: Option<Cow<'static, str>>,
    /// Enables the depth test.
    pub depth_test: bool,
    /// Enables depth writes.
    pub depth_write: bool,
    /// Comparison used when the depth test is enabled.
    pub depth_compare: CompareFunc,
}

impl Default for DepthStencilDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            depth_test: true,
            depth_write: true,
            depth_compare: CompareFunc::LessEqual,
        }
    }
}

/// A descriptor used to create a query buffer.
#[derive(Debug, Clone)]
pub struct QueryBufferDescriptor {
    /// An optional debug label.
    pub label: Option<Cow<'static, str>>,
    /// Maximum number of query objects the buffer holds.
    pub max_object_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_usage_combines() {
        let usage = BufferUsage::VERTEX | BufferUsage::MAP_WRITE;
        assert!(usage.contains(BufferUsage::VERTEX));
        assert!(usage.contains(BufferUsage::MAP_WRITE));
        assert!(!usage.contains(BufferUsage::INDEX));
        assert_eq!(BufferUsage::from_bits(usage.bits()), usage);
    }

    #[test]
    fn texture_math_clamps_mip_extents() {
        assert_eq!(texture_extents(256, 128, 0), (256, 128));
        assert_eq!(texture_extents(256, 128, 4), (16, 8));
        // Mip chains bottom out at 1x1, never 0.
        assert_eq!(texture_extents(256, 128, 9), (1, 1));

        assert_eq!(texture_size(TextureFormat::Rgba8, 16, 16, 0), 1024);
        assert_eq!(texture_size(TextureFormat::Rgb565, 16, 16, 1), 128);
        assert_eq!(texture_size(TextureFormat::R8, 1, 1, 3), 1);
    }
}
