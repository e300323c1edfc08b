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

//! Pipeline and backend configuration types.

use serde::{Deserialize, Serialize};

/// Default number of frames the submission queue holds before `present`
/// applies backpressure.
pub const DEFAULT_FRAME_QUEUE_DEPTH: usize = 3;

/// The native graphics API a backend implements.
///
/// Which API is viable is platform-determined; selection happens exactly
/// once at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendApi {
    /// The software backend with no native device behind it.
    Headless,
    /// Vulkan.
    Vulkan,
    /// Metal.
    Metal,
    /// Direct3D 12.
    Dx12,
    /// OpenGL / OpenGL ES.
    OpenGl,
}

/// Tunables of the submission pipeline itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// How many frames may be in flight before `present` blocks.
    pub frame_queue_depth: usize,
    /// Execute on a dedicated render thread instead of inline in `present`.
    pub use_render_thread: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_queue_depth: DEFAULT_FRAME_QUEUE_DEPTH,
            use_render_thread: true,
        }
    }
}

/// Parameters for pipeline initialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitParam {
    /// Backbuffer width in pixels.
    pub width: u32,
    /// Backbuffer height in pixels.
    pub height: u32,
    /// Whether presentation waits for vertical sync.
    pub vsync: bool,
    /// Submission-pipeline tunables.
    pub pipeline: PipelineConfig,
}

impl Default for InitParam {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            vsync: true,
            pipeline: PipelineConfig::default(),
        }
    }
}

/// Parameters for a device reset (e.g. window resize).
///
/// Safe to apply only between frames; the context routes it through the
/// immediate channel so it executes on the engine's thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetParam {
    /// New backbuffer width in pixels.
    pub width: u32,
    /// New backbuffer height in pixels.
    pub height: u32,
    /// New vsync setting.
    pub vsync: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_param_round_trips_through_json() {
        let param = InitParam {
            width: 1920,
            height: 1080,
            vsync: false,
            pipeline: PipelineConfig {
                frame_queue_depth: 2,
                use_render_thread: false,
            },
        };
        let text = serde_json::to_string(&param).unwrap();
        let back: InitParam = serde_json::from_str(&text).unwrap();
        assert_eq!(back, param);
    }

    #[test]
    fn defaults_match_documented_tunables() {
        let param = InitParam::default();
        assert_eq!(param.pipeline.frame_queue_depth, DEFAULT_FRAME_QUEUE_DEPTH);
        assert!(param.pipeline.use_render_thread);
    }
}
