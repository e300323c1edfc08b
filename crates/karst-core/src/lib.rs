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

//! # Karst Core
//!
//! Backend-agnostic graphics command-submission pipeline.
//!
//! Producer threads record GPU work into pooled [`command::CommandBuffer`]s
//! grouped under render passes, hand a frame's passes to the triple-buffered
//! [`queue::SubmissionQueue`] via [`context::RenderContext::present`], and the
//! execution engine (inline or on a dedicated render thread) replays the
//! recorded streams against a [`traits::DeviceBackend`], eliding redundant
//! device calls along the way.
//!
//! This crate defines the 'what' of command submission; the 'how' of any
//! particular graphics API lives in a backend crate (e.g. `karst-infra`)
//! implementing [`traits::DeviceBackend`].

#![warn(missing_docs)]

pub mod api;
pub mod command;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod handle;
pub mod pass;
pub mod queue;
pub mod traits;

pub use config::{BackendApi, InitParam, PipelineConfig, ResetParam};
pub use context::RenderContext;
pub use engine::FrameStats;
pub use error::{DeviceError, InitError, ResourceError};
pub use handle::{Handle, HandleKind};
pub use traits::DeviceBackend;
