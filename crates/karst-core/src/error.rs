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

//! Defines the hierarchy of error types for the submission pipeline.

use crate::config::BackendApi;
use crate::handle::{Handle, HandleKind};
use std::fmt;

/// An error raised while bringing the pipeline up.
///
/// Initialization is the one place where this layer fails hard: an
/// unsupported backend leaves no usable dispatch table behind, so the error
/// is surfaced eagerly instead of being discovered call by call later.
#[derive(Debug)]
pub enum InitError {
    /// The requested backend API is not available in this build.
    UnsupportedBackend {
        /// The API that was requested.
        api: BackendApi,
    },
    /// The backend was selected but failed to start.
    BackendFailed {
        /// The API that failed.
        api: BackendApi,
        /// Details reported by the backend.
        details: String,
    },
    /// The dedicated render thread could not be spawned.
    RenderThread {
        /// The underlying OS error.
        details: String,
    },
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::UnsupportedBackend { api } => {
                write!(f, "Backend API {api:?} is not supported by this build")
            }
            InitError::BackendFailed { api, details } => {
                write!(f, "Backend {api:?} failed to initialize: {details}")
            }
            InitError::RenderThread { details } => {
                write!(f, "Failed to spawn render thread: {details}")
            }
        }
    }
}

impl std::error::Error for InitError {}

/// An error related to the creation or update of a pooled resource.
#[derive(Debug)]
pub enum ResourceError {
    /// A descriptor failed validation before reaching the backend.
    InvalidDescriptor {
        /// Why the descriptor was rejected.
        reason: String,
    },
    /// The backend refused to create the resource.
    CreationFailed {
        /// The kind of resource being created.
        kind: HandleKind,
        /// Details reported by the backend.
        details: String,
    },
    /// The backend rejected a data upload.
    UploadFailed {
        /// The handle being written.
        handle: Handle,
        /// Details reported by the backend.
        details: String,
    },
    /// A data upload did not fit the target resource.
    OutOfBounds {
        /// The handle being written.
        handle: Handle,
        /// Offset of the rejected write, in bytes.
        offset: u64,
        /// Length of the rejected write, in bytes.
        len: u64,
        /// Total size of the resource, in bytes.
        size: u64,
    },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::InvalidDescriptor { reason } => {
                write!(f, "Invalid resource descriptor: {reason}")
            }
            ResourceError::CreationFailed { kind, details } => {
                write!(f, "Failed to create {kind:?} resource: {details}")
            }
            ResourceError::UploadFailed { handle, details } => {
                write!(f, "Upload to {handle:?} failed: {details}")
            }
            ResourceError::OutOfBounds {
                handle,
                offset,
                len,
                size,
            } => {
                write!(
                    f,
                    "Write of {len} bytes at offset {offset} exceeds {handle:?} (size {size})"
                )
            }
        }
    }
}

impl std::error::Error for ResourceError {}

/// An error reported by a backend during replay or an immediate batch.
///
/// Device errors never propagate out of the execution engine: the frame
/// keeps going with partial results and the failure is observed through the
/// log only. They do reach callers of synchronous resource operations, where
/// a `Result` seam is affordable.
#[derive(Debug, Clone)]
pub enum DeviceError {
    /// The device ran out of memory for the requested resource.
    OutOfMemory {
        /// Details reported by the backend.
        details: String,
    },
    /// A handle did not resolve to a live native object.
    InvalidHandle {
        /// The offending handle.
        handle: Handle,
    },
    /// Any other backend-side failure.
    Backend {
        /// The operation that failed.
        op: &'static str,
        /// Details reported by the backend.
        details: String,
    },
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::OutOfMemory { details } => {
                write!(f, "Device out of memory: {details}")
            }
            DeviceError::InvalidHandle { handle } => {
                write!(f, "Handle {handle:?} does not name a live device object")
            }
            DeviceError::Backend { op, details } => {
                write!(f, "Device operation '{op}' failed: {details}")
            }
        }
    }
}

impl std::error::Error for DeviceError {}
