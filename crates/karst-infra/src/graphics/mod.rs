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

//! Backend selection: maps a requested [`BackendApi`] to a concrete
//! device implementation, exactly once, at initialization.

pub mod headless;

use headless::HeadlessDevice;
use karst_core::{BackendApi, DeviceBackend, InitError, InitParam, RenderContext};

/// Selects the backend implementation for `api`.
///
/// Fails fast for APIs this build does not carry: the error is logged and
/// nothing is installed, so the caller never gets a half-initialized
/// pipeline.
pub fn select_backend(
    api: BackendApi,
    param: &InitParam,
) -> Result<Box<dyn DeviceBackend>, InitError> {
    match api {
        BackendApi::Headless => Ok(Box::new(HeadlessDevice::new(param))),
        other => {
            log::error!("backend API {other:?} is not available in this build");
            Err(InitError::UnsupportedBackend { api: other })
        }
    }
}

/// Brings up the whole pipeline for `api`: backend selection, pools,
/// submission queue, and (when configured) the render thread.
///
/// Call exactly once per device context, before any other pipeline
/// operation.
pub fn initialize(api: BackendApi, param: &InitParam) -> Result<RenderContext, InitError> {
    let backend = select_backend(api, param)?;
    RenderContext::new(backend, &param.pipeline)
}
