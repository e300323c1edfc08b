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

//! Shared setup for the pipeline integration tests.

use karst_infra::graphics::headless::HeadlessDevice;
use karst_core::{InitParam, PipelineConfig, RenderContext};

/// Brings up a headless pipeline, keeping a probe clone of the device so
/// tests can inspect the call trace behind the boxed backend.
pub fn init(use_render_thread: bool) -> (RenderContext, HeadlessDevice) {
    let _ = env_logger::builder().is_test(true).try_init();
    let param = InitParam {
        pipeline: PipelineConfig {
            use_render_thread,
            ..Default::default()
        },
        ..Default::default()
    };
    let device = HeadlessDevice::new(&param);
    let ctx = RenderContext::new(Box::new(device.clone()), &param.pipeline)
        .expect("headless pipeline must initialize");
    (ctx, device)
}
