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

//! The dedicated render thread: waits for queued work and executes it.

use crate::engine::{self, PipelineShared};
use crate::error::InitError;
use crate::queue::WorkItem;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Spawns the render thread over the shared pipeline state.
pub(crate) fn spawn(shared: Arc<PipelineShared>) -> Result<JoinHandle<()>, InitError> {
    thread::Builder::new()
        .name("karst-render".to_owned())
        .spawn(move || run(&shared))
        .map_err(|err| InitError::RenderThread {
            details: err.to_string(),
        })
}

/// The render thread's main loop.
///
/// Blocks until a frame is ready, an immediate batch is pending, or exit
/// is requested; pending immediate batches and ready frames are drained
/// before the cooperative exit, so no publisher is left hanging.
fn run(shared: &PipelineShared) {
    log::info!("render thread started");
    loop {
        match shared.queue.wait_for_work() {
            WorkItem::Immediate(ops) => engine::run_immediate_batch(shared, ops),
            WorkItem::Frame { number, passes } => engine::execute_frame(shared, number, &passes),
            WorkItem::Exit => break,
        }
    }
    log::info!("render thread finished");
}
