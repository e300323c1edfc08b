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

//! The execution engine: replays queued frames against the device backend.

pub(crate) mod render_loop;
mod state_cache;

use crate::command::{Command, CommandBuffer};
use crate::error::DeviceError;
use crate::handle::{HandlePool, Handle};
use crate::pass::RenderPass;
use crate::queue::{immediate, ImmediateOp, SubmissionQueue};
use crate::traits::DeviceBackend;
use state_cache::ExecState;
use std::sync::Mutex;

/// How many decoded commands may pass between immediate-mailbox checks.
const IMMEDIATE_CHECK_INTERVAL: u32 = 10;

/// Cumulative counters of dispatched device work.
///
/// The bind counters reflect calls that actually reached the device;
/// redundant rebinds elided by the state cache never show up here.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames fully replayed and presented.
    pub frames_presented: u64,
    /// Non-indexed draws dispatched.
    pub draw_calls: u64,
    /// Indexed draws dispatched.
    pub indexed_draw_calls: u64,
    /// Pipeline-state binds dispatched.
    pub pipeline_binds: u64,
    /// Constant-buffer binds dispatched.
    pub const_buffer_binds: u64,
    /// Texture binds dispatched.
    pub texture_binds: u64,
    /// Total command words decoded.
    pub commands_decoded: u64,
}

impl FrameStats {
    fn merge(&mut self, other: &FrameStats) {
        self.frames_presented += other.frames_presented;
        self.draw_calls += other.draw_calls;
        self.indexed_draw_calls += other.indexed_draw_calls;
        self.pipeline_binds += other.pipeline_binds;
        self.const_buffer_binds += other.const_buffer_binds;
        self.texture_binds += other.texture_binds;
        self.commands_decoded += other.commands_decoded;
    }
}

/// Everything shared between producer threads and the execution role.
///
/// The command-buffer and render-pass pools are the only pools that cross
/// the thread boundary, so they are the only ones carrying a lock.
pub(crate) struct PipelineShared {
    pub(crate) backend: Box<dyn DeviceBackend>,
    pub(crate) queue: SubmissionQueue,
    pub(crate) command_buffers: Mutex<HandlePool<CommandBuffer>>,
    pub(crate) render_passes: Mutex<HandlePool<RenderPass>>,
    pub(crate) stats: Mutex<FrameStats>,
}

impl std::fmt::Debug for PipelineShared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineShared")
            .field("backend", &self.backend)
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

fn log_device_error(op: &'static str, result: Result<(), DeviceError>) {
    if let Err(err) = result {
        log::error!("device call {op} failed: {err}");
    }
}

/// Executes one immediate batch on the current thread and releases its
/// publisher.
pub(crate) fn run_immediate_batch(shared: &PipelineShared, ops: Vec<ImmediateOp>) {
    let results = ops
        .iter()
        .map(|op| {
            let result = immediate::dispatch(op, &*shared.backend);
            if let Err(err) = &result {
                log::error!("immediate command failed: {err}");
            }
            result
        })
        .collect();
    shared.queue.complete_immediate(results);
}

/// Drains the immediate mailbox if a batch is pending.
pub(crate) fn drain_immediate(shared: &PipelineShared) {
    if let Some(ops) = shared.queue.try_take_immediate() {
        run_immediate_batch(shared, ops);
    }
}

/// Replays and retires one dequeued frame slot.
///
/// Passes replay in stable descending-priority order; each pass's buffers
/// replay in registration order and are freed as they finish, the pass
/// itself right after. Present and the per-frame cache invalidation close
/// the frame, then the slot retires (waking one blocked producer).
pub(crate) fn execute_frame(shared: &PipelineShared, number: u64, passes: &[Handle]) {
    log::trace!("executing frame {number} ({} passes)", passes.len());

    let mut ordered: Vec<(Handle, i32)> = {
        let pool = shared.render_passes.lock().unwrap();
        passes.iter().map(|&h| (h, pool.get(h).priority())).collect()
    };
    // Stable: passes of equal priority keep their submission order.
    ordered.sort_by(|a, b| b.1.cmp(&a.1));

    for (pass_handle, _) in &ordered {
        let buffers: Vec<Handle> = {
            let pool = shared.render_passes.lock().unwrap();
            pool.get(*pass_handle).command_buffers().to_vec()
        };
        for buffer_handle in buffers {
            // Pull the buffer out of the pool so replay runs without the
            // lock; outstanding copies of the handle are stale from here.
            let buffer = shared.command_buffers.lock().unwrap().free(buffer_handle);
            replay_buffer(shared, &buffer);
            drain_immediate(shared);
        }
        shared.render_passes.lock().unwrap().free(*pass_handle);
    }

    log_device_error("present_frame", shared.backend.present_frame());
    shared.backend.finish_frame();

    {
        let mut stats = shared.stats.lock().unwrap();
        stats.frames_presented += 1;
    }
    shared.queue.retire_frame();
}

/// Binds whatever the next draw needs that is not already on the device.
fn flush_draw_state(
    shared: &PipelineShared,
    exec: &mut ExecState,
    stats: &mut FrameStats,
) {
    if let Some((pipeline, layout)) = exec.pipeline_to_bind() {
        log_device_error(
            "bind_pipeline_state",
            shared.backend.bind_pipeline_state(pipeline, layout),
        );
        stats.pipeline_binds += 1;
        exec.note_pipeline_bound();
    }
    for (stage, slot, buffer) in exec.const_buffers_to_bind() {
        log_device_error(
            "bind_const_buffer",
            shared.backend.bind_const_buffer(stage, slot, buffer),
        );
        stats.const_buffer_binds += 1;
    }
}

fn replay_buffer(shared: &PipelineShared, buffer: &CommandBuffer) {
    let backend = &*shared.backend;
    let mut exec = ExecState::new();
    let mut stats = FrameStats::default();
    let mut immediate_ttw = IMMEDIATE_CHECK_INTERVAL;

    for command in buffer.commands() {
        stats.commands_decoded += 1;
        match command {
            Command::Begin => {
                if buffer.is_first_in_pass() {
                    log_device_error("begin_pass", backend.begin_pass(buffer.pass_config()));
                }
            }
            Command::End => {
                if buffer.is_last_in_pass() {
                    log_device_error("end_pass", backend.end_pass(buffer.pass_config()));
                }
            }
            Command::SetPipelineState { pipeline, layout } => {
                exec.select_pipeline(pipeline, layout);
            }
            Command::SetCullMode(mode) => {
                log_device_error("set_cull_mode", backend.set_cull_mode(mode));
            }
            Command::SetScissorRect(rect) => {
                log_device_error("set_scissor_rect", backend.set_scissor_rect(rect));
            }
            Command::SetViewport(viewport) => {
                log_device_error("set_viewport", backend.set_viewport(viewport));
            }
            Command::SetVertexData { buffer: vb, stream } => {
                if exec.vertex_buffer_changed(vb, stream) {
                    log_device_error("bind_vertex_buffer", backend.bind_vertex_buffer(vb, stream));
                }
            }
            Command::SetIndices { buffer: ib } => {
                log_device_error("bind_index_buffer", backend.bind_index_buffer(ib));
            }
            Command::SetVertexConstBuffer { slot, buffer: cb } => {
                exec.set_pending_const(crate::api::ShaderStage::Vertex, slot, cb);
            }
            Command::SetFragmentConstBuffer { slot, buffer: cb } => {
                exec.set_pending_const(crate::api::ShaderStage::Fragment, slot, cb);
            }
            Command::SetVertexTexture { unit, texture } => {
                if exec.texture_changed(crate::api::ShaderStage::Vertex, unit, texture) {
                    log_device_error(
                        "bind_texture",
                        backend.bind_texture(crate::api::ShaderStage::Vertex, unit, texture),
                    );
                    stats.texture_binds += 1;
                }
            }
            Command::SetFragmentTexture { unit, texture } => {
                if exec.texture_changed(crate::api::ShaderStage::Fragment, unit, texture) {
                    log_device_error(
                        "bind_texture",
                        backend.bind_texture(crate::api::ShaderStage::Fragment, unit, texture),
                    );
                    stats.texture_binds += 1;
                }
            }
            Command::SetDepthStencilState(state) => {
                log_device_error(
                    "bind_depth_stencil_state",
                    backend.bind_depth_stencil_state(state),
                );
            }
            Command::SetSamplerState(state) => {
                log_device_error("bind_sampler_state", backend.bind_sampler_state(state));
            }
            Command::SetQueryBuffer(qb) => {
                exec.set_query_buffer(qb);
            }
            Command::SetQueryIndex(index) => {
                exec.set_query_index(index);
            }
            Command::DrawPrimitive { primitive, count } => {
                flush_draw_state(shared, &mut exec, &mut stats);
                let bracket = exec.query_bracket();
                if let Some((qb, qi)) = bracket {
                    log_device_error("begin_query", backend.begin_query(qb, qi));
                }
                log_device_error("draw", backend.draw(primitive, count));
                stats.draw_calls += 1;
                if let Some((qb, qi)) = bracket {
                    log_device_error("end_query", backend.end_query(qb, qi));
                }
            }
            Command::DrawIndexedPrimitive {
                primitive,
                count,
                first_vertex,
                start_index,
            } => {
                flush_draw_state(shared, &mut exec, &mut stats);
                let bracket = exec.query_bracket();
                if let Some((qb, qi)) = bracket {
                    log_device_error("begin_query", backend.begin_query(qb, qi));
                }
                log_device_error(
                    "draw_indexed",
                    backend.draw_indexed(primitive, count, first_vertex, start_index),
                );
                stats.indexed_draw_calls += 1;
                if let Some((qb, qi)) = bracket {
                    log_device_error("end_query", backend.end_query(qb, qi));
                }
            }
            Command::SetMarker(text) => {
                backend.marker(text);
            }
        }

        // Immediate commands may interleave between decoded commands but
        // never split one command's dispatch.
        immediate_ttw -= 1;
        if immediate_ttw == 0 {
            drain_immediate(shared);
            immediate_ttw = IMMEDIATE_CHECK_INTERVAL;
        }
    }

    shared.stats.lock().unwrap().merge(&stats);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{
        CullMode, PrimitiveType, RenderPassConfig, ScissorRect, ShaderStage, Viewport,
    };
    use crate::config::BackendApi;
    use crate::handle::HandleKind;
    use crate::queue::WorkItem;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum MockCall {
        BeginPass(i32),
        EndPass,
        BindPipeline(Handle, u32),
        BindVertexBuffer(Handle, u32),
        BindIndexBuffer(Handle),
        BindConstBuffer(ShaderStage, u32, Handle),
        BindTexture(ShaderStage, u32, Handle),
        BindDepthStencil(Handle),
        BindSampler(Handle),
        CullMode(CullMode),
        Scissor(ScissorRect),
        Viewport(Viewport),
        BeginQuery(Handle, u32),
        EndQuery(Handle, u32),
        Draw(PrimitiveType, u32),
        DrawIndexed(PrimitiveType, u32, u32, u32),
        Marker(String),
        Present,
        FinishFrame,
        Create(HandleKind),
        Update(HandleKind),
        Destroy(HandleKind),
        Reset,
    }

    /// Records every device call in order; draws can be made to fail.
    /// The call log is shared out so tests can inspect it after the
    /// device is boxed behind the trait object.
    #[derive(Debug, Default)]
    struct MockDevice {
        calls: Arc<Mutex<Vec<MockCall>>>,
        fail_draws: Arc<AtomicBool>,
    }

    impl MockDevice {
        fn push(&self, call: MockCall) {
            self.calls.lock().unwrap().push(call);
        }

        fn kind(handle: Handle) -> HandleKind {
            handle.kind().expect("mock device got an invalid handle")
        }
    }

    impl crate::traits::DeviceBackend for MockDevice {
        fn api(&self) -> BackendApi {
            BackendApi::Headless
        }

        fn reset(&self, _param: &crate::config::ResetParam) -> Result<(), DeviceError> {
            self.push(MockCall::Reset);
            Ok(())
        }

        fn uninitialize(&self) {}

        fn create_vertex_buffer(
            &self,
            handle: Handle,
            _desc: &crate::api::BufferDescriptor,
        ) -> Result<(), DeviceError> {
            self.push(MockCall::Create(Self::kind(handle)));
            Ok(())
        }

        fn update_vertex_buffer(
            &self,
            handle: Handle,
            _offset: u64,
            _data: &[u8],
        ) -> Result<(), DeviceError> {
            self.push(MockCall::Update(Self::kind(handle)));
            Ok(())
        }

        fn destroy_vertex_buffer(&self, handle: Handle) -> Result<(), DeviceError> {
            self.push(MockCall::Destroy(Self::kind(handle)));
            Ok(())
        }

        fn create_index_buffer(
            &self,
            handle: Handle,
            _desc: &crate::api::BufferDescriptor,
        ) -> Result<(), DeviceError> {
            self.push(MockCall::Create(Self::kind(handle)));
            Ok(())
        }

        fn update_index_buffer(
            &self,
            handle: Handle,
            _offset: u64,
            _data: &[u8],
        ) -> Result<(), DeviceError> {
            self.push(MockCall::Update(Self::kind(handle)));
            Ok(())
        }

        fn destroy_index_buffer(&self, handle: Handle) -> Result<(), DeviceError> {
            self.push(MockCall::Destroy(Self::kind(handle)));
            Ok(())
        }

        fn create_const_buffer(
            &self,
            handle: Handle,
            _desc: &crate::api::BufferDescriptor,
        ) -> Result<(), DeviceError> {
            self.push(MockCall::Create(Self::kind(handle)));
            Ok(())
        }

        fn update_const_buffer(
            &self,
            handle: Handle,
            _offset: u64,
            _data: &[u8],
        ) -> Result<(), DeviceError> {
            self.push(MockCall::Update(Self::kind(handle)));
            Ok(())
        }

        fn destroy_const_buffer(&self, handle: Handle) -> Result<(), DeviceError> {
            self.push(MockCall::Destroy(Self::kind(handle)));
            Ok(())
        }

        fn create_texture(
            &self,
            handle: Handle,
            _desc: &crate::api::TextureDescriptor,
        ) -> Result<(), DeviceError> {
            self.push(MockCall::Create(Self::kind(handle)));
            Ok(())
        }

        fn update_texture(
            &self,
            handle: Handle,
            _level: u32,
            _data: &[u8],
        ) -> Result<(), DeviceError> {
            self.push(MockCall::Update(Self::kind(handle)));
            Ok(())
        }

        fn destroy_texture(&self, handle: Handle) -> Result<(), DeviceError> {
            self.push(MockCall::Destroy(Self::kind(handle)));
            Ok(())
        }

        fn create_pipeline_state(
            &self,
            handle: Handle,
            _desc: &crate::api::PipelineStateDescriptor,
        ) -> Result<(), DeviceError> {
            self.push(MockCall::Create(Self::kind(handle)));
            Ok(())
        }

        fn destroy_pipeline_state(&self, handle: Handle) -> Result<(), DeviceError> {
            self.push(MockCall::Destroy(Self::kind(handle)));
            Ok(())
        }

        fn create_depth_stencil_state(
            &self,
            handle: Handle,
            _desc: &crate::api::DepthStencilDescriptor,
        ) -> Result<(), DeviceError> {
            self.push(MockCall::Create(Self::kind(handle)));
            Ok(())
        }

        fn destroy_depth_stencil_state(&self, handle: Handle) -> Result<(), DeviceError> {
            self.push(MockCall::Destroy(Self::kind(handle)));
            Ok(())
        }

        fn create_sampler_state(
            &self,
            handle: Handle,
            _desc: &crate::api::SamplerDescriptor,
        ) -> Result<(), DeviceError> {
            self.push(MockCall::Create(Self::kind(handle)));
            Ok(())
        }

        fn destroy_sampler_state(&self, handle: Handle) -> Result<(), DeviceError> {
            self.push(MockCall::Destroy(Self::kind(handle)));
            Ok(())
        }

        fn create_query_buffer(
            &self,
            handle: Handle,
            _desc: &crate::api::QueryBufferDescriptor,
        ) -> Result<(), DeviceError> {
            self.push(MockCall::Create(Self::kind(handle)));
            Ok(())
        }

        fn destroy_query_buffer(&self, handle: Handle) -> Result<(), DeviceError> {
            self.push(MockCall::Destroy(Self::kind(handle)));
            Ok(())
        }

        fn query_is_ready(&self, _handle: Handle, _object_index: u32) -> bool {
            true
        }

        fn query_value(&self, _handle: Handle, _object_index: u32) -> i32 {
            0
        }

        fn begin_pass(&self, config: &RenderPassConfig) -> Result<(), DeviceError> {
            self.push(MockCall::BeginPass(config.priority));
            Ok(())
        }

        fn end_pass(&self, _config: &RenderPassConfig) -> Result<(), DeviceError> {
            self.push(MockCall::EndPass);
            Ok(())
        }

        fn bind_pipeline_state(&self, pipeline: Handle, layout: u32) -> Result<(), DeviceError> {
            self.push(MockCall::BindPipeline(pipeline, layout));
            Ok(())
        }

        fn set_cull_mode(&self, mode: CullMode) -> Result<(), DeviceError> {
            self.push(MockCall::CullMode(mode));
            Ok(())
        }

        fn set_scissor_rect(&self, rect: ScissorRect) -> Result<(), DeviceError> {
            self.push(MockCall::Scissor(rect));
            Ok(())
        }

        fn set_viewport(&self, viewport: Viewport) -> Result<(), DeviceError> {
            self.push(MockCall::Viewport(viewport));
            Ok(())
        }

        fn bind_vertex_buffer(&self, buffer: Handle, stream: u32) -> Result<(), DeviceError> {
            self.push(MockCall::BindVertexBuffer(buffer, stream));
            Ok(())
        }

        fn bind_index_buffer(&self, buffer: Handle) -> Result<(), DeviceError> {
            self.push(MockCall::BindIndexBuffer(buffer));
            Ok(())
        }

        fn bind_const_buffer(
            &self,
            stage: ShaderStage,
            slot: u32,
            buffer: Handle,
        ) -> Result<(), DeviceError> {
            self.push(MockCall::BindConstBuffer(stage, slot, buffer));
            Ok(())
        }

        fn bind_texture(
            &self,
            stage: ShaderStage,
            unit: u32,
            texture: Handle,
        ) -> Result<(), DeviceError> {
            self.push(MockCall::BindTexture(stage, unit, texture));
            Ok(())
        }

        fn bind_depth_stencil_state(&self, state: Handle) -> Result<(), DeviceError> {
            self.push(MockCall::BindDepthStencil(state));
            Ok(())
        }

        fn bind_sampler_state(&self, state: Handle) -> Result<(), DeviceError> {
            self.push(MockCall::BindSampler(state));
            Ok(())
        }

        fn begin_query(&self, buffer: Handle, object_index: u32) -> Result<(), DeviceError> {
            self.push(MockCall::BeginQuery(buffer, object_index));
            Ok(())
        }

        fn end_query(&self, buffer: Handle, object_index: u32) -> Result<(), DeviceError> {
            self.push(MockCall::EndQuery(buffer, object_index));
            Ok(())
        }

        fn draw(&self, primitive: PrimitiveType, primitive_count: u32) -> Result<(), DeviceError> {
            self.push(MockCall::Draw(primitive, primitive_count));
            if self.fail_draws.load(Ordering::Relaxed) {
                return Err(DeviceError::Backend {
                    op: "draw",
                    details: "mock draw failure".into(),
                });
            }
            Ok(())
        }

        fn draw_indexed(
            &self,
            primitive: PrimitiveType,
            primitive_count: u32,
            first_vertex: u32,
            start_index: u32,
        ) -> Result<(), DeviceError> {
            self.push(MockCall::DrawIndexed(
                primitive,
                primitive_count,
                first_vertex,
                start_index,
            ));
            Ok(())
        }

        fn marker(&self, text: &str) {
            self.push(MockCall::Marker(text.to_owned()));
        }

        fn present_frame(&self) -> Result<(), DeviceError> {
            self.push(MockCall::Present);
            Ok(())
        }

        fn finish_frame(&self) {
            self.push(MockCall::FinishFrame);
        }
    }

    struct MockHarness {
        shared: Arc<PipelineShared>,
        calls: Arc<Mutex<Vec<MockCall>>>,
        fail_draws: Arc<AtomicBool>,
    }

    fn shared_with_mock() -> MockHarness {
        let device = MockDevice::default();
        let calls = Arc::clone(&device.calls);
        let fail_draws = Arc::clone(&device.fail_draws);
        MockHarness {
            shared: Arc::new(PipelineShared {
                backend: Box::new(device),
                queue: SubmissionQueue::new(3),
                command_buffers: Mutex::new(HandlePool::new(HandleKind::CommandBuffer)),
                render_passes: Mutex::new(HandlePool::new(HandleKind::RenderPass)),
                stats: Mutex::new(FrameStats::default()),
            }),
            calls,
            fail_draws,
        }
    }

    impl MockHarness {
        fn calls(&self) -> Vec<MockCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    /// Allocates a pass with `count` buffers, mirroring the context's
    /// allocation rule: first buffer clears, last flushes.
    fn alloc_pass(
        shared: &PipelineShared,
        config: &RenderPassConfig,
        count: usize,
    ) -> (Handle, Vec<Handle>) {
        let mut buffers = Vec::with_capacity(count);
        {
            let mut pool = shared.command_buffers.lock().unwrap();
            for i in 0..count {
                buffers.push(pool.alloc(CommandBuffer::new(
                    config.clone(),
                    i == 0,
                    i == count - 1,
                )));
            }
        }
        let pass = shared
            .render_passes
            .lock()
            .unwrap()
            .alloc(RenderPass::new(buffers.clone(), config.priority));
        (pass, buffers)
    }

    fn record<F: FnOnce(&mut CommandBuffer)>(shared: &PipelineShared, handle: Handle, f: F) {
        let mut pool = shared.command_buffers.lock().unwrap();
        let cb = pool.get_mut(handle);
        cb.begin();
        f(cb);
        cb.end();
    }

    fn run_one_frame(shared: &Arc<PipelineShared>) {
        match shared.queue.wait_for_work() {
            WorkItem::Frame { number, passes } => execute_frame(shared, number, &passes),
            other => panic!("expected a frame, got {other:?}"),
        }
    }

    #[test]
    fn buffers_replay_in_registration_order() {
        let h = shared_with_mock();
        let shared = Arc::clone(&h.shared);
        let config = RenderPassConfig::default();
        let (pass, buffers) = alloc_pass(&shared, &config, 2);
        record(&shared, buffers[0], |cb| {
            cb.draw_primitive(PrimitiveType::TriangleList, 10);
        });
        record(&shared, buffers[1], |cb| {
            cb.draw_primitive(PrimitiveType::TriangleList, 20);
        });

        shared.queue.register_pass(pass);
        shared.queue.finish_frame();
        run_one_frame(&shared);

        assert_eq!(
            h.calls(),
            vec![
                MockCall::BeginPass(0),
                MockCall::Draw(PrimitiveType::TriangleList, 10),
                MockCall::Draw(PrimitiveType::TriangleList, 20),
                MockCall::EndPass,
                MockCall::Present,
                MockCall::FinishFrame,
            ]
        );

        // Transients are gone and the slot retired.
        assert!(shared.command_buffers.lock().unwrap().is_empty());
        assert!(shared.render_passes.lock().unwrap().is_empty());
        assert_eq!(shared.queue.frame_count(), 0);
        let stats = *shared.stats.lock().unwrap();
        assert_eq!(stats.draw_calls, 2);
        assert_eq!(stats.frames_presented, 1);
    }

    #[test]
    fn higher_priority_pass_replays_first_despite_registration_order() {
        let h = shared_with_mock();
        let shared = Arc::clone(&h.shared);
        let low = RenderPassConfig {
            priority: 5,
            ..Default::default()
        };
        let high = RenderPassConfig {
            priority: 10,
            ..Default::default()
        };

        // The low-priority pass is registered first.
        let (low_pass, low_buffers) = alloc_pass(&shared, &low, 1);
        record(&shared, low_buffers[0], |cb| {
            cb.draw_primitive(PrimitiveType::LineList, 5);
        });
        let (high_pass, high_buffers) = alloc_pass(&shared, &high, 1);
        record(&shared, high_buffers[0], |cb| {
            cb.draw_primitive(PrimitiveType::LineList, 10);
        });

        shared.queue.register_pass(low_pass);
        shared.queue.register_pass(high_pass);
        shared.queue.finish_frame();
        run_one_frame(&shared);

        let draws: Vec<_> = h.calls()
            .into_iter()
            .filter(|c| matches!(c, MockCall::Draw(..)))
            .collect();
        assert_eq!(
            draws,
            vec![
                MockCall::Draw(PrimitiveType::LineList, 10),
                MockCall::Draw(PrimitiveType::LineList, 5),
            ]
        );
    }

    #[test]
    fn equal_priority_passes_keep_submission_order() {
        let h = shared_with_mock();
        let shared = Arc::clone(&h.shared);
        let config = RenderPassConfig::default();
        let mut pass_handles = Vec::new();
        for count in [1u32, 2, 3] {
            let (pass, buffers) = alloc_pass(&shared, &config, 1);
            record(&shared, buffers[0], |cb| {
                cb.draw_primitive(PrimitiveType::TriangleList, count);
            });
            pass_handles.push(pass);
        }
        for pass in &pass_handles {
            shared.queue.register_pass(*pass);
        }
        shared.queue.finish_frame();
        run_one_frame(&shared);

        let draws: Vec<_> = h.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::Draw(_, count) => Some(count),
                _ => None,
            })
            .collect();
        assert_eq!(draws, vec![1, 2, 3]);
    }

    #[test]
    fn redundant_pipeline_rebind_is_elided() {
        let h = shared_with_mock();
        let shared = Arc::clone(&h.shared);
        let ps = Handle::new(HandleKind::PipelineState, 0, 0);
        let config = RenderPassConfig::default();
        let (pass, buffers) = alloc_pass(&shared, &config, 1);
        record(&shared, buffers[0], |cb| {
            cb.set_pipeline_state(ps, 1);
            cb.draw_primitive(PrimitiveType::TriangleList, 1);
            cb.set_pipeline_state(ps, 1);
            cb.draw_primitive(PrimitiveType::TriangleList, 1);
        });

        shared.queue.register_pass(pass);
        shared.queue.finish_frame();
        run_one_frame(&shared);

        let binds = h.calls()
            .iter()
            .filter(|c| matches!(c, MockCall::BindPipeline(..)))
            .count();
        assert_eq!(binds, 1);
        assert_eq!(shared.stats.lock().unwrap().pipeline_binds, 1);
    }

    #[test]
    fn const_buffer_binds_are_deferred_to_the_draw() {
        let h = shared_with_mock();
        let shared = Arc::clone(&h.shared);
        let ps = Handle::new(HandleKind::PipelineState, 0, 0);
        let cb0 = Handle::new(HandleKind::ConstBuffer, 0, 0);
        let config = RenderPassConfig::default();
        let (pass, buffers) = alloc_pass(&shared, &config, 1);
        record(&shared, buffers[0], |cb| {
            cb.set_pipeline_state(ps, 0);
            cb.set_vertex_const_buffer(0, cb0);
            // Rebinding the same buffer before the draw must not double
            // the device call.
            cb.set_vertex_const_buffer(0, cb0);
            cb.draw_primitive(PrimitiveType::TriangleList, 1);
            cb.set_vertex_const_buffer(0, cb0);
            cb.draw_primitive(PrimitiveType::TriangleList, 1);
        });

        shared.queue.register_pass(pass);
        shared.queue.finish_frame();
        run_one_frame(&shared);

        let calls = h.calls();
        let const_binds = calls
            .iter()
            .filter(|c| matches!(c, MockCall::BindConstBuffer(..)))
            .count();
        assert_eq!(const_binds, 1);

        // The single bind happens after the set commands, right at the
        // first draw.
        let bind_pos = calls
            .iter()
            .position(|c| matches!(c, MockCall::BindConstBuffer(..)))
            .unwrap();
        let first_draw = calls
            .iter()
            .position(|c| matches!(c, MockCall::Draw(..)))
            .unwrap();
        assert!(bind_pos < first_draw);
    }

    #[test]
    fn query_brackets_surround_draws() {
        let h = shared_with_mock();
        let shared = Arc::clone(&h.shared);
        let qb = Handle::new(HandleKind::QueryBuffer, 0, 0);
        let config = RenderPassConfig::default();
        let (pass, buffers) = alloc_pass(&shared, &config, 1);
        record(&shared, buffers[0], |cb| {
            cb.set_query_buffer(qb);
            cb.set_query_index(2);
            cb.draw_primitive(PrimitiveType::TriangleList, 1);
        });

        shared.queue.register_pass(pass);
        shared.queue.finish_frame();
        run_one_frame(&shared);

        let calls = h.calls();
        let begin = calls
            .iter()
            .position(|c| *c == MockCall::BeginQuery(qb, 2))
            .unwrap();
        let draw = calls
            .iter()
            .position(|c| matches!(c, MockCall::Draw(..)))
            .unwrap();
        let end = calls
            .iter()
            .position(|c| *c == MockCall::EndQuery(qb, 2))
            .unwrap();
        assert!(begin < draw && draw < end);
    }

    #[test]
    fn failing_draws_do_not_abort_the_frame() {
        let h = shared_with_mock();
        let shared = Arc::clone(&h.shared);
        h.fail_draws.store(true, Ordering::Relaxed);
        let config = RenderPassConfig::default();
        let (pass, buffers) = alloc_pass(&shared, &config, 1);
        record(&shared, buffers[0], |cb| {
            cb.draw_primitive(PrimitiveType::TriangleList, 1);
            cb.draw_primitive(PrimitiveType::TriangleList, 2);
        });

        shared.queue.register_pass(pass);
        shared.queue.finish_frame();
        run_one_frame(&shared);

        let calls = h.calls();
        let draws = calls.iter().filter(|c| matches!(c, MockCall::Draw(..))).count();
        assert_eq!(draws, 2, "both draws must still be attempted");
        assert!(calls.contains(&MockCall::Present));
        assert_eq!(shared.stats.lock().unwrap().frames_presented, 1);
    }

    #[test]
    fn immediate_batch_interleaves_mid_buffer_without_splitting_commands() {
        let h = shared_with_mock();
        let shared = Arc::clone(&h.shared);
        let config = RenderPassConfig::default();
        let (pass, buffers) = alloc_pass(&shared, &config, 1);
        record(&shared, buffers[0], |cb| {
            // More than one mailbox-check interval of commands.
            for i in 0..30 {
                cb.set_marker(&format!("cmd {i}"));
            }
            cb.draw_primitive(PrimitiveType::TriangleList, 1);
        });

        shared.queue.register_pass(pass);
        shared.queue.finish_frame();

        let q = Arc::clone(&shared);
        let publisher = thread::spawn(move || {
            q.queue.submit_immediate(vec![ImmediateOp::CreateVertexBuffer {
                handle: Handle::new(HandleKind::VertexBuffer, 0, 0),
                desc: crate::api::BufferDescriptor {
                    label: None,
                    size: 64,
                    usage: crate::api::BufferUsage::VERTEX,
                },
            }])
        });
        // Let the publisher park its batch in the mailbox first.
        thread::sleep(Duration::from_millis(100));

        // Replay directly: the parked batch must drain at a mailbox
        // checkpoint inside the buffer, not before the frame starts.
        let (number, passes) = shared.queue.front_ready_frame().unwrap();
        execute_frame(&shared, number, &passes);
        let results = publisher.join().unwrap();
        assert!(results[0].is_ok());

        let calls = h.calls();
        let create = calls
            .iter()
            .position(|c| *c == MockCall::Create(HandleKind::VertexBuffer))
            .expect("immediate batch must run during the frame");
        let last_marker = calls
            .iter()
            .rposition(|c| matches!(c, MockCall::Marker(_)))
            .unwrap();
        let draw = calls
            .iter()
            .position(|c| matches!(c, MockCall::Draw(..)))
            .unwrap();
        // The batch lands between commands, before the end of the buffer.
        assert!(create < last_marker || create < draw);
        assert_eq!(
            calls
                .iter()
                .filter(|c| **c == MockCall::Create(HandleKind::VertexBuffer))
                .count(),
            1
        );
    }
}
