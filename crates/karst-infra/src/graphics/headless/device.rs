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

//! The headless `DeviceBackend` implementation.

use super::trace::TraceEvent;
use karst_core::api::{
    texture_size, BufferDescriptor, CullMode, DepthStencilDescriptor, PipelineStateDescriptor,
    PrimitiveType, QueryBufferDescriptor, RenderPassConfig, SamplerDescriptor, ScissorRect,
    ShaderStage, TextureDescriptor, Viewport,
};
use karst_core::{BackendApi, DeviceBackend, DeviceError, Handle, InitParam, ResetParam};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::thread::ThreadId;

/// Hard cap on retained trace events; protects long-running tools from
/// unbounded growth. Tests never get near it.
const TRACE_CAP: usize = 1 << 16;

#[derive(Debug)]
struct BufferStorage {
    desc: BufferDescriptor,
    data: Vec<u8>,
}

#[derive(Debug)]
struct TextureStorage {
    desc: TextureDescriptor,
    levels: HashMap<u32, Vec<u8>>,
}

#[derive(Debug)]
struct QueryStorage {
    max_object_count: u32,
    results: Vec<Option<i32>>,
    /// Open bracket: (object index, draw count when it opened).
    active: Option<(u32, u64)>,
}

#[derive(Debug, Default)]
struct HeadlessState {
    vertex_buffers: HashMap<Handle, BufferStorage>,
    index_buffers: HashMap<Handle, BufferStorage>,
    const_buffers: HashMap<Handle, BufferStorage>,
    textures: HashMap<Handle, TextureStorage>,
    pipeline_states: HashMap<Handle, PipelineStateDescriptor>,
    depth_stencil_states: HashMap<Handle, DepthStencilDescriptor>,
    sampler_states: HashMap<Handle, SamplerDescriptor>,
    query_buffers: HashMap<Handle, QueryStorage>,
    trace: Vec<TraceEvent>,
    trace_overflowed: bool,
    draw_count: u64,
    frames_presented: u64,
    exec_threads: HashSet<ThreadId>,
    width: u32,
    height: u32,
    vsync: bool,
}

impl HeadlessState {
    fn push(&mut self, event: TraceEvent) {
        self.exec_threads.insert(std::thread::current().id());
        if self.trace.len() < TRACE_CAP {
            self.trace.push(event);
        } else if !self.trace_overflowed {
            self.trace_overflowed = true;
            log::warn!("headless trace capped at {TRACE_CAP} events; dropping the rest");
        }
    }

    fn live_objects(&self) -> usize {
        self.vertex_buffers.len()
            + self.index_buffers.len()
            + self.const_buffers.len()
            + self.textures.len()
            + self.pipeline_states.len()
            + self.depth_stencil_states.len()
            + self.sampler_states.len()
            + self.query_buffers.len()
    }
}

fn invalid(handle: Handle) -> DeviceError {
    DeviceError::InvalidHandle { handle }
}

fn write_range(storage: &mut BufferStorage, offset: u64, data: &[u8]) -> Result<(), DeviceError> {
    let end = offset as usize + data.len();
    if end > storage.data.len() {
        return Err(DeviceError::Backend {
            op: "buffer update",
            details: format!(
                "write of {} bytes at {} exceeds size {}",
                data.len(),
                offset,
                storage.data.len()
            ),
        });
    }
    storage.data[offset as usize..end].copy_from_slice(data);
    Ok(())
}

/// A software device: resources live in RAM, replay-side calls append to
/// a typed trace, draws are counted, queries answer with the number of
/// draws observed inside their bracket.
///
/// The device is cheaply cloneable (shared interior state), so a test can
/// keep a probe clone while the pipeline owns the boxed original.
#[derive(Debug, Clone)]
pub struct HeadlessDevice {
    state: Arc<Mutex<HeadlessState>>,
}

impl HeadlessDevice {
    /// Creates a headless device for the given surface parameters.
    pub fn new(param: &InitParam) -> Self {
        log::info!(
            "headless backend up ({}x{}, vsync {})",
            param.width,
            param.height,
            param.vsync
        );
        Self {
            state: Arc::new(Mutex::new(HeadlessState {
                width: param.width,
                height: param.height,
                vsync: param.vsync,
                ..Default::default()
            })),
        }
    }

    /// Snapshot of the call trace, in dispatch order.
    pub fn trace(&self) -> Vec<TraceEvent> {
        self.state.lock().unwrap().trace.clone()
    }

    /// Drops the recorded trace (e.g. between test phases).
    pub fn clear_trace(&self) {
        let mut st = self.state.lock().unwrap();
        st.trace.clear();
        st.trace_overflowed = false;
    }

    /// Total draws dispatched (indexed and not).
    pub fn draw_count(&self) -> u64 {
        self.state.lock().unwrap().draw_count
    }

    /// Frames presented so far.
    pub fn frames_presented(&self) -> u64 {
        self.state.lock().unwrap().frames_presented
    }

    /// Bytes currently stored for a buffer of any kind.
    pub fn buffer_contents(&self, handle: Handle) -> Option<Vec<u8>> {
        let st = self.state.lock().unwrap();
        st.vertex_buffers
            .get(&handle)
            .or_else(|| st.index_buffers.get(&handle))
            .or_else(|| st.const_buffers.get(&handle))
            .map(|b| b.data.clone())
    }

    /// The descriptor a buffer of any kind was created with.
    pub fn buffer_descriptor(&self, handle: Handle) -> Option<BufferDescriptor> {
        let st = self.state.lock().unwrap();
        st.vertex_buffers
            .get(&handle)
            .or_else(|| st.index_buffers.get(&handle))
            .or_else(|| st.const_buffers.get(&handle))
            .map(|b| b.desc.clone())
    }

    /// Texels currently stored for one mip level, if uploaded.
    pub fn texture_level(&self, handle: Handle, level: u32) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .textures
            .get(&handle)
            .and_then(|t| t.levels.get(&level).cloned())
    }

    /// Every thread that has executed a device call so far.
    pub fn exec_threads(&self) -> Vec<ThreadId> {
        self.state.lock().unwrap().exec_threads.iter().copied().collect()
    }

    /// Number of live device objects across all kinds.
    pub fn live_objects(&self) -> usize {
        self.state.lock().unwrap().live_objects()
    }

    /// Current surface size.
    pub fn surface_size(&self) -> (u32, u32) {
        let st = self.state.lock().unwrap();
        (st.width, st.height)
    }

    /// Current vsync setting.
    pub fn vsync(&self) -> bool {
        self.state.lock().unwrap().vsync
    }

    fn create_buffer_in(
        &self,
        map: impl FnOnce(&mut HeadlessState) -> &mut HashMap<Handle, BufferStorage>,
        handle: Handle,
        desc: &BufferDescriptor,
    ) -> Result<(), DeviceError> {
        let mut st = self.state.lock().unwrap();
        st.push(TraceEvent::Create { handle });
        let storage = BufferStorage {
            desc: desc.clone(),
            data: vec![0; desc.size as usize],
        };
        if map(&mut *st).insert(handle, storage).is_some() {
            return Err(DeviceError::Backend {
                op: "buffer create",
                details: format!("{handle:?} already exists"),
            });
        }
        Ok(())
    }

    fn update_buffer_in(
        &self,
        map: impl FnOnce(&mut HeadlessState) -> &mut HashMap<Handle, BufferStorage>,
        handle: Handle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), DeviceError> {
        let mut st = self.state.lock().unwrap();
        st.push(TraceEvent::Update {
            handle,
            bytes: data.len(),
        });
        let storage = map(&mut *st).get_mut(&handle).ok_or_else(|| invalid(handle))?;
        write_range(storage, offset, data)
    }

    fn destroy_in<T>(
        &self,
        map: impl FnOnce(&mut HeadlessState) -> &mut HashMap<Handle, T>,
        handle: Handle,
    ) -> Result<(), DeviceError> {
        let mut st = self.state.lock().unwrap();
        st.push(TraceEvent::Destroy { handle });
        map(&mut *st).remove(&handle).map(|_| ()).ok_or_else(|| invalid(handle))
    }
}

impl DeviceBackend for HeadlessDevice {
    fn api(&self) -> BackendApi {
        BackendApi::Headless
    }

    fn reset(&self, param: &ResetParam) -> Result<(), DeviceError> {
        let mut st = self.state.lock().unwrap();
        st.width = param.width;
        st.height = param.height;
        st.vsync = param.vsync;
        st.push(TraceEvent::Reset {
            width: param.width,
            height: param.height,
        });
        log::info!("headless surface reset to {}x{}", param.width, param.height);
        Ok(())
    }

    fn uninitialize(&self) {
        let mut st = self.state.lock().unwrap();
        let leaked = st.live_objects();
        if leaked > 0 {
            log::warn!("headless backend released with {leaked} live objects");
        }
        st.vertex_buffers.clear();
        st.index_buffers.clear();
        st.const_buffers.clear();
        st.textures.clear();
        st.pipeline_states.clear();
        st.depth_stencil_states.clear();
        st.sampler_states.clear();
        st.query_buffers.clear();
    }

    fn create_vertex_buffer(&self, handle: Handle, desc: &BufferDescriptor) -> Result<(), DeviceError> {
        self.create_buffer_in(|st| &mut st.vertex_buffers, handle, desc)
    }

    fn update_vertex_buffer(&self, handle: Handle, offset: u64, data: &[u8]) -> Result<(), DeviceError> {
        self.update_buffer_in(|st| &mut st.vertex_buffers, handle, offset, data)
    }

    fn destroy_vertex_buffer(&self, handle: Handle) -> Result<(), DeviceError> {
        self.destroy_in(|st| &mut st.vertex_buffers, handle)
    }

    fn create_index_buffer(&self, handle: Handle, desc: &BufferDescriptor) -> Result<(), DeviceError> {
        self.create_buffer_in(|st| &mut st.index_buffers, handle, desc)
    }

    fn update_index_buffer(&self, handle: Handle, offset: u64, data: &[u8]) -> Result<(), DeviceError> {
        self.update_buffer_in(|st| &mut st.index_buffers, handle, offset, data)
    }

    fn destroy_index_buffer(&self, handle: Handle) -> Result<(), DeviceError> {
        self.destroy_in(|st| &mut st.index_buffers, handle)
    }

    fn create_const_buffer(&self, handle: Handle, desc: &BufferDescriptor) -> Result<(), DeviceError> {
        self.create_buffer_in(|st| &mut st.const_buffers, handle, desc)
    }

    fn update_const_buffer(&self, handle: Handle, offset: u64, data: &[u8]) -> Result<(), DeviceError> {
        self.update_buffer_in(|st| &mut st.const_buffers, handle, offset, data)
    }

    fn destroy_const_buffer(&self, handle: Handle) -> Result<(), DeviceError> {
        self.destroy_in(|st| &mut st.const_buffers, handle)
    }

    fn create_texture(&self, handle: Handle, desc: &TextureDescriptor) -> Result<(), DeviceError> {
        let mut st = self.state.lock().unwrap();
        st.push(TraceEvent::Create { handle });
        if st
            .textures
            .insert(
                handle,
                TextureStorage {
                    desc: desc.clone(),
                    levels: HashMap::new(),
                },
            )
            .is_some()
        {
            return Err(DeviceError::Backend {
                op: "texture create",
                details: format!("{handle:?} already exists"),
            });
        }
        Ok(())
    }

    fn update_texture(&self, handle: Handle, level: u32, data: &[u8]) -> Result<(), DeviceError> {
        let mut st = self.state.lock().unwrap();
        st.push(TraceEvent::Update {
            handle,
            bytes: data.len(),
        });
        let texture = st.textures.get_mut(&handle).ok_or_else(|| invalid(handle))?;
        let expected = texture_size(texture.desc.format, texture.desc.width, texture.desc.height, level);
        if level >= texture.desc.mip_levels || data.len() as u64 != expected {
            return Err(DeviceError::Backend {
                op: "texture update",
                details: format!(
                    "level {level} expects {expected} bytes, got {}",
                    data.len()
                ),
            });
        }
        texture.levels.insert(level, data.to_vec());
        Ok(())
    }

    fn destroy_texture(&self, handle: Handle) -> Result<(), DeviceError> {
        self.destroy_in(|st| &mut st.textures, handle)
    }

    fn create_pipeline_state(
        &self,
        handle: Handle,
        desc: &PipelineStateDescriptor,
    ) -> Result<(), DeviceError> {
        let mut st = self.state.lock().unwrap();
        st.push(TraceEvent::Create { handle });
        st.pipeline_states.insert(handle, desc.clone());
        Ok(())
    }

    fn destroy_pipeline_state(&self, handle: Handle) -> Result<(), DeviceError> {
        self.destroy_in(|st| &mut st.pipeline_states, handle)
    }

    fn create_depth_stencil_state(
        &self,
        handle: Handle,
        desc: &DepthStencilDescriptor,
    ) -> Result<(), DeviceError> {
        let mut st = self.state.lock().unwrap();
        st.push(TraceEvent::Create { handle });
        st.depth_stencil_states.insert(handle, desc.clone());
        Ok(())
    }

    fn destroy_depth_stencil_state(&self, handle: Handle) -> Result<(), DeviceError> {
        self.destroy_in(|st| &mut st.depth_stencil_states, handle)
    }

    fn create_sampler_state(&self, handle: Handle, desc: &SamplerDescriptor) -> Result<(), DeviceError> {
        let mut st = self.state.lock().unwrap();
        st.push(TraceEvent::Create { handle });
        st.sampler_states.insert(handle, desc.clone());
        Ok(())
    }

    fn destroy_sampler_state(&self, handle: Handle) -> Result<(), DeviceError> {
        self.destroy_in(|st| &mut st.sampler_states, handle)
    }

    fn create_query_buffer(
        &self,
        handle: Handle,
        desc: &QueryBufferDescriptor,
    ) -> Result<(), DeviceError> {
        let mut st = self.state.lock().unwrap();
        st.push(TraceEvent::Create { handle });
        st.query_buffers.insert(
            handle,
            QueryStorage {
                max_object_count: desc.max_object_count,
                results: vec![None; desc.max_object_count as usize],
                active: None,
            },
        );
        Ok(())
    }

    fn destroy_query_buffer(&self, handle: Handle) -> Result<(), DeviceError> {
        self.destroy_in(|st| &mut st.query_buffers, handle)
    }

    fn query_is_ready(&self, handle: Handle, object_index: u32) -> bool {
        let st = self.state.lock().unwrap();
        st.query_buffers
            .get(&handle)
            .and_then(|q| q.results.get(object_index as usize))
            .map(|r| r.is_some())
            .unwrap_or(false)
    }

    fn query_value(&self, handle: Handle, object_index: u32) -> i32 {
        let st = self.state.lock().unwrap();
        st.query_buffers
            .get(&handle)
            .and_then(|q| q.results.get(object_index as usize))
            .and_then(|r| *r)
            .unwrap_or(0)
    }

    fn begin_pass(&self, config: &RenderPassConfig) -> Result<(), DeviceError> {
        let cleared = matches!(
            config.color.ops.load,
            karst_core::api::LoadOp::Clear(_)
        );
        let mut st = self.state.lock().unwrap();
        st.push(TraceEvent::BeginPass {
            priority: config.priority,
            cleared,
        });
        Ok(())
    }

    fn end_pass(&self, _config: &RenderPassConfig) -> Result<(), DeviceError> {
        let mut st = self.state.lock().unwrap();
        st.push(TraceEvent::EndPass);
        Ok(())
    }

    fn bind_pipeline_state(&self, pipeline: Handle, layout: u32) -> Result<(), DeviceError> {
        let mut st = self.state.lock().unwrap();
        st.push(TraceEvent::BindPipeline { pipeline, layout });
        if !st.pipeline_states.contains_key(&pipeline) {
            return Err(invalid(pipeline));
        }
        Ok(())
    }

    fn set_cull_mode(&self, mode: CullMode) -> Result<(), DeviceError> {
        self.state.lock().unwrap().push(TraceEvent::SetCullMode(mode));
        Ok(())
    }

    fn set_scissor_rect(&self, rect: ScissorRect) -> Result<(), DeviceError> {
        self.state.lock().unwrap().push(TraceEvent::SetScissorRect(rect));
        Ok(())
    }

    fn set_viewport(&self, viewport: Viewport) -> Result<(), DeviceError> {
        self.state.lock().unwrap().push(TraceEvent::SetViewport(viewport));
        Ok(())
    }

    fn bind_vertex_buffer(&self, buffer: Handle, stream: u32) -> Result<(), DeviceError> {
        let mut st = self.state.lock().unwrap();
        st.push(TraceEvent::BindVertexBuffer { buffer, stream });
        if !st.vertex_buffers.contains_key(&buffer) {
            return Err(invalid(buffer));
        }
        Ok(())
    }

    fn bind_index_buffer(&self, buffer: Handle) -> Result<(), DeviceError> {
        let mut st = self.state.lock().unwrap();
        st.push(TraceEvent::BindIndexBuffer { buffer });
        if !st.index_buffers.contains_key(&buffer) {
            return Err(invalid(buffer));
        }
        Ok(())
    }

    fn bind_const_buffer(
        &self,
        stage: ShaderStage,
        slot: u32,
        buffer: Handle,
    ) -> Result<(), DeviceError> {
        let mut st = self.state.lock().unwrap();
        st.push(TraceEvent::BindConstBuffer { stage, slot, buffer });
        if !st.const_buffers.contains_key(&buffer) {
            return Err(invalid(buffer));
        }
        Ok(())
    }

    fn bind_texture(&self, stage: ShaderStage, unit: u32, texture: Handle) -> Result<(), DeviceError> {
        let mut st = self.state.lock().unwrap();
        st.push(TraceEvent::BindTexture { stage, unit, texture });
        if !st.textures.contains_key(&texture) {
            return Err(invalid(texture));
        }
        Ok(())
    }

    fn bind_depth_stencil_state(&self, state: Handle) -> Result<(), DeviceError> {
        let mut st = self.state.lock().unwrap();
        st.push(TraceEvent::BindDepthStencilState { state });
        Ok(())
    }

    fn bind_sampler_state(&self, state: Handle) -> Result<(), DeviceError> {
        let mut st = self.state.lock().unwrap();
        st.push(TraceEvent::BindSamplerState { state });
        Ok(())
    }

    fn begin_query(&self, buffer: Handle, object_index: u32) -> Result<(), DeviceError> {
        let mut st = self.state.lock().unwrap();
        st.push(TraceEvent::BeginQuery {
            buffer,
            index: object_index,
        });
        let draws = st.draw_count;
        let query = st.query_buffers.get_mut(&buffer).ok_or_else(|| invalid(buffer))?;
        if object_index >= query.max_object_count {
            return Err(DeviceError::Backend {
                op: "begin_query",
                details: format!("query index {object_index} out of range"),
            });
        }
        query.active = Some((object_index, draws));
        Ok(())
    }

    fn end_query(&self, buffer: Handle, object_index: u32) -> Result<(), DeviceError> {
        let mut st = self.state.lock().unwrap();
        st.push(TraceEvent::EndQuery {
            buffer,
            index: object_index,
        });
        let draws = st.draw_count;
        let query = st.query_buffers.get_mut(&buffer).ok_or_else(|| invalid(buffer))?;
        match query.active.take() {
            Some((index, at_begin)) if index == object_index => {
                query.results[index as usize] = Some((draws - at_begin) as i32);
                Ok(())
            }
            _ => Err(DeviceError::Backend {
                op: "end_query",
                details: format!("query {object_index} was not open"),
            }),
        }
    }

    fn draw(&self, primitive: PrimitiveType, primitive_count: u32) -> Result<(), DeviceError> {
        let mut st = self.state.lock().unwrap();
        st.draw_count += 1;
        st.push(TraceEvent::Draw {
            primitive,
            count: primitive_count,
            vertices: primitive.vertex_count(primitive_count),
        });
        Ok(())
    }

    fn draw_indexed(
        &self,
        primitive: PrimitiveType,
        primitive_count: u32,
        first_vertex: u32,
        start_index: u32,
    ) -> Result<(), DeviceError> {
        let mut st = self.state.lock().unwrap();
        st.draw_count += 1;
        st.push(TraceEvent::DrawIndexed {
            primitive,
            count: primitive_count,
            vertices: primitive.vertex_count(primitive_count),
            first_vertex,
            start_index,
        });
        Ok(())
    }

    fn marker(&self, text: &str) {
        self.state
            .lock()
            .unwrap()
            .push(TraceEvent::Marker(text.to_owned()));
    }

    fn present_frame(&self) -> Result<(), DeviceError> {
        let mut st = self.state.lock().unwrap();
        st.frames_presented += 1;
        st.push(TraceEvent::Present);
        Ok(())
    }

    fn finish_frame(&self) {
        self.state.lock().unwrap().push(TraceEvent::FinishFrame);
    }
}
