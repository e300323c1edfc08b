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

//! End-to-end recording and replay against the headless backend,
//! executing inline (no render thread).

mod common;

use karst_core::api::{
    BufferDescriptor, BufferUsage, PrimitiveType, QueryBufferDescriptor, RenderPassConfig,
    TextureDescriptor, TextureFormat, Viewport,
};
use karst_core::Handle;
use karst_infra::graphics::headless::TraceEvent;

#[test]
fn two_buffer_pass_replays_draws_in_registration_order() {
    let (ctx, dev) = common::init(false);

    let config = RenderPassConfig::default();
    let (pass, buffers) = ctx.allocate_render_pass(&config, 2);
    assert_eq!(buffers.len(), 2);

    ctx.begin_render_pass(pass);
    ctx.begin_command_buffer(buffers[0]);
    ctx.draw_primitive(buffers[0], PrimitiveType::TriangleList, 10);
    ctx.end_command_buffer(buffers[0]);
    ctx.begin_command_buffer(buffers[1]);
    ctx.draw_primitive(buffers[1], PrimitiveType::TriangleList, 20);
    ctx.end_command_buffer(buffers[1]);
    ctx.end_render_pass(pass);
    ctx.present();

    let trace = dev.trace();
    let draws: Vec<_> = trace
        .iter()
        .filter_map(|e| match e {
            TraceEvent::Draw {
                primitive, count, ..
            } => Some((*primitive, *count)),
            _ => None,
        })
        .collect();
    assert_eq!(
        draws,
        vec![
            (PrimitiveType::TriangleList, 10),
            (PrimitiveType::TriangleList, 20),
        ]
    );

    // The pass clears once, flushes once, then the frame presents.
    let begin = trace
        .iter()
        .position(|e| matches!(e, TraceEvent::BeginPass { .. }))
        .unwrap();
    let end = trace.iter().position(|e| *e == TraceEvent::EndPass).unwrap();
    let present = trace.iter().position(|e| *e == TraceEvent::Present).unwrap();
    assert!(begin < end && end < present);
    assert_eq!(
        trace
            .iter()
            .filter(|e| matches!(e, TraceEvent::BeginPass { .. }))
            .count(),
        1
    );

    let stats = ctx.stats();
    assert_eq!(stats.frames_presented, 1);
    assert_eq!(stats.draw_calls, 2);
}

#[test]
fn redundant_pipeline_set_reaches_the_device_once() {
    let (ctx, dev) = common::init(false);

    let pipeline = ctx
        .create_pipeline_state(&Default::default())
        .expect("pipeline state");
    let config = RenderPassConfig::default();
    let (pass, buffers) = ctx.allocate_render_pass(&config, 1);
    let cb = buffers[0];

    ctx.begin_render_pass(pass);
    ctx.begin_command_buffer(cb);
    ctx.set_pipeline_state(cb, pipeline, 0);
    ctx.draw_primitive(cb, PrimitiveType::TriangleList, 1);
    ctx.set_pipeline_state(cb, pipeline, 0);
    ctx.draw_primitive(cb, PrimitiveType::TriangleList, 1);
    ctx.end_command_buffer(cb);
    ctx.end_render_pass(pass);
    ctx.present();

    let binds = dev
        .trace()
        .iter()
        .filter(|e| matches!(e, TraceEvent::BindPipeline { .. }))
        .count();
    assert_eq!(binds, 1);
}

#[test]
fn vertex_data_uploads_are_visible_to_the_device() {
    let (ctx, dev) = common::init(false);

    let vertices: [f32; 6] = [0.0, 0.5, -0.5, -0.5, 0.5, -0.5];
    let bytes: &[u8] = bytemuck::cast_slice(&vertices);

    let vb = ctx
        .create_vertex_buffer(&BufferDescriptor {
            label: Some("triangle".into()),
            size: bytes.len() as u64,
            usage: BufferUsage::VERTEX | BufferUsage::COPY_DST | BufferUsage::MAP_WRITE,
        })
        .unwrap();
    ctx.update_vertex_buffer(vb, 0, bytes).unwrap();
    assert_eq!(dev.buffer_contents(vb).unwrap(), bytes);
    assert_eq!(dev.buffer_descriptor(vb).unwrap().size, bytes.len() as u64);

    // Mapping flushes on drop.
    {
        let mut mapped = ctx.map_vertex_buffer(vb, 0, 4).unwrap();
        mapped.copy_from_slice(&[0xAA; 4]);
    }
    let stored = dev.buffer_contents(vb).unwrap();
    assert_eq!(&stored[..4], &[0xAA; 4]);
    assert_eq!(&stored[4..], &bytes[4..]);

    // Out-of-range writes never reach the device.
    assert!(ctx.update_vertex_buffer(vb, bytes.len() as u64 - 1, &[1, 2]).is_err());
}

#[test]
fn texture_levels_upload_with_exact_sizes() {
    let (ctx, dev) = common::init(false);

    let tex = ctx
        .create_texture(&TextureDescriptor {
            label: None,
            width: 4,
            height: 4,
            format: TextureFormat::Rgba8,
            mip_levels: 2,
        })
        .unwrap();

    let level0 = vec![0x11u8; 4 * 4 * 4];
    let level1 = vec![0x22u8; 2 * 2 * 4];
    ctx.update_texture(tex, 0, &level0).unwrap();
    ctx.update_texture(tex, 1, &level1).unwrap();
    assert_eq!(dev.texture_level(tex, 0).unwrap(), level0);
    assert_eq!(dev.texture_level(tex, 1).unwrap(), level1);

    // Wrong payload size is rejected before the device sees it.
    assert!(ctx.update_texture(tex, 1, &level0).is_err());
}

#[test]
fn invalid_handle_leaves_previous_binding_in_place() {
    let (ctx, dev) = common::init(false);

    let cbuf = ctx
        .create_const_buffer(&BufferDescriptor {
            label: None,
            size: 64,
            usage: BufferUsage::UNIFORM,
        })
        .unwrap();

    let config = RenderPassConfig::default();
    let (pass, buffers) = ctx.allocate_render_pass(&config, 1);
    let cb = buffers[0];
    ctx.begin_render_pass(pass);
    ctx.begin_command_buffer(cb);
    ctx.set_vertex_const_buffer(cb, 0, cbuf);
    ctx.draw_primitive(cb, PrimitiveType::TriangleList, 1);
    // Partial rebinding: slot 0 untouched by the invalid handle.
    ctx.set_vertex_const_buffer(cb, 0, Handle::INVALID);
    ctx.draw_primitive(cb, PrimitiveType::TriangleList, 1);
    ctx.end_command_buffer(cb);
    ctx.end_render_pass(pass);
    ctx.present();

    let const_binds = dev
        .trace()
        .iter()
        .filter(|e| matches!(e, TraceEvent::BindConstBuffer { .. }))
        .count();
    assert_eq!(const_binds, 1, "one real bind, nothing for the invalid handle");
}

#[test]
fn queries_report_draws_between_their_brackets() {
    let (ctx, dev) = common::init(false);

    let qb = ctx
        .create_query_buffer(&QueryBufferDescriptor {
            label: None,
            max_object_count: 8,
        })
        .unwrap();

    let config = RenderPassConfig::default();
    let (pass, buffers) = ctx.allocate_render_pass(&config, 1);
    let cb = buffers[0];
    ctx.begin_render_pass(pass);
    ctx.begin_command_buffer(cb);
    ctx.set_query_buffer(cb, qb);
    ctx.set_query_index(cb, 3);
    ctx.draw_primitive(cb, PrimitiveType::TriangleList, 6);
    ctx.end_command_buffer(cb);
    ctx.end_render_pass(pass);
    ctx.present();

    assert!(ctx.query_is_ready(qb, 3));
    assert_eq!(ctx.query_value(qb, 3), 1);
    assert!(!ctx.query_is_ready(qb, 0));
    let _ = dev;
}

#[test]
fn viewport_and_markers_pass_through_in_order() {
    let (ctx, dev) = common::init(false);

    let config = RenderPassConfig::default();
    let (pass, buffers) = ctx.allocate_render_pass(&config, 1);
    let cb = buffers[0];
    ctx.begin_render_pass(pass);
    ctx.begin_command_buffer(cb);
    ctx.set_marker(cb, "opaque geometry");
    ctx.set_viewport(
        cb,
        Viewport {
            x: 0,
            y: 0,
            width: 320,
            height: 200,
        },
    );
    ctx.draw_primitive(cb, PrimitiveType::LineList, 2);
    ctx.end_command_buffer(cb);
    ctx.end_render_pass(pass);
    ctx.present();

    let trace = dev.trace();
    let marker = trace
        .iter()
        .position(|e| *e == TraceEvent::Marker("opaque geometry".into()))
        .unwrap();
    let viewport = trace
        .iter()
        .position(|e| matches!(e, TraceEvent::SetViewport(v) if v.width == 320))
        .unwrap();
    let draw = trace
        .iter()
        .position(|e| matches!(e, TraceEvent::Draw { .. }))
        .unwrap();
    assert!(marker < viewport && viewport < draw);
}

#[test]
fn present_without_recorded_work_does_nothing() {
    let (ctx, dev) = common::init(false);
    ctx.present();
    assert_eq!(ctx.stats().frames_presented, 0);
    assert!(dev.trace().is_empty());
}
