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

//! Dedicated-render-thread behavior: device calls land on the engine's
//! thread, immediate operations stay synchronous, shutdown drains.

mod common;

use anyhow::Result;
use karst_core::api::{BufferDescriptor, BufferUsage, PrimitiveType, RenderPassConfig};
use karst_core::ResetParam;
use std::thread;
use std::time::{Duration, Instant};

fn wait_until(mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done() {
        assert!(Instant::now() < deadline, "timed out waiting for the render thread");
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn resource_creation_executes_on_the_render_thread_synchronously() -> Result<()> {
    let (ctx, dev) = common::init(true);
    let caller = thread::current().id();

    let vb = ctx.create_vertex_buffer(&BufferDescriptor {
        label: None,
        size: 16,
        usage: BufferUsage::VERTEX | BufferUsage::COPY_DST,
    })?;

    // Synchronous from the caller's point of view: the native object
    // exists the moment the call returns...
    assert!(dev.buffer_contents(vb).is_some());
    ctx.update_vertex_buffer(vb, 0, &[7; 16])?;
    assert_eq!(dev.buffer_contents(vb).unwrap(), vec![7; 16]);

    // ...but it physically ran on the engine's thread, not ours.
    let threads = dev.exec_threads();
    assert_eq!(threads.len(), 1);
    assert_ne!(threads[0], caller);
    Ok(())
}

#[test]
fn frames_replay_on_the_render_thread_in_order() -> Result<()> {
    let (ctx, dev) = common::init(true);
    let caller = thread::current().id();

    for frame in 1..=3u32 {
        let config = RenderPassConfig::default();
        let (pass, buffers) = ctx.allocate_render_pass(&config, 1);
        let cb = buffers[0];
        ctx.begin_render_pass(pass);
        ctx.begin_command_buffer(cb);
        ctx.draw_primitive(cb, PrimitiveType::TriangleList, frame);
        ctx.end_command_buffer(cb);
        ctx.end_render_pass(pass);
        ctx.present();
    }

    wait_until(|| dev.frames_presented() == 3);

    let draws: Vec<u32> = dev
        .trace()
        .iter()
        .filter_map(|e| match e {
            karst_infra::graphics::headless::TraceEvent::Draw { count, .. } => Some(*count),
            _ => None,
        })
        .collect();
    assert_eq!(draws, vec![1, 2, 3], "frame N replays fully before frame N+1");

    let threads = dev.exec_threads();
    assert_eq!(threads.len(), 1);
    assert_ne!(threads[0], caller);
    Ok(())
}

#[test]
fn reset_routes_through_the_engine_between_frames() {
    let (ctx, dev) = common::init(true);

    ctx.reset(&ResetParam {
        width: 800,
        height: 600,
        vsync: false,
    });
    // Immediate-channel semantics make the reset visible on return.
    assert_eq!(dev.surface_size(), (800, 600));
    assert!(!dev.vsync());
}

#[test]
fn shutdown_joins_the_render_thread_and_releases_the_device() {
    let (mut ctx, dev) = common::init(true);

    let config = RenderPassConfig::default();
    let (pass, buffers) = ctx.allocate_render_pass(&config, 1);
    let cb = buffers[0];
    ctx.begin_render_pass(pass);
    ctx.begin_command_buffer(cb);
    ctx.draw_primitive(cb, PrimitiveType::TriangleList, 4);
    ctx.end_command_buffer(cb);
    ctx.end_render_pass(pass);
    ctx.present();

    // Explicit shutdown drains the queued frame before the loop exits.
    ctx.shutdown();
    assert_eq!(dev.frames_presented(), 1);
    assert_eq!(dev.live_objects(), 0);

    // Dropping after an explicit shutdown is a no-op.
    drop(ctx);
}
