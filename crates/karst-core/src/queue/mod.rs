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

//! The multi-buffered submission queue and the immediate-command mailbox.
//!
//! These two pieces are the only state shared across the producer/engine
//! boundary, so they live behind one mutex: every wakeup condition (frame
//! ready, slot free, mailbox state change, exit) is re-checked under the
//! same lock that changed it, which is what makes the condvar handoffs
//! lossless.

pub(crate) mod immediate;

pub use immediate::{ImmediateOp, ImmediateResult};

use crate::handle::Handle;
use std::collections::VecDeque;
use std::mem;
use std::sync::{Condvar, Mutex};

/// One frame slot: the render passes submitted between two `present`s.
#[derive(Debug)]
struct Frame {
    number: u64,
    passes: Vec<Handle>,
    ready: bool,
}

/// State of the single-slot immediate mailbox.
#[derive(Debug)]
enum Mailbox {
    /// No batch in flight.
    Empty,
    /// A batch is published and waiting for the engine.
    Pending(Vec<ImmediateOp>),
    /// The engine took the batch and is executing it.
    Executing,
    /// The batch finished; results await the publisher.
    Done(Vec<ImmediateResult>),
}

#[derive(Debug)]
struct QueueState {
    frames: VecDeque<Frame>,
    frame_open: bool,
    next_frame_number: u64,
    mailbox: Mailbox,
    exit_pending: bool,
}

/// What the execution engine should do next.
#[derive(Debug)]
pub enum WorkItem {
    /// Replay a ready frame. The slot stays occupied until
    /// [`SubmissionQueue::retire_frame`].
    Frame {
        /// The frame's sequence number.
        number: u64,
        /// The frame's render passes, in submission order.
        passes: Vec<Handle>,
    },
    /// Execute an immediate batch and report it via
    /// [`SubmissionQueue::complete_immediate`].
    Immediate(Vec<ImmediateOp>),
    /// Leave the loop; nothing is pending.
    Exit,
}

/// The fixed-depth ring of frames in flight plus the immediate mailbox.
///
/// Producers register passes into the open frame and seal it with
/// [`finish_frame`](SubmissionQueue::finish_frame); the engine consumes
/// ready frames in order and retires each slot once its passes are fully
/// replayed. `wait_for_capacity` is the backpressure point: it blocks the
/// producer while more than `depth` frames are outstanding, and retiring a
/// slot wakes exactly one blocked producer.
#[derive(Debug)]
pub struct SubmissionQueue {
    depth: usize,
    state: Mutex<QueueState>,
    /// Engine-side wakeups: frame ready, immediate pending, exit.
    work: Condvar,
    /// Producer-side wakeups: a frame slot retired.
    space: Condvar,
    /// Publisher-side wakeups: mailbox slot freed or batch done.
    mailbox_cv: Condvar,
}

impl SubmissionQueue {
    /// Creates a queue holding at most `depth` frames in flight.
    pub fn new(depth: usize) -> Self {
        Self {
            depth: depth.max(1),
            state: Mutex::new(QueueState {
                frames: VecDeque::new(),
                frame_open: false,
                next_frame_number: 1,
                mailbox: Mailbox::Empty,
                exit_pending: false,
            }),
            work: Condvar::new(),
            space: Condvar::new(),
            mailbox_cv: Condvar::new(),
        }
    }

    /// The configured frame depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of frame slots currently occupied (open, ready, or
    /// executing).
    pub fn frame_count(&self) -> usize {
        self.state.lock().unwrap().frames.len()
    }

    // --- Producer side ----------------------------------------------------

    /// Registers a render pass into the current frame, opening a new frame
    /// slot if none is open.
    pub fn register_pass(&self, pass: Handle) {
        let mut st = self.state.lock().unwrap();
        if !st.frame_open {
            let number = st.next_frame_number;
            st.next_frame_number += 1;
            st.frames.push_back(Frame {
                number,
                passes: Vec::new(),
                ready: false,
            });
            st.frame_open = true;
            log::trace!("frame {number} started");
        }
        st.frames.back_mut().unwrap().passes.push(pass);
    }

    /// Seals the open frame and hands it to the engine.
    ///
    /// Returns `false` when no pass was registered since the last seal;
    /// a `present` without work does nothing.
    pub fn finish_frame(&self) -> bool {
        let mut st = self.state.lock().unwrap();
        if !st.frame_open {
            return false;
        }
        let frame = st.frames.back_mut().unwrap();
        frame.ready = true;
        log::trace!("frame {} sealed ({} passes)", frame.number, frame.passes.len());
        st.frame_open = false;
        self.work.notify_all();
        true
    }

    /// Blocks the caller until the number of outstanding frames is back
    /// within the configured depth.
    pub fn wait_for_capacity(&self) {
        let mut st = self.state.lock().unwrap();
        while st.frames.len() > self.depth {
            st = self.space.wait(st).unwrap();
        }
    }

    // --- Engine side ------------------------------------------------------

    /// Blocks until there is something to do and returns it.
    ///
    /// Immediate batches win over frames so a producer stuck in
    /// [`submit_immediate`](SubmissionQueue::submit_immediate) is never
    /// made to wait out a whole frame replay that hasn't started yet; exit
    /// is reported only once no work is pending.
    pub fn wait_for_work(&self) -> WorkItem {
        let mut st = self.state.lock().unwrap();
        loop {
            if matches!(st.mailbox, Mailbox::Pending(_)) {
                let Mailbox::Pending(ops) = mem::replace(&mut st.mailbox, Mailbox::Executing)
                else {
                    unreachable!();
                };
                return WorkItem::Immediate(ops);
            }
            if let Some(frame) = st.frames.front() {
                if frame.ready {
                    return WorkItem::Frame {
                        number: frame.number,
                        passes: frame.passes.clone(),
                    };
                }
            }
            if st.exit_pending {
                return WorkItem::Exit;
            }
            st = self.work.wait(st).unwrap();
        }
    }

    /// Returns the front frame if it is ready, without blocking. Used by
    /// the inline execution path.
    pub fn front_ready_frame(&self) -> Option<(u64, Vec<Handle>)> {
        let st = self.state.lock().unwrap();
        st.frames
            .front()
            .filter(|f| f.ready)
            .map(|f| (f.number, f.passes.clone()))
    }

    /// Retires the front frame slot after its passes are fully replayed,
    /// waking exactly one producer blocked on capacity.
    pub fn retire_frame(&self) {
        let mut st = self.state.lock().unwrap();
        let frame = st.frames.pop_front().expect("retire with no frame");
        debug_assert!(frame.ready, "retired an unsealed frame");
        log::trace!("frame {} retired", frame.number);
        self.space.notify_one();
    }

    /// Takes a pending immediate batch if one is waiting. Called by the
    /// engine between decoded commands mid-replay.
    pub fn try_take_immediate(&self) -> Option<Vec<ImmediateOp>> {
        let mut st = self.state.lock().unwrap();
        if matches!(st.mailbox, Mailbox::Pending(_)) {
            let Mailbox::Pending(ops) = mem::replace(&mut st.mailbox, Mailbox::Executing) else {
                unreachable!();
            };
            Some(ops)
        } else {
            None
        }
    }

    /// Publishes the results of the batch taken last, releasing its
    /// publisher.
    pub fn complete_immediate(&self, results: Vec<ImmediateResult>) {
        let mut st = self.state.lock().unwrap();
        debug_assert!(
            matches!(st.mailbox, Mailbox::Executing),
            "complete_immediate with no batch in flight"
        );
        st.mailbox = Mailbox::Done(results);
        self.mailbox_cv.notify_all();
    }

    // --- Publisher side ---------------------------------------------------

    /// Publishes `ops` into the single-slot mailbox and blocks until the
    /// engine has executed the batch.
    ///
    /// At most one batch is in flight at a time; a second publisher waits
    /// here for the slot. The call is synchronous from the publisher's
    /// point of view even though the operations run on the engine's thread.
    pub fn submit_immediate(&self, ops: Vec<ImmediateOp>) -> Vec<ImmediateResult> {
        let mut st = self.state.lock().unwrap();
        while !matches!(st.mailbox, Mailbox::Empty) {
            st = self.mailbox_cv.wait(st).unwrap();
        }
        st.mailbox = Mailbox::Pending(ops);
        self.work.notify_all();

        while !matches!(st.mailbox, Mailbox::Done(_)) {
            st = self.mailbox_cv.wait(st).unwrap();
        }
        let Mailbox::Done(results) = mem::replace(&mut st.mailbox, Mailbox::Empty) else {
            unreachable!();
        };
        // Hand the freed slot to the next waiting publisher.
        self.mailbox_cv.notify_all();
        results
    }

    // --- Shutdown ---------------------------------------------------------

    /// Asks the engine loop to exit once pending work is drained.
    pub fn request_exit(&self) {
        let mut st = self.state.lock().unwrap();
        st.exit_pending = true;
        self.work.notify_all();
    }
}
