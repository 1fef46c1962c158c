//! Per-connection state shared by the reader thread and the UI.
//!
//! Every connect builds a fresh [`SessionContext`], so nothing latched or
//! timed in one session can leak into the next one.

use crate::error::{Error, Result};
use crate::serial::LineSource;
use crate::timer::LatencyTimer;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderEvent {
    Line(String),
    Triggered,
    ReadFailed(String),
    Stopped,
}

#[derive(Debug)]
pub struct SessionContext {
    generation: u64,
    timer: Mutex<LatencyTimer>,
    closed: AtomicBool,
}

impl SessionContext {
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            timer: Mutex::new(LatencyTimer::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Asks the reader to stop. Returns `false` if already closed.
    pub fn close(&self) -> bool {
        !self.closed.swap(true, Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    // Timer updates are single assignments, a poisoned lock still holds a valid phase.
    fn timer(&self) -> MutexGuard<'_, LatencyTimer> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Trigger check and latch under one lock.
    pub fn observe(&self, line: &str) -> bool {
        self.timer().observe(line, Instant::now())
    }

    pub fn pause(&self) -> Option<Duration> {
        self.timer().pause(Instant::now())
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.timer().elapsed(Instant::now())
    }

    pub fn is_timing(&self) -> bool {
        self.timer().is_timing()
    }

    pub fn is_latched(&self) -> bool {
        self.timer().is_latched()
    }

    pub fn reset(&self) {
        self.timer().reset();
    }

    fn should_read(&self) -> bool {
        !self.is_closed() && !self.is_latched()
    }
}

/// Reads lines until the session is closed, the trigger fires, the source
/// fails or nobody listens to `events` anymore.
pub fn read_loop<S: LineSource>(mut source: S, ctx: &SessionContext, events: &Sender<ReaderEvent>) {
    debug!(generation = ctx.generation(), "reader started");

    while ctx.should_read() {
        let line = match source.read_line() {
            Ok(Some(line)) => line,
            Ok(None) => continue,
            Err(e) => {
                warn!(generation = ctx.generation(), "read failed: {}", e);
                let _ = events.send(ReaderEvent::ReadFailed(e.to_string()));
                break;
            }
        };
        // closed while the read was blocked
        if ctx.is_closed() {
            break;
        }
        if events.send(ReaderEvent::Line(line.clone())).is_err() {
            break;
        }
        if ctx.observe(&line) {
            info!(generation = ctx.generation(), line = %line, "timing started");
            let _ = events.send(ReaderEvent::Triggered);
        }
    }

    source.close();
    let _ = events.send(ReaderEvent::Stopped);
    debug!(generation = ctx.generation(), "reader stopped");
}

/// UI-side owner of a running session. Dropping it closes the session
/// without waiting for the reader.
pub struct SessionHandle {
    ctx: Arc<SessionContext>,
    events: Receiver<ReaderEvent>,
    port: String,
    reader: Option<JoinHandle<()>>,
}

impl SessionHandle {
    pub fn spawn<S>(source: S, port: &str, generation: u64) -> Result<Self>
    where
        S: LineSource + 'static,
    {
        let ctx = Arc::new(SessionContext::new(generation));
        let (tx, rx) = unbounded();

        let reader_ctx = ctx.clone();
        let reader = thread::Builder::new()
            .name(format!("serial-reader-{generation}"))
            .spawn(move || read_loop(source, &reader_ctx, &tx))
            .map_err(Error::Read)?;

        Ok(Self {
            ctx,
            events: rx,
            port: port.to_string(),
            reader: Some(reader),
        })
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn generation(&self) -> u64 {
        self.ctx.generation()
    }

    pub fn events(&self) -> Receiver<ReaderEvent> {
        self.events.clone()
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn close(&self) {
        if self.ctx.close() {
            info!(port = %self.port, generation = self.generation(), "session closed");
        }
    }

    /// Closes the session and blocks until the reader has released the
    /// port, at most one read timeout.
    pub fn close_and_wait(&mut self) {
        self.close();
        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                warn!(port = %self.port, "reader thread panicked");
            }
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.close();
    }
}
