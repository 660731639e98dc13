//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Per-connection session
//!
//! A [`Session`] is a cloneable handle over one accepted connection: the
//! write half of the socket, the command queue, and the stop flag. Command
//! processors run on a per-session executor task that is spawned lazily
//! when work arrives and retires when the queue drains, so a session never
//! has two processors in flight.
//!
//! The decode side lives in [`SessionCore`], owned by the connection's read
//! task: the NVT decoder, the line buffer, the option table, and the
//! buffered wire replies (negotiation answers, keepalive). Replies are
//! flushed after each decoded chunk, then completed lines are resolved and
//! enqueued.

use crate::command::{
    CommandContext, CommandProcessor, NoAccessProcessor, UnknownCommandProcessor,
};
use crate::error::{Result, TelnetError};
use crate::table::SessionTable;
use crate::types::SessionId;
use bytes::{BufMut, BytesMut};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use telcon_codec::{DecoderSink, Negotiation, NvtDecoder, OptionTable, consts};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Notify;
use tracing::{debug, warn};

/// Line under construction, grown by a fixed increment.
pub(crate) struct LineBuffer {
    data: Vec<u8>,
    increment: usize,
}

impl LineBuffer {
    pub(crate) fn new(increment: usize) -> Self {
        let increment = increment.max(1);
        Self {
            data: Vec::with_capacity(increment),
            increment,
        }
    }

    pub(crate) fn push(&mut self, byte: u8) {
        if self.data.len() == self.data.capacity() {
            self.data.reserve_exact(self.increment);
        }
        self.data.push(byte);
    }

    /// Copy the line out and reset, keeping the capacity.
    pub(crate) fn take(&mut self) -> Vec<u8> {
        let line = self.data.clone();
        self.data.clear();
        line
    }

    pub(crate) fn erase(&mut self) {
        self.data.pop();
    }

    pub(crate) fn clear(&mut self) {
        self.data.clear();
    }
}

/// Queue state behind one lock: the spawn decision in `enqueue`, the
/// executor's drain checks, and the stop handoff in `close` all serialize
/// on it.
struct TaskState {
    queue: VecDeque<Arc<dyn CommandProcessor>>,
    current: Option<Arc<dyn CommandProcessor>>,
    running: bool,
    stopped: bool,
}

struct SessionInner {
    id: SessionId,
    peer: SocketAddr,
    writer: tokio::sync::Mutex<OwnedWriteHalf>,
    tasks: Mutex<TaskState>,
    closed: Notify,
    user: Mutex<Option<String>>,
    prompt: String,
    table: Arc<SessionTable>,
}

/// Cloneable handle to one connection.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

enum Next {
    Task(Arc<dyn CommandProcessor>),
    Drain,
    Stop,
}

impl Session {
    pub(crate) fn new(
        id: SessionId,
        peer: SocketAddr,
        writer: OwnedWriteHalf,
        table: Arc<SessionTable>,
        prompt: String,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                id,
                peer,
                writer: tokio::sync::Mutex::new(writer),
                tasks: Mutex::new(TaskState {
                    queue: VecDeque::new(),
                    current: None,
                    running: false,
                    stopped: false,
                }),
                closed: Notify::new(),
                user: Mutex::new(None),
                prompt,
                table,
            }),
        }
    }

    /// The session's ID.
    pub fn id(&self) -> SessionId {
        self.inner.id
    }

    /// The remote peer address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.inner.peer
    }

    /// The user bound to this session, if one has authenticated.
    pub fn user(&self) -> Option<String> {
        self.inner.user.lock().unwrap().clone()
    }

    /// Bind a user identity to this session.
    pub fn set_user(&self, user: impl Into<String>) {
        *self.inner.user.lock().unwrap() = Some(user.into());
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.tasks.lock().unwrap().stopped
    }

    /// Write raw bytes to the client.
    pub async fn write(&self, bytes: &[u8]) -> Result<()> {
        let mut writer = self.inner.writer.lock().await;
        writer.write_all(bytes).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Write a line of text followed by CR LF.
    pub async fn write_line(&self, text: &str) -> Result<()> {
        let mut out = Vec::with_capacity(text.len() + 2);
        out.extend_from_slice(text.as_bytes());
        out.extend_from_slice(b"\r\n");
        self.write(&out).await
    }

    pub(crate) async fn send_prompt(&self) -> Result<()> {
        self.write(self.inner.prompt.as_bytes()).await
    }

    /// Add a processor to the session's queue.
    ///
    /// The executor task is spawned on the first enqueue after a drain;
    /// while it runs, later enqueues only append. Fails once the session
    /// has been closed.
    pub fn enqueue(&self, processor: Arc<dyn CommandProcessor>) -> Result<()> {
        let spawn = {
            let mut tasks = self.inner.tasks.lock().unwrap();
            if tasks.stopped {
                return Err(TelnetError::SessionClosed);
            }
            tasks.queue.push_back(processor);
            if tasks.running {
                false
            } else {
                tasks.running = true;
                true
            }
        };
        if spawn {
            let session = self.clone();
            tokio::spawn(async move { session.run_queue().await });
        }
        Ok(())
    }

    /// Close the session. Idempotent.
    ///
    /// Marks the session stopped and wakes the read task. If no executor
    /// is running the socket shuts down and the session deregisters
    /// immediately; otherwise the executor does both after the current
    /// processor finishes, so in-flight output still reaches the client.
    pub async fn close(&self) {
        let release_now = {
            let mut tasks = self.inner.tasks.lock().unwrap();
            if tasks.stopped {
                return;
            }
            tasks.stopped = true;
            !tasks.running
        };
        debug!("{} closing", self.id());
        self.inner.closed.notify_waiters();
        if release_now {
            self.finish().await;
        }
    }

    /// Shut the socket down and deregister. Runs exactly once per
    /// session, on whichever side of the close handoff owns the release.
    async fn finish(&self) {
        {
            let mut writer = self.inner.writer.lock().await;
            let _ = writer.shutdown().await;
        }
        self.inner.table.release(self.id());
    }

    /// Resolves when `close` is called.
    pub(crate) async fn closed(&self) {
        self.inner.closed.notified().await;
    }

    pub(crate) fn abort_current(&self) {
        let current = self.inner.tasks.lock().unwrap().current.clone();
        if let Some(task) = current {
            task.abort_output();
        }
    }

    pub(crate) fn interrupt_current(&self) {
        let current = self.inner.tasks.lock().unwrap().current.clone();
        if let Some(task) = current {
            task.interrupt_process();
        }
    }

    /// Executor loop: one per session, alive only while there is work.
    async fn run_queue(self) {
        debug!("{} executor started", self.id());
        loop {
            let next = {
                let mut tasks = self.inner.tasks.lock().unwrap();
                tasks.current = None;
                if tasks.stopped {
                    tasks.running = false;
                    Next::Stop
                } else if let Some(task) = tasks.queue.pop_front() {
                    tasks.current = Some(task.clone());
                    Next::Task(task)
                } else {
                    Next::Drain
                }
            };
            match next {
                Next::Stop => {
                    debug!("{} executor stopped", self.id());
                    self.finish().await;
                    return;
                }
                Next::Task(task) => {
                    if let Err(error) = task.process().await {
                        if error.is_connection_error() {
                            warn!("{} processor I/O failure: {}", self.id(), error);
                            self.close().await;
                        } else {
                            warn!("{} command failed: {}", self.id(), error);
                        }
                    }
                }
                Next::Drain => {
                    if self.write_drain_prompt().await.is_err() {
                        self.close().await;
                    }
                    let stopped = {
                        let mut tasks = self.inner.tasks.lock().unwrap();
                        if tasks.stopped {
                            tasks.running = false;
                            true
                        } else if tasks.queue.is_empty() {
                            tasks.running = false;
                            debug!("{} executor retired", self.id());
                            return;
                        } else {
                            false
                        }
                    };
                    if stopped {
                        debug!("{} executor stopped", self.id());
                        self.finish().await;
                        return;
                    }
                    // Work arrived while the prompt was being written.
                }
            }
        }
    }

    async fn write_drain_prompt(&self) -> Result<()> {
        let mut out = Vec::with_capacity(self.inner.prompt.len() + 2);
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(self.inner.prompt.as_bytes());
        self.write(&out).await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("peer", &self.inner.peer)
            .finish_non_exhaustive()
    }
}

/// Decoder sink bound to one session: line buffer, option table, and the
/// wire replies accumulated while decoding a chunk.
struct SessionSink {
    session: Session,
    buffer: LineBuffer,
    options: OptionTable,
    replies: BytesMut,
}

impl DecoderSink for SessionSink {
    fn push_data(&mut self, byte: u8) {
        self.buffer.push(byte);
    }

    fn take_line(&mut self) -> Vec<u8> {
        self.buffer.take()
    }

    fn erase_line(&mut self) {
        self.buffer.clear();
    }

    fn erase_character(&mut self) {
        self.buffer.erase();
    }

    fn abort_output(&mut self) {
        debug!("{} abort output", self.session.id());
        self.session.abort_current();
    }

    fn interrupt_process(&mut self) {
        debug!("{} interrupt process", self.session.id());
        self.session.interrupt_current();
    }

    fn keep_alive(&mut self) {
        self.replies.put_slice(&[consts::IAC, consts::NOP]);
    }

    fn negotiate(&mut self, negotiation: Negotiation, option: u8) {
        if let Some(reply) = self.options.process(negotiation, option) {
            self.replies.put_slice(&reply);
        }
    }

    fn subnegotiation(&mut self, option: u8, payload: &[u8]) {
        // No supported option takes subnegotiation parameters.
        debug!(
            "{} discarding {} byte subnegotiation for option {}",
            self.session.id(),
            payload.len(),
            option
        );
    }
}

/// Read-side state of one connection, owned by its read task.
pub(crate) struct SessionCore {
    session: Session,
    decoder: NvtDecoder,
    sink: SessionSink,
    context: CommandContext,
}

impl SessionCore {
    pub(crate) fn new(session: Session, context: CommandContext, buffer_increment: usize) -> Self {
        let sink = SessionSink {
            session: session.clone(),
            buffer: LineBuffer::new(buffer_increment),
            options: OptionTable::new(),
            replies: BytesMut::new(),
        };
        Self {
            session,
            decoder: NvtDecoder::new(),
            sink,
            context,
        }
    }

    pub(crate) fn session(&self) -> &Session {
        &self.session
    }

    /// Decode one received chunk, flush any wire replies, and dispatch the
    /// completed lines.
    pub(crate) async fn feed(&mut self, chunk: &[u8]) -> Result<()> {
        let lines = self.decoder.decode(chunk, &mut self.sink)?;
        self.flush_replies().await?;
        for line in lines {
            self.dispatch(line).await?;
        }
        Ok(())
    }

    async fn flush_replies(&mut self) -> Result<()> {
        if self.sink.replies.is_empty() {
            return Ok(());
        }
        let replies = self.sink.replies.split();
        self.session.write(&replies).await
    }

    /// Resolve one completed line and enqueue its processor.
    async fn dispatch(&mut self, line: String) -> Result<()> {
        if line.is_empty() {
            return self.session.send_prompt().await;
        }
        let processor = match self.context.registry.resolve(&line) {
            Ok(Some(command)) => {
                let user = self.session.user();
                if self
                    .context
                    .policy
                    .is_authorized(user.as_deref(), &command)
                {
                    self.context.factory.build(&command, &self.session)
                } else {
                    debug!("{} denied command {}", self.session.id(), command.name);
                    NoAccessProcessor::new(self.session.clone())
                }
            }
            Ok(None) => UnknownCommandProcessor::new(self.session.clone()),
            Err(error) => {
                debug!("{} unparseable line: {}", self.session.id(), error);
                UnknownCommandProcessor::new(self.session.clone())
            }
        };
        self.session.enqueue(processor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_buffer_grows_by_increment() {
        let mut buffer = LineBuffer::new(4);
        for byte in 0..10u8 {
            buffer.push(byte);
        }
        assert_eq!(buffer.take(), (0..10).collect::<Vec<u8>>());
        assert_eq!(buffer.take(), Vec::<u8>::new());
    }

    #[test]
    fn test_line_buffer_erase() {
        let mut buffer = LineBuffer::new(4);
        // Erase on an empty buffer is a no-op.
        buffer.erase();
        buffer.push(b'a');
        buffer.push(b'b');
        buffer.erase();
        assert_eq!(buffer.take(), b"a");
    }

    #[test]
    fn test_line_buffer_take_is_a_copy() {
        let mut buffer = LineBuffer::new(2);
        buffer.push(b'x');
        let first = buffer.take();
        buffer.push(b'y');
        assert_eq!(first, b"x");
        assert_eq!(buffer.take(), b"y");
    }

    #[test]
    fn test_zero_increment_is_clamped() {
        let mut buffer = LineBuffer::new(0);
        buffer.push(b'a');
        buffer.push(b'b');
        assert_eq!(buffer.take(), b"ab");
    }
}
