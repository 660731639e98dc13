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

//! Session registry and shutdown gate
//!
//! The table tracks every live session and carries the shutdown gate: a
//! one-permit semaphore held for exactly as long as at least one session is
//! registered. `stop()` acquires the gate, so it returns only after the
//! last session has deregistered.

use crate::session::Session;
use crate::types::SessionId;
use dashmap::DashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Semaphore;
use tracing::debug;

pub(crate) struct SessionTable {
    /// Active sessions (lock-free concurrent map)
    sessions: DashMap<SessionId, Session>,
    /// Session count; guards the gate handoff, so it is not derived from
    /// the map
    count: Mutex<usize>,
    /// Held (zero permits) while any session is alive
    gate: Semaphore,
    /// Next session ID (monotonically increasing)
    next_id: AtomicU64,
}

impl SessionTable {
    pub(crate) fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            count: Mutex::new(0),
            gate: Semaphore::new(1),
            next_id: AtomicU64::new(1),
        }
    }

    /// Admit one session against the limit (0 = unlimited), allocating its
    /// ID. The first admission takes the gate permit. Fails when the limit
    /// is reached or shutdown already holds the gate.
    pub(crate) fn try_admit(&self, max_sessions: usize) -> Option<SessionId> {
        let mut count = self.count.lock().unwrap();
        if max_sessions != 0 && *count >= max_sessions {
            return None;
        }
        if *count == 0 {
            match self.gate.try_acquire() {
                Ok(permit) => permit.forget(),
                Err(_) => return None,
            }
        }
        *count += 1;
        Some(SessionId::new(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    /// Register an admitted session.
    pub(crate) fn register(&self, session: Session) {
        self.sessions.insert(session.id(), session);
    }

    /// Deregister a session. Idempotent; the last deregistration returns
    /// the gate permit.
    pub(crate) fn release(&self, id: SessionId) {
        if self.sessions.remove(&id).is_none() {
            return;
        }
        debug!("{} released", id);
        let mut count = self.count.lock().unwrap();
        *count -= 1;
        if *count == 0 {
            self.gate.add_permits(1);
        }
    }

    /// Number of live sessions.
    pub(crate) fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Close every live session.
    pub(crate) async fn close_all(&self) {
        let sessions: Vec<Session> = self.sessions.iter().map(|e| e.value().clone()).collect();
        for session in sessions {
            session.close().await;
        }
    }

    /// Wait until the last session has deregistered.
    pub(crate) async fn wait_drained(&self) {
        if let Ok(permit) = self.gate.acquire().await {
            drop(permit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admit_respects_limit() {
        let table = SessionTable::new();
        let a = table.try_admit(2).unwrap();
        let b = table.try_admit(2).unwrap();
        assert_ne!(a, b);
        assert!(table.try_admit(2).is_none());
    }

    #[test]
    fn test_zero_limit_is_unlimited() {
        let table = SessionTable::new();
        for _ in 0..100 {
            assert!(table.try_admit(0).is_some());
        }
    }

    #[tokio::test]
    async fn test_gate_taken_while_sessions_admitted() {
        let table = SessionTable::new();
        assert!(table.gate.try_acquire().is_ok());
        let _id = table.try_admit(0).unwrap();
        assert!(table.gate.try_acquire().is_err());
    }
}
