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

//! Core types for the telnet server

use std::fmt;

/// Unique identifier for a session (monotonically increasing, never reused)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Create a new session ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the underlying u64 value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Server lifecycle state.
///
/// Transitions are strictly ordered: `Unconfigured` → `Configured` →
/// `Started` → `Stopped`. Any operation invoked out of order fails with a
/// lifecycle error rather than being deferred or ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Created, no listener bound yet
    Unconfigured,
    /// Listener bound, not accepting
    Configured,
    /// Accept loop running
    Started,
    /// Shut down, terminal
    Stopped,
}

impl Status {
    /// Check if the server is in a terminal state
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Stopped)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Unconfigured => write!(f, "unconfigured"),
            Status::Configured => write!(f, "configured"),
            Status::Started => write!(f, "started"),
            Status::Stopped => write!(f, "stopped"),
        }
    }
}
