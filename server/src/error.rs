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

//! Error types for the telnet server

use crate::types::Status;
use thiserror::Error;

/// Result type for server operations
pub type Result<T> = std::result::Result<T, TelnetError>;

/// Telnet server error types
#[derive(Debug, Error)]
pub enum TelnetError {
    /// I/O error from the underlying TCP stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol error from the codec layer
    #[error("Protocol error: {0}")]
    Codec(#[from] telcon_codec::CodecError),

    /// Lifecycle operation invoked out of order
    #[error("Cannot {operation} while {status}")]
    IllegalState {
        /// The operation that was attempted
        operation: &'static str,
        /// The lifecycle state the server was in
        status: Status,
    },

    /// Session has been closed
    #[error("Session closed")]
    SessionClosed,

    /// Maximum number of sessions reached
    #[error("Session limit ({0}) reached")]
    SessionLimit(usize),

    /// A command processor failed
    #[error("Command failed: {0}")]
    Command(String),
}

impl TelnetError {
    /// Errors that take down the one session they occurred on.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            TelnetError::Io(_)
                | TelnetError::Codec(_)
                | TelnetError::SessionClosed
                | TelnetError::SessionLimit(_)
        )
    }

    /// Errors the session survives: the processor queue keeps draining.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TelnetError::Command(_))
    }
}
