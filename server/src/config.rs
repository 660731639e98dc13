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

//! Server configuration types and builders
//!
//! # Example
//!
//! ```
//! use telcon_server::ServerConfig;
//!
//! let config = ServerConfig::default()
//!     .with_bind_address("0.0.0.0:2323".parse().unwrap())
//!     .with_max_sessions(64)
//!     .with_prompt("console> ");
//! ```

use std::net::SocketAddr;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the listener to
    pub bind_address: SocketAddr,

    /// Maximum concurrent sessions (0 = unlimited)
    pub max_sessions: usize,

    /// Listen backlog for the bound socket
    pub backlog: u32,

    /// SO_REUSEADDR on the listener socket
    pub reuseaddr: bool,

    /// SO_RCVBUF for the listener socket (None = OS default)
    pub recv_buffer_size: Option<u32>,

    /// SO_SNDBUF for the listener socket (None = OS default)
    pub send_buffer_size: Option<u32>,

    /// TCP_NODELAY on accepted sockets
    pub nodelay: bool,

    /// SO_KEEPALIVE on the listener socket
    pub keepalive: bool,

    /// Bytes read from the socket per read call
    pub read_chunk_size: usize,

    /// Line buffer growth increment, in bytes
    pub buffer_increment: usize,

    /// Prompt written after each drained command queue
    pub prompt: String,

    /// Greeting written once when a session is admitted (None = no greeting)
    pub greeting: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:2323".parse().unwrap(),
            max_sessions: 0,
            backlog: 128,
            reuseaddr: true,
            recv_buffer_size: None,
            send_buffer_size: None,
            nodelay: true,
            keepalive: true,
            read_chunk_size: 1024,
            buffer_increment: 10,
            prompt: "> ".to_string(),
            greeting: None,
        }
    }
}

impl ServerConfig {
    /// Set the bind address
    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = addr;
        self
    }

    /// Set the maximum number of concurrent sessions (0 = unlimited)
    pub fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max;
        self
    }

    /// Set the listen backlog
    pub fn with_backlog(mut self, backlog: u32) -> Self {
        self.backlog = backlog;
        self
    }

    /// Enable or disable SO_REUSEADDR on the listener socket
    pub fn with_reuseaddr(mut self, reuseaddr: bool) -> Self {
        self.reuseaddr = reuseaddr;
        self
    }

    /// Set the listener receive buffer size
    pub fn with_recv_buffer_size(mut self, size: Option<u32>) -> Self {
        self.recv_buffer_size = size;
        self
    }

    /// Set the listener send buffer size
    pub fn with_send_buffer_size(mut self, size: Option<u32>) -> Self {
        self.send_buffer_size = size;
        self
    }

    /// Enable or disable TCP_NODELAY on accepted sockets
    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    /// Enable or disable SO_KEEPALIVE on the listener socket
    pub fn with_keepalive(mut self, keepalive: bool) -> Self {
        self.keepalive = keepalive;
        self
    }

    /// Set the per-read chunk size
    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size;
        self
    }

    /// Set the line buffer growth increment
    pub fn with_buffer_increment(mut self, increment: usize) -> Self {
        self.buffer_increment = increment;
        self
    }

    /// Set the prompt string
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Set the greeting written when a session connects
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = Some(greeting.into());
        self
    }
}
