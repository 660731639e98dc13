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

//! Telnet console server engine
//!
//! An embeddable telnet server for line-oriented command consoles. The
//! engine owns the transport, the NVT protocol, and session lifecycle;
//! command grammar, authorization, and command execution plug in through
//! the [`CommandRegistry`], [`AccessPolicy`], [`ProcessorFactory`], and
//! [`CommandProcessor`] traits.
//!
//! # Architecture
//!
//! ```text
//! TelnetServer (controller, accept loop)
//!     ↓
//! SessionTable (registry, shutdown gate)
//!     ↓
//! Session ← read task (decode) / executor task (commands)
//! ```
//!
//! Each accepted connection gets a read task that feeds the NVT decoder
//! and a lazily spawned executor task that runs its command queue in FIFO
//! order, one command at a time. `stop()` closes every session and blocks
//! until the last one has drained.

mod command;
mod config;
mod controller;
mod error;
mod session;
mod table;
mod types;

pub use self::command::{
    AccessPolicy, AllowAllPolicy, Command, CommandContext, CommandProcessor, CommandRegistry,
    ProcessorFactory,
};
pub use self::config::ServerConfig;
pub use self::controller::TelnetServer;
pub use self::error::{Result, TelnetError};
pub use self::session::Session;
pub use self::types::{SessionId, Status};
