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

//! # Telcon NVT Codec
//!
//! Server-side telnet protocol primitives: a byte-at-a-time NVT decoder and
//! per-option WILL/WONT/DO/DONT negotiation state (RFC 854, RFC 855).
//!
//! ## Overview
//!
//! The decoder separates a raw TCP stream into four channels:
//!
//! - **Lines** of data, terminated by CR LF, accumulated in a caller-owned
//!   buffer reachable through the [`DecoderSink`] trait
//! - **Control signals** (AYT, AO, IP, EC, EL), delivered as sink callbacks
//! - **Option negotiation** triples, answered by [`OptionTable::process`]
//! - **Subnegotiation** payloads between `IAC SB` and `IAC SE`, capped at
//!   [`consts::MAX_SUBNEGOTIATION_LEN`] bytes
//!
//! Decoder state survives across `decode` calls, so the emitted lines and
//! signals are independent of how the stream is fragmented into reads.
//!
//! The negotiation side is deliberately passive: only Echo and Suppress Go
//! Ahead are supported (server side), everything else is refused, and the
//! engine never initiates a negotiation of its own.

#![warn(
    clippy::cargo,
    missing_docs,
    clippy::pedantic,
    future_incompatible,
    rust_2018_idioms
)]
#![allow(
    clippy::option_if_let_else,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc
)]

pub mod consts;
mod decoder;
mod options;
mod result;

pub use self::decoder::{DecoderSink, NvtDecoder};
pub use self::options::{Negotiation, OptionState, OptionTable};
pub use self::result::{CodecError, CodecResult, OptionSide};
