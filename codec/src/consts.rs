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

//! Telnet wire constants (RFC 854, RFC 857, RFC 858)

/// Interpret As Command escape byte
pub const IAC: u8 = 0xFF;
/// Refuse the remote performing an option
pub const DONT: u8 = 0xFE;
/// Request the remote perform an option
pub const DO: u8 = 0xFD;
/// Refuse to perform an option locally
pub const WONT: u8 = 0xFC;
/// Offer to perform an option locally
pub const WILL: u8 = 0xFB;
/// Subnegotiation Begin
pub const SB: u8 = 0xFA;
/// Go Ahead
pub const GA: u8 = 0xF9;
/// Erase Line
pub const EL: u8 = 0xF8;
/// Erase Character
pub const EC: u8 = 0xF7;
/// Are You There
pub const AYT: u8 = 0xF6;
/// Abort Output
pub const AO: u8 = 0xF5;
/// Interrupt Process
pub const IP: u8 = 0xF4;
/// Break
pub const BRK: u8 = 0xF3;
/// Data Mark
pub const DM: u8 = 0xF2;
/// No Operation
pub const NOP: u8 = 0xF1;
/// Subnegotiation End
pub const SE: u8 = 0xF0;

/// Carriage Return
pub const CR: u8 = 0x0D;
/// Line Feed
pub const LF: u8 = 0x0A;

/// Option codes this engine recognizes. Everything else is refused.
pub mod option {
    /// Echo (RFC 857)
    pub const ECHO: u8 = 0x01;
    /// Suppress Go Ahead (RFC 858)
    pub const SUPPRESS_GO_AHEAD: u8 = 0x03;
}

/// Maximum accumulated subnegotiation payload, in bytes. A subnegotiation
/// exceeding this cap is a hard decode error.
pub const MAX_SUBNEGOTIATION_LEN: usize = 1000;
