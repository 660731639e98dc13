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

//! Byte-at-a-time NVT decoder.
//!
//! [`NvtDecoder`] separates the telnet stream into line data, control
//! signals, option negotiation, and subnegotiation payloads. It holds only
//! protocol state; buffered line data lives behind the [`DecoderSink`] the
//! caller supplies, so erase commands and line completion act on the
//! caller's buffer. State is preserved across calls, which makes decoding
//! transparent to arbitrary TCP fragmentation.

use super::consts;
use crate::options::Negotiation;
use crate::result::{CodecError, CodecResult};
use bytes::{BufMut, BytesMut};
use tracing::warn;

/// Receiver for everything the decoder extracts besides completed lines.
///
/// `push_data` and `take_line` give the decoder access to the caller's line
/// buffer. The signal methods default to no-ops so sinks only implement
/// what they react to.
pub trait DecoderSink {
    /// Appends one data byte to the line under construction.
    fn push_data(&mut self, byte: u8);

    /// Takes the completed line out of the buffer, leaving it empty.
    fn take_line(&mut self) -> Vec<u8>;

    /// ERASE-LINE: discard the line under construction.
    fn erase_line(&mut self) {}

    /// ERASE-CHARACTER: drop the most recent buffered byte, if any.
    fn erase_character(&mut self) {}

    /// ABORT-OUTPUT signal.
    fn abort_output(&mut self) {}

    /// INTERRUPT-PROCESS signal.
    fn interrupt_process(&mut self) {}

    /// ARE-YOU-THERE signal. Liveness only; produces no line.
    fn keep_alive(&mut self) {}

    /// A complete `IAC <cmd> <option>` negotiation triple.
    fn negotiate(&mut self, _negotiation: Negotiation, _option: u8) {}

    /// A complete subnegotiation, delivered exactly once at the closing
    /// `IAC SE` with doubled-IAC escapes already collapsed.
    fn subnegotiation(&mut self, _option: u8, _payload: &[u8]) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    NormalData,
    InterpretAsCommand,
    Negotiate(Negotiation),
    Subnegotiate,
    SubnegotiateArgument(u8),
    SubnegotiateArgumentIac(u8),
}

/// Stateful NVT decoder for one connection.
pub struct NvtDecoder {
    state: DecoderState,
    cr_seen: bool,
    subnegotiation: BytesMut,
}

impl Default for NvtDecoder {
    fn default() -> Self {
        NvtDecoder {
            state: DecoderState::NormalData,
            cr_seen: false,
            subnegotiation: BytesMut::new(),
        }
    }
}

impl NvtDecoder {
    /// Creates a decoder in its initial state.
    pub fn new() -> NvtDecoder {
        NvtDecoder::default()
    }

    /// Returns the decoder to its initial state, discarding any partial
    /// command, pending CR, and accumulated subnegotiation payload. The
    /// sink's line buffer is untouched.
    pub fn reset(&mut self) {
        self.state = DecoderState::NormalData;
        self.cr_seen = false;
        self.subnegotiation.clear();
    }

    /// Decodes one chunk of received bytes.
    ///
    /// Completed lines (CR LF terminated, terminator stripped, lossy ASCII
    /// conversion) are returned in arrival order; everything else is
    /// delivered through `sink` as it is recognized. On error the decoder
    /// has already been reset, but the stream can no longer be trusted and
    /// the connection should be closed.
    pub fn decode(&mut self, src: &[u8], sink: &mut dyn DecoderSink) -> CodecResult<Vec<String>> {
        let mut lines = Vec::new();
        for &byte in src {
            self.advance(byte, sink, &mut lines)?;
        }
        Ok(lines)
    }

    fn advance(
        &mut self,
        byte: u8,
        sink: &mut dyn DecoderSink,
        lines: &mut Vec<String>,
    ) -> CodecResult<()> {
        match (self.state, byte) {
            (DecoderState::NormalData, consts::IAC) => {
                self.state = DecoderState::InterpretAsCommand;
            }
            (DecoderState::NormalData, _) => {
                self.data_byte(byte, sink, lines);
            }
            (DecoderState::InterpretAsCommand, consts::IAC) => {
                // Escaped 0xFF data byte. Any pending CR stays pending.
                self.state = DecoderState::NormalData;
                sink.push_data(consts::IAC);
            }
            (DecoderState::InterpretAsCommand, consts::AO) => {
                sink.abort_output();
                self.reset();
            }
            (DecoderState::InterpretAsCommand, consts::IP) => {
                sink.interrupt_process();
                self.reset();
            }
            (DecoderState::InterpretAsCommand, consts::AYT) => {
                sink.keep_alive();
                self.reset();
            }
            (DecoderState::InterpretAsCommand, consts::EC) => {
                sink.erase_character();
                self.reset();
            }
            (DecoderState::InterpretAsCommand, consts::EL) => {
                sink.erase_line();
                self.reset();
            }
            (DecoderState::InterpretAsCommand, consts::WILL) => {
                self.state = DecoderState::Negotiate(Negotiation::Will);
            }
            (DecoderState::InterpretAsCommand, consts::WONT) => {
                self.state = DecoderState::Negotiate(Negotiation::Wont);
            }
            (DecoderState::InterpretAsCommand, consts::DO) => {
                self.state = DecoderState::Negotiate(Negotiation::Do);
            }
            (DecoderState::InterpretAsCommand, consts::DONT) => {
                self.state = DecoderState::Negotiate(Negotiation::Dont);
            }
            (DecoderState::InterpretAsCommand, consts::SB) => {
                self.state = DecoderState::Subnegotiate;
            }
            (DecoderState::InterpretAsCommand, _) => {
                // NOP, DM, BRK, GA, stray SE, and anything unassigned.
                warn!("ignoring telnet command 0x{:02X}", byte);
                self.reset();
            }
            (DecoderState::Negotiate(negotiation), _) => {
                sink.negotiate(negotiation, byte);
                self.reset();
            }
            (DecoderState::Subnegotiate, _) => {
                self.state = DecoderState::SubnegotiateArgument(byte);
            }
            (DecoderState::SubnegotiateArgument(option), consts::IAC) => {
                self.state = DecoderState::SubnegotiateArgumentIac(option);
            }
            (DecoderState::SubnegotiateArgument(option), _) => {
                self.push_subnegotiation(option, byte)?;
            }
            (DecoderState::SubnegotiateArgumentIac(option), consts::IAC) => {
                self.push_subnegotiation(option, consts::IAC)?;
                self.state = DecoderState::SubnegotiateArgument(option);
            }
            (DecoderState::SubnegotiateArgumentIac(option), consts::SE) => {
                sink.subnegotiation(option, &self.subnegotiation);
                self.reset();
            }
            (DecoderState::SubnegotiateArgumentIac(_), _) => {
                warn!(
                    "unexpected byte 0x{:02X} after IAC inside subnegotiation, abandoning it",
                    byte
                );
                self.reset();
            }
        }
        Ok(())
    }

    /// One byte of line data. A lone CR is held back until the next byte
    /// decides whether it terminates the line (LF) or belongs in the
    /// buffer as-is.
    fn data_byte(&mut self, byte: u8, sink: &mut dyn DecoderSink, lines: &mut Vec<String>) {
        if self.cr_seen {
            self.cr_seen = false;
            match byte {
                consts::LF => {
                    let raw = sink.take_line();
                    lines.push(String::from_utf8_lossy(&raw).into_owned());
                    return;
                }
                consts::CR => {
                    sink.push_data(consts::CR);
                    self.cr_seen = true;
                    return;
                }
                _ => sink.push_data(consts::CR),
            }
        }
        if byte == consts::CR {
            self.cr_seen = true;
        } else {
            sink.push_data(byte);
        }
    }

    fn push_subnegotiation(&mut self, option: u8, byte: u8) -> CodecResult<()> {
        if self.subnegotiation.len() >= consts::MAX_SUBNEGOTIATION_LEN {
            self.reset();
            return Err(CodecError::SubnegotiationOverflow {
                option,
                limit: consts::MAX_SUBNEGOTIATION_LEN,
            });
        }
        self.subnegotiation.put_u8(byte);
        Ok(())
    }
}
