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

//! Decoder behavior under fragmentation and mixed traffic

use proptest::prelude::*;
use telcon_codec::consts;
use telcon_codec::{DecoderSink, Negotiation, NvtDecoder, OptionTable};

#[derive(Default)]
struct RecordingSink {
    buffer: Vec<u8>,
    keep_alives: usize,
    negotiations: Vec<(Negotiation, u8)>,
    subnegotiations: Vec<(u8, Vec<u8>)>,
}

impl DecoderSink for RecordingSink {
    fn push_data(&mut self, byte: u8) {
        self.buffer.push(byte);
    }
    fn take_line(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }
    fn erase_line(&mut self) {
        self.buffer.clear();
    }
    fn erase_character(&mut self) {
        self.buffer.pop();
    }
    fn keep_alive(&mut self) {
        self.keep_alives += 1;
    }
    fn negotiate(&mut self, negotiation: Negotiation, option: u8) {
        self.negotiations.push((negotiation, option));
    }
    fn subnegotiation(&mut self, option: u8, payload: &[u8]) {
        self.subnegotiations.push((option, payload.to_vec()));
    }
}

fn decode_fragmented(input: &[u8], splits: &[usize]) -> (Vec<String>, RecordingSink) {
    let mut decoder = NvtDecoder::new();
    let mut sink = RecordingSink::default();
    let mut lines = Vec::new();
    let mut rest = input;
    for &at in splits {
        let at = at.min(rest.len());
        let (chunk, tail) = rest.split_at(at);
        lines.extend(decoder.decode(chunk, &mut sink).unwrap());
        rest = tail;
    }
    lines.extend(decoder.decode(rest, &mut sink).unwrap());
    (lines, sink)
}

#[test]
fn mixed_traffic_sequence() {
    // A session transcript: negotiation, keepalive, data with an escaped
    // IAC, and a subnegotiation, interleaved with two command lines.
    let mut input = Vec::new();
    input.extend_from_slice(&[consts::IAC, consts::DO, consts::option::ECHO]);
    input.extend_from_slice(b"first\r\n");
    input.extend_from_slice(&[consts::IAC, consts::AYT]);
    input.extend_from_slice(&[b'a', consts::IAC, consts::IAC, b'b', consts::CR, consts::LF]);
    input.extend_from_slice(&[consts::IAC, consts::SB, 24, b'p', consts::IAC, consts::SE]);

    let (lines, sink) = decode_fragmented(&input, &[]);
    assert_eq!(lines, vec!["first".to_string(), "a\u{FFFD}b".to_string()]);
    assert_eq!(sink.keep_alives, 1);
    assert_eq!(sink.negotiations, vec![(Negotiation::Do, consts::option::ECHO)]);
    assert_eq!(sink.subnegotiations, vec![(24, b"p".to_vec())]);
}

#[test]
fn negotiation_feeds_option_table() {
    let mut decoder = NvtDecoder::new();
    let mut sink = RecordingSink::default();
    let mut table = OptionTable::new();
    decoder
        .decode(&[consts::IAC, consts::DO, consts::option::ECHO], &mut sink)
        .unwrap();
    let mut replies = Vec::new();
    for (negotiation, option) in sink.negotiations.drain(..) {
        if let Some(reply) = table.process(negotiation, option) {
            replies.push(reply);
        }
    }
    assert_eq!(replies, vec![[consts::IAC, consts::WILL, consts::option::ECHO]]);
}

proptest! {
    /// Splitting the input at arbitrary points never changes what comes
    /// out of the decoder.
    #[test]
    fn fragmentation_is_transparent(
        payloads in proptest::collection::vec("[a-z]{0,12}", 1..6),
        splits in proptest::collection::vec(0usize..64, 0..8),
    ) {
        let mut input = Vec::new();
        for p in &payloads {
            input.extend_from_slice(p.as_bytes());
            input.extend_from_slice(&[consts::CR, consts::LF]);
        }
        input.extend_from_slice(&[consts::IAC, consts::AYT]);

        let (whole_lines, whole_sink) = decode_fragmented(&input, &[]);
        let (split_lines, split_sink) = decode_fragmented(&input, &splits);

        prop_assert_eq!(&whole_lines, &payloads);
        prop_assert_eq!(whole_lines, split_lines);
        prop_assert_eq!(whole_sink.keep_alives, split_sink.keep_alives);
        prop_assert_eq!(whole_sink.buffer, split_sink.buffer);
    }

    /// Arbitrary byte soup never panics and either decodes or reports a
    /// subnegotiation overflow.
    #[test]
    fn arbitrary_input_is_safe(input in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let mut decoder = NvtDecoder::new();
        let mut sink = RecordingSink::default();
        let _ = decoder.decode(&input, &mut sink);
    }
}
