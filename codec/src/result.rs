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

/// Result Type for Codec Operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Represents possible errors that can occur while decoding the telnet
/// byte stream or querying option state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A subnegotiation payload exceeded the maximum permitted length.
    ///
    /// The decoder has been reset; the connection should be closed, since
    /// the remainder of the stream can no longer be framed reliably.
    SubnegotiationOverflow {
        /// The option code the subnegotiation was addressed to
        option: u8,
        /// The length cap that was exceeded
        limit: usize,
    },

    /// Option state was queried on a side that does not support the option.
    ///
    /// Enable/disable state is only meaningful for supported options; a
    /// query against an unsupported side is a caller bug, not a wire
    /// condition.
    UnsupportedOption {
        /// The option code that was queried
        option: u8,
        /// The side of the connection the query addressed
        side: OptionSide,
    },
}

/// The side of the connection an option query or negotiation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionSide {
    /// The remote (client) end of the connection
    Client,
    /// The local (server) end of the connection
    Server,
}

impl std::fmt::Display for OptionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionSide::Client => write!(f, "client"),
            OptionSide::Server => write!(f, "server"),
        }
    }
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::SubnegotiationOverflow { option, limit } => {
                write!(
                    f,
                    "subnegotiation for option {option} exceeded {limit} bytes"
                )
            }
            CodecError::UnsupportedOption { option, side } => {
                write!(f, "option {option} is not supported on the {side} side")
            }
        }
    }
}

impl std::error::Error for CodecError {}
