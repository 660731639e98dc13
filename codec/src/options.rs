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

//! Telnet option state tracking and WILL/WONT/DO/DONT negotiation.
//!
//! Every option code has a fixed slot carrying immutable support flags and
//! the current negotiation state for each side of the connection. The
//! server never initiates negotiation; [`OptionTable::process`] answers one
//! received negotiation command with at most one three-byte reply and at
//! most one state change.

use super::consts;
use crate::result::{CodecError, CodecResult, OptionSide};

/// Negotiation state of one option on one side of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptionState {
    /// The option is in effect
    Enable,
    /// The option is not in effect
    #[default]
    Disable,
    /// We proposed enabling and are waiting for the acknowledgement
    Enabling,
    /// We proposed disabling and are waiting for the acknowledgement
    Disabling,
}

/// A received option negotiation command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Negotiation {
    /// Remote offers to perform the option (IAC WILL)
    Will,
    /// Remote refuses or retracts the option (IAC WONT)
    Wont,
    /// Remote requests we perform the option (IAC DO)
    Do,
    /// Remote forbids us performing the option (IAC DONT)
    Dont,
}

impl Negotiation {
    /// The command byte this negotiation arrived as.
    pub fn command(self) -> u8 {
        match self {
            Negotiation::Will => consts::WILL,
            Negotiation::Wont => consts::WONT,
            Negotiation::Do => consts::DO,
            Negotiation::Dont => consts::DONT,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct OptionSlot {
    client_supported: bool,
    server_supported: bool,
    client_state: OptionState,
    server_state: OptionState,
}

/// Per-connection option table.
///
/// Slots are indexed directly by option code. The default table supports
/// Echo and Suppress Go Ahead on the server side only; every other option
/// is a refusing placeholder.
pub struct OptionTable {
    slots: [OptionSlot; 256],
}

impl Default for OptionTable {
    fn default() -> Self {
        let mut slots = [OptionSlot::default(); 256];
        slots[consts::option::ECHO as usize].server_supported = true;
        slots[consts::option::SUPPRESS_GO_AHEAD as usize].server_supported = true;
        OptionTable { slots }
    }
}

impl OptionTable {
    /// Creates a table with the default support map.
    pub fn new() -> OptionTable {
        OptionTable::default()
    }

    /// Whether the option is supported on the client side.
    pub fn is_client_supported(&self, option: u8) -> bool {
        self.slots[option as usize].client_supported
    }

    /// Whether the option is supported on the server side.
    pub fn is_server_supported(&self, option: u8) -> bool {
        self.slots[option as usize].server_supported
    }

    /// Current client-side state of a supported option.
    pub fn client_state(&self, option: u8) -> CodecResult<OptionState> {
        let slot = &self.slots[option as usize];
        if !slot.client_supported {
            return Err(CodecError::UnsupportedOption {
                option,
                side: OptionSide::Client,
            });
        }
        Ok(slot.client_state)
    }

    /// Current server-side state of a supported option.
    pub fn server_state(&self, option: u8) -> CodecResult<OptionState> {
        let slot = &self.slots[option as usize];
        if !slot.server_supported {
            return Err(CodecError::UnsupportedOption {
                option,
                side: OptionSide::Server,
            });
        }
        Ok(slot.server_state)
    }

    /// Sets the client-side state of a supported option.
    ///
    /// This is the entry point for locally initiated negotiation: callers
    /// that send their own WILL/WONT park the state in `Enabling` or
    /// `Disabling` here and let [`process`](Self::process) settle it when
    /// the acknowledgement arrives.
    pub fn set_client_state(&mut self, option: u8, state: OptionState) -> CodecResult<()> {
        let slot = &mut self.slots[option as usize];
        if !slot.client_supported {
            return Err(CodecError::UnsupportedOption {
                option,
                side: OptionSide::Client,
            });
        }
        slot.client_state = state;
        Ok(())
    }

    /// Sets the server-side state of a supported option.
    pub fn set_server_state(&mut self, option: u8, state: OptionState) -> CodecResult<()> {
        let slot = &mut self.slots[option as usize];
        if !slot.server_supported {
            return Err(CodecError::UnsupportedOption {
                option,
                side: OptionSide::Server,
            });
        }
        slot.server_state = state;
        Ok(())
    }

    /// Processes one received negotiation command for one option.
    ///
    /// Returns the single three-byte reply to write back, if any. WILL and
    /// WONT drive the client-side state; DO and DONT drive the server
    /// side. Unsupported options are refused symmetrically (DONT answers
    /// WILL, WONT answers DO) and unsupported disables are ignored, so a
    /// refusal loop cannot form.
    pub fn process(&mut self, negotiation: Negotiation, option: u8) -> Option<[u8; 3]> {
        let slot = &mut self.slots[option as usize];
        match negotiation {
            Negotiation::Will => {
                if !slot.client_supported {
                    return Some([consts::IAC, consts::DONT, option]);
                }
                Self::enable(&mut slot.client_state, consts::DO, option)
            }
            Negotiation::Wont => {
                if !slot.client_supported {
                    return None;
                }
                Self::disable(&mut slot.client_state, consts::DONT, option)
            }
            Negotiation::Do => {
                if !slot.server_supported {
                    return Some([consts::IAC, consts::WONT, option]);
                }
                Self::enable(&mut slot.server_state, consts::WILL, option)
            }
            Negotiation::Dont => {
                if !slot.server_supported {
                    return None;
                }
                Self::disable(&mut slot.server_state, consts::WONT, option)
            }
        }
    }

    fn enable(state: &mut OptionState, accept: u8, option: u8) -> Option<[u8; 3]> {
        match *state {
            // Remote initiated: agree and switch on.
            OptionState::Disable => {
                *state = OptionState::Enable;
                Some([consts::IAC, accept, option])
            }
            // Answer to our own proposal: settle without replying.
            OptionState::Enabling | OptionState::Disabling => {
                *state = OptionState::Enable;
                None
            }
            OptionState::Enable => None,
        }
    }

    fn disable(state: &mut OptionState, accept: u8, option: u8) -> Option<[u8; 3]> {
        match *state {
            OptionState::Enable => {
                *state = OptionState::Disable;
                Some([consts::IAC, accept, option])
            }
            OptionState::Enabling | OptionState::Disabling => {
                *state = OptionState::Disable;
                None
            }
            OptionState::Disable => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::option::{ECHO, SUPPRESS_GO_AHEAD};

    #[test]
    fn test_default_support_map() {
        let table = OptionTable::new();
        assert!(table.is_server_supported(ECHO));
        assert!(table.is_server_supported(SUPPRESS_GO_AHEAD));
        assert!(!table.is_client_supported(ECHO));
        assert!(!table.is_client_supported(SUPPRESS_GO_AHEAD));
        assert!(!table.is_server_supported(24));
    }

    #[test]
    fn test_unsupported_will_is_refused() {
        let mut table = OptionTable::new();
        let reply = table.process(Negotiation::Will, 24);
        assert_eq!(reply, Some([consts::IAC, consts::DONT, 24]));
        // No state to observe afterwards.
        assert!(table.client_state(24).is_err());
    }

    #[test]
    fn test_unsupported_do_is_refused() {
        let mut table = OptionTable::new();
        let reply = table.process(Negotiation::Do, 24);
        assert_eq!(reply, Some([consts::IAC, consts::WONT, 24]));
    }

    #[test]
    fn test_unsupported_disable_is_ignored() {
        let mut table = OptionTable::new();
        assert_eq!(table.process(Negotiation::Wont, 24), None);
        assert_eq!(table.process(Negotiation::Dont, 24), None);
    }

    #[test]
    fn test_do_echo_enables_and_dont_disables() {
        let mut table = OptionTable::new();
        let reply = table.process(Negotiation::Do, ECHO);
        assert_eq!(reply, Some([consts::IAC, consts::WILL, ECHO]));
        assert_eq!(table.server_state(ECHO).unwrap(), OptionState::Enable);

        let reply = table.process(Negotiation::Dont, ECHO);
        assert_eq!(reply, Some([consts::IAC, consts::WONT, ECHO]));
        assert_eq!(table.server_state(ECHO).unwrap(), OptionState::Disable);
    }

    #[test]
    fn test_redundant_requests_are_silent() {
        let mut table = OptionTable::new();
        assert!(table.process(Negotiation::Do, ECHO).is_some());
        assert_eq!(table.process(Negotiation::Do, ECHO), None);
        assert_eq!(table.server_state(ECHO).unwrap(), OptionState::Enable);

        assert!(table.process(Negotiation::Dont, ECHO).is_some());
        assert_eq!(table.process(Negotiation::Dont, ECHO), None);
        assert_eq!(table.server_state(ECHO).unwrap(), OptionState::Disable);
    }

    #[test]
    fn test_pending_enable_settles_without_reply() {
        let mut table = OptionTable::new();
        table
            .set_server_state(ECHO, OptionState::Enabling)
            .unwrap();
        assert_eq!(table.process(Negotiation::Do, ECHO), None);
        assert_eq!(table.server_state(ECHO).unwrap(), OptionState::Enable);
    }

    #[test]
    fn test_pending_disable_settles_without_reply() {
        let mut table = OptionTable::new();
        table
            .set_server_state(ECHO, OptionState::Disabling)
            .unwrap();
        assert_eq!(table.process(Negotiation::Dont, ECHO), None);
        assert_eq!(table.server_state(ECHO).unwrap(), OptionState::Disable);
    }

    #[test]
    fn test_state_queries_on_unsupported_side_fail() {
        let table = OptionTable::new();
        assert!(matches!(
            table.client_state(ECHO),
            Err(CodecError::UnsupportedOption { option, .. }) if option == ECHO
        ));
        assert!(table.server_state(ECHO).is_ok());
    }
}
