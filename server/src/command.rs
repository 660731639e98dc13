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

//! Command collaborator seams
//!
//! Command grammar, authorization, and processor construction live outside
//! the engine. The server hands every completed line to a
//! [`CommandRegistry`], checks the result against an [`AccessPolicy`], and
//! asks a [`ProcessorFactory`] for the processor to enqueue. Lines that
//! fail resolution or authorization are answered by the built-in
//! substitutes instead of reaching the factory.

use crate::error::Result;
use crate::session::Session;
use async_trait::async_trait;
use std::sync::Arc;

/// A command resolved from one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command name
    pub name: String,
    /// Positional arguments
    pub args: Vec<String>,
}

impl Command {
    /// Create a command with no arguments
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Append an argument
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// Resolves one input line to a command.
///
/// Returning `Ok(None)` means the line matched nothing; a parse error means
/// the line was malformed. Both are answered with the unknown-command
/// substitute, so implementations may use whichever is more natural.
pub trait CommandRegistry: Send + Sync + 'static {
    /// Resolve a line (CR LF already stripped) to a command
    fn resolve(&self, line: &str) -> Result<Option<Command>>;
}

/// Decides whether a session may run a resolved command.
pub trait AccessPolicy: Send + Sync + 'static {
    /// Check authorization for the session's current user, if any
    fn is_authorized(&self, user: Option<&str>, command: &Command) -> bool;
}

/// Builds the processor for an authorized command.
///
/// The session handle is bound into the processor here; `process` takes no
/// arguments so the engine can run processors without knowing anything
/// about the command grammar.
pub trait ProcessorFactory: Send + Sync + 'static {
    /// Build a processor for the command on the given session
    fn build(&self, command: &Command, session: &Session) -> Arc<dyn CommandProcessor>;
}

/// One unit of work on a session's queue.
///
/// Processors run one at a time per session, in arrival order. The abort
/// and interrupt hooks are delivered from the decode side while `process`
/// may be in flight; they are advisory and must not block.
#[async_trait]
pub trait CommandProcessor: Send + Sync + 'static {
    /// Execute the command
    async fn process(&self) -> Result<()>;

    /// ABORT-OUTPUT was received while this processor was current
    fn abort_output(&self) {}

    /// INTERRUPT-PROCESS was received while this processor was current
    fn interrupt_process(&self) {}
}

/// Shared handle bundle for the command collaborators.
#[derive(Clone)]
pub struct CommandContext {
    /// Line-to-command resolver
    pub registry: Arc<dyn CommandRegistry>,
    /// Authorization check
    pub policy: Arc<dyn AccessPolicy>,
    /// Processor construction
    pub factory: Arc<dyn ProcessorFactory>,
}

/// Policy that authorizes every command.
pub struct AllowAllPolicy;

impl AccessPolicy for AllowAllPolicy {
    fn is_authorized(&self, _user: Option<&str>, _command: &Command) -> bool {
        true
    }
}

/// Substitute processor for lines that resolve to nothing.
pub(crate) struct UnknownCommandProcessor {
    session: Session,
}

impl UnknownCommandProcessor {
    pub(crate) fn new(session: Session) -> Arc<dyn CommandProcessor> {
        Arc::new(Self { session })
    }
}

#[async_trait]
impl CommandProcessor for UnknownCommandProcessor {
    async fn process(&self) -> Result<()> {
        self.session.write_line("unknown command").await
    }
}

/// Substitute processor for commands the session may not run.
pub(crate) struct NoAccessProcessor {
    session: Session,
}

impl NoAccessProcessor {
    pub(crate) fn new(session: Session) -> Arc<dyn CommandProcessor> {
        Arc::new(Self { session })
    }
}

#[async_trait]
impl CommandProcessor for NoAccessProcessor {
    async fn process(&self) -> Result<()> {
        self.session.write_line("no access to this command").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder() {
        let cmd = Command::new("get").with_arg("key").with_arg("fallback");
        assert_eq!(cmd.name, "get");
        assert_eq!(cmd.args, vec!["key", "fallback"]);
    }

    #[test]
    fn test_allow_all_policy() {
        let policy = AllowAllPolicy;
        assert!(policy.is_authorized(None, &Command::new("anything")));
        assert!(policy.is_authorized(Some("root"), &Command::new("anything")));
    }
}
