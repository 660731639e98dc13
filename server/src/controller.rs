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

//! Telnet server controller
//!
//! [`TelnetServer`] owns the listener and the accept loop and enforces the
//! strict lifecycle ordering `configure` → `start` → `stop`. Accepted
//! connections are admitted against the session limit, registered in the
//! session table, and handed a dedicated read task. `stop` returns only
//! after every session has drained its queue and deregistered.

use crate::command::CommandContext;
use crate::config::ServerConfig;
use crate::error::{Result, TelnetError};
use crate::session::{Session, SessionCore};
use crate::table::SessionTable;
use crate::types::Status;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Message written to a connection refused over the session limit.
const LIMIT_MESSAGE: &[u8] = b"sessions limit is over\r\n";

/// Telnet server controller
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use telcon_server::{
///     AllowAllPolicy, Command, CommandContext, CommandProcessor, CommandRegistry,
///     ProcessorFactory, Result, ServerConfig, Session, TelnetServer,
/// };
/// # struct MyRegistry;
/// # impl CommandRegistry for MyRegistry {
/// #     fn resolve(&self, _line: &str) -> Result<Option<Command>> { Ok(None) }
/// # }
/// # struct MyFactory;
/// # impl ProcessorFactory for MyFactory {
/// #     fn build(&self, _c: &Command, _s: &Session) -> Arc<dyn CommandProcessor> {
/// #         unimplemented!()
/// #     }
/// # }
///
/// #[tokio::main]
/// async fn main() -> Result<()> {
///     let context = CommandContext {
///         registry: Arc::new(MyRegistry),
///         policy: Arc::new(AllowAllPolicy),
///         factory: Arc::new(MyFactory),
///     };
///     let server = TelnetServer::new(context);
///     server.configure(ServerConfig::default()).await?;
///     server.start().await?;
///     // ... serve ...
///     server.stop().await?;
///     Ok(())
/// }
/// ```
pub struct TelnetServer {
    /// Configuration, fixed at `configure`
    config: Mutex<ServerConfig>,
    /// Lifecycle state
    status: Mutex<Status>,
    /// Bound listener, present between `configure` and `start`
    listener: Mutex<Option<TcpListener>>,
    /// Actual bound address
    local_addr: Mutex<Option<SocketAddr>>,
    /// Session registry and shutdown gate
    table: Arc<SessionTable>,
    /// Command collaborators
    context: CommandContext,
    /// Running flag for the accept loop
    running: Arc<AtomicBool>,
    /// Shutdown notification
    shutdown: Arc<Notify>,
    /// Accept loop task handle
    accept_handle: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl TelnetServer {
    /// Create an unconfigured server around the command collaborators.
    pub fn new(context: CommandContext) -> Self {
        Self {
            config: Mutex::new(ServerConfig::default()),
            status: Mutex::new(Status::Unconfigured),
            listener: Mutex::new(None),
            local_addr: Mutex::new(None),
            table: Arc::new(SessionTable::new()),
            context,
            running: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(Notify::new()),
            accept_handle: tokio::sync::Mutex::new(None),
        }
    }

    /// Bind the listener with the given configuration.
    ///
    /// Only valid on an unconfigured server; the listener does not accept
    /// until `start` is called.
    pub async fn configure(&self, config: ServerConfig) -> Result<()> {
        {
            let status = self.status.lock().unwrap();
            if *status != Status::Unconfigured {
                return Err(TelnetError::IllegalState {
                    operation: "configure",
                    status: *status,
                });
            }
        }
        let listener = Self::bind(&config)?;
        let local_addr = listener.local_addr()?;
        info!("telnet server bound to {}", local_addr);
        *self.listener.lock().unwrap() = Some(listener);
        *self.local_addr.lock().unwrap() = Some(local_addr);
        *self.config.lock().unwrap() = config;
        *self.status.lock().unwrap() = Status::Configured;
        Ok(())
    }

    fn bind(config: &ServerConfig) -> Result<TcpListener> {
        let socket = if config.bind_address.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(config.reuseaddr)?;
        socket.set_keepalive(config.keepalive)?;
        if let Some(size) = config.recv_buffer_size {
            socket.set_recv_buffer_size(size)?;
        }
        if let Some(size) = config.send_buffer_size {
            socket.set_send_buffer_size(size)?;
        }
        socket.bind(config.bind_address)?;
        Ok(socket.listen(config.backlog)?)
    }

    /// Start accepting connections. Only valid on a configured server.
    pub async fn start(&self) -> Result<()> {
        {
            let mut status = self.status.lock().unwrap();
            if *status != Status::Configured {
                return Err(TelnetError::IllegalState {
                    operation: "start",
                    status: *status,
                });
            }
            *status = Status::Started;
        }
        let listener = {
            let taken = self.listener.lock().unwrap().take();
            match taken {
                Some(listener) => listener,
                None => {
                    return Err(TelnetError::IllegalState {
                        operation: "start",
                        status: Status::Configured,
                    });
                }
            }
        };
        self.running.store(true, Ordering::SeqCst);
        info!("telnet server accepting on {:?}", listener.local_addr().ok());
        let handle = self.spawn_accept_loop(listener);
        *self.accept_handle.lock().await = Some(handle);
        Ok(())
    }

    fn spawn_accept_loop(&self, listener: TcpListener) -> JoinHandle<()> {
        let config = self.config.lock().unwrap().clone();
        let table = self.table.clone();
        let context = self.context.clone();
        let running = self.running.clone();
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            loop {
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                let accepted = tokio::select! {
                    result = listener.accept() => result,
                    _ = shutdown.notified() => break,
                };
                match accepted {
                    Ok((stream, peer)) => {
                        admit(stream, peer, &config, &table, &context).await;
                    }
                    Err(error) => {
                        warn!("accept failed: {}", error);
                        // Back off to avoid a tight error loop.
                        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                    }
                }
            }
            debug!("accept loop terminated");
        })
    }

    /// Stop the server. Only valid on a started server.
    ///
    /// Stops accepting, closes every session, and returns once the last
    /// session has finished its current command and deregistered.
    pub async fn stop(&self) -> Result<()> {
        {
            let mut status = self.status.lock().unwrap();
            if *status != Status::Started {
                return Err(TelnetError::IllegalState {
                    operation: "stop",
                    status: *status,
                });
            }
            *status = Status::Stopped;
        }
        info!("stopping telnet server");
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_waiters();
        if let Some(handle) = self.accept_handle.lock().await.take() {
            let _ = handle.await;
        }
        self.table.close_all().await;
        self.table.wait_drained().await;
        info!("telnet server stopped");
        Ok(())
    }

    /// Current lifecycle state.
    pub fn status(&self) -> Status {
        *self.status.lock().unwrap()
    }

    /// Address the listener is bound to, once configured.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock().unwrap()
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.table.len()
    }
}

/// Admit one accepted connection, or refuse it over the session limit.
async fn admit(
    stream: TcpStream,
    peer: SocketAddr,
    config: &ServerConfig,
    table: &Arc<SessionTable>,
    context: &CommandContext,
) {
    if let Err(error) = stream.set_nodelay(config.nodelay) {
        debug!("failed to set nodelay for {}: {}", peer, error);
    }
    let Some(id) = table.try_admit(config.max_sessions) else {
        let error = TelnetError::SessionLimit(config.max_sessions);
        info!("refusing {}: {}", peer, error);
        let mut stream = stream;
        let _ = stream.write_all(LIMIT_MESSAGE).await;
        let _ = stream.shutdown().await;
        return;
    };
    let (reader, writer) = stream.into_split();
    let session = Session::new(id, peer, writer, table.clone(), config.prompt.clone());
    table.register(session.clone());
    info!("{} established from {}", id, peer);

    if let Some(greeting) = &config.greeting {
        if session.write_line(greeting).await.is_err() {
            session.close().await;
            return;
        }
    }
    if session.send_prompt().await.is_err() {
        session.close().await;
        return;
    }

    let core = SessionCore::new(session, context.clone(), config.buffer_increment);
    let chunk_size = config.read_chunk_size;
    tokio::spawn(read_loop(reader, core, chunk_size));
}

/// Per-connection read task: chunked reads into the decoder until EOF,
/// error, or close. Never executes command logic itself.
async fn read_loop(mut reader: OwnedReadHalf, mut core: SessionCore, chunk_size: usize) {
    let mut chunk = vec![0u8; chunk_size.max(1)];
    loop {
        if core.session().is_closed() {
            break;
        }
        let read = tokio::select! {
            read = reader.read(&mut chunk) => read,
            _ = core.session().closed() => break,
        };
        let id = core.session().id();
        match read {
            Ok(0) => {
                debug!("{} disconnected", id);
                core.session().close().await;
                break;
            }
            Ok(n) => {
                if let Err(error) = core.feed(&chunk[..n]).await {
                    if !matches!(error, TelnetError::SessionClosed) {
                        warn!("{} dropped: {}", id, error);
                    }
                    core.session().close().await;
                    break;
                }
            }
            Err(error) => {
                debug!("{} read failed: {}", id, error);
                core.session().close().await;
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{
        AllowAllPolicy, Command, CommandProcessor, CommandRegistry, ProcessorFactory,
    };
    use std::sync::Arc;

    struct NullRegistry;

    impl CommandRegistry for NullRegistry {
        fn resolve(&self, _line: &str) -> Result<Option<Command>> {
            Ok(None)
        }
    }

    struct NullFactory;

    impl ProcessorFactory for NullFactory {
        fn build(&self, _command: &Command, _session: &Session) -> Arc<dyn CommandProcessor> {
            unreachable!("registry resolves nothing")
        }
    }

    fn test_server() -> TelnetServer {
        TelnetServer::new(CommandContext {
            registry: Arc::new(NullRegistry),
            policy: Arc::new(AllowAllPolicy),
            factory: Arc::new(NullFactory),
        })
    }

    fn loopback_config() -> ServerConfig {
        ServerConfig::default().with_bind_address("127.0.0.1:0".parse().unwrap())
    }

    #[tokio::test]
    async fn test_lifecycle_order_enforced() {
        let server = test_server();
        assert!(matches!(
            server.start().await,
            Err(TelnetError::IllegalState {
                operation: "start",
                ..
            })
        ));
        assert!(matches!(
            server.stop().await,
            Err(TelnetError::IllegalState {
                operation: "stop",
                ..
            })
        ));

        server.configure(loopback_config()).await.unwrap();
        assert_eq!(server.status(), Status::Configured);
        assert!(matches!(
            server.configure(loopback_config()).await,
            Err(TelnetError::IllegalState {
                operation: "configure",
                ..
            })
        ));

        server.start().await.unwrap();
        assert_eq!(server.status(), Status::Started);
        server.stop().await.unwrap();
        assert_eq!(server.status(), Status::Stopped);

        // Terminal: nothing restarts a stopped server.
        assert!(server.start().await.is_err());
        assert!(server.stop().await.is_err());
    }

    #[tokio::test]
    async fn test_local_addr_available_after_configure() {
        let server = test_server();
        assert!(server.local_addr().is_none());
        server.configure(loopback_config()).await.unwrap();
        let addr = server.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
        server.start().await.unwrap();
        server.stop().await.unwrap();
    }
}
