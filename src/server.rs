//! Server lifecycle: the control-channel listener, the live-session
//! registry, and coordinated shutdown.

use anyhow::{bail, Context, Result};
use log::{error, info, warn};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time;

use crate::config::Config;
use crate::constants::SHUTDOWN_GRACE_SECS;
use crate::core_auth::{AuthPredicate, FixedCredentials};
use crate::core_log::{EventSink, LogSink};
use crate::core_network::network;

/// Shared context handed to every session: configuration, the auth
/// predicate, and the event sink. All three are safe for concurrent use.
pub struct ServerContext {
    pub config: Arc<Config>,
    pub auth: Arc<dyn AuthPredicate>,
    pub sink: Arc<dyn EventSink>,
}

struct SessionHandle {
    shutdown: Arc<Notify>,
    task: JoinHandle<()>,
}

type SessionRegistry = Arc<Mutex<HashMap<u64, SessionHandle>>>;

pub struct Server {
    ctx: Arc<ServerContext>,
    sessions: SessionRegistry,
    accept_shutdown: Arc<Notify>,
    accept_task: Option<JoinHandle<()>>,
}

impl Server {
    /// Builds a server with the reference auth predicate and the logging
    /// event sink.
    pub fn new(config: Config) -> Self {
        Self::with_parts(
            config,
            Arc::new(FixedCredentials::default()),
            Arc::new(LogSink),
        )
    }

    pub fn with_parts(
        config: Config,
        auth: Arc<dyn AuthPredicate>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            ctx: Arc::new(ServerContext {
                config: Arc::new(config),
                auth,
                sink,
            }),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            accept_shutdown: Arc::new(Notify::new()),
            accept_task: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.accept_task.is_some()
    }

    /// Changes the server root. Only permitted while stopped; the
    /// directory is created if absent.
    pub fn set_root(&mut self, path: &str) -> Result<()> {
        if self.is_running() {
            bail!("server must be stopped before changing the root path");
        }
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create root directory: {}", path))?;

        let mut config = (*self.ctx.config).clone();
        config.server.root_path = path.to_string();
        self.ctx = Arc::new(ServerContext {
            config: Arc::new(config),
            auth: Arc::clone(&self.ctx.auth),
            sink: Arc::clone(&self.ctx.sink),
        });
        info!("Root path set to: {}", path);
        Ok(())
    }

    /// Binds the control listener and starts accepting sessions. A bind
    /// failure is returned without starting anything. Returns the bound
    /// address (the port is OS-chosen when configured as 0).
    pub async fn start(&mut self) -> Result<SocketAddr> {
        if self.is_running() {
            self.stop().await;
        }

        let root = self.ctx.config.server.root_path.clone();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create root directory: {}", root))?;

        let port = self.ctx.config.listen_port();
        let listener = TcpListener::bind(("0.0.0.0", port))
            .await
            .with_context(|| format!("Failed to bind port {}", port))?;
        let addr = listener.local_addr()?;
        info!("Server listening on {}", addr);

        let ctx = Arc::clone(&self.ctx);
        let sessions = Arc::clone(&self.sessions);
        let shutdown = Arc::clone(&self.accept_shutdown);

        self.accept_task = Some(tokio::spawn(async move {
            accept_loop(listener, ctx, sessions, shutdown).await;
        }));

        Ok(addr)
    }

    /// Stops accepting, signals every live session, and waits for their
    /// teardown. Sessions that outstay the grace period are aborted,
    /// which drops their sockets and file handles.
    pub async fn stop(&mut self) {
        let Some(accept_task) = self.accept_task.take() else {
            return;
        };

        self.accept_shutdown.notify_one();
        if accept_task.await.is_err() {
            warn!("accept loop ended abnormally");
        }

        let handles: Vec<(u64, SessionHandle)> =
            self.sessions.lock().await.drain().collect();
        for (id, handle) in handles {
            handle.shutdown.notify_one();
            let abort = handle.task.abort_handle();
            match time::timeout(Duration::from_secs(SHUTDOWN_GRACE_SECS), handle.task).await {
                Ok(_) => {}
                Err(_) => {
                    warn!("session {} did not stop in time, aborting", id);
                    abort.abort();
                }
            }
        }
        info!("Server stopped");
    }
}

async fn accept_loop(
    listener: TcpListener,
    ctx: Arc<ServerContext>,
    sessions: SessionRegistry,
    shutdown: Arc<Notify>,
) {
    let mut next_id: u64 = 1;
    loop {
        tokio::select! {
            _ = shutdown.notified() => break,
            accepted = listener.accept() => {
                let (socket, addr) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        // Per-connection failures never kill the listener.
                        error!("Failed to accept connection: {}", e);
                        continue;
                    }
                };

                let id = next_id;
                next_id += 1;
                info!("New connection from {} (session {})", addr, id);

                let session_shutdown = Arc::new(Notify::new());
                let ctx = Arc::clone(&ctx);
                let registry = Arc::clone(&sessions);
                let task_shutdown = Arc::clone(&session_shutdown);

                // Insert under the same lock the session task uses to
                // remove itself, so a short-lived session cannot race its
                // own registration.
                let mut guard = sessions.lock().await;
                let task = tokio::spawn(async move {
                    if let Err(e) =
                        network::handle_connection(socket, ctx, id, task_shutdown).await
                    {
                        warn!("session {} ended with error: {:#}", id, e);
                    }
                    registry.lock().await.remove(&id);
                });
                guard.insert(
                    id,
                    SessionHandle {
                        shutdown: session_shutdown,
                        task,
                    },
                );
            }
        }
    }
}
