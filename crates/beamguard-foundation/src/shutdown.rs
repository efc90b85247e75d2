use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative shutdown flag shared by every worker thread.
#[derive(Clone)]
pub struct ShutdownToken {
    flag: Arc<AtomicBool>,
}

impl ShutdownToken {
    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Installs SIGINT/SIGTERM handlers and fans the request out to worker
/// threads via a flag (polled on hot paths) and a channel (blocked waits).
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl Default for ShutdownHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandler {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::bounded(1);
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            tx,
            rx,
        }
    }

    pub fn token(&self) -> ShutdownToken {
        ShutdownToken {
            flag: Arc::clone(&self.flag),
        }
    }

    /// Trigger shutdown manually (tests, fatal errors).
    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
        let _ = self.tx.try_send(());
    }

    /// Blocks the calling thread until shutdown is requested.
    pub fn wait(&self) {
        if self.flag.load(Ordering::SeqCst) {
            return;
        }
        let _ = self.rx.recv();
    }

    /// Spawn the signal listener. Must be called from within a tokio
    /// runtime; resolves the returned future when installed.
    pub async fn install(self) -> Arc<Self> {
        let handler = Arc::new(self);
        let signal_handler = Arc::clone(&handler);
        tokio::spawn(async move {
            let ctrl_c = tokio::signal::ctrl_c();
            #[cfg(unix)]
            {
                let mut sigterm = match tokio::signal::unix::signal(
                    tokio::signal::unix::SignalKind::terminate(),
                ) {
                    Ok(s) => s,
                    Err(e) => {
                        tracing::error!("Failed to install SIGTERM handler: {}", e);
                        let _ = ctrl_c.await;
                        signal_handler.request();
                        return;
                    }
                };
                tokio::select! {
                    _ = ctrl_c => tracing::info!("Received SIGINT, initiating shutdown"),
                    _ = sigterm.recv() => tracing::info!("Received SIGTERM, initiating shutdown"),
                }
            }
            #[cfg(not(unix))]
            {
                let _ = ctrl_c.await;
                tracing::info!("Received Ctrl+C, initiating shutdown");
            }
            signal_handler.request();
        });
        handler
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_sets_token_and_unblocks_wait() {
        let handler = ShutdownHandler::new();
        let token = handler.token();
        assert!(!token.is_shutdown());

        handler.request();
        assert!(token.is_shutdown());
        handler.wait();
    }
}
