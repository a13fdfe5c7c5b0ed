//! Shutdown signaling for check workers.
//!
//! Wraps a watch channel of unit values: the transmitter broadcasts a single
//! "shut down now" notification, and every subscribed worker observes it at
//! its next suspension point. No payload is carried — the signal itself is
//! the message.

use tokio::sync::watch;

/// Transmitter side of the shutdown channel.
///
/// Cloning is cheap; any clone can trigger shutdown for all subscribers.
#[derive(Debug, Clone)]
pub struct ShutdownTx(watch::Sender<()>);

/// Receiver side of the shutdown channel.
pub type ShutdownRx = watch::Receiver<()>;

impl ShutdownTx {
    /// Broadcasts the shutdown signal to all subscribers.
    ///
    /// Fails only when every receiver has already been dropped, which means
    /// there is nothing left to shut down.
    pub fn shutdown(&self) -> Result<(), watch::error::SendError<()>> {
        self.0.send(())
    }

    /// Creates a new receiver subscribed to this transmitter.
    pub fn subscribe(&self) -> ShutdownRx {
        self.0.subscribe()
    }
}

/// Creates a new shutdown channel pair.
pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(());
    (ShutdownTx(tx), rx)
}
