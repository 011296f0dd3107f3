//! Graceful shutdown signaling for tracker loops.
//!
//! Abstracts a tokio watch channel into a broadcast shutdown signal. A single
//! [`ShutdownTx`] notifies every tracker simultaneously; trackers observe the
//! signal at tick boundaries and stop scheduling new work.

use tokio::sync::watch;

/// Transmitter side of the shutdown channel.
///
/// Cloneable handle used to request shutdown of all subscribed trackers.
#[derive(Debug, Clone)]
pub struct ShutdownTx(watch::Sender<()>);

/// Receiver side of the shutdown channel.
///
/// Trackers hold one receiver each and select on [`ShutdownRx::changed`]
/// against their own work to detect the signal.
pub type ShutdownRx = watch::Receiver<()>;

impl ShutdownTx {
    /// Sends the shutdown signal to all subscribed receivers.
    ///
    /// Fails when every receiver has already been dropped, which means there
    /// is nothing left to shut down.
    pub fn shutdown(&self) -> Result<(), watch::error::SendError<()>> {
        self.0.send(())
    }

    /// Creates a new receiver subscribed to this shutdown channel.
    pub fn subscribe(&self) -> ShutdownRx {
        self.0.subscribe()
    }
}

/// Creates a new shutdown channel.
///
/// The returned receiver can be cheaply cloned via [`ShutdownTx::subscribe`],
/// and all receivers observe the same signal.
pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(());
    (ShutdownTx(tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn all_subscribers_observe_the_signal() {
        let (tx, mut rx1) = create_shutdown_channel();
        let mut rx2 = tx.subscribe();

        tx.shutdown().unwrap();

        assert!(rx1.changed().await.is_ok());
        assert!(rx2.changed().await.is_ok());
    }

    #[test]
    fn shutdown_fails_without_receivers() {
        let (tx, rx) = create_shutdown_channel();
        drop(rx);

        assert!(tx.shutdown().is_err());
    }
}
