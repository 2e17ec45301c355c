//! Connection monitoring for chain adapters.
//!
//! Each chain adapter runs one [`ConnectionMonitor`] that periodically
//! pings the RPC client and drives a bounded reconnection loop when the
//! ping fails. Reconnection swaps the adapter's client atomically and
//! rebuilds event subscriptions through the adapter's own
//! [`BlockchainClient::reconnect`] implementation.

use async_trait::async_trait;
use relay_types::RelayError;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

/// Interval between connection health checks.
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);
/// Backoff between reconnection attempts.
const RECONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Maximum number of reconnection attempts per failed health check.
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Errors produced by the monitor itself.
#[derive(Debug, Error)]
pub enum MonitorError {
	/// A second concurrent start was rejected.
	#[error("connection monitor is already running for chain {0}")]
	AlreadyRunning(String),
}

/// Blockchain client operations the monitor drives.
#[async_trait]
pub trait BlockchainClient: Send + Sync {
	/// Checks whether the connection is alive.
	async fn check_connection(&self) -> Result<(), RelayError>;

	/// Tears down the old RPC client, dials a new one, swaps it into
	/// the adapter and rebuilds subscriptions.
	async fn reconnect(&self) -> Result<(), RelayError>;
}

/// Periodic health check with bounded reconnection.
pub struct ConnectionMonitor {
	client: Arc<dyn BlockchainClient>,
	chain_name: String,
	stop: Mutex<Option<broadcast::Sender<()>>>,
	handle: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionMonitor {
	/// Creates a new monitor for the given client. Call
	/// [`ConnectionMonitor::start`] to begin monitoring.
	pub fn new(client: Arc<dyn BlockchainClient>, chain_name: impl Into<String>) -> Self {
		Self {
			client,
			chain_name: chain_name.into(),
			stop: Mutex::new(None),
			handle: Mutex::new(None),
		}
	}

	/// Starts the monitoring task. Rejects a second start while the
	/// monitor is already running.
	pub async fn start(&self) -> Result<(), MonitorError> {
		let mut stop = self.stop.lock().await;
		if stop.is_some() {
			return Err(MonitorError::AlreadyRunning(self.chain_name.clone()));
		}

		let (stop_tx, stop_rx) = broadcast::channel(1);
		*stop = Some(stop_tx);

		let client = self.client.clone();
		let chain_name = self.chain_name.clone();
		let handle = tokio::spawn(async move {
			monitor_connection(client, chain_name, stop_rx).await;
		});
		*self.handle.lock().await = Some(handle);

		Ok(())
	}

	/// Stops the monitoring task. Safe to call repeatedly.
	pub async fn stop(&self) {
		if let Some(stop_tx) = self.stop.lock().await.take() {
			let _ = stop_tx.send(());
		}
		if let Some(handle) = self.handle.lock().await.take() {
			let _ = handle.await;
		}
	}
}

/// Health check loop. One failed check triggers a reconnection burst;
/// a fully failed burst is logged and the monitor keeps running on the
/// next tick.
async fn monitor_connection(
	client: Arc<dyn BlockchainClient>,
	chain_name: String,
	mut stop_rx: broadcast::Receiver<()>,
) {
	let mut interval = tokio::time::interval(HEALTH_CHECK_INTERVAL);
	interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
	interval.tick().await;

	loop {
		tokio::select! {
			_ = stop_rx.recv() => {
				tracing::info!(chain = %chain_name, "Connection monitoring stopped");
				return;
			}
			_ = interval.tick() => {
				if let Err(e) = check_and_reconnect(&client, &chain_name, &mut stop_rx).await {
					tracing::error!(chain = %chain_name, error = %e, "Failed to check or reconnect");
				}
			}
		}
	}
}

async fn check_and_reconnect(
	client: &Arc<dyn BlockchainClient>,
	chain_name: &str,
	stop_rx: &mut broadcast::Receiver<()>,
) -> Result<(), RelayError> {
	if let Err(e) = client.check_connection().await {
		tracing::warn!(
			chain = %chain_name,
			error = %e,
			"Connection check failed, attempting to reconnect"
		);

		for attempt in 1..=MAX_RECONNECT_ATTEMPTS {
			match client.reconnect().await {
				Ok(()) => {
					tracing::info!(
						chain = %chain_name,
						attempt,
						"Client successfully reconnected"
					);
					return Ok(());
				}
				Err(e) => {
					tracing::error!(
						chain = %chain_name,
						attempt,
						error = %e,
						"Reconnection attempt failed"
					);

					if attempt == MAX_RECONNECT_ATTEMPTS {
						return Err(RelayError::Rpc(format!(
							"failed to reconnect to chain {}: {}",
							chain_name, e
						)));
					}

					tokio::select! {
						_ = stop_rx.recv() => return Err(RelayError::Cancelled),
						_ = tokio::time::sleep(RECONNECT_TIMEOUT) => {}
					}
				}
			}
		}
	}

	tracing::debug!(chain = %chain_name, "Ping successful");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicU32, Ordering};

	struct HealthyClient;

	#[async_trait]
	impl BlockchainClient for HealthyClient {
		async fn check_connection(&self) -> Result<(), RelayError> {
			Ok(())
		}

		async fn reconnect(&self) -> Result<(), RelayError> {
			Ok(())
		}
	}

	struct FlakyClient {
		reconnects: AtomicU32,
	}

	#[async_trait]
	impl BlockchainClient for FlakyClient {
		async fn check_connection(&self) -> Result<(), RelayError> {
			Err(RelayError::Rpc("connection refused".to_string()))
		}

		async fn reconnect(&self) -> Result<(), RelayError> {
			self.reconnects.fetch_add(1, Ordering::SeqCst);
			Ok(())
		}
	}

	#[tokio::test]
	async fn test_double_start_rejected() {
		let monitor = ConnectionMonitor::new(Arc::new(HealthyClient), "testchain");
		monitor.start().await.unwrap();

		let second = monitor.start().await;
		assert!(matches!(second, Err(MonitorError::AlreadyRunning(_))));

		monitor.stop().await;
	}

	#[tokio::test]
	async fn test_stop_is_idempotent() {
		let monitor = ConnectionMonitor::new(Arc::new(HealthyClient), "testchain");
		monitor.start().await.unwrap();

		monitor.stop().await;
		monitor.stop().await;

		// The monitor can be started again after a stop.
		monitor.start().await.unwrap();
		monitor.stop().await;
	}

	#[tokio::test]
	async fn test_failed_check_triggers_reconnect() {
		let client = Arc::new(FlakyClient {
			reconnects: AtomicU32::new(0),
		});
		let dyn_client: Arc<dyn BlockchainClient> = client.clone();
		let (_stop_tx, mut stop_rx) = broadcast::channel(1);

		let result = check_and_reconnect(&dyn_client, "testchain", &mut stop_rx).await;

		assert!(result.is_ok());
		assert_eq!(client.reconnects.load(Ordering::SeqCst), 1);
	}
}
