//! HTTP polling ingestion.
//!
//! A five-second ticker walks the chain in windows of at most 1000
//! blocks. The first tick only records the current head; a failed tick
//! leaves `last_processed_block` untouched so the same window is
//! retried on the next tick.

use super::EventHandler;
use crate::client::EvmClient;
use alloy_rpc_types::Log;
use relay_types::{RelayError, SubscriptionMode};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Poll cadence.
const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(5);
/// Maximum number of blocks fetched per tick.
const MAX_BLOCK_RANGE: u64 = 1000;

/// Clamps the polling window to at most [`MAX_BLOCK_RANGE`] blocks
/// after the last processed one.
pub(crate) fn polling_window(last_processed: u64, current: u64) -> (u64, u64) {
	let from = last_processed + 1;
	let to = (last_processed + MAX_BLOCK_RANGE).min(current);
	(from, to)
}

impl EventHandler {
	/// Spawns the polling task.
	pub(crate) async fn start_http_polling(self: &Arc<Self>) -> Result<(), RelayError> {
		let (stop_tx, stop_rx) = broadcast::channel(1);
		{
			let mut stop = self.stop.lock().await;
			if stop.is_some() {
				return Err(RelayError::Subscription(
					"event handler already started".to_string(),
				));
			}
			*stop = Some(stop_tx);
		}
		*self.mode.lock().await = Some(SubscriptionMode::HttpPolling);

		tracing::info!(
			chain = %self.config.name,
			interval_secs = DEFAULT_POLLING_INTERVAL.as_secs(),
			"Start polling FundsForwarded, FundsForwardedWithData and Transfer events"
		);

		let handler = self.clone();
		let handle = tokio::spawn(async move {
			handler.run_polling(stop_rx).await;
		});
		self.tasks.lock().await.push(handle);

		Ok(())
	}

	async fn run_polling(self: Arc<Self>, mut stop_rx: broadcast::Receiver<()>) {
		let mut interval = tokio::time::interval(DEFAULT_POLLING_INTERVAL);
		interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
		interval.tick().await;

		loop {
			tokio::select! {
				_ = stop_rx.recv() => return,
				_ = interval.tick() => {
					if let Err(e) = self.poll_events().await {
						tracing::error!(
							chain = %self.config.name,
							error = %e,
							"Error polling events"
						);
					}
				}
			}
		}
	}

	/// One polling tick. The bootstrap tick (`last_processed_block ==
	/// 0`) records the head and emits nothing.
	async fn poll_events(&self) -> Result<(), RelayError> {
		let client = self.client.read().await.clone();

		let current_block = client.block_number().await?;

		let last_processed = *self.last_processed_block.lock().await;
		if last_processed == 0 {
			*self.last_processed_block.lock().await = current_block;
			return Ok(());
		}

		if current_block <= last_processed {
			return Ok(());
		}

		let (from_block, to_block) = polling_window(last_processed, current_block);
		self.process_block_range(&client, from_block, to_block)
			.await?;

		*self.last_processed_block.lock().await = to_block;
		Ok(())
	}

	/// Runs both log queries concurrently over the window and processes
	/// the results in ascending `(block_number, log_index)` order. An
	/// error on either query aborts the tick without advancing.
	async fn process_block_range(
		&self,
		client: &Arc<EvmClient>,
		from_block: u64,
		to_block: u64,
	) -> Result<(), RelayError> {
		let relay_filter = self.relay_filter().from_block(from_block).to_block(to_block);
		let transfer_filter = self
			.transfer_filter()
			.from_block(from_block)
			.to_block(to_block);

		let (relay_logs, transfer_logs) = tokio::join!(
			client.get_logs(&relay_filter),
			client.get_logs(&transfer_filter),
		);
		let relay_logs =
			relay_logs.map_err(|e| RelayError::Rpc(format!("failed to get relay logs: {}", e)))?;
		let transfer_logs = transfer_logs
			.map_err(|e| RelayError::Rpc(format!("failed to get transfer logs: {}", e)))?;

		let mut logs: Vec<Log> = relay_logs;
		logs.extend(transfer_logs);
		logs.sort_by_key(|log| (log.block_number.unwrap_or_default(), log.log_index.unwrap_or_default()));

		for log in &logs {
			self.handle_log(log).await;
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_polling_window_clamped_to_max_range() {
		// A backlog far larger than the cap is clamped to 1000 blocks.
		let (from, to) = polling_window(1000, 10_000);
		assert_eq!(from, 1001);
		assert_eq!(to, 2000);
		assert_eq!(to - from + 1, MAX_BLOCK_RANGE);
	}

	#[test]
	fn test_polling_window_small_backlog() {
		let (from, to) = polling_window(1000, 1003);
		assert_eq!(from, 1001);
		assert_eq!(to, 1003);
	}

	#[test]
	fn test_polling_window_single_block() {
		let (from, to) = polling_window(1000, 1001);
		assert_eq!(from, 1001);
		assert_eq!(to, 1001);
	}
}
