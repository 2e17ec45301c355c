//! WebSocket subscription ingestion.
//!
//! One task multiplexes the relay-receiver and transfer log streams. A
//! subscription error triggers a bounded reconnect: bursts of three
//! attempts five seconds apart, then a five-minute pause before the
//! next burst, forever, until the handler is stopped.

use super::{EventHandler, MAX_RECONNECT_ATTEMPTS, RECONNECT_TIMEOUT, RETRY_TIMEOUT};
use alloy_pubsub::SubscriptionStream;
use alloy_rpc_types::Log;
use futures::StreamExt;
use relay_types::{RelayError, SubscriptionMode};
use std::sync::Arc;
use tokio::sync::broadcast;

type LogStream = SubscriptionStream<Log>;

impl EventHandler {
	/// Establishes both subscriptions and spawns the consume loop.
	/// Fails when the initial setup cannot be completed within one
	/// burst of attempts.
	pub(crate) async fn start_ws_subscription(self: &Arc<Self>) -> Result<(), RelayError> {
		let streams = self.setup_subscriptions().await?;

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
		*self.mode.lock().await = Some(SubscriptionMode::WebSocket);

		let handler = self.clone();
		let handle = tokio::spawn(async move {
			handler.run_ws(streams, stop_rx).await;
		});
		self.tasks.lock().await.push(handle);

		Ok(())
	}

	/// Creates the relay and transfer subscriptions starting from the
	/// current head, retrying a bounded number of times.
	async fn setup_subscriptions(&self) -> Result<(LogStream, LogStream), RelayError> {
		let mut last_error = RelayError::Subscription("no attempts made".to_string());

		for attempt in 1..=MAX_RECONNECT_ATTEMPTS {
			match self.try_setup_subscriptions().await {
				Ok(streams) => return Ok(streams),
				Err(e) => {
					tracing::error!(
						chain = %self.config.name,
						attempt,
						error = %e,
						"Failed to setup subscriptions"
					);
					last_error = e;
					if attempt < MAX_RECONNECT_ATTEMPTS {
						tokio::time::sleep(RECONNECT_TIMEOUT).await;
					}
				}
			}
		}

		Err(last_error)
	}

	async fn try_setup_subscriptions(&self) -> Result<(LogStream, LogStream), RelayError> {
		let client = self.client.read().await.clone();

		let block_number = client.block_number().await?;

		let relay_filter = self.relay_filter().from_block(block_number);
		let relay_stream = client.subscribe_logs(&relay_filter).await?.into_stream();

		let transfer_filter = self.transfer_filter().from_block(block_number);
		let transfer_stream = client.subscribe_logs(&transfer_filter).await?.into_stream();

		tracing::info!(
			chain = %self.config.name,
			block_number,
			"Log subscriptions established"
		);

		Ok((relay_stream, transfer_stream))
	}

	/// Consume loop: processes logs from both streams and reconnects
	/// when either stream ends.
	async fn run_ws(
		self: Arc<Self>,
		mut streams: (LogStream, LogStream),
		mut stop_rx: broadcast::Receiver<()>,
	) {
		loop {
			let reconnect = {
				let (relay_stream, transfer_stream) = &mut streams;
				tokio::select! {
					_ = stop_rx.recv() => return,
					maybe_log = relay_stream.next() => match maybe_log {
						Some(log) => {
							self.handle_log(&log).await;
							false
						}
						None => {
							tracing::error!(chain = %self.config.name, "Relay subscription error");
							true
						}
					},
					maybe_log = transfer_stream.next() => match maybe_log {
						Some(log) => {
							self.handle_log(&log).await;
							false
						}
						None => {
							tracing::error!(chain = %self.config.name, "Transfer subscription error");
							true
						}
					},
				}
			};

			if reconnect {
				match self.reconnect_subscriptions(&mut stop_rx).await {
					Some(new_streams) => streams = new_streams,
					None => return,
				}
			}
		}
	}

	/// Infinite reconnect loop: bursts of bounded attempts with a long
	/// pause between bursts. Returns `None` when the stop signal fires.
	async fn reconnect_subscriptions(
		&self,
		stop_rx: &mut broadcast::Receiver<()>,
	) -> Option<(LogStream, LogStream)> {
		let mut attempt = 0u32;

		loop {
			attempt += 1;
			tracing::info!(
				chain = %self.config.name,
				attempt,
				"Attempting to reconnect subscriptions"
			);

			match self.try_setup_subscriptions().await {
				Ok(streams) => {
					tracing::info!(chain = %self.config.name, "Successfully reconnected subscriptions");
					return Some(streams);
				}
				Err(e) => {
					tracing::error!(
						chain = %self.config.name,
						attempt,
						error = %e,
						"Failed to reconnect subscriptions"
					);

					let backoff = if attempt >= MAX_RECONNECT_ATTEMPTS {
						tracing::warn!(
							chain = %self.config.name,
							"Max reconnect attempts reached, waiting for retry timeout"
						);
						attempt = 0;
						RETRY_TIMEOUT
					} else {
						RECONNECT_TIMEOUT
					};

					tokio::select! {
						_ = stop_rx.recv() => return None,
						_ = tokio::time::sleep(backoff) => {}
					}
				}
			}
		}
	}
}
