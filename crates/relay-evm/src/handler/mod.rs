//! Deposit event ingestion for EVM chains.
//!
//! Two log streams feed the handler: relay-receiver events
//! (`FundsForwarded()` / `FundsForwardedWithData(bytes)`) and ERC-20
//! `Transfer` logs whose recipient is the solver. Both are decoded into
//! [`ChainEvent`]s and pushed onto the shared solver channel. The
//! topic-based classifier is the canonical source of the event kind.

pub mod http;
pub mod ws;

use crate::client::EvmClient;
use crate::utils::{event_kind, extract_quote_id_from_tx_data, EventKind};
use alloy_consensus::Transaction as _;
use alloy_primitives::{Address, B256, U256};
use alloy_rpc_types::{Filter, Log};
use alloy_sol_types::SolEvent;
use chrono::{DateTime, Utc};
use relay_types::{
	with_0x_prefix, ChainConfig, ChainEvent, EventMetadata, RelayError, SubscriptionMode,
};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;

/// Backoff between subscription setup attempts.
pub(crate) const RECONNECT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);
/// Pause after a failed burst of reconnect attempts.
pub(crate) const RETRY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5 * 60);
/// Attempts per reconnect burst.
pub(crate) const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Event handler with thread-safe client swapping.
pub struct EventHandler {
	pub(crate) config: ChainConfig,
	pub(crate) relay_receiver: Address,
	pub(crate) solver_address: Address,
	pub(crate) client: RwLock<Arc<EvmClient>>,
	pub(crate) events: mpsc::UnboundedSender<ChainEvent>,
	pub(crate) mode: Mutex<Option<SubscriptionMode>>,
	pub(crate) last_processed_block: Mutex<u64>,
	pub(crate) stop: Mutex<Option<broadcast::Sender<()>>>,
	pub(crate) tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl EventHandler {
	/// Creates a handler bound to the shared event channel.
	pub(crate) fn new(
		config: ChainConfig,
		client: Arc<EvmClient>,
		solver_address: Address,
		events: mpsc::UnboundedSender<ChainEvent>,
	) -> Result<Self, RelayError> {
		let relay_receiver = Address::from_str(&config.relay_receiver).map_err(|e| {
			RelayError::InvalidConfig(format!("invalid relay receiver address: {}", e))
		})?;

		Ok(Self {
			config,
			relay_receiver,
			solver_address,
			client: RwLock::new(client),
			events,
			mode: Mutex::new(None),
			last_processed_block: Mutex::new(0),
			stop: Mutex::new(None),
			tasks: Mutex::new(Vec::new()),
		})
	}

	/// Filter for relay-receiver deposit events.
	pub(crate) fn relay_filter(&self) -> Filter {
		Filter::new().address(self.relay_receiver).event_signature(vec![
			crate::utils::FundsForwarded::SIGNATURE_HASH,
			crate::utils::FundsForwardedWithData::SIGNATURE_HASH,
		])
	}

	/// Filter for ERC-20 transfers into the solver address.
	pub(crate) fn transfer_filter(&self) -> Filter {
		Filter::new()
			.event_signature(crate::utils::Transfer::SIGNATURE_HASH)
			.topic2(B256::left_padding_from(self.solver_address.as_slice()))
	}

	/// Stops all running tasks. Safe to call repeatedly; the handler
	/// can be restarted afterwards.
	pub(crate) async fn stop(&self) {
		if let Some(stop_tx) = self.stop.lock().await.take() {
			let _ = stop_tx.send(());
		}
		let handles: Vec<_> = self.tasks.lock().await.drain(..).collect();
		for handle in handles {
			let _ = handle.await;
		}
	}

	/// Swaps the RPC client and restarts ingestion in whatever mode was
	/// previously active.
	pub(crate) async fn update_client(self: &Arc<Self>, client: Arc<EvmClient>) {
		let mode = *self.mode.lock().await;

		self.stop().await;
		*self.client.write().await = client;

		let restart = match mode {
			Some(SubscriptionMode::HttpPolling) => self.start_http_polling().await,
			Some(SubscriptionMode::WebSocket) => self.start_ws_subscription().await,
			None => Ok(()),
		};
		if let Err(e) = restart {
			tracing::error!(
				chain = %self.config.name,
				error = %e,
				"Failed to restart event ingestion after client update"
			);
		}
	}

	/// Classifies and processes one log, logging (not propagating)
	/// decode failures so one bad log cannot stall the stream.
	pub(crate) async fn handle_log(&self, log: &Log) {
		let Some(kind) = event_kind(log.topics()) else {
			tracing::warn!(
				chain = %self.config.name,
				"Received log with unknown event signature"
			);
			return;
		};

		if let Err(e) = self.process_event(kind, log).await {
			tracing::error!(
				chain = %self.config.name,
				event_type = %kind,
				tx_hash = ?log.transaction_hash,
				block = ?log.block_number,
				error = %e,
				"Failed to process event log"
			);
		}
	}

	/// Decodes one log into a [`ChainEvent`] and emits it.
	///
	/// The quote id comes from the transaction calldata
	/// (`FundsForwardedWithData`, `Transfer`) or is the calldata itself
	/// (`FundsForwarded`); the amount is the transaction value for
	/// relay events and the log payload for transfers.
	pub(crate) async fn process_event(
		&self,
		kind: EventKind,
		log: &Log,
	) -> Result<(), RelayError> {
		let client = self.client.read().await.clone();

		let tx_hash = log
			.transaction_hash
			.ok_or_else(|| RelayError::Subscription("log is missing transaction hash".to_string()))?;
		let block_number = log
			.block_number
			.ok_or_else(|| RelayError::Subscription("log is missing block number".to_string()))?;

		let tx = client
			.transaction_by_hash(tx_hash)
			.await?
			.ok_or_else(|| RelayError::Rpc("failed to get transaction by hash".to_string()))?;

		let (quote_id, amount) = match kind {
			EventKind::FundsForwardedWithData => {
				let quote_id = extract_quote_id_from_tx_data(tx.input())?;
				(with_0x_prefix(&quote_id), tx.value().to_string())
			}
			EventKind::FundsForwarded => (
				String::from_utf8_lossy(tx.input()).into_owned(),
				tx.value().to_string(),
			),
			EventKind::Transfer => {
				let quote_id = extract_quote_id_from_tx_data(tx.input())?;
				let amount = U256::from_be_slice(&log.data().data);
				(with_0x_prefix(&quote_id), amount.to_string())
			}
		};

		let block = client
			.block_by_number(block_number)
			.await?
			.ok_or_else(|| RelayError::Rpc(format!("block {} not found", block_number)))?;
		let mined_at = DateTime::<Utc>::from_timestamp(block.header.timestamp as i64, 0)
			.unwrap_or_default();

		let event = ChainEvent {
			chain_id: self.config.chain_id,
			block_number,
			block_hash: log
				.block_hash
				.map(|h| format!("{:#x}", h))
				.unwrap_or_default(),
			from_token_addr: log.address().to_string(),
			from_address: tx.from.to_string(),
			to_address: tx.to().map(|a| a.to_string()).unwrap_or_default(),
			transaction_hash: format!("{:#x}", tx_hash),
			quote_id: quote_id.clone(),
			from_tx_mined_at: mined_at,
			from_nonce: tx.nonce(),
			transaction_amount: amount,
			metadata: Some(EventMetadata::Evm {
				event: kind.as_str().to_string(),
				log_index: log.log_index.unwrap_or_default(),
			}),
		};

		self.events
			.send(event)
			.map_err(|_| RelayError::Subscription("event channel closed".to_string()))?;

		tracing::info!(
			chain = %self.config.name,
			event_type = %kind,
			block_number,
			tx_hash = %format!("{:#x}", tx_hash),
			quote_id = %quote_id,
			"Successfully received event"
		);

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use relay_types::ChainType;
	use tokio::sync::mpsc;

	fn test_config() -> ChainConfig {
		ChainConfig {
			name: "testchain".to_string(),
			chain_type: ChainType::Evm,
			chain_id: 1,
			rpc_url: "https://rpc.example.com".to_string(),
			tx_type: 2,
			wait_n_blocks: 2,
			private_key: None,
			solver_address: "0x00000000000000000000000000000000000000aa".to_string(),
			relay_receiver: "0x00000000000000000000000000000000000000bb".to_string(),
		}
	}

	async fn test_handler() -> EventHandler {
		let client = EvmClient::connect("http://localhost:1").await.unwrap();
		let (tx, _rx) = mpsc::unbounded_channel();
		let solver = Address::from_str(&test_config().solver_address).unwrap();
		EventHandler::new(test_config(), Arc::new(client), solver, tx).unwrap()
	}

	#[tokio::test]
	async fn test_relay_filter_targets_receiver() {
		let handler = test_handler().await;
		let filter = handler.relay_filter();
		// The filter must be pinned to the relay receiver contract.
		assert!(format!("{:?}", filter).contains("00000000000000000000000000000000000000bb"));
	}

	#[tokio::test]
	async fn test_transfer_filter_pads_solver_address() {
		let handler = test_handler().await;
		let expected = B256::left_padding_from(handler.solver_address.as_slice());
		assert_eq!(&expected[12..], handler.solver_address.as_slice());
		assert_eq!(&expected[..12], &[0u8; 12]);
		let filter = handler.transfer_filter();
		assert!(format!("{:?}", filter).contains("00000000000000000000000000000000000000aa"));
	}

	#[tokio::test]
	async fn test_handler_rejects_bad_receiver_address() {
		let client = EvmClient::connect("http://localhost:1").await.unwrap();
		let (tx, _rx) = mpsc::unbounded_channel();
		let mut config = test_config();
		config.relay_receiver = "not-an-address".to_string();
		let result = EventHandler::new(config, Arc::new(client), Address::ZERO, tx);
		assert!(matches!(result, Err(RelayError::InvalidConfig(_))));
	}
}
