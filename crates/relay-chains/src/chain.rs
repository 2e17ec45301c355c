//! The chain façade with thread-safe access to its capabilities.

use alloy_primitives::U256;
use relay_types::{
	BalanceProvider, ChainConfig, ChainEvent, EventHandler, GasEstimator, Intent, RelayError,
	Transaction, TransactionSender, TransactionStatus, TransactionWatcher,
};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

/// A chain with independently installable capability strategies.
///
/// Every capability slot is guarded by its own reader/writer lock so
/// that a client swap on one capability never blocks reads on another.
/// Reads clone the capability handle and release the lock before
/// calling into it; calls against a missing capability fail with
/// [`RelayError::NotImplemented`].
pub struct Chain {
	config: ChainConfig,
	estimator: RwLock<Option<Arc<dyn GasEstimator>>>,
	sender: RwLock<Option<Arc<dyn TransactionSender>>>,
	watcher: RwLock<Option<Arc<dyn TransactionWatcher>>>,
	handler: RwLock<Option<Arc<dyn EventHandler>>>,
	balance: RwLock<Option<Arc<dyn BalanceProvider>>>,
}

impl Chain {
	pub(crate) fn new(
		config: ChainConfig,
		estimator: Option<Arc<dyn GasEstimator>>,
		sender: Option<Arc<dyn TransactionSender>>,
		watcher: Option<Arc<dyn TransactionWatcher>>,
		handler: Option<Arc<dyn EventHandler>>,
		balance: Option<Arc<dyn BalanceProvider>>,
	) -> Self {
		Self {
			config,
			estimator: RwLock::new(estimator),
			sender: RwLock::new(sender),
			watcher: RwLock::new(watcher),
			handler: RwLock::new(handler),
			balance: RwLock::new(balance),
		}
	}

	/// Returns the chain configuration.
	pub fn config(&self) -> &ChainConfig {
		&self.config
	}

	/// Estimates gas for a call. Fails with `NotImplemented` when no
	/// estimator is installed.
	pub async fn estimate_gas(
		&self,
		to: &str,
		value: U256,
		data: &[u8],
	) -> Result<u64, RelayError> {
		let estimator = {
			let guard = self.estimator.read().await;
			guard.clone().ok_or(RelayError::NotImplemented)?
		};
		estimator.estimate_gas(to, value, data).await
	}

	/// Sends the asset described by the intent. Fails with
	/// `NotImplemented` when no sender is installed (read-only chains).
	pub async fn send_asset(&self, intent: &Intent) -> Result<Transaction, RelayError> {
		let sender = {
			let guard = self.sender.read().await;
			guard.clone().ok_or(RelayError::NotImplemented)?
		};
		sender.send_asset(intent).await
	}

	/// Waits for the transaction to reach a terminal state.
	pub async fn wait_transaction_confirmation(
		&self,
		tx: &mut Transaction,
	) -> Result<TransactionStatus, RelayError> {
		let watcher = {
			let guard = self.watcher.read().await;
			guard.clone().ok_or(RelayError::NotImplemented)?
		};
		watcher.wait_transaction_confirmation(tx).await
	}

	/// Initializes the WebSocket subscription for chain events.
	pub async fn init_ws_subscription(
		&self,
		events: mpsc::UnboundedSender<ChainEvent>,
	) -> Result<(), RelayError> {
		let handler = {
			let guard = self.handler.read().await;
			guard.clone().ok_or(RelayError::NotImplemented)?
		};
		handler.init_ws_subscription(events).await
	}

	/// Initializes HTTP polling for chain events.
	pub async fn init_http_polling(
		&self,
		events: mpsc::UnboundedSender<ChainEvent>,
	) -> Result<(), RelayError> {
		let handler = {
			let guard = self.handler.read().await;
			guard.clone().ok_or(RelayError::NotImplemented)?
		};
		handler.init_http_polling(events).await
	}

	/// Returns the balance of `address` for the given token.
	pub async fn get_token_balance(&self, address: &str, token: &str) -> Result<U256, RelayError> {
		let balance = {
			let guard = self.balance.read().await;
			guard.clone().ok_or(RelayError::NotImplemented)?
		};
		balance.get_token_balance(address, token).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::builder::ChainBuilder;
	use async_trait::async_trait;
	use relay_types::ChainType;

	fn test_config() -> ChainConfig {
		ChainConfig {
			name: "testchain".to_string(),
			chain_type: ChainType::Evm,
			chain_id: 1,
			rpc_url: "https://rpc.example.com".to_string(),
			tx_type: 2,
			wait_n_blocks: 2,
			private_key: None,
			solver_address: "0x0000000000000000000000000000000000000001".to_string(),
			relay_receiver: "0x0000000000000000000000000000000000000002".to_string(),
		}
	}

	struct FixedEstimator(u64);

	#[async_trait]
	impl GasEstimator for FixedEstimator {
		async fn estimate_gas(
			&self,
			_to: &str,
			_value: U256,
			_data: &[u8],
		) -> Result<u64, RelayError> {
			Ok(self.0)
		}
	}

	#[tokio::test]
	async fn test_missing_capabilities_fail_not_implemented() {
		let chain = ChainBuilder::new(test_config()).build();

		let mut tx = relay_types::Transaction {
			hash: "0xabc".to_string(),
			from: String::new(),
			to: String::new(),
			from_amount: U256::ZERO,
			to_amount: U256::ZERO,
			token: String::new(),
			nonce: 0,
			chain_id: 1,
			quote_id: String::new(),
			metadata: None,
		};

		assert!(matches!(
			chain.estimate_gas("0x0", U256::ZERO, &[]).await,
			Err(RelayError::NotImplemented)
		));
		assert!(matches!(
			chain.wait_transaction_confirmation(&mut tx).await,
			Err(RelayError::NotImplemented)
		));
		assert!(matches!(
			chain.get_token_balance("0x0", "0x0").await,
			Err(RelayError::NotImplemented)
		));
	}

	#[tokio::test]
	async fn test_installed_capability_dispatches() {
		let chain = ChainBuilder::new(test_config())
			.with_gas_estimator(Arc::new(FixedEstimator(21000)))
			.build();

		let gas = chain.estimate_gas("0x0", U256::ZERO, &[]).await.unwrap();
		assert_eq!(gas, 21000);
	}
}
