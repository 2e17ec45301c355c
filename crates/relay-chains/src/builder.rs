//! Builder for assembling a chain from its capabilities.

use crate::chain::Chain;
use relay_types::{
	BalanceProvider, ChainConfig, EventHandler, GasEstimator, TransactionSender, TransactionWatcher,
};
use std::sync::Arc;

/// Accumulates capability implementations for a chain configuration and
/// materializes the [`Chain`] façade. Capabilities left unset stay
/// uninstalled and answer `NotImplemented` on the built chain.
pub struct ChainBuilder {
	config: ChainConfig,
	estimator: Option<Arc<dyn GasEstimator>>,
	sender: Option<Arc<dyn TransactionSender>>,
	watcher: Option<Arc<dyn TransactionWatcher>>,
	handler: Option<Arc<dyn EventHandler>>,
	balance: Option<Arc<dyn BalanceProvider>>,
}

impl ChainBuilder {
	/// Creates a builder with no capabilities installed.
	pub fn new(config: ChainConfig) -> Self {
		Self {
			config,
			estimator: None,
			sender: None,
			watcher: None,
			handler: None,
			balance: None,
		}
	}

	/// Installs the gas estimator.
	pub fn with_gas_estimator(mut self, estimator: Arc<dyn GasEstimator>) -> Self {
		self.estimator = Some(estimator);
		self
	}

	/// Installs the transaction sender.
	pub fn with_transaction_sender(mut self, sender: Arc<dyn TransactionSender>) -> Self {
		self.sender = Some(sender);
		self
	}

	/// Installs the transaction watcher.
	pub fn with_transaction_watcher(mut self, watcher: Arc<dyn TransactionWatcher>) -> Self {
		self.watcher = Some(watcher);
		self
	}

	/// Installs the event handler.
	pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
		self.handler = Some(handler);
		self
	}

	/// Installs the balance provider.
	pub fn with_balance_provider(mut self, balance: Arc<dyn BalanceProvider>) -> Self {
		self.balance = Some(balance);
		self
	}

	/// Materializes the chain with the configured capabilities.
	pub fn build(self) -> Chain {
		Chain::new(
			self.config,
			self.estimator,
			self.sender,
			self.watcher,
			self.handler,
			self.balance,
		)
	}
}
