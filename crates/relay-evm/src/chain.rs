//! The EVM chain adapter.
//!
//! Holds the RPC client, signer, event handler and connection monitor
//! behind per-capability reader/writer locks so that a client hot-swap
//! never blocks independent reads. Reads clone the handle and release
//! the lock before any RPC call.

use crate::client::EvmClient;
use crate::handler::EventHandler;
use crate::signer::EvmSigner;
use alloy_primitives::Address;
use async_trait::async_trait;
use relay_chains::{Chain, ChainBuilder};
use relay_monitor::{BlockchainClient, ConnectionMonitor};
use relay_types::{ChainConfig, ChainEvent, RelayError};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock};

/// Legacy transaction type discriminator.
pub(crate) const TX_TYPE_LEGACY: u64 = 0;
/// EIP-1559 transaction type discriminator.
pub(crate) const TX_TYPE_EIP1559: u64 = 2;

pub(crate) struct EvmInner {
	pub(crate) config: ChainConfig,
	pub(crate) client: RwLock<Option<Arc<EvmClient>>>,
	pub(crate) signer: RwLock<Option<Arc<EvmSigner>>>,
	pub(crate) solver_address: RwLock<Option<Address>>,
	pub(crate) handler: RwLock<Option<Arc<EventHandler>>>,
	pub(crate) monitor: RwLock<Option<Arc<ConnectionMonitor>>>,
	/// Broadcast that cancels in-flight confirmation waits on shutdown.
	pub(crate) shutdown: broadcast::Sender<()>,
}

impl EvmInner {
	pub(crate) async fn client(&self) -> Result<Arc<EvmClient>, RelayError> {
		self.client
			.read()
			.await
			.clone()
			.ok_or(RelayError::NotInitialized)
	}

	pub(crate) async fn signer(&self) -> Result<Arc<EvmSigner>, RelayError> {
		self.signer
			.read()
			.await
			.clone()
			.ok_or(RelayError::NotInitialized)
	}

	pub(crate) async fn solver_address(&self) -> Result<Address, RelayError> {
		self.solver_address
			.read()
			.await
			.ok_or(RelayError::NotInitialized)
	}
}

/// EVM family adapter implementing the chain capabilities.
#[derive(Clone)]
pub struct EvmChain {
	pub(crate) inner: Arc<EvmInner>,
}

impl EvmChain {
	/// Dials the chain and prepares the adapter without assembling the
	/// capability façade. Embedding processes keep this handle for the
	/// adapter-level operations: deposit validation, the solver
	/// address, shutdown.
	///
	/// When a private key is configured the signer's address becomes
	/// the solver address. The connection monitor starts immediately
	/// and swaps the client (and the event handler's view of it) on
	/// reconnect.
	pub async fn new(config: &ChainConfig) -> Result<Self, RelayError> {
		config.validate()?;

		let client = EvmClient::connect(&config.rpc_url).await?;

		let solver_address = if config.solver_address.is_empty() {
			None
		} else {
			Some(Address::from_str(&config.solver_address).map_err(|e| {
				RelayError::InvalidConfig(format!("invalid solver address: {}", e))
			})?)
		};

		let (shutdown, _) = broadcast::channel(1);
		let inner = Arc::new(EvmInner {
			config: config.clone(),
			client: RwLock::new(Some(Arc::new(client))),
			signer: RwLock::new(None),
			solver_address: RwLock::new(solver_address),
			handler: RwLock::new(None),
			monitor: RwLock::new(None),
			shutdown,
		});

		let adapter = EvmChain { inner };

		if let Some(private_key) = &config.private_key {
			let signer = EvmSigner::from_hex(private_key)?;
			*adapter.inner.solver_address.write().await = Some(signer.address());
			*adapter.inner.signer.write().await = Some(Arc::new(signer));
		}

		adapter.init_monitor().await?;

		Ok(adapter)
	}

	/// Assembles the capability façade. The sender capability is only
	/// installed when a signer is configured.
	pub async fn assemble(&self) -> Chain {
		let mut builder = ChainBuilder::new(self.inner.config.clone())
			.with_gas_estimator(Arc::new(self.clone()))
			.with_transaction_watcher(Arc::new(self.clone()))
			.with_event_handler(Arc::new(self.clone()))
			.with_balance_provider(Arc::new(self.clone()));

		if self.inner.signer.read().await.is_some() {
			builder = builder.with_transaction_sender(Arc::new(self.clone()));
		}

		builder.build()
	}

	/// One-shot construction used by the chain factory.
	pub async fn connect(config: &ChainConfig) -> Result<Chain, RelayError> {
		Ok(Self::new(config).await?.assemble().await)
	}

	/// The solver address used for deposit filtering and balance
	/// lookups.
	pub async fn solver_address(&self) -> Result<String, RelayError> {
		Ok(self.inner.solver_address().await?.to_string())
	}

	/// Stops the event handler subscriptions and the connection
	/// monitor. The adapter must be shut down before it is removed from
	/// the registry.
	pub async fn shutdown_listeners(&self) {
		if let Some(handler) = self.inner.handler.write().await.take() {
			handler.stop().await;
		}
		if let Some(monitor) = self.inner.monitor.read().await.clone() {
			monitor.stop().await;
		}
	}

	/// Full teardown: listeners, monitor, in-flight waits and the
	/// client.
	pub async fn close(&self) {
		self.shutdown_listeners().await;
		let _ = self.inner.shutdown.send(());
		*self.inner.client.write().await = None;
	}

	async fn init_monitor(&self) -> Result<(), RelayError> {
		let manager = Arc::new(EvmConnectionManager {
			inner: self.inner.clone(),
		});
		let monitor = Arc::new(ConnectionMonitor::new(manager, self.inner.config.name.clone()));
		monitor
			.start()
			.await
			.map_err(|e| RelayError::Rpc(format!("failed to start connection monitor: {}", e)))?;
		*self.inner.monitor.write().await = Some(monitor);
		Ok(())
	}

	async fn install_handler(
		&self,
		events: mpsc::UnboundedSender<ChainEvent>,
	) -> Result<Arc<EventHandler>, RelayError> {
		let client = self.inner.client().await?;
		let solver_address = self.inner.solver_address().await?;

		let mut guard = self.inner.handler.write().await;
		if let Some(old) = guard.take() {
			old.stop().await;
		}

		let handler = Arc::new(EventHandler::new(
			self.inner.config.clone(),
			client,
			solver_address,
			events,
		)?);
		*guard = Some(handler.clone());
		Ok(handler)
	}
}

#[async_trait]
impl relay_types::EventHandler for EvmChain {
	async fn init_ws_subscription(
		&self,
		events: mpsc::UnboundedSender<ChainEvent>,
	) -> Result<(), RelayError> {
		let handler = self.install_handler(events).await?;
		if let Err(e) = handler.start_ws_subscription().await {
			handler.stop().await;
			self.inner.handler.write().await.take();
			return Err(e);
		}
		Ok(())
	}

	async fn init_http_polling(
		&self,
		events: mpsc::UnboundedSender<ChainEvent>,
	) -> Result<(), RelayError> {
		let handler = self.install_handler(events).await?;
		if let Err(e) = handler.start_http_polling().await {
			handler.stop().await;
			self.inner.handler.write().await.take();
			return Err(e);
		}
		Ok(())
	}
}

/// Connection-monitor hook that swaps the RPC client in place and
/// rebuilds event subscriptions.
struct EvmConnectionManager {
	inner: Arc<EvmInner>,
}

#[async_trait]
impl BlockchainClient for EvmConnectionManager {
	async fn check_connection(&self) -> Result<(), RelayError> {
		let client = self.inner.client().await?;
		client.block_number().await.map(|_| ())
	}

	async fn reconnect(&self) -> Result<(), RelayError> {
		// Dial before taking the write lock so reads stay unblocked
		// during the handshake.
		let new_client = Arc::new(EvmClient::connect(&self.inner.config.rpc_url).await?);

		*self.inner.client.write().await = Some(new_client.clone());

		if let Some(handler) = self.inner.handler.read().await.clone() {
			handler.update_client(new_client).await;
		}

		tracing::info!(chain = %self.inner.config.name, "RPC client reconnected");
		Ok(())
	}
}
