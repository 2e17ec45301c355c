//! The Solana chain adapter.

use crate::utils::keypair_from_base58;
use async_trait::async_trait;
use relay_chains::{Chain, ChainBuilder};
use relay_monitor::{BlockchainClient, ConnectionMonitor};
use relay_types::{ChainConfig, RelayError};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

pub(crate) struct SolanaInner {
	pub(crate) config: ChainConfig,
	pub(crate) client: RwLock<Option<Arc<RpcClient>>>,
	pub(crate) signer: RwLock<Option<Arc<Keypair>>>,
	pub(crate) solver_address: RwLock<Option<Pubkey>>,
	pub(crate) monitor: RwLock<Option<Arc<ConnectionMonitor>>>,
	/// Broadcast that cancels in-flight confirmation waits on shutdown.
	pub(crate) shutdown: broadcast::Sender<()>,
}

impl SolanaInner {
	pub(crate) async fn client(&self) -> Result<Arc<RpcClient>, RelayError> {
		self.client
			.read()
			.await
			.clone()
			.ok_or(RelayError::NotInitialized)
	}

	pub(crate) async fn signer(&self) -> Result<Arc<Keypair>, RelayError> {
		self.signer
			.read()
			.await
			.clone()
			.ok_or(RelayError::NotInitialized)
	}

	pub(crate) async fn solver_address(&self) -> Result<Pubkey, RelayError> {
		self.solver_address
			.read()
			.await
			.ok_or(RelayError::NotInitialized)
	}
}

/// Solana family adapter implementing the chain capabilities.
#[derive(Clone)]
pub struct SolanaChain {
	pub(crate) inner: Arc<SolanaInner>,
}

impl SolanaChain {
	/// Builds the adapter without assembling the capability façade.
	/// Embedding processes keep this handle for the adapter-level
	/// operations: deposit validation, the solver address, shutdown.
	///
	/// When a private key is configured the keypair's base58 public
	/// key becomes the solver address.
	pub async fn new(config: &ChainConfig) -> Result<Self, RelayError> {
		config.validate()?;

		let client = RpcClient::new(config.rpc_url.clone());

		let solver_address = if config.solver_address.is_empty() {
			None
		} else {
			Some(Pubkey::from_str(&config.solver_address).map_err(|e| {
				RelayError::InvalidConfig(format!("invalid solver address: {}", e))
			})?)
		};

		let (shutdown, _) = broadcast::channel(1);
		let inner = Arc::new(SolanaInner {
			config: config.clone(),
			client: RwLock::new(Some(Arc::new(client))),
			signer: RwLock::new(None),
			solver_address: RwLock::new(solver_address),
			monitor: RwLock::new(None),
			shutdown,
		});

		let adapter = SolanaChain { inner };

		if let Some(private_key) = &config.private_key {
			let signer = keypair_from_base58(private_key)?;
			*adapter.inner.solver_address.write().await = Some(signer.pubkey());
			*adapter.inner.signer.write().await = Some(Arc::new(signer));
		}

		adapter.init_monitor().await?;

		Ok(adapter)
	}

	/// Assembles the capability façade. The sender capability is only
	/// installed when a signer is configured. No event handler is
	/// installed — Solana deposits are observed out of band, so the
	/// façade answers `NotImplemented` for subscription setup.
	pub async fn assemble(&self) -> Chain {
		let mut builder = ChainBuilder::new(self.inner.config.clone())
			.with_gas_estimator(Arc::new(self.clone()))
			.with_transaction_watcher(Arc::new(self.clone()))
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

	/// The solver's base58 address.
	pub async fn solver_address(&self) -> Result<String, RelayError> {
		Ok(self.inner.solver_address().await?.to_string())
	}

	/// Stops the connection monitor.
	pub async fn shutdown_listeners(&self) {
		if let Some(monitor) = self.inner.monitor.read().await.clone() {
			monitor.stop().await;
		}
	}

	/// Full teardown: monitor, in-flight waits and the client.
	pub async fn close(&self) {
		self.shutdown_listeners().await;
		let _ = self.inner.shutdown.send(());
		*self.inner.client.write().await = None;
	}

	async fn init_monitor(&self) -> Result<(), RelayError> {
		let manager = Arc::new(SolanaConnectionManager {
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
}

/// Connection-monitor hook swapping the RPC client in place.
struct SolanaConnectionManager {
	inner: Arc<SolanaInner>,
}

#[async_trait]
impl BlockchainClient for SolanaConnectionManager {
	async fn check_connection(&self) -> Result<(), RelayError> {
		let client = self.inner.client().await?;
		client
			.get_slot()
			.await
			.map(|_| ())
			.map_err(|e| RelayError::Rpc(format!("failed to get slot: {}", e)))
	}

	async fn reconnect(&self) -> Result<(), RelayError> {
		let new_client = Arc::new(RpcClient::new(self.inner.config.rpc_url.clone()));
		*self.inner.client.write().await = Some(new_client);
		tracing::info!(chain = %self.inner.config.name, "RPC client reconnected");
		Ok(())
	}
}
