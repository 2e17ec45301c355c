//! Top-level wiring for the relay solver library.
//!
//! Provides the [`DefaultChainFactory`] with the EVM and Solana
//! constructors pre-registered, and re-exports the public surface of
//! the component crates so embedding processes can depend on one crate.

pub use relay_chains::{Chain, ChainBuilder, ChainFactory, ChainRegistry};
pub use relay_evm::EvmChain;
pub use relay_monitor::{BlockchainClient, ConnectionMonitor, MonitorError};
pub use relay_solana::SolanaChain;
pub use relay_storage::Storage;
pub use relay_types::*;

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Constructor turning a configuration into a live chain.
pub type ChainConstructor =
	Arc<dyn Fn(ChainConfig) -> BoxFuture<'static, Result<Chain, RelayError>> + Send + Sync>;

/// Factory with a `chain_type → constructor` mapping.
///
/// Ships with constructors for the EVM and Solana families; additional
/// families (or replacements, e.g. for tests) can be registered at
/// runtime through [`DefaultChainFactory::register_constructor`].
pub struct DefaultChainFactory {
	constructors: RwLock<HashMap<ChainType, ChainConstructor>>,
}

impl DefaultChainFactory {
	/// Creates the factory with the default family constructors
	/// registered.
	pub fn new() -> Self {
		let mut constructors: HashMap<ChainType, ChainConstructor> = HashMap::new();

		constructors.insert(
			ChainType::Evm,
			Arc::new(|config: ChainConfig| {
				Box::pin(async move { EvmChain::connect(&config).await }) as BoxFuture<'static, _>
			}),
		);

		constructors.insert(
			ChainType::Solana,
			Arc::new(|config: ChainConfig| {
				Box::pin(async move { SolanaChain::connect(&config).await })
					as BoxFuture<'static, _>
			}),
		);

		Self {
			constructors: RwLock::new(constructors),
		}
	}

	/// Registers (or replaces) the constructor for a chain family.
	pub async fn register_constructor(&self, chain_type: ChainType, constructor: ChainConstructor) {
		self.constructors.write().await.insert(chain_type, constructor);
	}
}

impl Default for DefaultChainFactory {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl ChainFactory for DefaultChainFactory {
	async fn create_chain(&self, config: &ChainConfig) -> Result<Chain, RelayError> {
		config.validate()?;

		let constructor = {
			let constructors = self.constructors.read().await;
			constructors
				.get(&config.chain_type)
				.cloned()
				.ok_or_else(|| RelayError::InvalidChainType(config.chain_type.to_string()))?
		};

		constructor(config.clone()).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn test_config(chain_type: ChainType) -> ChainConfig {
		ChainConfig {
			name: "testchain".to_string(),
			chain_type,
			chain_id: 1,
			rpc_url: "https://rpc.example.com".to_string(),
			tx_type: 2,
			wait_n_blocks: 2,
			private_key: None,
			solver_address: "0x0000000000000000000000000000000000000001".to_string(),
			relay_receiver: "0x0000000000000000000000000000000000000002".to_string(),
		}
	}

	#[tokio::test]
	async fn test_unknown_chain_type_rejected() {
		let factory = DefaultChainFactory::new();
		let config = test_config(ChainType::Unknown);

		// An unknown family fails configuration validation before the
		// constructor lookup is reached.
		assert!(matches!(
			factory.create_chain(&config).await,
			Err(RelayError::InvalidConfig(_))
		));
	}

	#[tokio::test]
	async fn test_unregistered_constructor_rejected() {
		let factory = DefaultChainFactory::new();
		// Drop the Solana constructor to simulate an unknown tag.
		factory.constructors.write().await.remove(&ChainType::Solana);

		let config = test_config(ChainType::Solana);
		assert!(matches!(
			factory.create_chain(&config).await,
			Err(RelayError::InvalidChainType(_))
		));
	}

	#[tokio::test]
	async fn test_custom_constructor_replaces_default() {
		let factory = DefaultChainFactory::new();

		factory
			.register_constructor(
				ChainType::Evm,
				Arc::new(|config: ChainConfig| {
					Box::pin(async move { Ok(ChainBuilder::new(config).build()) })
						as BoxFuture<'static, _>
				}),
			)
			.await;

		let chain = factory.create_chain(&test_config(ChainType::Evm)).await.unwrap();
		assert_eq!(chain.config().chain_id, 1);
	}
}
