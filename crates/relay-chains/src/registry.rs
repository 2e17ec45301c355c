//! Thread-safe registry of live chains.

use crate::chain::Chain;
use crate::factory::ChainFactory;
use relay_types::{ChainConfig, RelayError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Owns the `chain_id → Chain` mapping.
///
/// The chain map and the factory handle are guarded by separate
/// reader/writer locks; chain construction runs outside both locks.
/// [`ChainRegistry::add`] replaces an existing chain atomically — the
/// caller is responsible for shutting down the previous chain's
/// listeners first.
pub struct ChainRegistry {
	chains: RwLock<HashMap<u64, Arc<Chain>>>,
	factory: RwLock<Arc<dyn ChainFactory>>,
}

impl ChainRegistry {
	/// Creates a registry backed by the given factory.
	pub fn new(factory: Arc<dyn ChainFactory>) -> Self {
		Self {
			chains: RwLock::new(HashMap::new()),
			factory: RwLock::new(factory),
		}
	}

	/// Builds a chain for the configuration and installs it, replacing
	/// any previous chain with the same id.
	pub async fn add(&self, config: &ChainConfig) -> Result<(), RelayError> {
		let factory = self.factory.read().await.clone();
		let chain = factory.create_chain(config).await?;

		let mut chains = self.chains.write().await;
		if chains.insert(config.chain_id, Arc::new(chain)).is_some() {
			tracing::info!(chain_id = config.chain_id, "Replaced chain in registry");
		}

		Ok(())
	}

	/// Returns the chain registered under the id.
	pub async fn get(&self, chain_id: u64) -> Result<Arc<Chain>, RelayError> {
		let chains = self.chains.read().await;
		chains.get(&chain_id).cloned().ok_or(RelayError::ChainNotFound)
	}

	/// Removes the chain registered under the id. A no-op when the id
	/// is absent.
	pub async fn remove(&self, chain_id: u64) {
		let mut chains = self.chains.write().await;
		chains.remove(&chain_id);
	}

	/// Swaps the factory used for subsequent [`ChainRegistry::add`]
	/// calls.
	pub async fn set_factory(&self, factory: Arc<dyn ChainFactory>) {
		*self.factory.write().await = factory;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::builder::ChainBuilder;
	use async_trait::async_trait;
	use relay_types::ChainType;

	struct EmptyFactory;

	#[async_trait]
	impl ChainFactory for EmptyFactory {
		async fn create_chain(&self, config: &ChainConfig) -> Result<Chain, RelayError> {
			if config.chain_type == ChainType::Unknown {
				return Err(RelayError::InvalidChainType(
					config.chain_type.to_string(),
				));
			}
			Ok(ChainBuilder::new(config.clone()).build())
		}
	}

	fn test_config(chain_id: u64) -> ChainConfig {
		ChainConfig {
			name: format!("chain-{}", chain_id),
			chain_type: ChainType::Evm,
			chain_id,
			rpc_url: "https://rpc.example.com".to_string(),
			tx_type: 2,
			wait_n_blocks: 2,
			private_key: None,
			solver_address: "0x0000000000000000000000000000000000000001".to_string(),
			relay_receiver: "0x0000000000000000000000000000000000000002".to_string(),
		}
	}

	#[tokio::test]
	async fn test_add_get_remove() {
		let registry = ChainRegistry::new(Arc::new(EmptyFactory));

		registry.add(&test_config(1)).await.unwrap();
		let chain = registry.get(1).await.unwrap();
		assert_eq!(chain.config().chain_id, 1);

		registry.remove(1).await;
		assert!(matches!(
			registry.get(1).await,
			Err(RelayError::ChainNotFound)
		));
	}

	#[tokio::test]
	async fn test_remove_missing_is_noop() {
		let registry = ChainRegistry::new(Arc::new(EmptyFactory));
		registry.remove(42).await;
	}

	#[tokio::test]
	async fn test_add_replaces_existing() {
		let registry = ChainRegistry::new(Arc::new(EmptyFactory));

		registry.add(&test_config(1)).await.unwrap();
		let first = registry.get(1).await.unwrap();

		registry.add(&test_config(1)).await.unwrap();
		let second = registry.get(1).await.unwrap();

		assert!(!Arc::ptr_eq(&first, &second));
	}

	#[tokio::test]
	async fn test_factory_error_propagates() {
		let registry = ChainRegistry::new(Arc::new(EmptyFactory));

		let mut config = test_config(1);
		config.chain_type = ChainType::Unknown;

		assert!(matches!(
			registry.add(&config).await,
			Err(RelayError::InvalidChainType(_))
		));
		assert!(matches!(
			registry.get(1).await,
			Err(RelayError::ChainNotFound)
		));
	}
}
