//! The chain construction contract.

use crate::chain::Chain;
use async_trait::async_trait;
use relay_types::{ChainConfig, RelayError};

/// Creates chains from their configuration, keyed on the chain family.
///
/// Implementations hold a `chain_type → constructor` mapping and fail
/// with [`RelayError::InvalidChainType`] for unknown tags. The default
/// factory with EVM and Solana constructors lives in `relay-core`.
#[async_trait]
pub trait ChainFactory: Send + Sync {
	/// Creates a new chain instance for the given configuration.
	async fn create_chain(&self, config: &ChainConfig) -> Result<Chain, RelayError>;
}
