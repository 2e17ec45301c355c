//! Chain configuration and the capability contracts.
//!
//! A chain adapter implements some or all of the narrow capability traits
//! defined here. The façade in `relay-chains` dispatches to whichever
//! capabilities were installed and answers `NotImplemented` for the rest.

use crate::errors::RelayError;
use crate::events::ChainEvent;
use crate::intent::Intent;
use crate::transaction::{Transaction, TransactionStatus};
use alloy_primitives::U256;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Supported blockchain families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainType {
	/// Ethereum Virtual Machine based chains (Ethereum, Linea, Base, ...).
	Evm,
	/// The Solana chain.
	Solana,
	/// Unknown or unsupported chain family.
	Unknown,
}

impl ChainType {
	/// Parses a family tag, upper-casing on the way in. Anything
	/// unrecognized maps to [`ChainType::Unknown`].
	pub fn parse(s: &str) -> Self {
		match s.to_uppercase().as_str() {
			"EVM" => ChainType::Evm,
			"SOLANA" => ChainType::Solana,
			_ => ChainType::Unknown,
		}
	}

	/// Returns the canonical upper-case tag.
	pub fn as_str(&self) -> &'static str {
		match self {
			ChainType::Evm => "EVM",
			ChainType::Solana => "SOLANA",
			ChainType::Unknown => "UNKNOWN",
		}
	}
}

impl std::fmt::Display for ChainType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Configuration for a single chain adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
	/// Human-readable chain name.
	pub name: String,
	/// Chain family tag.
	pub chain_type: ChainType,
	/// Unique chain identifier.
	pub chain_id: u64,
	/// RPC endpoint URL. The scheme selects the subscription mode:
	/// `ws`/`wss` use WebSocket subscriptions, anything else polls.
	pub rpc_url: String,
	/// Transaction type discriminator: 0 = legacy, 2 = EIP-1559.
	pub tx_type: u64,
	/// Number of blocks to wait before a transaction counts as
	/// confirmed.
	pub wait_n_blocks: u64,
	/// Private key for signing transactions, if this solver fulfils on
	/// the chain.
	pub private_key: Option<String>,
	/// Address the solver receives deposits on.
	pub solver_address: String,
	/// Address of the relay receiver contract.
	pub relay_receiver: String,
}

impl ChainConfig {
	/// Validates the configuration invariants: a non-zero chain id, a
	/// known chain family and an RPC URL with an http(s)/ws(s) scheme.
	pub fn validate(&self) -> Result<(), RelayError> {
		if self.chain_id == 0 {
			return Err(RelayError::InvalidConfig(
				"chain_id must be non-zero".to_string(),
			));
		}

		if self.chain_type == ChainType::Unknown {
			return Err(RelayError::InvalidConfig(format!(
				"unknown chain type for chain {}",
				self.chain_id
			)));
		}

		let url = url::Url::parse(&self.rpc_url)
			.map_err(|e| RelayError::InvalidConfig(format!("invalid rpc url: {}", e)))?;
		match url.scheme() {
			"http" | "https" | "ws" | "wss" => Ok(()),
			other => Err(RelayError::InvalidConfig(format!(
				"unsupported rpc url scheme: {}",
				other
			))),
		}
	}
}

/// Gas estimation capability.
#[async_trait]
pub trait GasEstimator: Send + Sync {
	/// Estimates the gas required to execute a call against `to` with
	/// the given value and input data.
	async fn estimate_gas(&self, to: &str, value: U256, data: &[u8]) -> Result<u64, RelayError>;
}

/// Asset sending capability.
#[async_trait]
pub trait TransactionSender: Send + Sync {
	/// Sends the asset described by the intent (native or token) on the
	/// destination chain and returns the submitted transaction.
	async fn send_asset(&self, intent: &Intent) -> Result<Transaction, RelayError>;
}

/// Transaction confirmation capability.
#[async_trait]
pub trait TransactionWatcher: Send + Sync {
	/// Waits until the transaction reaches a terminal state, replacing
	/// or cancelling it when it gets stuck. The transaction hash is
	/// updated in place when a replacement is submitted.
	async fn wait_transaction_confirmation(
		&self,
		tx: &mut Transaction,
	) -> Result<TransactionStatus, RelayError>;
}

/// Event subscription capability.
#[async_trait]
pub trait EventHandler: Send + Sync {
	/// Starts WebSocket log subscriptions, delivering decoded events on
	/// the channel.
	async fn init_ws_subscription(
		&self,
		events: mpsc::UnboundedSender<ChainEvent>,
	) -> Result<(), RelayError>;

	/// Starts HTTP log polling, delivering decoded events on the
	/// channel.
	async fn init_http_polling(
		&self,
		events: mpsc::UnboundedSender<ChainEvent>,
	) -> Result<(), RelayError>;
}

/// Balance lookup capability.
#[async_trait]
pub trait BalanceProvider: Send + Sync {
	/// Returns the balance of `address` for the given token contract.
	/// An empty or zero token address requests the native balance.
	async fn get_token_balance(&self, address: &str, token: &str) -> Result<U256, RelayError>;
}

#[cfg(test)]
mod tests {
	use super::*;

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

	#[test]
	fn test_chain_type_parse() {
		assert_eq!(ChainType::parse("EVM"), ChainType::Evm);
		assert_eq!(ChainType::parse("evm"), ChainType::Evm);
		assert_eq!(ChainType::parse("Solana"), ChainType::Solana);
		assert_eq!(ChainType::parse("cosmos"), ChainType::Unknown);
		assert_eq!(ChainType::parse(""), ChainType::Unknown);
	}

	#[test]
	fn test_chain_type_roundtrip() {
		for t in [ChainType::Evm, ChainType::Solana, ChainType::Unknown] {
			assert_eq!(ChainType::parse(t.as_str()), t);
		}
	}

	#[test]
	fn test_validate_ok() {
		assert!(test_config().validate().is_ok());

		let mut ws = test_config();
		ws.rpc_url = "wss://rpc.example.com".to_string();
		assert!(ws.validate().is_ok());
	}

	#[test]
	fn test_validate_zero_chain_id() {
		let mut config = test_config();
		config.chain_id = 0;
		assert!(matches!(
			config.validate(),
			Err(RelayError::InvalidConfig(_))
		));
	}

	#[test]
	fn test_validate_unknown_type() {
		let mut config = test_config();
		config.chain_type = ChainType::Unknown;
		assert!(matches!(
			config.validate(),
			Err(RelayError::InvalidConfig(_))
		));
	}

	#[test]
	fn test_validate_bad_scheme() {
		let mut config = test_config();
		config.rpc_url = "ftp://rpc.example.com".to_string();
		assert!(matches!(
			config.validate(),
			Err(RelayError::InvalidConfig(_))
		));

		config.rpc_url = "not a url".to_string();
		assert!(matches!(
			config.validate(),
			Err(RelayError::InvalidConfig(_))
		));
	}
}
