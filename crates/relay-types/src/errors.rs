//! The closed error taxonomy for the relay solver.
//!
//! Every failure that crosses a crate boundary is expressed as one of
//! these kinds. RPC and subscription failures are wrapped with a short
//! contextual message; kinds that originate from the library's own
//! invariants are returned raw.

use thiserror::Error;

/// Failure kinds surfaced by the relay solver library.
#[derive(Debug, Error)]
pub enum RelayError {
	/// The requested chain does not exist in the store or registry.
	#[error("chain not found")]
	ChainNotFound,

	/// The requested agent does not exist in the store.
	#[error("agent not found")]
	AgentNotFound,

	/// A chain id of zero (or otherwise malformed) was supplied.
	#[error("invalid chain id")]
	InvalidChainId,

	/// An empty or malformed agent identifier was supplied.
	#[error("invalid agent id")]
	InvalidAgentId,

	/// The database could not be reached.
	#[error("failed to connect to database")]
	DatabaseConnect,

	/// A non-connection database failure, wrapped with context.
	#[error("database error: {0}")]
	Database(String),

	/// The token row addressed by a balance update does not exist.
	#[error("token not found")]
	TokenNotFound,

	/// The chain configuration violates one of its invariants.
	#[error("invalid chain configuration: {0}")]
	InvalidConfig(String),

	/// The chain is already present in the registry.
	#[error("chain already exists in registry")]
	ChainExists,

	/// No factory was supplied to the registry.
	#[error("chain factory not provided")]
	FactoryNotProvided,

	/// The factory has no constructor for the requested chain family.
	#[error("invalid chain type: {0}")]
	InvalidChainType(String),

	/// The capability is not installed on this chain.
	#[error("functionality not implemented")]
	NotImplemented,

	/// The RPC client or signer required by the operation is missing.
	#[error("client or signer not initialized")]
	NotInitialized,

	/// An intent that cannot be acted upon (bad address, oversized
	/// amount, missing fields).
	#[error("invalid intent: {0}")]
	InvalidIntent(String),

	/// A wrapped RPC failure.
	#[error("rpc error: {0}")]
	Rpc(String),

	/// A wrapped subscription failure.
	#[error("subscription error: {0}")]
	Subscription(String),

	/// A stuck transaction was nullified with a self-send cancel.
	#[error("transaction cancelled due to timeout")]
	TxStuckCancelled,

	/// Replacing the stuck transaction would eat the margin.
	#[error("replacement transaction is not profitable")]
	TxUnprofitable,

	/// The surrounding operation was cancelled before completion.
	#[error("operation cancelled")]
	Cancelled,

	/// Observed amount differs from the quoted amount.
	#[error("amount mismatch: expected {expected}, got {actual}")]
	AmountMismatch { expected: String, actual: String },

	/// Observed sender differs from the quoted user address.
	#[error("sender address mismatch: expected {expected}, got {actual}")]
	SenderMismatch { expected: String, actual: String },

	/// Observed receiver differs from the solver address.
	#[error("receiver address mismatch: expected {expected}, got {actual}")]
	ReceiverMismatch { expected: String, actual: String },

	/// Observed token contract differs from the quoted token.
	#[error("token address mismatch: expected {expected}, got {actual}")]
	TokenMismatch { expected: String, actual: String },

	/// Transaction chain id differs from the quoted source chain.
	#[error("chain id mismatch: expected {expected}, got {actual}")]
	ChainIdMismatch { expected: u64, actual: u64 },

	/// Quote id extraction from calldata or logs failed.
	#[error("failed to extract quote id: {0}")]
	Extraction(String),

	/// Transaction simulation was rejected by the node.
	#[error("simulation failed: {0}")]
	SimulationFailed(String),

	/// The recent blockhash attached to the transaction is no longer
	/// valid.
	#[error("blockhash expired")]
	BlockhashExpired,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_display_messages() {
		assert_eq!(RelayError::ChainNotFound.to_string(), "chain not found");
		assert_eq!(
			RelayError::NotImplemented.to_string(),
			"functionality not implemented"
		);
		assert_eq!(
			RelayError::TxStuckCancelled.to_string(),
			"transaction cancelled due to timeout"
		);
	}

	#[test]
	fn test_mismatch_payloads() {
		let err = RelayError::AmountMismatch {
			expected: "1000".to_string(),
			actual: "999".to_string(),
		};
		assert_eq!(err.to_string(), "amount mismatch: expected 1000, got 999");

		let err = RelayError::ChainIdMismatch {
			expected: 1,
			actual: 10,
		};
		assert_eq!(err.to_string(), "chain id mismatch: expected 1, got 10");
	}
}
