//! Destination-side transactions and their status.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Outcome of waiting for a transaction confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
	/// The transaction was confirmed successfully.
	Done,
	/// The transaction reverted or was nullified.
	Failed,
	/// The transaction should be resubmitted through the retry reset
	/// path.
	NeedsRetry,
}

/// Family-specific payload attached to a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionMetadata {
	/// Recent blockhash the Solana transaction was built against, plus
	/// the slot it was observed at.
	Solana {
		blockhash: String,
		blockhash_slot: u64,
	},
}

/// A transaction submitted by the solver on a destination chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
	/// Transaction hash (hex on EVM, base58 signature on Solana).
	pub hash: String,
	/// Sender address.
	pub from: String,
	/// Recipient address.
	pub to: String,
	/// Amount sent from the source chain.
	pub from_amount: U256,
	/// Amount delivered on the destination chain.
	pub to_amount: U256,
	/// Token transferred.
	pub token: String,
	/// Transaction nonce, where the chain family has one.
	pub nonce: u64,
	/// Chain the transaction was submitted on.
	pub chain_id: u64,
	/// Quote this transaction fulfils.
	pub quote_id: String,
	/// Opaque family-specific payload.
	pub metadata: Option<TransactionMetadata>,
}
