//! Chain events observed on source chains.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Family-specific payload attached to a chain event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventMetadata {
	/// EVM log context: the decoded event name and the log position
	/// inside its block.
	Evm { event: String, log_index: u64 },
}

/// A deposit event decoded from a source chain.
///
/// Event handlers emit one `ChainEvent` per decoded deposit onto the
/// shared solver channel; the ingestion side turns it into an intent
/// row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainEvent {
	/// Chain the event occurred on.
	pub chain_id: u64,
	/// Block number the event was included in.
	pub block_number: u64,
	/// Hash of that block.
	pub block_hash: String,
	/// Token contract that emitted the event (the log address).
	pub from_token_addr: String,
	/// Sender recovered from the underlying transaction.
	pub from_address: String,
	/// Recipient of the underlying transaction.
	pub to_address: String,
	/// Hash of the transaction that emitted the event.
	pub transaction_hash: String,
	/// Quote id extracted from calldata or memo.
	pub quote_id: String,
	/// When the transaction was mined.
	pub from_tx_mined_at: DateTime<Utc>,
	/// Nonce of the transaction that emitted the event.
	pub from_nonce: u64,
	/// Transferred amount as a decimal string.
	pub transaction_amount: String,
	/// Opaque family-specific payload.
	pub metadata: Option<EventMetadata>,
}
