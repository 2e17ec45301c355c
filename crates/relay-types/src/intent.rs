//! Intents and their durable lifecycle.
//!
//! An intent is the persisted record of a user's cross-chain swap
//! request: the proof observed on the source chain plus the fulfilment
//! state on the destination chain. Intents progress
//! `CREATED → PENDING → DONE | FAILED`; a failed intent may be reset to
//! `CREATED` by an explicit retry which clears the destination fields.

use crate::errors::RelayError;
use alloy_primitives::U256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Lifecycle status of an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntentStatus {
	/// Observed on the source chain, not yet picked up by a solver.
	Created,
	/// A destination transaction is in flight.
	Pending,
	/// The destination transaction was confirmed.
	Done,
	/// Fulfilment failed; `sub_status` carries the reason.
	Failed,
}

impl IntentStatus {
	/// Canonical upper-case tag used at the persistence boundary.
	pub fn as_str(&self) -> &'static str {
		match self {
			IntentStatus::Created => "CREATED",
			IntentStatus::Pending => "PENDING",
			IntentStatus::Done => "DONE",
			IntentStatus::Failed => "FAILED",
		}
	}

	/// Whether moving from `self` to `next` is a legal transition.
	/// `Failed → Created` is the explicit retry reset.
	pub fn can_transition_to(&self, next: IntentStatus) -> bool {
		matches!(
			(self, next),
			(IntentStatus::Created, IntentStatus::Pending)
				| (IntentStatus::Pending, IntentStatus::Done)
				| (IntentStatus::Pending, IntentStatus::Failed)
				| (IntentStatus::Failed, IntentStatus::Created)
		)
	}
}

impl FromStr for IntentStatus {
	type Err = RelayError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"CREATED" => Ok(IntentStatus::Created),
			"PENDING" => Ok(IntentStatus::Pending),
			"DONE" => Ok(IntentStatus::Done),
			"FAILED" => Ok(IntentStatus::Failed),
			other => Err(RelayError::Database(format!(
				"unknown intent status: {}",
				other
			))),
		}
	}
}

impl std::fmt::Display for IntentStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Diagnostic refinement of a terminal status, also driving refund-flow
/// decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubStatus {
	/// Waiting for additional source-chain confirmations.
	WaitSourceConfirmations,
	/// Waiting for the destination transaction to be mined.
	WaitDestinationTransaction,
	/// The bridge API is temporarily unavailable.
	BridgeNotAvailable,
	/// The RPC for the source or destination chain is temporarily
	/// unavailable.
	ChainNotAvailable,
	/// A refund has been requested and is being processed.
	RefundInProgress,
	/// The state of the transfer cannot be determined.
	UnknownError,
	/// The transfer was successful.
	Completed,
	/// The transfer was partially successful with alternative tokens.
	Partial,
	/// The transfer was not successful and tokens were refunded.
	Refunded,
	/// The transfer cannot be completed and requires a refund.
	NotProcessableRefundNeeded,
	/// The transaction ran out of gas during execution.
	OutOfGas,
	/// The return amount is below the slippage limit.
	SlippageExceeded,
	/// The transfer amount exceeds the token allowance.
	InsufficientAllowance,
	/// The transfer amount exceeds the available balance.
	InsufficientBalance,
	/// The transaction expired before processing.
	Expired,
	/// The refund process failed.
	RefundFailed,
	/// The refund process failed due to insufficient balance.
	RefundInsufficientBalance,
	/// The refund process failed because the chain is unavailable.
	RefundChainNotAvailable,
}

impl SubStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			SubStatus::WaitSourceConfirmations => "WAIT_SOURCE_CONFIRMATIONS",
			SubStatus::WaitDestinationTransaction => "WAIT_DESTINATION_TRANSACTION",
			SubStatus::BridgeNotAvailable => "BRIDGE_NOT_AVAILABLE",
			SubStatus::ChainNotAvailable => "CHAIN_NOT_AVAILABLE",
			SubStatus::RefundInProgress => "REFUND_IN_PROGRESS",
			SubStatus::UnknownError => "UNKNOWN_ERROR",
			SubStatus::Completed => "COMPLETED",
			SubStatus::Partial => "PARTIAL",
			SubStatus::Refunded => "REFUNDED",
			SubStatus::NotProcessableRefundNeeded => "NOT_PROCESSABLE_REFUND_NEEDED",
			SubStatus::OutOfGas => "OUT_OF_GAS",
			SubStatus::SlippageExceeded => "SLIPPAGE_EXCEEDED",
			SubStatus::InsufficientAllowance => "INSUFFICIENT_ALLOWANCE",
			SubStatus::InsufficientBalance => "INSUFFICIENT_BALANCE",
			SubStatus::Expired => "EXPIRED",
			SubStatus::RefundFailed => "REFUND_FAILED",
			SubStatus::RefundInsufficientBalance => "REFUND_INSUFFICIENT_BALANCE",
			SubStatus::RefundChainNotAvailable => "REFUND_CHAIN_NOT_AVAILABLE",
		}
	}
}

impl FromStr for SubStatus {
	type Err = RelayError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"WAIT_SOURCE_CONFIRMATIONS" => Ok(SubStatus::WaitSourceConfirmations),
			"WAIT_DESTINATION_TRANSACTION" => Ok(SubStatus::WaitDestinationTransaction),
			"BRIDGE_NOT_AVAILABLE" => Ok(SubStatus::BridgeNotAvailable),
			"CHAIN_NOT_AVAILABLE" => Ok(SubStatus::ChainNotAvailable),
			"REFUND_IN_PROGRESS" => Ok(SubStatus::RefundInProgress),
			"UNKNOWN_ERROR" => Ok(SubStatus::UnknownError),
			"COMPLETED" => Ok(SubStatus::Completed),
			"PARTIAL" => Ok(SubStatus::Partial),
			"REFUNDED" => Ok(SubStatus::Refunded),
			"NOT_PROCESSABLE_REFUND_NEEDED" => Ok(SubStatus::NotProcessableRefundNeeded),
			"OUT_OF_GAS" => Ok(SubStatus::OutOfGas),
			"SLIPPAGE_EXCEEDED" => Ok(SubStatus::SlippageExceeded),
			"INSUFFICIENT_ALLOWANCE" => Ok(SubStatus::InsufficientAllowance),
			"INSUFFICIENT_BALANCE" => Ok(SubStatus::InsufficientBalance),
			"EXPIRED" => Ok(SubStatus::Expired),
			"REFUND_FAILED" => Ok(SubStatus::RefundFailed),
			"REFUND_INSUFFICIENT_BALANCE" => Ok(SubStatus::RefundInsufficientBalance),
			"REFUND_CHAIN_NOT_AVAILABLE" => Ok(SubStatus::RefundChainNotAvailable),
			other => Err(RelayError::Database(format!(
				"unknown sub status: {}",
				other
			))),
		}
	}
}

impl std::fmt::Display for SubStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A cross-chain transaction intent with its current state.
///
/// `(quote_id, block_hash)` identifies an intent: observing the same
/// pair again bumps `quorum` instead of creating a new row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
	/// Unique identifier of the quote.
	pub quote_id: String,
	/// Source chain id.
	pub from_chain: u64,
	/// Source token address.
	pub from_token: String,
	/// Amount sent on the source chain.
	pub from_amount: U256,
	/// Destination chain id.
	pub to_chain: u64,
	/// Destination token address.
	pub to_token: String,
	/// Amount to deliver on the destination chain.
	pub to_amount: U256,
	/// The user's wallet address.
	pub user_address: String,
	/// The recipient's wallet address.
	pub recipient_address: String,
	/// Transaction hash on the source chain.
	pub from_tx: String,
	/// Nonce of the source transaction.
	pub from_nonce: u64,
	/// Destination transaction hash, once submitted.
	pub to_tx: Option<String>,
	/// Nonce of the destination transaction, once submitted.
	pub to_nonce: Option<u64>,
	/// Current lifecycle status.
	pub status: IntentStatus,
	/// Diagnostic refinement of the status.
	pub sub_status: Option<SubStatus>,
	/// When the quote was requested.
	pub requested_at: DateTime<Utc>,
	/// When the source transaction was mined.
	pub from_tx_mined_at: DateTime<Utc>,
	/// When the destination transaction was submitted.
	pub to_tx_set_at: Option<DateTime<Utc>>,
	/// When the destination transaction was mined.
	pub to_tx_mined_at: Option<DateTime<Utc>>,
	/// Whether a refund was required.
	pub refund: bool,
	/// Refund transaction hash, if any.
	pub refund_tx: Option<String>,
	/// When the refund was initiated.
	pub refund_tx_set_at: Option<DateTime<Utc>>,
	/// When the refund was completed.
	pub refund_tx_mined_at: Option<DateTime<Utc>>,
	/// Hash of the source block the intent was observed in.
	pub block_hash: String,
	/// Number of independent source observations of this intent.
	pub quorum: i32,
	/// Number of fulfilment retries performed so far.
	pub retries: u32,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_status_roundtrip() {
		for s in [
			IntentStatus::Created,
			IntentStatus::Pending,
			IntentStatus::Done,
			IntentStatus::Failed,
		] {
			assert_eq!(IntentStatus::from_str(s.as_str()).unwrap(), s);
		}
		assert!(IntentStatus::from_str("created").is_err());
	}

	#[test]
	fn test_legal_transitions() {
		assert!(IntentStatus::Created.can_transition_to(IntentStatus::Pending));
		assert!(IntentStatus::Pending.can_transition_to(IntentStatus::Done));
		assert!(IntentStatus::Pending.can_transition_to(IntentStatus::Failed));
		assert!(IntentStatus::Failed.can_transition_to(IntentStatus::Created));
	}

	#[test]
	fn test_illegal_transitions() {
		assert!(!IntentStatus::Done.can_transition_to(IntentStatus::Pending));
		assert!(!IntentStatus::Failed.can_transition_to(IntentStatus::Done));
		assert!(!IntentStatus::Created.can_transition_to(IntentStatus::Done));
		assert!(!IntentStatus::Done.can_transition_to(IntentStatus::Created));
	}

	#[test]
	fn test_sub_status_roundtrip() {
		for s in [
			SubStatus::Completed,
			SubStatus::Expired,
			SubStatus::RefundChainNotAvailable,
			SubStatus::NotProcessableRefundNeeded,
		] {
			assert_eq!(SubStatus::from_str(s.as_str()).unwrap(), s);
		}
		assert!(SubStatus::from_str("DONE").is_err());
	}
}
