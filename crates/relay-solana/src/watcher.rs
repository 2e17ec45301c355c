//! Signature-status confirmation watching.
//!
//! Solana has no receipt to poll; the watcher follows the signature
//! status every two seconds until it finalizes or fails. When the
//! status stays absent past the blockhash validity horizon, the wait
//! ends in `NeedsRetry` so the caller can resubmit through the retry
//! reset path.

use crate::chain::SolanaChain;
use async_trait::async_trait;
use relay_types::{
	RelayError, Transaction, TransactionMetadata, TransactionStatus, TransactionWatcher,
};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::signature::Signature;
use solana_transaction_status::TransactionConfirmationStatus;
use std::str::FromStr;
use std::time::Duration;

/// Signature status poll cadence.
const SIGNATURE_POLL_INTERVAL: Duration = Duration::from_secs(2);
/// Slots a blockhash stays valid for.
const MAX_VALID_SLOTS: u64 = 160;

/// Whether the transaction has outlived its blockhash validity window.
pub(crate) fn past_blockhash_horizon(current_slot: u64, blockhash_slot: u64) -> bool {
	current_slot.saturating_sub(blockhash_slot) > MAX_VALID_SLOTS
}

#[async_trait]
impl TransactionWatcher for SolanaChain {
	async fn wait_transaction_confirmation(
		&self,
		tx: &mut Transaction,
	) -> Result<TransactionStatus, RelayError> {
		let client = self.inner.client().await?;

		let signature = Signature::from_str(&tx.hash).map_err(|e| {
			RelayError::InvalidIntent(format!("invalid transaction signature: {}", e))
		})?;

		let Some(TransactionMetadata::Solana {
			blockhash,
			blockhash_slot,
		}) = tx.metadata.clone()
		else {
			return Err(RelayError::InvalidIntent(
				"transaction is missing its blockhash metadata".to_string(),
			));
		};
		let blockhash = Hash::from_str(&blockhash)
			.map_err(|e| RelayError::InvalidIntent(format!("invalid blockhash: {}", e)))?;

		let mut interval = tokio::time::interval(SIGNATURE_POLL_INTERVAL);
		interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
		let mut shutdown = self.inner.shutdown.subscribe();

		loop {
			tokio::select! {
				_ = shutdown.recv() => {
					tracing::error!(tx_hash = %tx.hash, "Confirmation wait cancelled");
					return Err(RelayError::Cancelled);
				}
				_ = interval.tick() => {
					let statuses = client
						.get_signature_statuses(&[signature])
						.await
						.map_err(|e| RelayError::Rpc(format!("failed to get signature status: {}", e)))?;

					match statuses.value.into_iter().next().flatten() {
						Some(status) => {
							if status.err.is_some() {
								return Ok(TransactionStatus::Failed);
							}
							if matches!(
								status.confirmation_status,
								Some(TransactionConfirmationStatus::Finalized)
							) {
								return Ok(TransactionStatus::Done);
							}
							// Processed or confirmed: keep polling.
						}
						None => {
							let blockhash_valid = client
								.is_blockhash_valid(&blockhash, CommitmentConfig::processed())
								.await
								.map_err(|e| {
									RelayError::Rpc(format!("failed to check blockhash validity: {}", e))
								})?;
							let current_slot = client
								.get_slot()
								.await
								.map_err(|e| RelayError::Rpc(format!("failed to get slot: {}", e)))?;

							if past_blockhash_horizon(current_slot, blockhash_slot) {
								if blockhash_valid {
									continue;
								}
								tracing::warn!(
									tx_hash = %tx.hash,
									"Blockhash expired without a signature status, resubmitting"
								);
								return Ok(TransactionStatus::NeedsRetry);
							}
						}
					}
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_blockhash_horizon_boundary() {
		// Exactly 160 slots behind: still inside the window.
		assert!(!past_blockhash_horizon(1160, 1000));
		// One slot further: past the horizon.
		assert!(past_blockhash_horizon(1161, 1000));
	}

	#[test]
	fn test_blockhash_horizon_does_not_underflow() {
		// A current slot behind the blockhash slot must not wrap.
		assert!(!past_blockhash_horizon(100, 1000));
	}
}
