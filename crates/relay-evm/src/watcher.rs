//! Transaction confirmation watching and stuck-transaction recovery.
//!
//! The watcher follows the chain by WebSocket head subscription or by a
//! one-second HTTP poll, depending on the RPC URL scheme. A transaction
//! that has produced no receipt for 30 seconds while the head advanced
//! by more than two blocks counts as stuck and is either replaced at a
//! higher price or nullified with a self-send cancel when the repricing
//! would eat the margin.

use crate::chain::{EvmChain, TX_TYPE_EIP1559};
use crate::client::EvmClient;
use alloy_consensus::{Transaction as _, TxEip1559, TxLegacy};
use alloy_primitives::{TxKind, B256, U256};
use alloy_rpc_types::Transaction as RpcTransaction;
use async_trait::async_trait;
use futures::StreamExt;
use relay_types::{
	RelayError, SubscriptionMode, Transaction, TransactionStatus, TransactionWatcher,
};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How long a transaction may sit without a receipt before the stuck
/// check engages.
const WAIT_TIMEOUT: Duration = Duration::from_secs(30);
/// Head advance beyond which an unconfirmed transaction counts as
/// stuck.
const STUCK_BLOCK_ADVANCE: u64 = 2;
/// Receipt poll cadence in HTTP mode.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Minimum price increase for a replacement, in percent.
const REPLACEMENT_GAS_INCREASE_PERCENT: u128 = 110;
/// Price multiplier for the self-send cancel, in percent.
const CANCEL_GAS_PRICE_PERCENT: u128 = 150;
/// Gas limit of the self-send cancel.
const CANCEL_GAS_LIMIT: u64 = 21_000;
/// Largest share of the delivered amount the replacement gas may cost,
/// in percent.
const MIN_PROFIT_PERCENT: u64 = 1;

/// Stuck predicate: past the wait timeout with the head more than two
/// blocks beyond where the wait started.
pub(crate) fn is_stuck(elapsed: Duration, current_block: u64, start_block: u64) -> bool {
	elapsed > WAIT_TIMEOUT && current_block > start_block + STUCK_BLOCK_ADVANCE
}

/// Replacement price: the current network price, floored at 110% of the
/// old price.
pub(crate) fn replacement_gas_price(old_price: u128, network_price: u128) -> u128 {
	let min_required = old_price * REPLACEMENT_GAS_INCREASE_PERCENT / 100;
	network_price.max(min_required)
}

/// A replacement is profitable while its gas cost stays within 1% of
/// the delivered amount.
pub(crate) fn is_replacement_profitable(to_amount: U256, gas_limit: u128, gas_price: u128) -> bool {
	let gas_cost = U256::from(gas_limit) * U256::from(gas_price);
	gas_cost * U256::from(100u64) <= to_amount * U256::from(MIN_PROFIT_PERCENT)
}

fn parse_tx_hash(hash: &str) -> Result<B256, RelayError> {
	B256::from_str(hash)
		.map_err(|e| RelayError::InvalidIntent(format!("invalid transaction hash: {}", e)))
}

fn pending_gas_price(tx: &RpcTransaction) -> u128 {
	tx.gas_price().unwrap_or(tx.max_fee_per_gas())
}

#[async_trait]
impl TransactionWatcher for EvmChain {
	async fn wait_transaction_confirmation(
		&self,
		tx: &mut Transaction,
	) -> Result<TransactionStatus, RelayError> {
		let client = self.inner.client().await?;

		let start_block = match client.block_number().await {
			Ok(block) => block,
			Err(e) => {
				tracing::warn!(tx_hash = %tx.hash, error = %e, "Failed to get current block number");
				return Ok(TransactionStatus::NeedsRetry);
			}
		};

		match SubscriptionMode::from_rpc_url(&self.inner.config.rpc_url) {
			SubscriptionMode::WebSocket => self.wait_confirmation_ws(client, tx, start_block).await,
			SubscriptionMode::HttpPolling => {
				self.wait_confirmation_http(client, tx, start_block).await
			}
		}
	}
}

impl EvmChain {
	/// WebSocket path: checks the receipt on every new head.
	async fn wait_confirmation_ws(
		&self,
		client: Arc<EvmClient>,
		tx: &mut Transaction,
		mut start_block: u64,
	) -> Result<TransactionStatus, RelayError> {
		let subscription = match client.subscribe_blocks().await {
			Ok(sub) => sub,
			Err(e) => {
				tracing::warn!(tx_hash = %tx.hash, error = %e, "Failed to subscribe to new headers");
				return Ok(TransactionStatus::NeedsRetry);
			}
		};
		let mut stream = subscription.into_stream();
		let mut shutdown = self.inner.shutdown.subscribe();
		let mut start_time = Instant::now();

		loop {
			tokio::select! {
				_ = shutdown.recv() => {
					tracing::error!(tx_hash = %tx.hash, "Confirmation wait cancelled");
					return Err(RelayError::Cancelled);
				}
				maybe_block = stream.next() => {
					let Some(block) = maybe_block else {
						// The subscription dropped; let the caller retry.
						return Ok(TransactionStatus::NeedsRetry);
					};
					let current_block = block.header.number;

					if is_stuck(start_time.elapsed(), current_block, start_block) {
						if self.handle_stuck_transaction(tx).await?.is_some() {
							return Ok(TransactionStatus::NeedsRetry);
						}
						start_time = Instant::now();
						start_block = current_block;
						continue;
					}

					let tx_hash = parse_tx_hash(&tx.hash)?;
					let Some(receipt) = client.transaction_receipt(tx_hash).await? else {
						continue;
					};
					if current_block < receipt.block_number.unwrap_or_default() + self.inner.config.wait_n_blocks {
						continue;
					}
					return Ok(if receipt.status() {
						TransactionStatus::Done
					} else {
						TransactionStatus::Failed
					});
				}
			}
		}
	}

	/// HTTP path: one-second receipt poll.
	async fn wait_confirmation_http(
		&self,
		client: Arc<EvmClient>,
		tx: &mut Transaction,
		mut start_block: u64,
	) -> Result<TransactionStatus, RelayError> {
		let mut interval = tokio::time::interval(RECEIPT_POLL_INTERVAL);
		interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
		let mut shutdown = self.inner.shutdown.subscribe();
		let mut start_time = Instant::now();

		loop {
			tokio::select! {
				_ = shutdown.recv() => {
					tracing::error!(tx_hash = %tx.hash, "Confirmation wait cancelled");
					return Err(RelayError::Cancelled);
				}
				_ = interval.tick() => {
					if start_time.elapsed() > WAIT_TIMEOUT {
						let current_block = client.block_number().await?;
						if is_stuck(start_time.elapsed(), current_block, start_block) {
							if self.handle_stuck_transaction(tx).await?.is_some() {
								return Ok(TransactionStatus::NeedsRetry);
							}
							start_time = Instant::now();
							start_block = current_block;
							continue;
						}
					}

					let tx_hash = parse_tx_hash(&tx.hash)?;
					let Some(receipt) = client.transaction_receipt(tx_hash).await? else {
						continue;
					};
					let current_block = client.block_number().await?;
					if current_block < receipt.block_number.unwrap_or_default() + self.inner.config.wait_n_blocks {
						continue;
					}
					return Ok(if receipt.status() {
						TransactionStatus::Done
					} else {
						TransactionStatus::Failed
					});
				}
			}
		}
	}

	/// Replaces the stuck transaction, falling back to a cancel when
	/// replacement is not possible. Returns the new hash when a
	/// replacement was submitted and `None` when the original turned
	/// out not to be pending.
	async fn handle_stuck_transaction(
		&self,
		tx: &mut Transaction,
	) -> Result<Option<String>, RelayError> {
		match self.replace_transaction(tx).await {
			Ok(Some(new_hash)) => {
				let signer = self.inner.signer().await?;
				tracing::info!(
					original_tx = %tx.hash,
					replacement_tx = %new_hash,
					"Stuck transaction replaced"
				);
				tx.hash = new_hash.clone();
				tx.from = signer.address().to_string();
				Ok(Some(new_hash))
			}
			Ok(None) => Ok(None),
			// Terminal outcomes of the profitability guard pass through.
			Err(e @ RelayError::TxStuckCancelled) | Err(e @ RelayError::TxUnprofitable) => Err(e),
			Err(replace_err) => {
				tracing::warn!(
					tx_hash = %tx.hash,
					error = %replace_err,
					"Failed to replace stuck transaction, attempting cancel"
				);
				match self.cancel_transaction(tx).await {
					Ok(Some(cancel_hash)) => {
						tracing::info!(
							original_tx = %tx.hash,
							cancel_tx = %cancel_hash,
							"Transaction cancelled successfully"
						);
						Err(RelayError::TxStuckCancelled)
					}
					Ok(None) => Ok(None),
					Err(cancel_err) => Err(RelayError::Rpc(format!(
						"failed to cancel stuck transaction: {}",
						cancel_err
					))),
				}
			}
		}
	}

	/// Re-submits the pending transaction at a higher price, keeping
	/// nonce, recipient, value, data and gas limit. Aborts to a cancel
	/// when the new price would consume more than 1% of the delivered
	/// amount.
	async fn replace_transaction(&self, tx: &Transaction) -> Result<Option<String>, RelayError> {
		let client = self.inner.client().await?;
		let tx_hash = parse_tx_hash(&tx.hash)?;

		let old = client
			.transaction_by_hash(tx_hash)
			.await?
			.ok_or_else(|| RelayError::Rpc("failed to get transaction by hash".to_string()))?;
		if old.block_number.is_some() {
			tracing::warn!(
				tx_hash = %tx.hash,
				chain = %self.inner.config.name,
				"Transaction is not pending"
			);
			return Ok(None);
		}

		let old_price = pending_gas_price(&old);
		let network_price = self.network_gas_price().await?;
		let new_price = replacement_gas_price(old_price, network_price);

		if !is_replacement_profitable(tx.to_amount, old.gas as u128, new_price) {
			return match self.cancel_transaction(tx).await {
				Ok(Some(cancel_hash)) => {
					tracing::info!(
						original_tx = %tx.hash,
						cancel_tx = %cancel_hash,
						"Transaction cancelled due to unprofitability"
					);
					Err(RelayError::TxStuckCancelled)
				}
				Ok(None) => Ok(None),
				Err(cancel_err) => {
					tracing::error!(
						tx_hash = %tx.hash,
						error = %cancel_err,
						"Failed to cancel unprofitable transaction"
					);
					Err(RelayError::TxUnprofitable)
				}
			};
		}

		let to = old
			.to
			.ok_or_else(|| RelayError::Rpc("stuck transaction has no recipient".to_string()))?;
		let signer = self.inner.signer().await?;
		let chain_id = self.inner.config.chain_id;

		let raw = if self.inner.config.tx_type == TX_TYPE_EIP1559 {
			signer.sign_eip1559(TxEip1559 {
				chain_id,
				nonce: old.nonce,
				gas_limit: old.gas as _,
				max_fee_per_gas: new_price,
				max_priority_fee_per_gas: old.max_priority_fee_per_gas.unwrap_or_default(),
				to: TxKind::Call(to),
				value: old.value,
				access_list: Default::default(),
				input: old.input.clone(),
			})?
		} else {
			signer.sign_legacy(TxLegacy {
				chain_id: Some(chain_id),
				nonce: old.nonce,
				gas_price: new_price,
				gas_limit: old.gas as _,
				to: TxKind::Call(to),
				value: old.value,
				input: old.input.clone(),
			})?
		};

		let new_hash = client.send_raw_transaction(&raw).await?;
		Ok(Some(format!("{:#x}", new_hash)))
	}

	/// Nullifies the pending transaction with a zero-value self-send at
	/// the same nonce, priced at 150% of the original.
	async fn cancel_transaction(&self, tx: &Transaction) -> Result<Option<String>, RelayError> {
		let client = self.inner.client().await?;
		let tx_hash = parse_tx_hash(&tx.hash)?;

		let old = client
			.transaction_by_hash(tx_hash)
			.await?
			.ok_or_else(|| RelayError::Rpc("failed to get transaction by hash".to_string()))?;
		if old.block_number.is_some() {
			tracing::warn!(
				tx_hash = %tx.hash,
				chain = %self.inner.config.name,
				"Transaction is not pending"
			);
			return Ok(None);
		}

		let cancel_price = pending_gas_price(&old) * CANCEL_GAS_PRICE_PERCENT / 100;
		let signer = self.inner.signer().await?;
		let self_address = signer.address();
		let chain_id = self.inner.config.chain_id;

		let raw = if self.inner.config.tx_type == TX_TYPE_EIP1559 {
			signer.sign_eip1559(TxEip1559 {
				chain_id,
				nonce: old.nonce,
				gas_limit: CANCEL_GAS_LIMIT as _,
				max_fee_per_gas: cancel_price,
				max_priority_fee_per_gas: old.max_priority_fee_per_gas.unwrap_or_default(),
				to: TxKind::Call(self_address),
				value: U256::ZERO,
				access_list: Default::default(),
				input: Default::default(),
			})?
		} else {
			signer.sign_legacy(TxLegacy {
				chain_id: Some(chain_id),
				nonce: old.nonce,
				gas_price: cancel_price,
				gas_limit: CANCEL_GAS_LIMIT as _,
				to: TxKind::Call(self_address),
				value: U256::ZERO,
				input: Default::default(),
			})?
		};

		let cancel_hash = client.send_raw_transaction(&raw).await?;
		Ok(Some(format!("{:#x}", cancel_hash)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_is_stuck_requires_both_conditions() {
		let past_timeout = WAIT_TIMEOUT + Duration::from_secs(1);

		// Timed out and the head advanced by 3: stuck.
		assert!(is_stuck(past_timeout, 103, 100));
		// Timed out but the head only advanced by 2: not stuck.
		assert!(!is_stuck(past_timeout, 102, 100));
		// Head advanced but still within the timeout: not stuck.
		assert!(!is_stuck(Duration::from_secs(5), 110, 100));
	}

	#[test]
	fn test_replacement_gas_price_takes_network_when_higher() {
		assert_eq!(replacement_gas_price(100, 150), 150);
	}

	#[test]
	fn test_replacement_gas_price_floors_at_110_percent() {
		assert_eq!(replacement_gas_price(100, 90), 110);
		assert_eq!(replacement_gas_price(100, 110), 110);
	}

	#[test]
	fn test_profitability_boundary() {
		let to_amount = U256::from(1_000_000u64);

		// Exactly 1% of the delivered amount: still profitable.
		assert!(is_replacement_profitable(to_amount, 100, 100));
		// One wei above 1%: not profitable.
		assert!(!is_replacement_profitable(to_amount, 100, 101));
	}

	#[test]
	fn test_profitability_large_amounts() {
		// Amounts above u64 range must not overflow the check.
		let to_amount = U256::from_str_radix("100000000000000000000000000", 10).unwrap();
		assert!(is_replacement_profitable(to_amount, 1_000_000, 1_000_000_000));
	}

	#[test]
	fn test_cancel_price_is_150_percent() {
		assert_eq!(1_000u128 * CANCEL_GAS_PRICE_PERCENT / 100, 1_500);
	}
}
