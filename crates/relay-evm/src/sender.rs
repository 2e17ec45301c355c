//! Asset sending on EVM chains.

use crate::chain::{EvmChain, TX_TYPE_EIP1559};
use crate::utils::ZERO_ADDRESS;
use alloy_consensus::{TxEip1559, TxLegacy};
use alloy_primitives::{Address, TxKind, U256};
use async_trait::async_trait;
use relay_types::{GasEstimator, Intent, RelayError, Transaction, TransactionSender};
use std::str::FromStr;

/// Buffer applied to the estimated gas limit, in percent.
const GAS_LIMIT_BUFFER_PERCENT: u64 = 110;
/// Multiplier applied to the suggested legacy gas price, in percent.
const LEGACY_GAS_PRICE_PERCENT: u128 = 150;
/// `transfer(address,uint256)` selector.
const ERC20_TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// Builds the calldata for an ERC-20 `transfer(recipient, amount)`.
pub(crate) fn erc20_transfer_calldata(recipient: Address, amount: U256) -> Vec<u8> {
	let mut data = Vec::with_capacity(4 + 32 + 32);
	data.extend_from_slice(&ERC20_TRANSFER_SELECTOR);
	data.extend_from_slice(&[0u8; 12]);
	data.extend_from_slice(recipient.as_slice());
	data.extend_from_slice(&amount.to_be_bytes::<32>());
	data
}

impl EvmChain {
	/// Builds, signs and submits a transaction, returning its hash as a
	/// hex string.
	pub(crate) async fn prepare_and_send(
		&self,
		nonce: u64,
		to: Address,
		value: U256,
		data: Vec<u8>,
	) -> Result<String, RelayError> {
		let estimated_gas = self
			.estimate_gas(&to.to_string(), value, &data)
			.await
			.map_err(|e| {
				tracing::warn!(chain = %self.inner.config.name, error = %e, "Failed to estimate gas");
				e
			})?;
		let gas_limit = estimated_gas * GAS_LIMIT_BUFFER_PERCENT / 100;

		let signer = self.inner.signer().await?;
		let chain_id = self.inner.config.chain_id;

		let raw = if self.inner.config.tx_type == TX_TYPE_EIP1559 {
			let fees = self.eip1559_gas_price().await?;
			signer.sign_eip1559(TxEip1559 {
				chain_id,
				nonce,
				gas_limit: gas_limit as _,
				max_fee_per_gas: fees.max_fee_per_gas,
				max_priority_fee_per_gas: fees.max_priority_fee_per_gas,
				to: TxKind::Call(to),
				value,
				access_list: Default::default(),
				input: data.into(),
			})?
		} else {
			let gas_price =
				self.legacy_gas_price(to, value, &data).await? * LEGACY_GAS_PRICE_PERCENT / 100;
			signer.sign_legacy(TxLegacy {
				chain_id: Some(chain_id),
				nonce,
				gas_price,
				gas_limit: gas_limit as _,
				to: TxKind::Call(to),
				value,
				input: data.into(),
			})?
		};

		let client = self.inner.client().await?;
		let hash = client.send_raw_transaction(&raw).await.map_err(|e| {
			tracing::error!(chain = %self.inner.config.name, error = %e, "Failed to send transaction");
			e
		})?;

		Ok(format!("{:#x}", hash))
	}
}

#[async_trait]
impl TransactionSender for EvmChain {
	async fn send_asset(&self, intent: &Intent) -> Result<Transaction, RelayError> {
		let client = self.inner.client().await?;
		let signer = self.inner.signer().await?;

		let nonce = client.pending_nonce(signer.address()).await?;

		let recipient = Address::from_str(&intent.recipient_address).map_err(|e| {
			RelayError::InvalidIntent(format!("invalid recipient address: {}", e))
		})?;

		let hash = if intent.to_token == ZERO_ADDRESS {
			// Native transfer straight to the recipient.
			self.prepare_and_send(nonce, recipient, intent.to_amount, Vec::new())
				.await?
		} else {
			// ERC-20 transfer targeting the token contract.
			let token = Address::from_str(&intent.to_token)
				.map_err(|e| RelayError::InvalidIntent(format!("invalid token address: {}", e)))?;
			let data = erc20_transfer_calldata(recipient, intent.to_amount);
			self.prepare_and_send(nonce, token, U256::ZERO, data).await?
		};

		Ok(Transaction {
			hash,
			from: signer.address().to_string(),
			to: intent.recipient_address.clone(),
			from_amount: intent.from_amount,
			to_amount: intent.to_amount,
			token: intent.to_token.clone(),
			nonce,
			chain_id: self.inner.config.chain_id,
			quote_id: intent.quote_id.clone(),
			metadata: None,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_erc20_transfer_calldata_layout() {
		let recipient = Address::from_str("0x00000000000000000000000000000000000000aa").unwrap();
		let data = erc20_transfer_calldata(recipient, U256::from(1000u64));

		assert_eq!(data.len(), 68);
		assert_eq!(&data[..4], &ERC20_TRANSFER_SELECTOR);
		// Recipient is left-padded to 32 bytes.
		assert_eq!(&data[4..16], &[0u8; 12]);
		assert_eq!(&data[16..36], recipient.as_slice());
		// Amount occupies the last word, big-endian.
		assert_eq!(U256::from_be_slice(&data[36..68]), U256::from(1000u64));
	}

	#[test]
	fn test_gas_limit_buffer() {
		assert_eq!(100_000 * GAS_LIMIT_BUFFER_PERCENT / 100, 110_000);
		assert_eq!(21_000 * GAS_LIMIT_BUFFER_PERCENT / 100, 23_100);
	}
}
