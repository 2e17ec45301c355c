//! Gas estimation and pricing.

use crate::chain::{EvmChain, TX_TYPE_EIP1559};
use alloy_primitives::{Address, U256};
use alloy_rpc_types::TransactionRequest;
use async_trait::async_trait;
use relay_types::{GasEstimator, RelayError};
use std::str::FromStr;

/// Chain id that requires the `linea_estimateGas` custom RPC.
const LINEA_CHAIN_ID: u64 = 59144;

/// Base fee head-room applied for EIP-1559 pricing, in percent.
const BASE_FEE_BUFFER_PERCENT: u128 = 130;

/// EIP-1559 fee components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GasPriceData {
	pub max_fee_per_gas: u128,
	pub max_priority_fee_per_gas: u128,
}

/// Computes the EIP-1559 fee pair from a suggested tip and a base fee.
/// A zero tip is coerced to 1 wei; the max fee is the buffered base fee
/// plus the tip, falling back to `tip + base_fee` if the buffered value
/// does not exceed the tip.
pub(crate) fn eip1559_fees(suggested_tip: u128, base_fee: u128) -> GasPriceData {
	let tip = if suggested_tip == 0 { 1 } else { suggested_tip };

	let buffered_base = base_fee * BASE_FEE_BUFFER_PERCENT / 100;
	let mut max_fee = buffered_base + tip;
	if max_fee <= tip {
		max_fee = tip + base_fee;
	}

	GasPriceData {
		max_fee_per_gas: max_fee,
		max_priority_fee_per_gas: tip,
	}
}

impl EvmChain {
	/// Fetches the EIP-1559 fee pair from the network.
	pub(crate) async fn eip1559_gas_price(&self) -> Result<GasPriceData, RelayError> {
		let client = self.inner.client().await?;

		let suggested_tip = match client.max_priority_fee_per_gas().await {
			Ok(tip) => tip,
			Err(e) => {
				tracing::error!(chain = %self.inner.config.name, error = %e, "Failed to get suggested gas tip");
				1
			}
		};

		let block = client
			.latest_block()
			.await?
			.ok_or_else(|| RelayError::Rpc("latest block not available".to_string()))?;
		let base_fee: u128 = block
			.header
			.base_fee_per_gas
			.ok_or_else(|| RelayError::Rpc("base fee is nil".to_string()))?
			.into();

		Ok(eip1559_fees(suggested_tip, base_fee))
	}

	/// Legacy gas price; Linea uses its custom estimator, everything
	/// else uses `eth_gasPrice`.
	pub(crate) async fn legacy_gas_price(
		&self,
		to: Address,
		value: U256,
		data: &[u8],
	) -> Result<u128, RelayError> {
		let client = self.inner.client().await?;

		if self.inner.config.chain_id == LINEA_CHAIN_ID {
			let signer = self.inner.signer().await?;
			return client
				.linea_estimate_gas(signer.address(), to, value, data)
				.await;
		}

		client.gas_price().await
	}

	/// The current network fee cap for the configured transaction type,
	/// used when repricing a stuck transaction.
	pub(crate) async fn network_gas_price(&self) -> Result<u128, RelayError> {
		if self.inner.config.tx_type == TX_TYPE_EIP1559 {
			Ok(self.eip1559_gas_price().await?.max_fee_per_gas)
		} else {
			let client = self.inner.client().await?;
			client.gas_price().await
		}
	}
}

#[async_trait]
impl GasEstimator for EvmChain {
	async fn estimate_gas(&self, to: &str, value: U256, data: &[u8]) -> Result<u64, RelayError> {
		let client = self.inner.client().await?;
		let signer = self.inner.signer().await?;

		let to_address = Address::from_str(to)
			.map_err(|e| RelayError::InvalidIntent(format!("invalid recipient address: {}", e)))?;

		let request = TransactionRequest::default()
			.from(signer.address())
			.to(to_address)
			.value(value)
			.input(data.to_vec().into());

		client.estimate_gas(&request).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_eip1559_fees_normal_case() {
		// base 100 gwei, tip 2 gwei: 100 * 1.30 + 2 = 132 gwei.
		let fees = eip1559_fees(2_000_000_000, 100_000_000_000);
		assert_eq!(fees.max_fee_per_gas, 132_000_000_000);
		assert_eq!(fees.max_priority_fee_per_gas, 2_000_000_000);
	}

	#[test]
	fn test_eip1559_fees_zero_tip_coerced() {
		let fees = eip1559_fees(0, 100);
		assert_eq!(fees.max_priority_fee_per_gas, 1);
		assert_eq!(fees.max_fee_per_gas, 131);
	}

	#[test]
	fn test_eip1559_fees_fallback_when_base_fee_rounds_away() {
		// A zero base fee makes the buffered value equal the tip, so
		// the fallback `tip + base_fee` applies.
		let fees = eip1559_fees(10, 0);
		assert_eq!(fees.max_fee_per_gas, 10);
		assert_eq!(fees.max_priority_fee_per_gas, 10);
	}
}
