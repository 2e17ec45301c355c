//! Balance lookups for native and ERC-20 assets.

use crate::chain::EvmChain;
use crate::utils::ZERO_ADDRESS;
use alloy_primitives::{Address, U256};
use alloy_rpc_types::TransactionRequest;
use async_trait::async_trait;
use relay_types::{BalanceProvider, RelayError};
use std::str::FromStr;

/// `balanceOf(address)` selector.
const ERC20_BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];

#[async_trait]
impl BalanceProvider for EvmChain {
	async fn get_token_balance(&self, address: &str, token: &str) -> Result<U256, RelayError> {
		let client = self.inner.client().await?;

		let holder = Address::from_str(address)
			.map_err(|e| RelayError::InvalidIntent(format!("invalid address: {}", e)))?;

		if token.is_empty() || token == ZERO_ADDRESS {
			return client.get_balance(holder).await;
		}

		let token_address = Address::from_str(token)
			.map_err(|e| RelayError::InvalidIntent(format!("invalid token address: {}", e)))?;

		let mut call_data = Vec::with_capacity(4 + 32);
		call_data.extend_from_slice(&ERC20_BALANCE_OF_SELECTOR);
		call_data.extend_from_slice(&[0u8; 12]);
		call_data.extend_from_slice(holder.as_slice());

		let request = TransactionRequest::default()
			.to(token_address)
			.input(call_data.into());

		let result = client.call(&request).await?;
		if result.len() < 32 {
			return Err(RelayError::Rpc("invalid balanceOf response".to_string()));
		}

		Ok(U256::from_be_slice(&result[..32]))
	}
}
