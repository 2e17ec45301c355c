//! Native and SPL balance lookups.

use crate::chain::SolanaChain;
use crate::utils::associated_token_address;
use alloy_primitives::U256;
use async_trait::async_trait;
use relay_types::{BalanceProvider, RelayError};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

#[async_trait]
impl BalanceProvider for SolanaChain {
	async fn get_token_balance(&self, address: &str, token: &str) -> Result<U256, RelayError> {
		let client = self.inner.client().await?;

		let owner = Pubkey::from_str(address)
			.map_err(|e| RelayError::InvalidIntent(format!("invalid address: {}", e)))?;

		// An empty token or the system program id requests native SOL.
		if token.is_empty() || token == solana_sdk::system_program::id().to_string() {
			let lamports = client
				.get_balance_with_commitment(&owner, CommitmentConfig::finalized())
				.await
				.map_err(|e| RelayError::Rpc(format!("failed to get native balance: {}", e)))?
				.value;
			return Ok(U256::from(lamports));
		}

		let mint = Pubkey::from_str(token)
			.map_err(|e| RelayError::InvalidIntent(format!("invalid token address: {}", e)))?;
		let ata = associated_token_address(&mint, &owner);

		let balance = client
			.get_token_account_balance_with_commitment(&ata, CommitmentConfig::finalized())
			.await
			.map_err(|e| RelayError::Rpc(format!("failed to get token balance: {}", e)))?
			.value;

		U256::from_str_radix(&balance.amount, 10)
			.map_err(|e| RelayError::Rpc(format!("failed to parse token balance: {}", e)))
	}
}
