//! Deposit validation against the quote via parsed token balances.

use crate::chain::SolanaChain;
use alloy_primitives::U256;
use relay_types::{ChainEvent, Quote, RelayError};
use solana_client::rpc_config::RpcTransactionConfig;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_transaction_status::{UiTransactionEncoding, UiTransactionTokenBalance};
use std::str::FromStr;

fn parse_amount(value: &str) -> Result<U256, RelayError> {
	U256::from_str_radix(value, 10)
		.map_err(|e| RelayError::InvalidIntent(format!("invalid amount {:?}: {}", value, e)))
}

/// Finds the token balance entry for `(mint, owner)`.
fn find_balance<'a>(
	balances: &'a [UiTransactionTokenBalance],
	mint: &str,
	owner: &str,
) -> Option<&'a UiTransactionTokenBalance> {
	balances.iter().find(|balance| {
		let balance_owner: Option<&String> = balance.owner.as_ref().into();
		balance.mint == mint && balance_owner.map(|o| o.as_str()) == Some(owner)
	})
}

impl SolanaChain {
	/// Verifies the deposit by comparing pre/post token balances of the
	/// solver's account for the expected mint: the received amount must
	/// equal the quoted amount exactly.
	pub async fn validate_transaction(
		&self,
		quote: &Quote,
		event: &ChainEvent,
	) -> Result<(), RelayError> {
		let client = self.inner.client().await?;

		let signature = Signature::from_str(&event.transaction_hash).map_err(|e| {
			RelayError::InvalidIntent(format!("invalid transaction signature: {}", e))
		})?;

		let transaction = client
			.get_transaction_with_config(
				&signature,
				RpcTransactionConfig {
					encoding: Some(UiTransactionEncoding::JsonParsed),
					commitment: Some(CommitmentConfig::confirmed()),
					max_supported_transaction_version: Some(0),
				},
			)
			.await
			.map_err(|e| RelayError::Rpc(format!("failed to fetch transaction: {}", e)))?;

		let meta = transaction
			.transaction
			.meta
			.ok_or_else(|| RelayError::Rpc("transaction meta data is missing".to_string()))?;

		let pre_balances: Option<Vec<UiTransactionTokenBalance>> = meta.pre_token_balances.into();
		let post_balances: Option<Vec<UiTransactionTokenBalance>> = meta.post_token_balances.into();
		let (Some(pre_balances), Some(post_balances)) = (pre_balances, post_balances) else {
			return Err(RelayError::Rpc(
				"transaction meta data is missing or incomplete".to_string(),
			));
		};
		if pre_balances.is_empty() || post_balances.is_empty() {
			return Err(RelayError::Rpc(
				"transaction meta data is missing or incomplete".to_string(),
			));
		}

		let user = Pubkey::from_str(&quote.parameters.user_address)
			.map_err(|e| RelayError::InvalidIntent(format!("invalid user address: {}", e)))?
			.to_string();
		let mint = Pubkey::from_str(&quote.parameters.from_token)
			.map_err(|e| RelayError::InvalidIntent(format!("invalid token address: {}", e)))?
			.to_string();
		let solver = self.inner.solver_address().await?.to_string();

		// Both sides of the user pair must exist for the deposit to be
		// attributable.
		find_balance(&pre_balances, &mint, &user)
			.ok_or_else(|| RelayError::Rpc("source account balances not found".to_string()))?;
		find_balance(&post_balances, &mint, &user)
			.ok_or_else(|| RelayError::Rpc("source account balances not found".to_string()))?;

		let solver_pre = find_balance(&pre_balances, &mint, &solver)
			.ok_or_else(|| RelayError::Rpc("solver account balances not found".to_string()))?;
		let solver_post = find_balance(&post_balances, &mint, &solver)
			.ok_or_else(|| RelayError::Rpc("solver account balances not found".to_string()))?;

		let expected = parse_amount(&quote.parameters.amount)?;
		let pre_amount = parse_amount(&solver_pre.ui_token_amount.amount)?;
		let post_amount = parse_amount(&solver_post.ui_token_amount.amount)?;

		let received = post_amount.checked_sub(pre_amount).ok_or_else(|| {
			RelayError::AmountMismatch {
				expected: expected.to_string(),
				actual: format!("-{}", pre_amount - post_amount),
			}
		})?;

		if received != expected {
			return Err(RelayError::AmountMismatch {
				expected: expected.to_string(),
				actual: received.to_string(),
			});
		}

		Ok(())
	}
}
