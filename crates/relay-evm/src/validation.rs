//! Deposit validation against the quote.

use crate::chain::EvmChain;
use crate::utils::ZERO_ADDRESS;
use alloy_consensus::Transaction as _;
use alloy_primitives::{Address, B256, U256};
use relay_types::{ChainEvent, Quote, RelayError};
use std::str::FromStr;

fn parse_address(value: &str, what: &str) -> Result<Address, RelayError> {
	Address::from_str(value)
		.map_err(|e| RelayError::InvalidIntent(format!("invalid {} address: {}", what, e)))
}

fn parse_amount(value: &str) -> Result<U256, RelayError> {
	U256::from_str_radix(value, 10)
		.map_err(|e| RelayError::InvalidIntent(format!("invalid amount {:?}: {}", value, e)))
}

impl EvmChain {
	/// Verifies that the observed deposit matches the quote: exact
	/// amount, sender, token and chain. Every condition failure returns
	/// the mismatch it found.
	pub async fn validate_transaction(
		&self,
		quote: &Quote,
		event: &ChainEvent,
	) -> Result<(), RelayError> {
		if quote.parameters.from_token == ZERO_ADDRESS {
			self.validate_native_transfer(quote, event).await
		} else {
			self.validate_token_transfer(quote, event).await
		}
	}

	/// Native deposits are verified against the transaction itself:
	/// value, recovered sender and chain id.
	async fn validate_native_transfer(
		&self,
		quote: &Quote,
		event: &ChainEvent,
	) -> Result<(), RelayError> {
		let client = self.inner.client().await?;

		let tx_hash = B256::from_str(&event.transaction_hash).map_err(|e| {
			RelayError::InvalidIntent(format!("invalid transaction hash: {}", e))
		})?;
		let tx = client
			.transaction_by_hash(tx_hash)
			.await?
			.ok_or_else(|| RelayError::Rpc("failed to get transaction details".to_string()))?;

		let expected_amount = parse_amount(&quote.parameters.amount)?;
		if tx.value() != expected_amount {
			return Err(RelayError::AmountMismatch {
				expected: expected_amount.to_string(),
				actual: tx.value().to_string(),
			});
		}

		let expected_sender = parse_address(&quote.parameters.user_address, "user")?;
		if tx.from != expected_sender {
			return Err(RelayError::SenderMismatch {
				expected: expected_sender.to_string(),
				actual: tx.from.to_string(),
			});
		}

		let tx_chain_id = tx.chain_id().unwrap_or_default();
		if tx_chain_id != quote.parameters.from_chain {
			return Err(RelayError::ChainIdMismatch {
				expected: quote.parameters.from_chain,
				actual: tx_chain_id,
			});
		}

		Ok(())
	}

	/// ERC-20 deposits are verified against the decoded event: token
	/// contract, sender, solver as receiver and the exact amount.
	async fn validate_token_transfer(
		&self,
		quote: &Quote,
		event: &ChainEvent,
	) -> Result<(), RelayError> {
		let expected_token = parse_address(&quote.parameters.from_token, "token")?;
		let event_token = parse_address(&event.from_token_addr, "event token")?;
		if event_token != expected_token {
			return Err(RelayError::TokenMismatch {
				expected: expected_token.to_string(),
				actual: event_token.to_string(),
			});
		}

		let expected_sender = parse_address(&quote.parameters.user_address, "user")?;
		let event_sender = parse_address(&event.from_address, "event sender")?;
		if event_sender != expected_sender {
			return Err(RelayError::SenderMismatch {
				expected: expected_sender.to_string(),
				actual: event_sender.to_string(),
			});
		}

		let solver_address = self.inner.solver_address().await?;
		let event_receiver = parse_address(&event.to_address, "event receiver")?;
		if event_receiver != solver_address {
			return Err(RelayError::ReceiverMismatch {
				expected: solver_address.to_string(),
				actual: event_receiver.to_string(),
			});
		}

		let expected_amount = parse_amount(&quote.parameters.amount)?;
		let transferred = parse_amount(&event.transaction_amount)?;
		if transferred != expected_amount {
			return Err(RelayError::AmountMismatch {
				expected: expected_amount.to_string(),
				actual: transferred.to_string(),
			});
		}

		Ok(())
	}
}
