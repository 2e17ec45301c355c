//! SPL asset sending.

use crate::chain::SolanaChain;
use crate::utils::{associated_token_address, lamports_to_sol};
use async_trait::async_trait;
use relay_types::{
	Intent, RelayError, Transaction, TransactionMetadata, TransactionSender,
};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_sdk::commitment_config::{CommitmentConfig, CommitmentLevel};
use solana_sdk::compute_budget::ComputeBudgetInstruction;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;
use solana_sdk::transaction::Transaction as SolanaTransaction;
use spl_associated_token_account::instruction::create_associated_token_account;
use std::str::FromStr;
use std::sync::Arc;

/// Compute units assumed when simulation fails; covers an ATA creation
/// plus a token transfer with head-room.
const DEFAULT_COMPUTE_UNITS: u64 = 60_000;
/// Minimum priority fee in microlamports.
const DEFAULT_PRIORITY_FEE: u64 = 10_000;
/// Buffer applied to the simulated compute units, in percent.
const COMPUTE_UNIT_BUFFER_PERCENT: u64 = 110;

/// Applies the compute-unit buffer.
pub(crate) fn buffered_compute_units(units: u64) -> u64 {
	units * COMPUTE_UNIT_BUFFER_PERCENT / 100
}

/// Picks the priority fee: the maximum across the sampled fees, or the
/// default when sampling fails or reports zero.
pub(crate) fn pick_priority_fee(sampled: &[u64]) -> u64 {
	let max = sampled.iter().copied().max().unwrap_or(0);
	if max == 0 {
		DEFAULT_PRIORITY_FEE
	} else {
		max
	}
}

#[async_trait]
impl TransactionSender for SolanaChain {
	async fn send_asset(&self, intent: &Intent) -> Result<Transaction, RelayError> {
		let client = self.inner.client().await?;
		let signer = self.inner.signer().await?;

		let recipient = Pubkey::from_str(&intent.recipient_address).map_err(|e| {
			RelayError::InvalidIntent(format!("invalid recipient address: {}", e))
		})?;

		let (blockhash, blockhash_slot) = self.latest_blockhash(&client).await?;

		let instructions = self
			.build_transfer_instructions(&client, &signer, intent, blockhash)
			.await?;

		let cost = self
			.estimate_transaction_cost(&client, &instructions, &signer.pubkey(), blockhash)
			.await?;
		tracing::info!(
			quote_id = %intent.quote_id,
			cost,
			cost_in_sol = lamports_to_sol(cost),
			"Transaction cost estimated"
		);

		let transaction = SolanaTransaction::new_signed_with_payer(
			&instructions,
			Some(&signer.pubkey()),
			&[signer.as_ref()],
			blockhash,
		);

		let signature = client
			.send_transaction_with_config(
				&transaction,
				RpcSendTransactionConfig {
					skip_preflight: false,
					preflight_commitment: Some(CommitmentLevel::Processed),
					..Default::default()
				},
			)
			.await
			.map_err(|e| RelayError::Rpc(format!("failed to send transaction: {}", e)))?;

		Ok(Transaction {
			hash: signature.to_string(),
			from: signer.pubkey().to_string(),
			to: recipient.to_string(),
			from_amount: intent.from_amount,
			to_amount: intent.to_amount,
			token: intent.to_token.clone(),
			nonce: 0,
			chain_id: self.inner.config.chain_id,
			quote_id: intent.quote_id.clone(),
			metadata: Some(TransactionMetadata::Solana {
				blockhash: blockhash.to_string(),
				blockhash_slot,
			}),
		})
	}
}

impl SolanaChain {
	/// Latest finalized blockhash with the slot it was observed at.
	async fn latest_blockhash(&self, client: &RpcClient) -> Result<(Hash, u64), RelayError> {
		let (blockhash, _) = client
			.get_latest_blockhash_with_commitment(CommitmentConfig::finalized())
			.await
			.map_err(|e| RelayError::Rpc(format!("failed to get latest blockhash: {}", e)))?;
		let slot = client
			.get_slot_with_commitment(CommitmentConfig::finalized())
			.await
			.map_err(|e| RelayError::Rpc(format!("failed to get slot: {}", e)))?;
		Ok((blockhash, slot))
	}

	/// Builds the SPL transfer instruction list: optional recipient ATA
	/// creation, the transfer, the quote-id memo, all behind a
	/// compute-budget prologue sized by simulation.
	async fn build_transfer_instructions(
		&self,
		client: &Arc<RpcClient>,
		signer: &Arc<Keypair>,
		intent: &Intent,
		blockhash: Hash,
	) -> Result<Vec<Instruction>, RelayError> {
		let mint = Pubkey::from_str(&intent.to_token)
			.map_err(|e| RelayError::InvalidIntent(format!("invalid token address: {}", e)))?;
		if mint == solana_sdk::system_program::id() {
			// Native SOL delivery is not part of this adapter.
			return Err(RelayError::NotImplemented);
		}

		let recipient = Pubkey::from_str(&intent.recipient_address).map_err(|e| {
			RelayError::InvalidIntent(format!("invalid recipient address: {}", e))
		})?;
		let payer = signer.pubkey();

		let amount: u64 = intent.to_amount.try_into().map_err(|_| {
			RelayError::InvalidIntent("to_amount exceeds the u64 range".to_string())
		})?;

		let mut instructions = Vec::new();

		if let Some(create_ata) = self
			.create_ata_if_missing(client, &payer, &mint, &recipient)
			.await?
		{
			instructions.push(create_ata);
		}

		let source_ata = associated_token_address(&mint, &payer);
		let dest_ata = associated_token_address(&mint, &recipient);

		self.check_sufficient_balance(client, &source_ata, amount)
			.await?;

		let transfer = spl_token::instruction::transfer(
			&spl_token::id(),
			&source_ata,
			&dest_ata,
			&payer,
			&[],
			amount,
		)
		.map_err(|e| RelayError::Rpc(format!("failed to build transfer instruction: {}", e)))?;
		instructions.push(transfer);

		// The memo carries the quote id for event correlation.
		instructions.push(spl_memo::build_memo(intent.quote_id.as_bytes(), &[]));

		let simulated = match self
			.simulate_compute_units(client, signer, &instructions, blockhash)
			.await
		{
			Ok(units) => units,
			Err(e) => {
				tracing::warn!(
					chain = %self.inner.config.name,
					error = %e,
					"Failed to simulate transaction, using default compute units"
				);
				DEFAULT_COMPUTE_UNITS
			}
		};
		let compute_units = buffered_compute_units(simulated);
		tracing::debug!(compute_units, "Computed units with buffer");

		let priority_fee = self.priority_fee(client).await;
		tracing::debug!(
			priority_fee,
			total_fee = priority_fee * compute_units,
			"Priority fee details"
		);

		let mut final_instructions = vec![
			ComputeBudgetInstruction::set_compute_unit_limit(compute_units as u32),
			ComputeBudgetInstruction::set_compute_unit_price(priority_fee),
		];
		final_instructions.extend(instructions);

		Ok(final_instructions)
	}

	/// Returns the ATA-creation instruction when the owner's associated
	/// account does not exist yet. Lookup failures other than a missing
	/// account propagate.
	async fn create_ata_if_missing(
		&self,
		client: &Arc<RpcClient>,
		payer: &Pubkey,
		mint: &Pubkey,
		owner: &Pubkey,
	) -> Result<Option<Instruction>, RelayError> {
		let ata = associated_token_address(mint, owner);

		let account = client
			.get_account_with_commitment(&ata, CommitmentConfig::confirmed())
			.await
			.map_err(|e| RelayError::Rpc(format!("failed to get account info: {}", e)))?;

		if account.value.is_none() {
			return Ok(Some(create_associated_token_account(
				payer,
				owner,
				mint,
				&spl_token::id(),
			)));
		}

		Ok(None)
	}

	/// Rejects the transfer when the source account cannot cover it.
	async fn check_sufficient_balance(
		&self,
		client: &Arc<RpcClient>,
		source_ata: &Pubkey,
		amount: u64,
	) -> Result<(), RelayError> {
		let balance = client
			.get_token_account_balance(source_ata)
			.await
			.map_err(|e| RelayError::Rpc(format!("failed to get token balance: {}", e)))?;
		let available: u64 = balance
			.amount
			.parse()
			.map_err(|e| RelayError::Rpc(format!("failed to parse token balance: {}", e)))?;

		if available < amount {
			return Err(RelayError::InvalidIntent(format!(
				"insufficient balance: have {}, need {}",
				available, amount
			)));
		}
		Ok(())
	}

	/// Simulates the instruction list to learn its compute-unit
	/// consumption.
	async fn simulate_compute_units(
		&self,
		client: &Arc<RpcClient>,
		signer: &Arc<Keypair>,
		instructions: &[Instruction],
		blockhash: Hash,
	) -> Result<u64, RelayError> {
		let message =
			Message::new_with_blockhash(instructions, Some(&signer.pubkey()), &blockhash);
		let transaction = SolanaTransaction::new(&[signer.as_ref()], message, blockhash);

		let simulation = client
			.simulate_transaction(&transaction)
			.await
			.map_err(|e| RelayError::Rpc(format!("failed to simulate transaction: {}", e)))?;

		if let Some(err) = simulation.value.err {
			return Err(RelayError::SimulationFailed(format!("{:?}", err)));
		}

		simulation
			.value
			.units_consumed
			.ok_or_else(|| RelayError::SimulationFailed("no compute units reported".to_string()))
	}

	/// Maximum recently sampled prioritization fee, or the default when
	/// sampling fails or reports nothing.
	async fn priority_fee(&self, client: &Arc<RpcClient>) -> u64 {
		match client.get_recent_prioritization_fees(&[]).await {
			Ok(fees) if !fees.is_empty() => {
				pick_priority_fee(&fees.iter().map(|f| f.prioritization_fee).collect::<Vec<_>>())
			}
			Ok(_) => {
				tracing::warn!("No priority fees returned, using default");
				DEFAULT_PRIORITY_FEE
			}
			Err(e) => {
				tracing::warn!(error = %e, "Failed to get priority fees, using default");
				DEFAULT_PRIORITY_FEE
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_buffered_compute_units() {
		assert_eq!(buffered_compute_units(50_512), 55_563);
		assert_eq!(buffered_compute_units(DEFAULT_COMPUTE_UNITS), 66_000);
	}

	#[test]
	fn test_pick_priority_fee_takes_max() {
		assert_eq!(pick_priority_fee(&[5_000, 25_000, 12_000]), 25_000);
	}

	#[test]
	fn test_pick_priority_fee_defaults_on_zero_samples() {
		assert_eq!(pick_priority_fee(&[0, 0]), DEFAULT_PRIORITY_FEE);
		assert_eq!(pick_priority_fee(&[]), DEFAULT_PRIORITY_FEE);
	}
}
