//! Fee estimation through `getFeeForMessage`.

use crate::chain::SolanaChain;
use alloy_primitives::U256;
use async_trait::async_trait;
use base64::Engine;
use relay_types::{GasEstimator, RelayError};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_request::RpcRequest;
use solana_client::rpc_response::Response;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;

#[async_trait]
impl GasEstimator for SolanaChain {
	/// Estimates the fee for a serialized message. The recipient and
	/// value parameters carry no meaning on this family; `data` is the
	/// wire-encoded message.
	async fn estimate_gas(&self, _to: &str, _value: U256, data: &[u8]) -> Result<u64, RelayError> {
		let client = self.inner.client().await?;

		let message_base64 = base64::engine::general_purpose::STANDARD.encode(data);

		let response: Response<Option<u64>> = client
			.send(
				RpcRequest::GetFeeForMessage,
				serde_json::json!([message_base64, { "commitment": "processed" }]),
			)
			.await
			.map_err(|e| RelayError::Rpc(format!("failed to get fee for message: {}", e)))?;

		response
			.value
			.ok_or_else(|| RelayError::Rpc("fee value is nil, check transaction validity".to_string()))
	}
}

impl SolanaChain {
	/// Estimates the base fee of the assembled instruction list.
	pub(crate) async fn estimate_transaction_cost(
		&self,
		_client: &RpcClient,
		instructions: &[Instruction],
		fee_payer: &Pubkey,
		blockhash: Hash,
	) -> Result<u64, RelayError> {
		use relay_types::GasEstimator as _;

		let message = Message::new_with_blockhash(instructions, Some(fee_payer), &blockhash);
		let serialized = message.serialize();

		self.estimate_gas("", U256::ZERO, &serialized).await
	}
}
