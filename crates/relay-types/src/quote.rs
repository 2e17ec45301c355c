//! Quotes and their immutable pricing envelope.

use serde::{Deserialize, Serialize};

/// Route and party parameters of a quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameters {
	#[serde(rename = "fromChain")]
	pub from_chain: u64,
	#[serde(rename = "toChain")]
	pub to_chain: u64,
	#[serde(rename = "fromToken")]
	pub from_token: String,
	#[serde(rename = "toToken")]
	pub to_token: String,
	/// Source amount as a decimal string.
	pub amount: String,
	#[serde(rename = "userAddress")]
	pub user_address: String,
	pub receiver: String,
}

/// Immutable pricing envelope referenced by `quote_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
	#[serde(rename = "quoteId")]
	pub quote_id: String,
	#[serde(rename = "toAmount")]
	pub to_amount: String,
	#[serde(rename = "toAmountMin")]
	pub to_amount_min: String,
	#[serde(rename = "executionDuration")]
	pub execution_duration: u64,
	#[serde(rename = "gasEstimate")]
	pub gas_estimate: u64,
	#[serde(rename = "requestedAt")]
	pub requested_at: String,
	pub deadline: String,
	pub parameters: Parameters,
}
