//! RPC client wrapper for EVM chains.
//!
//! Wraps an Alloy root provider over either transport, chosen by the
//! RPC URL scheme. Subscription calls are only available on the
//! WebSocket transport; polling-mode chains get a `Subscription` error
//! instead. Every failure is wrapped into the taxonomy with a short
//! context message.

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_provider::{Provider, ProviderBuilder, RootProvider};
use alloy_pubsub::{PubSubFrontend, Subscription};
use alloy_rpc_types::{Block, BlockNumberOrTag, Filter, Log, Transaction, TransactionReceipt, TransactionRequest};
use alloy_transport_http::Http;
use alloy_transport_ws::WsConnect;
use relay_types::{RelayError, SubscriptionMode};

/// An EVM RPC client over HTTP or WebSocket transport.
pub enum EvmClient {
	Http(RootProvider<Http<reqwest::Client>>),
	Ws(RootProvider<PubSubFrontend>),
}

macro_rules! with_provider {
	($self:expr, $p:ident => $body:expr) => {
		match $self {
			EvmClient::Http($p) => $body,
			EvmClient::Ws($p) => $body,
		}
	};
}

impl EvmClient {
	/// Dials the RPC URL, selecting the transport from the scheme.
	pub async fn connect(rpc_url: &str) -> Result<Self, RelayError> {
		match SubscriptionMode::from_rpc_url(rpc_url) {
			SubscriptionMode::WebSocket => {
				let provider = ProviderBuilder::new()
					.on_ws(WsConnect::new(rpc_url.to_string()))
					.await
					.map_err(|e| {
						RelayError::Rpc(format!("failed to create websocket client: {}", e))
					})?;
				Ok(EvmClient::Ws(provider.root().clone()))
			}
			SubscriptionMode::HttpPolling => {
				let url = rpc_url
					.parse()
					.map_err(|e| RelayError::Rpc(format!("invalid rpc url: {}", e)))?;
				Ok(EvmClient::Http(RootProvider::new_http(url)))
			}
		}
	}

	/// Current head block number.
	pub async fn block_number(&self) -> Result<u64, RelayError> {
		with_provider!(self, p => p
			.get_block_number()
			.await
			.map_err(|e| RelayError::Rpc(format!("failed to get block number: {}", e))))
	}

	/// Receipt lookup; `None` means the transaction is not mined yet.
	pub async fn transaction_receipt(
		&self,
		hash: B256,
	) -> Result<Option<TransactionReceipt>, RelayError> {
		with_provider!(self, p => p
			.get_transaction_receipt(hash)
			.await
			.map_err(|e| RelayError::Rpc(format!("failed to get transaction receipt: {}", e))))
	}

	/// Transaction lookup by hash.
	pub async fn transaction_by_hash(
		&self,
		hash: B256,
	) -> Result<Option<Transaction>, RelayError> {
		with_provider!(self, p => p
			.get_transaction_by_hash(hash)
			.await
			.map_err(|e| RelayError::Rpc(format!("failed to get transaction by hash: {}", e))))
	}

	/// Block lookup by number, headers only.
	pub async fn block_by_number(&self, number: u64) -> Result<Option<Block>, RelayError> {
		with_provider!(self, p => p
			.get_block_by_number(BlockNumberOrTag::Number(number), false.into())
			.await
			.map_err(|e| RelayError::Rpc(format!("failed to get block {}: {}", number, e))))
	}

	/// Latest block, headers only.
	pub async fn latest_block(&self) -> Result<Option<Block>, RelayError> {
		with_provider!(self, p => p
			.get_block_by_number(BlockNumberOrTag::Latest, false.into())
			.await
			.map_err(|e| RelayError::Rpc(format!("failed to get latest block: {}", e))))
	}

	/// Runs an `eth_getLogs` query.
	pub async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, RelayError> {
		with_provider!(self, p => p
			.get_logs(filter)
			.await
			.map_err(|e| RelayError::Rpc(format!("failed to get logs: {}", e))))
	}

	/// Estimates gas for the call.
	pub async fn estimate_gas(&self, request: &TransactionRequest) -> Result<u64, RelayError> {
		let gas = with_provider!(self, p => p
			.estimate_gas(request)
			.await
			.map_err(|e| RelayError::Rpc(format!("failed to estimate gas: {}", e))))?;
		Ok(gas as u64)
	}

	/// Suggested legacy gas price in wei.
	pub async fn gas_price(&self) -> Result<u128, RelayError> {
		with_provider!(self, p => p
			.get_gas_price()
			.await
			.map_err(|e| RelayError::Rpc(format!("failed to get gas price: {}", e))))
	}

	/// Suggested EIP-1559 priority fee in wei.
	pub async fn max_priority_fee_per_gas(&self) -> Result<u128, RelayError> {
		with_provider!(self, p => p
			.get_max_priority_fee_per_gas()
			.await
			.map_err(|e| RelayError::Rpc(format!("failed to get suggested gas tip: {}", e))))
	}

	/// Executes an `eth_call` without submitting a transaction.
	pub async fn call(&self, request: &TransactionRequest) -> Result<Bytes, RelayError> {
		with_provider!(self, p => p
			.call(request)
			.await
			.map_err(|e| RelayError::Rpc(format!("failed to execute call: {}", e))))
	}

	/// Submits a signed raw transaction and returns its hash.
	pub async fn send_raw_transaction(&self, encoded: &[u8]) -> Result<B256, RelayError> {
		let tx_hash = with_provider!(self, p => p
			.send_raw_transaction(encoded)
			.await
			.map_err(|e| RelayError::Rpc(format!("failed to send transaction: {}", e)))
			.map(|pending| *pending.tx_hash()))?;
		Ok(tx_hash)
	}

	/// Native balance of an address.
	pub async fn get_balance(&self, address: Address) -> Result<U256, RelayError> {
		with_provider!(self, p => p
			.get_balance(address)
			.await
			.map_err(|e| RelayError::Rpc(format!("failed to get native token balance: {}", e))))
	}

	/// Next nonce for the address including pending transactions.
	pub async fn pending_nonce(&self, address: Address) -> Result<u64, RelayError> {
		with_provider!(self, p => p
			.get_transaction_count(address)
			.pending()
			.await
			.map_err(|e| RelayError::Rpc(format!("failed to get nonce: {}", e))))
	}

	/// Linea's custom gas estimator; returns `baseFeePerGas`.
	pub async fn linea_estimate_gas(
		&self,
		from: Address,
		to: Address,
		value: U256,
		data: &[u8],
	) -> Result<u128, RelayError> {
		let params = serde_json::json!([{
			"from": from,
			"to": to,
			"value": format!("0x{:x}", value),
			"data": format!("0x{}", hex::encode(data)),
		}]);

		let estimate: serde_json::Value = with_provider!(self, p => p
			.raw_request("linea_estimateGas".into(), params)
			.await
			.map_err(|e| RelayError::Rpc(format!("failed to estimate gas using linea_estimateGas: {}", e))))?;

		let base_fee_hex = estimate
			.get("baseFeePerGas")
			.and_then(|v| v.as_str())
			.ok_or_else(|| {
				RelayError::Rpc("linea_estimateGas response missing baseFeePerGas".to_string())
			})?;

		u128::from_str_radix(base_fee_hex.trim_start_matches("0x"), 16)
			.map_err(|e| RelayError::Rpc(format!("failed to decode baseFeePerGas: {}", e)))
	}

	/// Subscribes to matching logs. Only available over WebSocket.
	pub async fn subscribe_logs(&self, filter: &Filter) -> Result<Subscription<Log>, RelayError> {
		match self {
			EvmClient::Ws(p) => p
				.subscribe_logs(filter)
				.await
				.map_err(|e| RelayError::Subscription(format!("failed to subscribe to logs: {}", e))),
			EvmClient::Http(_) => Err(RelayError::Subscription(
				"log subscriptions require a websocket rpc url".to_string(),
			)),
		}
	}

	/// Subscribes to new block headers. Only available over WebSocket.
	pub async fn subscribe_blocks(&self) -> Result<Subscription<Block>, RelayError> {
		match self {
			EvmClient::Ws(p) => p
				.subscribe_blocks()
				.await
				.map_err(|e| {
					RelayError::Subscription(format!("failed to subscribe to new headers: {}", e))
				}),
			EvmClient::Http(_) => Err(RelayError::Subscription(
				"block subscriptions require a websocket rpc url".to_string(),
			)),
		}
	}
}
