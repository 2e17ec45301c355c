//! Row models and their conversions to domain types.

use crate::schema::{agents, chains, intent, rpcs};
use alloy_primitives::U256;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use relay_types::{ChainType, Intent, IntentStatus, RelayError, SubStatus};
use std::str::FromStr;

/// A chain configuration row.
#[derive(Debug, Clone)]
pub struct ChainRecord {
	pub id: i64,
	pub chain_id: u64,
	pub name: String,
	pub chain_type: ChainType,
	pub receiver_address: String,
	pub active: bool,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable)]
#[diesel(table_name = chains)]
pub(crate) struct ChainRow {
	pub id: i64,
	pub chain_id: i64,
	pub name: String,
	pub chain_type: Option<String>,
	pub receiver_address: Option<String>,
	pub active: bool,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl From<ChainRow> for ChainRecord {
	fn from(row: ChainRow) -> Self {
		ChainRecord {
			id: row.id,
			chain_id: row.chain_id as u64,
			name: row.name,
			// chain_type is normalized to upper case on the way out.
			chain_type: row
				.chain_type
				.as_deref()
				.map(ChainType::parse)
				.unwrap_or(ChainType::Unknown),
			receiver_address: row.receiver_address.unwrap_or_default(),
			active: row.active,
			created_at: row.created_at,
			updated_at: row.updated_at,
		}
	}
}

/// An RPC endpoint row. Endpoints are preferred in `created_at DESC`
/// order.
#[derive(Debug, Clone)]
pub struct RpcRecord {
	pub id: i64,
	pub chain_id: u64,
	pub url: String,
	pub provider: String,
	pub agent_id: Option<i64>,
	pub active: bool,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, QueryableByName)]
#[diesel(table_name = rpcs)]
pub(crate) struct RpcRow {
	pub id: i64,
	pub chain_id: i64,
	pub url: String,
	pub provider: Option<String>,
	pub agent_id: Option<i64>,
	pub active: bool,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl From<RpcRow> for RpcRecord {
	fn from(row: RpcRow) -> Self {
		RpcRecord {
			id: row.id,
			chain_id: row.chain_id as u64,
			url: row.url,
			provider: row.provider.unwrap_or_default(),
			agent_id: row.agent_id,
			active: row.active,
			created_at: row.created_at,
			updated_at: row.updated_at,
		}
	}
}

/// An agent row.
#[derive(Debug, Clone)]
pub struct AgentRecord {
	pub id: i64,
	pub uid: String,
	pub url: String,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable)]
#[diesel(table_name = agents)]
pub(crate) struct AgentRow {
	pub id: i64,
	pub uid: String,
	pub url: Option<String>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl From<AgentRow> for AgentRecord {
	fn from(row: AgentRow) -> Self {
		AgentRecord {
			id: row.id,
			uid: row.uid,
			url: row.url.unwrap_or_default(),
			created_at: row.created_at,
			updated_at: row.updated_at,
		}
	}
}

/// A full intent row, loadable both through the DSL and through the
/// locked `sql_query` selects.
#[derive(Debug, Clone, Queryable, QueryableByName)]
#[diesel(table_name = intent)]
pub(crate) struct IntentRow {
	pub id: i64,
	pub quote_id: String,
	pub from_chain_id: i64,
	pub from_token_address: String,
	pub from_amount: String,
	pub to_chain_id: i64,
	pub to_token_address: String,
	pub to_amount: String,
	pub user_address: String,
	pub recipient_address: String,
	pub from_tx: String,
	pub from_nonce: i64,
	pub to_tx: Option<String>,
	pub to_nonce: Option<i64>,
	pub status: String,
	pub sub_status: Option<String>,
	pub quote_requested_at: DateTime<Utc>,
	pub from_tx_mined_at: DateTime<Utc>,
	pub to_tx_set_at: Option<DateTime<Utc>>,
	pub to_tx_mined_at: Option<DateTime<Utc>>,
	pub refund: bool,
	pub refund_tx: Option<String>,
	pub refund_tx_set_at: Option<DateTime<Utc>>,
	pub refund_tx_mined_at: Option<DateTime<Utc>>,
	pub block_hash: String,
	pub quorum: i32,
	pub retries: i32,
}

impl IntentRow {
	pub(crate) fn into_intent(self) -> Result<Intent, RelayError> {
		let from_amount = parse_amount(&self.from_amount)?;
		let to_amount = parse_amount(&self.to_amount)?;
		let status = IntentStatus::from_str(&self.status)?;
		let sub_status = self
			.sub_status
			.as_deref()
			.map(SubStatus::from_str)
			.transpose()?;

		Ok(Intent {
			quote_id: self.quote_id,
			from_chain: self.from_chain_id as u64,
			from_token: self.from_token_address,
			from_amount,
			to_chain: self.to_chain_id as u64,
			to_token: self.to_token_address,
			to_amount,
			user_address: self.user_address,
			recipient_address: self.recipient_address,
			from_tx: self.from_tx,
			from_nonce: self.from_nonce as u64,
			to_tx: self.to_tx,
			to_nonce: self.to_nonce.map(|n| n as u64),
			status,
			sub_status,
			requested_at: self.quote_requested_at,
			from_tx_mined_at: self.from_tx_mined_at,
			to_tx_set_at: self.to_tx_set_at,
			to_tx_mined_at: self.to_tx_mined_at,
			refund: self.refund,
			refund_tx: self.refund_tx,
			refund_tx_set_at: self.refund_tx_set_at,
			refund_tx_mined_at: self.refund_tx_mined_at,
			block_hash: self.block_hash,
			quorum: self.quorum,
			retries: self.retries as u32,
		})
	}
}

/// Insertable intent row. New rows start at `quorum = 1` with zero
/// retries; re-observing the same `(quote_id, block_hash)` bumps the
/// quorum instead.
#[derive(Debug, Insertable)]
#[diesel(table_name = intent)]
pub(crate) struct NewIntentRow {
	pub quote_id: String,
	pub from_chain_id: i64,
	pub from_token_address: String,
	pub from_amount: String,
	pub to_chain_id: i64,
	pub to_token_address: String,
	pub to_amount: String,
	pub user_address: String,
	pub recipient_address: String,
	pub from_tx: String,
	pub from_nonce: i64,
	pub to_tx: Option<String>,
	pub to_nonce: Option<i64>,
	pub status: String,
	pub sub_status: Option<String>,
	pub quote_requested_at: DateTime<Utc>,
	pub from_tx_mined_at: DateTime<Utc>,
	pub to_tx_set_at: Option<DateTime<Utc>>,
	pub to_tx_mined_at: Option<DateTime<Utc>>,
	pub refund: bool,
	pub refund_tx: Option<String>,
	pub refund_tx_set_at: Option<DateTime<Utc>>,
	pub refund_tx_mined_at: Option<DateTime<Utc>>,
	pub block_hash: String,
	pub quorum: i32,
	pub retries: i32,
}

impl From<&Intent> for NewIntentRow {
	fn from(i: &Intent) -> Self {
		NewIntentRow {
			quote_id: i.quote_id.clone(),
			from_chain_id: i.from_chain as i64,
			from_token_address: i.from_token.clone(),
			from_amount: i.from_amount.to_string(),
			to_chain_id: i.to_chain as i64,
			to_token_address: i.to_token.clone(),
			to_amount: i.to_amount.to_string(),
			user_address: i.user_address.clone(),
			recipient_address: i.recipient_address.clone(),
			from_tx: i.from_tx.clone(),
			from_nonce: i.from_nonce as i64,
			to_tx: i.to_tx.clone(),
			to_nonce: i.to_nonce.map(|n| n as i64),
			status: i.status.as_str().to_string(),
			sub_status: i.sub_status.map(|s| s.as_str().to_string()),
			quote_requested_at: i.requested_at,
			from_tx_mined_at: i.from_tx_mined_at,
			to_tx_set_at: i.to_tx_set_at,
			to_tx_mined_at: i.to_tx_mined_at,
			refund: i.refund,
			refund_tx: i.refund_tx.clone(),
			refund_tx_set_at: i.refund_tx_set_at,
			refund_tx_mined_at: i.refund_tx_mined_at,
			block_hash: i.block_hash.clone(),
			quorum: 1,
			retries: 0,
		}
	}
}

pub(crate) fn parse_amount(s: &str) -> Result<U256, RelayError> {
	U256::from_str_radix(s, 10)
		.map_err(|e| RelayError::Database(format!("invalid amount {:?}: {}", s, e)))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn test_row() -> IntentRow {
		IntentRow {
			id: 1,
			quote_id: "0xq".to_string(),
			from_chain_id: 1,
			from_token_address: "0xt".to_string(),
			from_amount: "1000".to_string(),
			to_chain_id: 10,
			to_token_address: "0xt2".to_string(),
			to_amount: "995".to_string(),
			user_address: "0xu".to_string(),
			recipient_address: "0xr".to_string(),
			from_tx: "0xf".to_string(),
			from_nonce: 7,
			to_tx: None,
			to_nonce: None,
			status: "CREATED".to_string(),
			sub_status: None,
			quote_requested_at: Utc::now(),
			from_tx_mined_at: Utc::now(),
			to_tx_set_at: None,
			to_tx_mined_at: None,
			refund: false,
			refund_tx: None,
			refund_tx_set_at: None,
			refund_tx_mined_at: None,
			block_hash: "0xb".to_string(),
			quorum: 1,
			retries: 0,
		}
	}

	#[test]
	fn test_row_conversion() {
		let intent = test_row().into_intent().unwrap();
		assert_eq!(intent.status, IntentStatus::Created);
		assert_eq!(intent.from_amount, U256::from(1000u64));
		assert_eq!(intent.to_amount, U256::from(995u64));
		assert_eq!(intent.from_chain, 1);
		assert_eq!(intent.to_chain, 10);
		assert_eq!(intent.quorum, 1);
	}

	#[test]
	fn test_row_conversion_bad_status() {
		let mut row = test_row();
		row.status = "SHIPPED".to_string();
		assert!(row.into_intent().is_err());
	}

	#[test]
	fn test_row_conversion_bad_amount() {
		let mut row = test_row();
		row.from_amount = "not-a-number".to_string();
		assert!(row.into_intent().is_err());
	}

	#[test]
	fn test_new_row_starts_at_quorum_one() {
		let intent = test_row().into_intent().unwrap();
		let new_row = NewIntentRow::from(&intent);
		assert_eq!(new_row.quorum, 1);
		assert_eq!(new_row.retries, 0);
		assert_eq!(new_row.status, "CREATED");
	}

	#[test]
	fn test_parse_amount_large() {
		// Amounts above 2^64 survive the round trip.
		let big = "123456789012345678901234567890";
		assert_eq!(parse_amount(big).unwrap().to_string(), big);
	}
}
