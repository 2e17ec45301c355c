//! Intent state machine persistence.
//!
//! Intents are idempotently upserted on `(quote_id, block_hash)`;
//! re-observation bumps the quorum counter without touching the data
//! columns. Hand-off to a solver happens inside a `REPEATABLE READ`
//! transaction whose locked CTE select transitions the claimed rows to
//! `PENDING` atomically, so concurrent solvers receive disjoint result
//! sets.

use crate::models::{IntentRow, NewIntentRow};
use crate::schema::intent;
use crate::{map_not_found, Storage};
use chrono::Utc;
use diesel::prelude::*;
use diesel::sql_types::{Int4, Int8, Text, Timestamptz};
use relay_types::{Intent, IntentStatus, RelayError, SubStatus, Transaction};
use std::collections::HashMap;

/// Claims up to this many created intents per call.
const CLAIM_BATCH_LIMIT: i64 = 100;

const CLAIM_CREATED_SQL: &str = "\
WITH selected_intents AS (
	SELECT
		id, quote_id, from_chain_id, from_token_address, from_amount,
		to_chain_id, to_token_address, to_amount, user_address, recipient_address,
		from_tx, from_nonce, to_tx, to_nonce, status, sub_status,
		quote_requested_at, from_tx_mined_at, to_tx_set_at, to_tx_mined_at,
		refund, refund_tx, refund_tx_set_at, refund_tx_mined_at, block_hash,
		quorum, retries
	FROM intent
	WHERE status = $1 AND quorum >= $2 AND from_tx_mined_at > $3
	FOR UPDATE SKIP LOCKED
	LIMIT $4
)
UPDATE intent i
SET status = $5
FROM selected_intents s
WHERE i.id = s.id
RETURNING s.*";

const SELECT_PENDING_SQL: &str = "\
SELECT
	id, quote_id, from_chain_id, from_token_address, from_amount,
	to_chain_id, to_token_address, to_amount, user_address, recipient_address,
	from_tx, from_nonce, to_tx, to_nonce, status, sub_status,
	quote_requested_at, from_tx_mined_at, to_tx_set_at, to_tx_mined_at,
	refund, refund_tx, refund_tx_set_at, refund_tx_mined_at, block_hash,
	quorum, retries
FROM intent
WHERE status = $1 AND from_tx_mined_at > $2
FOR UPDATE SKIP LOCKED
LIMIT $3";

const PENDING_TXS_SQL: &str = "\
SELECT
	i.to_chain_id AS chain_id,
	i.to_tx AS hash,
	i.quote_id AS quote_id,
	i.to_nonce AS nonce,
	i.user_address AS from_address,
	i.recipient_address AS to_address,
	i.to_token_address AS token,
	i.to_amount AS to_amount,
	i.from_amount AS from_amount
FROM intent i
WHERE i.status = $1 AND i.to_tx_set_at > $2
ORDER BY i.to_chain_id, i.to_nonce";

#[derive(Debug, diesel::QueryableByName)]
struct PendingTxRow {
	#[diesel(sql_type = Int8)]
	chain_id: i64,
	#[diesel(sql_type = diesel::sql_types::Nullable<Text>)]
	hash: Option<String>,
	#[diesel(sql_type = Text)]
	quote_id: String,
	#[diesel(sql_type = diesel::sql_types::Nullable<Int8>)]
	nonce: Option<i64>,
	#[diesel(sql_type = Text)]
	from_address: String,
	#[diesel(sql_type = Text)]
	to_address: String,
	#[diesel(sql_type = Text)]
	token: String,
	#[diesel(sql_type = Text)]
	to_amount: String,
	#[diesel(sql_type = Text)]
	from_amount: String,
}

impl Storage {
	/// Inserts an intent, or bumps the quorum of the existing row with
	/// the same `(quote_id, block_hash)` without altering any other
	/// column.
	pub async fn insert_intent(&self, new_intent: &Intent) -> Result<(), RelayError> {
		let row = NewIntentRow::from(new_intent);
		self.with_conn(move |conn| {
			diesel::insert_into(intent::table)
				.values(&row)
				.on_conflict((intent::quote_id, intent::block_hash))
				.do_update()
				.set(intent::quorum.eq(intent::quorum + 1))
				.execute(conn)
				.map_err(|e| RelayError::Database(e.to_string()))?;
			Ok(())
		})
		.await
	}

	/// Claims a batch of fulfillable created intents.
	///
	/// Within one `REPEATABLE READ` transaction, selects up to 100
	/// intents with `status = CREATED`, quorum at or above the
	/// configured threshold and a source transaction mined inside the
	/// expiration window, locking them with `FOR UPDATE SKIP LOCKED`,
	/// transitions them to `PENDING` in the same statement and returns
	/// the pre-transition snapshots. Two solvers calling concurrently
	/// receive disjoint sets.
	pub async fn get_created_intents(&self) -> Result<Vec<Intent>, RelayError> {
		let expiration = Utc::now() - self.expiration_window();
		let min_quorum = self.min_quorum();

		let rows: Vec<IntentRow> = self
			.with_conn(move |conn| {
				conn.build_transaction()
					.repeatable_read()
					.run(|conn| {
						diesel::sql_query(CLAIM_CREATED_SQL)
							.bind::<Text, _>(IntentStatus::Created.as_str())
							.bind::<Int4, _>(min_quorum)
							.bind::<Timestamptz, _>(expiration)
							.bind::<Int8, _>(CLAIM_BATCH_LIMIT)
							.bind::<Text, _>(IntentStatus::Pending.as_str())
							.load::<IntentRow>(conn)
					})
					.map_err(|e| RelayError::Database(e.to_string()))
			})
			.await?;

		rows.into_iter().map(IntentRow::into_intent).collect()
	}

	/// Returns pending intents inside the expiration window without
	/// rewriting their status. Used to resume confirmation watch loops
	/// after a restart.
	pub async fn get_pending_intents(&self) -> Result<Vec<Intent>, RelayError> {
		let expiration = Utc::now() - self.expiration_window();

		let rows: Vec<IntentRow> = self
			.with_conn(move |conn| {
				conn.build_transaction()
					.repeatable_read()
					.run(|conn| {
						diesel::sql_query(SELECT_PENDING_SQL)
							.bind::<Text, _>(IntentStatus::Pending.as_str())
							.bind::<Timestamptz, _>(expiration)
							.bind::<Int8, _>(CLAIM_BATCH_LIMIT)
							.load::<IntentRow>(conn)
					})
					.map_err(|e| RelayError::Database(e.to_string()))
			})
			.await?;

		rows.into_iter().map(IntentRow::into_intent).collect()
	}

	/// Records the submitted destination transaction: sets `to_tx`,
	/// `to_tx_set_at = now()`, `to_nonce` and moves the intent to
	/// `PENDING`.
	pub async fn set_pending_intent_status(
		&self,
		quote_id: &str,
		to_tx: &str,
		nonce: u64,
	) -> Result<(), RelayError> {
		let quote_id = quote_id.to_string();
		let to_tx = to_tx.to_string();
		self.with_conn(move |conn| {
			let updated = diesel::update(intent::table.filter(intent::quote_id.eq(&quote_id)))
				.set((
					intent::to_tx.eq(Some(to_tx)),
					intent::to_tx_set_at.eq(Some(Utc::now())),
					intent::status.eq(IntentStatus::Pending.as_str()),
					intent::to_nonce.eq(Some(nonce as i64)),
				))
				.execute(conn)
				.map_err(|e| RelayError::Database(e.to_string()))?;

			if updated == 0 {
				return Err(RelayError::Database(format!(
					"no intent found with quote_id {}",
					quote_id
				)));
			}
			Ok(())
		})
		.await
	}

	/// Marks the intent fulfilled: `status = DONE`,
	/// `sub_status = COMPLETED`, `to_nonce` and
	/// `to_tx_mined_at = now()`.
	pub async fn set_done_intent_status(
		&self,
		quote_id: &str,
		nonce: u64,
	) -> Result<(), RelayError> {
		let quote_id = quote_id.to_string();
		self.with_conn(move |conn| {
			let updated = diesel::update(intent::table.filter(intent::quote_id.eq(&quote_id)))
				.set((
					intent::status.eq(IntentStatus::Done.as_str()),
					intent::sub_status.eq(Some(SubStatus::Completed.as_str())),
					intent::to_nonce.eq(Some(nonce as i64)),
					intent::to_tx_mined_at.eq(Some(Utc::now())),
				))
				.execute(conn)
				.map_err(|e| RelayError::Database(e.to_string()))?;

			if updated == 0 {
				return Err(RelayError::Database(format!(
					"no intent found with quote_id {}",
					quote_id
				)));
			}
			Ok(())
		})
		.await
	}

	/// Marks the intent failed with the diagnostic sub-status.
	pub async fn set_failed_intent_status(
		&self,
		quote_id: &str,
		sub_status: SubStatus,
	) -> Result<(), RelayError> {
		let quote_id = quote_id.to_string();
		self.with_conn(move |conn| {
			let updated = diesel::update(intent::table.filter(intent::quote_id.eq(&quote_id)))
				.set((
					intent::status.eq(IntentStatus::Failed.as_str()),
					intent::sub_status.eq(Some(sub_status.as_str())),
				))
				.execute(conn)
				.map_err(|e| RelayError::Database(e.to_string()))?;

			if updated == 0 {
				return Err(RelayError::Database(format!(
					"no intent found with quote_id {}",
					quote_id
				)));
			}
			Ok(())
		})
		.await
	}

	/// Retry reset: moves the intent back to `CREATED`, clears the
	/// destination transaction fields and increments the retry counter.
	pub async fn set_created_intent_status(&self, quote_id: &str) -> Result<(), RelayError> {
		let quote_id = quote_id.to_string();
		self.with_conn(move |conn| {
			let updated = diesel::update(intent::table.filter(intent::quote_id.eq(&quote_id)))
				.set((
					intent::status.eq(IntentStatus::Created.as_str()),
					intent::to_tx.eq(None::<String>),
					intent::to_tx_set_at.eq(None::<chrono::DateTime<Utc>>),
					intent::to_nonce.eq(None::<i64>),
					intent::retries.eq(intent::retries + 1),
				))
				.execute(conn)
				.map_err(|e| RelayError::Database(e.to_string()))?;

			if updated == 0 {
				return Err(RelayError::Database(format!(
					"no intent found with quote_id {}",
					quote_id
				)));
			}
			Ok(())
		})
		.await
	}

	/// Loads a single intent by its quote id.
	pub async fn get_intent_by_quote_id(&self, quote_id: &str) -> Result<Intent, RelayError> {
		let quote = quote_id.to_string();
		let not_found = RelayError::Database(format!("no intent found with quote_id {}", quote_id));
		let row: IntentRow = self
			.with_conn(move |conn| {
				intent::table
					.filter(intent::quote_id.eq(&quote))
					.first::<IntentRow>(conn)
					.map_err(|e| map_not_found(e, not_found))
			})
			.await?;

		row.into_intent()
	}

	/// Returns the in-flight destination transactions grouped by chain,
	/// nonce-ascending within each chain, filtered to the expiration
	/// window. The row columns map as `from := user_address`,
	/// `to := recipient_address`, `token := to_token_address`.
	pub async fn get_pending_transactions_by_chain(
		&self,
	) -> Result<HashMap<u64, Vec<Transaction>>, RelayError> {
		let expiration = Utc::now() - self.expiration_window();

		let rows: Vec<PendingTxRow> = self
			.with_conn(move |conn| {
				diesel::sql_query(PENDING_TXS_SQL)
					.bind::<Text, _>(IntentStatus::Pending.as_str())
					.bind::<Timestamptz, _>(expiration)
					.load::<PendingTxRow>(conn)
					.map_err(|e| RelayError::Database(e.to_string()))
			})
			.await?;

		let mut by_chain: HashMap<u64, Vec<Transaction>> = HashMap::new();
		for row in rows {
			let chain_id = row.chain_id as u64;
			let tx = Transaction {
				hash: row.hash.unwrap_or_default(),
				from: row.from_address,
				to: row.to_address,
				from_amount: crate::models::parse_amount(&row.from_amount)?,
				to_amount: crate::models::parse_amount(&row.to_amount)?,
				token: row.token,
				nonce: row.nonce.unwrap_or_default() as u64,
				chain_id,
				quote_id: row.quote_id,
				metadata: None,
			};
			by_chain.entry(chain_id).or_default().push(tx);
		}

		Ok(by_chain)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_claim_sql_shape() {
		// The claim statement must lock with SKIP LOCKED, bound the
		// batch and return the pre-transition snapshot.
		assert!(CLAIM_CREATED_SQL.contains("FOR UPDATE SKIP LOCKED"));
		assert!(CLAIM_CREATED_SQL.contains("RETURNING s.*"));
		assert!(CLAIM_CREATED_SQL.contains("quorum >= $2"));
		assert!(CLAIM_CREATED_SQL.contains("from_tx_mined_at > $3"));
	}

	#[test]
	fn test_pending_sql_does_not_rewrite_status() {
		assert!(SELECT_PENDING_SQL.contains("FOR UPDATE SKIP LOCKED"));
		assert!(!SELECT_PENDING_SQL.contains("UPDATE intent"));
	}

	#[test]
	fn test_pending_txs_sql_orders_by_nonce() {
		assert!(PENDING_TXS_SQL.contains("ORDER BY i.to_chain_id, i.to_nonce"));
		assert!(PENDING_TXS_SQL.contains("i.user_address AS from_address"));
		assert!(PENDING_TXS_SQL.contains("i.recipient_address AS to_address"));
		assert!(PENDING_TXS_SQL.contains("i.to_token_address AS token"));
	}
}
