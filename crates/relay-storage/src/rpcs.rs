//! RPC endpoint reads.

use crate::models::{RpcRecord, RpcRow};
use crate::schema::rpcs;
use crate::Storage;
use diesel::prelude::*;
use diesel::sql_types::{Bool, Int8};
use relay_types::RelayError;

const AGENT_RPCS_SQL: &str = "\
SELECT
	r.id, r.chain_id, r.url, r.provider, r.agent_id, r.active,
	r.created_at, r.updated_at
FROM rpcs r
JOIN chains c ON c.chain_id = r.chain_id
WHERE r.agent_id = $1 AND (r.active OR NOT $2)
ORDER BY r.created_at DESC";

impl Storage {
	/// Returns the RPC endpoints configured for a chain, most recently
	/// created first (the preference order).
	pub async fn get_rpcs_by_chain_id(
		&self,
		chain_id: u64,
		active_only: bool,
	) -> Result<Vec<RpcRecord>, RelayError> {
		if chain_id == 0 {
			return Err(RelayError::InvalidChainId);
		}

		let rows: Vec<RpcRow> = self
			.with_conn(move |conn| {
				let mut query = rpcs::table
					.filter(rpcs::chain_id.eq(chain_id as i64))
					.into_boxed();
				if active_only {
					query = query.filter(rpcs::active.eq(true));
				}
				query
					.order(rpcs::created_at.desc())
					.load::<RpcRow>(conn)
					.map_err(|e| RelayError::Database(e.to_string()))
			})
			.await?;

		Ok(rows.into_iter().map(RpcRecord::from).collect())
	}

	/// Returns the RPC endpoints operated by an agent, restricted to
	/// endpoints whose chain is known.
	pub async fn get_agent_rpcs(
		&self,
		agent_id: i64,
		active_only: bool,
	) -> Result<Vec<RpcRecord>, RelayError> {
		if agent_id == 0 {
			return Err(RelayError::InvalidAgentId);
		}

		let rows: Vec<RpcRow> = self
			.with_conn(move |conn| {
				diesel::sql_query(AGENT_RPCS_SQL)
					.bind::<Int8, _>(agent_id)
					.bind::<Bool, _>(active_only)
					.load::<RpcRow>(conn)
					.map_err(|e| RelayError::Database(e.to_string()))
			})
			.await?;

		Ok(rows.into_iter().map(RpcRecord::from).collect())
	}
}
