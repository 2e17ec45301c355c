//! Chain configuration reads.

use crate::models::{ChainRecord, ChainRow};
use crate::schema::chains;
use crate::{map_not_found, Storage};
use diesel::prelude::*;
use relay_types::RelayError;

impl Storage {
	/// Returns all chains, ordered by chain id, optionally restricted
	/// to active rows.
	pub async fn get_chains(&self, active_only: bool) -> Result<Vec<ChainRecord>, RelayError> {
		let rows: Vec<ChainRow> = self
			.with_conn(move |conn| {
				let mut query = chains::table.into_boxed();
				if active_only {
					query = query.filter(chains::active.eq(true));
				}
				query
					.order(chains::chain_id.asc())
					.load::<ChainRow>(conn)
					.map_err(|e| RelayError::Database(e.to_string()))
			})
			.await?;

		Ok(rows.into_iter().map(ChainRecord::from).collect())
	}

	/// Returns the chain with the given id. A zero id is rejected with
	/// `InvalidChainId`; a missing row maps to `ChainNotFound`.
	pub async fn get_chain_by_id(&self, chain_id: u64) -> Result<ChainRecord, RelayError> {
		if chain_id == 0 {
			return Err(RelayError::InvalidChainId);
		}

		let row: ChainRow = self
			.with_conn(move |conn| {
				chains::table
					.filter(chains::chain_id.eq(chain_id as i64))
					.first::<ChainRow>(conn)
					.map_err(|e| map_not_found(e, RelayError::ChainNotFound))
			})
			.await?;

		Ok(ChainRecord::from(row))
	}
}
