//! Token balance bookkeeping.

use crate::schema::chain_tokens;
use crate::{map_not_found, Storage};
use alloy_primitives::U256;
use chrono::Utc;
use diesel::prelude::*;
use relay_types::{format_token_amount, RelayError};

impl Storage {
	/// Returns the native token address configured for the chain.
	pub async fn get_native_token_address(&self, chain_id: u64) -> Result<String, RelayError> {
		self.with_conn(move |conn| {
			chain_tokens::table
				.filter(chain_tokens::chain_id.eq(chain_id as i64))
				.filter(chain_tokens::native.eq(true))
				.select(chain_tokens::address)
				.first::<String>(conn)
				.map_err(|e| map_not_found(e, RelayError::TokenNotFound))
		})
		.await
	}

	/// Updates the raw and human-readable balance of a token row,
	/// stamping `updated_at = now()`. The formatted balance divides by
	/// `10^decimals` without precision loss.
	pub async fn update_balance(
		&self,
		chain_id: u64,
		token_address: &str,
		balance: U256,
	) -> Result<(), RelayError> {
		let token_address = token_address.to_string();
		self.with_conn(move |conn| {
			let decimals: i32 = chain_tokens::table
				.filter(chain_tokens::chain_id.eq(chain_id as i64))
				.filter(chain_tokens::address.eq(&token_address))
				.select(chain_tokens::decimals)
				.first::<i32>(conn)
				.map_err(|e| map_not_found(e, RelayError::TokenNotFound))?;

			let raw = balance.to_string();
			let formatted = format_token_amount(&raw, decimals.max(0) as u32);

			let updated = diesel::update(
				chain_tokens::table
					.filter(chain_tokens::chain_id.eq(chain_id as i64))
					.filter(chain_tokens::address.eq(&token_address)),
			)
			.set((
				chain_tokens::balance.eq(Some(raw)),
				chain_tokens::balance_formatted.eq(Some(formatted)),
				chain_tokens::updated_at.eq(Utc::now()),
			))
			.execute(conn)
			.map_err(|e| RelayError::Database(e.to_string()))?;

			if updated == 0 {
				return Err(RelayError::TokenNotFound);
			}
			Ok(())
		})
		.await
	}
}
