//! PostgreSQL persistence for the relay solver.
//!
//! This crate stores chain configuration, RPC endpoints, agents, token
//! balances and the durable intent state machine. All access goes
//! through the [`Storage`] service, which checks connections out of an
//! r2d2 pool for the duration of a single operation and runs the
//! blocking diesel work on the tokio blocking pool.
//!
//! Multi-solver correctness for intent hand-off relies on
//! `REPEATABLE READ` snapshots combined with `FOR UPDATE SKIP LOCKED`;
//! see [`Storage::get_created_intents`].

pub mod agents;
pub mod balances;
pub mod chains;
pub mod intents;
pub mod models;
pub mod rpcs;
pub mod schema;

pub use models::{AgentRecord, ChainRecord, RpcRecord};

use chrono::Duration;
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use relay_types::RelayError;

/// Default window after which an observed intent is no longer eligible
/// for fulfilment work.
const DEFAULT_EXPIRATION_HOURS: i64 = 24;

/// Persistence service over a PostgreSQL connection pool.
pub struct Storage {
	pool: Pool<ConnectionManager<PgConnection>>,
	min_quorum: i32,
	expiration_window: Duration,
}

impl Storage {
	/// Connects to the database and builds the connection pool.
	///
	/// Connection failures map to [`RelayError::DatabaseConnect`]. The
	/// quorum threshold defaults to 1 and the expiration window to 24
	/// hours; see [`Storage::with_min_quorum`] and
	/// [`Storage::with_expiration_window`].
	pub fn connect(database_url: &str) -> Result<Self, RelayError> {
		let manager = ConnectionManager::<PgConnection>::new(database_url);
		let pool = Pool::builder()
			.build(manager)
			.map_err(|_| RelayError::DatabaseConnect)?;

		Ok(Self {
			pool,
			min_quorum: 1,
			expiration_window: Duration::hours(DEFAULT_EXPIRATION_HOURS),
		})
	}

	/// Sets the number of independent source observations an intent
	/// needs before it becomes fulfillable.
	pub fn with_min_quorum(mut self, min_quorum: i32) -> Self {
		self.min_quorum = min_quorum;
		self
	}

	/// Sets the eligibility window measured from `from_tx_mined_at`.
	pub fn with_expiration_window(mut self, window: Duration) -> Self {
		self.expiration_window = window;
		self
	}

	pub(crate) fn min_quorum(&self) -> i32 {
		self.min_quorum
	}

	pub(crate) fn expiration_window(&self) -> Duration {
		self.expiration_window
	}

	/// Runs a blocking database closure on the tokio blocking pool with
	/// a connection checked out of the pool.
	pub(crate) async fn with_conn<T, F>(&self, f: F) -> Result<T, RelayError>
	where
		T: Send + 'static,
		F: FnOnce(&mut PgConnection) -> Result<T, RelayError> + Send + 'static,
	{
		let pool = self.pool.clone();
		tokio::task::spawn_blocking(move || {
			let mut conn = pool.get().map_err(|_| RelayError::DatabaseConnect)?;
			f(&mut conn)
		})
		.await
		.map_err(|e| RelayError::Database(format!("blocking task failed: {}", e)))?
	}
}

/// Maps a diesel error to the taxonomy, translating `NotFound` to the
/// supplied kind and everything else to the database carrier.
pub(crate) fn map_not_found(err: diesel::result::Error, not_found: RelayError) -> RelayError {
	match err {
		diesel::result::Error::NotFound => not_found,
		other => RelayError::Database(other.to_string()),
	}
}
