//! Agent reads.

use crate::models::{AgentRecord, AgentRow};
use crate::schema::agents;
use crate::{map_not_found, Storage};
use diesel::prelude::*;
use relay_types::RelayError;

impl Storage {
	/// Returns the agent with the given uid. An empty uid is rejected
	/// with `InvalidAgentId`; a missing row maps to `AgentNotFound`.
	pub async fn get_agent_by_uid(&self, uid: &str) -> Result<AgentRecord, RelayError> {
		if uid.is_empty() {
			return Err(RelayError::InvalidAgentId);
		}

		let uid = uid.to_string();
		let row: AgentRow = self
			.with_conn(move |conn| {
				agents::table
					.filter(agents::uid.eq(&uid))
					.first::<AgentRow>(conn)
					.map_err(|e| map_not_found(e, RelayError::AgentNotFound))
			})
			.await?;

		Ok(AgentRecord::from(row))
	}
}
