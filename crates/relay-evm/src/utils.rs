//! Event classification and calldata quote-id extraction.

use alloy_primitives::B256;
use alloy_sol_types::{sol, SolEvent};
use relay_types::RelayError;

sol! {
	/// Emitted by the relay receiver on a plain native deposit; the
	/// quote id travels in the transaction calldata.
	event FundsForwarded();

	/// Emitted by the relay receiver on a deposit carrying extra data.
	event FundsForwardedWithData(bytes data);

	/// Standard ERC-20 transfer event.
	event Transfer(address indexed from, address indexed to, uint256 value);
}

/// The zero address, marking native-asset routes.
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Function selector (4) + first argument (32) + second argument (32).
/// Anything beyond this offset is the quote-id payload.
const MIN_TRANSFER_INPUT_LENGTH: usize = 68;

/// Deposit event kinds the handler decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
	FundsForwarded,
	FundsForwardedWithData,
	Transfer,
}

impl EventKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			EventKind::FundsForwarded => "FundsForwarded",
			EventKind::FundsForwardedWithData => "FundsForwardedWithData",
			EventKind::Transfer => "Transfer",
		}
	}
}

impl std::fmt::Display for EventKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Classifies a log by its first topic. Unknown topics yield `None`.
pub fn event_kind(topics: &[B256]) -> Option<EventKind> {
	let signature = topics.first()?;
	if *signature == FundsForwarded::SIGNATURE_HASH {
		Some(EventKind::FundsForwarded)
	} else if *signature == FundsForwardedWithData::SIGNATURE_HASH {
		Some(EventKind::FundsForwardedWithData)
	} else if *signature == Transfer::SIGNATURE_HASH {
		Some(EventKind::Transfer)
	} else {
		None
	}
}

/// Extracts the quote id from transaction calldata.
///
/// The calldata layout is selector + two 32-byte arguments; the tail
/// beyond byte 68 is the quote-id payload, returned as lowercase hex
/// without a prefix.
pub fn extract_quote_id_from_tx_data(data: &[u8]) -> Result<String, RelayError> {
	if data.len() <= MIN_TRANSFER_INPUT_LENGTH {
		return Err(RelayError::Extraction(format!(
			"invalid transaction input length, expected more than {}, got {}",
			MIN_TRANSFER_INPUT_LENGTH,
			data.len()
		)));
	}

	let quote_id_bytes = &data[MIN_TRANSFER_INPUT_LENGTH..];
	if quote_id_bytes.is_empty() {
		return Err(RelayError::Extraction("quote id is empty".to_string()));
	}

	Ok(hex::encode(quote_id_bytes))
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::keccak256;

	#[test]
	fn test_event_kind_known_topics() {
		assert_eq!(
			event_kind(&[keccak256("FundsForwarded()")]),
			Some(EventKind::FundsForwarded)
		);
		assert_eq!(
			event_kind(&[keccak256("FundsForwardedWithData(bytes)")]),
			Some(EventKind::FundsForwardedWithData)
		);
		assert_eq!(
			event_kind(&[keccak256("Transfer(address,address,uint256)")]),
			Some(EventKind::Transfer)
		);
	}

	#[test]
	fn test_event_kind_unknown_topic() {
		assert_eq!(event_kind(&[keccak256("Approval(address,address,uint256)")]), None);
		assert_eq!(event_kind(&[]), None);
	}

	#[test]
	fn test_extract_quote_id_round_trip() {
		// selector + recipient word + amount word + 32-byte quote id
		let quote_id = [0x5au8; 32];
		let mut data = vec![0u8; 68];
		data.extend_from_slice(&quote_id);

		let extracted = extract_quote_id_from_tx_data(&data).unwrap();
		assert_eq!(extracted, hex::encode(quote_id));
	}

	#[test]
	fn test_extract_quote_id_short_input() {
		assert!(extract_quote_id_from_tx_data(&[]).is_err());
		assert!(extract_quote_id_from_tx_data(&[0u8; 68]).is_err());
	}

	#[test]
	fn test_extract_quote_id_just_above_boundary() {
		let mut data = vec![0u8; 68];
		data.push(0xab);
		assert_eq!(extract_quote_id_from_tx_data(&data).unwrap(), "ab");
	}
}
