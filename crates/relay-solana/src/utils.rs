//! Solana helpers: key handling, ATA derivation, memo parsing and
//! lamport conversions.

use relay_types::RelayError;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;

/// Lamports per SOL.
const LAMPORTS_PER_SOL: f64 = 1e9;

/// Decodes an Ed25519 keypair from its base58 encoding.
pub fn keypair_from_base58(private_key: &str) -> Result<Keypair, RelayError> {
	let bytes = bs58::decode(private_key)
		.into_vec()
		.map_err(|e| RelayError::InvalidConfig(format!("failed to decode private key: {}", e)))?;
	Keypair::from_bytes(&bytes)
		.map_err(|e| RelayError::InvalidConfig(format!("failed to parse private key: {}", e)))
}

/// Derives the associated token account for `(mint, owner)`. A pure
/// function of its inputs.
pub fn associated_token_address(mint: &Pubkey, owner: &Pubkey) -> Pubkey {
	spl_associated_token_account::get_associated_token_address(owner, mint)
}

/// Converts lamports to SOL.
pub fn lamports_to_sol(lamports: u64) -> f64 {
	lamports as f64 / LAMPORTS_PER_SOL
}

/// Converts SOL to lamports.
pub fn sol_to_lamports(sol: f64) -> u64 {
	(sol * LAMPORTS_PER_SOL) as u64
}

/// Scans transaction logs for the memo carrying the quote id.
///
/// The memo is a 66-character `0x`-prefixed hex string; the matching
/// log line reads `Memo (len 66): "0x…"`. Returns `None` when no such
/// line exists.
pub fn extract_quote_id_from_logs(logs: &[String]) -> Option<String> {
	for log in logs {
		if !log.contains("Memo (len 66)") || !log.contains("0x") {
			continue;
		}

		let start = match log.find("\"0x") {
			Some(pos) => pos,
			None => continue,
		};
		let end = match log.rfind('"') {
			Some(pos) if pos > start => pos,
			_ => continue,
		};

		let quote_id = &log[start + 1..end];
		if quote_id.len() == 66 && quote_id.starts_with("0x") {
			return Some(quote_id.to_string());
		}
	}
	None
}

#[cfg(test)]
mod tests {
	use super::*;
	use solana_sdk::signer::Signer;
	use std::str::FromStr;

	#[test]
	fn test_keypair_round_trip() {
		let keypair = Keypair::new();
		let encoded = bs58::encode(keypair.to_bytes()).into_string();
		let decoded = keypair_from_base58(&encoded).unwrap();
		assert_eq!(decoded.pubkey(), keypair.pubkey());
	}

	#[test]
	fn test_keypair_rejects_garbage() {
		assert!(keypair_from_base58("not base58 !!!").is_err());
		assert!(keypair_from_base58("1111").is_err());
	}

	#[test]
	fn test_associated_token_address_is_pure() {
		let mint = Pubkey::from_str("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v").unwrap();
		let owner = Pubkey::new_unique();

		let first = associated_token_address(&mint, &owner);
		let second = associated_token_address(&mint, &owner);
		assert_eq!(first, second);

		// A different owner derives a different account.
		let other = associated_token_address(&mint, &Pubkey::new_unique());
		assert_ne!(first, other);
	}

	#[test]
	fn test_lamports_conversions() {
		assert_eq!(lamports_to_sol(1_000_000_000), 1.0);
		assert_eq!(lamports_to_sol(500_000_000), 0.5);
		assert_eq!(sol_to_lamports(1.5), 1_500_000_000);
	}

	#[test]
	fn test_extract_quote_id_from_logs() {
		let quote_id = format!("0x{}", "ab".repeat(32));
		let logs = vec![
			"Program log: Instruction: Transfer".to_string(),
			format!("Program log: Memo (len 66): \"{}\"", quote_id),
		];

		assert_eq!(extract_quote_id_from_logs(&logs), Some(quote_id));
	}

	#[test]
	fn test_extract_quote_id_ignores_malformed_memos() {
		// Wrong length.
		let logs = vec!["Program log: Memo (len 66): \"0xabcd\"".to_string()];
		assert_eq!(extract_quote_id_from_logs(&logs), None);

		// Missing prefix.
		let logs = vec![format!("Program log: Memo (len 66): \"{}\"", "a".repeat(66))];
		assert_eq!(extract_quote_id_from_logs(&logs), None);

		// No memo line at all.
		let logs = vec!["Program log: Instruction: Transfer".to_string()];
		assert_eq!(extract_quote_id_from_logs(&logs), None);
	}
}
