//! ECDSA signing for EVM transactions.

use alloy_consensus::{SignableTransaction, TxEip1559, TxEnvelope, TxLegacy};
use alloy_eips::eip2718::Encodable2718;
use alloy_network::TxSignerSync;
use alloy_primitives::Address;
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use relay_types::{without_0x_prefix, RelayError};

/// A local ECDSA signer derived from the chain's private key.
pub struct EvmSigner {
	signer: PrivateKeySigner,
	address: Address,
}

impl EvmSigner {
	/// Creates a signer from a hex-encoded secp256k1 private key.
	pub fn from_hex(private_key: &str) -> Result<Self, RelayError> {
		let signer: PrivateKeySigner = without_0x_prefix(private_key)
			.parse()
			.map_err(|e| RelayError::InvalidConfig(format!("failed to parse private key: {}", e)))?;
		let address = signer.address();
		Ok(Self { signer, address })
	}

	/// The signer's address; doubles as the solver address on chains
	/// the solver fulfils.
	pub fn address(&self) -> Address {
		self.address
	}

	/// Signs an arbitrary message with the EIP-191 personal-sign
	/// scheme.
	pub fn sign_message(&self, data: &[u8]) -> Result<Vec<u8>, RelayError> {
		let signature = self
			.signer
			.sign_message_sync(data)
			.map_err(|e| RelayError::Rpc(format!("failed to sign message: {}", e)))?;
		Ok(signature.as_bytes().to_vec())
	}

	/// Signs a legacy transaction and returns its raw RLP encoding.
	pub fn sign_legacy(&self, mut tx: TxLegacy) -> Result<Vec<u8>, RelayError> {
		let signature = self
			.signer
			.sign_transaction_sync(&mut tx)
			.map_err(|e| RelayError::Rpc(format!("failed to sign transaction: {}", e)))?;
		let envelope = TxEnvelope::Legacy(tx.into_signed(signature));
		Ok(envelope.encoded_2718())
	}

	/// Signs an EIP-1559 transaction and returns its raw encoding.
	pub fn sign_eip1559(&self, mut tx: TxEip1559) -> Result<Vec<u8>, RelayError> {
		let signature = self
			.signer
			.sign_transaction_sync(&mut tx)
			.map_err(|e| RelayError::Rpc(format!("failed to sign transaction: {}", e)))?;
		let envelope = TxEnvelope::Eip1559(tx.into_signed(signature));
		Ok(envelope.encoded_2718())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{TxKind, U256};

	// Well-known test vector key, never used on a live network.
	const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	#[test]
	fn test_from_hex_derives_address() {
		let signer = EvmSigner::from_hex(TEST_KEY).unwrap();
		assert_eq!(
			signer.address().to_string().to_lowercase(),
			"0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
		);

		// The prefix is optional.
		let unprefixed = EvmSigner::from_hex(without_0x_prefix(TEST_KEY)).unwrap();
		assert_eq!(unprefixed.address(), signer.address());
	}

	#[test]
	fn test_from_hex_rejects_garbage() {
		assert!(matches!(
			EvmSigner::from_hex("0xzz"),
			Err(RelayError::InvalidConfig(_))
		));
	}

	#[test]
	fn test_sign_legacy_produces_raw_bytes() {
		let signer = EvmSigner::from_hex(TEST_KEY).unwrap();
		let tx = TxLegacy {
			chain_id: Some(1),
			nonce: 0,
			gas_price: 1_000_000_000,
			gas_limit: 21_000,
			to: TxKind::Call(signer.address()),
			value: U256::ZERO,
			input: Default::default(),
		};

		let raw = signer.sign_legacy(tx).unwrap();
		assert!(!raw.is_empty());
	}

	#[test]
	fn test_sign_message() {
		let signer = EvmSigner::from_hex(TEST_KEY).unwrap();
		let signature = signer.sign_message(b"relay").unwrap();
		assert_eq!(signature.len(), 65);
	}
}
