// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Classic XRPL addresses (`r...`): base58 with the Ripple alphabet, a
//! one-byte version prefix and a double SHA-256 checksum.

use sha2::{Digest, Sha256};

use super::codec::CodecError;

const ACCOUNT_ID_VERSION: u8 = 0x00;
const ACCOUNT_ID_LEN: usize = 20;

fn checksum(payload: &[u8]) -> [u8; 4] {
    let digest = Sha256::digest(Sha256::digest(payload));
    [digest[0], digest[1], digest[2], digest[3]]
}

/// Decode a classic address into its 20-byte AccountID.
pub fn decode_account_id(address: &str) -> Result<[u8; ACCOUNT_ID_LEN], CodecError> {
    let raw = bs58::decode(address)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .into_vec()
        .map_err(|e| CodecError::InvalidAddress(format!("{address}: {e}")))?;

    if raw.len() != 1 + ACCOUNT_ID_LEN + 4 || raw[0] != ACCOUNT_ID_VERSION {
        return Err(CodecError::InvalidAddress(format!(
            "{address}: not a classic account address"
        )));
    }

    let (payload, check) = raw.split_at(1 + ACCOUNT_ID_LEN);
    if checksum(payload) != check {
        return Err(CodecError::InvalidAddress(format!(
            "{address}: checksum mismatch"
        )));
    }

    let mut id = [0u8; ACCOUNT_ID_LEN];
    id.copy_from_slice(&payload[1..]);
    Ok(id)
}

/// Encode a 20-byte AccountID as a classic address.
pub fn encode_account_id(id: &[u8; ACCOUNT_ID_LEN]) -> String {
    let mut payload = Vec::with_capacity(1 + ACCOUNT_ID_LEN + 4);
    payload.push(ACCOUNT_ID_VERSION);
    payload.extend_from_slice(id);
    let check = checksum(&payload);
    payload.extend_from_slice(&check);

    bs58::encode(payload)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .into_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENESIS: &str = "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh";
    const GENESIS_ID: &str = "B5F762798A53D543A014CAF8B297CFF8F2F937E8";

    #[test]
    fn decodes_genesis_account() {
        let id = decode_account_id(GENESIS).unwrap();
        assert_eq!(hex::encode_upper(id), GENESIS_ID);
    }

    #[test]
    fn account_zero() {
        assert_eq!(encode_account_id(&[0u8; 20]), "rrrrrrrrrrrrrrrrrrrrrhoLvTp");
    }

    #[test]
    fn encode_inverts_decode() {
        let id = decode_account_id(GENESIS).unwrap();
        assert_eq!(encode_account_id(&id), GENESIS);
    }

    #[test]
    fn rejects_bad_checksum_and_alphabet() {
        assert!(decode_account_id("rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTi").is_err());
        // '0' is not in the Ripple alphabet
        assert!(decode_account_id("rHb9CJAWyB4rj91VRWn96DkukG4bwdty0h").is_err());
        assert!(decode_account_id("").is_err());
    }
}
