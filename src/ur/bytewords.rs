// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bytewords minimal encoding.
//!
//! Every byte maps to one of 256 four-letter words. QR payloads use the
//! minimal form: the first and last letter of each word, so one byte becomes
//! two characters from the QR alphanumeric set. A big-endian CRC-32 of the
//! payload is appended before encoding and verified on decode.

use super::crc32::crc32;
use super::UrError;

const WORDS: [&str; 256] = [
    "able", "acid", "also", "apex", "aqua", "arch", "atom", "aunt",
    "away", "axis", "back", "bald", "barn", "belt", "beta", "bias",
    "blue", "body", "brag", "brew", "bulb", "buzz", "calm", "cash",
    "cats", "chef", "city", "claw", "code", "cola", "cook", "cost",
    "crux", "curl", "cusp", "cyan", "dark", "data", "days", "deli",
    "dice", "diet", "door", "down", "draw", "drop", "drum", "dull",
    "duty", "each", "easy", "echo", "edge", "epic", "even", "exam",
    "exit", "eyes", "fact", "fair", "fern", "figs", "film", "fish",
    "fizz", "flap", "flew", "flux", "foxy", "free", "frog", "fuel",
    "fund", "gala", "game", "gear", "gems", "gift", "girl", "glow",
    "good", "gray", "grim", "guru", "gush", "gyro", "half", "hang",
    "hard", "hawk", "heat", "help", "high", "hill", "holy", "hope",
    "horn", "huts", "iced", "idea", "idle", "inch", "inky", "into",
    "iris", "iron", "item", "jade", "jazz", "join", "jolt", "jowl",
    "judo", "jugs", "jump", "junk", "jury", "keep", "keno", "kept",
    "keys", "kick", "kiln", "king", "kite", "kiwi", "knob", "lamb",
    "lava", "lazy", "leaf", "legs", "liar", "limp", "lion", "list",
    "logo", "loud", "love", "luau", "luck", "lung", "main", "many",
    "math", "maze", "memo", "menu", "meow", "mild", "mint", "miss",
    "monk", "nail", "navy", "need", "news", "next", "noon", "note",
    "numb", "obey", "oboe", "omit", "onyx", "open", "oval", "owls",
    "paid", "part", "peck", "play", "plus", "poem", "pool", "pose",
    "puff", "puma", "purr", "quad", "quiz", "race", "ramp", "real",
    "redo", "rich", "road", "rock", "roof", "ruby", "ruin", "runs",
    "rust", "safe", "saga", "scar", "sets", "silk", "skew", "slot",
    "soap", "solo", "song", "stub", "surf", "swan", "taco", "task",
    "taxi", "tent", "tied", "time", "tiny", "toil", "tomb", "toys",
    "trip", "tuna", "twin", "ugly", "undo", "unit", "urge", "user",
    "vast", "very", "veto", "vial", "vibe", "view", "visa", "void",
    "vows", "wall", "wand", "warm", "wasp", "wave", "waxy", "webs",
    "what", "when", "whiz", "wolf", "work", "yank", "yawn", "yell",
    "yoga", "yurt", "zaps", "zero", "zest", "zinc", "zone", "zoom",
];

const NO_BYTE: i16 = -1;

/// Lookup from `(first letter, last letter)` to the byte value.
const MINIMAL_LOOKUP: [i16; 26 * 26] = build_lookup();

const fn build_lookup() -> [i16; 26 * 26] {
    let mut table = [NO_BYTE; 26 * 26];
    let mut i = 0;
    while i < 256 {
        let word = WORDS[i].as_bytes();
        let idx = (word[0] - b'a') as usize * 26 + (word[3] - b'a') as usize;
        table[idx] = i as i16;
        i += 1;
    }
    table
}

const CHECKSUM_LEN: usize = 4;

/// Encode `data` as minimal bytewords, appending the CRC-32 checksum.
pub fn encode_minimal(data: &[u8]) -> String {
    let checksum = crc32(data).to_be_bytes();
    let mut out = String::with_capacity((data.len() + CHECKSUM_LEN) * 2);
    for &byte in data.iter().chain(checksum.iter()) {
        let word = WORDS[byte as usize].as_bytes();
        out.push(word[0] as char);
        out.push(word[3] as char);
    }
    out
}

/// Decode minimal bytewords, verifying and stripping the trailing checksum.
pub fn decode_minimal(text: &str) -> Result<Vec<u8>, UrError> {
    let text = text.as_bytes();
    if text.len() % 2 != 0 {
        return Err(UrError::InvalidBytewords(
            "odd number of characters".to_string(),
        ));
    }

    let mut bytes = Vec::with_capacity(text.len() / 2);
    for pair in text.chunks_exact(2) {
        bytes.push(minimal_byte(pair[0], pair[1])?);
    }

    if bytes.len() < CHECKSUM_LEN {
        return Err(UrError::InvalidBytewords("missing checksum".to_string()));
    }

    let split = bytes.len() - CHECKSUM_LEN;
    let expected = u32::from_be_bytes([
        bytes[split],
        bytes[split + 1],
        bytes[split + 2],
        bytes[split + 3],
    ]);
    bytes.truncate(split);

    let actual = crc32(&bytes);
    if actual != expected {
        return Err(UrError::ChecksumMismatch { expected, actual });
    }
    Ok(bytes)
}

fn minimal_byte(first: u8, last: u8) -> Result<u8, UrError> {
    let first = first.to_ascii_lowercase();
    let last = last.to_ascii_lowercase();
    if !first.is_ascii_lowercase() || !last.is_ascii_lowercase() {
        return Err(UrError::InvalidBytewords(format!(
            "invalid characters {:?}",
            [first as char, last as char]
        )));
    }
    let value = MINIMAL_LOOKUP[(first - b'a') as usize * 26 + (last - b'a') as usize];
    if value == NO_BYTE {
        return Err(UrError::InvalidBytewords(format!(
            "unknown word {}{}",
            first as char, last as char
        )));
    }
    Ok(value as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_and_last_words() {
        let encoded = encode_minimal(&[0x00, 0xFF]);
        assert!(encoded.starts_with("aezm"));
        assert_eq!(encoded.len(), (2 + CHECKSUM_LEN) * 2);
    }

    #[test]
    fn decode_accepts_uppercase() {
        let data = b"xrpl".to_vec();
        let encoded = encode_minimal(&data).to_ascii_uppercase();
        assert_eq!(decode_minimal(&encoded).unwrap(), data);
    }

    #[test]
    fn corrupted_payload_fails_checksum() {
        let mut encoded = encode_minimal(&[1, 2, 3, 4, 5]).into_bytes();
        // "ad" (acid, 0x01) -> "ae" (able, 0x00)
        encoded[1] = b'e';
        let encoded = String::from_utf8(encoded).unwrap();
        assert!(matches!(
            decode_minimal(&encoded),
            Err(UrError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn unknown_letter_pair_is_rejected() {
        assert!(matches!(
            decode_minimal("qqaeaeaeae"),
            Err(UrError::InvalidBytewords(_))
        ));
    }

    #[test]
    fn too_short_for_checksum() {
        assert!(decode_minimal("aeae").is_err());
    }
}
