// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Amount serialization.
//!
//! XRP amounts are 8 bytes of drops with bit 62 set for positive values.
//! Issued currency amounts are 48 bytes: an 8-byte normalized decimal
//! (sign, exponent + 97, 54-bit mantissa in `[10^15, 10^16)`), the 20-byte
//! currency code and the 20-byte issuer AccountID.

use serde_json::{json, Value};

use super::address::{decode_account_id, encode_account_id};
use super::codec::{BinaryReader, CodecError};

const NOT_XRP_BIT: u64 = 1 << 63;
const POSITIVE_BIT: u64 = 1 << 62;
const MANTISSA_MASK: u64 = (1 << 54) - 1;
const ZERO_ISSUED: u64 = NOT_XRP_BIT;

/// 100 billion XRP in drops.
const MAX_DROPS: u64 = 100_000_000_000_000_000;

const MIN_MANTISSA: u64 = 1_000_000_000_000_000;
const MAX_MANTISSA: u64 = 9_999_999_999_999_999;
const MIN_EXPONENT: i32 = -96;
const MAX_EXPONENT: i32 = 80;
const EXPONENT_BIAS: i32 = 97;
const MAX_PRECISION: usize = 16;

/// Serialize a JSON amount: drops string or `{currency, issuer, value}` object.
pub fn encode_amount(value: &Value) -> Result<Vec<u8>, CodecError> {
    match value {
        Value::String(drops) => encode_drops(drops),
        Value::Number(n) => {
            let drops = n
                .as_u64()
                .ok_or_else(|| CodecError::InvalidAmount(format!("{n} is not a drop count")))?;
            encode_drops(&drops.to_string())
        }
        Value::Object(obj) => {
            let field = |name: &str| {
                obj.get(name)
                    .and_then(Value::as_str)
                    .ok_or_else(|| CodecError::InvalidAmount(format!("missing {name}")))
            };
            let currency = encode_currency(field("currency")?)?;
            let issuer = decode_account_id(field("issuer")?)?;
            let value = match obj.get("value") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => return Err(CodecError::InvalidAmount("missing value".to_string())),
            };

            let mut out = Vec::with_capacity(48);
            out.extend_from_slice(&encode_issued_value(&value)?.to_be_bytes());
            out.extend_from_slice(&currency);
            out.extend_from_slice(&issuer);
            Ok(out)
        }
        other => Err(CodecError::InvalidAmount(format!(
            "unsupported amount {other}"
        ))),
    }
}

/// Read an amount back into its JSON form.
pub fn decode_amount(reader: &mut BinaryReader<'_>) -> Result<Value, CodecError> {
    let head = reader.read_u64()?;

    if head & NOT_XRP_BIT == 0 {
        if head & POSITIVE_BIT == 0 && head != 0 {
            return Err(CodecError::InvalidAmount("negative XRP amount".to_string()));
        }
        return Ok(Value::String((head & !POSITIVE_BIT).to_string()));
    }

    let currency = reader.read_array::<20>()?;
    let issuer = reader.read_array::<20>()?;

    Ok(json!({
        "currency": decode_currency(&currency),
        "issuer": encode_account_id(&issuer),
        "value": decode_issued_value(head),
    }))
}

fn encode_drops(drops: &str) -> Result<Vec<u8>, CodecError> {
    if drops.is_empty() || !drops.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CodecError::InvalidAmount(format!(
            "XRP amount must be a whole number of drops, got {drops:?}"
        )));
    }
    let value: u64 = drops
        .parse()
        .map_err(|_| CodecError::InvalidAmount(format!("{drops} drops is out of range")))?;
    if value > MAX_DROPS {
        return Err(CodecError::InvalidAmount(format!(
            "{drops} drops exceeds the XRP supply"
        )));
    }
    Ok((value | POSITIVE_BIT).to_be_bytes().to_vec())
}

/// Normalize a decimal string into the 64-bit issued-currency value.
fn encode_issued_value(text: &str) -> Result<u64, CodecError> {
    let invalid = || CodecError::InvalidAmount(format!("invalid issued value {text:?}"));

    let text = text.trim();
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    let (number, exp_part) = match unsigned.find(['e', 'E']) {
        Some(pos) => (&unsigned[..pos], Some(&unsigned[pos + 1..])),
        None => (unsigned, None),
    };
    let mut exponent: i32 = match exp_part {
        Some(e) => e.parse().map_err(|_| invalid())?,
        None => 0,
    };

    let (int_part, frac_part) = number.split_once('.').unwrap_or((number, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid());
    }
    if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let digits = format!("{int_part}{frac_part}");
    exponent -= frac_part.len() as i32;

    let significant = digits.trim_start_matches('0');
    let trimmed = significant.trim_end_matches('0');
    if trimmed.is_empty() {
        return Ok(ZERO_ISSUED);
    }
    exponent += (significant.len() - trimmed.len()) as i32;

    if trimmed.len() > MAX_PRECISION {
        return Err(CodecError::InvalidAmount(format!(
            "{text} has more than {MAX_PRECISION} significant digits"
        )));
    }

    let mut mantissa: u64 = trimmed.parse().map_err(|_| invalid())?;
    while mantissa < MIN_MANTISSA {
        mantissa *= 10;
        exponent -= 1;
    }
    debug_assert!(mantissa <= MAX_MANTISSA);

    if !(MIN_EXPONENT..=MAX_EXPONENT).contains(&exponent) {
        return Err(CodecError::InvalidAmount(format!(
            "{text} is outside the issued currency range"
        )));
    }

    let mut head = NOT_XRP_BIT | (((exponent + EXPONENT_BIAS) as u64) << 54) | mantissa;
    if !negative {
        head |= POSITIVE_BIT;
    }
    Ok(head)
}

fn decode_issued_value(head: u64) -> String {
    let mantissa = head & MANTISSA_MASK;
    if head == ZERO_ISSUED || mantissa == 0 {
        return "0".to_string();
    }
    let negative = head & POSITIVE_BIT == 0;
    let mut exponent = ((head >> 54) & 0xFF) as i32 - EXPONENT_BIAS;

    let full = mantissa.to_string();
    let digits = full.trim_end_matches('0');
    exponent += (full.len() - digits.len()) as i32;

    let body = if exponent >= 0 {
        format!("{digits}{}", "0".repeat(exponent as usize))
    } else {
        let point = digits.len() as i32 + exponent;
        if point > 0 {
            let (whole, frac) = digits.split_at(point as usize);
            format!("{whole}.{frac}")
        } else {
            format!("0.{}{digits}", "0".repeat((-point) as usize))
        }
    };

    if negative {
        format!("-{body}")
    } else {
        body
    }
}

fn encode_currency(code: &str) -> Result<[u8; 20], CodecError> {
    let mut out = [0u8; 20];
    if code.len() == 3 {
        if code == "XRP" || !code.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(CodecError::InvalidAmount(format!(
                "invalid currency code {code:?}"
            )));
        }
        out[12..15].copy_from_slice(code.as_bytes());
        return Ok(out);
    }
    if code.len() == 40 {
        hex::decode_to_slice(code, &mut out)
            .map_err(|e| CodecError::InvalidAmount(format!("invalid currency {code}: {e}")))?;
        return Ok(out);
    }
    Err(CodecError::InvalidAmount(format!(
        "currency must be 3 characters or 40 hex digits, got {code:?}"
    )))
}

fn decode_currency(bytes: &[u8; 20]) -> String {
    let standard = bytes[..12].iter().all(|&b| b == 0)
        && bytes[15..].iter().all(|&b| b == 0)
        && bytes[12..15].iter().all(|b| b.is_ascii_graphic());
    if standard {
        // ASCII was checked above
        return bytes[12..15].iter().map(|&b| b as char).collect();
    }
    hex::encode_upper(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISSUER: &str = "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh";

    #[test]
    fn xrp_drops() {
        assert_eq!(
            encode_amount(&json!("12")).unwrap(),
            0x4000_0000_0000_000Cu64.to_be_bytes().to_vec()
        );
        assert_eq!(
            encode_amount(&json!("0")).unwrap(),
            0x4000_0000_0000_0000u64.to_be_bytes().to_vec()
        );
        assert!(encode_amount(&json!("1.5")).is_err());
        assert!(encode_amount(&json!("-1")).is_err());
        assert!(encode_amount(&json!("100000000000000001")).is_err());
    }

    #[test]
    fn issued_one_usd() {
        let bytes = encode_amount(&json!({
            "currency": "USD",
            "issuer": ISSUER,
            "value": "1"
        }))
        .unwrap();
        assert_eq!(bytes.len(), 48);
        assert_eq!(hex::encode_upper(&bytes[..8]), "D4838D7EA4C68000");
        assert_eq!(hex::encode_upper(&bytes[8..28]), "0000000000000000000000005553440000000000");
    }

    #[test]
    fn issued_value_normalization() {
        assert_eq!(encode_issued_value("0").unwrap(), ZERO_ISSUED);
        assert_eq!(encode_issued_value("0.000").unwrap(), ZERO_ISSUED);
        assert_eq!(
            encode_issued_value("1").unwrap(),
            encode_issued_value("1.000").unwrap()
        );
        assert_eq!(
            encode_issued_value("1e2").unwrap(),
            encode_issued_value("100").unwrap()
        );
        let negative = encode_issued_value("-1").unwrap();
        assert_eq!(negative & POSITIVE_BIT, 0);
        assert!(encode_issued_value("12345678901234567").is_err());
        assert!(encode_issued_value("1e200").is_err());
        assert!(encode_issued_value("abc").is_err());
        assert!(encode_issued_value(".").is_err());
    }

    #[test]
    fn issued_value_formatting() {
        for text in ["1", "0.5", "-25.75", "1000000", "0.000001", "1234567890123456"] {
            let head = encode_issued_value(text).unwrap();
            assert_eq!(decode_issued_value(head), text);
        }
    }

    #[test]
    fn currency_codes() {
        assert!(encode_currency("XRP").is_err());
        assert!(encode_currency("US").is_err());
        let hex_code = "0158415500000000C1F76FF6ECB0BAC600000000";
        assert_eq!(decode_currency(&encode_currency(hex_code).unwrap()), hex_code);
        assert_eq!(decode_currency(&encode_currency("EUR").unwrap()), "EUR");
    }
}
