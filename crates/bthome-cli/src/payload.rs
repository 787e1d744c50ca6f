//! Payload argument parsing.
//!
//! Accepts the two byte notations that show up in the wild: hex strings
//! (`400164`, `40 01 64`, `0x40,0x01,0x64`, colon-separated) and
//! comma-separated decimal byte lists, including the signed-byte form many
//! packet dumps use (`64, 2, -54, 9`).

use anyhow::{bail, Context, Result};

/// Parse a payload argument into bytes.
pub fn parse(input: &str) -> Result<Vec<u8>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if trimmed.contains(',') && !trimmed.contains("0x") && !trimmed.contains("0X") {
        return parse_decimal_list(trimmed);
    }
    parse_hex(trimmed)
}

fn parse_decimal_list(input: &str) -> Result<Vec<u8>> {
    input
        .split(',')
        .map(|token| {
            let token = token.trim();
            let value: i16 = token
                .parse()
                .with_context(|| format!("invalid decimal byte: {token:?}"))?;
            if !(-128..=255).contains(&value) {
                bail!("byte value out of range: {value}");
            }
            Ok(value as u8)
        })
        .collect()
}

fn parse_hex(input: &str) -> Result<Vec<u8>> {
    let cleaned: String = input
        .split(|c: char| c.is_whitespace() || c == ':' || c == ',')
        .map(|token| token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")).unwrap_or(token))
        .collect();
    hex::decode(&cleaned).with_context(|| format!("invalid hex payload: {input:?}"))
}
