// SPDX-FileCopyrightText: 2025 wifidb contributors
// SPDX-License-Identifier: MIT

use std::collections::BTreeSet;

use crate::bssid::Bssid;

/// Strip everything that is not a hex digit and upper-case the rest.
pub fn clean_hex(text: &str) -> String {
    text.chars()
        .filter(char::is_ascii_hexdigit)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

fn is_decimal(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

fn parse_decimal(text: &str) -> Option<Bssid> {
    text.parse::<u64>().ok().and_then(Bssid::new)
}

fn parse_hex12(cleaned: &str) -> Option<Bssid> {
    if cleaned.len() != 12 {
        return None;
    }
    u64::from_str_radix(cleaned, 16).ok().and_then(Bssid::new)
}

/// Reduce free-form text to its canonical value.
///
/// Pure digit strings are decimal values. Anything else is reduced to its hex
/// digits and accepted when exactly twelve remain, so separated input such as
/// `00:11:22:33:44:55` is always read as hex.
pub fn decimal_of(text: &str) -> Option<Bssid> {
    let text = text.trim();
    if is_decimal(text) {
        return parse_decimal(text);
    }
    parse_hex12(&clean_hex(text))
}

/// Every canonical value the text could plausibly denote.
///
/// A bare twelve-digit string is ambiguous and yields both its decimal and its
/// hex reading.
pub fn candidate_decimals(text: &str) -> Vec<Bssid> {
    let text = text.trim();
    let mut candidates = Vec::with_capacity(2);
    if is_decimal(text)
        && let Some(bssid) = parse_decimal(text)
    {
        candidates.push(bssid);
    }
    if let Some(bssid) = parse_hex12(&clean_hex(text))
        && !candidates.contains(&bssid)
    {
        candidates.push(bssid);
    }
    candidates
}

/// Every textual encoding under which the input might be stored.
pub fn all_formats_of(text: &str) -> BTreeSet<String> {
    let mut formats = BTreeSet::new();
    let trimmed = text.trim();
    formats.insert(trimmed.to_owned());

    let cleaned = clean_hex(trimmed);
    if !cleaned.is_empty() {
        formats.insert(cleaned.to_ascii_lowercase());
        if let Some(bssid) = parse_hex12(&cleaned) {
            insert_hex_variants(&mut formats, bssid);
            formats.insert(bssid.as_u64().to_string());
        }
        formats.insert(cleaned);
    }

    if is_decimal(trimmed)
        && let Some(bssid) = parse_decimal(trimmed)
    {
        insert_hex_variants(&mut formats, bssid);
    }

    formats.remove("");
    formats
}

fn insert_hex_variants(formats: &mut BTreeSet<String>, bssid: Bssid) {
    let hex = bssid.to_hex();
    let colon = bssid.to_colon();
    let dash = bssid.to_dash();
    formats.insert(hex.to_ascii_lowercase());
    formats.insert(colon.to_ascii_lowercase());
    formats.insert(dash.to_ascii_lowercase());
    formats.insert(hex);
    formats.insert(colon);
    formats.insert(dash);
}

/// Colon-separated upper-case hex, e.g. `00:07:26:43:97:A3`.
pub fn to_display_form(bssid: Bssid) -> String {
    bssid.to_colon()
}

pub fn is_valid(text: &str) -> bool {
    decimal_of(text).is_some()
}
