// SPDX-FileCopyrightText: 2025 wifidb contributors
// SPDX-License-Identifier: MIT

//! Canonical forms of 48-bit hardware addresses (BSSIDs).
//!
//! Offline datasets store the same address as a decimal integer, as bare hex,
//! or colon/dash separated hex in either case. The canonical value is the
//! 48-bit integer ([`Bssid`]); every textual form is derived from it or reduced
//! to it.
//!
//! Parsing never fails loudly: [`decimal_of`] returns `None` and
//! [`all_formats_of`] silently drops candidates that do not parse, so callers
//! can match against inconsistently stored data without error handling.
//!
//! # Example
//!
//! ```
//! use wifidb_utils_mac::{decimal_of, to_display_form};
//!
//! let bssid = decimal_of("00-07-26-43-97-a3").unwrap();
//! assert_eq!(bssid.as_u64(), 0x0007_2643_97A3);
//! assert_eq!(to_display_form(bssid), "00:07:26:43:97:A3");
//! ```

mod bssid;
mod formats;

pub use bssid::{Bssid, MAX_BSSID, ParseBssidError};
pub use formats::{
    all_formats_of, candidate_decimals, clean_hex, decimal_of, is_valid, to_display_form,
};
