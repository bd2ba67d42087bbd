//! ---
//! ems_section: "02-messaging-ipc-data-model"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Message framing and channel contracts for federates."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Decimal-text payload codec.
//!
//! SOC reports, voltages, and currents travel as decimal strings. Parsing is
//! strict: anything that is not a finite decimal number is rejected instead
//! of defaulting to zero.

use crate::CodecError;

/// Decode a numeric payload, tolerating surrounding ASCII whitespace only.
pub fn parse_number(payload: &[u8]) -> Result<f64, CodecError> {
    let text = std::str::from_utf8(payload).map_err(|_| CodecError::NotUtf8)?;
    parse_number_str(text)
}

/// Decode a numeric payload that is already text.
pub fn parse_number_str(text: &str) -> Result<f64, CodecError> {
    let trimmed = text.trim_matches(|c: char| c.is_ascii_whitespace());
    let value: f64 = trimmed.parse().map_err(|_| CodecError::NotNumeric {
        payload: text.to_owned(),
    })?;
    if !value.is_finite() {
        return Err(CodecError::NotFinite {
            payload: text.to_owned(),
        });
    }
    Ok(value)
}

/// Encode a number as the shortest decimal text that round-trips.
pub fn format_number(value: f64) -> String {
    value.to_string()
}
