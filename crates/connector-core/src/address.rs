//! Hierarchical payment addresses.
//!
//! Format: `<scheme>.<segment>[.<segment>...]`, e.g. `test.alice.wallet`.
//! Routing works on raw string prefixes of these addresses; the helpers here
//! only check well-formedness.

use crate::error::CoreError;

/// Allocation schemes an address may start with.
pub const SCHEMES: &[&str] = &[
    "g", "private", "example", "peer", "self", "test", "test1", "test2", "test3", "local",
];

/// Maximum length of an address in bytes.
pub const MAX_ADDRESS_LENGTH: usize = 1023;

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '~' | '-'))
}

/// Validate a full destination address: a known scheme followed by at least
/// one segment.
pub fn validate_address(address: &str) -> Result<(), CoreError> {
    if address.len() > MAX_ADDRESS_LENGTH {
        return Err(CoreError::InvalidAddress(format!(
            "address exceeds {} bytes: {}",
            MAX_ADDRESS_LENGTH,
            address.len()
        )));
    }
    let mut segments = address.split('.');
    let scheme = segments.next().unwrap_or_default();
    if !SCHEMES.contains(&scheme) {
        return Err(CoreError::InvalidAddress(format!(
            "unknown allocation scheme '{}' in {}",
            scheme, address
        )));
    }
    let mut count = 0;
    for segment in segments {
        if !is_valid_segment(segment) {
            return Err(CoreError::InvalidAddress(format!(
                "invalid segment '{}' in {}",
                segment, address
            )));
        }
        count += 1;
    }
    if count == 0 {
        return Err(CoreError::InvalidAddress(format!(
            "address must have at least one segment after the scheme: {}",
            address
        )));
    }
    Ok(())
}

/// Validate a routing prefix. The empty prefix (default route) and a bare
/// scheme are accepted.
pub fn validate_prefix(prefix: &str) -> Result<(), CoreError> {
    if prefix.is_empty() || SCHEMES.contains(&prefix) {
        return Ok(());
    }
    validate_address(prefix)
}
