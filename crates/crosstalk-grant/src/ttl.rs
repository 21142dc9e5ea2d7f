//! Grant lifetime parsing

use std::time::Duration;

use crate::error::GrantError;

/// Parse a lifetime of the form `<integer><s|m|h|d>`, e.g. `30s`, `1h`.
///
/// The integer must fit in a `u32`; larger values are a tenant
/// misconfiguration, not a use case.
pub fn parse_ttl(input: &str) -> Result<Duration, GrantError> {
    let input = input.trim();
    let mut chars = input.chars();
    let unit = chars
        .next_back()
        .ok_or_else(|| GrantError::Invalid("empty ttl".to_string()))?;
    let digits = chars.as_str();

    let value: u32 = digits
        .parse()
        .map_err(|_| GrantError::Invalid(format!("bad ttl {:?}", input)))?;

    let secs = match unit {
        's' => u64::from(value),
        'm' => u64::from(value) * 60,
        'h' => u64::from(value) * 3600,
        'd' => u64::from(value) * 86_400,
        _ => return Err(GrantError::Invalid(format!("bad ttl unit {:?}", unit))),
    };

    Ok(Duration::from_secs(secs))
}
