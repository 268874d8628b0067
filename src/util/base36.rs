//! Base-36 helpers for segment and generation names.

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Render `value` in lowercase base 36.
pub fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::with_capacity(13);
    while value > 0 {
        buf.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    buf.reverse();
    // Only ASCII digits were pushed.
    String::from_utf8_lossy(&buf).into_owned()
}

/// Parse a lowercase or uppercase base-36 string.
///
/// Returns `None` for empty input, foreign characters or overflow.
pub fn from_base36(text: &str) -> Option<u64> {
    if text.is_empty() {
        return None;
    }
    let mut value: u64 = 0;
    for c in text.chars() {
        let digit = c.to_digit(36)? as u64;
        value = value.checked_mul(36)?.checked_add(digit)?;
    }
    Some(value)
}
