//! Key name validation shared by the settings loader and the input driver

/// Named keys the input driver knows how to press.
pub const SPECIAL_KEYS: &[&str] = &[
    "F1", "F2", "F3", "F4", "F5", "F6", "F7", "F8", "F9", "F10", "F11", "F12",
    "ESC", "ESCAPE", "ENTER", "RETURN", "SPACE", "TAB", "BACKSPACE",
    "UP", "DOWN", "LEFT", "RIGHT",
    "HOME", "END", "PAGEUP", "PAGEDOWN", "DELETE",
    "SHIFT", "CTRL", "CONTROL", "ALT", "CAPSLOCK",
];

/// Resolve a user-typed key name to its canonical upper-case form.
///
/// Accepts the named keys in [`SPECIAL_KEYS`] (case-insensitive) and any single
/// alphanumeric or punctuation character. Returns `None` for empty or unknown
/// names.
pub fn resolve_key(key_name: &str) -> Option<String> {
    let key_upper = key_name.trim().to_uppercase();
    if key_upper.is_empty() {
        return None;
    }

    if SPECIAL_KEYS.contains(&key_upper.as_str()) {
        return Some(key_upper);
    }

    let mut chars = key_upper.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_alphanumeric() || c.is_ascii_punctuation() => Some(key_upper),
        _ => None,
    }
}

/// Resolve an optional key: blank means "not configured".
///
/// `Ok(None)` for a blank name, `Err(name)` for a non-blank name that does not
/// resolve.
pub fn resolve_optional_key(key_name: &str) -> Result<Option<String>, String> {
    if key_name.trim().is_empty() {
        return Ok(None);
    }
    resolve_key(key_name)
        .map(Some)
        .ok_or_else(|| key_name.trim().to_string())
}
