//! Unique client/plugin name derivation.
//!
//! Produces stable, human-readable names without a global counter: the first
//! collision gets " (2)" appended, later collisions bump the suffix.

/// Derive a name not present in `existing`.
///
/// The base is truncated so a two-digit suffix still fits in
/// `max_client_name_size` characters, and `':'` is replaced with `'.'`
/// (reserved by some drivers to split client and port names). An empty base
/// becomes `"(No name)"`.
pub fn unique_plugin_name<'a>(
    base: &str,
    existing: impl Iterator<Item = &'a str> + Clone,
    max_client_name_size: usize,
) -> String {
    if base.is_empty() {
        return "(No name)".to_owned();
    }

    // 6 = length of " (10)" plus the terminator slot the limit accounts for
    let keep = max_client_name_size.saturating_sub(6).max(1);
    let mut name: String = base.chars().take(keep).collect();
    name = name.replace(':', ".");

    loop {
        if !existing.clone().any(|n| n == name) {
            return name;
        }

        name = bump_suffix(&name);
    }
}

/// `"x"` -> `"x (2)"`, `"x (9)"` -> `"x (10)"`, `"x (23)"` -> `"x (24)"`.
fn bump_suffix(name: &str) -> String {
    if let Some((stem, digits)) = split_numbered_suffix(name) {
        return format!("{stem} ({})", digits + 1);
    }

    format!("{name} (2)")
}

/// Split a trailing " (N)" with one or two decimal digits.
fn split_numbered_suffix(name: &str) -> Option<(&str, u32)> {
    let rest = name.strip_suffix(')')?;
    let open = rest.rfind(" (")?;
    let digits = &rest[open + 2..];

    if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    Some((&rest[..open], digits.parse().ok()?))
}
