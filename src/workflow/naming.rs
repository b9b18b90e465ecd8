//! Resource name generation
//!
//! Names are 4 to 30 characters from `[a-z0-9-]` and start with a lowercase
//! letter. The same prefix, account and timestamp always give the same name.

pub const MIN_LEN: usize = 4;
pub const MAX_LEN: usize = 30;

const MAX_PREFIX_LEN: usize = 12;
const DEFAULT_PREFIX: &str = "app";

/// Lower-case, map everything outside `[a-z0-9]` to `-`, collapse dashes
fn clean(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars().flat_map(char::to_lowercase) {
        let c = if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '-' };
        if c == '-' && (out.is_empty() || out.ends_with('-')) {
            continue;
        }
        out.push(c);
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    let mut out: String = s.chars().take(max).collect();
    while out.ends_with('-') {
        out.pop();
    }
    out
}

pub fn is_valid(name: &str) -> bool {
    (MIN_LEN..=MAX_LEN).contains(&name.len())
        && name.starts_with(|c: char| c.is_ascii_lowercase())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// `<prefix>-<user>-<last six digits of timestamp>`, shortened to fit
pub fn resource_name(prefix: &str, account_id: &str, timestamp: u64) -> String {
    let mut prefix = truncate(&clean(prefix), MAX_PREFIX_LEN);
    if prefix.is_empty() {
        prefix = DEFAULT_PREFIX.to_string();
    } else if !prefix.starts_with(|c: char| c.is_ascii_lowercase()) {
        prefix = truncate(&format!("r{}", prefix), MAX_PREFIX_LEN);
    }

    let user: String = account_id
        .split('@')
        .next()
        .unwrap_or_default()
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect();
    let suffix = format!("{:06}", timestamp % 1_000_000);

    let budget = MAX_LEN - prefix.len() - suffix.len() - 2;
    let user = truncate(&user, budget);

    if user.is_empty() {
        format!("{}-{}", prefix, suffix)
    } else {
        format!("{}-{}-{}", prefix, user, suffix)
    }
}

/// Strictly shorter valid name derived from `current`, keeping its first
/// and last segments
pub fn fallback_name(current: &str) -> Option<String> {
    let mut segments = current.split('-').filter(|s| !s.is_empty());
    let first = segments.next()?;
    let last = segments.last().unwrap_or(first);
    let initial = first.chars().next()?;

    [format!("{}-{}", first, last), format!("{}{}", initial, last)]
        .iter()
        .map(|candidate| clean(candidate))
        .find(|candidate| candidate.len() < current.len() && is_valid(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_basic_shape() {
        let name = resource_name("app", "John.Doe@example.com", 1_700_000_123_456);
        assert_eq!(name, "app-johndoe-123456");
        assert!(is_valid(&name));
    }

    #[test]
    fn test_long_user_truncated() {
        let name = resource_name("app", "averyveryveryverylongusername@example.com", 42);
        assert_eq!(name.len(), MAX_LEN);
        assert!(name.ends_with("-000042"));
        assert!(is_valid(&name));
    }

    #[test]
    fn test_odd_prefix_normalised() {
        assert!(resource_name("9Lives!", "a@b.c", 1).starts_with("r9lives-"));
        assert!(resource_name("", "a@b.c", 1).starts_with("app-"));
        assert!(resource_name("--", "!!!@b.c", 1).starts_with("app-000001"));
    }

    #[test]
    fn test_fallback_is_shorter() {
        assert_eq!(fallback_name("app-johndoe-123456").as_deref(), Some("app-123456"));
        assert_eq!(fallback_name("a-123456").as_deref(), Some("a123456"));
        assert_eq!(fallback_name("abcd"), None);
    }

    #[quickcheck]
    fn prop_generated_names_are_valid(prefix: String, account: String, timestamp: u64) -> bool {
        is_valid(&resource_name(&prefix, &account, timestamp))
    }

    #[quickcheck]
    fn prop_generation_is_reproducible(prefix: String, account: String, timestamp: u64) -> bool {
        resource_name(&prefix, &account, timestamp) == resource_name(&prefix, &account, timestamp)
    }

    #[quickcheck]
    fn prop_fallback_strictly_shorter(prefix: String, account: String, timestamp: u64) -> bool {
        let name = resource_name(&prefix, &account, timestamp);
        match fallback_name(&name) {
            Some(short) => is_valid(&short) && short.len() < name.len(),
            None => false,
        }
    }
}
