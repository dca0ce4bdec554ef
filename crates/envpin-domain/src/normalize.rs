/// Normalize a package name for matching manifest entries against installed
/// records.
///
/// Lowercases ASCII and collapses every run of `-`, `_`, `.` into a single
/// `-`, so `Package_Name`, `package.name` and `package--name` all compare
/// equal. The same function is applied to both sides of every comparison.
pub fn normalize_package_name(name: &str) -> String {
    let trimmed = strip_wrapping_quotes(name.trim());
    let mut normalized = String::with_capacity(trimmed.len());
    let mut in_separator = false;
    for ch in trimmed.chars() {
        if matches!(ch, '-' | '_' | '.') {
            if !in_separator {
                normalized.push('-');
                in_separator = true;
            }
            continue;
        }
        in_separator = false;
        normalized.push(ch.to_ascii_lowercase());
    }
    normalized
}

pub(crate) fn strip_wrapping_quotes(input: &str) -> &str {
    if input.len() >= 2 {
        let bytes = input.as_bytes();
        let first = bytes[0];
        let last = bytes[input.len() - 1];
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return &input[1..input.len() - 1];
        }
    }
    input
}

pub(crate) fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.')
}
