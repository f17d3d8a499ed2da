//! Mapping from entity keys to output file names.
//!
//! Keys are free-form strings such as `"orders/eu/2024"`. A file name is built
//! from the collection prefix, the path-safe separator and the escaped key:
//!
//! | key        | file name (collection `sales`, defaults) |
//! |------------|------------------------------------------|
//! | `""`       | `sales.csv`                              |
//! | `"orders"` | `sales---orders.csv`                     |
//! | `"a/b/c"`  | `sales---a---b_c.csv`                    |
//!
//! Escaping replaces only the *first* logical separator with the safe
//! separator; every remaining `/` or `\` then becomes `_`.

/// Escape an entity key for use inside a file name.
///
/// ```
/// use keyed_csv_sink::naming::escape_key;
///
/// assert_eq!(escape_key("a/b/c", "/", "---"), "a---b_c");
/// assert_eq!(escape_key(r"x\y", "/", "---"), "x_y");
/// ```
#[must_use]
pub fn escape_key(key: &str, separator: &str, safe_separator: &str) -> String {
    key.replacen(separator, safe_separator, 1)
        .replace(['/', '\\'], "_")
}

/// File name (without directory) for `key`.
///
/// `extension` is appended after `.csv`, e.g. `".gz"`; pass `""` for plain files.
///
/// ```
/// use keyed_csv_sink::naming::file_name_for_key;
///
/// assert_eq!(file_name_for_key("sales", "", "/", "---", ""), "sales.csv");
/// assert_eq!(file_name_for_key("sales", "eu", "/", "---", ""), "sales---eu.csv");
/// assert_eq!(file_name_for_key("sales", "eu", "/", "---", ".gz"), "sales---eu.csv.gz");
/// ```
#[must_use]
pub fn file_name_for_key(
    collection: &str,
    key: &str,
    separator: &str,
    safe_separator: &str,
    extension: &str,
) -> String {
    if key.is_empty() {
        format!("{collection}.csv{extension}")
    } else {
        let escaped = escape_key(key, separator, safe_separator);
        format!("{collection}{safe_separator}{escaped}.csv{extension}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_separator_only() {
        assert_eq!(escape_key("a/b/c", "/", "---"), "a---b_c");
    }

    #[test]
    fn custom_separator_then_slashes() {
        assert_eq!(escape_key("a.b/c.d", ".", "__"), "a__b_c.d");
        assert_eq!(escape_key(r"a::b\c", "::", "~"), "a~b_c");
    }

    #[test]
    fn key_without_separator_is_unchanged() {
        assert_eq!(escape_key("plain", "/", "---"), "plain");
    }

    #[test]
    fn escaping_is_deterministic() {
        let once = escape_key("x/y/z", "/", "---");
        assert_eq!(once, escape_key("x/y/z", "/", "---"));
        assert_eq!(escape_key(&once, "/", "---"), once);
    }

    #[test]
    fn empty_key_uses_bare_collection() {
        assert_eq!(file_name_for_key("c", "", "/", "---", ""), "c.csv");
    }
}
