//! Path syntax shared by templates, the store and the tracker.
//!
//! Paths are dotted identifiers (`a.b.c`). Repeated-element indices are a
//! bracketed suffix on the repeated segment (`a[2].b`, `m[0][1]`). Store keys
//! prefix the path with its resource: `input:a[2].b`.

/// Separates nested identifiers inside a path.
pub const PATH_DELIMITER: char = '.';

/// Separates the resource from the path inside a store key.
pub const RESOURCE_DELIMITER: char = ':';

/// Join a path prefix and a key. Empty parts are skipped.
pub fn join_path(prefix: &str, key: &str) -> String {
    match (prefix.is_empty(), key.is_empty()) {
        (true, _) => key.to_string(),
        (_, true) => prefix.to_string(),
        _ => format!("{prefix}{PATH_DELIMITER}{key}"),
    }
}

/// Append a repeated-element index to a path.
pub fn index_path(path: &str, index: usize) -> String {
    format!("{path}[{index}]")
}

/// Build the store key for a resource and path.
pub fn resource_key(resource: &str, path: &str) -> String {
    format!("{resource}{RESOURCE_DELIMITER}{path}")
}

/// Identifiers must be non-empty and free of path syntax.
pub fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|c| matches!(c, '.' | '[' | ']' | ':') || c.is_whitespace())
}

/// Remove every bracketed index: `a[0].b[12]` becomes `a.b`.
pub fn strip_indices(path: &str) -> String {
    let mut result = String::with_capacity(path.len());
    let mut depth = 0usize;

    for c in path.chars() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            _ if depth == 0 => result.push(c),
            _ => {}
        }
    }

    result
}

/// Every `(prefix, index)` pair embedded in a key.
///
/// `input:a[1].b[2]` yields `("input:a", 1)` and `("input:a[1].b", 2)`.
/// Malformed brackets are skipped.
pub fn indexed_prefixes(key: &str) -> Vec<(&str, usize)> {
    let mut result = Vec::new();
    let mut position = 0;

    while let Some(offset) = key[position..].find('[') {
        let open = position + offset;
        let Some(close) = key[open..].find(']').map(|c| open + c) else {
            break;
        };

        if let Ok(index) = key[open + 1..close].parse::<usize>() {
            result.push((&key[..open], index));
        }

        position = close + 1;
    }

    result
}

/// Dotted ancestors of a path, excluding the path itself.
///
/// `a.b.c` yields `a` and `a.b`.
pub fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    path.match_indices(PATH_DELIMITER)
        .map(move |(position, _)| &path[..position])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("", "name"), "name");
        assert_eq!(join_path("user", ""), "user");
        assert_eq!(join_path("user", "name"), "user.name");
        assert_eq!(join_path("list[0]", "value"), "list[0].value");
    }

    #[test]
    fn test_identifiers() {
        assert!(is_identifier("name"));
        assert!(is_identifier("user_id"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("a.b"));
        assert!(!is_identifier("a[0]"));
        assert!(!is_identifier("input:a"));
    }

    #[test]
    fn test_strip_indices() {
        assert_eq!(strip_indices("outer[0].inner[12].value"), "outer.inner.value");
        assert_eq!(strip_indices("m[0][1]"), "m");
        assert_eq!(strip_indices("plain.path"), "plain.path");
    }

    #[test]
    fn test_indexed_prefixes() {
        let prefixes = indexed_prefixes("input:outer[1].inner[2].value");
        assert_eq!(prefixes, vec![("input:outer", 1), ("input:outer[1].inner", 2)]);

        let nested = indexed_prefixes("input:m[0][3]");
        assert_eq!(nested, vec![("input:m", 0), ("input:m[0]", 3)]);

        assert!(indexed_prefixes("input:name").is_empty());
        assert!(indexed_prefixes("input:broken[x]").is_empty());
    }

    #[test]
    fn test_ancestors() {
        let all: Vec<_> = ancestors("a.b.c").collect();
        assert_eq!(all, vec!["a", "a.b"]);
        assert_eq!(ancestors("single").count(), 0);
    }
}
