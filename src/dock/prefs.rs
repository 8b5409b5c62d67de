//! Parsing for `defaults read com.apple.dock ...` output.

/// Tile size in points. `None` for anything that is not a positive number.
pub fn parse_tile_size(output: &str) -> Option<f64> {
    output
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|size| size.is_finite() && *size > 0.0)
}

/// Number of entries in a persisted dock array.
///
/// `defaults` prints arrays in the old-style plist form:
/// ```text
/// (
///         {
///         "tile-data" = { ... };
///         "tile-type" = "file-tile";
///     },
///         { ... }
/// )
/// ```
/// Entries are counted as the dictionaries opened directly inside the outer
/// parenthesis. A bare integer is accepted as-is.
pub fn count_plist_entries(output: &str) -> Option<usize> {
    let output = output.trim();
    if let Ok(count) = output.parse::<usize>() {
        return Some(count);
    }
    if !output.starts_with('(') {
        return None;
    }

    let mut depth = 0usize;
    let mut count = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for ch in output.chars() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '(' | '{' => {
                if ch == '{' && depth == 1 {
                    count += 1;
                }
                depth += 1;
            }
            ')' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }

    Some(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_APPS: &str = r#"(
        {
        GUID = 1234;
        "tile-data" =         {
            "file-label" = "Safari";
            "file-data" =             {
                "_CFURLString" = "file:///Applications/Safari.app/";
            };
        };
        "tile-type" = "file-tile";
    },
        {
        GUID = 5678;
        "tile-data" =         {
            "file-label" = "Notes {beta}";
        };
        "tile-type" = "file-tile";
    }
)"#;

    #[test]
    fn test_counts_top_level_dictionaries() {
        assert_eq!(count_plist_entries(TWO_APPS), Some(2));
    }

    #[test]
    fn test_braces_inside_strings_are_ignored() {
        assert_eq!(count_plist_entries(r#"( { a = "}{"; }, { b = "\"{"; } )"#), Some(2));
    }

    #[test]
    fn test_empty_array_and_plain_numbers() {
        assert_eq!(count_plist_entries("(\n)"), Some(0));
        assert_eq!(count_plist_entries("7\n"), Some(7));
        assert_eq!(count_plist_entries("garbage"), None);
    }

    #[test]
    fn test_tile_size() {
        assert_eq!(parse_tile_size("48\n"), Some(48.0));
        assert_eq!(parse_tile_size("36.5"), Some(36.5));
        assert_eq!(parse_tile_size("0"), None);
        assert_eq!(parse_tile_size("-3"), None);
        assert_eq!(parse_tile_size("big"), None);
        assert_eq!(parse_tile_size("NaN"), None);
    }
}
