/// Reader for the key=value settings format.
///
/// Follows the Java properties conventions that existing settings files rely on:
/// `key=value`, `key:value` or `key value`; full-line comments with `#` or `!`;
/// a trailing backslash continues the logical line; backslash escapes in keys and
/// values. On top of that a value may end with an inline comment introduced by
/// whitespace followed by `#`.

use std::collections::BTreeMap;
use std::path::Path;

use crate::errors::NedsimError;

/// Parsed key/value pairs. A repeated key keeps its last value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    pub fn parse(text: &str) -> Self {
        let mut entries = BTreeMap::new();
        for line in logical_lines(text) {
            let (key, value) = split_entry(&line);
            if key.is_empty() {
                continue;
            }
            entries.insert(key, value);
        }
        Properties { entries }
    }

    /// Read and parse a file. The caller decides what a missing file means.
    pub fn load(path: &Path) -> Result<Self, NedsimError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| NedsimError::Io(format!("{}: {}", path.display(), e)))?;
        Ok(Self::parse(&text))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for Properties {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Properties {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Join physical lines into logical ones, dropping blanks and comments.
fn logical_lines(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut pending: Option<String> = None;

    for raw in text.lines() {
        let line = raw.trim_start();
        let mut current = match pending.take() {
            Some(mut acc) => {
                acc.push_str(line);
                acc
            }
            None => {
                if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                    continue;
                }
                line.to_string()
            }
        };

        if ends_with_continuation(&current) {
            current.pop();
            pending = Some(current);
        } else {
            out.push(current);
        }
    }
    if let Some(rest) = pending {
        out.push(rest);
    }
    out
}

/// An odd number of trailing backslashes means the last one escapes the newline.
fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

fn split_entry(line: &str) -> (String, String) {
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;
    let mut key_end = chars.len();
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '=' | ':' => {
                key_end = i;
                break;
            }
            c if c.is_whitespace() => {
                key_end = i;
                break;
            }
            _ => i += 1,
        }
    }
    let key_end = key_end.min(chars.len());
    let raw_key: String = chars[..key_end].iter().collect();

    let mut j = key_end;
    while j < chars.len() && chars[j].is_whitespace() {
        j += 1;
    }
    if j < chars.len() && (chars[j] == '=' || chars[j] == ':') {
        j += 1;
        while j < chars.len() && chars[j].is_whitespace() {
            j += 1;
        }
    }
    let raw_value: String = chars[j.min(chars.len())..].iter().collect();

    (unescape(&raw_key), unescape(strip_inline_comment(&raw_value)))
}

fn strip_inline_comment(value: &str) -> &str {
    let bytes = value.as_bytes();
    for (idx, b) in bytes.iter().enumerate() {
        if *b == b'#' && idx > 0 && bytes[idx - 1].is_ascii_whitespace() {
            return value[..idx].trim_end();
        }
    }
    value.trim_end()
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{0C}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push('u');
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_separators() {
        let props = Properties::parse("a=1\nb:2\nc 3\n  d = 4  \n");
        assert_eq!(props.get("a"), Some("1"));
        assert_eq!(props.get("b"), Some("2"));
        assert_eq!(props.get("c"), Some("3"));
        assert_eq!(props.get("d"), Some("4"));
        assert_eq!(props.len(), 4);
    }

    #[test]
    fn test_comments_and_blank_lines_skipped() {
        let props = Properties::parse("# header\n! bang comment\n\nkey=value\n");
        assert_eq!(props.len(), 1);
        assert_eq!(props.get("key"), Some("value"));
    }

    #[test]
    fn test_value_keeps_colons() {
        let props = Properties::parse("mentionEntitySimilarities=A,i:B:0.5 C:D:0.5");
        assert_eq!(props.get("mentionEntitySimilarities"), Some("A,i:B:0.5 C:D:0.5"));
    }

    #[test]
    fn test_inline_comment_stripped() {
        let props = Properties::parse("priorThreshold=-1.0               # -1.0 = unset");
        assert_eq!(props.get("priorThreshold"), Some("-1.0"));
    }

    #[test]
    fn test_hash_inside_value_kept() {
        let props = Properties::parse("lshDatabaseTable=table#1");
        assert_eq!(props.get("lshDatabaseTable"), Some("table#1"));
    }

    #[test]
    fn test_line_continuation() {
        let props = Properties::parse("list=A:1 \\\n    B:2 \\\n    C:3\nnext=x");
        assert_eq!(props.get("list"), Some("A:1 B:2 C:3"));
        assert_eq!(props.get("next"), Some("x"));
    }

    #[test]
    fn test_escaped_backslash_is_not_continuation() {
        let props = Properties::parse("path=C:\\\\\nother=1");
        assert_eq!(props.get("path"), Some("C:\\"));
        assert_eq!(props.get("other"), Some("1"));
    }

    #[test]
    fn test_escaped_separator_in_key() {
        let props = Properties::parse("a\\=b=c");
        assert_eq!(props.get("a=b"), Some("c"));
    }

    #[test]
    fn test_last_duplicate_wins() {
        let props = Properties::parse("k=1\nk=2");
        assert_eq!(props.get("k"), Some("2"));
    }

    #[test]
    fn test_key_without_value() {
        let props = Properties::parse("flag");
        assert_eq!(props.get("flag"), Some(""));
    }
}
