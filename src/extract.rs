//! Text extraction from OCR tool output files
//!
//! Plain text files are used verbatim. JSON files hold the text somewhere
//! tool-specific; an [`ExtractionRule`] says where and whether the value is
//! still string-escaped.

use crate::error::EvalError;
use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;

/// How a file's content is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Text,
    Json,
}

impl PayloadKind {
    /// Determine the payload kind from the file extension
    pub fn from_path(path: &Path) -> Result<Self, EvalError> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "txt" | "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "" => Err(EvalError::UnsupportedFormat(format!(
                "{} has no file extension",
                path.display()
            ))),
            other => Err(EvalError::UnsupportedFormat(format!(".{}", other))),
        }
    }
}

/// Where the text lives inside a tool's JSON output
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ExtractionRule {
    /// The document itself is a JSON string
    #[default]
    Root,
    /// A string at the given field path
    Field { path: Vec<String> },
    /// A string at the given field path that is itself an escaped literal,
    /// e.g. `"\"line one\\nline two\""`
    EscapedField { path: Vec<String> },
}

impl ExtractionRule {
    pub fn field(path: &[&str]) -> Self {
        Self::Field {
            path: path.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn escaped_field(path: &[&str]) -> Self {
        Self::EscapedField {
            path: path.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn path(&self) -> &[String] {
        match self {
            Self::Root => &[],
            Self::Field { path } | Self::EscapedField { path } => path,
        }
    }
}

impl fmt::Display for ExtractionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => write!(f, "root"),
            Self::Field { path } => write!(f, "field {}", path.join(".")),
            Self::EscapedField { path } => write!(f, "escaped field {}", path.join(".")),
        }
    }
}

/// Read a file and extract its text payload
///
/// The extension is checked before the file is opened, so unsupported
/// formats fail without touching the filesystem.
pub fn read_payload(
    path: &Path,
    rule: &ExtractionRule,
    encoding: &'static Encoding,
) -> Result<String, EvalError> {
    let kind = PayloadKind::from_path(path)?;
    let bytes = std::fs::read(path).map_err(|e| EvalError::read(path, e))?;

    let (text, _, had_errors) = encoding.decode(&bytes);
    if had_errors {
        return Err(EvalError::Decode {
            path: path.display().to_string(),
            encoding: encoding.name().to_string(),
        });
    }

    match kind {
        PayloadKind::Text => Ok(text.into_owned()),
        PayloadKind::Json => {
            let value: Value = serde_json::from_str(&text).map_err(|e| {
                EvalError::MalformedPayload(format!("{}: invalid JSON: {}", path.display(), e))
            })?;
            extract_text(&value, rule, path)
        }
    }
}

/// Apply an extraction rule to a parsed JSON document
pub fn extract_text(
    value: &Value,
    rule: &ExtractionRule,
    origin: &Path,
) -> Result<String, EvalError> {
    let mut current = value;

    for (depth, segment) in rule.path().iter().enumerate() {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };

        current = next.ok_or_else(|| {
            EvalError::MalformedPayload(format!(
                "{}: field path `{}` not found",
                origin.display(),
                rule.path()[..=depth].join(".")
            ))
        })?;
    }

    let text = current.as_str().ok_or_else(|| {
        EvalError::MalformedPayload(format!(
            "{}: expected a string at {}, found {}",
            origin.display(),
            rule,
            json_type_name(current)
        ))
    })?;

    match rule {
        ExtractionRule::EscapedField { .. } => Ok(unescape_literal(text)),
        _ => Ok(text.to_string()),
    }
}

/// Turn a string-escaped literal back into the text it represents
///
/// Accepts a JSON-quoted string (`"a\nb"`), a single-quoted literal
/// (`'a\nb'`), or a bare escaped body (`a\nb`). Unknown escape sequences are
/// kept as written.
pub fn unescape_literal(raw: &str) -> String {
    let trimmed = raw.trim();

    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        if let Ok(decoded) = serde_json::from_str::<String>(trimmed) {
            return decoded;
        }
        return unescape_body(&trimmed[1..trimmed.len() - 1]);
    }

    if trimmed.len() >= 2 && trimmed.starts_with('\'') && trimmed.ends_with('\'') {
        return unescape_body(&trimmed[1..trimmed.len() - 1]);
    }

    unescape_body(raw)
}

fn unescape_body(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('v') => out.push('\x0b'),
            Some('b') => out.push('\x08'),
            Some('a') => out.push('\x07'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some(marker @ ('x' | 'u' | 'U')) => {
                let width = match marker {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let hex: String = chars.clone().take(width).collect();
                let decoded = (hex.len() == width && hex.chars().all(|h| h.is_ascii_hexdigit()))
                    .then(|| u32::from_str_radix(&hex, 16).ok())
                    .flatten()
                    .and_then(char::from_u32);
                match decoded {
                    Some(decoded) => {
                        out.push(decoded);
                        for _ in 0..width {
                            chars.next();
                        }
                    }
                    None => {
                        out.push('\\');
                        out.push(marker);
                    }
                }
            }
            Some(first @ '0'..='7') => {
                // Up to three octal digits
                let mut code = first.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(digit) => {
                            code = code * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{UTF_8, WINDOWS_1252};
    use proptest::prelude::*;
    use serde_json::json;
    use std::io::Write;

    fn origin() -> &'static Path {
        Path::new("sample.json")
    }

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents).unwrap();
        path
    }

    #[test]
    fn test_payload_kind_from_extension() {
        assert_eq!(PayloadKind::from_path(Path::new("a.txt")).unwrap(), PayloadKind::Text);
        assert_eq!(PayloadKind::from_path(Path::new("a.TEXT")).unwrap(), PayloadKind::Text);
        assert_eq!(PayloadKind::from_path(Path::new("a.Json")).unwrap(), PayloadKind::Json);
    }

    #[test]
    fn test_unknown_extension_is_unsupported() {
        let err = PayloadKind::from_path(Path::new("scan.pdf")).unwrap_err();
        assert!(matches!(err, EvalError::UnsupportedFormat(ref ext) if ext == ".pdf"));

        let err = PayloadKind::from_path(Path::new("README")).unwrap_err();
        assert!(matches!(err, EvalError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_extract_root_string() {
        let value = json!("whole document");
        let text = extract_text(&value, &ExtractionRule::Root, origin()).unwrap();
        assert_eq!(text, "whole document");
    }

    #[test]
    fn test_extract_nested_field_with_array_index() {
        let value = json!({"result": [{"ocr-result": "first"}, {"ocr-result": "second"}]});
        let rule = ExtractionRule::field(&["result", "1", "ocr-result"]);
        assert_eq!(extract_text(&value, &rule, origin()).unwrap(), "second");
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let value = json!({"filename": "a.pdf"});
        let rule = ExtractionRule::field(&["ocr-result"]);
        let err = extract_text(&value, &rule, origin()).unwrap_err();
        match err {
            EvalError::MalformedPayload(msg) => assert!(msg.contains("ocr-result")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_non_string_leaf_is_malformed() {
        let value = json!({"ocr-result": ["line one", "line two"]});
        let rule = ExtractionRule::field(&["ocr-result"]);
        let err = extract_text(&value, &rule, origin()).unwrap_err();
        match err {
            EvalError::MalformedPayload(msg) => assert!(msg.contains("an array")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_escaped_field_quoted_literal() {
        let value = json!({"ocr-result": "\"# Title\\n\\nBody text\""});
        let rule = ExtractionRule::escaped_field(&["ocr-result"]);
        assert_eq!(
            extract_text(&value, &rule, origin()).unwrap(),
            "# Title\n\nBody text"
        );
    }

    #[test]
    fn test_unescape_bare_and_single_quoted() {
        assert_eq!(unescape_literal("line one\\nline two"), "line one\nline two");
        assert_eq!(unescape_literal("'it\\'s\\tfine'"), "it's\tfine");
        assert_eq!(unescape_literal("caf\\u00e9"), "café");
        // Unknown escapes survive untouched
        assert_eq!(unescape_literal("C:\\data"), "C:\\data");
        assert_eq!(unescape_literal("trailing\\"), "trailing\\");
    }

    #[test]
    fn test_unescape_python_repr_escapes() {
        assert_eq!(unescape_literal("'a\\x0cb'"), "a\x0cb");
        assert_eq!(unescape_literal("'\\U0001F600 \\f\\v\\b'"), "\u{1F600} \x0c\x0b\x08");
        assert_eq!(unescape_literal("'\\0 \\101\\12'"), "\0 A\n");
        // Truncated hex escapes are kept as written
        assert_eq!(unescape_literal("'\\xg1'"), "\\xg1");
    }

    #[test]
    fn test_read_plain_text_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "gt.txt", b"  Patient note\nline 2\n");
        let text = read_payload(&path, &ExtractionRule::Root, UTF_8).unwrap();
        assert_eq!(text, "  Patient note\nline 2\n");
    }

    #[test]
    fn test_read_with_legacy_encoding() {
        let dir = tempfile::tempdir().unwrap();
        // "café" in Windows-1252
        let path = write_file(&dir, "gt.txt", &[0x63, 0x61, 0x66, 0xE9]);
        assert_eq!(read_payload(&path, &ExtractionRule::Root, WINDOWS_1252).unwrap(), "café");

        let err = read_payload(&path, &ExtractionRule::Root, UTF_8).unwrap_err();
        assert!(matches!(err, EvalError::Decode { .. }));
    }

    #[test]
    fn test_read_invalid_json_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "out.json", b"{not json");
        let err = read_payload(&path, &ExtractionRule::Root, UTF_8).unwrap_err();
        assert!(matches!(err, EvalError::MalformedPayload(_)));
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_payload(Path::new("/nonexistent/gt.txt"), &ExtractionRule::Root, UTF_8)
            .unwrap_err();
        assert!(matches!(err, EvalError::Read { .. }));
    }

    #[test]
    fn test_rule_deserializes_from_tagged_toml() {
        let rule: ExtractionRule =
            toml::from_str("kind = \"escaped-field\"\npath = [\"ocr-result\"]").unwrap();
        assert_eq!(rule, ExtractionRule::escaped_field(&["ocr-result"]));
    }

    proptest! {
        #[test]
        fn proptest_escaped_multiline_round_trip(lines in prop::collection::vec("\\PC{0,30}", 1..6)) {
            let original = lines.join("\n");
            // Marker-style payload: the text is JSON-encoded, then stored in a JSON field
            let escaped = serde_json::to_string(&original).unwrap();
            let document = json!({ "ocr-result": escaped }).to_string();

            let value: Value = serde_json::from_str(&document).unwrap();
            let rule = ExtractionRule::escaped_field(&["ocr-result"]);
            prop_assert_eq!(extract_text(&value, &rule, origin()).unwrap(), original);
        }
    }
}
