//! Best-effort literal resolution for call arguments.
//!
//! Only literals written at the call site are resolved. Names, calls,
//! subscripts, f-strings with interpolation and every other expression
//! become [`LiteralValue::Unknown`].

use serde_json::Value;
use std::collections::BTreeMap;
use tree_sitter::Node as TSNode;

use crate::parsers::common::extract_text;

/// Marker emitted for values that could not be resolved statically.
pub const UNKNOWN: &str = "unknown";

/// Containers nested deeper than this resolve to `Unknown`.
pub const MAX_LITERAL_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Seq(Vec<LiteralValue>),
    Map(BTreeMap<String, LiteralValue>),
    Unknown,
}

impl LiteralValue {
    /// True when neither this value nor any nested element is `Unknown`.
    pub fn is_resolved(&self) -> bool {
        match self {
            LiteralValue::Unknown => false,
            LiteralValue::Seq(items) => items.iter().all(LiteralValue::is_resolved),
            LiteralValue::Map(items) => items.values().all(LiteralValue::is_resolved),
            _ => true,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            LiteralValue::Str(s) => Value::String(s.clone()),
            LiteralValue::Int(i) => Value::from(*i),
            LiteralValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(f.to_string())),
            LiteralValue::Bool(b) => Value::Bool(*b),
            LiteralValue::Seq(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            LiteralValue::Map(items) => Value::Object(
                items
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            LiteralValue::Unknown => Value::String(UNKNOWN.to_string()),
        }
    }

    /// Identity rendering; `None` unless fully resolved.
    pub fn render(&self) -> Option<String> {
        if !self.is_resolved() {
            return None;
        }
        match self {
            LiteralValue::Str(s) => Some(s.clone()),
            LiteralValue::Int(i) => Some(i.to_string()),
            LiteralValue::Float(f) => Some(f.to_string()),
            LiteralValue::Bool(b) => Some(b.to_string()),
            LiteralValue::Seq(_) | LiteralValue::Map(_) => Some(self.to_json().to_string()),
            LiteralValue::Unknown => None,
        }
    }
}

/// Resolve an expression node to a literal value.
pub fn resolve_literal(node: &TSNode, source: &[u8]) -> LiteralValue {
    resolve_at(node, source, 0)
}

fn resolve_at(node: &TSNode, source: &[u8], depth: usize) -> LiteralValue {
    if depth > MAX_LITERAL_DEPTH {
        return LiteralValue::Unknown;
    }
    match node.kind() {
        "string" => string_literal(node, source),
        "concatenated_string" => {
            let mut joined = String::new();
            for part in named_children(node) {
                match string_literal(&part, source) {
                    LiteralValue::Str(s) => joined.push_str(&s),
                    _ => return LiteralValue::Unknown,
                }
            }
            LiteralValue::Str(joined)
        }
        "integer" => parse_integer(extract_text(node, source)),
        "float" => parse_float(extract_text(node, source)),
        "true" => LiteralValue::Bool(true),
        "false" => LiteralValue::Bool(false),
        "unary_operator" => {
            let operator = node
                .child_by_field_name("operator")
                .map(|op| extract_text(&op, source))
                .unwrap_or_default();
            let operand = match node.child_by_field_name("argument") {
                Some(arg) => resolve_at(&arg, source, depth + 1),
                None => return LiteralValue::Unknown,
            };
            match (operator, operand) {
                ("-", LiteralValue::Int(i)) => i
                    .checked_neg()
                    .map(LiteralValue::Int)
                    .unwrap_or(LiteralValue::Unknown),
                ("-", LiteralValue::Float(f)) => LiteralValue::Float(-f),
                ("+", value @ (LiteralValue::Int(_) | LiteralValue::Float(_))) => value,
                _ => LiteralValue::Unknown,
            }
        }
        "parenthesized_expression" => match named_children(node).into_iter().next() {
            Some(inner) => resolve_at(&inner, source, depth + 1),
            None => LiteralValue::Unknown,
        },
        "list" | "tuple" | "set" => LiteralValue::Seq(
            named_children(node)
                .iter()
                .map(|item| resolve_at(item, source, depth + 1))
                .collect(),
        ),
        "dictionary" => dictionary_literal(node, source, depth),
        _ => LiteralValue::Unknown,
    }
}

fn named_children<'t>(node: &TSNode<'t>) -> Vec<TSNode<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

fn dictionary_literal(node: &TSNode, source: &[u8], depth: usize) -> LiteralValue {
    let mut entries = BTreeMap::new();
    for pair in named_children(node) {
        if pair.kind() != "pair" {
            return LiteralValue::Unknown;
        }
        let key = pair
            .child_by_field_name("key")
            .map(|k| resolve_at(&k, source, depth + 1));
        let value = pair
            .child_by_field_name("value")
            .map(|v| resolve_at(&v, source, depth + 1))
            .unwrap_or(LiteralValue::Unknown);
        match key {
            Some(LiteralValue::Str(k)) => {
                entries.insert(k, value);
            }
            _ => return LiteralValue::Unknown,
        }
    }
    LiteralValue::Map(entries)
}

fn string_literal(node: &TSNode, source: &[u8]) -> LiteralValue {
    if node.kind() != "string" {
        return LiteralValue::Unknown;
    }
    if named_children(node)
        .iter()
        .any(|child| child.kind() == "interpolation")
    {
        return LiteralValue::Unknown;
    }
    match decode_string(extract_text(node, source)) {
        Some(s) => LiteralValue::Str(s),
        None => LiteralValue::Unknown,
    }
}

/// Decode the source text of a Python string literal, prefix and quotes included.
pub fn decode_string(text: &str) -> Option<String> {
    let prefix_len = text
        .find(|c: char| c == '"' || c == '\'')
        .filter(|&i| text[..i].chars().all(|c| c.is_ascii_alphabetic()))?;
    let prefix = text[..prefix_len].to_ascii_lowercase();
    let quoted = &text[prefix_len..];

    let body = ["\"\"\"", "'''", "\"", "'"].iter().find_map(|quote| {
        let inner = quoted.strip_prefix(quote)?.strip_suffix(quote)?;
        Some(inner)
    })?;

    let mut decoded = if prefix.contains('r') {
        body.to_string()
    } else {
        unescape(body)
    };
    if prefix.contains('f') {
        decoded = decoded.replace("{{", "{").replace("}}", "}");
    }
    Some(decoded)
}

fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('\n') => {}
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn parse_integer(text: &str) -> LiteralValue {
    let cleaned = text.replace('_', "").to_ascii_lowercase();
    let parsed = if let Some(hex) = cleaned.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()
    } else if let Some(oct) = cleaned.strip_prefix("0o") {
        i64::from_str_radix(oct, 8).ok()
    } else if let Some(bin) = cleaned.strip_prefix("0b") {
        i64::from_str_radix(bin, 2).ok()
    } else {
        cleaned.parse::<i64>().ok()
    };
    parsed.map(LiteralValue::Int).unwrap_or(LiteralValue::Unknown)
}

fn parse_float(text: &str) -> LiteralValue {
    let cleaned = text.replace('_', "");
    if cleaned.ends_with(['j', 'J']) {
        return LiteralValue::Unknown;
    }
    match cleaned.parse::<f64>() {
        Ok(f) if f.is_finite() => LiteralValue::Float(f),
        _ => LiteralValue::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_quote_styles_and_prefixes() {
        assert_eq!(decode_string("\"gpt-4\"").as_deref(), Some("gpt-4"));
        assert_eq!(decode_string("'gpt-4'").as_deref(), Some("gpt-4"));
        assert_eq!(decode_string("\"\"\"multi\nline\"\"\"").as_deref(), Some("multi\nline"));
        assert_eq!(decode_string("r'C:\\data'").as_deref(), Some("C:\\data"));
        assert_eq!(decode_string("'a\\tb'").as_deref(), Some("a\tb"));
        assert_eq!(decode_string("f'{{literal}}'").as_deref(), Some("{literal}"));
        assert_eq!(decode_string("name"), None);
    }

    #[test]
    fn integers_and_floats_follow_python_spelling() {
        assert_eq!(parse_integer("1_000"), LiteralValue::Int(1000));
        assert_eq!(parse_integer("0x1F"), LiteralValue::Int(31));
        assert_eq!(parse_integer("99999999999999999999999"), LiteralValue::Unknown);
        assert_eq!(parse_float("0.25"), LiteralValue::Float(0.25));
        assert_eq!(parse_float("2j"), LiteralValue::Unknown);
    }

    #[test]
    fn render_requires_full_resolution() {
        assert_eq!(LiteralValue::Str("gpt-4".into()).render().as_deref(), Some("gpt-4"));
        assert_eq!(
            LiteralValue::Seq(vec![LiteralValue::Str("a".into()), LiteralValue::Int(1)])
                .render()
                .as_deref(),
            Some("[\"a\",1]")
        );
        assert_eq!(
            LiteralValue::Seq(vec![LiteralValue::Unknown]).render(),
            None
        );
        assert_eq!(LiteralValue::Unknown.render(), None);
    }

    #[test]
    fn unknown_serializes_as_marker() {
        assert_eq!(LiteralValue::Unknown.to_json(), Value::String("unknown".into()));
        let seq = LiteralValue::Seq(vec![LiteralValue::Bool(true), LiteralValue::Unknown]);
        assert_eq!(seq.to_json(), serde_json::json!([true, "unknown"]));
    }

    #[test]
    fn nesting_beyond_the_cap_is_unknown() {
        let code = format!("{}1{}\n", "[".repeat(200), "]".repeat(200));
        let parsed = crate::parsers::PythonParser::new()
            .unwrap()
            .parse_source(std::path::Path::new("nested.py"), code)
            .unwrap();
        let statement = parsed.tree.root_node().child(0).unwrap();
        let list = statement.child(0).unwrap();

        let mut value = resolve_literal(&list, parsed.source_bytes());
        let mut levels = 0;
        while let LiteralValue::Seq(mut items) = value {
            assert_eq!(items.len(), 1);
            value = items.remove(0);
            levels += 1;
        }
        assert_eq!(levels, MAX_LITERAL_DEPTH + 1);
        assert_eq!(value, LiteralValue::Unknown);
    }
}
