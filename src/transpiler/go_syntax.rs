//! Go-side lexical helpers: pure text formatting, no I/O.

use crate::ast::BinaryOperator;

/// The generic type used wherever the source gives no annotation. Source
/// types are unknown without inference, so containers and untyped
/// parameters all land on the empty interface.
pub const GO_ANY: &str = "interface{}";

pub fn escape_go_string(value: &str) -> String {
    let mut escaped = String::new();
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

pub fn format_byte_literal(bytes: &[u8]) -> String {
    let rendered = bytes
        .iter()
        .map(|byte| format!("0x{byte:02x}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("[]byte{{{rendered}}}")
}

/// Returns the Go operator symbol, or `None` for operators outside the
/// supported arithmetic set.
pub fn operator_symbol(op: &BinaryOperator) -> Option<&'static str> {
    match op {
        BinaryOperator::Add => Some("+"),
        BinaryOperator::Sub => Some("-"),
        BinaryOperator::Mul => Some("*"),
        BinaryOperator::Div => Some("/"),
        BinaryOperator::Mod => Some("%"),
        BinaryOperator::LessThan => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_quotes_and_control_characters() {
        assert_eq!(escape_go_string("a\"b"), "a\\\"b");
        assert_eq!(escape_go_string("line\nbreak\tand\\slash"), "line\\nbreak\\tand\\\\slash");
    }

    #[test]
    fn formats_byte_literals_in_order() {
        assert_eq!(format_byte_literal(&[0, 255]), "[]byte{0x00, 0xff}");
        assert_eq!(format_byte_literal(&[]), "[]byte{}");
    }
}
