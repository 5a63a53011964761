//! Data-filter expression language.
//!
//! A small jq-like projection language applied to in-flight data at
//! state and action boundaries. The grammar is deliberately tiny:
//!
//! ```text
//! filter := token+
//! token  := '.' ident    (field selector)
//!         | '..'         (recursive descent, recognized only)
//!         | '.'          (identity, recognized only)
//!         | '|='         (update pipe, recognized only)
//!         | '|'          (pipe, recognized only)
//! ident  := alpha alnum*
//! ```
//!
//! Evaluation implements single-level, single-key projection: `run`
//! applies exactly the first field selector in the expression and keeps
//! only that top-level key. The remaining token forms are part of the
//! grammar so that filters written against the fuller jq syntax still
//! compile, but they carry no evaluation semantics here. Any character
//! outside the grammar is a lexical error.

use serde_json::Value;

use crate::error::{EngineError, EngineResult};

/// Token produced by the filter tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `.` followed by an identifier: select by key.
    Field(String),
    /// Bare `.`.
    Dot,
    /// `..`.
    DotDot,
    /// `|`.
    Pipe,
    /// `|=`.
    PipeEquals,
}

/// Compiled filter expression.
///
/// Compilation tokenizes the whole expression once; evaluation is pure
/// and reusable, never consuming the compiled form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    field: String,
    tokens: Vec<Token>,
}

impl Filter {
    /// Compile a filter expression.
    ///
    /// Fails on characters outside the grammar and on expressions that
    /// select no field.
    pub fn compile(expression: &str) -> EngineResult<Self> {
        let tokens = tokenize(expression)?;

        let field = tokens
            .iter()
            .find_map(|t| match t {
                Token::Field(name) => Some(name.clone()),
                _ => None,
            })
            .ok_or_else(|| {
                EngineError::Filter(format!("filter '{}' selects no field", expression))
            })?;

        Ok(Self { field, tokens })
    }

    /// The field selected by this filter.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The compiled token stream.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Project `data` through the filter.
    ///
    /// Keeps only the selected top-level key: `{key: value}` when the
    /// key is present, `{}` when it is absent or the input is not an
    /// object.
    pub fn run(&self, data: &Value) -> Value {
        let mut out = serde_json::Map::new();
        if let Value::Object(map) = data {
            if let Some(value) = map.get(&self.field) {
                out.insert(self.field.clone(), value.clone());
            }
        }
        Value::Object(out)
    }
}

/// Tokenize a filter expression.
fn tokenize(expression: &str) -> EngineResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = expression.chars().peekable();
    let mut position = 0usize;

    while let Some(c) = chars.next() {
        position += 1;
        match c {
            c if c.is_whitespace() => {}
            '.' => match chars.peek() {
                Some(d) if d.is_ascii_alphabetic() => {
                    let mut ident = String::new();
                    while let Some(&d) = chars.peek() {
                        if d.is_ascii_alphanumeric() {
                            ident.push(d);
                            chars.next();
                            position += 1;
                        } else {
                            break;
                        }
                    }
                    tokens.push(Token::Field(ident));
                }
                Some('.') => {
                    chars.next();
                    position += 1;
                    tokens.push(Token::DotDot);
                }
                _ => tokens.push(Token::Dot),
            },
            '|' => {
                if chars.peek() == Some(&'=') {
                    chars.next();
                    position += 1;
                    tokens.push(Token::PipeEquals);
                } else {
                    tokens.push(Token::Pipe);
                }
            }
            other => {
                return Err(EngineError::Filter(format!(
                    "unexpected character '{}' at position {} in filter '{}'",
                    other, position, expression
                )));
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_select_single_key() {
        let filter = Filter::compile(".a").unwrap();
        assert_eq!(filter.run(&json!({"a": 1, "b": 2})), json!({"a": 1}));
    }

    #[test]
    fn test_missing_key_yields_empty_object() {
        let filter = Filter::compile(".missing").unwrap();
        assert_eq!(filter.run(&json!({"a": 1})), json!({}));
    }

    #[test]
    fn test_non_object_input_yields_empty_object() {
        let filter = Filter::compile(".a").unwrap();
        assert_eq!(filter.run(&json!([1, 2, 3])), json!({}));
        assert_eq!(filter.run(&json!(42)), json!({}));
        assert_eq!(filter.run(&Value::Null), json!({}));
    }

    #[test]
    fn test_run_is_reusable() {
        let filter = Filter::compile(".a").unwrap();
        assert_eq!(filter.run(&json!({"a": 1})), json!({"a": 1}));
        assert_eq!(filter.run(&json!({"a": 2})), json!({"a": 2}));
    }

    #[test]
    fn test_only_first_field_is_evaluated() {
        let filter = Filter::compile(".a | .b").unwrap();
        assert_eq!(filter.field(), "a");
        assert_eq!(filter.run(&json!({"a": 1, "b": 2})), json!({"a": 1}));
    }

    #[test]
    fn test_identifier_allows_digits_after_alpha() {
        let filter = Filter::compile(".series1").unwrap();
        assert_eq!(filter.field(), "series1");
    }

    #[test]
    fn test_whitespace_is_skipped() {
        let filter = Filter::compile("  .a  ").unwrap();
        assert_eq!(filter.field(), "a");
    }

    #[test]
    fn test_tokenizer_recognizes_all_forms() {
        let filter = Filter::compile(".. .a . |= |").unwrap();
        assert_eq!(
            filter.tokens(),
            &[
                Token::DotDot,
                Token::Field("a".to_string()),
                Token::Dot,
                Token::PipeEquals,
                Token::Pipe,
            ]
        );
    }

    #[test]
    fn test_unexpected_character_is_a_lexical_error() {
        let err = Filter::compile(".a[0]").unwrap_err();
        assert!(matches!(err, EngineError::Filter(_)));
        assert!(err.to_string().contains('['));
    }

    #[test]
    fn test_filter_without_field_is_rejected() {
        let err = Filter::compile(".").unwrap_err();
        assert!(err.to_string().contains("selects no field"));

        let err = Filter::compile("").unwrap_err();
        assert!(err.to_string().contains("selects no field"));
    }
}
