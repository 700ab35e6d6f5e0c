//! Label block scanning.
//!
//! A label block is `{key="value",...}`. The scanner is an explicit state
//! machine over the characters following the opening brace; it stops at the
//! closing brace and reports how many bytes it consumed so the caller can
//! locate the value part of the line.

use metricgrid_core::Labels;

/// Why a label block was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelError {
    /// Input ended before the closing brace.
    Unterminated,
    /// A key was empty or contained a reserved character.
    BadKey,
    /// The key was not followed by `=`.
    ExpectedEquals,
    /// `=` was not followed by an opening quote.
    ExpectedQuote,
    /// A quoted value was followed by something other than `,` or `}`.
    ExpectedSeparator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Before a key (start of block or after a comma).
    ExpectKey,
    /// Inside a key.
    Key,
    /// Key finished by whitespace, waiting for `=`.
    ExpectEquals,
    /// After `=`, waiting for `"`.
    ExpectQuote,
    /// Inside a quoted value.
    Value,
    /// Just read a backslash inside a quoted value.
    Escape,
    /// After the closing quote, waiting for `,` or `}`.
    AfterValue,
}

/// Scan a label block body.
///
/// `input` starts immediately after `{`. On success returns the parsed labels
/// and the number of bytes consumed, including the closing `}`. Duplicate keys
/// keep the last value.
pub fn scan_label_block(input: &str) -> Result<(Labels, usize), LabelError> {
    let mut labels = Labels::new();
    let mut state = State::ExpectKey;
    let mut key = String::new();
    let mut value = String::new();

    for (idx, ch) in input.char_indices() {
        state = match state {
            State::ExpectKey => match ch {
                '}' => return Ok((labels, idx + 1)),
                c if c.is_whitespace() => State::ExpectKey,
                '=' | '"' | ',' | '{' => return Err(LabelError::BadKey),
                c => {
                    key.push(c);
                    State::Key
                }
            },
            State::Key => match ch {
                '=' => State::ExpectQuote,
                c if c.is_whitespace() => State::ExpectEquals,
                '"' | ',' | '{' | '}' => return Err(LabelError::BadKey),
                c => {
                    key.push(c);
                    State::Key
                }
            },
            State::ExpectEquals => match ch {
                '=' => State::ExpectQuote,
                c if c.is_whitespace() => State::ExpectEquals,
                _ => return Err(LabelError::ExpectedEquals),
            },
            State::ExpectQuote => match ch {
                '"' => State::Value,
                c if c.is_whitespace() => State::ExpectQuote,
                _ => return Err(LabelError::ExpectedQuote),
            },
            State::Value => match ch {
                '\\' => State::Escape,
                '"' => {
                    labels.insert(std::mem::take(&mut key), std::mem::take(&mut value));
                    State::AfterValue
                }
                c => {
                    value.push(c);
                    State::Value
                }
            },
            State::Escape => {
                value.push(unescape(ch));
                State::Value
            }
            State::AfterValue => match ch {
                ',' => State::ExpectKey,
                '}' => return Ok((labels, idx + 1)),
                c if c.is_whitespace() => State::AfterValue,
                _ => return Err(LabelError::ExpectedSeparator),
            },
        };
    }

    Err(LabelError::Unterminated)
}

/// Map the character after a backslash. Unknown escapes keep the character.
fn unescape(ch: char) -> char {
    match ch {
        'n' => '\n',
        't' => '\t',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_block() {
        let (labels, consumed) = scan_label_block("} 1").unwrap();
        assert!(labels.is_empty());
        assert_eq!(consumed, 1);
    }

    #[test]
    fn simple_pairs() {
        let input = r#"method="GET",code="200"} 5"#;
        let (labels, consumed) = scan_label_block(input).unwrap();
        assert_eq!(labels.get("method"), Some("GET"));
        assert_eq!(labels.get("code"), Some("200"));
        assert_eq!(&input[consumed..], " 5");
    }

    #[test]
    fn escapes() {
        let input = r#"a="x\ny",b="tab\there",c="q\"q",d="back\\slash",e="\z"}"#;
        let (labels, _) = scan_label_block(input).unwrap();
        assert_eq!(labels.get("a"), Some("x\ny"));
        assert_eq!(labels.get("b"), Some("tab\there"));
        assert_eq!(labels.get("c"), Some("q\"q"));
        assert_eq!(labels.get("d"), Some("back\\slash"));
        assert_eq!(labels.get("e"), Some("z"));
    }

    #[test]
    fn value_may_contain_braces_commas_and_spaces() {
        let input = r#"query="{a, b} c"}"#;
        let (labels, consumed) = scan_label_block(input).unwrap();
        assert_eq!(labels.get("query"), Some("{a, b} c"));
        assert_eq!(consumed, input.len());
    }

    #[test]
    fn trailing_comma_and_whitespace() {
        let (labels, _) = scan_label_block(r#" a = "1" , b="2", }"#).unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels.get("a"), Some("1"));
    }

    #[test]
    fn duplicate_key_last_wins() {
        let (labels, _) = scan_label_block(r#"a="1",a="2"}"#).unwrap();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels.get("a"), Some("2"));
    }

    #[test]
    fn malformed_blocks() {
        assert_eq!(scan_label_block(r#"a="1""#), Err(LabelError::Unterminated));
        assert_eq!(scan_label_block(r#"a="1"#), Err(LabelError::Unterminated));
        assert_eq!(scan_label_block(r#"a=1}"#), Err(LabelError::ExpectedQuote));
        assert_eq!(scan_label_block(r#"a b="1"}"#), Err(LabelError::ExpectedEquals));
        assert_eq!(scan_label_block(r#"="1"}"#), Err(LabelError::BadKey));
        assert_eq!(scan_label_block(r#"a="1"b="2"}"#), Err(LabelError::ExpectedSeparator));
    }
}
