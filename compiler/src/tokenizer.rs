use regex::Regex;
use lazy_static::lazy_static;
use crate::utils::{quote, error};
use crate::error::Pe2Pkcs7Error;

lazy_static! {
    pub static ref TOKEN_REGEX: Regex = Regex::new(concat!(
        r"(--(?:[^\n-]|-[^\n-])*(?:--|-)?",
        r"|/\*(?s:.)*?\*/",
        r"|::=|\.\.\.|\.\.",
        r"|[A-Za-z][A-Za-z0-9]*(?:-[A-Za-z0-9]+)*",
        r"|-?\d+",
        r"|'[0-9A-Fa-f]*'[HB]",
        r#"|"[^"]*""#,
        r"|[{}\[\](),;|<>@.!]",
        r"|\s+)",
    )).unwrap();
    pub static ref SKIPPED_RX: Regex = Regex::new(r"^(?s:--.*|/\*.*|\s+)$").unwrap();
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub text:   String,
    pub line:   usize,
    pub column: usize,
}

/// Splits ASN.1 module text into tokens, dropping whitespace and comments.
/// The returned list always ends with an empty EOF token.
pub fn tokenize_schema(text: &str) -> Result<Vec<Token>, Pe2Pkcs7Error> {
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut column = 1;
    let mut last_end = 0;

    for mat in TOKEN_REGEX.find_iter(text) {
        let start = mat.start();
        let end   = mat.end();
        let part  = mat.as_str();

        if start > last_end {
            // Unexpected text between last_end and start
            let unexpected = &text[last_end..start];
            return Err(error(
                &format!("Syntax error: {}", quote(unexpected)),
                line,
                column,
            ));
        }

        if !SKIPPED_RX.is_match(part) {
            tokens.push(Token {
                text:   part.to_string(),
                line,
                column,
            });
        }

        // Update line/column
        let newline_count = part.matches('\n').count();
        if newline_count > 0 {
            line += newline_count;
            if let Some(last_line_part) = part.split('\n').last() {
                column = last_line_part.chars().count() + 1;
            }
        } else {
            column += part.chars().count();
        }

        last_end = end;
    }

    if last_end != text.len() {
        let unexpected = &text[last_end..];
        return Err(error(
            &format!("Syntax error: {}", quote(unexpected)),
            line,
            column,
        ));
    }

    // Append EOF token
    tokens.push(Token {
        text:   "".to_string(),
        line,
        column,
    });
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(input: &str) -> Vec<String> {
        tokenize_schema(input)
            .unwrap()
            .into_iter()
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn test_tokenize_simple() {
        let input = "Version ::= INTEGER";
        let expected = vec![
            Token { text: "Version".into(), line: 1, column: 1 },
            Token { text: "::=".into(),     line: 1, column: 9 },
            Token { text: "INTEGER".into(), line: 1, column: 13 },
            Token { text: "".into(),        line: 1, column: 20 },
        ];
        let got = tokenize_schema(input).unwrap();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_tokenize_hyphenated_identifiers_and_ranges() {
        assert_eq!(
            texts("id-data SIZE (1..MAX) { v1(0), ... }"),
            vec!["id-data", "SIZE", "(", "1", "..", "MAX", ")", "{", "v1", "(", "0", ")", ",", "...", "}", ""]
        );
    }

    #[test]
    fn test_tokenize_comments() {
        let input = "A ::= -- trailing comment\n  B -- inline -- C /* block\ncomment */ D";
        let got = tokenize_schema(input).unwrap();
        let names: Vec<&str> = got.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(names, vec!["A", "::=", "B", "C", "D", ""]);
        assert_eq!(got[2].line, 2);
        assert_eq!(got[2].column, 3);
        assert_eq!(got[4].line, 3);
    }

    #[test]
    fn test_tokenize_tags_and_strings() {
        assert_eq!(
            texts("[APPLICATION 3] IMPLICIT '0A'H \"text\""),
            vec!["[", "APPLICATION", "3", "]", "IMPLICIT", "'0A'H", "\"text\"", ""]
        );
    }

    #[test]
    fn test_tokenize_unexpected_text() {
        let input = "Version ::= INTEGER $";
        let err = tokenize_schema(input).unwrap_err();
        assert!(
            matches!(err, Pe2Pkcs7Error::ParseError { line: 1, column: 21, .. }),
            "expected a ParseError but got {:?}",
            err
        );
    }
}
