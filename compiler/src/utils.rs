use crate::error::Pe2Pkcs7Error;

pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

pub fn error(msg: &str, line: usize, column: usize) -> Pe2Pkcs7Error {
    Pe2Pkcs7Error::ParseError {
        msg: msg.to_owned(),
        line,
        column,
    }
}
