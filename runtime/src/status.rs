use crate::redirect::RedirectError;
use http::StatusCode;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Symbolic names for every status code with a standard reason phrase:
/// `"Moved Permanently"` becomes `moved_permanently`.
static SYMBOL_TO_STATUS_CODE: Lazy<HashMap<String, StatusCode>> = Lazy::new(|| {
    (100..1000u16)
        .filter_map(|code| {
            let status = StatusCode::from_u16(code).ok()?;
            let reason = status.canonical_reason()?;
            Some((symbolize(reason), status))
        })
        .collect()
});

fn symbolize(reason: &str) -> String {
    reason
        .chars()
        .filter(|c| *c != '\'')
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// A response status as a caller spells it: a number or a symbolic name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Status {
    Code(u16),
    Symbol(String),
}

impl Status {
    pub fn interpret(&self) -> Result<StatusCode, RedirectError> {
        match self {
            Status::Code(code) => StatusCode::from_u16(*code)
                .map_err(|_| RedirectError::UnknownStatus(code.to_string())),
            Status::Symbol(symbol) => {
                let symbol = symbol.trim();
                if !symbol.is_empty() && symbol.bytes().all(|b| b.is_ascii_digit()) {
                    return match symbol.parse::<u16>() {
                        Ok(code) => Status::Code(code).interpret(),
                        Err(_) => Err(RedirectError::UnknownStatus(symbol.to_string())),
                    };
                }
                SYMBOL_TO_STATUS_CODE
                    .get(symbol.trim_start_matches(':'))
                    .copied()
                    .ok_or_else(|| RedirectError::UnknownStatus(symbol.to_string()))
            }
        }
    }
}

impl From<u16> for Status {
    fn from(code: u16) -> Self {
        Status::Code(code)
    }
}

impl From<StatusCode> for Status {
    fn from(status: StatusCode) -> Self {
        Status::Code(status.as_u16())
    }
}

impl From<&str> for Status {
    fn from(symbol: &str) -> Self {
        Status::Symbol(symbol.to_string())
    }
}

impl From<String> for Status {
    fn from(symbol: String) -> Self {
        Status::Symbol(symbol)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Code(code) => write!(f, "{}", code),
            Status::Symbol(symbol) => write!(f, "{}", symbol),
        }
    }
}
