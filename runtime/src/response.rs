use http::StatusCode;

/// Status a response carries until something renders or redirects.
pub const DEFAULT_RENDER_STATUS: StatusCode = StatusCode::OK;

#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: String,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub fn new() -> Self {
        Self {
            status: DEFAULT_RENDER_STATUS,
            location: None,
            body: String::new(),
        }
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }
}

pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
