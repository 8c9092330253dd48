use std::collections::HashMap;
use std::ops::Index;

#[derive(Debug, Clone, Default)]
pub struct Headers(HashMap<String, String>);

impl Headers {
    pub fn new() -> Self {
        Headers(HashMap::new())
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.0.get(&key.to_lowercase())
    }

    pub fn str(&self, key: &str) -> &str {
        self.0
            .get(&key.to_lowercase())
            .map(|s| s.as_str())
            .unwrap_or("")
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(key.to_lowercase(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(&key.to_lowercase())
    }
}

impl Index<&str> for Headers {
    type Output = str;
    fn index(&self, key: &str) -> &Self::Output {
        self.str(key)
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (key, value) in iter {
            headers.insert(key.as_ref(), value);
        }
        headers
    }
}

/// The inbound half of a request/response cycle, as seen by the redirector.
#[derive(Debug, Clone)]
pub struct Request {
    pub headers: Headers,
    method: String,
    path: String,
    scheme: String,
    host: String,
    port: Option<u16>,
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}

impl Request {
    pub fn new() -> Self {
        Request {
            headers: Headers::new(),
            method: "GET".to_string(),
            path: "/".to_string(),
            scheme: "http".to_string(),
            host: "localhost".to_string(),
            port: None,
        }
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = method.to_uppercase();
        self
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    /// Accepts either a bare scheme (`https`) or a protocol prefix (`https://`).
    pub fn with_scheme(mut self, scheme: &str) -> Self {
        self.scheme = scheme.trim_end_matches("://").to_lowercase();
        self
    }

    /// Accepts `host` or `host:port`. An unparsable port is kept as part of the host.
    pub fn with_host(mut self, authority: &str) -> Self {
        let split = if authority.starts_with('[') {
            authority
                .rfind("]:")
                .map(|i| (&authority[..=i], &authority[i + 2..]))
        } else {
            authority.rsplit_once(':')
        };

        match split.and_then(|(host, port)| port.parse::<u16>().ok().map(|p| (host, p))) {
            Some((host, port)) => {
                self.host = host.to_string();
                self.port = Some(port);
            }
            None => {
                self.host = authority.to_string();
                self.port = None;
            }
        }
        self
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key, value);
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.standard_port())
    }

    pub fn is_ssl(&self) -> bool {
        self.scheme == "https"
    }

    pub fn standard_port(&self) -> u16 {
        if self.is_ssl() {
            443
        } else {
            80
        }
    }

    /// `"https://"` or `"http://"`.
    pub fn protocol(&self) -> String {
        format!("{}://", self.scheme)
    }

    /// The host, followed by `:port` only when the port is not the scheme's default.
    pub fn host_with_port(&self) -> String {
        match self.port {
            Some(port) if port != self.standard_port() => format!("{}:{}", self.host, port),
            _ => self.host.clone(),
        }
    }

    pub fn referer(&self) -> Option<&str> {
        self.headers
            .get("referer")
            .map(|s| s.as_str())
            .filter(|s| !s.trim().is_empty())
    }
}
