//! URL generation for structured redirect targets.
//!
//! A [`RouteParams`] names either a registered route (`route` key) or falls
//! back to the `/:controller/:action/:id` convention. Params that no path
//! segment consumes become the query string.

use crate::request::Request;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::collections::{BTreeMap, HashMap};
use std::ops::Index;
use thiserror::Error;

/// Characters escaped inside a single path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

const RESERVED: &[&str] = &["route", "status", "anchor", "host", "protocol", "only_path"];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RouteError {
    #[error("No route named '{0}'")]
    UnknownRoute(String),
    #[error("Route '{route}' requires parameter '{param}'")]
    MissingParam { route: String, param: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams(BTreeMap<String, String>);

impl RouteParams {
    pub fn new() -> Self {
        RouteParams(BTreeMap::new())
    }

    /// Params for the named route registered in a [`RouteTable`].
    pub fn named(route: &str) -> Self {
        RouteParams::new().with("route", route)
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.0.insert(key.to_string(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.0.get(key)
    }

    pub fn str(&self, key: &str) -> &str {
        self.0.get(key).map(|s| s.as_str()).unwrap_or("")
    }

    pub fn or(&self, key: &str, default: &str) -> String {
        self.0
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
}

impl Index<&str> for RouteParams {
    type Output = str;
    fn index(&self, key: &str) -> &Self::Output {
        self.str(key)
    }
}

impl<K: ToString, V: ToString> FromIterator<(K, V)> for RouteParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        RouteParams(
            iter.into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

/// Turns structured route params into a URL string.
pub trait UrlFor {
    fn url_for(&self, request: &Request, params: &RouteParams) -> Result<String, RouteError>;
}

#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: HashMap<String, String>,
}

impl RouteTable {
    pub fn new() -> Self {
        RouteTable {
            routes: HashMap::new(),
        }
    }

    /// Registers `pattern` (e.g. `/posts/:id`) under `name`.
    pub fn add(&mut self, name: &str, pattern: &str) {
        self.routes.insert(name.to_string(), pattern.to_string());
    }

    pub fn with_route(mut self, name: &str, pattern: &str) -> Self {
        self.add(name, pattern);
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    fn named_path(
        &self,
        name: &str,
        params: &RouteParams,
        consumed: &mut Vec<String>,
    ) -> Result<String, RouteError> {
        let pattern = self
            .routes
            .get(name)
            .ok_or_else(|| RouteError::UnknownRoute(name.to_string()))?;

        let mut path = String::new();
        for segment in pattern.split('/').filter(|s| !s.is_empty()) {
            path.push('/');
            match segment.strip_prefix(':') {
                Some(key) => {
                    let value = params.get(key).ok_or_else(|| RouteError::MissingParam {
                        route: name.to_string(),
                        param: key.to_string(),
                    })?;
                    path.extend(utf8_percent_encode(value, SEGMENT));
                    consumed.push(key.to_string());
                }
                None => path.push_str(segment),
            }
        }

        if path.is_empty() {
            path.push('/');
        }
        Ok(path)
    }

    fn conventional_path(
        &self,
        params: &RouteParams,
        consumed: &mut Vec<String>,
    ) -> Result<String, RouteError> {
        let controller = params.get("controller").ok_or_else(|| RouteError::MissingParam {
            route: "default".to_string(),
            param: "controller".to_string(),
        })?;
        let action = params.or("action", "index");
        consumed.extend(["controller", "action", "id"].map(String::from));

        let mut path = format!("/{}", utf8_percent_encode(controller, SEGMENT));
        match params.get("id") {
            Some(id) => {
                path.push('/');
                path.extend(utf8_percent_encode(&action, SEGMENT));
                path.push('/');
                path.extend(utf8_percent_encode(id, SEGMENT));
            }
            None if action != "index" => {
                path.push('/');
                path.extend(utf8_percent_encode(&action, SEGMENT));
            }
            None => {}
        }
        Ok(path)
    }
}

impl UrlFor for RouteTable {
    fn url_for(&self, request: &Request, params: &RouteParams) -> Result<String, RouteError> {
        let mut consumed = Vec::new();
        let mut url = match params.get("route") {
            Some(name) => self.named_path(name, params, &mut consumed)?,
            None => self.conventional_path(params, &mut consumed)?,
        };

        let mut query = url::form_urlencoded::Serializer::new(String::new());
        let mut has_query = false;
        for (key, value) in params.iter() {
            if RESERVED.contains(&key.as_str()) || consumed.contains(key) {
                continue;
            }
            query.append_pair(key, value);
            has_query = true;
        }
        if has_query {
            url.push('?');
            url.push_str(&query.finish());
        }

        if let Some(anchor) = params.get("anchor") {
            url.push('#');
            url.extend(utf8_percent_encode(anchor, SEGMENT));
        }

        if params.str("only_path") == "true" {
            return Ok(url);
        }

        let protocol = match params.get("protocol") {
            Some(p) => format!("{}://", p.trim_end_matches("://")),
            None => request.protocol(),
        };
        let host = params
            .get("host")
            .cloned()
            .unwrap_or_else(|| request.host_with_port());

        Ok(format!("{}{}{}", protocol, host, url))
    }
}
