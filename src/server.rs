use crate::config::{Config, ServerConfig};
use axum::{
    body::Body,
    extract::{Request as AxumRequest, State},
    http::{header, HeaderValue, Response, StatusCode},
    Router,
};
use redirector_runtime::{
    Context, RedirectError, RedirectOptions, Redirector, Request, Response as RuntimeResponse,
    RouteTable,
};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("Invalid listen address: {0}")]
    InvalidAddr(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared, read-only state behind every request.
pub struct App {
    config: Config,
    redirector: Redirector<RouteTable>,
}

impl App {
    pub fn new(config: Config) -> Self {
        let redirector = Redirector::new(config.route_table());
        App { config, redirector }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn redirector(&self) -> &Redirector<RouteTable> {
        &self.redirector
    }

    /// Applies the redirect rule matching the request path, or renders a 404.
    pub fn dispatch(&self, ctx: &mut Context) -> Result<(), RedirectError> {
        let Some(rule) = self.config.rule_for(ctx.request.path()) else {
            tracing::debug!(path = %ctx.request.path(), "no redirect rule");
            return ctx.render_with_status(StatusCode::NOT_FOUND, "Not Found");
        };

        tracing::debug!(
            method = %ctx.request.method(),
            path = %rule.path,
            "matched redirect rule"
        );
        let options = RedirectOptions {
            status: rule.status.clone(),
            back_message: rule.back_message.clone(),
        };
        self.redirector.redirect(ctx, rule.to.to_target(), options)
    }
}

pub fn router(app: Arc<App>) -> Router {
    Router::new()
        .fallback(handle_request)
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}

pub async fn run_server(app: Arc<App>, addr: &str) -> Result<(), ServeError> {
    let addr: SocketAddr = addr
        .parse()
        .map_err(|_| ServeError::InvalidAddr(addr.to_string()))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        rules = app.config().redirects.len(),
        routes = app.config().routes.len(),
        "listening on http://{}",
        addr
    );

    axum::serve(listener, router(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

async fn handle_request(State(app): State<Arc<App>>, axum_req: AxumRequest) -> Response<Body> {
    let request = to_runtime_request(&axum_req, &app.config().server);
    let mut ctx = Context::new(request);

    match app.dispatch(&mut ctx) {
        Ok(()) => build_response(ctx.response),
        Err(e) => {
            tracing::warn!(path = %ctx.request.path(), "request failed: {}", e);
            error_response(&e.to_string())
        }
    }
}

fn to_runtime_request(axum_req: &AxumRequest, server: &ServerConfig) -> Request {
    let headers = axum_req.headers();

    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .unwrap_or(&server.protocol);

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| axum_req.uri().authority().map(|a| a.as_str()))
        .unwrap_or(&server.host);

    let mut request = Request::new()
        .with_method(axum_req.method().as_str())
        .with_path(axum_req.uri().path())
        .with_scheme(scheme)
        .with_host(host);

    for (name, value) in headers.iter() {
        if let Ok(v) = value.to_str() {
            request.headers.insert(name.as_str(), v);
        }
    }
    request
}

fn build_response(res: RuntimeResponse) -> Response<Body> {
    let RuntimeResponse {
        status,
        location,
        body,
    } = res;

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );

    if let Some(location) = location {
        match HeaderValue::from_str(&location) {
            Ok(value) => {
                response.headers_mut().insert(header::LOCATION, value);
            }
            Err(_) => return error_response(&format!("Invalid Location: {}", location)),
        }
    }

    response
}

fn error_response(message: &str) -> Response<Body> {
    let mut response = Response::new(Body::from(format!("Error: {}", message)));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::ServiceExt;

    const CONFIG: &str = r#"
[routes]
post = "/posts/:id"

[[redirects]]
path = "/old"
to = "/new"
status = "moved_permanently"

[[redirects]]
path = "/external"
to = "https://www.rust-lang.org/"

[[redirects]]
path = "/return"
to = ":back"

[[redirects]]
path = "/latest"
to = { route = "post", id = "42", status = "see_other" }

[[redirects]]
path = "/moved-post"
to = { route = "post", id = 7, status = 301 }

[[redirects]]
path = "/broken"
to = "/x"
status = "not_a_status"
"#;

    fn app() -> Router {
        router(Arc::new(App::new(Config::from_toml(CONFIG).unwrap())))
    }

    fn get(path: &str) -> axum::http::request::Builder {
        axum::http::Request::builder()
            .uri(path)
            .header(header::HOST, "example.com")
    }

    async fn body_string(res: Response<Body>) -> String {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_relative_rule() {
        let res = app()
            .oneshot(get("/old").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(
            res.headers().get(header::LOCATION).unwrap(),
            "http://example.com/new"
        );
        let body = body_string(res).await;
        assert!(body.contains("You are being <a href=\"http://example.com/new\">redirected</a>."));
    }

    #[tokio::test]
    async fn test_forwarded_proto() {
        let res = app()
            .oneshot(
                get("/old")
                    .header("x-forwarded-proto", "https")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            res.headers().get(header::LOCATION).unwrap(),
            "https://example.com/new"
        );
    }

    #[tokio::test]
    async fn test_absolute_rule_defaults_to_found() {
        let res = app()
            .oneshot(get("/external").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FOUND);
        assert_eq!(
            res.headers().get(header::LOCATION).unwrap(),
            "https://www.rust-lang.org/"
        );
    }

    #[tokio::test]
    async fn test_route_rule_uses_status_hint() {
        let res = app()
            .oneshot(get("/latest").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            res.headers().get(header::LOCATION).unwrap(),
            "http://example.com/posts/42"
        );
    }

    #[tokio::test]
    async fn test_route_rule_with_integer_values() {
        let res = app()
            .oneshot(get("/moved-post").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(
            res.headers().get(header::LOCATION).unwrap(),
            "http://example.com/posts/7"
        );
    }

    #[tokio::test]
    async fn test_back_with_referer() {
        let res = app()
            .oneshot(
                get("/return")
                    .header(header::REFERER, "http://example.com/form")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FOUND);
        assert_eq!(
            res.headers().get(header::LOCATION).unwrap(),
            "http://example.com/form"
        );
    }

    #[tokio::test]
    async fn test_back_without_referer() {
        let res = app()
            .oneshot(get("/return").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(res.headers().get(header::LOCATION).is_none());
        let body = body_string(res).await;
        assert!(body.starts_with("Error: No Referer header"));
    }

    #[tokio::test]
    async fn test_unknown_status_rule() {
        let res = app()
            .oneshot(get("/broken").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_string(res).await, "Error: Unknown status: not_a_status");
    }

    #[tokio::test]
    async fn test_unmatched_path() {
        let res = app()
            .oneshot(get("/nowhere").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert!(res.headers().get(header::LOCATION).is_none());
        assert_eq!(body_string(res).await, "Not Found");
    }

    #[test]
    fn test_build_response_rejects_non_ascii_location() {
        let mut res = RuntimeResponse::new();
        res.status = StatusCode::FOUND;
        res.location = Some("http://example.com/\u{7f}".to_string());
        let response = build_response(res);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
