use crate::context::Context;
use crate::response::escape_html;
use crate::routing::{RouteError, RouteParams, RouteTable, UrlFor};
use crate::status::Status;
use http::StatusCode;
use thiserror::Error;
use tracing::Level;

pub const DEFAULT_REDIRECT_BACK_MESSAGE: &str = "No Referer header was set in the request to \
     this action, so a redirect back could not be performed. If this is a test, make sure to \
     set the Referer header on the request.";

#[derive(Error, Debug)]
pub enum RedirectError {
    #[error("Cannot redirect to an empty target")]
    InvalidTarget,
    #[error("Unknown status: {0}")]
    UnknownStatus(String),
    #[error("{0}")]
    RedirectBack(String),
    #[error("Render and/or redirect were called multiple times in this action")]
    DoubleRender,
    #[error("Route error: {0}")]
    Routing(#[from] RouteError),
}

/// Where a redirect points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectTarget {
    /// A URL with a scheme, used as-is.
    Absolute(String),
    /// Joined onto the current request's protocol and host.
    Path(String),
    /// Handed to the route table.
    Route(RouteParams),
    /// The request's `Referer`.
    Back,
}

impl From<&str> for RedirectTarget {
    fn from(s: &str) -> Self {
        RedirectTarget::from(s.to_string())
    }
}

impl From<String> for RedirectTarget {
    fn from(s: String) -> Self {
        if has_scheme(&s) {
            RedirectTarget::Absolute(s)
        } else {
            RedirectTarget::Path(s)
        }
    }
}

impl From<RouteParams> for RedirectTarget {
    fn from(params: RouteParams) -> Self {
        RedirectTarget::Route(params)
    }
}

/// `letter (letter | digit | '+' | '.' | '-')* ':'` at the start of the string.
pub fn has_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    for c in chars {
        match c {
            ':' => return true,
            c if c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-') => {}
            _ => return false,
        }
    }
    false
}

#[derive(Debug, Clone, Default)]
pub struct RedirectOptions {
    pub status: Option<Status>,
    /// Replaces the default message of [`RedirectError::RedirectBack`].
    pub back_message: Option<String>,
}

impl RedirectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: impl Into<Status>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn back_message(mut self, message: impl Into<String>) -> Self {
        self.back_message = Some(message.into());
        self
    }
}

/// Resolves redirect targets into redirect responses on a [`Context`].
#[derive(Debug, Clone, Default)]
pub struct Redirector<U: UrlFor = RouteTable> {
    routes: U,
}

impl<U: UrlFor> Redirector<U> {
    pub fn new(routes: U) -> Self {
        Redirector { routes }
    }

    /// Turns the response in `ctx` into a redirect to `target`.
    ///
    /// The status comes from `options.status`, then a `status` key in route
    /// params, then 302. Nothing in `ctx` changes when this returns an error.
    pub fn redirect(
        &self,
        ctx: &mut Context,
        target: impl Into<RedirectTarget>,
        options: RedirectOptions,
    ) -> Result<(), RedirectError> {
        let mut target = target.into();

        let hint = match &mut target {
            RedirectTarget::Route(params) => params.remove("status").map(Status::from),
            _ => None,
        };
        let status = options
            .status
            .as_ref()
            .or(hint.as_ref())
            .map(Status::interpret)
            .transpose()?
            .unwrap_or(StatusCode::FOUND);

        self.redirect_with_status(ctx, target, status, options.back_message)
    }

    fn redirect_with_status(
        &self,
        ctx: &mut Context,
        target: RedirectTarget,
        status: StatusCode,
        back_message: Option<String>,
    ) -> Result<(), RedirectError> {
        let url = match target {
            RedirectTarget::Absolute(url) | RedirectTarget::Path(url) if url.trim().is_empty() => {
                return Err(RedirectError::InvalidTarget);
            }
            RedirectTarget::Absolute(url) => url,
            RedirectTarget::Path(path) if has_scheme(&path) => path,
            RedirectTarget::Path(path) => format!(
                "{}{}{}",
                ctx.request.protocol(),
                ctx.request.host_with_port(),
                path
            ),
            RedirectTarget::Back => {
                let referer = match ctx.request.referer() {
                    Some(referer) => referer.to_string(),
                    None => {
                        return Err(RedirectError::RedirectBack(back_message.unwrap_or_else(
                            || DEFAULT_REDIRECT_BACK_MESSAGE.to_string(),
                        )));
                    }
                };
                return self.redirect_with_status(
                    ctx,
                    RedirectTarget::from(referer),
                    status,
                    back_message,
                );
            }
            RedirectTarget::Route(params) => self.routes.url_for(&ctx.request, &params)?,
        };

        redirect_to_full_url(ctx, &url, status)
    }

    /// Undoes a redirect and returns the location it pointed to.
    pub fn clear_redirect(&self, ctx: &mut Context) -> Option<String> {
        ctx.erase_redirect_results()
    }
}

fn redirect_to_full_url(
    ctx: &mut Context,
    url: &str,
    status: StatusCode,
) -> Result<(), RedirectError> {
    if ctx.performed() {
        return Err(RedirectError::DoubleRender);
    }

    let location = url.replace(|c: char| c == '\r' || c == '\n', "");
    if tracing::enabled!(Level::INFO) {
        tracing::info!("Redirected to {}", location);
    }

    ctx.response.status = status;
    ctx.response.location = Some(location);
    ctx.response.body = format!(
        "<html><body>You are being <a href=\"{}\">redirected</a>.</body></html>",
        escape_html(url)
    );
    ctx.mark_redirected(true);
    Ok(())
}
