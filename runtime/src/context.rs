use crate::redirect::RedirectError;
use crate::request::Request;
use crate::response::{Response, DEFAULT_RENDER_STATUS};
use http::StatusCode;

/// Per-request state: the inbound request, the response being built, and
/// whether something has already been rendered or redirected.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub request: Request,
    pub response: Response,
    performed_render: bool,
    performed_redirect: bool,
}

impl Context {
    pub fn new(request: Request) -> Self {
        Context {
            request,
            response: Response::new(),
            performed_render: false,
            performed_redirect: false,
        }
    }

    pub fn performed(&self) -> bool {
        self.performed_render || self.performed_redirect
    }

    pub fn rendered(&self) -> bool {
        self.performed_render
    }

    pub fn redirected(&self) -> bool {
        self.performed_redirect
    }

    pub fn render(&mut self, body: impl Into<String>) -> Result<(), RedirectError> {
        self.render_with_status(DEFAULT_RENDER_STATUS, body)
    }

    pub fn render_with_status(
        &mut self,
        status: StatusCode,
        body: impl Into<String>,
    ) -> Result<(), RedirectError> {
        if self.performed() {
            return Err(RedirectError::DoubleRender);
        }
        self.response.status = status;
        self.response.body = body.into();
        self.performed_render = true;
        Ok(())
    }

    pub(crate) fn mark_redirected(&mut self, redirected: bool) {
        self.performed_redirect = redirected;
    }

    /// Clears the body and forgets that anything was rendered.
    pub fn erase_render_results(&mut self) {
        self.response.body.clear();
        self.performed_render = false;
    }

    /// Clears the redirect: status back to 200, `Location` removed.
    /// Returns the location that was set, if any. The body is left alone.
    pub fn erase_redirect_results(&mut self) -> Option<String> {
        self.performed_redirect = false;
        self.response.status = DEFAULT_RENDER_STATUS;
        self.response.location.take()
    }

    pub fn erase_results(&mut self) -> Option<String> {
        self.erase_render_results();
        self.erase_redirect_results()
    }
}
