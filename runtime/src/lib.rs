pub mod context;
pub mod redirect;
pub mod request;
pub mod response;
pub mod routing;
pub mod status;

pub use context::Context;
pub use redirect::{
    has_scheme, RedirectError, RedirectOptions, RedirectTarget, Redirector,
    DEFAULT_REDIRECT_BACK_MESSAGE,
};
pub use request::{Headers, Request};
pub use response::{escape_html, Response, DEFAULT_RENDER_STATUS};
pub use routing::{RouteError, RouteParams, RouteTable, UrlFor};
pub use status::Status;

pub use http::StatusCode;
