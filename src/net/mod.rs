//! Transport layer for the registration backend.
//!
//! DESIGN
//! ======
//! `normalize` is pure: it turns envelopes, HTTP statuses, and transport
//! failures into `Result<Value, ApiError>` and nothing else. `client` wraps
//! `reqwest` with the request/response interceptors and owns the side
//! effects (tracing + [`Notifier`]). `api` holds the user endpoints behind
//! the [`UserApi`] trait so the session store can be driven by a mock.

pub mod api;
pub mod client;
pub mod normalize;
pub mod notify;
pub mod types;

pub use api::UserApi;
pub use client::ApiClient;
pub use normalize::ApiError;
pub use notify::{LogNotifier, Notifier};
pub use types::{Envelope, RegisterRequest, ResponseCode, UserInfo};
