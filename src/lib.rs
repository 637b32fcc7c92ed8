//! # regdesk
//!
//! Client library for the user-registration backend.
//!
//! The crate is split the same way the browser front end is: a transport
//! layer (`net`) that talks HTTP and collapses every backend outcome into a
//! resolved payload or an [`net::ApiError`], and a session store (`state`)
//! that drives the register / fetch-user flows and tracks their flags.
//! The `regdesk` binary is a thin CLI over both.

pub mod config;
pub mod net;
pub mod state;

pub use config::ClientConfig;
pub use net::{ApiClient, ApiError, LogNotifier, Notifier, UserApi};
pub use state::{SessionState, SessionStore};
