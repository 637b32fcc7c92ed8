//! Client-side session state.
//!
//! DESIGN
//! ======
//! One explicitly constructed [`SessionStore`] per application, created at
//! startup and handed to whatever needs it. Only the store mutates
//! [`SessionState`]; readers take snapshots.

pub mod session;

pub use session::{SessionState, SessionStore, UNKNOWN_USER, display_name};
