//! Postly session server.
//!
//! Serves the session endpoints of [`postly_auth`] over HTTP, backed by the
//! in-memory or MongoDB user store.

pub mod config;
pub mod observability;
pub mod server;

pub use config::AppConfig;
pub use server::{
    PostlyServer, ServerBuilder, build_app, build_router, build_state, build_user_store,
};
