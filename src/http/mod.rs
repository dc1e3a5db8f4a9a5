//! HTTP server module
//!
//! Serves the output workspace to players:
//! - Static files from the workspace directory (index and segments)
//! - Cache-disabling headers on every response
//! - Permissive CORS

pub mod routes;
pub mod server;

pub use routes::create_router;
pub use server::serve;
