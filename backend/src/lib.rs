//! Patient Records API
//!
//! Read-only HTTP surface over a blob container of patient images. Records can be
//! listed, fetched by name, or fetched with a signed token that grants read access
//! through a stored access policy kept alive by the service.

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// Patient records over a blob container
pub mod record_service;

/// Route handlers
pub mod routes;

/// HTTP server
pub mod server;

/// Environment and error types
pub mod types;
