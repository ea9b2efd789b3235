//! HTTP API: router, middleware, cookies and request/response mapping.

pub mod app;
pub mod config;
pub mod context;
pub mod cookies;
pub mod middleware;
pub mod workspace;
