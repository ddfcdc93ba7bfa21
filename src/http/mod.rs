//! HTTP surface: limiter middleware, admin endpoints, and the server.

pub mod admin;
pub mod middleware;
pub mod routes;
pub mod server;

pub use server::HttpServer;
