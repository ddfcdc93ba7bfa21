//! Floodgate - Per-Client Request Rate Limiting
//!
//! This crate implements an in-memory request rate limiter: a per-client
//! window counter that escalates to a timed block when exhausted, with a
//! periodic reaper bounding memory and an axum middleware surface that
//! applies named limiter policies to an HTTP pipeline. All state is
//! process-local and lost on restart.

pub mod config;
pub mod error;
pub mod http;
pub mod limit;
