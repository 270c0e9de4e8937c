#![warn(missing_docs)]

//! Guardpost engine: access resolution, sliding-window rate limiting, and
//! tenant configuration caching for a multi-tenant messaging integration.

pub mod access;
pub mod admin;
pub mod cache;
pub mod command;
pub mod config;
pub mod error;
pub mod mitigation;
pub mod rate_limit;
pub mod store;
pub mod sweep;
pub mod types;
pub mod window;
