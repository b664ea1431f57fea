//! Pulsewatch API server library.
//!
//! Exposes config, state, error handling, routes and the router builder so
//! integration tests and the binary entrypoint share them.

pub mod app;
pub mod background;
pub mod config;
pub mod error;
pub mod handlers;
pub mod ingest;
pub mod query;
pub mod response;
pub mod routes;
pub mod state;
