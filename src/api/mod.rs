//! API Module
//!
//! HTTP handlers and routing for the cache service REST API.
//!
//! # Endpoints
//! - `PUT /cache` - Cache a JSON value
//! - `GET /cache/:key` - Retrieve a value by key
//! - `DELETE /cache/:key` - Delete a key
//! - `DELETE /cache?pattern=<glob>` - Delete keys matching a glob
//! - `POST /clear` - Empty both tiers
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
