//! HTTP server module for the teacher hub.
//!
//! This module provides an axum-based HTTP server exposing the server-side
//! functions and the classroom REST API. It reuses the service layer and the
//! repository pattern from the core library.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  HTTP Layer (axum handlers)                              │
//! │  - Bearer credential resolution                          │
//! │  - JSON serialization/deserialization                    │
//! │  - CORS, tracing, error bodies                           │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Service Layer (services/, db/services.rs)               │
//! │  - Teacher deletion, broadcast dispatch, name extraction │
//! │  - Teacher-scoped classroom operations                   │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Repository Layer (db/)                                  │
//! │  - LocalRepository / HostedRepository                    │
//! └──────────────────────────────────────────────────────────┘
//! ```

#[cfg(feature = "http-server")]
pub mod auth;

#[cfg(feature = "http-server")]
pub mod functions;

#[cfg(feature = "http-server")]
pub mod handlers;

#[cfg(feature = "http-server")]
pub mod router;

#[cfg(feature = "http-server")]
pub mod state;

#[cfg(feature = "http-server")]
pub mod error;

#[cfg(feature = "http-server")]
pub mod dto;

#[cfg(feature = "http-server")]
pub use router::create_router;

#[cfg(feature = "http-server")]
pub use state::AppState;
