//! # Teacher Hub Backend
//!
//! Server-side functions and data API for a classroom-management app built
//! on a hosted backend-as-a-service.
//!
//! ## Features
//!
//! - **Teacher deletion**: admin-only cascade over every table a teacher owns
//! - **Broadcast email**: personalised, checkpointed dispatch to a subscriber cohort
//! - **Name extraction**: student names from a photographed class list via an AI service
//! - **App links**: the iOS app-site-association descriptor
//! - **Classroom API**: teacher-scoped classrooms, students, attendance, grades and notes
//!
//! ## Architecture
//!
//! - [`api`]: Record and identifier types shared across layers
//! - [`db`]: Repository traits, local and hosted stores, classroom services
//! - [`services`]: Deletion, broadcast, email, name extraction, app links
//! - [`config`]: TOML and environment configuration
//! - [`http`]: Axum-based HTTP server and request handlers

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod api;
pub mod config;

pub mod db;
pub mod models;

pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
