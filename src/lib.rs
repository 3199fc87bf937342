//! admindash - admin dashboard backend
//!
//! REST API for user accounts, sessions, roles and the activity log, with
//! input sanitization and request logging, plus a typed client for the API.

pub mod api;
pub mod client;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
