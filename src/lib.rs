//! Core of the documentation chat client: state, persistence, HTTP and rendering.
//!
//! Everything here is free of GTK so it can be exercised without a display; the
//! relm4 front end lives in the `docs-chat` binary behind the `gui` feature.

pub mod api;
pub mod config;
pub mod models;
pub mod services;
