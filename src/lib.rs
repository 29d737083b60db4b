//! Session bootstrap, fee pricing and single-flight payment orchestration.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
pub mod logging;
