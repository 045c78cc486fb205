//! Command handlers.

pub mod config;
pub mod hydrate;
pub mod run;
