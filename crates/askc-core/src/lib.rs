//! askc core: backend normalization, suggestions, and the query service.

pub mod backend;
pub mod prompt;
pub mod service;
pub mod suggestion;
