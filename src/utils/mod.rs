//! Supporting utilities: configuration, logging and crypto helpers.

pub mod config;
pub mod crypto;
pub mod logging;
