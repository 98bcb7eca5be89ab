//! Wallet Guard Library
//!
//! Authenticates callers by proof of control of an Ethereum wallet and
//! authorizes them against an on-chain registry.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod constants;
pub mod data;
pub mod error;
pub mod log;
pub mod models;
pub mod services;
pub mod utils;

#[cfg(any(test, feature = "mocks"))]
pub mod test_utils;

pub use api::create_app;
pub use client::GuardClient;
pub use config::Config;
pub use error::{Error, Result};
