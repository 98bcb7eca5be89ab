//! Data module for the wallet guard

pub mod registry;
