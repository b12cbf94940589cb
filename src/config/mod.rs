//! # Configuration Module
//!
//! Validated scanner settings shared by the CLI and library callers.

pub mod config;

pub use config::ScannerConfig;
