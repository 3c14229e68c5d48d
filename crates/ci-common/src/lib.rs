//! Shared vocabulary for the OAI SPGW CI tools.
//!
//! This crate provides the pieces every subcommand agrees on:
//! - Network-function identities and their log file naming
//! - Archive directory layout
//! - Log-marker scanning
//! - Logging setup

pub mod log;
pub mod nf;
pub mod paths;
pub mod scan;

pub use nf::NetworkFunction;
pub use paths::ArchivePaths;
