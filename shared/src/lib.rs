//! Shared types, error definitions, and the download registry used by
//! every Mediagrab crate.

pub mod db;
pub mod errors;
pub mod models;
