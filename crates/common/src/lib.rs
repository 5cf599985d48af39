//! Shared configuration, errors and domain types for Herald crates.

pub mod config;
pub mod db;
pub mod error;
pub mod types;
