//! CLI command implementations.

pub mod check;
pub mod common;
pub mod init;
pub mod objects;
pub mod render;
