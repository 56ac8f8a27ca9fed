pub mod cli;
pub mod config;
pub mod git;
pub mod resolver;

mod api;

pub use api::{Kclone, KcloneBuilder, KcloneError};
