mod clone;
mod known_hosts;
pub mod progress;

pub use clone::{CloneError, GitCloner};
