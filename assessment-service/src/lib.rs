pub mod config;
pub mod error;
pub mod handlers;
pub mod intake;
pub mod pipeline;
pub mod prompts;
pub mod render;
pub mod services;
pub mod startup;

pub use startup::{AppState, Application};
