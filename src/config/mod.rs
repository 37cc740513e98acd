// src/config/mod.rs
pub mod bot;

pub use bot::{BotConfig, ConfigState};
