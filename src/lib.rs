pub mod config;
pub mod daemon;
pub mod domains;
pub mod error;
pub mod interfaces;
pub mod services;
pub mod store;

pub use crate::config::Config;
pub use crate::error::{CountdownBotError, Result};
pub use crate::services::bot::ReminderBot;
pub use crate::store::ScheduleStore;
