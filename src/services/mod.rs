pub mod bot;
pub mod notifier;
