use async_trait::async_trait;

use crate::error::Result;

/// Outbound half of the chat transport: deliver a plain-text message to a
/// user id. The daemon wires this to an SSE broadcast; tests record calls.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_message(&self, user_id: i64, text: &str) -> Result<()>;
}
