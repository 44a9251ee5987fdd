use async_trait::async_trait;

use crate::error::ChannelError;


/// Outbound side of a chat transport.
#[async_trait]
pub trait CommunicationChannel: Send + Sync {
    async fn send_message(&self, recipient: &str, message: &str) -> Result<(), ChannelError>;
}
