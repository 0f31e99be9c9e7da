//! Message sink printing to stdout.

use async_trait::async_trait;
use redstar_bot::{ChannelId, DirectoryError, MemberId, MessageId, MessageSink, RecordingSink};

/// Prints outbound messages and keeps a channel log so status messages can
/// be fetched and edited.
#[derive(Debug, Default)]
pub struct ConsoleSink {
    log: RecordingSink,
}

impl ConsoleSink {
    /// Creates a sink with an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs an inbound message so `clear` can see it.
    pub fn record(&self, channel: ChannelId, content: &str) -> MessageId {
        self.log.post(channel, content)
    }
}

#[async_trait(?Send)]
impl MessageSink for ConsoleSink {
    async fn send(&self, channel: ChannelId, content: &str) -> Result<MessageId, DirectoryError> {
        let id = self.log.send(channel, content).await?;
        println!("[#{channel} {id}] {content}");
        Ok(id)
    }

    async fn send_direct(&self, member: MemberId, content: &str) -> Result<(), DirectoryError> {
        println!("[@{member}] {content}");
        self.log.send_direct(member, content).await
    }

    async fn fetch_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<Option<String>, DirectoryError> {
        self.log.fetch_message(channel, message).await
    }

    async fn edit_message(
        &self,
        channel: ChannelId,
        message: MessageId,
        content: &str,
    ) -> Result<(), DirectoryError> {
        self.log.edit_message(channel, message, content).await?;
        println!("[#{channel} {message} edited] {content}");
        Ok(())
    }

    async fn delete_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<(), DirectoryError> {
        self.log.delete_message(channel, message).await?;
        println!("[#{channel} {message} deleted]");
        Ok(())
    }

    async fn history(
        &self,
        channel: ChannelId,
        limit: usize,
    ) -> Result<Vec<MessageId>, DirectoryError> {
        self.log.history(channel, limit).await
    }

    async fn purge(
        &self,
        channel: ChannelId,
        limit: usize,
        after: Option<MessageId>,
    ) -> Result<usize, DirectoryError> {
        let removed = self.log.purge(channel, limit, after).await?;
        println!("[#{channel}] {removed} message(s) cleared");
        Ok(removed)
    }
}
