pub mod decoders;
pub mod extract;
pub mod imap_client;

use anyhow::Result;

use crate::domain::email::{MessageId, RawMessage};

/// The two mailbox operations a run needs.
pub trait Mailbox {
    /// Ids of at most `max` messages matching `query`, newest first.
    /// `None` means every message in the mailbox.
    fn list_message_ids(&mut self, query: Option<&str>, max: u32) -> Result<Vec<MessageId>>;

    fn fetch_message(&mut self, id: &MessageId) -> Result<RawMessage>;

    /// End the session. Called once at the end of a run, successful or not.
    fn logout(&mut self) -> Result<()> {
        Ok(())
    }
}
