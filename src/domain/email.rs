use chrono::DateTime;
use chrono_tz::Tz;
use std::fmt;

/// Mailbox-assigned handle (IMAP UID rendered as text).
pub type MessageId = String;

/// Date layout used in the persisted table.
pub const TABLE_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A message exactly as the mailbox returned it.
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub id: MessageId,
    pub rfc822: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ParsedEmail {
    pub sender: String,
    pub subject: String,
    pub body: String,
    pub timestamp: DateTime<Tz>,
}

/// Hiring-funnel category, listed in matching precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    InterviewInvite,
    Rejection,
    Shortlisted,
    Offer,
    ApplicationAcknowledged,
    Other,
}

impl Classification {
    pub fn label(self) -> &'static str {
        match self {
            Classification::InterviewInvite => "Interview Invite",
            Classification::Rejection => "Rejection",
            Classification::Shortlisted => "Shortlisted",
            Classification::Offer => "Offer",
            Classification::ApplicationAcknowledged => "Application Acknowledged",
            Classification::Other => "Other",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What the stage classifier produced for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Category(Classification),
    Highlight(bool),
}

impl Stage {
    /// Text written into the last table column.
    pub fn cell(self) -> &'static str {
        match self {
            Stage::Category(c) => c.label(),
            Stage::Highlight(true) => "yes",
            Stage::Highlight(false) => "",
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutputRow {
    pub sender: String,
    pub timestamp: DateTime<Tz>,
    pub subject: String,
    pub summary: String,
    pub stage: Stage,
}

impl OutputRow {
    pub fn date_cell(&self) -> String {
        self.timestamp.format(TABLE_DATE_FORMAT).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn stage_cells_match_table_vocabulary() {
        assert_eq!(
            Stage::Category(Classification::ApplicationAcknowledged).cell(),
            "Application Acknowledged"
        );
        assert_eq!(Stage::Highlight(true).cell(), "yes");
        assert_eq!(Stage::Highlight(false).cell(), "");
    }

    #[test]
    fn date_cell_uses_local_wall_clock() {
        let ts = chrono_tz::Europe::Dublin
            .with_ymd_and_hms(2024, 7, 3, 9, 5, 0)
            .unwrap();
        let row = OutputRow {
            sender: "hr@example.com".into(),
            timestamp: ts,
            subject: "Interview".into(),
            summary: "Interview on Friday.".into(),
            stage: Stage::Category(Classification::InterviewInvite),
        };
        assert_eq!(row.date_cell(), "2024-07-03 09:05:00");
    }
}
