use anyhow::{Context, Result};
use chrono_tz::Tz;
use log::{debug, info, warn};

use crate::config::Config;
use crate::domain::email::OutputRow;
use crate::mail::Mailbox;
use crate::mail::decoders::normalize_snippet;
use crate::mail::extract::extract;
use crate::pipeline::classifier::StageClassifier;
use crate::pipeline::filter::RelevanceFilter;
use crate::pipeline::summarizer::Summarizer;
use crate::store::repo::TableRepository;

/// The pure, per-message part of a run.
pub struct Pipeline {
    pub timezone: Tz,
    pub filter: RelevanceFilter,
    pub classifier: StageClassifier,
}

impl Pipeline {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        Ok(Self {
            timezone: cfg.timezone()?,
            filter: RelevanceFilter::new(&cfg.filter),
            classifier: StageClassifier::from_config(&cfg.classifier),
        })
    }
}

pub struct RunOptions {
    /// Mailbox search; `None` fetches everything and filters locally.
    pub query: Option<String>,
    pub batch_size: u32,
}

/// Counts for one run, mostly for the log.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub listed: usize,
    pub fetched: usize,
    pub extracted: usize,
    pub accepted: usize,
    pub summaries_requested: usize,
}

/// Fetch one batch and turn the relevant messages into rows, newest first.
///
/// Only a failed listing is an error. A message that cannot be fetched or
/// parsed is logged and left out.
pub fn collect_rows(
    mailbox: &mut dyn Mailbox,
    pipeline: &Pipeline,
    summarizer: &mut Summarizer,
    options: &RunOptions,
) -> Result<(Vec<OutputRow>, RunReport)> {
    let ids = mailbox
        .list_message_ids(options.query.as_deref(), options.batch_size)
        .context("listing messages")?;

    let mut report = RunReport {
        listed: ids.len(),
        ..Default::default()
    };
    let mut rows = Vec::new();

    for id in &ids {
        let raw = match mailbox.fetch_message(id) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("skipping message {id}: fetch failed: {e:#}");
                continue;
            }
        };
        report.fetched += 1;

        let email = match extract(&raw, pipeline.timezone) {
            Ok(email) => email,
            Err(e) => {
                warn!("skipping message {id}: {e}");
                continue;
            }
        };
        report.extracted += 1;

        if !pipeline.filter.is_relevant(&email) {
            debug!(
                "message {id} not relevant: {:?} / {}",
                email.subject,
                normalize_snippet(&email.body, 80)
            );
            continue;
        }
        report.accepted += 1;

        let stage = pipeline.classifier.classify(&email.subject, &email.body);
        let summary = summarizer.summarize(&email.body, Some(&email.subject), Some(&email.sender));

        rows.push(OutputRow {
            sender: email.sender,
            timestamp: email.timestamp,
            subject: email.subject,
            summary,
            stage,
        });
    }

    // stable: equal timestamps keep fetch order
    rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    report.summaries_requested = summarizer.cache().len();
    Ok((rows, report))
}

/// One complete run: fetch, classify, summarize, then replace the table.
///
/// If listing fails the previous table is left as it was. The mailbox is
/// logged out either way.
pub fn run(
    mailbox: &mut dyn Mailbox,
    pipeline: &Pipeline,
    summarizer: &mut Summarizer,
    store: &dyn TableRepository,
    options: &RunOptions,
) -> Result<RunReport> {
    let collected = collect_rows(mailbox, pipeline, summarizer, options);
    if let Err(e) = mailbox.logout() {
        warn!("logout failed: {e:#}");
    }
    let (rows, report) = collected?;
    store
        .replace_all(&rows, pipeline.classifier.mode())
        .context("writing output table")?;
    info!(
        "{} listed, {} fetched, {} parsed, {} relevant; table replaced",
        report.listed, report.fetched, report.extracted, report.accepted
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::email::{Classification, MessageId, RawMessage, Stage};
    use crate::llm::{GenerateError, Generator};
    use crate::pipeline::classifier::{ClassifierConfig, ClassifierMode};
    use crate::pipeline::filter::FilterRules;
    use crate::store::repo::StoredTable;
    use anyhow::anyhow;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::rc::Rc;

    /// In-memory mailbox; ids listed in insertion order.
    #[derive(Default)]
    struct FakeMailbox {
        order: Vec<MessageId>,
        messages: HashMap<MessageId, Vec<u8>>,
        listing_fails: bool,
        last_query: Option<String>,
        logouts: usize,
    }

    impl FakeMailbox {
        fn add(&mut self, id: &str, sender: &str, subject: &str, date: &str, body: &str) {
            let text = format!(
                "From: {sender}\r\nSubject: {subject}\r\nDate: {date}\r\n\
                 Content-Type: text/plain\r\n\r\n{body}\r\n"
            );
            self.order.push(id.to_string());
            self.messages.insert(id.to_string(), text.into_bytes());
        }

        fn add_missing(&mut self, id: &str) {
            self.order.push(id.to_string());
        }
    }

    impl Mailbox for FakeMailbox {
        fn list_message_ids(&mut self, query: Option<&str>, max: u32) -> Result<Vec<MessageId>> {
            if self.listing_fails {
                return Err(anyhow!("IMAP connection reset"));
            }
            self.last_query = query.map(str::to_string);
            Ok(self.order.iter().take(max as usize).cloned().collect())
        }

        fn fetch_message(&mut self, id: &MessageId) -> Result<RawMessage> {
            let rfc822 = self
                .messages
                .get(id)
                .cloned()
                .ok_or_else(|| anyhow!("UID {id} vanished"))?;
            Ok(RawMessage {
                id: id.clone(),
                rfc822,
            })
        }

        fn logout(&mut self) -> Result<()> {
            self.logouts += 1;
            Ok(())
        }
    }

    struct CountingGenerator {
        calls: Rc<Cell<usize>>,
    }

    impl Generator for CountingGenerator {
        fn generate(&self, _system: &str, _user: &str) -> Result<String, GenerateError> {
            self.calls.set(self.calls.get() + 1);
            Ok(format!("summary {}", self.calls.get()))
        }
    }

    /// Table store that keeps the last write in memory.
    #[derive(Default)]
    struct MemoryTable {
        written: RefCell<Option<(Vec<OutputRow>, ClassifierMode)>>,
    }

    impl TableRepository for MemoryTable {
        fn replace_all(&self, rows: &[OutputRow], mode: ClassifierMode) -> Result<()> {
            *self.written.borrow_mut() = Some((rows.to_vec(), mode));
            Ok(())
        }

        fn load(&self) -> Result<Option<StoredTable>> {
            Ok(None)
        }
    }

    fn pipeline(mode: ClassifierMode) -> Pipeline {
        Pipeline {
            timezone: chrono_tz::Europe::Dublin,
            filter: RelevanceFilter::new(&FilterRules::default()),
            classifier: StageClassifier::from_config(&ClassifierConfig {
                mode,
                ..Default::default()
            }),
        }
    }

    fn options(batch_size: u32) -> RunOptions {
        RunOptions {
            query: Some("subject:job".into()),
            batch_size,
        }
    }

    fn counting_summarizer() -> (Summarizer, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let generator = CountingGenerator {
            calls: Rc::clone(&calls),
        };
        (Summarizer::new(Some(Box::new(generator))), calls)
    }

    fn collect(
        mailbox: &mut FakeMailbox,
        summarizer: &mut Summarizer,
        batch_size: u32,
    ) -> (Vec<OutputRow>, RunReport) {
        let pipeline = pipeline(ClassifierMode::Category);
        collect_rows(mailbox, &pipeline, summarizer, &options(batch_size)).unwrap()
    }

    const ACK_BODY: &str = "We received your application for the Platform Engineer role.";

    #[test]
    fn rows_are_filtered_classified_and_sorted() {
        let mut mailbox = FakeMailbox::default();
        mailbox.add(
            "1",
            "jobs@linkedin.com",
            "New jobs posted",
            "Mon, 01 Jul 2024 09:00:00 +0000",
            "newsletter digest",
        );
        mailbox.add(
            "2",
            "noreply@myworkday.com",
            "Your application",
            "Mon, 01 Jul 2024 10:00:00 +0000",
            ACK_BODY,
        );
        mailbox.add(
            "3",
            "hr@acme.example",
            "Interview invitation",
            "Wed, 03 Jul 2024 15:30:00 +0000",
            "We would like to invite you to an interview next Tuesday at 10am.",
        );
        mailbox.add(
            "4",
            "friend@example.com",
            "Dinner",
            "Tue, 02 Jul 2024 19:00:00 +0000",
            "See you at eight, bring snacks please!",
        );

        let (mut summarizer, _) = counting_summarizer();
        let (rows, report) = collect(&mut mailbox, &mut summarizer, 50);

        assert_eq!(mailbox.last_query.as_deref(), Some("subject:job"));
        assert_eq!(report.listed, 4);
        assert_eq!(report.extracted, 4);
        assert_eq!(report.accepted, 2);

        let subjects: Vec<&str> = rows.iter().map(|r| r.subject.as_str()).collect();
        assert_eq!(subjects, ["Interview invitation", "Your application"]);
        assert_eq!(rows[0].stage, Stage::Category(Classification::InterviewInvite));
        assert_eq!(rows[1].stage, Stage::Category(Classification::ApplicationAcknowledged));
        assert_eq!(rows[1].date_cell(), "2024-07-01 10:00:00");
    }

    #[test]
    fn sort_is_descending_and_stable() {
        let mut mailbox = FakeMailbox::default();
        let dates = [
            ("a", "Mon, 01 Jul 2024 09:00:00 +0000"),
            ("b", "Fri, 05 Jul 2024 09:00:00 +0000"),
            ("c", "Wed, 03 Jul 2024 09:00:00 +0000"),
            ("d", "Fri, 05 Jul 2024 09:00:00 +0000"),
        ];
        for (id, date) in dates {
            mailbox.add(id, "talent@acme.example", &format!("Application {id}"), date, "short");
        }

        let mut summarizer = Summarizer::new(None);
        let (rows, _) = collect(&mut mailbox, &mut summarizer, 50);

        let subjects: Vec<&str> = rows.iter().map(|r| r.subject.as_str()).collect();
        assert_eq!(
            subjects,
            ["Application b", "Application d", "Application c", "Application a"]
        );
        assert!(rows.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    }

    #[test]
    fn identical_bodies_share_one_summary() {
        let mut mailbox = FakeMailbox::default();
        mailbox.add(
            "1",
            "noreply@myworkday.com",
            "Application: Backend",
            "Mon, 01 Jul 2024 10:00:00 +0000",
            ACK_BODY,
        );
        mailbox.add(
            "2",
            "noreply@myworkday.com",
            "Application: Frontend",
            "Tue, 02 Jul 2024 10:00:00 +0000",
            ACK_BODY,
        );

        let (mut summarizer, calls) = counting_summarizer();
        let (rows, report) = collect(&mut mailbox, &mut summarizer, 50);

        assert_eq!(calls.get(), 1);
        assert_eq!(report.summaries_requested, 1);
        assert_eq!(rows[0].summary, rows[1].summary);
    }

    #[test]
    fn broken_messages_are_skipped() {
        let mut mailbox = FakeMailbox::default();
        mailbox.add_missing("1");
        mailbox.add("2", "noreply@myworkday.com", "Your application", "not a date", ACK_BODY);

        let mut summarizer = Summarizer::new(None);
        let (rows, report) = collect(&mut mailbox, &mut summarizer, 50);

        assert_eq!(report.listed, 2);
        assert_eq!(report.fetched, 1);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].summary, crate::pipeline::summarizer::SUMMARY_DISABLED);
    }

    #[test]
    fn batch_size_bounds_the_fetch() {
        let mut mailbox = FakeMailbox::default();
        for i in 0..5 {
            mailbox.add(
                &i.to_string(),
                "noreply@myworkday.com",
                "Your application",
                "Mon, 01 Jul 2024 10:00:00 +0000",
                ACK_BODY,
            );
        }
        let mut summarizer = Summarizer::new(None);
        let (rows, report) = collect(&mut mailbox, &mut summarizer, 3);
        assert_eq!(report.listed, 3);
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn nothing_relevant_still_writes_a_table() {
        let mut mailbox = FakeMailbox::default();
        mailbox.add(
            "1",
            "friend@example.com",
            "Dinner",
            "Mon, 01 Jul 2024 10:00:00 +0000",
            "See you later",
        );

        let store = MemoryTable::default();
        let mut summarizer = Summarizer::new(None);
        let report = run(
            &mut mailbox,
            &pipeline(ClassifierMode::Highlight),
            &mut summarizer,
            &store,
            &options(50),
        )
        .unwrap();

        assert_eq!(report.accepted, 0);
        assert_eq!(mailbox.logouts, 1);
        let written = store.written.borrow();
        let (rows, mode) = written.as_ref().unwrap();
        assert!(rows.is_empty());
        assert_eq!(*mode, ClassifierMode::Highlight);
    }

    #[test]
    fn failed_listing_leaves_table_alone() {
        let mut mailbox = FakeMailbox {
            listing_fails: true,
            ..Default::default()
        };
        let store = MemoryTable::default();
        let mut summarizer = Summarizer::new(None);

        let result = run(
            &mut mailbox,
            &pipeline(ClassifierMode::Category),
            &mut summarizer,
            &store,
            &options(50),
        );

        assert!(result.is_err());
        assert!(store.written.borrow().is_none());
        assert_eq!(mailbox.logouts, 1);
    }
}
