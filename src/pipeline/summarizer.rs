use log::{debug, warn};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::llm::Generator;

pub const SUMMARY_DISABLED: &str = "(Summary disabled - OPENAI_API_KEY not set)";
pub const TOO_SHORT: &str = "(Too short to summarize)";
pub const SUMMARY_FAILED: &str = "(Summary failed)";

/// Trimmed bodies shorter than this are never sent out.
pub const MIN_BODY_CHARS: usize = 30;
/// Only this much of a body goes into the prompt.
pub const MAX_PROMPT_CHARS: usize = 2000;

const SYSTEM_INSTRUCTION: &str = "\
You summarize job-related emails for a job seeker in 1-2 clear, concise sentences.
Use the first form that fits:
- \"Application submitted for <role> at <company>.\"
- \"Rejected for <role> at <company>.\"
- \"Next stage for <role> at <company>: <what is asked of the candidate>.\"
Otherwise write a plain 1-2 sentence summary.
If the email mentions a deadline or a date to respond by, include it.";

/// Summaries produced during one run, keyed by the hash of the trimmed body.
#[derive(Debug, Default)]
pub struct SummaryCache {
    entries: HashMap<String, String>,
}

impl SummaryCache {
    pub fn key_for(trimmed_body: &str) -> String {
        format!("{:x}", Sha256::digest(trimmed_body.as_bytes()))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: String, summary: String) {
        self.entries.insert(key, summary);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One summarizer per run; it owns the run's cache.
pub struct Summarizer {
    generator: Option<Box<dyn Generator>>,
    cache: SummaryCache,
}

impl Summarizer {
    /// `None` disables summarization (no API key configured).
    pub fn new(generator: Option<Box<dyn Generator>>) -> Self {
        Self {
            generator,
            cache: SummaryCache::default(),
        }
    }

    pub fn cache(&self) -> &SummaryCache {
        &self.cache
    }

    /// Always returns text; failures come back as placeholder strings.
    ///
    /// Equal bodies share one cache entry even when subject or sender differ,
    /// and a failed body is cached as failed so it is not requested twice.
    pub fn summarize(&mut self, body: &str, subject: Option<&str>, sender: Option<&str>) -> String {
        let Some(generator) = self.generator.as_deref() else {
            return SUMMARY_DISABLED.to_string();
        };

        let trimmed = body.trim();
        if trimmed.chars().count() < MIN_BODY_CHARS {
            return TOO_SHORT.to_string();
        }

        let key = SummaryCache::key_for(trimmed);
        if let Some(hit) = self.cache.get(&key) {
            debug!("summary cache hit {}", &key[..12]);
            return hit.to_string();
        }

        let prompt = user_prompt(trimmed, subject, sender);
        let summary = match generator.generate(SYSTEM_INSTRUCTION, &prompt) {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!("summarization failed: {e}");
                SUMMARY_FAILED.to_string()
            }
        };
        self.cache.insert(key, summary.clone());
        summary
    }
}

fn user_prompt(trimmed_body: &str, subject: Option<&str>, sender: Option<&str>) -> String {
    let mut prompt = String::from("Summarize this email for job application purposes:\n\n");
    let headers = [("Subject", subject), ("From", sender)];
    let mut wrote_header = false;
    for (name, value) in headers {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            prompt.push_str(&format!("{name}: {value}\n"));
            wrote_header = true;
        }
    }
    if wrote_header {
        prompt.push('\n');
    }
    prompt.extend(trimmed_body.chars().take(MAX_PROMPT_CHARS));
    prompt
}
