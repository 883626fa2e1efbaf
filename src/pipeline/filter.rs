use log::debug;
use serde::{Deserialize, Serialize};

use crate::domain::email::ParsedEmail;
use crate::pipeline::{contains_any, lowercase_all, strings};

/// Sender and keyword lists, matched as case-insensitive substrings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterRules {
    pub excluded_senders: Vec<String>,
    pub excluded_keywords: Vec<String>,
    pub included_senders: Vec<String>,
    pub included_keywords: Vec<String>,
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            excluded_senders: strings(&[
                "linkedin.com",
                "indeed.com",
                "tcsion.com",
                "github.com",
                "vodafone",
                "aib.ie",
                "jobs2web.com",
                "match.indeed.com",
                "noreply@linkedin.com",
                "messaging-digest-noreply@linkedin.com",
            ]),
            excluded_keywords: strings(&[
                "newsletter",
                "digest",
                "job alert",
                "jobs posted",
                "recommended jobs",
                "webinar",
            ]),
            included_senders: strings(&[
                "myworkday.com",
                "greenhouse.io",
                "lever.co",
                "smartrecruiters.com",
                "workablemail.com",
                "icims.com",
                "successfactors",
                "taleo.net",
                "ashbyhq.com",
                "teamtailor",
            ]),
            included_keywords: strings(&[
                "application",
                "applied",
                "interview",
                "candidate",
                "recruit",
                "hiring",
                "position",
                "shortlisted",
                "assessment",
                "job offer",
            ]),
        }
    }
}

/// Why a message was kept or dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    ExcludedSender,
    ExcludedKeyword,
    IncludedSender,
    IncludedKeyword,
    NoMatch,
}

impl Verdict {
    pub fn accepted(self) -> bool {
        matches!(self, Verdict::IncludedSender | Verdict::IncludedKeyword)
    }
}

/// Exclusions are checked before inclusions; the first hit decides.
#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    excluded_senders: Vec<String>,
    excluded_keywords: Vec<String>,
    included_senders: Vec<String>,
    included_keywords: Vec<String>,
}

impl RelevanceFilter {
    pub fn new(rules: &FilterRules) -> Self {
        Self {
            excluded_senders: lowercase_all(&rules.excluded_senders),
            excluded_keywords: lowercase_all(&rules.excluded_keywords),
            included_senders: lowercase_all(&rules.included_senders),
            included_keywords: lowercase_all(&rules.included_keywords),
        }
    }

    pub fn decide(&self, email: &ParsedEmail) -> Verdict {
        let sender = email.sender.to_lowercase();
        let subject = email.subject.to_lowercase();
        let body = email.body.to_lowercase();
        let text_has =
            |needles: &[String]| contains_any(&subject, needles) || contains_any(&body, needles);

        let verdict = if contains_any(&sender, &self.excluded_senders) {
            Verdict::ExcludedSender
        } else if text_has(self.excluded_keywords.as_slice()) {
            Verdict::ExcludedKeyword
        } else if contains_any(&sender, &self.included_senders) {
            Verdict::IncludedSender
        } else if text_has(self.included_keywords.as_slice()) {
            Verdict::IncludedKeyword
        } else {
            Verdict::NoMatch
        };
        debug!("{:?} <- {}", verdict, email.sender);
        verdict
    }

    pub fn is_relevant(&self, email: &ParsedEmail) -> bool {
        self.decide(email).accepted()
    }
}
