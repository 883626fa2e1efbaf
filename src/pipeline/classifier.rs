use serde::{Deserialize, Serialize};

use crate::domain::email::{Classification, Stage};
use crate::pipeline::{contains_any, lowercase_all, strings};

/// Which shape the last table column takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierMode {
    /// One [`Classification`] label per row.
    #[default]
    Category,
    /// `yes` when a next-stage keyword appears, empty otherwise.
    Highlight,
}

impl ClassifierMode {
    pub fn column_header(self) -> &'static str {
        match self {
            ClassifierMode::Category => "Classification",
            ClassifierMode::Highlight => "Next Stage",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub mode: ClassifierMode,
    pub next_stage_keywords: Vec<String>,
    pub interview_keywords: Vec<String>,
    pub rejection_keywords: Vec<String>,
    pub shortlisted_keywords: Vec<String>,
    pub offer_keywords: Vec<String>,
    pub acknowledged_keywords: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            mode: ClassifierMode::Category,
            next_stage_keywords: strings(&[
                "interview",
                "next step",
                "next stage",
                "assessment",
                "shortlisted",
                "availability",
                "schedule a call",
            ]),
            interview_keywords: strings(&["interview"]),
            rejection_keywords: strings(&[
                "rejected",
                "unfortunately",
                "not to proceed",
                "not be moving forward",
                "unsuccessful",
            ]),
            shortlisted_keywords: strings(&["shortlisted", "selected"]),
            offer_keywords: strings(&["offer"]),
            acknowledged_keywords: strings(&[
                "application received",
                "received your application",
                "thank you for applying",
                "thanks for applying",
                "application has been submitted",
            ]),
        }
    }
}

/// Keyword classifier. Pure: the same text always gets the same stage.
#[derive(Debug, Clone)]
pub enum StageClassifier {
    /// Keyword sets in precedence order; first hit wins.
    Category(Vec<(Classification, Vec<String>)>),
    Highlight(Vec<String>),
}

impl StageClassifier {
    pub fn from_config(cfg: &ClassifierConfig) -> Self {
        match cfg.mode {
            ClassifierMode::Category => StageClassifier::Category(vec![
                (Classification::InterviewInvite, lowercase_all(&cfg.interview_keywords)),
                (Classification::Rejection, lowercase_all(&cfg.rejection_keywords)),
                (Classification::Shortlisted, lowercase_all(&cfg.shortlisted_keywords)),
                (Classification::Offer, lowercase_all(&cfg.offer_keywords)),
                (
                    Classification::ApplicationAcknowledged,
                    lowercase_all(&cfg.acknowledged_keywords),
                ),
            ]),
            ClassifierMode::Highlight => {
                StageClassifier::Highlight(lowercase_all(&cfg.next_stage_keywords))
            }
        }
    }

    pub fn mode(&self) -> ClassifierMode {
        match self {
            StageClassifier::Category(_) => ClassifierMode::Category,
            StageClassifier::Highlight(_) => ClassifierMode::Highlight,
        }
    }

    pub fn classify(&self, subject: &str, body: &str) -> Stage {
        match self {
            StageClassifier::Category(sets) => {
                let text = format!("{subject} {body}").to_lowercase();
                Stage::Category(
                    sets.iter()
                        .find(|(_, keywords)| contains_any(&text, keywords))
                        .map(|(class, _)| *class)
                        .unwrap_or(Classification::Other),
                )
            }
            StageClassifier::Highlight(keywords) => {
                let subject = subject.to_lowercase();
                let body = body.to_lowercase();
                Stage::Highlight(contains_any(&subject, keywords) || contains_any(&body, keywords))
            }
        }
    }
}
