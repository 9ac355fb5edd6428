use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// Feedback as collected from the tooltip rating widget.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSubmission {
    pub question_id: String,
    pub clarity_rating: u8,
    pub feedback_text: String,
    #[serde(default)]
    pub difficult_terms: Vec<String>,
}

/// Stored feedback record. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEntry {
    pub id: String,
    pub question_id: String,
    pub clarity_rating: u8,
    pub feedback_text: String,
    pub difficult_terms: BTreeSet<String>,
    pub submitted_at: DateTime<Utc>,
}

/// One measurement of how hard a tooltip was to understand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsabilityMetricSample {
    /// Seconds.
    pub time_to_understand: f64,
    pub clicks_to_complete: u32,
    pub user_satisfaction: u8,
    pub recorded_at: DateTime<Utc>,
}

impl UsabilityMetricSample {
    pub fn new(time_to_understand: f64, clicks_to_complete: u32, user_satisfaction: u8) -> Self {
        Self {
            time_to_understand,
            clicks_to_complete,
            user_satisfaction,
            recorded_at: Utc::now(),
        }
    }
}

/// Summary for one question, recomputed on every request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedMetrics {
    pub average_clarity: f64,
    pub average_time_to_understand: f64,
    pub average_clicks: f64,
    pub average_satisfaction: f64,
    pub total_feedback_count: usize,
    pub total_metric_samples: usize,
    pub common_difficult_terms: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestingExport {
    pub feedback: Vec<FeedbackEntry>,
    pub metrics: BTreeMap<String, Vec<UsabilityMetricSample>>,
    pub export_date: DateTime<Utc>,
}
