mod types;

pub use types::{
    AggregatedMetrics, FeedbackEntry, FeedbackSubmission, TestingExport, UsabilityMetricSample,
    MAX_RATING, MIN_RATING,
};

use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::{ServiceError, ServiceResult},
    log_info,
};

const ENABLE_LOGS: bool = true;

/// Feedback and usability samples gathered during a tooltip user-testing
/// session.
///
/// State lives only as long as the service. Separate instances are fully
/// independent; clones share state.
pub struct TooltipTestingService {
    inner: Arc<Mutex<TestingState>>,
}

#[derive(Default)]
struct TestingState {
    feedback: Vec<FeedbackEntry>,
    metrics: BTreeMap<String, Vec<UsabilityMetricSample>>,
}

impl TooltipTestingService {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(TestingState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, TestingState> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Records feedback and returns the id assigned to it.
    pub fn submit_feedback(&self, submission: FeedbackSubmission) -> ServiceResult<String> {
        let question_id = validate_question_id(&submission.question_id)?;
        validate_rating("clarityRating", submission.clarity_rating)?;

        let difficult_terms: BTreeSet<String> = submission
            .difficult_terms
            .iter()
            .map(|term| term.trim())
            .filter(|term| !term.is_empty())
            .map(str::to_string)
            .collect();

        let entry = FeedbackEntry {
            id: Uuid::new_v4().to_string(),
            question_id,
            clarity_rating: submission.clarity_rating,
            feedback_text: submission.feedback_text,
            difficult_terms,
            submitted_at: Utc::now(),
        };
        let id = entry.id.clone();

        self.state().feedback.push(entry);
        Ok(id)
    }

    pub fn submit_metrics(
        &self,
        question_id: &str,
        sample: UsabilityMetricSample,
    ) -> ServiceResult<()> {
        let question_id = validate_question_id(question_id)?;
        if !sample.time_to_understand.is_finite() || sample.time_to_understand < 0.0 {
            return Err(ServiceError::InvalidInput(format!(
                "timeToUnderstand must be a non-negative number of seconds, got {}",
                sample.time_to_understand
            )));
        }
        validate_rating("userSatisfaction", sample.user_satisfaction)?;

        self.state()
            .metrics
            .entry(question_id)
            .or_default()
            .push(sample);
        Ok(())
    }

    pub fn get_feedback_history(&self) -> Vec<FeedbackEntry> {
        self.state().feedback.clone()
    }

    pub fn get_feedback_for_question(&self, question_id: &str) -> Vec<FeedbackEntry> {
        let question_id = question_id.trim();
        self.state()
            .feedback
            .iter()
            .filter(|entry| entry.question_id == question_id)
            .cloned()
            .collect()
    }

    pub fn get_all_metrics(&self) -> BTreeMap<String, Vec<UsabilityMetricSample>> {
        self.state().metrics.clone()
    }

    /// Unknown question ids aggregate to all zeros. Ids are trimmed the same
    /// way submissions are.
    pub fn get_aggregated_metrics(&self, question_id: &str) -> AggregatedMetrics {
        let question_id = question_id.trim();
        let state = self.state();

        let feedback: Vec<&FeedbackEntry> = state
            .feedback
            .iter()
            .filter(|entry| entry.question_id == question_id)
            .collect();
        let samples: &[UsabilityMetricSample] = state
            .metrics
            .get(question_id)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        let mut common_difficult_terms = BTreeMap::new();
        for entry in &feedback {
            for term in &entry.difficult_terms {
                *common_difficult_terms.entry(term.clone()).or_insert(0) += 1;
            }
        }

        AggregatedMetrics {
            average_clarity: average(
                feedback
                    .iter()
                    .map(|entry| f64::from(entry.clarity_rating)),
            ),
            average_time_to_understand: average(
                samples.iter().map(|sample| sample.time_to_understand),
            ),
            average_clicks: average(
                samples
                    .iter()
                    .map(|sample| f64::from(sample.clicks_to_complete)),
            ),
            average_satisfaction: average(
                samples
                    .iter()
                    .map(|sample| f64::from(sample.user_satisfaction)),
            ),
            total_feedback_count: feedback.len(),
            total_metric_samples: samples.len(),
            common_difficult_terms,
        }
    }

    pub fn clear_testing_data(&self) {
        let mut state = self.state();
        state.feedback.clear();
        state.metrics.clear();
        log_info!("Tooltip testing data cleared");
    }

    pub fn snapshot(&self) -> TestingExport {
        let state = self.state();
        TestingExport {
            feedback: state.feedback.clone(),
            metrics: state.metrics.clone(),
            export_date: Utc::now(),
        }
    }

    /// Serializes all feedback and samples plus an export timestamp.
    pub fn export_testing_data(&self) -> ServiceResult<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }

    pub fn write_export(&self, path: &Path) -> ServiceResult<()> {
        let payload = self.export_testing_data()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, payload)?;
        log_info!("Tooltip testing data exported to {}", path.display());
        Ok(())
    }
}

impl Default for TooltipTestingService {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for TooltipTestingService {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

fn average(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn validate_question_id(question_id: &str) -> ServiceResult<String> {
    let trimmed = question_id.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::InvalidInput("questionId is required".into()));
    }
    Ok(trimmed.to_string())
}

fn validate_rating(field: &str, rating: u8) -> ServiceResult<()> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(ServiceError::InvalidInput(format!(
            "{field} must be between {MIN_RATING} and {MAX_RATING}, got {rating}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn feedback(question_id: &str, clarity: u8, terms: &[&str]) -> FeedbackSubmission {
        FeedbackSubmission {
            question_id: question_id.into(),
            clarity_rating: clarity,
            feedback_text: "ok".into(),
            difficult_terms: terms.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn untouched_question_aggregates_to_zero() {
        let service = TooltipTestingService::new();

        let metrics = service.get_aggregated_metrics("never-seen");
        assert_eq!(metrics, AggregatedMetrics::default());
        assert_eq!(metrics.average_clarity, 0.0);
        assert!(!metrics.average_time_to_understand.is_nan());
        assert!(metrics.common_difficult_terms.is_empty());
    }

    #[test]
    fn averages_metric_samples() {
        let service = TooltipTestingService::new();
        service
            .submit_metrics("q1", UsabilityMetricSample::new(5.0, 2, 4))
            .unwrap();
        service
            .submit_metrics("q1", UsabilityMetricSample::new(10.0, 4, 3))
            .unwrap();

        let metrics = service.get_aggregated_metrics("q1");
        assert_eq!(metrics.average_time_to_understand, 7.5);
        assert_eq!(metrics.average_clicks, 3.0);
        assert_eq!(metrics.average_satisfaction, 3.5);
        assert_eq!(metrics.total_metric_samples, 2);
        assert_eq!(metrics.total_feedback_count, 0);
        assert_eq!(metrics.average_clarity, 0.0);
    }

    #[test]
    fn averages_clarity_and_counts_terms() {
        let service = TooltipTestingService::new();
        service
            .submit_feedback(feedback("q1", 4, &["median", "variance"]))
            .unwrap();
        service
            .submit_feedback(feedback("q1", 5, &["variance", " variance ", ""]))
            .unwrap();
        service.submit_feedback(feedback("q2", 1, &["median"])).unwrap();

        let metrics = service.get_aggregated_metrics("q1");
        assert_eq!(metrics.average_clarity, 4.5);
        assert_eq!(metrics.total_feedback_count, 2);
        assert_eq!(metrics.common_difficult_terms.get("variance"), Some(&2));
        assert_eq!(metrics.common_difficult_terms.get("median"), Some(&1));
        assert_eq!(metrics.common_difficult_terms.len(), 2);
    }

    #[test]
    fn submit_feedback_returns_unique_ids() {
        let service = TooltipTestingService::new();
        let first = service.submit_feedback(feedback("q1", 3, &[])).unwrap();
        let second = service.submit_feedback(feedback("q1", 3, &[])).unwrap();

        assert_ne!(first, second);
        let history = service.get_feedback_history();
        assert_eq!(history[0].id, first);
        assert_eq!(history[1].id, second);
    }

    #[test]
    fn returned_collections_are_copies() {
        let service = TooltipTestingService::new();
        service.submit_feedback(feedback("q1", 3, &[])).unwrap();
        service
            .submit_metrics("q1", UsabilityMetricSample::new(1.0, 1, 1))
            .unwrap();

        let mut history = service.get_feedback_history();
        history.clear();
        let mut metrics = service.get_all_metrics();
        metrics.get_mut("q1").unwrap().clear();

        assert_eq!(service.get_feedback_history().len(), 1);
        assert_eq!(service.get_all_metrics()["q1"].len(), 1);
    }

    #[test]
    fn rejects_out_of_range_input() {
        let service = TooltipTestingService::new();

        for clarity in [0, 6] {
            let err = service.submit_feedback(feedback("q1", clarity, &[])).unwrap_err();
            assert!(matches!(err, ServiceError::InvalidInput(_)));
        }
        assert!(matches!(
            service.submit_feedback(feedback("  ", 3, &[])),
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            service.submit_metrics("q1", UsabilityMetricSample::new(-1.0, 1, 3)),
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            service.submit_metrics("q1", UsabilityMetricSample::new(f64::NAN, 1, 3)),
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            service.submit_metrics("q1", UsabilityMetricSample::new(1.0, 1, 9)),
            Err(ServiceError::InvalidInput(_))
        ));

        assert!(service.get_feedback_history().is_empty());
        assert!(service.get_all_metrics().is_empty());
    }

    #[test]
    fn clear_resets_both_collections() {
        let service = TooltipTestingService::new();
        service.submit_feedback(feedback("q1", 3, &["x"])).unwrap();
        service
            .submit_metrics("q1", UsabilityMetricSample::new(1.0, 1, 1))
            .unwrap();

        service.clear_testing_data();

        assert!(service.get_feedback_history().is_empty());
        assert!(service.get_all_metrics().is_empty());
        assert_eq!(service.get_aggregated_metrics("q1"), AggregatedMetrics::default());
    }

    #[test]
    fn instances_are_independent_and_clones_share_state() {
        let first = TooltipTestingService::new();
        let second = TooltipTestingService::new();
        let shared = first.clone();

        first.submit_feedback(feedback("q1", 2, &[])).unwrap();

        assert!(second.get_feedback_history().is_empty());
        assert_eq!(shared.get_feedback_history().len(), 1);
    }

    #[test]
    fn feedback_for_question_filters_history() {
        let service = TooltipTestingService::new();
        service.submit_feedback(feedback("q1", 2, &[])).unwrap();
        service.submit_feedback(feedback("q2", 4, &[])).unwrap();

        let q2 = service.get_feedback_for_question("q2");
        assert_eq!(q2.len(), 1);
        assert_eq!(q2[0].clarity_rating, 4);
    }

    #[test]
    fn padded_question_ids_resolve_to_the_same_question() {
        let service = TooltipTestingService::new();
        service
            .submit_metrics(" q1 ", UsabilityMetricSample::new(4.0, 1, 5))
            .unwrap();
        service.submit_feedback(feedback("q1\t", 3, &["mode"])).unwrap();

        for id in ["q1", " q1 ", "\nq1"] {
            let metrics = service.get_aggregated_metrics(id);
            assert_eq!(metrics.total_metric_samples, 1, "id {id:?}");
            assert_eq!(metrics.total_feedback_count, 1, "id {id:?}");
            assert_eq!(service.get_feedback_for_question(id).len(), 1);
        }
        assert!(service.get_all_metrics().contains_key("q1"));
    }

    #[test]
    fn export_contains_feedback_metrics_and_date() {
        let service = TooltipTestingService::new();
        service.submit_feedback(feedback("q1", 4, &["term"])).unwrap();
        service.submit_feedback(feedback("q2", 5, &[])).unwrap();
        service
            .submit_metrics("q1", UsabilityMetricSample::new(5.0, 2, 4))
            .unwrap();

        let payload = service.export_testing_data().unwrap();
        let parsed: Value = serde_json::from_str(&payload).unwrap();

        assert_eq!(parsed["feedback"].as_array().unwrap().len(), 2);
        assert_eq!(parsed["feedback"][0]["clarityRating"], 4);
        assert_eq!(parsed["metrics"]["q1"][0]["clicksToComplete"], 2);
        let export_date = parsed["exportDate"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(export_date).is_ok());
    }

    #[test]
    fn write_export_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exports").join("session.json");
        let service = TooltipTestingService::new();
        service.submit_feedback(feedback("q1", 3, &[])).unwrap();

        service.write_export(&path).unwrap();

        let written: TestingExport =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.feedback.len(), 1);
        assert!(written.metrics.is_empty());
    }
}
