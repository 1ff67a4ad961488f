//! Effect execution against a [`CodingApi`].

use tracing::{debug, info, instrument};

use super::{Completion, Effect, View};
use crate::adapters::CodingApi;
use crate::domain::FeedbackSubmission;
use crate::review::submit_each;

/// Runs view effects and feeds the results back
pub struct Driver<A> {
    api: A,
}

impl<A: CodingApi> Driver<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Run one effect to completion
    #[instrument(skip_all)]
    pub async fn execute(&self, effect: Effect) -> Completion {
        match effect {
            Effect::Analyze { token, text } => {
                debug!(token, text_len = text.len(), "Analyzing");
                Completion::Analyzed {
                    token,
                    result: self.api.analyze(&text).await,
                }
            }
            Effect::SubmitRepair(payload) => {
                Completion::RepairSubmitted(self.api.submit_repair(&payload).await)
            }
            Effect::LoadPredictions(query) => {
                Completion::PredictionsLoaded(self.api.list_predictions(query).await)
            }
            Effect::LoadPrediction { token, id } => Completion::PredictionLoaded {
                token,
                result: self.api.get_prediction(&id).await,
            },
            Effect::SubmitFeedback { token, id, feedback } => {
                let result = self.api.submit_feedback(&id, &feedback).await;
                if result.is_ok() {
                    info!(%id, feedback_type = feedback.feedback_type.as_str(), "Feedback submitted");
                }
                Completion::FeedbackSubmitted { token, id, result }
            }
            Effect::BulkFeedback {
                action,
                ids,
                validated_by,
            } => {
                let api = &self.api;
                let validated_by = validated_by.as_str();
                let outcome = submit_each(action, ids, move |action, id| async move {
                    let feedback =
                        FeedbackSubmission::bulk(validated_by, action.feedback_type()).map_err(|e| e.to_string())?;
                    api.submit_feedback(&id, &feedback)
                        .await
                        .map(|_| ())
                        .map_err(|e| e.to_string())
                })
                .await;
                info!(
                    ?action,
                    succeeded = outcome.succeeded.len(),
                    failed = outcome.failed.len(),
                    "Bulk feedback finished"
                );
                Completion::BulkFinished(outcome)
            }
        }
    }

    /// Deliver a message and run effects until the view settles
    pub async fn dispatch<V: View>(&self, view: &mut V, msg: V::Msg) {
        let mut next = Some(msg);
        while let Some(msg) = next.take() {
            if let Some(effect) = view.update(msg) {
                next = V::on_completion(self.execute(effect).await);
            }
        }
    }
}
