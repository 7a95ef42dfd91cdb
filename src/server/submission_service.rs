use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

use super::{DuelServer, ProtocolViolation};
use crate::clock;
use crate::judge::{JudgeError, JudgeRequest, JudgeVerdict};
use crate::metrics::{JUDGE_RUN_ALL, JUDGE_RUN_SAMPLE};
use crate::protocol::{validation, ServerMessage, SessionId};
use crate::session::submission::{failed_verdict, stamp_verdict};
use crate::session::SessionError;

impl DuelServer {
    /// Judge against the sample tests. Never touches session state.
    pub(crate) async fn handle_run_sample(
        self: &Arc<Self>,
        player_id: &str,
        session_id: SessionId,
        code: String,
        language: String,
    ) -> Result<(), ProtocolViolation> {
        validation::validate_code_with_config(&code, &self.config.protocol)
            .map_err(ProtocolViolation::InvalidInput)?;
        let handle = self.participant_session(player_id, session_id)?;
        if !handle.question().supports_language(&language) {
            return Err(SessionError::UnsupportedLanguage(language).into());
        }

        self.metrics.increment_sample_runs();
        let request = JudgeRequest::new(handle.question(), language, code);
        let server = Arc::clone(self);
        let player_id = player_id.to_string();
        tokio::spawn(async move {
            let result = server.timed_judge_call(JUDGE_RUN_SAMPLE, &request).await;
            let verdict = match result {
                Ok(raw) => stamp_verdict(raw, 0),
                Err(err) => failed_verdict(&err, 0),
            };
            server
                .send_to_player(
                    &player_id,
                    ServerMessage::SampleResult {
                        session_id,
                        verdict,
                    },
                )
                .await;
        });
        Ok(())
    }

    /// Judge the full suite outside the session actor, then apply the verdict through it.
    pub(crate) async fn handle_submit_solution(
        self: &Arc<Self>,
        player_id: &str,
        session_id: SessionId,
        code: String,
        language: String,
        client_elapsed_ms: Option<u64>,
    ) -> Result<(), ProtocolViolation> {
        validation::validate_code_with_config(&code, &self.config.protocol)
            .map_err(ProtocolViolation::InvalidInput)?;
        let handle = self.participant_session(player_id, session_id)?;
        if !handle.question().supports_language(&language) {
            return Err(SessionError::UnsupportedLanguage(language).into());
        }
        let ticket = handle.begin_submission(player_id).await?;

        self.metrics.increment_submissions();
        let request = JudgeRequest::new(&ticket.question, language, code);
        let server = Arc::clone(self);
        let player_id = player_id.to_string();
        tokio::spawn(async move {
            let result = server.timed_judge_call(JUDGE_RUN_ALL, &request).await;
            let elapsed_ms = clock::elapsed_ms(Utc::now(), ticket.start_time);
            if let Some(client_elapsed_ms) = client_elapsed_ms {
                tracing::debug!(%player_id, elapsed_ms, client_elapsed_ms, "Submission timing");
            }
            let verdict = match result {
                Ok(raw) => stamp_verdict(raw, elapsed_ms),
                Err(err) => failed_verdict(&err, elapsed_ms),
            };

            match handle.record_verdict(&player_id, verdict.clone()).await {
                Ok(()) => {}
                Err(SessionError::Closed) => {
                    server
                        .send_to_player(
                            &player_id,
                            ServerMessage::SubmissionResult {
                                session_id,
                                verdict,
                            },
                        )
                        .await;
                }
                Err(err) => {
                    tracing::debug!(%player_id, %err, "Verdict arrived after the match ended");
                }
            }
        });
        Ok(())
    }

    async fn timed_judge_call(
        &self,
        operation: &'static str,
        request: &JudgeRequest,
    ) -> Result<JudgeVerdict, JudgeError> {
        let started = Instant::now();
        let result = if operation == JUDGE_RUN_SAMPLE {
            self.judge.run_sample(request).await
        } else {
            self.judge.run_all(request).await
        };
        self.metrics
            .record_judge_latency(operation, started.elapsed())
            .await;
        if let Err(err) = &result {
            self.metrics.increment_judge_failures();
            tracing::warn!(question = %request.question, %err, "Judge call failed");
        }
        result
    }
}
