use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{SupabaseClient, SupabaseError};
use shared_llm::{GenerationOptions, LlmClient, LlmError};
use shared_models::auth::User;

use crate::models::{
    DynamicAnswerRequest, DynamicQuestionHistory, DynamicQuestionOutcome, QaPair, Question,
    SavedAnswer, StaticResponsesRequest, Survey, SurveyAnalysis, SurveyDetail, SurveyError,
    SurveyListEntry, SurveyResponse, SurveyStatus,
};
use crate::services::answers::validate_static_answers;
use crate::services::prompts::{
    build_question_context, build_summary_context, clean_question, parse_summary,
    placeholder_analysis, question_prompt, summary_prompt, SUMMARY_FAILED, SUMMARY_UNAVAILABLE,
};

const RESPONSE_SELECT: &str =
    "id,question_id,answer,created_at,question:survey_questions(question_text,question_type,display_order)";

const SUMMARY_MAX_TOKENS: u32 = 300;

#[derive(Debug, Deserialize)]
struct CountRow {
    count: usize,
}

#[derive(Debug, Deserialize)]
struct SurveyWithCount {
    #[serde(flatten)]
    survey: Survey,
    #[serde(default)]
    responses: Vec<CountRow>,
}

pub struct SurveyService {
    supabase: SupabaseClient,
    llm: LlmClient,
    max_dynamic_questions: usize,
}

impl SurveyService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            llm: LlmClient::new(config),
            max_dynamic_questions: config.max_dynamic_questions,
        }
    }

    // ==========================================================================
    // START / HISTORY / DETAIL
    // ==========================================================================

    /// Returns the patient's in-progress survey, creating one if needed. The
    /// flag is true when a new survey was created.
    pub async fn start_survey(&self, patient: &User, auth_token: &str) -> Result<(Survey, bool), SurveyError> {
        if let Some(existing) = self.find_in_progress(patient.id, auth_token).await? {
            debug!("Patient {} resumes survey {}", patient.id, existing.id);
            return Ok((existing, false));
        }

        let created: Result<Vec<Survey>, SupabaseError> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/surveys",
            Some(auth_token),
            Some(json!({ "patient_id": patient.id, "status": SurveyStatus::InProgress })),
            Some(SupabaseClient::representation_headers()),
        ).await;

        match created {
            Ok(rows) => {
                let survey = rows
                    .into_iter()
                    .next()
                    .ok_or_else(|| SurveyError::Database("Failed to create survey".to_string()))?;
                info!("Survey {} started for patient {}", survey.id, patient.id);
                Ok((survey, true))
            }
            Err(SupabaseError::Conflict { .. }) => {
                warn!("Concurrent survey start for patient {}; returning the existing one", patient.id);
                let survey = self
                    .find_in_progress(patient.id, auth_token)
                    .await?
                    .ok_or_else(|| SurveyError::Database("In-progress survey vanished after conflict".to_string()))?;
                Ok((survey, false))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_in_progress(&self, patient_id: Uuid, auth_token: &str) -> Result<Option<Survey>, SurveyError> {
        let path = format!(
            "/rest/v1/surveys?patient_id=eq.{}&status=eq.in_progress&order=started_at.desc&limit=1",
            patient_id
        );
        let rows: Vec<Survey> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn survey_history(&self, patient: &User, auth_token: &str) -> Result<Vec<SurveyListEntry>, SurveyError> {
        let path = format!(
            "/rest/v1/surveys?patient_id=eq.{}&select=*,responses:survey_responses(count)&order=started_at.desc",
            patient.id
        );
        let rows: Vec<SurveyWithCount> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;

        Ok(rows
            .into_iter()
            .map(|row| SurveyListEntry {
                total_responses: row.responses.first().map(|c| c.count).unwrap_or(0),
                survey: row.survey,
            })
            .collect())
    }

    pub async fn survey_detail(
        &self,
        patient: &User,
        survey_id: Uuid,
        auth_token: &str,
    ) -> Result<SurveyDetail, SurveyError> {
        let survey = self.get_owned_survey(patient, survey_id, auth_token).await?;

        let (responses, dynamic_questions) = futures::try_join!(
            self.get_static_responses(survey_id, auth_token),
            self.get_dynamic_history(survey_id, auth_token)
        )?;

        Ok(SurveyDetail {
            total_responses: responses.len(),
            survey,
            responses,
            dynamic_questions,
        })
    }

    async fn get_owned_survey(&self, patient: &User, survey_id: Uuid, auth_token: &str) -> Result<Survey, SurveyError> {
        let path = format!("/rest/v1/surveys?id=eq.{}&patient_id=eq.{}", survey_id, patient.id);
        let rows: Vec<Survey> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;
        rows.into_iter().next().ok_or(SurveyError::NotFound)
    }

    async fn get_in_progress_survey(
        &self,
        patient: &User,
        survey_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Survey, SurveyError> {
        let survey_id = survey_id.ok_or(SurveyError::MissingSurveyId)?;
        let survey = self.get_owned_survey(patient, survey_id, auth_token).await?;
        if survey.status == SurveyStatus::Completed {
            return Err(SurveyError::AlreadyCompleted);
        }
        Ok(survey)
    }

    // ==========================================================================
    // STATIC PHASE
    // ==========================================================================

    pub async fn static_questions(&self, auth_token: &str) -> Result<Vec<Question>, SurveyError> {
        let path = "/rest/v1/survey_questions?question_type=eq.static&is_active=eq.true&order=display_order.asc";
        Ok(self.supabase.request(Method::GET, path, Some(auth_token), None).await?)
    }

    /// Validates the whole batch, then writes it as one upsert so a rejected
    /// batch leaves no partial answers behind.
    pub async fn submit_static_responses(
        &self,
        patient: &User,
        request: StaticResponsesRequest,
        auth_token: &str,
    ) -> Result<Vec<SavedAnswer>, SurveyError> {
        if request.survey_id.is_none() {
            return Err(SurveyError::MissingSurveyId);
        }
        if request.responses.is_empty() {
            return Err(SurveyError::MissingResponses);
        }

        let survey = self.get_in_progress_survey(patient, request.survey_id, auth_token).await?;
        let catalog = self.static_questions(auth_token).await?;
        let validated = validate_static_answers(&catalog, &request.responses)?;

        let rows: Vec<_> = validated
            .iter()
            .map(|a| json!({
                "survey_id": survey.id,
                "question_id": a.question_id,
                "answer": a.answer,
            }))
            .collect();

        let _: Vec<serde_json::Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/survey_responses?on_conflict=survey_id,question_id",
            Some(auth_token),
            Some(json!(rows)),
            Some(SupabaseClient::prefer_headers("resolution=merge-duplicates,return=representation")),
        ).await?;

        info!("Saved {} static answers for survey {}", validated.len(), survey.id);

        Ok(validated
            .into_iter()
            .map(|a| SavedAnswer {
                question_id: a.question_id,
                question: a.question_text,
                answer: a.answer,
            })
            .collect())
    }

    async fn get_static_responses(&self, survey_id: Uuid, auth_token: &str) -> Result<Vec<SurveyResponse>, SurveyError> {
        let path = format!(
            "/rest/v1/survey_responses?survey_id=eq.{}&select={}",
            survey_id, RESPONSE_SELECT
        );
        let mut rows: Vec<SurveyResponse> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;
        rows.sort_by_key(|r| r.question.as_ref().map(|q| q.order).unwrap_or(i32::MAX));
        Ok(rows)
    }

    // ==========================================================================
    // DYNAMIC PHASE
    // ==========================================================================

    async fn get_dynamic_history(
        &self,
        survey_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<DynamicQuestionHistory>, SurveyError> {
        let path = format!(
            "/rest/v1/dynamic_question_history?survey_id=eq.{}&order=created_at.asc",
            survey_id
        );
        Ok(self.supabase.request(Method::GET, &path, Some(auth_token), None).await?)
    }

    /// Static answers (catalog order) and prior follow-ups (creation order).
    async fn load_answers(
        &self,
        survey_id: Uuid,
        auth_token: &str,
    ) -> Result<(Vec<QaPair>, Vec<QaPair>), SurveyError> {
        let (responses, history) = futures::try_join!(
            self.get_static_responses(survey_id, auth_token),
            self.get_dynamic_history(survey_id, auth_token)
        )?;

        let static_pairs = responses
            .into_iter()
            .map(|r| {
                let question = r.question.map(|q| q.question_text).unwrap_or_default();
                QaPair::new(question, r.answer)
            })
            .collect();
        let dynamic_pairs = history
            .into_iter()
            .map(|h| QaPair::new(h.question_text, h.answer))
            .collect();

        Ok((static_pairs, dynamic_pairs))
    }

    /// Never fails on generation problems: those become `Unavailable`, which
    /// the client treats as the end of the dynamic phase.
    pub async fn next_dynamic_question(
        &self,
        patient: &User,
        survey_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<DynamicQuestionOutcome, SurveyError> {
        let survey = self.get_in_progress_survey(patient, survey_id, auth_token).await?;
        let (static_pairs, dynamic_pairs) = self.load_answers(survey.id, auth_token).await?;

        let asked = dynamic_pairs.len();
        if asked >= self.max_dynamic_questions {
            debug!("Survey {} reached {} follow-up questions", survey.id, asked);
            return Ok(DynamicQuestionOutcome::LimitReached);
        }

        let context = build_question_context(&static_pairs, &dynamic_pairs);
        let prompt = question_prompt(&context, asked, self.max_dynamic_questions);

        match self.llm.generate(&prompt).await {
            Ok(raw) => Ok(DynamicQuestionOutcome::Question {
                question_text: clean_question(&raw),
                question_number: asked + 1,
            }),
            Err(e) => {
                warn!("Follow-up question generation failed for survey {}: {}", survey.id, e);
                Ok(DynamicQuestionOutcome::Unavailable)
            }
        }
    }

    pub async fn submit_dynamic_answer(
        &self,
        patient: &User,
        request: DynamicAnswerRequest,
        auth_token: &str,
    ) -> Result<DynamicQuestionHistory, SurveyError> {
        if request.survey_id.is_none() {
            return Err(SurveyError::MissingSurveyId);
        }
        let question_text = request.question_text.trim();
        if question_text.is_empty() {
            return Err(SurveyError::QuestionTextRequired);
        }
        let answer = request.answer.trim();
        if answer.is_empty() {
            return Err(SurveyError::AnswerRequired);
        }

        let survey = self.get_in_progress_survey(patient, request.survey_id, auth_token).await?;
        let (static_pairs, dynamic_pairs) = self.load_answers(survey.id, auth_token).await?;
        if dynamic_pairs.len() >= self.max_dynamic_questions {
            return Err(SurveyError::DynamicLimitReached);
        }

        let body = json!({
            "survey_id": survey.id,
            "question_text": question_text,
            "answer": answer,
            "context_used": build_question_context(&static_pairs, &dynamic_pairs),
        });

        let created: Vec<DynamicQuestionHistory> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/dynamic_question_history",
            Some(auth_token),
            Some(body),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let entry = created
            .into_iter()
            .next()
            .ok_or_else(|| SurveyError::Database("Failed to store follow-up answer".to_string()))?;

        info!("Follow-up {} recorded for survey {}", dynamic_pairs.len() + 1, survey.id);
        Ok(entry)
    }

    // ==========================================================================
    // COMPLETION
    // ==========================================================================

    /// Summarises and closes the survey. Generation failures still complete
    /// it with a placeholder summary and medium risk.
    pub async fn complete_survey(
        &self,
        patient: &User,
        survey_id: Option<Uuid>,
        now: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<(Survey, SurveyAnalysis), SurveyError> {
        let survey = self.get_in_progress_survey(patient, survey_id, auth_token).await?;
        let (mut answers, dynamic_pairs) = self.load_answers(survey.id, auth_token).await?;
        answers.extend(dynamic_pairs);

        let analysis = self.summarize(&answers).await;

        let path = format!("/rest/v1/surveys?id=eq.{}&status=eq.in_progress", survey.id);
        let updated: Vec<Survey> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(json!({
                "status": SurveyStatus::Completed,
                "completed_at": now,
                "analysis_summary": analysis.summary,
                "risk_level": analysis.risk_level,
            })),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let survey = updated.into_iter().next().ok_or(SurveyError::AlreadyCompleted)?;

        info!("Survey {} completed with {} risk", survey.id, analysis.risk_level);
        Ok((survey, analysis))
    }

    async fn summarize(&self, answers: &[QaPair]) -> SurveyAnalysis {
        let prompt = summary_prompt(&build_summary_context(answers));
        let options = GenerationOptions {
            max_tokens: SUMMARY_MAX_TOKENS,
            ..GenerationOptions::default()
        };

        match self.llm.generate_with(&prompt, options).await {
            Ok(reply) => parse_summary(&reply),
            Err(LlmError::EmptyResponse) => placeholder_analysis(SUMMARY_UNAVAILABLE),
            Err(e) => {
                warn!("Survey summary generation failed: {}", e);
                placeholder_analysis(SUMMARY_FAILED)
            }
        }
    }
}
