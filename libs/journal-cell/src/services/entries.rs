use chrono::{DateTime, Duration, SecondsFormat, Utc};
use reqwest::Method;
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::pagination::{Page, PageRequest};

use crate::models::{
    CreateEntryRequest, EntryListQuery, JournalEntry, JournalError, MoodSample, UpdateEntryRequest,
    MAX_TITLE_CHARS,
};

const DEFAULT_INTENSITY: i16 = 5;

fn clean_title(title: &str) -> Result<String, JournalError> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > MAX_TITLE_CHARS {
        return Err(JournalError::InvalidTitle);
    }
    Ok(title.to_string())
}

fn clean_content(content: &str) -> Result<String, JournalError> {
    if content.trim().is_empty() {
        return Err(JournalError::EmptyContent);
    }
    Ok(content.to_string())
}

fn check_intensity(intensity: i16) -> Result<i16, JournalError> {
    if (1..=10).contains(&intensity) {
        Ok(intensity)
    } else {
        Err(JournalError::InvalidIntensity)
    }
}

/// Trimmed, non-empty, first occurrence kept.
fn clean_tags(tags: &[String]) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::new();
    for tag in tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        if !cleaned.iter().any(|existing| existing == tag) {
            cleaned.push(tag.to_string());
        }
    }
    cleaned
}

/// PATCH body for an update; `None` when the request changes nothing.
pub fn build_update_body(request: &UpdateEntryRequest) -> Result<Option<Value>, JournalError> {
    let mut body = Map::new();

    if let Some(title) = &request.title {
        body.insert("title".into(), json!(clean_title(title)?));
    }
    if let Some(content) = &request.content {
        body.insert("content".into(), json!(clean_content(content)?));
    }
    if let Some(mood) = request.mood {
        body.insert("mood".into(), json!(mood));
    }
    if let Some(intensity) = request.mood_intensity {
        body.insert("mood_intensity".into(), json!(check_intensity(intensity)?));
    }
    if let Some(tags) = &request.tags {
        body.insert("tags".into(), json!(clean_tags(tags)));
    }

    if body.is_empty() {
        return Ok(None);
    }
    body.insert("updated_at".into(), json!(Utc::now()));
    Ok(Some(Value::Object(body)))
}

pub struct JournalService {
    supabase: SupabaseClient,
}

impl JournalService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    fn entry_path(patient_id: Uuid, entry_id: Uuid) -> String {
        format!("/rest/v1/journal_entries?id=eq.{}&patient_id=eq.{}", entry_id, patient_id)
    }

    pub async fn list_entries(
        &self,
        patient_id: Uuid,
        query: &EntryListQuery,
        auth_token: &str,
    ) -> Result<Page<JournalEntry>, JournalError> {
        let page = PageRequest { page: query.page, page_size: query.page_size };

        let mut path = format!("/rest/v1/journal_entries?patient_id=eq.{}", patient_id);
        if let Some(mood) = query.mood {
            path.push_str(&format!("&mood=eq.{}", mood));
        }
        path.push_str(&format!("&order=created_at.desc&{}", page.to_query()));

        let rows: Vec<JournalEntry> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;
        Ok(Page::from_overfetch(rows, &page))
    }

    pub async fn get_entry(
        &self,
        patient_id: Uuid,
        entry_id: Uuid,
        auth_token: &str,
    ) -> Result<JournalEntry, JournalError> {
        let path = Self::entry_path(patient_id, entry_id);
        let rows: Vec<JournalEntry> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;
        rows.into_iter().next().ok_or(JournalError::NotFound)
    }

    pub async fn create_entry(
        &self,
        patient_id: Uuid,
        request: CreateEntryRequest,
        auth_token: &str,
    ) -> Result<JournalEntry, JournalError> {
        let body = json!({
            "patient_id": patient_id,
            "title": clean_title(&request.title)?,
            "content": clean_content(&request.content)?,
            "mood": request.mood.unwrap_or_default(),
            "mood_intensity": check_intensity(request.mood_intensity.unwrap_or(DEFAULT_INTENSITY))?,
            "tags": clean_tags(request.tags.as_deref().unwrap_or_default()),
        });

        let created: Vec<JournalEntry> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/journal_entries",
            Some(auth_token),
            Some(body),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let entry = created
            .into_iter()
            .next()
            .ok_or_else(|| JournalError::Database("Failed to create journal entry".to_string()))?;

        info!("Journal entry {} created for patient {}", entry.id, patient_id);
        Ok(entry)
    }

    pub async fn update_entry(
        &self,
        patient_id: Uuid,
        entry_id: Uuid,
        request: UpdateEntryRequest,
        auth_token: &str,
    ) -> Result<JournalEntry, JournalError> {
        let Some(body) = build_update_body(&request)? else {
            return self.get_entry(patient_id, entry_id, auth_token).await;
        };

        let updated: Vec<JournalEntry> = self.supabase.request_with_headers(
            Method::PATCH,
            &Self::entry_path(patient_id, entry_id),
            Some(auth_token),
            Some(body),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        updated.into_iter().next().ok_or(JournalError::NotFound)
    }

    pub async fn delete_entry(
        &self,
        patient_id: Uuid,
        entry_id: Uuid,
        auth_token: &str,
    ) -> Result<(), JournalError> {
        let deleted: Vec<JournalEntry> = self.supabase.request_with_headers(
            Method::DELETE,
            &Self::entry_path(patient_id, entry_id),
            Some(auth_token),
            None,
            Some(SupabaseClient::representation_headers()),
        ).await?;

        if deleted.is_empty() {
            return Err(JournalError::NotFound);
        }
        info!("Journal entry {} deleted by patient {}", entry_id, patient_id);
        Ok(())
    }

    /// Mood samples created at or after `since`; every entry when `since` is `None`.
    pub async fn mood_samples(
        &self,
        patient_id: Uuid,
        since: Option<DateTime<Utc>>,
        auth_token: &str,
    ) -> Result<Vec<MoodSample>, JournalError> {
        let mut path = format!(
            "/rest/v1/journal_entries?patient_id=eq.{}&select=mood,mood_intensity,created_at",
            patient_id
        );
        if let Some(since) = since {
            path.push_str(&format!(
                "&created_at=gte.{}",
                since.to_rfc3339_opts(SecondsFormat::Secs, true)
            ));
        }
        path.push_str("&order=created_at.asc");
        debug!("Loading mood samples: {}", path);

        Ok(self.supabase.request(Method::GET, &path, Some(auth_token), None).await?)
    }

    pub async fn recent_samples(
        &self,
        patient_id: Uuid,
        days: i64,
        now: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Vec<MoodSample>, JournalError> {
        self.mood_samples(patient_id, Some(now - Duration::days(days)), auth_token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use crate::models::Mood;

    #[test]
    fn tags_are_trimmed_and_deduplicated() {
        let tags = vec![" sleep ".to_string(), "".to_string(), "work".to_string(), "sleep".to_string()];
        assert_eq!(clean_tags(&tags), vec!["sleep", "work"]);
    }

    #[test]
    fn update_body_only_carries_given_fields() {
        let request = UpdateEntryRequest {
            mood: Some(Mood::Calm),
            mood_intensity: Some(3),
            ..Default::default()
        };
        let body = build_update_body(&request).unwrap().unwrap();
        assert_eq!(body["mood"], "calm");
        assert_eq!(body["mood_intensity"], 3);
        assert!(body.get("title").is_none());
        assert!(body.get("updated_at").is_some());

        assert_matches!(build_update_body(&UpdateEntryRequest::default()), Ok(None));
    }

    #[test]
    fn update_body_validates_each_field() {
        let request = UpdateEntryRequest { mood_intensity: Some(11), ..Default::default() };
        assert_matches!(build_update_body(&request), Err(JournalError::InvalidIntensity));

        let request = UpdateEntryRequest { title: Some("   ".into()), ..Default::default() };
        assert_matches!(build_update_body(&request), Err(JournalError::InvalidTitle));

        let request = UpdateEntryRequest { content: Some("\n".into()), ..Default::default() };
        assert_matches!(build_update_body(&request), Err(JournalError::EmptyContent));
    }

    #[test]
    fn title_length_is_capped() {
        assert!(clean_title(&"t".repeat(MAX_TITLE_CHARS)).is_ok());
        assert_matches!(clean_title(&"t".repeat(MAX_TITLE_CHARS + 1)), Err(JournalError::InvalidTitle));
    }
}
