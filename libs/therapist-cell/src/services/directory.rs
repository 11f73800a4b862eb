use reqwest::Method;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::Role;
use shared_models::pagination::{Page, PageRequest};

use crate::models::{
    ConsultationMode, TherapistError, TherapistListQuery, TherapistProfile, TherapistSort, UserAccount,
};

/// Builds the PostgREST query string for the public therapist listing.
pub fn build_directory_query(query: &TherapistListQuery) -> String {
    let mut params = vec!["select=*".to_string(), "profile_completed=eq.true".to_string()];

    if let Some(tag) = query.specialization.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let escaped = tag.replace('"', "\\\"");
        params.push(format!(
            "specialization_tags=cs.{}",
            urlencoding::encode(&format!("{{\"{}\"}}", escaped))
        ));
    }

    match query.mode {
        Some(ConsultationMode::Both) => params.push("consultation_mode=eq.both".to_string()),
        Some(mode) => params.push(format!("consultation_mode=in.({},both)", mode.as_str())),
        None => {}
    }

    if query.verified_only.unwrap_or(false) {
        params.push("is_verified=eq.true".to_string());
    }

    let order = match query.sort_by.unwrap_or_default() {
        TherapistSort::Name => "full_name.asc",
        TherapistSort::Experience => "years_of_experience.desc.nullslast",
        TherapistSort::FeesLow => "consultation_fees.asc.nullslast",
        TherapistSort::FeesHigh => "consultation_fees.desc.nullslast",
    };
    params.push(format!("order={}", order));

    let page = PageRequest { page: query.page, page_size: query.page_size };
    params.push(page.to_query());

    params.join("&")
}

#[derive(Clone)]
pub struct DirectoryService {
    supabase: SupabaseClient,
}

impl DirectoryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn list_therapists(
        &self,
        query: &TherapistListQuery,
        auth_token: Option<&str>,
    ) -> Result<Page<TherapistProfile>, TherapistError> {
        let path = format!("/rest/v1/therapist_directory?{}", build_directory_query(query));
        debug!("Listing therapists: {}", path);

        let rows: Vec<TherapistProfile> = self.supabase.request(
            Method::GET,
            &path,
            auth_token,
            None,
        ).await?;

        let page = PageRequest { page: query.page, page_size: query.page_size };
        Ok(Page::from_overfetch(rows, &page))
    }

    pub async fn get_account(
        &self,
        user_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<UserAccount>, TherapistError> {
        let path = format!(
            "/rest/v1/users?id=eq.{}&select=id,email,full_name,role,phone_number",
            user_id
        );
        let rows: Vec<UserAccount> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        Ok(rows.into_iter().next())
    }

    pub async fn get_profile(
        &self,
        therapist_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<TherapistProfile>, TherapistError> {
        let path = format!("/rest/v1/therapist_profiles?user_id=eq.{}", therapist_id);
        let rows: Vec<TherapistProfile> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        Ok(rows.into_iter().next())
    }

    /// The account must exist and carry the therapist role; the profile may be absent.
    pub async fn get_therapist(
        &self,
        therapist_id: Uuid,
        auth_token: &str,
    ) -> Result<(UserAccount, Option<TherapistProfile>), TherapistError> {
        let (account, profile) = futures::try_join!(
            self.get_account(therapist_id, auth_token),
            self.get_profile(therapist_id, auth_token)
        )?;

        let account = account.ok_or(TherapistError::NotFound)?;
        if account.role != Role::Therapist {
            warn!("User {} looked up as therapist but has role {}", therapist_id, account.role);
            return Err(TherapistError::NotFound);
        }

        Ok((account, profile))
    }
}
