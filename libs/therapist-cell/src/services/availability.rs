use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::User;

use crate::models::{
    BookedInterval, CreateAvailabilityRequest, CreateTimeOffRequest, TherapistAvailability,
    TherapistError, TherapistSlots, TimeOffPeriod, WeeklyAvailability,
};
use crate::services::directory::DirectoryService;
use crate::services::schedule::{intervals_overlap, WeeklySchedule};
use crate::services::slots::{resolve_slots, AvailabilitySources, HORIZON_DAYS};

pub struct AvailabilityService {
    supabase: SupabaseClient,
    directory: DirectoryService,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            directory: DirectoryService::new(config),
        }
    }

    // ==========================================================================
    // READS SHARED WITH BOOKING
    // ==========================================================================

    pub async fn get_rules(
        &self,
        therapist_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<TherapistAvailability>, TherapistError> {
        let path = format!(
            "/rest/v1/therapist_availability?therapist_id=eq.{}&is_active=eq.true&order=day_of_week.asc,start_time.asc",
            therapist_id
        );
        Ok(self.supabase.request(Method::GET, &path, Some(auth_token), None).await?)
    }

    /// Time-off periods intersecting `[from, to]`.
    pub async fn get_time_off(
        &self,
        therapist_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<TimeOffPeriod>, TherapistError> {
        let path = format!(
            "/rest/v1/time_off_periods?therapist_id=eq.{}&end_date=gte.{}&start_date=lte.{}&order=start_date.asc",
            therapist_id, from, to
        );
        Ok(self.supabase.request(Method::GET, &path, Some(auth_token), None).await?)
    }

    /// Pending/confirmed intervals for the therapist within `[from, to]`.
    pub async fn get_booked_intervals(
        &self,
        therapist_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<BookedInterval>, TherapistError> {
        let path = format!(
            "/rest/v1/therapist_busy_intervals?therapist_id=eq.{}&appointment_date=gte.{}&appointment_date=lte.{}&status=in.(pending,confirmed)&order=appointment_date.asc,start_time.asc",
            therapist_id, from, to
        );
        Ok(self.supabase.request(Method::GET, &path, Some(auth_token), None).await?)
    }

    // ==========================================================================
    // SLOTS AND WEEKLY VIEW
    // ==========================================================================

    pub async fn get_available_slots(
        &self,
        therapist_id: Uuid,
        now: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<TherapistSlots, TherapistError> {
        debug!("Resolving slots for therapist {}", therapist_id);

        let (account, profile) = self.directory.get_therapist(therapist_id, auth_token).await?;

        let Some(profile) = profile else {
            warn!("Therapist {} has no profile, returning no slots", therapist_id);
            return Ok(TherapistSlots {
                therapist_id,
                therapist_name: account.full_name,
                slots: Vec::new(),
            });
        };

        let today = now.date_naive();
        let horizon_end = today + Duration::days(HORIZON_DAYS);

        let (rules, time_off, booked) = futures::try_join!(
            self.get_rules(therapist_id, auth_token),
            self.get_time_off(therapist_id, today, horizon_end, auth_token),
            self.get_booked_intervals(therapist_id, today, horizon_end, auth_token)
        )?;

        let schedule = WeeklySchedule::from_json(&profile.availability_slots);
        let sources = AvailabilitySources {
            schedule: &schedule,
            rules: &rules,
            time_off: &time_off,
            booked: &booked,
        };

        Ok(TherapistSlots {
            therapist_id,
            therapist_name: account.full_name,
            slots: resolve_slots(&sources, now.naive_utc()),
        })
    }

    pub async fn get_weekly_availability(
        &self,
        therapist_id: Uuid,
        auth_token: &str,
    ) -> Result<WeeklyAvailability, TherapistError> {
        let (account, profile) = self.directory.get_therapist(therapist_id, auth_token).await?;
        let rules = self.get_rules(therapist_id, auth_token).await?;

        let schedule = profile
            .map(|p| WeeklySchedule::from_json(&p.availability_slots))
            .unwrap_or_default();

        Ok(WeeklyAvailability {
            therapist_id,
            therapist_name: account.full_name,
            schedule: schedule.to_json(),
            availability: rules,
        })
    }

    // ==========================================================================
    // THERAPIST-MANAGED RULES AND TIME OFF
    // ==========================================================================

    pub async fn create_availability(
        &self,
        therapist: &User,
        request: CreateAvailabilityRequest,
        auth_token: &str,
    ) -> Result<TherapistAvailability, TherapistError> {
        if request.start_time >= request.end_time {
            return Err(TherapistError::InvalidTimeRange);
        }

        let existing = self.get_rules(therapist.id, auth_token).await?;
        let clashes = existing.iter().any(|rule| {
            rule.day_of_week == request.day_of_week
                && intervals_overlap(rule.start_time, rule.end_time, request.start_time, request.end_time)
        });
        if clashes {
            return Err(TherapistError::OverlappingAvailability(request.day_of_week));
        }

        let body = json!({
            "therapist_id": therapist.id,
            "day_of_week": request.day_of_week.storage_name(),
            "start_time": request.start_time.format("%H:%M:%S").to_string(),
            "end_time": request.end_time.format("%H:%M:%S").to_string(),
            "is_active": true
        });

        let created: Vec<TherapistAvailability> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/therapist_availability",
            Some(auth_token),
            Some(body),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let rule = created
            .into_iter()
            .next()
            .ok_or_else(|| TherapistError::Database("Failed to create availability".to_string()))?;

        info!("Availability {} created for therapist {}", rule.id, therapist.id);
        Ok(rule)
    }

    pub async fn list_time_off(
        &self,
        therapist_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<TimeOffPeriod>, TherapistError> {
        let path = format!(
            "/rest/v1/time_off_periods?therapist_id=eq.{}&order=start_date.desc",
            therapist_id
        );
        Ok(self.supabase.request(Method::GET, &path, Some(auth_token), None).await?)
    }

    pub async fn create_time_off(
        &self,
        therapist: &User,
        request: CreateTimeOffRequest,
        auth_token: &str,
    ) -> Result<TimeOffPeriod, TherapistError> {
        if request.start_date > request.end_date {
            return Err(TherapistError::InvalidDateRange);
        }

        let body = json!({
            "therapist_id": therapist.id,
            "start_date": request.start_date,
            "end_date": request.end_date,
            "reason": request.reason.as_deref().map(str::trim).filter(|r| !r.is_empty())
        });

        let created: Vec<TimeOffPeriod> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/time_off_periods",
            Some(auth_token),
            Some(body),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let period = created
            .into_iter()
            .next()
            .ok_or_else(|| TherapistError::Database("Failed to create time-off period".to_string()))?;

        info!(
            "Time off {} ({} to {}) recorded for therapist {}",
            period.id, period.start_date, period.end_date, therapist.id
        );
        Ok(period)
    }

    pub async fn delete_time_off(
        &self,
        therapist: &User,
        time_off_id: Uuid,
        auth_token: &str,
    ) -> Result<(), TherapistError> {
        let path = format!("/rest/v1/time_off_periods?id=eq.{}", time_off_id);
        let rows: Vec<TimeOffPeriod> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;
        let period = rows.into_iter().next().ok_or(TherapistError::TimeOffNotFound)?;

        if period.therapist_id != therapist.id {
            return Err(TherapistError::Forbidden(
                "You can only remove your own time-off periods".to_string(),
            ));
        }

        let _: Value = self.supabase.request(Method::DELETE, &path, Some(auth_token), None).await?;
        info!("Time off {} removed by therapist {}", time_off_id, therapist.id);
        Ok(())
    }
}
