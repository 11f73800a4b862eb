use std::collections::HashSet;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use reqwest::Method;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::{Role, User};
use shared_models::pagination::{Page, PageRequest};

use crate::error::AppointmentError;
use crate::models::{
    Appointment, AppointmentListQuery, AppointmentStatRow, AppointmentStats, AppointmentStatus,
    AppointmentView, ListFilter,
};

/// Which side of the appointment the caller is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Participant {
    Patient,
    Therapist,
}

impl Participant {
    fn column(&self) -> &'static str {
        match self {
            Participant::Patient => "patient_id",
            Participant::Therapist => "therapist_id",
        }
    }

    pub fn for_role(role: Option<Role>) -> Option<Self> {
        match role {
            Some(Role::Patient) => Some(Participant::Patient),
            Some(Role::Therapist) => Some(Participant::Therapist),
            _ => None,
        }
    }
}

pub fn build_list_query(
    participant: Participant,
    user_id: Uuid,
    query: &AppointmentListQuery,
    today: NaiveDate,
) -> String {
    let mut params = vec![
        "select=*".to_string(),
        format!("{}=eq.{}", participant.column(), user_id),
    ];

    if let Some(status) = query.status {
        params.push(format!("status=eq.{}", status));
    }

    let ascending = match query.filter {
        Some(ListFilter::Today) => {
            params.push(format!("appointment_date=eq.{}", today));
            true
        }
        Some(ListFilter::Upcoming) => {
            params.push(format!("appointment_date=gte.{}", today));
            params.push("status=in.(pending,confirmed)".to_string());
            true
        }
        Some(ListFilter::Past) => {
            params.push(format!(
                "or=(appointment_date.lt.{},status.in.(completed,cancelled,no_show))",
                today
            ));
            false
        }
        None => false,
    };

    params.push(if ascending {
        "order=appointment_date.asc,start_time.asc".to_string()
    } else {
        "order=appointment_date.desc,start_time.desc".to_string()
    });

    let page = PageRequest { page: query.page, page_size: query.page_size };
    params.push(page.to_query());

    params.join("&")
}

pub fn compute_stats(rows: &[AppointmentStatRow], today: NaiveDate, count_patients: bool) -> AppointmentStats {
    let week_start = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
    let mut stats = AppointmentStats {
        total_appointments: rows.len(),
        ..AppointmentStats::default()
    };

    for row in rows {
        match row.status {
            AppointmentStatus::Pending => stats.pending += 1,
            AppointmentStatus::Confirmed => stats.confirmed += 1,
            AppointmentStatus::Completed => stats.completed += 1,
            AppointmentStatus::Cancelled => stats.cancelled += 1,
            AppointmentStatus::NoShow => stats.no_show += 1,
        }
        if row.appointment_date >= today && row.status.is_active() {
            stats.upcoming += 1;
        }
        if row.appointment_date == today {
            stats.today_sessions += 1;
        }
        if row.status == AppointmentStatus::Completed
            && row.appointment_date >= week_start
            && row.appointment_date <= today
        {
            stats.completed_this_week += 1;
        }
    }

    if count_patients {
        stats.total_patients = rows.iter().map(|r| r.patient_id).collect::<HashSet<_>>().len();
    }

    stats
}

pub struct AppointmentListingService {
    supabase: SupabaseClient,
}

impl AppointmentListingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn list_appointments(
        &self,
        user: &User,
        participant: Participant,
        query: &AppointmentListQuery,
        now: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Page<AppointmentView>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?{}",
            build_list_query(participant, user.id, query, now.date_naive())
        );
        debug!("Listing appointments: {}", path);

        let rows: Vec<Appointment> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;
        let page = PageRequest { page: query.page, page_size: query.page_size };
        let views = rows.into_iter().map(|a| a.into_view(now)).collect();

        Ok(Page::from_overfetch(views, &page))
    }

    pub async fn appointment_stats(
        &self,
        user: &User,
        participant: Participant,
        today: NaiveDate,
        auth_token: &str,
    ) -> Result<AppointmentStats, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?{}=eq.{}&select=patient_id,appointment_date,status",
            participant.column(),
            user.id
        );
        let rows: Vec<AppointmentStatRow> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;

        Ok(compute_stats(&rows, today, participant == Participant::Therapist))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn row(patient_id: Uuid, day: u32, status: AppointmentStatus) -> AppointmentStatRow {
        AppointmentStatRow {
            patient_id,
            appointment_date: date(day),
            status,
        }
    }

    #[test]
    fn list_query_for_patient_upcoming() {
        let user = Uuid::new_v4();
        let query = AppointmentListQuery {
            filter: Some(ListFilter::Upcoming),
            ..Default::default()
        };
        let built = build_list_query(Participant::Patient, user, &query, date(10));

        assert!(built.contains(&format!("patient_id=eq.{}", user)));
        assert!(built.contains("appointment_date=gte.2024-01-10"));
        assert!(built.contains("status=in.(pending,confirmed)"));
        assert!(built.contains("order=appointment_date.asc,start_time.asc"));
        assert!(built.ends_with("limit=11&offset=0"));
    }

    #[test]
    fn list_query_for_therapist_past_with_status() {
        let query = AppointmentListQuery {
            status: Some(AppointmentStatus::Completed),
            filter: Some(ListFilter::Past),
            page: Some(2),
            page_size: Some(5),
        };
        let built = build_list_query(Participant::Therapist, Uuid::nil(), &query, date(10));

        assert!(built.contains("therapist_id=eq."));
        assert!(built.contains("status=eq.completed"));
        assert!(built.contains("or=(appointment_date.lt.2024-01-10,status.in.(completed,cancelled,no_show))"));
        assert!(built.contains("order=appointment_date.desc"));
        assert!(built.ends_with("limit=6&offset=5"));
    }

    #[test]
    fn stats_count_statuses_and_windows() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        // 2024-01-10 is a Wednesday; the week starts on the 8th.
        let rows = vec![
            row(a, 8, AppointmentStatus::Completed),
            row(a, 5, AppointmentStatus::Completed),
            row(b, 10, AppointmentStatus::Confirmed),
            row(b, 10, AppointmentStatus::Cancelled),
            row(a, 12, AppointmentStatus::Pending),
            row(b, 15, AppointmentStatus::NoShow),
        ];

        let stats = compute_stats(&rows, date(10), true);
        assert_eq!(stats.total_appointments, 6);
        assert_eq!(stats.total_patients, 2);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.completed_this_week, 1);
        assert_eq!(stats.upcoming, 2);
        assert_eq!(stats.today_sessions, 2);
        assert_eq!(stats.no_show, 1);

        let patient_view = compute_stats(&rows, date(10), false);
        assert_eq!(patient_view.total_patients, 0);
    }
}
