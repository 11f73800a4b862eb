//! Therapist directory, weekly availability and the 30-day slot resolver.
//!
//! Availability comes from two places: the per-day JSON schedule on the
//! therapist profile, and the older `therapist_availability` rows. The
//! schedule is authoritative for every day it defines; see
//! [`services::schedule::resolve_day_windows`].

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::*;
pub use router::therapist_routes;
