use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::models::{JournalSummary, Mood, MoodSample, MoodShare, TrendPoint};

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn mood_counts(samples: &[MoodSample]) -> Vec<(Mood, usize)> {
    let mut counts: HashMap<Mood, usize> = HashMap::new();
    for sample in samples {
        *counts.entry(sample.mood).or_default() += 1;
    }

    let mut counts: Vec<(Mood, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    counts
}

/// Share of each mood, most frequent first. Moods that never occur are omitted.
pub fn mood_distribution(samples: &[MoodSample]) -> Vec<MoodShare> {
    let total = samples.len();
    if total == 0 {
        return Vec::new();
    }

    mood_counts(samples)
        .into_iter()
        .map(|(mood, count)| MoodShare {
            mood,
            count,
            percentage: round2(count as f64 / total as f64 * 100.0),
        })
        .collect()
}

/// Average intensity per calendar day (UTC), oldest day first.
pub fn mood_trend(samples: &[MoodSample]) -> Vec<TrendPoint> {
    let mut days: BTreeMap<NaiveDate, (i64, usize)> = BTreeMap::new();
    for sample in samples {
        let day = days.entry(sample.created_at.date_naive()).or_default();
        day.0 += i64::from(sample.mood_intensity);
        day.1 += 1;
    }

    days.into_iter()
        .map(|(date, (sum, count))| TrendPoint {
            date,
            avg_intensity: round2(sum as f64 / count as f64),
            count,
        })
        .collect()
}

pub fn summarize(samples: &[MoodSample], now: DateTime<Utc>) -> JournalSummary {
    let total_entries = samples.len();
    let average_intensity = if total_entries == 0 {
        0.0
    } else {
        let sum: i64 = samples.iter().map(|s| i64::from(s.mood_intensity)).sum();
        round2(sum as f64 / total_entries as f64)
    };

    let entries_this_month = samples
        .iter()
        .filter(|s| s.created_at.year() == now.year() && s.created_at.month() == now.month())
        .count();

    JournalSummary {
        total_entries,
        average_intensity,
        most_common_mood: mood_counts(samples).first().map(|(mood, _)| *mood),
        entries_this_month,
    }
}
