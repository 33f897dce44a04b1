//! crates/bloomie_core/src/intervals.rs
//!
//! Estimates when a nurture is next due for a given activity.
//!
//! The baseline interval for a (nurture, category) pair is resolved in order:
//! explicit nurture metadata, then the species table, then a hardcoded
//! default for the nurture kind. Categories without any baseline (sunlight,
//! sleep, other, ...) are not tracked and yield no estimate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::classifier::ActivityClassifier;
use crate::domain::{ActivityCategory, LogEntry, Nurture, NurtureKind};
use crate::ports::PortError;

const HOURS_PER_DAY: f64 = 24.0;

const DEFAULT_WATERING_DAYS: f64 = 7.0;
const DEFAULT_FERTILIZING_DAYS: f64 = 30.0;
const DEFAULT_PET_FEEDING_HOURS: f64 = 10.0;
const DEFAULT_PARASITE_TREATMENT_DAYS: f64 = 30.0;
const DEFAULT_DIAPER_HOURS: f64 = 3.0;
const DEFAULT_BABY_FEEDING_HOURS: f64 = 3.0;

//=========================================================================================
// Species reference data
//=========================================================================================

/// Expected care intervals for one species. Missing fields fall through to
/// the kind defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CareIntervalProfile {
    pub watering_days: Option<f64>,
    pub fertilizing_days: Option<f64>,
    pub feeding_hours: Option<f64>,
    pub walking_hours: Option<f64>,
    pub parasite_treatment_days: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesEntry {
    pub species: String,
    pub profile: CareIntervalProfile,
}

/// Ordered species lookup. Exact (case-insensitive) matches win; otherwise
/// the first entry whose name occurs inside the nurture's species string
/// is used, so "Boston fern" resolves to "fern".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesTable {
    pub entries: Vec<SpeciesEntry>,
}

const fn plant(watering_days: f64, fertilizing_days: f64) -> CareIntervalProfile {
    CareIntervalProfile {
        watering_days: Some(watering_days),
        fertilizing_days: Some(fertilizing_days),
        feeding_hours: None,
        walking_hours: None,
        parasite_treatment_days: None,
    }
}

const fn animal(feeding_hours: f64, walking_hours: Option<f64>, parasite_days: Option<f64>) -> CareIntervalProfile {
    CareIntervalProfile {
        watering_days: None,
        fertilizing_days: None,
        feeding_hours: Some(feeding_hours),
        walking_hours,
        parasite_treatment_days: parasite_days,
    }
}

const BUILTIN_SPECIES: &[(&str, CareIntervalProfile)] = &[
    ("fern", plant(3.0, 30.0)),
    ("cactus", plant(14.0, 60.0)),
    ("kaktüs", plant(14.0, 60.0)),
    ("succulent", plant(10.0, 60.0)),
    ("sukulent", plant(10.0, 60.0)),
    ("snake plant", plant(14.0, 60.0)),
    ("aloe", plant(14.0, 60.0)),
    ("orchid", plant(7.0, 14.0)),
    ("orkide", plant(7.0, 14.0)),
    ("monstera", plant(7.0, 30.0)),
    ("pothos", plant(7.0, 30.0)),
    ("ficus", plant(7.0, 30.0)),
    ("basil", plant(2.0, 21.0)),
    ("fesleğen", plant(2.0, 21.0)),
    ("puppy", animal(6.0, Some(4.0), Some(30.0))),
    ("dog", animal(12.0, Some(8.0), Some(30.0))),
    ("köpek", animal(12.0, Some(8.0), Some(30.0))),
    ("kitten", animal(6.0, None, Some(30.0))),
    ("cat", animal(12.0, None, Some(30.0))),
    ("kedi", animal(12.0, None, Some(30.0))),
    ("rabbit", animal(12.0, None, Some(90.0))),
    ("bird", animal(12.0, None, None)),
    ("kuş", animal(12.0, None, None)),
    ("hamster", animal(24.0, None, None)),
    ("fish", animal(24.0, None, None)),
    ("balık", animal(24.0, None, None)),
];

impl SpeciesTable {
    pub fn builtin() -> Self {
        let entries = BUILTIN_SPECIES
            .iter()
            .map(|(species, profile)| SpeciesEntry {
                species: species.to_string(),
                profile: *profile,
            })
            .collect();
        Self { entries }
    }

    pub fn lookup(&self, species: &str) -> Option<&CareIntervalProfile> {
        let wanted = species.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|e| e.species.to_lowercase() == wanted)
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|e| !e.species.is_empty() && wanted.contains(&e.species.to_lowercase()))
            })
            .map(|e| &e.profile)
    }
}

impl Default for SpeciesTable {
    fn default() -> Self {
        Self::builtin()
    }
}

//=========================================================================================
// Estimation
//=========================================================================================

/// How to choose between matching logs that share the exact same timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Keep whichever record the store returned first.
    #[default]
    FirstSeen,
    /// Keep whichever record the store returned last.
    LastSeen,
}

impl FromStr for TieBreak {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first" | "first_seen" => Ok(TieBreak::FirstSeen),
            "last" | "last_seen" => Ok(TieBreak::LastSeen),
            other => Err(PortError::InvalidInput(format!("unknown tie-break policy '{}'", other))),
        }
    }
}

/// Result of estimating one (nurture, category) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DueInfo {
    pub category: ActivityCategory,
    pub baseline_hours: f64,
    /// Hours until the activity is due; negative once it is past due.
    pub due_in_hours: f64,
    pub overdue: bool,
    pub last_serviced_at: Option<DateTime<Utc>>,
}

/// How far ahead of the due time a category counts as "remind now".
/// Zero means the reminder only triggers once the interval has fully elapsed.
pub fn slack_hours(category: ActivityCategory) -> f64 {
    match category {
        ActivityCategory::Watering | ActivityCategory::Fertilizing => HOURS_PER_DAY,
        ActivityCategory::ParasiteTreatment => 3.0 * HOURS_PER_DAY,
        _ => 0.0,
    }
}

fn baby_feeding_hours(nurture: &Nurture, now: DateTime<Utc>) -> f64 {
    let Some(birth_date) = nurture.metadata.birth_date else {
        return DEFAULT_BABY_FEEDING_HOURS;
    };
    let age_days = (now.date_naive() - birth_date).num_days();
    match age_days {
        d if d < 0 => DEFAULT_BABY_FEEDING_HOURS,
        0..=30 => 2.0,
        31..=90 => 3.0,
        91..=180 => 4.0,
        181..=365 => 5.0,
        _ => 6.0,
    }
}

pub struct IntervalEstimator {
    classifier: ActivityClassifier,
    species: SpeciesTable,
    tie_break: TieBreak,
}

impl IntervalEstimator {
    pub fn new(classifier: ActivityClassifier, species: SpeciesTable) -> Self {
        Self {
            classifier,
            species,
            tie_break: TieBreak::default(),
        }
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn classifier(&self) -> &ActivityClassifier {
        &self.classifier
    }

    /// Baseline interval in hours, or `None` when the category is not tracked
    /// for this nurture.
    pub fn baseline_hours(
        &self,
        nurture: &Nurture,
        category: ActivityCategory,
        now: DateTime<Utc>,
    ) -> Option<f64> {
        let meta = &nurture.metadata;
        let profile = meta
            .species
            .as_deref()
            .and_then(|s| self.species.lookup(s))
            .copied()
            .unwrap_or_default();

        match (nurture.kind, category) {
            (NurtureKind::Plant, ActivityCategory::Watering) => Some(
                meta.water_frequency
                    .map(f64::from)
                    .or(profile.watering_days)
                    .unwrap_or(DEFAULT_WATERING_DAYS)
                    * HOURS_PER_DAY,
            ),
            (NurtureKind::Plant, ActivityCategory::Fertilizing) => Some(
                profile.fertilizing_days.unwrap_or(DEFAULT_FERTILIZING_DAYS) * HOURS_PER_DAY,
            ),
            (NurtureKind::Pet, ActivityCategory::Feeding) => Some(
                meta.feeding_interval_hours
                    .map(f64::from)
                    .or(profile.feeding_hours)
                    .unwrap_or(DEFAULT_PET_FEEDING_HOURS),
            ),
            // Only species that need walks (dogs) have a walking interval.
            (NurtureKind::Pet, ActivityCategory::Walking) => profile.walking_hours,
            (NurtureKind::Pet, ActivityCategory::ParasiteTreatment) => Some(
                profile
                    .parasite_treatment_days
                    .unwrap_or(DEFAULT_PARASITE_TREATMENT_DAYS)
                    * HOURS_PER_DAY,
            ),
            (NurtureKind::Baby, ActivityCategory::Feeding) => Some(
                meta.feeding_interval_hours
                    .map(f64::from)
                    .unwrap_or_else(|| baby_feeding_hours(nurture, now)),
            ),
            (NurtureKind::Baby, ActivityCategory::Diaper) => Some(DEFAULT_DIAPER_HOURS),
            _ => None,
        }
    }

    /// The most recent log of `category` for this nurture. Logs for other
    /// nurtures and logs stamped after `now` are ignored.
    pub fn last_serviced<'a>(
        &self,
        nurture: &Nurture,
        logs: &'a [LogEntry],
        category: ActivityCategory,
        now: DateTime<Utc>,
    ) -> Option<&'a LogEntry> {
        let mut latest: Option<&LogEntry> = None;
        for entry in logs {
            if entry.nurture_id != nurture.id || entry.created_at > now {
                continue;
            }
            if self.classifier.classify(&entry.activity_text(), nurture.kind) != category {
                continue;
            }
            let replace = match latest {
                None => true,
                Some(current) => match self.tie_break {
                    TieBreak::FirstSeen => entry.created_at > current.created_at,
                    TieBreak::LastSeen => entry.created_at >= current.created_at,
                },
            };
            if replace {
                latest = Some(entry);
            }
        }
        latest
    }

    pub fn estimate_due(
        &self,
        nurture: &Nurture,
        logs: &[LogEntry],
        category: ActivityCategory,
        now: DateTime<Utc>,
    ) -> Option<DueInfo> {
        let baseline_hours = self.baseline_hours(nurture, category, now)?;

        let info = match self.last_serviced(nurture, logs, category, now) {
            Some(entry) => {
                let elapsed_hours = (now - entry.created_at).num_seconds() as f64 / 3600.0;
                let due_in_hours = baseline_hours - elapsed_hours;
                DueInfo {
                    category,
                    baseline_hours,
                    due_in_hours,
                    overdue: due_in_hours <= slack_hours(category),
                    last_serviced_at: Some(entry.created_at),
                }
            }
            // Never serviced: the whole baseline lies ahead.
            None => DueInfo {
                category,
                baseline_hours,
                due_in_hours: baseline_hours,
                overdue: baseline_hours <= 0.0,
                last_serviced_at: None,
            },
        };
        Some(info)
    }
}

impl Default for IntervalEstimator {
    fn default() -> Self {
        Self::new(ActivityClassifier::default(), SpeciesTable::default())
    }
}
