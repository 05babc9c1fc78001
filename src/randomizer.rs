use chrono::{DateTime, Local, Utc};
use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::card::{Aging, Card, DueStatus, Priority};
use crate::model::ColumnId;
use crate::storage::{SharedStore, StorageError, RANDOMIZER_KEY};
use crate::store::CardEntry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RandomizerOptions {
    /// Columns to draw from; empty means every column.
    pub include_columns: Vec<ColumnId>,
    pub factor_priority: bool,
    pub factor_due_date: bool,
    pub factor_aging: bool,
    pub exclude_completed: bool,
}

impl Default for RandomizerOptions {
    fn default() -> Self {
        RandomizerOptions {
            include_columns: Vec::new(),
            factor_priority: true,
            factor_due_date: true,
            factor_aging: false,
            exclude_completed: true,
        }
    }
}

impl RandomizerOptions {
    pub fn load(storage: &SharedStore) -> Self {
        match storage.get(RANDOMIZER_KEY) {
            Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|err| {
                tracing::warn!(%err, "ignoring unreadable randomizer options");
                Self::default()
            }),
            Ok(None) => Self::default(),
            Err(err) => {
                tracing::warn!(%err, "could not read randomizer options");
                Self::default()
            }
        }
    }

    /// Serialization failures are logged and leave the stored options untouched.
    pub fn save(&self, storage: &SharedStore) -> Result<(), StorageError> {
        let json = match serde_json::to_string(self) {
            Ok(json) => json,
            Err(err) => {
                tracing::warn!(%err, "could not serialize randomizer options");
                return Ok(());
            }
        };
        storage.set(RANDOMIZER_KEY, &json)
    }

    fn admits(&self, entry: &CardEntry<'_>) -> bool {
        if self.exclude_completed && entry.card.completed {
            return false;
        }
        self.include_columns.is_empty() || self.include_columns.iter().any(|c| c == entry.column_id)
    }

    /// Relative chance of `card` being drawn.
    pub fn weight(&self, card: &Card, now: DateTime<Local>) -> f64 {
        let mut weight = 1.0;
        if self.factor_priority {
            weight *= match card.priority {
                Priority::High => 4.0,
                Priority::Medium => 3.0,
                Priority::Low => 2.0,
                Priority::None => 1.0,
            };
        }
        if self.factor_due_date {
            weight *= match card.due_status_at(now.date_naive()) {
                Some(DueStatus::Overdue) => 3.0,
                Some(DueStatus::Today) => 2.5,
                Some(DueStatus::Soon) => 2.0,
                _ => 1.0,
            };
        }
        if self.factor_aging {
            weight *= match card.aging_at(now.with_timezone(&Utc)) {
                Some(Aging::Abandoned) => 2.0,
                Some(Aging::Stale) => 1.5,
                Some(Aging::Aging) => 1.25,
                _ => 1.0,
            };
        }
        weight
    }
}

pub fn pick<'a, R: Rng + ?Sized>(
    entries: &[CardEntry<'a>],
    options: &RandomizerOptions,
    rng: &mut R,
) -> Option<CardEntry<'a>> {
    pick_at(entries, options, rng, Local::now())
}

/// Draws one eligible card with probability proportional to its weight.
pub fn pick_at<'a, R: Rng + ?Sized>(
    entries: &[CardEntry<'a>],
    options: &RandomizerOptions,
    rng: &mut R,
    now: DateTime<Local>,
) -> Option<CardEntry<'a>> {
    let candidates: Vec<&CardEntry<'a>> = entries.iter().filter(|e| options.admits(e)).collect();
    let weights: Vec<f64> = candidates
        .iter()
        .map(|e| options.weight(e.card, now))
        .collect();
    let dist = WeightedIndex::new(&weights).ok()?;
    candidates.get(dist.sample(rng)).map(|e| **e)
}
