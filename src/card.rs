use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::dates;
use crate::id;

pub type CardId = String;
pub type LabelId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::None => "none",
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" => Some(Priority::None),
            "low" => Some(Priority::Low),
            "medium" | "med" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

/// How long a card has gone without an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aging {
    Fresh,
    Aging,
    Stale,
    Abandoned,
}

impl Aging {
    pub fn from_days(days: i64) -> Self {
        match days {
            d if d < 3 => Aging::Fresh,
            d if d < 7 => Aging::Aging,
            d if d < 14 => Aging::Stale,
            _ => Aging::Abandoned,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Aging::Fresh => "fresh",
            Aging::Aging => "aging",
            Aging::Stale => "stale",
            Aging::Abandoned => "abandoned",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueStatus {
    Overdue,
    Today,
    /// Within the next three days.
    Soon,
    Upcoming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DependencyKind {
    #[default]
    #[serde(rename = "FS")]
    FinishToStart,
    #[serde(rename = "SS")]
    StartToStart,
    #[serde(rename = "FF")]
    FinishToFinish,
    #[serde(rename = "SF")]
    StartToFinish,
}

impl DependencyKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "FS" => Some(DependencyKind::FinishToStart),
            "SS" => Some(DependencyKind::StartToStart),
            "FF" => Some(DependencyKind::FinishToFinish),
            "SF" => Some(DependencyKind::StartToFinish),
            _ => None,
        }
    }
}

/// Weak reference to another card in the same board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawDependency")]
pub struct Dependency {
    pub id: CardId,
    #[serde(rename = "type")]
    pub kind: DependencyKind,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDependency {
    Bare(String),
    Typed {
        id: String,
        #[serde(rename = "type", default)]
        kind: DependencyKind,
    },
}

impl From<RawDependency> for Dependency {
    fn from(raw: RawDependency) -> Self {
        match raw {
            RawDependency::Bare(id) => Dependency {
                id,
                kind: DependencyKind::default(),
            },
            RawDependency::Typed { id, kind } => Dependency { id, kind },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub column_title: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(text: impl Into<String>, column_title: impl Into<String>) -> Self {
        LogEntry {
            id: id::generate_id(id::LOG),
            text: text.into(),
            column_title: column_title.into(),
            created_at: Utc::now(),
        }
    }
}

/// Stored cards are read field by field: a value of the wrong type falls back to
/// that field's default instead of failing the whole board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    #[serde(default, deserialize_with = "lenient")]
    pub id: CardId,
    #[serde(default, deserialize_with = "lenient")]
    pub text: String,
    #[serde(default, deserialize_with = "lenient")]
    pub description: String,
    /// Kept as entered; see [`Card::start`] for the parsed value.
    #[serde(default, deserialize_with = "lenient")]
    pub start_date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub due_date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub completed: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub priority: Priority,
    #[serde(default, deserialize_with = "lenient")]
    pub effort: f64,
    #[serde(default, deserialize_with = "lenient")]
    pub labels: Vec<LabelId>,
    #[serde(default, deserialize_with = "lenient")]
    pub logs: Vec<LogEntry>,
    #[serde(default, deserialize_with = "lenient")]
    pub dependencies: Vec<Dependency>,
    #[serde(default = "Utc::now", deserialize_with = "lenient_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now", deserialize_with = "lenient_timestamp")]
    pub updated_at: DateTime<Utc>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(DateTime::<Utc>::deserialize(value).unwrap_or_else(|_| Utc::now()))
}

impl Card {
    pub fn new(text: impl Into<String>) -> Self {
        let now = Utc::now();
        Card {
            id: id::generate_id(id::CARD),
            text: text.into(),
            description: String::new(),
            start_date: None,
            due_date: None,
            completed: false,
            priority: Priority::None,
            effort: 0.0,
            labels: Vec::new(),
            logs: Vec::new(),
            dependencies: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Copy with a fresh id and timestamps; logs and dependencies are not carried over.
    pub fn duplicate(&self) -> Self {
        let now = Utc::now();
        Card {
            id: id::generate_id(id::CARD),
            logs: Vec::new(),
            dependencies: Vec::new(),
            created_at: now,
            updated_at: now,
            ..self.clone()
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Restores field invariants after deserialization or a free-form edit.
    pub fn normalize(&mut self) {
        if self.id.trim().is_empty() {
            self.id = id::generate_id(id::CARD);
        }
        if !self.effort.is_finite() || self.effort < 0.0 {
            self.effort = 0.0;
        }
        let mut seen = std::collections::HashSet::new();
        self.labels.retain(|l| seen.insert(l.clone()));
        let mut seen_deps = std::collections::HashSet::new();
        self.dependencies.retain(|d| seen_deps.insert(d.id.clone()));
        for date in [&mut self.start_date, &mut self.due_date] {
            if date.as_deref().map(str::trim) == Some("") {
                *date = None;
            }
        }
    }

    pub fn start(&self) -> Option<NaiveDate> {
        dates::parse_opt(self.start_date.as_deref())
    }

    pub fn due(&self) -> Option<NaiveDate> {
        dates::parse_opt(self.due_date.as_deref())
    }

    pub fn has_label(&self, label_id: &str) -> bool {
        self.labels.iter().any(|l| l == label_id)
    }

    pub fn depends_on(&self, card_id: &str) -> bool {
        self.dependencies.iter().any(|d| d.id == card_id)
    }

    pub fn age_days_at(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days().max(0)
    }

    pub fn days_since_update_at(&self, now: DateTime<Utc>) -> i64 {
        (now - self.updated_at).num_days().max(0)
    }

    /// `None` for completed cards; they never age.
    pub fn aging_at(&self, now: DateTime<Utc>) -> Option<Aging> {
        if self.completed {
            return None;
        }
        Some(Aging::from_days(self.days_since_update_at(now)))
    }

    pub fn due_status_at(&self, today: NaiveDate) -> Option<DueStatus> {
        if self.completed {
            return None;
        }
        let due = self.due()?;
        let days = dates::days_between(today, due);
        Some(match days {
            d if d < 0 => DueStatus::Overdue,
            0 => DueStatus::Today,
            d if d <= 3 => DueStatus::Soon,
            _ => DueStatus::Upcoming,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn aging_buckets_by_days_since_update() {
        let now = Utc::now();
        let mut card = Card::new("t");
        card.updated_at = now - Duration::days(2);
        assert_eq!(card.aging_at(now), Some(Aging::Fresh));
        card.updated_at = now - Duration::days(3);
        assert_eq!(card.aging_at(now), Some(Aging::Aging));
        card.updated_at = now - Duration::days(7);
        assert_eq!(card.aging_at(now), Some(Aging::Stale));
        card.updated_at = now - Duration::days(14);
        assert_eq!(card.aging_at(now), Some(Aging::Abandoned));
        card.completed = true;
        assert_eq!(card.aging_at(now), None);
    }

    #[test]
    fn age_counts_whole_days_since_creation() {
        let now = Utc::now();
        let mut card = Card::new("t");
        card.created_at = now - Duration::hours(47);
        card.updated_at = now;
        assert_eq!(card.age_days_at(now), 1);
        card.created_at = now - Duration::days(10);
        assert_eq!(card.age_days_at(now), 10);
        assert_eq!(card.aging_at(now), Some(Aging::Fresh));
        card.created_at = now + Duration::days(2);
        assert_eq!(card.age_days_at(now), 0);
    }

    #[test]
    fn mistyped_fields_fall_back_to_defaults() {
        let json = r#"{
            "id": "card_a",
            "text": "important",
            "effort": null,
            "priority": "urgent",
            "completed": "yes",
            "labels": 3,
            "dueDate": 20240101,
            "createdAt": "last tuesday",
            "updatedAt": null
        }"#;
        let card: Card = serde_json::from_str(json).unwrap();
        assert_eq!(card.id, "card_a");
        assert_eq!(card.text, "important");
        assert_eq!(card.effort, 0.0);
        assert_eq!(card.priority, Priority::None);
        assert!(!card.completed);
        assert!(card.labels.is_empty());
        assert_eq!(card.due_date, None);

        let card: Card = serde_json::from_str(r#"{"effort":"3","priority":"high"}"#).unwrap();
        assert_eq!(card.effort, 0.0);
        assert_eq!(card.priority, Priority::High);
    }

    #[test]
    fn normalize_assigns_missing_id() {
        let mut card: Card = serde_json::from_str(r#"{"id":null,"text":"x"}"#).unwrap();
        card.normalize();
        assert!(card.id.starts_with(id::CARD));
    }

    #[test]
    fn due_status_tiers() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let mut card = Card::new("t");
        assert_eq!(card.due_status_at(today), None);
        card.due_date = Some("2024-05-09".into());
        assert_eq!(card.due_status_at(today), Some(DueStatus::Overdue));
        card.due_date = Some("2024-05-10".into());
        assert_eq!(card.due_status_at(today), Some(DueStatus::Today));
        card.due_date = Some("2024-05-13".into());
        assert_eq!(card.due_status_at(today), Some(DueStatus::Soon));
        card.due_date = Some("2024-05-14".into());
        assert_eq!(card.due_status_at(today), Some(DueStatus::Upcoming));
        card.due_date = Some("not a date".into());
        assert_eq!(card.due_status_at(today), None);
    }

    #[test]
    fn dependencies_accept_bare_ids_and_objects() {
        let json = r#"{"id":"card_a","dependencies":["card_b",{"id":"card_c","type":"SS"}]}"#;
        let card: Card = serde_json::from_str(json).unwrap();
        assert_eq!(card.dependencies.len(), 2);
        assert_eq!(card.dependencies[0].kind, DependencyKind::FinishToStart);
        assert_eq!(card.dependencies[1].kind, DependencyKind::StartToStart);
        let out = serde_json::to_value(&card).unwrap();
        assert_eq!(out["dependencies"][0]["type"], "FS");
    }

    #[test]
    fn duplicate_drops_logs_and_dependencies() {
        let mut card = Card::new("orig");
        card.logs.push(LogEntry::new("note", "To Do"));
        card.dependencies.push(Dependency {
            id: "card_x".into(),
            kind: DependencyKind::FinishToStart,
        });
        card.labels.push("label_1".into());
        let copy = card.duplicate();
        assert_ne!(copy.id, card.id);
        assert_eq!(copy.text, "orig");
        assert_eq!(copy.labels, card.labels);
        assert!(copy.logs.is_empty());
        assert!(copy.dependencies.is_empty());
    }

    #[test]
    fn normalize_clamps_effort_and_dedupes_labels() {
        let mut card = Card::new("t");
        card.effort = -3.0;
        card.labels = vec!["a".into(), "b".into(), "a".into()];
        card.due_date = Some("  ".into());
        card.normalize();
        assert_eq!(card.effort, 0.0);
        assert_eq!(card.labels, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(card.due_date, None);
    }
}
