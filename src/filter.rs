//! Declarative card filtering and saved filter presets.

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::card::{Aging, Card, LabelId, Priority};
use crate::dates;
use crate::i18n::{Locale, Text};
use crate::id;
use crate::model::Label;
use crate::observer::{Observers, Subscription};
use crate::storage::{SharedStore, PRESETS_KEY};
use crate::store::CardEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchOperator {
    #[default]
    Contains,
    Exact,
    StartsWith,
    NotContains,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchFields {
    pub text: bool,
    pub description: bool,
    pub labels: bool,
    pub logs: bool,
}

impl Default for SearchFields {
    fn default() -> Self {
        SearchFields {
            text: true,
            description: true,
            labels: false,
            logs: false,
        }
    }
}

/// Search is in effect only while `term` is non-blank; the other fields modify it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchFilter {
    pub term: String,
    pub fields: SearchFields,
    pub operator: SearchOperator,
    pub case_sensitive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelMatch {
    #[default]
    Any,
    All,
    None,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LabelFilter {
    pub selected: Vec<LabelId>,
    pub mode: LabelMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DueFilterStatus {
    Overdue,
    DueToday,
    DueThisWeek,
    /// Due within the next three days, today included.
    DueSoon,
    NoDueDate,
    HasDueDate,
}

impl DueFilterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DueFilterStatus::Overdue => "overdue",
            DueFilterStatus::DueToday => "due-today",
            DueFilterStatus::DueThisWeek => "due-this-week",
            DueFilterStatus::DueSoon => "due-soon",
            DueFilterStatus::NoDueDate => "no-due-date",
            DueFilterStatus::HasDueDate => "has-due-date",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "overdue" => Some(DueFilterStatus::Overdue),
            "due-today" | "today" => Some(DueFilterStatus::DueToday),
            "due-this-week" | "week" => Some(DueFilterStatus::DueThisWeek),
            "due-soon" | "soon" => Some(DueFilterStatus::DueSoon),
            "no-due-date" | "none" => Some(DueFilterStatus::NoDueDate),
            "has-due-date" | "any" => Some(DueFilterStatus::HasDueDate),
            _ => None,
        }
    }
}

/// Inclusive date bounds; either side may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DateBounds {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateBounds {
    pub fn is_open(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    fn admits(&self, date: Option<NaiveDate>) -> bool {
        if self.is_open() {
            return true;
        }
        let Some(date) = date else {
            return false;
        };
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }

    fn describe(&self) -> String {
        match (self.from, self.to) {
            (Some(from), Some(to)) => {
                format!("{} to {}", dates::format_date(from), dates::format_date(to))
            }
            (Some(from), None) => format!("from {}", dates::format_date(from)),
            (None, Some(to)) => format!("until {}", dates::format_date(to)),
            (None, None) => String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DueDateFilter {
    pub status: Option<DueFilterStatus>,
    #[serde(flatten)]
    pub range: DateBounds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionFilter {
    #[default]
    All,
    Completed,
    Incomplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EffortFilter {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Every sub-criterion defaults to "no restriction".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterCriteria {
    pub search: SearchFilter,
    pub labels: LabelFilter,
    pub priorities: Vec<Priority>,
    pub due_date: DueDateFilter,
    pub start_date: DateBounds,
    pub completion: CompletionFilter,
    pub effort: EffortFilter,
    pub aging: Option<Aging>,
}

/// One independently clearable part of [`FilterCriteria`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Search,
    Labels,
    Priority,
    DueDate,
    StartDate,
    Completion,
    Effort,
    Aging,
}

impl FilterKind {
    pub const ALL: [FilterKind; 8] = [
        FilterKind::Search,
        FilterKind::Labels,
        FilterKind::Priority,
        FilterKind::DueDate,
        FilterKind::StartDate,
        FilterKind::Completion,
        FilterKind::Effort,
        FilterKind::Aging,
    ];
}

impl FilterCriteria {
    pub fn is_default(&self, kind: FilterKind) -> bool {
        match kind {
            FilterKind::Search => self.search.term.trim().is_empty(),
            FilterKind::Labels => self.labels.selected.is_empty(),
            FilterKind::Priority => self.priorities.is_empty(),
            FilterKind::DueDate => self.due_date.status.is_none() && self.due_date.range.is_open(),
            FilterKind::StartDate => self.start_date.is_open(),
            FilterKind::Completion => self.completion == CompletionFilter::All,
            FilterKind::Effort => self.effort.min.is_none() && self.effort.max.is_none(),
            FilterKind::Aging => self.aging.is_none(),
        }
    }

    pub fn is_active(&self) -> bool {
        FilterKind::ALL.iter().any(|kind| !self.is_default(*kind))
    }

    pub fn clear(&mut self, kind: FilterKind) {
        let defaults = FilterCriteria::default();
        match kind {
            FilterKind::Search => self.search = defaults.search,
            FilterKind::Labels => self.labels = defaults.labels,
            FilterKind::Priority => self.priorities = defaults.priorities,
            FilterKind::DueDate => self.due_date = defaults.due_date,
            FilterKind::StartDate => self.start_date = defaults.start_date,
            FilterKind::Completion => self.completion = defaults.completion,
            FilterKind::Effort => self.effort = defaults.effort,
            FilterKind::Aging => self.aging = defaults.aging,
        }
    }

    /// True when the card passes every predicate.
    pub fn matches(&self, card: &Card, labels: &[Label], now: DateTime<Local>) -> bool {
        let today = now.date_naive();
        self.matches_search(card, labels)
            && self.matches_labels(card)
            && self.matches_priority(card)
            && self.matches_due_date(card, today)
            && self.start_date.admits(card.start())
            && self.matches_completion(card)
            && self.matches_effort(card)
            && self.matches_aging(card, now.with_timezone(&Utc))
    }

    fn matches_search(&self, card: &Card, labels: &[Label]) -> bool {
        let search = &self.search;
        if search.term.trim().is_empty() {
            return true;
        }
        let fold = |s: &str| {
            if search.case_sensitive {
                s.to_string()
            } else {
                s.to_lowercase()
            }
        };
        let term = fold(search.term.trim());
        let mut haystack: Vec<String> = Vec::new();
        if search.fields.text {
            haystack.push(fold(&card.text));
        }
        if search.fields.description {
            haystack.push(fold(&card.description));
        }
        if search.fields.labels {
            haystack.extend(
                card.labels
                    .iter()
                    .filter_map(|id| labels.iter().find(|l| &l.id == id))
                    .map(|l| fold(&l.name)),
            );
        }
        if search.fields.logs {
            haystack.extend(card.logs.iter().map(|log| fold(&log.text)));
        }
        match search.operator {
            SearchOperator::Contains => haystack.iter().any(|f| f.contains(&term)),
            SearchOperator::Exact => haystack.iter().any(|f| *f == term),
            SearchOperator::StartsWith => haystack.iter().any(|f| f.starts_with(&term)),
            SearchOperator::NotContains => !haystack.iter().any(|f| f.contains(&term)),
        }
    }

    fn matches_labels(&self, card: &Card) -> bool {
        let selected = &self.labels.selected;
        if selected.is_empty() {
            return true;
        }
        match self.labels.mode {
            LabelMatch::Any => selected.iter().any(|id| card.has_label(id)),
            LabelMatch::All => selected.iter().all(|id| card.has_label(id)),
            LabelMatch::None => !selected.iter().any(|id| card.has_label(id)),
        }
    }

    fn matches_priority(&self, card: &Card) -> bool {
        self.priorities.is_empty() || self.priorities.contains(&card.priority)
    }

    fn matches_due_date(&self, card: &Card, today: NaiveDate) -> bool {
        let due = card.due();
        let status_ok = match self.due_date.status {
            None => true,
            Some(DueFilterStatus::NoDueDate) => due.is_none(),
            Some(DueFilterStatus::HasDueDate) => due.is_some(),
            Some(status) => match due {
                None => false,
                Some(due) => {
                    let days = dates::days_between(today, due);
                    match status {
                        DueFilterStatus::Overdue => days < 0,
                        DueFilterStatus::DueToday => days == 0,
                        DueFilterStatus::DueSoon => (0..=3).contains(&days),
                        DueFilterStatus::DueThisWeek => {
                            let (monday, sunday) = dates::week_bounds(today);
                            due >= monday && due <= sunday
                        }
                        DueFilterStatus::NoDueDate | DueFilterStatus::HasDueDate => true,
                    }
                }
            },
        };
        status_ok && self.due_date.range.admits(due)
    }

    fn matches_completion(&self, card: &Card) -> bool {
        match self.completion {
            CompletionFilter::All => true,
            CompletionFilter::Completed => card.completed,
            CompletionFilter::Incomplete => !card.completed,
        }
    }

    fn matches_effort(&self, card: &Card) -> bool {
        self.effort.min.map_or(true, |min| card.effort >= min)
            && self.effort.max.map_or(true, |max| card.effort <= max)
    }

    fn matches_aging(&self, card: &Card, now: DateTime<Utc>) -> bool {
        match self.aging {
            None => true,
            Some(bucket) => card.aging_at(now) == Some(bucket),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterPreset {
    pub id: String,
    pub name: String,
    pub filters: FilterCriteria,
}

/// Result of [`FilterManager::apply_filters`]. With no active criteria the input
/// slice is handed back as is.
#[derive(Debug)]
pub enum FilteredCards<'a, T> {
    Unfiltered(&'a [T]),
    Matched(Vec<&'a T>),
}

impl<'a, T> FilteredCards<'a, T> {
    pub fn len(&self) -> usize {
        match self {
            FilteredCards::Unfiltered(items) => items.len(),
            FilteredCards::Matched(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = &'a T> + '_> {
        match self {
            FilteredCards::Unfiltered(items) => Box::new(items.iter()),
            FilteredCards::Matched(items) => Box::new(items.iter().copied()),
        }
    }
}

impl AsRef<Card> for Card {
    fn as_ref(&self) -> &Card {
        self
    }
}

impl AsRef<Card> for CardEntry<'_> {
    fn as_ref(&self) -> &Card {
        self.card
    }
}

/// Removable descriptor of one active sub-criterion.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterChip {
    pub kind: FilterKind,
    pub label: String,
}

impl FilterChip {
    pub fn clear(&self, manager: &mut FilterManager) {
        manager.clear_filter(self.kind);
    }
}

pub struct FilterManager {
    criteria: FilterCriteria,
    presets: Vec<FilterPreset>,
    storage: SharedStore,
    locale: Locale,
    observers: Observers<()>,
}

impl FilterManager {
    pub fn new(storage: SharedStore, locale: Locale) -> Self {
        let presets = load_presets(&storage);
        FilterManager {
            criteria: FilterCriteria::default(),
            presets,
            storage,
            locale,
            observers: Observers::new(),
        }
    }

    pub fn subscribe(&self, listener: impl Fn() + 'static) -> Subscription<()> {
        self.observers.subscribe(move |_| listener())
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn is_active(&self) -> bool {
        self.criteria.is_active()
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        if self.criteria != criteria {
            self.criteria = criteria;
            self.observers.notify(&());
        }
    }

    /// Edits the criteria in place; subscribers hear about it only if something changed.
    pub fn update(&mut self, f: impl FnOnce(&mut FilterCriteria)) {
        let mut next = self.criteria.clone();
        f(&mut next);
        self.set_criteria(next);
    }

    pub fn clear_filter(&mut self, kind: FilterKind) {
        self.update(|c| c.clear(kind));
    }

    pub fn reset(&mut self) {
        self.set_criteria(FilterCriteria::default());
    }

    pub fn apply_filters<'a, T: AsRef<Card>>(
        &self,
        cards: &'a [T],
        labels: &[Label],
    ) -> FilteredCards<'a, T> {
        self.apply_filters_at(cards, labels, Local::now())
    }

    pub fn apply_filters_at<'a, T: AsRef<Card>>(
        &self,
        cards: &'a [T],
        labels: &[Label],
        now: DateTime<Local>,
    ) -> FilteredCards<'a, T> {
        if !self.criteria.is_active() {
            return FilteredCards::Unfiltered(cards);
        }
        FilteredCards::Matched(
            cards
                .iter()
                .filter(|item| self.criteria.matches(item.as_ref(), labels, now))
                .collect(),
        )
    }

    // ---- presets ----

    pub fn presets(&self) -> &[FilterPreset] {
        &self.presets
    }

    pub fn find_preset(&self, name_or_id: &str) -> Option<&FilterPreset> {
        self.presets
            .iter()
            .find(|p| p.id == name_or_id)
            .or_else(|| self.presets.iter().find(|p| p.name == name_or_id))
    }

    pub fn create_preset(&mut self, name: &str) -> String {
        let preset = FilterPreset {
            id: id::generate_id(id::PRESET),
            name: name.to_string(),
            filters: self.criteria.clone(),
        };
        let id = preset.id.clone();
        self.presets.push(preset);
        self.save_presets();
        id
    }

    pub fn apply_preset(&mut self, preset_id: &str) -> bool {
        let Some(filters) = self
            .presets
            .iter()
            .find(|p| p.id == preset_id)
            .map(|p| p.filters.clone())
        else {
            return false;
        };
        self.criteria = filters;
        self.observers.notify(&());
        true
    }

    pub fn delete_preset(&mut self, preset_id: &str) -> bool {
        let before = self.presets.len();
        self.presets.retain(|p| p.id != preset_id);
        if self.presets.len() == before {
            return false;
        }
        self.save_presets();
        true
    }

    fn save_presets(&self) {
        let json = match serde_json::to_string(&self.presets) {
            Ok(json) => json,
            Err(err) => {
                tracing::warn!(%err, "could not serialize filter presets");
                return;
            }
        };
        if let Err(err) = self.storage.set(PRESETS_KEY, &json) {
            tracing::warn!(%err, "could not save filter presets");
        }
    }

    // ---- chips ----

    /// One chip per non-default sub-criterion, in a fixed order.
    pub fn get_active_filter_chips(&self, labels: &[Label]) -> Vec<FilterChip> {
        FilterKind::ALL
            .iter()
            .filter(|kind| !self.criteria.is_default(**kind))
            .map(|kind| FilterChip {
                kind: *kind,
                label: self.describe(*kind, labels),
            })
            .collect()
    }

    fn describe(&self, kind: FilterKind, labels: &[Label]) -> String {
        let c = &self.criteria;
        let (caption, detail) = match kind {
            FilterKind::Search => (Text::ChipSearch, format!("\"{}\"", c.search.term.trim())),
            FilterKind::Labels => {
                let names: Vec<&str> = c
                    .labels
                    .selected
                    .iter()
                    .map(|id| labels.iter().find(|l| &l.id == id).map_or(id.as_str(), |l| l.name.as_str()))
                    .collect();
                let mode = match c.labels.mode {
                    LabelMatch::Any => "any",
                    LabelMatch::All => "all",
                    LabelMatch::None => "none",
                };
                (Text::ChipLabels, format!("{} ({})", names.join(", "), mode))
            }
            FilterKind::Priority => {
                let names: Vec<&str> = c.priorities.iter().map(|p| p.as_str()).collect();
                (Text::ChipPriority, names.join(", "))
            }
            FilterKind::DueDate => {
                let parts: Vec<String> = c
                    .due_date
                    .status
                    .map(|s| s.as_str().to_string())
                    .into_iter()
                    .chain((!c.due_date.range.is_open()).then(|| c.due_date.range.describe()))
                    .collect();
                (Text::ChipDue, parts.join(", "))
            }
            FilterKind::StartDate => (Text::ChipStart, c.start_date.describe()),
            FilterKind::Completion => {
                let detail = match c.completion {
                    CompletionFilter::All => "all",
                    CompletionFilter::Completed => "completed",
                    CompletionFilter::Incomplete => "incomplete",
                };
                (Text::ChipCompletion, detail.to_string())
            }
            FilterKind::Effort => {
                let detail = match (c.effort.min, c.effort.max) {
                    (Some(min), Some(max)) => format!("{}-{}h", min, max),
                    (Some(min), None) => format!(">= {}h", min),
                    (None, Some(max)) => format!("<= {}h", max),
                    (None, None) => String::new(),
                };
                (Text::ChipEffort, detail)
            }
            FilterKind::Aging => (
                Text::ChipAging,
                c.aging.map(|a| a.as_str()).unwrap_or_default().to_string(),
            ),
        };
        format!("{}: {}", self.locale.text(caption), detail)
    }
}

fn load_presets(storage: &SharedStore) -> Vec<FilterPreset> {
    match storage.get(PRESETS_KEY) {
        Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|err| {
            tracing::warn!(%err, "ignoring unreadable filter presets");
            Vec::new()
        }),
        Ok(None) => Vec::new(),
        Err(err) => {
            tracing::warn!(%err, "could not read filter presets");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::LogEntry;
    use crate::storage::MemoryStore;
    use chrono::{Duration, TimeZone};
    use std::cell::Cell;
    use std::rc::Rc;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap()
    }

    fn card(text: &str) -> Card {
        let mut card = Card::new(text);
        card.updated_at = now().with_timezone(&Utc);
        card
    }

    fn label(id: &str, name: &str) -> Label {
        Label {
            id: id.into(),
            name: name.into(),
            color: "#000".into(),
        }
    }

    fn manager() -> FilterManager {
        FilterManager::new(Rc::new(MemoryStore::new()), Locale::En)
    }

    fn texts<T: AsRef<Card>>(result: &FilteredCards<'_, T>) -> Vec<String> {
        result.iter().map(|c| c.as_ref().text.clone()).collect()
    }

    #[test]
    fn inactive_filter_returns_input_slice() {
        let cards = vec![card("a"), card("b")];
        let fm = manager();
        let result = fm.apply_filters_at(&cards, &[], now());
        match result {
            FilteredCards::Unfiltered(slice) => assert!(std::ptr::eq(slice, cards.as_slice())),
            FilteredCards::Matched(_) => panic!("expected the input slice back"),
        }
    }

    #[test]
    fn blank_term_matches_everything() {
        let cards = vec![card("a"), card("b")];
        let mut fm = manager();
        fm.update(|c| {
            c.search.term = "   ".into();
            c.search.operator = SearchOperator::Exact;
            c.search.case_sensitive = true;
        });
        assert!(!fm.is_active());
        assert_eq!(fm.apply_filters_at(&cards, &[], now()).len(), 2);
    }

    #[test]
    fn search_operators_and_fields() {
        let labels = vec![label("l1", "Backend")];
        let mut a = card("Fix login");
        a.labels.push("l1".into());
        let mut b = card("Write docs");
        b.description = "login page copy".into();
        b.logs.push(LogEntry::new("waiting on review", "Doing"));
        let cards = vec![a, b];
        let mut fm = manager();

        fm.update(|c| c.search.term = "LOGIN".into());
        assert_eq!(texts(&fm.apply_filters_at(&cards, &labels, now())), vec!["Fix login", "Write docs"]);

        fm.update(|c| c.search.case_sensitive = true);
        assert!(fm.apply_filters_at(&cards, &labels, now()).is_empty());

        fm.update(|c| {
            c.search.case_sensitive = false;
            c.search.term = "fix".into();
            c.search.operator = SearchOperator::StartsWith;
        });
        assert_eq!(texts(&fm.apply_filters_at(&cards, &labels, now())), vec!["Fix login"]);

        fm.update(|c| {
            c.search.term = "backend".into();
            c.search.operator = SearchOperator::Exact;
            c.search.fields = SearchFields {
                text: false,
                description: false,
                labels: true,
                logs: false,
            };
        });
        assert_eq!(texts(&fm.apply_filters_at(&cards, &labels, now())), vec!["Fix login"]);

        fm.update(|c| {
            c.search.term = "review".into();
            c.search.operator = SearchOperator::NotContains;
            c.search.fields.logs = true;
        });
        assert_eq!(texts(&fm.apply_filters_at(&cards, &labels, now())), vec!["Fix login"]);
    }

    #[test]
    fn label_match_modes() {
        let mut a = card("a");
        a.labels = vec!["x".into(), "y".into()];
        let mut b = card("b");
        b.labels = vec!["x".into()];
        let c = card("c");
        let cards = vec![a, b, c];
        let mut fm = manager();
        fm.update(|f| f.labels.selected = vec!["x".into(), "y".into()]);
        assert_eq!(texts(&fm.apply_filters_at(&cards, &[], now())), vec!["a", "b"]);
        fm.update(|f| f.labels.mode = LabelMatch::All);
        assert_eq!(texts(&fm.apply_filters_at(&cards, &[], now())), vec!["a"]);
        fm.update(|f| f.labels.mode = LabelMatch::None);
        assert_eq!(texts(&fm.apply_filters_at(&cards, &[], now())), vec!["c"]);
    }

    #[test]
    fn completed_overdue_card_excluded_by_incomplete_filter() {
        let yesterday = now().date_naive() - Duration::days(1);
        let mut done = card("done");
        done.due_date = Some(dates::format_date(yesterday));
        done.completed = true;
        let mut open = card("open");
        open.due_date = Some(dates::format_date(yesterday));
        let cards = vec![done, open];
        let mut fm = manager();
        fm.update(|c| {
            c.due_date.status = Some(DueFilterStatus::Overdue);
            c.completion = CompletionFilter::Incomplete;
        });
        assert_eq!(texts(&fm.apply_filters_at(&cards, &[], now())), vec!["open"]);
    }

    #[test]
    fn due_status_and_range_both_apply() {
        let today = now().date_naive();
        let mk = |text: &str, offset: Option<i64>| {
            let mut c = card(text);
            c.due_date = offset.map(|o| dates::format_date(today + Duration::days(o)));
            c
        };
        let cards = vec![
            mk("past", Some(-2)),
            mk("today", Some(0)),
            mk("soon", Some(3)),
            mk("later", Some(10)),
            mk("none", None),
        ];
        let mut fm = manager();
        fm.update(|c| c.due_date.status = Some(DueFilterStatus::DueSoon));
        assert_eq!(texts(&fm.apply_filters_at(&cards, &[], now())), vec!["today", "soon"]);
        fm.update(|c| c.due_date.status = Some(DueFilterStatus::NoDueDate));
        assert_eq!(texts(&fm.apply_filters_at(&cards, &[], now())), vec!["none"]);
        fm.update(|c| {
            c.due_date.status = Some(DueFilterStatus::HasDueDate);
            c.due_date.range.from = Some(today);
            c.due_date.range.to = Some(today + Duration::days(5));
        });
        assert_eq!(texts(&fm.apply_filters_at(&cards, &[], now())), vec!["today", "soon"]);
    }

    #[test]
    fn due_this_week_uses_calendar_week() {
        // 2024-05-15 is a Wednesday; the week runs 13th to 19th.
        let mk = |text: &str, date: &str| {
            let mut c = card(text);
            c.due_date = Some(date.into());
            c
        };
        let cards = vec![mk("mon", "2024-05-13"), mk("sun", "2024-05-19"), mk("next", "2024-05-20")];
        let mut fm = manager();
        fm.update(|c| c.due_date.status = Some(DueFilterStatus::DueThisWeek));
        assert_eq!(texts(&fm.apply_filters_at(&cards, &[], now())), vec!["mon", "sun"]);
    }

    #[test]
    fn malformed_dates_never_match_date_bounds() {
        let mut bad = card("bad");
        bad.due_date = Some("31/31/2024".into());
        bad.start_date = Some("soon".into());
        let cards = vec![bad];
        let mut fm = manager();
        fm.update(|c| c.due_date.status = Some(DueFilterStatus::Overdue));
        assert!(fm.apply_filters_at(&cards, &[], now()).is_empty());
        fm.update(|c| {
            c.due_date = DueDateFilter::default();
            c.start_date.from = NaiveDate::from_ymd_opt(2000, 1, 1);
        });
        assert!(fm.apply_filters_at(&cards, &[], now()).is_empty());
    }

    #[test]
    fn priority_effort_and_aging() {
        let mut high = card("high");
        high.priority = Priority::High;
        high.effort = 8.0;
        let mut low = card("low");
        low.priority = Priority::Low;
        low.effort = 1.0;
        low.updated_at = now().with_timezone(&Utc) - Duration::days(8);
        let mut done = card("done");
        done.completed = true;
        done.updated_at = now().with_timezone(&Utc) - Duration::days(8);
        let cards = vec![high, low, done];
        let mut fm = manager();

        fm.update(|c| c.priorities = vec![Priority::High, Priority::Low]);
        assert_eq!(texts(&fm.apply_filters_at(&cards, &[], now())), vec!["high", "low"]);

        fm.reset();
        fm.update(|c| c.effort = EffortFilter { min: Some(2.0), max: None });
        assert_eq!(texts(&fm.apply_filters_at(&cards, &[], now())), vec!["high"]);

        fm.reset();
        fm.update(|c| c.aging = Some(Aging::Stale));
        assert_eq!(texts(&fm.apply_filters_at(&cards, &[], now())), vec!["low"]);
    }

    #[test]
    fn filters_card_entries_too() {
        let mut store = crate::store::Store::load(
            Rc::new(MemoryStore::new()),
            crate::store::StoreOptions::default(),
        );
        let col = store.get_active_board().columns[1].id.clone();
        store.add_card(&col, "needle");
        store.add_card(&col, "hay");
        let entries = store.get_all_cards();
        let mut fm = manager();
        fm.update(|c| c.search.term = "need".into());
        let result = fm.apply_filters_at(&entries, store.labels(), now());
        let found: Vec<&CardEntry> = result.iter().collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].column_id, col);
    }

    #[test]
    fn notifications_only_on_change() {
        let mut fm = manager();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let _sub = fm.subscribe(move || c.set(c.get() + 1));
        fm.update(|c| c.completion = CompletionFilter::Completed);
        fm.update(|c| c.completion = CompletionFilter::Completed);
        assert_eq!(count.get(), 1);
        fm.reset();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn presets_persist_independently() {
        let mem = MemoryStore::new();
        let mut fm = FilterManager::new(Rc::new(mem.clone()), Locale::En);
        fm.update(|c| c.priorities = vec![Priority::High]);
        let id = fm.create_preset("Hot");
        fm.reset();

        let mut reopened = FilterManager::new(Rc::new(mem.clone()), Locale::En);
        assert_eq!(reopened.presets().len(), 1);
        assert_eq!(reopened.find_preset("Hot").unwrap().id, id);
        assert!(reopened.apply_preset(&id));
        assert_eq!(reopened.criteria().priorities, vec![Priority::High]);
        assert!(!reopened.apply_preset("preset_missing"));
        assert!(reopened.delete_preset(&id));
        assert!(!reopened.delete_preset(&id));
        assert!(FilterManager::new(Rc::new(mem), Locale::En).presets().is_empty());
    }

    #[test]
    fn chips_one_per_subcriterion_and_clear_resets_it() {
        let labels = vec![label("l1", "Bug")];
        let mut fm = manager();
        fm.update(|c| {
            c.search.term = "api".into();
            c.labels.selected = vec!["l1".into()];
            c.due_date.status = Some(DueFilterStatus::Overdue);
            c.due_date.range.to = NaiveDate::from_ymd_opt(2024, 6, 1);
        });
        let chips = fm.get_active_filter_chips(&labels);
        let kinds: Vec<FilterKind> = chips.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![FilterKind::Search, FilterKind::Labels, FilterKind::DueDate]);
        assert_eq!(chips[1].label, "Labels: Bug (any)");
        assert_eq!(chips[2].label, "Due: overdue, until 2024-06-01");

        chips[2].clear(&mut fm);
        assert!(fm.criteria().is_default(FilterKind::DueDate));
        assert!(!fm.criteria().is_default(FilterKind::Search));
        assert_eq!(fm.get_active_filter_chips(&labels).len(), 2);
    }

    #[test]
    fn criteria_round_trip_through_json() {
        let mut criteria = FilterCriteria::default();
        criteria.due_date.status = Some(DueFilterStatus::DueThisWeek);
        criteria.due_date.range.from = NaiveDate::from_ymd_opt(2024, 1, 1);
        criteria.aging = Some(Aging::Abandoned);
        let json = serde_json::to_string(&criteria).unwrap();
        assert!(json.contains("due-this-week"));
        let back: FilterCriteria = serde_json::from_str(&json).unwrap();
        assert_eq!(back, criteria);
        let partial: FilterCriteria = serde_json::from_str(r#"{"completion":"completed"}"#).unwrap();
        assert_eq!(partial.completion, CompletionFilter::Completed);
        assert!(partial.is_default(FilterKind::Search));
    }
}
