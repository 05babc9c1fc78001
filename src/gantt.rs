//! Timeline projection of a board.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::card::{Card, Dependency};
use crate::dates;
use crate::i18n::Locale;
use crate::model::{Column, Label};
use crate::observer::{Observers, Subscription};

const PAD_BEFORE_DAYS: i64 = 3;
const PAD_AFTER_DAYS: i64 = 7;
const DEFAULT_WINDOW_DAYS: i64 = 30;
/// Horizontal space trimmed from every bar so adjacent bars do not touch.
pub const BAR_GUTTER: f64 = 4.0;
/// Distance kept left of "today" when scrolling it into view.
pub const TODAY_MARGIN: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoomLevel {
    #[default]
    Day,
    Week,
    Month,
}

impl ZoomLevel {
    /// Pixels per day cell.
    pub fn cell_width(&self) -> f64 {
        match self {
            ZoomLevel::Day => 60.0,
            ZoomLevel::Week => 24.0,
            ZoomLevel::Month => 8.0,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "day" => Some(ZoomLevel::Day),
            "week" => Some(ZoomLevel::Week),
            "month" => Some(ZoomLevel::Month),
            _ => None,
        }
    }
}

/// A card as seen by the timeline, with its owning column and resolved labels.
#[derive(Debug, Clone)]
pub struct GanttTask<'a> {
    pub card: &'a Card,
    pub column: &'a Column,
    pub labels: Vec<&'a Label>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl<'a> GanttTask<'a> {
    pub fn id(&self) -> &'a str {
        &self.card.id
    }

    pub fn is_scheduled(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    /// Inclusive length in days, at least one.
    pub fn duration_days(&self) -> Option<i64> {
        let (start, end) = (self.start?, self.end?);
        Some((dates::days_between(start, end) + 1).max(1))
    }
}

#[derive(Debug, Clone, Default)]
pub struct GanttData<'a> {
    pub scheduled: Vec<GanttTask<'a>>,
    pub unscheduled: Vec<GanttTask<'a>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCell {
    pub date: NaiveDate,
    pub day: u32,
    pub weekday: &'static str,
    pub is_weekend: bool,
    pub is_today: bool,
    pub month: &'static str,
    pub week: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCell {
    pub key: String,
    pub label: String,
    pub span: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineHeaders {
    pub days: Vec<DayCell>,
    pub groups: Vec<GroupCell>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskPosition {
    pub left: f64,
    pub width: f64,
    pub visible: bool,
}

impl TaskPosition {
    pub const HIDDEN: TaskPosition = TaskPosition {
        left: 0.0,
        width: 0.0,
        visible: false,
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyIssue {
    /// Ids along the cycle, starting at the first node that was re-entered.
    Cycle { path: Vec<String> },
    Missing {
        task_id: String,
        dependency_id: String,
    },
}

/// Anything with an id and a list of dependencies.
pub trait DependencyNode {
    fn node_id(&self) -> &str;
    fn node_dependencies(&self) -> &[Dependency];
}

impl DependencyNode for Card {
    fn node_id(&self) -> &str {
        &self.id
    }

    fn node_dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }
}

impl DependencyNode for GanttTask<'_> {
    fn node_id(&self) -> &str {
        &self.card.id
    }

    fn node_dependencies(&self) -> &[Dependency] {
        &self.card.dependencies
    }
}

impl<T: DependencyNode + ?Sized> DependencyNode for &T {
    fn node_id(&self) -> &str {
        (**self).node_id()
    }

    fn node_dependencies(&self) -> &[Dependency] {
        (**self).node_dependencies()
    }
}

pub struct GanttManager {
    zoom: ZoomLevel,
    locale: Locale,
    observers: Observers<ZoomLevel>,
}

impl GanttManager {
    pub fn new(locale: Locale) -> Self {
        GanttManager {
            zoom: ZoomLevel::default(),
            locale,
            observers: Observers::new(),
        }
    }

    pub fn subscribe(&self, listener: impl Fn(ZoomLevel) + 'static) -> Subscription<ZoomLevel> {
        self.observers.subscribe(move |zoom| listener(*zoom))
    }

    pub fn zoom(&self) -> ZoomLevel {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: ZoomLevel) {
        if self.zoom != zoom {
            self.zoom = zoom;
            self.observers.notify(&zoom);
        }
    }

    pub fn cell_width(&self) -> f64 {
        self.zoom.cell_width()
    }

    /// Splits every card into scheduled (start and due date) and unscheduled.
    pub fn transform_to_gantt_data<'a>(
        &self,
        columns: &'a [Column],
        labels: &'a [Label],
    ) -> GanttData<'a> {
        let mut data = GanttData::default();
        for column in columns {
            for card in &column.cards {
                let task = GanttTask {
                    card,
                    column,
                    labels: card
                        .labels
                        .iter()
                        .filter_map(|id| labels.iter().find(|l| &l.id == id))
                        .collect(),
                    start: card.start(),
                    end: card.due(),
                };
                if task.is_scheduled() {
                    data.scheduled.push(task);
                } else {
                    data.unscheduled.push(task);
                }
            }
        }
        data
    }

    pub fn calculate_date_range(&self, tasks: &[GanttTask<'_>]) -> DateRange {
        self.calculate_date_range_at(tasks, dates::today())
    }

    /// Earliest start minus three days through latest end plus seven days, or a
    /// thirty day window from `today` when nothing is scheduled.
    pub fn calculate_date_range_at(&self, tasks: &[GanttTask<'_>], today: NaiveDate) -> DateRange {
        let earliest = tasks.iter().filter_map(|t| t.start).min();
        let latest = tasks.iter().filter_map(|t| t.end).max();
        let (Some(earliest), Some(latest)) = (earliest, latest) else {
            return DateRange {
                start: today,
                end: dates::add_days(today, DEFAULT_WINDOW_DAYS),
                days: DEFAULT_WINDOW_DAYS,
            };
        };
        let start = dates::add_days(earliest, -PAD_BEFORE_DAYS);
        let end = dates::add_days(latest, PAD_AFTER_DAYS).max(start);
        DateRange {
            start,
            end,
            days: dates::days_between(start, end) + 1,
        }
    }

    pub fn generate_timeline_headers(&self, range: &DateRange) -> TimelineHeaders {
        self.generate_timeline_headers_at(range, dates::today())
    }

    /// One cell per day plus grouping cells (months, or years at month zoom),
    /// built in a single pass so runs stay in calendar order.
    pub fn generate_timeline_headers_at(&self, range: &DateRange, today: NaiveDate) -> TimelineHeaders {
        let mut days = Vec::with_capacity(range.days.max(0) as usize);
        let mut groups: Vec<GroupCell> = Vec::new();
        for offset in 0..range.days.max(0) {
            let date = dates::add_days(range.start, offset);
            let month = self.locale.month_name(date);
            days.push(DayCell {
                date,
                day: chrono::Datelike::day(&date),
                weekday: self.locale.weekday_short(date),
                is_weekend: dates::is_weekend(date),
                is_today: date == today,
                month,
                week: dates::iso_week(date),
            });

            let year = chrono::Datelike::year(&date);
            let (key, label) = match self.zoom {
                ZoomLevel::Day | ZoomLevel::Week => (
                    format!("{}-{:02}", year, chrono::Datelike::month(&date)),
                    format!("{} {}", month, year),
                ),
                ZoomLevel::Month => (year.to_string(), year.to_string()),
            };
            match groups.last_mut() {
                Some(last) if last.key == key => last.span += 1,
                _ => groups.push(GroupCell {
                    key,
                    label,
                    span: 1,
                }),
            }
        }
        TimelineHeaders { days, groups }
    }

    pub fn calculate_task_position(&self, task: &GanttTask<'_>, range: &DateRange) -> TaskPosition {
        let (Some(start), Some(duration)) = (task.start, task.duration_days()) else {
            return TaskPosition::HIDDEN;
        };
        let cell = self.cell_width();
        TaskPosition {
            left: dates::days_between(range.start, start) as f64 * cell,
            width: (duration as f64 * cell - BAR_GUTTER).max(0.0),
            visible: true,
        }
    }

    pub fn get_today_offset(&self, range: &DateRange) -> f64 {
        self.get_today_offset_at(range, dates::today())
    }

    pub fn get_today_offset_at(&self, range: &DateRange, today: NaiveDate) -> f64 {
        let offset = dates::days_between(range.start, today) as f64 * self.cell_width();
        (offset - TODAY_MARGIN).max(0.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

/// Reports dependency cycles and references to ids outside `tasks`. Diamonds
/// (several paths into one task) are not cycles.
pub fn validate_dependencies<T: DependencyNode>(tasks: &[T]) -> Vec<DependencyIssue> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    for (i, task) in tasks.iter().enumerate() {
        index.entry(task.node_id()).or_insert(i);
    }

    let mut issues = Vec::new();
    for task in tasks {
        for dep in task.node_dependencies() {
            if !index.contains_key(dep.id.as_str()) {
                issues.push(DependencyIssue::Missing {
                    task_id: task.node_id().to_string(),
                    dependency_id: dep.id.clone(),
                });
            }
        }
    }

    let edges: Vec<Vec<usize>> = tasks
        .iter()
        .map(|task| {
            task.node_dependencies()
                .iter()
                .filter_map(|dep| index.get(dep.id.as_str()).copied())
                .collect()
        })
        .collect();
    let mut marks = vec![Mark::Unvisited; tasks.len()];
    let mut stack = Vec::new();
    for root in 0..tasks.len() {
        if marks[root] == Mark::Unvisited {
            visit(root, &edges, &mut marks, &mut stack, &mut |cycle| {
                issues.push(DependencyIssue::Cycle {
                    path: cycle.iter().map(|&i| tasks[i].node_id().to_string()).collect(),
                })
            });
        }
    }
    issues
}

fn visit(
    node: usize,
    edges: &[Vec<usize>],
    marks: &mut [Mark],
    stack: &mut Vec<usize>,
    on_cycle: &mut dyn FnMut(&[usize]),
) {
    marks[node] = Mark::OnStack;
    stack.push(node);
    for &next in &edges[node] {
        match marks[next] {
            Mark::Unvisited => visit(next, edges, marks, stack, on_cycle),
            Mark::OnStack => {
                if let Some(pos) = stack.iter().position(|&n| n == next) {
                    on_cycle(&stack[pos..]);
                }
            }
            Mark::Done => {}
        }
    }
    stack.pop();
    marks[node] = Mark::Done;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::DependencyKind;
    use crate::model::Board;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn card(id: &str, start: Option<&str>, due: Option<&str>, deps: &[&str]) -> Card {
        let mut card = Card::new(id);
        card.id = id.into();
        card.start_date = start.map(String::from);
        card.due_date = due.map(String::from);
        card.dependencies = deps
            .iter()
            .map(|dep| Dependency {
                id: dep.to_string(),
                kind: DependencyKind::FinishToStart,
            })
            .collect();
        card
    }

    fn board_with(cards: Vec<Card>) -> Board {
        let mut board = Board::new("b");
        let mut column = Column::new("Doing");
        column.cards = cards;
        board.columns.push(column);
        board.labels.push(Label {
            id: "l1".into(),
            name: "Bug".into(),
            color: "#f00".into(),
        });
        board
    }

    #[test]
    fn partitions_scheduled_and_unscheduled() {
        let mut with_label = card("a", Some("2024-01-10"), Some("2024-01-12"), &[]);
        with_label.labels = vec!["l1".into(), "gone".into()];
        let board = board_with(vec![
            with_label,
            card("b", Some("2024-01-10"), None, &[]),
            card("c", None, None, &[]),
            card("d", Some("garbage"), Some("2024-01-12"), &[]),
        ]);
        let gm = GanttManager::new(Locale::En);
        let data = gm.transform_to_gantt_data(&board.columns, &board.labels);
        assert_eq!(data.scheduled.len(), 1);
        assert_eq!(data.unscheduled.len(), 3);
        let task = &data.scheduled[0];
        assert_eq!(task.id(), "a");
        assert_eq!(task.column.title, "Doing");
        assert_eq!(task.labels.len(), 1);
        assert_eq!(task.labels[0].name, "Bug");
    }

    #[test]
    fn date_range_pads_both_sides() {
        let board = board_with(vec![card("a", Some("2024-01-10"), Some("2024-01-12"), &[])]);
        let gm = GanttManager::new(Locale::En);
        let data = gm.transform_to_gantt_data(&board.columns, &board.labels);
        let range = gm.calculate_date_range_at(&data.scheduled, d(2030, 1, 1));
        assert_eq!(range.start, d(2024, 1, 7));
        assert_eq!(range.end, d(2024, 1, 19));
        assert_eq!(range.days, 13);
    }

    #[test]
    fn extreme_years_leave_card_unscheduled() {
        let board = board_with(vec![
            card("a", Some("2024-01-01"), Some("+262142-12-30"), &[]),
            card("b", Some("-262143-01-02"), Some("2024-01-05"), &[]),
        ]);
        let gm = GanttManager::new(Locale::En);
        let data = gm.transform_to_gantt_data(&board.columns, &board.labels);
        assert!(data.scheduled.is_empty());
        assert_eq!(data.unscheduled.len(), 2);
        let range = gm.calculate_date_range_at(&data.scheduled, d(2024, 3, 1));
        assert_eq!(range.days, 30);
    }

    #[test]
    fn empty_date_range_is_thirty_days_from_today() {
        let gm = GanttManager::new(Locale::En);
        let today = d(2024, 3, 1);
        let range = gm.calculate_date_range_at(&[], today);
        assert_eq!(range.start, today);
        assert_eq!(range.end, d(2024, 3, 31));
        assert_eq!(range.days, 30);
    }

    #[test]
    fn headers_group_by_month_in_order() {
        let mut gm = GanttManager::new(Locale::En);
        let range = DateRange {
            start: d(2023, 12, 30),
            end: d(2024, 1, 2),
            days: 4,
        };
        let headers = gm.generate_timeline_headers_at(&range, d(2024, 1, 1));
        assert_eq!(headers.days.len(), 4);
        assert_eq!(headers.days[0].weekday, "Sat");
        assert!(headers.days[0].is_weekend);
        assert!(headers.days[2].is_today);
        assert_eq!(headers.days[2].week, 1);
        assert_eq!(headers.groups.len(), 2);
        assert_eq!(headers.groups[0].label, "December 2023");
        assert_eq!(headers.groups[0].span, 2);
        assert_eq!(headers.groups[1].span, 2);

        gm.set_zoom(ZoomLevel::Month);
        let headers = gm.generate_timeline_headers_at(&range, d(2024, 1, 1));
        let keys: Vec<&str> = headers.groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["2023", "2024"]);
    }

    #[test]
    fn task_position_uses_zoom_cell_width() {
        let board = board_with(vec![
            card("one", Some("2024-01-10"), Some("2024-01-10"), &[]),
            card("three", Some("2024-01-11"), Some("2024-01-13"), &[]),
            card("open", Some("2024-01-11"), None, &[]),
        ]);
        let gm = GanttManager::new(Locale::En);
        let data = gm.transform_to_gantt_data(&board.columns, &board.labels);
        let range = gm.calculate_date_range_at(&data.scheduled, d(2024, 1, 1));
        let one = gm.calculate_task_position(&data.scheduled[0], &range);
        assert_eq!(one.left, 3.0 * 60.0);
        assert_eq!(one.width, 60.0 - BAR_GUTTER);
        assert!(one.visible);
        let three = gm.calculate_task_position(&data.scheduled[1], &range);
        assert_eq!(three.width, 3.0 * 60.0 - BAR_GUTTER);
        assert_eq!(gm.calculate_task_position(&data.unscheduled[0], &range), TaskPosition::HIDDEN);
    }

    #[test]
    fn today_offset_clamps_at_zero() {
        let gm = GanttManager::new(Locale::En);
        let range = DateRange {
            start: d(2024, 1, 1),
            end: d(2024, 1, 31),
            days: 31,
        };
        assert_eq!(gm.get_today_offset_at(&range, d(2023, 12, 1)), 0.0);
        assert_eq!(gm.get_today_offset_at(&range, d(2024, 1, 11)), 10.0 * 60.0 - TODAY_MARGIN);
    }

    #[test]
    fn zoom_change_notifies_once() {
        let mut gm = GanttManager::new(Locale::En);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let _sub = gm.subscribe(move |z| s.borrow_mut().push(z));
        gm.set_zoom(ZoomLevel::Week);
        gm.set_zoom(ZoomLevel::Week);
        assert_eq!(*seen.borrow(), vec![ZoomLevel::Week]);
        assert_eq!(gm.cell_width(), 24.0);
    }

    #[test]
    fn ring_reports_one_cycle() {
        let tasks = vec![
            card("A", None, None, &["B"]),
            card("B", None, None, &["C"]),
            card("C", None, None, &["A"]),
        ];
        let issues = validate_dependencies(&tasks);
        assert_eq!(
            issues,
            vec![DependencyIssue::Cycle {
                path: vec!["A".into(), "B".into(), "C".into()]
            }]
        );
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let tasks = vec![
            card("A", None, None, &["B", "C"]),
            card("B", None, None, &["D"]),
            card("C", None, None, &["D"]),
            card("D", None, None, &[]),
        ];
        assert!(validate_dependencies(&tasks).is_empty());
    }

    #[test]
    fn self_loop_and_missing_reference() {
        let tasks = vec![card("A", None, None, &["A", "ghost"])];
        let issues = validate_dependencies(&tasks);
        assert!(issues.contains(&DependencyIssue::Cycle {
            path: vec!["A".into()]
        }));
        assert!(issues.contains(&DependencyIssue::Missing {
            task_id: "A".into(),
            dependency_id: "ghost".into(),
        }));
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn validates_gantt_tasks() {
        let board = board_with(vec![
            card("a", Some("2024-01-01"), Some("2024-01-02"), &["b"]),
            card("b", Some("2024-01-01"), Some("2024-01-02"), &["a"]),
        ]);
        let gm = GanttManager::new(Locale::En);
        let data = gm.transform_to_gantt_data(&board.columns, &board.labels);
        let issues = validate_dependencies(&data.scheduled);
        assert_eq!(issues.len(), 1);
    }
}
