use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    De,
}

/// Keys for the strings the core needs to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Text {
    ColumnBacklog,
    ColumnTodo,
    ColumnDoing,
    ColumnReview,
    ColumnDone,
    LabelBug,
    LabelFeature,
    LabelUrgent,
    LabelImprovement,
    DefaultBoardName,
    ChipSearch,
    ChipLabels,
    ChipPriority,
    ChipDue,
    ChipStart,
    ChipCompletion,
    ChipEffort,
    ChipAging,
}

const WEEKDAYS_EN: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const WEEKDAYS_DE: [&str; 7] = ["Mo", "Di", "Mi", "Do", "Fr", "Sa", "So"];

const MONTHS_EN: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];
const MONTHS_DE: [&str; 12] = [
    "Januar", "Februar", "März", "April", "Mai", "Juni", "Juli", "August", "September",
    "Oktober", "November", "Dezember",
];

impl Locale {
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_lowercase().as_str() {
            "en" => Some(Locale::En),
            "de" => Some(Locale::De),
            _ => None,
        }
    }

    pub fn text(&self, key: Text) -> &'static str {
        match self {
            Locale::En => match key {
                Text::ColumnBacklog => "Backlog",
                Text::ColumnTodo => "To Do",
                Text::ColumnDoing => "In Progress",
                Text::ColumnReview => "Review",
                Text::ColumnDone => "Done",
                Text::LabelBug => "Bug",
                Text::LabelFeature => "Feature",
                Text::LabelUrgent => "Urgent",
                Text::LabelImprovement => "Improvement",
                Text::DefaultBoardName => "My Board",
                Text::ChipSearch => "Search",
                Text::ChipLabels => "Labels",
                Text::ChipPriority => "Priority",
                Text::ChipDue => "Due",
                Text::ChipStart => "Start",
                Text::ChipCompletion => "Status",
                Text::ChipEffort => "Effort",
                Text::ChipAging => "Aging",
            },
            Locale::De => match key {
                Text::ColumnBacklog => "Backlog",
                Text::ColumnTodo => "Zu erledigen",
                Text::ColumnDoing => "In Arbeit",
                Text::ColumnReview => "Prüfung",
                Text::ColumnDone => "Erledigt",
                Text::LabelBug => "Fehler",
                Text::LabelFeature => "Funktion",
                Text::LabelUrgent => "Dringend",
                Text::LabelImprovement => "Verbesserung",
                Text::DefaultBoardName => "Mein Board",
                Text::ChipSearch => "Suche",
                Text::ChipLabels => "Labels",
                Text::ChipPriority => "Priorität",
                Text::ChipDue => "Fällig",
                Text::ChipStart => "Beginn",
                Text::ChipCompletion => "Status",
                Text::ChipEffort => "Aufwand",
                Text::ChipAging => "Alter",
            },
        }
    }

    pub fn weekday_short(&self, date: NaiveDate) -> &'static str {
        let idx = date.weekday().num_days_from_monday() as usize;
        match self {
            Locale::En => WEEKDAYS_EN[idx],
            Locale::De => WEEKDAYS_DE[idx],
        }
    }

    pub fn month_name(&self, date: NaiveDate) -> &'static str {
        let idx = date.month0() as usize;
        match self {
            Locale::En => MONTHS_EN[idx],
            Locale::De => MONTHS_DE[idx],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekday_and_month_follow_locale() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        assert_eq!(Locale::En.weekday_short(date), "Mon");
        assert_eq!(Locale::De.weekday_short(date), "Mo");
        assert_eq!(Locale::De.month_name(date), "März");
    }

    #[test]
    fn parse_locale_codes() {
        assert_eq!(Locale::parse("DE"), Some(Locale::De));
        assert_eq!(Locale::parse("fr"), None);
    }
}
