use serde::{Deserialize, Serialize};

use crate::i18n::{Locale, Text};
use crate::model::{Board, Column, Label};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Template {
    #[default]
    Basic,
    Development,
}

const LABELS: [(Text, &str); 4] = [
    (Text::LabelBug, "#e74c3c"),
    (Text::LabelFeature, "#3498db"),
    (Text::LabelUrgent, "#e67e22"),
    (Text::LabelImprovement, "#2ecc71"),
];

impl Template {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "basic" => Some(Template::Basic),
            "development" | "dev" => Some(Template::Development),
            _ => None,
        }
    }

    fn columns(&self) -> &'static [Text] {
        match self {
            Template::Basic => &[Text::ColumnTodo, Text::ColumnDoing, Text::ColumnDone],
            Template::Development => &[
                Text::ColumnBacklog,
                Text::ColumnTodo,
                Text::ColumnDoing,
                Text::ColumnReview,
                Text::ColumnDone,
            ],
        }
    }

    /// Fresh board with this template's columns and labels, titled in `locale`.
    pub fn instantiate(&self, name: impl Into<String>, locale: Locale) -> Board {
        let mut board = Board::new(name);
        board.columns = self
            .columns()
            .iter()
            .map(|key| Column::new(locale.text(*key)))
            .collect();
        board.labels = LABELS
            .iter()
            .map(|(key, color)| Label::new(locale.text(*key), *color))
            .collect();
        board
    }
}
