use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::card::{Card, CardId, LabelId};
use crate::id;

pub type BoardId = String;
pub type ColumnId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub id: LabelId,
    pub name: String,
    #[serde(default)]
    pub color: String,
}

impl Label {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Label {
            id: id::generate_id(id::LABEL),
            name: name.into(),
            color: color.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    pub title: String,
    #[serde(default)]
    pub cards: Vec<Card>,
}

impl Column {
    pub fn new(title: impl Into<String>) -> Self {
        Column {
            id: id::generate_id(id::COLUMN),
            title: title.into(),
            cards: Vec::new(),
        }
    }

    pub fn card_index(&self, card_id: &str) -> Option<usize> {
        self.cards.iter().position(|c| c.id == card_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub id: BoardId,
    pub name: String,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub labels: Vec<Label>,
}

impl Board {
    pub fn new(name: impl Into<String>) -> Self {
        Board {
            id: id::generate_id(id::BOARD),
            name: name.into(),
            columns: Vec::new(),
            labels: Vec::new(),
        }
    }

    pub fn find_column_index(&self, id: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.id == id)
    }

    pub fn column(&self, id: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == id)
    }

    pub fn column_mut(&mut self, id: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.id == id)
    }

    /// (column index, card index) of a card.
    pub fn locate_card(&self, card_id: &str) -> Option<(usize, usize)> {
        self.columns
            .iter()
            .enumerate()
            .find_map(|(ci, col)| col.card_index(card_id).map(|ki| (ci, ki)))
    }

    pub fn find_card(&self, card_id: &str) -> Option<(&Column, &Card)> {
        let (ci, ki) = self.locate_card(card_id)?;
        let column = &self.columns[ci];
        Some((column, &column.cards[ki]))
    }

    pub fn card_mut(&mut self, card_id: &str) -> Option<&mut Card> {
        let (ci, ki) = self.locate_card(card_id)?;
        Some(&mut self.columns[ci].cards[ki])
    }

    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.columns.iter().flat_map(|c| c.cards.iter())
    }

    pub fn card_ids(&self) -> HashSet<CardId> {
        self.cards().map(|c| c.id.clone()).collect()
    }

    pub fn label(&self, id: &str) -> Option<&Label> {
        self.labels.iter().find(|l| l.id == id)
    }

    /// Drops every dependency that points at a card no longer on the board.
    pub fn prune_dependencies(&mut self) -> usize {
        let existing = self.card_ids();
        let mut pruned = 0;
        for card in self.columns.iter_mut().flat_map(|c| c.cards.iter_mut()) {
            let before = card.dependencies.len();
            card.dependencies.retain(|d| existing.contains(&d.id));
            pruned += before - card.dependencies.len();
        }
        pruned
    }

    pub fn strip_label(&mut self, label_id: &str) {
        for card in self.columns.iter_mut().flat_map(|c| c.cards.iter_mut()) {
            card.labels.retain(|l| l != label_id);
        }
    }

    pub fn normalize(&mut self) {
        for card in self.columns.iter_mut().flat_map(|c| c.cards.iter_mut()) {
            card.normalize();
        }
        self.prune_dependencies();
    }
}

/// Reorders `items` so the ids in `order` come first, in that order, followed by
/// the members `order` did not mention in their previous relative order.
/// Unknown and repeated ids are ignored.
pub fn reorder_by_id<T, F>(items: &mut Vec<T>, order: &[String], id_of: F)
where
    F: Fn(&T) -> &str,
{
    let mut remaining: Vec<Option<T>> = items.drain(..).map(Some).collect();
    let mut reordered = Vec::with_capacity(remaining.len());
    for wanted in order {
        if let Some(slot) = remaining
            .iter_mut()
            .find(|slot| slot.as_ref().map(|item| id_of(item) == wanted) == Some(true))
        {
            if let Some(item) = slot.take() {
                reordered.push(item);
            }
        }
    }
    reordered.extend(remaining.into_iter().flatten());
    *items = reordered;
}
