//! Board state engine.
//!
//! Every mutation goes through a method here so that subscribers see exactly one
//! notification per logical operation and the snapshot is written once per burst
//! of edits.

use std::time::{Duration, Instant};

use crate::card::{Card, CardId, Dependency, DependencyKind, LabelId, LogEntry};
use crate::i18n::{Locale, Text};
use crate::model::{reorder_by_id, Board, BoardId, Column, ColumnId, Label};
use crate::observer::{Observers, Subscription};
use crate::snapshot::{parse_snapshot, Snapshot, SnapshotError};
use crate::storage::{SharedStore, StorageError, BACKUP_KEY, DATA_KEY};
use crate::templates::Template;

pub const DEFAULT_SAVE_DEBOUNCE: Duration = Duration::from_millis(150);

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub locale: Locale,
    pub save_debounce: Duration,
    pub default_template: Template,
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions {
            locale: Locale::default(),
            save_debounce: DEFAULT_SAVE_DEBOUNCE,
            default_template: Template::default(),
        }
    }
}

/// A card together with the column that currently owns it.
#[derive(Debug, Clone, Copy)]
pub struct CardEntry<'a> {
    pub card: &'a Card,
    pub column_id: &'a str,
    pub column_title: &'a str,
}

/// Source of "now" for the save debounce.
pub type Clock = Box<dyn Fn() -> Instant>;

pub struct Store {
    state: Snapshot,
    storage: SharedStore,
    options: StoreOptions,
    observers: Observers<()>,
    batch_depth: u32,
    dirty: bool,
    save_deadline: Option<Instant>,
    clock: Clock,
}

impl Store {
    /// Loads the stored snapshot, falling back to a fresh default board when it is
    /// missing or unreadable.
    pub fn load(storage: SharedStore, options: StoreOptions) -> Self {
        Self::load_with_clock(storage, options, Box::new(Instant::now))
    }

    pub fn load_with_clock(storage: SharedStore, options: StoreOptions, clock: Clock) -> Self {
        let mut store = Store {
            state: Snapshot::new(Board::new("")),
            storage,
            options,
            observers: Observers::new(),
            batch_depth: 0,
            dirty: false,
            save_deadline: None,
            clock,
        };
        store.state = store.read_snapshot();
        store
    }

    fn read_snapshot(&mut self) -> Snapshot {
        let legacy_name = self.options.locale.text(Text::DefaultBoardName);
        // Only a missing or backed-up document may be overwritten by the default.
        let replaceable = match self.storage.get(DATA_KEY) {
            Ok(Some(json)) => match parse_snapshot(&json, legacy_name) {
                Ok(snapshot) => return snapshot,
                Err(err) => {
                    tracing::warn!(%err, "stored snapshot unusable, starting fresh");
                    match self.storage.set(BACKUP_KEY, &json) {
                        Ok(()) => {
                            tracing::warn!(key = BACKUP_KEY, "kept unusable snapshot");
                            true
                        }
                        Err(err) => {
                            tracing::warn!(%err, "could not back up unusable snapshot");
                            false
                        }
                    }
                }
            },
            Ok(None) => {
                tracing::debug!("no stored snapshot, creating default board");
                true
            }
            Err(err) => {
                tracing::warn!(%err, "could not read stored snapshot, starting fresh");
                false
            }
        };
        let board = self
            .options
            .default_template
            .instantiate(legacy_name, self.options.locale);
        if replaceable {
            self.schedule_save((self.clock)());
        }
        Snapshot::new(board)
    }

    /// Discards in-memory state and reads the stored snapshot again.
    pub fn reload(&mut self) {
        self.save_deadline = None;
        self.state = self.read_snapshot();
        self.observers.notify(&());
    }

    pub fn subscribe(&self, listener: impl Fn() + 'static) -> Subscription<()> {
        self.observers.subscribe(move |_| listener())
    }

    /// Runs `f` as one logical operation: nested mutations inside it produce a
    /// single notification once the outermost batch ends.
    pub fn batch<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.batch_depth += 1;
        let result = f(self);
        self.batch_depth -= 1;
        if self.batch_depth == 0 && self.dirty {
            self.dirty = false;
            let now = (self.clock)();
            self.schedule_save(now);
            self.observers.notify(&());
        }
        result
    }

    /// Applies `f` to the active board; `None` from `f` means nothing changed.
    fn mutate<R>(&mut self, f: impl FnOnce(&mut Board) -> Option<R>) -> Option<R> {
        self.batch(|store| {
            let idx = store.active_index();
            let result = f(&mut store.state.boards[idx]);
            if result.is_some() {
                store.dirty = true;
            }
            result
        })
    }

    fn mutate_state<R>(&mut self, f: impl FnOnce(&mut Snapshot) -> Option<R>) -> Option<R> {
        self.batch(|store| {
            let result = f(&mut store.state);
            if result.is_some() {
                store.dirty = true;
            }
            result
        })
    }

    fn active_index(&self) -> usize {
        self.state
            .boards
            .iter()
            .position(|b| b.id == self.state.active_board_id)
            .unwrap_or(0)
    }

    // ---- boards ----

    pub fn get_active_board(&self) -> &Board {
        &self.state.boards[self.active_index()]
    }

    pub fn state(&self) -> &Snapshot {
        &self.state
    }

    pub fn boards(&self) -> &[Board] {
        &self.state.boards
    }

    pub fn create_board(&mut self, name: &str, template: Template) -> BoardId {
        let board = template.instantiate(name, self.options.locale);
        let id = board.id.clone();
        tracing::info!(board = %id, name, "creating board");
        self.mutate_state(|state| {
            state.active_board_id = board.id.clone();
            state.boards.push(board);
            Some(())
        });
        id
    }

    pub fn switch_board(&mut self, board_id: &str) -> bool {
        self.mutate_state(|state| {
            if !state.boards.iter().any(|b| b.id == board_id) {
                return None;
            }
            state.active_board_id = board_id.to_string();
            Some(())
        })
        .is_some()
    }

    pub fn rename_board(&mut self, board_id: &str, name: &str) -> bool {
        self.mutate_state(|state| {
            let board = state.boards.iter_mut().find(|b| b.id == board_id)?;
            board.name = name.to_string();
            Some(())
        })
        .is_some()
    }

    /// Refuses to delete the last remaining board.
    pub fn delete_board(&mut self, board_id: &str) -> bool {
        self.mutate_state(|state| {
            if state.boards.len() <= 1 {
                return None;
            }
            let idx = state.boards.iter().position(|b| b.id == board_id)?;
            state.boards.remove(idx);
            if state.active_board_id == board_id {
                state.active_board_id = state.boards[0].id.clone();
            }
            tracing::info!(board = %board_id, "deleted board");
            Some(())
        })
        .is_some()
    }

    // ---- columns ----

    pub fn add_column(&mut self, title: &str) -> Option<ColumnId> {
        self.mutate(|board| {
            let column = Column::new(title);
            let id = column.id.clone();
            board.columns.push(column);
            Some(id)
        })
    }

    pub fn rename_column(&mut self, column_id: &str, title: &str) -> bool {
        self.mutate(|board| {
            board.column_mut(column_id)?.title = title.to_string();
            Some(())
        })
        .is_some()
    }

    /// Removes the column with its cards and any dependencies on those cards.
    pub fn remove_column(&mut self, column_id: &str) -> bool {
        self.mutate(|board| {
            let idx = board.find_column_index(column_id)?;
            board.columns.remove(idx);
            board.prune_dependencies();
            Some(())
        })
        .is_some()
    }

    pub fn reorder_columns(&mut self, order: &[String]) -> bool {
        self.mutate(|board| {
            let before: Vec<ColumnId> = board.columns.iter().map(|c| c.id.clone()).collect();
            reorder_by_id(&mut board.columns, order, |c| c.id.as_str());
            let changed = board.columns.iter().map(|c| &c.id).ne(before.iter());
            changed.then_some(())
        })
        .is_some()
    }

    // ---- cards ----

    pub fn add_card(&mut self, column_id: &str, text: &str) -> Option<CardId> {
        self.mutate(|board| {
            let column = board.column_mut(column_id)?;
            let card = Card::new(text);
            let id = card.id.clone();
            column.cards.push(card);
            Some(id)
        })
    }

    /// Edits a card in place and refreshes `updated_at`. The id cannot be changed
    /// and dependencies on unknown cards are dropped afterwards.
    pub fn update_card(&mut self, card_id: &str, f: impl FnOnce(&mut Card)) -> bool {
        self.mutate(|board| {
            let card = board.card_mut(card_id)?;
            f(card);
            card.id = card_id.to_string();
            card.normalize();
            card.touch();
            board.prune_dependencies();
            Some(())
        })
        .is_some()
    }

    pub fn toggle_card_completed(&mut self, card_id: &str) -> bool {
        self.update_card(card_id, |card| card.completed = !card.completed)
    }

    /// Deletes the card and prunes every dependency that pointed at it.
    pub fn remove_card(&mut self, card_id: &str) -> bool {
        self.mutate(|board| {
            let (ci, ki) = board.locate_card(card_id)?;
            board.columns[ci].cards.remove(ki);
            board.prune_dependencies();
            Some(())
        })
        .is_some()
    }

    /// Inserts a copy right after the original.
    pub fn duplicate_card(&mut self, column_id: &str, card_id: &str) -> Option<CardId> {
        self.mutate(|board| {
            let column = board.column_mut(column_id)?;
            let idx = column.card_index(card_id)?;
            let copy = column.cards[idx].duplicate();
            let id = copy.id.clone();
            column.cards.insert(idx + 1, copy);
            Some(id)
        })
    }

    /// Moves a card between columns (or within one) and applies `dest_order` to
    /// the destination. Refreshes `updated_at`.
    pub fn move_card(
        &mut self,
        card_id: &str,
        source_column_id: &str,
        dest_column_id: &str,
        dest_order: &[String],
    ) -> bool {
        self.mutate(|board| {
            let src = board.find_column_index(source_column_id)?;
            let dest = board.find_column_index(dest_column_id)?;
            let idx = board.columns[src].card_index(card_id)?;
            let mut card = board.columns[src].cards.remove(idx);
            card.touch();
            let cards = &mut board.columns[dest].cards;
            cards.push(card);
            if !dest_order.is_empty() {
                reorder_by_id(cards, dest_order, |c| c.id.as_str());
            }
            Some(())
        })
        .is_some()
    }

    /// Reorders a column's cards without touching their `updated_at`.
    pub fn reorder_cards(&mut self, column_id: &str, order: &[String]) -> bool {
        self.mutate(|board| {
            let column = board.column_mut(column_id)?;
            let before: Vec<CardId> = column.cards.iter().map(|c| c.id.clone()).collect();
            reorder_by_id(&mut column.cards, order, |c| c.id.as_str());
            let changed = column.cards.iter().map(|c| &c.id).ne(before.iter());
            changed.then_some(())
        })
        .is_some()
    }

    /// Appends a log entry stamped with the card's current column title.
    pub fn add_log(&mut self, card_id: &str, text: &str) -> Option<String> {
        self.mutate(|board| {
            let (ci, ki) = board.locate_card(card_id)?;
            let column = &mut board.columns[ci];
            let entry = LogEntry::new(text, column.title.clone());
            let id = entry.id.clone();
            let card = &mut column.cards[ki];
            card.logs.push(entry);
            card.touch();
            Some(id)
        })
    }

    /// Records that `card_id` depends on `target_id`. Both must exist and differ;
    /// an existing link to the same target has its kind replaced.
    pub fn add_dependency(&mut self, card_id: &str, target_id: &str, kind: DependencyKind) -> bool {
        self.mutate(|board| {
            if card_id == target_id || board.locate_card(target_id).is_none() {
                return None;
            }
            let card = board.card_mut(card_id)?;
            match card.dependencies.iter_mut().find(|d| d.id == target_id) {
                Some(existing) => existing.kind = kind,
                None => card.dependencies.push(Dependency {
                    id: target_id.to_string(),
                    kind,
                }),
            }
            card.touch();
            Some(())
        })
        .is_some()
    }

    pub fn remove_dependency(&mut self, card_id: &str, target_id: &str) -> bool {
        self.mutate(|board| {
            let card = board.card_mut(card_id)?;
            let before = card.dependencies.len();
            card.dependencies.retain(|d| d.id != target_id);
            if card.dependencies.len() == before {
                return None;
            }
            card.touch();
            Some(())
        })
        .is_some()
    }

    // ---- labels ----

    pub fn labels(&self) -> &[Label] {
        &self.get_active_board().labels
    }

    pub fn add_label(&mut self, name: &str, color: &str) -> Option<LabelId> {
        self.mutate(|board| {
            let label = Label::new(name, color);
            let id = label.id.clone();
            board.labels.push(label);
            Some(id)
        })
    }

    pub fn update_label(&mut self, label_id: &str, name: Option<&str>, color: Option<&str>) -> bool {
        self.mutate(|board| {
            let label = board.labels.iter_mut().find(|l| l.id == label_id)?;
            if let Some(name) = name {
                label.name = name.to_string();
            }
            if let Some(color) = color {
                label.color = color.to_string();
            }
            Some(())
        })
        .is_some()
    }

    /// Deletes the label and removes it from every card on the board.
    pub fn remove_label(&mut self, label_id: &str) -> bool {
        self.mutate(|board| {
            let idx = board.labels.iter().position(|l| l.id == label_id)?;
            board.labels.remove(idx);
            board.strip_label(label_id);
            Some(())
        })
        .is_some()
    }

    pub fn toggle_card_label(&mut self, card_id: &str, label_id: &str) -> bool {
        self.mutate(|board| {
            board.label(label_id)?;
            let card = board.card_mut(card_id)?;
            if card.has_label(label_id) {
                card.labels.retain(|l| l != label_id);
            } else {
                card.labels.push(label_id.to_string());
            }
            card.touch();
            Some(())
        })
        .is_some()
    }

    // ---- reads ----

    /// Every card of the active board in column order.
    pub fn get_all_cards(&self) -> Vec<CardEntry<'_>> {
        self.get_active_board()
            .columns
            .iter()
            .flat_map(|column| {
                column.cards.iter().map(move |card| CardEntry {
                    card,
                    column_id: column.id.as_str(),
                    column_title: column.title.as_str(),
                })
            })
            .collect()
    }

    pub fn find_card(&self, card_id: &str) -> Option<CardEntry<'_>> {
        let (column, card) = self.get_active_board().find_card(card_id)?;
        Some(CardEntry {
            card,
            column_id: column.id.as_str(),
            column_title: column.title.as_str(),
        })
    }

    // ---- persistence ----

    fn schedule_save(&mut self, now: Instant) {
        self.save_deadline = Some(now + self.options.save_debounce);
    }

    pub fn has_pending_save(&self) -> bool {
        self.save_deadline.is_some()
    }

    /// Writes the snapshot if the debounce window has elapsed. Returns whether a
    /// write happened.
    pub fn poll_save_at(&mut self, now: Instant) -> Result<bool, StorageError> {
        match self.save_deadline {
            Some(deadline) if now >= deadline => {
                self.write_snapshot()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Writes immediately if a save is pending.
    pub fn flush(&mut self) -> Result<(), StorageError> {
        if self.save_deadline.is_some() {
            self.write_snapshot()?;
        }
        Ok(())
    }

    fn write_snapshot(&mut self) -> Result<(), StorageError> {
        // Serializing produces an independent copy; later edits cannot reach it.
        let json = match self.state.to_json() {
            Ok(json) => json,
            Err(err) => {
                tracing::warn!(%err, "could not serialize state");
                self.save_deadline = None;
                return Ok(());
            }
        };
        self.storage.set(DATA_KEY, &json)?;
        self.save_deadline = None;
        tracing::debug!(bytes = json.len(), "saved snapshot");
        Ok(())
    }

    pub fn export_data(&self) -> Result<String, SnapshotError> {
        self.state.to_json_pretty()
    }

    /// Replaces the stored snapshot with `json` and reloads from it. Returns false,
    /// leaving storage untouched, when the payload is not a usable snapshot.
    pub fn import_data(&mut self, json: &str) -> bool {
        let legacy_name = self.options.locale.text(Text::DefaultBoardName);
        let snapshot = match parse_snapshot(json, legacy_name) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(%err, "rejected import");
                return false;
            }
        };
        let serialized = match snapshot.to_json() {
            Ok(s) => s,
            Err(err) => {
                tracing::warn!(%err, "rejected import");
                return false;
            }
        };
        if let Err(err) = self.storage.set(DATA_KEY, &serialized) {
            tracing::warn!(%err, "could not store imported snapshot");
            return false;
        }
        tracing::info!(boards = snapshot.boards.len(), "imported snapshot");
        self.reload();
        true
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        if let Err(err) = self.flush() {
            tracing::warn!(%err, "failed to save snapshot on shutdown");
        }
    }
}
