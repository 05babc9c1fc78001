use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{Board, BoardId, Column, Label};

/// The persisted document: every board plus the id of the active one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub active_board_id: BoardId,
    pub boards: Vec<Board>,
}

/// Single-board shape written by older releases.
#[derive(Debug, Deserialize)]
struct LegacySnapshot {
    #[serde(default)]
    name: Option<String>,
    columns: Vec<Column>,
    #[serde(default)]
    labels: Vec<Label>,
}

#[derive(thiserror::Error, Debug)]
pub enum SnapshotError {
    #[error("snapshot is empty")]
    Empty,
    #[error("malformed snapshot json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unrecognized snapshot shape")]
    UnknownShape,
    #[error("snapshot contains no boards")]
    NoBoards,
}

impl Snapshot {
    pub fn new(board: Board) -> Self {
        Snapshot {
            active_board_id: board.id.clone(),
            boards: vec![board],
        }
    }

    pub fn active_board(&self) -> Option<&Board> {
        self.boards
            .iter()
            .find(|b| b.id == self.active_board_id)
            .or_else(|| self.boards.first())
    }

    pub fn to_json_pretty(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Parses either snapshot shape. A legacy `{columns, labels}` document becomes a
/// one-board snapshot named `legacy_name` unless it carries its own name.
pub fn parse_snapshot(json: &str, legacy_name: &str) -> Result<Snapshot, SnapshotError> {
    if json.trim().is_empty() {
        return Err(SnapshotError::Empty);
    }
    let value: Value = serde_json::from_str(json)?;
    let mut snapshot = if value.get("boards").is_some() {
        serde_json::from_value::<Snapshot>(value)?
    } else if value.get("columns").is_some() {
        let legacy: LegacySnapshot = serde_json::from_value(value)?;
        tracing::info!("upgrading single-board snapshot");
        let mut board = Board::new(legacy.name.unwrap_or_else(|| legacy_name.to_string()));
        board.columns = legacy.columns;
        board.labels = legacy.labels;
        Snapshot::new(board)
    } else {
        return Err(SnapshotError::UnknownShape);
    };
    if snapshot.boards.is_empty() {
        return Err(SnapshotError::NoBoards);
    }
    if snapshot.active_board().map(|b| b.id.as_str()) != Some(snapshot.active_board_id.as_str()) {
        snapshot.active_board_id = snapshot.boards[0].id.clone();
    }
    for board in &mut snapshot.boards {
        board.normalize();
    }
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_shape_is_upgraded() {
        let json = r#"{
            "columns": [{"id": "c1", "title": "Todo", "cards": [{"id": "k1", "text": "a"}]}],
            "labels": [{"id": "l1", "name": "Bug", "color": "red"}]
        }"#;
        let snapshot = parse_snapshot(json, "Imported").unwrap();
        assert_eq!(snapshot.boards.len(), 1);
        let board = &snapshot.boards[0];
        assert_eq!(board.name, "Imported");
        assert_eq!(snapshot.active_board_id, board.id);
        assert_eq!(board.columns[0].cards[0].text, "a");
        assert_eq!(board.labels[0].name, "Bug");
    }

    #[test]
    fn stale_active_id_falls_back_to_first_board() {
        let json = r#"{"activeBoardId": "gone", "boards": [{"id": "b1", "name": "One"}]}"#;
        let snapshot = parse_snapshot(json, "x").unwrap();
        assert_eq!(snapshot.active_board_id, "b1");
    }

    #[test]
    fn rejects_garbage_and_empty_documents() {
        assert!(matches!(parse_snapshot("", "x"), Err(SnapshotError::Empty)));
        assert!(matches!(parse_snapshot("{not json", "x"), Err(SnapshotError::Json(_))));
        assert!(matches!(parse_snapshot("{\"foo\":1}", "x"), Err(SnapshotError::UnknownShape)));
        assert!(matches!(
            parse_snapshot("{\"boards\":[]}", "x"),
            Err(SnapshotError::NoBoards)
        ));
    }

    #[test]
    fn dangling_dependencies_pruned_on_load() {
        let json = r#"{"activeBoardId":"b1","boards":[{"id":"b1","name":"B","columns":[
            {"id":"c1","title":"T","cards":[{"id":"k1","dependencies":["k2","ghost"]},{"id":"k2"}]}
        ]}]}"#;
        let snapshot = parse_snapshot(json, "x").unwrap();
        let deps = &snapshot.boards[0].columns[0].cards[0].dependencies;
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].id, "k2");
    }
}
