//! Events - authoritative store からの push 通知
//!
//! 通知はトランスポートの到着順で届きます（シーケンス番号・再送なし）。

use serde::{Deserialize, Serialize};

use super::collection::Collection;
use super::ids::id_text;

/// One backend row as a JSON object.
pub type Row = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// RowChange は 1 行分の変更通知
///
/// - INSERT / UPDATE: `new` に変更後の行
/// - DELETE: `old` に少なくとも `id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowChange {
    pub collection: Collection,
    pub kind: ChangeKind,
    #[serde(default)]
    pub new: Option<Row>,
    #[serde(default)]
    pub old: Option<Row>,
}

impl RowChange {
    pub fn insert(collection: Collection, row: Row) -> Self {
        Self {
            collection,
            kind: ChangeKind::Insert,
            new: Some(row),
            old: None,
        }
    }

    pub fn update(collection: Collection, row: Row) -> Self {
        Self {
            collection,
            kind: ChangeKind::Update,
            new: Some(row),
            old: None,
        }
    }

    pub fn delete(collection: Collection, old: Row) -> Self {
        Self {
            collection,
            kind: ChangeKind::Delete,
            new: None,
            old: Some(old),
        }
    }

    /// Id of the affected row, taken from `new` or, for deletes, `old`.
    pub fn row_id(&self) -> Option<String> {
        let row = match self.kind {
            ChangeKind::Delete => self.old.as_ref(),
            ChangeKind::Insert | ChangeKind::Update => self.new.as_ref(),
        }?;
        row.get("id").and_then(id_text)
    }
}
