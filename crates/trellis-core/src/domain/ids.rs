//! Record identifiers (strongly-typed IDs).
//!
//! authoritative store が払い出す id は不透明な文字列として扱います。
//! Supabase のテーブルによっては数値 id が返るため、デシリアライズ時は
//! 数値も受け付けて 10 進文字列に正規化します。
//!
//! ## Phantom Type パターン
//! `Id<T>` の `T` は実行時には使わないマーカー型で、
//! `TaskId` と `NoteId` をコンパイル時に区別します。

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// `Id<T>` の derive が `T` にも同じ trait を要求するため、マーカー側で揃えておきます。
pub trait IdMarker:
    fmt::Debug + Clone + Copy + PartialEq + Eq + std::hash::Hash + PartialOrd + Ord + Send + Sync + 'static
{
}

/// ジェネリック ID 型
///
/// # 例
/// ```ignore
/// let task_id: TaskId = Id::new("42");
/// let note_id: NoteId = Id::new("42");
/// // task_id と note_id は異なる型なので、混同できない
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id<T: IdMarker> {
    raw: String,
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            _marker: PhantomData,
        }
    }

    /// ULID から Id を作成（in-memory store の採番用）
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self::new(ulid.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> From<&str> for Id<T> {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl<T: IdMarker> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

impl<'de, T: IdMarker> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = match RawId::deserialize(deserializer)? {
            RawId::Text(s) => s,
            RawId::Signed(n) => n.to_string(),
            RawId::Unsigned(n) => n.to_string(),
        };
        Ok(Self::new(raw))
    }
}

/// JSON の id 値を比較用の文字列にする（数値 id も同じ扱い）
pub fn id_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ========================================
// マーカー型の定義
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskMarker {}
impl IdMarker for TaskMarker {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NoteMarker {}
impl IdMarker for NoteMarker {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DelayMarker {}
impl IdMarker for DelayMarker {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActivityMarker {}
impl IdMarker for ActivityMarker {}

/// Identifier of a task row.
pub type TaskId = Id<TaskMarker>;

/// Identifier of a note row.
pub type NoteId = Id<NoteMarker>;

/// Identifier of a delay row.
pub type DelayId = Id<DelayMarker>;

/// Identifier of an activity row.
pub type ActivityId = Id<ActivityMarker>;
