//! Record trait - 型付きレコードとコレクションの対応付け
//!
//! # Trait Bounds
//! - `Serialize` / `DeserializeOwned`: JSON 行との相互変換のため
//! - `Clone`: リストのスナップショットを差し替えるため
//! - `Send + Sync + 'static`: push 購読タスクへ渡すため

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::codec::{CodecError, RowCodec};
use crate::domain::{
    ActivityEntry, ActivityMarker, ChangeKind, Collection, Delay, DelayMarker, Id, IdMarker, Note,
    NoteMarker, RowChange, Task, TaskMarker,
};

pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    type Marker: IdMarker;

    /// Collection the record lives in.
    const COLLECTION: Collection;

    fn id(&self) -> &Id<Self::Marker>;
}

impl Record for Task {
    type Marker = TaskMarker;
    const COLLECTION: Collection = Collection::Tasks;

    fn id(&self) -> &Id<TaskMarker> {
        &self.id
    }
}

impl Record for Note {
    type Marker = NoteMarker;
    const COLLECTION: Collection = Collection::Notes;

    fn id(&self) -> &Id<NoteMarker> {
        &self.id
    }
}

impl Record for Delay {
    type Marker = DelayMarker;
    const COLLECTION: Collection = Collection::Delays;

    fn id(&self) -> &Id<DelayMarker> {
        &self.id
    }
}

impl Record for ActivityEntry {
    type Marker = ActivityMarker;
    const COLLECTION: Collection = Collection::Activity;

    fn id(&self) -> &Id<ActivityMarker> {
        &self.id
    }
}

/// A typed change to one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Change<R: Record> {
    Insert(R),
    Update(R),
    Delete(Id<R::Marker>),
}

impl<R: Record> Change<R> {
    /// Decode a raw push notification for `R::COLLECTION`.
    pub fn decode(change: RowChange) -> Result<Self, CodecError> {
        if change.collection != R::COLLECTION {
            return Err(CodecError::WrongCollection {
                expected: R::COLLECTION,
                actual: change.collection,
            });
        }
        match change.kind {
            ChangeKind::Insert => Ok(Change::Insert(RowCodec::decode(required(change.new)?)?)),
            ChangeKind::Update => Ok(Change::Update(RowCodec::decode(required(change.new)?)?)),
            ChangeKind::Delete => {
                let old = required(change.old)?;
                let id = old
                    .get("id")
                    .and_then(crate::domain::id_text)
                    .ok_or(CodecError::MissingId)?;
                Ok(Change::Delete(Id::new(id)))
            }
        }
    }
}

fn required(row: Option<crate::domain::Row>) -> Result<crate::domain::Row, CodecError> {
    row.ok_or(CodecError::MissingRow)
}
