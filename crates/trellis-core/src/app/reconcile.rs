//! Reconcile - ローカルのリストへ変更を適用する純粋関数
//!
//! 直接呼び出しの結果と push 通知の両方がここを通ります。
//! - INSERT: 未知の id なら先頭に追加（既知なら何もしない）
//! - UPDATE: 同じ id の要素をその場で置き換え
//! - DELETE: 同じ id の要素を取り除く
//!
//! `cap` があれば INSERT の後に末尾を切り詰めます。

use crate::typed::{Change, Record};

/// Apply `change` to `list`; returns whether anything changed.
pub fn apply_change<R: Record>(list: &mut Vec<R>, change: Change<R>, cap: Option<usize>) -> bool {
    match change {
        Change::Insert(record) => {
            if list.iter().any(|r| r.id() == record.id()) {
                return false;
            }
            list.insert(0, record);
            if let Some(cap) = cap {
                list.truncate(cap);
            }
            true
        }
        Change::Update(record) => match list.iter_mut().find(|r| r.id() == record.id()) {
            Some(slot) => {
                *slot = record;
                true
            }
            None => false,
        },
        Change::Delete(id) => {
            let before = list.len();
            list.retain(|r| r.id() != &id);
            list.len() != before
        }
    }
}
