//! trellis-core
//!
//! Sync core for the trellis dashboard: tasks, notes, delays and activity kept
//! consistent with an authoritative backend, with best-effort mirrors in a task
//! tracker, a calendar and a chat webhook.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, task, note, delay, activity, settings, events）
//! - **ports**: 抽象化レイヤー（BackendGateway, TrackerMirror, CalendarMirror, ChatNotifier, など）
//! - **typed**: 型付きレコード API（Record trait, Table, Subscription）
//! - **impls**: ports の実装（in-memory / PostgREST / Wrike / Google Calendar / Google Chat）
//! - **app**: 同期コア（builder, context, tasks, notes, delays, activity, dashboard）
//! - **config**: 環境変数からの実行時設定

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod typed;

#[cfg(test)]
pub(crate) mod testing;
