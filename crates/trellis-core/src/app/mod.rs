//! App - アプリケーション層（同期コア）
//!
//! ports を組み合わせて、1 つのユーザー操作を
//! 「authoritative write + best-effort の mirror 書き込み」として実行し、
//! インメモリのリストを push 通知と突き合わせます。
//!
//! # 主要コンポーネント
//! - **DashboardBuilder**: コラボレーターのワイヤリング（fail-fast）
//! - **ServiceContext**: ハンドルと接続フラグ、connect_* 操作
//! - **CredentialStore**: 資格情報の保存とセクション単位のマージ
//! - **TaskSync / NoteSync / DelayLog / ActivityFeed**: コレクションごとの同期
//! - **MirrorViews**: tracker / calendar の読み取り専用ビュー
//! - **Dashboard**: 起動・再読み込み・購読の管理

pub mod activity;
pub mod builder;
pub mod context;
pub mod credentials;
pub mod dashboard;
pub mod delays;
pub mod live;
pub mod mirrors;
pub mod notes;
pub mod reconcile;
pub mod tasks;

pub use self::activity::ActivityFeed;
pub use self::builder::{BuildError, DashboardBuilder};
pub use self::context::ServiceContext;
pub use self::credentials::CredentialStore;
pub use self::dashboard::Dashboard;
pub use self::delays::DelayLog;
pub use self::live::LiveList;
pub use self::mirrors::MirrorViews;
pub use self::notes::NoteSync;
pub use self::reconcile::apply_change;
pub use self::tasks::{AddOptions, TaskSync};
