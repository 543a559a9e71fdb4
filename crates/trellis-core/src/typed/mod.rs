//! Typed layer - JSON 行の上に型付きのレコード API を提供
//!
//! 2 層構造：
//! - `BackendGateway`（ports）: object-safe、JSON 行を運ぶ
//! - `Table<R: Record>`: 型付き、エンコード/デコードの失敗はここで吸収
//!
//! Push 通知は `Subscription` が `Change<R>` にデコードしてから callback に渡します。

pub mod codec;
pub mod record;
pub mod subscription;
pub mod table;

pub use codec::{CodecError, RowCodec};
pub use record::{Change, Record};
pub use subscription::{Subscription, unsubscribe};
pub use table::Table;
