//! IdGenerator port - ID 生成の抽象化
//!
//! in-memory store が行 id を払い出すときに使います。
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース

use std::sync::Arc;

use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は行 id を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数タスクから使える）
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> Ulid;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使って現在時刻ベースの ULID を生成します。
/// FixedClock を渡せば timestamp 部分が決定的になります。
pub struct UlidGenerator {
    clock: Arc<dyn Clock>,
}

impl UlidGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl IdGenerator for UlidGenerator {
    fn generate(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};

    #[test]
    fn ulid_generator_generates_unique_ids() {
        let id_gen = UlidGenerator::new(Arc::new(SystemClock));

        let id1 = id_gen.generate();
        let id2 = id_gen.generate();
        let id3 = id_gen.generate();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn ulid_generator_with_fixed_clock_shares_timestamp() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(Arc::new(FixedClock::new(fixed_time)));

        let id1 = id_gen.generate();
        let id2 = id_gen.generate();

        // ランダム部分があるので ID は異なる
        assert_ne!(id1, id2);
        // timestamp 部分は同じ
        assert_eq!(id1.timestamp_ms(), id2.timestamp_ms());
        assert_eq!(id1.timestamp_ms(), fixed_time.timestamp_millis() as u64);
    }
}
