//! 数据库仓储层
//!
//! 提供所有实体的数据访问接口，封装 SQL 操作细节。
//!
//! ## 设计原则
//!
//! - 仓储只负责数据持久化，不包含业务逻辑
//! - 使用 SQLx 进行类型安全的数据库操作
//! - 发放事务由服务层通过 `AwardTransaction` 控制提交与回滚
//! - 定义 trait 接口，服务层不依赖具体存储；`MemoryStore` 提供进程内实现

mod award_repo;
mod boost_repo;
mod catalog_repo;
mod gameplay_repo;
mod memory;
mod progress_repo;
mod traits;

pub use award_repo::{AwardRepository, PgAwardTransaction};
pub use boost_repo::BoostRepository;
pub use catalog_repo::CatalogRepository;
pub use gameplay_repo::GameplayRepository;
pub use memory::{MemoryAwardTransaction, MemoryStore};
pub use progress_repo::ProgressRepository;
pub use traits::*;

use crate::error::RewardError;

/// 约束名（与 migrations 保持一致）
pub mod constraints {
    pub const UNIQUE_PLAYER_IDENTIFIER: &str = "unique_player_identifier";
    pub const UNIQUE_LEVEL_PRIZE_LEVEL: &str = "unique_level_prize_level";
    pub const UNIQUE_PLAYER_LEVEL: &str = "unique_player_level";
    pub const UNIQUE_PLAYER_LEVEL_PRIZE: &str = "unique_player_level_prize";
    pub const UNIQUE_BOOST_NAME: &str = "unique_boost_name";

    pub const FK_LEVEL_PRIZE_LEVEL: &str = "level_prizes_level_id_fkey";
    pub const FK_LEVEL_PRIZE_PRIZE: &str = "level_prizes_prize_id_fkey";
    pub const FK_PLAYER_LEVEL_PLAYER: &str = "player_levels_player_id_fkey";
    pub const FK_PLAYER_LEVEL_LEVEL: &str = "player_levels_level_id_fkey";
    pub const FK_PLAYER_LEVEL_PRIZE_PLAYER: &str = "player_level_prizes_player_id_fkey";
    pub const FK_PLAYER_LEVEL_PRIZE_LEVEL_PRIZE: &str =
        "player_level_prizes_level_prize_id_fkey";
    pub const FK_PLAYER_BOOST_PLAYER: &str = "player_boosts_player_id_fkey";
    pub const FK_PLAYER_BOOST_BOOST: &str = "player_boosts_boost_id_fkey";
}

/// 写操作错误转换
///
/// 唯一约束与外键约束冲突转换为 `ConstraintViolation`，由上层按约束名解释；
/// 其余错误保持为数据库错误。
pub(crate) fn map_write_error(err: sqlx::Error) -> RewardError {
    if let sqlx::Error::Database(db_err) = &err
        && (db_err.is_unique_violation() || db_err.is_foreign_key_violation())
    {
        return RewardError::ConstraintViolation {
            constraint: db_err.constraint().unwrap_or_default().to_string(),
        };
    }
    RewardError::Database(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_write_error_keeps_non_constraint_errors() {
        let err = map_write_error(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, RewardError::Database(sqlx::Error::PoolTimedOut)));

        let err = map_write_error(sqlx::Error::RowNotFound);
        assert_eq!(err.error_code(), "DATABASE_ERROR");
    }
}
