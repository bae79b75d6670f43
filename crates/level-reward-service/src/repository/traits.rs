//! 仓储 Trait 定义
//!
//! 定义仓储接口，便于服务层依赖抽象而非具体实现，支持 mock 测试

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::Result;
use crate::models::{
    Boost, Level, LevelPrize, Player, PlayerBoost, PlayerLevel, PlayerLevelPrize, Prize,
    ProgressCursor, ProgressRow,
};

/// 发放事务
///
/// 一次奖品发放的前置检查与写入都在同一事务内完成。
/// 未调用 `commit` 即被丢弃的事务等同于回滚。
#[async_trait]
pub trait AwardTransaction: Send {
    /// 按 (玩家, 关卡) 查询进度记录
    async fn find_player_level(
        &mut self,
        player_id: i64,
        level_id: i64,
    ) -> Result<Option<PlayerLevel>>;

    /// 按关卡查询奖品映射
    async fn find_level_prize(&mut self, level_id: i64) -> Result<Option<LevelPrize>>;

    /// 检查 (玩家, 关卡奖品) 是否已有发放记录
    async fn award_exists(&mut self, player_id: i64, level_prize_id: i64) -> Result<bool>;

    /// 写入发放记录
    ///
    /// 唯一约束冲突以 `ConstraintViolation(unique_player_level_prize)` 返回
    async fn insert_award(&mut self, player_id: i64, level_prize_id: i64)
    -> Result<PlayerLevelPrize>;

    async fn commit(&mut self) -> Result<()>;

    /// 回滚；事务已结束时为空操作
    async fn rollback(&mut self) -> Result<()>;
}

/// 发放仓储接口
#[async_trait]
pub trait AwardRepositoryTrait: Send + Sync {
    /// 开启发放事务
    async fn begin(&self) -> Result<Box<dyn AwardTransaction>>;

    /// 按外部标识解析玩家内部 ID
    async fn find_player_id(&self, player_identifier: &str) -> Result<Option<i64>>;
}

/// 进度导出仓储接口（只读）
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProgressRepositoryTrait: Send + Sync {
    /// 关卡 ID -> 奖品名称
    async fn level_prize_titles(&self) -> Result<HashMap<i64, String>>;

    /// 已发放奖品的 (玩家 ID, 关卡 ID) 集合
    async fn awarded_pairs(&self) -> Result<HashSet<(i64, i64)>>;

    /// 按 (玩家标识, 关卡顺序, 进度 ID) 读取游标之后的一批进度
    async fn progress_chunk(
        &self,
        after: Option<ProgressCursor>,
        limit: i64,
    ) -> Result<Vec<ProgressRow>>;
}

/// 关卡与奖品配置仓储接口
#[async_trait]
pub trait CatalogRepositoryTrait: Send + Sync {
    async fn create_level(&self, title: &str, sort_order: i32) -> Result<Level>;
    async fn create_prize(&self, title: &str) -> Result<Prize>;

    /// 为关卡配置奖品，每个关卡只能配置一次
    async fn assign_level_prize(&self, level_id: i64, prize_id: i64) -> Result<LevelPrize>;
    async fn get_level_prize(&self, level_id: i64) -> Result<Option<LevelPrize>>;

    /// 按关卡顺序列出全部关卡
    async fn list_levels(&self) -> Result<Vec<Level>>;
}

/// 游戏进度仓储接口
#[async_trait]
pub trait GameplayRepositoryTrait: Send + Sync {
    /// 注册玩家（同一外部标识重复注册返回已有记录）
    async fn register_player(&self, player_identifier: &str) -> Result<Player>;
    async fn find_player(&self, player_identifier: &str) -> Result<Option<Player>>;

    /// 开始关卡（已开始时返回已有进度）
    async fn start_level(&self, player_id: i64, level_id: i64) -> Result<PlayerLevel>;

    /// 标记通关并写入得分与通关日期
    async fn complete_level(
        &self,
        player_id: i64,
        level_id: i64,
        score: i32,
        completed: NaiveDate,
    ) -> Result<PlayerLevel>;

    /// 列出玩家已提交的发放记录
    async fn list_awards(&self, player_id: i64) -> Result<Vec<PlayerLevelPrize>>;
}

/// 加成仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BoostRepositoryTrait: Send + Sync {
    async fn create_boost(&self, name: &str) -> Result<Boost>;
    async fn find_boost_by_name(&self, name: &str) -> Result<Option<Boost>>;
    async fn set_boost_active(&self, boost_id: i64, is_active: bool) -> Result<()>;

    async fn create_player_boost(
        &self,
        player_id: i64,
        boost_id: i64,
        activated_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<PlayerBoost>;
    async fn list_player_boosts(&self, player_id: i64) -> Result<Vec<PlayerBoost>>;

    /// 将已过期但仍为激活状态的玩家加成置为失效，返回更新条数
    async fn deactivate_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}
