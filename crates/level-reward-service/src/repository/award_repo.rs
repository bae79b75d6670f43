//! 发放仓储
//!
//! 基于 PostgreSQL 事务实现奖品发放的读-检查-写流程。
//! 唯一约束 unique_player_level_prize 是并发发放的最终裁决。

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use super::map_write_error;
use super::traits::{AwardRepositoryTrait, AwardTransaction};
use crate::error::{Result, RewardError};
use crate::models::{LevelPrize, PlayerLevel, PlayerLevelPrize};

/// 发放仓储
pub struct AwardRepository {
    pool: PgPool,
}

impl AwardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AwardRepositoryTrait for AwardRepository {
    async fn begin(&self) -> Result<Box<dyn AwardTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgAwardTransaction { tx: Some(tx) }))
    }

    async fn find_player_id(&self, player_identifier: &str) -> Result<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>("SELECT id FROM players WHERE player_id = $1")
            .bind(player_identifier)
            .fetch_optional(&self.pool)
            .await?;

        Ok(id)
    }
}

/// PostgreSQL 发放事务
///
/// 提交或回滚后内部事务被取走，之后的读写返回内部错误
pub struct PgAwardTransaction {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgAwardTransaction {
    fn conn(&mut self) -> Result<&mut PgConnection> {
        self.tx
            .as_deref_mut()
            .ok_or_else(|| RewardError::Internal("发放事务已结束".to_string()))
    }
}

#[async_trait]
impl AwardTransaction for PgAwardTransaction {
    /// 使用 FOR SHARE 锁定进度行，事务期间通关状态不会被并发修改；
    /// 共享锁之间互不阻塞，同一 (玩家, 关卡) 的并发发放仍由唯一约束裁决
    async fn find_player_level(
        &mut self,
        player_id: i64,
        level_id: i64,
    ) -> Result<Option<PlayerLevel>> {
        let player_level = sqlx::query_as::<_, PlayerLevel>(
            r#"
            SELECT id, player_id, level_id, completed, is_completed, score
            FROM player_levels
            WHERE player_id = $1 AND level_id = $2
            FOR SHARE
            "#,
        )
        .bind(player_id)
        .bind(level_id)
        .fetch_optional(self.conn()?)
        .await?;

        Ok(player_level)
    }

    async fn find_level_prize(&mut self, level_id: i64) -> Result<Option<LevelPrize>> {
        let level_prize = sqlx::query_as::<_, LevelPrize>(
            "SELECT id, level_id, prize_id FROM level_prizes WHERE level_id = $1",
        )
        .bind(level_id)
        .fetch_optional(self.conn()?)
        .await?;

        Ok(level_prize)
    }

    async fn award_exists(&mut self, player_id: i64, level_prize_id: i64) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM player_level_prizes
                WHERE player_id = $1 AND level_prize_id = $2
            )
            "#,
        )
        .bind(player_id)
        .bind(level_prize_id)
        .fetch_one(self.conn()?)
        .await?;

        Ok(exists)
    }

    async fn insert_award(
        &mut self,
        player_id: i64,
        level_prize_id: i64,
    ) -> Result<PlayerLevelPrize> {
        sqlx::query_as::<_, PlayerLevelPrize>(
            r#"
            INSERT INTO player_level_prizes (player_id, level_prize_id, received)
            VALUES ($1, $2, NOW())
            RETURNING id, player_id, level_prize_id, received
            "#,
        )
        .bind(player_id)
        .bind(level_prize_id)
        .fetch_one(self.conn()?)
        .await
        .map_err(map_write_error)
    }

    async fn commit(&mut self) -> Result<()> {
        match self.tx.take() {
            Some(tx) => tx.commit().await.map_err(map_write_error),
            None => Err(RewardError::Internal("发放事务已结束".to_string())),
        }
    }

    async fn rollback(&mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
        }
        Ok(())
    }
}
