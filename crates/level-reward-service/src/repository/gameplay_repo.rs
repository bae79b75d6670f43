//! 游戏进度仓储
//!
//! 玩家注册、关卡开始与通关由游戏侧调用；发放引擎从不修改进度记录。

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;

use super::traits::GameplayRepositoryTrait;
use super::{constraints, map_write_error};
use crate::error::{Result, RewardError};
use crate::models::player::validate_player_identifier;
use crate::models::{Player, PlayerLevel, PlayerLevelPrize};

/// 游戏进度仓储
pub struct GameplayRepository {
    pool: PgPool,
}

impl GameplayRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GameplayRepositoryTrait for GameplayRepository {
    async fn register_player(&self, player_identifier: &str) -> Result<Player> {
        validate_player_identifier(player_identifier)?;

        // DO UPDATE 为空操作，仅用于在冲突时也能 RETURNING 已有记录
        let player = sqlx::query_as::<_, Player>(
            r#"
            INSERT INTO players (player_id, registered_at)
            VALUES ($1, NOW())
            ON CONFLICT ON CONSTRAINT unique_player_identifier
            DO UPDATE SET player_id = EXCLUDED.player_id
            RETURNING id, player_id, registered_at
            "#,
        )
        .bind(player_identifier)
        .fetch_one(&self.pool)
        .await?;

        Ok(player)
    }

    async fn find_player(&self, player_identifier: &str) -> Result<Option<Player>> {
        let player = sqlx::query_as::<_, Player>(
            "SELECT id, player_id, registered_at FROM players WHERE player_id = $1",
        )
        .bind(player_identifier)
        .fetch_optional(&self.pool)
        .await?;

        Ok(player)
    }

    async fn start_level(&self, player_id: i64, level_id: i64) -> Result<PlayerLevel> {
        sqlx::query_as::<_, PlayerLevel>(
            r#"
            INSERT INTO player_levels (player_id, level_id, is_completed, score)
            VALUES ($1, $2, FALSE, 0)
            ON CONFLICT ON CONSTRAINT unique_player_level
            DO UPDATE SET player_id = EXCLUDED.player_id
            RETURNING id, player_id, level_id, completed, is_completed, score
            "#,
        )
        .bind(player_id)
        .bind(level_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match map_write_error(e) {
            err if err.is_constraint(constraints::FK_PLAYER_LEVEL_PLAYER) => {
                RewardError::PlayerNotFound(player_id.to_string())
            }
            err if err.is_constraint(constraints::FK_PLAYER_LEVEL_LEVEL) => {
                RewardError::LevelNotFound(level_id)
            }
            err => err,
        })
    }

    async fn complete_level(
        &self,
        player_id: i64,
        level_id: i64,
        score: i32,
        completed: NaiveDate,
    ) -> Result<PlayerLevel> {
        if score < 0 {
            return Err(RewardError::Validation("得分不能为负数".to_string()));
        }

        sqlx::query_as::<_, PlayerLevel>(
            r#"
            UPDATE player_levels
            SET is_completed = TRUE, score = $3, completed = $4
            WHERE player_id = $1 AND level_id = $2
            RETURNING id, player_id, level_id, completed, is_completed, score
            "#,
        )
        .bind(player_id)
        .bind(level_id)
        .bind(score)
        .bind(completed)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RewardError::LevelNotStarted {
            player_id,
            level_id,
        })
    }

    async fn list_awards(&self, player_id: i64) -> Result<Vec<PlayerLevelPrize>> {
        let awards = sqlx::query_as::<_, PlayerLevelPrize>(
            r#"
            SELECT id, player_id, level_prize_id, received
            FROM player_level_prizes
            WHERE player_id = $1
            ORDER BY received ASC, id ASC
            "#,
        )
        .bind(player_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(awards)
    }
}
