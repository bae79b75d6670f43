//! 关卡与奖品配置仓储
//!
//! 配置由运营侧维护，游戏流程与发放流程只读取

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::CatalogRepositoryTrait;
use super::{constraints, map_write_error};
use crate::error::{Result, RewardError};
use crate::models::{Level, LevelPrize, Prize};

/// 关卡与奖品配置仓储
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepositoryTrait for CatalogRepository {
    async fn create_level(&self, title: &str, sort_order: i32) -> Result<Level> {
        let level = sqlx::query_as::<_, Level>(
            r#"
            INSERT INTO levels (title, sort_order)
            VALUES ($1, $2)
            RETURNING id, title, sort_order
            "#,
        )
        .bind(title)
        .bind(sort_order)
        .fetch_one(&self.pool)
        .await?;

        Ok(level)
    }

    async fn create_prize(&self, title: &str) -> Result<Prize> {
        let prize = sqlx::query_as::<_, Prize>(
            "INSERT INTO prizes (title) VALUES ($1) RETURNING id, title",
        )
        .bind(title)
        .fetch_one(&self.pool)
        .await?;

        Ok(prize)
    }

    async fn assign_level_prize(&self, level_id: i64, prize_id: i64) -> Result<LevelPrize> {
        sqlx::query_as::<_, LevelPrize>(
            r#"
            INSERT INTO level_prizes (level_id, prize_id)
            VALUES ($1, $2)
            RETURNING id, level_id, prize_id
            "#,
        )
        .bind(level_id)
        .bind(prize_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match map_write_error(e) {
            err if err.is_constraint(constraints::UNIQUE_LEVEL_PRIZE_LEVEL) => {
                RewardError::PrizeAlreadyConfigured(level_id)
            }
            err if err.is_constraint(constraints::FK_LEVEL_PRIZE_LEVEL) => {
                RewardError::LevelNotFound(level_id)
            }
            err if err.is_constraint(constraints::FK_LEVEL_PRIZE_PRIZE) => {
                RewardError::PrizeNotFound(prize_id)
            }
            err => err,
        })
    }

    async fn get_level_prize(&self, level_id: i64) -> Result<Option<LevelPrize>> {
        let level_prize = sqlx::query_as::<_, LevelPrize>(
            "SELECT id, level_id, prize_id FROM level_prizes WHERE level_id = $1",
        )
        .bind(level_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(level_prize)
    }

    async fn list_levels(&self) -> Result<Vec<Level>> {
        let levels = sqlx::query_as::<_, Level>(
            "SELECT id, title, sort_order FROM levels ORDER BY sort_order ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(levels)
    }
}
