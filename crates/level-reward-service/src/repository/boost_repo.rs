//! 加成仓储

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::traits::BoostRepositoryTrait;
use super::{constraints, map_write_error};
use crate::error::{Result, RewardError};
use crate::models::{Boost, PlayerBoost};

/// 加成仓储
pub struct BoostRepository {
    pool: PgPool,
}

impl BoostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BoostRepositoryTrait for BoostRepository {
    async fn create_boost(&self, name: &str) -> Result<Boost> {
        sqlx::query_as::<_, Boost>(
            r#"
            INSERT INTO boosts (name, is_active)
            VALUES ($1, TRUE)
            RETURNING id, name, is_active
            "#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match map_write_error(e) {
            err if err.is_constraint(constraints::UNIQUE_BOOST_NAME) => {
                RewardError::Validation(format!("加成名称已存在: {}", name))
            }
            err => err,
        })
    }

    async fn find_boost_by_name(&self, name: &str) -> Result<Option<Boost>> {
        let boost = sqlx::query_as::<_, Boost>(
            "SELECT id, name, is_active FROM boosts WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(boost)
    }

    async fn set_boost_active(&self, boost_id: i64, is_active: bool) -> Result<()> {
        let result = sqlx::query("UPDATE boosts SET is_active = $2 WHERE id = $1")
            .bind(boost_id)
            .bind(is_active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RewardError::BoostNotFound(boost_id.to_string()));
        }
        Ok(())
    }

    async fn create_player_boost(
        &self,
        player_id: i64,
        boost_id: i64,
        activated_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<PlayerBoost> {
        sqlx::query_as::<_, PlayerBoost>(
            r#"
            INSERT INTO player_boosts (player_id, boost_id, activated_at, expires_at, is_active)
            VALUES ($1, $2, $3, $4, TRUE)
            RETURNING id, player_id, boost_id, activated_at, expires_at, is_active
            "#,
        )
        .bind(player_id)
        .bind(boost_id)
        .bind(activated_at)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match map_write_error(e) {
            err if err.is_constraint(constraints::FK_PLAYER_BOOST_PLAYER) => {
                RewardError::PlayerNotFound(player_id.to_string())
            }
            err if err.is_constraint(constraints::FK_PLAYER_BOOST_BOOST) => {
                RewardError::BoostNotFound(boost_id.to_string())
            }
            err => err,
        })
    }

    async fn list_player_boosts(&self, player_id: i64) -> Result<Vec<PlayerBoost>> {
        let boosts = sqlx::query_as::<_, PlayerBoost>(
            r#"
            SELECT id, player_id, boost_id, activated_at, expires_at, is_active
            FROM player_boosts
            WHERE player_id = $1
            ORDER BY activated_at DESC, id DESC
            "#,
        )
        .bind(player_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(boosts)
    }

    async fn deactivate_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE player_boosts
            SET is_active = FALSE
            WHERE is_active AND expires_at IS NOT NULL AND expires_at <= $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
