//! 进度导出仓储
//!
//! 导出只读；每一批都是独立查询，批与批之间不持有连接或游标。
//! 玩家标识按字节序（COLLATE "C"）排序，与数据库默认排序规则无关。

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::PgPool;

use super::traits::ProgressRepositoryTrait;
use crate::error::Result;
use crate::models::{ProgressCursor, ProgressRow};

/// 进度导出仓储
pub struct ProgressRepository {
    pool: PgPool,
}

impl ProgressRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProgressRepositoryTrait for ProgressRepository {
    async fn level_prize_titles(&self) -> Result<HashMap<i64, String>> {
        let titles = sqlx::query_as::<_, (i64, String)>(
            r#"
            SELECT lp.level_id, p.title
            FROM level_prizes lp
            JOIN prizes p ON p.id = lp.prize_id
            "#,
        )
        .fetch(&self.pool)
        .try_collect()
        .await?;

        Ok(titles)
    }

    async fn awarded_pairs(&self) -> Result<HashSet<(i64, i64)>> {
        let pairs = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT plp.player_id, lp.level_id
            FROM player_level_prizes plp
            JOIN level_prizes lp ON lp.id = plp.level_prize_id
            "#,
        )
        .fetch(&self.pool)
        .try_collect()
        .await?;

        Ok(pairs)
    }

    async fn progress_chunk(
        &self,
        after: Option<ProgressCursor>,
        limit: i64,
    ) -> Result<Vec<ProgressRow>> {
        let rows = match after {
            None => {
                sqlx::query_as::<_, ProgressRow>(
                    r#"
                    SELECT pl.id AS player_level_id, pl.player_id, p.player_id AS player_identifier,
                           pl.level_id, l.title AS level_title, l.sort_order AS level_sort_order,
                           pl.is_completed
                    FROM player_levels pl
                    JOIN players p ON p.id = pl.player_id
                    JOIN levels l ON l.id = pl.level_id
                    ORDER BY p.player_id COLLATE "C", l.sort_order, pl.id
                    LIMIT $1
                    "#,
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            Some(cursor) => {
                sqlx::query_as::<_, ProgressRow>(
                    r#"
                    SELECT pl.id AS player_level_id, pl.player_id, p.player_id AS player_identifier,
                           pl.level_id, l.title AS level_title, l.sort_order AS level_sort_order,
                           pl.is_completed
                    FROM player_levels pl
                    JOIN players p ON p.id = pl.player_id
                    JOIN levels l ON l.id = pl.level_id
                    WHERE (p.player_id COLLATE "C", l.sort_order, pl.id) > ($1, $2, $3)
                    ORDER BY p.player_id COLLATE "C", l.sort_order, pl.id
                    LIMIT $4
                    "#,
                )
                .bind(cursor.player_identifier)
                .bind(cursor.level_sort_order)
                .bind(cursor.player_level_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows)
    }
}
