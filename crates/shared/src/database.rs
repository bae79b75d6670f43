//! 数据库连接管理
//!
//! 连接池按配置创建，连接上报 application_name 便于在 pg_stat_activity 中区分来源。
//! 迁移脚本位于仓库根目录 migrations/，编译期嵌入。

use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::{info, instrument};

use crate::config::DatabaseConfig;
use crate::error::Result;

/// PostgreSQL 连接池
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 按配置建立连接池，`application_name` 通常为服务名
    #[instrument(skip(config))]
    pub async fn connect(config: &DatabaseConfig, application_name: &str) -> Result<Self> {
        let options = PgConnectOptions::from_str(&config.url)?.application_name(application_name);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect_with(options)
            .await?;

        info!(
            max_connections = config.max_connections,
            "数据库连接池已建立"
        );
        Ok(Self { pool })
    }

    /// 包装已有连接池
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 执行一次简单查询确认连接可用
    pub async fn ping(&self) -> Result<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }

    /// 应用全部未执行的迁移
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<()> {
        let migrator = sqlx::migrate!("../../migrations");
        migrator.run(&self.pool).await?;
        info!(migrations = migrator.iter().count(), "数据库迁移完成");
        Ok(())
    }

    /// 等待所有连接归还后关闭
    pub async fn close(&self) {
        self.pool.close().await;
        info!("数据库连接池已关闭");
    }
}
