//! 命令执行器
//!
//! 负责执行各 CLI 子命令的具体逻辑，将命令行参数转化为服务调用。

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tokio::fs::File;
use tokio::io::BufWriter;
use tracing::info;

use reward_shared::config::AppConfig;
use reward_shared::database::Database;

use crate::repository::{AwardRepository, BoostRepository, ProgressRepository};
use crate::service::{AwardResult, AwardService, BoostService, ExportOptions, ExportService};

/// 命令执行器
pub struct CommandRunner {
    config: AppConfig,
    db: Database,
}

impl CommandRunner {
    pub fn new(config: AppConfig, db: Database) -> Self {
        Self { config, db }
    }

    /// 执行 migrate 命令
    pub async fn run_migrate(&self) -> Result<()> {
        self.db.ping().await.context("数据库不可用")?;
        self.db.run_migrations().await.context("数据库迁移失败")?;
        Ok(())
    }

    /// 执行 export 命令
    ///
    /// 流式写入文件，返回写入的字节数
    pub async fn run_export(&self, output: Option<String>, locale: Option<String>) -> Result<u64> {
        let mut export_config = self.config.export.clone();
        if let Some(output) = output {
            export_config.output_path = output;
        }
        if let Some(locale) = locale {
            export_config.locale = locale;
        }

        let options = ExportOptions::from_config(&export_config)?;
        let repo = Arc::new(ProgressRepository::new(self.db.pool().clone()));
        let service = ExportService::new(repo, options);

        let export = service.export_progress().await?;
        let file = File::create(&export_config.output_path)
            .await
            .with_context(|| format!("无法创建输出文件: {}", export_config.output_path))?;
        let mut writer = BufWriter::new(file);
        let written = export.write_to(&mut writer).await?;

        info!(
            path = %export_config.output_path,
            bytes = written,
            "进度报表已写入"
        );
        Ok(written)
    }

    /// 执行 award 命令
    ///
    /// 业务拒绝以结果形式输出；基础设施错误作为命令失败返回
    pub async fn run_award(&self, player: &str, level_id: i64) -> Result<AwardResult> {
        let repo = Arc::new(AwardRepository::new(self.db.pool().clone()));
        let service = AwardService::new(repo);

        let result = match service.award_level_prize_for(player, level_id).await {
            Ok(award) => AwardResult::success(player, level_id, &award),
            Err(e) if e.is_business_error() => AwardResult::failure(player, level_id, &e),
            Err(e) => bail!("奖品发放失败: {}", e),
        };

        println!("{}", serde_json::to_string_pretty(&result)?);
        Ok(result)
    }

    /// 执行 expire-boosts 命令
    pub async fn run_expire_boosts(&self) -> Result<u64> {
        let repo = Arc::new(BoostRepository::new(self.db.pool().clone()));
        let service = BoostService::new(repo);

        let expired = service.expire_boosts(Utc::now()).await?;
        info!(expired = expired, "过期加成处理完成");
        Ok(expired)
    }
}
