//! 关卡奖励服务命令行入口

use clap::Parser;
use tracing::info;

use level_reward::cli::{Cli, CommandRunner, Commands};
use reward_shared::config::AppConfig;
use reward_shared::database::Database;
use reward_shared::observability;

const SERVICE_NAME: &str = "level-reward-service";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(SERVICE_NAME)?;
    let observability_config = config.observability.clone().with_service_name(SERVICE_NAME);
    observability::init(&observability_config)?;

    info!(environment = %config.environment, "Starting {}", SERVICE_NAME);

    let db = Database::connect(&config.database, SERVICE_NAME).await?;
    let runner = CommandRunner::new(config, db.clone());

    let outcome = match cli.command {
        Commands::Migrate => runner.run_migrate().await,
        Commands::Export { output, locale } => runner.run_export(output, locale).await.map(|_| ()),
        Commands::Award { player, level } => runner.run_award(&player, level).await.map(|_| ()),
        Commands::ExpireBoosts => runner.run_expire_boosts().await.map(|_| ()),
    };

    db.close().await;
    outcome
}
