//! PostgreSQL 集成测试
//!
//! 使用真实数据库验证发放事务、唯一约束裁决与键集分页导出。
//! 每个测试使用带随机后缀的玩家标识，互不干扰，可重复运行。
//!
//! ## 运行方式
//!
//! ```bash
//! DATABASE_URL=postgres://... \
//!   cargo test -p level-reward-service --test pg_integration_test -- --ignored
//! ```

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use sqlx::PgPool;

use level_reward::error::RewardError;
use level_reward::repository::{
    AwardRepository, BoostRepository, BoostRepositoryTrait, CatalogRepository,
    CatalogRepositoryTrait, GameplayRepository, GameplayRepositoryTrait, ProgressRepository,
};
use level_reward::service::{AwardService, BoostService, ExportOptions, ExportService};
use reward_shared::database::Database;

// ==================== 辅助函数 ====================

/// 从环境变量读取数据库 URL，未设置则 panic
fn database_url() -> String {
    std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests")
}

async fn setup() -> PgPool {
    let pool = PgPool::connect(&database_url())
        .await
        .expect("数据库连接失败");
    Database::from_pool(pool.clone())
        .run_migrations()
        .await
        .expect("数据库迁移失败");
    pool
}

/// 本次运行唯一的标识后缀
fn unique_suffix() -> String {
    format!("{}", Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

// ==================== 发放 ====================

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_pg_award_flow() {
    let pool = setup().await;
    let catalog = CatalogRepository::new(pool.clone());
    let gameplay = GameplayRepository::new(pool.clone());
    let service = AwardService::new(Arc::new(AwardRepository::new(pool.clone())));

    let suffix = unique_suffix();
    let player = gameplay
        .register_player(&format!("pg-award-{}", suffix))
        .await
        .unwrap();
    let level = catalog.create_level("PG L1", 0).await.unwrap();
    let prize = catalog.create_prize("PG Gold").await.unwrap();
    catalog.assign_level_prize(level.id, prize.id).await.unwrap();

    assert!(matches!(
        service.award_level_prize(player.id, level.id).await,
        Err(RewardError::LevelNotStarted { .. })
    ));

    gameplay.start_level(player.id, level.id).await.unwrap();
    assert!(matches!(
        service.award_level_prize(player.id, level.id).await,
        Err(RewardError::LevelNotCompleted { .. })
    ));

    gameplay
        .complete_level(player.id, level.id, 42, today())
        .await
        .unwrap();
    let award = service.award_level_prize(player.id, level.id).await.unwrap();

    assert!(matches!(
        service.award_level_prize(player.id, level.id).await,
        Err(RewardError::AlreadyAwarded { .. })
    ));
    assert_eq!(gameplay.list_awards(player.id).await.unwrap(), vec![award]);
}

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_pg_concurrent_awards_grant_exactly_once() {
    let pool = setup().await;
    let catalog = CatalogRepository::new(pool.clone());
    let gameplay = GameplayRepository::new(pool.clone());

    let player = gameplay
        .register_player(&format!("pg-race-{}", unique_suffix()))
        .await
        .unwrap();
    let level = catalog.create_level("PG Race", 0).await.unwrap();
    let prize = catalog.create_prize("PG Race Prize").await.unwrap();
    catalog.assign_level_prize(level.id, prize.id).await.unwrap();
    gameplay.start_level(player.id, level.id).await.unwrap();
    gameplay
        .complete_level(player.id, level.id, 1, today())
        .await
        .unwrap();

    let service = Arc::new(AwardService::new(Arc::new(AwardRepository::new(
        pool.clone(),
    ))));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            let (player_id, level_id) = (player.id, level.id);
            tokio::spawn(async move { service.award_level_prize(player_id, level_id).await })
        })
        .collect();

    let mut granted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => granted += 1,
            Err(RewardError::AlreadyAwarded { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(granted, 1);
    assert_eq!(gameplay.list_awards(player.id).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_pg_catalog_constraints() {
    let pool = setup().await;
    let catalog = CatalogRepository::new(pool.clone());

    let level = catalog.create_level("PG Once", 0).await.unwrap();
    let prize = catalog.create_prize("PG Once Prize").await.unwrap();
    catalog.assign_level_prize(level.id, prize.id).await.unwrap();

    assert!(matches!(
        catalog.assign_level_prize(level.id, prize.id).await,
        Err(RewardError::PrizeAlreadyConfigured(_))
    ));
    assert!(matches!(
        catalog.assign_level_prize(i64::MAX, prize.id).await,
        Err(RewardError::LevelNotFound(_))
    ));
}

// ==================== 导出 ====================

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_pg_export_streams_every_row() {
    let pool = setup().await;
    let catalog = CatalogRepository::new(pool.clone());
    let gameplay = GameplayRepository::new(pool.clone());

    let suffix = unique_suffix();
    let level = catalog.create_level("PG Export", 0).await.unwrap();
    for i in 0..5 {
        let player = gameplay
            .register_player(&format!("pg-export-{}-{}", suffix, i))
            .await
            .unwrap();
        gameplay.start_level(player.id, level.id).await.unwrap();
    }

    let progress_repo = Arc::new(ProgressRepository::new(pool.clone()));
    let service = ExportService::new(progress_repo, ExportOptions::default().with_chunk_size(2));
    let bytes = service
        .export_progress()
        .await
        .unwrap()
        .collect_bytes()
        .await
        .unwrap();
    let text = String::from_utf8(bytes).unwrap();

    let ours: Vec<&str> = text
        .lines()
        .filter(|line| line.starts_with(&format!("pg-export-{}-", suffix)))
        .collect();
    assert_eq!(ours.len(), 5);
    let mut sorted = ours.clone();
    sorted.sort();
    assert_eq!(ours, sorted);
}

// ==================== 加成 ====================

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_pg_boost_expiry() {
    let pool = setup().await;
    let gameplay = GameplayRepository::new(pool.clone());
    let boost_repo = Arc::new(BoostRepository::new(pool.clone()));

    let suffix = unique_suffix();
    let player = gameplay
        .register_player(&format!("pg-boost-{}", suffix))
        .await
        .unwrap();
    boost_repo
        .create_boost(&format!("pg-boost-{}", suffix))
        .await
        .unwrap();

    let service = BoostService::new(boost_repo);
    service
        .activate_boost(player.id, &format!("pg-boost-{}", suffix), Some(Duration::seconds(1)))
        .await
        .unwrap();

    let later = Utc::now() + Duration::minutes(1);
    assert!(service.expire_boosts(later).await.unwrap() >= 1);
    assert!(service.active_boosts(player.id, Utc::now()).await.unwrap().is_empty());
}
