//! 关卡奖品发放服务
//!
//! 处理 "通关 -> 发奖" 的状态转换，保证同一 (玩家, 关卡奖品) 至多发放一次。
//!
//! ## 发放流程
//!
//! 1. 进度记录存在性 -> 2. 通关检查 -> 3. 奖品配置检查 -> 4. 重复发放检查
//!    -> 5. 写入发放记录 -> 6. 提交
//!
//! 1-5 在同一存储事务内执行，任一步失败即回滚，不产生任何写入。
//! 并发请求同时通过检查 4 时，由唯一约束 `unique_player_level_prize` 裁决，
//! 落败方得到 `AlreadyAwarded`。不做重试。

use std::sync::Arc;

use metrics::counter;
use tracing::{info, instrument, warn};

use reward_shared::observability::metrics::LEVEL_PRIZE_AWARDS_TOTAL;

use crate::error::{Result, RewardError};
use crate::models::PlayerLevelPrize;
use crate::repository::{AwardRepositoryTrait, AwardTransaction, constraints};

/// 唯一约束冲突转换为重复发放，其余错误原样返回
fn already_awarded_on_conflict(
    err: RewardError,
    player_id: i64,
    level_prize_id: i64,
) -> RewardError {
    if err.is_constraint(constraints::UNIQUE_PLAYER_LEVEL_PRIZE) {
        RewardError::AlreadyAwarded {
            player_id,
            level_prize_id,
        }
    } else {
        err
    }
}

/// 关卡奖品发放服务
pub struct AwardService<AR>
where
    AR: AwardRepositoryTrait,
{
    award_repo: Arc<AR>,
}

impl<AR> AwardService<AR>
where
    AR: AwardRepositoryTrait,
{
    pub fn new(award_repo: Arc<AR>) -> Self {
        Self { award_repo }
    }

    /// 为玩家发放关卡奖品
    ///
    /// 前置条件按顺序检查，首个不满足的条件决定返回的错误
    #[instrument(skip(self))]
    pub async fn award_level_prize(
        &self,
        player_id: i64,
        level_id: i64,
    ) -> Result<PlayerLevelPrize> {
        let mut tx = self.award_repo.begin().await?;

        let result = match Self::execute_award(tx.as_mut(), player_id, level_id).await {
            Ok(award) => {
                // 延迟约束可能在提交时才报告冲突
                let level_prize_id = award.level_prize_id;
                tx.commit()
                    .await
                    .map(|()| award)
                    .map_err(|e| already_awarded_on_conflict(e, player_id, level_prize_id))
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(award) => {
                counter!(LEVEL_PRIZE_AWARDS_TOTAL, "outcome" => "awarded").increment(1);
                info!(
                    player_id = player_id,
                    level_id = level_id,
                    award_id = award.id,
                    level_prize_id = award.level_prize_id,
                    "关卡奖品发放成功"
                );
                Ok(award)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(
                        player_id = player_id,
                        level_id = level_id,
                        error = %rollback_err,
                        "发放事务回滚失败"
                    );
                }
                counter!(LEVEL_PRIZE_AWARDS_TOTAL, "outcome" => e.error_code()).increment(1);
                warn!(
                    player_id = player_id,
                    level_id = level_id,
                    error_code = e.error_code(),
                    error = %e,
                    "关卡奖品发放被拒绝"
                );
                Err(e)
            }
        }
    }

    /// 按外部玩家标识发放关卡奖品
    #[instrument(skip(self))]
    pub async fn award_level_prize_for(
        &self,
        player_identifier: &str,
        level_id: i64,
    ) -> Result<PlayerLevelPrize> {
        let player_id = self
            .award_repo
            .find_player_id(player_identifier)
            .await?
            .ok_or_else(|| RewardError::PlayerNotFound(player_identifier.to_string()))?;

        self.award_level_prize(player_id, level_id).await
    }

    // ==================== 私有方法 ====================

    /// 事务内执行检查与写入（不提交）
    async fn execute_award(
        tx: &mut dyn AwardTransaction,
        player_id: i64,
        level_id: i64,
    ) -> Result<PlayerLevelPrize> {
        // 1. 进度记录
        let player_level = tx
            .find_player_level(player_id, level_id)
            .await?
            .ok_or(RewardError::LevelNotStarted {
                player_id,
                level_id,
            })?;

        // 2. 通关
        if !player_level.is_completed {
            return Err(RewardError::LevelNotCompleted {
                player_id,
                level_id,
            });
        }

        // 3. 奖品配置
        let level_prize = tx
            .find_level_prize(level_id)
            .await?
            .ok_or(RewardError::PrizeNotConfigured(level_id))?;

        // 4. 重复发放
        if tx.award_exists(player_id, level_prize.id).await? {
            return Err(RewardError::AlreadyAwarded {
                player_id,
                level_prize_id: level_prize.id,
            });
        }

        // 5. 写入
        tx.insert_award(player_id, level_prize.id)
            .await
            .map_err(|e| already_awarded_on_conflict(e, player_id, level_prize.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LevelPrize, PlayerLevel};
    use async_trait::async_trait;
    use chrono::Utc;
    use parking_lot::Mutex;

    /// 按脚本返回结果的发放事务，记录调用轨迹
    #[derive(Clone)]
    struct Script {
        player_level: Option<PlayerLevel>,
        level_prize: Option<LevelPrize>,
        exists: bool,
        insert_violation: Option<&'static str>,
        commit_violation: Option<&'static str>,
    }

    impl Script {
        fn completed() -> Self {
            Self {
                player_level: Some(PlayerLevel {
                    id: 1,
                    player_id: 10,
                    level_id: 20,
                    completed: None,
                    is_completed: true,
                    score: 100,
                }),
                level_prize: Some(LevelPrize {
                    id: 30,
                    level_id: 20,
                    prize_id: 40,
                }),
                exists: false,
                insert_violation: None,
                commit_violation: None,
            }
        }
    }

    struct ScriptedTransaction {
        script: Script,
        calls: Arc<Mutex<Vec<&'static str>>>,
    }

    fn violation(constraint: &str) -> RewardError {
        RewardError::ConstraintViolation {
            constraint: constraint.to_string(),
        }
    }

    #[async_trait]
    impl AwardTransaction for ScriptedTransaction {
        async fn find_player_level(&mut self, _: i64, _: i64) -> Result<Option<PlayerLevel>> {
            self.calls.lock().push("find_player_level");
            Ok(self.script.player_level.clone())
        }

        async fn find_level_prize(&mut self, _: i64) -> Result<Option<LevelPrize>> {
            self.calls.lock().push("find_level_prize");
            Ok(self.script.level_prize.clone())
        }

        async fn award_exists(&mut self, _: i64, _: i64) -> Result<bool> {
            self.calls.lock().push("award_exists");
            Ok(self.script.exists)
        }

        async fn insert_award(
            &mut self,
            player_id: i64,
            level_prize_id: i64,
        ) -> Result<PlayerLevelPrize> {
            self.calls.lock().push("insert_award");
            if let Some(constraint) = self.script.insert_violation {
                return Err(violation(constraint));
            }
            Ok(PlayerLevelPrize {
                id: 99,
                player_id,
                level_prize_id,
                received: Utc::now(),
            })
        }

        async fn commit(&mut self) -> Result<()> {
            self.calls.lock().push("commit");
            match self.script.commit_violation {
                Some(constraint) => Err(violation(constraint)),
                None => Ok(()),
            }
        }

        async fn rollback(&mut self) -> Result<()> {
            self.calls.lock().push("rollback");
            Ok(())
        }
    }

    struct ScriptedRepo {
        script: Script,
        calls: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl AwardRepositoryTrait for ScriptedRepo {
        async fn begin(&self) -> Result<Box<dyn AwardTransaction>> {
            Ok(Box::new(ScriptedTransaction {
                script: self.script.clone(),
                calls: Arc::clone(&self.calls),
            }))
        }

        async fn find_player_id(&self, player_identifier: &str) -> Result<Option<i64>> {
            Ok((player_identifier == "p1").then_some(10))
        }
    }

    type Calls = Arc<Mutex<Vec<&'static str>>>;

    fn scripted_service(script: Script) -> (AwardService<ScriptedRepo>, Calls) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let repo = ScriptedRepo {
            script,
            calls: Arc::clone(&calls),
        };
        (AwardService::new(Arc::new(repo)), calls)
    }

    #[tokio::test]
    async fn test_award_success_commits() {
        let (service, calls) = scripted_service(Script::completed());

        let award = service.award_level_prize(10, 20).await.unwrap();
        assert_eq!(award.level_prize_id, 30);
        assert_eq!(
            *calls.lock(),
            vec![
                "find_player_level",
                "find_level_prize",
                "award_exists",
                "insert_award",
                "commit"
            ]
        );
    }

    #[tokio::test]
    async fn test_precondition_order_short_circuits() {
        let script = Script {
            player_level: None,
            level_prize: None,
            ..Script::completed()
        };
        let (service, calls) = scripted_service(script);

        let err = service.award_level_prize(10, 20).await.unwrap_err();
        assert!(matches!(err, RewardError::LevelNotStarted { .. }));
        assert_eq!(*calls.lock(), vec!["find_player_level", "rollback"]);

        let mut script = Script::completed();
        if let Some(pl) = script.player_level.as_mut() {
            pl.is_completed = false;
        }
        script.level_prize = None;
        let (service, calls) = scripted_service(script);

        let err = service.award_level_prize(10, 20).await.unwrap_err();
        assert!(matches!(err, RewardError::LevelNotCompleted { .. }));
        assert!(!calls.lock().contains(&"find_level_prize"));
    }

    #[tokio::test]
    async fn test_existing_award_is_rejected_without_insert() {
        let script = Script {
            exists: true,
            ..Script::completed()
        };
        let (service, calls) = scripted_service(script);

        let err = service.award_level_prize(10, 20).await.unwrap_err();
        assert!(matches!(
            err,
            RewardError::AlreadyAwarded {
                player_id: 10,
                level_prize_id: 30
            }
        ));
        assert!(!calls.lock().contains(&"insert_award"));
        assert!(calls.lock().contains(&"rollback"));
    }

    #[tokio::test]
    async fn test_unique_violation_becomes_already_awarded() {
        let script = Script {
            insert_violation: Some(constraints::UNIQUE_PLAYER_LEVEL_PRIZE),
            ..Script::completed()
        };
        let (service, _) = scripted_service(script);
        assert!(matches!(
            service.award_level_prize(10, 20).await,
            Err(RewardError::AlreadyAwarded { .. })
        ));

        let script = Script {
            commit_violation: Some(constraints::UNIQUE_PLAYER_LEVEL_PRIZE),
            ..Script::completed()
        };
        let (service, _) = scripted_service(script);
        assert!(matches!(
            service.award_level_prize(10, 20).await,
            Err(RewardError::AlreadyAwarded { .. })
        ));
    }

    #[tokio::test]
    async fn test_other_constraint_violation_is_infrastructure_error() {
        let script = Script {
            insert_violation: Some(constraints::FK_PLAYER_LEVEL_PRIZE_PLAYER),
            ..Script::completed()
        };
        let (service, calls) = scripted_service(script);

        let err = service.award_level_prize(10, 20).await.unwrap_err();
        assert!(err.is_constraint(constraints::FK_PLAYER_LEVEL_PRIZE_PLAYER));
        assert!(!err.is_business_error());
        assert_eq!(calls.lock().last(), Some(&"rollback"));
    }

    #[tokio::test]
    async fn test_award_for_unknown_identifier() {
        let (service, calls) = scripted_service(Script::completed());

        let err = service.award_level_prize_for("ghost", 20).await.unwrap_err();
        assert!(matches!(err, RewardError::PlayerNotFound(ref id) if id == "ghost"));
        assert!(calls.lock().is_empty());

        assert!(service.award_level_prize_for("p1", 20).await.is_ok());
    }
}
