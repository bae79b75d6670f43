//! 玩家加成服务
//!
//! 加成按名称激活到玩家身上，可带有效时长；过期的激活记录由定时任务统一失效。

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use tracing::{info, instrument};

use reward_shared::observability::metrics::PLAYER_BOOST_ACTIVATIONS_TOTAL;

use crate::error::{Result, RewardError};
use crate::models::PlayerBoost;
use crate::repository::BoostRepositoryTrait;
use crate::service::dto::ActivateBoostRequest;

/// 玩家加成服务
pub struct BoostService<BR>
where
    BR: BoostRepositoryTrait,
{
    boost_repo: Arc<BR>,
}

impl<BR> BoostService<BR>
where
    BR: BoostRepositoryTrait,
{
    pub fn new(boost_repo: Arc<BR>) -> Self {
        Self { boost_repo }
    }

    /// 为玩家激活加成
    ///
    /// `duration` 为空表示永不过期
    #[instrument(skip(self))]
    pub async fn activate_boost(
        &self,
        player_id: i64,
        boost_name: &str,
        duration: Option<Duration>,
    ) -> Result<PlayerBoost> {
        if duration.is_some_and(|d| d <= Duration::zero()) {
            return Err(RewardError::Validation("加成有效时长必须大于0".to_string()));
        }

        let boost = self
            .boost_repo
            .find_boost_by_name(boost_name)
            .await?
            .ok_or_else(|| RewardError::BoostNotFound(boost_name.to_string()))?;

        if !boost.is_active {
            return Err(RewardError::BoostInactive(boost_name.to_string()));
        }

        let activated_at = Utc::now();
        let expires_at = duration
            .map(|d| {
                activated_at.checked_add_signed(d).ok_or_else(|| {
                    RewardError::Validation("加成到期时间超出范围".to_string())
                })
            })
            .transpose()?;

        let player_boost = self
            .boost_repo
            .create_player_boost(player_id, boost.id, activated_at, expires_at)
            .await?;

        counter!(PLAYER_BOOST_ACTIVATIONS_TOTAL).increment(1);
        info!(
            player_id = player_id,
            boost = %boost_name,
            player_boost_id = player_boost.id,
            expires_at = ?expires_at,
            "加成激活成功"
        );

        Ok(player_boost)
    }

    /// 按请求激活加成
    pub async fn activate(&self, request: &ActivateBoostRequest) -> Result<PlayerBoost> {
        self.activate_boost(request.player_id, &request.boost_name, request.duration()?)
            .await
    }

    /// 玩家在给定时间点生效的加成
    pub async fn active_boosts(
        &self,
        player_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<PlayerBoost>> {
        let boosts = self.boost_repo.list_player_boosts(player_id).await?;
        Ok(boosts
            .into_iter()
            .filter(|boost| boost.is_effective(now))
            .collect())
    }

    /// 将所有已过期的激活记录置为失效
    #[instrument(skip(self))]
    pub async fn expire_boosts(&self, now: DateTime<Utc>) -> Result<u64> {
        let expired = self.boost_repo.deactivate_expired(now).await?;
        if expired > 0 {
            info!(expired = expired, "过期加成已失效");
        }
        Ok(expired)
    }
}
