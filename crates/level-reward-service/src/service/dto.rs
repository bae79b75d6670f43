//! 服务层数据传输对象
//!
//! 定义服务层与外部交互使用的 DTO，与内部领域模型解耦

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RewardError};
use crate::models::PlayerLevelPrize;

/// 单次发放结果
///
/// 命令行与上层服务用于展示发放结果，失败时携带错误码
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardResult {
    pub player_id: String,
    pub level_id: i64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub award_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl AwardResult {
    pub fn success(player_id: impl Into<String>, level_id: i64, award: &PlayerLevelPrize) -> Self {
        Self {
            player_id: player_id.into(),
            level_id,
            success: true,
            award_id: Some(award.id),
            received: Some(award.received),
            error_code: None,
            error_message: None,
        }
    }

    pub fn failure(player_id: impl Into<String>, level_id: i64, error: &RewardError) -> Self {
        Self {
            player_id: player_id.into(),
            level_id,
            success: false,
            award_id: None,
            received: None,
            error_code: Some(error.error_code().to_string()),
            error_message: Some(error.to_string()),
        }
    }
}

/// 玩家加成激活请求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateBoostRequest {
    pub player_id: i64,
    pub boost_name: String,
    /// 有效时长（秒），为空表示不过期
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i64>,
}

impl ActivateBoostRequest {
    pub fn new(player_id: i64, boost_name: impl Into<String>) -> Self {
        Self {
            player_id,
            boost_name: boost_name.into(),
            duration_seconds: None,
        }
    }

    pub fn with_duration(mut self, duration: chrono::Duration) -> Self {
        self.duration_seconds = Some(duration.num_seconds());
        self
    }

    /// 有效时长，秒数超出 `TimeDelta` 表示范围时返回校验错误
    pub fn duration(&self) -> Result<Option<chrono::Duration>> {
        self.duration_seconds
            .map(|secs| {
                chrono::Duration::try_seconds(secs).ok_or_else(|| {
                    RewardError::Validation(format!("加成有效时长超出范围: {}秒", secs))
                })
            })
            .transpose()
    }
}
