//! 玩家相关实体定义
//!
//! 包含玩家、玩家关卡进度、玩家奖品发放记录

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RewardError};

/// 玩家外部标识的最大长度（与 players.player_id 列宽一致）
pub const MAX_PLAYER_IDENTIFIER_LEN: usize = 100;

/// 玩家
///
/// 每个外部标识只对应一条记录，创建后不再修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: i64,
    /// 调用方提供的外部玩家标识，不校验格式
    pub player_id: String,
    pub registered_at: DateTime<Utc>,
}

/// 校验外部玩家标识
///
/// 只拒绝空串和超出列宽的值，其余格式由调用方负责
pub fn validate_player_identifier(player_identifier: &str) -> Result<()> {
    if player_identifier.is_empty() {
        return Err(RewardError::Validation("玩家标识不能为空".to_string()));
    }
    if player_identifier.chars().count() > MAX_PLAYER_IDENTIFIER_LEN {
        return Err(RewardError::Validation(format!(
            "玩家标识长度不能超过 {} 个字符",
            MAX_PLAYER_IDENTIFIER_LEN
        )));
    }
    Ok(())
}

/// 玩家关卡进度
///
/// 每个 (玩家, 关卡) 一条，由游戏侧创建并更新通关状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLevel {
    pub id: i64,
    pub player_id: i64,
    pub level_id: i64,
    /// 通关日期，未通关时为空
    #[sqlx(default)]
    pub completed: Option<NaiveDate>,
    pub is_completed: bool,
    /// 得分（非负）
    pub score: i32,
}

/// 玩家奖品发放记录
///
/// 发放的持久凭证，创建后不可修改或删除
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLevelPrize {
    pub id: i64,
    pub player_id: i64,
    pub level_prize_id: i64,
    /// 发放时间
    pub received: DateTime<Utc>,
}
