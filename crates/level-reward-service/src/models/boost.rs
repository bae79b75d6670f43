//! 加成相关实体定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 加成
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Boost {
    pub id: i64,
    /// 加成名称（唯一）
    pub name: String,
    /// 是否可被激活
    pub is_active: bool,
}

/// 玩家加成
///
/// 记录某个加成在玩家身上的一次激活
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PlayerBoost {
    pub id: i64,
    pub player_id: i64,
    pub boost_id: i64,
    pub activated_at: DateTime<Utc>,
    /// 失效时间（null 表示不过期）
    #[sqlx(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl PlayerBoost {
    /// 检查是否已过期
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|t| now >= t)
    }

    /// 检查在给定时间点是否生效
    pub fn is_effective(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired(now)
    }
}
