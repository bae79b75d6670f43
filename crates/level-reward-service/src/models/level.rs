//! 关卡与奖品配置实体定义

use serde::{Deserialize, Serialize};

/// 关卡
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Level {
    pub id: i64,
    /// 关卡名称
    pub title: String,
    /// 关卡顺序，仅用于报表排序，不作为闯关门槛
    pub sort_order: i32,
}

/// 奖品
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Prize {
    pub id: i64,
    pub title: String,
}

/// 关卡奖品映射
///
/// 每个关卡至多一条；不存在表示该关卡未配置奖品
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LevelPrize {
    pub id: i64,
    pub level_id: i64,
    pub prize_id: i64,
}
