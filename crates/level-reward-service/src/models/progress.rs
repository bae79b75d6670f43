//! 进度导出读模型
//!
//! 导出按 (玩家标识, 关卡顺序, 进度记录 ID) 做键集分页

use serde::{Deserialize, Serialize};

/// 进度导出行
///
/// player_levels 关联 players、levels 后的扁平视图
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRow {
    pub player_level_id: i64,
    /// 玩家内部 ID
    pub player_id: i64,
    /// 玩家外部标识
    pub player_identifier: String,
    pub level_id: i64,
    pub level_title: String,
    pub level_sort_order: i32,
    pub is_completed: bool,
}

impl ProgressRow {
    /// 以当前行作为下一批的起点
    pub fn cursor(&self) -> ProgressCursor {
        ProgressCursor {
            player_identifier: self.player_identifier.clone(),
            level_sort_order: self.level_sort_order,
            player_level_id: self.player_level_id,
        }
    }
}

/// 键集分页游标
///
/// 下一批只返回排序键严格大于游标的行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressCursor {
    pub player_identifier: String,
    pub level_sort_order: i32,
    pub player_level_id: i64,
}

impl ProgressCursor {
    pub fn sort_key(&self) -> (&str, i32, i64) {
        (
            self.player_identifier.as_str(),
            self.level_sort_order,
            self.player_level_id,
        )
    }

    /// 判断排序键是否位于游标之后
    pub fn precedes(&self, key: (&str, i32, i64)) -> bool {
        key > self.sort_key()
    }
}
