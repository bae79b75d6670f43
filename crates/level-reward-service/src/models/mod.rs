//! 关卡奖励领域模型
//!
//! 包含玩家、关卡、奖品、进度、发放记录与加成的实体定义

pub mod boost;
pub mod level;
pub mod player;
pub mod progress;

// 重新导出常用类型
pub use boost::{Boost, PlayerBoost};
pub use level::{Level, LevelPrize, Prize};
pub use player::{Player, PlayerLevel, PlayerLevelPrize};
pub use progress::{ProgressCursor, ProgressRow};
