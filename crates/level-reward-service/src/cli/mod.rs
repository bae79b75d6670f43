//! CLI 模块
//!
//! 提供命令行接口，支持以下功能：
//!
//! - `migrate` - 执行数据库迁移
//! - `export` - 导出玩家进度 CSV
//! - `award` - 为玩家发放一次关卡奖品
//! - `expire-boosts` - 失效所有已过期的玩家加成
//!
//! # 使用示例
//!
//! ```bash
//! level-reward migrate
//! level-reward export -o /tmp/player_progress.csv --locale ru
//! level-reward award --player p1 --level 3
//! level-reward expire-boosts
//! ```

pub mod commands;
pub mod runner;

pub use commands::{Cli, Commands};
pub use runner::CommandRunner;
