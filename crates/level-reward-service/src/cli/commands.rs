//! CLI 命令定义
//!
//! 使用 clap derive 宏定义命令行接口结构。

use clap::{Parser, Subcommand};

/// 关卡奖励命令行工具
#[derive(Parser, Debug)]
#[command(name = "level-reward")]
#[command(version, about = "关卡奖励服务工具")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 子命令枚举
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 执行数据库迁移
    Migrate,

    /// 导出玩家进度 CSV
    ///
    /// 未指定参数时使用配置文件 [export] 段中的值
    Export {
        /// 输出文件路径
        #[arg(short, long)]
        output: Option<String>,

        /// 报表语言（en, zh, ru）
        #[arg(long)]
        locale: Option<String>,
    },

    /// 为玩家发放关卡奖品
    Award {
        /// 玩家外部标识
        #[arg(short, long)]
        player: String,

        /// 关卡 ID
        #[arg(short, long)]
        level: i64,
    },

    /// 失效所有已过期的玩家加成
    ExpireBoosts,
}
