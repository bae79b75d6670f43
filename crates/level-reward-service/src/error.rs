//! 关卡奖励服务错误类型
//!
//! 定义服务层的业务错误和系统错误。
//! 业务错误是调用方可预期、可处理的结果，不应被视为故障。

use thiserror::Error;

/// 关卡奖励服务错误类型
#[derive(Debug, Error)]
pub enum RewardError {
    // === 发放前置条件 ===
    #[error("玩家尚未开始关卡: player_id={player_id}, level_id={level_id}")]
    LevelNotStarted { player_id: i64, level_id: i64 },

    #[error("玩家尚未通关: player_id={player_id}, level_id={level_id}")]
    LevelNotCompleted { player_id: i64, level_id: i64 },

    #[error("关卡未配置奖品: level_id={0}")]
    PrizeNotConfigured(i64),

    #[error("奖品已发放: player_id={player_id}, level_prize_id={level_prize_id}")]
    AlreadyAwarded { player_id: i64, level_prize_id: i64 },

    // === 配置与实体 ===
    #[error("玩家不存在: {0}")]
    PlayerNotFound(String),

    #[error("关卡不存在: {0}")]
    LevelNotFound(i64),

    #[error("奖品不存在: {0}")]
    PrizeNotFound(i64),

    #[error("关卡已配置奖品: level_id={0}")]
    PrizeAlreadyConfigured(i64),

    // === 加成 ===
    #[error("加成不存在: {0}")]
    BoostNotFound(String),

    #[error("加成已停用: {0}")]
    BoostInactive(String),

    #[error("参数校验失败: {0}")]
    Validation(String),

    // === 系统错误 ===
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("违反数据库约束: {constraint}")]
    ConstraintViolation { constraint: String },

    #[error("CSV 写入错误: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 关卡奖励服务 Result 类型别名
pub type Result<T> = std::result::Result<T, RewardError>;

impl RewardError {
    /// 检查是否为业务错误（非系统错误）
    pub fn is_business_error(&self) -> bool {
        !matches!(
            self,
            Self::Database(_)
                | Self::ConstraintViolation { .. }
                | Self::Csv(_)
                | Self::Io(_)
                | Self::Internal(_)
        )
    }

    /// 获取错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::LevelNotStarted { .. } => "LEVEL_NOT_STARTED",
            Self::LevelNotCompleted { .. } => "LEVEL_NOT_COMPLETED",
            Self::PrizeNotConfigured(_) => "PRIZE_NOT_CONFIGURED",
            Self::AlreadyAwarded { .. } => "ALREADY_AWARDED",
            Self::PlayerNotFound(_) => "PLAYER_NOT_FOUND",
            Self::LevelNotFound(_) => "LEVEL_NOT_FOUND",
            Self::PrizeNotFound(_) => "PRIZE_NOT_FOUND",
            Self::PrizeAlreadyConfigured(_) => "PRIZE_ALREADY_CONFIGURED",
            Self::BoostNotFound(_) => "BOOST_NOT_FOUND",
            Self::BoostInactive(_) => "BOOST_INACTIVE",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::ConstraintViolation { .. } => "CONSTRAINT_VIOLATION",
            Self::Csv(_) => "CSV_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 是否违反了指定名称的约束
    pub fn is_constraint(&self, name: &str) -> bool {
        matches!(self, Self::ConstraintViolation { constraint } if constraint == name)
    }
}
