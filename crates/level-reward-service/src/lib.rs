//! 关卡奖励服务
//!
//! 玩家通关后按关卡配置发放奖品，并提供玩家进度报表导出。
//!
//! ## 核心功能
//!
//! - **奖品发放**：校验前置条件后在单个事务内写入发放记录，同一奖品至多发放一次
//! - **进度导出**：以流的方式生成 CSV 报表，内存占用与数据量无关
//! - **玩家加成**：按名称激活加成并处理过期
//!
//! ## 模块结构
//!
//! - `models`: 领域模型定义
//! - `error`: 错误类型定义
//! - `repository`: 仓储层（PostgreSQL 与进程内实现）
//! - `service`: 业务服务层
//! - `cli`: 命令行入口

pub mod cli;
pub mod error;
pub mod models;
pub mod repository;
pub mod service;

pub use error::{Result, RewardError};
pub use models::*;
pub use repository::{
    AwardRepository, BoostRepository, CatalogRepository, GameplayRepository, MemoryStore,
    ProgressRepository,
};
pub use service::{
    AwardResult, AwardService, BoostService, ExportLocale, ExportOptions, ExportService,
    ProgressExport, dto,
};
