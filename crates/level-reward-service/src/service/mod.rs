//! 服务层
//!
//! 实现关卡奖励业务逻辑，协调仓储层。
//!
//! ## 模块结构
//!
//! - `dto`: 数据传输对象定义
//! - `award_service`: 关卡奖品发放
//! - `export_service`: 玩家进度 CSV 导出
//! - `export_format`: 导出语言与 CSV 行写入
//! - `boost_service`: 玩家加成激活与过期

pub mod award_service;
pub mod boost_service;
pub mod dto;
pub mod export_format;
pub mod export_service;

pub use award_service::AwardService;
pub use boost_service::BoostService;
pub use dto::*;
pub use export_format::{ExportLabels, ExportLocale};
pub use export_service::{ExportOptions, ExportService, ProgressExport};
