//! 统一可观测性模块
//!
//! 提供日志（tracing）与指标（metrics）的统一初始化。
//! 指标 recorder 由嵌入本服务的上层进程安装，这里只负责描述指标。

pub mod metrics;
pub mod tracing;

use ::tracing::info;
use anyhow::Result;

use crate::config::ObservabilityConfig;

/// 统一初始化可观测性
///
/// 初始化顺序：
/// 1. Tracing（日志）
/// 2. Metrics 描述
///
/// # Example
///
/// ```ignore
/// use reward_shared::{config::AppConfig, observability};
///
/// let config = AppConfig::load("level-reward-service")?;
/// observability::init(&config.observability)?;
/// ```
pub fn init(config: &ObservabilityConfig) -> Result<()> {
    tracing::init(config)?;
    metrics::describe_metrics();

    info!(
        service = %config.service_name,
        log_level = %config.log_level,
        log_format = %config.log_format,
        "Observability initialized"
    );

    Ok(())
}
