//! 业务指标定义
//!
//! 基于 metrics crate 门面记录指标，指标名集中定义在此处，
//! 由服务层通过常量引用，避免散落的字符串。

/// 奖品发放次数，按 outcome 标签区分结果
pub const LEVEL_PRIZE_AWARDS_TOTAL: &str = "level_prize_awards_total";

/// 进度导出写出的数据行数
pub const PROGRESS_EXPORT_ROWS_TOTAL: &str = "progress_export_rows_total";

/// 加成激活次数
pub const PLAYER_BOOST_ACTIVATIONS_TOTAL: &str = "player_boost_activations_total";

/// 注册指标描述
///
/// 这些描述会出现在 recorder 导出的 HELP 注释中
pub fn describe_metrics() {
    metrics::describe_counter!(
        LEVEL_PRIZE_AWARDS_TOTAL,
        "Total number of level prize award attempts by outcome"
    );
    metrics::describe_counter!(
        PROGRESS_EXPORT_ROWS_TOTAL,
        "Total number of progress rows written by the CSV export"
    );
    metrics::describe_counter!(
        PLAYER_BOOST_ACTIVATIONS_TOTAL,
        "Total number of player boost activations"
    );
}
