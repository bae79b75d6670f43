//! 玩家进度导出服务
//!
//! 生成 "玩家 / 关卡 / 是否通关 / 获得奖品" 报表，内存占用与数据总量无关：
//!
//! 1. 产出任何字节之前，一次性加载两张查找表
//!    （关卡 -> 奖品名称、已发放的 (玩家, 关卡) 集合）；
//! 2. 按 (玩家标识, 关卡顺序, 进度 ID) 键集分页读取进度，每批独立查询；
//! 3. 每一行编码为一个流元素。
//!
//! 查找表与各批进度分别是各自时刻的快照，导出期间发生的发放可能只体现在部分行中。
//! 某一批读取失败时流产出一个错误后结束，已产出的字节不会撤回。

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use metrics::counter;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{info, instrument, warn};

use reward_shared::config::ExportConfig;
use reward_shared::observability::metrics::PROGRESS_EXPORT_ROWS_TOTAL;

use super::export_format::{CsvRowWriter, ExportLocale};
use crate::error::{Result, RewardError};
use crate::models::{ProgressCursor, ProgressRow};
use crate::repository::ProgressRepositoryTrait;

/// 报表 MIME 类型
pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// 默认下载文件名
pub const DEFAULT_EXPORT_FILENAME: &str = "player_progress.csv";

/// 默认每批读取行数
pub const DEFAULT_CHUNK_SIZE: usize = 2000;

/// 导出选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub chunk_size: usize,
    pub locale: ExportLocale,
    pub include_bom: bool,
    pub filename: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            locale: ExportLocale::default(),
            include_bom: true,
            filename: DEFAULT_EXPORT_FILENAME.to_string(),
        }
    }
}

impl ExportOptions {
    /// 从配置构造，非法的批大小或语言返回校验错误
    pub fn from_config(config: &ExportConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(RewardError::Validation("导出批大小必须大于0".to_string()));
        }

        let filename = Path::new(&config.output_path)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(DEFAULT_EXPORT_FILENAME)
            .to_string();

        Ok(Self {
            chunk_size: config.chunk_size,
            locale: config.locale.parse()?,
            include_bom: config.include_bom,
            filename,
        })
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_locale(mut self, locale: ExportLocale) -> Self {
        self.locale = locale;
        self
    }

    pub fn with_bom(mut self, include_bom: bool) -> Self {
        self.include_bom = include_bom;
        self
    }
}

/// 一次导出的结果
///
/// `body` 不借用服务本身，可以交给任意 HTTP 框架或写入文件
pub struct ProgressExport {
    pub content_type: &'static str,
    pub filename: String,
    pub body: BoxStream<'static, Result<Vec<u8>>>,
}

impl ProgressExport {
    /// Content-Disposition 响应头
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }

    /// 收集全部字节（测试与小数据量场景）
    pub async fn collect_bytes(self) -> Result<Vec<u8>> {
        self.body.try_concat().await
    }

    /// 写入异步输出，返回写入的字节数
    pub async fn write_to<W>(self, writer: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let mut body = self.body;
        let mut written = 0u64;

        while let Some(chunk) = body.try_next().await? {
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        writer.flush().await?;

        Ok(written)
    }
}

/// 玩家进度导出服务
pub struct ExportService<R>
where
    R: ProgressRepositoryTrait + 'static,
{
    progress_repo: Arc<R>,
    options: ExportOptions,
}

impl<R> ExportService<R>
where
    R: ProgressRepositoryTrait + 'static,
{
    pub fn new(progress_repo: Arc<R>, options: ExportOptions) -> Self {
        Self {
            progress_repo,
            options,
        }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// 导出全部玩家进度
    ///
    /// 查找表加载失败时直接返回错误，此时尚未产生任何输出
    #[instrument(skip(self), fields(chunk_size = self.options.chunk_size, locale = ?self.options.locale))]
    pub async fn export_progress(&self) -> Result<ProgressExport> {
        if self.options.chunk_size == 0 {
            return Err(RewardError::Validation("导出批大小必须大于0".to_string()));
        }

        let prize_titles = self.progress_repo.level_prize_titles().await?;
        let awarded = self.progress_repo.awarded_pairs().await?;

        info!(
            prize_levels = prize_titles.len(),
            awarded_pairs = awarded.len(),
            "进度导出开始"
        );

        let state = ExportState {
            progress_repo: Arc::clone(&self.progress_repo),
            writer: CsvRowWriter::new(self.options.locale.labels()),
            prize_titles,
            awarded,
            chunk_size: self.options.chunk_size,
            include_bom: self.options.include_bom,
            header_written: false,
            pending: VecDeque::new(),
            cursor: None,
            exhausted: false,
            rows_written: 0,
        };

        Ok(ProgressExport {
            content_type: CSV_CONTENT_TYPE,
            filename: self.options.filename.clone(),
            body: stream::try_unfold(state, ExportState::advance).boxed(),
        })
    }
}

/// 导出流的内部状态
struct ExportState<R>
where
    R: ProgressRepositoryTrait + 'static,
{
    progress_repo: Arc<R>,
    writer: CsvRowWriter,
    /// 关卡 ID -> 奖品名称
    prize_titles: HashMap<i64, String>,
    /// 已发放的 (玩家 ID, 关卡 ID)
    awarded: HashSet<(i64, i64)>,
    chunk_size: usize,
    include_bom: bool,
    header_written: bool,
    /// 当前批中尚未编码的行
    pending: VecDeque<ProgressRow>,
    cursor: Option<ProgressCursor>,
    /// 最近一批不足 chunk_size，说明已经读完
    exhausted: bool,
    rows_written: u64,
}

impl<R> ExportState<R>
where
    R: ProgressRepositoryTrait + 'static,
{
    /// 产出下一个流元素
    async fn advance(mut self) -> Result<Option<(Vec<u8>, Self)>> {
        if !self.header_written {
            self.header_written = true;
            let header = self.writer.header(self.include_bom)?;
            return Ok(Some((header, self)));
        }

        loop {
            if let Some(row) = self.pending.pop_front() {
                let bytes = self.encode(&row)?;
                self.rows_written += 1;
                counter!(PROGRESS_EXPORT_ROWS_TOTAL).increment(1);
                return Ok(Some((bytes, self)));
            }

            if self.exhausted {
                info!(rows = self.rows_written, "进度导出完成");
                return Ok(None);
            }

            self.fetch_next_chunk().await?;
        }
    }

    fn encode(&mut self, row: &ProgressRow) -> Result<Vec<u8>> {
        let awarded = self.awarded.contains(&(row.player_id, row.level_id));
        let prize_title = self.prize_titles.get(&row.level_id).map(String::as_str);
        self.writer.row(row, awarded, prize_title)
    }

    async fn fetch_next_chunk(&mut self) -> Result<()> {
        let limit = i64::try_from(self.chunk_size).unwrap_or(i64::MAX);

        let chunk = self
            .progress_repo
            .progress_chunk(self.cursor.clone(), limit)
            .await
            .inspect_err(|e| {
                warn!(
                    rows_written = self.rows_written,
                    error = %e,
                    "进度导出读取失败，导出中止"
                );
            })?;

        if chunk.len() < self.chunk_size {
            self.exhausted = true;
        }
        if let Some(last) = chunk.last() {
            self.cursor = Some(last.cursor());
        }
        self.pending.extend(chunk);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockProgressRepositoryTrait;

    fn row(id: i64, identifier: &str, level_id: i64, is_completed: bool) -> ProgressRow {
        ProgressRow {
            player_level_id: id,
            player_id: 1,
            player_identifier: identifier.to_string(),
            level_id,
            level_title: format!("L{}", level_id),
            level_sort_order: level_id as i32,
            is_completed,
        }
    }

    fn mock_lookups(mock: &mut MockProgressRepositoryTrait) {
        mock.expect_level_prize_titles()
            .times(1)
            .returning(|| Ok(HashMap::from([(1, "Gold".to_string())])));
        mock.expect_awarded_pairs()
            .times(1)
            .returning(|| Ok(HashSet::from([(1, 1)])));
    }

    #[test]
    fn test_options_from_config() {
        let options = ExportOptions::from_config(&ExportConfig::default()).unwrap();
        assert_eq!(options, ExportOptions::default());

        let config = ExportConfig {
            chunk_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            ExportOptions::from_config(&config),
            Err(RewardError::Validation(_))
        ));

        let config = ExportConfig {
            locale: "xx".to_string(),
            ..Default::default()
        };
        assert!(ExportOptions::from_config(&config).is_err());

        let config = ExportConfig {
            locale: "ru".to_string(),
            output_path: "/tmp/reports/progress-2025.csv".to_string(),
            include_bom: false,
            ..Default::default()
        };
        let options = ExportOptions::from_config(&config).unwrap();
        assert_eq!(options.locale, ExportLocale::Ru);
        assert_eq!(options.filename, "progress-2025.csv");
        assert!(!options.include_bom);
    }

    #[tokio::test]
    async fn test_lookup_failure_returns_error_before_stream() {
        let mut mock = MockProgressRepositoryTrait::new();
        mock.expect_level_prize_titles()
            .returning(|| Err(RewardError::Internal("db down".to_string())));
        mock.expect_progress_chunk().never();

        let service = ExportService::new(Arc::new(mock), ExportOptions::default());
        assert!(service.export_progress().await.is_err());
    }

    #[tokio::test]
    async fn test_failing_chunk_terminates_stream() {
        let mut mock = MockProgressRepositoryTrait::new();
        mock_lookups(&mut mock);
        mock.expect_progress_chunk()
            .withf(|after, limit| after.is_none() && *limit == 2)
            .times(1)
            .returning(|_, _| Ok(vec![row(1, "p1", 1, true), row(2, "p1", 2, false)]));
        mock.expect_progress_chunk()
            .withf(|after, _| after.as_ref().is_some_and(|c| c.player_level_id == 2))
            .times(1)
            .returning(|_, _| Err(RewardError::Internal("connection reset".to_string())));

        let options = ExportOptions::default().with_chunk_size(2).with_bom(false);
        let service = ExportService::new(Arc::new(mock), options);
        let export = service.export_progress().await.unwrap();

        let items: Vec<Result<Vec<u8>>> = export.body.collect().await;
        assert_eq!(items.len(), 4);
        assert_eq!(items[0].as_ref().unwrap(), b"Player ID,Level,Completed,Prize\n");
        assert_eq!(items[1].as_ref().unwrap(), b"p1,L1,Yes,Gold\n");
        assert_eq!(items[2].as_ref().unwrap(), b"p1,L2,No,\n");
        assert!(items[3].is_err());
    }

    #[tokio::test]
    async fn test_exact_chunk_boundary_issues_one_more_query() {
        let mut mock = MockProgressRepositoryTrait::new();
        mock_lookups(&mut mock);
        mock.expect_progress_chunk()
            .withf(|after, _| after.is_none())
            .times(1)
            .returning(|_, _| Ok(vec![row(1, "p1", 1, true)]));
        mock.expect_progress_chunk()
            .withf(|after, _| after.is_some())
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let options = ExportOptions::default().with_chunk_size(1);
        let service = ExportService::new(Arc::new(mock), options);
        let export = service.export_progress().await.unwrap();
        assert_eq!(export.content_type, CSV_CONTENT_TYPE);
        assert_eq!(
            export.content_disposition(),
            "attachment; filename=\"player_progress.csv\""
        );

        let bytes = export.collect_bytes().await.unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            "\u{feff}Player ID,Level,Completed,Prize\np1,L1,Yes,Gold\n"
        );
    }
}
