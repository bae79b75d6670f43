//! 进度导出格式
//!
//! 报表语言与逐行 CSV 编码。整个导出复用同一个 `csv::Writer`，
//! 每写完一行就把缓冲区中的字节取出，作为一个流元素交给调用方。

use std::io;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RewardError};
use crate::models::ProgressRow;

/// UTF-8 BOM，便于表格软件识别编码
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// 报表语言
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportLocale {
    #[default]
    En,
    Zh,
    Ru,
}

impl ExportLocale {
    pub fn labels(&self) -> ExportLabels {
        match self {
            Self::En => ExportLabels {
                header: ["Player ID", "Level", "Completed", "Prize"],
                yes: "Yes",
                no: "No",
                prize_missing: "Prize not configured",
            },
            Self::Zh => ExportLabels {
                header: ["玩家ID", "关卡名称", "是否通关", "获得奖品"],
                yes: "是",
                no: "否",
                prize_missing: "奖品未配置",
            },
            Self::Ru => ExportLabels {
                header: [
                    "ID игрока",
                    "Название уровня",
                    "Пройден ли уровень",
                    "Полученный приз",
                ],
                yes: "Да",
                no: "Нет",
                prize_missing: "Приз не настроен",
            },
        }
    }
}

impl FromStr for ExportLocale {
    type Err = RewardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Self::En),
            "zh" => Ok(Self::Zh),
            "ru" => Ok(Self::Ru),
            other => Err(RewardError::Validation(format!(
                "不支持的导出语言: {}",
                other
            ))),
        }
    }
}

/// 报表文案
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportLabels {
    pub header: [&'static str; 4],
    pub yes: &'static str,
    pub no: &'static str,
    /// 已发放但奖品配置已不存在时写入的文案
    pub prize_missing: &'static str,
}

impl ExportLabels {
    pub fn completed(&self, is_completed: bool) -> &'static str {
        if is_completed { self.yes } else { self.no }
    }

    /// 奖品列：仅在已发放时填写
    pub fn prize<'a>(&self, awarded: bool, title: Option<&'a str>) -> &'a str {
        match (awarded, title) {
            (false, _) => "",
            (true, Some(title)) => title,
            (true, None) => self.prize_missing,
        }
    }
}

/// csv::Writer 的输出端，与 `CsvRowWriter` 共享同一块缓冲区
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.0.lock())
    }
}

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// 逐行 CSV 编码器
pub struct CsvRowWriter {
    writer: csv::Writer<SharedBuffer>,
    buffer: SharedBuffer,
    labels: ExportLabels,
}

impl CsvRowWriter {
    pub fn new(labels: ExportLabels) -> Self {
        let buffer = SharedBuffer::default();
        let writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(buffer.clone());

        Self {
            writer,
            buffer,
            labels,
        }
    }

    /// 表头（可选带 BOM）
    pub fn header(&mut self, include_bom: bool) -> Result<Vec<u8>> {
        self.writer.write_record(self.labels.header)?;
        let record = self.drain()?;

        if !include_bom {
            return Ok(record);
        }
        let mut bytes = Vec::with_capacity(UTF8_BOM.len() + record.len());
        bytes.extend_from_slice(UTF8_BOM);
        bytes.extend_from_slice(&record);
        Ok(bytes)
    }

    /// 编码一行进度
    pub fn row(
        &mut self,
        row: &ProgressRow,
        awarded: bool,
        prize_title: Option<&str>,
    ) -> Result<Vec<u8>> {
        self.writer.write_record([
            row.player_identifier.as_str(),
            row.level_title.as_str(),
            self.labels.completed(row.is_completed),
            self.labels.prize(awarded, prize_title),
        ])?;
        self.drain()
    }

    fn drain(&mut self) -> Result<Vec<u8>> {
        self.writer.flush()?;
        Ok(self.buffer.take())
    }
}
