//! 最终结果表的装配与写出.

use std::path::Path;

use super::{ExtractError, FeatureRow};
use crate::schema::Schema;

/// 批处理的最终聚合表.
///
/// 表在装配前按目标行数整体预置零值, 随后把每个检查点的行写到
/// 其文件名序对应的行位置上. 列即冻结的 [`Schema`].
#[derive(Debug)]
pub struct ResultTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl ResultTable {
    /// 创建 `n_rows` 行、所有单元格为零的表.
    pub fn zeroed(schema: &Schema, n_rows: usize) -> Self {
        Self {
            columns: schema.columns().to_vec(),
            rows: vec![vec!["0".to_string(); schema.len()]; n_rows],
        }
    }

    /// 从按键序排好的检查点行直接装配整表.
    pub fn from_rows(schema: &Schema, rows: &[FeatureRow]) -> Self {
        let mut table = Self::zeroed(schema, rows.len());
        for (i, row) in rows.iter().enumerate() {
            table.set_row(schema, i, row);
        }
        table
    }

    /// 将一行写入行位置 `index`.
    ///
    /// 当 `index` 越界时 panic.
    #[inline]
    pub fn set_row(&mut self, schema: &Schema, index: usize, row: &FeatureRow) {
        self.rows[index] = row.cells(schema);
    }

    /// 表的行数.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// 表是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 将整表写出为 csv 文件, 首列为显式行索引.
    pub fn write(&self, path: &Path) -> Result<(), ExtractError> {
        let mut wtr = csv::Writer::from_path(path).map_err(ExtractError::Csv)?;

        let mut header = Vec::with_capacity(self.columns.len() + 1);
        header.push("");
        header.extend(self.columns.iter().map(String::as_str));
        wtr.write_record(&header).map_err(ExtractError::Csv)?;

        for (i, row) in self.rows.iter().enumerate() {
            let index = i.to_string();
            let record = std::iter::once(index.as_str()).chain(row.iter().map(String::as_str));
            wtr.write_record(record).map_err(ExtractError::Csv)?;
        }
        wtr.flush().map_err(ExtractError::Io)?;
        Ok(())
    }
}
