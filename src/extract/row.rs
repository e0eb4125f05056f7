//! 结果表的单行数据.

use crate::schema::Schema;

/// 一行特征数据: 四个元信息字段加上与 [`Schema`] 特征列对齐的标量数组.
///
/// 行自身不持有列模式. 所有按列访问的方法都要求传入 **创建该行时**
/// 使用的同一个 `Schema`, 否则程序 panic 或行为未定义.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    id: String,
    slice: usize,
    bin_width: f64,
    normalize: bool,
    features: Vec<f64>,
}

impl FeatureRow {
    /// 创建所有特征列均为零的默认行.
    pub fn zeroed(schema: &Schema) -> Self {
        Self {
            id: String::new(),
            slice: 0,
            bin_width: 0.0,
            normalize: false,
            features: vec![0.0; schema.feature_len()],
        }
    }

    /// 创建填好元信息、特征列全零的行. `slice` 为 1-based 切片序号.
    pub fn new(schema: &Schema, id: String, slice: usize, bin_width: f64, normalize: bool) -> Self {
        Self {
            id,
            slice,
            bin_width,
            normalize,
            features: vec![0.0; schema.feature_len()],
        }
    }

    /// 输出表中的 `id` 值.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 1-based 切片序号.
    #[inline]
    pub fn slice(&self) -> usize {
        self.slice
    }

    /// 写入一个 (标签, 去前缀特征名) 对应的标量值.
    ///
    /// 名称不在列模式中时不做任何事并返回 `false`.
    pub fn set_feature(&mut self, schema: &Schema, label: u8, bare: &str, value: f64) -> bool {
        match schema.feature_position(label, bare) {
            Some(pos) => {
                self.features[pos - crate::consts::META_COLUMNS.len()] = value;
                true
            }
            None => false,
        }
    }

    /// 读取一个 (标签, 去前缀特征名) 对应的标量值.
    #[inline]
    pub fn feature(&self, schema: &Schema, label: u8, bare: &str) -> Option<f64> {
        schema
            .feature_position(label, bare)
            .map(|pos| self.features[pos - crate::consts::META_COLUMNS.len()])
    }

    /// 按列名写入一个字符串形式的值. 用于从检查点文件恢复行.
    ///
    /// 列名未知或值无法解析时返回 `Err(描述)`.
    pub fn set_column(&mut self, schema: &Schema, column: &str, value: &str) -> Result<(), String> {
        match column {
            "id" => self.id = value.to_owned(),
            "slice" => {
                self.slice = value
                    .parse()
                    .map_err(|_| format!("slice 值无法解析: {value:?}"))?;
            }
            "bin_width" => {
                self.bin_width = value
                    .parse()
                    .map_err(|_| format!("bin_width 值无法解析: {value:?}"))?;
            }
            "normalize" => {
                self.normalize = value
                    .parse()
                    .map_err(|_| format!("normalize 值无法解析: {value:?}"))?;
            }
            other => {
                let pos = schema
                    .position(other)
                    .ok_or_else(|| format!("未知列名: {other:?}"))?;
                self.features[pos - crate::consts::META_COLUMNS.len()] = value
                    .parse()
                    .map_err(|_| format!("列 {other:?} 的值无法解析: {value:?}"))?;
            }
        }
        Ok(())
    }

    /// 按列模式顺序渲染整行的单元格文本, 元信息列在前.
    pub fn cells(&self, schema: &Schema) -> Vec<String> {
        debug_assert_eq!(self.features.len(), schema.feature_len());
        let mut cells = Vec::with_capacity(schema.len());
        cells.push(self.id.clone());
        cells.push(self.slice.to_string());
        cells.push(self.bin_width.to_string());
        cells.push(self.normalize.to_string());
        cells.extend(self.features.iter().map(f64::to_string));
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::FeatureMap;

    fn schema() -> Schema {
        let sample: FeatureMap = vec![
            ("original_firstorder_Mean".to_string(), 1.0),
            ("original_glcm_Contrast".to_string(), 2.0),
        ];
        Schema::from_sample(&[1, 2], &sample)
    }

    #[test]
    fn test_row_defaults_zero() {
        let schema = schema();
        let row = FeatureRow::zeroed(&schema);
        assert_eq!(row.feature(&schema, 1, "firstorder_Mean"), Some(0.0));
        assert_eq!(row.feature(&schema, 2, "glcm_Contrast"), Some(0.0));
        assert_eq!(row.cells(&schema).len(), schema.len());
    }

    #[test]
    fn test_row_set_feature() {
        let schema = schema();
        let mut row = FeatureRow::new(&schema, "p0.nii".into(), 1, 25.0, false);
        assert!(row.set_feature(&schema, 2, "firstorder_Mean", 41.5));
        assert_eq!(row.feature(&schema, 2, "firstorder_Mean"), Some(41.5));
        // 相邻标签不受影响.
        assert_eq!(row.feature(&schema, 1, "firstorder_Mean"), Some(0.0));
        // 未知特征名被拒绝.
        assert!(!row.set_feature(&schema, 1, "shape_Sphericity", 0.9));
    }

    #[test]
    fn test_row_cells_order() {
        let schema = schema();
        let mut row = FeatureRow::new(&schema, "p0.nii".into(), 3, 25.0, false);
        row.set_feature(&schema, 1, "glcm_Contrast", 1.25);
        let cells = row.cells(&schema);
        assert_eq!(cells[0], "p0.nii");
        assert_eq!(cells[1], "3");
        assert_eq!(cells[2], "25");
        assert_eq!(cells[3], "false");
        // lb1_glcm_Contrast 是第 6 列.
        assert_eq!(cells[5], "1.25");
    }

    #[test]
    fn test_row_set_column_roundtrip() {
        let schema = schema();
        let mut src = FeatureRow::new(&schema, "p1.nii".into(), 2, 10.0, true);
        src.set_feature(&schema, 2, "glcm_Contrast", -0.5);

        let mut dst = FeatureRow::zeroed(&schema);
        for (col, cell) in schema.columns().iter().zip(src.cells(&schema)) {
            dst.set_column(&schema, col, &cell).unwrap();
        }
        assert_eq!(dst, src);
    }

    #[test]
    fn test_row_set_column_rejects_unknown() {
        let schema = schema();
        let mut row = FeatureRow::zeroed(&schema);
        assert!(row.set_column(&schema, "lb9_firstorder_Mean", "1.0").is_err());
        assert!(row.set_column(&schema, "slice", "abc").is_err());
    }
}
