//! 采样提取与列模式冻结.
//!
//! 结果表的特征列只有在真正调用一次引擎之后才可知. 因此批处理分两个阶段:
//! 阶段一在第一个图像/掩膜/标签上做一次采样提取并冻结 [`Schema`],
//! 阶段二的提取循环只读取它, 任何组件都不得再修改列集合.

use std::collections::HashMap;

use ndarray::ArrayView3;

use crate::consts::{label_column, strip_canonical, META_COLUMNS};
use crate::engine::{EngineError, EngineSettings, FeatureEngine, FeatureMap};

/// 冻结的结果表列模式.
///
/// 列依次为元信息列 `id, slice, bin_width, normalize`, 然后对每个标签
/// (升序) 铺开采样发现的所有特征名, 列名形如 `lb{label}_{特征名}`.
#[derive(Debug, Clone)]
pub struct Schema {
    labels: Vec<u8>,
    feature_names: Vec<String>,
    columns: Vec<String>,
    index: HashMap<String, usize>,
}

impl Schema {
    /// 通过一次采样提取冻结列模式.
    ///
    /// 采样对象约定为批次第一个图像的第 0 帧、第一个掩膜和标签集合的
    /// 第一个标签. 采样失败是致命的: 没有列模式, 批处理无从谈起.
    ///
    /// 当 `labels` 为空时 panic, 调用方应事先校验.
    pub fn discover<E: FeatureEngine>(
        engine: &E,
        image: ArrayView3<'_, f32>,
        mask: ArrayView3<'_, u8>,
        labels: &[u8],
        settings: &EngineSettings,
    ) -> Result<Self, EngineError> {
        assert!(!labels.is_empty(), "标签集合为空, 无法采样");
        let sample = engine.execute(image, mask, labels[0], settings)?;
        Ok(Self::from_sample(labels, &sample))
    }

    /// 从已有的采样结果冻结列模式. 只保留原生特征族的名称并去掉前缀.
    pub fn from_sample(labels: &[u8], sample: &FeatureMap) -> Self {
        let feature_names: Vec<String> = sample
            .iter()
            .filter_map(|(name, _)| strip_canonical(name))
            .map(str::to_owned)
            .collect();

        let mut columns: Vec<String> = META_COLUMNS.iter().map(|s| s.to_string()).collect();
        for &lb in labels {
            columns.extend(feature_names.iter().map(|n| label_column(lb, n)));
        }

        let index = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();

        Self {
            labels: labels.to_vec(),
            feature_names,
            columns,
            index,
        }
    }

    /// 全批次统一的标签集合, 升序.
    #[inline]
    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    /// 采样发现的去前缀特征名, 按引擎返回顺序.
    #[inline]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// 全部列名, 含元信息列.
    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// 列总数. 恒等于 `4 + 标签数 * 特征数`.
    #[inline]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// 列模式是否没有任何特征列.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.feature_names.is_empty()
    }

    /// 特征列个数 (不含元信息列).
    #[inline]
    pub fn feature_len(&self) -> usize {
        self.labels.len() * self.feature_names.len()
    }

    /// 按列名查找列位置.
    #[inline]
    pub fn position(&self, column: &str) -> Option<usize> {
        self.index.get(column).copied()
    }

    /// 按 (标签, 去前缀特征名) 查找列位置.
    #[inline]
    pub fn feature_position(&self, label: u8, bare: &str) -> Option<usize> {
        self.position(&label_column(label, bare))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FeatureMap {
        vec![
            ("diagnostics_Versions_Numpy".to_string(), 0.0),
            ("original_firstorder_Mean".to_string(), 40.0),
            ("original_firstorder_Median".to_string(), 39.0),
            ("original_glcm_Contrast".to_string(), 1.5),
            ("diagnostics_Image_Hash".to_string(), 0.0),
        ]
    }

    #[test]
    fn test_schema_columns() {
        let schema = Schema::from_sample(&[1, 2], &sample());
        assert_eq!(
            schema.feature_names(),
            &["firstorder_Mean", "firstorder_Median", "glcm_Contrast"]
        );
        assert_eq!(
            schema.columns(),
            &[
                "id",
                "slice",
                "bin_width",
                "normalize",
                "lb1_firstorder_Mean",
                "lb1_firstorder_Median",
                "lb1_glcm_Contrast",
                "lb2_firstorder_Mean",
                "lb2_firstorder_Median",
                "lb2_glcm_Contrast",
            ]
        );
        // 4 + |labels| * |features|
        assert_eq!(schema.len(), 4 + 2 * 3);
        assert_eq!(schema.feature_len(), 6);
    }

    #[test]
    fn test_schema_position() {
        let schema = Schema::from_sample(&[1, 2], &sample());
        assert_eq!(schema.position("id"), Some(0));
        assert_eq!(schema.position("normalize"), Some(3));
        assert_eq!(schema.feature_position(2, "firstorder_Mean"), Some(7));
        assert_eq!(schema.feature_position(3, "firstorder_Mean"), None);
        assert_eq!(schema.position("lb1_shape_Sphericity"), None);
    }

    #[test]
    fn test_schema_no_canonical_features() {
        let sample = vec![("diagnostics_Versions_Numpy".to_string(), 0.0)];
        let schema = Schema::from_sample(&[1], &sample);
        assert!(schema.is_empty());
        assert_eq!(schema.len(), 4);
    }
}
