//! 通用常量.

/// 特征引擎原生特征族的名称前缀. 只有带该前缀的特征会进入结果表,
/// 引擎的诊断/元信息字段 (如 `diagnostics_*`) 会被丢弃.
pub const CANONICAL_PREFIX: &str = "original_";

/// 结果表标签列的名称前缀. 标签 `1` 的特征 `firstorder_Mean`
/// 对应列名 `lb1_firstorder_Mean`.
pub const LABEL_PREFIX: &str = "lb";

/// 结果表固定的元信息列, 依次位于所有特征列之前.
pub const META_COLUMNS: [&str; 4] = ["id", "slice", "bin_width", "normalize"];

/// 灰度分箱宽度默认值.
pub const DEFAULT_BIN_WIDTH: f64 = 25.0;

/// 输出目录下检查点子目录的名称.
pub const CHECKPOINT_DIR: &str = "tmp";

/// 最终特征表的文件名.
pub const OUTPUT_FILENAME: &str = "radiomic_features.csv";

/// 拼接标签列名.
#[inline]
pub fn label_column(label: u8, bare: &str) -> String {
    format!("{LABEL_PREFIX}{label}_{bare}")
}

/// 判断特征名是否属于引擎原生特征族.
#[inline]
pub fn is_canonical(name: &str) -> bool {
    name.starts_with(CANONICAL_PREFIX)
}

/// 去掉特征名的原生前缀. 名称不带前缀时返回 `None`.
#[inline]
pub fn strip_canonical(name: &str) -> Option<&str> {
    name.strip_prefix(CANONICAL_PREFIX)
}
