//! 外部特征引擎接缝.
//!
//! 特征的定义与计算不在本 crate 范围内. 批处理只依赖这里的
//! [`FeatureEngine`] trait, 由调用方注入具体实现.

use ndarray::ArrayView3;

/// 一次引擎调用返回的有序特征映射: `(完整特征名, 标量值)`.
///
/// 顺序有意义: 列模式冻结阶段会按该顺序生成特征列.
pub type FeatureMap = Vec<(String, f64)>;

/// 单次引擎调用的设置值.
///
/// 该结构是不可变值语义: 每次调用都把设置显式传入引擎,
/// 不存在跨调用被改写的共享引擎状态.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EngineSettings {
    /// 灰度分箱宽度. 必须为正.
    pub bin_width: f64,

    /// 是否对图像做 Z-score 标准化.
    pub normalize: bool,
}

impl Default for EngineSettings {
    #[inline]
    fn default() -> Self {
        Self {
            bin_width: crate::consts::DEFAULT_BIN_WIDTH,
            normalize: false,
        }
    }
}

/// 特征引擎调用错误.
#[derive(Debug)]
pub enum EngineError {
    /// 值域错误: 对该切片而言这个标签不可用
    /// (例如标签在掩膜中不存在, 或区域退化到无法计算).
    /// 批处理会在日志中警告并继续处理下一个标签.
    ValueDomain(String),

    /// 其他引擎故障. 批处理会将其向上传播并中止整个任务.
    Fatal(String),
}

impl EngineError {
    /// 是否为可就地恢复的值域错误.
    #[inline]
    pub fn is_value_domain(&self) -> bool {
        matches!(self, Self::ValueDomain(_))
    }
}

/// 表明一个可以对 (图像帧, 掩膜, 标签) 计算命名标量特征的引擎.
///
/// # 约定
///
/// 1. `image` 与 `mask` 形状一致, 均按 `(z, h, w)` 组织.
///   形状不一致时引擎应返回 `Err`.
/// 2. 返回的特征名中, 只有以 [`crate::consts::CANONICAL_PREFIX`]
///   开头的会进入结果表, 其余 (诊断字段等) 会被调用侧丢弃.
/// 3. 引擎对相同输入应返回相同的特征名集合, 否则列模式冻结后
///   多出的特征名会被丢弃 (并记录警告).
pub trait FeatureEngine {
    /// 对 `image` 中标签值为 `label` 的区域计算特征.
    fn execute(
        &self,
        image: ArrayView3<'_, f32>,
        mask: ArrayView3<'_, u8>,
        label: u8,
        settings: &EngineSettings,
    ) -> Result<FeatureMap, EngineError>;
}
