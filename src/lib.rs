#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 对成批的 3D/4D nifti 医学图像及其对应的整数标签掩膜,
//! 逐 (图像, 时间切片, 标签) 地调用外部放射组学特征引擎,
//! 并将结果汇聚为一张统一的特征表.
//!
//! 批处理循环以 "每 (图像, 切片) 一个检查点文件" 的粒度持久化中间结果,
//! 因此长时间运行的任务被打断后可以从断点继续, 已完成的工作不会重算.
//!
//! # 注意
//!
//! 1. 特征引擎本身不在本 crate 范围内. 本 crate 只定义
//!    [`FeatureEngine`] 接缝, 由调用方提供具体实现
//!    (例如包装 pyradiomics 的进程级实现).
//! 2. 标签集合只在第一个掩膜上发现一次, 之后对整个批次统一生效.
//!    某图像缺少某标签时, 该标签对应的列保持零值, 批次不会中止.
//!    需要别的行为时可通过 [`BatchParams::labels`] 显式固定标签集合.
//! 3. 列模式 (Schema) 只在批处理开始前通过一次采样提取冻结,
//!    之后任何组件都不得修改它.
//! 4. 在非期望情况下 (越界索引等编程错误), 程序会直接 panic,
//!    而不会导致内存错误. As what Rust promises.
//!
//! # 结构
//!
//! - [`data`]: 3D/4D nifti 图像与掩膜的基础数据结构.
//! - [`dataset`]: 按路径加载体数据的 [`VolumeLoader`] 接缝.
//! - [`engine`]: 外部特征引擎接缝与其不可变设置值.
//! - [`schema`]: 采样提取与列模式冻结.
//! - [`extract`]: 检查点存储、逐切片提取与批处理编排.

/// 三维索引 / 形状, 按 `(z, h, w)` 组织.
pub type Idx3d = (usize, usize, usize);

/// 四维索引 / 形状, 按 `(t, z, h, w)` 组织.
pub type Idx4d = (usize, usize, usize, usize);

pub mod consts;

pub mod data;

pub use data::{ImageSeries, MaskVolume, NiftiHeaderAttr, OpenVolumeError};

pub mod dataset;

pub use dataset::{NiftiLoader, VolumeLoader};

pub mod engine;

pub use engine::{EngineError, EngineSettings, FeatureEngine, FeatureMap};

pub mod schema;

pub use schema::Schema;

pub mod extract;

pub use extract::{extract, BatchParams, ExtractError, FeatureRow};

pub mod prelude;
