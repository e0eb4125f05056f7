//! 检查点存储、逐切片提取与批处理编排.
//!
//! 执行模型是严格单线程顺序的: 图像与切片按序处理, 相互之间没有并行.
//! 检查点目录是一次运行生命周期内的追加型共享资源: 写者只创建新文件,
//! 从不修改旧文件, 唯一的删除是聚合成功后的整目录清理. 若将来引入并行,
//! 必须把 "存在性检查 + 创建" 做成每键原子的 (例如 `create_new` 语义),
//! 以保持每键恰好一次的不变量.

use std::path::PathBuf;
use std::time::Instant;

use log::{debug, info, warn};
use ndarray::ArrayView3;

use crate::consts::{strip_canonical, DEFAULT_BIN_WIDTH, OUTPUT_FILENAME};
use crate::data::{series_id, OpenVolumeError};
use crate::dataset::VolumeLoader;
use crate::engine::{EngineError, EngineSettings, FeatureEngine};
use crate::schema::Schema;

mod checkpoint;
mod row;
mod table;

pub use checkpoint::{checkpoint_filename, CheckpointStore};
pub use row::FeatureRow;
pub use table::ResultTable;

/// 批处理错误.
#[derive(Debug)]
pub enum ExtractError {
    /// 图像列表为空, 没有可处理的数据.
    EmptyBatch,

    /// 图像与掩膜列表长度不一致.
    LengthMismatch {
        /// 图像个数.
        images: usize,
        /// 掩膜个数.
        masks: usize,
    },

    /// 切片筛选列表非空但长度与图像列表不一致.
    SoiLengthMismatch {
        /// 图像个数.
        images: usize,
        /// 筛选项个数.
        soi: usize,
    },

    /// 分箱宽度不是正的有限数.
    InvalidBinWidth(f64),

    /// 第一个掩膜中没有任何正标签, 且调用方未显式给出标签集合.
    EmptyLabelSet,

    /// 检查点目录已存在. 输出目录必须是每次运行全新的,
    /// 除非显式以续算模式 ([`BatchParams::resume`]) 运行.
    CheckpointDirExists(PathBuf),

    /// 打开图像/掩膜文件失败.
    OpenVolume(OpenVolumeError),

    /// 冻结列模式的采样提取失败. 没有列模式, 批处理无从谈起.
    SchemaSample(EngineError),

    /// 提取循环中出现非值域的引擎故障. 已写出的检查点保留在磁盘上,
    /// 以便之后以续算模式重试.
    Engine(EngineError),

    /// 底层 I/O 错误.
    Io(std::io::Error),

    /// 底层 csv 读写错误.
    Csv(csv::Error),

    /// 检查点文件内容无法恢复成一行数据.
    CorruptCheckpoint {
        /// 出问题的检查点文件.
        file: PathBuf,
        /// 具体原因.
        detail: String,
    },
}

/// 批处理参数.
///
/// `images` 与 `masks` 按位置一一对应. 其余字段在
/// [`BatchParams::new`] 之后按需直接赋值即可.
#[derive(Debug, Clone)]
pub struct BatchParams {
    /// 图像文件路径, 按处理顺序排列.
    pub images: Vec<PathBuf>,

    /// 掩膜文件路径, 与 `images` 等长且按位置对应.
    pub masks: Vec<PathBuf>,

    /// 运行输出目录. 最终表和临时检查点子目录都放在这里.
    pub output_path: PathBuf,

    /// 每图像的切片筛选. 空列表代表所有图像取全部切片;
    /// 非空时必须与 `images` 等长, `None` 项取该图像全部切片.
    /// 对单帧 (3D) 图像筛选不生效.
    pub slices_of_interest: Vec<Option<Vec<usize>>>,

    /// 灰度分箱宽度. 必须为正, 默认 25.
    pub bin_width: f64,

    /// 是否对图像做 Z-score 标准化. 默认否.
    pub normalize: bool,

    /// 显式固定的标签集合. `None` 时从第一个掩膜自动发现.
    pub labels: Option<Vec<u8>>,

    /// 续算模式. 为 `true` 时接受已存在的检查点目录并跳过其中
    /// 已完成的键; 为 `false` (默认) 时检查点目录必须是新的.
    pub resume: bool,
}

impl BatchParams {
    /// 以默认参数创建批处理配置.
    pub fn new(images: Vec<PathBuf>, masks: Vec<PathBuf>, output_path: PathBuf) -> Self {
        Self {
            images,
            masks,
            output_path,
            slices_of_interest: Vec::new(),
            bin_width: DEFAULT_BIN_WIDTH,
            normalize: false,
            labels: None,
            resume: false,
        }
    }

    /// 本次运行的引擎设置值.
    #[inline]
    pub fn settings(&self) -> EngineSettings {
        EngineSettings {
            bin_width: self.bin_width,
            normalize: self.normalize,
        }
    }

    fn validate(&self) -> Result<(), ExtractError> {
        if self.images.is_empty() {
            return Err(ExtractError::EmptyBatch);
        }
        if self.images.len() != self.masks.len() {
            return Err(ExtractError::LengthMismatch {
                images: self.images.len(),
                masks: self.masks.len(),
            });
        }
        if !self.slices_of_interest.is_empty() && self.slices_of_interest.len() != self.images.len()
        {
            return Err(ExtractError::SoiLengthMismatch {
                images: self.images.len(),
                soi: self.slices_of_interest.len(),
            });
        }
        if !(self.bin_width.is_finite() && self.bin_width > 0.0) {
            return Err(ExtractError::InvalidBinWidth(self.bin_width));
        }
        Ok(())
    }
}

/// 对一个 (图像, 切片) 键做带检查点的特征提取.
///
/// 键已有检查点时立即返回 `Ok(false)` (幂等跳过), 这是批处理可续算的
/// 基础. 否则对标签集合中的每个标签依次调用引擎, 把原生特征合并进
/// 一行零默认的数据, 持久化为该键的检查点后返回 `Ok(true)`.
///
/// 单个标签的值域失败只记录警告, 该标签的列保持零值;
/// 其他引擎故障原样向上传播.
#[allow(clippy::too_many_arguments)]
pub fn extract_slice<E: FeatureEngine>(
    engine: &E,
    store: &CheckpointStore,
    image_index: usize,
    slice_index: usize,
    schema: &Schema,
    id: &str,
    frame: ArrayView3<'_, f32>,
    mask: ArrayView3<'_, u8>,
    settings: &EngineSettings,
) -> Result<bool, ExtractError> {
    if store.contains(image_index, slice_index) {
        debug!("检查点已存在, 跳过: ({image_index}, {slice_index})");
        return Ok(false);
    }

    let start = Instant::now();
    let mut row = FeatureRow::new(
        schema,
        id.to_owned(),
        slice_index + 1,
        settings.bin_width,
        settings.normalize,
    );

    for &label in schema.labels() {
        match engine.execute(frame, mask, label, settings) {
            Ok(features) => {
                for (name, value) in &features {
                    let Some(bare) = strip_canonical(name) else {
                        continue;
                    };
                    if !row.set_feature(schema, label, bare, *value) {
                        warn!("特征 {name} 不在冻结的列模式中, 已丢弃");
                    }
                }
            }
            Err(err) if err.is_value_domain() => {
                warn!("标签 {label} 在切片 ({image_index}, {slice_index}) 上提取失败: {err:?}");
                continue;
            }
            Err(err) => return Err(ExtractError::Engine(err)),
        }
    }

    store.write(image_index, slice_index, schema, &row)?;
    info!(
        "切片 {slice_index:03} 完成, 耗时 {:.2} s",
        start.elapsed().as_secs_f64()
    );
    Ok(true)
}

/// 对整个批次提取放射组学特征, 返回最终特征表的路径.
///
/// 流程: 参数校验 -> 建立检查点目录 -> 在第一个掩膜上发现标签集合 ->
/// 采样提取并冻结列模式 -> 逐图像逐切片提取 (带检查点) ->
/// 按文件名序聚合全部检查点 -> 写出最终表并清理检查点目录.
///
/// 提取循环中的致命错误会使函数立即返回 `Err`, 但已写出的检查点
/// 保留在磁盘上; 以 `resume = true` 重试时已完成的键不会重算.
pub fn extract<L: VolumeLoader, E: FeatureEngine>(
    loader: &L,
    engine: &E,
    params: &BatchParams,
) -> Result<PathBuf, ExtractError> {
    params.validate()?;
    let settings = params.settings();

    let store = if params.resume {
        CheckpointStore::resume(&params.output_path)?
    } else {
        CheckpointStore::create(&params.output_path)?
    };

    // 阶段一: 标签集合 + 列模式, 只做一次, 之后冻结.
    let first_mask = loader
        .load_mask(&params.masks[0])
        .map_err(ExtractError::OpenVolume)?;
    let labels = match &params.labels {
        Some(labels) => {
            let mut labels = labels.clone();
            labels.sort_unstable();
            labels.dedup();
            labels
        }
        None => first_mask.labels(),
    };
    if labels.is_empty() {
        return Err(ExtractError::EmptyLabelSet);
    }

    let first_image = loader
        .load_image(&params.images[0])
        .map_err(ExtractError::OpenVolume)?;
    let schema = Schema::discover(
        engine,
        first_image.frame_at(0),
        first_mask.data(),
        &labels,
        &settings,
    )
    .map_err(ExtractError::SchemaSample)?;
    info!(
        "列模式已冻结: {} 个标签 × {} 个特征, 共 {} 列",
        labels.len(),
        schema.feature_names().len(),
        schema.len()
    );
    drop((first_image, first_mask));

    // 阶段二: 提取循环.
    for (i, image_path) in params.images.iter().enumerate() {
        let image = loader
            .load_image(image_path)
            .map_err(ExtractError::OpenVolume)?;
        let mask = loader
            .load_mask(&params.masks[i])
            .map_err(ExtractError::OpenVolume)?;
        let id = series_id(image_path);
        info!(
            "提取图像 {} (掩膜 {}), 共 {} 帧",
            image_path.display(),
            params.masks[i].display(),
            image.len_t()
        );

        let soi = params
            .slices_of_interest
            .get(i)
            .and_then(|s| s.as_deref());
        let multi_frame = image.len_t() > 1;

        for (j, frame) in image.frame_iter().enumerate() {
            // 单帧图像不参与切片筛选, 与原始行为一致.
            if multi_frame {
                if let Some(soi) = soi {
                    if !soi.contains(&j) {
                        continue;
                    }
                }
            }
            extract_slice(
                engine,
                &store,
                i,
                j,
                &schema,
                &id,
                frame,
                mask.data(),
                &settings,
            )?;
        }
    }

    // 聚合与清理.
    let rows = store.read_rows(&schema)?;
    let table = ResultTable::from_rows(&schema, &rows);
    let output = params.output_path.join(OUTPUT_FILENAME);
    table.write(&output)?;
    store.remove().map_err(ExtractError::Io)?;
    info!("批处理完成, 共 {} 行, 结果写至 {}", rows.len(), output.display());

    Ok(output)
}
