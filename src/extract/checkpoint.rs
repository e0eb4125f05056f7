//! 检查点存储.
//!
//! 每个已完成的 (图像, 切片) 对应输出目录 `tmp/` 子目录下的一个 csv 文件.
//! 文件的 **存在** 即该键的完成证明: 提取前先查存在性, 存在则直接跳过.
//! 文件一旦写出就不再修改, 唯一的删除操作是聚合成功后的整目录清理.
//! 这一 "单写者、只创建、每键一次" 的纪律使得存储无需任何锁.
//!
//! 注意存在性检查不校验内容: 进程在写文件中途被杀时会留下截断文件,
//! 重跑会把它当作已完成. 这是设计上在该检查点粒度下接受的风险.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{ExtractError, FeatureRow};
use crate::consts::CHECKPOINT_DIR;
use crate::schema::Schema;

/// 检查点文件中的一条 `(列名, 值)` 记录.
#[derive(Debug, Serialize, Deserialize)]
struct CheckpointRecord {
    column: String,
    value: String,
}

/// 拼接检查点文件名. 定宽零填充保证文件名字典序等于
/// `(图像序号, 切片序号)` 的自然序.
#[inline]
pub fn checkpoint_filename(image: usize, slice: usize) -> String {
    format!("tmp_{image:04}_{slice:03}.csv")
}

/// 一次批处理运行的检查点目录.
#[derive(Debug)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    /// 在输出目录 `output` 下新建检查点子目录.
    ///
    /// `output` 本身不存在时会被连带创建. 检查点子目录 **必须** 是新的:
    /// 已存在时返回 `Err(ExtractError::CheckpointDirExists)`,
    /// 以免不同逻辑运行的检查点被悄悄混在一起.
    pub fn create(output: &Path) -> Result<Self, ExtractError> {
        fs::create_dir_all(output).map_err(ExtractError::Io)?;
        let dir = output.join(CHECKPOINT_DIR);
        match fs::create_dir(&dir) {
            Ok(()) => Ok(Self { dir }),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(ExtractError::CheckpointDirExists(dir))
            }
            Err(e) => Err(ExtractError::Io(e)),
        }
    }

    /// 在输出目录 `output` 下打开 (或新建) 检查点子目录.
    ///
    /// 与 [`Self::create`] 不同, 已存在的目录会被原样接受,
    /// 其中的检查点在后续提取中继续作为完成证明生效. 调用方要保证
    /// 该目录确实属于同一逻辑运行.
    pub fn resume(output: &Path) -> Result<Self, ExtractError> {
        let dir = output.join(CHECKPOINT_DIR);
        fs::create_dir_all(&dir).map_err(ExtractError::Io)?;
        Ok(Self { dir })
    }

    /// 检查点目录路径.
    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[inline]
    fn path_of(&self, image: usize, slice: usize) -> PathBuf {
        self.dir.join(checkpoint_filename(image, slice))
    }

    /// 键 `(image, slice)` 的检查点是否已存在.
    #[inline]
    pub fn contains(&self, image: usize, slice: usize) -> bool {
        self.path_of(image, slice).exists()
    }

    /// 将一行结果持久化为键 `(image, slice)` 的检查点.
    pub fn write(
        &self,
        image: usize,
        slice: usize,
        schema: &Schema,
        row: &FeatureRow,
    ) -> Result<(), ExtractError> {
        let mut wtr =
            csv::Writer::from_path(self.path_of(image, slice)).map_err(ExtractError::Csv)?;
        for (column, value) in schema.columns().iter().zip(row.cells(schema)) {
            wtr.serialize(CheckpointRecord {
                column: column.clone(),
                value,
            })
            .map_err(ExtractError::Csv)?;
        }
        wtr.flush().map_err(ExtractError::Io)?;
        Ok(())
    }

    /// 读回目录下全部检查点, 按文件名字典序 (即键序) 返回.
    pub fn read_rows(&self, schema: &Schema) -> Result<Vec<FeatureRow>, ExtractError> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.dir)
            .map_err(ExtractError::Io)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension().is_some_and(|e| e == "csv")
                    && p.file_name()
                        .is_some_and(|f| f.to_string_lossy().starts_with("tmp_"))
            })
            .collect();
        files.sort();

        let mut rows = Vec::with_capacity(files.len());
        for file in files {
            rows.push(Self::read_one(&file, schema)?);
        }
        Ok(rows)
    }

    fn read_one(file: &Path, schema: &Schema) -> Result<FeatureRow, ExtractError> {
        let corrupt = |detail: String| ExtractError::CorruptCheckpoint {
            file: file.to_owned(),
            detail,
        };

        let mut rdr = csv::Reader::from_path(file).map_err(ExtractError::Csv)?;
        let mut row = FeatureRow::zeroed(schema);
        for record in rdr.deserialize::<CheckpointRecord>() {
            let record = record.map_err(|e| corrupt(e.to_string()))?;
            row.set_column(schema, &record.column, &record.value)
                .map_err(corrupt)?;
        }
        Ok(row)
    }

    /// 整体删除检查点目录. 仅应在聚合成功之后调用.
    #[inline]
    pub fn remove(self) -> std::io::Result<()> {
        fs::remove_dir_all(&self.dir)
    }
}
