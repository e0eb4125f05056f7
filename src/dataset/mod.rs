//! 按路径加载体数据的接缝.
//!
//! 批处理通过 [`VolumeLoader`] 获取图像与掩膜, 默认实现
//! [`NiftiLoader`] 直接读取本地 nii 文件. 测试可注入内存中的假数据源.

use std::path::Path;

use crate::data::{ImageSeries, MaskVolume, OpenVolumeError};

/// 表明一个可以按路径解码体数据的加载器.
pub trait VolumeLoader {
    /// 加载 3D/4D 图像序列.
    fn load_image(&self, path: &Path) -> Result<ImageSeries, OpenVolumeError>;

    /// 加载 3D 标签掩膜.
    fn load_mask(&self, path: &Path) -> Result<MaskVolume, OpenVolumeError>;
}

/// 本地 nii/nii.gz 文件加载器.
#[derive(Debug, Default, Clone, Copy)]
pub struct NiftiLoader;

impl VolumeLoader for NiftiLoader {
    #[inline]
    fn load_image(&self, path: &Path) -> Result<ImageSeries, OpenVolumeError> {
        ImageSeries::open(path)
    }

    #[inline]
    fn load_mask(&self, path: &Path) -> Result<MaskVolume, OpenVolumeError> {
        MaskVolume::open(path)
    }
}
