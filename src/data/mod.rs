//! 3D/4D nifti 图像与整数标签掩膜的基础数据结构.

use std::path::Path;

use itertools::Itertools;
use ndarray::{Array3, Array4, ArrayView, ArrayView3, Axis, Ix3, Ix4};
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::{Idx3d, Idx4d};

/// `NiftiHeader` 是栈上大对象, 移动该对象的开销很可观.
/// 因此我们将其分配到堆上.
type BoxedHeader = Box<NiftiHeader>;

/// 打开体数据文件错误.
#[derive(Debug)]
pub enum OpenVolumeError {
    /// 底层 nifti 读取/解码错误.
    Nifti(nifti::NiftiError),

    /// 数据维度不受支持. 仅支持 3D 与 4D, 内含实际维数.
    UnsupportedDim(u16),
}

/// 将 \[W, H, z\] 转换成 (z, H, W). 以后均按照该模式访问.
#[inline]
fn shape3_from_header(h: &NiftiHeader) -> Idx3d {
    // [W, H, z]. 体素个数数组.
    let [_, w, h, z, ..] = h.dim;
    (z as usize, h as usize, w as usize)
}

/// 将 \[W, H, z, t\] 转换成 (t, z, H, W). 3D 文件的 t 视为 1.
#[inline]
fn shape4_from_header(h: &NiftiHeader) -> Idx4d {
    let [_, w, h, z, t, ..] = h.dim;
    (t.max(1) as usize, z as usize, h as usize, w as usize)
}

/// nifti 文件 header 的共用属性.
pub trait NiftiHeaderAttr {
    /// 获取 header 部分.
    fn header(&self) -> &NiftiHeader;

    /// 获取单个 3D 体数据的形状大小, 按 `(z, h, w)` 组织.
    #[inline]
    fn vol_shape(&self) -> Idx3d {
        shape3_from_header(self.header())
    }

    /// 获取数据水平切片形状大小, 按 `(h, w)` 组织.
    #[inline]
    fn slice_shape(&self) -> (usize, usize) {
        let (_, h, w) = self.vol_shape();
        (h, w)
    }

    /// 获取单个 3D 体数据的体素个数.
    #[inline]
    fn vol_size(&self) -> usize {
        let (z, h, w) = self.vol_shape();
        z * h * w
    }
}

/// nii 格式 3D/4D 医学图像序列. 体素值以 `f32` 保存,
/// 内部统一按 `(t, z, h, w)` 组织, 3D 文件的 `t` 维长度为 1.
#[derive(Debug, Clone)]
pub struct ImageSeries {
    header: BoxedHeader,
    ndim: u16,
    data: Array4<f32>,
}

impl NiftiHeaderAttr for ImageSeries {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

impl ImageSeries {
    /// 打开 nii 文件格式的 3D/4D 图像. `path` 为 nii 文件的本地路径.
    ///
    /// # 返回值
    ///
    /// - 文件读取/解码失败时返回 `Err(OpenVolumeError::Nifti)`;
    /// - 数据既不是 3D 也不是 4D 时返回 `Err(OpenVolumeError::UnsupportedDim)`;
    /// - 其他情况下成功, 返回 `Ok(Self)`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, OpenVolumeError> {
        let obj = ReaderOptions::new()
            .read_file(path.as_ref())
            .map_err(OpenVolumeError::Nifti)?;
        let header = Box::new(obj.header().clone());
        let ndim = header.dim[0];

        let raw = obj
            .into_volume()
            .into_ndarray::<f32>()
            .map_err(OpenVolumeError::Nifti)?;

        let data = match ndim {
            3 => {
                // [W, H, z] -> [z, H, W].
                // hint: 原第一维向下增长, 原第二维向右增长.
                let raw = raw.permuted_axes([2, 1, 0].as_slice());

                // The nature of nifti data field layout.
                debug_assert!(raw.is_standard_layout());

                // 该操作不会生成 `Err`, 可直接 unwrap.
                Array3::<f32>::from_shape_vec(shape3_from_header(&header), raw.into_raw_vec())
                    .unwrap()
                    .insert_axis(Axis(0))
            }
            4 => {
                // [W, H, z, t] -> [t, z, H, W].
                let raw = raw.permuted_axes([3, 2, 1, 0].as_slice());
                debug_assert!(raw.is_standard_layout());

                Array4::<f32>::from_shape_vec(shape4_from_header(&header), raw.into_raw_vec())
                    .unwrap()
            }
            d => return Err(OpenVolumeError::UnsupportedDim(d)),
        };

        Ok(Self { header, ndim, data })
    }

    /// 根据裸数据直接创建 `ImageSeries` 实体. `data` 按 `(t, z, h, w)` 组织.
    ///
    /// # 注意
    ///
    /// 该方法可能会创建不一致的实体, 因此你应仅将其用于实验目的.
    pub fn fake(data: Array4<f32>) -> Self {
        let (t, z, h, w) = data.dim();
        let mut header = Box::<NiftiHeader>::default();
        header.dim = [4, w as u16, h as u16, z as u16, t as u16, 1, 1, 1];
        header.intent_name[..4].copy_from_slice(b"fake");
        Self {
            header,
            ndim: 4,
            data,
        }
    }

    /// 根据裸 3D 数据直接创建单时间帧的 `ImageSeries` 实体.
    /// `data` 按 `(z, h, w)` 组织. 其余约定同 [`Self::fake`].
    pub fn fake_3d(data: Array3<f32>) -> Self {
        let (z, h, w) = data.dim();
        let mut header = Box::<NiftiHeader>::default();
        header.dim = [3, w as u16, h as u16, z as u16, 1, 1, 1, 1];
        header.intent_name[..4].copy_from_slice(b"fake");
        Self {
            header,
            ndim: 3,
            data: data.insert_axis(Axis(0)),
        }
    }

    /// 判断该结构是否是由 `fake*` 方法手动拼接的.
    #[inline]
    pub fn is_faked(&self) -> bool {
        self.header.intent_name.starts_with(b"fake")
    }

    /// 获取源文件声明的数据维数 (3 或 4).
    #[inline]
    pub fn ndim(&self) -> u16 {
        self.ndim
    }

    /// 获取时间帧个数. 3D 文件恒为 1.
    #[inline]
    pub fn len_t(&self) -> usize {
        self.data.dim().0
    }

    /// 获取第 `t` 个时间帧的 3D 视图, 按 `(z, h, w)` 组织.
    ///
    /// 当 `t` 越界时 panic.
    #[inline]
    pub fn frame_at(&self, t: usize) -> ArrayView3<'_, f32> {
        self.data.index_axis(Axis(0), t)
    }

    /// 获取能按时间序迭代所有 3D 帧的迭代器.
    #[inline]
    pub fn frame_iter(&self) -> impl ExactSizeIterator<Item = ArrayView3<'_, f32>> {
        self.data.axis_iter(Axis(0))
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, f32, Ix4> {
        self.data.view()
    }
}

/// 从图像路径推导输出表中的 `id` 值 (即文件名部分).
#[inline]
pub fn series_id<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();
    path.file_name()
        .map_or_else(|| path.display().to_string(), |f| {
            f.to_string_lossy().into_owned()
        })
}

/// nii 格式 3D 整数标签掩膜. 标签值以 `u8` 保存, `0` 为背景.
#[derive(Debug, Clone)]
pub struct MaskVolume {
    header: BoxedHeader,
    data: Array3<u8>,
}

impl NiftiHeaderAttr for MaskVolume {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

impl MaskVolume {
    /// 打开 nii 文件格式的 3D 掩膜. `path` 为 nii 文件的本地路径.
    /// 如果打开成功, 则返回 `Ok(Self)`, 否则返回 `Err`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, OpenVolumeError> {
        let obj = ReaderOptions::new()
            .read_file(path.as_ref())
            .map_err(OpenVolumeError::Nifti)?;
        let header = Box::new(obj.header().clone());
        if header.dim[0] != 3 {
            return Err(OpenVolumeError::UnsupportedDim(header.dim[0]));
        }

        // [W, H, z] -> [z, H, W]
        let data = obj
            .into_volume()
            .into_ndarray::<u8>()
            .map_err(OpenVolumeError::Nifti)?
            .permuted_axes([2, 1, 0].as_slice());

        // The nature of nifti data field layout.
        debug_assert!(data.is_standard_layout());

        // 该操作不会生成 `Err`, 可直接 unwrap.
        let data =
            Array3::<u8>::from_shape_vec(shape3_from_header(&header), data.into_raw_vec())
                .unwrap();

        Ok(Self { header, data })
    }

    /// 根据裸标签数据直接创建 `MaskVolume` 实体. `data` 按 `(z, h, w)` 组织.
    ///
    /// # 注意
    ///
    /// 该方法可能会创建不一致的实体, 因此你应仅将其用于实验目的.
    pub fn fake(data: Array3<u8>) -> Self {
        let (z, h, w) = data.dim();
        let mut header = Box::<NiftiHeader>::default();
        header.dim = [3, w as u16, h as u16, z as u16, 1, 1, 1, 1];
        header.intent_name[..4].copy_from_slice(b"fake");
        Self { header, data }
    }

    /// 判断该结构是否是由 [`Self::fake`] 方法手动拼接的.
    #[inline]
    pub fn is_faked(&self) -> bool {
        self.header.intent_name.starts_with(b"fake")
    }

    /// 发现掩膜中出现过的所有标签, 按升序返回.
    ///
    /// 非正值 (`0` 背景) 会被丢弃. 批处理以 **第一个** 掩膜上的该结果
    /// 作为全批次统一的标签集合.
    pub fn labels(&self) -> Vec<u8> {
        self.data
            .iter()
            .copied()
            .filter(|&v| v > 0)
            .unique()
            .sorted()
            .collect()
    }

    /// 获取掩膜中值为 `label` 的体素个数.
    #[inline]
    pub fn count(&self, label: u8) -> usize {
        self.data.iter().filter(|p| **p == label).count()
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, u8, Ix3> {
        self.data.view()
    }
}
