use std::path::Path;

use ndarray::{Array3, ArrayView, Ix3};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::Idx3d;

/// `NiftiHeader` 是栈上大对象, 移动该对象的开销很可观.
/// 因此我们将其分配到堆上.
type BoxedHeader = Box<NiftiHeader>;

/// 将 (W, H, z) 转换成 (z, H, W). 以后均按照该模式访问.
#[inline]
fn get_shape_from_header(h: &NiftiHeader) -> Idx3d {
    // [W, H, z]. 体素个数数组.
    let [_, w, h, z, ..] = h.dim;
    (z as usize, h as usize, w as usize)
}

/// 3D nii 文件 header 的共用属性和部分通用操作.
pub trait NiftiHeaderAttr {
    /// 获取 header 部分.
    fn header(&self) -> &NiftiHeader;

    /// 获取数据形状大小, 按 `(z, h, w)` 排列.
    #[inline]
    fn shape(&self) -> Idx3d {
        get_shape_from_header(self.header())
    }
}

/// nii 格式 3D 整数标签体 (真值标注或模型预测). 标签值以 `u8` 保存.
#[derive(Debug, Clone)]
pub struct LabelVolume {
    header: BoxedHeader,
    data: Array3<u8>,
}

impl NiftiHeaderAttr for LabelVolume {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

impl LabelVolume {
    /// 打开 nii (或 nii.gz) 文件格式的 3D 标签体. `path` 为文件的本地路径.
    /// 如果打开成功, 则返回 `Ok(Self)`, 否则返回 `Err`.
    pub fn open<P: AsRef<Path>>(path: P) -> nifti::Result<Self> {
        let obj = ReaderOptions::new().read_file(path.as_ref())?;
        let header = Box::new(obj.header().clone());

        // [W, H, z] -> [z, H, W]
        // hint: 原第一维向下增长, 原第二维向右增长.
        let data = obj
            .into_volume()
            .into_ndarray::<u8>()?
            .permuted_axes([2, 1, 0].as_slice());
        let data = data.as_standard_layout().into_owned();
        let shape = get_shape_from_header(&header);
        let raw = data.into_raw_vec();
        let got = raw.len();

        // 带时间维 (t > 1) 的体无法视作 3D 标签.
        let data = Array3::<u8>::from_shape_vec(shape, raw).map_err(|_| {
            nifti::NiftiError::IncompatibleLength(got, shape.0 * shape.1 * shape.2)
        })?;

        Ok(Self { header, data })
    }

    /// 根据 `(z, h, w)` 排列的裸标签数据和体素分辨率直接创建实体.
    ///
    /// `pix_dim` 按照 \[z, h, w\] 格式给出, 单位为毫米.
    pub fn from_raw(data: Array3<u8>, pix_dim: [f32; 3]) -> Self {
        let data = if data.is_standard_layout() {
            data
        } else {
            data.as_standard_layout().into_owned()
        };
        let (z, h, w) = data.dim();

        let mut header = Box::<NiftiHeader>::default();
        header.dim = [3, w as u16, h as u16, z as u16, 1, 1, 1, 1];
        let [pz, ph, pw] = pix_dim;
        header.pixdim = [1.0, pw, ph, pz, 0.0, 0.0, 0.0, 0.0];

        Self { header, data }
    }

    /// 以 nifti 格式写出到 `path`. 扩展名为 `.gz` 时会自动压缩.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> nifti::Result<()> {
        // [z, H, W] -> [W, H, z]
        let data = self.data.view().permuted_axes([2, 1, 0]);
        WriterOptions::new(path.as_ref())
            .reference_header(&self.header)
            .write_nifti(&data)
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, u8, Ix3> {
        self.data.view()
    }
}

#[cfg(test)]
mod tests {
    use super::{LabelVolume, NiftiHeaderAttr};
    use ndarray::Array3;

    fn sample() -> LabelVolume {
        let mut data = Array3::<u8>::zeros((2, 3, 4));
        data[(0, 1, 1)] = 1;
        data[(1, 2, 3)] = 2;
        data[(1, 0, 0)] = 3;
        LabelVolume::from_raw(data, [2.5, 0.8, 0.8])
    }

    #[test]
    fn test_from_raw_header() {
        let v = sample();
        assert_eq!(v.shape(), (2, 3, 4));
        assert_eq!(v.header().dim, [3, 4, 3, 2, 1, 1, 1, 1]);
        assert_eq!(v.data()[(1, 2, 3)], 2);
        assert_eq!(v.data().iter().filter(|&&x| x != 0).count(), 3);
    }

    #[test]
    fn test_save_then_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("case_00000.nii.gz");
        let v = sample();
        v.save(&path).unwrap();

        let back = LabelVolume::open(&path).unwrap();
        assert_eq!(back.shape(), v.shape());
        assert_eq!(back.data(), v.data());
    }
}
