use std::ops::Index;
use std::path::Path;

use ndarray::{Array3, ArrayView3};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::error::{InputError, OutputError};
use crate::Idx3d;

pub mod geometry;
pub mod morph_3d;

pub use geometry::{Affine, Geometry};
use morph_3d::Mask3d;

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

/// 由 nifti quaternion 参数计算仿射变换.
fn quatern_affine(h: &NiftiHeader) -> Affine {
    let (b, c, d) = (
        h.quatern_b as f64,
        h.quatern_c as f64,
        h.quatern_d as f64,
    );
    let a = (1.0 - (b * b + c * c + d * d)).max(0.0).sqrt();
    let qfac = if h.pixdim[0] < 0.0 { -1.0 } else { 1.0 };
    let [_, px, py, pz, ..] = h.pixdim.map(|v| v as f64);
    let (sx, sy, sz) = (px, py, pz * qfac);
    [
        [
            (a * a + b * b - c * c - d * d) * sx,
            2.0 * (b * c - a * d) * sy,
            2.0 * (b * d + a * c) * sz,
            h.quatern_x as f64,
        ],
        [
            2.0 * (b * c + a * d) * sx,
            (a * a + c * c - b * b - d * d) * sy,
            2.0 * (c * d - a * b) * sz,
            h.quatern_y as f64,
        ],
        [
            2.0 * (b * d - a * c) * sx,
            2.0 * (c * d + a * b) * sy,
            (a * a + d * d - b * b - c * c) * sz,
            h.quatern_z as f64,
        ],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

/// 3D nii 文件 header 的共用属性和部分通用操作.
pub trait NiftiHeaderAttr {
    /// 获取 header 部分.
    fn header(&self) -> &NiftiHeader;

    /// 获取数据形状大小.
    #[inline]
    fn shape(&self) -> Idx3d {
        get_shape_from_header(self.header())
    }

    /// 获取数据体素个数.
    #[inline]
    fn size(&self) -> usize {
        let (z, h, w) = self.shape();
        z * h * w
    }

    /// 检查索引是否合法.
    #[inline]
    fn check(&self, (z0, h0, w0): &Idx3d) -> bool {
        let (z, h, w) = self.shape();
        *z0 < z && *h0 < h && *w0 < w
    }

    /// 获取体素到物理空间的仿射变换.
    ///
    /// 优先使用 sform, 其次 qform; 两者均缺失时退化为 `pixdim` 对角矩阵.
    fn affine(&self) -> Affine {
        let h = self.header();
        if h.sform_code > 0 {
            let row = |r: [f32; 4]| r.map(|v| v as f64);
            [row(h.srow_x), row(h.srow_y), row(h.srow_z), [0.0, 0.0, 0.0, 1.0]]
        } else if h.qform_code > 0 {
            quatern_affine(h)
        } else {
            let [_, w, h, z, ..] = h.pixdim.map(|v| (v as f64).abs());
            geometry::diagonal_affine([w, h, z])
        }
    }

    /// 获取网格几何信息. 分辨率由仿射变换导出, 顺序为 `(z, h, w)`.
    #[inline]
    fn geometry(&self) -> Result<Geometry, InputError> {
        Geometry::new(self.shape(), self.affine())
    }

    /// 获取体素的实际体积值, 以立方毫米为单位. 几何非法时返回 `None`.
    #[inline]
    fn voxel(&self) -> Option<f64> {
        self.geometry().ok().map(|g| g.voxel_volume())
    }
}

/// nii 格式 3D 分割结果, 包括 header 和标签数据. 标签值以 `i32` 保存.
#[derive(Debug, Clone)]
pub struct SegVolume {
    header: BoxedHeader,
    data: Array3<i32>,
}

impl NiftiHeaderAttr for SegVolume {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

impl Index<Idx3d> for SegVolume {
    type Output = i32;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl SegVolume {
    /// 打开 nii 文件格式的 3D 分割结果. `path` 为 nii 文件的本地路径.
    ///
    /// 允许末尾存在长度为 1 的多余维度; 其余非三维数据返回 `Err(InputError::NotVolume)`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, InputError> {
        let path = path.as_ref();
        let nifti_err = |source| InputError::Nifti {
            path: path.to_owned(),
            source,
        };
        let obj = ReaderOptions::new().read_file(path).map_err(nifti_err)?;
        let header = Box::new(obj.header().clone());
        let data = obj
            .into_volume()
            .into_ndarray::<i32>()
            .map_err(nifti_err)?;

        let dims = data.shape().to_vec();
        if dims.len() < 3 || dims[3..].iter().any(|&d| d != 1) {
            return Err(InputError::NotVolume(dims));
        }

        // [W, H, z] -> [z, H, W].
        // hint: 转置后的逻辑顺序即为 (.., z, H, W) 的行优先顺序.
        let raw: Vec<i32> = data.t().iter().copied().collect();
        let data = Array3::from_shape_vec((dims[2], dims[1], dims[0]), raw)
            .map_err(|_| InputError::NotVolume(dims.clone()))?;

        Ok(Self { header, data })
    }

    /// 根据裸标签数据和仿射变换直接创建 `SegVolume` 实体.
    ///
    /// # 参数
    ///
    /// 1. `data` 按照 `(z, h, w)` 格式存储 (与 [`Self::data`] 一致).
    /// 2. `affine` 按照 nifti 惯例, 其列对应 `(w, h, z)`. 写入 sform.
    ///
    /// # 注意
    ///
    /// 该方法创建的 header 仅包含几何信息, 你应仅将其用于实验或测试目的.
    /// 任一轴长度超过 `u16::MAX` 时程序 panic.
    pub fn fake(data: Array3<i32>, affine: Affine) -> Self {
        let (z, h, w) = data.dim();
        let axis = |n: usize| match u16::try_from(n) {
            Ok(n) => n,
            Err(_) => panic!("axis length {n} does not fit in a nifti header"),
        };
        let mut header = Box::<NiftiHeader>::default();
        header.dim = [3, axis(w), axis(h), axis(z), 1, 1, 1, 1];

        let column_norm = |c: usize| (0..3).map(|r| affine[r][c].powi(2)).sum::<f64>().sqrt();
        let [_, pw, ph, pz, ..] = &mut header.pixdim;
        (*pw, *ph, *pz) = (
            column_norm(0) as f32,
            column_norm(1) as f32,
            column_norm(2) as f32,
        );

        let row = |r: usize| affine[r].map(|v| v as f32);
        header.sform_code = 1;
        (header.srow_x, header.srow_y, header.srow_z) = (row(0), row(1), row(2));
        header.intent_name[..4].copy_from_slice(b"fake");

        let data = data.as_standard_layout().into_owned();
        Self { header, data }
    }

    /// 判断该结构是否是由 [`Self::fake`] 手动拼接的.
    pub fn is_faked(&self) -> bool {
        self.header.intent_name.starts_with(b"fake")
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, i32> {
        self.data.view()
    }

    /// 获取 3D 分割中值为 `label` 的体素个数.
    #[inline]
    pub fn count(&self, label: i32) -> usize {
        self.data.iter().filter(|p| **p == label).count()
    }

    /// 二值化: 值为 `label` 的体素为前景.
    #[inline]
    pub fn lesion_mask(&self, label: i32) -> Mask3d {
        self.data.map(|p| *p == label)
    }

    /// 以自身 header 为参考, 将 `(z, h, w)` 格式的标签数组写为 nii 文件.
    ///
    /// 文件名以 `.gz` 结尾时自动压缩.
    pub fn save_labels<P: AsRef<Path>>(
        &self,
        path: P,
        labels: ArrayView3<'_, u32>,
    ) -> Result<(), OutputError> {
        let path = path.as_ref();
        if labels.dim() != self.data.dim() {
            return Err(OutputError::ShapeMismatch {
                labels: labels.dim(),
                reference: self.data.dim(),
            });
        }

        // 标签值不应被缩放.
        let mut header = (*self.header).clone();
        header.scl_slope = 1.0;
        header.scl_inter = 0.0;

        // [z, H, W] -> [W, H, z]
        let labels = labels.permuted_axes([2, 1, 0]);
        WriterOptions::new(path)
            .reference_header(&header)
            .write_nifti(&labels)
            .map_err(|source| OutputError::Nifti {
                path: path.to_owned(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::label::SAMSEG_LESION;

    fn phantom_seg() -> Array3<i32> {
        Array3::from_shape_fn((3, 4, 5), |(z, h, w)| match (z, h, w) {
            (1, 1..=2, 1..=3) => SAMSEG_LESION,
            (0, _, _) => 2,
            _ => 0,
        })
    }

    #[test]
    fn test_fake_geometry() {
        let seg = SegVolume::fake(phantom_seg(), geometry::diagonal_affine([0.5, 1.0, 3.0]));
        assert!(seg.is_faked());
        assert_eq!(seg.shape(), (3, 4, 5));
        assert_eq!(seg.size(), 60);
        assert!(seg.check(&(2, 3, 4)));
        assert!(!seg.check(&(3, 0, 0)));

        let g = seg.geometry().unwrap();
        assert_eq!(g.resolution(), [3.0, 1.0, 0.5]);
        assert_eq!(seg.voxel(), Some(1.5));
    }

    #[test]
    #[should_panic(expected = "does not fit")]
    fn test_fake_axis_overflow() {
        let seg = Array3::zeros((1, 1, u16::MAX as usize + 1));
        SegVolume::fake(seg, geometry::diagonal_affine([1.0; 3]));
    }

    #[test]
    fn test_lesion_mask() {
        let seg = SegVolume::fake(phantom_seg(), geometry::diagonal_affine([1.0; 3]));
        let mask = seg.lesion_mask(SAMSEG_LESION);
        assert_eq!(mask.iter().filter(|b| **b).count(), 6);
        assert_eq!(seg.count(SAMSEG_LESION), 6);
        assert!(mask[(1, 2, 3)]);
        assert!(!mask[(0, 2, 3)]);
        assert_eq!(seg[(0, 0, 0)], 2);
    }

    #[test]
    fn test_qform_affine() {
        let mut header = Box::<NiftiHeader>::default();
        header.dim = [3, 2, 2, 2, 1, 1, 1, 1];
        header.pixdim = [1.0, 0.5, 0.75, 2.0, 0.0, 0.0, 0.0, 0.0];
        header.qform_code = 1;
        header.sform_code = 0;
        (header.quatern_b, header.quatern_c, header.quatern_d) = (0.0, 0.0, 0.0);
        (header.quatern_x, header.quatern_y, header.quatern_z) = (1.0, 2.0, 3.0);
        let seg = SegVolume {
            header,
            data: Array3::zeros((2, 2, 2)),
        };

        let affine = seg.affine();
        assert_eq!(affine[0], [0.5, 0.0, 0.0, 1.0]);
        assert_eq!(affine[1], [0.0, 0.75, 0.0, 2.0]);
        assert_eq!(affine[2], [0.0, 0.0, 2.0, 3.0]);
        assert_eq!(seg.geometry().unwrap().resolution(), [2.0, 0.75, 0.5]);
    }

    #[test]
    fn test_save_and_reopen_labels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.nii.gz");

        let seg = SegVolume::fake(phantom_seg(), geometry::diagonal_affine([1.0, 1.0, 2.0]));
        let labels = Array3::from_shape_fn((3, 4, 5), |(z, h, w)| (z * 100 + h * 10 + w) as u32);
        seg.save_labels(&path, labels.view()).unwrap();

        let back = SegVolume::open(&path).unwrap();
        assert_eq!(back.shape(), (3, 4, 5));
        assert_eq!(back.data().mapv(|v| v as u32), labels);
        assert_eq!(back.geometry().unwrap(), seg.geometry().unwrap());
    }

    #[test]
    fn test_save_shape_mismatch() {
        let seg = SegVolume::fake(phantom_seg(), geometry::diagonal_affine([1.0; 3]));
        let labels = Array3::<u32>::zeros((1, 1, 1));
        assert!(matches!(
            seg.save_labels("unused.nii", labels.view()),
            Err(OutputError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_open_missing_file() {
        assert!(matches!(
            SegVolume::open("/nonexistent/seg.nii.gz"),
            Err(InputError::Nifti { .. })
        ));
    }
}
