//! 体素网格的几何信息.

use crate::error::InputError;
use crate::Idx3d;

/// 4x4 体素到物理空间的仿射变换, 按行存储. 列顺序遵循 nifti 惯例 `(i, j, k)`,
/// 即 `(w, h, z)`.
pub type Affine = [[f64; 4]; 4];

/// 判定两个仿射变换一致时允许的最大逐元素偏差.
pub const AFFINE_TOLERANCE: f64 = 1e-4;

/// 体素网格几何: 形状, 仿射变换, 各轴物理分辨率.
///
/// 形状与分辨率均按 `(z, h, w)` 顺序, 与体数据数组一致.
#[derive(Clone, Debug, PartialEq)]
pub struct Geometry {
    shape: Idx3d,
    affine: Affine,
    resolution: [f64; 3],
}

/// 以给定 `(w, h, z)` 间距构造对角仿射变换.
#[inline]
pub fn diagonal_affine([sw, sh, sz]: [f64; 3]) -> Affine {
    [
        [sw, 0.0, 0.0, 0.0],
        [0.0, sh, 0.0, 0.0],
        [0.0, 0.0, sz, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

impl Geometry {
    /// 由数据形状和仿射变换创建. 各轴分辨率为仿射矩阵对应列的欧氏范数.
    ///
    /// 若某轴分辨率不是正有限值, 返回 `Err(InputError::InvalidResolution)`.
    pub fn new(shape: Idx3d, affine: Affine) -> Result<Self, InputError> {
        let column_norm = |c: usize| (0..3).map(|r| affine[r][c].powi(2)).sum::<f64>().sqrt();
        // 列 (i, j, k) = (w, h, z)
        let resolution = [column_norm(2), column_norm(1), column_norm(0)];
        if !resolution.iter().all(|s| s.is_finite() && *s > 0.0) {
            return Err(InputError::InvalidResolution(resolution));
        }
        Ok(Self {
            shape,
            affine,
            resolution,
        })
    }

    /// 以 `(z, h, w)` 顺序的体素间距创建轴对齐几何.
    pub fn from_spacing(shape: Idx3d, [sz, sh, sw]: [f64; 3]) -> Result<Self, InputError> {
        Self::new(shape, diagonal_affine([sw, sh, sz]))
    }

    /// 数据形状.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.shape
    }

    /// 仿射变换.
    #[inline]
    pub fn affine(&self) -> &Affine {
        &self.affine
    }

    /// 各轴体素分辨率, 单位为毫米, 顺序为 `(z, h, w)`.
    #[inline]
    pub fn resolution(&self) -> [f64; 3] {
        self.resolution
    }

    /// 单个体素的物理体积, 单位为立方毫米.
    #[inline]
    pub fn voxel_volume(&self) -> f64 {
        self.resolution.iter().product()
    }

    /// 检查 `other` 是否与自身处于同一体素网格 (形状相同, 仿射变换逐元素近似相等).
    pub fn ensure_compatible(&self, other: &Geometry) -> Result<(), InputError> {
        if self.shape != other.shape {
            return Err(InputError::ShapeMismatch {
                baseline: self.shape,
                followup: other.shape,
            });
        }
        let deviation = self
            .affine
            .iter()
            .flatten()
            .zip(other.affine.iter().flatten())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        // NaN 同样视为不一致.
        if !(deviation <= AFFINE_TOLERANCE) {
            return Err(InputError::AffineMismatch(deviation));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_from_columns() {
        // 绕 z 轴旋转 90 度, 再缩放.
        let affine = [
            [0.0, -2.0, 0.0, 10.0],
            [0.5, 0.0, 0.0, -3.0],
            [0.0, 0.0, 3.0, 1.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        let g = Geometry::new((4, 5, 6), affine).unwrap();
        assert_eq!(g.resolution(), [3.0, 2.0, 0.5]);
        assert_eq!(g.voxel_volume(), 3.0);
    }

    #[test]
    fn test_invalid_resolution() {
        let mut affine = diagonal_affine([1.0, 1.0, 1.0]);
        affine[2][2] = 0.0;
        assert!(matches!(
            Geometry::new((1, 1, 1), affine),
            Err(InputError::InvalidResolution(_))
        ));
    }

    #[test]
    fn test_compatibility() {
        let a = Geometry::from_spacing((3, 4, 5), [1.0, 1.0, 1.0]).unwrap();
        let b = Geometry::from_spacing((3, 4, 5), [1.0, 1.0, 1.00001]).unwrap();
        assert!(a.ensure_compatible(&b).is_ok());

        let c = Geometry::from_spacing((3, 4, 6), [1.0, 1.0, 1.0]).unwrap();
        assert!(matches!(
            a.ensure_compatible(&c),
            Err(InputError::ShapeMismatch { .. })
        ));

        let d = Geometry::from_spacing((3, 4, 5), [1.2, 1.0, 1.0]).unwrap();
        assert!(matches!(
            a.ensure_compatible(&d),
            Err(InputError::AffineMismatch(_))
        ));

        let mut shifted = *a.affine();
        shifted[0][3] = 5.0;
        let e = Geometry::new((3, 4, 5), shifted).unwrap();
        assert!(a.ensure_compatible(&e).is_err());
    }
}
