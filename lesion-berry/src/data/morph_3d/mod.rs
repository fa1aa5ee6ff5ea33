//! 3D 形态学操作.
//!
//! 包括连通规则, 连通域标记, 局部填洞与膨胀, 以及各向异性欧氏距离变换.
//! 所有操作都不修改输入体数据.

use ndarray::{Array3, ArrayView3, Zip};

use crate::Idx3d;

mod connectivity;
mod edt;
mod label;
mod phantom;

pub use connectivity::{Connectivity, Kernel};
pub use edt::distance_transform_edt;
pub use label::LabelVolume;
pub use phantom::Phantom;

/// 三维二值掩膜. `true` 为前景.
pub type Mask3d = Array3<bool>;

/// 三维偏移量, 分量取值一般为 `-1`, `0` 或 `1`.
pub type Offset3d = (isize, isize, isize);

/// 计算 `pos + offset`. 若结果落在 `shape` 之外则返回 `None`.
#[inline]
pub(crate) fn shift((z, h, w): Idx3d, (dz, dh, dw): Offset3d, shape: Idx3d) -> Option<Idx3d> {
    let ans = (
        z.checked_add_signed(dz)?,
        h.checked_add_signed(dh)?,
        w.checked_add_signed(dw)?,
    );
    (ans.0 < shape.0 && ans.1 < shape.1 && ans.2 < shape.2).then_some(ans)
}

/// 差异掩膜 `a AND NOT b`. 两者形状必须一致, 否则程序 panic.
pub fn difference(a: ArrayView3<'_, bool>, b: ArrayView3<'_, bool>) -> Mask3d {
    assert_eq!(a.dim(), b.dim());
    let mut ans = Mask3d::from_elem(a.dim(), false);
    Zip::from(&mut ans)
        .and(a)
        .and(b)
        .for_each(|d, &x, &y| *d = x && !y);
    ans
}

/// 轴对齐包围盒, 两端均为闭区间.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BoundingBox {
    min: Idx3d,
    max: Idx3d,
}

impl BoundingBox {
    /// 计算索引集合的包围盒. 集合为空时返回 `None`.
    pub fn of<'a, I: IntoIterator<Item = &'a Idx3d>>(it: I) -> Option<Self> {
        let mut it = it.into_iter();
        let &first = it.next()?;
        let (min, max) = it.fold((first, first), |(lo, hi), &(z, h, w)| {
            (
                (lo.0.min(z), lo.1.min(h), lo.2.min(w)),
                (hi.0.max(z), hi.1.max(h), hi.2.max(w)),
            )
        });
        Some(Self { min, max })
    }

    /// 最小角.
    #[inline]
    pub fn min(&self) -> Idx3d {
        self.min
    }

    /// 最大角.
    #[inline]
    pub fn max(&self) -> Idx3d {
        self.max
    }

    /// 各轴方向的体素个数.
    #[inline]
    pub fn extent(&self) -> Idx3d {
        (
            self.max.0 - self.min.0 + 1,
            self.max.1 - self.min.1 + 1,
            self.max.2 - self.min.2 + 1,
        )
    }
}
