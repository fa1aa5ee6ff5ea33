//! 三维连通规则与结构元素.

use std::fmt::{Display, Formatter};

use itertools::iproduct;
use ndarray::{Array3, ArrayView3};

use super::Offset3d;
use crate::error::ConfigError;

/// 三维体素的连通规则.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Connectivity {
    /// 6-连通: 仅共面的体素相邻.
    Face6,

    /// 18-连通: 共面或共棱的体素相邻.
    Edge18,

    /// 26-连通: 共面, 共棱或共顶点的体素相邻.
    Vertex26,
}

impl TryFrom<u32> for Connectivity {
    type Error = ConfigError;

    fn try_from(order: u32) -> Result<Self, Self::Error> {
        match order {
            6 => Ok(Self::Face6),
            18 => Ok(Self::Edge18),
            26 => Ok(Self::Vertex26),
            _ => Err(ConfigError::InvalidConnectivity(order)),
        }
    }
}

impl Default for Connectivity {
    #[inline]
    fn default() -> Self {
        Self::Edge18
    }
}

impl Display for Connectivity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-connectivity", self.order())
    }
}

impl Connectivity {
    /// 邻居个数, 即 6, 18 或 26.
    #[inline]
    pub const fn order(&self) -> u32 {
        match self {
            Self::Face6 => 6,
            Self::Edge18 => 18,
            Self::Vertex26 => 26,
        }
    }

    /// 偏移量中允许的最多非零分量个数.
    #[inline]
    const fn max_nonzero(&self) -> usize {
        match self {
            Self::Face6 => 1,
            Self::Edge18 => 2,
            Self::Vertex26 => 3,
        }
    }

    /// 构建 3x3x3 结构元素. 中心体素不属于自身的邻居.
    pub fn kernel(&self) -> Kernel {
        let max_nonzero = self.max_nonzero();
        let data = Array3::from_shape_fn((3, 3, 3), |(z, h, w)| {
            let nonzero = [z, h, w].iter().filter(|&&c| c != 1).count();
            (1..=max_nonzero).contains(&nonzero)
        });
        Kernel { data }
    }
}

/// 3x3x3 布尔结构元素, 以 `(1, 1, 1)` 为中心.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Kernel {
    data: Array3<bool>,
}

impl Kernel {
    /// 获得结构元素的不可变视图.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, bool> {
        self.data.view()
    }

    /// 邻居个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.iter().filter(|b| **b).count()
    }

    /// 结构元素是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 结构元素是否包含中心体素.
    #[inline]
    pub fn contains_center(&self) -> bool {
        self.data[(1, 1, 1)]
    }

    /// 结构元素是否关于中心对称.
    pub fn is_symmetric(&self) -> bool {
        self.data
            .indexed_iter()
            .all(|((z, h, w), b)| *b == self.data[(2 - z, 2 - h, 2 - w)])
    }

    /// 收集所有邻居相对于中心的偏移量, 按行优先顺序.
    pub fn offsets(&self) -> Vec<Offset3d> {
        iproduct!(0..3isize, 0..3isize, 0..3isize)
            .filter(|&(z, h, w)| self.data[(z as usize, h as usize, w as usize)])
            .map(|(z, h, w)| (z - 1, h - 1, w - 1))
            .collect()
    }
}
