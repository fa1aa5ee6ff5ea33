use std::collections::VecDeque;

use ndarray::{Array3, ArrayView3};

use super::{shift, BoundingBox, Connectivity, Offset3d};
use crate::Idx3d;

/// 单个连通域的局部体素副本.
///
/// 副本覆盖连通域包围盒并在六个方向上各外扩一层背景体素,
/// 因此外扩层本身连通, 且与原体数据边界之外的空间等价.
/// 填洞和单步膨胀都在该副本上完成, 不触碰全局数据.
pub struct Phantom {
    /// 局部 `(0, 0, 0)` 对应的全局索引, 可能为负.
    origin: Offset3d,
    data: Array3<bool>,
}

impl Phantom {
    /// 由连通域的全局体素索引构建局部副本. 若集合为空则返回 `None`.
    pub fn new(voxels: &[Idx3d]) -> Option<Self> {
        let bb = BoundingBox::of(voxels)?;
        let (min_z, min_h, min_w) = bb.min();
        let (ez, eh, ew) = bb.extent();
        let mut data = Array3::from_elem((ez + 2, eh + 2, ew + 2), false);
        for &(z, h, w) in voxels {
            data[(z - min_z + 1, h - min_h + 1, w - min_w + 1)] = true;
        }
        Some(Self {
            origin: (
                min_z as isize - 1,
                min_h as isize - 1,
                min_w as isize - 1,
            ),
            data,
        })
    }

    /// 局部副本形状.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 填洞后的体素个数.
    ///
    /// 以 6-连通规则从外扩层出发遍历背景, 未被触达的背景体素即为空洞.
    pub fn filled_count(&self) -> usize {
        let shape = self.shape();
        let offsets = Connectivity::Face6.kernel().offsets();
        let mut outside = Array3::from_elem(shape, false);
        let mut bfs_q = VecDeque::with_capacity(64);

        // 局部原点一定位于外扩层.
        debug_assert!(!self.data[(0, 0, 0)]);
        outside[(0, 0, 0)] = true;
        bfs_q.push_back((0, 0, 0));
        let mut reached = 1usize;

        while let Some(cur) = bfs_q.pop_front() {
            for &off in offsets.iter() {
                let Some(next) = shift(cur, off, shape) else {
                    continue;
                };
                if !self.data[next] && !outside[next] {
                    outside[next] = true;
                    reached += 1;
                    bfs_q.push_back(next);
                }
            }
        }
        self.data.len() - reached
    }

    /// 以 6-连通结构元素膨胀一次后, 与全局掩膜 `other` 重叠的体素个数.
    pub fn dilation_overlap(&self, other: ArrayView3<'_, bool>) -> usize {
        let shape = self.shape();
        let offsets = Connectivity::Face6.kernel().offsets();
        let global_shape = other.dim();

        self.data
            .indexed_iter()
            .filter(|&(pos, &is_fg)| {
                is_fg
                    || offsets
                        .iter()
                        .any(|&off| shift(pos, off, shape).is_some_and(|p| self.data[p]))
            })
            .filter_map(|(pos, _)| self.to_global(pos, global_shape))
            .filter(|&p| other[p])
            .count()
    }

    /// 局部索引转换为全局索引. 若落在全局形状 `shape` 之外则返回 `None`.
    #[inline]
    fn to_global(&self, (z, h, w): Idx3d, shape: Idx3d) -> Option<Idx3d> {
        let (oz, oh, ow) = self.origin;
        let ans = (
            usize::try_from(z as isize + oz).ok()?,
            usize::try_from(h as isize + oh).ok()?,
            usize::try_from(w as isize + ow).ok()?,
        );
        (ans.0 < shape.0 && ans.1 < shape.1 && ans.2 < shape.2).then_some(ans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::iproduct;

    /// 边长为 `n` 的空心立方体壳 (壁厚 1), 起点为 `at`.
    fn hollow_cube(at: Idx3d, n: usize) -> Vec<Idx3d> {
        iproduct!(0..n, 0..n, 0..n)
            .filter(|&(z, h, w)| [z, h, w].iter().any(|&c| c == 0 || c == n - 1))
            .map(|(z, h, w)| (z + at.0, h + at.1, w + at.2))
            .collect()
    }

    #[test]
    fn test_empty() {
        assert!(Phantom::new(&[]).is_none());
    }

    #[test]
    fn test_solid_has_no_hole() {
        let cube: Vec<Idx3d> = iproduct!(2..5, 2..5, 2..5).collect();
        let p = Phantom::new(&cube).unwrap();
        assert_eq!(p.shape(), (5, 5, 5));
        assert_eq!(p.filled_count(), 27);
    }

    #[test]
    fn test_hollow_cube_is_filled() {
        let shell = hollow_cube((0, 0, 0), 4);
        let p = Phantom::new(&shell).unwrap();
        assert_eq!(shell.len(), 64 - 8);
        assert_eq!(p.filled_count(), 64);
    }

    #[test]
    fn test_open_ring_is_not_filled() {
        // 单层平面上的环: 三维中空洞与外部相通, 不构成空洞.
        let ring: Vec<Idx3d> = iproduct!(0..1, 0..3, 0..3)
            .filter(|&(_, h, w)| (h, w) != (1, 1))
            .collect();
        let p = Phantom::new(&ring).unwrap();
        assert_eq!(p.filled_count(), 8);
    }

    #[test]
    fn test_shell_with_face_gap_is_not_filled() {
        let mut shell = hollow_cube((1, 1, 1), 5);
        // 在一面挖一个洞, 内部与外部 6-连通.
        shell.retain(|&p| p != (1, 3, 3));
        let p = Phantom::new(&shell).unwrap();
        assert_eq!(p.filled_count(), shell.len());
    }

    #[test]
    fn test_dilation_overlap_counts_face_shell() {
        let other = Array3::from_elem((5, 5, 5), true);
        let p = Phantom::new(&[(2, 2, 2)]).unwrap();
        // 单体素膨胀得到自身和 6 个邻居.
        assert_eq!(p.dilation_overlap(other.view()), 7);

        // 位于角落时, 越界部分不计.
        let p = Phantom::new(&[(0, 0, 0)]).unwrap();
        assert_eq!(p.dilation_overlap(other.view()), 4);
    }

    #[test]
    fn test_dilation_overlap_ignores_diagonals() {
        let mut other = Array3::from_elem((5, 5, 5), false);
        other[(1, 1, 1)] = true; // 共顶点
        other[(2, 1, 1)] = true; // 共棱
        other[(2, 2, 3)] = true; // 共面
        let p = Phantom::new(&[(2, 2, 2)]).unwrap();
        assert_eq!(p.dilation_overlap(other.view()), 1);
    }
}
