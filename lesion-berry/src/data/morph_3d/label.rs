use std::collections::VecDeque;

use ndarray::{Array3, ArrayView3};

use super::{shift, Kernel, Mask3d};
use crate::Idx3d;

/// 连通域标记结果. `0` 为背景, `1..=K` 为互不相交的连通域.
///
/// 该结构创建后不可变. 过滤结果通过 [`Self::masked`] 生成新数组.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelVolume {
    data: Array3<u32>,
    count: usize,
}

impl LabelVolume {
    /// 按照结构元素 `kernel` 给出的相邻规则标记 `mask` 的所有前景连通域.
    ///
    /// 两个前景体素标签相同, 当且仅当存在一条由前景体素组成,
    /// 且相邻两体素在 `kernel` 意义下相邻的路径. 标签按行优先顺序下
    /// 各连通域首个体素出现的先后编号, 但调用者不应依赖该顺序.
    pub fn label(mask: ArrayView3<'_, bool>, kernel: &Kernel) -> Self {
        let shape = mask.dim();
        let offsets = kernel.offsets();
        let mut data = Array3::<u32>::zeros(shape);
        let mut count = 0u32;
        let mut bfs_q = VecDeque::with_capacity(64);

        for (pos, &is_fg) in mask.indexed_iter() {
            if !is_fg || data[pos] != 0 {
                continue;
            }
            count += 1;
            data[pos] = count;
            bfs_q.push_back(pos);

            // bfs
            while let Some(cur) = bfs_q.pop_front() {
                for &off in offsets.iter() {
                    let Some(next) = shift(cur, off, shape) else {
                        continue;
                    };
                    if mask[next] && data[next] == 0 {
                        data[next] = count;
                        bfs_q.push_back(next);
                    }
                }
            }
        }

        Self {
            data,
            count: count as usize,
        }
    }

    /// 由外部标签数组直接创建. 标签必须恰好覆盖 `1..=K`, 否则返回 `None`.
    ///
    /// 该方法不检查各标签的连通性.
    pub fn from_raw(data: Array3<u32>) -> Option<Self> {
        let count = data.iter().copied().max().unwrap_or(0) as usize;
        let mut seen = vec![false; count];
        for &l in data.iter().filter(|l| **l != 0) {
            seen[l as usize - 1] = true;
        }
        seen.iter().all(|s| *s).then_some(Self { data, count })
    }

    /// 连通域个数 `K`.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// 数据形状.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 获得标签数据的不可变视图.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, u32> {
        self.data.view()
    }

    /// 各连通域的体素个数. 第 `i` 个元素对应标签 `i + 1`.
    pub fn voxel_counts(&self) -> Vec<usize> {
        let mut ans = vec![0usize; self.count];
        for &l in self.data.iter().filter(|l| **l != 0) {
            ans[l as usize - 1] += 1;
        }
        ans
    }

    /// 一次遍历收集所有连通域的体素索引. 第 `i` 个元素对应标签 `i + 1`,
    /// 每个集合内按行优先排列.
    pub fn components(&self) -> Vec<Vec<Idx3d>> {
        let mut ans = vec![Vec::new(); self.count];
        for (pos, &l) in self.data.indexed_iter().filter(|(_, l)| **l != 0) {
            ans[l as usize - 1].push(pos);
        }
        ans
    }

    /// 所有前景体素组成的掩膜.
    #[inline]
    pub fn foreground(&self) -> Mask3d {
        self.data.map(|l| *l != 0)
    }

    /// 生成新标签数组: 保留 `keep(label)` 为 `true` 的连通域, 其余置 0.
    /// 原标签不会被修改.
    pub fn masked<F: Fn(u32) -> bool>(&self, keep: F) -> Array3<u32> {
        self.data.map(|&l| if l != 0 && keep(l) { l } else { 0 })
    }
}
