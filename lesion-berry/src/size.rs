//! 连通域物理体积与最小体积过滤.

use ndarray::Array3;

use crate::data::morph_3d::LabelVolume;

/// 各连通域的物理体积, 单位为立方毫米. 第 `i` 个元素对应标签 `i + 1`.
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentSizes {
    volumes: Vec<f64>,
}

impl ComponentSizes {
    /// 以单体素体积 `voxel_volume` 计算 `labels` 中所有连通域的物理体积.
    pub fn measure(labels: &LabelVolume, voxel_volume: f64) -> Self {
        Self {
            volumes: labels
                .voxel_counts()
                .into_iter()
                .map(|c| c as f64 * voxel_volume)
                .collect(),
        }
    }

    /// 连通域个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    /// 是否不存在连通域.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    /// 标签 `label` (从 1 开始) 的物理体积. 标签越界时 panic.
    #[inline]
    pub fn volume(&self, label: u32) -> f64 {
        self.volumes[label as usize - 1]
    }

    /// 所有连通域的物理体积.
    #[inline]
    pub fn volumes(&self) -> &[f64] {
        &self.volumes
    }

    /// 按最小体积 `threshold` 过滤: 体积严格大于阈值的连通域被保留.
    pub fn keep_mask(&self, threshold: f64) -> KeepMask {
        KeepMask {
            keep: self.volumes.iter().map(|v| *v > threshold).collect(),
        }
    }
}

/// 按标签索引 (从 1 开始) 的保留标记. 创建后只读.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeepMask {
    keep: Vec<bool>,
}

impl KeepMask {
    /// 标签 `label` 是否被保留. 越界标签 (含背景 0) 视为不保留.
    #[inline]
    pub fn is_kept(&self, label: u32) -> bool {
        label
            .checked_sub(1)
            .and_then(|i| self.keep.get(i as usize))
            .copied()
            .unwrap_or(false)
    }

    /// 保留的连通域个数.
    #[inline]
    pub fn count(&self) -> usize {
        self.keep.iter().filter(|k| **k).count()
    }

    /// 保留的连通域的总体积.
    pub fn kept_volume(&self, sizes: &ComponentSizes) -> f64 {
        debug_assert_eq!(self.keep.len(), sizes.len());
        self.keep
            .iter()
            .zip(sizes.volumes())
            .filter_map(|(k, v)| k.then_some(*v))
            .sum()
    }
}

/// 经过最小体积过滤的单时间点连通域.
///
/// 连通域标签本身不被修改, 过滤结果由 [`KeepMask`] 记录.
#[derive(Clone, Debug)]
pub struct FilteredLabels {
    labels: LabelVolume,
    sizes: ComponentSizes,
    keep: KeepMask,
}

impl FilteredLabels {
    /// 以单体素体积 `voxel_volume` 计算体积, 并按最小体积 `threshold` 过滤 `labels`.
    pub fn new(labels: LabelVolume, voxel_volume: f64, threshold: f64) -> Self {
        let sizes = ComponentSizes::measure(&labels, voxel_volume);
        let keep = sizes.keep_mask(threshold);
        Self {
            labels,
            sizes,
            keep,
        }
    }

    /// 连通域标记.
    #[inline]
    pub fn labels(&self) -> &LabelVolume {
        &self.labels
    }

    /// 连通域体积.
    #[inline]
    pub fn sizes(&self) -> &ComponentSizes {
        &self.sizes
    }

    /// 保留标记.
    #[inline]
    pub fn keep(&self) -> &KeepMask {
        &self.keep
    }

    /// 保留的连通域个数.
    #[inline]
    pub fn count(&self) -> usize {
        self.keep.count()
    }

    /// 保留的连通域总体积.
    #[inline]
    pub fn volume(&self) -> f64 {
        self.keep.kept_volume(&self.sizes)
    }

    /// 生成仅保留通过过滤的连通域的新标签数组, 其余置 0.
    pub fn masked_labels(&self) -> Array3<u32> {
        self.labels.masked(|l| self.keep.is_kept(l))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::morph_3d::Connectivity;

    fn labels() -> LabelVolume {
        // 三个连通域: 2, 5, 8 个体素.
        let mask = Array3::from_shape_fn((1, 3, 16), |(_, h, w)| match h {
            0 => w < 2,
            1 => false,
            _ => w < 5 || (7..15).contains(&w),
        });
        let l = LabelVolume::label(mask.view(), &Connectivity::Face6.kernel());
        assert_eq!(l.count(), 3);
        l
    }

    #[test]
    fn test_measure() {
        let sizes = ComponentSizes::measure(&labels(), 2.5);
        let mut v = sizes.volumes().to_vec();
        v.sort_by(f64::total_cmp);
        assert_eq!(v, vec![5.0, 12.5, 20.0]);
    }

    #[test]
    fn test_threshold_is_strict() {
        let sizes = ComponentSizes::measure(&labels(), 2.5);
        let keep = sizes.keep_mask(12.5);
        assert_eq!(keep.count(), 1);
        assert_eq!(keep.kept_volume(&sizes), 20.0);

        let keep = sizes.keep_mask(12.4);
        assert_eq!(keep.count(), 2);
        assert_eq!(keep.kept_volume(&sizes), 32.5);
        assert!(!keep.is_kept(0));
        assert!(!keep.is_kept(4));
    }

    #[test]
    fn test_keep_mask_idempotent() {
        let l = labels();
        let a = ComponentSizes::measure(&l, 1.7).keep_mask(5.0);
        let b = ComponentSizes::measure(&l, 1.7).keep_mask(5.0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_filtered_labels() {
        let f = FilteredLabels::new(labels(), 2.5, 12.4);
        assert_eq!(f.count(), 2);
        assert_eq!(f.volume(), 32.5);

        let masked = f.masked_labels();
        assert_eq!(masked.iter().filter(|l| **l != 0).count(), 13);
        // 原标签不变.
        assert_eq!(f.labels().data().iter().filter(|l| **l != 0).count(), 15);
    }
}
