//! 差异区域分类.
//!
//! 对一个差异掩膜 (某时间点有病灶而另一时间点没有的体素) 的每个连通域,
//! 依次进行预过滤, 填洞检验, 最小体积检验, 以及距离与膨胀重叠检验,
//! 最终得到唯一的分类结果. 增长方向与缩小方向共用同一流程, 仅交换两个时间点的角色.
//!
//! 每个连通域的结果只依赖于自身几何, 共享的距离图和另一时间点的掩膜,
//! 因此可以独立 (并行) 计算.

use std::fmt::{Display, Formatter};

use log::{debug, info};
use ndarray::{Array3, ArrayView3};

use crate::config::CountConfig;
use crate::data::morph_3d::{distance_transform_edt, Kernel, LabelVolume, Phantom};
use crate::data::Geometry;
use crate::size::ComponentSizes;
use crate::Idx3d;

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};
    }
}

/// 分类方向.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    /// 随访减基线: 差异为随访中新出现的病灶体素, 参照掩膜为基线.
    Growth,

    /// 基线减随访: 差异为随访中消失的病灶体素, 参照掩膜为随访.
    Shrink,
}

impl Direction {
    /// 差异区域包围了较大空洞时的分类 (原位增大/缩小).
    #[inline]
    pub const fn rim_category(&self) -> Category {
        match self {
            Self::Growth => Category::Enlarging,
            Self::Shrink => Category::Shrinking,
        }
    }

    /// 差异区域为独立病灶时的分类 (新增/消失).
    #[inline]
    pub const fn solitary_category(&self) -> Category {
        match self {
            Self::Growth => Category::New,
            Self::Shrink => Category::Disappearing,
        }
    }

    /// 交换两个时间点后的方向.
    #[inline]
    pub const fn swapped(&self) -> Self {
        match self {
            Self::Growth => Self::Shrink,
            Self::Shrink => Self::Growth,
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Growth => "growth",
            Self::Shrink => "shrink",
        })
    }
}

/// 单个差异连通域的最终分类.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Category {
    /// 新增病灶.
    New,

    /// 增大病灶.
    Enlarging,

    /// 消失病灶.
    Disappearing,

    /// 缩小病灶.
    Shrinking,

    /// 体积不足, 被剔除.
    RejectedTooSmall,

    /// 形状或重叠不满足条件, 被剔除.
    RejectedShape,
}

impl Category {
    /// 是否是计入统计结果的病灶变化.
    #[inline]
    pub const fn is_change(&self) -> bool {
        matches!(
            self,
            Self::New | Self::Enlarging | Self::Disappearing | Self::Shrinking
        )
    }

    /// 交换两个时间点后的对应分类.
    #[inline]
    pub const fn swapped(&self) -> Self {
        match self {
            Self::New => Self::Disappearing,
            Self::Disappearing => Self::New,
            Self::Enlarging => Self::Shrinking,
            Self::Shrinking => Self::Enlarging,
            Self::RejectedTooSmall => Self::RejectedTooSmall,
            Self::RejectedShape => Self::RejectedShape,
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::New => "new",
            Self::Enlarging => "enlarging",
            Self::Disappearing => "disappearing",
            Self::Shrinking => "shrinking",
            Self::RejectedTooSmall => "rejected (too small)",
            Self::RejectedShape => "rejected (shape)",
        })
    }
}

/// 单个差异连通域的判定结果.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Verdict {
    /// 体积不超过预过滤阈值, 未参与分类.
    Prefiltered,

    /// 已分类.
    Classified(Category),
}

impl Verdict {
    /// 获取分类. 预过滤的连通域返回 `None`.
    #[inline]
    pub const fn category(&self) -> Option<Category> {
        match self {
            Self::Prefiltered => None,
            Self::Classified(c) => Some(*c),
        }
    }

    /// 是否是计入统计结果的病灶变化.
    #[inline]
    pub const fn is_change(&self) -> bool {
        matches!(self, Self::Classified(c) if c.is_change())
    }
}

/// 单个连通域的分类事件.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LesionEvent {
    /// 分类.
    pub category: Category,

    /// 差异标签中的连通域编号 (从 1 开始).
    pub label: u32,

    /// 连通域物理体积, 单位为立方毫米.
    pub volume: f64,
}

/// 单方向分类结果.
///
/// 判定结果按标签编号存储, 原始标签数据不会被修改.
#[derive(Clone, Debug)]
pub struct PassOutcome {
    direction: Direction,
    labels: LabelVolume,
    sizes: ComponentSizes,
    verdicts: Vec<Verdict>,
}

impl PassOutcome {
    /// 分类方向.
    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// 差异掩膜的连通域标记.
    #[inline]
    pub fn labels(&self) -> &LabelVolume {
        &self.labels
    }

    /// 差异连通域的物理体积.
    #[inline]
    pub fn sizes(&self) -> &ComponentSizes {
        &self.sizes
    }

    /// 所有连通域的判定结果. 第 `i` 个元素对应标签 `i + 1`.
    #[inline]
    pub fn verdicts(&self) -> &[Verdict] {
        &self.verdicts
    }

    /// 标签 `label` (从 1 开始) 的判定结果. 越界时 panic.
    #[inline]
    pub fn verdict(&self, label: u32) -> Verdict {
        self.verdicts[label as usize - 1]
    }

    /// 按标签顺序迭代所有未被预过滤的连通域的分类事件.
    pub fn events(&self) -> impl Iterator<Item = LesionEvent> + '_ {
        self.verdicts.iter().enumerate().filter_map(|(i, v)| {
            let label = i as u32 + 1;
            v.category().map(|category| LesionEvent {
                category,
                label,
                volume: self.sizes.volume(label),
            })
        })
    }

    /// 分类为 `category` 的连通域个数.
    pub fn count(&self, category: Category) -> usize {
        self.events().filter(|e| e.category == category).count()
    }

    /// 分类为 `category` 的连通域总体积.
    pub fn volume(&self, category: Category) -> f64 {
        self.events()
            .filter(|e| e.category == category)
            .map(|e| e.volume)
            .sum()
    }

    /// 计入统计结果的病灶变化个数 (新增 + 增大, 或消失 + 缩小).
    pub fn change_count(&self) -> usize {
        self.events().filter(|e| e.category.is_change()).count()
    }

    /// 计入统计结果的病灶变化总体积.
    pub fn change_volume(&self) -> f64 {
        self.events()
            .filter(|e| e.category.is_change())
            .map(|e| e.volume)
            .sum()
    }

    /// 生成仅保留病灶变化连通域的新标签数组, 其余置 0.
    pub fn masked_labels(&self) -> Array3<u32> {
        self.labels.masked(|l| self.verdict(l).is_change())
    }
}

/// 差异区域分类器. 同一分类器可用于两个方向.
pub struct LesionClassifier<'a> {
    config: &'a CountConfig,
    geometry: &'a Geometry,
    kernel: Kernel,
}

impl<'a> LesionClassifier<'a> {
    /// 以参数 `config` 和体素网格 `geometry` 创建分类器.
    pub fn new(config: &'a CountConfig, geometry: &'a Geometry) -> Self {
        Self {
            config,
            geometry,
            kernel: config.connectivity.kernel(),
        }
    }

    /// 标记差异掩膜 `diff` 的连通域, 然后以 `other` 为参照掩膜分类.
    ///
    /// `diff` 和 `other` 的形状必须与网格一致, 否则程序 panic.
    pub fn classify_mask(
        &self,
        diff: ArrayView3<'_, bool>,
        other: ArrayView3<'_, bool>,
        direction: Direction,
    ) -> PassOutcome {
        let labels = LabelVolume::label(diff, &self.kernel);
        self.classify(labels, other, direction)
    }

    /// 对已标记的差异连通域 `labels` 分类. 结果与标签编号顺序无关.
    pub fn classify(
        &self,
        labels: LabelVolume,
        other: ArrayView3<'_, bool>,
        direction: Direction,
    ) -> PassOutcome {
        assert_eq!(labels.shape(), self.geometry.shape());
        assert_eq!(other.dim(), self.geometry.shape());

        let sizes = ComponentSizes::measure(&labels, self.geometry.voxel_volume());
        let distance = if labels.count() == 0 {
            Array3::zeros(labels.shape())
        } else {
            distance_transform_edt(labels.foreground().view(), self.geometry.resolution())
        };
        let components = labels.components();

        let judge = |(i, voxels): (usize, &Vec<Idx3d>)| {
            let label = i as u32 + 1;
            self.judge(label, voxels, sizes.volume(label), &distance, other, direction)
        };
        let verdicts: Vec<Verdict>;
        cfg_if::cfg_if! {
            if #[cfg(feature = "rayon")] {
                verdicts = components.par_iter().enumerate().map(judge).collect();
            } else {
                verdicts = components.iter().enumerate().map(judge).collect();
            }
        }

        let outcome = PassOutcome {
            direction,
            labels,
            sizes,
            verdicts,
        };
        info!(
            "{direction} pass: {} components, {} {}, {} {}, {} rejected, {} prefiltered",
            outcome.labels.count(),
            outcome.count(direction.solitary_category()),
            direction.solitary_category(),
            outcome.count(direction.rim_category()),
            direction.rim_category(),
            outcome.count(Category::RejectedTooSmall) + outcome.count(Category::RejectedShape),
            outcome
                .verdicts
                .iter()
                .filter(|v| **v == Verdict::Prefiltered)
                .count(),
        );
        outcome
    }

    /// 判定单个连通域.
    fn judge(
        &self,
        label: u32,
        voxels: &[Idx3d],
        volume: f64,
        distance: &Array3<f64>,
        other: ArrayView3<'_, bool>,
        direction: Direction,
    ) -> Verdict {
        let CountConfig {
            min_size,
            max_overlap,
            thresholds,
            ..
        } = *self.config;

        if volume <= self.config.prefilter_size() {
            return Verdict::Prefiltered;
        }
        let Some(phantom) = Phantom::new(voxels) else {
            return Verdict::Prefiltered;
        };
        let voxel = self.geometry.voxel_volume();

        // 差异区域包围了空洞: 病灶在原位增大/缩小.
        let filled = phantom.filled_count() as f64 * voxel;
        if filled - volume > thresholds.hole_ratio * filled && filled > min_size {
            let category = direction.rim_category();
            debug!(
                "{direction} lesion {label}: volume {volume:.3} mm^3, \
                 filled {filled:.3} mm^3 -> {category}"
            );
            return Verdict::Classified(category);
        }

        if volume <= min_size {
            debug!("{direction} lesion {label}: volume {volume:.3} mm^3 -> too small");
            return Verdict::Classified(Category::RejectedTooSmall);
        }

        // 近似球形且与另一时间点病灶接触较少: 新增/消失病灶.
        let overlap = phantom.dilation_overlap(other);
        let max_distance = voxels.iter().map(|p| distance[*p]).fold(0.0, f64::max);
        let category = if max_distance > thresholds.distance_factor * voxel
            && (overlap as f64) < max_overlap * volume
        {
            direction.solitary_category()
        } else {
            Category::RejectedShape
        };
        debug!(
            "{direction} lesion {label}: volume {volume:.3} mm^3, overlap {overlap}, \
             max distance {max_distance:.3} mm -> {category}"
        );
        Verdict::Classified(category)
    }
}
