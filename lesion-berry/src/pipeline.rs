//! 单个受试者 (基线, 随访) 的完整统计流程.
//!
//! 1. 检查参数与两个时间点的网格一致性.
//! 2. 分别标记两个时间点的病灶连通域, 并按最小体积过滤.
//! 3. 对两个差异掩膜分别运行增长方向和缩小方向的分类.
//! 4. 汇总为 [`SummaryRecord`].
//!
//! 所有中间结果均只读, 标签输出通过纯粹的遮罩过程生成.

use std::path::{Path, PathBuf};

use log::info;
use ndarray::{Array3, ArrayView3};

use crate::classify::{Direction, LesionClassifier, PassOutcome};
use crate::config::CountConfig;
use crate::consts::file;
use crate::data::morph_3d::{difference, LabelVolume};
use crate::data::{Geometry, NiftiHeaderAttr, SegVolume};
use crate::error::{InputError, OutputError, Result};
use crate::size::FilteredLabels;
use crate::summary::SummaryRecord;

/// 同时执行两个互相独立的任务.
#[cfg(feature = "rayon")]
#[inline]
fn join<A, B, RA, RB>(a: A, b: B) -> (RA, RB)
where
    A: FnOnce() -> RA + Send,
    B: FnOnce() -> RB + Send,
    RA: Send,
    RB: Send,
{
    rayon::join(a, b)
}

/// 依次执行两个互相独立的任务.
#[cfg(not(feature = "rayon"))]
#[inline]
fn join<A, B, RA, RB>(a: A, b: B) -> (RA, RB)
where
    A: FnOnce() -> RA,
    B: FnOnce() -> RB,
{
    (a(), b())
}

/// 一对 (基线, 随访) 的比较结果.
#[derive(Clone, Debug)]
pub struct Comparison {
    geometry: Geometry,
    baseline: FilteredLabels,
    followup: FilteredLabels,
    growth: PassOutcome,
    shrink: PassOutcome,
    summary: SummaryRecord,
}

/// 比较两个 nii 分割结果.
///
/// 病灶体素由 `config.lesion_label` 确定. 两个时间点必须处于同一体素网格,
/// 否则在标记连通域之前返回 `InputError`.
pub fn compare(
    baseline: &SegVolume,
    followup: &SegVolume,
    config: &CountConfig,
) -> Result<Comparison> {
    config.validate()?;
    let geometry = baseline.geometry()?;
    geometry.ensure_compatible(&followup.geometry()?)?;

    let label = config.lesion_label;
    info!(
        "{} baseline and {} follow-up voxels labeled {label}",
        baseline.count(label),
        followup.count(label),
    );
    compare_masks(
        baseline.lesion_mask(label).view(),
        followup.lesion_mask(label).view(),
        &geometry,
        config,
    )
}

/// 比较两个已二值化的病灶掩膜. 两者均位于网格 `geometry` 上.
pub fn compare_masks<'a>(
    baseline: ArrayView3<'a, bool>,
    followup: ArrayView3<'a, bool>,
    geometry: &Geometry,
    config: &CountConfig,
) -> Result<Comparison> {
    config.validate()?;
    for mask in [baseline, followup] {
        if mask.dim() != geometry.shape() {
            return Err(InputError::ShapeMismatch {
                baseline: geometry.shape(),
                followup: mask.dim(),
            }
            .into());
        }
    }

    let kernel = config.connectivity.kernel();
    let voxel = geometry.voxel_volume();
    let filter = |mask: ArrayView3<'_, bool>| {
        FilteredLabels::new(LabelVolume::label(mask, &kernel), voxel, config.min_size)
    };
    let (baseline_labels, followup_labels) = join(|| filter(baseline), || filter(followup));
    info!(
        "baseline: {} lesions, {:.3} mm^3; follow-up: {} lesions, {:.3} mm^3 ({})",
        baseline_labels.count(),
        baseline_labels.volume(),
        followup_labels.count(),
        followup_labels.volume(),
        config.connectivity,
    );

    let classifier = LesionClassifier::new(config, geometry);
    let (growth, shrink) = join(
        || {
            let diff = difference(followup, baseline);
            classifier.classify_mask(diff.view(), baseline, Direction::Growth)
        },
        || {
            let diff = difference(baseline, followup);
            classifier.classify_mask(diff.view(), followup, Direction::Shrink)
        },
    );

    let summary = SummaryRecord::aggregate(&baseline_labels, &followup_labels, &growth, &shrink);
    Ok(Comparison {
        geometry: geometry.clone(),
        baseline: baseline_labels,
        followup: followup_labels,
        growth,
        shrink,
        summary,
    })
}

impl Comparison {
    /// 网格几何.
    #[inline]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// 基线病灶连通域.
    #[inline]
    pub fn baseline(&self) -> &FilteredLabels {
        &self.baseline
    }

    /// 随访病灶连通域.
    #[inline]
    pub fn followup(&self) -> &FilteredLabels {
        &self.followup
    }

    /// 增长方向 (随访减基线) 分类结果.
    #[inline]
    pub fn growth(&self) -> &PassOutcome {
        &self.growth
    }

    /// 缩小方向 (基线减随访) 分类结果.
    #[inline]
    pub fn shrink(&self) -> &PassOutcome {
        &self.shrink
    }

    /// 汇总结果.
    #[inline]
    pub fn summary(&self) -> &SummaryRecord {
        &self.summary
    }

    /// 生成四个输出标签数组及其文件名: 基线, 随访, 增长差异, 缩小差异.
    ///
    /// 被过滤或被剔除的连通域置 0, 其余保留原标签编号.
    pub fn masked_labels(&self) -> [(&'static str, Array3<u32>); 4] {
        [
            (file::BASELINE_LESIONS, self.baseline.masked_labels()),
            (file::FOLLOWUP_LESIONS, self.followup.masked_labels()),
            (file::GROWTH_LESIONS, self.growth.masked_labels()),
            (file::SHRINK_LESIONS, self.shrink.masked_labels()),
        ]
    }

    /// 将汇总结果写入目录 `dir`, 返回文件路径.
    pub fn save_summary<P: AsRef<Path>>(
        &self,
        dir: P,
    ) -> std::result::Result<PathBuf, OutputError> {
        let path = dir.as_ref().join(file::SUMMARY_NPZ);
        self.summary.save_npz(&path)?;
        info!("summary written to `{}`", path.display());
        Ok(path)
    }

    /// 以 `reference` (通常为基线) 的 header 为参考, 将四个输出标签写入目录 `dir`.
    pub fn save_images<P: AsRef<Path>>(
        &self,
        dir: P,
        reference: &SegVolume,
    ) -> std::result::Result<Vec<PathBuf>, OutputError> {
        let mut saved = Vec::with_capacity(4);
        for (name, labels) in self.masked_labels() {
            let path = dir.as_ref().join(name);
            reference.save_labels(&path, labels.view())?;
            info!("labels written to `{}`", path.display());
            saved.push(path);
        }
        Ok(saved)
    }
}
