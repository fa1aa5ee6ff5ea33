//! 病灶计数与体积汇总.

use std::fs::File;
use std::path::Path;

use ndarray::{arr0, Ix0, OwnedRepr};
use ndarray_npy::{NpzReader, NpzWriter};

use crate::classify::{Category, Direction, PassOutcome};
use crate::error::{InputError, OutputError};
use crate::size::FilteredLabels;

/// npz 文件中的字段名. 下游统计脚本按这些名字读取, 不可更改.
mod key {
    pub const BL_LES: &str = "bl_les";
    pub const BL_VOL_LES: &str = "bl_vol_les";
    pub const FU_LES: &str = "fu_les";
    pub const FU_LES_EFF: &str = "fu_les_eff";
    pub const FU_VOL_LES: &str = "fu_vol_les";
    pub const FU_MIN_BL_LES: &str = "fu_min_bl_les";
    pub const FU_MIN_BL_VOL_LES: &str = "fu_min_bl_vol_les";
    pub const BL_MIN_FU_LES: &str = "bl_min_fu_les";
    pub const BL_MIN_FU_VOL_LES: &str = "bl_min_fu_vol_les";
}

/// 一对 (基线, 随访) 的统计结果. 体积单位均为立方毫米.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SummaryRecord {
    /// 基线病灶个数 (通过最小体积过滤).
    pub baseline_count: i64,

    /// 基线病灶总体积.
    pub baseline_volume: f64,

    /// 随访病灶个数 (通过最小体积过滤).
    pub followup_count: i64,

    /// 随访有效病灶个数: 基线个数 + 新增 - 消失.
    pub effective_followup_count: i64,

    /// 随访病灶总体积.
    pub followup_volume: f64,

    /// 新增 + 增大病灶个数.
    pub growth_count: i64,

    /// 新增 + 增大病灶总体积.
    pub growth_volume: f64,

    /// 消失 + 缩小病灶个数.
    pub shrink_count: i64,

    /// 消失 + 缩小病灶总体积.
    pub shrink_volume: f64,
}

impl SummaryRecord {
    /// 汇总两个时间点的过滤结果与两个方向的分类结果.
    ///
    /// # 注意
    ///
    /// `growth` 必须是增长方向的结果, `shrink` 必须是缩小方向的结果, 否则程序 panic.
    pub fn aggregate(
        baseline: &FilteredLabels,
        followup: &FilteredLabels,
        growth: &PassOutcome,
        shrink: &PassOutcome,
    ) -> Self {
        assert_eq!(growth.direction(), Direction::Growth);
        assert_eq!(shrink.direction(), Direction::Shrink);

        let baseline_count = baseline.count() as i64;
        let new = growth.count(Category::New) as i64;
        let disappearing = shrink.count(Category::Disappearing) as i64;
        Self {
            baseline_count,
            baseline_volume: baseline.volume(),
            followup_count: followup.count() as i64,
            effective_followup_count: baseline_count + new - disappearing,
            followup_volume: followup.volume(),
            growth_count: growth.change_count() as i64,
            growth_volume: growth.change_volume(),
            shrink_count: shrink.change_count() as i64,
            shrink_volume: shrink.change_volume(),
        }
    }

    /// 将结果以 npz 格式写入 `path`. 每个字段保存为一个 0 维数组.
    pub fn save_npz<P: AsRef<Path>>(&self, path: P) -> Result<(), OutputError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| OutputError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut npz = NpzWriter::new(file);
        for (name, value) in [
            (key::BL_LES, self.baseline_count),
            (key::FU_LES, self.followup_count),
            (key::FU_LES_EFF, self.effective_followup_count),
            (key::FU_MIN_BL_LES, self.growth_count),
            (key::BL_MIN_FU_LES, self.shrink_count),
        ] {
            npz.add_array(name, &arr0(value))?;
        }
        for (name, value) in [
            (key::BL_VOL_LES, self.baseline_volume),
            (key::FU_VOL_LES, self.followup_volume),
            (key::FU_MIN_BL_VOL_LES, self.growth_volume),
            (key::BL_MIN_FU_VOL_LES, self.shrink_volume),
        ] {
            npz.add_array(name, &arr0(value))?;
        }
        npz.finish()?;
        Ok(())
    }

    /// 从 `path` 读取 [`SummaryRecord::save_npz`] 写出的结果 (或任何包含同名 0 维字段的 npz 文件).
    pub fn load_npz<P: AsRef<Path>>(path: P) -> Result<Self, InputError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| InputError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let npz_err = |source| InputError::Npz {
            path: path.to_path_buf(),
            source,
        };
        let mut npz = NpzReader::new(file).map_err(npz_err)?;

        // 字段名可能带有 `.npy` 后缀.
        let names = npz.names().map_err(npz_err)?;
        let find = |name: &str| {
            names
                .iter()
                .find(|n| n.as_str() == name || n.strip_suffix(".npy") == Some(name))
                .cloned()
                .unwrap_or_else(|| name.to_string())
        };
        let mut count = |name: &str| -> Result<i64, InputError> {
            let a = npz
                .by_name::<OwnedRepr<i64>, Ix0>(&find(name))
                .map_err(npz_err)?;
            Ok(a.into_scalar())
        };
        let baseline_count = count(key::BL_LES)?;
        let followup_count = count(key::FU_LES)?;
        let effective_followup_count = count(key::FU_LES_EFF)?;
        let growth_count = count(key::FU_MIN_BL_LES)?;
        let shrink_count = count(key::BL_MIN_FU_LES)?;

        let mut volume = |name: &str| -> Result<f64, InputError> {
            let a = npz
                .by_name::<OwnedRepr<f64>, Ix0>(&find(name))
                .map_err(npz_err)?;
            Ok(a.into_scalar())
        };
        Ok(Self {
            baseline_count,
            baseline_volume: volume(key::BL_VOL_LES)?,
            followup_count,
            effective_followup_count,
            followup_volume: volume(key::FU_VOL_LES)?,
            growth_count,
            growth_volume: volume(key::FU_MIN_BL_VOL_LES)?,
            shrink_count,
            shrink_volume: volume(key::BL_MIN_FU_VOL_LES)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::LesionClassifier;
    use crate::config::CountConfig;
    use crate::data::morph_3d::{difference, LabelVolume, Mask3d};
    use crate::data::Geometry;
    use crate::Idx3d;
    use itertools::iproduct;

    const SHAPE: Idx3d = (10, 10, 20);

    fn paint(mask: &mut Mask3d, from: Idx3d, to: Idx3d) {
        for p in iproduct!(from.0..to.0, from.1..to.1, from.2..to.2) {
            mask[p] = true;
        }
    }

    fn summarize(baseline: &Mask3d, followup: &Mask3d) -> SummaryRecord {
        let config = CountConfig::default();
        let geometry = Geometry::from_spacing(SHAPE, [1.0; 3]).unwrap();
        let kernel = config.connectivity.kernel();
        let filter = |m: &Mask3d| {
            FilteredLabels::new(
                LabelVolume::label(m.view(), &kernel),
                geometry.voxel_volume(),
                config.min_size,
            )
        };
        let classifier = LesionClassifier::new(&config, &geometry);
        let growth = classifier.classify_mask(
            difference(followup.view(), baseline.view()).view(),
            baseline.view(),
            Direction::Growth,
        );
        let shrink = classifier.classify_mask(
            difference(baseline.view(), followup.view()).view(),
            followup.view(),
            Direction::Shrink,
        );
        SummaryRecord::aggregate(&filter(baseline), &filter(followup), &growth, &shrink)
    }

    #[test]
    fn test_aggregate() {
        let mut baseline = Mask3d::from_elem(SHAPE, false);
        paint(&mut baseline, (1, 1, 1), (3, 3, 3)); // 8, 被过滤
        paint(&mut baseline, (5, 5, 14), (8, 8, 17)); // 27, 随访中消失
        paint(&mut baseline, (1, 6, 6), (4, 9, 9)); // 27, 不变
        let mut followup = Mask3d::from_elem(SHAPE, false);
        paint(&mut followup, (0, 0, 0), (4, 4, 4)); // 64, 包围基线小病灶
        paint(&mut followup, (1, 6, 6), (4, 9, 9));
        paint(&mut followup, (6, 1, 6), (9, 4, 9)); // 27, 新增

        let s = summarize(&baseline, &followup);
        assert_eq!(s.baseline_count, 2);
        assert_eq!(s.baseline_volume, 54.0);
        assert_eq!(s.followup_count, 3);
        assert_eq!(s.followup_volume, 64.0 + 27.0 + 27.0);
        assert_eq!(s.growth_count, 2);
        assert_eq!(s.growth_volume, 56.0 + 27.0);
        assert_eq!(s.shrink_count, 1);
        assert_eq!(s.shrink_volume, 27.0);
        // 2 + 1 (新增) - 1 (消失)
        assert_eq!(s.effective_followup_count, 2);
    }

    #[test]
    fn test_no_change() {
        let mut mask = Mask3d::from_elem(SHAPE, false);
        paint(&mut mask, (1, 1, 1), (4, 4, 4));
        paint(&mut mask, (6, 6, 10), (9, 9, 13));

        let s = summarize(&mask, &mask);
        assert_eq!(s.baseline_count, 2);
        assert_eq!(s.followup_count, 2);
        assert_eq!(s.effective_followup_count, s.followup_count);
        assert_eq!(s.growth_count, 0);
        assert_eq!(s.shrink_count, 0);
        assert_eq!(s.growth_volume, 0.0);
        assert_eq!(s.shrink_volume, 0.0);
    }

    #[test]
    fn test_npz_round_trip() {
        let record = SummaryRecord {
            baseline_count: 4,
            baseline_volume: 120.5,
            followup_count: 6,
            effective_followup_count: 5,
            followup_volume: 180.25,
            growth_count: 2,
            growth_volume: 40.0,
            shrink_count: 1,
            shrink_volume: 15.75,
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(crate::consts::file::SUMMARY_NPZ);
        record.save_npz(&path).unwrap();

        let mut npz = NpzReader::new(File::open(&path).unwrap()).unwrap();
        assert_eq!(npz.len(), 9);
        let names = npz.names().unwrap();
        for name in ["bl_les", "fu_les_eff", "bl_min_fu_vol_les"] {
            assert!(
                names.iter().any(|n| n.trim_end_matches(".npy") == name),
                "{name} not in {names:?}"
            );
        }

        assert_eq!(SummaryRecord::load_npz(&path).unwrap(), record);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            SummaryRecord::load_npz(dir.path().join("missing.npz")),
            Err(InputError::Io { .. })
        ));
    }
}
