//! 运行参数.

use crate::consts::{label, threshold};
use crate::data::morph_3d::Connectivity;
use crate::error::ConfigError;

/// 分类过程中使用的经验阈值.
///
/// 这些值没有一般性的推导, 默认值为经验值, 仅在明确需要时覆盖.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Thresholds {
    /// 预过滤比例, 见 [`threshold::PREFILTER_RATIO`].
    pub prefilter_ratio: f64,

    /// 空洞比例, 见 [`threshold::HOLE_RATIO`].
    pub hole_ratio: f64,

    /// 距离因子, 见 [`threshold::DISTANCE_FACTOR`].
    pub distance_factor: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            prefilter_ratio: threshold::PREFILTER_RATIO,
            hole_ratio: threshold::HOLE_RATIO,
            distance_factor: threshold::DISTANCE_FACTOR,
        }
    }
}

/// 病灶计数参数.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CountConfig {
    /// 病灶最小体积, 单位为立方毫米.
    pub min_size: f64,

    /// 连通域连通规则.
    pub connectivity: Connectivity,

    /// 新增/消失病灶与另一时间点病灶的最大重叠比例.
    pub max_overlap: f64,

    /// 分割结果中病灶的标签值.
    pub lesion_label: i32,

    /// 经验阈值.
    pub thresholds: Thresholds,
}

impl Default for CountConfig {
    fn default() -> Self {
        Self {
            min_size: threshold::MIN_SIZE_MM3,
            connectivity: Connectivity::default(),
            max_overlap: threshold::MAX_OVERLAP,
            lesion_label: label::SAMSEG_LESION,
            thresholds: Thresholds::default(),
        }
    }
}

impl CountConfig {
    /// 以给定连通规则阶数 (6, 18 或 26) 创建, 其余参数取默认值.
    pub fn with_connectivity(order: u32) -> Result<Self, ConfigError> {
        Ok(Self {
            connectivity: Connectivity::try_from(order)?,
            ..Default::default()
        })
    }

    /// 检查参数合法性.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_size.is_finite() && self.min_size >= 0.0) {
            return Err(ConfigError::InvalidMinSize(self.min_size));
        }
        if !(0.0..=1.0).contains(&self.max_overlap) {
            return Err(ConfigError::InvalidOverlap(self.max_overlap));
        }
        let Thresholds {
            prefilter_ratio,
            hole_ratio,
            distance_factor,
        } = self.thresholds;
        for (name, value) in [
            ("prefilter_ratio", prefilter_ratio),
            ("hole_ratio", hole_ratio),
            ("distance_factor", distance_factor),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidThreshold { name, value });
            }
        }
        Ok(())
    }

    /// 预过滤体积阈值 `prefilter_ratio * min_size`.
    #[inline]
    pub fn prefilter_size(&self) -> f64 {
        self.thresholds.prefilter_ratio * self.min_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = CountConfig::default();
        assert_eq!(c.min_size, 15.0);
        assert_eq!(c.connectivity, Connectivity::Edge18);
        assert_eq!(c.max_overlap, 0.3);
        assert_eq!(c.lesion_label, 99);
        assert!((c.prefilter_size() - 10.5).abs() < 1e-12);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_with_connectivity() {
        assert_eq!(
            CountConfig::with_connectivity(6).unwrap().connectivity,
            Connectivity::Face6
        );
        assert_eq!(
            CountConfig::with_connectivity(19),
            Err(ConfigError::InvalidConnectivity(19))
        );
    }

    #[test]
    fn test_validate() {
        let bad_size = CountConfig {
            min_size: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(
            bad_size.validate(),
            Err(ConfigError::InvalidMinSize(_))
        ));

        let bad_overlap = CountConfig {
            max_overlap: 1.5,
            ..Default::default()
        };
        assert_eq!(
            bad_overlap.validate(),
            Err(ConfigError::InvalidOverlap(1.5))
        );

        let mut bad_ratio = CountConfig::default();
        bad_ratio.thresholds.hole_ratio = 0.0;
        assert_eq!(
            bad_ratio.validate(),
            Err(ConfigError::InvalidThreshold {
                name: "hole_ratio",
                value: 0.0
            })
        );
    }
}
