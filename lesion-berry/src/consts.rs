//! 通用常量.

/// 分割标签值.
pub mod label {
    /// SAMSEG 分割结果中, 白质病灶的体素值.
    pub const SAMSEG_LESION: i32 = 99;
}

/// 默认阈值. 均可在 [`crate::CountConfig`] 中覆盖.
pub mod threshold {
    /// 病灶最小体积, 单位为立方毫米.
    pub const MIN_SIZE_MM3: f64 = 15.0;

    /// 默认连通规则 (同 MSSeg 挑战赛).
    pub const CONNECTIVITY: u32 = 18;

    /// 新增/消失病灶膨胀一个体素后, 与另一时间点病灶重叠体素数的上限,
    /// 以自身体积的比例表示.
    pub const MAX_OVERLAP: f64 = 0.3;

    /// 预过滤比例. 体积不超过 `PREFILTER_RATIO * min_size` 的差异区域直接丢弃.
    ///
    /// 该值小于 1, 从而保留填洞后才会超过阈值的环状差异区域.
    pub const PREFILTER_RATIO: f64 = 0.7;

    /// 空洞比例. 填洞后新增体积超过填充体积的该比例时, 认为差异区域是病灶边缘.
    pub const HOLE_RATIO: f64 = 0.05;

    /// 距离因子. 差异区域内最大距离需超过 `DISTANCE_FACTOR * 单体素体积`.
    pub const DISTANCE_FACTOR: f64 = 1.1;
}

/// 输出文件名.
pub mod file {
    /// 统计结果 npz 文件.
    pub const SUMMARY_NPZ: &str = "lesion_count_and_total_volume.npz";

    /// 基线病灶标签.
    pub const BASELINE_LESIONS: &str = "bl_lesions.nii.gz";

    /// 随访病灶标签.
    pub const FOLLOWUP_LESIONS: &str = "fu_lesions.nii.gz";

    /// 随访减基线 (增长) 差异标签.
    pub const GROWTH_LESIONS: &str = "fu_min_bl_lesions.nii.gz";

    /// 基线减随访 (缩小) 差异标签.
    pub const SHRINK_LESIONS: &str = "bl_min_fu_lesions.nii.gz";
}
