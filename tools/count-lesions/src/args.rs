//! 命令行参数.

use std::path::PathBuf;

use clap::Parser;
use lesion_berry::consts::{label, threshold};
use lesion_berry::error::ConfigError;
use lesion_berry::CountConfig;

/// 比较同一受试者两个时间点的 SAMSEG 分割结果, 统计病灶个数与体积变化.
#[derive(Parser, Debug)]
#[command(name = "count-lesions")]
#[command(version)]
pub struct Args {
    /// 基线分割结果 (nii / nii.gz)
    #[arg(short, long, value_name = "FILE")]
    pub baseline: PathBuf,

    /// 随访分割结果 (nii / nii.gz), 须与基线处于同一体素网格
    #[arg(short, long, value_name = "FILE")]
    pub followup: PathBuf,

    /// 输出目录, 不存在时自动创建
    #[arg(short, long, value_name = "DIR")]
    pub output: PathBuf,

    /// 额外保存过滤后的四个病灶标签文件
    #[arg(long)]
    pub save_images: bool,

    /// 病灶最小体积 (mm^3)
    #[arg(long, default_value_t = threshold::MIN_SIZE_MM3)]
    pub min_size: f64,

    /// 连通规则: 6, 18 或 26
    #[arg(long, default_value_t = threshold::CONNECTIVITY)]
    pub connectivity: u32,

    /// 新增/消失病灶与另一时间点病灶的最大重叠比例
    #[arg(long, default_value_t = threshold::MAX_OVERLAP)]
    pub max_overlap: f64,

    /// 分割结果中病灶的标签值
    #[arg(long, default_value_t = label::SAMSEG_LESION)]
    pub lesion_label: i32,

    /// 输出逐个连通域的分类过程
    #[arg(long)]
    pub debug: bool,
}

impl Args {
    /// 转换为库参数并检查合法性.
    pub fn to_config(&self) -> Result<CountConfig, ConfigError> {
        let config = CountConfig {
            min_size: self.min_size,
            max_overlap: self.max_overlap,
            lesion_label: self.lesion_label,
            ..CountConfig::with_connectivity(self.connectivity)?
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lesion_berry::data::morph_3d::Connectivity;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from([
            "count-lesions",
            "-b",
            "bl.nii.gz",
            "-f",
            "fu.nii.gz",
            "-o",
            "out",
        ]);
        assert!(!args.save_images);
        assert!(!args.debug);
        assert_eq!(args.to_config().unwrap(), CountConfig::default());
    }

    #[test]
    fn test_overrides() {
        let args = Args::parse_from([
            "count-lesions",
            "--baseline",
            "bl.nii",
            "--followup",
            "fu.nii",
            "--output",
            "out",
            "--connectivity",
            "26",
            "--min-size",
            "10",
            "--max-overlap",
            "0.5",
            "--lesion-label",
            "77",
            "--save-images",
        ]);
        assert!(args.save_images);
        let config = args.to_config().unwrap();
        assert_eq!(config.connectivity, Connectivity::Vertex26);
        assert_eq!(config.min_size, 10.0);
        assert_eq!(config.max_overlap, 0.5);
        assert_eq!(config.lesion_label, 77);
    }

    #[test]
    fn test_invalid_connectivity() {
        let args = Args::parse_from([
            "count-lesions",
            "-b",
            "a",
            "-f",
            "b",
            "-o",
            "c",
            "--connectivity",
            "8",
        ]);
        assert_eq!(args.to_config(), Err(ConfigError::InvalidConnectivity(8)));
    }
}
