//! 程序运行函数.

use std::fs;

use lesion_berry::error::OutputError;
use lesion_berry::pipeline::{self, Comparison};
use lesion_berry::{NiftiHeaderAttr, Result, SegVolume};
use log::info;

use crate::args::Args;

/// 实际运行: 读取两个时间点, 比较, 写出结果.
pub fn run(args: &Args) -> Result<Comparison> {
    let config = args.to_config()?;

    let baseline = SegVolume::open(&args.baseline)?;
    let followup = SegVolume::open(&args.followup)?;
    info!(
        "loaded baseline `{}` {:?} and follow-up `{}` {:?}",
        args.baseline.display(),
        baseline.shape(),
        args.followup.display(),
        followup.shape(),
    );

    let cmp = pipeline::compare(&baseline, &followup, &config)?;

    fs::create_dir_all(&args.output).map_err(|source| OutputError::Io {
        path: args.output.clone(),
        source,
    })?;
    cmp.save_summary(&args.output)?;
    if args.save_images {
        // 输出标签均以基线的 header 和仿射变换为准.
        cmp.save_images(&args.output, &baseline)?;
    }
    Ok(cmp)
}
