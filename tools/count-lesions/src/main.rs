//! 纵向病灶计数工具.
//!
//! 读取同一受试者基线与随访的 SAMSEG 分割结果, 统计两个时间点的病灶个数与体积,
//! 并将差异区域分类为新增, 增大, 消失, 缩小病灶. 结果写入输出目录下的
//! `lesion_count_and_total_volume.npz`, 可选写出过滤后的病灶标签.

mod args;
mod result;
mod runner;

use std::process;

use clap::Parser;
use log::{error, LevelFilter};
use simple_logger::SimpleLogger;

fn main() {
    let args = args::Args::parse();

    let level = if args.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("cannot initialize logger: {e}");
    }

    match runner::run(&args) {
        Ok(cmp) => {
            if let Err(e) = result::report(&cmp) {
                error!("cannot print report: {e}");
                process::exit(1);
            }
            println!("Done!");
        }
        Err(e) => {
            error!("{e}");
            process::exit(1);
        }
    }
}
