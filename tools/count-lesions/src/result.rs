//! 统计结果报告.

use std::io::{self, Write};

use lesion_berry::classify::Category;
use lesion_berry::pipeline::Comparison;

const SEP: &str = "--------------------------------------------------------";

/// 将 `cmp` 的统计结果写进 `w` 中.
pub fn describe_into<W: Write>(cmp: &Comparison, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    let s = cmp.summary();
    let (growth, shrink) = (cmp.growth(), cmp.shrink());

    writeln!(w, "{SEP}")?;
    writeln!(w, "Number of lesions baseline (bl): {}", s.baseline_count)?;
    writeln!(w, "{S4}Total lesion volume: {:.3} mm^3", s.baseline_volume)?;
    writeln!(w, "Number of lesions followup (fu): {}", s.followup_count)?;
    writeln!(w, "{S4}Total lesion volume: {:.3} mm^3", s.followup_volume)?;
    writeln!(
        w,
        "Number of lesions fu - bl: new: {} enlarging: {} tot: {}",
        growth.count(Category::New),
        growth.count(Category::Enlarging),
        s.growth_count,
    )?;
    writeln!(w, "{S4}Total lesion volume: {:.3} mm^3", s.growth_volume)?;
    writeln!(
        w,
        "Number of lesions bl - fu: disappearing: {} shrinking: {} tot: {}",
        shrink.count(Category::Disappearing),
        shrink.count(Category::Shrinking),
        s.shrink_count,
    )?;
    writeln!(w, "{S4}Total lesion volume: {:.3} mm^3", s.shrink_volume)?;
    writeln!(
        w,
        "Effective number of followup lesions: {}",
        s.effective_followup_count
    )?;
    write!(w, "{SEP}")?;
    Ok(())
}

/// 将统计结果打印到标准输出.
pub fn report(cmp: &Comparison) -> io::Result<()> {
    let mut buf = Vec::with_capacity(512);
    describe_into(cmp, &mut buf)?;
    let mut out = io::stdout().lock();
    out.write_all(&buf)?;
    writeln!(out)
}
