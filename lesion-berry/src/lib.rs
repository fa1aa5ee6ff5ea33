#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 比较同一受试者两个时间点 (基线, 随访) 的脑部分割结果,
//! 统计白质病灶的个数与体积, 并对差异区域进行分类.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 该 crate 目前主要面向 SAMSEG 分割结果 (病灶标签值为 99). 其它分割工具的结果,
//!   只要以标签体数据形式给出, 也可以通过 [`CountConfig::lesion_label`] 指定病灶标签.
//! 2. 基线与随访必须已配准到同一体素网格. 程序只检查, 不负责配准.
//! 3. 在非期望情况下 (例如越界标签), 程序会直接 panic, 而不会导致内存错误.
//!
//! # 流程
//!
//! ### 连通域标记与最小体积过滤 ✅
//!
//! 6/18/26-连通规则下的三维连通域标记, 以物理体积 (立方毫米) 过滤小病灶.
//!
//! 实现位于 `lesion-berry/src/data/morph_3d` 和 `lesion-berry/src/size.rs`.
//!
//! ### 差异区域分类 ✅
//!
//! 随访减基线 (增长) 与基线减随访 (缩小) 两个方向共用同一流程:
//!
//! 1. 预过滤: 体积不超过 `0.7 * 最小体积` 的差异区域直接丢弃.
//! 2. 填洞: 填洞后体积明显增加, 说明差异区域是包围原病灶的边缘, 即原位增大/缩小.
//! 3. 最小体积: 其余差异区域体积不足时剔除.
//! 4. 形状与接触: 内部距离足够大, 且膨胀一个体素后与另一时间点病灶重叠较少,
//!   则为新增/消失病灶, 否则剔除.
//!
//! 实现位于 `lesion-berry/src/classify.rs`.
//!
//! ### 精确欧氏距离变换 ✅
//!
//! 支持各向异性体素间距, 逐轴一维下包络算法, 复杂度与体素个数线性相关.
//!
//! 实现位于 `lesion-berry/src/data/morph_3d/edt.rs`.
//!
//! ### 汇总与输出 ✅
//!
//! 九项统计结果写为 npz 文件, 字段名与已有的下游统计脚本兼容;
//! 可选写出过滤后的四个病灶标签 nii 文件.
//!
//! 实现位于 `lesion-berry/src/summary.rs` 和 `lesion-berry/src/pipeline.rs`.

/// 三维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// nii 文件基础数据结构与三维形态学操作.
pub mod data;

pub mod classify;
pub mod config;
pub mod consts;
pub mod error;
pub mod pipeline;
pub mod prelude;
pub mod size;
pub mod summary;

pub use config::{CountConfig, Thresholds};
pub use data::{Geometry, NiftiHeaderAttr, SegVolume};
pub use error::{Error, Result};
pub use pipeline::{compare, compare_masks, Comparison};
pub use summary::SummaryRecord;
