//! 运行时错误.

use crate::Idx3d;
use std::path::PathBuf;
use thiserror::Error;

/// 配置错误. 在处理任何体数据之前检出.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// 连通规则只能为 6, 18 或 26.
    #[error("invalid connectivity {0}, expected one of 6, 18, 26")]
    InvalidConnectivity(u32),

    /// 最小体积必须是非负有限值.
    #[error("invalid minimum lesion size {0} mm^3")]
    InvalidMinSize(f64),

    /// 最大重叠比例必须在 `[0, 1]` 内.
    #[error("invalid maximum overlap fraction {0}, expected a value in [0, 1]")]
    InvalidOverlap(f64),

    /// 经验阈值必须是正有限值.
    #[error("invalid threshold `{name}` = {value}")]
    InvalidThreshold {
        /// 阈值名称.
        name: &'static str,
        /// 给定值.
        value: f64,
    },
}

/// 输入数据错误. 在连通域标记之前检出.
#[derive(Debug, Error)]
pub enum InputError {
    /// nifti 文件无法读取或格式错误.
    #[error("cannot read volume `{path}`: {source}")]
    Nifti {
        /// 文件路径.
        path: PathBuf,
        /// 底层错误.
        source: nifti::NiftiError,
    },

    /// 底层 I/O 错误.
    #[error("I/O error on `{path}`: {source}")]
    Io {
        /// 文件路径.
        path: PathBuf,
        /// 底层错误.
        source: std::io::Error,
    },

    /// npz 统计结果无法读取.
    #[error("cannot read npz record `{path}`: {source}")]
    Npz {
        /// 文件路径.
        path: PathBuf,
        /// 底层错误.
        source: ndarray_npy::ReadNpzError,
    },

    /// 体数据不是三维的.
    #[error("expected a 3D volume, got dimensions {0:?}")]
    NotVolume(Vec<usize>),

    /// 体素分辨率非法 (零, 负数或非有限值).
    #[error("invalid voxel resolution {0:?}")]
    InvalidResolution([f64; 3]),

    /// 基线与随访的数据形状不一致.
    #[error("shape mismatch: baseline {baseline:?}, follow-up {followup:?}")]
    ShapeMismatch {
        /// 基线形状.
        baseline: Idx3d,
        /// 随访形状.
        followup: Idx3d,
    },

    /// 基线与随访的仿射变换不一致.
    #[error("affine mismatch between baseline and follow-up (max deviation {0:.6})")]
    AffineMismatch(f64),
}

/// 结果写出错误.
#[derive(Debug, Error)]
pub enum OutputError {
    /// 底层 I/O 错误.
    #[error("I/O error on `{path}`: {source}")]
    Io {
        /// 文件路径.
        path: PathBuf,
        /// 底层错误.
        source: std::io::Error,
    },

    /// npz 文件写出错误.
    #[error("cannot write npz record: {0}")]
    Npz(#[from] ndarray_npy::WriteNpzError),

    /// nifti 文件写出错误.
    #[error("cannot write volume `{path}`: {source}")]
    Nifti {
        /// 文件路径.
        path: PathBuf,
        /// 底层错误.
        source: nifti::NiftiError,
    },

    /// 待写出的标签与参考体数据形状不一致.
    #[error("label shape {labels:?} does not match reference shape {reference:?}")]
    ShapeMismatch {
        /// 标签形状.
        labels: Idx3d,
        /// 参考形状.
        reference: Idx3d,
    },
}

/// 本 crate 的顶层错误.
#[derive(Debug, Error)]
pub enum Error {
    /// 配置错误.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// 输入错误.
    #[error(transparent)]
    Input(#[from] InputError),

    /// 输出错误.
    #[error(transparent)]
    Output(#[from] OutputError),
}

/// 本 crate 的通用返回类型.
pub type Result<T> = std::result::Result<T, Error>;
