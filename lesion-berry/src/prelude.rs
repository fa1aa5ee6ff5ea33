//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::Idx3d;

pub use crate::data::morph_3d::{Connectivity, LabelVolume, Mask3d};
pub use crate::data::{Geometry, NiftiHeaderAttr, SegVolume};

pub use crate::classify::{Category, Direction, LesionClassifier, LesionEvent, PassOutcome, Verdict};
pub use crate::config::{CountConfig, Thresholds};
pub use crate::size::{ComponentSizes, FilteredLabels, KeepMask};

pub use crate::consts::label::SAMSEG_LESION;

pub use crate::error::{Error, Result};
pub use crate::pipeline::{compare, compare_masks, Comparison};
pub use crate::summary::SummaryRecord;
