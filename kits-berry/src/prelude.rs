//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::Idx3d;

pub use crate::data::{LabelVolume, NiftiHeaderAttr};

pub use crate::consts::gray::{KITS_BACKGROUND, KITS_CYST, KITS_KIDNEY, KITS_TUMOR};
pub use crate::consts::{DEFAULT_NUM_CLASSES, DEFAULT_SPLIT_SEED};

pub use crate::dataset::home_dataset_dir_with;
pub use crate::dataset::{unify, Case, Role, SourceVariant, UnifyConfig, UnifyError};

pub use crate::eval::{evaluate, ClassSpec, EvalError, HoldoutConfig, HoldoutReport};

pub use crate::lr::{LrPolicy, LrScheduler, TrainerPreset};
