//! 数据集操作.
//!
//! 把 KiTS19, KiTS21 和 KiTS23 三个形态各异的原始目录统一为一个
//! nnU-Net raw 格式数据集.

use std::path::{Path, PathBuf};

pub mod layout;
pub mod manifest;
pub mod split;
mod unify;
pub mod variant;

pub use layout::DatasetLayout;
pub use manifest::{DatasetDescription, LabelMap, LabelValue};
pub use split::{NnUnetFold, Role, SplitManifest, SplitPlan, UnifiedId};
pub use unify::{unify, UnifyConfig, UnifyError, UnifyReport};
pub use variant::{gather_cases, Case, SourceVariant};

/// 获取 `{用户主目录}/dataset` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    Some(ans)
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = home_dataset_dir()?;
    ans.extend(it);
    Some(ans)
}
