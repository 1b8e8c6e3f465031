//! 默认目录解析. 优先读取环境变量, 否则回退到 `$HOME/dataset/...`.

use kits_berry::dataset::home_dataset_dir_with;
use std::env;
use std::path::PathBuf;

/// 1. 若环境变量 `var` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/{rest...}`;
/// 3. 无法确定主目录时, 返回相对路径 `dataset/{rest...}`.
pub fn dir_from_env_or_home(var: &str, rest: &[&str]) -> PathBuf {
    match env::var(var) {
        Ok(d) if !d.is_empty() => PathBuf::from(d),
        _ => home_dataset_dir_with(rest)
            .unwrap_or_else(|| ["dataset"].iter().chain(rest).collect()),
    }
}

/// KiTS19 根目录: `$KITS19_DIR` 或 `$HOME/dataset/kits19/data`.
pub fn kits19_dir() -> PathBuf {
    dir_from_env_or_home("KITS19_DIR", &["kits19", "data"])
}

/// KiTS21 根目录: `$KITS21_DIR` 或 `$HOME/dataset/kits21/data`.
pub fn kits21_dir() -> PathBuf {
    dir_from_env_or_home("KITS21_DIR", &["kits21", "data"])
}

/// KiTS23 根目录: `$KITS23_DIR` 或 `$HOME/dataset/kits23/dataset`.
pub fn kits23_dir() -> PathBuf {
    dir_from_env_or_home("KITS23_DIR", &["kits23", "dataset"])
}

/// nnU-Net raw 根目录: `$nnUNet_raw` 或 `$HOME/dataset/nnUNet_raw`.
pub fn nnunet_raw_dir() -> PathBuf {
    dir_from_env_or_home("nnUNet_raw", &["nnUNet_raw"])
}

#[cfg(test)]
mod tests {
    use super::dir_from_env_or_home;
    use std::path::PathBuf;

    #[test]
    fn test_fallback_ends_with_rest() {
        let p = dir_from_env_or_home("KITS_BERRY_SURELY_UNSET_VAR", &["kits19", "data"]);
        assert!(p.ends_with(PathBuf::from("dataset/kits19/data")));
    }
}
