//! 原始数据集变体与病例收集.
//!
//! 三个 KiTS 版本的目录组织方式大同小异, 差异仅在于标注文件名以及
//! 文件是否可能放在嵌套子目录中. 这里用一条配置记录描述每个变体,
//! 并由同一个扫描例程处理.

use std::fs;
use std::path::{Path, PathBuf};

use itertools::Itertools;

use crate::consts::naming::{
    AGGREGATED_MAJ_SEG, CASE_PREFIX, IMAGING, RAW_SUBDIR, SEGMENTATION,
};

/// 一个原始数据集变体的文件发现规则.
///
/// `imaging` 与 `label` 是相对于病例目录的候选路径, 按顺序尝试,
/// 第一个存在的文件胜出.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceVariant {
    /// 来源标记, 例如 `"kits19"`.
    pub tag: &'static str,

    /// 病例子目录必须带有的前缀.
    pub prefix: &'static str,

    /// CT 扫描文件的候选相对路径.
    pub imaging: Vec<PathBuf>,

    /// 标注文件的候选相对路径.
    pub label: Vec<PathBuf>,
}

impl SourceVariant {
    /// KiTS19: `case_XXXXX/{imaging, segmentation}.nii.gz`.
    pub fn kits19() -> Self {
        Self {
            tag: "kits19",
            prefix: CASE_PREFIX,
            imaging: vec![PathBuf::from(IMAGING)],
            label: vec![PathBuf::from(SEGMENTATION)],
        }
    }

    /// KiTS21: 标注使用多数投票聚合后的 `aggregated_MAJ_seg.nii.gz`.
    pub fn kits21() -> Self {
        Self {
            tag: "kits21",
            prefix: CASE_PREFIX,
            imaging: vec![PathBuf::from(IMAGING)],
            label: vec![PathBuf::from(AGGREGATED_MAJ_SEG)],
        }
    }

    /// KiTS23: 文件可能直接位于病例目录下, 也可能位于 `raw/` 子目录下.
    pub fn kits23() -> Self {
        let raw = |name: &str| [RAW_SUBDIR, name].iter().collect::<PathBuf>();
        Self {
            tag: "kits23",
            prefix: CASE_PREFIX,
            imaging: vec![PathBuf::from(IMAGING), raw(IMAGING)],
            label: vec![PathBuf::from(SEGMENTATION), raw(SEGMENTATION)],
        }
    }

    /// 在 `case_dir` 下按顺序寻找第一个存在的扫描文件.
    #[inline]
    pub fn locate_imaging(&self, case_dir: &Path) -> Option<PathBuf> {
        first_existing(case_dir, &self.imaging)
    }

    /// 在 `case_dir` 下按顺序寻找第一个存在的标注文件.
    #[inline]
    pub fn locate_label(&self, case_dir: &Path) -> Option<PathBuf> {
        first_existing(case_dir, &self.label)
    }
}

fn first_existing(case_dir: &Path, candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates
        .iter()
        .map(|rel| case_dir.join(rel))
        .find(|p| p.is_file())
}

/// 一个被接受的病例. 收集完成后不再改变.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Case {
    /// 来源变体标记.
    pub source: &'static str,

    /// 原始病例目录.
    pub case_dir: PathBuf,

    /// CT 扫描文件.
    pub imaging: PathBuf,

    /// 标注文件.
    pub segmentation: PathBuf,
}

/// 收集 `root` 下所有符合 `variant` 规则的病例.
///
/// 子目录按名称字典序遍历. 缺少扫描或标注文件的病例会被跳过并记录警告.
/// `root` 不存在或不可读时返回空集合, 不视为错误.
pub fn gather_cases<P: AsRef<Path>>(variant: &SourceVariant, root: P) -> Vec<Case> {
    let root = root.as_ref();
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!(
                "[{}] cannot read source root {}: {e}",
                variant.tag,
                root.display()
            );
            return Vec::new();
        }
    };

    let case_dirs = entries
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with(variant.prefix))
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .sorted();

    let mut cases = Vec::new();
    for case_dir in case_dirs {
        match (variant.locate_imaging(&case_dir), variant.locate_label(&case_dir)) {
            (Some(imaging), Some(segmentation)) => cases.push(Case {
                source: variant.tag,
                case_dir,
                imaging,
                segmentation,
            }),
            (imaging, _) => {
                let missing = if imaging.is_none() { "imaging" } else { "label" };
                log::warn!(
                    "[{}] {missing} file not found in {}, case skipped",
                    variant.tag,
                    case_dir.display()
                );
            }
        }
    }

    log::info!("[{}] {} cases gathered from {}", variant.tag, cases.len(), root.display());
    cases
}

#[cfg(test)]
mod tests {
    use super::{gather_cases, SourceVariant};
    use std::fs;
    use std::path::Path;

    fn touch(p: &Path) {
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, b"nii").unwrap();
    }

    #[test]
    fn test_gather_kits19_skips_incomplete() {
        let root = tempfile::tempdir().unwrap();
        let r = root.path();
        touch(&r.join("case_00001/imaging.nii.gz"));
        touch(&r.join("case_00001/segmentation.nii.gz"));
        touch(&r.join("case_00000/imaging.nii.gz"));
        touch(&r.join("case_00000/segmentation.nii.gz"));
        // 缺少标注.
        touch(&r.join("case_00002/imaging.nii.gz"));
        // 前缀不符.
        touch(&r.join("other/imaging.nii.gz"));
        touch(&r.join("other/segmentation.nii.gz"));
        // 普通文件而非目录.
        touch(&r.join("case_00003.nii.gz"));

        let cases = gather_cases(&SourceVariant::kits19(), r);
        assert_eq!(cases.len(), 2);
        assert!(cases[0].case_dir.ends_with("case_00000"));
        assert!(cases[1].case_dir.ends_with("case_00001"));
        assert!(cases.iter().all(|c| c.source == "kits19"));
    }

    #[test]
    fn test_gather_kits21_uses_aggregated_label() {
        let root = tempfile::tempdir().unwrap();
        let r = root.path();
        touch(&r.join("case_00000/imaging.nii.gz"));
        touch(&r.join("case_00000/segmentation.nii.gz"));
        touch(&r.join("case_00001/imaging.nii.gz"));
        touch(&r.join("case_00001/aggregated_MAJ_seg.nii.gz"));

        let cases = gather_cases(&SourceVariant::kits21(), r);
        assert_eq!(cases.len(), 1);
        assert!(cases[0].segmentation.ends_with("aggregated_MAJ_seg.nii.gz"));
    }

    #[test]
    fn test_gather_kits23_raw_fallback() {
        let root = tempfile::tempdir().unwrap();
        let r = root.path();
        touch(&r.join("case_00000/raw/imaging.nii.gz"));
        touch(&r.join("case_00000/segmentation.nii.gz"));
        touch(&r.join("case_00001/imaging.nii.gz"));
        touch(&r.join("case_00001/raw/imaging.nii.gz"));
        touch(&r.join("case_00001/raw/segmentation.nii.gz"));

        let cases = gather_cases(&SourceVariant::kits23(), r);
        assert_eq!(cases.len(), 2);
        assert!(cases[0].imaging.ends_with("raw/imaging.nii.gz"));
        assert!(!cases[0].segmentation.ends_with("raw/segmentation.nii.gz"));
        // 主目录优先于 `raw/`.
        assert_eq!(cases[1].imaging, r.join("case_00001/imaging.nii.gz"));
        assert!(cases[1].segmentation.ends_with("raw/segmentation.nii.gz"));
    }

    #[test]
    fn test_gather_missing_root_is_empty() {
        let root = tempfile::tempdir().unwrap();
        let cases = gather_cases(&SourceVariant::kits19(), root.path().join("nope"));
        assert!(cases.is_empty());
    }
}
