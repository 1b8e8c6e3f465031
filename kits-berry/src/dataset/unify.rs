//! 数据集统一转换主流程.

use std::io;
use std::path::{Path, PathBuf};

use crate::consts::naming::TASK_NAME;
use crate::consts::DEFAULT_SPLIT_SEED;
use crate::dataset::layout::{copy_atomic, DatasetLayout};
use crate::dataset::manifest::DatasetDescription;
use crate::dataset::split::{split_sizes, write_json_4, Role, SplitManifest, SplitPlan, UnifiedId};
use crate::dataset::variant::{gather_cases, Case, SourceVariant};

/// 统一转换配置.
#[derive(Debug, Clone)]
pub struct UnifyConfig {
    /// (变体, 源根目录) 列表. 病例按该顺序合并.
    pub sources: Vec<(SourceVariant, PathBuf)>,

    /// nnU-Net raw 根目录, 数据集文件夹会建在它下面.
    pub output_base: PathBuf,

    /// 数据集编号.
    pub dataset_id: u32,

    /// 打乱种子.
    pub seed: u64,

    /// 是否额外写出 nnU-Net 的 `splits_final.json`.
    pub write_nnunet_fold: bool,
}

impl UnifyConfig {
    /// 按 KiTS19, KiTS21, KiTS23 的顺序合并三个数据集.
    pub fn kits<P: Into<PathBuf>>(kits19: P, kits21: P, kits23: P, output_base: P) -> Self {
        Self {
            sources: vec![
                (SourceVariant::kits19(), kits19.into()),
                (SourceVariant::kits21(), kits21.into()),
                (SourceVariant::kits23(), kits23.into()),
            ],
            output_base: output_base.into(),
            dataset_id: 1,
            seed: DEFAULT_SPLIT_SEED,
            write_nnunet_fold: false,
        }
    }
}

/// 统一转换错误.
#[derive(Debug, thiserror::Error)]
pub enum UnifyError {
    /// 所有源都没有贡献任何有效病例.
    #[error("no valid case found in any source root")]
    NoCases,

    /// 无法建立输出目录.
    #[error("failed to create output directories under {path}: {source}")]
    CreateDir {
        /// 数据集根目录.
        path: PathBuf,
        /// 底层错误.
        source: io::Error,
    },

    /// 复制文件失败.
    #[error("failed to copy {from} to {to}: {source}")]
    Copy {
        /// 源文件.
        from: PathBuf,
        /// 目标文件.
        to: PathBuf,
        /// 底层错误.
        source: io::Error,
    },

    /// 写出 JSON 记录失败.
    #[error("failed to write {path}: {source}")]
    WriteManifest {
        /// 记录文件.
        path: PathBuf,
        /// 底层错误.
        source: io::Error,
    },
}

/// 一次转换的结果.
#[derive(Debug, Clone)]
pub struct UnifyReport {
    /// 输出布局.
    pub layout: DatasetLayout,

    /// 写出的划分记录.
    pub manifest: SplitManifest,

    /// 写出的数据集描述.
    pub description: DatasetDescription,

    /// 统一编号与原始病例的对应关系, 按编号升序.
    pub assignments: Vec<(UnifiedId, Role, Case)>,
}

impl UnifyReport {
    /// 角色为 `role` 的病例个数.
    pub fn count(&self, role: Role) -> usize {
        self.assignments.iter().filter(|(_, r, _)| *r == role).count()
    }
}

fn copy_into(from: &Path, to: PathBuf) -> Result<(), UnifyError> {
    copy_atomic(from, &to)
        .map(|_| ())
        .map_err(|source| UnifyError::Copy {
            from: from.to_owned(),
            to,
            source,
        })
}

fn write_record<T: serde::Serialize>(path: PathBuf, value: &T) -> Result<(), UnifyError> {
    if let Err(source) = write_json_4(&path, value) {
        return Err(UnifyError::WriteManifest { path, source });
    }
    log::info!("written {}", path.display());
    Ok(())
}

/// 执行统一转换.
///
/// 1. 依次收集每个源的病例并合并;
/// 2. 以固定种子打乱, 按 60/20/20 划分, 从 0 连续编号;
/// 3. 训练与验证病例复制扫描和标注到 `imagesTr/labelsTr`,
///   测试病例只复制扫描到 `imagesTs`;
/// 4. 写出 `splits.json` 和 `dataset.json`.
///
/// 没有任何有效病例时返回 [`UnifyError::NoCases`], 且不会写出任何文件.
pub fn unify(config: &UnifyConfig) -> Result<UnifyReport, UnifyError> {
    let all_cases: Vec<Case> = config
        .sources
        .iter()
        .flat_map(|(variant, root)| gather_cases(variant, root))
        .collect();
    log::info!("total cases found: {}", all_cases.len());
    if all_cases.is_empty() {
        return Err(UnifyError::NoCases);
    }

    let (n_train, n_val, n_test) = split_sizes(all_cases.len());
    log::info!("split: {n_train} train, {n_val} validation, {n_test} test");
    let plan = SplitPlan::new(all_cases, config.seed);

    let layout = DatasetLayout::new(&config.output_base, config.dataset_id, TASK_NAME);
    layout
        .create_dirs()
        .map_err(|source| UnifyError::CreateDir {
            path: layout.root().to_owned(),
            source,
        })?;

    for (id, role, case) in plan.iter() {
        if role.has_label() {
            copy_into(&case.imaging, layout.train_image(*id))?;
            copy_into(&case.segmentation, layout.train_label(*id))?;
        } else {
            copy_into(&case.imaging, layout.test_image(*id))?;
        }
        log::debug!("{id} <- [{}] {} ({role})", case.source, case.case_dir.display());
    }

    let manifest = plan.manifest();
    write_record(layout.splits_json(), &manifest)?;
    if config.write_nnunet_fold {
        write_record(layout.splits_final_json(), &manifest.to_nnunet_fold())?;
    }

    let mut description = DatasetDescription::kits(n_train + n_val);
    description.file_ending = layout.file_ending().to_owned();
    write_record(layout.dataset_json(), &description)?;

    Ok(UnifyReport {
        layout,
        manifest,
        description,
        assignments: plan.iter().cloned().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::{unify, UnifyConfig, UnifyError};
    use crate::dataset::manifest::DatasetDescription;
    use crate::dataset::split::{Role, SplitManifest};
    use std::fs;
    use std::path::Path;

    fn touch(p: &Path, content: &str) {
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, content).unwrap();
    }

    /// 在 `root` 下建立 kits19/21/23 三个源, 总共 10 个完整病例和 2 个不完整病例.
    fn make_sources(root: &Path) -> UnifyConfig {
        let k19 = root.join("kits19/data");
        let k21 = root.join("kits21/data");
        let k23 = root.join("kits23/dataset");
        for i in 0..4 {
            let c = k19.join(format!("case_{i:05}"));
            touch(&c.join("imaging.nii.gz"), &format!("19-img-{i}"));
            touch(&c.join("segmentation.nii.gz"), &format!("19-seg-{i}"));
        }
        for i in 0..3 {
            let c = k21.join(format!("case_{i:05}"));
            touch(&c.join("imaging.nii.gz"), &format!("21-img-{i}"));
            touch(&c.join("aggregated_MAJ_seg.nii.gz"), &format!("21-seg-{i}"));
        }
        // 只有原始标注, 没有聚合标注.
        touch(&k21.join("case_00099/imaging.nii.gz"), "21-img-99");
        touch(&k21.join("case_00099/segmentation.nii.gz"), "21-seg-99");
        for i in 0..3 {
            let c = k23.join(format!("case_{i:05}"));
            touch(&c.join("raw/imaging.nii.gz"), &format!("23-img-{i}"));
            touch(&c.join("segmentation.nii.gz"), &format!("23-seg-{i}"));
        }
        touch(&k23.join("case_00042/raw/imaging.nii.gz"), "23-img-42");

        UnifyConfig::kits(k19, k21, k23, root.join("nnUNet_raw"))
    }

    #[test]
    fn test_unify_end_to_end() {
        let root = tempfile::tempdir().unwrap();
        let config = make_sources(root.path());
        let report = unify(&config).unwrap();

        assert_eq!(report.assignments.len(), 10);
        assert_eq!(report.count(Role::Train), 6);
        assert_eq!(report.count(Role::Validation), 2);
        assert_eq!(report.count(Role::Test), 2);
        assert!(report
            .assignments
            .iter()
            .all(|(_, _, c)| !c.case_dir.ends_with("case_00099") && !c.case_dir.ends_with("case_00042")));

        let layout = &report.layout;
        assert!(layout.root().ends_with("Dataset001_Kits"));

        let manifest = SplitManifest::read(layout.splits_json()).unwrap();
        assert_eq!(manifest, report.manifest);
        assert_eq!(manifest.len(), 10);

        for (id, role, case) in &report.assignments {
            assert_eq!(manifest.role_of(*id), Some(*role));
            let img_src = fs::read_to_string(&case.imaging).unwrap();
            match role {
                Role::Train | Role::Validation => {
                    assert_eq!(fs::read_to_string(layout.train_image(*id)).unwrap(), img_src);
                    assert_eq!(
                        fs::read_to_string(layout.train_label(*id)).unwrap(),
                        fs::read_to_string(&case.segmentation).unwrap()
                    );
                    assert!(!layout.test_image(*id).exists());
                }
                Role::Test => {
                    assert_eq!(fs::read_to_string(layout.test_image(*id)).unwrap(), img_src);
                    assert!(!layout.train_image(*id).exists());
                    assert!(!layout.train_label(*id).exists());
                }
            }
        }

        assert_eq!(fs::read_dir(layout.images_tr()).unwrap().count(), 8);
        assert_eq!(fs::read_dir(layout.labels_tr()).unwrap().count(), 8);
        assert_eq!(fs::read_dir(layout.images_ts()).unwrap().count(), 2);

        let description = DatasetDescription::read(layout.dataset_json()).unwrap();
        assert_eq!(description.num_training, 8);
        assert!(!layout.splits_final_json().exists());
    }

    #[test]
    fn test_unify_deterministic() {
        let root = tempfile::tempdir().unwrap();
        let mut config = make_sources(root.path());
        let a = unify(&config).unwrap();
        config.output_base = root.path().join("again");
        config.write_nnunet_fold = true;
        let b = unify(&config).unwrap();

        assert_eq!(a.manifest, b.manifest);
        let sources = |r: &super::UnifyReport| {
            r.assignments
                .iter()
                .map(|(id, _, c)| (*id, c.case_dir.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(sources(&a), sources(&b));
        assert!(b.layout.splits_final_json().is_file());
    }

    #[test]
    fn test_unify_no_cases() {
        let root = tempfile::tempdir().unwrap();
        let r = root.path();
        let config = UnifyConfig::kits(r.join("a"), r.join("b"), r.join("c"), r.join("out"));
        assert!(matches!(unify(&config), Err(UnifyError::NoCases)));
        assert!(!r.join("out").exists());
    }
}
