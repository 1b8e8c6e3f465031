//! Hold-out 评估.
//!
//! 逐个读取预测标签体, 按同名文件找到真值, 计算不含背景的多类 Dice,
//! 最后对所有有效病例求平均.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use itertools::Itertools;
use serde::Serialize;

use crate::consts::naming::FILE_ENDING;
use crate::consts::DEFAULT_NUM_CLASSES;
use crate::Idx3d;

pub mod dice;
mod loader;

pub use dice::{dice_per_class, mean_dice, one_hot, overlap, ClassOverlap, ClassSpec};
pub use loader::{pair_loader, LabelPair, PairLoader};

/// 评估错误.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// 无法读取目录.
    #[error("cannot read directory {path}: {source}")]
    ReadDir {
        /// 目录.
        path: PathBuf,
        /// 底层错误.
        source: io::Error,
    },

    /// 无法打开 nifti 文件.
    #[error("cannot open nifti volume {path}: {source}")]
    Open {
        /// 文件.
        path: PathBuf,
        /// 底层错误.
        source: nifti::NiftiError,
    },

    /// 预测与真值形状不一致.
    #[error("shape mismatch for {case}: prediction {pred:?}, ground truth {truth:?}")]
    ShapeMismatch {
        /// 预测文件.
        case: String,
        /// 预测形状 `(z, h, w)`.
        pred: Idx3d,
        /// 真值形状 `(z, h, w)`.
        truth: Idx3d,
    },

    /// 前景类别个数为 0.
    #[error("at least one foreground class is required, got {0} classes")]
    InvalidClassCount(usize),

    /// 没有任何预测找到了对应真值.
    #[error("no prediction has a matching ground truth ({skipped} skipped)")]
    NoMatchedCases {
        /// 被跳过的预测个数.
        skipped: usize,
    },

    /// 匹配到的病例的 Dice 全部无定义 (真值中没有任何前景).
    #[error("dice is undefined for all {matched} matched cases")]
    NoScoredCases {
        /// 匹配到的病例个数.
        matched: usize,
    },

    /// 写出报告失败.
    #[error("failed to write report {path}: {source}")]
    Write {
        /// 报告文件.
        path: PathBuf,
        /// 底层错误.
        source: io::Error,
    },
}

/// 评估配置.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldoutConfig {
    /// 预测目录.
    pub pred_dir: PathBuf,

    /// 真值目录.
    pub truth_dir: PathBuf,

    /// 类别定义.
    pub classes: ClassSpec,

    /// 参与评估的文件扩展名.
    pub file_ending: String,
}

impl HoldoutConfig {
    /// 以默认的 4 类 (背景 + 3 个前景类) 和 `.nii.gz` 扩展名评估.
    pub fn new<P: Into<PathBuf>>(pred_dir: P, truth_dir: P) -> Self {
        Self {
            pred_dir: pred_dir.into(),
            truth_dir: truth_dir.into(),
            classes: ClassSpec::OneHot {
                num_classes: DEFAULT_NUM_CLASSES,
            },
            file_ending: FILE_ENDING.to_owned(),
        }
    }
}

/// 单个病例的评估结果.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseScore {
    /// 文件名.
    pub name: String,

    /// 各前景类别的 Dice, 无定义时为 `null`.
    pub per_class: Vec<Option<f64>>,

    /// 有定义类别的平均 Dice.
    pub dice: Option<f64>,
}

/// 评估报告.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldoutReport {
    /// 前景类别 (或区域) 名称.
    pub class_names: Vec<String>,

    /// 匹配成功的病例, 按文件名字典序.
    pub cases: Vec<CaseScore>,

    /// 缺少真值而被跳过的预测文件.
    pub skipped: Vec<String>,

    /// 每个前景类别在所有病例上的平均 Dice.
    pub class_means: Vec<Option<f64>>,

    /// Dice 无定义 (真值中没有任何前景) 而不参与平均的病例个数.
    pub undefined: usize,

    /// 所有有定义病例的平均 Dice.
    pub mean: f64,
}

impl HoldoutReport {
    /// 参与平均的病例个数.
    #[inline]
    pub fn scored(&self) -> usize {
        self.cases.len() - self.undefined
    }

    /// 按文件名字典序合并匹配成功与被跳过的病例. 被跳过的病例对应 `None`.
    pub fn in_order(&self) -> impl Iterator<Item = (&str, Option<&CaseScore>)> {
        let cases = self.cases.iter().map(|c| (c.name.as_str(), Some(c)));
        let skipped = self.skipped.iter().map(|n| (n.as_str(), None::<&CaseScore>));
        cases.merge_by(skipped, |a, b| a.0 <= b.0)
    }

    /// 以 JSON 格式写出到 `path`.
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), EvalError> {
        let path = path.as_ref();
        let err = |source| EvalError::Write {
            path: path.to_owned(),
            source,
        };
        let mut w = io::BufWriter::new(std::fs::File::create(path).map_err(err)?);
        serde_json::to_writer_pretty(&mut w, self).map_err(|e| err(io::Error::from(e)))?;
        w.flush().map_err(err)
    }
}

fn mean_of<I: IntoIterator<Item = f64>>(it: I) -> Option<f64> {
    let (sum, n) = it.into_iter().fold((0.0, 0usize), |(s, n), x| (s + x, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// 计算一对标签体的重叠统计.
fn pair_overlap(pair: &LabelPair, spec: &ClassSpec) -> Vec<ClassOverlap> {
    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            dice::par_overlap(pair.pred.data(), pair.truth.data(), spec)
        } else {
            dice::overlap(pair.pred.data(), pair.truth.data(), spec)
        }
    }
}

/// 执行 hold-out 评估.
///
/// 缺少真值的预测会被记录并跳过, 既不出现在病例列表中, 也不参与平均.
/// 任一成对文件无法读取或形状不一致时立即返回错误.
pub fn evaluate(config: &HoldoutConfig) -> Result<HoldoutReport, EvalError> {
    if config.classes.foreground_len() == 0 {
        let n = match &config.classes {
            ClassSpec::OneHot { num_classes } => *num_classes,
            ClassSpec::Regions(_) => 0,
        };
        return Err(EvalError::InvalidClassCount(n));
    }

    let mut cases = Vec::new();
    let mut skipped = Vec::new();
    for (name, data) in pair_loader(&config.pred_dir, &config.truth_dir, &config.file_ending)? {
        let Some(pair) = data else {
            log::warn!("ground truth not found for {name}, skipped");
            skipped.push(name);
            continue;
        };
        let overlaps = pair_overlap(&pair?, &config.classes);
        let score = CaseScore {
            name,
            per_class: dice_per_class(&overlaps),
            dice: mean_dice(&overlaps),
        };
        match score.dice {
            Some(d) => log::info!("{}: Dice = {d:.4}", score.name),
            None => log::warn!("{}: Dice undefined (no foreground in ground truth)", score.name),
        }
        cases.push(score);
    }

    if cases.is_empty() {
        return Err(EvalError::NoMatchedCases {
            skipped: skipped.len(),
        });
    }
    let mean = mean_of(cases.iter().filter_map(|c| c.dice)).ok_or(EvalError::NoScoredCases {
        matched: cases.len(),
    })?;
    let undefined = cases.iter().filter(|c| c.dice.is_none()).count();
    let class_means = (0..config.classes.foreground_len())
        .map(|k| mean_of(cases.iter().filter_map(|c| c.per_class[k])))
        .collect();

    Ok(HoldoutReport {
        class_names: config.classes.names(),
        cases,
        skipped,
        class_means,
        undefined,
        mean,
    })
}
