//! 预测/真值成对加载器.
//!
//! 提供迭代器风格的数据获取模式.

use std::fs;
use std::path::{Path, PathBuf};

use crate::data::{LabelVolume, NiftiHeaderAttr};
use crate::eval::EvalError;

/// 同名的预测与真值标签体.
///
/// 两者形状一致由构造过程保证.
#[derive(Debug, Clone)]
pub struct LabelPair {
    /// 模型预测.
    pub pred: LabelVolume,

    /// 真值标注.
    pub truth: LabelVolume,
}

impl LabelPair {
    /// 分别打开预测与真值文件. 任一文件打开失败或两者形状不一致时返回 `Err`.
    pub fn open(pred_path: impl AsRef<Path>, truth_path: impl AsRef<Path>) -> Result<Self, EvalError> {
        let open = |p: &Path| {
            LabelVolume::open(p).map_err(|source| EvalError::Open {
                path: p.to_owned(),
                source,
            })
        };
        let pred = open(pred_path.as_ref())?;
        let truth = open(truth_path.as_ref())?;
        if pred.shape() != truth.shape() {
            return Err(EvalError::ShapeMismatch {
                case: pred_path.as_ref().display().to_string(),
                pred: pred.shape(),
                truth: truth.shape(),
            });
        }
        Ok(Self { pred, truth })
    }
}

/// 从预测目录和真值目录创建成对加载器.
///
/// 预测目录下所有以 `file_ending` 结尾的文件按文件名字典序迭代.
/// 真值按相同文件名在 `truth_dir` 中查找.
pub fn pair_loader<P: AsRef<Path>>(
    pred_dir: P,
    truth_dir: P,
    file_ending: &str,
) -> Result<PairLoader, EvalError> {
    let pred_dir = pred_dir.as_ref().to_owned();
    let entries = fs::read_dir(&pred_dir).map_err(|source| EvalError::ReadDir {
        path: pred_dir.clone(),
        source,
    })?;

    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|e| e.path().is_file())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|n| n.ends_with(file_ending))
        .collect();
    names.sort_unstable_by(|a, b| b.cmp(a));

    Ok(PairLoader {
        pred_dir,
        truth_dir: truth_dir.as_ref().to_owned(),
        names_rev: names,
    })
}

/// 成对加载器. 每一项为 `(文件名, 加载结果)`;
/// 真值文件不存在时加载结果为 `None`.
#[derive(Debug)]
pub struct PairLoader {
    pred_dir: PathBuf,
    truth_dir: PathBuf,
    names_rev: Vec<String>,
}

impl Iterator for PairLoader {
    type Item = (String, Option<Result<LabelPair, EvalError>>);

    fn next(&mut self) -> Option<Self::Item> {
        let name = self.names_rev.pop()?;

        self.truth_dir.push(&name);
        let data = if self.truth_dir.is_file() {
            self.pred_dir.push(&name);
            let pair = LabelPair::open(&self.pred_dir, &self.truth_dir);
            self.pred_dir.pop();
            Some(pair)
        } else {
            None
        };
        self.truth_dir.pop();

        Some((name, data))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.names_rev.len(), Some(self.names_rev.len()))
    }
}

impl ExactSizeIterator for PairLoader {}
