//! 随机划分与统一编号.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::consts::naming::{CASE_PREFIX, CHANNEL_SUFFIX};
use crate::consts::{TRAIN_PERCENT, VALIDATION_PERCENT};

/// 病例在统一数据集中的角色.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// 训练集.
    Train,

    /// 验证集. 与训练集一同放入 `imagesTr/labelsTr`.
    Validation,

    /// 测试集. 只复制扫描.
    Test,
}

impl Role {
    /// 该角色是否需要复制标注.
    #[inline]
    pub fn has_label(&self) -> bool {
        !matches!(self, Self::Test)
    }

    /// 小写名称, 与 `splits.json` 中的取值一致.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Validation => "validation",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 统一病例编号. 渲染为 `case_{:05}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnifiedId(pub usize);

impl UnifiedId {
    /// 训练/测试扫描文件名: `case_XXXXX_0000{ending}`.
    #[inline]
    pub fn image_file_name(&self, ending: &str) -> String {
        format!("{self}{CHANNEL_SUFFIX}{ending}")
    }

    /// 标注文件名: `case_XXXXX{ending}`.
    #[inline]
    pub fn label_file_name(&self, ending: &str) -> String {
        format!("{self}{ending}")
    }
}

impl fmt::Display for UnifiedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{CASE_PREFIX}{:05}", self.0)
    }
}

/// 解析 [`UnifiedId`] 错误.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid unified case id `{0}`")]
pub struct ParseIdError(String);

impl FromStr for UnifiedId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix(CASE_PREFIX)
            .and_then(|n| n.parse().ok())
            .map(Self)
            .ok_or_else(|| ParseIdError(s.to_owned()))
    }
}

impl Serialize for UnifiedId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for UnifiedId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// 按 60/20/20 计算 (训练, 验证, 测试) 的个数.
///
/// 训练与验证向下取整, 测试集拿走剩余部分.
#[inline]
pub const fn split_sizes(n: usize) -> (usize, usize, usize) {
    let train = n * TRAIN_PERCENT / 100;
    let validation = n * VALIDATION_PERCENT / 100;
    (train, validation, n - train - validation)
}

/// 打乱并划分后的结果. 编号按打乱后的顺序从 0 连续分配, 测试集不重新计数.
#[derive(Debug, Clone)]
pub struct SplitPlan<T> {
    entries: Vec<(UnifiedId, Role, T)>,
}

impl<T> SplitPlan<T> {
    /// 以固定种子 `seed` 打乱 `items` 后划分.
    ///
    /// 相同的输入顺序与种子总是得到相同的结果.
    pub fn new(mut items: Vec<T>, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        items.shuffle(&mut rng);

        let (n_train, n_val, _) = split_sizes(items.len());
        let entries = items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                let role = if i < n_train {
                    Role::Train
                } else if i < n_train + n_val {
                    Role::Validation
                } else {
                    Role::Test
                };
                (UnifiedId(i), role, item)
            })
            .collect();
        Self { entries }
    }

    /// 病例总数.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 角色为 `role` 的病例个数.
    pub fn count(&self, role: Role) -> usize {
        self.entries.iter().filter(|(_, r, _)| *r == role).count()
    }

    /// 按编号升序迭代 (编号, 角色, 原始条目).
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &(UnifiedId, Role, T)> {
        self.entries.iter()
    }

    /// 生成划分记录.
    pub fn manifest(&self) -> SplitManifest {
        SplitManifest(self.entries.iter().map(|(id, r, _)| (*id, *r)).collect())
    }
}

/// `splits.json`: 统一编号到角色的映射.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SplitManifest(BTreeMap<UnifiedId, Role>);

impl SplitManifest {
    /// 查询编号对应的角色.
    #[inline]
    pub fn role_of(&self, id: UnifiedId) -> Option<Role> {
        self.0.get(&id).copied()
    }

    /// 记录个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// 是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 按编号升序迭代.
    pub fn iter(&self) -> impl Iterator<Item = (UnifiedId, Role)> + '_ {
        self.0.iter().map(|(id, r)| (*id, *r))
    }

    /// 以 4 空格缩进写出到 `path`.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        write_json_4(path, self)
    }

    /// 从 `path` 读取.
    pub fn read<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        serde_json::from_reader(io::BufReader::new(file)).map_err(io::Error::from)
    }

    /// 转换为 nnU-Net `splits_final.json` 的单折格式:
    /// 训练角色进入 `train`, 验证角色进入 `val`, 测试角色不出现.
    pub fn to_nnunet_fold(&self) -> Vec<NnUnetFold> {
        let mut fold = NnUnetFold::default();
        for (id, role) in self.iter() {
            match role {
                Role::Train => fold.train.push(id.to_string()),
                Role::Validation => fold.val.push(id.to_string()),
                Role::Test => {}
            }
        }
        vec![fold]
    }
}

/// nnU-Net 的一折划分.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NnUnetFold {
    /// 训练病例.
    pub train: Vec<String>,

    /// 验证病例.
    pub val: Vec<String>,
}

/// 以 4 空格缩进写出 JSON.
pub(crate) fn write_json_4<P: AsRef<Path>, T: Serialize + ?Sized>(
    path: P,
    value: &T,
) -> io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    let fmt = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut w, fmt);
    value.serialize(&mut ser).map_err(io::Error::from)?;
    w.flush()
}
