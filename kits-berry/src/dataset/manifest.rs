//! `dataset.json`: 下游训练框架识别统一数据集所需的描述记录.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::consts::gray::{KITS_BACKGROUND, KITS_CYST, KITS_KIDNEY, KITS_TUMOR};
use crate::consts::naming::{FILE_ENDING, TASK_NAME};
use crate::dataset::split::write_json_4;

/// 标签取值. 普通类别是单个整数, 区域 (region) 是若干整数的并集.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelValue {
    /// 单个类别值.
    Single(u8),

    /// 多个类别值组成的区域.
    Region(Vec<u8>),
}

impl LabelValue {
    /// 体素值 `v` 是否属于该标签.
    #[inline]
    pub fn contains(&self, v: u8) -> bool {
        match self {
            Self::Single(x) => *x == v,
            Self::Region(xs) => xs.contains(&v),
        }
    }

    /// 该标签包含的所有类别值.
    pub fn values(&self) -> Vec<u8> {
        match self {
            Self::Single(x) => vec![*x],
            Self::Region(xs) => xs.clone(),
        }
    }
}

/// 保持插入顺序的标签名 -> 取值映射. nnU-Net 依赖该顺序.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelMap(Vec<(String, LabelValue)>);

impl LabelMap {
    /// 追加一项.
    pub fn push(&mut self, name: &str, value: LabelValue) {
        self.0.push((name.to_owned(), value));
    }

    /// 按名称查找.
    pub fn get(&self, name: &str) -> Option<&LabelValue> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// 按插入顺序迭代.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &LabelValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// 标签个数 (含背景).
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// 是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for LabelMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for LabelMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LabelMapVisitor;

        impl<'de> Visitor<'de> for LabelMapVisitor {
            type Value = LabelMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map from label name to label value(s)")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<LabelMap, A::Error> {
                let mut v = Vec::with_capacity(access.size_hint().unwrap_or(4));
                while let Some(entry) = access.next_entry::<String, LabelValue>()? {
                    v.push(entry);
                }
                Ok(LabelMap(v))
            }
        }

        deserializer.deserialize_map(LabelMapVisitor)
    }
}

/// nnU-Net v2 的 `dataset.json` 记录. 生成后不再修改.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetDescription {
    /// 通道编号 -> 通道名 (例如 `"0": "CT"`).
    pub channel_names: BTreeMap<String, String>,

    /// 标签名 -> 取值, 包含组合区域.
    pub labels: LabelMap,

    /// 训练病例个数 (训练 + 验证).
    #[serde(rename = "numTraining")]
    pub num_training: usize,

    /// 文件扩展名.
    pub file_ending: String,

    /// 区域训练时的类别写回顺序.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regions_class_order: Option<Vec<u8>>,

    /// 数据集名称.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// 引用信息.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    /// 发布版本.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,

    /// 自由文本描述.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// 许可证.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub licence: Option<String>,

    /// 转换者.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converted_by: Option<String>,

    /// 指定读写器, 覆盖框架的自动选择.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overwrite_image_reader_writer: Option<String>,
}

impl DatasetDescription {
    /// 统一 KiTS 数据集的描述.
    ///
    /// 标签: background 0, kidney {1, 2, 3}, masses {2, 3}, tumor 2;
    /// 区域写回顺序 (1, 3, 2).
    pub fn kits(num_training: usize) -> Self {
        let mut labels = LabelMap::default();
        labels.push("background", LabelValue::Single(KITS_BACKGROUND));
        labels.push(
            "kidney",
            LabelValue::Region(vec![KITS_KIDNEY, KITS_TUMOR, KITS_CYST]),
        );
        labels.push("masses", LabelValue::Region(vec![KITS_TUMOR, KITS_CYST]));
        labels.push("tumor", LabelValue::Single(KITS_TUMOR));

        Self {
            channel_names: BTreeMap::from([("0".to_owned(), "CT".to_owned())]),
            labels,
            num_training,
            file_ending: FILE_ENDING.to_owned(),
            regions_class_order: Some(vec![KITS_KIDNEY, KITS_CYST, KITS_TUMOR]),
            name: Some(TASK_NAME.to_owned()),
            reference: Some("none".to_owned()),
            release: Some("0.1.3".to_owned()),
            description: Some("Dataset unificado de KiTS19, KiTS21 y KiTS23".to_owned()),
            licence: Some("hands off!".to_owned()),
            converted_by: Some(
                "Please enter your name, especially when sharing datasets with others in a common infrastructure!"
                    .to_owned(),
            ),
            overwrite_image_reader_writer: Some("NibabelIOWithReorient".to_owned()),
        }
    }

    /// 除背景外的所有标签, 按声明顺序给出 (名称, 包含的类别值).
    pub fn foreground_regions(&self) -> Vec<(String, Vec<u8>)> {
        self.labels
            .iter()
            .filter(|(_, v)| !v.contains(KITS_BACKGROUND))
            .map(|(k, v)| (k.to_owned(), v.values()))
            .collect()
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
}
