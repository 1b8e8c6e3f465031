//! 通用常量.

/// 单通道标签值.
pub mod gray {
    /// KiTS 数据集中, 背景的体素值.
    pub const KITS_BACKGROUND: u8 = 0;

    /// KiTS 数据集中, 肾脏的体素值.
    pub const KITS_KIDNEY: u8 = 1;

    /// KiTS 数据集中, 肿瘤的体素值.
    pub const KITS_TUMOR: u8 = 2;

    /// KiTS21/23 数据集中, 囊肿的体素值. KiTS19 中没有该类.
    pub const KITS_CYST: u8 = 3;
}

/// 文件与目录命名.
pub mod naming {
    /// 原始数据集中每个病例文件夹的前缀.
    pub const CASE_PREFIX: &str = "case_";

    /// CT 扫描文件名.
    pub const IMAGING: &str = "imaging.nii.gz";

    /// KiTS19/23 的标注文件名.
    pub const SEGMENTATION: &str = "segmentation.nii.gz";

    /// KiTS21 多数投票聚合后的标注文件名.
    pub const AGGREGATED_MAJ_SEG: &str = "aggregated_MAJ_seg.nii.gz";

    /// KiTS23 中可能存放扫描与标注的嵌套子目录.
    pub const RAW_SUBDIR: &str = "raw";

    /// 输出数据集中唯一的通道后缀 (CT).
    pub const CHANNEL_SUFFIX: &str = "_0000";

    /// 输出数据集的文件扩展名.
    pub const FILE_ENDING: &str = ".nii.gz";

    /// 输出数据集的任务名.
    pub const TASK_NAME: &str = "Kits";

    /// 训练图像目录.
    pub const IMAGES_TR: &str = "imagesTr";

    /// 训练标注目录.
    pub const LABELS_TR: &str = "labelsTr";

    /// 测试图像目录.
    pub const IMAGES_TS: &str = "imagesTs";

    /// 划分记录文件名.
    pub const SPLITS_JSON: &str = "splits.json";

    /// nnU-Net 折划分文件名.
    pub const SPLITS_FINAL_JSON: &str = "splits_final.json";

    /// 数据集描述文件名.
    pub const DATASET_JSON: &str = "dataset.json";
}

/// 默认随机划分种子.
pub const DEFAULT_SPLIT_SEED: u64 = 42;

/// 训练集占比 (百分数). 按整数向下取整, 避免浮点误差.
pub const TRAIN_PERCENT: usize = 60;

/// 验证集占比 (百分数). 测试集拿走剩余部分.
pub const VALIDATION_PERCENT: usize = 20;

/// 评估时的默认类别数 (背景 + 肾脏 + 肿瘤 + 囊肿).
pub const DEFAULT_NUM_CLASSES: usize = 4;
