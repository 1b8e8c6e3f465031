//! nnU-Net raw 数据集目录布局.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use crate::consts::naming::{
    DATASET_JSON, FILE_ENDING, IMAGES_TR, IMAGES_TS, LABELS_TR, SPLITS_FINAL_JSON, SPLITS_JSON,
};
use crate::dataset::split::UnifiedId;

/// 输出数据集 `{base}/Dataset{id:03}_{name}` 的目录布局.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLayout {
    root: PathBuf,
    file_ending: String,
}

impl DatasetLayout {
    /// 在 `base` 下为编号 `dataset_id`、任务名 `name` 的数据集建立布局.
    /// 不会触碰文件系统.
    pub fn new<P: AsRef<Path>>(base: P, dataset_id: u32, name: &str) -> Self {
        let root = base.as_ref().join(Self::folder_name(dataset_id, name));
        Self {
            root,
            file_ending: FILE_ENDING.to_owned(),
        }
    }

    /// 修改文件扩展名 (默认 `.nii.gz`).
    pub fn with_file_ending(mut self, ending: &str) -> Self {
        self.file_ending = ending.to_owned();
        self
    }

    /// 数据集文件夹名, 例如 `Dataset001_Kits`.
    #[inline]
    pub fn folder_name(dataset_id: u32, name: &str) -> String {
        format!("Dataset{dataset_id:03}_{name}")
    }

    /// 数据集根目录.
    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 文件扩展名.
    #[inline]
    pub fn file_ending(&self) -> &str {
        &self.file_ending
    }

    /// `imagesTr` 目录.
    #[inline]
    pub fn images_tr(&self) -> PathBuf {
        self.root.join(IMAGES_TR)
    }

    /// `labelsTr` 目录.
    #[inline]
    pub fn labels_tr(&self) -> PathBuf {
        self.root.join(LABELS_TR)
    }

    /// `imagesTs` 目录.
    #[inline]
    pub fn images_ts(&self) -> PathBuf {
        self.root.join(IMAGES_TS)
    }

    /// `splits.json` 路径.
    #[inline]
    pub fn splits_json(&self) -> PathBuf {
        self.root.join(SPLITS_JSON)
    }

    /// `splits_final.json` 路径.
    #[inline]
    pub fn splits_final_json(&self) -> PathBuf {
        self.root.join(SPLITS_FINAL_JSON)
    }

    /// `dataset.json` 路径.
    #[inline]
    pub fn dataset_json(&self) -> PathBuf {
        self.root.join(DATASET_JSON)
    }

    /// 训练 (或验证) 病例的扫描目标路径.
    pub fn train_image(&self, id: UnifiedId) -> PathBuf {
        self.images_tr().join(id.image_file_name(&self.file_ending))
    }

    /// 训练 (或验证) 病例的标注目标路径.
    pub fn train_label(&self, id: UnifiedId) -> PathBuf {
        self.labels_tr().join(id.label_file_name(&self.file_ending))
    }

    /// 测试病例的扫描目标路径.
    pub fn test_image(&self, id: UnifiedId) -> PathBuf {
        self.images_ts().join(id.image_file_name(&self.file_ending))
    }

    /// 建立三个子目录. 目录已经存在时不报错.
    pub fn create_dirs(&self) -> io::Result<()> {
        for d in [self.images_tr(), self.labels_tr(), self.images_ts()] {
            fs::create_dir_all(d)?;
        }
        Ok(())
    }
}

/// 将 `src` 复制到 `dest`.
///
/// 内容先写入 `dest` 同目录下的临时文件并落盘, 再重命名为 `dest`,
/// 因此 `dest` 要么不存在, 要么是完整的副本.
pub fn copy_atomic<P: AsRef<Path>, Q: AsRef<Path>>(src: P, dest: Q) -> io::Result<u64> {
    let dest = dest.as_ref();
    let dir = dest
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "destination has no parent"))?;

    let mut reader = File::open(src.as_ref())?;
    let mut tmp = tempfile::Builder::new()
        .prefix(".partial-")
        .tempfile_in(dir)?;
    let n = io::copy(&mut reader, tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| e.error)?;
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::{copy_atomic, DatasetLayout};
    use crate::dataset::split::UnifiedId;
    use std::fs;

    #[test]
    fn test_layout_paths() {
        let layout = DatasetLayout::new("/data/raw", 1, "Kits");
        assert!(layout.root().ends_with("Dataset001_Kits"));
        assert_eq!(DatasetLayout::folder_name(42, "Kits"), "Dataset042_Kits");
        assert!(layout
            .train_image(UnifiedId(3))
            .ends_with("imagesTr/case_00003_0000.nii.gz"));
        assert!(layout
            .train_label(UnifiedId(3))
            .ends_with("labelsTr/case_00003.nii.gz"));
        assert!(layout
            .test_image(UnifiedId(12))
            .ends_with("imagesTs/case_00012_0000.nii.gz"));
    }

    #[test]
    fn test_create_dirs_idempotent() {
        let base = tempfile::tempdir().unwrap();
        let layout = DatasetLayout::new(base.path(), 7, "Kits");
        layout.create_dirs().unwrap();
        layout.create_dirs().unwrap();
        assert!(layout.images_tr().is_dir());
        assert!(layout.labels_tr().is_dir());
        assert!(layout.images_ts().is_dir());
    }

    #[test]
    fn test_copy_atomic() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("imaging.nii.gz");
        fs::write(&src, b"voxels").unwrap();
        let dest = dir.path().join("case_00000_0000.nii.gz");

        assert_eq!(copy_atomic(&src, &dest).unwrap(), 6);
        assert_eq!(fs::read(&dest).unwrap(), b"voxels");

        // 覆盖已有文件, 且不留下临时文件.
        fs::write(&src, b"new").unwrap();
        copy_atomic(&src, &dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"new");
        let leftovers = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with(".partial-"))
            .count();
        assert_eq!(leftovers, 0);
    }
}
