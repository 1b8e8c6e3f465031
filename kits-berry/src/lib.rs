#![warn(missing_docs)]

//! 核心库. 提供 KiTS 系列 (KiTS19, KiTS21, KiTS23) 肾脏 CT 数据集的统一转换,
//! 学习率策略选择以及 hold-out 预测结果 Dice 评估.
//!
//! # 注意
//!
//! 1. 模型结构、训练循环和医学图像重采样都不在本 crate 的范围内,
//!   这些工作交给下游训练框架 (nnU-Net 格式) 完成.
//! 2. 所有操作都是单线程同步执行的. 开启 `rayon` feature 后,
//!   Dice 统计可以按切片并行.
//!
//! # 组成
//!
//! ### 数据集统一转换 ✅
//!
//! 扫描三个数据集变体的病例目录, 合并、打乱并按 60/20/20 划分,
//! 重命名为 `case_XXXXX` 并写出 `splits.json` 与 `dataset.json`.
//!
//! 实现位于 `kits-berry/src/dataset`.
//!
//! ### 学习率策略 ✅
//!
//! PolyLR 与 SGDR (带热重启的余弦退火), 可以通过名称选择.
//!
//! 实现位于 `kits-berry/src/lr`.
//!
//! ### Hold-out 评估 ✅
//!
//! one-hot 编码后计算不含背景的多类 Dice, 并汇总平均值.
//!
//! 实现位于 `kits-berry/src/eval`.

/// 三维索引, 按 `(z, h, w)` 排列.
pub type Idx3d = (usize, usize, usize);

/// 3D nii 标签体基础数据结构.
mod data;

pub use data::{LabelVolume, NiftiHeaderAttr};

pub mod consts;

pub mod dataset;

pub mod eval;

pub mod lr;

pub mod prelude;
