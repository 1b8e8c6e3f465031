//! 学习率调度策略.
//!
//! - [`PolyLrScheduler`]: nnU-Net 默认的多项式衰减;
//! - [`CosineAnnealingWarmRestarts`]: 带热重启的余弦退火 (SGDR).
//!
//! 训练入口通过名称 ([`LrPolicy`]) 或训练器名 ([`TrainerPreset`]) 选择其中之一.

use std::fmt;
use std::str::FromStr;

mod poly;
mod sgdr;

pub use poly::PolyLrScheduler;
pub use sgdr::{CosineAnnealingWarmRestarts, SgdrParams};

/// 学习率调度器.
pub trait LrScheduler {
    /// 当前学习率.
    fn lr(&self) -> f64;

    /// 前进一步 (通常每个 epoch 调用一次).
    fn step(&mut self);

    /// 已经前进的步数.
    fn current_step(&self) -> usize;
}

/// 可按名称选择的调度策略.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LrPolicy {
    /// 多项式衰减.
    Poly,

    /// 带热重启的余弦退火.
    CosineWarmRestarts(SgdrParams),
}

/// 无法识别的策略或训练器名称.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} `{name}`")]
pub struct ParsePolicyError {
    kind: &'static str,
    name: String,
}

impl LrPolicy {
    /// 规范名称.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Poly => "PolyLRScheduler",
            Self::CosineWarmRestarts(_) => "CosineAnnealingWarmRestartsLR",
        }
    }

    /// 以 `initial_lr` 为起点构造调度器. `max_steps` 只对多项式衰减有意义.
    pub fn build(&self, initial_lr: f64, max_steps: usize) -> Box<dyn LrScheduler> {
        match self {
            Self::Poly => Box::new(PolyLrScheduler::new(initial_lr, max_steps)),
            Self::CosineWarmRestarts(p) => Box::new(CosineAnnealingWarmRestarts::new(initial_lr, *p)),
        }
    }
}

impl fmt::Display for LrPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LrPolicy {
    type Err = ParsePolicyError;

    /// 接受规范名称及简写 (`poly`, `sgdr`, `cosine`), 大小写不敏感.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "polylrscheduler" | "polylr" | "poly" => Ok(Self::Poly),
            "cosineannealingwarmrestartslr" | "cosineannealingwarmrestarts" | "sgdr" | "cosine" => {
                Ok(Self::CosineWarmRestarts(SgdrParams::default()))
            }
            _ => Err(ParsePolicyError {
                kind: "lr scheduler",
                name: s.to_owned(),
            }),
        }
    }
}

/// 训练器预设. 训练器只决定使用哪种学习率策略.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerPreset {
    /// `nnUNetTrainer`: 多项式衰减.
    NnUnet,

    /// `nnUNetTrainer_SGDR`: 余弦退火热重启.
    NnUnetSgdr,
}

impl TrainerPreset {
    /// 训练器名称.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NnUnet => "nnUNetTrainer",
            Self::NnUnetSgdr => "nnUNetTrainer_SGDR",
        }
    }

    /// 该训练器使用的学习率策略.
    pub fn policy(&self) -> LrPolicy {
        match self {
            Self::NnUnet => LrPolicy::Poly,
            Self::NnUnetSgdr => LrPolicy::CosineWarmRestarts(SgdrParams::default()),
        }
    }
}

impl FromStr for TrainerPreset {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nnUNetTrainer" => Ok(Self::NnUnet),
            "nnUNetTrainer_SGDR" => Ok(Self::NnUnetSgdr),
            _ => Err(ParsePolicyError {
                kind: "trainer",
                name: s.to_owned(),
            }),
        }
    }
}
