use std::f64::consts::PI;

use super::LrScheduler;

/// 带热重启的余弦退火 (SGDR).
///
/// 第 `i` 个周期长度为 `T_i = T_0 * T_mult^i`, 周期内
/// `lr = eta_min + (lr_0 - eta_min) * (1 + cos(pi * T_cur / T_i)) / 2`.
/// `T_cur` 到达 `T_i` 时归零, 学习率跳回 `lr_0`.
#[derive(Debug, Clone, PartialEq)]
pub struct CosineAnnealingWarmRestarts {
    initial_lr: f64,
    eta_min: f64,
    t_mult: usize,
    t_i: usize,
    t_cur: usize,
    current_step: usize,
}

/// SGDR 参数.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SgdrParams {
    /// 第一个周期的步数, 必须为正.
    pub t_0: usize,

    /// 每次重启后周期长度的倍数, 必须为正.
    pub t_mult: usize,

    /// 学习率下限.
    pub eta_min: f64,
}

impl Default for SgdrParams {
    fn default() -> Self {
        Self {
            t_0: 50,
            t_mult: 2,
            eta_min: 1e-6,
        }
    }
}

impl CosineAnnealingWarmRestarts {
    /// 创建调度器. `t_0` 或 `t_mult` 为 0 时按 1 处理.
    pub fn new(initial_lr: f64, params: SgdrParams) -> Self {
        Self {
            initial_lr,
            eta_min: params.eta_min,
            t_mult: params.t_mult.max(1),
            t_i: params.t_0.max(1),
            t_cur: 0,
            current_step: 0,
        }
    }

    /// 当前周期的长度.
    #[inline]
    pub fn period(&self) -> usize {
        self.t_i
    }
}

impl LrScheduler for CosineAnnealingWarmRestarts {
    fn lr(&self) -> f64 {
        let progress = self.t_cur as f64 / self.t_i as f64;
        self.eta_min + (self.initial_lr - self.eta_min) * 0.5 * (1.0 + (PI * progress).cos())
    }

    fn step(&mut self) {
        self.current_step += 1;
        self.t_cur += 1;
        if self.t_cur >= self.t_i {
            self.t_cur -= self.t_i;
            self.t_i *= self.t_mult;
        }
    }

    #[inline]
    fn current_step(&self) -> usize {
        self.current_step
    }
}
