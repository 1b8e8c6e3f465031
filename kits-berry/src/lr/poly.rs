use super::LrScheduler;

/// nnU-Net 默认的多项式衰减策略.
///
/// `lr_t = lr_0 * (1 - t / T) ^ exponent`, `t >= T` 时保持为 0.
#[derive(Debug, Clone, PartialEq)]
pub struct PolyLrScheduler {
    initial_lr: f64,
    max_steps: usize,
    exponent: f64,
    current_step: usize,
}

impl PolyLrScheduler {
    /// nnU-Net 使用的指数.
    pub const DEFAULT_EXPONENT: f64 = 0.9;

    /// 以 `initial_lr` 为起点, 在 `max_steps` 步内衰减到 0.
    pub fn new(initial_lr: f64, max_steps: usize) -> Self {
        Self::with_exponent(initial_lr, max_steps, Self::DEFAULT_EXPONENT)
    }

    /// 指定衰减指数.
    pub fn with_exponent(initial_lr: f64, max_steps: usize, exponent: f64) -> Self {
        Self {
            initial_lr,
            max_steps,
            exponent,
            current_step: 0,
        }
    }
}

impl LrScheduler for PolyLrScheduler {
    fn lr(&self) -> f64 {
        if self.max_steps == 0 || self.current_step >= self.max_steps {
            return 0.0;
        }
        let remain = 1.0 - self.current_step as f64 / self.max_steps as f64;
        self.initial_lr * remain.powf(self.exponent)
    }

    #[inline]
    fn step(&mut self) {
        self.current_step += 1;
    }

    #[inline]
    fn current_step(&self) -> usize {
        self.current_step
    }
}
