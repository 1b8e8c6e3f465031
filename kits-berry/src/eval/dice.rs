//! one-hot 编码与多类 Dice.
//!
//! Dice 只需要每个类别的交集与两侧体素数, 因此 [`overlap`] 直接在整数标签上统计,
//! 不必真正展开 one-hot 张量. [`one_hot`] 保留给需要显式指示体的调用者.

use ndarray::{Array4, ArrayView3, Axis};

use crate::consts::gray::KITS_BACKGROUND;

/// 参与评估的类别定义.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassSpec {
    /// 类别 `0..num_classes`, 其中 0 为背景, 不参与平均.
    OneHot {
        /// 类别总数 (含背景).
        num_classes: usize,
    },

    /// 层次区域, 每个区域是若干类别值的并集. 背景不在其中.
    Regions(Vec<(String, Vec<u8>)>),
}

impl ClassSpec {
    /// KiTS 层次区域: kidney {1, 2, 3}, masses {2, 3}, tumor {2}.
    pub fn kits_regions() -> Self {
        Self::Regions(crate::dataset::DatasetDescription::kits(0).foreground_regions())
    }

    /// 前景类别 (或区域) 个数.
    pub fn foreground_len(&self) -> usize {
        match self {
            Self::OneHot { num_classes } => num_classes.saturating_sub(1),
            Self::Regions(r) => r.len(),
        }
    }

    /// 前景类别 (或区域) 的名称.
    pub fn names(&self) -> Vec<String> {
        match self {
            Self::OneHot { num_classes } => (1..*num_classes).map(|c| c.to_string()).collect(),
            Self::Regions(r) => r.iter().map(|(k, _)| k.clone()).collect(),
        }
    }

    /// 体素值 `v` 是否属于第 `k` 个前景类别 (或区域).
    #[inline]
    fn contains(&self, k: usize, v: u8) -> bool {
        match self {
            Self::OneHot { .. } => v as usize == k + 1,
            Self::Regions(r) => r[k].1.contains(&v),
        }
    }
}

/// 单个类别的重叠统计.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassOverlap {
    /// 预测与真值同时属于该类的体素数.
    pub intersection: u64,

    /// 预测属于该类的体素数.
    pub pred: u64,

    /// 真值属于该类的体素数.
    pub truth: u64,
}

impl ClassOverlap {
    /// `2|X∩Y| / (|X| + |Y|)`.
    ///
    /// 真值中不存在该类时结果无定义, 返回 `None`.
    #[inline]
    pub fn dice(&self) -> Option<f64> {
        (self.truth > 0)
            .then(|| 2.0 * self.intersection as f64 / (self.pred + self.truth) as f64)
    }

    /// 累加另一份统计.
    #[inline]
    pub fn merge(self, other: Self) -> Self {
        Self {
            intersection: self.intersection + other.intersection,
            pred: self.pred + other.pred,
            truth: self.truth + other.truth,
        }
    }
}

/// 将整数标签体按类别展开为 `(C, z, h, w)` 的 0/1 指示体.
///
/// 第 `c` 个通道在体素值等于 `c` 处为 1. 取值不小于 `num_classes` 的体素在所有通道都为 0.
pub fn one_hot(volume: ArrayView3<u8>, num_classes: usize) -> Array4<u8> {
    let (z, h, w) = volume.dim();
    Array4::from_shape_fn((num_classes, z, h, w), |(c, z, h, w)| {
        u8::from(volume[(z, h, w)] as usize == c)
    })
}

/// 在两个 one-hot 指示体上逐通道统计重叠, 跳过背景通道 0.
///
/// 两者形状必须一致, 否则程序 panic.
pub fn overlap_one_hot(pred: &Array4<u8>, truth: &Array4<u8>) -> Vec<ClassOverlap> {
    assert_eq!(pred.dim(), truth.dim(), "one-hot 形状不一致");
    pred.axis_iter(Axis(0))
        .zip(truth.axis_iter(Axis(0)))
        .skip(1)
        .map(|(p, t)| {
            p.iter()
                .zip(t.iter())
                .fold(ClassOverlap::default(), |acc, (&p, &t)| {
                    acc.merge(ClassOverlap {
                        intersection: u64::from(p & t),
                        pred: u64::from(p),
                        truth: u64::from(t),
                    })
                })
        })
        .collect()
}

fn accumulate<'a, I>(pairs: I, spec: &ClassSpec, acc: &mut [ClassOverlap])
where
    I: Iterator<Item = (&'a u8, &'a u8)>,
{
    for (&p, &t) in pairs {
        if p == KITS_BACKGROUND && t == KITS_BACKGROUND {
            continue;
        }
        for (k, o) in acc.iter_mut().enumerate() {
            let (ip, it) = (spec.contains(k, p), spec.contains(k, t));
            o.pred += u64::from(ip);
            o.truth += u64::from(it);
            o.intersection += u64::from(ip && it);
        }
    }
}

/// 统计预测与真值在每个前景类别 (或区域) 上的重叠.
///
/// 两者形状必须一致, 否则程序 panic.
pub fn overlap(pred: ArrayView3<u8>, truth: ArrayView3<u8>, spec: &ClassSpec) -> Vec<ClassOverlap> {
    assert_eq!(pred.dim(), truth.dim(), "预测与真值形状不一致");
    let mut acc = vec![ClassOverlap::default(); spec.foreground_len()];
    accumulate(pred.iter().zip(truth.iter()), spec, &mut acc);
    acc
}

/// 借助 `rayon`, 按水平切片并行地运行 [`overlap`].
#[cfg(feature = "rayon")]
pub fn par_overlap(
    pred: ArrayView3<u8>,
    truth: ArrayView3<u8>,
    spec: &ClassSpec,
) -> Vec<ClassOverlap> {
    use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};

    assert_eq!(pred.dim(), truth.dim(), "预测与真值形状不一致");
    let k = spec.foreground_len();
    pred.axis_iter(Axis(0))
        .into_par_iter()
        .zip(truth.axis_iter(Axis(0)).into_par_iter())
        .map(|(p, t)| {
            let mut acc = vec![ClassOverlap::default(); k];
            accumulate(p.iter().zip(t.iter()), spec, &mut acc);
            acc
        })
        .reduce(
            || vec![ClassOverlap::default(); k],
            |a, b| a.into_iter().zip(b).map(|(x, y)| x.merge(y)).collect(),
        )
}

/// 每个前景类别的 Dice. 无定义的类别为 `None`.
#[inline]
pub fn dice_per_class(overlaps: &[ClassOverlap]) -> Vec<Option<f64>> {
    overlaps.iter().map(ClassOverlap::dice).collect()
}

/// 对有定义的类别求 Dice 平均值. 所有类别都无定义时返回 `None`.
pub fn mean_dice(overlaps: &[ClassOverlap]) -> Option<f64> {
    let defined: Vec<f64> = overlaps.iter().filter_map(ClassOverlap::dice).collect();
    (!defined.is_empty()).then(|| defined.iter().sum::<f64>() / defined.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::gray::{KITS_CYST, KITS_KIDNEY, KITS_TUMOR};
    use ndarray::Array3;

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-10
    }

    /// 2 x 2 x 4 的小标签体, 包含 0..=3 四种取值.
    fn sample() -> Array3<u8> {
        Array3::from_shape_vec(
            (2, 2, 4),
            vec![0, 1, 1, 2, 0, 1, 3, 3, 0, 0, 2, 2, 1, 0, 0, 3],
        )
        .unwrap()
    }

    #[test]
    fn test_one_hot() {
        let v = sample();
        let oh = one_hot(v.view(), 4);
        assert_eq!(oh.dim(), (4, 2, 2, 4));
        // 每个体素恰好属于一个通道.
        let per_voxel = oh.sum_axis(Axis(0));
        assert!(per_voxel.iter().all(|&x| x == 1));
        assert_eq!(oh[(2, 0, 0, 3)], 1);
        assert_eq!(oh[(1, 0, 0, 3)], 0);

        // 超出类别数的取值不属于任何通道.
        let oh3 = one_hot(v.view(), 3);
        assert_eq!(oh3.sum_axis(Axis(0))[(0, 1, 2)], 0);
    }

    #[test]
    fn test_identical_is_one() {
        let v = sample();
        let spec = ClassSpec::OneHot { num_classes: 4 };
        let o = overlap(v.view(), v.view(), &spec);
        assert_eq!(o.len(), 3);
        assert!(dice_per_class(&o).iter().all(|d| d.is_some_and(|d| f64_eq(d, 1.0))));
        assert!(f64_eq(mean_dice(&o).unwrap(), 1.0));
    }

    #[test]
    fn test_disjoint_class_is_zero() {
        let truth = sample();
        // 预测把所有肿瘤 (2) 判成囊肿 (3).
        let mut pred = truth.clone();
        pred.mapv_inplace(|x| if x == 2 { 3 } else { x });

        let spec = ClassSpec::OneHot { num_classes: 4 };
        let o = overlap(pred.view(), truth.view(), &spec);
        let d = dice_per_class(&o);
        assert!(f64_eq(d[0].unwrap(), 1.0));
        assert!(f64_eq(d[1].unwrap(), 0.0));
        // 囊肿: 真值 3 个, 预测 6 个, 交集 3 个.
        assert!(f64_eq(d[2].unwrap(), 2.0 * 3.0 / 9.0));
        assert!(f64_eq(mean_dice(&o).unwrap(), (1.0 + 0.0 + 2.0 / 3.0) / 3.0));
    }

    #[test]
    fn test_absent_class_is_undefined() {
        let mut truth = sample();
        truth.mapv_inplace(|x| if x == 3 { 0 } else { x });
        let pred = truth.clone();

        let o = overlap(pred.view(), truth.view(), &ClassSpec::OneHot { num_classes: 4 });
        assert_eq!(o[2], ClassOverlap::default());
        assert_eq!(dice_per_class(&o)[2], None);
        assert!(f64_eq(mean_dice(&o).unwrap(), 1.0));

        let empty = Array3::<u8>::zeros((1, 2, 2));
        let o = overlap(empty.view(), empty.view(), &ClassSpec::OneHot { num_classes: 4 });
        assert_eq!(mean_dice(&o), None);
    }

    #[test]
    fn test_one_hot_path_agrees() {
        let truth = sample();
        let mut pred = truth.clone();
        pred[(0, 0, 1)] = 0;
        pred[(1, 1, 1)] = 2;

        let spec = ClassSpec::OneHot { num_classes: 4 };
        let direct = overlap(pred.view(), truth.view(), &spec);
        let via = overlap_one_hot(&one_hot(pred.view(), 4), &one_hot(truth.view(), 4));
        assert_eq!(direct, via);
    }

    #[test]
    fn test_regions() {
        let truth = sample();
        let mut pred = truth.clone();
        // 肿瘤与囊肿互换后, kidney 与 masses 区域不受影响.
        pred.mapv_inplace(|x| match x {
            2 => 3,
            3 => 2,
            x => x,
        });
        let spec = ClassSpec::kits_regions();
        assert_eq!(spec.names(), ["kidney", "masses", "tumor"]);
        let ClassSpec::Regions(regions) = &spec else {
            panic!("kits regions must be region based");
        };
        assert_eq!(regions[0].1, [KITS_KIDNEY, KITS_TUMOR, KITS_CYST]);
        assert_eq!(regions[1].1, [KITS_TUMOR, KITS_CYST]);
        assert_eq!(regions[2].1, [KITS_TUMOR]);
        let d = dice_per_class(&overlap(pred.view(), truth.view(), &spec));
        assert!(f64_eq(d[0].unwrap(), 1.0));
        assert!(f64_eq(d[1].unwrap(), 1.0));
        assert!(f64_eq(d[2].unwrap(), 0.0));
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_par_overlap_agrees() {
        let truth = sample();
        let mut pred = truth.clone();
        pred[(1, 0, 2)] = 1;
        for spec in [ClassSpec::OneHot { num_classes: 4 }, ClassSpec::kits_regions()] {
            assert_eq!(
                par_overlap(pred.view(), truth.view(), &spec),
                overlap(pred.view(), truth.view(), &spec)
            );
        }
    }
}
