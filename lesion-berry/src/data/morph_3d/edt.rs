use ndarray::{Array3, ArrayView3, ArrayViewMut1, Axis, Zip};

/// 各向异性精确欧氏距离变换.
///
/// 对 `mask` 中的每个前景体素, 计算其到最近背景体素的物理距离
/// (各轴体素间距由 `sampling` 给出, 顺序与数组轴一致); 背景体素距离为 0.
/// 若整个体数据不存在背景体素, 则前景距离为 `f64::INFINITY`.
///
/// 算法按轴依次求一维下包络 (Felzenszwalb & Huttenlocher), 复杂度与体素数线性相关.
/// 所有 `sampling` 分量必须为正, 否则结果无意义.
pub fn distance_transform_edt(mask: ArrayView3<'_, bool>, sampling: [f64; 3]) -> Array3<f64> {
    debug_assert!(sampling.iter().all(|s| *s > 0.0));

    let mut dist = mask.map(|&fg| if fg { f64::INFINITY } else { 0.0 });
    for (axis, s) in sampling.iter().enumerate() {
        transform_lanes(&mut dist, Axis(axis), s * s);
    }
    dist.mapv_inplace(f64::sqrt);
    dist
}

/// 沿 `axis` 方向对每一条线做一维平方距离变换.
fn transform_lanes(dist: &mut Array3<f64>, axis: Axis, weight: f64) {
    let lanes = Zip::from(dist.lanes_mut(axis));
    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            lanes.par_for_each(|lane| squared_distance_1d(lane, weight));
        } else {
            lanes.for_each(|lane| squared_distance_1d(lane, weight));
        }
    }
}

/// 一维平方距离变换: `d(q) = min_p (weight * (q - p)^2 + f(p))`.
///
/// 非有限的 `f(p)` 不参与下包络.
fn squared_distance_1d(mut lane: ArrayViewMut1<'_, f64>, weight: f64) {
    let f = lane.to_vec();
    let n = f.len();
    let sq = |i: usize| (i * i) as f64;

    // 下包络: (抛物线顶点, 该抛物线生效区间的左端点).
    let mut env: Vec<(usize, f64)> = Vec::with_capacity(n);
    for q in (0..n).filter(|&q| f[q].is_finite()) {
        let mut start = f64::NEG_INFINITY;
        while let Some(&(p, zp)) = env.last() {
            let s = ((f[q] + weight * sq(q)) - (f[p] + weight * sq(p)))
                / (2.0 * weight * (q - p) as f64);
            if s <= zp {
                env.pop();
            } else {
                start = s;
                break;
            }
        }
        env.push((q, start));
    }
    if env.is_empty() {
        return;
    }

    let mut k = 0usize;
    for q in 0..n {
        while k + 1 < env.len() && env[k + 1].1 < q as f64 {
            k += 1;
        }
        let p = env[k].0;
        let d = q as f64 - p as f64;
        lane[q] = weight * d * d + f[p];
    }
}
