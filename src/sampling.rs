//! コロケーション点と評価用グリッドの生成。
//!
//! 乱数はすべて明示的に渡したシードから作るため、同じシードなら同じ点列になります。

use burn::config::Config;
use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::pinn::{T_MAX, T_MIN, X_MAX, X_MIN, initial_condition};

/// 各種コロケーション点の個数。
#[derive(Config, Debug)]
pub struct SamplingConfig {
    #[config(default = 100)]
    pub n_initial: usize,
    #[config(default = 100)]
    pub n_boundary: usize,
    #[config(default = 1000)]
    pub n_interior: usize,
}

/// 損失の計算に使う座標 `(t, x)` の組。
#[derive(Clone, Debug)]
pub struct CollocationBatch<B: Backend> {
    /// `t = 0` 上の点。形状 `[n_initial, 2]`。
    pub initial: Tensor<B, 2>,
    /// `initial` での初期値 `sin(π x)`。形状 `[n_initial, 1]`。
    pub initial_target: Tensor<B, 2>,
    /// `x = ±1` 上の点。交互に `-1`, `+1` を取ります。形状 `[n_boundary, 2]`。
    pub boundary: Tensor<B, 2>,
    /// 領域内部の点。形状 `[n_interior, 2]`。
    pub interior: Tensor<B, 2>,
}

impl<B: Backend> CollocationBatch<B> {
    pub fn sample(config: &SamplingConfig, seed: u64, device: &B::Device) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);

        let initial: Vec<[f32; 2]> = (0..config.n_initial)
            .map(|_| [T_MIN, rng.random_range(X_MIN..=X_MAX)])
            .collect();
        let boundary: Vec<[f32; 2]> = (0..config.n_boundary)
            .map(|i| {
                let x = if i % 2 == 0 { X_MIN } else { X_MAX };
                [rng.random_range(T_MIN..=T_MAX), x]
            })
            .collect();
        let interior: Vec<[f32; 2]> = (0..config.n_interior)
            .map(|_| {
                [
                    rng.random_range(T_MIN..=T_MAX),
                    rng.random_range(X_MIN..=X_MAX),
                ]
            })
            .collect();

        let initial = coords_tensor::<B>(&initial, device);
        let [n_initial, _] = initial.dims();
        let initial_target = initial_condition(initial.clone().slice([0..n_initial, 1..2]));

        Self {
            initial,
            initial_target,
            boundary: coords_tensor(&boundary, device),
            interior: coords_tensor(&interior, device),
        }
    }
}

/// `[0, 1] × [-1, 1]` 上の等間隔グリッド。`t` の外側ループで並びます。形状 `[n_t * n_x, 2]`。
pub fn grid<B: Backend>(n_t: usize, n_x: usize, device: &B::Device) -> Tensor<B, 2> {
    let t_vals = linspace(T_MIN, T_MAX, n_t);
    let x_vals = linspace(X_MIN, X_MAX, n_x);
    let mut coords = Vec::with_capacity(n_t * n_x);
    for t_val in &t_vals {
        for x_val in &x_vals {
            coords.push([*t_val, *x_val]);
        }
    }
    coords_tensor(&coords, device)
}

fn linspace(start: f32, end: f32, n: usize) -> Vec<f32> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => (0..n)
            .map(|i| start + i as f32 * (end - start) / (n - 1) as f32)
            .collect(),
    }
}

fn coords_tensor<B: Backend>(points: &[[f32; 2]], device: &B::Device) -> Tensor<B, 2> {
    let flat: Vec<f32> = points.iter().flatten().copied().collect();
    Tensor::<B, 1>::from_floats(flat.as_slice(), device).reshape([points.len(), 2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn linspace_includes_both_ends() {
        assert_eq!(linspace(-1.0, 1.0, 5), vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
        assert_eq!(linspace(0.0, 1.0, 1), vec![0.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn grid_is_time_major() {
        let device = Default::default();
        let coords = grid::<TestBackend>(2, 3, &device);
        assert_eq!(coords.dims(), [6, 2]);
        let values = coords.into_data().to_vec::<f32>().unwrap();
        assert_eq!(
            values,
            vec![0.0, -1.0, 0.0, 0.0, 0.0, 1.0, 1.0, -1.0, 1.0, 0.0, 1.0, 1.0]
        );
    }
}
