use anyhow::{Result, anyhow, bail};
use burn::backend::{Autodiff, NdArray};
use burn::tensor::Tensor;
use tracing::{info, warn};

use crate::analytic::{Combiner, HeatSolution, Identity, Sine, Square};
use crate::derivative::{DifferentiableMap, first_derivative, second_derivative};
use crate::pinn::{HeatEquationConfig, heat_residual};
use crate::sampling::{CollocationBatch, SamplingConfig};

type MyBackend = Autodiff<NdArray<f32>>;

/// 解析解との差の許容値（f32 での絶対誤差）。
const TOLERANCE: f32 = 1e-4;

/// 解析的な導関数を持つ 1 つの検証ケース。
struct Case<'a> {
    name: &'static str,
    map: &'a dyn DifferentiableMap<MyBackend>,
    /// 行優先に並べた入力。
    input: Vec<f32>,
    cols: usize,
    first: Vec<f32>,
    /// `(微分する入力次元, 期待値)` の組。
    second: Vec<(usize, Vec<f32>)>,
}

/// `check`サブコマンドを実行します。
pub fn run() -> Result<()> {
    let xs = [1.0f32, 2.0, 3.0];
    let pairs = [[1.0f32, 2.0], [2.0, 3.0], [3.0, 4.0]];
    let combiner = Combiner::new(1.0, 2.0, 3.0);
    let (a, b, c) = (combiner.a as f32, combiner.b as f32, combiner.c as f32);

    let cases = [
        Case {
            name: "Identity",
            map: &Identity,
            input: xs.to_vec(),
            cols: 1,
            first: vec![1.0; xs.len()],
            second: vec![(0, vec![0.0; xs.len()])],
        },
        Case {
            name: "Square",
            map: &Square,
            input: xs.to_vec(),
            cols: 1,
            first: xs.iter().map(|x| 2.0 * x).collect(),
            second: vec![(0, vec![2.0; xs.len()])],
        },
        Case {
            name: "Sine",
            map: &Sine,
            input: xs.to_vec(),
            cols: 1,
            first: xs.iter().map(|x| x.cos()).collect(),
            second: vec![(0, xs.iter().map(|x| -x.sin()).collect())],
        },
        Case {
            name: "Combiner",
            map: &combiner,
            input: pairs.iter().flatten().copied().collect(),
            cols: 2,
            first: pairs.iter().flat_map(|[x0, _]| [2.0 * a * x0 + b, c]).collect(),
            second: vec![
                (0, pairs.iter().flat_map(|_| [2.0 * a, 0.0]).collect()),
                (1, vec![0.0; pairs.len() * 2]),
            ],
        },
    ];

    let mut worst = 0.0f32;
    for case in &cases {
        worst = worst.max(run_case(case)?);
    }

    let heat_error = check_heat_solution()?;
    worst = worst.max(heat_error);

    if worst > TOLERANCE {
        bail!("解析解との差 {worst:e} が許容値 {TOLERANCE:e} を超えました");
    }
    info!(max_abs_error = worst, "すべての検証ケースが許容範囲内です");
    Ok(())
}

fn run_case(case: &Case<'_>) -> Result<f32> {
    let device = Default::default();
    let rows = case.input.len() / case.cols;
    let x = Tensor::<MyBackend, 1>::from_floats(case.input.as_slice(), &device)
        .reshape([rows, case.cols])
        .require_grad();

    let u = to_vec(case.map.forward(x.clone()))?;
    let du = to_vec(first_derivative(case.map, &x)?)?;
    let mut error = max_abs_diff(&du, &case.first);
    info!(map = case.name, ?u, ?du, "一階導関数");

    for (index, expected) in &case.second {
        let d2u = to_vec(second_derivative(case.map, &x, *index)?)?;
        error = error.max(max_abs_diff(&d2u, expected));
        info!(map = case.name, index, ?d2u, "二階導関数");
    }

    if error > TOLERANCE {
        warn!(map = case.name, max_abs_error = error, "解析解と一致しません");
    }
    Ok(error)
}

/// 熱方程式の厳密解について残差が消えることを確かめます。
fn check_heat_solution() -> Result<f32> {
    let device = Default::default();
    let equation = HeatEquationConfig::new();
    let solution = HeatSolution {
        diffusivity: equation.diffusivity,
    };
    let batch = CollocationBatch::<MyBackend>::sample(&SamplingConfig::new(), 0, &device);
    let residual = to_vec(heat_residual(&solution, &batch.interior, &equation)?)?;
    let worst = residual.iter().fold(0.0f32, |acc, r| acc.max(r.abs()));
    info!(points = residual.len(), max_abs_residual = worst, "厳密解の熱方程式残差");
    Ok(worst)
}

fn to_vec(tensor: Tensor<MyBackend, 2>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("テンソルを読み出せません: {e:?}"))
}

fn max_abs_diff(actual: &[f32], expected: &[f32]) -> f32 {
    if actual.len() != expected.len() {
        return f32::INFINITY;
    }
    actual
        .iter()
        .zip(expected)
        .fold(0.0f32, |acc, (a, e)| acc.max((a - e).abs()))
}
