use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result, anyhow, bail};
use burn::backend::{Autodiff, NdArray};
use burn::config::Config;
use burn::module::Module;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use burn::tensor::Tensor;
use plotters::prelude::*;
use tracing::info;

use crate::cli::EvaluateArgs;
use crate::derivative::{DifferentiableMap, first_derivative, second_derivative};
use crate::model::ResidualNetConfig;
use crate::pinn::{HeatEquationConfig, T_AXIS, X_AXIS, heat_losses};
use crate::sampling::{CollocationBatch, SamplingConfig, grid};
use crate::{CONFIG_FILENAME, MODEL_FILENAME};

type MyBackend = Autodiff<NdArray<f32>>;

/// 最終時刻での断面。
struct Profile {
    x: Vec<f32>,
    u: Vec<f32>,
    u_x: Vec<f32>,
    u_xx: Vec<f32>,
}

/// `evaluate`サブコマンドを実行します。
pub fn run(args: &EvaluateArgs) -> Result<()> {
    let device = Default::default();

    let model_path = args.artifact_dir.join(MODEL_FILENAME);
    if !model_path.exists() {
        bail!(
            "モデルファイル '{}' が見つかりません。\n最初に 'init' コマンドでモデルを保存してください。",
            model_path.display()
        );
    }
    if args.n_t == 0 || args.n_x == 0 {
        bail!("グリッドの点数は 1 以上にしてください");
    }

    let config_path = args.artifact_dir.join(CONFIG_FILENAME);
    let config = ResidualNetConfig::load(&config_path)
        .map_err(|e| {
            anyhow!(
                "設定ファイル '{}' を読み込めません: {e:?}",
                config_path.display()
            )
        })?;
    info!(path = %model_path.display(), "保存済みモデルをロード中...");
    let model = config
        .init::<MyBackend>(&device)
        .load_file(
            &model_path,
            &NamedMpkFileRecorder::<FullPrecisionSettings>::new(),
            &device,
        )
        .with_context(|| format!("モデル '{}' の読み込みに失敗しました", model_path.display()))?;

    // --- コロケーション点での損失項 ---
    let equation = HeatEquationConfig::new().with_diffusivity(args.diffusivity);
    let batch = CollocationBatch::<MyBackend>::sample(&SamplingConfig::new(), args.seed, &device);
    let losses = heat_losses(&model, &batch, &equation)?.summary();
    info!(
        initial = losses.initial,
        boundary = losses.boundary,
        diff_eqn = losses.diff_eqn,
        total = losses.total,
        "損失項を評価しました"
    );

    // --- グリッド上の導関数 ---
    let evaluation_start = Instant::now();
    let coords = grid::<MyBackend>(args.n_t, args.n_x, &device).require_grad();
    let u = model.forward(coords.clone());
    let du = first_derivative(&model, &coords)?;
    let d2u = second_derivative(&model, &coords, X_AXIS)?;
    let evaluation_duration = evaluation_start.elapsed();

    let n = args.n_t * args.n_x;
    let residual = du
        .clone()
        .slice([0..n, T_AXIS..T_AXIS + 1])
        .sub(d2u.clone().slice([0..n, X_AXIS..X_AXIS + 1]).mul_scalar(args.diffusivity));
    let worst = column(residual, 0)?
        .into_iter()
        .fold(0.0f32, |acc, r| acc.max(r.abs()));
    info!(
        grid = %format!("{}x{}={}", args.n_t, args.n_x, n),
        shape = ?du.dims(),
        max_abs_residual = worst,
        elapsed = ?evaluation_duration,
        "グリッド上の導関数を計算しました"
    );

    // --- 最終時刻の断面を描画 ---
    let last = (args.n_t - 1) * args.n_x..n;
    let profile = Profile {
        x: column(coords.slice([last.clone(), 0..2]), X_AXIS)?,
        u: column(u.slice([last.clone(), 0..1]), 0)?,
        u_x: column(du.slice([last.clone(), 0..2]), X_AXIS)?,
        u_xx: column(d2u.slice([last, 0..2]), X_AXIS)?,
    };
    plot_profile(&args.plot, &profile)
        .map_err(|e| anyhow!("グラフの描画に失敗しました: {e}"))?;
    info!(path = %args.plot.display(), "断面グラフを保存しました");

    Ok(())
}

fn column(tensor: Tensor<MyBackend, 2>, index: usize) -> Result<Vec<f32>> {
    let [rows, _] = tensor.dims();
    tensor
        .slice([0..rows, index..index + 1])
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("テンソルを読み出せません: {e:?}"))
}

/// 最終時刻での u, u_x, u_xx の断面をPNGファイルに出力します。
fn plot_profile(path: &Path, profile: &Profile) -> Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let values = profile.u.iter().chain(&profile.u_x).chain(&profile.u_xx);
    let (y_min, y_max) = values.fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let pad = ((y_max - y_min) * 0.1).max(1e-3);
    let x_min = profile.x.first().copied().unwrap_or(-1.0);
    let x_max = profile.x.last().copied().unwrap_or(1.0);

    let mut chart = ChartBuilder::on(&root)
        .caption("Profile at final time", ("sans-serif", 40).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, (y_min - pad)..(y_max + pad))?;
    chart.configure_mesh().x_desc("x").y_desc("value").draw()?;

    let series = [
        ("u", &profile.u, RED),
        ("du/dx", &profile.u_x, BLUE),
        ("d2u/dx2", &profile.u_xx, GREEN),
    ];
    for (label, ys, color) in series {
        chart
            .draw_series(LineSeries::new(
                profile.x.iter().copied().zip(ys.iter().copied()),
                &color,
            ))?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }
    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}
