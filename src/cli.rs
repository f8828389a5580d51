use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// clapでコマンドラインの構造を定義します。
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Derivative extraction for a heat-diffusion PINN with Burn",
    long_about = None
)]
pub struct Cli {
    /// ログのフィルタ指定（`RUST_LOG` が設定されていればそちらを優先します）
    #[arg(long, global = true, default_value = "heat_pinn=info")]
    pub log_filter: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// 実行するサブコマンドを定義します。
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 残差ネットワークを初期化し、設定と重みをファイルに保存します
    Init(InitArgs),
    /// 保存されたモデルの導関数と熱方程式の残差を評価します
    Evaluate(EvaluateArgs),
    /// 解析的な導関数が分かっている写像で導関数の抽出を検証します
    Check,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// パラメータ初期化の乱数シード
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
    /// 残差ブロックの数
    #[arg(long, default_value_t = 2)]
    pub blocks: usize,
    /// 残差ブロックの幅
    #[arg(long, default_value_t = 32)]
    pub width: usize,
    /// 設定と重みの保存先
    #[arg(long, default_value = "artifacts")]
    pub artifact_dir: PathBuf,
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// 設定と重みの読み込み元
    #[arg(long, default_value = "artifacts")]
    pub artifact_dir: PathBuf,
    /// コロケーション点の乱数シード
    #[arg(long, default_value_t = 7)]
    pub seed: u64,
    /// 熱拡散率 α
    #[arg(long, default_value_t = 0.1)]
    pub diffusivity: f64,
    /// グリッドの時間方向の点数
    #[arg(long, default_value_t = 50)]
    pub n_t: usize,
    /// グリッドの空間方向の点数
    #[arg(long, default_value_t = 50)]
    pub n_x: usize,
    /// 最終時刻での u, u_x, u_xx の断面を描画する PNG ファイル
    #[arg(long, default_value = "derivatives.png")]
    pub plot: PathBuf,
}
