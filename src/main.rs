//! # 熱拡散 PINN の導関数抽出プログラム
//!
//! `burn` フレームワークで構築した残差ネットワークについて、入力座標 `(t, x)` に
//! 関する一階・二階導関数を求め、1次元熱方程式の残差を評価します。
//!
//! ## 使い方
//!
//! ### モデルの初期化
//! ```bash
//! cargo run --release -- init --seed 42
//! ```
//!
//! ### 導関数と残差の評価
//! ```bash
//! cargo run --release -- evaluate --plot derivatives.png
//! ```
//!
//! ### 解析解による検証
//! ```bash
//! cargo run --release -- check
//! ```

use clap::Parser;
use heat_pinn::cli::{Cli, Commands};
use heat_pinn::telemetry::{self, TelemetryConfig};
use heat_pinn::{check, evaluation, initialize};

/// プログラムのエントリーポイント。
///
/// コマンドライン引数を解析し、各サブコマンドの処理に振り分けます。
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init(&TelemetryConfig {
        filter: cli.log_filter.clone(),
        ..TelemetryConfig::default()
    })?;

    match &cli.command {
        Commands::Init(args) => initialize::run(args),
        Commands::Evaluate(args) => evaluation::run(args),
        Commands::Check => check::run(),
    }
}
