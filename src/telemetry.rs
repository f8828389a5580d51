//! ログ出力の初期化。
//!
//! ライブラリ側は `tracing` のイベントを出すだけで、購読者の設定はアプリケーションの
//! 起動時に [`init`] へ明示的に渡します。

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

/// ログ出力の設定。
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// フィルタ指定（例: `heat_pinn=debug,info`）。`RUST_LOG` があればそちらを優先します。
    pub filter: String,
    pub with_ansi: bool,
    pub with_target: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: "heat_pinn=info".to_string(),
            with_ansi: true,
            with_target: false,
        }
    }
}

/// グローバルな購読者を登録します。プロセスにつき 1 回だけ呼び出します。
pub fn init(config: &TelemetryConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.with_ansi)
        .with_target(config.with_target)
        .try_init()
        .map_err(|e| anyhow!("ログの初期化に失敗しました: {e}"))
}
