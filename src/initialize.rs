use std::fs;

use anyhow::{Context, Result};
use burn::backend::NdArray;
use burn::config::Config;
use burn::module::Module;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use burn::tensor::backend::Backend;
use tracing::info;

use crate::cli::InitArgs;
use crate::model::ResidualNetConfig;
use crate::pinn::N_COORDS;
use crate::{CONFIG_FILENAME, MODEL_FILENAME};

type MyBackend = NdArray<f32>;

/// `init`サブコマンドを実行します。
///
/// 乱数シードを明示的に設定してから残差ネットワークを初期化し、
/// 設定と重みを保存します。
pub fn run(args: &InitArgs) -> Result<()> {
    let device = Default::default();
    MyBackend::seed(args.seed);

    let config = ResidualNetConfig::new(N_COORDS, 1)
        .with_n_blocks(args.blocks)
        .with_block_width(args.width);
    let model = config.init::<MyBackend>(&device);
    info!(
        seed = args.seed,
        blocks = args.blocks,
        width = args.width,
        params = model.num_params(),
        "残差ネットワークを初期化しました"
    );

    fs::create_dir_all(&args.artifact_dir).with_context(|| {
        format!(
            "保存先 '{}' を作成できません",
            args.artifact_dir.display()
        )
    })?;

    let config_path = args.artifact_dir.join(CONFIG_FILENAME);
    config
        .save(&config_path)
        .with_context(|| format!("設定 '{}' の保存に失敗しました", config_path.display()))?;

    let model_path = args.artifact_dir.join(MODEL_FILENAME);
    model
        .save_file(
            &model_path,
            &NamedMpkFileRecorder::<FullPrecisionSettings>::new(),
        )
        .with_context(|| format!("モデル '{}' の保存に失敗しました", model_path.display()))?;
    info!(path = %model_path.display(), "モデルを保存しました");

    Ok(())
}
