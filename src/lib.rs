//! # 熱拡散 PINN のための導関数抽出ライブラリ
//!
//! `burn` フレームワークを使用して、物理情報ニューラルネットワーク（PINN）の
//! 出力を入力座標で微分し、1次元熱方程式の残差を組み立てるための
//! 主要なコンポーネントを提供します。
//!
//! - [`derivative`]: 一階・二階導関数の抽出（[`first_derivative`], [`second_derivative`]）
//! - [`jet`]: 入力に関する導関数を順伝播で運ぶ [`jet::Jet`]
//! - [`model`]: 残差・正弦波・ゲート付きの各ネットワーク
//! - [`pinn`]: 熱方程式の残差と損失項

pub mod analytic;
pub mod check;
pub mod cli;
pub mod derivative;
pub mod error;
pub mod evaluation;
pub mod initialize;
pub mod jet;
pub mod model;
pub mod pinn;
pub mod sampling;
pub mod telemetry;

pub use derivative::{
    Derivatives, DifferentiableMap, derivatives, first_derivative, second_derivative,
};
pub use error::DerivativeError;

/// モデルを保存するファイル名
pub const MODEL_FILENAME: &str = "pinn_model.mpk";
/// モデルの構成を保存するファイル名
pub const CONFIG_FILENAME: &str = "config.json";
