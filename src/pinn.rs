use std::f64::consts::PI;

use burn::config::Config;
use burn::nn::loss::{MseLoss, Reduction};
use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor};

use crate::derivative::{DifferentiableMap, derivatives};
use crate::error::DerivativeError;
use crate::sampling::CollocationBatch;

/// 入力座標 `(t, x)` の列数。
pub const N_COORDS: usize = 2;
/// 入力座標の時間の列。
pub const T_AXIS: usize = 0;
/// 入力座標の空間の列。
pub const X_AXIS: usize = 1;

pub const T_MIN: f32 = 0.0;
pub const T_MAX: f32 = 1.0;
pub const X_MIN: f32 = -1.0;
pub const X_MAX: f32 = 1.0;

/// 1 次元熱方程式 `u_t = α u_xx` の係数。
#[derive(Config, Debug)]
pub struct HeatEquationConfig {
    /// 熱拡散率 `α`。
    #[config(default = 0.1)]
    pub diffusivity: f64,
}

/// 初期条件 `u(0, x) = sin(π x)`。
pub fn initial_condition<B: Backend>(x: Tensor<B, 2>) -> Tensor<B, 2> {
    x.mul_scalar(PI).sin()
}

/// 熱方程式の残差 `u_t - α u_xx` を計算します。形状は `[B, 1]` です。
///
/// 残差はモデルのパラメータに関して微分可能なまま返ります。
pub fn heat_residual<B, M>(
    model: &M,
    coords: &Tensor<B, 2>,
    equation: &HeatEquationConfig,
) -> Result<Tensor<B, 2>, DerivativeError>
where
    B: Backend,
    M: DifferentiableMap<B> + ?Sized,
{
    let [batch, _] = coords.dims();
    let derivatives = derivatives(model, coords, X_AXIS)?;
    let u_t = derivatives.gradient.slice([0..batch, T_AXIS..T_AXIS + 1]);
    let u_xx = derivatives.mixed.slice([0..batch, X_AXIS..X_AXIS + 1]);
    Ok(u_t.sub(u_xx.mul_scalar(equation.diffusivity)))
}

/// 物理損失を計算します。
///
/// 熱方程式の残差（0になるべき値）の二乗平均誤差を損失として返します。
pub fn physics_loss<B, M>(
    model: &M,
    coords: &Tensor<B, 2>,
    equation: &HeatEquationConfig,
) -> Result<Tensor<B, 1>, DerivativeError>
where
    B: Backend,
    M: DifferentiableMap<B> + ?Sized,
{
    let residual = heat_residual(model, coords, equation)?;
    let zeros = Tensor::zeros_like(&residual);
    Ok(MseLoss::new().forward(residual, zeros, Reduction::Mean))
}

/// 損失の各項。
#[derive(Clone, Debug)]
pub struct HeatLoss<B: Backend> {
    pub initial: Tensor<B, 1>,
    pub boundary: Tensor<B, 1>,
    pub diff_eqn: Tensor<B, 1>,
    pub total: Tensor<B, 1>,
}

/// [`HeatLoss`] をスカラーに変換したもの。
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LossSummary {
    pub initial: f64,
    pub boundary: f64,
    pub diff_eqn: f64,
    pub total: f64,
}

impl<B: Backend> HeatLoss<B> {
    pub fn summary(&self) -> LossSummary {
        let scalar = |t: &Tensor<B, 1>| t.clone().into_scalar().elem::<f64>();
        LossSummary {
            initial: scalar(&self.initial),
            boundary: scalar(&self.boundary),
            diff_eqn: scalar(&self.diff_eqn),
            total: scalar(&self.total),
        }
    }
}

/// 初期条件・境界条件・微分方程式の各損失項を計算します。
///
/// 境界条件は `u(t, ±1) = 0` の同次ディリクレ条件です。
pub fn heat_losses<B, M>(
    model: &M,
    batch: &CollocationBatch<B>,
    equation: &HeatEquationConfig,
) -> Result<HeatLoss<B>, DerivativeError>
where
    B: Backend,
    M: DifferentiableMap<B> + ?Sized,
{
    let mse = MseLoss::new();

    let pred_initial = model.forward(batch.initial.clone());
    let initial = mse.forward(pred_initial, batch.initial_target.clone(), Reduction::Mean);

    let pred_boundary = model.forward(batch.boundary.clone());
    let zeros = Tensor::zeros_like(&pred_boundary);
    let boundary = mse.forward(pred_boundary, zeros, Reduction::Mean);

    let diff_eqn = physics_loss(model, &batch.interior, equation)?;
    let total = initial.clone() + boundary.clone() + diff_eqn.clone();

    Ok(HeatLoss {
        initial,
        boundary,
        diff_eqn,
        total,
    })
}
