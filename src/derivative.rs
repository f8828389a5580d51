//! # 導関数の抽出
//!
//! バッチ化された写像 `f: R^(B×Ni) → R^(B×No)` について、サンプルごとの
//! 一階導関数と、指定した入力次元に関する二階導関数を求めます。
//!
//! 一階導関数は [`Jet`] による前進的な伝播で求めるため、結果は入力バッチと
//! パラメータの計算グラフにつながったままです。二階導関数はその列を総和して
//! スカラーにし、逆伝播で入力バッチに関する勾配を取ります。サンプル間に
//! 相互作用のない写像では、総和の勾配はサンプルごとの偏微分に分解されます。

use burn::tensor::Tensor;
use burn::tensor::backend::{AutodiffBackend, Backend};
use tracing::debug;

use crate::error::DerivativeError;
use crate::jet::Jet;

/// 入力に関する導関数を計算できるバッチ写像。
///
/// 評価は純粋でなければならず、サンプル間の相互作用（実行統計を持つバッチ正規化など）
/// を含んではいけません。
pub trait DifferentiableMap<B: Backend> {
    /// 値と入力に関する導関数をまとめて順伝播します。
    fn forward_jet(&self, input: Jet<B>) -> Jet<B>;

    /// 値だけを順伝播します。
    fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        self.forward_jet(Jet::constant(input)).into_value()
    }
}

/// 1 回の順伝播で得られる値と導関数。すべてパラメータの計算グラフにつながっています。
#[derive(Clone, Debug)]
pub struct Derivatives<B: Backend> {
    /// 写像の出力。形状 `[B, No]`。
    pub value: Tensor<B, 2>,
    /// 出力の和の勾配。形状 `[B, Ni]`。
    pub gradient: Tensor<B, 2>,
    /// 出力の和の `∂²/∂x_i∂x_k`。形状 `[B, Ni]`。
    pub mixed: Tensor<B, 2>,
}

/// サンプルごとの一階導関数を計算します。
///
/// 結果の `[b, i]` 成分は `∂(Σ_o f_o(x_b)) / ∂x_{b,i}` です。入力バッチは
/// `require_grad()` で勾配追跡を有効にした葉テンソルである必要があります。
pub fn first_derivative<B, M>(
    map: &M,
    input: &Tensor<B, 2>,
) -> Result<Tensor<B, 2>, DerivativeError>
where
    B: AutodiffBackend,
    M: DifferentiableMap<B> + ?Sized,
{
    if !input.is_require_grad() {
        return Err(DerivativeError::invalid_input(
            "入力が require_grad() を付けた葉テンソルではありません",
        ));
    }
    let (_, gradient) = propagate(map, input, None)?;
    Ok(gradient)
}

/// 入力次元 `index` に関する二階導関数を計算します。
///
/// 結果の `[b, i]` 成分は `∂²(Σ_o f_o) / ∂x_i∂x_k`（`k = index`）です。
/// 全ヘッセ行列が必要な場合は入力次元の数だけ呼び出します。
pub fn second_derivative<B, M>(
    map: &M,
    input: &Tensor<B, 2>,
    index: usize,
) -> Result<Tensor<B, 2>, DerivativeError>
where
    B: AutodiffBackend,
    M: DifferentiableMap<B> + ?Sized,
{
    let [batch, dims] = input.dims();
    if index >= dims {
        return Err(DerivativeError::IndexOutOfRange { index, dims });
    }

    let gradient = first_derivative(map, input)?;
    let column = gradient.slice([0..batch, index..index + 1]);
    let grads = column.sum().backward();

    // 列が入力に依存しない場合、入力の勾配は記録されない。
    let second = match input.grad(&grads) {
        Some(inner) => Tensor::from_inner(inner),
        None => Tensor::zeros([batch, dims], &input.device()),
    };
    ensure_finite(&second, "二階導関数")?;
    debug!(batch, dims, index, "二階導関数を逆伝播で計算しました");
    Ok(second)
}

/// 値・勾配・`mixed_axis` に沿った二階偏微分を 1 回の順伝播で求めます。
///
/// 勾配追跡は不要で、結果はパラメータに関して微分可能なまま返ります。
/// PINN の残差を損失に組み込む場合はこちらを使います。
pub fn derivatives<B, M>(
    map: &M,
    input: &Tensor<B, 2>,
    mixed_axis: usize,
) -> Result<Derivatives<B>, DerivativeError>
where
    B: Backend,
    M: DifferentiableMap<B> + ?Sized,
{
    let [_, dims] = input.dims();
    if mixed_axis >= dims {
        return Err(DerivativeError::IndexOutOfRange {
            index: mixed_axis,
            dims,
        });
    }

    let (output, gradient) = propagate(map, input, Some(mixed_axis))?;
    let mixed = output
        .mixed_partials()
        .ok_or_else(|| DerivativeError::invalid_input("二階成分が伝播されませんでした"))?;
    ensure_finite(&mixed, "二階導関数")?;

    Ok(Derivatives {
        value: output.into_value(),
        gradient,
        mixed,
    })
}

fn propagate<B, M>(
    map: &M,
    input: &Tensor<B, 2>,
    mixed_axis: Option<usize>,
) -> Result<(Jet<B>, Tensor<B, 2>), DerivativeError>
where
    B: Backend,
    M: DifferentiableMap<B> + ?Sized,
{
    let [batch, dims] = input.dims();
    if batch == 0 || dims == 0 {
        return Err(DerivativeError::invalid_input(format!(
            "空のバッチです（形状: [{batch}, {dims}]）"
        )));
    }
    if first_non_finite(input).is_some() {
        return Err(DerivativeError::invalid_input("非有限値が含まれています"));
    }

    debug!(batch, dims, ?mixed_axis, "ジェットを伝播します");
    let output = map.forward_jet(Jet::seed(input.clone(), mixed_axis));
    ensure_finite(&output.value(), "写像の出力")?;

    let gradient = output
        .gradient()
        .ok_or_else(|| DerivativeError::invalid_input("写像が入力の接ベクトルを保持していません"))?;
    ensure_finite(&gradient, "一階導関数")?;

    Ok((output, gradient))
}

fn first_non_finite<B: Backend>(tensor: &Tensor<B, 2>) -> Option<usize> {
    tensor
        .to_data()
        .iter::<f64>()
        .position(|value| !value.is_finite())
}

fn ensure_finite<B: Backend>(
    tensor: &Tensor<B, 2>,
    quantity: &'static str,
) -> Result<(), DerivativeError> {
    match first_non_finite(tensor) {
        Some(position) => Err(DerivativeError::Numerical { quantity, position }),
        None => Ok(()),
    }
}
