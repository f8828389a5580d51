//! # 入力空間の導関数を前進的に運ぶジェット
//!
//! `burn` の自動微分は逆伝播の結果をもう一度逆伝播できないため、入力に関する
//! 導関数は順伝播と同時に運びます。[`Jet`] はバッチの値に加え、入力次元ごとの
//! 接ベクトル（一階偏微分）と、指定した 1 軸に沿った二階偏微分を保持します。
//!
//! すべての成分は通常の `burn` テンソルなので、入力バッチとネットワークの
//! パラメータ双方の計算グラフにつながったままになります。

use std::ops::Range;

use burn::nn::Linear;
use burn::tensor::Tensor;
use burn::tensor::backend::Backend;

/// 値と入力に関する偏微分をまとめたバッチ。
///
/// - `value`: 形状 `[B, N]`
/// - `partials[i]`: `∂value/∂x_i`、形状 `[B, N]`
/// - `mixed[i]`: `∂²value/∂x_i∂x_k`（`k = mixed_axis`）、形状 `[B, N]`
///
/// 同じ [`Jet::seed`] から派生したジェット同士でのみ二項演算できます。
#[derive(Clone, Debug)]
pub struct Jet<B: Backend> {
    value: Tensor<B, 2>,
    partials: Vec<Tensor<B, 2>>,
    mixed_axis: Option<usize>,
    mixed: Vec<Tensor<B, 2>>,
}

impl<B: Backend> Jet<B> {
    /// 微分方向を持たないジェット。通常の順伝播に使います。
    pub fn constant(value: Tensor<B, 2>) -> Self {
        Self {
            value,
            partials: Vec::new(),
            mixed_axis: None,
            mixed: Vec::new(),
        }
    }

    /// 入力バッチから、各入力次元を単位接ベクトルとするジェットを作ります。
    ///
    /// `mixed_axis` を指定すると、その軸に沿った二階偏微分も運びます。
    pub fn seed(input: Tensor<B, 2>, mixed_axis: Option<usize>) -> Self {
        let [batch, dims] = input.dims();
        debug_assert!(mixed_axis.is_none_or(|axis| axis < dims));
        let device = input.device();

        // 定数の単位ベクトルに 0·x を足し、接ベクトルを入力の計算グラフにつないでおく。
        let anchor = input.clone().mul_scalar(0.0);
        let partials = (0..dims)
            .map(|i| {
                let unit = Tensor::<B, 2>::zeros([batch, dims], &device)
                    .slice_assign([0..batch, i..i + 1], Tensor::ones([batch, 1], &device));
                unit.add(anchor.clone())
            })
            .collect();
        let mixed = match mixed_axis {
            Some(_) => vec![anchor; dims],
            None => Vec::new(),
        };

        Self {
            value: input,
            partials,
            mixed_axis,
            mixed,
        }
    }

    pub fn value(&self) -> Tensor<B, 2> {
        self.value.clone()
    }

    pub fn into_value(self) -> Tensor<B, 2> {
        self.value
    }

    /// 運んでいる微分方向の数（シードした入力の次元数）。
    pub fn directions(&self) -> usize {
        self.partials.len()
    }

    /// 出力成分の和の勾配。形状 `[B, Ni]`。微分方向がなければ `None`。
    pub fn gradient(&self) -> Option<Tensor<B, 2>> {
        Self::reduce(&self.partials)
    }

    /// 出力成分の和の `∂²/∂x_i∂x_k`。形状 `[B, Ni]`。二階成分がなければ `None`。
    pub fn mixed_partials(&self) -> Option<Tensor<B, 2>> {
        Self::reduce(&self.mixed)
    }

    fn reduce(components: &[Tensor<B, 2>]) -> Option<Tensor<B, 2>> {
        if components.is_empty() {
            return None;
        }
        let columns = components.iter().map(|c| c.clone().sum_dim(1)).collect();
        Some(Tensor::cat(columns, 1))
    }

    /// 全結合層 `x W + b` を適用します。接成分にはバイアスが掛かりません。
    pub fn linear(self, layer: &Linear<B>) -> Self {
        let weight = layer.weight.val();
        let tangent = |t: Tensor<B, 2>| t.matmul(weight.clone());
        Self {
            value: layer.forward(self.value),
            partials: self.partials.into_iter().map(&tangent).collect(),
            mixed_axis: self.mixed_axis,
            mixed: self.mixed.into_iter().map(&tangent).collect(),
        }
    }

    /// 要素ごとの関数 `f` を連鎖律で適用します。
    ///
    /// `derivatives` は値を受け取り `[f(v), f'(v), f''(v)]` を返します。
    /// 折れ点を持つ関数では、ここで返された劣勾配がそのまま伝播します。
    pub fn unary<F>(self, derivatives: F) -> Self
    where
        F: FnOnce(Tensor<B, 2>) -> [Tensor<B, 2>; 3],
    {
        let [value, slope, curvature] = derivatives(self.value);
        let mixed = match self.mixed_axis {
            Some(axis) => {
                let along = self.partials[axis].clone();
                self.mixed
                    .into_iter()
                    .zip(&self.partials)
                    .map(|(m, p)| {
                        curvature
                            .clone()
                            .mul(p.clone())
                            .mul(along.clone())
                            .add(slope.clone().mul(m))
                    })
                    .collect()
            }
            None => Vec::new(),
        };
        let partials = self
            .partials
            .into_iter()
            .map(|p| slope.clone().mul(p))
            .collect();

        Self {
            value,
            partials,
            mixed_axis: self.mixed_axis,
            mixed,
        }
    }

    pub fn tanh(self) -> Self {
        self.unary(|x| {
            let t = x.tanh();
            let slope = t.clone().mul(t.clone()).neg().add_scalar(1.0);
            let curvature = t.clone().mul(slope.clone()).mul_scalar(-2.0);
            [t, slope, curvature]
        })
    }

    pub fn sin(self) -> Self {
        self.unary(|x| {
            let s = x.clone().sin();
            [s.clone(), x.cos(), s.neg()]
        })
    }

    pub fn exp(self) -> Self {
        self.unary(|x| {
            let e = x.exp();
            [e.clone(), e.clone(), e]
        })
    }

    pub fn square(self) -> Self {
        self.unary(|x| {
            let two = Tensor::ones_like(&x).mul_scalar(2.0);
            [x.clone().mul(x.clone()), x.mul_scalar(2.0), two]
        })
    }

    pub fn mul_scalar(self, factor: f64) -> Self {
        Self {
            value: self.value.mul_scalar(factor),
            partials: scale(self.partials, factor),
            mixed_axis: self.mixed_axis,
            mixed: scale(self.mixed, factor),
        }
    }

    pub fn add(self, rhs: Self) -> Self {
        self.check_compatible(&rhs);
        Self {
            value: self.value.add(rhs.value),
            partials: zip_with(self.partials, rhs.partials, |l, r| l.add(r)),
            mixed_axis: self.mixed_axis,
            mixed: zip_with(self.mixed, rhs.mixed, |l, r| l.add(r)),
        }
    }

    pub fn sub(self, rhs: Self) -> Self {
        self.check_compatible(&rhs);
        Self {
            value: self.value.sub(rhs.value),
            partials: zip_with(self.partials, rhs.partials, |l, r| l.sub(r)),
            mixed_axis: self.mixed_axis,
            mixed: zip_with(self.mixed, rhs.mixed, |l, r| l.sub(r)),
        }
    }

    /// 要素ごとの積。積の法則を二階まで適用します。
    pub fn mul(self, rhs: Self) -> Self {
        self.check_compatible(&rhs);
        let (a, b) = (&self.value, &rhs.value);

        let mixed = match self.mixed_axis {
            Some(axis) => {
                let a_k = &self.partials[axis];
                let b_k = &rhs.partials[axis];
                self.mixed
                    .iter()
                    .zip(&rhs.mixed)
                    .zip(self.partials.iter().zip(&rhs.partials))
                    .map(|((ma, mb), (a_i, b_i))| {
                        ma.clone()
                            .mul(b.clone())
                            .add(a_i.clone().mul(b_k.clone()))
                            .add(a_k.clone().mul(b_i.clone()))
                            .add(a.clone().mul(mb.clone()))
                    })
                    .collect()
            }
            None => Vec::new(),
        };
        let partials = self
            .partials
            .iter()
            .zip(&rhs.partials)
            .map(|(a_i, b_i)| a_i.clone().mul(b.clone()).add(a.clone().mul(b_i.clone())))
            .collect();

        Self {
            value: self.value.mul(rhs.value),
            partials,
            mixed_axis: self.mixed_axis,
            mixed,
        }
    }

    /// 出力の列 `range` を取り出します。
    pub fn columns(self, range: Range<usize>) -> Self {
        let [batch, _] = self.value.dims();
        let slice = |t: Tensor<B, 2>| t.slice([0..batch, range.clone()]);
        Self {
            value: slice(self.value),
            partials: self.partials.into_iter().map(&slice).collect(),
            mixed_axis: self.mixed_axis,
            mixed: self.mixed.into_iter().map(&slice).collect(),
        }
    }

    fn check_compatible(&self, rhs: &Self) {
        debug_assert_eq!(self.partials.len(), rhs.partials.len());
        debug_assert_eq!(self.mixed_axis, rhs.mixed_axis);
    }
}

fn scale<B: Backend>(components: Vec<Tensor<B, 2>>, factor: f64) -> Vec<Tensor<B, 2>> {
    components
        .into_iter()
        .map(|c| c.mul_scalar(factor))
        .collect()
}

fn zip_with<B: Backend>(
    lhs: Vec<Tensor<B, 2>>,
    rhs: Vec<Tensor<B, 2>>,
    op: fn(Tensor<B, 2>, Tensor<B, 2>) -> Tensor<B, 2>,
) -> Vec<Tensor<B, 2>> {
    lhs.into_iter().zip(rhs).map(|(l, r)| op(l, r)).collect()
}
