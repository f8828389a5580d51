//! 導関数が解析的に分かっている参照用の写像。
//!
//! 導関数抽出の検証（`check` サブコマンドとテスト）に使います。

use std::f64::consts::PI;

use burn::tensor::backend::Backend;

use crate::derivative::DifferentiableMap;
use crate::jet::Jet;

/// 恒等写像 `f(x) = x`。
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;

impl<B: Backend> DifferentiableMap<B> for Identity {
    fn forward_jet(&self, input: Jet<B>) -> Jet<B> {
        input
    }
}

/// `f(x) = x²`
#[derive(Clone, Copy, Debug, Default)]
pub struct Square;

impl<B: Backend> DifferentiableMap<B> for Square {
    fn forward_jet(&self, input: Jet<B>) -> Jet<B> {
        input.square()
    }
}

/// `f(x) = sin(x)`
#[derive(Clone, Copy, Debug, Default)]
pub struct Sine;

impl<B: Backend> DifferentiableMap<B> for Sine {
    fn forward_jet(&self, input: Jet<B>) -> Jet<B> {
        input.sin()
    }
}

/// 2 入力の写像 `g(x0, x1) = a·x0² + b·x0 + c·x1`。
#[derive(Clone, Copy, Debug)]
pub struct Combiner {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Combiner {
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }
}

impl<B: Backend> DifferentiableMap<B> for Combiner {
    fn forward_jet(&self, input: Jet<B>) -> Jet<B> {
        let x0 = input.clone().columns(0..1);
        let x1 = input.columns(1..2);
        x0.clone()
            .square()
            .mul_scalar(self.a)
            .add(x0.mul_scalar(self.b))
            .add(x1.mul_scalar(self.c))
    }
}

/// 1 次元熱方程式 `u_t = α u_xx` の厳密解 `u(t, x) = exp(-α π² t) · sin(π x)`。
///
/// 初期条件 `u(0, x) = sin(π x)` と境界条件 `u(t, ±1) = 0` を満たします。
/// 入力の列は `(t, x)` です。
#[derive(Clone, Copy, Debug)]
pub struct HeatSolution {
    pub diffusivity: f64,
}

impl<B: Backend> DifferentiableMap<B> for HeatSolution {
    fn forward_jet(&self, input: Jet<B>) -> Jet<B> {
        let decay = input
            .clone()
            .columns(0..1)
            .mul_scalar(-self.diffusivity * PI * PI)
            .exp();
        let wave = input.columns(1..2).mul_scalar(PI).sin();
        decay.mul(wave)
    }
}
