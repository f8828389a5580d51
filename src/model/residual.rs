use burn::config::Config;
use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::prelude::Backend;

use crate::derivative::DifferentiableMap;
use crate::jet::Jet;

/// 残差ブロック `y = L2(tanh(L1 x)) + P(x)`。
///
/// 入力幅と出力幅が異なる場合だけ、`P` は線形射影になります。
#[derive(Module, Debug)]
pub struct ResidualBlock<B: Backend> {
    inner: Linear<B>,
    outer: Linear<B>,
    projection: Option<Linear<B>>,
}

impl<B: Backend> ResidualBlock<B> {
    pub fn new(n_inputs: usize, n_outputs: usize, device: &B::Device) -> Self {
        let projection =
            (n_inputs != n_outputs).then(|| LinearConfig::new(n_inputs, n_outputs).init(device));
        Self {
            inner: LinearConfig::new(n_inputs, n_outputs).init(device),
            outer: LinearConfig::new(n_outputs, n_outputs).init(device),
            projection,
        }
    }

    pub fn has_projection(&self) -> bool {
        self.projection.is_some()
    }
}

impl<B: Backend> DifferentiableMap<B> for ResidualBlock<B> {
    fn forward_jet(&self, input: Jet<B>) -> Jet<B> {
        let skip = match &self.projection {
            Some(projection) => input.clone().linear(projection),
            None => input.clone(),
        };
        input
            .linear(&self.inner)
            .tanh()
            .linear(&self.outer)
            .add(skip)
    }
}

/// [`ResidualNet`] の構成。
#[derive(Config, Debug)]
pub struct ResidualNetConfig {
    pub n_inputs: usize,
    pub n_outputs: usize,
    #[config(default = 2)]
    pub n_blocks: usize,
    #[config(default = 32)]
    pub block_width: usize,
}

impl ResidualNetConfig {
    /// 新しいモデルを初期化します。
    pub fn init<B: Backend>(&self, device: &B::Device) -> ResidualNet<B> {
        let blocks = (0..self.n_blocks)
            .map(|i| {
                let n_inputs = if i == 0 { self.n_inputs } else { self.block_width };
                ResidualBlock::new(n_inputs, self.block_width, device)
            })
            .collect();
        let head_inputs = if self.n_blocks == 0 {
            self.n_inputs
        } else {
            self.block_width
        };
        ResidualNet {
            blocks,
            head: LinearConfig::new(head_inputs, self.n_outputs).init(device),
        }
    }
}

/// PINNの本体となる残差ネットワーク。
///
/// 座標 `(t, x)` を入力とし、その点における温度 `u` を予測します。
#[derive(Module, Debug)]
pub struct ResidualNet<B: Backend> {
    blocks: Vec<ResidualBlock<B>>,
    head: Linear<B>,
}

impl<B: Backend> ResidualNet<B> {
    pub fn blocks(&self) -> &[ResidualBlock<B>] {
        &self.blocks
    }
}

impl<B: Backend> DifferentiableMap<B> for ResidualNet<B> {
    fn forward_jet(&self, input: Jet<B>) -> Jet<B> {
        self.blocks
            .iter()
            .fold(input, |x, block| block.forward_jet(x))
            .linear(&self.head)
    }
}
