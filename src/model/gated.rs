use burn::config::Config;
use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::prelude::Backend;

use crate::derivative::DifferentiableMap;
use crate::jet::Jet;

/// [`GatedNet`] の構成。
#[derive(Config, Debug)]
pub struct GatedNetConfig {
    pub n_inputs: usize,
    pub n_outputs: usize,
    #[config(default = 32)]
    pub n_hidden: usize,
    /// ゲート層の数。
    #[config(default = 3)]
    pub n_layers: usize,
}

impl GatedNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> GatedNet<B> {
        let encoder = || LinearConfig::new(self.n_inputs, self.n_hidden).init(device);
        GatedNet {
            encoder_u: encoder(),
            encoder_v: encoder(),
            input: encoder(),
            gates: (0..self.n_layers)
                .map(|_| LinearConfig::new(self.n_hidden, self.n_hidden).init(device))
                .collect(),
            head: LinearConfig::new(self.n_hidden, self.n_outputs).init(device),
        }
    }
}

/// Wang, Teng & Perdikaris (2020) の修正 MLP。
///
/// 2 つのエンコーダ `U = tanh(x W_u)`, `V = tanh(x W_v)` を用意し、各層の出力
/// `Z = tanh(H W_z)` で `H ← (1 - Z)⊙U + Z⊙V` と混合します。
#[derive(Module, Debug)]
pub struct GatedNet<B: Backend> {
    encoder_u: Linear<B>,
    encoder_v: Linear<B>,
    input: Linear<B>,
    gates: Vec<Linear<B>>,
    head: Linear<B>,
}

impl<B: Backend> DifferentiableMap<B> for GatedNet<B> {
    fn forward_jet(&self, input: Jet<B>) -> Jet<B> {
        let u = input.clone().linear(&self.encoder_u).tanh();
        let v = input.clone().linear(&self.encoder_v).tanh();
        let spread = v.sub(u.clone());

        let hidden = input.linear(&self.input).tanh();
        self.gates
            .iter()
            .fold(hidden, |h, gate| {
                let z = h.linear(gate).tanh();
                u.clone().add(z.mul(spread.clone()))
            })
            .linear(&self.head)
    }
}
