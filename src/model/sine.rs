use burn::config::Config;
use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::prelude::Backend;

use crate::derivative::DifferentiableMap;
use crate::jet::Jet;

/// [`SineNet`] の構成。
#[derive(Config, Debug)]
pub struct SineNetConfig {
    pub n_inputs: usize,
    pub n_outputs: usize,
    #[config(default = 32)]
    pub n_hidden: usize,
    #[config(default = 3)]
    pub n_layers: usize,
    /// 活性化 `sin(ω z)` の角周波数 `ω`。
    #[config(default = 1.0)]
    pub frequency: f64,
}

impl SineNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SineNet<B> {
        let hidden = (0..self.n_layers)
            .map(|i| {
                let n_inputs = if i == 0 { self.n_inputs } else { self.n_hidden };
                LinearConfig::new(n_inputs, self.n_hidden).init(device)
            })
            .collect();
        let head_inputs = if self.n_layers == 0 {
            self.n_inputs
        } else {
            self.n_hidden
        };
        SineNet {
            hidden,
            head: LinearConfig::new(head_inputs, self.n_outputs).init(device),
            frequency: self.frequency,
        }
    }
}

/// 正弦波を活性化関数とする多層パーセプトロン。
#[derive(Module, Debug)]
pub struct SineNet<B: Backend> {
    hidden: Vec<Linear<B>>,
    head: Linear<B>,
    frequency: f64,
}

impl<B: Backend> DifferentiableMap<B> for SineNet<B> {
    fn forward_jet(&self, input: Jet<B>) -> Jet<B> {
        self.hidden
            .iter()
            .fold(input, |x, layer| {
                x.linear(layer).mul_scalar(self.frequency).sin()
            })
            .linear(&self.head)
    }
}
