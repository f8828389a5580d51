//! 微分可能な写像として使うネットワーク。

mod gated;
mod residual;
mod sine;

pub use gated::{GatedNet, GatedNetConfig};
pub use residual::{ResidualBlock, ResidualNet, ResidualNetConfig};
pub use sine::{SineNet, SineNetConfig};
