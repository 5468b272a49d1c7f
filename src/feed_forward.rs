use crate::config::Config;
use anyhow::Result;
use candle_core::{Module, Tensor};
use candle_nn::{Activation, VarBuilder};
use candle_transformers::models::with_tracing::{linear, Linear};

/// Position-wise feed-forward sub-network: Linear(d -> hidden), ReLU,
/// Linear(hidden -> d), applied independently to each position's vector.
#[derive(Debug)]
pub struct FeedForward {
    proj_in: Linear,
    activation: Activation,
    proj_out: Linear,
    span: tracing::Span,
}

impl FeedForward {
    pub fn new(cfg: &Config, vb: VarBuilder) -> Result<Self> {
        let span = tracing::span!(tracing::Level::TRACE, "feed-forward");
        let proj_in = linear(cfg.embedding_dim, cfg.hidden_dim, vb.pp("proj_in"))?;
        let proj_out = linear(cfg.hidden_dim, cfg.embedding_dim, vb.pp("proj_out"))?;
        Ok(Self {
            proj_in,
            activation: Activation::Relu,
            proj_out,
            span,
        })
    }

    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let _enter = self.span.enter();
        let x = self.proj_in.forward(x)?;
        let x = self.activation.forward(&x)?;
        Ok(self.proj_out.forward(&x)?)
    }
}
