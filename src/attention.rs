use crate::config::Config;
use anyhow::Result;
use candle_core::{Module, Tensor, D};
use candle_nn::{ops, VarBuilder};
use candle_transformers::models::with_tracing::{linear, Linear};

/// Single-head scaled dot-product self-attention, d -> d.
#[derive(Debug)]
pub struct SelfAttention {
    q_proj: Linear,
    k_proj: Linear,
    v_proj: Linear,
    scale: f64,
    span: tracing::Span,
}

impl SelfAttention {
    pub fn new(cfg: &Config, vb: VarBuilder) -> Result<Self> {
        let span = tracing::span!(tracing::Level::TRACE, "self-attention");
        let dim = cfg.embedding_dim;
        let q_proj = linear(dim, dim, vb.pp("q_proj"))?;
        let k_proj = linear(dim, dim, vb.pp("k_proj"))?;
        let v_proj = linear(dim, dim, vb.pp("v_proj"))?;
        let scale = 1f64 / f64::sqrt(dim as f64);
        Ok(Self {
            q_proj,
            k_proj,
            v_proj,
            scale,
            span,
        })
    }

    /// Softmax-normalized attention weights, one row per query position over
    /// all key positions. Rows are non-negative and sum to 1. The softmax is
    /// the composed form rather than the fused last-dim kernel so gradients
    /// can flow through it during training.
    pub fn attention_weights(&self, x: &Tensor) -> Result<Tensor> {
        let q = self.q_proj.forward(x)?;
        let k = self.k_proj.forward(x)?;
        // 1/sqrt(d) keeps the score variance in check as the width grows
        let scores = (q.matmul(&k.t()?.contiguous()?)? * self.scale)?;
        Ok(ops::softmax(&scores, D::Minus1)?)
    }

    /// Mix every position's value vector by the attention weights. The unit
    /// attends freely over the whole input; callers only ever pass a prefix
    /// of a sentence, so no mask is applied here.
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let _enter = self.span.enter();
        let weights = self.attention_weights(x)?;
        let v = self.v_proj.forward(x)?;
        Ok(weights.matmul(&v)?)
    }
}
