use crate::attention::SelfAttention;
use crate::config::Config;
use crate::feed_forward::FeedForward;
use anyhow::Result;
use candle_core::{Module, Tensor};
use candle_nn::{layer_norm, LayerNorm, LayerNormConfig, VarBuilder};

/// One transformer block: self-attention and the position-wise feed-forward,
/// each behind a residual connection followed by layer normalization.
#[derive(Debug)]
pub struct TransformerBlock {
    attention: SelfAttention,
    norm_attn: LayerNorm,
    feed_forward: FeedForward,
    norm_ffn: LayerNorm,
    span: tracing::Span,
}

impl TransformerBlock {
    pub fn new(cfg: &Config, vb: VarBuilder) -> Result<Self> {
        let span = tracing::span!(tracing::Level::TRACE, "transformer-block");
        let norm_cfg = LayerNormConfig {
            eps: cfg.layer_norm_eps,
            ..LayerNormConfig::default()
        };
        let attention = SelfAttention::new(cfg, vb.pp("attention"))?;
        let norm_attn = layer_norm(cfg.embedding_dim, norm_cfg, vb.pp("norm_attn"))?;
        let feed_forward = FeedForward::new(cfg, vb.pp("feed_forward"))?;
        let norm_ffn = layer_norm(cfg.embedding_dim, norm_cfg, vb.pp("norm_ffn"))?;
        Ok(Self {
            attention,
            norm_attn,
            feed_forward,
            norm_ffn,
            span,
        })
    }

    /// Shape-preserving. Normalization runs after each residual add; the
    /// post-norm ordering changes training dynamics and must stay as is.
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let _enter = self.span.enter();
        let attended = self.attention.forward(x)?;
        let x = self.norm_attn.forward(&x.add(&attended)?)?;
        let forwarded = self.feed_forward.forward(&x)?;
        Ok(self.norm_ffn.forward(&x.add(&forwarded)?)?)
    }
}
