use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};

/// Precomputed sinusoidal position table, shared read-only by every forward
/// pass. Attention is permutation-invariant, so position is injected here by
/// adding a deterministic signature to each embedded token.
#[derive(Debug, Clone)]
pub struct PositionalEncoding {
    table: Tensor,
    max_seq_len: usize,
}

impl PositionalEncoding {
    /// Precompute encodings for positions `0..max_seq_len`. Even channel `c`
    /// carries `sin(p / 10000^(c/d))`, odd channel `c` carries
    /// `cos(p / 10000^((c-1)/d))`. The table is a plain tensor, not a
    /// trainable variable.
    pub fn new(max_seq_len: usize, embedding_dim: usize, device: &Device) -> Result<Self> {
        let mut values = Vec::with_capacity(max_seq_len * embedding_dim);
        for p in 0..max_seq_len {
            for c in 0..embedding_dim {
                let exponent = (c - c % 2) as f32 / embedding_dim as f32;
                let angle = p as f32 / 10000f32.powf(exponent);
                values.push(if c % 2 == 0 { angle.sin() } else { angle.cos() });
            }
        }
        let table = Tensor::from_vec(values, (max_seq_len, embedding_dim), device)?;
        Ok(Self { table, max_seq_len })
    }

    /// Add the signatures of positions `0..seq_len` onto the embedded
    /// sequence. A sequence beyond the precomputed capacity is rejected,
    /// never truncated or wrapped.
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let span = tracing::span!(tracing::Level::TRACE, "positional-encoding");
        let _enter = span.enter();
        let (seq_len, _embedding_dim) = x.dims2()?;
        if seq_len > self.max_seq_len {
            return Err(anyhow!(
                "sequence length {seq_len} exceeds the positional table capacity {}",
                self.max_seq_len
            ));
        }
        let positions = self.table.narrow(0, 0, seq_len)?;
        Ok(x.add(&positions)?)
    }
}
