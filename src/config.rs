use anyhow::{anyhow, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub vocab_size: usize,
    pub embedding_dim: usize,
    pub hidden_dim: usize,
    pub num_layers: usize,
    pub max_seq_len: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    pub layer_norm_eps: f64,
}

impl Config {
    /// Dimension checks shared by every layer, run once at model construction.
    pub fn validate(&self) -> Result<()> {
        if self.vocab_size < 2 {
            return Err(anyhow!(
                "vocab_size must be at least 2 (one real token plus the unknown entry), got: {}",
                self.vocab_size
            ));
        }
        if self.embedding_dim == 0 {
            return Err(anyhow!("embedding_dim must be non-zero"));
        }
        if self.embedding_dim % 2 != 0 {
            return Err(anyhow!(
                "embedding_dim must be even to pair sin/cos channels, got: {}",
                self.embedding_dim
            ));
        }
        if self.hidden_dim == 0 {
            return Err(anyhow!("hidden_dim must be non-zero"));
        }
        if self.num_layers == 0 {
            return Err(anyhow!("num_layers must be non-zero"));
        }
        if self.max_seq_len == 0 {
            return Err(anyhow!("max_seq_len must be non-zero"));
        }
        Ok(())
    }
}
