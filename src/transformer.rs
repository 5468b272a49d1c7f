use crate::block::TransformerBlock;
use crate::config::Config;
use crate::embedding::Embedding;
use crate::positional::PositionalEncoding;
use anyhow::Result;
use candle_core::{Module, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::with_tracing::{linear, Linear};

/// The stacked model: embedding, positional encoding, N transformer blocks
/// and a final projection to vocabulary-sized logits. Stateless across calls
/// apart from its learned parameters.
#[derive(Debug)]
pub struct Transformer {
    embedding: Embedding,
    positional: PositionalEncoding,
    blocks: Vec<TransformerBlock>,
    output_proj: Linear,
    config: Config,
}

impl Transformer {
    pub fn new(cfg: &Config, vb: VarBuilder) -> Result<Self> {
        cfg.validate()?;
        let embedding = Embedding::new(cfg.vocab_size, cfg.embedding_dim, vb.pp("embedding"))?;
        let positional = PositionalEncoding::new(cfg.max_seq_len, cfg.embedding_dim, vb.device())?;
        let blocks = (0..cfg.num_layers)
            .map(|i| TransformerBlock::new(cfg, vb.pp(format!("block.{i}"))))
            .collect::<Result<Vec<_>>>()?;
        let output_proj = linear(cfg.embedding_dim, cfg.vocab_size, vb.pp("output_proj"))?;
        Ok(Self {
            embedding,
            positional,
            blocks,
            output_proj,
            config: cfg.clone(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Map a token id sequence of length L to an (L x vocab_size) logit
    /// matrix, one row of next-token scores per position.
    pub fn forward(&self, ids: &Tensor) -> Result<Tensor> {
        let x = self.embedding.forward(ids)?;
        let mut x = self.positional.forward(&x)?;
        for block in self.blocks.iter() {
            x = block.forward(&x)?;
        }
        Ok(self.output_proj.forward(&x)?)
    }
}

#[cfg(test)]
mod transformer_tests {
    use super::Transformer;
    use crate::config::Config;
    use candle_core::{DType, Device, Tensor};
    use candle_nn::{VarBuilder, VarMap};

    fn test_config() -> Config {
        Config {
            vocab_size: 16,
            embedding_dim: 8,
            hidden_dim: 16,
            num_layers: 2,
            max_seq_len: 12,
            epochs: 1,
            learning_rate: 1e-3,
            layer_norm_eps: 1e-5,
        }
    }

    #[test]
    fn it_loads() -> anyhow::Result<()> {
        let vb = VarBuilder::zeros(DType::F32, &Device::Cpu);
        let model = Transformer::new(&test_config(), vb)?;
        assert_eq!(model.blocks.len(), 2);
        Ok(())
    }

    #[test]
    fn it_rejects_an_invalid_config() {
        let vb = VarBuilder::zeros(DType::F32, &Device::Cpu);
        let cfg = Config {
            embedding_dim: 7,
            ..test_config()
        };
        assert!(Transformer::new(&cfg, vb).is_err());
    }

    #[test]
    fn logits_cover_the_vocabulary_at_every_position() -> anyhow::Result<()> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let model = Transformer::new(&test_config(), vb)?;

        for seq_len in [1usize, 4, 12] {
            let ids: Vec<u32> = (0..seq_len as u32).collect();
            let input = Tensor::new(ids.as_slice(), &device)?;
            let logits = model.forward(&input)?;
            assert_eq!(logits.dims(), &[seq_len, 16]);
        }
        Ok(())
    }

    #[test]
    fn unknown_ids_still_produce_valid_logits() -> anyhow::Result<()> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let model = Transformer::new(&test_config(), vb)?;

        // id 0 is the reserved unknown entry
        let input = Tensor::new(&[0u32, 3, 0], &device)?;
        let logits = model.forward(&input)?;
        assert_eq!(logits.dims(), &[3, 16]);
        Ok(())
    }

    #[test]
    fn it_rejects_sequences_over_the_positional_capacity() -> anyhow::Result<()> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let model = Transformer::new(&test_config(), vb)?;

        let ids: Vec<u32> = vec![1; 13];
        let input = Tensor::new(ids.as_slice(), &device)?;
        assert!(model.forward(&input).is_err());
        Ok(())
    }
}
