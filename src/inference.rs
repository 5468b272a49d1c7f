use crate::transformer::Transformer;
use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use candle_transformers::generation::LogitsProcessor;

/// Greedy next-token decoder over a trained (or frozen) model.
pub struct GreedyDecoder {
    model: Transformer,
    device: Device,
    logits_processor: LogitsProcessor,
}

impl GreedyDecoder {
    pub fn new(model: Transformer, device: Device) -> Self {
        // No temperature and no top-p, so the processor reduces to arg-max
        let logits_processor = LogitsProcessor::new(0, None, None);
        Self {
            model,
            device,
            logits_processor,
        }
    }

    pub fn model(&self) -> &Transformer {
        &self.model
    }

    /// Predict the id of the token following the given sequence: one forward
    /// pass, then arg-max over the final position's logits.
    ///
    /// Ties between equal logits resolve to whichever index the arg-max scan
    /// settles on; the choice is implementation-defined but identical across
    /// repeated calls on a frozen model.
    pub fn predict_next(&mut self, ids: &[u32]) -> Result<u32> {
        if ids.is_empty() {
            return Err(anyhow!("cannot predict the next token of an empty sequence"));
        }
        let input = Tensor::new(ids, &self.device)?;
        let logits = self.model.forward(&input)?;
        let last = logits.narrow(0, ids.len() - 1, 1)?.squeeze(0)?;
        Ok(self.logits_processor.sample(&last)?)
    }

    /// Greedily extend the sequence by up to `steps` tokens, feeding each
    /// prediction back as context. Stops early once the context reaches the
    /// positional table capacity.
    pub fn generate(&mut self, ids: &[u32], steps: usize) -> Result<Vec<u32>> {
        let mut output = ids.to_vec();
        for _ in 0..steps {
            if output.len() >= self.model.config().max_seq_len {
                break;
            }
            let next = self.predict_next(&output)?;
            output.push(next);
        }
        Ok(output)
    }
}

#[cfg(test)]
mod inference_tests {
    use super::GreedyDecoder;
    use crate::config::Config;
    use crate::transformer::Transformer;
    use candle_core::{DType, Device};
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

    fn frozen_decoder() -> anyhow::Result<GreedyDecoder> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let model = Transformer::new(&test_config(), vb)?;
        Ok(GreedyDecoder::new(model, device))
    }

    #[test]
    fn it_rejects_an_empty_sequence() -> anyhow::Result<()> {
        let mut decoder = frozen_decoder()?;
        assert!(decoder.predict_next(&[]).is_err());
        Ok(())
    }

    #[test]
    fn prediction_is_idempotent_on_a_frozen_model() -> anyhow::Result<()> {
        let mut decoder = frozen_decoder()?;
        let ids = [3u32, 1, 4];

        let first = decoder.predict_next(&ids)?;
        let second = decoder.predict_next(&ids)?;

        assert_eq!(first, second);
        assert!((first as usize) < decoder.model().config().vocab_size);
        Ok(())
    }

    #[test]
    fn generation_stops_at_the_positional_capacity() -> anyhow::Result<()> {
        let mut decoder = frozen_decoder()?;
        let ids = [1u32, 2];

        let output = decoder.generate(&ids, 64)?;

        assert!(output.len() <= decoder.model().config().max_seq_len);
        assert_eq!(&output[..2], &ids);
        Ok(())
    }
}
