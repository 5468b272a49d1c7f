use anyhow::{anyhow, Result};
use candle_core::Tensor;
use candle_nn::{Init, VarBuilder};

/// Learned token embedding table, one row per vocabulary entry.
#[derive(Clone, Debug)]
pub struct Embedding {
    embeddings: Tensor,
    vocab_size: usize,
}

impl Embedding {
    pub fn new(vocab_size: usize, embedding_dim: usize, vb: VarBuilder) -> Result<Self> {
        let embeddings = vb.get_with_hints(
            (vocab_size, embedding_dim),
            "weight",
            Init::Randn {
                mean: 0.,
                stdev: 1.,
            },
        )?;
        Ok(Self {
            embeddings,
            vocab_size,
        })
    }

    /// Look up the embedding row of every id in the sequence.
    ///
    /// An id at or above the vocabulary size is a tokenizer contract violation
    /// and surfaces as an error, never clamped.
    pub fn forward(&self, ids: &Tensor) -> Result<Tensor> {
        let span = tracing::span!(tracing::Level::TRACE, "embedding");
        let _enter = span.enter();
        for id in ids.to_vec1::<u32>()? {
            if id as usize >= self.vocab_size {
                return Err(anyhow!(
                    "token id {id} is out of range for vocabulary of size {}",
                    self.vocab_size
                ));
            }
        }
        Ok(self.embeddings.index_select(ids, 0)?)
    }
}
