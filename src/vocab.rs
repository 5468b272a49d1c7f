use std::collections::HashMap;

/// Token string reserved for words outside the vocabulary.
pub const UNKNOWN_TOKEN: &str = "<unk>";

/// Id of [`UNKNOWN_TOKEN`]; it is always inserted first.
pub const UNKNOWN_ID: u32 = 0;

/// Whitespace word-level vocabulary: token string to id and back.
///
/// Ids are assigned in first-seen order over the corpus and are fixed for the
/// lifetime of a run. Encoding never fails; unseen words map to the unknown id.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    token_to_id: HashMap<String, u32>,
    id_to_token: Vec<String>,
}

impl Vocabulary {
    pub fn build<'a>(sentences: impl IntoIterator<Item = &'a str>) -> Self {
        let mut vocab = Self {
            token_to_id: HashMap::new(),
            id_to_token: Vec::new(),
        };
        vocab.insert(UNKNOWN_TOKEN);
        for sentence in sentences {
            for word in sentence.split_whitespace() {
                vocab.insert(word);
            }
        }
        vocab
    }

    fn insert(&mut self, word: &str) {
        if !self.token_to_id.contains_key(word) {
            let id = self.id_to_token.len() as u32;
            self.token_to_id.insert(word.to_string(), id);
            self.id_to_token.push(word.to_string());
        }
    }

    pub fn encode(&self, word: &str) -> u32 {
        self.token_to_id.get(word).copied().unwrap_or(UNKNOWN_ID)
    }

    /// Tokenize one whitespace-separated sentence.
    pub fn encode_line(&self, line: &str) -> Vec<u32> {
        line.split_whitespace().map(|w| self.encode(w)).collect()
    }

    pub fn decode(&self, id: u32) -> Option<&str> {
        self.id_to_token.get(id as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.id_to_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_token.is_empty()
    }
}
