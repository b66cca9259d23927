//! Fixed-size, overlapping token-window chunking.
//!
//! Text is encoded with a byte-pair-encoding vocabulary, split into windows
//! of at most `size` tokens that overlap by `overlap` tokens, and each
//! window is decoded back to text. Successive windows advance by
//! `size - overlap` tokens, so every token of the input is covered by at
//! least one chunk.

use tiktoken_rs::{CoreBPE, cl100k_base};

use crate::types::PipelineError;

/// Token-window chunker over the cl100k BPE vocabulary.
///
/// Loading the vocabulary is comparatively expensive; construct one chunker
/// and reuse it across documents.
pub struct TokenChunker {
    bpe: CoreBPE,
}

impl TokenChunker {
    /// Loads the tokenizer vocabulary.
    pub fn new() -> Result<Self, PipelineError> {
        let bpe = cl100k_base().map_err(|err| PipelineError::Tokenizer(err.to_string()))?;
        Ok(Self { bpe })
    }

    /// Number of tokens `text` encodes to.
    pub fn token_count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    /// Splits `text` into overlapping token windows decoded back to text.
    ///
    /// Requires `size > 0` and `overlap < size` so the stride
    /// `size - overlap` is strictly positive and the walk terminates. The
    /// final chunk may be shorter than `size`. Empty input yields no chunks.
    pub fn chunk(
        &self,
        text: &str,
        size: usize,
        overlap: usize,
    ) -> Result<Vec<String>, PipelineError> {
        if size == 0 || overlap >= size {
            return Err(PipelineError::InvalidWindow { size, overlap });
        }

        let tokens = self.bpe.encode_ordinary(text);
        let stride = size - overlap;
        let mut chunks = Vec::new();
        let mut start = 0usize;
        while start < tokens.len() {
            let end = usize::min(start + size, tokens.len());
            let piece = self
                .bpe
                .decode(tokens[start..end].to_vec())
                .map_err(|err| PipelineError::Tokenizer(err.to_string()))?;
            chunks.push(piece);
            start += stride;
        }
        Ok(chunks)
    }
}
