pub mod annotate;
pub mod chunk;
pub mod chunker;
pub mod focus;
pub mod reader;

pub use annotate::annotate_sections;
pub use chunk::Chunk;
pub use chunker::{ChunkError, Chunker, ChunkerConfig, Chunks};
pub use focus::keyword_focus;
pub use reader::{PdfReader, normalize_text};

use sha2::{Digest, Sha256};

/// Generate a stable document ID from a file name
pub fn generate_doc_id(name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..16])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_id_is_stable_and_distinct() {
        assert_eq!(generate_doc_id("call.pdf"), generate_doc_id("call.pdf"));
        assert_ne!(generate_doc_id("call.pdf"), generate_doc_id("other.pdf"));
        assert_eq!(generate_doc_id("call.pdf").len(), 32);
    }
}
