//! Lexical (BM25-style) search over the wiki corpus.
//!
//! Owns the inverted index lifecycle: tokenize documents through a
//! language-aware segmenter, build a field-boosted index, persist a snapshot
//! to disk, and serve queries tokenized with the exact same segmenter. The
//! cache component fully replaces its state on rebuild; there is no
//! incremental update path.

pub mod cache;
pub mod document;
pub mod index;
pub mod segmenter;
pub mod snapshot;

pub use cache::{LexicalHit, LexicalIndexCache};
pub use document::IndexedDocument;
pub use index::{SearchHit, SearchIndex, FIELD_BOOSTS};
pub use segmenter::{Segmenter, SegmenterDictionary};
