//! # kmersearch-engine
//!
//! A k-mer similarity search engine for bit-packed DNA sequences: the codec,
//! k-mer extractor, match kernel, parallel frequency analyzer, cache layer
//! and inverted-index adapter components of an approximate-match search
//! system, designed to sit behind a relational host's user-defined type and
//! index access method machinery.
//!
//! This crate implements the engine only — the host's type registration,
//! SQL surface, B-tree/GIN page layout and catalog integration are modeled
//! as external collaborators (see [`index`]) rather than implemented here.

pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod frequency;
pub mod index;
pub mod kmer;
pub mod matching;
pub mod simd_tier;

pub use codec::{PackedDna2, PackedDna4, PackedSequence};
pub use config::{ConfigChange, ConfigManager, EngineConfig};
pub use error::{EngineError, EngineResult};
pub use kmer::UintKeyArray;
pub use simd_tier::{SimdCapabilities, SimdTier};
