//! Error types for the k-mer search engine.
//!
//! Mirrors the error kinds catalogued for the engine: parsing and
//! configuration errors are surfaced to the caller, kernel-level
//! contract violations are programmer errors and panic, and analyzer
//! failures are reported at the administrative call site.

use thiserror::Error;

/// Result type used throughout the engine.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors produced by the codec, extractor, analyzer and cache layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A byte outside the DNA2/DNA4 alphabet was encountered while parsing
    /// an ASCII sequence. Carries the offending byte and its position.
    #[error("invalid encoding: byte {byte:#04x} at position {position} is not a valid base")]
    InvalidEncoding {
        /// The offending byte.
        byte: u8,
        /// Zero-based index of the offending byte within the input.
        position: usize,
    },

    /// A bit-length was incompatible with the requested k-mer size (e.g. a
    /// DNA2 payload whose bit-length is not a multiple of 2, or a sequence
    /// shorter than k).
    #[error("dimension mismatch: {reason}")]
    DimensionMismatch {
        /// Human-readable description of the mismatch.
        reason: String,
    },

    /// A configuration value was rejected, e.g. `2*k + b > 64`, or a forced
    /// SIMD tier exceeds what the host CPU actually supports.
    #[error("configuration error: {reason}")]
    ConfigurationError {
        /// Human-readable description of the rejected value.
        reason: String,
    },

    /// A single degenerate window's expansion exceeded the configured cap
    /// and was dropped. Recovered locally; callers typically only log this.
    #[error("degenerate expansion of window at position {position} exceeded cap ({size} > {cap})")]
    DegenerateExpansionTooLarge {
        /// Position of the dropped window.
        position: usize,
        /// The window's actual expansion size.
        size: usize,
        /// The configured cap.
        cap: usize,
    },

    /// A parallel frequency-analysis worker aborted; the whole job is
    /// aborted and any scratch state is rolled back.
    #[error("frequency analysis worker {worker_id} failed: {reason}")]
    WorkerFailure {
        /// Index of the worker that failed.
        worker_id: usize,
        /// Human-readable description of the failure.
        reason: String,
    },

    /// The engine was queried before its configuration/caches were
    /// initialized (the host analogue of "module not in preload list").
    #[error("engine not initialized: {hint}")]
    NotInitialized {
        /// A hint pointing at the missing initialization step.
        hint: String,
    },
}
