//! I/O adapters for the feedback loop engine
//!
//! The stage machine never touches storage directly. Role actions read their
//! source material and persist the final artifact through the traits defined
//! here; the engine only ever looks at whether a call succeeded.
//!
//! Built-in implementations read and write plain files under a project
//! layout (`fs`), or keep everything in memory (`memory`) for tests and
//! embedding.

pub mod adapter;
pub mod config;
pub mod fs;
pub mod memory;

pub use adapter::{
    AdapterError, AdapterSet, InstructionSource, ReportSink, ReportSource, Result,
    TranscriptSource,
};
pub use config::LayoutConfig;
pub use fs::{FsInstructionSource, FsReportStore, FsTranscriptSource};
pub use memory::{MemoryReportStore, MemoryTranscripts, StaticInstructions, StoredReport};
