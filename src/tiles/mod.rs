pub mod source;

// Re-exports for convenience
pub use source::{ContentNotifier, ContentSource, MemoryTileSource, NullContentSource};
