/// Per-key deduplication of in-flight work.
pub mod async_backed;
pub mod key;
pub mod overlay;
/// Store implementations.
pub mod store;
pub mod traits;
