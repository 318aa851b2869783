pub mod metadata;
pub mod psd;

pub use metadata::ChunkMetadata;
pub use psd::{ChunkOrigin, NearestSlice, PsdChunk, WATT_TO_DBM_CORRECTION};
