pub mod coords;
pub mod dbscan;
pub mod extractor;
pub mod filter;
pub mod finder;

pub use coords::{mm_location_from_origin, real_location};
pub use extractor::{extract_aim_points, AimCluster, Extraction, ExtractionParams, TopN};
pub use filter::FilterKind;
