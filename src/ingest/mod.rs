pub mod csv_loader;
pub mod normalize;

pub use csv_loader::{
    discover, load_directory, load_file, load_population, read_records, DatasetKind, IngestStats,
};
pub use normalize::{normalize_district, normalize_state};
