/// Settings loading: defaults, TOML file, `VEHPOS_*` environment.
pub mod config;
/// Binary dump codec: record decoder, encoder, synthetic data.
pub mod dump;
/// Decode/encode error types.
pub mod error;
/// Great-circle distance and the 2-d k-d tree index.
pub mod geo;
/// Nearest-vehicle lookup over a set of query coordinates.
pub mod locator;
/// Flexible logging (formatting, filters, sinks).
pub mod logging;
/// Position record and query coordinate types.
pub mod record;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// config
pub use config::Settings;
/// Dump reading and writing.
pub use dump::{decode_records, read_records, write_dump, RecordReader};
/// Operation errors and result types.
pub use error::{DecodeError, DecodeResult, EncodeError, RecordField};
/// Spatial index and distances.
pub use geo::{
    brute_force_nearest, build_index, euclidean_distance, great_circle_distance, DistanceUnit,
    KdTree, Nearest, Point, TreeStats, EARTH_RADIUS_KM,
};
/// Query driver.
pub use locator::{
    locate, locate_brute_force, locate_with_index, BuildStrategy, NearestMatch, DEFAULT_QUERIES,
};
pub use record::{PositionRecord, QueryCoordinate};
