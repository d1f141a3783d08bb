mod error;
mod functions;
mod types;

pub use error::ApiError;
pub use functions::{endpoint_prefix, format_path, join_segments, normalize_route, route_parameter};
pub use types::VerbClass;
