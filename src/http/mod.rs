//! HTTP protocol layer module
//!
//! Range parsing, MIME lookup, caching and header building for file
//! responses, decoupled from the connection handling in `server`.

pub mod cache;
pub mod headers;
pub mod mime;
pub mod range;
pub mod response;

// Re-export commonly used types
pub use headers::{Disposition, HeaderList, StreamingDirectives};
pub use range::{parse_range_header, ByteRange, RangeParseResult};
pub use response::{
    build_404_response, build_405_response, build_envelope_response, build_error_response,
    ResponseBody,
};
