//! Binary codec for the store's point-cloud patch wire format and the
//! read-response framing consumed by point-cloud viewers.

pub mod error;
pub mod patch;

pub use error::CodecError;
pub use patch::{empty_response, frame_response, npoints, payload, pcid, PatchHeader};
