//! Explicit-offset binary buffers.
//!
//! Reads take an absolute position and never look past the buffer's
//! *written extent*; writes go through a growable [`Writer`] whose cursor
//! is returned to the caller instead of being kept as hidden shared state.

mod error;
mod reader;
mod writer;

pub use error::BufferError;
pub use reader::Reader;
pub use writer::Writer;
