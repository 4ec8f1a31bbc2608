/// Errors produced by [`crate::Reader`] and [`crate::Writer`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    #[error("read of {length} bytes at {position} exceeds written extent {extent}")]
    OutOfBounds {
        position: usize,
        length: usize,
        extent: usize,
    },
    #[error("written extent {extent} exceeds buffer length {len}")]
    ExtentTooLarge { extent: usize, len: usize },
    #[error(
        "patch of {length} bytes at {position} is outside the written region of {written} bytes"
    )]
    PatchOutOfBounds {
        position: usize,
        length: usize,
        written: usize,
    },
}
