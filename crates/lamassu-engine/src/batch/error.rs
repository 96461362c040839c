use thiserror::Error;

/// Errors raised by the batching layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BatchError {
    /// An operation that needs `begin()` was called outside `begin`/`end`.
    #[error("{op} called while not drawing; call begin() first")]
    NotDrawing { op: &'static str },

    #[error("begin() called while already drawing; call end() first")]
    AlreadyDrawing,

    /// Requested capacity exceeds what 16-bit indices can address.
    #[error("batch capacity {requested} exceeds the maximum of {max}")]
    BatchTooLarge { requested: usize, max: usize },

    #[error("invalid batch configuration: {0}")]
    InvalidConfig(String),

    /// Vertex data whose length is not a whole number of records.
    #[error("vertex data of {len} floats is not a multiple of {record} floats")]
    InvalidVertexData { len: usize, record: usize },

    #[error("texture {width}x{height} does not fit a {max_width}x{max_height} array layer")]
    TextureTooLarge {
        width: u32,
        height: u32,
        max_width: u32,
        max_height: u32,
    },

    #[error("no usable texture units on this device")]
    NoTextureUnits,

    #[error("shader '{label}' failed to compile:\n{log}")]
    ShaderCompile { label: String, log: String },

    #[error("GPU resource error: {0}")]
    Resource(String),
}

pub type Result<T, E = BatchError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_operation() {
        let e = BatchError::NotDrawing { op: "draw" };
        assert!(e.to_string().starts_with("draw called while not drawing"));
        let e = BatchError::BatchTooLarge { requested: 9000, max: 8191 };
        assert_eq!(e.to_string(), "batch capacity 9000 exceeds the maximum of 8191");
    }
}
