/// Errors raised while encoding or decoding ICD data.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IcdError {
    /// A telemetry reply is shorter than the block layout.
    #[error("telemetry block {block} needs {expected} bytes, got {actual}")]
    BlockLength {
        block: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The block id has no known layout.
    #[error("unknown telemetry block id 0x{0:02X}")]
    UnknownBlock(u8),

    /// The control mode code is not defined by the ICD.
    #[error("unknown control mode 0x{0:02X}")]
    UnknownMode(u8),

    /// A reply payload is too short for the structure it carries.
    #[error("{what} needs {expected} bytes, got {actual}")]
    Truncated {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A value does not fit the fixed-point format.
    #[error("value {value} outside representable range [{min}, {max}]")]
    OutOfRange { value: f64, min: f64, max: f64 },
}

pub type Result<T> = std::result::Result<T, IcdError>;
