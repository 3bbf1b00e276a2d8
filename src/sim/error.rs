use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Coordinate ({row}, {col}, {floor}) is outside the arena")]
    OutOfBounds { row: i32, col: i32, floor: i32 },

    #[error("Object '{identity}' cannot live on layer {layer}")]
    WrongLayer { identity: String, layer: usize },

    #[error("Arena dimensions {rows}x{cols}x{floors} are not supported")]
    InvalidDimensions { rows: i32, cols: i32, floors: i32 },

    #[error("Unknown object identity '{identity}'")]
    UnknownObject { identity: String },

    #[error("Unsupported arena format version {version}")]
    UnsupportedFormat { version: i32 },

    #[error("Malformed arena data at token {token}: {reason}")]
    Malformed { token: usize, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SimResult<T> = Result<T, SimError>;
