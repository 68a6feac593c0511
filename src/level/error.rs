//! Level parse errors

use thiserror::Error;

/// Why a single cell descriptor was rejected
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CellError {
    #[error("missing required type property `T`")]
    MissingType,

    #[error("invalid type `{0}`: expected an unsigned integer")]
    InvalidType(String),

    #[error("type code 0 is reserved for empty cells")]
    ZeroType,

    #[error("unknown property `{0}`")]
    UnknownProperty(String),

    #[error("property `{0}` given more than once")]
    DuplicateProperty(String),

    #[error("malformed property `{0}`: expected KEY:VALUE")]
    MalformedProperty(String),

    #[error("unbalanced brackets in `{0}`")]
    UnbalancedBrackets(String),

    #[error("invalid id `{0}`: expected 5 alphanumeric characters")]
    InvalidId(String),

    #[error("invalid transform: {0}")]
    InvalidTransform(String),

    #[error("invalid appearance: {0}")]
    InvalidAppearance(String),

    #[error("invalid layer `{0}`: expected a non-negative integer")]
    InvalidLayer(String),

    #[error("invalid collision class `{0}`")]
    InvalidCollision(String),

    #[error("invalid group `{0}`: expected a non-negative integer")]
    InvalidGroup(String),

    #[error("invalid lock `{0}`: expected off, 0 or unlock")]
    InvalidLock(String),

    #[error("lock `{0}` requires a non-zero group")]
    LockWithoutGroup(String),

    #[error("invalid animation: {0}")]
    InvalidAnimation(String),

    #[error("invalid modifier: {0}")]
    InvalidModifier(String),

    #[error("modifier type {modifier} disagrees with T:{declared}")]
    ModifierTypeMismatch { modifier: u32, declared: u32 },

    #[error("unsupported cell value `{0}`")]
    UnsupportedValue(String),
}

/// Fatal error for a whole level; no partial matrix is ever returned
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("row {row}, column {col}: {source}")]
    Cell {
        row: usize,
        col: usize,
        #[source]
        source: CellError,
    },

    #[error("row {row} has {found} columns, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("level has no cells")]
    Empty,

    #[error("{width}x{height} level needs {expected} cells, found {found}")]
    CellCount {
        width: usize,
        height: usize,
        expected: usize,
        found: usize,
    },

    #[error("level is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("failed to read level: {0}")]
    Io(#[from] std::io::Error),
}

impl LevelError {
    /// Row the error points at, if it is tied to a position
    pub fn row(&self) -> Option<usize> {
        match self {
            LevelError::Cell { row, .. } | LevelError::RaggedRow { row, .. } => Some(*row),
            _ => None,
        }
    }

    /// Column the error points at, if it is tied to a position
    pub fn col(&self) -> Option<usize> {
        match self {
            LevelError::Cell { col, .. } => Some(*col),
            LevelError::RaggedRow { expected, found, .. } => Some((*found).min(*expected)),
            _ => None,
        }
    }

    /// The cell-level reason, if any
    pub fn cell_error(&self) -> Option<&CellError> {
        match self {
            LevelError::Cell { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_error_message_carries_position() {
        let err = LevelError::Cell {
            row: 2,
            col: 5,
            source: CellError::InvalidType("abc".into()),
        };
        assert_eq!(err.row(), Some(2));
        assert_eq!(err.col(), Some(5));
        let msg = err.to_string();
        assert!(msg.contains("row 2, column 5"));
        assert!(msg.contains("abc"));
    }

    #[test]
    fn test_ragged_row_position() {
        let err = LevelError::RaggedRow { row: 1, expected: 4, found: 3 };
        assert_eq!(err.row(), Some(1));
        assert_eq!(err.col(), Some(3));
        assert!(err.cell_error().is_none());

        // Overlong row: the first extra column is the offender
        let err = LevelError::RaggedRow { row: 0, expected: 4, found: 6 };
        assert_eq!(err.col(), Some(4));
    }
}
