/// Errors produced while building or running datasets.
///
/// Analysis and parse errors are raised while a transformation is being
/// constructed, before any data is read. Execution errors come out of the
/// query engine while an action is running.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DatasetError {
    #[error("analysis error: {0}")]
    Analysis(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("execution error: {0}")]
    Execution(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DatasetError {
    pub const fn is_analysis(&self) -> bool {
        matches!(self, Self::Analysis(_))
    }

    pub const fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }

    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    /// Message without the error kind prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Analysis(s)
            | Self::Parse(s)
            | Self::Execution(s)
            | Self::InvalidArgument(s)
            | Self::Internal(s) => s,
        }
    }
}

impl From<sqlparser::parser::ParserError> for DatasetError {
    fn from(value: sqlparser::parser::ParserError) -> Self {
        DatasetError::Parse(value.to_string())
    }
}

pub type Result<T, E = DatasetError> = std::result::Result<T, E>;

#[allow(unused_macros)]
macro_rules! internal {
    ($($arg:tt)*) => {
        crate::errors::DatasetError::Internal(std::format!($($arg)*))
    };
}
pub(crate) use internal;

#[allow(unused_macros)]
macro_rules! analysis {
    ($($arg:tt)*) => {
        crate::errors::DatasetError::Analysis(std::format!($($arg)*))
    };
}
pub(crate) use analysis;

#[allow(unused_macros)]
macro_rules! execution {
    ($($arg:tt)*) => {
        crate::errors::DatasetError::Execution(std::format!($($arg)*))
    };
}
pub(crate) use execution;
