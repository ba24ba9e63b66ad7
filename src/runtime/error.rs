use thiserror::Error;

///////////////////////////////
/// One bucket that could not be appended during a flush
#[derive(Debug)]
pub struct BucketFailure {
    pub bucket: String,
    pub unwritten: usize,
    pub source: std::io::Error,
}

impl std::fmt::Display for BucketFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "bucket '{}': {} reads not written ({})",
            self.bucket, self.unwritten, self.source
        )
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("File at {:?} not found.", path)]
    FileNotFound { path: std::path::PathBuf },

    #[error("File at {:?} is invalid{}.", path, Error::format_msg_as_detail(msg))]
    FileNotValid {
        path: std::path::PathBuf,
        msg: Option<String>,
    },

    #[error("Failed parsing {}{}", context, Error::format_msg_as_detail(msg))]
    ParseError {
        context: String,
        msg: Option<String>,
    },

    #[error("Duplicate sample name '{name}' in sample table")]
    DuplicateSample { name: String },

    #[error("Barcode '{barcode}' of sample '{name}' is already used by sample '{existing}'")]
    DuplicateBarcode {
        barcode: String,
        name: String,
        existing: String,
    },

    #[error("Barcode '{barcode}' has length {found}, expected {expected}")]
    InconsistentBarcodeLength {
        barcode: String,
        expected: usize,
        found: usize,
    },

    #[error("Invalid configuration: {msg}")]
    InvalidConfig { msg: String },

    #[error("Worker failed: {msg}")]
    Worker { msg: String },

    #[error("Invalid state: {msg}")]
    InvalidState { msg: String },

    #[error("Flush of {} bucket(s) failed: {}", failures.len(), Error::format_failures(failures))]
    Flush { failures: Vec<BucketFailure> },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    #[cold]
    pub fn file_not_found<P: AsRef<std::path::Path>>(path: P) -> Self {
        Error::FileNotFound {
            path: path.as_ref().to_path_buf(),
        }
    }

    #[cold]
    pub fn file_not_valid<P: AsRef<std::path::Path>, M: Into<String>>(
        path: P,
        msg: Option<M>,
    ) -> Self {
        Error::FileNotValid {
            path: path.as_ref().to_path_buf(),
            msg: msg.map(|m| m.into()),
        }
    }

    #[cold]
    pub fn parse_error<C: Into<String>, M: Into<String>>(context: C, msg: Option<M>) -> Self {
        Error::ParseError {
            context: context.into(),
            msg: msg.map(|m| m.into()),
        }
    }

    #[cold]
    pub fn invalid_config<M: Into<String>>(msg: M) -> Self {
        Error::InvalidConfig { msg: msg.into() }
    }

    #[cold]
    pub fn worker<M: Into<String>>(msg: M) -> Self {
        Error::Worker { msg: msg.into() }
    }

    #[cold]
    pub fn invalid_state<M: Into<String>>(msg: M) -> Self {
        Error::InvalidState { msg: msg.into() }
    }

    pub fn format_msg_as_detail(msg: &Option<String>) -> String {
        match msg {
            Some(m) => format!(" ({})", m),
            None => String::new(),
        }
    }

    fn format_failures(failures: &[BucketFailure]) -> String {
        failures
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

pub type Result<T> = std::result::Result<T, Error>;
