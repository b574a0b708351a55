use bitcoin::consensus::encode;
use bitcoin::hashes::hex;
use std::error::Error;
use std::fmt;
use std::io;

pub type OpResult<T> = Result<T, OpError>;

#[derive(Debug)]
pub struct OpError {
    kind: OpErrorKind,
    message: String,
}

#[derive(Debug)]
pub enum OpErrorKind {
    /// buffer shorter than a field requires
    TruncatedInput,
    /// AuxPOW marker recognized but the envelope does not fit the buffer
    InvalidAuxPowEnvelope,
    /// no trial window yields a valid transaction
    TransactionDecodeError,
    InvalidConfig,
    IoError(io::Error),
    ConsensusError(encode::Error),
    HexError(hex::Error),
    RuntimeError,
}

impl OpError {
    pub fn new(kind: OpErrorKind) -> Self {
        OpError {
            kind,
            message: String::new(),
        }
    }

    pub fn join_msg(mut self, msg: &str) -> Self {
        if !self.message.is_empty() {
            self.message.push_str(": ");
        }
        self.message.push_str(msg);
        self
    }

    #[inline]
    pub fn kind(&self) -> &OpErrorKind {
        &self.kind
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for OpErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpErrorKind::TruncatedInput => write!(f, "truncated input"),
            OpErrorKind::InvalidAuxPowEnvelope => write!(f, "invalid AuxPOW envelope"),
            OpErrorKind::TransactionDecodeError => write!(f, "transaction decode error"),
            OpErrorKind::InvalidConfig => write!(f, "invalid config"),
            OpErrorKind::IoError(e) => write!(f, "io error: {}", e),
            OpErrorKind::ConsensusError(e) => write!(f, "consensus error: {}", e),
            OpErrorKind::HexError(e) => write!(f, "hex error: {}", e),
            OpErrorKind::RuntimeError => write!(f, "runtime error"),
        }
    }
}

impl fmt::Display for OpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{} ({})", self.kind, self.message)
        }
    }
}

impl Error for OpError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            OpErrorKind::IoError(e) => Some(e),
            OpErrorKind::ConsensusError(e) => Some(e),
            OpErrorKind::HexError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for OpError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            OpError::new(OpErrorKind::TruncatedInput).join_msg(&err.to_string())
        } else {
            OpError::new(OpErrorKind::IoError(err))
        }
    }
}

impl From<encode::Error> for OpError {
    fn from(err: encode::Error) -> Self {
        match err {
            encode::Error::Io(e) => OpError::from(e),
            other => OpError::new(OpErrorKind::ConsensusError(other)),
        }
    }
}

impl From<hex::Error> for OpError {
    fn from(err: hex::Error) -> Self {
        OpError::new(OpErrorKind::HexError(err))
    }
}

impl From<&str> for OpError {
    fn from(msg: &str) -> Self {
        OpError::new(OpErrorKind::RuntimeError).join_msg(msg)
    }
}

impl From<String> for OpError {
    fn from(msg: String) -> Self {
        OpError::from(msg.as_str())
    }
}
