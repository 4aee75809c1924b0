use thiserror::Error;

#[derive(Error, Debug)]
pub enum N6700Error {
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },
    #[error("Connection timeout")]
    Timeout,
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Invalid command: {0}")]
    InvalidCommand(String),
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("{attribute} value {value} out of range [{min}, {max}] on channel {channel}")]
    OutOfRange {
        attribute: &'static str,
        channel: usize,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("Unsupported {kind}: {value}")]
    UnsupportedValue { kind: &'static str, value: String },
    #[error("Unknown channel: {0}")]
    UnknownChannel(String),
    #[error("Unknown module model {model:?} installed in channel {channel}")]
    UnknownModule { channel: usize, model: String },
}

impl From<std::io::Error> for N6700Error {
    fn from(source: std::io::Error) -> Self {
        if matches!(
            source.kind(),
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
        ) {
            N6700Error::Timeout
        } else {
            N6700Error::Io {
                source,
                context: "Transport".to_string(),
            }
        }
    }
}

impl N6700Error {
    pub(crate) fn unsupported(kind: &'static str, value: impl Into<String>) -> Self {
        N6700Error::UnsupportedValue {
            kind,
            value: value.into(),
        }
    }

    pub(crate) fn parse(command: &str, reply: &str) -> Self {
        N6700Error::Protocol(format!("Could not parse reply {reply:?} to {command}"))
    }
}
