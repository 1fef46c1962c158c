#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot open {port}: {source}")]
    Connection {
        port: String,
        #[source]
        source: serialport::Error,
    },
    #[error("{0}")]
    Read(#[from] std::io::Error),
    #[error("device disconnected")]
    Disconnected,
    #[error("unsupported baud rate {0}")]
    UnsupportedBaudRate(u32),
    #[error("no serial port selected")]
    NoPortSelected,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn connection(port: &str, source: serialport::Error) -> Self {
        Self::Connection {
            port: port.to_string(),
            source,
        }
    }
}
