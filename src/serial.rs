use crate::error::{Error, Result};
use serialport::SerialPort;
use std::fmt;
use std::io::{self, BufRead, BufReader, Read};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BaudRate {
    #[default]
    B9600,
    B19200,
    B38400,
    B57600,
    B115200,
}

impl BaudRate {
    pub const ALL: [BaudRate; 5] = [
        BaudRate::B9600,
        BaudRate::B19200,
        BaudRate::B38400,
        BaudRate::B57600,
        BaudRate::B115200,
    ];

    pub fn as_u32(self) -> u32 {
        match self {
            BaudRate::B9600 => 9600,
            BaudRate::B19200 => 19200,
            BaudRate::B38400 => 38400,
            BaudRate::B57600 => 57600,
            BaudRate::B115200 => 115200,
        }
    }
}

impl TryFrom<u32> for BaudRate {
    type Error = Error;

    fn try_from(rate: u32) -> Result<Self> {
        BaudRate::ALL
            .into_iter()
            .find(|b| b.as_u32() == rate)
            .ok_or(Error::UnsupportedBaudRate(rate))
    }
}

impl FromStr for BaudRate {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let rate: u32 = s.trim().parse().map_err(|e| format!("{s:?}: {e}"))?;
        BaudRate::try_from(rate).map_err(|e| e.to_string())
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

pub async fn list_ports() -> Vec<String> {
    match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
        Err(e) => {
            warn!("failed to enumerate serial ports: {}", e);
            vec![]
        }
    }
}

/// Something the read loop can pull decoded lines from.
pub trait LineSource: Send {
    /// `Ok(None)` means the read timed out without a complete line.
    fn read_line(&mut self) -> Result<Option<String>>;

    fn close(&mut self);
}

/// Longest line kept in memory. Longer runs without a newline are emitted
/// in pieces of this size.
pub const MAX_LINE_BYTES: usize = 4096;

/// Splits a byte stream into trimmed, lossily decoded lines. Bytes received
/// before a timeout are kept until the rest of the line arrives.
pub struct LineReader<R> {
    inner: BufReader<R>,
    pending: Vec<u8>,
}

impl<R: Read> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
            pending: Vec::new(),
        }
    }

    pub fn read_line(&mut self) -> Result<Option<String>> {
        loop {
            let available = match self.inner.fill_buf() {
                Ok(available) => available,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            };

            if available.is_empty() {
                // end of stream: flush what is left, then report it
                if self.pending.is_empty() {
                    return Err(Error::Disconnected);
                }
            } else {
                let room = MAX_LINE_BYTES - self.pending.len();
                let window = &available[..available.len().min(room)];
                let (used, complete) = match window.iter().position(|&b| b == b'\n') {
                    Some(i) => (i + 1, true),
                    None => (window.len(), window.len() == room),
                };
                self.pending.extend_from_slice(&window[..used]);
                self.inner.consume(used);
                if !complete {
                    continue;
                }
            }

            let line = self.take_pending();
            if !line.is_empty() {
                return Ok(Some(line));
            }
        }
    }

    fn take_pending(&mut self) -> String {
        let raw = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&raw).trim().to_string()
    }
}

pub struct PortSession {
    name: String,
    reader: Option<LineReader<Box<dyn SerialPort>>>,
}

impl PortSession {
    pub fn open(name: &str, baud: BaudRate, read_timeout: Duration) -> Result<Self> {
        let port = serialport::new(name, baud.as_u32())
            .timeout(read_timeout)
            .open()
            .map_err(|e| Error::connection(name, e))?;
        info!(port = name, baud = baud.as_u32(), "serial port opened");
        Ok(Self {
            name: name.to_string(),
            reader: Some(LineReader::new(port)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_open(&self) -> bool {
        self.reader.is_some()
    }
}

impl LineSource for PortSession {
    fn read_line(&mut self) -> Result<Option<String>> {
        match self.reader.as_mut() {
            Some(reader) => reader.read_line(),
            None => Err(Error::Disconnected),
        }
    }

    fn close(&mut self) {
        if self.reader.take().is_some() {
            debug!(port = %self.name, "serial port closed");
        }
    }
}

impl Drop for PortSession {
    fn drop(&mut self) {
        self.close();
    }
}
