use std::future::Future;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio_modbus::client::{Context, Reader as _, Writer as _};
use tokio_modbus::{ExceptionCode, Slave};
use tracing::{debug, info, trace, warn};

use crate::registers::RegisterKind;

pub const DEFAULT_PORT: u16 = 502;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("lookup of `{1}` failed")]
    LookupHost(#[source] std::io::Error, String),
    #[error("`{0}` did not resolve to any address")]
    NoAddress(String),
    #[error("could not connect to `{1}` over TCP")]
    Connect(#[source] std::io::Error, String),
    #[error("connecting to `{1}` did not complete within {0:?}")]
    ConnectTimeout(Duration, String),
    #[error("{op} at address {address} failed")]
    Transport {
        #[source]
        source: tokio_modbus::Error,
        op: Operation,
        address: u16,
    },
    #[error("the controller rejected {op} at address {address} with exception {code:?}")]
    Exception { code: ExceptionCode, op: Operation, address: u16 },
    #[error("{op} at address {address} did not complete within {timeout:?}")]
    Timeout { timeout: Duration, op: Operation, address: u16 },
    #[error("the controller returned {got} words for {op} at address {address}, expected {expected}")]
    ShortResponse { op: Operation, address: u16, expected: u16, got: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub enum Operation {
    #[strum(serialize = "reading input registers")]
    ReadInput,
    #[strum(serialize = "reading holding registers")]
    ReadHolding,
    #[strum(serialize = "writing a register")]
    WriteSingle,
    #[strum(serialize = "writing registers")]
    WriteMultiple,
}

impl Operation {
    pub(crate) fn read(kind: RegisterKind) -> Self {
        match kind {
            RegisterKind::Input => Operation::ReadInput,
            RegisterKind::Holding => Operation::ReadHolding,
        }
    }
}

#[derive(clap::Parser, Clone, Debug)]
#[group(id = "connection::Args")]
pub struct Args {
    /// Connect to the heating controller over Modbus TCP, e.g. `192.168.1.20` or
    /// `controller.lan:502`.
    #[arg(long, env = "SOLARFOCUS_TCP")]
    pub tcp: String,

    /// The modbus device (unit) ID.
    #[arg(long, short = 'i', env = "SOLARFOCUS_DEVICE_ID", default_value = "1")]
    pub device_id: u8,

    /// If connecting or a modbus request takes longer than this, consider it failed.
    #[arg(long, default_value = "3s")]
    pub timeout: humantime::Duration,
}

impl Args {
    /// The address with the default Modbus port appended if none was given.
    pub fn address(&self) -> String {
        with_default_port(&self.tcp)
    }
}

fn with_default_port(host: &str) -> String {
    let has_port = match host.rsplit_once(':') {
        // A bare IPv6 address has colons but no port.
        Some((head, port)) => {
            port.parse::<u16>().is_ok() && (!head.contains(':') || head.ends_with(']'))
        }
        None => false,
    };
    if has_port {
        host.to_string()
    } else if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{DEFAULT_PORT}")
    } else {
        format!("{host}:{DEFAULT_PORT}")
    }
}

/// Raw register access.
///
/// Implemented by [`Connection`] and by in-memory devices in tests.
pub trait RegisterIo {
    fn read_registers(
        &mut self,
        kind: RegisterKind,
        address: u16,
        count: u16,
    ) -> impl Future<Output = Result<Vec<u16>, Error>> + Send;

    /// One word is written with function 0x06, more with function 0x10.
    fn write_registers(
        &mut self,
        address: u16,
        words: &[u16],
    ) -> impl Future<Output = Result<(), Error>> + Send;
}

pub struct Connection {
    context: Context,
    timeout: Duration,
}

impl Connection {
    pub async fn new(args: &Args) -> Result<Connection, Error> {
        let address = args.address();
        let timeout = *args.timeout;
        info!(message = "connecting...", address, device_id = args.device_id);
        let addresses = tokio::net::lookup_host(&address)
            .await
            .map_err(|e| Error::LookupHost(e, address.clone()))?
            .collect::<Vec<_>>();
        debug!(message = "resolved", ?addresses);
        if addresses.is_empty() {
            return Err(Error::NoAddress(address));
        }
        let socket = tokio::time::timeout(timeout, TcpStream::connect(&*addresses))
            .await
            .map_err(|_| Error::ConnectTimeout(timeout, address.clone()))?
            .map_err(|e| Error::Connect(e, address.clone()))?;
        let nodelay_result = socket.set_nodelay(true);
        trace!(message = "setting nodelay", is_error = ?nodelay_result.err());
        info!(message = "connected");
        let context = tokio_modbus::client::tcp::attach_slave(socket, Slave(args.device_id));
        Ok(Self { context, timeout })
    }

    pub async fn close(mut self) {
        use tokio_modbus::client::Client as _;
        match self.context.disconnect().await {
            Ok(_) => debug!(message = "disconnected"),
            Err(e) => warn!(message = "disconnecting failed", error = %e),
        }
    }

    async fn complete<T>(
        timeout: Duration,
        op: Operation,
        address: u16,
        request: impl Future<Output = tokio_modbus::Result<T>>,
    ) -> Result<T, Error> {
        match tokio::time::timeout(timeout, request).await {
            Err(_) => Err(Error::Timeout { timeout, op, address }),
            Ok(Err(source)) => Err(Error::Transport { source, op, address }),
            Ok(Ok(Err(code))) => Err(Error::Exception { code, op, address }),
            Ok(Ok(Ok(response))) => Ok(response),
        }
    }
}

impl RegisterIo for Connection {
    async fn read_registers(
        &mut self,
        kind: RegisterKind,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, Error> {
        let op = Operation::read(kind);
        trace!(message = "sending", %op, address, count);
        let words = match kind {
            RegisterKind::Input => {
                let request = self.context.read_input_registers(address, count);
                Self::complete(self.timeout, op, address, request).await?
            }
            RegisterKind::Holding => {
                let request = self.context.read_holding_registers(address, count);
                Self::complete(self.timeout, op, address, request).await?
            }
        };
        if words.len() != usize::from(count) {
            return Err(Error::ShortResponse { op, address, expected: count, got: words.len() });
        }
        Ok(words)
    }

    async fn write_registers(&mut self, address: u16, words: &[u16]) -> Result<(), Error> {
        match words {
            [word] => {
                let op = Operation::WriteSingle;
                trace!(message = "sending", %op, address, word);
                let request = self.context.write_single_register(address, *word);
                Self::complete(self.timeout, op, address, request).await
            }
            _ => {
                let op = Operation::WriteMultiple;
                trace!(message = "sending", %op, address, ?words);
                let request = self.context.write_multiple_registers(address, words);
                Self::complete(self.timeout, op, address, request).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_port_is_appended() {
        assert_eq!(with_default_port("192.168.1.20"), "192.168.1.20:502");
        assert_eq!(with_default_port("controller.lan:1502"), "controller.lan:1502");
        assert_eq!(with_default_port("controller.lan"), "controller.lan:502");
        assert_eq!(with_default_port("fe80::1"), "[fe80::1]:502");
        assert_eq!(with_default_port("[fe80::1]:503"), "[fe80::1]:503");
    }

    #[test]
    fn errors_name_the_operation() {
        let error = Error::Exception {
            code: ExceptionCode::IllegalDataAddress,
            op: Operation::ReadHolding,
            address: 32600,
        };
        assert_eq!(
            error.to_string(),
            "the controller rejected reading holding registers at address 32600 with exception \
             IllegalDataAddress"
        );
    }

    #[tokio::test]
    async fn request_outcomes_are_mapped() {
        let timeout = Duration::from_millis(10);
        let op = Operation::ReadInput;

        let request = std::future::ready(Ok(Ok(vec![1, 2])));
        let words = Connection::complete::<Vec<u16>>(timeout, op, 2300, request).await.unwrap();
        assert_eq!(words, [1, 2]);

        let request = std::future::ready(Ok(Err(ExceptionCode::IllegalDataAddress)));
        let error = Connection::complete::<Vec<u16>>(timeout, op, 2300, request).await.unwrap_err();
        assert!(matches!(
            error,
            Error::Exception { code: ExceptionCode::IllegalDataAddress, op: Operation::ReadInput, address: 2300 }
        ));

        let broken = std::io::Error::from(std::io::ErrorKind::BrokenPipe);
        let request = std::future::ready(Err(tokio_modbus::Error::Transport(broken)));
        let error = Connection::complete::<Vec<u16>>(timeout, op, 2300, request).await.unwrap_err();
        assert!(matches!(error, Error::Transport { address: 2300, .. }));

        let request = std::future::pending::<tokio_modbus::Result<Vec<u16>>>();
        let error = Connection::complete(timeout, op, 2300, request).await.unwrap_err();
        assert!(matches!(error, Error::Timeout { timeout: t, address: 2300, .. } if t == timeout));
    }
}
