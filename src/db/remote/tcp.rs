use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::protocol::{read_frame, write_frame};
use super::{Connector, Transport};
use crate::types::{GraphError, Result};

/// Connects to hosts by `host:port`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    fn connect(&self, address: &str) -> Result<Arc<dyn Transport>> {
        Ok(Arc::new(TcpTransport::connect(address)?))
    }
}

struct Connection {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

/// Blocking TCP transport; one request in flight per connection.
pub struct TcpTransport {
    address: String,
    conn: Mutex<Connection>,
}

impl TcpTransport {
    /// Opens a connection to `address`.
    pub fn connect(address: &str) -> Result<Self> {
        let stream = TcpStream::connect(address)
            .map_err(|err| GraphError::Transport(format!("connect {address}: {err}")))?;
        stream.set_nodelay(true)?;
        debug!(%address, "remote.tcp.connected");
        Ok(Self {
            address: address.to_owned(),
            conn: Mutex::new(Connection {
                reader: BufReader::new(stream.try_clone()?),
                writer: BufWriter::new(stream),
            }),
        })
    }
}

impl Transport for TcpTransport {
    fn roundtrip(&self, frame: &[u8]) -> Result<Vec<u8>> {
        let mut conn = self.conn.lock();
        write_frame(&mut conn.writer, frame)
            .map_err(|err| GraphError::Transport(format!("send to {}: {err}", self.address)))?;
        read_frame(&mut conn.reader)
            .map_err(|err| GraphError::Transport(format!("receive from {}: {err}", self.address)))?
            .ok_or_else(|| GraphError::Transport(format!("{} closed the connection", self.address)))
    }
}
