/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::net::SocketAddr;
use std::sync::LazyLock;
use std::time::Duration;

use futures_util::FutureExt;
use log::debug;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter,
};
use tokio::net::TcpSocket;

use g3_io_ext::{KmpPattern, LimitedBufReadExt};

use super::IcapServiceConfig;
use crate::IcapScanError;
use crate::parse::ResponseHeaders;
use crate::reason::IcapErrorReason;
use crate::respmod::parse_chunk_size;

const WRITE_BUFFER_SIZE: usize = 32 * 1024;
const CHUNK_LINE_MAX_SIZE: usize = 1024;

static HEADER_END: LazyLock<KmpPattern> = LazyLock::new(|| KmpPattern::new(b"\r\n\r\n"));
static LINE_END: LazyLock<KmpPattern> = LazyLock::new(|| KmpPattern::new(b"\r\n"));

pub(crate) type IcapClientReader = BufReader<Box<dyn AsyncRead + Send + Unpin>>;
pub(crate) type IcapClientWriter = BufWriter<Box<dyn AsyncWrite + Send + Unpin>>;

pub(crate) struct IcapClientConnection {
    reader: IcapClientReader,
    writer: IcapClientWriter,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl IcapClientConnection {
    pub(crate) fn new<S>(stream: S, config: &IcapServiceConfig) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (r, w) = tokio::io::split(stream);
        let r: Box<dyn AsyncRead + Send + Unpin> = Box::new(r);
        let w: Box<dyn AsyncWrite + Send + Unpin> = Box::new(w);
        IcapClientConnection {
            reader: BufReader::new(r),
            writer: BufWriter::with_capacity(WRITE_BUFFER_SIZE, w),
            read_timeout: config.read_timeout,
            write_timeout: config.write_timeout,
        }
    }

    pub(crate) async fn write_all(&mut self, buf: &[u8]) -> Result<(), IcapScanError> {
        match tokio::time::timeout(self.write_timeout, self.writer.write_all(buf)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(IcapScanError::IcapServerWriteFailed(e)),
            Err(_) => Err(IcapScanError::IcapServerWriteTimeout),
        }
    }

    pub(crate) async fn flush(&mut self) -> Result<(), IcapScanError> {
        match tokio::time::timeout(self.write_timeout, self.writer.flush()).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(IcapScanError::IcapServerWriteFailed(e)),
            Err(_) => Err(IcapScanError::IcapServerWriteTimeout),
        }
    }

    /// Read until `pattern`, return `None` if eof or `max_size` is reached first.
    async fn recv_until(
        &mut self,
        pattern: &KmpPattern,
        max_size: usize,
    ) -> Result<Option<Vec<u8>>, IcapScanError> {
        let mut buf = Vec::with_capacity(max_size.min(1024));
        let (found, nr) = match tokio::time::timeout(
            self.read_timeout,
            self.reader.limited_read_until_pattern(pattern, max_size, &mut buf),
        )
        .await
        {
            Ok(Ok(r)) => r,
            Ok(Err(e)) => return Err(IcapScanError::IcapServerReadFailed(e)),
            Err(_) => return Err(IcapScanError::IcapServerReadTimeout),
        };
        if found {
            Ok(Some(buf))
        } else if nr < max_size {
            Err(IcapScanError::IcapServerConnectionClosed)
        } else {
            Ok(None)
        }
    }

    pub(crate) async fn recv_header(
        &mut self,
        max_size: usize,
    ) -> Result<ResponseHeaders, IcapScanError> {
        let buf = self.recv_raw_header(max_size).await?;
        let headers = ResponseHeaders::parse(&buf)?;
        Ok(headers)
    }

    pub(crate) async fn recv_raw_header(
        &mut self,
        max_size: usize,
    ) -> Result<Vec<u8>, IcapScanError> {
        let buf = self
            .recv_until(&HEADER_END, max_size)
            .await?
            .ok_or(IcapScanError::TooLargeHeader(max_size))?;
        #[cfg(feature = "log-raw-io")]
        debug!("ICAP <- {}", buf.escape_ascii());
        Ok(buf)
    }

    async fn recv_exact(&mut self, buf: &mut [u8]) -> Result<(), IcapScanError> {
        match tokio::time::timeout(self.read_timeout, self.reader.read_exact(buf)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                Err(IcapScanError::IcapServerConnectionClosed)
            }
            Ok(Err(e)) => Err(IcapScanError::IcapServerReadFailed(e)),
            Err(_) => Err(IcapScanError::IcapServerReadTimeout),
        }
    }

    async fn recv_chunk_line(&mut self) -> Result<Vec<u8>, IcapScanError> {
        self.recv_until(&LINE_END, CHUNK_LINE_MAX_SIZE)
            .await?
            .ok_or(IcapScanError::InvalidChunkedBody("too long chunk line"))
    }

    /// Read a chunked body by its chunk framing, up to and including the
    /// trailer section, and return the decoded data.
    ///
    /// Chunk data is never searched for terminators, so the connection stays
    /// aligned whatever the body contains.
    pub(crate) async fn recv_chunked_body(
        &mut self,
        max_size: usize,
    ) -> Result<Vec<u8>, IcapScanError> {
        let too_large = || {
            IcapScanError::TooLargeEncapsulatedResponse(
                IcapErrorReason::NoBodyTerminatorFound,
                max_size,
            )
        };

        let mut body = Vec::new();
        loop {
            let line = self.recv_chunk_line().await?;
            let size = parse_chunk_size(&line)
                .ok_or(IcapScanError::InvalidChunkedBody("invalid chunk size line"))?;
            if size == 0 {
                break;
            }
            if size > max_size - body.len() {
                return Err(too_large());
            }

            let start = body.len();
            body.resize(start + size, 0);
            self.recv_exact(&mut body[start..]).await?;
            let mut crlf = [0u8; 2];
            self.recv_exact(&mut crlf).await?;
            if crlf != *b"\r\n" {
                return Err(IcapScanError::InvalidChunkedBody("no CRLF after chunk data"));
            }
        }

        let mut trailer_size = 0;
        loop {
            let line = self.recv_chunk_line().await?;
            if line == b"\r\n" {
                break;
            }
            trailer_size += line.len();
            if trailer_size > max_size {
                return Err(too_large());
            }
        }

        #[cfg(feature = "log-raw-io")]
        debug!("ICAP <- chunked body of {} bytes", body.len());
        Ok(body)
    }

    /// Check whether the peer closed the connection, or sent unsolicited data,
    /// while it was idle. This never blocks.
    pub(crate) fn is_peer_closed(&mut self) -> bool {
        match self.reader.fill_buf().now_or_never() {
            None => false,
            Some(Ok(buf)) => {
                if !buf.is_empty() {
                    debug!("ICAP server sent {} bytes of unexpected data", buf.len());
                }
                true
            }
            Some(Err(_)) => true,
        }
    }
}

pub(crate) struct IcapConnector<'a> {
    config: &'a IcapServiceConfig,
}

impl<'a> IcapConnector<'a> {
    pub(crate) fn new(config: &'a IcapServiceConfig) -> Self {
        IcapConnector { config }
    }

    async fn select_peer_addr(&self) -> io::Result<SocketAddr> {
        let key = self.config.key();
        let mut addrs = tokio::net::lookup_host((key.lookup_host(), key.port())).await?;
        addrs
            .next()
            .ok_or_else(|| io::Error::other("no resolved socket address"))
    }

    async fn connect(&self) -> io::Result<IcapClientConnection> {
        let peer = self.select_peer_addr().await?;
        let socket = if peer.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        if self.config.tcp_keepalive {
            socket.set_keepalive(true)?;
        }
        let stream = socket.connect(peer).await?;
        stream.set_nodelay(true)?;
        debug!("connected to ICAP server {} at {peer}", self.config.key());
        Ok(IcapClientConnection::new(stream, self.config))
    }

    pub(crate) async fn create(&self) -> Result<IcapClientConnection, IcapScanError> {
        match tokio::time::timeout(self.config.connect_timeout, self.connect()).await {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(e)) => Err(IcapScanError::ConnectFailed(e)),
            Err(_) => Err(IcapScanError::ConnectTimeout),
        }
    }
}
