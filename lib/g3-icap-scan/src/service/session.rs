/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};

use super::{IcapClientConnection, IcapConnector, IcapServiceConfig};
use crate::options::{IcapOptionsRequest, IcapServiceOptions};
use crate::reason::IcapErrorReason;
use crate::respmod::{
    IcapRespmodResponse, LAST_CHUNK, ScanVerdict, build_preview_request, write_chunk_header,
};
use crate::{IcapScanError, ScanClassification, ScanEngine};

const SEND_CHUNK_SIZE: usize = 8192;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IcapSessionState {
    Negotiating,
    Idle,
    Sending,
    AwaitingContinue,
    SendingRemainder,
    AwaitingFinal,
    Closed,
}

/// A single ICAP connection, used by one scan at a time.
pub struct IcapSession {
    config: Arc<IcapServiceConfig>,
    conn: IcapClientConnection,
    state: IcapSessionState,
    engine: ScanEngine,
    options: Option<IcapServiceOptions>,
    preview_size: usize,
    istag: Option<String>,
    last_active: Instant,
    keep_alive: bool,
}

impl IcapSession {
    /// Connect to the server and negotiate the service options.
    pub async fn connect(config: Arc<IcapServiceConfig>) -> Result<Self, IcapScanError> {
        let conn = IcapConnector::new(&config).create().await?;
        IcapSession::with_connection(config, conn).await
    }

    /// Start a session on an already established stream.
    pub async fn new<S>(config: Arc<IcapServiceConfig>, stream: S) -> Result<Self, IcapScanError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let conn = IcapClientConnection::new(stream, &config);
        IcapSession::with_connection(config, conn).await
    }

    async fn with_connection(
        config: Arc<IcapServiceConfig>,
        conn: IcapClientConnection,
    ) -> Result<Self, IcapScanError> {
        let mut session = IcapSession {
            engine: config.engine,
            preview_size: config.preview_size.unwrap_or_default(),
            config,
            conn,
            state: IcapSessionState::Negotiating,
            options: None,
            istag: None,
            last_active: Instant::now(),
            keep_alive: true,
        };
        if session.config.preview_size.is_some() {
            session.state = IcapSessionState::Idle;
        } else {
            session.negotiate().await?;
        }
        Ok(session)
    }

    async fn negotiate(&mut self) -> Result<(), IcapScanError> {
        self.state = IcapSessionState::Negotiating;
        let options = match IcapOptionsRequest::new(&self.config)
            .get_options(&mut self.conn)
            .await
        {
            Ok(options) => options,
            Err(e) => {
                self.state = IcapSessionState::Closed;
                return Err(e);
            }
        };
        debug!(
            "ICAP service {} negotiated: preview {}, ttl {:?}, istag {:?}",
            self.config.key(),
            options.preview_size(),
            options.options_ttl(),
            options.istag()
        );

        self.last_active = Instant::now();
        self.keep_alive = options.headers().keep_alive();
        self.preview_size = options.preview_size();
        self.istag = options.istag().map(|s| s.to_string());
        self.options = Some(options);
        self.state = IcapSessionState::Idle;
        Ok(())
    }

    /// Renegotiate if the previous OPTIONS result has expired.
    async fn ensure_options(&mut self) -> Result<(), IcapScanError> {
        let expired = self
            .options
            .as_ref()
            .is_some_and(|o| o.expired(Instant::now()));
        if expired {
            debug!("ICAP service {} options expired", self.config.key());
            self.negotiate().await?;
        }
        Ok(())
    }

    #[inline]
    pub fn state(&self) -> IcapSessionState {
        self.state
    }

    #[inline]
    pub fn engine(&self) -> ScanEngine {
        self.engine
    }

    pub fn set_engine(&mut self, engine: ScanEngine) {
        self.engine = engine;
    }

    #[inline]
    pub fn preview_size(&self) -> usize {
        self.preview_size
    }

    pub fn options(&self) -> Option<&IcapServiceOptions> {
        self.options.as_ref()
    }

    /// Get the current ISTag, renegotiating first if the options have expired.
    pub async fn get_istag(&mut self) -> Result<Option<&str>, IcapScanError> {
        self.check_idle()?;
        self.ensure_options().await?;
        Ok(self.istag.as_deref())
    }

    /// Time since the last response was received.
    pub fn idle_time(&self) -> Duration {
        self.last_active.elapsed()
    }

    /// Whether the session can serve another scan.
    pub fn is_reusable(&self) -> bool {
        self.state == IcapSessionState::Idle && self.keep_alive
    }

    pub(crate) fn is_peer_closed(&mut self) -> bool {
        self.conn.is_peer_closed()
    }

    fn check_idle(&self) -> Result<(), IcapScanError> {
        if self.is_reusable() {
            Ok(())
        } else {
            Err(IcapScanError::SessionUnusable(self.state))
        }
    }

    /// Scan `len` bytes from `source`, named `name` in the encapsulated request.
    pub async fn scan<R>(
        &mut self,
        name: &str,
        source: &mut R,
        len: u64,
    ) -> Result<ScanVerdict, IcapScanError>
    where
        R: AsyncRead + Unpin,
    {
        self.check_idle()?;
        self.ensure_options().await?;
        match self.do_scan(name, source, len).await {
            Ok(verdict) => {
                self.state = IcapSessionState::Idle;
                Ok(verdict)
            }
            Err(e) => {
                debug!("ICAP scan of {name} via {} failed: {e}", self.config.key());
                if self.state != IcapSessionState::Idle {
                    self.state = IcapSessionState::Closed;
                }
                Err(e)
            }
        }
    }

    /// Like [`IcapSession::scan`], but skip the scan if trusting cached ISTags
    /// is enabled and `istag` matches the current ISTag of the service.
    pub async fn scan_with_istag<R>(
        &mut self,
        name: &str,
        source: &mut R,
        len: u64,
        istag: &str,
    ) -> Result<ScanVerdict, IcapScanError>
    where
        R: AsyncRead + Unpin,
    {
        if self.config.trust_cached_istag && self.get_istag().await? == Some(istag) {
            debug!(
                "skip ICAP scan of {name} via {} as ISTag {istag} is unchanged",
                self.config.key()
            );
            return Ok(ScanVerdict::cached(istag));
        }
        self.scan(name, source, len).await
    }

    async fn recv_response(&mut self) -> Result<IcapRespmodResponse, IcapScanError> {
        let rsp = IcapRespmodResponse::recv(&mut self.conn, &self.config).await?;
        self.last_active = Instant::now();
        if let Some(istag) = rsp.icap.istag() {
            self.istag = Some(istag.to_string());
        }
        if !rsp.icap.keep_alive() {
            self.keep_alive = false;
        }
        Ok(rsp)
    }

    fn infected(&self, rsp: IcapRespmodResponse) -> ScanVerdict {
        let diagnostic = self
            .engine
            .extract_diagnostic(&rsp.icap, rsp.http_body.as_deref());
        ScanVerdict::new(false, diagnostic, rsp, self.istag.clone())
    }

    fn clean(&self, rsp: IcapRespmodResponse) -> ScanVerdict {
        ScanVerdict::new(true, None, rsp, self.istag.clone())
    }

    fn unexpected(&self, reason: IcapErrorReason, rsp: &IcapRespmodResponse) -> IcapScanError {
        let code = rsp.icap.status_code();
        if code == 404 {
            IcapScanError::ServiceNotFound(
                IcapErrorReason::ServiceNotFound,
                self.config.key().to_string(),
            )
        } else {
            IcapScanError::UnexpectedStatus(reason, code, rsp.icap.reason().to_string())
        }
    }

    async fn do_scan<R>(
        &mut self,
        name: &str,
        source: &mut R,
        len: u64,
    ) -> Result<ScanVerdict, IcapScanError>
    where
        R: AsyncRead + Unpin,
    {
        // nothing is sent before the preview is read, so the session stays
        // Idle if the source fails here
        let preview_len = len.min(self.preview_size as u64);
        let mut preview = Vec::with_capacity(preview_len as usize);
        (&mut *source)
            .take(preview_len)
            .read_to_end(&mut preview)
            .await
            .map_err(IcapScanError::SourceReadFailed)?;

        self.state = IcapSessionState::Sending;
        let mut sent = preview.len() as u64;
        let preview_eof = len <= self.preview_size as u64 || sent < preview_len;

        let req = build_preview_request(&self.config, name, &preview, preview_eof);
        #[cfg(feature = "log-raw-io")]
        debug!("ICAP -> {}", req.escape_ascii());
        self.conn.write_all(&req).await?;
        self.conn.flush().await?;

        if !preview_eof {
            self.state = IcapSessionState::AwaitingContinue;
            let rsp = self.recv_response().await?;
            match self.engine.classify(&rsp.icap) {
                ScanClassification::Infected => return Ok(self.infected(rsp)),
                ScanClassification::Clean => return Ok(self.clean(rsp)),
                ScanClassification::Continue => {}
                ScanClassification::Unknown => {
                    return Err(self.unexpected(IcapErrorReason::UnknownResponseForPreview, &rsp));
                }
            }

            self.state = IcapSessionState::SendingRemainder;
            let mut buf = vec![0u8; SEND_CHUNK_SIZE];
            let mut chunk_header = Vec::with_capacity(16);
            loop {
                let nr = source
                    .read(&mut buf)
                    .await
                    .map_err(IcapScanError::SourceReadFailed)?;
                if nr == 0 {
                    break;
                }
                chunk_header.clear();
                write_chunk_header(&mut chunk_header, nr);
                self.conn.write_all(&chunk_header).await?;
                self.conn.write_all(&buf[..nr]).await?;
                self.conn.write_all(b"\r\n").await?;
                sent += nr as u64;
            }
            self.conn.write_all(LAST_CHUNK).await?;
            self.conn.flush().await?;
        }
        if sent != len {
            warn!("scan source {name} has {sent} bytes but {len} bytes expected");
        }

        self.state = IcapSessionState::AwaitingFinal;
        let rsp = self.recv_response().await?;
        match self.engine.classify(&rsp.icap) {
            ScanClassification::Infected => Ok(self.infected(rsp)),
            ScanClassification::Clean => Ok(self.clean(rsp)),
            ScanClassification::Continue if preview_eof => Err(self.unexpected(
                IcapErrorReason::ContinueAfterPreviewEof,
                &rsp,
            )),
            ScanClassification::Continue => Err(self.unexpected(
                IcapErrorReason::UnknownResponseAfterContinue,
                &rsp,
            )),
            ScanClassification::Unknown => {
                Err(self.unexpected(IcapErrorReason::UnrecognizedFinalStatus, &rsp))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::respmod::build_preview_request;
    use crate::{IcapConnectionKey, IcapErrorKind, MAX_PREVIEW_SIZE};
    use tokio_test::io::Builder;

    const OPTIONS_OK: &[u8] = b"ICAP/1.0 200 OK\r\nMethods: RESPMOD\r\nPreview: 1024\r\n\
        ISTag: \"t1\"\r\nOptions-TTL: 3600\r\nEncapsulated: null-body=0\r\n\r\n";
    const NO_CONTENT: &[u8] =
        b"ICAP/1.0 204 No Content\r\nISTag: \"t1\"\r\nEncapsulated: null-body=0\r\n\r\n";
    const CONTINUE: &[u8] = b"ICAP/1.0 100 Continue\r\n\r\n";

    fn config(f: impl FnOnce(&mut IcapServiceConfig)) -> Arc<IcapServiceConfig> {
        let mut config =
            IcapServiceConfig::new(IcapConnectionKey::new("127.0.0.1", 1344, "avscan"));
        config.set_user_agent("test");
        f(&mut config);
        Arc::new(config)
    }

    fn options_response(preview: usize, ttl: u64, istag: &str) -> Vec<u8> {
        format!(
            "ICAP/1.0 200 OK\r\nPreview: {preview}\r\nOptions-TTL: {ttl}\r\n\
             ISTag: \"{istag}\"\r\nEncapsulated: null-body=0\r\n\r\n"
        )
        .into_bytes()
    }

    fn remainder(data: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        for chunk in data.chunks(SEND_CHUNK_SIZE) {
            write_chunk_header(&mut buf, chunk.len());
            buf.extend_from_slice(chunk);
            buf.extend_from_slice(b"\r\n");
        }
        buf.extend_from_slice(LAST_CHUNK);
        buf
    }

    fn file(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[tokio::test]
    async fn small_file_with_ieof() {
        let config = config(|_| {});
        let data = file(100);
        let stream = Builder::new()
            .write(&config.build_options_request())
            .read(OPTIONS_OK)
            .write(&build_preview_request(&config, "small.bin", &data, true))
            .read(NO_CONTENT)
            .build();

        let mut session = IcapSession::new(config, stream).await.unwrap();
        assert_eq!(session.preview_size(), 1024);
        assert_eq!(session.state(), IcapSessionState::Idle);

        let verdict = session
            .scan("small.bin", &mut data.as_slice(), 100)
            .await
            .unwrap();
        assert!(verdict.is_clean());
        assert!(!verdict.is_cached());
        assert_eq!(verdict.diagnostic(), None);
        assert_eq!(verdict.headers().status_code(), 204);
        assert_eq!(verdict.istag(), Some("\"t1\""));
        assert!(session.is_reusable());
    }

    #[tokio::test]
    async fn large_file_after_continue() {
        let config = config(|_| {});
        let data = file(20000);
        let body = "<html><body>EICAR found</body></html>";
        let mut final_rsp = b"ICAP/1.0 200 OK\r\nISTag: \"t2\"\r\n\
            X-Infection-Found: Type=0; Resolution=2; Threat=EICAR;\r\n\
            X-Virus-ID: EICAR\r\nEncapsulated: res-hdr=0, res-body=55\r\n\r\n\
            HTTP/1.1 403 Forbidden\r\nContent-Type: text/html\r\n\r\n"
            .to_vec();
        final_rsp.extend_from_slice(format!("{:x}\r\n{body}\r\n0\r\n\r\n", body.len()).as_bytes());

        let stream = Builder::new()
            .write(&config.build_options_request())
            .read(OPTIONS_OK)
            .write(&build_preview_request(
                &config,
                "large.bin",
                &data[..1024],
                false,
            ))
            .read(CONTINUE)
            .write(&remainder(&data[1024..]))
            .read(&final_rsp)
            .build();

        let mut session = IcapSession::new(config, stream).await.unwrap();
        let verdict = session
            .scan("large.bin", &mut data.as_slice(), data.len() as u64)
            .await
            .unwrap();
        assert!(!verdict.is_clean());
        assert_eq!(verdict.diagnostic(), Some("EICAR"));
        assert_eq!(verdict.istag(), Some("\"t2\""));
        assert_eq!(verdict.http_headers().map(|h| h.status_code()), Some(403));
        assert_eq!(verdict.http_body(), Some(body));
        assert_eq!(verdict.vendor_headers().count(), 2);
        assert!(session.is_reusable());
        assert_eq!(session.get_istag().await.unwrap(), Some("\"t2\""));
    }

    #[tokio::test]
    async fn verdict_in_preview_response() {
        let config = config(|c| c.set_engine(ScanEngine::Symantec));
        let data = file(4096);
        let body = "<html><head><title>Access Denied</title></head>Threat: EICAR</html>";
        let mut rsp = b"ICAP/1.0 201 Created\r\nISTag: \"t1\"\r\n\
            Encapsulated: res-hdr=0, res-body=46\r\n\r\n\
            HTTP/1.1 403 Forbidden\r\nContent-Length: 0\r\n\r\n"
            .to_vec();
        rsp.extend_from_slice(format!("{:x}\r\n{body}\r\n0\r\n\r\n", body.len()).as_bytes());

        let stream = Builder::new()
            .write(&config.build_options_request())
            .read(OPTIONS_OK)
            .write(&build_preview_request(&config, "doc.pdf", &data[..1024], false))
            .read(&rsp)
            .build();

        let mut session = IcapSession::new(config, stream).await.unwrap();
        assert_eq!(session.engine(), ScanEngine::Symantec);
        let verdict = session
            .scan("doc.pdf", &mut data.as_slice(), data.len() as u64)
            .await
            .unwrap();
        assert!(!verdict.is_clean());
        assert_eq!(verdict.diagnostic(), Some("</head>Threat: EICAR"));
        assert!(session.is_reusable());
    }

    #[tokio::test]
    async fn body_chunk_like_last_chunk() {
        let config = config(|c| c.set_engine(ScanEngine::Symantec));
        let mut rsp = b"ICAP/1.0 201 Created\r\nISTag: \"t1\"\r\n\
            X-Violations-Found: 1\r\nEncapsulated: res-hdr=0, res-body=27\r\n\r\n\
            HTTP/1.1 403 Forbidden\r\n\r\n"
            .to_vec();
        rsp.extend_from_slice(b"10\r\n\r\n<title></title\r\n");
        rsp.extend_from_slice(b"15\r\n>Threat: EICAR</html>\r\n0\r\n\r\n");

        let stream = Builder::new()
            .write(&config.build_options_request())
            .read(OPTIONS_OK)
            .write(&build_preview_request(&config, "a", b"abc", true))
            .read(&rsp)
            .write(&build_preview_request(&config, "b", b"abc", true))
            .read(NO_CONTENT)
            .build();

        let mut session = IcapSession::new(config, stream).await.unwrap();
        let verdict = session.scan("a", &mut &b"abc"[..], 3).await.unwrap();
        assert!(!verdict.is_clean());
        assert_eq!(
            verdict.http_body(),
            Some("\r\n<title></title>Threat: EICAR</html>")
        );
        assert_eq!(verdict.diagnostic(), Some("Threat: EICAR"));
        assert!(session.is_reusable());

        let verdict = session.scan("b", &mut &b"abc"[..], 3).await.unwrap();
        assert!(verdict.is_clean());
    }

    #[tokio::test]
    async fn non_utf8_virus_id() {
        let config = config(|_| {});
        let stream = Builder::new()
            .write(&config.build_options_request())
            .read(OPTIONS_OK)
            .write(&build_preview_request(&config, "a", b"abc", true))
            .read(b"ICAP/1.0 403 Forbidden\r\nX-Virus-ID: Virus \xe4\r\n\r\n")
            .build();

        let mut session = IcapSession::new(config, stream).await.unwrap();
        let verdict = session.scan("a", &mut &b"abc"[..], 3).await.unwrap();
        assert!(!verdict.is_clean());
        assert_eq!(verdict.diagnostic(), Some("Virus \u{fffd}"));
        assert!(session.is_reusable());
    }

    #[tokio::test]
    async fn service_not_found() {
        let config = config(|_| {});
        let data = file(2000);
        let stream = Builder::new()
            .write(&config.build_options_request())
            .read(OPTIONS_OK)
            .write(&build_preview_request(&config, "a", &data[..1024], false))
            .read(b"ICAP/1.0 404 ICAP Service Not Found\r\n\r\n")
            .build();

        let mut session = IcapSession::new(config, stream).await.unwrap();
        let e = session
            .scan("a", &mut data.as_slice(), data.len() as u64)
            .await
            .unwrap_err();
        assert!(matches!(e, IcapScanError::ServiceNotFound(_, _)));
        assert_eq!(e.kind(), IcapErrorKind::Protocol);
        assert_eq!(session.state(), IcapSessionState::Closed);
        assert!(!session.is_reusable());

        let e = session
            .scan("a", &mut data.as_slice(), data.len() as u64)
            .await
            .unwrap_err();
        assert!(matches!(
            e,
            IcapScanError::SessionUnusable(IcapSessionState::Closed)
        ));
    }

    #[tokio::test]
    async fn continue_after_preview_eof() {
        let config = config(|_| {});
        let data = file(10);
        let stream = Builder::new()
            .write(&config.build_options_request())
            .read(OPTIONS_OK)
            .write(&build_preview_request(&config, "a", &data, true))
            .read(CONTINUE)
            .build();

        let mut session = IcapSession::new(config, stream).await.unwrap();
        let e = session
            .scan("a", &mut data.as_slice(), 10)
            .await
            .unwrap_err();
        assert!(matches!(
            e,
            IcapScanError::UnexpectedStatus(IcapErrorReason::ContinueAfterPreviewEof, 100, _)
        ));
    }

    #[tokio::test]
    async fn unrecognized_final_status() {
        let config = config(|c| c.set_engine(ScanEngine::ClamAv));
        let data = file(10);
        let stream = Builder::new()
            .write(&config.build_options_request())
            .read(OPTIONS_OK)
            .write(&build_preview_request(&config, "a", &data, true))
            .read(NO_CONTENT)
            .build();

        let mut session = IcapSession::new(config, stream).await.unwrap();
        let e = session
            .scan("a", &mut data.as_slice(), 10)
            .await
            .unwrap_err();
        assert!(matches!(
            e,
            IcapScanError::UnexpectedStatus(IcapErrorReason::UnrecognizedFinalStatus, 204, _)
        ));
        assert_eq!(session.state(), IcapSessionState::Closed);
    }

    #[tokio::test]
    async fn connection_close() {
        let config = config(|_| {});
        let stream = Builder::new()
            .write(&config.build_options_request())
            .read(OPTIONS_OK)
            .write(&build_preview_request(&config, "a", b"abc", true))
            .read(b"ICAP/1.0 204 No Content\r\nConnection: close\r\n\r\n")
            .build();

        let mut session = IcapSession::new(config, stream).await.unwrap();
        let verdict = session.scan("a", &mut &b"abc"[..], 3).await.unwrap();
        assert!(verdict.is_clean());
        assert_eq!(session.state(), IcapSessionState::Idle);
        assert!(!session.is_reusable());
    }

    #[tokio::test]
    async fn fixed_preview_size() {
        let config = config(|c| c.set_preview_size(4));
        let data = b"0123456789";
        let stream = Builder::new()
            .write(&build_preview_request(&config, "a", &data[..4], false))
            .read(CONTINUE)
            .write(&remainder(&data[4..]))
            .read(NO_CONTENT)
            .build();

        let mut session = IcapSession::new(config, stream).await.unwrap();
        assert!(session.options().is_none());
        assert_eq!(session.preview_size(), 4);
        assert_eq!(session.get_istag().await.unwrap(), None);
        let verdict = session.scan("a", &mut &data[..], 10).await.unwrap();
        assert!(verdict.is_clean());
    }

    #[tokio::test]
    async fn zero_preview_size() {
        let config = config(|c| c.set_preview_size(0));
        let data = b"0123456789";
        let stream = Builder::new()
            .write(&build_preview_request(&config, "a", b"", false))
            .read(CONTINUE)
            .write(&remainder(data))
            .read(NO_CONTENT)
            .build();

        let mut session = IcapSession::new(config, stream).await.unwrap();
        let verdict = session.scan("a", &mut &data[..], 10).await.unwrap();
        assert!(verdict.is_clean());
    }

    #[tokio::test]
    async fn empty_body() {
        let config = config(|_| {});
        let request = build_preview_request(&config, "empty", b"", true);
        assert!(request.ends_with(b"chunked\r\n\r\n0; ieof\r\n\r\n"));
        let stream = Builder::new()
            .write(&config.build_options_request())
            .read(OPTIONS_OK)
            .write(&request)
            .read(NO_CONTENT)
            .build();

        let mut session = IcapSession::new(config, stream).await.unwrap();
        let verdict = session.scan("empty", &mut &b""[..], 0).await.unwrap();
        assert!(verdict.is_clean());
    }

    #[tokio::test]
    async fn short_source() {
        let config = config(|_| {});
        let data = file(100);
        let stream = Builder::new()
            .write(&config.build_options_request())
            .read(OPTIONS_OK)
            .write(&build_preview_request(&config, "a", &data, true))
            .read(NO_CONTENT)
            .build();

        let mut session = IcapSession::new(config, stream).await.unwrap();
        // declared larger than the preview, but the source ends within it
        let verdict = session
            .scan("a", &mut data.as_slice(), 5000)
            .await
            .unwrap();
        assert!(verdict.is_clean());
    }

    #[tokio::test]
    async fn source_failed_before_send() {
        let config = config(|c| c.set_preview_size(4));
        let stream = Builder::new()
            .write(&build_preview_request(&config, "b", b"abc", true))
            .read(NO_CONTENT)
            .build();
        let mut source = Builder::new()
            .read_error(std::io::Error::other("disk error"))
            .build();

        let mut session = IcapSession::new(config, stream).await.unwrap();
        let e = session.scan("a", &mut source, 3).await.unwrap_err();
        assert!(matches!(e, IcapScanError::SourceReadFailed(_)));
        assert_eq!(e.kind(), IcapErrorKind::Source);
        assert!(session.is_reusable());

        let verdict = session.scan("b", &mut &b"abc"[..], 3).await.unwrap();
        assert!(verdict.is_clean());
    }

    #[tokio::test]
    async fn source_failed_after_preview() {
        let config = config(|c| c.set_preview_size(4));
        let stream = Builder::new()
            .write(&build_preview_request(&config, "a", b"0123", false))
            .read(CONTINUE)
            .build();
        let mut source = Builder::new()
            .read(b"0123")
            .read_error(std::io::Error::other("disk error"))
            .build();

        let mut session = IcapSession::new(config, stream).await.unwrap();
        let e = session.scan("a", &mut source, 10).await.unwrap_err();
        assert_eq!(e.kind(), IcapErrorKind::Source);
        assert_eq!(session.state(), IcapSessionState::Closed);
        assert!(!session.is_reusable());
    }

    #[tokio::test]
    async fn no_preview_in_options() {
        let config = config(|_| {});
        let stream = Builder::new()
            .write(&config.build_options_request())
            .read(b"ICAP/1.0 200 OK\r\nISTag: \"t1\"\r\n\r\n")
            .build();

        let Err(e) = IcapSession::new(config, stream).await else {
            panic!("negotiation should fail");
        };
        assert_eq!(e.kind(), IcapErrorKind::Negotiation);
    }

    #[tokio::test]
    async fn renegotiate_after_ttl() {
        let config = config(|_| {});
        let stream = Builder::new()
            .write(&config.build_options_request())
            .read(&options_response(1024, 1, "t1"))
            .write(&config.build_options_request())
            .read(&options_response(2048, 3600, "t2"))
            .build();

        let mut session = IcapSession::new(config, stream).await.unwrap();
        assert_eq!(session.get_istag().await.unwrap(), Some("\"t1\""));
        assert_eq!(session.get_istag().await.unwrap(), Some("\"t1\""));

        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert_eq!(session.get_istag().await.unwrap(), Some("\"t2\""));
        assert_eq!(session.get_istag().await.unwrap(), Some("\"t2\""));
        assert_eq!(session.preview_size(), 2048);
    }

    #[tokio::test]
    async fn huge_preview_in_options() {
        let config = config(|_| {});
        let data = file(MAX_PREVIEW_SIZE + 10);
        let stream = Builder::new()
            .write(&config.build_options_request())
            .read(&options_response(1 << 30, 3600, "t1"))
            .write(&build_preview_request(
                &config,
                "a",
                &data[..MAX_PREVIEW_SIZE],
                false,
            ))
            .read(CONTINUE)
            .write(&remainder(&data[MAX_PREVIEW_SIZE..]))
            .read(NO_CONTENT)
            .build();

        let mut session = IcapSession::new(config, stream).await.unwrap();
        assert_eq!(session.preview_size(), MAX_PREVIEW_SIZE);
        let verdict = session
            .scan("a", &mut data.as_slice(), data.len() as u64)
            .await
            .unwrap();
        assert!(verdict.is_clean());
    }

    #[tokio::test]
    async fn no_renegotiate_within_ttl() {
        let config = config(|_| {});
        let stream = Builder::new()
            .write(&config.build_options_request())
            .read(&options_response(1024, 3600, "t1"))
            .build();

        let mut session = IcapSession::new(config, stream).await.unwrap();
        for _ in 0..10 {
            assert_eq!(session.get_istag().await.unwrap(), Some("\"t1\""));
        }
        assert!(session.idle_time() < Duration::from_secs(60));
    }

    #[tokio::test]
    async fn trusted_istag() {
        let config = config(|c| c.set_trust_cached_istag(true));
        let stream = Builder::new()
            .write(&config.build_options_request())
            .read(OPTIONS_OK)
            .write(&build_preview_request(&config, "b", b"abc", true))
            .read(NO_CONTENT)
            .build();

        let mut session = IcapSession::new(config, stream).await.unwrap();
        let verdict = session
            .scan_with_istag("a", &mut &b"abc"[..], 3, "\"t1\"")
            .await
            .unwrap();
        assert!(verdict.is_clean());
        assert!(verdict.is_cached());

        let verdict = session
            .scan_with_istag("b", &mut &b"abc"[..], 3, "\"t0\"")
            .await
            .unwrap();
        assert!(verdict.is_clean());
        assert!(!verdict.is_cached());
    }

    #[tokio::test]
    async fn untrusted_istag() {
        let config = config(|_| {});
        let stream = Builder::new()
            .write(&config.build_options_request())
            .read(OPTIONS_OK)
            .write(&build_preview_request(&config, "a", b"abc", true))
            .read(NO_CONTENT)
            .build();

        let mut session = IcapSession::new(config, stream).await.unwrap();
        let verdict = session
            .scan_with_istag("a", &mut &b"abc"[..], 3, "\"t1\"")
            .await
            .unwrap();
        assert!(!verdict.is_cached());
    }
}
