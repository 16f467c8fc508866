/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;

use thiserror::Error;

use crate::options::IcapOptionsError;
use crate::parse::IcapLineParseError;
use crate::reason::IcapErrorReason;
use crate::service::IcapSessionState;

/// Coarse classification of [`IcapScanError`].
///
/// Negotiation, protocol and transport errors are fatal for the session that
/// produced it. A source error is fatal only if the request was partially sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IcapErrorKind {
    Negotiation,
    Protocol,
    Transport,
    /// the local scan source failed, the ICAP server is not to blame
    Source,
}

#[derive(Debug, Error)]
pub enum IcapScanError {
    #[error("options negotiation failed: {0}")]
    Negotiation(#[from] IcapOptionsError),
    #[error("connect to ICAP server failed: {0:?}")]
    ConnectFailed(io::Error),
    #[error("connect to ICAP server timed out")]
    ConnectTimeout,
    #[error("write to ICAP server failed: {0:?}")]
    IcapServerWriteFailed(io::Error),
    #[error("write to ICAP server timed out")]
    IcapServerWriteTimeout,
    #[error("read from ICAP server failed: {0:?}")]
    IcapServerReadFailed(io::Error),
    #[error("read from ICAP server timed out")]
    IcapServerReadTimeout,
    #[error("ICAP server connection closed")]
    IcapServerConnectionClosed,
    #[error("read from scan source failed: {0:?}")]
    SourceReadFailed(io::Error),
    #[error("too large ICAP header, should be less than {0}")]
    TooLargeHeader(usize),
    #[error("{0} within {1} bytes")]
    TooLargeEncapsulatedResponse(IcapErrorReason, usize),
    #[error("invalid ICAP response: {0}")]
    InvalidResponse(#[from] IcapLineParseError),
    #[error("invalid encapsulated header value: {0}")]
    InvalidEncapsulatedHeader(&'static str),
    #[error("invalid chunked body: {0}")]
    InvalidChunkedBody(&'static str),
    #[error("{0}: {1}")]
    ServiceNotFound(IcapErrorReason, String),
    #[error("{0}: {1} {2}")]
    UnexpectedStatus(IcapErrorReason, u16, String),
    #[error("ICAP session is not usable in state {0:?}")]
    SessionUnusable(IcapSessionState),
}

impl IcapScanError {
    pub fn kind(&self) -> IcapErrorKind {
        match self {
            IcapScanError::Negotiation(_) => IcapErrorKind::Negotiation,
            IcapScanError::ConnectFailed(_)
            | IcapScanError::ConnectTimeout
            | IcapScanError::IcapServerWriteFailed(_)
            | IcapScanError::IcapServerWriteTimeout
            | IcapScanError::IcapServerReadFailed(_)
            | IcapScanError::IcapServerReadTimeout
            | IcapScanError::IcapServerConnectionClosed
            | IcapScanError::SessionUnusable(_) => IcapErrorKind::Transport,
            IcapScanError::SourceReadFailed(_) => IcapErrorKind::Source,
            IcapScanError::TooLargeHeader(_)
            | IcapScanError::TooLargeEncapsulatedResponse(_, _)
            | IcapScanError::InvalidResponse(_)
            | IcapScanError::InvalidEncapsulatedHeader(_)
            | IcapScanError::InvalidChunkedBody(_)
            | IcapScanError::ServiceNotFound(_, _)
            | IcapScanError::UnexpectedStatus(_, _, _) => IcapErrorKind::Protocol,
        }
    }
}
