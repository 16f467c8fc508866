/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;

use crate::parse::ResponseHeaders;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanClassification {
    Infected,
    Clean,
    Continue,
    Unknown,
}

/// Vendor specific interpretation of ICAP scan responses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ScanEngine {
    #[default]
    Generic,
    ClamAv,
    Symantec,
    TrendMicro,
}

impl ScanEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanEngine::Generic => "generic",
            ScanEngine::ClamAv => "clamav",
            ScanEngine::Symantec => "symantec",
            ScanEngine::TrendMicro => "trendmicro",
        }
    }

    pub fn is_virus(&self, status: u16, headers: &ResponseHeaders) -> bool {
        match self {
            ScanEngine::Generic => status == 403 || headers.contains("X-Infection-Found"),
            ScanEngine::ClamAv => {
                status == 201
                    || headers.contains("X-Infection-Found")
                    || headers.get("X-Clam-Virus") == Some("yes")
            }
            ScanEngine::Symantec => status == 201,
            ScanEngine::TrendMicro => status == 200,
        }
    }

    pub fn is_ok(&self, status: u16) -> bool {
        match self {
            ScanEngine::Generic => matches!(status, 200 | 204),
            ScanEngine::ClamAv => status == 200,
            ScanEngine::Symantec | ScanEngine::TrendMicro => status == 204,
        }
    }

    pub fn classify(&self, headers: &ResponseHeaders) -> ScanClassification {
        let status = headers.status_code();
        if status == 100 {
            ScanClassification::Continue
        } else if self.is_virus(status, headers) {
            ScanClassification::Infected
        } else if self.is_ok(status) {
            ScanClassification::Clean
        } else {
            ScanClassification::Unknown
        }
    }

    /// Get the vendor message for an infected response.
    ///
    /// `http_body` is the decoded body of the encapsulated HTTP response, if any.
    pub fn extract_diagnostic(
        &self,
        headers: &ResponseHeaders,
        http_body: Option<&str>,
    ) -> Option<String> {
        match self {
            ScanEngine::Symantec => http_body
                .and_then(title_tail)
                .or_else(|| headers.get("X-Violations-Found"))
                .map(|s| s.to_string()),
            _ => headers.get("X-Virus-ID").map(|s| s.to_string()),
        }
    }
}

fn title_tail(body: &str) -> Option<&str> {
    const TITLE_END: &str = "</title>";

    let start = body.find(TITLE_END)? + TITLE_END.len();
    let left = &body[start..];
    match left.find("</html>") {
        Some(end) => Some(&left[..end]),
        None => Some(left),
    }
}

impl fmt::Display for ScanEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanEngine {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "generic" | "default" | "icap" => Ok(ScanEngine::Generic),
            "clamav" | "clam" => Ok(ScanEngine::ClamAv),
            "symantec" => Ok(ScanEngine::Symantec),
            "trendmicro" | "trend_micro" => Ok(ScanEngine::TrendMicro),
            _ => Err(anyhow!("unknown scan engine {s}")),
        }
    }
}
