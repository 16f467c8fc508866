/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IcapErrorReason {
    UnknownResponseForPreview,
    UnknownResponseAfterContinue,
    ContinueAfterPreviewEof,
    UnrecognizedFinalStatus,
    ServiceNotFound,
    NoBodyTerminatorFound,
}

impl IcapErrorReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            IcapErrorReason::UnknownResponseForPreview => "unknown ICAP response code for preview",
            IcapErrorReason::UnknownResponseAfterContinue => {
                "unknown ICAP response code after 100-continue"
            }
            IcapErrorReason::ContinueAfterPreviewEof => {
                "invalid 100-continue response as preview is eof"
            }
            IcapErrorReason::UnrecognizedFinalStatus => "unrecognized final ICAP response code",
            IcapErrorReason::ServiceNotFound => "ICAP service not found",
            IcapErrorReason::NoBodyTerminatorFound => "no encapsulated body terminator found",
        }
    }
}

impl fmt::Display for IcapErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
