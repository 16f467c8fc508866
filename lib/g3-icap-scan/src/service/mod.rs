/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

mod key;
pub use key::{DEFAULT_ICAP_PORT, IcapConnectionKey};

mod config;
pub use config::IcapServiceConfig;

mod connection;
pub(crate) use connection::IcapClientConnection;
use connection::IcapConnector;

mod session;
pub use session::{IcapSession, IcapSessionState};

mod pool;
pub use pool::{IcapSessionGuard, IcapSessionPool};
