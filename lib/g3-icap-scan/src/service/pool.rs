/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;
use std::time::Duration;

use ahash::AHashMap;
use log::debug;
use tokio::io::AsyncRead;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{IcapConnectionKey, IcapServiceConfig, IcapSession};
use crate::{IcapScanError, ScanVerdict};

type SessionSlot = Arc<Mutex<Option<IcapSession>>>;

/// Keyed cache of ICAP sessions, at most one session per connection key.
///
/// A session is handed out to one holder at a time, other callers for the
/// same key wait until it is returned.
#[derive(Default)]
pub struct IcapSessionPool {
    slots: Mutex<AHashMap<IcapConnectionKey, SessionSlot>>,
}

impl IcapSessionPool {
    pub fn new() -> Self {
        IcapSessionPool::default()
    }

    async fn slot(&self, key: &IcapConnectionKey) -> Option<SessionSlot> {
        let slots = self.slots.lock().await;
        slots.get(key).cloned()
    }

    /// Get the session for the key of `config`, connecting a new one if there
    /// is none yet or the cached one is no longer usable.
    pub async fn acquire(
        &self,
        config: &Arc<IcapServiceConfig>,
    ) -> Result<IcapSessionGuard, IcapScanError> {
        let slot = {
            let mut slots = self.slots.lock().await;
            slots.entry(config.key().clone()).or_default().clone()
        };
        let mut slot = slot.lock_owned().await;

        let reuse = match slot.as_mut() {
            Some(session) => {
                if !session.is_reusable() {
                    false
                } else if config
                    .max_idle_time
                    .is_some_and(|max| session.idle_time() > max)
                {
                    debug!("ICAP session to {} idle for too long", config.key());
                    false
                } else if session.is_peer_closed() {
                    debug!("ICAP session to {} closed by peer", config.key());
                    false
                } else {
                    true
                }
            }
            None => false,
        };
        if !reuse {
            *slot = None;
            *slot = Some(IcapSession::connect(config.clone()).await?);
        }
        if let Some(session) = slot.as_mut() {
            session.set_engine(config.engine);
        }

        Ok(IcapSessionGuard { slot })
    }

    /// Scan through the session for `config`, the session is dropped on error.
    pub async fn scan<R>(
        &self,
        config: &Arc<IcapServiceConfig>,
        name: &str,
        source: &mut R,
        len: u64,
    ) -> Result<ScanVerdict, IcapScanError>
    where
        R: AsyncRead + Unpin,
    {
        let mut guard = self.acquire(config).await?;
        guard.scan(name, source, len).await
    }

    pub async fn scan_with_istag<R>(
        &self,
        config: &Arc<IcapServiceConfig>,
        name: &str,
        source: &mut R,
        len: u64,
        istag: &str,
    ) -> Result<ScanVerdict, IcapScanError>
    where
        R: AsyncRead + Unpin,
    {
        let mut guard = self.acquire(config).await?;
        guard.scan_with_istag(name, source, len, istag).await
    }

    /// Close the session for `key`, waiting for the current holder to finish.
    ///
    /// The slot is removed as well unless other callers are waiting on it.
    pub async fn invalidate(&self, key: &IcapConnectionKey) {
        let Some(slot) = self.slot(key).await else {
            return;
        };
        let mut session = slot.lock().await;
        if session.take().is_some() {
            debug!("ICAP session to {key} invalidated");
        }

        let mut slots = self.slots.lock().await;
        // one reference in the map and one held here
        if Arc::strong_count(&slot) == 2 && slots.get(key).is_some_and(|s| Arc::ptr_eq(s, &slot)) {
            slots.remove(key);
        }
    }

    /// Idle time of the session for `key`, zero if it is in use.
    pub async fn idle_time(&self, key: &IcapConnectionKey) -> Option<Duration> {
        let slot = self.slot(key).await?;
        match slot.try_lock() {
            Ok(session) => session.as_ref().map(|s| s.idle_time()),
            Err(_) => Some(Duration::ZERO),
        }
    }
}

/// Exclusive access to a pooled session.
///
/// A session that is not reusable on drop is closed and removed.
pub struct IcapSessionGuard {
    slot: OwnedMutexGuard<Option<IcapSession>>,
}

impl IcapSessionGuard {
    fn session(&mut self) -> Result<&mut IcapSession, IcapScanError> {
        self.slot
            .as_mut()
            .ok_or(IcapScanError::SessionUnusable(super::IcapSessionState::Closed))
    }

    pub async fn scan<R>(
        &mut self,
        name: &str,
        source: &mut R,
        len: u64,
    ) -> Result<ScanVerdict, IcapScanError>
    where
        R: AsyncRead + Unpin,
    {
        self.session()?.scan(name, source, len).await
    }

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
        self.session()?
            .scan_with_istag(name, source, len, istag)
            .await
    }

    pub async fn get_istag(&mut self) -> Result<Option<String>, IcapScanError> {
        let istag = self.session()?.get_istag().await?;
        Ok(istag.map(|s| s.to_string()))
    }

    pub fn idle_time(&self) -> Option<Duration> {
        self.slot.as_ref().map(|s| s.idle_time())
    }
}

impl Drop for IcapSessionGuard {
    fn drop(&mut self) {
        if self.slot.as_ref().is_some_and(|s| !s.is_reusable()) {
            debug!("drop unusable ICAP session");
            *self.slot = None;
        }
    }
}
