/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io::SeekFrom;
use std::path::Path;

use anyhow::Context;
use log::{error, info, warn};
use tokio::fs::File;
use tokio::io::AsyncSeekExt;

use g3_icap_scan::{IcapErrorKind, IcapScanError, IcapSessionPool, ScanVerdict};

use crate::{EXIT_CLEAN, EXIT_ERROR, EXIT_INFECTED, ProcArgs};

fn display_verdict(path: &Path, verdict: &ScanVerdict) -> String {
    if verdict.is_clean() {
        format!("{}: clean", path.display())
    } else {
        match verdict.diagnostic() {
            Some(msg) => format!("{}: infected {}", path.display(), msg.trim()),
            None => format!("{}: infected", path.display()),
        }
    }
}

/// Errors of the ICAP connection itself are worth a retry on a new session.
fn retryable(e: &IcapScanError) -> bool {
    e.kind() == IcapErrorKind::Transport
}

async fn scan_once(
    pool: &IcapSessionPool,
    args: &ProcArgs,
    name: &str,
    file: &mut File,
    len: u64,
) -> Result<ScanVerdict, IcapScanError> {
    match &args.trust_istag {
        Some(istag) => {
            pool.scan_with_istag(&args.service, name, file, len, istag)
                .await
        }
        None => pool.scan(&args.service, name, file, len).await,
    }
}

async fn scan_file(
    pool: &IcapSessionPool,
    args: &ProcArgs,
    path: &Path,
) -> anyhow::Result<ScanVerdict> {
    let mut file = File::open(path)
        .await
        .context(format!("failed to open file {}", path.display()))?;
    let len = file
        .metadata()
        .await
        .context(format!("failed to get metadata of file {}", path.display()))?
        .len();
    let name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    match scan_once(pool, args, &name, &mut file, len).await {
        Ok(verdict) => Ok(verdict),
        Err(e) if retryable(&e) => {
            warn!(
                "scan of {} failed: {e}, retry with a new connection",
                path.display()
            );
            file.seek(SeekFrom::Start(0))
                .await
                .context(format!("failed to rewind file {}", path.display()))?;
            let verdict = scan_once(pool, args, &name, &mut file, len).await?;
            Ok(verdict)
        }
        Err(e) => Err(e.into()),
    }
}

/// Scan all files and get the process exit code.
pub async fn run(args: &ProcArgs) -> u8 {
    let pool = IcapSessionPool::new();
    let mut code = EXIT_CLEAN;

    for path in &args.files {
        match scan_file(&pool, args, path).await {
            Ok(verdict) => {
                println!("{}", display_verdict(path, &verdict));
                if verdict.is_cached() {
                    info!("{}: scan skipped as ISTag is unchanged", path.display());
                }
                for (name, value) in verdict.vendor_headers() {
                    info!("{}: {name}: {value}", path.display());
                }
                if !verdict.is_clean() && code == EXIT_CLEAN {
                    code = EXIT_INFECTED;
                }
            }
            Err(e) => {
                error!("failed to scan {}: {e:?}", path.display());
                println!("{}: error {e}", path.display());
                code = EXIT_ERROR;
            }
        }
    }

    code
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use g3_icap_scan::{IcapConnectionKey, IcapServiceConfig};

    /// Answer every RESPMOD on one connection, infected if the request
    /// contains `EICAR`. The preview size is fixed so there is no OPTIONS.
    async fn start_server() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let Ok(nr) = stream.read(&mut buf).await else {
                    break;
                };
                if nr == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..nr]);
                if !request.ends_with(b"0; ieof\r\n\r\n") {
                    continue;
                }
                let infected = request.windows(5).any(|w| w == b"EICAR");
                request.clear();
                let rsp: &[u8] = if infected {
                    b"ICAP/1.0 403 Forbidden\r\nX-Virus-ID: Eicar-Test-Signature\r\n\r\n"
                } else {
                    b"ICAP/1.0 204 No Content\r\n\r\n"
                };
                if stream.write_all(rsp).await.is_err() {
                    break;
                }
            }
        });
        port
    }

    fn temp_file(name: &str, content: &[u8]) -> PathBuf {
        let path =
            std::env::temp_dir().join(format!("g3avscan-{}-{name}", std::process::id()));
        std::fs::write(&path, content).unwrap();
        path
    }

    fn proc_args(port: u16, files: Vec<PathBuf>) -> ProcArgs {
        let key = IcapConnectionKey::new("127.0.0.1", port, "avscan");
        let mut config = IcapServiceConfig::new(key);
        config.set_preview_size(4096);
        ProcArgs {
            verbose_level: 0,
            service: Arc::new(config),
            trust_istag: None,
            files,
        }
    }

    #[test]
    fn retry_on_connection_error() {
        assert!(retryable(&IcapScanError::IcapServerConnectionClosed));
        assert!(retryable(&IcapScanError::IcapServerReadTimeout));
        assert!(!retryable(&IcapScanError::SourceReadFailed(
            std::io::Error::other("disk error")
        )));
        assert!(!retryable(&IcapScanError::TooLargeHeader(8192)));
    }

    #[tokio::test]
    async fn exit_code() {
        let clean = temp_file("clean.txt", b"hello world");
        let infected = temp_file("eicar.txt", b"X5O!P%@AP[4\\PZX54(P^)7CC)7}$EICAR-STANDARD");
        let missing = std::env::temp_dir().join("g3avscan-missing-file");

        let port = start_server().await;
        let args = proc_args(port, vec![clean.clone()]);
        assert_eq!(run(&args).await, EXIT_CLEAN);

        let port = start_server().await;
        let args = proc_args(port, vec![clean.clone(), infected.clone()]);
        assert_eq!(run(&args).await, EXIT_INFECTED);

        let port = start_server().await;
        let args = proc_args(port, vec![infected.clone(), missing]);
        assert_eq!(run(&args).await, EXIT_ERROR);

        let _ = std::fs::remove_file(clean);
        let _ = std::fs::remove_file(infected);
    }
}
