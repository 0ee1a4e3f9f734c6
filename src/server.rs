//! Listen on a TCP port or a Unix socket until Ctrl-C.

use crate::config::Listen;
use crate::extractors::forwarded_for;
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use std::net::SocketAddr;
use std::path::Path;
use tokio::net::{TcpListener, UnixListener};
use tower::ServiceExt;

/// Serve `app` on `listen`. TCP mode trusts forwarded-for headers; Unix socket mode
/// creates the socket world-writable (mode 0666), replacing a stale file.
pub async fn serve(app: axum::Router, listen: &Listen) -> std::io::Result<()> {
    let server_info = match listen {
        Listen::Port(port) => format!("Server(Port: {})", port),
        Listen::UnixSocket(path) => format!("Server({})", path.display()),
    };
    tracing::info!("{} start at {}", server_info, chrono::Utc::now());
    match listen {
        Listen::Port(port) => serve_tcp(app, *port).await?,
        Listen::UnixSocket(path) => serve_unix(app, path).await?,
    }
    tracing::info!("{} stop at {}", server_info, chrono::Utc::now());
    Ok(())
}

async fn serve_tcp(app: axum::Router, port: u16) -> std::io::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    let app = app.layer(axum::middleware::from_fn(forwarded_for));
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn serve_unix(app: axum::Router, path: &Path) -> std::io::Result<()> {
    let listener = bind_unix_socket(path)?;
    tracing::info!("listening on {}", path.display());
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    loop {
        let stream = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => stream,
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    continue;
                }
            },
            _ = &mut shutdown => break,
        };
        let app = app.clone();
        tokio::spawn(async move {
            let service = hyper::service::service_fn(move |req: hyper::Request<Incoming>| {
                app.clone().oneshot(req.map(axum::body::Body::new))
            });
            if let Err(e) = Builder::new(TokioExecutor::new())
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                tracing::debug!(error = %e, "connection closed with error");
            }
        });
    }
    if let Err(e) = std::fs::remove_file(path) {
        tracing::debug!(error = %e, "remove socket file");
    }
    Ok(())
}

fn bind_unix_socket(path: &Path) -> std::io::Result<UnixListener> {
    use std::os::unix::fs::{FileTypeExt, PermissionsExt};

    if let Ok(meta) = std::fs::metadata(path) {
        if !meta.file_type().is_socket() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{} exists and is not a socket", path.display()),
            ));
        }
        std::fs::remove_file(path)?;
    }
    let listener = UnixListener::bind(path)?;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o666))?;
    Ok(listener)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unix_socket_is_world_writable_and_replaced() {
        use std::os::unix::fs::PermissionsExt;

        let dir = std::env::temp_dir().join(format!("web-toolset-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("app.sock");

        let first = bind_unix_socket(&path).unwrap();
        drop(first);
        let _second = bind_unix_socket(&path).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o666);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn refuses_to_replace_regular_file() {
        let dir = std::env::temp_dir().join(format!("web-toolset-file-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("not-a-socket");
        std::fs::write(&path, b"x").unwrap();
        let err = bind_unix_socket(&path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
