//! Request server - loopback TCP listener speaking the line protocol.
//!
//! Each accepted connection gets its own task, bounded by a semaphore with
//! `max_connections` permits. Every read and the response write are bounded
//! by `io_timeout`. Faults on one connection are logged and never reach the
//! accept loop.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::ServerSettings;
use crate::filter::PasswordFilter;
use crate::protocol::{ConnectionError, Response, TEST_COMMAND, read_line};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Refusing to listen on non-loopback address {0}")]
    NotLoopback(SocketAddr),
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// How a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exchange {
    Answered(Response),
    /// The first line was not `test`; nothing was sent back.
    Unrecognized,
}

pub struct Server {
    filter: PasswordFilter,
    settings: ServerSettings,
}

impl Server {
    pub fn new(filter: PasswordFilter, settings: ServerSettings) -> Self {
        Self { filter, settings }
    }

    /// Binds the listener with the configured backlog.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The listen address is not a loopback address
    /// - The socket cannot be bound or put into listening state
    pub fn bind(&self) -> Result<TcpListener, ServerError> {
        let addr = self.settings.listen;
        if !addr.ip().is_loopback() {
            return Err(ServerError::NotLoopback(addr));
        }

        let bind = || -> std::io::Result<TcpListener> {
            let socket = if addr.is_ipv4() {
                TcpSocket::new_v4()?
            } else {
                TcpSocket::new_v6()?
            };
            #[cfg(unix)]
            socket.set_reuseaddr(true)?;
            socket.bind(addr)?;
            socket.listen(self.settings.backlog)
        };

        bind().map_err(|source| ServerError::Bind { addr, source })
    }

    /// Binds and serves until `shutdown` is cancelled.
    ///
    /// A bind failure is logged and returned; the accept loop never starts
    /// and nothing retries.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), ServerError> {
        let listener = match self.bind() {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!("Password filter failed to start listening: {}", e);
                return Err(e);
            }
        };

        self.serve(listener, shutdown).await;
        Ok(())
    }

    /// Runs the accept loop on an already bound listener.
    pub async fn serve(self, listener: TcpListener, shutdown: CancellationToken) {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!("Password filter listening on {}", addr);
        }

        let limiter = Arc::new(Semaphore::new(self.settings.max_connections.max(1)));
        let max_line_length =
            line_cap(self.settings.max_line_length, self.filter.policy().max_length);
        let handler = ConnectionHandler {
            filter: self.filter,
            io_timeout: self.settings.io_timeout,
            max_line_length,
        };

        loop {
            let permit = tokio::select! {
                _ = shutdown.cancelled() => break,
                permit = limiter.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let (stream, peer) = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok(conn) => conn,
                    // Transient (e.g. out of descriptors); keep serving
                    Err(e) => {
                        tracing::warn!("Failed to accept connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        continue;
                    }
                },
            };

            let handler = handler.clone();
            let span = tracing::info_span!("connection", %peer);
            tokio::spawn(
                async move {
                    handler.handle(stream).await;
                    drop(permit);
                }
                .instrument(span),
            );
        }

        tracing::info!("Password filter stopped accepting connections");
    }
}

/// Byte cap for protocol lines. Never below what a password of `max_length`
/// characters can take in UTF-8, so the policy still judges every password
/// it could accept.
fn line_cap(configured: usize, max_length: Option<usize>) -> usize {
    max_length
        .map(|max| max.saturating_mul(4))
        .map_or(configured, |needed| needed.max(configured))
}

#[derive(Clone)]
struct ConnectionHandler {
    filter: PasswordFilter,
    io_timeout: Duration,
    max_line_length: usize,
}

impl ConnectionHandler {
    async fn handle(&self, stream: TcpStream) {
        match self.exchange(stream).await {
            Ok(Exchange::Answered(response)) => {
                tracing::debug!("Answered {}", response.as_line().trim_end());
            }
            Ok(Exchange::Unrecognized) => {
                tracing::warn!("Password filter did not receive test command");
            }
            Err(e) => {
                tracing::warn!("Password filter failed to perform test: {}", e);
            }
        }
    }

    /// Runs one request/response exchange. The stream is dropped, closing
    /// the connection, when this returns.
    async fn exchange(&self, mut stream: TcpStream) -> Result<Exchange, ConnectionError> {
        let (reader, mut writer) = stream.split();
        let mut reader = BufReader::new(reader);

        let command = self
            .deadline(read_line(&mut reader, self.max_line_length))
            .await?;
        if command.as_deref() != Some(TEST_COMMAND) {
            return Ok(Exchange::Unrecognized);
        }

        let password = match self
            .deadline(read_line(&mut reader, self.max_line_length))
            .await
        {
            Ok(line) => line.map(|line| SecretString::new(line.into())),
            Err(ConnectionError::LineTooLong(max)) => {
                tracing::warn!("Password line exceeds {} bytes, rejecting", max);
                return self.respond(&mut writer, Response::Reject).await;
            }
            Err(e) => return Err(e),
        };

        let response = Response::from(self.filter.test(password.as_ref()));
        self.respond(&mut writer, response).await
    }

    async fn respond<W>(&self, writer: &mut W, response: Response) -> Result<Exchange, ConnectionError>
    where
        W: AsyncWrite + Unpin,
    {
        self.deadline(async {
            writer.write_all(response.as_line().as_bytes()).await?;
            writer.flush().await?;
            Ok::<(), ConnectionError>(())
        })
        .await?;

        Ok(Exchange::Answered(response))
    }

    async fn deadline<T, F>(&self, fut: F) -> Result<T, ConnectionError>
    where
        F: Future<Output = Result<T, ConnectionError>>,
    {
        tokio::time::timeout(self.io_timeout, fut)
            .await
            .map_err(|_| ConnectionError::Timeout(self.io_timeout))?
    }
}
