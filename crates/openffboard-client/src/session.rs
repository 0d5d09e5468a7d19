//! Transport session: one physical channel, one exchange at a time.
//!
//! Every exchange takes the session's gate, a fair async mutex, before
//! touching the link, so concurrent callers queue in arrival order and their
//! bytes never interleave. Inside the gate an exchange drains stale input,
//! writes the encoded command and races reading the matching reply against
//! the configured timeout. A timed-out read is dropped, not left running,
//! and the link is drained again so its reply cannot answer a later command.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use racing_wheel_hid_openffboard_protocol::{Decoded, Request, Response, WireCodec};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::{TransportError, TransportResult};
use crate::link::{Connector, Link};

/// Reply bound for the text link.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Longest wait for a matching reply after a command is written.
    pub timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Result of a precondition-gated exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gated {
    /// The precheck passed and the command was exchanged.
    Proceeded(Response),
    /// The precheck failed; only the precheck was sent.
    Refused(Response),
}

type Slot = Option<Box<dyn Link>>;

pub struct TransportSession {
    connector: Box<dyn Connector>,
    codec: Box<dyn WireCodec>,
    link: Mutex<Slot>,
    connected: AtomicBool,
    config: SessionConfig,
}

impl TransportSession {
    pub fn new(connector: impl Connector + 'static, config: SessionConfig) -> Self {
        Self::from_boxed(Box::new(connector), config)
    }

    pub fn from_boxed(connector: Box<dyn Connector>, config: SessionConfig) -> Self {
        let codec = connector.kind().codec();
        Self {
            connector,
            codec,
            link: Mutex::new(None),
            connected: AtomicBool::new(false),
            config,
        }
    }

    pub fn codec(&self) -> &dyn WireCodec {
        self.codec.as_ref()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Last known connection state. Cleared by `disconnect` and by any IO
    /// failure.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Open the physical handle. A no-op when already connected.
    pub async fn connect(&self) -> TransportResult<()> {
        let mut slot = self.link.lock().await;
        if slot.is_some() {
            return Ok(());
        }
        let endpoint = self.connector.endpoint();
        let link = self.connector.connect().await.map_err(|err| {
            error!(endpoint = %endpoint, error = %err, "failed to open link");
            TransportError::TransportFailure(err)
        })?;
        *slot = Some(link);
        self.connected.store(true, Ordering::Release);
        info!(endpoint = %endpoint, link = self.codec.link_name(), "session connected");
        Ok(())
    }

    /// Close the physical handle. Waits for the exchange in progress, if any.
    pub async fn disconnect(&self) -> TransportResult<()> {
        let mut slot = self.link.lock().await;
        self.connected.store(false, Ordering::Release);
        if let Some(mut link) = slot.take() {
            link.close().await?;
            info!(endpoint = %self.connector.endpoint(), "session disconnected");
        }
        Ok(())
    }

    /// Send `request` and wait for the reply that answers it.
    pub async fn exchange(&self, request: &Request<'_>) -> TransportResult<Response> {
        let mut slot = self.link.lock().await;
        self.exchange_locked(&mut slot, request).await
    }

    /// Exchange `precheck`, then `request` only if `allow` accepts the precheck's
    /// reply. The gate is held across both, so nothing else reaches the link
    /// in between.
    pub async fn exchange_gated<F>(
        &self,
        precheck: &Request<'_>,
        allow: F,
        request: &Request<'_>,
    ) -> TransportResult<Gated>
    where
        F: FnOnce(&Response) -> bool + Send,
    {
        let mut slot = self.link.lock().await;
        let reply = self.exchange_locked(&mut slot, precheck).await?;
        if !allow(&reply) {
            debug!(
                param = request.descriptor.name,
                precheck = precheck.descriptor.name,
                "precondition refused, command not sent"
            );
            return Ok(Gated::Refused(reply));
        }
        self.exchange_locked(&mut slot, request)
            .await
            .map(Gated::Proceeded)
    }

    /// Send a raw text command and return the first reply frame as text.
    /// Text links only.
    pub async fn send_raw(&self, command: &str) -> TransportResult<String> {
        if !self.codec.carries_text() {
            return Err(TransportError::NotTextLink {
                link: self.codec.link_name(),
            });
        }
        let mut slot = self.link.lock().await;
        let Some(link) = slot.as_mut() else {
            return Err(TransportError::NotConnected);
        };
        let result = self.raw_round_trip(&mut **link, command).await;
        self.settle(&mut slot, result)
    }

    async fn exchange_locked(
        &self,
        slot: &mut Slot,
        request: &Request<'_>,
    ) -> TransportResult<Response> {
        let Some(link) = slot.as_mut() else {
            return Err(TransportError::NotConnected);
        };
        let frame = self.codec.encode(request)?;
        debug!(
            class = request.class.prefix,
            param = request.descriptor.name,
            operation = ?request.operation,
            "exchange"
        );
        let result = self.round_trip(&mut **link, request, &frame).await;
        self.settle(slot, result)
    }

    async fn round_trip(
        &self,
        link: &mut dyn Link,
        request: &Request<'_>,
        frame: &[u8],
    ) -> TransportResult<Response> {
        link.discard_input().await?;
        let started = tokio::time::Instant::now();
        link.send(frame).await?;

        let bound = self.config.timeout;
        let codec = self.codec.as_ref();
        let matched = tokio::time::timeout(bound, async {
            loop {
                let reply = link.receive().await?;
                match codec.decode(request, &reply) {
                    Decoded::Matched(response) => return Ok::<_, std::io::Error>(response),
                    Decoded::Unmatched => warn!(
                        param = request.descriptor.name,
                        bytes = reply.len(),
                        "discarding reply that does not answer the pending command"
                    ),
                }
            }
        })
        .await;

        match matched {
            Ok(response) => {
                let response = response?;
                debug!(
                    param = request.descriptor.name,
                    outcome = ?response.outcome,
                    elapsed_us = started.elapsed().as_micros() as u64,
                    "reply matched"
                );
                Ok(response)
            }
            Err(_) => {
                link.discard_input().await?;
                warn!(
                    param = request.descriptor.name,
                    timeout_ms = bound.as_millis() as u64,
                    "no reply before timeout"
                );
                Err(TransportError::Timeout { after: bound })
            }
        }
    }

    async fn raw_round_trip(&self, link: &mut dyn Link, command: &str) -> TransportResult<String> {
        link.discard_input().await?;
        link.send(command.as_bytes()).await?;

        let bound = self.config.timeout;
        match tokio::time::timeout(bound, link.receive()).await {
            Ok(frame) => Ok(String::from_utf8_lossy(&frame?).into_owned()),
            Err(_) => {
                link.discard_input().await?;
                Err(TransportError::Timeout { after: bound })
            }
        }
    }

    /// Drop the link after an IO failure so the session reports disconnected.
    fn settle<T>(&self, slot: &mut Slot, result: TransportResult<T>) -> TransportResult<T> {
        if let Err(TransportError::TransportFailure(err)) = &result {
            self.connected.store(false, Ordering::Release);
            *slot = None;
            error!(
                endpoint = %self.connector.endpoint(),
                error = %err,
                "link failed, session disconnected"
            );
        }
        result
    }
}

impl std::fmt::Debug for TransportSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportSession")
            .field("endpoint", &self.connector.endpoint())
            .field("link", &self.codec.link_name())
            .field("connected", &self.is_connected())
            .field("config", &self.config)
            .finish()
    }
}
