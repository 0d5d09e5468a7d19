//! HID link for the binary protocol.
//!
//! `hidapi` calls block, so every call runs on tokio's blocking pool. Reads
//! use a short poll timeout and loop on the async side: when a pending
//! receive is dropped, the blocking read still in flight ends within one poll
//! interval and whatever it returned is discarded with it.

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use hidapi::{HidApi, HidDevice};
use racing_wheel_hid_openffboard_protocol::{FRAME_LEN, is_openffboard_device};

use super::{Connector, Link, LinkKind};

/// Largest report the board sends on the command interface.
const REPORT_BUFFER: usize = 64;

pub struct HidLink {
    device: SharedDevice<HidDevice>,
    poll: Duration,
}

fn hid_error(err: hidapi::HidError) -> io::Error {
    io::Error::other(err.to_string())
}

fn poll_ms(poll: Duration) -> i32 {
    i32::try_from(poll.as_millis()).unwrap_or(i32::MAX)
}

/// A blocking device handle shared with the blocking pool until released.
///
/// Calls clone the `Arc` into `spawn_blocking`, so a read abandoned by a
/// timeout keeps the handle alive only until its poll ends.
struct SharedDevice<T> {
    inner: Option<Arc<Mutex<T>>>,
}

impl<T: Send + 'static> SharedDevice<T> {
    fn new(device: T) -> Self {
        Self {
            inner: Some(Arc::new(Mutex::new(device))),
        }
    }

    async fn run<R, F>(&self, f: F) -> io::Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&T) -> io::Result<R> + Send + 'static,
    {
        let device = self.inner.clone().ok_or_else(released)?;
        tokio::task::spawn_blocking(move || -> io::Result<R> {
            let guard = device
                .lock()
                .map_err(|err| io::Error::other(err.to_string()))?;
            f(&*guard)
        })
        .await
        .map_err(io::Error::other)?
    }

    /// Drop the handle once any in-flight call has finished with it.
    async fn release(&mut self) -> io::Result<()> {
        let Some(device) = self.inner.take() else {
            return Ok(());
        };
        tokio::task::spawn_blocking(move || -> io::Result<()> {
            drop(device.lock().map_err(|err| io::Error::other(err.to_string()))?);
            drop(device);
            Ok(())
        })
        .await
        .map_err(io::Error::other)?
    }
}

fn released() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "HID device already closed")
}

impl HidLink {
    pub fn new(device: HidDevice, poll: Duration) -> Self {
        Self {
            device: SharedDevice::new(device),
            poll,
        }
    }

    async fn blocking<T, F>(&self, f: F) -> io::Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&HidDevice) -> io::Result<T> + Send + 'static,
    {
        self.device.run(f).await
    }
}

#[async_trait]
impl Link for HidLink {
    async fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        let report = frame.to_vec();
        let written = self
            .blocking(move |device| device.write(&report).map_err(hid_error))
            .await?;
        if written < FRAME_LEN {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short HID write: {written} of {FRAME_LEN} bytes"),
            ));
        }
        Ok(())
    }

    async fn receive(&mut self) -> io::Result<Vec<u8>> {
        let timeout = poll_ms(self.poll);
        loop {
            let report = self
                .blocking(move |device| {
                    let mut buf = [0u8; REPORT_BUFFER];
                    let n = device.read_timeout(&mut buf, timeout).map_err(hid_error)?;
                    Ok(buf.get(..n).unwrap_or_default().to_vec())
                })
                .await?;
            if !report.is_empty() {
                return Ok(report);
            }
        }
    }

    async fn discard_input(&mut self) -> io::Result<()> {
        let dropped = self
            .blocking(|device| {
                let mut buf = [0u8; REPORT_BUFFER];
                let mut dropped = 0usize;
                while device.read_timeout(&mut buf, 0).map_err(hid_error)? > 0 {
                    dropped += 1;
                }
                Ok(dropped)
            })
            .await?;
        if dropped > 0 {
            tracing::debug!(reports = dropped, "discarded stale HID reports");
        }
        Ok(())
    }

    async fn close(&mut self) -> io::Result<()> {
        self.device.release().await
    }
}

/// Opens the board's vendor HID interface by vendor/product id and optional
/// serial number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HidConnector {
    pub vendor_id: u16,
    pub product_id: u16,
    pub serial: Option<String>,
    pub poll: Duration,
}

impl HidConnector {
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
            serial: None,
            poll: Duration::from_millis(20),
        }
    }

    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = Some(serial.into());
        self
    }

    pub fn with_poll(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }
}

#[async_trait]
impl Connector for HidConnector {
    fn kind(&self) -> LinkKind {
        LinkKind::Binary
    }

    fn endpoint(&self) -> String {
        match &self.serial {
            Some(serial) => format!("{:04x}:{:04x}:{serial}", self.vendor_id, self.product_id),
            None => format!("{:04x}:{:04x}", self.vendor_id, self.product_id),
        }
    }

    async fn connect(&self) -> io::Result<Box<dyn Link>> {
        if !is_openffboard_device(self.vendor_id, self.product_id) {
            tracing::warn!(
                endpoint = %self.endpoint(),
                "vendor/product id is not a known OpenFFBoard build"
            );
        }
        let (vid, pid, serial) = (self.vendor_id, self.product_id, self.serial.clone());
        let device = tokio::task::spawn_blocking(move || -> io::Result<HidDevice> {
            let api = HidApi::new().map_err(hid_error)?;
            let device = match serial {
                Some(serial) => api.open_serial(vid, pid, &serial),
                None => api.open(vid, pid),
            };
            device.map_err(hid_error)
        })
        .await
        .map_err(io::Error::other)??;
        Ok(Box::new(HidLink::new(device, self.poll)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_interval_saturates() {
        assert_eq!(poll_ms(Duration::from_millis(20)), 20);
        assert_eq!(poll_ms(Duration::from_secs(u64::MAX / 1000)), i32::MAX);
    }

    struct Tracked(Arc<std::sync::atomic::AtomicBool>);

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.0.store(true, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn release_drops_the_handle() -> Result<(), Box<dyn std::error::Error>> {
        let dropped = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let mut shared = SharedDevice::new(Tracked(Arc::clone(&dropped)));
        shared.run(|_| Ok(())).await?;
        assert!(!dropped.load(std::sync::atomic::Ordering::SeqCst));

        shared.release().await?;
        assert!(dropped.load(std::sync::atomic::Ordering::SeqCst));

        let err = shared.run(|_| Ok(())).await.err().ok_or("closed handle ran")?;
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
        shared.release().await?;
        Ok(())
    }

    #[test]
    fn endpoint_names_device() {
        let connector = HidConnector::new(0x1209, 0xFFB0);
        assert_eq!(connector.endpoint(), "1209:ffb0");
        assert_eq!(connector.with_serial("A1B2").endpoint(), "1209:ffb0:A1B2");
    }
}
