//! In-memory links for tests and offline development.
//!
//! A [`MockConnector`] hands out [`MockLink`]s that feed every written frame
//! to a responder closure and queue whatever it returns as replies. The
//! shared [`MockHandle`] records writes and switches the link into silent or
//! failing modes.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use racing_wheel_hid_openffboard_protocol::{BinaryFrame, Operation, Outcome};
use tokio::sync::mpsc;

use super::{Connector, Link, LinkKind};

/// Maps one written frame to the reply frames the device sends back.
pub type Responder = Arc<dyn Fn(&[u8]) -> Vec<Vec<u8>> + Send + Sync>;

#[derive(Default)]
struct MockState {
    writes: Vec<Vec<u8>>,
    silent: bool,
    fail_io: bool,
    connects: usize,
    inbox: Option<mpsc::UnboundedSender<Vec<u8>>>,
}

/// Shared view of a mock device, usable after the link moved into a session.
#[derive(Clone, Default)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.lock().writes.clone()
    }

    /// Writes decoded as text, for text links.
    pub fn written_text(&self) -> Vec<String> {
        self.lock()
            .writes
            .iter()
            .map(|w| String::from_utf8_lossy(w).into_owned())
            .collect()
    }

    pub fn clear_writes(&self) {
        self.lock().writes.clear();
    }

    /// Stop answering. Writes are still recorded.
    pub fn set_silent(&self, silent: bool) {
        self.lock().silent = silent;
    }

    /// Fail every following send and receive with `BrokenPipe`.
    pub fn set_fail_io(&self, fail: bool) {
        self.lock().fail_io = fail;
    }

    pub fn connects(&self) -> usize {
        self.lock().connects
    }

    /// Queue a frame on the open link as if the device sent it unprompted.
    pub fn inject(&self, frame: impl Into<Vec<u8>>) -> bool {
        match &self.lock().inbox {
            Some(inbox) => inbox.send(frame.into()).is_ok(),
            None => false,
        }
    }
}

fn broken_pipe() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "mock link failed")
}

pub struct MockLink {
    handle: MockHandle,
    responder: Responder,
    outbox: mpsc::UnboundedSender<Vec<u8>>,
    inbox: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl MockLink {
    fn failing(&self) -> bool {
        self.handle.lock().fail_io
    }
}

#[async_trait]
impl Link for MockLink {
    async fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        let silent = {
            let mut state = self.handle.lock();
            if state.fail_io {
                return Err(broken_pipe());
            }
            state.writes.push(frame.to_vec());
            state.silent
        };
        if !silent {
            for reply in (self.responder)(frame) {
                self.outbox
                    .send(reply)
                    .map_err(|err| io::Error::new(io::ErrorKind::BrokenPipe, err))?;
            }
        }
        Ok(())
    }

    async fn receive(&mut self) -> io::Result<Vec<u8>> {
        if self.failing() {
            return Err(broken_pipe());
        }
        self.inbox.recv().await.ok_or_else(broken_pipe)
    }

    async fn discard_input(&mut self) -> io::Result<()> {
        if self.failing() {
            return Err(broken_pipe());
        }
        while self.inbox.try_recv().is_ok() {}
        Ok(())
    }

    async fn close(&mut self) -> io::Result<()> {
        self.handle.lock().inbox = None;
        self.inbox.close();
        Ok(())
    }
}

/// Opens [`MockLink`]s that all share one [`MockHandle`].
#[derive(Clone)]
pub struct MockConnector {
    kind: LinkKind,
    responder: Responder,
    handle: MockHandle,
}

impl MockConnector {
    pub fn new<F>(kind: LinkKind, responder: F) -> Self
    where
        F: Fn(&[u8]) -> Vec<Vec<u8>> + Send + Sync + 'static,
    {
        Self {
            kind,
            responder: Arc::new(responder),
            handle: MockHandle::default(),
        }
    }

    /// A text link whose device never answers.
    pub fn silent_text() -> Self {
        Self::new(LinkKind::Text, |_| Vec::new())
    }

    /// A text device that stores written values and reads them back.
    ///
    /// `sys.debug?` answers from the same store, so tests enable debug mode
    /// by writing `sys.debug=1` or through [`MemoryDevice::set`].
    pub fn text_device(memory: MemoryDevice) -> Self {
        Self::new(LinkKind::Text, move |frame| {
            vec![memory.answer_text(&String::from_utf8_lossy(frame)).into_bytes()]
        })
    }

    /// A binary device backed by the same kind of store as
    /// [`MockConnector::text_device`].
    pub fn binary_device(memory: MemoryDevice) -> Self {
        Self::new(LinkKind::Binary, move |frame| {
            memory.answer_binary(frame).into_iter().collect()
        })
    }

    pub fn handle(&self) -> MockHandle {
        self.handle.clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    fn kind(&self) -> LinkKind {
        self.kind
    }

    fn endpoint(&self) -> String {
        "mock".to_string()
    }

    async fn connect(&self) -> io::Result<Box<dyn Link>> {
        let (outbox, inbox) = mpsc::unbounded_channel();
        {
            let mut state = self.handle.lock();
            if state.fail_io {
                return Err(broken_pipe());
            }
            state.connects += 1;
            state.inbox = Some(outbox.clone());
        }
        Ok(Box::new(MockLink {
            handle: self.handle.clone(),
            responder: Arc::clone(&self.responder),
            outbox,
            inbox,
        }))
    }
}

/// Parameter store behind the echo devices.
///
/// Text keys are the command path with the address appended after `@`
/// (`tmc.reg@3`); binary keys are `(class, instance, command, address)`.
#[derive(Clone, Default)]
pub struct MemoryDevice {
    text: Arc<Mutex<HashMap<String, String>>>,
    binary: Arc<Mutex<HashMap<(u16, u8, u32, u64), u64>>>,
    outcomes: Arc<Mutex<HashMap<(u16, u8, u32), Outcome>>>,
}

impl MemoryDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a text value, e.g. `set("sys.debug", "1")`.
    pub fn set(&self, path: &str, value: &str) {
        self.text
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.to_string(), value.to_string());
    }

    /// Seed a binary value.
    pub fn set_raw(&self, class_id: u16, instance: u8, command_id: u32, value: u64) {
        self.binary
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((class_id, instance, command_id, 0), value);
    }

    /// Answer every binary command for `(class, instance, command)` with
    /// `outcome` instead of an acknowledgement, e.g. `Outcome::Error`.
    pub fn set_outcome(&self, class_id: u16, instance: u8, command_id: u32, outcome: Outcome) {
        self.outcomes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((class_id, instance, command_id), outcome);
    }

    fn answer_text(&self, command: &str) -> String {
        let mut store = self.text.lock().unwrap_or_else(|e| e.into_inner());
        if command.ends_with('!') {
            return format!("[{command}|{} parameter]", command.trim_end_matches('!'));
        }
        if let Some((path, rest)) = command.split_once('=') {
            let (value, key) = match rest.split_once('?') {
                Some((value, addr)) => (value, format!("{path}@{addr}")),
                None => (rest, path.to_string()),
            };
            store.insert(key, value.to_string());
            return format!("[{command}|OK]");
        }
        let key = match command.split_once('?') {
            Some((path, "")) => path.to_string(),
            Some((path, addr)) => format!("{path}@{addr}"),
            None => return format!("[{command}|NOT_FOUND]"),
        };
        let value = store.get(&key).cloned().unwrap_or_else(|| "0".to_string());
        match key.split_once('@') {
            Some((_, addr)) => format!("[{command}|{value}:{addr}]"),
            None => format!("[{command}|{value}]"),
        }
    }

    fn answer_binary(&self, frame: &[u8]) -> Option<Vec<u8>> {
        let request = BinaryFrame::parse(frame).ok()?;
        let operation = Operation::from_tag(request.tag)?;
        let forced = self
            .outcomes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(request.class_id, request.instance, request.command_id))
            .copied();
        if let Some(outcome) = forced {
            let reply = BinaryFrame {
                tag: outcome.tag(),
                payload: 0,
                ..request
            };
            return Some(reply.to_bytes().to_vec());
        }
        let key = (
            request.class_id,
            request.instance,
            request.command_id,
            request.address,
        );
        let mut store = self.binary.lock().unwrap_or_else(|e| e.into_inner());
        let payload = match operation {
            Operation::Write | Operation::WriteAddressed => {
                store.insert(key, request.payload);
                request.payload
            }
            Operation::Read | Operation::ReadAddressed => store.get(&key).copied().unwrap_or(0),
            Operation::Info => 0,
        };
        let reply = BinaryFrame {
            tag: Outcome::ACKNOWLEDGMENT_TAG,
            payload,
            ..request
        };
        Some(reply.to_bytes().to_vec())
    }
}
