//! In-memory transport for session tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::application::ports::{Dialer, FrameReader, FrameWriter, TransportError};

/// Feeds frames to a [`ScriptedReader`] and observes its writer.
#[derive(Clone)]
pub struct Script {
    frames: mpsc::UnboundedSender<Result<String, TransportError>>,
    pub pings: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
    pub fail_pings: Arc<AtomicBool>,
}

impl Script {
    pub fn push(&self, frame: impl Into<String>) {
        let _ = self.frames.send(Ok(frame.into()));
    }

    pub fn fail(&self, error: TransportError) {
        let _ = self.frames.send(Err(error));
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }
}

/// Read half yielding pushed frames; pends while none are queued and reports
/// `Closed` once every [`Script`] is dropped.
pub struct ScriptedReader {
    frames: mpsc::UnboundedReceiver<Result<String, TransportError>>,
}

#[async_trait]
impl FrameReader for ScriptedReader {
    async fn read_frame(&mut self) -> Result<String, TransportError> {
        self.frames.recv().await.unwrap_or(Err(TransportError::Closed))
    }
}

pub struct ScriptedWriter {
    pings: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
    fail_pings: Arc<AtomicBool>,
}

#[async_trait]
impl FrameWriter for ScriptedWriter {
    async fn send_ping(&mut self) -> Result<(), TransportError> {
        if self.fail_pings.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.pings.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn scripted() -> (Script, ScriptedReader, ScriptedWriter) {
    let (tx, rx) = mpsc::unbounded_channel();
    let script = Script {
        frames: tx,
        pings: Arc::default(),
        closes: Arc::default(),
        fail_pings: Arc::default(),
    };
    let writer = ScriptedWriter {
        pings: script.pings.clone(),
        closes: script.closes.clone(),
        fail_pings: script.fail_pings.clone(),
    };
    (script, ScriptedReader { frames: rx }, writer)
}

/// Dialer handing out pre-built scripted connections in order.
#[derive(Default)]
pub struct ScriptedDialer {
    connections: Mutex<Vec<(ScriptedReader, ScriptedWriter)>>,
    pub dialed: Mutex<Vec<String>>,
    pub failures_before_success: AtomicUsize,
}

impl ScriptedDialer {
    pub fn with_connection() -> (Self, Script) {
        let (script, reader, writer) = scripted();
        let dialer = Self::default();
        dialer.connections.lock().push((reader, writer));
        (dialer, script)
    }

    pub fn refusing() -> Self {
        Self::default()
    }

    pub fn dialed(&self) -> Vec<String> {
        self.dialed.lock().clone()
    }
}

#[async_trait]
impl Dialer for ScriptedDialer {
    type Reader = ScriptedReader;
    type Writer = ScriptedWriter;

    async fn dial(&self, url: &str) -> Result<(ScriptedReader, ScriptedWriter), TransportError> {
        self.dialed.lock().push(url.to_string());

        let pending_failures = self.failures_before_success.load(Ordering::SeqCst);
        if pending_failures > 0 {
            self.failures_before_success.store(pending_failures - 1, Ordering::SeqCst);
            return Err(TransportError::Connect("connection refused".into()));
        }

        self.connections
            .lock()
            .pop()
            .ok_or_else(|| TransportError::Connect("connection refused".into()))
    }
}

pub fn trade_frame(trade_id: u64) -> String {
    format!(
        r#"{{"e":"trade","E":1672515782136,"s":"BNBBTC","t":{trade_id},"p":"0.001","q":"100","b":88,"a":50,"T":1672515782136,"m":true,"M":true}}"#
    )
}

pub const ACCOUNT_INFO_FRAME: &str = r#"{"e":"outboundAccountInfo","E":1499405658849,"m":0,"t":0,"b":0,"s":0,"T":true,"W":true,"D":true,"u":1499405658848,"B":[{"a":"BTC","f":"1.5","l":"0"}]}"#;

pub const EXECUTION_REPORT_FRAME: &str = r#"{"e":"executionReport","E":1499405658658,"s":"ETHBTC","c":"mUvoqJxFIILMdfAW5iGSOW","S":"BUY","o":"LIMIT","f":"GTC","q":"1.00000000","p":"0.10264410","P":"0.00000000","F":"0.00000000","g":-1,"C":"","x":"NEW","X":"NEW","r":"NONE","i":4293153,"l":"0.00000000","z":"0.00000000","L":"0.00000000","n":"0","N":null,"T":1499405658657,"t":-1,"I":8641984,"w":true,"m":false,"M":false,"O":1499405658657,"Z":"0.00000000"}"#;
