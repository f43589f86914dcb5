//! Shared helpers for the integration tests.

use std::sync::{Arc, Mutex};

use wsbridge::{
    AdapterConfig,
    AdapterError,
    Disposition,
    ErrorVerdict,
    ProtocolAdapter,
    WebSocketConn,
};

/// Adapter double recording the order of every hook invocation.
#[derive(Default)]
pub struct ProbeAdapter {
    calls: Arc<Mutex<Vec<String>>>,
    pub fail_open: bool,
    /// Text payload on which the adapter requests a close itself.
    pub close_on: Option<String>,
}

impl ProbeAdapter {
    pub fn new() -> (Self, Arc<Mutex<Vec<String>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                calls: Arc::clone(&calls),
                fail_open: false,
                close_on: None,
            },
            calls,
        )
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().expect("probe lock").push(call.into());
    }
}

impl ProtocolAdapter for ProbeAdapter {
    fn configure(&mut self, _config: &AdapterConfig) -> Result<(), AdapterError> {
        self.record("configure");
        Ok(())
    }

    fn on_open(&self, _conn: &WebSocketConn) -> Result<(), AdapterError> {
        self.record("on_open");
        if self.fail_open {
            return Err(AdapterError::transport(
                "handshake ack failed",
                wsbridge::Severity::Fatal,
            ));
        }
        Ok(())
    }

    fn on_message(&self, conn: &WebSocketConn, text: &str) -> Result<Disposition, AdapterError> {
        self.record(format!("on_message:{text}"));
        if self.close_on.as_deref() == Some(text) {
            conn.request_close();
        }
        Ok(Disposition::Handled)
    }

    fn on_close(&self, _conn: &WebSocketConn) { self.record("on_close"); }

    fn on_error(&self, _conn: &WebSocketConn, error: &AdapterError) -> ErrorVerdict {
        self.record(format!("on_error:{error}"));
        error.severity().into()
    }
}

/// Drain a call log into owned strings.
pub fn calls(log: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
    log.lock().expect("probe lock").clone()
}
