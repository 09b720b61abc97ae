use crate::runner::ToolRun;
use crate::utils::output_text;

use super::error::BridgeError;

/// 요청 처리 중 발생하는 진단 이벤트 수신자.
///
/// Called from request handlers running on the async runtime, concurrently
/// for independent requests.
pub trait BridgeObserver: Send + Sync + 'static {
    /// Request answered with an HTTP error (bad body, bad path, encoding).
    fn request_failed(&self, error: &BridgeError);

    /// Tool is about to run with the final argument vector.
    fn invoking(&self, args: &[String]);

    /// Tool run finished, successfully or not.
    fn completed(&self, args: &[String], run: &ToolRun);
}

/// Default observer: every event goes to `tracing`.
#[derive(Debug, Clone)]
pub struct TracingObserver {
    label: String,
}

impl TracingObserver {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }
}

impl BridgeObserver for TracingObserver {
    fn request_failed(&self, error: &BridgeError) {
        match error {
            BridgeError::InvalidRequest(e) => tracing::warn!("Rejected request body: {}", e),
            BridgeError::InvalidPath(e) => tracing::warn!("Error getting absolute path: {}", e),
            BridgeError::Encoding(e) => tracing::error!("Error encoding response: {}", e),
        }
    }

    fn invoking(&self, args: &[String]) {
        tracing::info!("Running {} command with args: {:?}", self.label, args);
    }

    fn completed(&self, args: &[String], run: &ToolRun) {
        let output = output_text(&run.output);
        match &run.status {
            Ok(()) => tracing::info!("{} output: {}", self.label, output),
            Err(e) => tracing::error!(
                "Error running {} with args {:?}: {}\nOutput: {}",
                self.label,
                args,
                e,
                output
            ),
        }
    }
}
