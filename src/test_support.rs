use crate::domain::{
    ContainerEngine, ContainerSummary, EngineVersion, LogStream, PruneReport, ShellCommand,
    ShellRunner,
};
use crate::error::EngineError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::sync::{Mutex, RwLock};
use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio_util::sync::CancellationToken;

/// Encodes one multiplexed log frame: `[kind, 0, 0, 0, len(be32), payload]`.
pub fn encode_frame(kind: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + payload.len());
    out.extend_from_slice(&[kind, 0, 0, 0]);
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// What a mocked container log stream yields.
#[derive(Debug, Clone)]
pub enum LogSource {
    /// Raw bytes followed by end of stream
    Bytes(Vec<u8>),
    /// A stream that never produces data until the reader goes away
    Pending,
    /// Opening the stream fails with this message
    OpenError(String),
}

#[derive(Debug)]
pub struct MockEngine {
    containers: RwLock<Vec<ContainerSummary>>,
    logs: RwLock<HashMap<String, LogSource>>,
    // write halves of pending streams, held so reads block
    pending: Mutex<Vec<DuplexStream>>,
    commands: RwLock<Vec<String>>,
    fail_on: RwLock<Option<String>>,
    prune_report: RwLock<PruneReport>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            containers: RwLock::new(Vec::new()),
            logs: RwLock::new(HashMap::new()),
            pending: Mutex::new(Vec::new()),
            commands: RwLock::new(Vec::new()),
            fail_on: RwLock::new(None),
            prune_report: RwLock::new(PruneReport::default()),
        }
    }

    pub fn add_container(&self, container: ContainerSummary) {
        self.containers.write().unwrap().push(container);
    }

    /// Log stream served for `id` (the resolved identifier passed to the engine).
    pub fn set_logs(&self, id: &str, source: LogSource) {
        self.logs.write().unwrap().insert(id.to_string(), source);
    }

    pub fn set_prune_report(&self, report: PruneReport) {
        *self.prune_report.write().unwrap() = report;
    }

    pub fn set_fail_on(&self, operation: &str) {
        *self.fail_on.write().unwrap() = Some(operation.to_string());
    }

    pub fn get_commands(&self) -> Vec<String> {
        self.commands.read().unwrap().clone()
    }

    /// True once every pending stream handed out has been dropped by its reader.
    pub async fn pending_streams_closed(&self) -> bool {
        let mut writers = std::mem::take(&mut *self.pending.lock().unwrap());
        let mut all_closed = true;
        for writer in &mut writers {
            if writer.write_all(&[0]).await.is_ok() {
                all_closed = false;
            }
        }
        self.pending.lock().unwrap().extend(writers);
        all_closed
    }

    fn record_command(&self, cmd: &str) {
        self.commands.write().unwrap().push(cmd.to_string());
    }

    fn check_fail(&self, operation: &str) -> Result<(), EngineError> {
        if let Some(ref fail_on) = *self.fail_on.read().unwrap() {
            if fail_on == operation {
                return Err(EngineError::Protocol {
                    operation: operation.to_string(),
                    message: "mock failure".into(),
                });
            }
        }
        Ok(())
    }

    fn report(&self) -> PruneReport {
        self.prune_report.read().unwrap().clone()
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerEngine for MockEngine {
    async fn list_containers(&self) -> Result<Vec<ContainerSummary>, EngineError> {
        self.record_command("list");
        self.check_fail("list")?;
        Ok(self.containers.read().unwrap().clone())
    }

    async fn open_log_stream(
        &self,
        container: &str,
        cancel: &CancellationToken,
    ) -> Result<LogStream, EngineError> {
        self.record_command(&format!("logs:{container}"));
        self.check_fail("logs")?;
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled(format!("logs of {container}")));
        }

        let source = self
            .logs
            .read()
            .unwrap()
            .get(container)
            .cloned()
            .unwrap_or(LogSource::Bytes(Vec::new()));
        match source {
            LogSource::Bytes(bytes) => Ok(Box::new(io::Cursor::new(bytes))),
            LogSource::Pending => {
                let (reader, writer) = tokio::io::duplex(64);
                self.pending.lock().unwrap().push(writer);
                Ok(Box::new(reader))
            }
            LogSource::OpenError(message) => Err(EngineError::Status {
                operation: format!("logs of {container}"),
                status: 404,
                message,
            }),
        }
    }

    async fn prune_containers(&self) -> Result<PruneReport, EngineError> {
        self.record_command("prune:containers");
        self.check_fail("prune:containers")?;
        Ok(self.report())
    }

    async fn prune_volumes(&self, keep_label: &str) -> Result<PruneReport, EngineError> {
        self.record_command(&format!("prune:volumes:{keep_label}"));
        self.check_fail("prune:volumes")?;
        Ok(self.report())
    }

    async fn prune_images(&self) -> Result<PruneReport, EngineError> {
        self.record_command("prune:images");
        self.check_fail("prune:images")?;
        Ok(self.report())
    }

    async fn server_version(&self) -> Result<EngineVersion, EngineError> {
        self.record_command("version");
        self.check_fail("version")?;
        Ok(EngineVersion {
            version: "27.0.0-mock".into(),
            api_version: "1.46".into(),
            os: "linux".into(),
            arch: "amd64".into(),
        })
    }
}

/// Records shell invocations instead of spawning processes.
#[derive(Debug, Default)]
pub struct MockShell {
    commands: RwLock<Vec<ShellCommand>>,
    exit_codes: RwLock<Vec<(String, i32)>>,
    fail_on: RwLock<Option<String>>,
}

impl MockShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts containing `pattern` exit with `code`.
    pub fn set_exit_code(&self, pattern: &str, code: i32) {
        self.exit_codes
            .write()
            .unwrap()
            .push((pattern.to_string(), code));
    }

    /// Scripts containing `pattern` fail to spawn.
    pub fn set_fail_on(&self, pattern: &str) {
        *self.fail_on.write().unwrap() = Some(pattern.to_string());
    }

    /// Scripts run so far, in order.
    pub fn get_commands(&self) -> Vec<String> {
        self.commands
            .read()
            .unwrap()
            .iter()
            .map(ShellCommand::script)
            .collect()
    }

    pub fn last_command(&self) -> Option<ShellCommand> {
        self.commands.read().unwrap().last().cloned()
    }
}

#[async_trait]
impl ShellRunner for MockShell {
    async fn run(&self, cmd: &ShellCommand, cancel: &CancellationToken) -> io::Result<i32> {
        if cancel.is_cancelled() {
            return Err(io::Error::new(io::ErrorKind::Interrupted, "shell cancelled"));
        }
        let script = cmd.script();
        self.commands.write().unwrap().push(cmd.clone());

        if let Some(ref pattern) = *self.fail_on.read().unwrap() {
            if script.contains(pattern.as_str()) {
                return Err(io::Error::new(io::ErrorKind::NotFound, "mock spawn failure"));
            }
        }
        let code = self
            .exit_codes
            .read()
            .unwrap()
            .iter()
            .find(|(pattern, _)| script.contains(pattern.as_str()))
            .map(|(_, code)| *code)
            .unwrap_or(0);
        Ok(code)
    }
}
