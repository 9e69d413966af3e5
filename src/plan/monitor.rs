//! Follows the log streams of a set of containers until every stream ends.
//!
//! One reader task per container decodes frames and forwards them over a
//! bounded channel to a single aggregator, which prints them with a colored
//! per-container prefix and records how each stream finished.

mod frame;

pub use frame::{Frame, FrameHeader, FrameReader, HEADER_LEN, StreamKind};

use super::execution::ExecOption;
use super::timeout::TimeoutStep;
use crate::domain::{ContainerEngine, ContainerSummary};
use crate::error::PlanError;
use colored::{Color, Colorize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub const COMPOSE_PROJECT_LABEL: &str = "com.docker.compose.project";
pub const COMPOSE_SERVICE_LABEL: &str = "com.docker.compose.service";

const EVENT_BUFFER: usize = 1;

const PALETTE: [Color; 12] = [
    Color::Cyan,
    Color::Yellow,
    Color::Magenta,
    Color::Green,
    Color::Blue,
    Color::Red,
    Color::BrightCyan,
    Color::BrightYellow,
    Color::BrightMagenta,
    Color::BrightGreen,
    Color::BrightBlue,
    Color::BrightRed,
];

/// Maps a requested name to the engine identifier of a matching container.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ContainerResolver {
    /// Container name equals the requested name (leading `/` ignored)
    #[default]
    ExactName,
    /// Compose project/service labels, falling back to `<project>-<name>-` in the name
    Compose { project: String },
}

impl ContainerResolver {
    pub fn compose(project: impl Into<String>) -> Self {
        Self::Compose {
            project: project.into(),
        }
    }

    pub fn resolve(&self, name: &str, container: &ContainerSummary) -> Option<String> {
        match self {
            Self::ExactName => {
                let wanted = name.trim_start_matches('/');
                container
                    .names
                    .iter()
                    .map(|n| n.trim_start_matches('/'))
                    .find(|n| *n == wanted)
                    .map(str::to_string)
            }
            Self::Compose { project } => {
                let labels = &container.labels;
                if labels.get(COMPOSE_PROJECT_LABEL) == Some(project)
                    && labels.get(COMPOSE_SERVICE_LABEL).map(String::as_str) == Some(name)
                {
                    return Some(container.id.clone());
                }
                // Substring match: for `db` this also accepts `shop-db-init-1`.
                let generated = format!("{project}-{name}-");
                container
                    .names
                    .iter()
                    .find(|n| n.contains(&generated))
                    .map(|n| n.trim_start_matches('/').to_string())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum StreamOutcome {
    CleanEnd,
    Failed(String),
}

#[derive(Debug)]
enum EventPayload {
    Line(String),
    Ended(StreamOutcome),
}

#[derive(Debug)]
struct ContainerEvent {
    container: String,
    payload: EventPayload,
}

#[derive(Debug)]
pub struct ContainerMonitor {
    engine: Arc<dyn ContainerEngine>,
    names: Vec<String>,
    resolver: ContainerResolver,
    desc: String,
}

impl ContainerMonitor {
    /// Monitor for `names`; duplicates are dropped keeping the first occurrence.
    pub fn new(engine: Arc<dyn ContainerEngine>, names: Vec<String>) -> Self {
        let mut unique: Vec<String> = Vec::with_capacity(names.len());
        for name in names {
            if !unique.contains(&name) {
                unique.push(name);
            }
        }
        Self {
            engine,
            names: unique,
            resolver: ContainerResolver::ExactName,
            desc: "containers".to_string(),
        }
    }

    pub fn with_resolver(mut self, resolver: ContainerResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.desc = desc.into();
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> TimeoutStep {
        TimeoutStep::new(timeout, self)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn resolver(&self) -> &ContainerResolver {
        &self.resolver
    }

    pub fn describe(&self) -> String {
        match self.names.as_slice() {
            [] => "no-op".to_string(),
            [single] => format!("{}: {single}", self.desc),
            many => format!("{}: \n    {}", self.desc, many.join("\n    ")),
        }
    }

    pub(crate) async fn exec(
        &self,
        cancel: &CancellationToken,
        _opts: ExecOption,
    ) -> Result<(), PlanError> {
        if self.names.is_empty() {
            return Ok(());
        }

        let ids = self.resolve_containers().await?;

        let cancel = cancel.child_token();
        let _guard = cancel.clone().drop_guard();
        let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
        // dropping the set aborts any reader still blocked on its stream
        let mut readers = JoinSet::new();
        for name in &self.names {
            let id = ids.get(name).cloned().unwrap_or_else(|| name.clone());
            readers.spawn(follow(
                self.engine.clone(),
                name.clone(),
                id,
                tx.clone(),
                cancel.clone(),
            ));
        }
        drop(tx);

        info!("Waiting for {} ...", self.describe());
        let printer = LinePrinter::new(&self.names);
        let mut outcomes: HashMap<String, StreamOutcome> = HashMap::new();
        while outcomes.len() < self.names.len() {
            let event = tokio::select! {
                _ = cancel.cancelled() => return Err(PlanError::Cancelled(self.describe())),
                event = rx.recv() => event,
            };
            let Some(event) = event else { break };
            match event.payload {
                EventPayload::Line(text) => printer.print(&event.container, &text),
                EventPayload::Ended(outcome) => {
                    match &outcome {
                        StreamOutcome::CleanEnd => {
                            printer.print(&event.container, "log stream ended")
                        }
                        StreamOutcome::Failed(msg) => {
                            printer.print(&event.container, &format!("error: {msg}"))
                        }
                    }
                    outcomes.insert(event.container, outcome);
                }
            }
        }
        readers.shutdown().await;

        let failed: Vec<String> = self
            .names
            .iter()
            .filter(|name| outcomes.get(*name) != Some(&StreamOutcome::CleanEnd))
            .cloned()
            .collect();
        if failed.is_empty() {
            Ok(())
        } else {
            Err(PlanError::Stream(failed))
        }
    }

    async fn resolve_containers(&self) -> Result<HashMap<String, String>, PlanError> {
        let containers = self.engine.list_containers().await?;
        let mut ids = HashMap::with_capacity(self.names.len());
        let mut missing = Vec::new();
        for name in &self.names {
            match containers
                .iter()
                .find_map(|c| self.resolver.resolve(name, c))
            {
                Some(id) => {
                    debug!("resolved container {name} to {id}");
                    ids.insert(name.clone(), id);
                }
                None => missing.push(name.clone()),
            }
        }
        if missing.is_empty() {
            Ok(ids)
        } else {
            Err(PlanError::Resolution(missing))
        }
    }
}

async fn follow(
    engine: Arc<dyn ContainerEngine>,
    name: String,
    id: String,
    tx: mpsc::Sender<ContainerEvent>,
    cancel: CancellationToken,
) {
    let outcome = tokio::select! {
        _ = cancel.cancelled() => return,
        outcome = pump(engine.as_ref(), &name, &id, &tx, &cancel) => outcome,
    };
    let _ = tx
        .send(ContainerEvent {
            container: name,
            payload: EventPayload::Ended(outcome),
        })
        .await;
}

async fn pump(
    engine: &dyn ContainerEngine,
    name: &str,
    id: &str,
    tx: &mpsc::Sender<ContainerEvent>,
    cancel: &CancellationToken,
) -> StreamOutcome {
    let stream = match engine.open_log_stream(id, cancel).await {
        Ok(stream) => stream,
        Err(e) => return StreamOutcome::Failed(e.to_string()),
    };
    let mut frames = FrameReader::new(stream);
    loop {
        match frames.next_frame().await {
            Ok(Some(frame)) => {
                let event = ContainerEvent {
                    container: name.to_string(),
                    payload: EventPayload::Line(frame.text()),
                };
                if tx.send(event).await.is_err() {
                    return StreamOutcome::Failed("monitor stopped".into());
                }
            }
            Ok(None) => return StreamOutcome::CleanEnd,
            Err(e) => return StreamOutcome::Failed(e.to_string()),
        }
    }
}

/// Formats `<padded name> | <line>` with one palette color per container.
struct LinePrinter {
    prefixes: HashMap<String, String>,
}

impl LinePrinter {
    fn new(names: &[String]) -> Self {
        let width = prefix_width(names);
        let prefixes = names
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let padded = pad_name(name, width);
                (name.clone(), padded.as_str().color(color_for(idx)).to_string())
            })
            .collect();
        Self { prefixes }
    }

    fn print(&self, container: &str, text: &str) {
        match self.prefixes.get(container) {
            Some(prefix) => println!("{prefix} | {text}"),
            None => println!("{container} | {text}"),
        }
    }
}

fn prefix_width(names: &[String]) -> usize {
    names.iter().map(|n| n.chars().count()).max().unwrap_or(0) + 4
}

fn pad_name(name: &str, width: usize) -> String {
    format!("{name:>width$}")
}

fn color_for(idx: usize) -> Color {
    PALETTE[idx % PALETTE.len()]
}
