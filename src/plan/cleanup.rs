use super::execution::ExecOption;
use crate::domain::{ContainerEngine, PruneReport};
use crate::error::PlanError;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Volumes carrying this label survive cleanup.
pub const PERSIST_LABEL: &str = "devenv.persist";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PruneTarget {
    Containers,
    Volumes,
    Images,
}

impl PruneTarget {
    pub const ALL: [PruneTarget; 3] = [Self::Containers, Self::Volumes, Self::Images];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Containers => "containers",
            Self::Volumes => "volumes",
            Self::Images => "images",
        }
    }
}

impl fmt::Display for PruneTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine-side cleanup of stopped containers, unlabeled volumes or dangling images.
#[derive(Debug)]
pub struct PruneStep {
    target: PruneTarget,
    engine: Arc<dyn ContainerEngine>,
}

impl PruneStep {
    pub fn new(target: PruneTarget, engine: Arc<dyn ContainerEngine>) -> Self {
        Self { target, engine }
    }

    /// Prune steps for every target, in cleanup order.
    pub fn all(engine: &Arc<dyn ContainerEngine>) -> Vec<Self> {
        PruneTarget::ALL
            .into_iter()
            .map(|target| Self::new(target, engine.clone()))
            .collect()
    }

    pub fn target(&self) -> PruneTarget {
        self.target
    }

    pub fn describe(&self) -> String {
        format!("prune {}", self.target)
    }

    pub(crate) async fn exec(&self, opts: ExecOption) -> Result<(), PlanError> {
        let report = match self.target {
            PruneTarget::Containers => self.engine.prune_containers().await?,
            PruneTarget::Volumes => self.engine.prune_volumes(PERSIST_LABEL).await?,
            PruneTarget::Images => self.engine.prune_images().await?,
        };

        if opts.verbose {
            for line in report_lines(self.target, &report) {
                println!("{line}");
            }
        } else {
            info!(
                "Deleted {} {} and reclaimed {} space",
                report.deleted.len(),
                self.target,
                format_size(report.space_reclaimed)
            );
        }
        Ok(())
    }
}

fn report_lines(target: PruneTarget, report: &PruneReport) -> Vec<String> {
    let mut lines = Vec::new();
    if target == PruneTarget::Images {
        push_items(&mut lines, "Untagged Images", &report.untagged);
    }
    let heading = match target {
        PruneTarget::Containers => "Deleted Containers",
        PruneTarget::Volumes => "Deleted Volumes",
        PruneTarget::Images => "Deleted Images",
    };
    push_items(&mut lines, heading, &report.deleted);
    lines.push(format!(
        "Total reclaimed space: {}",
        format_size(report.space_reclaimed)
    ));
    lines
}

fn push_items(lines: &mut Vec<String>, heading: &str, items: &[String]) {
    lines.push(format!("{heading}:"));
    if items.is_empty() {
        lines.push("    NONE".to_string());
    }
    lines.extend(items.iter().map(|item| format!("    {item}")));
}

/// Human readable byte count: `512B`, `1.50KB`, up to GB.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];

    if bytes < 1024 {
        return format!("{bytes}B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2}{}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockEngine;

    #[test]
    fn formats_sizes() {
        assert_eq!(format_size(0), "0B");
        assert_eq!(format_size(1023), "1023B");
        assert_eq!(format_size(1024), "1.00KB");
        assert_eq!(format_size(1024 * 1024), "1.00MB");
        assert_eq!(format_size(1536), "1.50KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00MB");
        assert_eq!(format_size(1024 * 1024 * 1024), "1.00GB");
        assert_eq!(format_size(2048 * 1024 * 1024 * 1024), "2048.00GB");
    }

    #[test]
    fn verbose_report_lists_items() {
        let report = PruneReport {
            deleted: vec!["abc".into(), "def".into()],
            untagged: Vec::new(),
            space_reclaimed: 2048,
        };
        assert_eq!(
            report_lines(PruneTarget::Containers, &report),
            vec![
                "Deleted Containers:",
                "    abc",
                "    def",
                "Total reclaimed space: 2.00KB"
            ]
        );
    }

    #[test]
    fn image_report_includes_untagged() {
        let report = PruneReport {
            deleted: Vec::new(),
            untagged: vec!["redis:6".into()],
            space_reclaimed: 10,
        };
        assert_eq!(
            report_lines(PruneTarget::Images, &report),
            vec![
                "Untagged Images:",
                "    redis:6",
                "Deleted Images:",
                "    NONE",
                "Total reclaimed space: 10B"
            ]
        );
    }

    #[tokio::test]
    async fn prunes_each_target_with_persist_filter() {
        let mock = Arc::new(MockEngine::new());
        let engine: Arc<dyn ContainerEngine> = mock.clone();

        for step in PruneStep::all(&engine) {
            step.exec(ExecOption::default()).await.unwrap();
        }

        assert_eq!(
            mock.get_commands(),
            vec![
                "prune:containers",
                "prune:volumes:devenv.persist",
                "prune:images"
            ]
        );
    }

    #[tokio::test]
    async fn engine_failure_surfaces() {
        let mock = Arc::new(MockEngine::new());
        mock.set_fail_on("prune:images");
        let step = PruneStep::new(PruneTarget::Images, mock);

        let err = step.exec(ExecOption::default()).await.unwrap_err();
        assert!(matches!(err, PlanError::Engine(_)));
    }

    #[test]
    fn descriptions() {
        let engine: Arc<dyn ContainerEngine> = Arc::new(MockEngine::new());
        let descs: Vec<String> = PruneStep::all(&engine).iter().map(|s| s.describe()).collect();
        assert_eq!(descs, vec!["prune containers", "prune volumes", "prune images"]);
    }
}
