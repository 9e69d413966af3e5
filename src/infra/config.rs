use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const ENV_SEARCH_PATH: &str = "DEV_ENV_PATH";
pub const HOME_SEARCH_DIR: &str = ".devenv";
pub const DEFAULT_TMP_DIR: &str = ".tmp";

/// Process-wide settings resolved once from flags and environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Root searched for profile definitions, also the base for relative paths
    pub workspace: PathBuf,
    /// Scratch directory receiving the generated compose file and resources
    pub tmp_dir: PathBuf,
    /// Additional roots from `--search-paths`
    pub search_paths: Vec<PathBuf>,
    /// Root from `$DEV_ENV_PATH`
    pub env_search_path: Option<PathBuf>,
    /// Home directory, searched under `~/.devenv`
    pub home_dir: Option<PathBuf>,
    pub verbose: bool,
}

impl Settings {
    pub fn new(workspace: &Path) -> Self {
        let workspace = absolute(workspace);
        Self {
            tmp_dir: workspace.join(DEFAULT_TMP_DIR),
            workspace,
            search_paths: Vec::new(),
            env_search_path: None,
            home_dir: home_dir(),
            verbose: false,
        }
    }

    pub fn with_tmp_dir(mut self, tmp_dir: &str) -> Self {
        self.tmp_dir = abs_path(&expand(tmp_dir), &self.workspace);
        self
    }

    pub fn with_search_paths<S: AsRef<str>>(mut self, paths: &[S]) -> Self {
        self.search_paths = paths
            .iter()
            .map(|p| p.as_ref().trim())
            .filter(|p| !p.is_empty())
            .map(|p| abs_path(&expand(p), &self.workspace))
            .collect();
        self
    }

    pub fn with_env_search_path(mut self, path: Option<&str>) -> Self {
        self.env_search_path = path
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| abs_path(&expand(p), &self.workspace));
        self
    }

    pub fn with_home_dir(mut self, home: Option<PathBuf>) -> Self {
        self.home_dir = home;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Profile search roots in precedence order (later roots override earlier ones).
    pub fn profile_roots(&self) -> Vec<PathBuf> {
        let mut roots = Vec::with_capacity(self.search_paths.len() + 3);
        if let Some(home) = &self.home_dir {
            roots.push(home.join(HOME_SEARCH_DIR));
        }
        roots.push(self.workspace.clone());
        match &self.env_search_path {
            Some(p) => roots.push(p.clone()),
            None => info!("${ENV_SEARCH_PATH} is not set"),
        }
        roots.extend(self.search_paths.iter().cloned());
        roots
    }

    pub fn ensure_tmp_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.tmp_dir)
            .with_context(|| format!("creating temporary directory {:?}", self.tmp_dir))
    }
}

pub fn default_workspace() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Joins relative `path` onto `base`; absolute paths are returned as-is.
pub fn abs_path(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn absolute(path: &Path) -> PathBuf {
    abs_path(path, &default_workspace())
}

fn expand(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
}
