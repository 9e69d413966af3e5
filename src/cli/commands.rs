use crate::infra::Settings;
use crate::infra::config::{DEFAULT_TMP_DIR, ENV_SEARCH_PATH, default_workspace};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Development environment controller driving docker compose profiles
#[derive(Parser, Debug)]
#[command(name = "devenv", version, about)]
pub struct Cli {
    /// Working directory containing profile definitions
    #[arg(short = 'w', long = "workspace", global = true)]
    pub workspace: Option<PathBuf>,

    /// Temporary directory receiving the generated compose file [default: <workspace>/.tmp]
    #[arg(long = "tmp-dir", global = true)]
    pub tmp_dir: Option<String>,

    /// Show debug information
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Additional profile search paths, comma separated
    #[arg(short = 's', long = "search-paths", value_delimiter = ',', global = true)]
    pub search_paths: Vec<String>,

    /// Profile search path taken from the environment
    #[arg(long = "env-search-path", env = ENV_SEARCH_PATH, hide = true, global = true)]
    pub env_search_path: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start services of the given profile
    Start(ProfileArgs),
    /// Stop services of the given profile
    Stop(ProfileArgs),
    /// Stop and start services of the given profile
    Restart(ProfileArgs),
    /// List available profiles
    List,
    /// Show information of the given profile
    Info {
        /// Profile name
        profile: String,
    },
    /// Internal use only
    #[command(hide = true)]
    Debug {
        /// Print out steps instead of running them
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ProfileArgs {
    /// Profile name
    pub profile: String,

    /// Print out commands instead of running them
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    pub fn settings(&self) -> Settings {
        let workspace = self.workspace.clone().unwrap_or_else(default_workspace);
        Settings::new(&workspace)
            .with_tmp_dir(self.tmp_dir.as_deref().unwrap_or(DEFAULT_TMP_DIR))
            .with_search_paths(&self.search_paths)
            .with_env_search_path(self.env_search_path.as_deref())
            .with_verbose(self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lifecycle_command_with_globals() {
        let cli = Cli::try_parse_from([
            "devenv",
            "-w",
            "/work",
            "start",
            "shop",
            "--dry-run",
            "-v",
            "-s",
            "a,b",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.search_paths, vec!["a", "b"]);
        match cli.command {
            Command::Start(args) => {
                assert_eq!(args.profile, "shop");
                assert!(args.dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn settings_resolve_against_workspace() {
        let cli = Cli::try_parse_from(["devenv", "-w", "/work", "--tmp-dir", "scratch", "list"])
            .unwrap();
        let settings = cli.settings();
        assert_eq!(settings.workspace, PathBuf::from("/work"));
        assert_eq!(settings.tmp_dir, PathBuf::from("/work/scratch"));
    }

    #[test]
    fn default_tmp_dir_is_under_workspace() {
        let cli = Cli::try_parse_from(["devenv", "-w", "/work", "list"]).unwrap();
        assert_eq!(cli.settings().tmp_dir, PathBuf::from("/work/.tmp"));
    }

    #[test]
    fn profile_argument_is_required() {
        assert!(Cli::try_parse_from(["devenv", "stop"]).is_err());
    }

    #[test]
    fn debug_command_is_hidden_but_parses() {
        let cli = Cli::try_parse_from(["devenv", "debug", "--dry-run"]).unwrap();
        assert!(matches!(cli.command, Command::Debug { dry_run: true }));
    }
}
