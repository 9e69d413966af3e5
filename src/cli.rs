pub mod commands;
pub mod context;
pub mod inspect;
pub mod lifecycle;

pub use commands::{Cli, Command, ProfileArgs};
pub use context::CliContext;
pub use lifecycle::Lifecycle;

use crate::infra::Settings;
use crate::plan::Action;
use anyhow::Result;
use tokio_util::sync::CancellationToken;

pub async fn run(cli: Cli, cancel: &CancellationToken) -> Result<()> {
    let settings = cli.settings();
    match cli.command {
        Command::Start(args) => lifecycle(settings, Action::Start, args, cancel).await,
        Command::Stop(args) => lifecycle(settings, Action::Stop, args, cancel).await,
        Command::Restart(args) => lifecycle(settings, Action::Restart, args, cancel).await,
        Command::List => {
            let ctx = CliContext::discover(settings)?;
            print!("{}", inspect::render_list(&ctx.profiles));
            Ok(())
        }
        Command::Info { profile } => {
            let ctx = CliContext::discover(settings)?;
            let profile = ctx.load(&profile)?;
            print!("{}", inspect::render_info(&profile, ctx.settings.verbose));
            Ok(())
        }
        Command::Debug { dry_run } => Lifecycle::new(settings).debug(dry_run, cancel).await,
    }
}

async fn lifecycle(
    settings: Settings,
    action: Action,
    args: ProfileArgs,
    cancel: &CancellationToken,
) -> Result<()> {
    let ctx = CliContext::discover(settings)?;
    let profile = ctx.load(&args.profile)?;
    print!("{}", inspect::render_profile(&profile));
    print!("{}", inspect::render_mounts(&profile));

    Lifecycle::new(ctx.settings)
        .run(profile, action, args.dry_run, cancel)
        .await
}
