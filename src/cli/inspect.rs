use crate::domain::{HookPhase, Profile};
use crate::infra::Profiles;
use std::fmt::Write;

pub fn render_list(profiles: &Profiles) -> String {
    let width = profiles.keys().map(|k| k.len()).max().unwrap_or(0);
    let mut out = String::from("Available profiles:\n");
    for (name, meta) in profiles {
        let _ = writeln!(out, "    {name:<width$}  {}", meta.path.display());
    }
    out
}

pub fn render_profile(profile: &Profile) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Profile: {} ({})", profile.name(), profile.display_name);
    let _ = writeln!(out, "Definition: {}", profile.metadata.path.display());
    let _ = writeln!(out, "Services:");
    if profile.services.is_empty() {
        let _ = writeln!(out, "    NONE");
    }
    for svc in &profile.services {
        let label = if svc.display_name.is_empty() {
            &svc.name
        } else {
            &svc.display_name
        };
        let _ = write!(out, "    - {label}");
        if !svc.display_version.is_empty() {
            let _ = write!(out, " {}", svc.display_version);
        }
        let _ = writeln!(out, " [{}]", svc.image);
    }
    out
}

pub fn render_mounts(profile: &Profile) -> String {
    let mut out = String::from("Mounts:\n");
    let mut any = false;
    for svc in &profile.services {
        for mount in &svc.mounts {
            any = true;
            let _ = writeln!(
                out,
                "    {} -> {}",
                svc.name,
                profile.local_data_dir.join(mount).display()
            );
        }
    }
    if !any {
        out.push_str("    NONE\n");
    }
    out
}

pub fn render_hooks(profile: &Profile) -> String {
    let mut out = String::from("Hooks:\n");
    for phase in HookPhase::ALL {
        let hooks = profile.hooks.phase(phase);
        if hooks.is_empty() {
            continue;
        }
        let _ = writeln!(out, "    {phase}:");
        for hook in hooks {
            let _ = writeln!(out, "        - [{}] {}", hook.kind, hook.value);
        }
    }
    if profile.hooks.is_empty() {
        out.push_str("    NONE\n");
    }
    out
}

fn render_build_args(profile: &Profile) -> String {
    let mut out = String::from("Build args:\n");
    let mut any = false;
    for svc in &profile.services {
        for (arg, value) in &svc.build_args {
            any = true;
            let _ = writeln!(out, "    {}: {arg}={value}", svc.name);
        }
    }
    if !any {
        out.push_str("    NONE\n");
    }
    out
}

/// Full profile report; build args and hooks only when verbose.
pub fn render_info(profile: &Profile, verbose: bool) -> String {
    let mut out = render_profile(profile);
    out.push_str(&render_mounts(profile));
    if verbose {
        out.push_str(&render_build_args(profile));
        out.push_str(&render_hooks(profile));
    }
    out
}
