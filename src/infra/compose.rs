//! Compose working-directory preparation: template rendering and resource copy.

use crate::domain::Variables;
use crate::error::PlanError;
use regex::{Captures, Regex};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

pub const COMPOSE_FILE: &str = "docker-compose.yml";

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*\.?([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder regex")
});

/// Replaces `{{ NAME }}` tokens with variable values. Unknown tokens are kept verbatim.
pub fn render_template(template: &str, vars: &Variables) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| match vars.get(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Renders `template_path` into `<workdir>/docker-compose.yml`.
pub fn write_compose_file(
    template_path: &Path,
    workdir: &Path,
    vars: &Variables,
) -> Result<PathBuf, PlanError> {
    match fs::metadata(workdir) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(PlanError::Preparation(format!(
                "unable to access directory [{}]: not a directory",
                workdir.display()
            )));
        }
        Err(e) => {
            return Err(PlanError::Preparation(format!(
                "unable to access directory [{}]: {e}",
                workdir.display()
            )));
        }
    }

    debug!("Loading [{}]", template_path.display());
    let template = fs::read_to_string(template_path).map_err(|e| {
        PlanError::Preparation(format!(
            "unable to process docker compose template [{}]: {e}",
            template_path.display()
        ))
    })?;

    let target = workdir.join(COMPOSE_FILE);
    debug!("Finalizing docker compose file: {}", target.display());
    fs::write(&target, render_template(&template, vars)).map_err(|e| {
        PlanError::Preparation(format!(
            "unable to generate docker compose [{}]: {e}",
            target.display()
        ))
    })?;
    Ok(target)
}

/// Copies the resource directory into `workdir`, keeping its base name.
/// A profile without a resource directory gets an empty one.
pub fn copy_resources(resource_dir: &Path, workdir: &Path) -> Result<PathBuf, PlanError> {
    let name = resource_dir.file_name().ok_or_else(|| {
        PlanError::Preparation(format!(
            "invalid resource directory [{}]",
            resource_dir.display()
        ))
    })?;
    let target = workdir.join(name);
    debug!("Copying resource files: {}", resource_dir.display());

    if resource_dir.is_dir() {
        copy_dir(resource_dir, &target)
    } else {
        fs::create_dir_all(&target).map_err(|e| copy_error(&target, e))
    }?;
    Ok(target)
}

fn copy_dir(src: &Path, dst: &Path) -> Result<(), PlanError> {
    fs::create_dir_all(dst).map_err(|e| copy_error(dst, e))?;
    let entries = fs::read_dir(src).map_err(|e| copy_error(src, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| copy_error(src, e))?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        if from.is_dir() {
            copy_dir(&from, &to)?;
        } else {
            // fs::copy keeps permission bits so hook scripts stay executable
            fs::copy(&from, &to).map_err(|e| copy_error(&from, e))?;
        }
    }
    Ok(())
}

fn copy_error(path: &Path, e: std::io::Error) -> PlanError {
    PlanError::Preparation(format!(
        "unable to copy resources [{}]: {e}",
        path.display()
    ))
}
