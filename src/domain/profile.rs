use super::Hooks;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Where a profile definition was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileMetadata {
    /// Profile name taken from `devenv-<name>.yml`
    pub name: String,
    /// Absolute path to the definition file
    pub path: PathBuf,
}

impl ProfileMetadata {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Directory holding the definition file and its sibling resources.
    pub fn dir(&self) -> PathBuf {
        self.path
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// A named environment definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub metadata: ProfileMetadata,
    pub display_name: String,
    pub services: Vec<Service>,
    pub hooks: Hooks,
    /// Directory of hook scripts and files copied next to the compose file
    pub resource_dir: PathBuf,
    /// Compose template rendered into the working directory
    pub compose_path: PathBuf,
    /// Host root for data mounts
    pub local_data_dir: PathBuf,
}

impl Profile {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub name: String,
    pub display_name: String,
    pub display_version: String,
    pub image: String,
    pub mounts: Vec<String>,
    pub build_args: BTreeMap<String, String>,
}

impl Service {
    /// Container name compose generates for this service under `profile`.
    pub fn container_name(&self, profile: &str) -> String {
        format!("{}-{}", snake_case(profile), snake_case(&self.name))
    }
}

/// camelCase to snake_case, spaces become dashes.
pub fn snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let mut prev_lower = false;
    for c in s.chars() {
        if c.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            prev_lower = false;
        } else if c == ' ' {
            out.push('-');
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    out
}
