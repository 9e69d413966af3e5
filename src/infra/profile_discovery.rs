use crate::domain::ProfileMetadata;
use crate::error::ProfileError;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

static PROFILE_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^devenv-(?P<profile>[a-zA-Z][\w-]+)\.ya?ml$").expect("profile filename regex")
});

/// Profiles found across all search roots, keyed by name.
pub type Profiles = BTreeMap<String, ProfileMetadata>;

/// Discovers `devenv-<name>.yml` definitions below a list of search roots
pub struct ProfileDiscovery {
    roots: Vec<PathBuf>,
}

impl ProfileDiscovery {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// Walks every root in order. A later root overrides profiles of the same
    /// name found in earlier roots; two files for one name within the same
    /// root is an error.
    pub fn discover_all(&self) -> Result<Profiles, ProfileError> {
        let mut profiles = Profiles::new();
        for root in &self.roots {
            if !root.is_dir() {
                debug!("Skipping missing search path {:?}", root);
                continue;
            }
            debug!("Searching [{}] ...", root.display());
            let mut found = Profiles::new();
            walk(root, &mut found)?;
            profiles.extend(found);
        }

        if profiles.is_empty() {
            return Err(ProfileError::NoProfiles);
        }
        Ok(profiles)
    }

    pub fn find_profile(&self, name: &str) -> Result<ProfileMetadata, ProfileError> {
        self.discover_all()?
            .remove(name)
            .ok_or_else(|| ProfileError::Unknown(name.to_string()))
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

/// Profile name encoded in a definition filename, if it is one.
pub fn profile_name(file_name: &str) -> Option<&str> {
    PROFILE_FILE
        .captures(file_name)
        .and_then(|caps| caps.name("profile"))
        .map(|m| m.as_str())
}

fn walk(dir: &Path, found: &mut Profiles) -> Result<(), ProfileError> {
    let entries = fs::read_dir(dir).map_err(|source| ProfileError::Read {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut entries: Vec<_> = entries.filter_map(Result::ok).collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            walk(&path, found)?;
            continue;
        }

        let file_name = entry.file_name();
        let Some(name) = file_name.to_str().and_then(profile_name) else {
            debug!("Ignored {}", path.display());
            continue;
        };

        if let Some(existing) = found.get(name) {
            return Err(ProfileError::Duplicate {
                name: name.to_string(),
                first: existing.path.clone(),
                second: path,
            });
        }
        debug!("Matched {}", path.display());
        found.insert(name.to_string(), ProfileMetadata::new(name, path));
    }

    Ok(())
}
