use crate::domain::Profile;
use crate::error::ProfileError;
use crate::infra::{ProfileDiscovery, Profiles, Settings, load_profile};
use anyhow::{Context, Result};
use tracing::debug;

/// Settings plus the profiles visible from them.
#[derive(Debug)]
pub struct CliContext {
    pub settings: Settings,
    pub profiles: Profiles,
}

impl CliContext {
    /// Discovers profiles under every configured search root.
    pub fn discover(settings: Settings) -> Result<Self> {
        let discovery = ProfileDiscovery::new(settings.profile_roots());
        let profiles = discovery
            .discover_all()
            .context("searching profile definitions")?;
        debug!("Found {} profiles", profiles.len());
        Ok(Self { settings, profiles })
    }

    pub fn load(&self, name: &str) -> Result<Profile> {
        let metadata = self
            .profiles
            .get(name)
            .ok_or_else(|| ProfileError::Unknown(name.to_string()))?;
        let profile = load_profile(metadata)
            .with_context(|| format!("loading profile [{name}]"))?;
        Ok(profile)
    }
}
