use crate::domain::{Hook, HookPhase, Hooks, Profile, ProfileMetadata, Service};
use crate::error::ProfileError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// Root for host-side data mounts; one subdirectory per profile.
pub const LOCAL_DATA_ROOT: &str = "/usr/local/var/dev";

/// First-generation profile format.
#[derive(Debug, Deserialize, Default)]
struct ProfileV1 {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    services: Vec<ServiceV1>,
    #[serde(default)]
    pre_start: Vec<String>,
    #[serde(default)]
    post_start: Vec<String>,
    #[serde(default)]
    pre_stop: Vec<String>,
    #[serde(default)]
    post_stop: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ServiceV1 {
    service: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    display_version: String,
    #[serde(default)]
    image: String,
    #[serde(default)]
    mounts: Vec<String>,
    #[serde(default)]
    build_args: BTreeMap<String, String>,
}

impl ProfileV1 {
    fn into_profile(self, metadata: ProfileMetadata) -> Profile {
        let dir = metadata.dir();
        let name = metadata.name.clone();

        // v1 has no per-hook type: post-start entries name containers to wait
        // on, everything else is a script
        let hooks: Hooks = [
            (HookPhase::PreStart, self.pre_start),
            (HookPhase::PostStart, self.post_start),
            (HookPhase::PreStop, self.pre_stop),
            (HookPhase::PostStop, self.post_stop),
        ]
        .into_iter()
        .flat_map(|(phase, values)| {
            values
                .into_iter()
                .filter(|v| !v.trim().is_empty())
                .map(move |v| match phase {
                    HookPhase::PostStart => Hook::container(phase, v),
                    _ => Hook::script(phase, v),
                })
        })
        .collect();

        let services = self
            .services
            .into_iter()
            .map(|s| Service {
                name: s.service,
                display_name: s.display_name,
                display_version: s.display_version,
                image: s.image,
                mounts: s.mounts,
                build_args: s.build_args,
            })
            .collect();

        Profile {
            display_name: self.display_name.unwrap_or_else(|| name.clone()),
            services,
            hooks,
            resource_dir: dir.join(format!("res-{name}")),
            compose_path: dir.join(format!("docker-compose-{name}.yml")),
            local_data_dir: PathBuf::from(LOCAL_DATA_ROOT).join(&name),
            metadata,
        }
    }
}

pub fn load_profile(metadata: &ProfileMetadata) -> Result<Profile, ProfileError> {
    let content = fs::read_to_string(&metadata.path).map_err(|source| ProfileError::Read {
        path: metadata.path.clone(),
        source,
    })?;
    parse_profile(&content, metadata.clone())
}

pub fn parse_profile(content: &str, metadata: ProfileMetadata) -> Result<Profile, ProfileError> {
    if content.trim().is_empty() {
        return Ok(ProfileV1::default().into_profile(metadata));
    }
    let raw: ProfileV1 = serde_yml::from_str(content).map_err(|source| ProfileError::Parse {
        path: metadata.path.clone(),
        source,
    })?;
    Ok(raw.into_profile(metadata))
}
