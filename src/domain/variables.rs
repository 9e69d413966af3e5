use super::Profile;
use std::fmt;

pub const VAR_PROJECT_NAME: &str = "PROJECT_NAME";
pub const VAR_RESOURCE_DIR: &str = "RESOURCE_DIR";
pub const VAR_CONTAINER_DATA_PATH: &str = "CONTAINER_DATA_PATH";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub value: String,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Insertion-ordered variable set. Re-adding a name replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variables(Vec<Variable>);

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Service, build-arg and global variables derived from a profile.
    pub fn from_profile(profile: &Profile) -> Self {
        let mut vars = Self::new();

        let mut services = Vec::with_capacity(profile.services.len() * 2);
        for svc in &profile.services {
            let key = env_key(&svc.name);
            services.push(Variable::new(format!("{key}_IMAGE"), &svc.image));
            services.push(Variable::new(
                format!("{key}_CONTAINER"),
                svc.container_name(profile.name()),
            ));
        }
        services.sort_by(|a, b| a.name.cmp(&b.name));
        vars.extend(services);

        let mut build_args: Vec<_> = profile
            .services
            .iter()
            .flat_map(|svc| svc.build_args.iter())
            .map(|(arg, value)| Variable::new(format!("build_args_{arg}"), value))
            .collect();
        build_args.sort_by(|a, b| a.name.cmp(&b.name));
        vars.extend(build_args);

        vars.add(Variable::new(VAR_PROJECT_NAME, profile.name()));
        vars
    }

    pub fn add(&mut self, var: Variable) {
        match self.0.iter_mut().find(|v| v.name == var.name) {
            Some(existing) => existing.value = var.value,
            None => self.0.push(var),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|v| v.name == name)
            .map(|v| v.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `(name, value)` pairs for a child process environment.
    pub fn to_env(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|v| (v.name.clone(), v.value.clone()))
            .collect()
    }
}

impl Extend<Variable> for Variables {
    fn extend<I: IntoIterator<Item = Variable>>(&mut self, iter: I) {
        for var in iter {
            self.add(var);
        }
    }
}

fn env_key(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}
