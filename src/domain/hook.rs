use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

/// Lifecycle phase a hook is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HookPhase {
    PreStart,
    PostStart,
    PreStop,
    PostStop,
}

impl HookPhase {
    pub const ALL: [HookPhase; 4] = [
        HookPhase::PreStart,
        HookPhase::PostStart,
        HookPhase::PreStop,
        HookPhase::PostStop,
    ];

    /// Textual form, also used as the script lookup directory/prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreStart => "pre-start",
            Self::PostStart => "post-start",
            Self::PreStop => "pre-stop",
            Self::PostStop => "post-stop",
        }
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookType {
    Script,
    Container,
}

impl fmt::Display for HookType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Script => f.write_str("script"),
            Self::Container => f.write_str("container"),
        }
    }
}

/// An action bound to a lifecycle phase.
///
/// `value` is a script filename for [`HookType::Script`] and a logical
/// compose service name for [`HookType::Container`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hook {
    pub name: String,
    pub phase: HookPhase,
    pub kind: HookType,
    pub value: String,
}

impl Hook {
    pub fn script(phase: HookPhase, value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            name: value.clone(),
            phase,
            kind: HookType::Script,
            value,
        }
    }

    pub fn container(phase: HookPhase, value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            name: value.clone(),
            phase,
            kind: HookType::Container,
            value,
        }
    }
}

/// Hooks of a profile keyed by phase, in declaration order within a phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hooks(HashMap<HookPhase, Vec<Hook>>);

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self, phase: HookPhase) -> &[Hook] {
        self.0.get(&phase).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn push(&mut self, hook: Hook) {
        self.0.entry(hook.phase).or_default().push(hook);
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }
}

impl FromIterator<Hook> for Hooks {
    fn from_iter<I: IntoIterator<Item = Hook>>(iter: I) -> Self {
        let mut hooks = Hooks::new();
        for hook in iter {
            hooks.push(hook);
        }
        hooks
    }
}
