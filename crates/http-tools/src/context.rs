//! Per-call binding context: the `args` and `env` namespaces expressions resolve against.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Immutable snapshot of environment variables.
///
/// Captured once (usually at startup) and shared by every call; later changes to the process
/// environment are not observed.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    vars: Arc<HashMap<String, String>>,
}

impl EnvSnapshot {
    /// Snapshot the current process environment. Non-UTF-8 entries are skipped.
    #[must_use]
    pub fn from_process() -> Self {
        Self::from_iter(std::env::vars_os().filter_map(|(k, v)| {
            Some((k.into_string().ok()?, v.into_string().ok()?))
        }))
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }
}

impl<K, V> FromIterator<(K, V)> for EnvSnapshot
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: Arc::new(
                iter.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

/// Arguments of one call plus the environment snapshot.
///
/// Built fresh for every call and never shared between calls.
#[derive(Debug, Clone)]
pub struct CallContext {
    args: Map<String, Value>,
    env: EnvSnapshot,
}

impl CallContext {
    #[must_use]
    pub fn new(args: Map<String, Value>, env: EnvSnapshot) -> Self {
        Self { args, env }
    }

    #[must_use]
    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.args.get(name)
    }

    #[must_use]
    pub fn env_var(&self, name: &str) -> Option<&str> {
        self.env.get(name)
    }
}
