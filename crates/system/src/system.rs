//! The data model: systems as evaluated from a manifest, and the running
//! instances that belong to them.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The only instance type the scaling engine manages. One-off task
/// containers carry other type tags and are ignored here.
pub const DAEMON_TYPE: &str = "daemon";

/// Scaling policy. `limit <= 0` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scalable {
    pub default: u32,
    pub limit: i64,
}

impl Scalable {
    pub fn unbounded(default: u32) -> Self {
        Self { default, limit: 0 }
    }

    pub fn limited(default: u32, limit: i64) -> Self {
        Self { default, limit }
    }

    pub fn is_limited(&self) -> bool {
        self.limit > 0
    }
}

impl Default for Scalable {
    fn default() -> Self {
        Self {
            default: 1,
            limit: 0,
        }
    }
}

/// A named service definition. Produced by manifest evaluation and
/// immutable from the engine's point of view; shared via `Arc` because
/// systems reference each other through their dependency lists.
#[derive(Debug, Clone)]
pub struct System {
    pub name: String,
    /// Image tag its daemon instances run.
    pub image: String,
    /// Namespace of the owning manifest; opaque, used for telemetry.
    pub manifest_id: String,
    pub scalable: Scalable,
    /// Declared dependencies, in declaration order.
    pub depends: Vec<Arc<System>>,
    /// Environment-export template. Values may reference the exporting
    /// instance with `#{envs.KEY}` and `#{net.port[NAME]}` placeholders.
    pub export_envs: BTreeMap<String, String>,
}

impl System {
    pub fn new(
        name: impl Into<String>,
        image: impl Into<String>,
        manifest_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            manifest_id: manifest_id.into(),
            scalable: Scalable::default(),
            depends: Vec::new(),
            export_envs: BTreeMap::new(),
        }
    }

    pub fn with_scalable(mut self, scalable: Scalable) -> Self {
        self.scalable = scalable;
        self
    }

    pub fn with_depends(mut self, depends: Vec<Arc<System>>) -> Self {
        self.depends = depends;
        self
    }

    pub fn with_export_env(mut self, key: impl Into<String>, template: impl Into<String>) -> Self {
        self.export_envs.insert(key.into(), template.into());
        self
    }

    /// Expand the export template against one instance's environment and
    /// port mapping. Unknown placeholders expand to the empty string.
    pub fn expand_export_envs(
        &self,
        envs: &BTreeMap<String, String>,
        ports: &BTreeMap<String, u16>,
    ) -> BTreeMap<String, String> {
        let env_re = Regex::new(r"#\{envs\.([A-Za-z0-9_]+)\}").expect("valid regex");
        let port_re = Regex::new(r"#\{net\.port\[([^\]]+)\]\}").expect("valid regex");

        self.export_envs
            .iter()
            .map(|(key, template)| {
                let value = env_re.replace_all(template, |caps: &regex::Captures<'_>| {
                    envs.get(&caps[1]).cloned().unwrap_or_default()
                });
                let value = port_re.replace_all(&value, |caps: &regex::Captures<'_>| {
                    ports
                        .get(&caps[1])
                        .map(|p| p.to_string())
                        .unwrap_or_default()
                });
                (key.clone(), value.into_owned())
            })
            .collect()
    }
}

/// One container belonging to a system.
#[derive(Debug, Clone)]
pub struct Instance {
    pub id: String,
    pub system: String,
    pub instance_type: String,
    /// Creation time (epoch seconds); scale-down stops newest first.
    pub created_at: i64,
}

/// Inspection snapshot of a running instance.
#[derive(Debug, Clone, Default)]
pub struct InstanceData {
    /// Exposed port name to published host port.
    pub ports: BTreeMap<String, u16>,
    /// Raw `KEY=VALUE` environment entries.
    pub env: Vec<String>,
}

/// Parse raw `KEY=VALUE` entries into a map; entries without `=` are
/// skipped.
pub fn parse_envs(collection: &[String]) -> BTreeMap<String, String> {
    let mut envs = BTreeMap::new();
    for entry in collection {
        if let Some((key, value)) = entry.split_once('=') {
            envs.insert(key.to_string(), value.to_string());
        }
    }
    envs
}
