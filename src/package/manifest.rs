use anyhow::{Context, Result, anyhow};
use log::debug;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

/// Dependency groupings a package descriptor may declare a dependency in.
pub const DEPENDENCY_GROUPS: [&str; 4] = [
    "dependencies",
    "devDependencies",
    "peerDependencies",
    "optionalDependencies",
];

/// A JSON package descriptor (`package.json`) kept as an ordered tree so that
/// unrelated fields survive a rewrite untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    path: PathBuf,
    root: Map<String, Value>,
}

impl Manifest {
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime + ?Sized>(runtime: &R, path: &Path) -> Result<Self> {
        let content = runtime
            .read_to_string(path)
            .with_context(|| format!("Failed to read package descriptor {:?}", path))?;
        Self::parse(path, &content)
    }

    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content)
            .with_context(|| format!("Failed to parse package descriptor {:?}", path))?;

        match value {
            Value::Object(root) => Ok(Self {
                path: path.to_path_buf(),
                root,
            }),
            _ => Err(anyhow!(
                "Package descriptor {:?} is not a JSON object",
                path
            )),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> Option<&str> {
        self.root.get("name").and_then(Value::as_str)
    }

    pub fn version(&self) -> Result<&str> {
        self.root
            .get("version")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("Package descriptor {:?} has no string 'version'", self.path))
    }

    pub fn set_version(&mut self, version: &str) {
        self.root
            .insert("version".to_string(), Value::String(version.to_string()));
    }

    /// Groups in which `name` is declared, in [`DEPENDENCY_GROUPS`] order.
    pub fn groups_declaring(&self, name: &str) -> Vec<&'static str> {
        DEPENDENCY_GROUPS
            .into_iter()
            .filter(|group| {
                self.root
                    .get(*group)
                    .and_then(Value::as_object)
                    .is_some_and(|deps| deps.contains_key(name))
            })
            .collect()
    }

    /// Sets the constraint of `name` in every group that declares it.
    /// Returns the number of groups touched.
    pub fn pin_dependency(&mut self, name: &str, constraint: &str) -> usize {
        let mut touched = 0;
        for group in DEPENDENCY_GROUPS {
            let Some(deps) = self.root.get_mut(group).and_then(Value::as_object_mut) else {
                continue;
            };
            if let Some(slot) = deps.get_mut(name) {
                debug!("{:?}: {}.{} = {}", self.path, group, name, constraint);
                *slot = Value::String(constraint.to_string());
                touched += 1;
            }
        }
        touched
    }

    /// npm-style rendering: two-space indent, trailing newline.
    pub fn to_json_string(&self) -> Result<String> {
        let mut out = serde_json::to_string_pretty(&self.root)
            .context("Failed to serialize package descriptor")?;
        out.push('\n');
        Ok(out)
    }

    #[tracing::instrument(skip(self, runtime), fields(path = ?self.path))]
    pub fn save<R: Runtime + ?Sized>(&self, runtime: &R) -> Result<()> {
        let content = self.to_json_string()?;
        runtime
            .write(&self.path, content.as_bytes())
            .with_context(|| format!("Failed to write package descriptor {:?}", self.path))
    }
}
