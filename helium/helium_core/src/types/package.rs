//! Package descriptors.
//!
//! A package descriptor is the declarative record, usually read from an
//! external package registry, that names an application's artifact and
//! entry point. Descriptors are deliberately loose on the way in: the
//! `config` rows are kept as plain strings and only interpreted by
//! [`RequiredResources::parse`] when the loaded application runs.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ApplicationError, Result};

/// Kind of pluggable package.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackageType {
    /// An interpreter implementation.
    Interpreter,

    /// A notebook storage backend.
    NotebookRepo,

    /// An application bound to a paragraph.
    Application,

    /// A front-end spell.
    Spell,

    /// A front-end visualization.
    Visualization,
}

impl PackageType {
    /// Whether packages of this kind are instantiated by the application loader.
    pub fn requires_instantiation(&self) -> bool {
        matches!(self, Self::Application)
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Interpreter => "INTERPRETER",
            Self::NotebookRepo => "NOTEBOOK_REPO",
            Self::Application => "APPLICATION",
            Self::Spell => "SPELL",
            Self::Visualization => "VISUALIZATION",
        };
        f.write_str(name)
    }
}

/// Immutable description of a package.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDescriptor {
    /// Package kind.
    #[serde(rename = "type")]
    pub package_type: PackageType,

    /// Package name.
    pub name: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// Comma separated artifact coordinates.
    #[serde(default)]
    pub artifact: String,

    /// Fully qualified entry-point name.
    #[serde(default)]
    pub class_name: String,

    /// Ordered rows of strings; see [`RequiredResources`].
    #[serde(default, alias = "resources")]
    pub config: Vec<Vec<String>>,

    /// License name.
    #[serde(default)]
    pub license: String,

    /// Icon markup.
    #[serde(default)]
    pub icon: String,
}

impl PackageDescriptor {
    /// Create a new package descriptor.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        package_type: PackageType,
        name: impl Into<String>,
        description: impl Into<String>,
        artifact: impl Into<String>,
        class_name: impl Into<String>,
        config: Vec<Vec<String>>,
        license: impl Into<String>,
        icon: impl Into<String>,
    ) -> Self {
        Self {
            package_type,
            name: name.into(),
            description: description.into(),
            artifact: artifact.into(),
            class_name: class_name.into(),
            config,
            license: license.into(),
            icon: icon.into(),
        }
    }

    /// Create an application descriptor with only the fields the loader needs.
    pub fn application(
        name: impl Into<String>,
        artifact: impl Into<String>,
        class_name: impl Into<String>,
    ) -> Self {
        Self::new(
            PackageType::Application,
            name,
            "",
            artifact,
            class_name,
            Vec::new(),
            "",
            "",
        )
    }

    /// Replace the config rows.
    pub fn with_config(mut self, config: Vec<Vec<String>>) -> Self {
        self.config = config;
        self
    }

    /// The artifact coordinates, split and trimmed, in declaration order.
    pub fn coordinates(&self) -> Vec<String> {
        self.artifact
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Check that an instantiable package names an artifact and an entry point.
    pub fn validate(&self) -> Result<()> {
        if !self.package_type.requires_instantiation() {
            return Ok(());
        }

        if self.coordinates().is_empty() {
            return Err(ApplicationError::InvalidDescriptor(format!(
                "package '{}' has no artifact",
                self.name
            ))
            .into());
        }

        if self.class_name.trim().is_empty() {
            return Err(ApplicationError::InvalidDescriptor(format!(
                "package '{}' has no class name",
                self.name
            ))
            .into());
        }

        Ok(())
    }

    /// Interpret the config rows as required-resource alternatives.
    pub fn required_resources(&self) -> RequiredResources {
        RequiredResources::parse(&self.config)
    }
}

/// A single required resource.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ResourceRequirement {
    /// A resource with this name.
    Named(String),

    /// Any resource whose value has this type name (written `:TypeName`).
    OfType(String),
}

impl ResourceRequirement {
    /// Parse one config cell.
    pub fn parse(cell: &str) -> Self {
        match cell.strip_prefix(':') {
            Some(type_name) => Self::OfType(type_name.to_string()),
            None => Self::Named(cell.to_string()),
        }
    }
}

/// Alternative sets of required resources, tried in order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequiredResources {
    alternatives: Vec<Vec<ResourceRequirement>>,
}

impl RequiredResources {
    /// Parse descriptor config rows.
    pub fn parse(rows: &[Vec<String>]) -> Self {
        let alternatives = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| cell.trim())
                    .filter(|cell| !cell.is_empty())
                    .map(ResourceRequirement::parse)
                    .collect()
            })
            .collect();

        Self { alternatives }
    }

    /// Whether the preferred alternative needs nothing.
    pub fn is_unconstrained(&self) -> bool {
        self.alternatives.first().map_or(true, Vec::is_empty)
    }

    /// The alternatives in declaration order.
    pub fn alternatives(&self) -> &[Vec<ResourceRequirement>] {
        &self.alternatives
    }
}
