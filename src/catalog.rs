//! Catalog of tracked components
//!
//! A catalog maps component names (the PostgreSQL server itself plus its
//! extensions) to a [`ComponentSpec`] describing where the latest released
//! version comes from. Catalogs can be loaded from a JSON file or taken from
//! the built-in default set; either way the catalog is validated once at load
//! time and is immutable for the rest of the run.

use std::path::Path;

use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("catalog contains no components")]
    EmptyCatalog,

    #[error("component {component:?} aliases unknown component {target:?}")]
    UnknownAlias { component: String, target: String },

    #[error("alias cycle detected starting at component {component:?}")]
    AliasCycle { component: String },

    #[error("alias of component {component:?} ends at {target:?}, which has no release source")]
    UnresolvableAlias { component: String, target: String },

    #[error("source \"github\" requires a repo")]
    MissingRepo,

    #[error("source \"alias\" requires an alias target")]
    MissingAliasTarget,

    #[error("unknown source {0:?}")]
    UnknownSource(String),

    #[error("invalid tag pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse catalog file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Extraction rule applied to a raw release tag before normalization.
///
/// Wraps a regex that must contain exactly one capturing group; the group's
/// match replaces the raw tag. A non-matching pattern means the tag carries
/// no usable version.
#[derive(Debug, Clone)]
pub struct TagPattern(Regex);

impl TagPattern {
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        let re = Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        // captures_len counts the implicit whole-match group 0
        if re.captures_len() != 2 {
            return Err(ConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: "pattern must contain exactly one capturing group".to_string(),
            });
        }
        Ok(Self(re))
    }

    /// Extract the version token from a raw tag, or None if the pattern
    /// does not match.
    pub fn extract<'t>(&self, tag: &'t str) -> Option<&'t str> {
        self.0.captures(tag).and_then(|c| c.get(1)).map(|m| m.as_str())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl PartialEq for TagPattern {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_str() == other.0.as_str()
    }
}

/// Where a component's latest-version truth comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentSource {
    /// Latest published release tag of a GitHub repository.
    Github {
        repo: String,
        pattern: Option<TagPattern>,
    },
    /// Tracks another component's resolved version.
    Alias { alias: String },
    /// No independent release source.
    None,
}

/// Release-cycle relationship between a component and the database server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// Independently released extension.
    #[default]
    Extension,
    /// The database engine itself; its installed version is the server version.
    Server,
    /// Bundled contrib extension; tracks the engine release, no lookup needed.
    Core,
}

/// Static descriptor for one tracked component.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawComponentSpec")]
pub struct ComponentSpec {
    pub source: ComponentSource,
    pub kind: ComponentKind,
}

impl ComponentSpec {
    pub fn github(repo: &str) -> Self {
        Self {
            source: ComponentSource::Github {
                repo: repo.to_string(),
                pattern: None,
            },
            kind: ComponentKind::Extension,
        }
    }

    pub fn alias(target: &str) -> Self {
        Self {
            source: ComponentSource::Alias {
                alias: target.to_string(),
            },
            kind: ComponentKind::Extension,
        }
    }

    pub fn with_kind(mut self, kind: ComponentKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_pattern(mut self, pattern: TagPattern) -> Self {
        if let ComponentSource::Github { pattern: slot, .. } = &mut self.source {
            *slot = Some(pattern);
        }
        self
    }

    /// Human-readable provenance for report output: the alias target, the
    /// repository identifier, or the literal source tag.
    pub fn source_label(&self) -> &str {
        match &self.source {
            ComponentSource::Alias { alias } => alias,
            ComponentSource::Github { repo, .. } => repo,
            ComponentSource::None => "none",
        }
    }
}

/// Flat on-disk form, matching the catalog file format:
/// `{"source": "github", "repo": "postgis/postgis", "kind": "extension"}`.
#[derive(Debug, Deserialize)]
struct RawComponentSpec {
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    repo: Option<String>,
    #[serde(default)]
    alias: Option<String>,
    #[serde(default)]
    pattern: Option<String>,
    #[serde(default)]
    kind: ComponentKind,
}

impl TryFrom<RawComponentSpec> for ComponentSpec {
    type Error = ConfigError;

    fn try_from(raw: RawComponentSpec) -> Result<Self, Self::Error> {
        let source = match raw.source.as_deref() {
            Some("github") => ComponentSource::Github {
                repo: raw.repo.ok_or(ConfigError::MissingRepo)?,
                pattern: raw
                    .pattern
                    .as_deref()
                    .map(TagPattern::new)
                    .transpose()?,
            },
            Some("alias") => ComponentSource::Alias {
                alias: raw.alias.ok_or(ConfigError::MissingAliasTarget)?,
            },
            Some("none") | None => ComponentSource::None,
            Some(other) => return Err(ConfigError::UnknownSource(other.to_string())),
        };
        Ok(Self {
            source,
            kind: raw.kind,
        })
    }
}

/// Validated, order-preserving set of tracked components.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    components: IndexMap<String, ComponentSpec>,
}

impl Catalog {
    pub fn new(components: IndexMap<String, ComponentSpec>) -> Result<Self, ConfigError> {
        validate(&components)?;
        Ok(Self { components })
    }

    /// Load a catalog from a JSON file: an object mapping component name to
    /// its flat spec. Entry order in the file is the report order.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let components: IndexMap<String, ComponentSpec> = serde_json::from_str(&raw)?;
        Self::new(components)
    }

    /// The default tracked-component set: the server, the independently
    /// released extensions it ships with, and the bundled contrib extensions
    /// that follow the server's release cycle.
    pub fn builtin() -> Self {
        let repack_pattern = TagPattern::new(r"(?i)(?:ver[_-])?([0-9_.]+)")
            .expect("built-in pg_repack pattern is valid");

        let mut components = IndexMap::new();
        let mut insert = |name: &str, spec: ComponentSpec| {
            components.insert(name.to_string(), spec);
        };

        insert(
            "postgresql",
            ComponentSpec::github("postgres/postgres").with_kind(ComponentKind::Server),
        );
        insert("postgis", ComponentSpec::github("postgis/postgis"));
        insert("postgis_raster", ComponentSpec::alias("postgis"));
        insert("postgis_topology", ComponentSpec::alias("postgis"));
        insert("postgis_tiger_geocoder", ComponentSpec::alias("postgis"));
        insert("address_standardizer", ComponentSpec::alias("postgis"));
        insert("address_standardizer_data_us", ComponentSpec::alias("postgis"));
        insert("vector", ComponentSpec::github("pgvector/pgvector"));
        insert("pgvector", ComponentSpec::alias("vector"));
        insert("age", ComponentSpec::github("apache/age"));
        insert("pg_cron", ComponentSpec::github("citusdata/pg_cron"));
        insert("pg_partman", ComponentSpec::github("pgpartman/pg_partman"));
        insert("pg_partman_bgw", ComponentSpec::alias("pg_partman"));
        insert("hypopg", ComponentSpec::github("HypoPG/hypopg"));
        insert(
            "pg_repack",
            ComponentSpec::github("reorg/pg_repack").with_pattern(repack_pattern),
        );
        insert("pg_squeeze", ComponentSpec::github("cybertec-postgresql/pg_squeeze"));
        insert("pgtap", ComponentSpec::github("theory/pgtap"));
        insert("pgrouting", ComponentSpec::github("pgRouting/pgrouting"));
        // Contrib extensions follow the server lifecycle
        for name in [
            "pg_stat_statements",
            "pg_buffercache",
            "pgcrypto",
            "citext",
            "hstore",
            "pg_trgm",
            "uuid-ossp",
            "fuzzystrmatch",
        ] {
            insert(
                name,
                ComponentSpec::alias("postgresql").with_kind(ComponentKind::Core),
            );
        }

        Self::new(components).expect("built-in catalog is valid")
    }

    pub fn get(&self, name: &str) -> Option<&ComponentSpec> {
        self.components.get(name)
    }

    pub fn get_key_value(&self, name: &str) -> Option<(&String, &ComponentSpec)> {
        self.components.get_key_value(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ComponentSpec)> {
        self.components.iter()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

/// Reject catalogs whose alias graph cannot be resolved: unknown targets,
/// cycles, and chains that end at a component with no release source.
fn validate(components: &IndexMap<String, ComponentSpec>) -> Result<(), ConfigError> {
    if components.is_empty() {
        return Err(ConfigError::EmptyCatalog);
    }

    for (name, spec) in components {
        let ComponentSource::Alias { alias } = &spec.source else {
            continue;
        };
        let mut visited = vec![name.as_str()];
        let mut cursor = alias.as_str();
        loop {
            if visited.contains(&cursor) {
                return Err(ConfigError::AliasCycle {
                    component: name.clone(),
                });
            }
            let Some(target) = components.get(cursor) else {
                return Err(ConfigError::UnknownAlias {
                    component: name.clone(),
                    target: cursor.to_string(),
                });
            };
            visited.push(cursor);
            match (&target.kind, &target.source) {
                (ComponentKind::Server | ComponentKind::Core, _) => break,
                (_, ComponentSource::Github { .. }) => break,
                (_, ComponentSource::Alias { alias }) => cursor = alias.as_str(),
                (_, ComponentSource::None) => {
                    return Err(ConfigError::UnresolvableAlias {
                        component: name.clone(),
                        target: cursor.to_string(),
                    });
                }
            }
        }
    }

    Ok(())
}
