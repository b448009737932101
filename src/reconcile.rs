//! Version reconciliation engine
//!
//! [`reconcile`] takes the component catalog, the installed-version mapping
//! reported by the live database, and the server's own version string, and
//! produces one [`VersionRecord`] per catalog entry: installed version,
//! latest upstream version, and a status classification.
//!
//! Latest versions are resolved depth-first through alias chains with a
//! per-run memo cache, so each GitHub repository is fetched at most once per
//! reconciliation no matter how many components alias it. Upstream failures
//! degrade that component's latest version to "unknown"; they never abort
//! the run.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::catalog::{Catalog, ComponentKind, ComponentSource};
use crate::registry::ReleaseSource;
use crate::version::{VersionStatus, classify, normalize};

/// One output row of a reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    pub component: String,
    /// Version reported by the database, absent when not installed.
    pub installed_version: Option<String>,
    /// Normalized latest upstream version, absent when unresolvable.
    pub latest_version: Option<String>,
    pub status: VersionStatus,
    /// Provenance: alias target, repository identifier, or source tag.
    pub source: String,
}

/// Reconcile installed component versions against their upstream releases.
///
/// Produces exactly one record per catalog entry, in catalog order, even
/// when upstream lookups fail.
pub async fn reconcile(
    catalog: &Catalog,
    installed: &HashMap<String, String>,
    server_version: &str,
    releases: &dyn ReleaseSource,
) -> Vec<VersionRecord> {
    let mut resolver = LatestResolver::new(catalog, server_version, releases);
    let mut records = Vec::with_capacity(catalog.len());

    for (name, spec) in catalog.iter() {
        let installed_version = match spec.kind {
            ComponentKind::Server => Some(server_version.to_string()),
            _ => installed.get(name).filter(|v| !v.is_empty()).cloned(),
        };

        // Bundled components track the engine release, no lookup.
        let latest_version = match spec.kind {
            ComponentKind::Core => Some(server_version.to_string()),
            _ => resolver.resolve(name).await,
        };

        let status = classify(installed_version.as_deref(), latest_version.as_deref());
        records.push(VersionRecord {
            component: name.clone(),
            installed_version,
            latest_version,
            status,
            source: spec.source_label().to_string(),
        });
    }

    records
}

/// Memoizing latest-version resolver, scoped to one reconciliation run.
///
/// Server-kind components are pre-seeded with the normalized server version,
/// so alias chains ending at the engine resolve without an upstream lookup.
struct LatestResolver<'a> {
    catalog: &'a Catalog,
    server_version: &'a str,
    releases: &'a dyn ReleaseSource,
    cache: HashMap<String, Option<String>>,
}

impl<'a> LatestResolver<'a> {
    fn new(catalog: &'a Catalog, server_version: &'a str, releases: &'a dyn ReleaseSource) -> Self {
        let mut cache = HashMap::new();
        for (name, spec) in catalog.iter() {
            if spec.kind == ComponentKind::Server {
                cache.insert(name.clone(), normalize(server_version, None));
            }
        }
        Self {
            catalog,
            server_version,
            releases,
            cache,
        }
    }

    /// Resolve the latest version for a component, following alias chains.
    ///
    /// The whole chain is memoized under every name it visits. A revisited
    /// in-progress name (a cycle that slipped past catalog validation)
    /// resolves to absent rather than looping.
    async fn resolve(&mut self, name: &str) -> Option<String> {
        if let Some(hit) = self.cache.get(name) {
            debug!(component = name, "latest version cache hit");
            return hit.clone();
        }

        let catalog = self.catalog;
        let mut chain: Vec<&'a str> = Vec::new();
        let mut cursor = name;

        let resolved = loop {
            if let Some(hit) = self.cache.get(cursor) {
                break hit.clone();
            }
            let Some((key, spec)) = catalog.get_key_value(cursor) else {
                debug!(component = cursor, "not in catalog, latest unresolved");
                break None;
            };
            if chain.contains(&key.as_str()) {
                warn!(component = cursor, "alias cycle, latest unresolved");
                break None;
            }
            chain.push(key.as_str());

            if spec.kind == ComponentKind::Core {
                break Some(self.server_version.to_string());
            }
            match &spec.source {
                ComponentSource::Alias { alias } => cursor = alias.as_str(),
                ComponentSource::Github { repo, pattern } => {
                    let tag = match self.releases.latest_tag(repo).await {
                        Ok(tag) => tag,
                        Err(err) => {
                            warn!(repo = %repo, error = %err, "release lookup failed");
                            None
                        }
                    };
                    break tag.and_then(|t| normalize(&t, pattern.as_ref()));
                }
                ComponentSource::None => break None,
            }
        };

        for visited in chain {
            self.cache.insert(visited.to_string(), resolved.clone());
        }
        self.cache.insert(name.to_string(), resolved.clone());
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ComponentSpec;
    use crate::registry::{MockReleaseSource, RegistryError};
    use indexmap::IndexMap;

    fn catalog_of(entries: &[(&str, ComponentSpec)]) -> Catalog {
        Catalog::new(
            entries
                .iter()
                .map(|(name, spec)| (name.to_string(), spec.clone()))
                .collect::<IndexMap<_, _>>(),
        )
        .unwrap()
    }

    fn installed_of(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(name, version)| (name.to_string(), version.to_string()))
            .collect()
    }

    fn server_spec() -> ComponentSpec {
        ComponentSpec {
            source: ComponentSource::None,
            kind: ComponentKind::Server,
        }
    }

    #[tokio::test]
    async fn end_to_end_scenario_produces_expected_rows() {
        let catalog = catalog_of(&[
            ("postgresql", server_spec()),
            ("postgis", ComponentSpec::github("postgis/postgis")),
            ("postgis_raster", ComponentSpec::alias("postgis")),
        ]);
        let installed = installed_of(&[("postgis", "3.3.0")]);

        let mut releases = MockReleaseSource::new();
        releases
            .expect_latest_tag()
            .withf(|repo| repo == "postgis/postgis")
            .times(1)
            .returning(|_| Ok(Some("3.4.1".to_string())));

        let records = reconcile(&catalog, &installed, "16.2", &releases).await;

        assert_eq!(
            records,
            vec![
                VersionRecord {
                    component: "postgresql".to_string(),
                    installed_version: Some("16.2".to_string()),
                    latest_version: Some("16.2".to_string()),
                    status: VersionStatus::Current,
                    source: "none".to_string(),
                },
                VersionRecord {
                    component: "postgis".to_string(),
                    installed_version: Some("3.3.0".to_string()),
                    latest_version: Some("3.4.1".to_string()),
                    status: VersionStatus::Outdated,
                    source: "postgis/postgis".to_string(),
                },
                VersionRecord {
                    component: "postgis_raster".to_string(),
                    installed_version: None,
                    latest_version: Some("3.4.1".to_string()),
                    status: VersionStatus::NotInstalled,
                    source: "postgis".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn aliases_share_one_upstream_lookup() {
        let catalog = catalog_of(&[
            ("vector", ComponentSpec::github("pgvector/pgvector")),
            ("pgvector", ComponentSpec::alias("vector")),
            ("pgvector_compat", ComponentSpec::alias("pgvector")),
        ]);
        let installed = installed_of(&[("vector", "0.7.0")]);

        let mut releases = MockReleaseSource::new();
        releases
            .expect_latest_tag()
            .times(1)
            .returning(|_| Ok(Some("v0.8.0".to_string())));

        let records = reconcile(&catalog, &installed, "16.2", &releases).await;

        // alias chain of depth 2 resolves to the same value as the target
        assert!(
            records
                .iter()
                .all(|r| r.latest_version.as_deref() == Some("0.8.0"))
        );
        assert_eq!(records[0].status, VersionStatus::Outdated);
    }

    #[tokio::test]
    async fn core_components_track_the_server_version_exactly() {
        let catalog = catalog_of(&[
            ("postgresql", server_spec()),
            (
                "pg_stat_statements",
                ComponentSpec::alias("postgresql").with_kind(ComponentKind::Core),
            ),
        ]);
        let installed = installed_of(&[("pg_stat_statements", "1.10")]);

        let releases = MockReleaseSource::new();
        let records = reconcile(&catalog, &installed, "16.2", &releases).await;

        let row = &records[1];
        assert_eq!(row.latest_version.as_deref(), Some("16.2"));
        assert_eq!(row.installed_version.as_deref(), Some("1.10"));
        assert_eq!(row.status, VersionStatus::Outdated);
    }

    #[tokio::test]
    async fn upstream_failure_degrades_one_row_not_the_run() {
        let catalog = catalog_of(&[
            ("postgresql", server_spec()),
            ("age", ComponentSpec::github("apache/age")),
            ("pg_cron", ComponentSpec::github("citusdata/pg_cron")),
        ]);
        let installed = installed_of(&[("age", "1.5.0"), ("pg_cron", "1.6.0")]);

        let mut releases = MockReleaseSource::new();
        releases
            .expect_latest_tag()
            .withf(|repo| repo == "apache/age")
            .returning(|repo| Err(RegistryError::NotFound(repo.to_string())));
        releases
            .expect_latest_tag()
            .withf(|repo| repo == "citusdata/pg_cron")
            .returning(|_| Ok(Some("v1.6.0".to_string())));

        let records = reconcile(&catalog, &installed, "16.2", &releases).await;

        assert_eq!(records.len(), 3);
        let age = records.iter().find(|r| r.component == "age").unwrap();
        assert_eq!(age.latest_version, None);
        assert_eq!(age.status, VersionStatus::Unknown);

        let cron = records.iter().find(|r| r.component == "pg_cron").unwrap();
        assert_eq!(cron.latest_version.as_deref(), Some("1.6.0"));
        assert_eq!(cron.status, VersionStatus::Current);
    }

    #[tokio::test]
    async fn tag_pattern_is_applied_before_comparison() {
        let catalog = catalog_of(&[(
            "pg_repack",
            ComponentSpec::github("reorg/pg_repack").with_pattern(
                crate::catalog::TagPattern::new(r"(?i)(?:ver[_-])?([0-9_.]+)").unwrap(),
            ),
        )]);
        let installed = installed_of(&[("pg_repack", "1.5.0")]);

        let mut releases = MockReleaseSource::new();
        releases
            .expect_latest_tag()
            .returning(|_| Ok(Some("ver_1.5.2".to_string())));

        let records = reconcile(&catalog, &installed, "16.2", &releases).await;

        assert_eq!(records[0].latest_version.as_deref(), Some("1.5.2"));
        assert_eq!(records[0].status, VersionStatus::Outdated);
    }

    #[tokio::test]
    async fn reconcile_is_idempotent_for_identical_inputs() {
        let catalog = catalog_of(&[
            ("postgresql", server_spec()),
            ("postgis", ComponentSpec::github("postgis/postgis")),
        ]);
        let installed = installed_of(&[("postgis", "3.3.0")]);

        let run = || async {
            let mut releases = MockReleaseSource::new();
            releases
                .expect_latest_tag()
                .returning(|_| Ok(Some("3.4.1".to_string())));
            reconcile(&catalog, &installed, "16.2", &releases).await
        };

        assert_eq!(run().await, run().await);
    }

    #[tokio::test]
    async fn repo_without_releases_yields_unknown() {
        let catalog = catalog_of(&[("hypopg", ComponentSpec::github("HypoPG/hypopg"))]);
        let installed = installed_of(&[("hypopg", "1.4.0")]);

        let mut releases = MockReleaseSource::new();
        releases.expect_latest_tag().returning(|_| Ok(None));

        let records = reconcile(&catalog, &installed, "16.2", &releases).await;

        assert_eq!(records[0].latest_version, None);
        assert_eq!(records[0].status, VersionStatus::Unknown);
    }

    #[tokio::test]
    async fn empty_installed_version_counts_as_not_installed() {
        let catalog = catalog_of(&[("postgis", ComponentSpec::github("postgis/postgis"))]);
        let installed = installed_of(&[("postgis", "")]);

        let mut releases = MockReleaseSource::new();
        releases
            .expect_latest_tag()
            .returning(|_| Ok(Some("3.4.1".to_string())));

        let records = reconcile(&catalog, &installed, "16.2", &releases).await;

        assert_eq!(records[0].installed_version, None);
        assert_eq!(records[0].status, VersionStatus::NotInstalled);
    }
}
