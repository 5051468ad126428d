//! Candidate generation and response assembly.

use crate::errors::{ResolveError, StoreError};
use crate::flatten::{self, PropertyMap};
use crate::store::RepositoryStore;
use serde::Serialize;
use std::sync::Arc;

/// Extension order is part of the precedence contract: for one name stem,
/// `.yaml` beats `.yml` beats `.json` beats `.properties`.
const EXTENSIONS: [&str; 4] = [".yaml", ".yml", ".json", ".properties"];

#[derive(Debug, Serialize, PartialEq)]
pub struct PropertySource {
    pub name: String,
    pub source: PropertyMap,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub name: String,
    pub profiles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub version: String,
    pub property_sources: Vec<PropertySource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-candidate read result. Splitting "the file simply is not there"
/// from real failures keeps the skip-vs-abort decision explicit.
enum ReadOutcome {
    Found(PropertyMap),
    Missing,
    Failed(ResolveError),
}

pub struct ConfigResolver {
    store: Arc<dyn RepositoryStore>,
    default_label: String,
}

impl ConfigResolver {
    pub fn new(store: Arc<dyn RepositoryStore>, default_label: impl Into<String>) -> Self {
        ConfigResolver {
            store,
            default_label: default_label.into(),
        }
    }

    /// Resolve the configuration for an (app, env, label) triple.
    ///
    /// Missing candidate files are skipped; any other failure aborts the
    /// resolution and yields a response with zero property sources and a
    /// generic error marker (details go to the log, not the wire). An empty
    /// property-source list is how "no configuration exists" is signalled.
    pub async fn load_config(&self, app: &str, env: &str, label: &str) -> ConfigResponse {
        let label = if label.is_empty() {
            self.default_label.as_str()
        } else {
            label
        };

        let mut response = ConfigResponse {
            name: app.to_string(),
            profiles: vec![env.to_string()],
            label: Some(label.to_string()),
            version: String::new(),
            property_sources: Vec::new(),
            error: None,
        };

        for candidate in candidates(app, env) {
            let relative = format!("{env}/{candidate}");
            match self.read_candidate(label, &relative).await {
                ReadOutcome::Missing => {
                    tracing::debug!(candidate = %relative, "candidate absent, skipping");
                }
                ReadOutcome::Found(source) => {
                    response.property_sources.push(PropertySource {
                        name: relative,
                        source,
                    });
                }
                ReadOutcome::Failed(err) => {
                    tracing::error!(
                        candidate = %relative,
                        label,
                        error = %err,
                        "aborting configuration resolution"
                    );
                    response.property_sources.clear();
                    response.error = Some("could not read configuration".to_string());
                    return response;
                }
            }
        }

        match self.store.commit_hash(label).await {
            Ok(hash) => response.version = hash,
            // Version is best-effort; the response stays usable without it.
            Err(err) => {
                tracing::warn!(label, error = %err, "could not resolve commit hash");
            }
        }

        response
    }

    async fn read_candidate(&self, label: &str, relative: &str) -> ReadOutcome {
        let bytes = match self.store.read_file(label, relative).await {
            Ok(bytes) => bytes,
            Err(StoreError::FileNotFound(_)) => return ReadOutcome::Missing,
            Err(err) => return ReadOutcome::Failed(err.into()),
        };

        match flatten::parse_file(&bytes, extension_of(relative)) {
            Ok(source) => ReadOutcome::Found(source),
            Err(err) => ReadOutcome::Failed(ResolveError::Parse {
                name: relative.to_string(),
                source: err,
            }),
        }
    }
}

/// Ordered candidate file names for (app, env): app-specific first, then
/// the environment-wide `application-{env}` group, then the env-independent
/// `application` defaults. De-duplicated so `app == "application"` cannot
/// produce doubled sources.
fn candidates(app: &str, env: &str) -> Vec<String> {
    let stems = [
        format!("{app}-{env}"),
        format!("application-{env}"),
        "application".to_string(),
    ];

    let mut out: Vec<String> = Vec::with_capacity(stems.len() * EXTENSIONS.len());
    for stem in &stems {
        for extension in EXTENSIONS {
            let name = format!("{stem}{extension}");
            if !out.contains(&name) {
                out.push(name);
            }
        }
    }
    out
}

fn extension_of(name: &str) -> &str {
    name.rfind('.').map(|idx| &name[idx..]).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::MemoryStore;

    fn resolver(store: MemoryStore) -> ConfigResolver {
        ConfigResolver::new(Arc::new(store), "main")
    }

    #[test]
    fn candidate_order_is_most_specific_first() {
        let names = candidates("myapp", "dev");
        assert_eq!(names.len(), 12);
        assert_eq!(names[0], "myapp-dev.yaml");
        assert_eq!(names[3], "myapp-dev.properties");
        assert_eq!(names[4], "application-dev.yaml");
        assert_eq!(names[8], "application.yaml");
    }

    #[test]
    fn candidates_deduplicate_for_the_application_app() {
        let names = candidates("application", "dev");
        assert_eq!(names.len(), 8);
        assert_eq!(names[0], "application-dev.yaml");
        assert_eq!(names[4], "application.yaml");
    }

    #[tokio::test]
    async fn app_specific_sources_come_before_generic_ones() {
        let store = MemoryStore::new();
        store.put_file("main", "dev/myapp-dev.yaml", b"server:\n  port: 1\n");
        store.put_file("main", "dev/application-dev.yaml", b"server:\n  port: 2\n");
        store.put_file("main", "dev/application.yaml", b"server:\n  port: 3\n");
        store.set_commit_hash("main", "abc123");

        let response = resolver(store).load_config("myapp", "dev", "").await;

        let names: Vec<&str> = response
            .property_sources
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(
            names,
            [
                "dev/myapp-dev.yaml",
                "dev/application-dev.yaml",
                "dev/application.yaml"
            ]
        );
        assert_eq!(response.version, "abc123");
        assert_eq!(response.label.as_deref(), Some("main"));
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn empty_label_uses_the_default_branch() {
        let store = MemoryStore::new();
        store.put_file("main", "dev/myapp-dev.json", br#"{"a": 1}"#);

        let response = resolver(store).load_config("myapp", "dev", "").await;
        assert_eq!(response.label.as_deref(), Some("main"));
        assert_eq!(response.property_sources.len(), 1);
    }

    #[tokio::test]
    async fn explicit_label_is_used_verbatim() {
        let store = MemoryStore::new();
        store.put_file("feature", "dev/myapp-dev.yaml", b"a: 1\n");

        let response = resolver(store).load_config("myapp", "dev", "feature").await;
        assert_eq!(response.label.as_deref(), Some("feature"));
        assert_eq!(response.property_sources.len(), 1);
    }

    #[tokio::test]
    async fn no_matching_files_yields_zero_sources() {
        let store = MemoryStore::new();
        store.set_commit_hash("main", "abc123");

        let response = resolver(store).load_config("ghost", "dev", "").await;
        assert!(response.property_sources.is_empty());
        assert!(response.error.is_none());
        // The commit hash is still attached even when nothing resolved.
        assert_eq!(response.version, "abc123");
    }

    #[tokio::test]
    async fn application_app_name_produces_each_source_once() {
        let store = MemoryStore::new();
        store.put_file("main", "dev/application-dev.yaml", b"a: 1\n");

        let response = resolver(store)
            .load_config("application", "dev", "")
            .await;
        assert_eq!(response.property_sources.len(), 1);
    }

    #[tokio::test]
    async fn parse_failure_aborts_with_empty_sources() {
        let store = MemoryStore::new();
        store.put_file("main", "dev/myapp-dev.yaml", b"a: 1\n");
        store.put_file("main", "dev/application-dev.json", b"{broken");

        let response = resolver(store).load_config("myapp", "dev", "").await;
        assert!(response.property_sources.is_empty());
        assert_eq!(
            response.error.as_deref(),
            Some("could not read configuration")
        );
    }

    #[tokio::test]
    async fn io_failure_aborts_with_empty_sources() {
        let store = MemoryStore::new();
        store.put_file("main", "dev/myapp-dev.yaml", b"a: 1\n");
        store.break_file("main", "dev/application-dev.yaml");

        let response = resolver(store).load_config("myapp", "dev", "").await;
        assert!(response.property_sources.is_empty());
        assert!(response.error.is_some());
    }

    #[tokio::test]
    async fn missing_commit_hash_leaves_version_empty() {
        let store = MemoryStore::new();
        store.put_file("main", "dev/myapp-dev.yaml", b"a: 1\n");

        let response = resolver(store).load_config("myapp", "dev", "").await;
        assert_eq!(response.property_sources.len(), 1);
        assert!(response.version.is_empty());
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn properties_candidates_resolve_too() {
        let store = MemoryStore::new();
        store.put_file("main", "dev/myapp-dev.properties", b"server.port=8080\n");

        let response = resolver(store).load_config("myapp", "dev", "").await;
        assert_eq!(response.property_sources.len(), 1);
        assert_eq!(
            response.property_sources[0].source.get("server.port"),
            Some(&serde_json::json!(8080))
        );
    }

    #[test]
    fn response_serializes_with_camel_case_wire_names() {
        let response = ConfigResponse {
            name: "myapp".to_string(),
            profiles: vec!["dev".to_string()],
            label: Some("main".to_string()),
            version: "abc".to_string(),
            property_sources: vec![],
            error: None,
        };
        let wire = serde_json::to_value(&response).expect("serialize");
        assert!(wire.get("propertySources").is_some());
        assert!(wire.get("error").is_none());
        assert_eq!(wire.get("label"), Some(&serde_json::json!("main")));
    }
}
