//! Narrative fixture store for sandbox dispatch.
//!
//! A fixture document pairs fixture ids (matched against trigger reasons)
//! with complete narrative event responses. It is loaded once at startup and
//! shared read-only afterwards.
//!
//! # Format
//!
//! ```json
//! {
//!   "metadata": { "version": "1.0", "defaultMode": "sandbox" },
//!   "fixtures": [ { "id": "buttonburgh_market_intro", "response": { "title": "...", ... } } ]
//! }
//! ```
//!
//! A missing or malformed document is a hard error: sandbox mode has nothing
//! to serve without it.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use buttonburgh_domain::{DispatchMode, NarrativeEventResponse};
use serde::{Deserialize, Serialize};

use crate::infrastructure::ports::ConfigurationError;

/// Current fixture format version.
pub const FIXTURE_FORMAT_VERSION: &str = "1.0";

/// Where fixtures are looked for when nothing else is configured.
pub const DEFAULT_FIXTURE_PATH: &str = "fixtures/narrative_fixtures.json";

/// The default fixture document, compiled into the binary.
const BUNDLED_FIXTURES: &str = include_str!("../../fixtures/narrative_fixtures.json");

/// Supplies fixture text for a path when the file system has none.
pub type FixtureReader = Arc<dyn Fn(&Path) -> Option<String> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureMetadata {
    #[serde(default = "default_version")]
    pub version: String,
    pub default_mode: DispatchMode,
    /// Fixture served when no trigger matches; the first fixture otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_fixture: Option<String>,
}

fn default_version() -> String {
    FIXTURE_FORMAT_VERSION.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub id: String,
    pub response: NarrativeEventResponse,
}

#[derive(Debug, Deserialize)]
struct RawFixtureDocument {
    metadata: FixtureMetadata,
    #[serde(default)]
    fixtures: Vec<Fixture>,
}

/// Validated, read-only fixture set.
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureDocument {
    source: String,
    metadata: FixtureMetadata,
    fixtures: Vec<Fixture>,
}

impl FixtureDocument {
    /// Parse and validate fixture text. `source` names the resource in errors.
    pub fn from_json(source: &str, text: &str) -> Result<Self, ConfigurationError> {
        let raw: RawFixtureDocument =
            serde_json::from_str(text).map_err(|e| ConfigurationError::malformed(source, e))?;

        if raw.fixtures.is_empty() {
            return Err(ConfigurationError::FixtureEmpty {
                path: source.to_string(),
            });
        }

        // Ids are unique after slug normalisation, as `find` matches on slugs.
        let mut seen = HashSet::new();
        for fixture in &raw.fixtures {
            if !seen.insert(fixture_slug(&fixture.id)) {
                return Err(ConfigurationError::malformed(
                    source,
                    format!("duplicate fixture id '{}'", fixture.id),
                ));
            }
            fixture.response.validate().map_err(|e| {
                ConfigurationError::malformed(source, format!("fixture '{}': {}", fixture.id, e))
            })?;
        }

        if let Some(default_id) = &raw.metadata.default_fixture {
            if !raw.fixtures.iter().any(|fixture| &fixture.id == default_id) {
                return Err(ConfigurationError::malformed(
                    source,
                    format!("default fixture '{}' is not defined", default_id),
                ));
            }
        }

        Ok(Self {
            source: source.to_string(),
            metadata: raw.metadata,
            fixtures: raw.fixtures,
        })
    }

    /// Resource the document was loaded from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn metadata(&self) -> &FixtureMetadata {
        &self.metadata
    }

    pub fn default_mode(&self) -> DispatchMode {
        self.metadata.default_mode
    }

    pub fn fixtures(&self) -> &[Fixture] {
        &self.fixtures
    }

    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Fixture> {
        self.fixtures.iter().find(|fixture| fixture.id == id)
    }

    /// Find the fixture for a trigger reason.
    ///
    /// "Market Day", "market-day" and "market_day" all name the same fixture.
    pub fn find(&self, trigger_reason: &str) -> Option<&Fixture> {
        let wanted = fixture_slug(trigger_reason);
        self.fixtures
            .iter()
            .find(|fixture| fixture_slug(&fixture.id) == wanted)
    }

    /// Fixture served when the trigger reason matches nothing.
    pub fn default_fixture(&self) -> Option<&Fixture> {
        self.metadata
            .default_fixture
            .as_deref()
            .and_then(|id| self.get(id))
            .or_else(|| self.fixtures.first())
    }
}

fn fixture_slug(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Loads a fixture document from disk, with an optional fallback reader.
#[derive(Clone)]
pub struct FixtureStore {
    path: PathBuf,
    fallback: Option<FixtureReader>,
}

impl FixtureStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fallback: None,
        }
    }

    /// Default path, falling back to the document compiled into the binary.
    pub fn bundled() -> Self {
        Self::new(DEFAULT_FIXTURE_PATH)
            .with_fallback_reader(Arc::new(|_: &Path| Some(BUNDLED_FIXTURES.to_string())))
    }

    /// Consult `reader` when the file at the configured path does not exist.
    pub fn with_fallback_reader(mut self, reader: FixtureReader) -> Self {
        self.fallback = Some(reader);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<FixtureDocument, ConfigurationError> {
        let source = self.path.display().to_string();

        let (text, origin) = match std::fs::read_to_string(&self.path) {
            Ok(text) => (text, "file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let text = self
                    .fallback
                    .as_ref()
                    .and_then(|reader| reader(&self.path))
                    .ok_or_else(|| ConfigurationError::FixtureMissing {
                        path: source.clone(),
                    })?;
                (text, "fallback")
            }
            Err(e) => {
                return Err(ConfigurationError::FixtureUnreadable {
                    path: source,
                    reason: e.to_string(),
                })
            }
        };

        let document = FixtureDocument::from_json(&source, &text)?;
        tracing::info!(
            path = %source,
            origin,
            fixtures = document.len(),
            version = %document.metadata().version,
            default_mode = %document.default_mode(),
            "Loaded narrative fixtures"
        );
        Ok(document)
    }
}
