//! The knowledge document and typed views over its fragments.
//!
//! The document is kept as an opaque JSON tree. Topics are read lazily by
//! the flattener and the lookups; a missing topic or a fragment of the wrong
//! shape yields nothing rather than an error.

use std::time::Duration;

use mamaguide_core::error::{MamaGuideError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A loaded knowledge document, already unwrapped from its root key.
#[derive(Debug, Clone)]
pub struct KnowledgeDocument {
    root: Value,
}

impl KnowledgeDocument {
    /// Wrap a parsed document. When `root_key` is present at the top level,
    /// its value becomes the document root.
    pub fn from_value(value: Value, root_key: &str) -> Result<Self> {
        let root = match value {
            Value::Object(mut map) if !root_key.is_empty() && map.contains_key(root_key) => {
                map.remove(root_key).unwrap_or(Value::Null)
            }
            other => other,
        };

        if !root.is_object() {
            return Err(MamaGuideError::Knowledge(
                "knowledge document root is not an object".into(),
            ));
        }
        Ok(Self { root })
    }

    pub fn parse(json: &str, root_key: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value, root_key)
    }

    /// Load from a file path or an http(s) URL.
    pub async fn load(source: &str, root_key: &str) -> Result<Self> {
        if source.starts_with("http://") || source.starts_with("https://") {
            Self::fetch(source, root_key).await
        } else {
            let content = tokio::fs::read_to_string(source).await.map_err(|e| {
                MamaGuideError::Knowledge(format!("Failed to read {source}: {e}"))
            })?;
            Self::parse(&content, root_key)
        }
    }

    async fn fetch(url: &str, root_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MamaGuideError::Http(e.to_string()))?;

        let resp = client
            .get(url)
            .send()
            .await
            .map_err(|e| MamaGuideError::Http(format!("GET {url} failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(MamaGuideError::Http(format!("GET {url} returned {status}")));
        }

        let value: Value = resp
            .json()
            .await
            .map_err(|e| MamaGuideError::Knowledge(format!("Invalid JSON from {url}: {e}")))?;
        Self::from_value(value, root_key)
    }

    /// A top-level topic, if present and not null.
    pub fn topic(&self, key: &str) -> Option<&Value> {
        self.root.get(key).filter(|v| !v.is_null())
    }

    pub fn topic_keys(&self) -> Vec<&str> {
        self.root
            .as_object()
            .map(|map| map.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Deserialize a fragment into a typed view. Shape mismatches are logged
    /// and treated as absent.
    pub fn view<T: for<'de> Deserialize<'de>>(fragment: &Value) -> Option<T> {
        match T::deserialize(fragment) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::debug!("Skipping malformed knowledge fragment: {e}");
                None
            }
        }
    }
}

/// Accepts either a single string or a list of strings.
fn string_or_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => vec![],
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v,
    })
}

/// Accepts a string or a number; numbers keep their JSON spelling.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|scalar| match scalar {
        Scalar::Text(s) => s,
        Scalar::Number(n) => n.to_string(),
    }))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nutrient {
    pub nutrient: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub amount: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub unit: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightGainRecommendation {
    #[serde(rename = "prePregnancyBMI")]
    pub pre_pregnancy_bmi: String,
    #[serde(default)]
    pub bmi_range: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub recommended_gain: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionalRequirements {
    #[serde(default)]
    pub daily_macros: Vec<Nutrient>,
    #[serde(default)]
    pub weight_gain_recommendations: Vec<WeightGainRecommendation>,
}

/// A medication entry, annotated with the condition it is listed under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub drug: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub safety: Option<String>,
    #[serde(default)]
    pub safety_level: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// A warning sign, annotated with its category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Symptom {
    pub sign: String,
    #[serde(default)]
    pub urgency: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Symptom {
    pub fn is_high_severity(&self) -> bool {
        self.severity
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("high"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonSymptom {
    pub symptom: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekExercise {
    pub name: String,
    #[serde(default)]
    pub benefits: Option<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub instructions: Vec<String>,
}

/// Guidance for one 4-week range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekInfo {
    #[serde(default)]
    pub trimester: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub common_symptoms: Vec<CommonSymptom>,
    #[serde(default)]
    pub exercise: Option<WeekExercise>,
}

/// Guidance once the pregnancy passes 40 weeks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostTermInfo {
    #[serde(default)]
    pub timeline: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub what_to_expect: Vec<String>,
}

/// Result of a week lookup: a regular range or the post-term record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum WeekGuidance {
    Range {
        key: String,
        #[serde(flatten)]
        info: WeekInfo,
    },
    PostTerm {
        #[serde(flatten)]
        info: PostTermInfo,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaqEntry {
    pub question: String,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}
