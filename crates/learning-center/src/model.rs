use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};

use crate::error::AppError;

/// Reference to a chapter, parsed once at the API boundary.
///
/// Two root layouts coexist under `templates/`: legacy `chapter<N>[_suffix]`
/// directories addressed by bare name, and `model/workflow` pairs. All
/// downstream code works on this variant, never on raw id strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChapterRef {
    Legacy(String),
    Modeled { model: String, workflow: String },
}

impl ChapterRef {
    /// Parse an id string: zero separators is legacy, exactly one is
    /// model/workflow, anything else is invalid. Empty or dot-only segments
    /// are rejected so an id can never escape the templates root.
    pub fn parse(id: &str) -> Result<Self, AppError> {
        let segments: Vec<&str> = id.split('/').collect();
        if segments
            .iter()
            .any(|s| s.is_empty() || *s == "." || *s == "..")
        {
            return Err(AppError::InvalidId(id.to_string()));
        }
        match segments.as_slice() {
            [name] => Ok(ChapterRef::Legacy(name.to_string())),
            [model, workflow] => Ok(ChapterRef::Modeled {
                model: model.to_string(),
                workflow: workflow.to_string(),
            }),
            _ => Err(AppError::InvalidId(id.to_string())),
        }
    }

    /// The string id this reference renders back to.
    pub fn id(&self) -> String {
        match self {
            ChapterRef::Legacy(name) => name.clone(),
            ChapterRef::Modeled { model, workflow } => format!("{model}/{workflow}"),
        }
    }

    /// The chapter directory under the templates root.
    pub fn dir(&self, templates_dir: &Path) -> PathBuf {
        match self {
            ChapterRef::Legacy(name) => templates_dir.join(name),
            ChapterRef::Modeled { model, workflow } => templates_dir.join(model).join(workflow),
        }
    }

    /// The model directory name, for metadata backfill.
    pub fn model(&self) -> Option<&str> {
        match self {
            ChapterRef::Legacy(_) => None,
            ChapterRef::Modeled { model, .. } => Some(model),
        }
    }
}

/// Chapter metadata as authored in `metadata.json`: a fixed record of the
/// fields the catalog understands plus an open map for everything else.
///
/// Construction is tolerant: a known key holding a non-string value is left
/// in `extra` instead of failing the whole document.
#[derive(Debug, Clone, Default)]
pub struct ChapterMeta {
    pub title: Option<String>,
    pub description: Option<String>,
    pub difficulty: Option<String>,
    pub purpose: Option<String>,
    pub model: Option<String>,
    pub extra: Map<String, Value>,
}

impl ChapterMeta {
    pub fn from_map(mut map: Map<String, Value>) -> Self {
        let mut take = |key: &str| match map.get(key) {
            Some(Value::String(_)) => match map.remove(key) {
                Some(Value::String(s)) => Some(s),
                _ => None,
            },
            _ => None,
        };
        let title = take("title");
        let description = take("description");
        let difficulty = take("difficulty");
        let purpose = take("purpose");
        let model = take("model");
        Self {
            title,
            description,
            difficulty,
            purpose,
            model,
            extra: map,
        }
    }

    fn to_map(&self) -> Map<String, Value> {
        let mut map = self.extra.clone();
        let knowns = [
            ("title", &self.title),
            ("description", &self.description),
            ("difficulty", &self.difficulty),
            ("purpose", &self.purpose),
            ("model", &self.model),
        ];
        for (key, value) in knowns {
            if let Some(value) = value {
                map.insert(key.to_string(), Value::String(value.clone()));
            }
        }
        map
    }
}

/// Fields computed at read time from the filesystem and progress store.
/// Kept separate from `ChapterMeta` and merged last at serialization time,
/// so authored content can never shadow them.
#[derive(Debug, Clone)]
pub struct Enrichment {
    pub id: String,
    pub has_exercise: bool,
    pub has_answer: bool,
    pub has_preview: bool,
    pub completed: bool,
    /// Directory creation time, seconds since the Unix epoch.
    pub created_at: Option<f64>,
}

/// One catalog entry: authored metadata plus computed enrichment.
#[derive(Debug, Clone)]
pub struct ChapterSummary {
    pub meta: ChapterMeta,
    pub enrichment: Enrichment,
}

impl ChapterSummary {
    /// Serialize to the wire object. Enrichment keys are inserted after the
    /// metadata map, overwriting any authored key of the same name.
    pub fn to_json(&self) -> Value {
        let mut map = self.meta.to_map();
        let e = &self.enrichment;
        map.insert("id".to_string(), json!(e.id));
        map.insert("has_exercise".to_string(), json!(e.has_exercise));
        map.insert("has_answer".to_string(), json!(e.has_answer));
        map.insert("has_preview".to_string(), json!(e.has_preview));
        map.insert("completed".to_string(), json!(e.completed));
        if let Some(created_at) = e.created_at {
            map.insert("created_at".to_string(), json!(created_at));
        }
        Value::Object(map)
    }
}

/// Chapter detail: the summary plus the raw workflow documents.
#[derive(Debug, Clone)]
pub struct ChapterDetail {
    pub summary: ChapterSummary,
    pub exercise_workflow: Option<String>,
    /// Withheld unless the chapter is completed or an answer preview was
    /// explicitly requested.
    pub answer_workflow: Option<String>,
}

impl ChapterDetail {
    pub fn to_json(&self) -> Value {
        json!({
            "metadata": self.summary.to_json(),
            "exercise_workflow": self.exercise_workflow,
            "answer_workflow": self.answer_workflow,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_legacy_id() {
        let r = ChapterRef::parse("chapter1_intro").expect("parse");
        assert_eq!(r, ChapterRef::Legacy("chapter1_intro".to_string()));
        assert_eq!(r.id(), "chapter1_intro");
        assert_eq!(r.model(), None);
    }

    #[test]
    fn parse_modeled_id() {
        let r = ChapterRef::parse("sdxl/txt2img").expect("parse");
        assert_eq!(
            r,
            ChapterRef::Modeled {
                model: "sdxl".to_string(),
                workflow: "txt2img".to_string()
            }
        );
        assert_eq!(r.id(), "sdxl/txt2img");
        assert_eq!(r.model(), Some("sdxl"));
    }

    #[test]
    fn too_many_separators_is_invalid() {
        assert!(matches!(
            ChapterRef::parse("a/b/c"),
            Err(AppError::InvalidId(_))
        ));
    }

    #[test]
    fn empty_and_dot_segments_are_invalid() {
        for id in ["", "/", "sdxl/", "/txt2img", "..", "../x", "sdxl/.."] {
            assert!(
                matches!(ChapterRef::parse(id), Err(AppError::InvalidId(_))),
                "{id:?} should be invalid"
            );
        }
    }

    #[test]
    fn dir_resolution_matches_layout() {
        let root = Path::new("/data/templates");
        assert_eq!(
            ChapterRef::parse("chapter2").unwrap().dir(root),
            root.join("chapter2")
        );
        assert_eq!(
            ChapterRef::parse("flux/inpaint").unwrap().dir(root),
            root.join("flux").join("inpaint")
        );
    }

    #[test]
    fn meta_keeps_unknown_and_mistyped_keys_in_extra() {
        let map = serde_json::from_str::<Map<String, Value>>(
            r#"{"title": "T", "difficulty": 3, "estimated_time": "10m"}"#,
        )
        .unwrap();
        let meta = ChapterMeta::from_map(map);
        assert_eq!(meta.title.as_deref(), Some("T"));
        assert_eq!(meta.difficulty, None);
        assert_eq!(meta.extra["difficulty"], 3);
        assert_eq!(meta.extra["estimated_time"], "10m");
    }

    #[test]
    fn enrichment_cannot_be_shadowed_by_authored_content() {
        let map = serde_json::from_str::<Map<String, Value>>(
            r#"{"title": "T", "completed": "yes!", "id": "spoofed"}"#,
        )
        .unwrap();
        let summary = ChapterSummary {
            meta: ChapterMeta::from_map(map),
            enrichment: Enrichment {
                id: "chapter1".to_string(),
                has_exercise: false,
                has_answer: false,
                has_preview: false,
                completed: false,
                created_at: Some(1_700_000_000.0),
            },
        };
        let value = summary.to_json();
        assert_eq!(value["id"], "chapter1");
        assert_eq!(value["completed"], false);
        assert_eq!(value["title"], "T");
        assert_eq!(value["created_at"], 1_700_000_000.0);
    }
}
