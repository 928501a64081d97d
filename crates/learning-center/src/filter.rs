//! Catalog filtering.
//!
//! Pure and order-preserving: a chapter survives iff it satisfies every
//! supplied criterion (logical AND). An omitted or empty-string criterion is
//! always satisfied.

use serde::Deserialize;

use crate::model::ChapterSummary;

/// Filter criteria, straight from the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterCriteria {
    /// Case-insensitive substring match against title, description, or id.
    pub search: Option<String>,
    /// Case-insensitive equality against the corresponding metadata field;
    /// an absent field compares as the empty string.
    pub difficulty: Option<String>,
    pub purpose: Option<String>,
    pub model: Option<String>,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        [&self.search, &self.difficulty, &self.purpose, &self.model]
            .iter()
            .all(|c| is_blank(c))
    }
}

/// Apply `criteria` to `chapters`, keeping input order.
pub fn apply(chapters: Vec<ChapterSummary>, criteria: &FilterCriteria) -> Vec<ChapterSummary> {
    if criteria.is_empty() {
        return chapters;
    }
    chapters
        .into_iter()
        .filter(|chapter| matches(chapter, criteria))
        .collect()
}

fn matches(chapter: &ChapterSummary, criteria: &FilterCriteria) -> bool {
    if let Some(term) = active(&criteria.search) {
        let term = term.to_lowercase();
        let hit = [
            chapter.meta.title.as_deref(),
            chapter.meta.description.as_deref(),
            Some(chapter.enrichment.id.as_str()),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&term));
        if !hit {
            return false;
        }
    }

    field_matches(&criteria.difficulty, chapter.meta.difficulty.as_deref())
        && field_matches(&criteria.purpose, chapter.meta.purpose.as_deref())
        && field_matches(&criteria.model, chapter.meta.model.as_deref())
}

fn field_matches(criterion: &Option<String>, field: Option<&str>) -> bool {
    match active(criterion) {
        None => true,
        Some(wanted) => field.unwrap_or("").to_lowercase() == wanted.to_lowercase(),
    }
}

fn active(criterion: &Option<String>) -> Option<&str> {
    criterion.as_deref().filter(|s| !s.is_empty())
}

fn is_blank(criterion: &Option<String>) -> bool {
    active(criterion).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChapterMeta, Enrichment};

    fn chapter(id: &str, title: &str, difficulty: &str, model: &str) -> ChapterSummary {
        ChapterSummary {
            meta: ChapterMeta {
                title: Some(title.to_string()),
                description: Some(format!("about {title}")),
                difficulty: (!difficulty.is_empty()).then(|| difficulty.to_string()),
                purpose: None,
                model: (!model.is_empty()).then(|| model.to_string()),
                extra: Default::default(),
            },
            enrichment: Enrichment {
                id: id.to_string(),
                has_exercise: false,
                has_answer: false,
                has_preview: false,
                completed: false,
                created_at: None,
            },
        }
    }

    fn fixture() -> Vec<ChapterSummary> {
        vec![
            chapter("chapter1_intro", "Getting Started", "beginner", ""),
            chapter("sdxl/txt2img", "Text To Image", "beginner", "sdxl"),
            chapter("sdxl/inpaint", "Inpainting", "advanced", "sdxl"),
            chapter("flux/txt2img", "Flux Basics", "beginner", "flux"),
        ]
    }

    fn ids(chapters: &[ChapterSummary]) -> Vec<&str> {
        chapters.iter().map(|c| c.enrichment.id.as_str()).collect()
    }

    #[test]
    fn empty_criteria_keep_everything_in_order() {
        let out = apply(fixture(), &FilterCriteria::default());
        assert_eq!(
            ids(&out),
            vec!["chapter1_intro", "sdxl/txt2img", "sdxl/inpaint", "flux/txt2img"]
        );
    }

    #[test]
    fn empty_string_criteria_are_ignored() {
        let criteria = FilterCriteria {
            search: Some(String::new()),
            difficulty: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(apply(fixture(), &criteria).len(), 4);
    }

    #[test]
    fn search_matches_title_description_or_id_case_insensitively() {
        let by_title = apply(
            fixture(),
            &FilterCriteria {
                search: Some("fLuX".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(ids(&by_title), vec!["flux/txt2img"]);

        let by_id = apply(
            fixture(),
            &FilterCriteria {
                search: Some("inpaint".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(ids(&by_id), vec!["sdxl/inpaint"]);
    }

    #[test]
    fn conjunction_equals_intersection_of_single_filters() {
        let difficulty_only = FilterCriteria {
            difficulty: Some("beginner".to_string()),
            ..Default::default()
        };
        let model_only = FilterCriteria {
            model: Some("sdxl".to_string()),
            ..Default::default()
        };
        let both = FilterCriteria {
            difficulty: Some("beginner".to_string()),
            model: Some("sdxl".to_string()),
            ..Default::default()
        };

        let a = ids(&apply(fixture(), &difficulty_only))
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        let b = ids(&apply(fixture(), &model_only))
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        let expected: Vec<String> = a.into_iter().filter(|id| b.contains(id)).collect();

        let combined = apply(fixture(), &both);
        assert_eq!(ids(&combined), expected.iter().map(String::as_str).collect::<Vec<_>>());
        assert_eq!(ids(&combined), vec!["sdxl/txt2img"]);
    }

    #[test]
    fn absent_field_only_matches_empty_filter_value() {
        let wanting_model = FilterCriteria {
            model: Some("sdxl".to_string()),
            ..Default::default()
        };
        let out = apply(fixture(), &wanting_model);
        assert!(ids(&out).iter().all(|id| id.starts_with("sdxl/")));
    }

    #[test]
    fn equality_filters_are_exact_not_substring() {
        let criteria = FilterCriteria {
            difficulty: Some("begin".to_string()),
            ..Default::default()
        };
        assert!(apply(fixture(), &criteria).is_empty());
    }
}
