//! Content resolver: scans the templates root for chapters.
//!
//! Nothing here is cached; every call re-reads the filesystem, which keeps
//! the catalog consistent with whatever the user dropped into `templates/`
//! without a reload step. Two root layouts coexist:
//!
//! - legacy: `templates/chapter<N>[_suffix]/`
//! - current: `templates/<model>/<workflow>/`
//!
//! A root entry whose name starts with the literal `chapter` is legacy;
//! anything else is a model directory scanned one level deeper.

use std::path::Path;
use std::time::SystemTime;

use tracing::{debug, warn};

use lc_common::readers::{read_json_object, read_text_lenient};

use crate::error::AppError;
use crate::model::{ChapterDetail, ChapterMeta, ChapterRef, ChapterSummary, Enrichment};
use crate::progress::ProgressDoc;

const METADATA_FILE: &str = "metadata.json";
const EXERCISE_FILE: &str = "exercise.json";
const ANSWER_FILE: &str = "answer.json";
const PREVIEW_FILE: &str = "preview.png";
const LEGACY_PREFIX: &str = "chapter";

/// List every chapter under `templates_dir`.
///
/// Legacy entries come first, sorted by the leading numeric portion of the
/// directory name (non-numeric names sort last, stably); model/workflow
/// entries follow in filesystem enumeration order. Callers must not depend
/// on ordering across the two blocks. A missing root yields an empty list.
pub fn list_chapters(templates_dir: &Path, progress: &ProgressDoc) -> Vec<ChapterSummary> {
    let entries = match subdirectories(templates_dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %templates_dir.display(), error = %e, "templates root unreadable, empty catalog");
            return Vec::new();
        }
    };

    let (mut legacy, models): (Vec<String>, Vec<String>) = entries
        .into_iter()
        .partition(|name| name.starts_with(LEGACY_PREFIX));
    legacy.sort_by_key(|name| legacy_sort_key(name));

    let mut chapters = Vec::new();

    for name in legacy {
        let dir = templates_dir.join(&name);
        if !dir.join(METADATA_FILE).exists() {
            debug!(chapter = %name, "no metadata file, skipping");
            continue;
        }
        chapters.push(load_summary(&dir, ChapterRef::Legacy(name), progress));
    }

    for model in models {
        let model_dir = templates_dir.join(&model);
        let workflows = match subdirectories(&model_dir) {
            Ok(workflows) => workflows,
            Err(e) => {
                warn!(model = %model, error = %e, "model directory unreadable, skipping");
                continue;
            }
        };
        for workflow in workflows {
            let dir = model_dir.join(&workflow);
            if !dir.join(METADATA_FILE).exists() {
                debug!(model = %model, workflow = %workflow, "no metadata file, skipping");
                continue;
            }
            let chapter_ref = ChapterRef::Modeled {
                model: model.clone(),
                workflow,
            };
            chapters.push(load_summary(&dir, chapter_ref, progress));
        }
    }

    chapters
}

/// Resolve a single chapter to its detail document.
///
/// `preview_answer` forces inclusion of the answer workflow for a chapter
/// that is not completed yet; otherwise the answer stays withheld even when
/// the file exists.
pub fn get_chapter(
    templates_dir: &Path,
    chapter_ref: &ChapterRef,
    progress: &ProgressDoc,
    preview_answer: bool,
) -> Result<ChapterDetail, AppError> {
    let dir = chapter_ref.dir(templates_dir);
    if !dir.is_dir() {
        return Err(AppError::chapter_not_found());
    }

    let metadata_path = dir.join(METADATA_FILE);
    if !metadata_path.exists() {
        return Err(AppError::metadata_not_found());
    }
    // Listing degrades a broken metadata file to an empty one; a direct
    // lookup reports it, so the author sees the problem.
    let map = read_json_object(&metadata_path).map_err(|e| AppError::Decode(e.to_string()))?;

    let mut meta = ChapterMeta::from_map(map);
    backfill_model(&mut meta, chapter_ref);

    let id = chapter_ref.id();
    let completed = progress.is_completed(&id);

    let exercise_path = dir.join(EXERCISE_FILE);
    let exercise_workflow = if exercise_path.exists() {
        read_text_lenient(&exercise_path)
            .inspect_err(|e| warn!(chapter = %id, error = %e, "exercise workflow unreadable"))
            .ok()
    } else {
        None
    };

    let answer_path = dir.join(ANSWER_FILE);
    let answer_workflow = if (completed || preview_answer) && answer_path.exists() {
        read_text_lenient(&answer_path)
            .inspect_err(|e| warn!(chapter = %id, error = %e, "answer workflow unreadable"))
            .ok()
    } else {
        None
    };

    // Flags reflect sibling-file existence, like the listing path; an
    // unreadable workflow file still shows up in the flags.
    let enrichment = Enrichment {
        id,
        has_exercise: exercise_path.exists(),
        has_answer: answer_path.exists(),
        has_preview: dir.join(PREVIEW_FILE).exists(),
        completed,
        created_at: created_at_secs(&dir),
    };

    Ok(ChapterDetail {
        summary: ChapterSummary { meta, enrichment },
        exercise_workflow,
        answer_workflow,
    })
}

fn load_summary(dir: &Path, chapter_ref: ChapterRef, progress: &ProgressDoc) -> ChapterSummary {
    let id = chapter_ref.id();

    // A metadata file that defeats both decode attempts degrades to empty
    // metadata; the chapter still appears with its enrichment fields so one
    // corrupt file cannot hide a chapter from the catalog.
    let map = match read_json_object(&dir.join(METADATA_FILE)) {
        Ok(map) => map,
        Err(e) => {
            warn!(chapter = %id, error = %e, "metadata unreadable, listing with empty metadata");
            Default::default()
        }
    };
    let mut meta = ChapterMeta::from_map(map);
    backfill_model(&mut meta, &chapter_ref);

    let enrichment = Enrichment {
        completed: progress.is_completed(&id),
        has_exercise: dir.join(EXERCISE_FILE).exists(),
        has_answer: dir.join(ANSWER_FILE).exists(),
        has_preview: dir.join(PREVIEW_FILE).exists(),
        created_at: created_at_secs(dir),
        id,
    };

    ChapterSummary { meta, enrichment }
}

fn backfill_model(meta: &mut ChapterMeta, chapter_ref: &ChapterRef) {
    if meta.model.is_none() {
        meta.model = chapter_ref.model().map(str::to_string);
    }
}

/// Immediate subdirectory names of `dir`, in enumeration order.
fn subdirectories(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

/// Sort key for legacy names: the digits following the `chapter` prefix, up
/// to the first underscore. Names without a parseable number sort last.
fn legacy_sort_key(name: &str) -> u64 {
    name.strip_prefix(LEGACY_PREFIX)
        .map(|rest| rest.split('_').next().unwrap_or(rest))
        .and_then(|num| num.parse().ok())
        .unwrap_or(u64::MAX)
}

/// Directory creation time as Unix seconds, falling back to the modification
/// time on filesystems that do not record birth times.
fn created_at_secs(dir: &Path) -> Option<f64> {
    let meta = std::fs::metadata(dir).ok()?;
    let time = meta.created().or_else(|_| meta.modified()).ok()?;
    let secs = time.duration_since(SystemTime::UNIX_EPOCH).ok()?;
    Some(secs.as_secs_f64())
}
