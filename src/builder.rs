use anyhow::Result;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::frames;
use crate::manifest::{self, Manifest, RunEntry};
use crate::progress::{BuildSummary, ProgressConfig, ProgressReporter};
use crate::stages;
use crate::util;

pub const DEFAULT_BASE_DIR: &str = "public/example";

#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub base_dir: PathBuf,
    pub output: PathBuf,
    /// Renders frames as `<prefix>/<run>/<file>` instead of the bare file name.
    pub frame_prefix: Option<String>,
    /// Empty means every run folder.
    pub only_runs: Vec<String>,
}

impl BuildConfig {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            output: base_dir.join(manifest::MANIFEST_FILE_NAME),
            base_dir,
            frame_prefix: None,
            only_runs: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
struct BuildCounts {
    frames: usize,
    stages: usize,
    skipped_lines: usize,
}

/// Scans everything first and writes once at the end, so any error leaves
/// an existing manifest untouched.
pub fn generate_manifest(
    config: &BuildConfig,
    progress_cfg: ProgressConfig,
) -> Result<BuildSummary> {
    let mut progress = ProgressReporter::new("manifest", progress_cfg);
    let (manifest, counts) = build_manifest(config, &mut progress)?;

    progress.set_stage("writing manifest");
    manifest::write_manifest(&config.output, &manifest)?;
    progress.log(format!("wrote {:?}", config.output));

    let outcome = progress.finish("manifest complete");
    Ok(BuildSummary {
        base_dir: config.base_dir.clone(),
        manifest_path: config.output.clone(),
        run_count: manifest.len(),
        frame_count: counts.frames,
        stage_count: counts.stages,
        skipped_lines: counts.skipped_lines,
        elapsed: outcome.elapsed,
        warning_count: outcome.warning_count,
        warnings: outcome.warnings,
    })
}

fn build_manifest(
    config: &BuildConfig,
    progress: &mut ProgressReporter,
) -> Result<(Manifest, BuildCounts)> {
    progress.set_stage("scanning runs");
    let runs = enumerate_runs(config, progress)?;
    progress.set_total_runs(runs.len() as u64);

    let mut manifest = Manifest::new();
    let mut counts = BuildCounts::default();

    progress.set_stage("collecting frames and stages");
    for name in runs {
        let entry = build_run(config, &name, progress, &mut counts)?;
        manifest.insert(name.clone(), entry);
        progress.inc_run(&name);
    }

    Ok((manifest, counts))
}

fn enumerate_runs(
    config: &BuildConfig,
    progress: &mut ProgressReporter,
) -> Result<Vec<String>> {
    util::ensure_base_dir(&config.base_dir)?;
    let dirs = util::list_child_dirs(&config.base_dir)?;
    for path in &dirs.skipped_non_utf8 {
        progress.warn(format!("skipping run folder with non UTF-8 name: {:?}", path));
    }
    for path in &dirs.dangling_links {
        progress.warn(format!("skipping broken symlink {:?}", path));
    }

    if config.only_runs.is_empty() {
        return Ok(dirs.names);
    }

    let wanted: BTreeSet<&str> = config.only_runs.iter().map(String::as_str).collect();
    for name in &wanted {
        if !dirs.names.iter().any(|n| n == name) {
            progress.warn(format!(
                "requested run {:?} not found under {:?}",
                name, config.base_dir
            ));
        }
    }
    Ok(dirs
        .names
        .into_iter()
        .filter(|n| wanted.contains(n.as_str()))
        .collect())
}

fn build_run(
    config: &BuildConfig,
    name: &str,
    progress: &mut ProgressReporter,
    counts: &mut BuildCounts,
) -> Result<RunEntry> {
    let scan = frames::collect_frames(&config.base_dir.join(name))?;
    if scan.skipped_non_utf8 > 0 {
        progress.warn(format!(
            "run {}: skipped {} file(s) with non UTF-8 names",
            name, scan.skipped_non_utf8
        ));
    }
    for path in &scan.dangling_links {
        progress.warn(format!("run {}: skipping broken symlink {:?}", name, path));
    }

    let phases = stages::phases_path(&config.base_dir, name);
    let parsed = stages::parse_stages_file(&phases)?;
    if !parsed.skipped_lines.is_empty() {
        progress.warn(format!(
            "{}: skipped {} line(s) with fewer than 3 fields (lines {})",
            display_name(&phases),
            parsed.skipped_lines.len(),
            join_numbers(&parsed.skipped_lines)
        ));
    }

    counts.frames += scan.frames.len();
    counts.stages += parsed.stages.len();
    counts.skipped_lines += parsed.skipped_lines.len();

    let frames = match config.frame_prefix.as_deref() {
        Some(prefix) => scan
            .frames
            .into_iter()
            .map(|f| format!("{}/{}/{}", prefix.trim_end_matches('/'), name, f))
            .collect(),
        None => scan.frames,
    };

    Ok(RunEntry {
        folder: name.to_string(),
        frames,
        stages: parsed.stages,
    })
}

fn display_name(p: &Path) -> String {
    util::utf8_file_name(p).unwrap_or_else(|| p.display().to_string())
}

fn join_numbers(v: &[usize]) -> String {
    v.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(",")
}
