use anyhow::{bail, Context, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::manifest::{self, RunEntry};
use crate::progress::{ProgressConfig, ProgressReporter, VerifySummary};

#[derive(Debug, Default)]
pub struct ChildDirs {
    pub names: Vec<String>,
    pub skipped_non_utf8: Vec<PathBuf>,
    pub dangling_links: Vec<PathBuf>,
}

pub fn utf8_file_name(p: &Path) -> Option<String> {
    p.file_name().and_then(|s| s.to_str()).map(str::to_string)
}

pub fn ensure_base_dir(base_dir: &Path) -> Result<()> {
    let meta = std::fs::metadata(base_dir)
        .with_context(|| format!("cannot access base directory {:?}", base_dir))?;
    if !meta.is_dir() {
        bail!("base directory {:?} is not a directory", base_dir);
    }
    Ok(())
}

/// Path of a symlink below the walk root whose target is gone. Any other
/// walk error, including one on the root itself, is a real listing failure.
pub fn dangling_link(err: &walkdir::Error) -> Option<PathBuf> {
    if err.depth() == 0 {
        return None;
    }
    let io = err.io_error()?;
    if io.kind() != std::io::ErrorKind::NotFound {
        return None;
    }
    let path = err.path()?;
    let meta = std::fs::symlink_metadata(path).ok()?;
    if meta.file_type().is_symlink() {
        Some(path.to_path_buf())
    } else {
        None
    }
}

/// Direct child directories of `dir` (symlinks followed), sorted by name.
pub fn list_child_dirs(dir: &Path) -> Result<ChildDirs> {
    let mut out = ChildDirs::default();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let e = match entry {
            Ok(e) => e,
            Err(err) => match dangling_link(&err) {
                Some(path) => {
                    out.dangling_links.push(path);
                    continue;
                }
                None => return Err(err).with_context(|| format!("failed to list {:?}", dir)),
            },
        };
        if !e.file_type().is_dir() {
            continue;
        }
        match utf8_file_name(e.path()) {
            Some(name) => out.names.push(name),
            None => out.skipped_non_utf8.push(e.path().to_path_buf()),
        }
    }
    out.names.sort();
    Ok(out)
}

/// Writes through a sibling temp file so readers never see a truncated file.
pub fn write_replace(path: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = utf8_file_name(path).unwrap_or_else(|| "manifest".to_string());
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));
    if let Err(err) = std::fs::write(&tmp, bytes) {
        let _ = std::fs::remove_file(&tmp);
        return Err(err).with_context(|| format!("failed to write {:?}", tmp));
    }
    if let Err(err) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(err).with_context(|| format!("failed to move {:?} into place", tmp));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct VerifyConfig {
    pub base_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub frame_prefix: Option<String>,
}

/// Checks that every run and frame named by the manifest exists on disk.
pub fn verify_manifest(
    config: &VerifyConfig,
    progress_cfg: ProgressConfig,
) -> Result<VerifySummary> {
    ensure_base_dir(&config.base_dir)?;
    let manifest = manifest::read_manifest(&config.manifest_path)?;

    let mut progress = ProgressReporter::new("verify", progress_cfg);
    progress.set_total_runs(manifest.len() as u64);
    progress.set_stage("checking runs");

    let mut checked_frames = 0usize;
    let mut checked_stages = 0usize;

    for (name, run) in &manifest {
        checked_frames += verify_run(config, name, run)?;
        for stage in &run.stages {
            if stage.start_frame > stage.end_frame {
                progress.warn(format!(
                    "run {}: stage {:?} starts after it ends ({} > {})",
                    name, stage.name, stage.start_frame, stage.end_frame
                ));
            }
        }
        checked_stages += run.stages.len();
        progress.inc_run(name);
    }

    progress.set_stage("checking for unlisted runs");
    let listed: BTreeSet<&str> = manifest.keys().map(String::as_str).collect();
    let on_disk = list_child_dirs(&config.base_dir)?;
    for name in &on_disk.names {
        if !listed.contains(name.as_str()) {
            progress.warn(format!("run folder {:?} is not in the manifest", name));
        }
    }

    let outcome = progress.finish("verify complete");
    Ok(VerifySummary {
        manifest_path: config.manifest_path.clone(),
        checked_runs: manifest.len(),
        checked_frames,
        checked_stages,
        elapsed: outcome.elapsed,
        warning_count: outcome.warning_count,
        warnings: outcome.warnings,
    })
}

fn verify_run(config: &VerifyConfig, name: &str, run: &RunEntry) -> Result<usize> {
    if run.folder != name {
        bail!("run {:?} lists folder {:?}", name, run.folder);
    }
    let run_dir = config.base_dir.join(name);
    if !run_dir.is_dir() {
        bail!("Missing run dir: {:?}", run_dir);
    }

    let prefix = config
        .frame_prefix
        .as_deref()
        .map(|p| format!("{}/{}/", p.trim_end_matches('/'), name));

    for frame in &run.frames {
        let file_name = match &prefix {
            Some(prefix) => match frame.strip_prefix(prefix.as_str()) {
                Some(rest) => rest,
                None => bail!("run {}: frame {:?} does not start with {:?}", name, frame, prefix),
            },
            None => frame.as_str(),
        };
        let path = run_dir.join(file_name);
        if !path.is_file() {
            bail!("Missing frame: {:?}", path);
        }
    }
    Ok(run.frames.len())
}
