use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::manifest::Stage;

pub const PHASES_SUFFIX: &str = "_phases.csv";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StageParse {
    pub stages: Vec<Stage>,
    /// 1-based line numbers of non-empty lines with fewer than three fields.
    pub skipped_lines: Vec<usize>,
}

pub fn phases_path(base_dir: &Path, run_name: &str) -> PathBuf {
    base_dir.join(format!("{}{}", run_name, PHASES_SUFFIX))
}

/// Missing annotation file means "no stages", not an error.
pub fn parse_stages_file(path: &Path) -> Result<StageParse> {
    if !path.exists() {
        return Ok(StageParse::default());
    }
    let file = File::open(path).with_context(|| format!("failed to open {:?}", path))?;
    parse_stage_lines(BufReader::new(file))
        .with_context(|| format!("invalid stage annotations in {:?}", path))
}

pub fn parse_stage_lines(reader: impl BufRead) -> Result<StageParse> {
    let mut out = StageParse::default();

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.with_context(|| format!("failed to read line {}", line_no))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split(',').collect();
        if parts.len() < 3 {
            out.skipped_lines.push(line_no);
            continue;
        }

        out.stages.push(Stage {
            name: parts[0].to_string(),
            start_frame: parse_frame_index(parts[1], "startFrame", line_no)?,
            end_frame: parse_frame_index(parts[2], "endFrame", line_no)?,
        });
    }

    Ok(out)
}

fn parse_frame_index(raw: &str, field: &str, line_no: usize) -> Result<i64> {
    match raw.trim().parse::<i64>() {
        Ok(v) => Ok(v),
        Err(_) => bail!(
            "line {}: {} must be a 64-bit signed integer, got {:?}",
            line_no,
            field,
            raw
        ),
    }
}
