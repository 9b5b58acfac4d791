use anyhow::{Context, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

use crate::util;

pub const IMAGE_EXTENSIONS: [&str; 3] = [".jpeg", ".jpg", ".png"];

/// Frames carry their capture index as `...RUN<n>.<ext>`.
const FRAME_NUMBER_PATTERN: &str = r"RUN(\d+)\.";

#[derive(Debug, Default)]
pub struct FrameScan {
    pub frames: Vec<String>,
    pub skipped_non_utf8: usize,
    pub dangling_links: Vec<PathBuf>,
}

pub fn is_image_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Number from the first `RUN<digits>.` match; `None` if absent or wider than u64.
pub fn frame_number(name: &str) -> Option<u64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(FRAME_NUMBER_PATTERN).expect("valid frame pattern"));
    re.captures(name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok())
}

/// Numbered frames first (ascending, ties by name), then unnumbered by name.
pub fn sort_frames(frames: &mut [String]) {
    frames.sort_by_cached_key(|name| {
        let number = frame_number(name);
        (number.is_none(), number, name.clone())
    });
}

pub fn collect_frames(run_dir: &Path) -> Result<FrameScan> {
    let mut scan = FrameScan::default();

    for entry in WalkDir::new(run_dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
    {
        let e = match entry {
            Ok(e) => e,
            Err(err) => match util::dangling_link(&err) {
                Some(path) => {
                    scan.dangling_links.push(path);
                    continue;
                }
                None => {
                    return Err(err)
                        .with_context(|| format!("failed to list run folder {:?}", run_dir))
                }
            },
        };
        if !e.file_type().is_file() {
            continue;
        }
        let Some(name) = util::utf8_file_name(e.path()) else {
            scan.skipped_non_utf8 += 1;
            continue;
        };
        if is_image_name(&name) {
            scan.frames.push(name);
        }
    }

    sort_frames(&mut scan.frames);
    Ok(scan)
}
