use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::{Duration, Instant};

const MAX_STORED_WARNINGS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lower")]
pub enum ProgressMode {
    Auto,
    Rich,
    Plain,
    Quiet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedProgressMode {
    Rich,
    Plain,
    Quiet,
}

#[derive(Debug, Clone, Copy)]
pub struct ProgressConfig {
    pub mode: ProgressMode,
    plain_interval: Duration,
    tty_override: Option<bool>,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            mode: ProgressMode::Auto,
            plain_interval: Duration::from_secs(2),
            tty_override: None,
        }
    }
}

impl ProgressConfig {
    pub fn new(mode: ProgressMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub fn with_tty_override(mut self, is_tty: bool) -> Self {
        self.tty_override = Some(is_tty);
        self
    }

    pub fn resolve_mode(self) -> ResolvedProgressMode {
        self.mode.resolve(
            self.tty_override
                .unwrap_or_else(|| std::io::stderr().is_terminal()),
        )
    }
}

impl ProgressMode {
    fn resolve(self, stderr_is_tty: bool) -> ResolvedProgressMode {
        match self {
            ProgressMode::Auto => {
                if stderr_is_tty {
                    ResolvedProgressMode::Rich
                } else {
                    ResolvedProgressMode::Plain
                }
            }
            ProgressMode::Rich => ResolvedProgressMode::Rich,
            ProgressMode::Plain => ResolvedProgressMode::Plain,
            ProgressMode::Quiet => ResolvedProgressMode::Quiet,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub base_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub run_count: usize,
    pub frame_count: usize,
    pub stage_count: usize,
    pub skipped_lines: usize,
    pub elapsed: Duration,
    pub warning_count: usize,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct VerifySummary {
    pub manifest_path: PathBuf,
    pub checked_runs: usize,
    pub checked_frames: usize,
    pub checked_stages: usize,
    pub elapsed: Duration,
    pub warning_count: usize,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ProgressOutcome {
    pub elapsed: Duration,
    pub warning_count: usize,
    pub warnings: Vec<String>,
}

/// Status output for one batch pass over the runs. Everything goes to stderr
/// so stdout stays reserved for summaries.
pub struct ProgressReporter {
    label: String,
    mode: ResolvedProgressMode,
    plain_interval: Duration,
    bar: Option<ProgressBar>,
    started: Instant,
    last_plain_emit: Option<Instant>,
    stage: String,
    total_runs: u64,
    processed_runs: u64,
    warning_count: usize,
    warnings: Vec<String>,
    finalized: bool,
}

impl ProgressReporter {
    pub fn new(label: impl Into<String>, config: ProgressConfig) -> Self {
        let label = label.into();
        let mode = config.resolve_mode();
        let bar = if mode == ResolvedProgressMode::Rich {
            Some(rich_bar(&label))
        } else {
            None
        };

        Self {
            label,
            mode,
            plain_interval: config.plain_interval,
            bar,
            started: Instant::now(),
            last_plain_emit: None,
            stage: "starting".to_string(),
            total_runs: 0,
            processed_runs: 0,
            warning_count: 0,
            warnings: Vec::new(),
            finalized: false,
        }
    }

    pub fn set_total_runs(&mut self, total_runs: u64) {
        self.total_runs = total_runs;
        if let Some(bar) = &self.bar {
            bar.set_length(total_runs);
        }
    }

    pub fn set_stage(&mut self, stage: impl Into<String>) {
        self.stage = stage.into();
        match self.mode {
            ResolvedProgressMode::Rich => self.render_rich(),
            ResolvedProgressMode::Plain => self.render_plain(),
            ResolvedProgressMode::Quiet => {}
        }
    }

    /// Marks one run as done; `run` is shown as the current item.
    pub fn inc_run(&mut self, run: &str) {
        self.processed_runs = self.processed_runs.saturating_add(1);
        match self.mode {
            ResolvedProgressMode::Rich => {
                if let Some(bar) = &self.bar {
                    bar.set_position(self.processed_runs);
                    bar.set_message(format!("stage={} run={}", self.stage, run));
                }
            }
            ResolvedProgressMode::Plain => {
                let due = self
                    .last_plain_emit
                    .map(|at| at.elapsed() >= self.plain_interval)
                    .unwrap_or(true);
                if due {
                    self.render_plain();
                }
            }
            ResolvedProgressMode::Quiet => {}
        }
    }

    pub fn log(&self, message: impl Into<String>) {
        self.emit_message("INFO", &message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.emit_message("WARN", &message);
        self.warning_count += 1;
        if self.warnings.len() >= MAX_STORED_WARNINGS {
            self.warnings.remove(0);
        }
        self.warnings.push(message);
    }

    pub fn finish(mut self, final_message: impl Into<String>) -> ProgressOutcome {
        self.finalize(Some(final_message.into()))
    }

    fn render_rich(&self) {
        if let Some(bar) = &self.bar {
            bar.set_message(format!("stage={}", self.stage));
        }
    }

    fn render_plain(&mut self) {
        self.last_plain_emit = Some(Instant::now());
        eprintln!(
            "[PROGRESS] {} elapsed={} stage={} runs={} / {}",
            self.label,
            format_duration(self.started.elapsed()),
            self.stage,
            self.processed_runs,
            self.total_runs,
        );
    }

    fn emit_message(&self, level: &str, message: &str) {
        match self.mode {
            ResolvedProgressMode::Quiet => {}
            ResolvedProgressMode::Plain => {
                eprintln!("[{}] {}: {}", level, self.label, message);
            }
            ResolvedProgressMode::Rich => {
                let line = format!("[{}] {}: {}", level, self.label, message);
                match &self.bar {
                    Some(bar) => bar.println(line),
                    None => eprintln!("{}", line),
                }
            }
        }
    }

    fn finalize(&mut self, final_message: Option<String>) -> ProgressOutcome {
        if !self.finalized {
            self.finalized = true;
            match self.mode {
                ResolvedProgressMode::Quiet => {}
                ResolvedProgressMode::Plain => {
                    self.render_plain();
                    if let Some(msg) = final_message.as_deref() {
                        eprintln!("[DONE] {}: {}", self.label, msg);
                    }
                }
                ResolvedProgressMode::Rich => {
                    if let Some(bar) = &self.bar {
                        match final_message {
                            Some(msg) => bar.finish_with_message(msg),
                            None => bar.finish_and_clear(),
                        }
                    }
                }
            }
        }

        ProgressOutcome {
            elapsed: self.started.elapsed(),
            warning_count: self.warning_count,
            warnings: self.warnings.clone(),
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        // Error paths drop the reporter without finish(); clear the bar.
        let _ = self.finalize(None);
    }
}

fn rich_bar(label: &str) -> ProgressBar {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {wide_bar:.cyan/blue} {pos}/{len} runs | {msg}",
        )
        .expect("valid progress template"),
    );
    bar.set_message(format!("{} starting", label));
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    if h > 0 {
        format!("{:02}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}
