// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal (spinner), quiet (CI), and JSON output modes.

use crate::config::Phase;
use crate::install::{InstallState, Reporter};
use crate::progress::Progress;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputMode {
    /// Human-friendly output with a live progress line
    #[default]
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
    spinner: Option<ProgressBar>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
            spinner: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn duration(&self) -> Option<f64> {
        self.start_time.map(|_| self.elapsed_secs())
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            self.println(&message.cyan().to_string());
        }
    }

    /// Print a warning (suppressed in json mode).
    pub fn warning(&self, message: &str) {
        if self.mode != OutputMode::Json {
            eprintln!("{}", message.yellow());
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{} ({:.1}s)", message.green(), elapsed);
                } else {
                    println!("{}", message.green());
                }
            }
            OutputMode::Quiet => println!("{message}"),
            OutputMode::Json => emit(&JsonEvent {
                event: "success",
                message: Some(message),
                duration_secs: self.duration(),
                ..Default::default()
            }),
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => eprintln!("{} {}", "Error:".red().bold(), message),
            OutputMode::Quiet => eprintln!("Error: {message}"),
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "error",
                    message: Some(message),
                    duration_secs: self.duration(),
                    ..Default::default()
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    eprintln!("{json}");
                }
            }
        }
    }

    /// Print above the live spinner without tearing it.
    fn println(&self, line: &str) {
        match &self.spinner {
            Some(spinner) => spinner.suspend(|| println!("{line}")),
            None => println!("{line}"),
        }
    }

    fn start_spinner(&mut self, line: String) {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(line);
        spinner.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(spinner);
    }
}

impl Reporter for Output {
    fn started(&mut self, progress: &Progress) {
        self.start_timer();
        match self.mode {
            OutputMode::Normal => self.start_spinner(format!(" {}", progress.status_line())),
            OutputMode::Quiet => {}
            OutputMode::Json => emit(&JsonEvent {
                event: "started",
                total_steps: Some(progress.total_steps()),
                ..Default::default()
            }),
        }
    }

    fn advanced(&mut self, progress: &Progress) {
        match self.mode {
            OutputMode::Normal => {
                if let Some(spinner) = &self.spinner {
                    spinner.set_message(format!(" {}", progress.status_line()));
                }
            }
            OutputMode::Quiet => {}
            OutputMode::Json => emit(&JsonEvent {
                event: "step",
                step: Some(progress.current_step()),
                total_steps: Some(progress.total_steps()),
                percent: Some(progress.percentage()),
                phase: Some(progress.phase()),
                command: Some(progress.action()),
                ..Default::default()
            }),
        }
    }

    fn command_output(&mut self, phase: Phase, command: &str, output: &str) {
        match self.mode {
            OutputMode::Normal => self.println(&format!(
                "{} {}\n{}",
                format!("[{phase}]").dimmed(),
                format!("Command '{command}' output:").bold(),
                output.trim_end()
            )),
            OutputMode::Quiet => {}
            OutputMode::Json => emit(&JsonEvent {
                event: "output",
                phase: Some(phase.name()),
                command: Some(command),
                output: Some(output),
                ..Default::default()
            }),
        }
    }

    fn finished(&mut self, state: InstallState, progress: &Progress) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
        let detail = progress.completion().map(|c| c.detail.as_str());

        match self.mode {
            OutputMode::Normal => {
                let line = final_bar(state, progress);
                if state == InstallState::Succeeded {
                    println!("{line}");
                } else {
                    eprintln!("{line}");
                }
            }
            OutputMode::Quiet => {}
            OutputMode::Json => emit(&JsonEvent {
                event: "finished",
                state: Some(state),
                step: Some(progress.current_step()),
                total_steps: Some(progress.total_steps()),
                message: detail,
                duration_secs: self.duration(),
                ..Default::default()
            }),
        }
    }
}

/// Final bar for normal mode. The outcome message itself is printed once by
/// the caller, so this only shows where the run stopped.
fn final_bar(state: InstallState, progress: &Progress) -> String {
    let bar = progress.render_bar();
    let stopped_at = format!("{}: {}", progress.phase(), progress.action()).dimmed();
    match state {
        InstallState::Succeeded => bar.green().to_string(),
        InstallState::Cancelled => format!("{} {}", bar.yellow(), stopped_at),
        _ => format!("{} {}", bar.red(), stopped_at),
    }
}

fn emit(event: &JsonEvent<'_>) {
    if let Ok(json) = serde_json::to_string(event) {
        println!("{json}");
    }
}

#[derive(Serialize, Default)]
struct JsonEvent<'a> {
    event: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<InstallState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    step: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_steps: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    percent: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phase: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}
