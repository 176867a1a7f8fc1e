// ABOUTME: Progress tracking for phased installs.
// ABOUTME: Counts completed steps and renders a fixed-width textual bar.

/// Number of cells in the rendered bar.
pub const BAR_WIDTH: usize = 30;

const FILLED: char = '█';
const EMPTY: char = '░';

/// Final marker recorded by [`Progress::finish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub success: bool,
    pub detail: String,
}

/// Step counters for one install run.
#[derive(Debug, Clone)]
pub struct Progress {
    total_steps: usize,
    current_step: usize,
    phase: String,
    action: String,
    completion: Option<Completion>,
}

impl Progress {
    pub fn new(total_steps: usize) -> Self {
        Self {
            total_steps,
            current_step: 0,
            phase: "Initializing".to_string(),
            action: "Starting installation".to_string(),
            completion: None,
        }
    }

    /// Move to the next step. The step count never passes the total.
    pub fn advance(&mut self, phase: &str, action: &str) {
        if self.current_step < self.total_steps {
            self.current_step += 1;
        } else {
            tracing::warn!(
                "progress advanced past {} total steps; holding at 100%",
                self.total_steps
            );
        }
        self.phase = phase.to_string();
        self.action = action.to_string();
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn phase(&self) -> &str {
        &self.phase
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn completion(&self) -> Option<&Completion> {
        self.completion.as_ref()
    }

    /// Whole percent complete, truncated. An empty run counts as complete.
    pub fn percentage(&self) -> usize {
        if self.total_steps == 0 {
            return 100;
        }
        self.current_step * 100 / self.total_steps
    }

    fn filled_cells(&self) -> usize {
        if self.total_steps == 0 {
            return BAR_WIDTH;
        }
        self.current_step * BAR_WIDTH / self.total_steps
    }

    /// `[██████░░░…] 20%`
    pub fn render_bar(&self) -> String {
        let filled = self.filled_cells();
        let bar: String = std::iter::repeat_n(FILLED, filled)
            .chain(std::iter::repeat_n(EMPTY, BAR_WIDTH - filled))
            .collect();
        format!("[{}] {}%", bar, self.percentage())
    }

    /// Bar plus current phase and action, for live redraw.
    pub fn status_line(&self) -> String {
        format!("{} | {}: {}", self.render_bar(), self.phase, self.action)
    }

    pub fn finish(&mut self, success: bool, detail: impl Into<String>) {
        self.completion = Some(Completion {
            success,
            detail: detail.into(),
        });
    }
}
