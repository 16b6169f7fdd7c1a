//! Recording UI for tests.
//!
//! ```
//! use overcast::ui::{MockUI, Shown, UserInterface};
//!
//! let mut ui = MockUI::new();
//! ui.message("Provisioning web");
//! ui.success("Deployed");
//!
//! assert!(ui.has(Shown::Message, "web"));
//! assert_eq!(ui.shown(Shown::Success), vec!["Deployed"]);
//! ```

use std::sync::{Arc, Mutex};

use super::{OutputMode, SpinnerHandle, UserInterface};

/// Kind of line the UI was asked to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shown {
    Message,
    Success,
    Warning,
    Error,
    Header,
}

/// How a spinner finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinnerStatus {
    Success,
    Error,
    Skipped,
}

type Finished = Arc<Mutex<Vec<(SpinnerStatus, String)>>>;

/// [`UserInterface`] that records everything instead of printing.
#[derive(Debug, Default)]
pub struct MockUI {
    mode: OutputMode,
    lines: Vec<(Shown, String)>,
    spinners: Vec<String>,
    finished: Finished,
}

impl MockUI {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: OutputMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Lines of one kind, in order.
    pub fn shown(&self, kind: Shown) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, line)| line.as_str())
            .collect()
    }

    /// Whether a line of `kind` containing `text` was shown.
    pub fn has(&self, kind: Shown, text: &str) -> bool {
        self.lines
            .iter()
            .any(|(k, line)| *k == kind && line.contains(text))
    }

    pub fn has_message(&self, text: &str) -> bool {
        self.has(Shown::Message, text)
    }

    pub fn has_success(&self, text: &str) -> bool {
        self.has(Shown::Success, text)
    }

    pub fn has_error(&self, text: &str) -> bool {
        self.has(Shown::Error, text)
    }

    /// Initial messages of every spinner started.
    pub fn spinners(&self) -> &[String] {
        &self.spinners
    }

    /// How each spinner finished, in finishing order.
    pub fn finished_spinners(&self) -> Vec<(SpinnerStatus, String)> {
        self.finished
            .lock()
            .map(|f| f.clone())
            .unwrap_or_default()
    }

    fn record(&mut self, kind: Shown, line: &str) {
        self.lines.push((kind, line.to_string()));
    }
}

impl UserInterface for MockUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn message(&mut self, msg: &str) {
        self.record(Shown::Message, msg);
    }

    fn success(&mut self, msg: &str) {
        self.record(Shown::Success, msg);
    }

    fn warning(&mut self, msg: &str) {
        self.record(Shown::Warning, msg);
    }

    fn error(&mut self, msg: &str) {
        self.record(Shown::Error, msg);
    }

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle> {
        self.spinners.push(message.to_string());
        Box::new(MockSpinner {
            updates: Vec::new(),
            finished: Arc::clone(&self.finished),
        })
    }

    fn show_header(&mut self, title: &str) {
        self.record(Shown::Header, title);
    }
}

/// Spinner handed out by [`MockUI`]; reports how it finished back to the UI.
#[derive(Debug)]
pub struct MockSpinner {
    updates: Vec<String>,
    finished: Finished,
}

impl MockSpinner {
    /// Messages set after the spinner started.
    pub fn updates(&self) -> &[String] {
        &self.updates
    }

    fn finish(&mut self, status: SpinnerStatus, msg: &str) {
        if let Ok(mut finished) = self.finished.lock() {
            finished.push((status, msg.to_string()));
        }
    }
}

impl SpinnerHandle for MockSpinner {
    fn set_message(&mut self, msg: &str) {
        self.updates.push(msg.to_string());
    }

    fn finish_success(&mut self, msg: &str) {
        self.finish(SpinnerStatus::Success, msg);
    }

    fn finish_error(&mut self, msg: &str) {
        self.finish(SpinnerStatus::Error, msg);
    }

    fn finish_skipped(&mut self, msg: &str) {
        self.finish(SpinnerStatus::Skipped, msg);
    }
}
