//! Terminal progress for the pipeline commands.
//!
//! On a terminal: a bar counting drained tasks plus spinner lines for long
//! stages. Anywhere else every bar is hidden and the logs carry progress.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

const TASK_TEMPLATE: &str =
    "{prefix:<10.cyan.bold} {bar:30.green/dim} {pos:>6}/{len:6} {eta:>4} {wide_msg:.dim}";
const STAGE_TEMPLATE: &str = "{spinner:.green} {prefix:<10.cyan.bold} {wide_msg}";

enum Surface {
    Terminal(MultiProgress),
    Hidden,
}

/// Where bars are drawn, decided once per process
pub struct ProgressContext {
    surface: Surface,
}

impl ProgressContext {
    /// Draw bars only when stderr is a terminal.
    pub fn new() -> Self {
        if std::io::stderr().is_terminal() {
            Self {
                surface: Surface::Terminal(MultiProgress::new()),
            }
        } else {
            Self::hidden()
        }
    }

    pub fn hidden() -> Self {
        Self {
            surface: Surface::Hidden,
        }
    }

    fn add(&self, name: &str, template: &str) -> ProgressBar {
        let Surface::Terminal(multi) = &self.surface else {
            return ProgressBar::hidden();
        };
        let pb = multi.add(ProgressBar::new(0));
        if let Ok(style) = ProgressStyle::with_template(template) {
            pb.set_style(style.progress_chars("--"));
        }
        pb.set_prefix(name.to_string());
        pb
    }

    /// Bar counting processed tasks; its length grows as work is enqueued.
    pub fn task_bar(&self, name: &str) -> ProgressBar {
        self.add(name, TASK_TEMPLATE)
    }

    /// Spinner line for a stage such as discovery.
    pub fn stage_line(&self, name: &str) -> ProgressBar {
        let pb = self.add(name, STAGE_TEMPLATE);
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }

    pub fn is_tty(&self) -> bool {
        matches!(self.surface, Surface::Terminal(_))
    }

    /// Bar set the logger must suspend while printing, if any
    pub fn bars(&self) -> Option<&MultiProgress> {
        match &self.surface {
            Surface::Terminal(multi) => Some(multi),
            Surface::Hidden => None,
        }
    }
}

impl Default for ProgressContext {
    fn default() -> Self {
        Self::new()
    }
}

/// `1234567` → `1,234,567`
pub fn fmt_num(n: u64) -> String {
    let digits = n.to_string();
    let head = digits.len() % 3;
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (i + 3 - head) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
