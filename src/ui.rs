//! Stage-level progress output for the CLI.
//!
//! Pretty mode shows an indicatif spinner per stage; plain mode prints one
//! line when a stage starts and one when it finishes. Auto picks pretty only
//! on a TTY so piped logs stay clean.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Ui {
    pretty: bool,
}

impl Ui {
    /// Resolve the `--ui` flag (`auto`, `plain`, `pretty`) against whether
    /// stderr is a terminal.
    pub fn from_flag(ui_flag: Option<&str>, is_tty: bool) -> Self {
        let pretty = match ui_flag {
            Some("pretty") => true,
            Some("plain") => false,
            _ => is_tty,
        };
        Self { pretty }
    }

    /// Begin a named stage; the returned guard reports duration on drop.
    pub fn stage(&self, name: &str) -> StageGuard {
        let spinner = if self.pretty {
            let spinner = ProgressBar::new_spinner();
            spinner.set_draw_target(ProgressDrawTarget::stderr());
            spinner.enable_steady_tick(Duration::from_millis(120));
            let style = ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            spinner.set_style(style);
            spinner.set_message(format!("{name}…"));
            Some(spinner)
        } else {
            eprintln!("==> {}", name);
            None
        };
        StageGuard {
            name: name.to_string(),
            start: Instant::now(),
            spinner,
        }
    }
}

pub struct StageGuard {
    name: String,
    start: Instant,
    spinner: Option<ProgressBar>,
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let message = if elapsed.as_secs() >= 1 {
            format!("✔ {} ({:.2}s)", self.name, elapsed.as_secs_f64())
        } else {
            format!("✔ {} ({}ms)", self.name, elapsed.as_millis())
        };
        match &self.spinner {
            Some(spinner) => spinner.finish_with_message(message),
            None => eprintln!("{message}"),
        }
    }
}
