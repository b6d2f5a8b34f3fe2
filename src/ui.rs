// UI layer: the few things the user sees besides log output. Spinners are
// drawn on stderr and stay hidden when stderr is not a terminal, so stdout
// only carries the usage text and the final listing.

use crate::pipeline::RunReport;
use crate::prompt::Task;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt::Write;
use std::time::Duration;

/// Usage line, an example and the task table the ids map to.
pub fn usage() -> String {
    let mut text = String::from(
        "Usage: florence <test_image> <result_dir> <task_id>\n\
         For example: florence car.jpg result_dir 0\n\
         Tasks:",
    );
    for task in Task::all() {
        let _ = write!(text, "\n  {:>2}  {}", task.id, task.tag());
        if let Some(argument) = task.text_argument() {
            let _ = write!(text, " (example: {argument})");
        }
    }
    text
}

/// Spinner that ticks on its own while the caller blocks on a request.
pub fn spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner} {msg} ({elapsed})")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

pub fn format_listing(report: &RunReport) -> String {
    format!(
        "Response saved to path: {}. File list: {:?}",
        report.result_dir.display(),
        report.files
    )
}
