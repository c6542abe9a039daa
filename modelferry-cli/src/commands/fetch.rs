//! `fetch` command: acquire artifacts concurrently with progress bars.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::error;

use modelferry::format::format_bytes;
use modelferry::{AcquireError, AcquireOutcome, ModelManager, ProgressCallback, ProgressSnapshot};

use crate::error::CliError;

const BAR_TEMPLATE: &str =
    "{prefix:<28} {bar:32.cyan/blue} {bytes:>10}/{total_bytes:<10} {msg} ETA {eta}";
const SPINNER_TEMPLATE: &str = "{prefix:<28} {spinner} {bytes:>10} {msg}";

/// Fetch every named artifact. Stops early when `cancel` fires.
pub async fn run(
    manager: Arc<ModelManager>,
    names: Vec<String>,
    cancel: CancellationToken,
) -> Result<(), CliError> {
    // Resolve names up front so a typo fails before anything starts.
    for name in &names {
        manager.artifact_path(name)?;
    }

    let bars = MultiProgress::new();
    let mut tasks = JoinSet::new();
    for name in names.iter().cloned() {
        let bar = bars.add(new_bar(&name));
        let manager = Arc::clone(&manager);
        let cancel = cancel.clone();
        tasks.spawn(async move {
            let result = manager
                .ensure_available_with_progress(&name, &cancel, progress_callback(bar.clone()))
                .await;
            finish_bar(&bar, &result);
            (name, result)
        });
    }

    let total = names.len();
    let mut failed = 0;
    let mut interrupted = false;
    while let Some(joined) = tasks.join_next().await {
        let (name, result) = match joined {
            Ok(pair) => pair,
            Err(e) => {
                error!(error = %e, "Fetch task panicked");
                failed += 1;
                continue;
            }
        };
        match result {
            Ok(outcome) => report_success(&name, &outcome),
            Err(AcquireError::Cancelled) => interrupted = true,
            Err(e) => {
                failed += 1;
                eprintln!("\n{name}: {e}");
            }
        }
    }

    if interrupted {
        return Err(CliError::Interrupted);
    }
    if failed > 0 {
        return Err(CliError::FetchFailed { failed, total });
    }
    Ok(())
}

fn new_bar(name: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(spinner_style());
    bar.set_prefix(name.to_string());
    bar.set_message("checking");
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

fn progress_callback(bar: ProgressBar) -> ProgressCallback {
    Arc::new(move |snapshot: &ProgressSnapshot| {
        if snapshot.total_known() && bar.length() != Some(snapshot.total) {
            bar.set_style(bar_style());
            bar.set_length(snapshot.total);
        }
        bar.set_position(snapshot.downloaded);
        bar.set_message(snapshot.speed_formatted.clone());
    })
}

fn finish_bar(bar: &ProgressBar, result: &Result<AcquireOutcome, AcquireError>) {
    match result {
        Ok(outcome) if outcome.was_present() => bar.finish_with_message("already present"),
        Ok(_) => bar.finish_with_message("done"),
        Err(AcquireError::Cancelled) => bar.abandon_with_message("cancelled"),
        Err(_) => bar.abandon_with_message("failed"),
    }
}

fn report_success(name: &str, outcome: &AcquireOutcome) {
    match &outcome.download {
        None => println!("{name}: {}", outcome.path.display()),
        Some(download) => {
            let verified = if download.checksum_valid {
                ", verified"
            } else {
                ""
            };
            let resumed = if download.resumed { ", resumed" } else { "" };
            println!(
                "{name}: {} ({} in {} attempt(s){resumed}{verified})",
                outcome.path.display(),
                format_bytes(download.bytes_downloaded),
                outcome.attempts
            );
        }
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template(SPINNER_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelferry::ProgressTracker;

    #[test]
    fn test_callback_switches_to_bar_once_total_is_known() {
        let bar = ProgressBar::hidden();
        let callback = progress_callback(bar.clone());

        let unknown = ProgressTracker::new(0);
        unknown.update(10);
        callback(&unknown.snapshot());
        assert_eq!(bar.position(), 10);
        assert_eq!(bar.length(), None);

        let known = ProgressTracker::new(100);
        known.update(40);
        callback(&known.snapshot());
        assert_eq!(bar.position(), 40);
        assert_eq!(bar.length(), Some(100));
    }
}
