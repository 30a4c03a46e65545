//! Statement execution
//!
//! Routes a classified batch to the row-fetch path or the affected-rows path
//! and streams the outcome into a renderer. The renderer is always flushed
//! once the statement has finished, also for zero rows.

use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use tracing::debug;

use crate::classifier::StatementCategory;
use crate::connection::{Database, ExecOutcome};
use crate::error::Result;
use crate::formatter::{ResultRenderer, ResultSummary};

/// Delay before the busy spinner shows up
const SPINNER_THRESHOLD: Duration = Duration::from_millis(300);

#[derive(Default)]
struct SpinnerSlot {
    bar: Option<ProgressBar>,
    done: bool,
}

/// Spinner on stderr that appears only for slow statements and is cleared
/// before any result byte is written
struct DelayedSpinner {
    slot: Arc<Mutex<SpinnerSlot>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl DelayedSpinner {
    fn start(enabled: bool) -> Self {
        let slot = Arc::new(Mutex::new(SpinnerSlot::default()));
        let task = enabled.then(|| {
            let slot = Arc::clone(&slot);
            tokio::spawn(async move {
                tokio::time::sleep(SPINNER_THRESHOLD).await;
                let mut slot = slot.lock();
                if !slot.done {
                    slot.bar = Some(Self::create_bar());
                }
            })
        });
        Self { slot, task }
    }

    fn create_bar() -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template("{spinner:.cyan} {msg}")
        {
            pb.set_style(style);
        }
        pb.set_message("Executing statement...");
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }

    fn handle(&self) -> Arc<Mutex<SpinnerSlot>> {
        Arc::clone(&self.slot)
    }

    fn clear(slot: &Mutex<SpinnerSlot>) {
        let mut slot = slot.lock();
        slot.done = true;
        if let Some(pb) = slot.bar.take() {
            pb.finish_and_clear();
        }
    }

    fn stop(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        Self::clear(&self.slot);
    }
}

/// Execute `sql` on `database` according to its category and render it.
///
/// `spinner` enables the delayed busy indicator; only pass `true` when
/// stderr is an interactive terminal.
pub async fn execute(
    database: &Database,
    sql: &str,
    category: StatementCategory,
    renderer: &mut dyn ResultRenderer,
    spinner: bool,
) -> Result<ResultSummary> {
    let start = Instant::now();
    let spinner = DelayedSpinner::start(spinner);

    let mut summary = if category.is_query() {
        let slot = spinner.handle();
        let mut row_count = 0u64;
        let outcome = database
            .query_rows(sql, |row| {
                if row_count == 0 {
                    DelayedSpinner::clear(&slot);
                }
                row_count += 1;
                renderer.write_rows(std::slice::from_ref(&row))
            })
            .await;
        spinner.stop();
        outcome?;

        query_summary(row_count)
    } else {
        let outcome = database.exec(sql).await;
        spinner.stop();
        let outcome = outcome?;
        debug!(
            "{:?} statement affected {} rows (last insert id: {:?})",
            category, outcome.affected_rows, outcome.last_insert_id
        );

        exec_summary(&outcome)
    };

    summary.elapsed = start.elapsed();
    renderer.flush(&summary)?;
    Ok(summary)
}

/// Summary of a statement that ran on the row-fetch path
fn query_summary(row_count: u64) -> ResultSummary {
    ResultSummary {
        has_rows: true,
        row_count,
        ..Default::default()
    }
}

/// Summary of a statement that ran on the affected-rows path
fn exec_summary(outcome: &ExecOutcome) -> ResultSummary {
    ResultSummary {
        has_rows: false,
        affected_rows: outcome.affected_rows,
        ..Default::default()
    }
}
