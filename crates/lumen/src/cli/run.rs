//! The default command: one incremental run over the project.

use indicatif::{ProgressBar, ProgressStyle};
use lumen_core::{BatchReport, Config, Pipeline, ProgressReporter, ResolvedPaths};

/// Options for a pipeline run taken from global flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Cap on concurrently processed images
    pub parallel: Option<usize>,
    /// Draw a progress bar on stderr
    pub show_progress: bool,
}

/// Run the pipeline and print a summary.
pub async fn execute(
    config: &Config,
    paths: &ResolvedPaths,
    options: RunOptions,
) -> anyhow::Result<()> {
    let progress = BarProgress::new(options.show_progress);
    let report = Pipeline::new(config, paths)
        .with_parallel(options.parallel)
        .run(&progress)
        .await?;

    print_summary(&report);
    if report.failed > 0 {
        tracing::warn!(
            "{} image(s) failed and will be retried on the next run. See {}",
            report.failed,
            paths.error_log.display()
        );
    }
    Ok(())
}

/// Delete every cache store and generated artifact.
pub async fn clear_cache(paths: &ResolvedPaths) -> anyhow::Result<()> {
    lumen_core::clear_all(paths).await?;
    tracing::info!("Cleared caches in {}", paths.cache_dir.display());
    eprintln!("Cache and generated images cleared.");
    Ok(())
}

/// Progress bar driven by pipeline progress callbacks.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new(visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new(0)
        } else {
            ProgressBar::hidden()
        };
        let style = ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
            )
            .map(|style| style.progress_chars("##-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        Self { bar }
    }
}

impl ProgressReporter for BarProgress {
    fn start(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_message("optimising images");
    }

    fn advance(&self, processed: u64) {
        self.bar.inc(processed);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Print a formatted summary table after a run.
fn print_summary(report: &BatchReport) {
    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Found:        {:>8}", report.total_images_found);
    eprintln!("    Cached:       {:>8}", report.total_images_cached);
    eprintln!("    Processed:    {:>8}", report.processed);
    if report.failed > 0 {
        eprintln!("    Failed:       {:>8}", report.failed);
    }
    if report.reaped > 0 {
        eprintln!("    Removed:      {:>8}", report.reaped);
    }
    if report.config_changed {
        eprintln!("    (configuration changed, full rebuild)");
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Duration:     {:>7.1}s", report.elapsed.as_secs_f64());
    eprintln!("  ====================================");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_bar_tracks_progress() {
        let progress = BarProgress::new(false);
        progress.start(3);
        progress.advance(1);
        progress.advance(1);
        assert_eq!(progress.bar.position(), 2);
        assert_eq!(progress.bar.length(), Some(3));
        progress.finish();
        assert!(progress.bar.is_finished());
    }

    #[tokio::test]
    async fn test_execute_on_empty_project() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        let paths = config.resolve(dir.path());
        execute(&config, &paths, RunOptions::default()).await.unwrap();
        assert!(paths.cache_dir.join("config-cache.json").exists());

        clear_cache(&paths).await.unwrap();
        assert!(!paths.cache_dir.join("config-cache.json").exists());
    }
}
