//! Resumable CSV batch analysis.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use hashbrown::HashSet;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use poi_density::places::GooglePlacesClient;
use poi_density::report::{processed_names, PolygonRow, PolygonTable, ResultWriter};
use poi_density::{Analyzer, Category, Config, Summary};

pub async fn run(config: &Config, api_key: &str, input: &Path, output: &Path, resume: bool) -> Result<()> {
    let table = PolygonTable::from_path(input)
        .with_context(|| format!("Failed to read polygons from {}", input.display()))?;
    info!("Found {} polygons in {}", table.rows.len(), input.display());

    let done = if resume {
        processed_names(output).context("Failed to read existing results")?
    } else {
        HashSet::new()
    };
    if !done.is_empty() {
        info!("Skipping {} already processed polygons", done.len());
    }

    let pending: Vec<&PolygonRow> = table.rows.iter().filter(|r| !done.contains(&r.name)).collect();
    if pending.is_empty() {
        info!("All polygons already processed");
        return Ok(());
    }

    let headers = table.output_headers();
    let mut writer = if resume {
        ResultWriter::append(output, &headers)
    } else {
        ResultWriter::create(output, &headers)
    }
    .with_context(|| format!("Failed to open {}", output.display()))?;

    let client = GooglePlacesClient::new(api_key, &config.places)?;
    let analyzer = Analyzer::new(client, config.places.clone(), config.tiling.clone());

    let pb = ProgressBar::new(pending.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
            .progress_chars("#>-"),
    );

    let mut reports = Vec::with_capacity(pending.len());
    let mut failed_queries = 0;

    for (i, row) in pending.iter().enumerate() {
        pb.set_message(row.name.clone());

        let report = analyzer.analyze_polygon(&row.polygon()).await;
        writer
            .write_row(row, &report.counts)
            .with_context(|| format!("Failed to write results for '{}'", row.name))?;

        failed_queries += report.stats.failed_queries;
        reports.push(report);
        pb.inc(1);

        if i + 1 < pending.len() && config.places.polygon_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(config.places.polygon_delay_ms)).await;
        }
    }

    pb.finish_with_message("Analysis complete");
    info!("Results saved to {}", output.display());
    if failed_queries > 0 {
        info!("{} provider queries failed and were skipped", failed_queries);
    }

    print_summary(&Summary::from_reports(&reports));
    Ok(())
}

fn print_summary(summary: &Summary) {
    println!("\nSummary ({} polygons)", summary.total_polygons);
    for category in Category::all() {
        println!(
            "  {:<12} total {:>6}  avg {:>8.1}",
            category.field_name(),
            summary.totals.get(*category),
            summary.averages.get(*category)
        );
    }
    println!("  {:<12} total {:>6}", "all", summary.totals.total());
}
