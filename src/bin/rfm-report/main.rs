//! rfm-report: headless RFM segmentation report
//!
//! Loads a customer table, labels it, applies the filter given on the command
//! line and prints the same metrics the dashboard shows.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Args;
use rfm_dashboard::data::aggregate::{histogram, HistogramBin, LabelMeans, Metric, Report, Summary};
use rfm_dashboard::data::export::{export_file, EXPORT_MIME_TYPE};
use rfm_dashboard::data::filter::filtered_indices;
use rfm_dashboard::data::loader::load_file;
use rfm_dashboard::{apply_labeling, LabelingMode};
use serde::Serialize;

#[derive(Serialize)]
struct JsonOutput<'a> {
    report: &'a Report,
    histograms: Vec<MetricHistogram>,
}

#[derive(Serialize)]
struct MetricHistogram {
    metric: Metric,
    bins: Vec<HistogramBin>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let mode = LabelingMode::from(args.mode);

    let mut table = load_file(&args.input)
        .with_context(|| format!("Failed to load {}", args.input.display()))?;
    apply_labeling(&mut table, mode).context("Failed to label customers")?;

    let filter = args.filter_for(&table, mode)?;
    let report = Report::build(&table, mode, &filter);

    let visible = filtered_indices(&table, &filter);
    let histograms: Vec<MetricHistogram> = Metric::ALL
        .into_iter()
        .map(|metric| MetricHistogram {
            metric,
            bins: histogram(&metric.values(&table, &visible), args.bins),
        })
        .collect();

    if args.json {
        let output = JsonOutput {
            report: &report,
            histograms,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_report(&report, &histograms);
    }

    if let Some(path) = &args.export {
        export_file(&table, path)
            .with_context(|| format!("Failed to export to {}", path.display()))?;
        // stdout carries only the JSON document in --json mode.
        if args.json {
            log::info!("Segmented data saved to: {} ({EXPORT_MIME_TYPE})", path.display());
        } else {
            println!("\nSegmented data saved to: {} ({EXPORT_MIME_TYPE})", path.display());
        }
    }

    Ok(())
}

fn print_report(report: &Report, histograms: &[MetricHistogram]) {
    println!("=== {} ===\n", report.mode);

    println!("--- All customers ---");
    print_summary(report.mode, &report.overall);

    println!("\n--- Filtered customers ---");
    if report.filtered.metrics.total == 0 {
        println!("No customers match the current filters.");
        return;
    }
    print_summary(report.mode, &report.filtered);

    for hist in histograms {
        println!("\n{} distribution:", hist.metric.name());
        let peak = hist.bins.iter().map(|b| b.count).max().unwrap_or(0).max(1);
        for bin in &hist.bins {
            let bar = "#".repeat(bin.count * 40 / peak);
            println!("  [{:>10.2}, {:>10.2}) {:>6} {bar}", bin.start, bin.end, bin.count);
        }
    }
}

fn print_summary(mode: LabelingMode, summary: &Summary) {
    let metrics = &summary.metrics;
    println!("Total customers: {}", metrics.total);
    if mode == LabelingMode::ScoreBased {
        println!("Best customers:  {}", metrics.best_customers);
        println!("Loyal customers: {}", metrics.loyal_customers);
        println!("At risk:         {}", metrics.at_risk);
    }

    println!("\nDistribution:");
    for entry in &summary.counts {
        let share = entry.count as f64 / metrics.total.max(1) as f64 * 100.0;
        println!("  {}: {} customers ({:.1}%)", entry.label, entry.count, share);
    }

    println!("\nAverage RFM:");
    println!("  {:<18} {:>10} {:>10} {:>12}", "", "Recency", "Frequency", "Monetary");
    for means in &summary.means {
        print_means(means);
    }
}

fn print_means(means: &LabelMeans) {
    let fmt = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"));
    println!(
        "  {:<18} {:>10} {:>10} {:>12}",
        means.label.to_string(),
        fmt(means.recency),
        fmt(means.frequency),
        fmt(means.monetary)
    );
}
