//! 在 hold-out 测试集上评估预测结果的多类 Dice.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use kits_berry::consts::naming::FILE_ENDING;
use kits_berry::consts::DEFAULT_NUM_CLASSES;
use kits_berry::eval::{evaluate, ClassSpec, HoldoutConfig};

#[derive(Parser)]
#[command(
    name = "holdout-eval",
    about = "Mean multi-class Dice (background excluded) of predictions against ground truth",
    version
)]
struct Cli {
    /// Folder with the predicted label volumes
    #[arg(long)]
    pred: PathBuf,

    /// Folder with the ground-truth label volumes, matched by file name
    #[arg(long)]
    gt: PathBuf,

    /// Number of classes including background
    #[arg(long, default_value_t = DEFAULT_NUM_CLASSES)]
    num_classes: usize,

    /// Score the KiTS hierarchical regions (kidney, masses, tumor) instead of raw classes
    #[arg(long, conflicts_with = "num_classes")]
    regions: bool,

    /// File ending of the volumes to evaluate
    #[arg(long, default_value = FILE_ENDING)]
    file_ending: String,

    /// Write the full report as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value_t = log::LevelFilter::Warn)]
    log_level: log::LevelFilter,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    utils::init_logger(cli.log_level);

    let config = HoldoutConfig {
        pred_dir: cli.pred,
        truth_dir: cli.gt,
        classes: if cli.regions {
            ClassSpec::kits_regions()
        } else {
            ClassSpec::OneHot {
                num_classes: cli.num_classes,
            }
        },
        file_ending: cli.file_ending,
    };

    let report = evaluate(&config).context("hold-out evaluation failed")?;

    for (name, case) in report.in_order() {
        match case.map(|c| c.dice) {
            None => println!("Ground truth not found for {name}, skipped."),
            Some(Some(d)) => println!("{name}: Dice = {d:.4}"),
            Some(None) => println!("{name}: Dice = n/a"),
        }
    }
    utils::sep();
    for (name, mean) in report.class_names.iter().zip(&report.class_means) {
        match mean {
            Some(m) => println!("{name:>8}: {m:.4}"),
            None => println!("{name:>8}: n/a"),
        }
    }
    println!("\nMean hold-out Dice = {:.4}", report.mean);
    println!(
        "over {} of {} matched cases ({} undefined, {} skipped)",
        report.scored(),
        report.cases.len(),
        report.undefined,
        report.skipped.len()
    );

    if let Some(path) = &cli.json {
        report.write_json(path)?;
        println!("Report written to {}", path.display());
    }
    Ok(())
}
