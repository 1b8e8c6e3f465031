//! 将 KiTS19, KiTS21 与 KiTS23 合并为一个 nnU-Net raw 数据集.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use kits_berry::dataset::{unify, Role, UnifyConfig};
use utils::loader;

#[derive(Parser)]
#[command(
    name = "kits-unify",
    about = "Merge KiTS19/21/23 into one nnU-Net raw dataset with a 60/20/20 split",
    version
)]
struct Cli {
    /// KiTS19 base folder (contains the case_XXXXX folders)
    #[arg(long, default_value_os_t = loader::kits19_dir())]
    kits19: PathBuf,

    /// KiTS21 base folder (usually the `data` folder with the case_XXXXX folders)
    #[arg(long, default_value_os_t = loader::kits21_dir())]
    kits21: PathBuf,

    /// KiTS23 base folder (usually the `dataset` folder with the case_XXXXX folders)
    #[arg(long, default_value_os_t = loader::kits23_dir())]
    kits23: PathBuf,

    /// nnU-Net dataset id, 1 gives Dataset001_Kits
    #[arg(short = 'd', default_value_t = 1)]
    dataset_id: u32,

    /// nnU-Net raw folder the dataset folder is created in
    #[arg(short, long, default_value_os_t = loader::nnunet_raw_dir())]
    output: PathBuf,

    /// Shuffle seed
    #[arg(long, default_value_t = kits_berry::consts::DEFAULT_SPLIT_SEED)]
    seed: u64,

    /// Also write splits_final.json with a single train/val fold
    #[arg(long)]
    nnunet_fold: bool,

    /// Log level
    #[arg(long, default_value_t = log::LevelFilter::Info)]
    log_level: log::LevelFilter,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    utils::init_logger(cli.log_level);

    let mut config = UnifyConfig::kits(cli.kits19, cli.kits21, cli.kits23, cli.output);
    config.dataset_id = cli.dataset_id;
    config.seed = cli.seed;
    config.write_nnunet_fold = cli.nnunet_fold;

    let report = unify(&config).context("dataset conversion failed")?;

    utils::sep();
    println!("Dataset: {}", report.layout.root().display());
    for role in [Role::Train, Role::Validation, Role::Test] {
        println!("{role:>10}: {}", report.count(role));
    }
    println!("numTraining: {}", report.description.num_training);
    utils::sep();
    println!("Conversion completed.");
    Ok(())
}
