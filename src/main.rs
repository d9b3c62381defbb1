use clap::Parser;

use log::{error, info};
use std::process::ExitCode;

use yolo_label_tools::{process_best_box, process_continuity_filter, process_normalize, Cli, Command};

fn main() -> ExitCode {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match &cli.command {
        Command::Filter(args) => {
            info!(
                "Filtering {} -> {} (threshold: {} frames)",
                args.input_dir.display(),
                args.output_dir.display(),
                args.threshold
            );
            process_continuity_filter(args).map(|_| ())
        }
        Command::BestBox(args) => {
            info!(
                "Keeping the best box per file: {} -> {}",
                args.input_dir.display(),
                args.output_dir.display()
            );
            process_best_box(args).map(|_| ())
        }
        Command::Normalize(args) => {
            info!("Normalizing boxes in {}", args.input_dir.display());
            process_normalize(args).map(|_| ())
        }
    };

    match result {
        Ok(()) => {
            info!("Done.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
