//! `imgc` binary entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use imgc_cli::{compile_plan, Cli};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match compile_plan(&cli) {
        Ok(report) => {
            if !cli.quiet {
                println!("layer: {}", report.layer_target);
                println!("phases applied ({}):", report.phases_applied.len());
                for phase in &report.phases_applied {
                    println!("  {phase}");
                }
                println!("additive build order ({}):", report.additive_order.len());
                for (position, target) in report.additive_order.iter().enumerate() {
                    println!("  {position}. {target}");
                }
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            err.log();
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}
