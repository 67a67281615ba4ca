use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::GlobalArgs;

mod commands;
mod output;

use commands::{compile, deploy};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "kfp-deploy")]
#[command(version = VERSION)]
#[command(about = "Compile a pipeline definition and register it with Kubeflow Pipelines")]
struct Cli {
    /// Directory the compiled package is written to (default: current directory)
    #[arg(long, global = true, value_name = "DIR")]
    package_dir: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile, register and optionally run the configured pipeline
    Deploy(deploy::DeployArgs),
    /// Compile the configured pipeline without contacting the cluster
    Compile(compile::CompileArgs),
}

fn init_logging() {
    // Logs go to stderr; stdout carries the JSON response.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logging();

    let global = GlobalArgs {
        package_dir: cli.package_dir,
    };

    let (json_result, exit_code) = commands::run_json(cli.command, &global);
    let _ = output::print_json_result(json_result);

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
