use clap::Args;
use kfp_deploy::deploy::{self, CompileOutput};

use crate::commands::CmdResult;

/// Compile only; no credentials or cluster needed.
#[derive(Args)]
pub struct CompileArgs {}

pub fn run(_args: CompileArgs, global: &crate::commands::GlobalArgs) -> CmdResult<CompileOutput> {
    let config = global.load_config()?;
    let output = deploy::compile_pipeline(&config)?;

    Ok((output, 0))
}
