use std::path::PathBuf;

use kfp_deploy::config::Config;

pub type CmdResult<T> = kfp_deploy::Result<(T, i32)>;

pub(crate) struct GlobalArgs {
    /// Overrides the directory the compiled package is written to.
    pub package_dir: Option<PathBuf>,
}

impl GlobalArgs {
    /// Read the environment once and apply command-line overrides.
    pub fn load_config(&self) -> kfp_deploy::Result<Config> {
        let config = Config::from_env()?;
        Ok(match &self.package_dir {
            Some(dir) => config.with_package_dir(dir),
            None => config,
        })
    }
}

pub mod compile;
pub mod deploy;

macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (kfp_deploy::Result<serde_json::Value>, i32) {
    match command {
        crate::Commands::Deploy(args) => dispatch!(args, global, deploy),
        crate::Commands::Compile(args) => dispatch!(args, global, compile),
    }
}
