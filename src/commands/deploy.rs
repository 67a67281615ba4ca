use clap::Args;
use kfp_deploy::auth;
use kfp_deploy::deploy::{self, DeployOutput};
use kfp_deploy::kubeflow::KubeflowClient;
use kfp_deploy::log_status;

use crate::commands::CmdResult;

#[derive(Args)]
pub struct DeployArgs {
    /// Skip `gcloud` service-account activation even when SA_EMAIL is set
    #[arg(long)]
    pub skip_auth: bool,
}

pub fn run(args: DeployArgs, global: &crate::commands::GlobalArgs) -> CmdResult<DeployOutput> {
    let config = global.load_config()?;
    let kubeflow_url = config.require_remote()?;

    match (&config.service_account, args.skip_auth) {
        (Some(account), false) => auth::activate_service_account(account)?,
        (Some(_), true) => log_status!("auth", "Skipping service account activation (--skip-auth)"),
        (None, _) => log_status!("auth", "SA_EMAIL not set; skipping service account activation"),
    }

    let mut client = KubeflowClient::new(kubeflow_url, config.namespace.clone())?;
    let output = deploy::deploy(&config, &mut client)?;

    Ok((output, 0))
}
