//! Service-account activation through the `gcloud` CLI.

use crate::config::ServiceAccount;
use crate::error::{Error, Result};
use crate::utils::command;

const GCLOUD: &str = "gcloud";

/// Arguments passed to `gcloud` to activate `account`.
pub fn activation_args(account: &ServiceAccount) -> Vec<String> {
    vec![
        "auth".to_string(),
        "activate-service-account".to_string(),
        account.email.clone(),
        format!("--project={}", account.project),
        format!("--key-file={}", account.key_file.display()),
    ]
}

/// Activate `account` for the remaining `gcloud`-backed calls.
pub fn activate_service_account(account: &ServiceAccount) -> Result<()> {
    activate_with(GCLOUD, account)
}

fn activate_with(program: &str, account: &ServiceAccount) -> Result<()> {
    if !account.key_file.is_file() {
        return Err(Error::auth_failed(format!(
            "Credentials file not found: {}",
            account.key_file.display()
        )));
    }

    let args = activation_args(account);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    command::run(program, &args, "activate service account").map_err(|e| {
        let cause = e.details["error"].as_str().unwrap_or(&e.message).to_string();
        Error::auth_failed(cause)
    })?;

    log_status!("auth", "Activated service account {}", account.email);
    Ok(())
}
