// jmap-cli/src/commands/init.rs
use crate::config::{AuthMode, Config};
use crate::output::{print_error, print_success, ExitCode};
use anyhow::Result;
use dialoguer::{Confirm, Input, Password};
use jmap_client::{CredentialProvider, JmapClient, ReqwestClient};

async fn credentials_work(base_url: &str, username: &str, password: &str) -> bool {
    let Ok(credentials) = CredentialProvider::basic(Some(username), Some(password)) else {
        return false;
    };
    match JmapClient::new(ReqwestClient::new(), base_url, credentials) {
        Ok(client) => client.verify_credentials().await,
        Err(_) => false,
    }
}

/// Run the interactive setup command
pub async fn run_init(url: Option<String>) -> Result<ExitCode> {
    println!("JMAP CLI Setup");
    println!();

    let config_path = Config::config_path()?;
    if config_path.exists() {
        let existing = Config::load_from(&config_path)?;
        let valid = match super::connect(&existing) {
            Ok(client) => client.verify_credentials().await,
            Err(_) => false,
        };
        let prompt = if valid {
            format!(
                "A working configuration exists at {}. Overwrite?",
                config_path.display()
            )
        } else {
            format!(
                "A configuration exists at {} but it doesn't seem to work. Overwrite?",
                config_path.display()
            )
        };
        if !Confirm::new().with_prompt(prompt).default(false).interact()? {
            println!("Config file not modified.");
            return Ok(ExitCode::Success);
        }
    }

    let base_url = match url {
        Some(url) => url,
        None => Input::<String>::new()
            .with_prompt("JMAP base URL (e.g. https://jmap.example.com)")
            .interact_text()?,
    };
    let base_url = base_url.trim().trim_end_matches('/').to_string();
    let username: String = Input::new()
        .with_prompt("Email address (login)")
        .interact_text()?;
    let password = Password::new().with_prompt("Password").interact()?;
    let default_from: String = Input::new()
        .with_prompt(format!("Sender address (Enter for {})", username))
        .allow_empty(true)
        .interact_text()?;

    println!();
    println!("Validating credentials...");

    if !credentials_work(&base_url, &username, &password).await {
        print_error("Invalid credentials or JMAP URL");
        return Ok(ExitCode::PermanentError);
    }

    let mut config = Config::default();
    config.server.base_url = Some(base_url);
    config.server.auth = AuthMode::Basic;
    config.sender.default_from = Some(if default_from.trim().is_empty() {
        username.clone()
    } else {
        default_from.trim().to_string()
    });
    config.account.username = Some(username);
    config.account.password = Some(password);

    match config.save() {
        Ok(path) => {
            print_success(&format!("Config saved to {}", path.display()));
            println!();
            println!("Try: jmap mailboxes");
            Ok(ExitCode::Success)
        }
        Err(e) => {
            print_error(&format!("Couldn't write config file: {}", e));
            Ok(ExitCode::PermanentError)
        }
    }
}
