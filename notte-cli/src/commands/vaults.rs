//! Vaults command - credential vaults, stored logins and payment cards.

use anyhow::{Result, anyhow, bail};
use clap::{Args, Subcommand};
use notte_core::{ListResponse, VaultResponse};
use serde_json::{Value, json};
use url::Url;

use super::input::confirm;
use super::{Api, non_empty, object_from};
use crate::Cli;
use crate::output::Output;

/// Arguments for the vaults command.
#[derive(Args)]
pub struct VaultsArgs {
    #[command(subcommand)]
    pub action: VaultsAction,
}

/// Vaults subcommands.
#[derive(Subcommand)]
pub enum VaultsAction {
    /// List vaults.
    List,

    /// Create a new vault.
    Create {
        /// Name of the vault.
        #[arg(long)]
        name: Option<String>,
    },

    /// Rename a vault.
    Update {
        /// Vault ID.
        #[arg(long)]
        id: String,

        /// New name for the vault.
        #[arg(long)]
        name: String,
    },

    /// Delete a vault.
    Delete {
        /// Vault ID.
        #[arg(long)]
        id: String,
    },

    /// Manage stored website credentials.
    Credentials(CredentialsArgs),

    /// Manage the vault's credit card.
    Card(CardArgs),
}

/// Arguments for `vaults credentials`.
#[derive(Args)]
pub struct CredentialsArgs {
    #[command(subcommand)]
    pub action: CredentialsAction,

    /// Vault ID.
    #[arg(long, global = true)]
    pub id: Option<String>,
}

/// Credentials subcommands.
#[derive(Subcommand)]
pub enum CredentialsAction {
    /// List credentials in the vault.
    List,

    /// Add credentials for a URL.
    Add(CredentialsAddArgs),

    /// Get the credentials stored for a URL.
    Get {
        /// URL to get credentials for.
        #[arg(long)]
        url: String,
    },

    /// Delete the credentials stored for a URL.
    Delete {
        /// URL to delete credentials for.
        #[arg(long)]
        url: String,
    },
}

/// Arguments for `vaults credentials add`.
#[derive(Args)]
pub struct CredentialsAddArgs {
    /// URL the credentials are for.
    #[arg(long)]
    pub url: String,

    /// Login email.
    #[arg(long)]
    pub email: Option<String>,

    /// Login username.
    #[arg(long)]
    pub username: Option<String>,

    /// Login password.
    #[arg(long)]
    pub password: String,

    /// MFA secret.
    #[arg(long)]
    pub mfa_secret: Option<String>,
}

/// Arguments for `vaults card`.
#[derive(Args)]
pub struct CardArgs {
    #[command(subcommand)]
    pub action: CardAction,

    /// Vault ID.
    #[arg(long, global = true)]
    pub id: Option<String>,
}

/// Card subcommands.
#[derive(Subcommand)]
pub enum CardAction {
    /// Show the stored card.
    Get,

    /// Store a credit card.
    Set(CardSetArgs),

    /// Delete the stored card.
    Delete,
}

/// Arguments for `vaults card set`.
#[derive(Args)]
pub struct CardSetArgs {
    /// Credit card number.
    #[arg(long)]
    pub number: String,

    /// Expiration date, e.g. 12/25.
    #[arg(long)]
    pub expiry: String,

    /// Card CVV.
    #[arg(long)]
    pub cvv: String,

    /// Cardholder name.
    #[arg(long)]
    pub name: String,
}

/// Runs the vaults command.
pub async fn run(args: &VaultsArgs, cli: &Cli) -> Result<()> {
    match &args.action {
        VaultsAction::Delete { id } => delete_vault(id, cli).await,
        VaultsAction::Credentials(creds) => credentials(creds, cli).await,
        VaultsAction::Card(card) => card_command(card, cli).await,
        action => {
            let api = Api::connect(cli).await?;
            let output = Output::from_cli(cli);
            let client = &api.client;
            match action {
                VaultsAction::List => {
                    let page: ListResponse<VaultResponse> =
                        api.send_json(client.get(&["vaults"])).await?;
                    output.print_list(&page.items, "No vaults found.")
                }
                VaultsAction::Create { name } => {
                    let body = object_from([("name", non_empty(name.as_ref()))]);
                    let vault: VaultResponse = api
                        .send_json(client.post(&["vaults", "create"]).json(&body))
                        .await?;
                    output.print(&vault)
                }
                VaultsAction::Update { id, name } => {
                    let result = api
                        .send_value(client.patch(&["vaults", id]).json(&json!({"name": name})))
                        .await?;
                    output.print(&result)
                }
                _ => Ok(()),
            }
        }
    }
}

async fn delete_vault(id: &str, cli: &Cli) -> Result<()> {
    if !confirm(cli, &format!("delete vault {id}"))? {
        return Ok(());
    }
    let api = Api::connect(cli).await?;
    api.send(api.client.delete(&["vaults", id])).await?;
    Output::from_cli(cli).print_result(
        &format!("Vault {id} deleted."),
        json!({"id": id, "status": "deleted"}),
    )
}

// ============================================================================
// Credentials
// ============================================================================

fn vault_id(id: Option<&String>) -> Result<&str> {
    id.map(String::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| anyhow!("vault ID required: use --id flag"))
}

async fn credentials(args: &CredentialsArgs, cli: &Cli) -> Result<()> {
    let id = vault_id(args.id.as_ref())?;

    match &args.action {
        CredentialsAction::Add(add) => {
            let body = credentials_body(add)?;
            let api = Api::connect(cli).await?;
            let result = api
                .send_value(api.client.post(&["vaults", id, "credentials"]).json(&body))
                .await?;
            Output::from_cli(cli).print(&result)
        }
        CredentialsAction::List => {
            let api = Api::connect(cli).await?;
            let vault = api.send_value(api.client.get(&["vaults", id])).await?;
            let creds = vault.get("credentials").cloned().unwrap_or(Value::Null);
            Output::from_cli(cli).print_list(&creds, "No credentials found.")
        }
        CredentialsAction::Get { url } => {
            let api = Api::connect(cli).await?;
            let result = api
                .send_value(
                    api.client
                        .get(&["vaults", id, "credentials"])
                        .query("url", url),
                )
                .await?;
            Output::from_cli(cli).print(&result)
        }
        CredentialsAction::Delete { url } => {
            if !confirm(cli, &format!("delete credentials for {url}"))? {
                return Ok(());
            }
            let api = Api::connect(cli).await?;
            api.send(
                api.client
                    .delete(&["vaults", id, "credentials"])
                    .query("url", url),
            )
            .await?;
            Output::from_cli(cli).print_result(
                &format!("Credentials for URL {url} deleted from vault {id}."),
                json!({"vault_id": id, "url": url, "status": "deleted"}),
            )
        }
    }
}

/// Validates the inputs and builds the add-credentials body.
pub fn credentials_body(args: &CredentialsAddArgs) -> Result<Value> {
    Url::parse(&args.url).map_err(|e| anyhow!("invalid URL format: {e}"))?;
    if args.password.trim().is_empty() {
        bail!("password cannot be empty or whitespace");
    }
    if let Some(email) = args.email.as_deref().filter(|e| !e.is_empty()) {
        validate_email(email)?;
    }

    let credentials = object_from([
        ("password", Some(json!(args.password))),
        ("email", non_empty(args.email.as_ref())),
        ("username", non_empty(args.username.as_ref())),
        ("mfa_secret", non_empty(args.mfa_secret.as_ref())),
    ]);
    Ok(json!({"url": args.url, "credentials": credentials}))
}

/// Accepts `local@domain` with no whitespace, optionally in `Name <addr>`
/// form.
pub fn validate_email(email: &str) -> Result<()> {
    let address = match (email.find('<'), email.strip_suffix('>')) {
        (Some(start), Some(rest)) => &rest[start + 1..],
        _ => email.trim(),
    };

    let valid = match address.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !address.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        bail!("invalid email format: {email:?}");
    }
    Ok(())
}

// ============================================================================
// Credit Card
// ============================================================================

async fn card_command(args: &CardArgs, cli: &Cli) -> Result<()> {
    let id = vault_id(args.id.as_ref())?;

    match &args.action {
        CardAction::Get => {
            let api = Api::connect(cli).await?;
            let card = api.send_value(api.client.get(&["vaults", id, "card"])).await?;
            Output::from_cli(cli).print(&card)
        }
        CardAction::Set(set) => {
            let body = card_body(set)?;
            let api = Api::connect(cli).await?;
            let result = api
                .send_value(api.client.post(&["vaults", id, "card"]).json(&body))
                .await?;
            Output::from_cli(cli).print(&result)
        }
        CardAction::Delete => {
            if !confirm(cli, &format!("delete the credit card from vault {id}"))? {
                return Ok(());
            }
            let api = Api::connect(cli).await?;
            api.send(api.client.delete(&["vaults", id, "card"])).await?;
            Output::from_cli(cli).print_result(
                &format!("Credit card deleted from vault {id}."),
                json!({"vault_id": id, "status": "deleted"}),
            )
        }
    }
}

/// Validates the inputs and builds the set-card body.
pub fn card_body(args: &CardSetArgs) -> Result<Value> {
    let fields = [
        (&args.number, "card number"),
        (&args.expiry, "card expiry"),
        (&args.cvv, "card CVV"),
        (&args.name, "cardholder name"),
    ];
    for (value, label) in fields {
        if value.trim().is_empty() {
            bail!("{label} cannot be empty");
        }
    }

    Ok(json!({
        "credit_card": {
            "card_number": args.number,
            "card_full_expiration": args.expiry,
            "card_cvv": args.cvv,
            "card_holder_name": args.name,
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_args(url: &str, password: &str, email: Option<&str>) -> CredentialsAddArgs {
        CredentialsAddArgs {
            url: url.to_string(),
            email: email.map(str::to_string),
            username: None,
            password: password.to_string(),
            mfa_secret: None,
        }
    }

    #[test]
    fn test_credentials_body() {
        let body = credentials_body(&add_args(
            "https://example.com/login",
            "hunter2",
            Some("me@example.com"),
        ))
        .unwrap();
        assert_eq!(
            body,
            json!({
                "url": "https://example.com/login",
                "credentials": {"password": "hunter2", "email": "me@example.com"}
            })
        );
    }

    #[test]
    fn test_blank_password_is_rejected() {
        let err = credentials_body(&add_args("https://example.com", "   ", None)).unwrap_err();
        assert_eq!(err.to_string(), "password cannot be empty or whitespace");
    }

    #[test]
    fn test_bad_url_is_rejected() {
        let err = credentials_body(&add_args("not a url", "pw", None)).unwrap_err();
        assert!(err.to_string().starts_with("invalid URL format"));
    }

    #[test]
    fn test_email_validation() {
        assert!(validate_email("me@example.com").is_ok());
        assert!(validate_email("Me <me@example.com>").is_ok());
        assert!(validate_email("me.example.com").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("me@").is_err());
        assert!(validate_email("me @example.com").is_err());
    }

    #[test]
    fn test_card_body() {
        let args = CardSetArgs {
            number: "4111111111111111".to_string(),
            expiry: "12/25".to_string(),
            cvv: "123".to_string(),
            name: "Tester".to_string(),
        };
        assert_eq!(
            card_body(&args).unwrap()["credit_card"]["card_full_expiration"],
            "12/25"
        );
    }

    #[test]
    fn test_empty_card_fields_are_named() {
        let args = CardSetArgs {
            number: "4111111111111111".to_string(),
            expiry: "12/25".to_string(),
            cvv: " ".to_string(),
            name: "Tester".to_string(),
        };
        assert_eq!(card_body(&args).unwrap_err().to_string(), "card CVV cannot be empty");
    }

    #[test]
    fn test_vault_id_required() {
        assert_eq!(
            vault_id(None).unwrap_err().to_string(),
            "vault ID required: use --id flag"
        );
        let id = "v1".to_string();
        assert_eq!(vault_id(Some(&id)).unwrap(), "v1");
    }
}
