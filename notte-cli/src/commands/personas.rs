//! Personas command - synthetic identities with email, phone and vault.

use anyhow::Result;
use clap::{Args, Subcommand};
use notte_core::{ListResponse, PersonaResponse};
use serde_json::{Value, json};

use super::input::confirm;
use super::{Api, object_from};
use crate::Cli;
use crate::output::Output;

/// Arguments for the personas command.
#[derive(Args)]
pub struct PersonasArgs {
    #[command(subcommand)]
    pub action: PersonasAction,
}

/// Personas subcommands.
#[derive(Subcommand)]
pub enum PersonasAction {
    /// List personas.
    List,

    /// Create a new persona.
    Create {
        /// Create a phone number for the persona.
        #[arg(long, num_args = 0..=1, default_missing_value = "true")]
        create_phone_number: Option<bool>,

        /// Create a vault for the persona.
        #[arg(long, num_args = 0..=1, default_missing_value = "true")]
        create_vault: Option<bool>,
    },

    /// Show persona details.
    Show(PersonaIdArg),

    /// Delete a persona.
    Delete(PersonaIdArg),

    /// List emails received by the persona.
    Emails(PersonaIdArg),

    /// List SMS messages received by the persona.
    Sms(PersonaIdArg),

    /// Create a phone number for the persona.
    PhoneCreate(PersonaIdArg),

    /// Delete the persona's phone number.
    PhoneDelete(PersonaIdArg),
}

/// The `--id` of an existing persona.
#[derive(Args)]
pub struct PersonaIdArg {
    /// Persona ID.
    #[arg(long)]
    pub id: String,
}

/// Runs the personas command.
pub async fn run(args: &PersonasArgs, cli: &Cli) -> Result<()> {
    if let PersonasAction::Delete(PersonaIdArg { id }) = &args.action {
        return delete(id, cli).await;
    }

    let api = Api::connect(cli).await?;
    let output = Output::from_cli(cli);
    let client = &api.client;

    match &args.action {
        PersonasAction::List => {
            let page: ListResponse<PersonaResponse> =
                api.send_json(client.get(&["personas"])).await?;
            output.print_list(&page.items, "No personas found.")
        }
        PersonasAction::Create {
            create_phone_number,
            create_vault,
        } => {
            let body = object_from([
                ("create_phone_number", create_phone_number.map(Value::Bool)),
                ("create_vault", create_vault.map(Value::Bool)),
            ]);
            let persona: PersonaResponse = api
                .send_json(client.post(&["personas", "create"]).json(&body))
                .await?;
            output.print(&persona)
        }
        PersonasAction::Show(PersonaIdArg { id }) => {
            let persona: PersonaResponse = api.send_json(client.get(&["personas", id])).await?;
            output.print(&persona)
        }
        PersonasAction::Emails(PersonaIdArg { id }) => {
            let emails = api.send_value(client.get(&["personas", id, "emails"])).await?;
            output.print(&emails)
        }
        PersonasAction::Sms(PersonaIdArg { id }) => {
            let messages = api.send_value(client.get(&["personas", id, "sms"])).await?;
            output.print(&messages)
        }
        PersonasAction::PhoneCreate(PersonaIdArg { id }) => {
            let number = api
                .send_value(client.post(&["personas", id, "sms", "number"]))
                .await?;
            output.print(&number)
        }
        PersonasAction::PhoneDelete(PersonaIdArg { id }) => {
            let result = api
                .send_value(client.delete(&["personas", id, "sms", "number"]))
                .await?;
            output.print(&result)
        }
        PersonasAction::Delete(_) => Ok(()),
    }
}

async fn delete(id: &str, cli: &Cli) -> Result<()> {
    if !confirm(cli, &format!("delete persona {id}"))? {
        return Ok(());
    }
    let api = Api::connect(cli).await?;
    api.send(api.client.delete(&["personas", id])).await?;
    Output::from_cli(cli).print_result(
        &format!("Persona {id} deleted."),
        json!({"id": id, "status": "deleted"}),
    )
}
