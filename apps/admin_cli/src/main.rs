use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use client_core::{CompanyApiClient, DataTable, TableConfig};
use shared::{
    company::{parse_assignment, ID_FIELD, SEARCH_FIELDS},
    domain::{Record, RecordId},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod render;

use config::{load_settings, Settings, DEFAULT_CONFIG_PATH};
use render::{columns, render_detail, render_grid};

#[derive(Parser, Debug)]
#[command(name = "company-admin", about = "Manage company master data through the company API")]
struct Cli {
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    api_key: Option<String>,
    #[arg(long, default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a page of companies, optionally filtered by code, name or subscriber.
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long)]
        page_size: Option<usize>,
        #[arg(long)]
        all_columns: bool,
    },
    Show {
        code: String,
    },
    Create {
        #[arg(long = "set", value_name = "FIELD=VALUE", required = true)]
        set: Vec<String>,
    },
    Update {
        code: String,
        #[arg(long = "set", value_name = "FIELD=VALUE", required = true)]
        set: Vec<String>,
    },
    Delete {
        #[arg(required = true)]
        codes: Vec<String>,
        /// Skip the confirmation prompt and delete.
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let mut settings = load_settings(&cli.config)?;
    if let Some(api_url) = cli.api_url {
        settings.api_url = Some(api_url);
    }
    if let Some(api_key) = cli.api_key {
        settings.api_key = Some(api_key);
    }

    let client = Arc::new(CompanyApiClient::new(settings.api_config()?)?);
    let output = run(cli.command, client, &settings).await?;
    print!("{output}");
    Ok(())
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn table_config(settings: &Settings) -> TableConfig {
    TableConfig::new(ID_FIELD)
        .with_search_fields(SEARCH_FIELDS)
        .with_page_size(settings.page_size)
}

async fn load_table(client: Arc<CompanyApiClient>, settings: &Settings) -> Result<DataTable> {
    let response = client.list_companies().await?;
    if !response.success {
        bail!(response
            .message
            .unwrap_or_else(|| "Failed to fetch companies".to_string()));
    }
    let companies = response.data.unwrap_or_default();
    info!(count = companies.len(), "loaded companies");
    Ok(DataTable::new_with_collaborator(
        table_config(settings),
        companies,
        client,
    ))
}

fn apply_assignments(record: &mut Record, assignments: &[String]) -> Result<()> {
    for raw in assignments {
        let (field, value) = parse_assignment(raw)?;
        record.insert(field, value);
    }
    Ok(())
}

async fn run(command: Command, client: Arc<CompanyApiClient>, settings: &Settings) -> Result<String> {
    match command {
        Command::List {
            search,
            page,
            page_size,
            all_columns,
        } => {
            let table = load_table(client, settings).await?;
            if let Some(page_size) = page_size {
                table.set_page_size(page_size).await;
            }
            if let Some(search) = search {
                table.set_search_term(search).await;
            }
            table.go_to_page(page).await;

            let rows = table.paginated_data().await;
            let selected = table.selected_rows().await;
            let mut out = render_grid(&rows, &columns(all_columns), ID_FIELD, &selected);
            out.push_str(&format!("{}\n", table.page_summary().await));
            Ok(out)
        }
        Command::Show { code } => {
            let response = client.get_company(&RecordId::from(code.as_str())).await?;
            if !response.success {
                bail!(response
                    .message
                    .unwrap_or_else(|| format!("Failed to fetch company {code}")));
            }
            let company = response
                .data
                .ok_or_else(|| anyhow!("API returned success but no data"))?;
            Ok(render_detail(&company))
        }
        Command::Create { set } => {
            let mut payload = Record::new();
            apply_assignments(&mut payload, &set)?;

            let table = DataTable::new_with_collaborator(table_config(settings), Vec::new(), client);
            let created = table.add_item(payload).await?;
            let code = RecordId::of(&created, ID_FIELD)
                .map(|id| id.to_string())
                .unwrap_or_default();
            Ok(format!("Created company {code}\n{}", render_detail(&created)))
        }
        Command::Update { code, set } => {
            let table = load_table(client, settings).await?;
            let id = RecordId::from(code.as_str());
            let existing = table
                .find(&id)
                .await
                .ok_or_else(|| anyhow!("company {code} not found"))?;
            table.set_current_item(Some(existing.clone())).await;

            let mut payload = existing;
            apply_assignments(&mut payload, &set)?;
            if RecordId::of(&payload, ID_FIELD).as_ref() != Some(&id) {
                bail!("{ID_FIELD} cannot be changed");
            }

            let updated = table.edit_item(payload).await?;
            table.set_current_item(None).await;
            Ok(format!("Updated company {code}\n{}", render_detail(&updated)))
        }
        Command::Delete { codes, yes } => {
            let ids: Vec<RecordId> = codes.iter().map(|code| RecordId::from(code.as_str())).collect();
            let noun = if ids.len() == 1 { "company" } else { "companies" };
            if !yes {
                return Ok(format!(
                    "Are you sure you want to delete {} {noun} ({})? This action cannot be undone.\nRe-run with --yes to confirm.\n",
                    ids.len(),
                    codes.join(", ")
                ));
            }

            let table = load_table(client, settings).await?;
            table.set_selected_rows(ids.clone()).await;
            table.delete_items(&ids).await?;
            Ok(format!("Deleted {} {noun}\n", ids.len()))
        }
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
