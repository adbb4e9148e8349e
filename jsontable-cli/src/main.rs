use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use jsontable_client::{KeySetTableReader, Lookup, Session, TableApi, TableReader};
use jsontable_core::{ClientConfig, DisplayValue, EncodedQuery, Key, Parameters, RecordList};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod table;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    /// Table format (default)
    Table,
    /// Pretty JSON
    Json,
    /// JSON Lines (one record per line)
    Jsonl,
}

#[derive(Parser)]
#[command(name = "jsontable")]
#[command(about = "Read and write remote tables over the JSONv2 API", long_about = None)]
struct Cli {
    /// JSON config file (defaults to JSONTABLE_* environment variables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Instance base URL, e.g. https://dev1.example.com/
    #[arg(long, global = true)]
    instance: Option<String>,

    #[arg(short, long, global = true)]
    username: Option<String>,

    #[arg(short, long, global = true)]
    password: Option<String>,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the keys of matching rows
    Keys {
        /// Table name
        table: String,
        /// Encoded query, e.g. "active=true^priority=1"
        #[arg(short, long)]
        query: Option<String>,
    },
    /// Get one record by key
    Get {
        /// Table name
        table: String,
        /// Record key (sys_id)
        key: String,
        /// Output format (table, json, jsonl)
        #[arg(short, long, value_enum, default_value = "json")]
        output: OutputFormat,
    },
    /// List matching records
    List {
        /// Table name
        table: String,
        /// Encoded query
        #[arg(short, long)]
        query: Option<String>,
        /// Include display values
        #[arg(short, long)]
        display: bool,
        /// Read every matching row page by page instead of one request
        #[arg(long)]
        all: bool,
        /// Output format (table, json, jsonl)
        #[arg(short, long, value_enum, default_value = "table")]
        output: OutputFormat,
    },
    /// Insert a record
    Insert {
        /// Table name
        table: String,
        /// Fields as a flat JSON object
        fields: String,
    },
    /// Update a record
    Update {
        /// Table name
        table: String,
        /// Record key (sys_id)
        key: String,
        /// Fields as a flat JSON object
        fields: String,
    },
    /// Delete a record
    Delete {
        /// Table name
        table: String,
        /// Record key (sys_id)
        key: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli)?;
    debug!(instance = %config.instance_url, "configuration loaded");
    let session = Session::from_config(&config).context("Failed to create session")?;

    match cli.command {
        Commands::Keys { table, query } => {
            let api = session.table_api(table);
            let query = parse_query(query);
            let keys = api.get_keys(query.as_ref()).await.context("Failed to get keys")?;
            for key in &keys {
                println!("{}", key);
            }
        }

        Commands::Get { table, key, output } => {
            let api = session.table_api(table);
            let key = Key::new(key).context("Invalid key")?;
            match api.get_record(&key).await.context("Failed to get record")? {
                Lookup::Found(record) => {
                    let list = RecordList::new(api.table().clone(), vec![record]);
                    print_records(&list, output)?;
                }
                Lookup::NotFound => {
                    println!("Record not found");
                }
            }
        }

        Commands::List {
            table,
            query,
            display,
            all,
            output,
        } => {
            let api = session.table_api(table);
            let query = parse_query(query);
            let display = DisplayValue::from_flag(display);

            let records = if all {
                let mut reader = KeySetTableReader::new(&api)
                    .with_display_value(display)
                    .with_page_size(session.page_size());
                if let Some(q) = query {
                    reader = reader.with_query(q);
                }
                reader.read_all().await.context("Failed to read table")?
            } else {
                api.get_records(query.as_ref(), display)
                    .await
                    .context("Failed to get records")?
            };

            print_records(&records, output)?;
            if let OutputFormat::Table = output {
                println!();
                println!("Count: {}", records.len());
            }
        }

        Commands::Insert { table, fields } => {
            let api = session.table_api(table);
            let fields = parse_fields(&fields)?;
            let inserted = api.insert_record(&fields).await.context("Failed to insert record")?;
            println!("✓ Record inserted: {}", inserted.key());
        }

        Commands::Update { table, key, fields } => {
            let api = session.table_api(table);
            let key = Key::new(key).context("Invalid key")?;
            let fields = parse_fields(&fields)?;
            api.update_record(&key, &fields).await.context("Failed to update record")?;
            println!("✓ Record updated: {}", key);
        }

        Commands::Delete { table, key } => {
            let api = session.table_api(table);
            let key = Key::new(key).context("Invalid key")?;
            if api.delete_record(&key).await.context("Failed to delete record")? {
                println!("✓ Record deleted: {}", key);
            } else {
                println!("Record not found");
            }
        }
    }

    Ok(())
}

/// Config file or environment first, then command line overrides
fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::from_json_file(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None => ClientConfig::from_env().context("Invalid JSONTABLE_* environment")?,
    };

    if let Some(instance) = &cli.instance {
        config.instance_url = instance.clone();
    }
    if let Some(username) = &cli.username {
        config.username = Some(username.clone());
    }
    if let Some(password) = &cli.password {
        config.password = Some(password.clone());
    }

    if config.instance_url.is_empty() {
        bail!("No instance given: use --instance, --config or JSONTABLE_INSTANCE");
    }
    Ok(config)
}

fn parse_query(query: Option<String>) -> Option<EncodedQuery> {
    query.map(EncodedQuery::from)
}

fn parse_fields(text: &str) -> Result<Parameters> {
    let json: serde_json::Value = serde_json::from_str(text).context("Invalid JSON")?;
    let fields = Parameters::from_json(&json).context("Invalid fields")?;
    if fields.is_empty() {
        bail!("No fields given");
    }
    Ok(fields)
}

fn print_records(records: &RecordList, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Table => {
            println!("{}", table::format_records_table(records));
        }
        OutputFormat::Json => {
            let json: Vec<_> = records.iter().map(|r| r.to_json()).collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Jsonl => {
            for record in records {
                println!("{}", serde_json::to_string(&record.to_json())?);
            }
        }
    }
    Ok(())
}
