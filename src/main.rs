use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use erp_grid::{
    Row, RowId,
    backend::{BatchBackend, http},
    bulk::BulkCoordinator,
    config::TableConfig,
    row,
    schema::TableSchema,
    table::{Direction, Sort, TableEngine},
    tree,
};
use serde_json::{Value, json};
use tracing::{error, info, warn};

fn parse_pair(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .ok_or_else(|| format!("expected key=value, got {s}"))
}

#[derive(Parser)]
struct Opts {
    #[clap(short, long, env = "ERP_GRID_CONFIG")]
    config: PathBuf,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Remote {
    #[clap(long)]
    endpoint: String,
    #[clap(long, env = "ERP_GRID_TOKEN")]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the visible page of a JSON row file.
    View {
        #[clap(long)]
        rows: PathBuf,
        #[clap(long)]
        search: Option<String>,
        #[clap(long = "filter", value_parser = parse_pair)]
        filters: Vec<(String, String)>,
        #[clap(long)]
        sort: Option<String>,
        #[clap(long)]
        desc: bool,
        #[clap(long, default_value_t = 0)]
        page: usize,
        #[clap(long)]
        tree: bool,
        #[clap(long)]
        expand: Vec<String>,
    },
    /// Delete rows through the backend in one batch.
    Delete {
        #[clap(flatten)]
        remote: Remote,
        #[clap(required = true)]
        ids: Vec<String>,
    },
    /// Set fields on rows through the backend in one batch.
    Update {
        #[clap(flatten)]
        remote: Remote,
        #[clap(long = "set", value_parser = parse_pair, required = true)]
        set: Vec<(String, String)>,
        #[clap(required = true)]
        ids: Vec<String>,
    },
}

async fn remote_engine(
    schema: &TableSchema,
    remote: Remote,
    ids: &[String],
) -> anyhow::Result<(http::Client, TableEngine<row::Record>)> {
    let client = http::Client::new(&remote.endpoint, remote.token, schema.clone())?;
    let rows = client.load().await.with_context(|| "load rows")?;
    let mut engine = TableEngine::new(schema, rows);
    for id in ids {
        let id = RowId::new(id.as_str());
        if !engine.rows().iter().any(|row| row.id() == &id) {
            warn!(%id, "row not found, skipping");
            continue;
        }
        engine.toggle_row(&id);
    }
    if engine.selection().is_empty() {
        bail!("none of the given rows exist");
    }
    Ok((client, engine))
}

async fn run(opts: Opts) -> anyhow::Result<()> {
    let config = TableConfig::load(&opts.config).await?;
    let schema = TableSchema::compile(&config)
        .with_context(|| format!("compile schema from {}", opts.config.display()))?;

    match opts.command {
        Command::View {
            rows,
            search,
            filters,
            sort,
            desc,
            page,
            tree: as_tree,
            expand,
        } => {
            let document = tokio::fs::read_to_string(&rows)
                .await
                .with_context(|| format!("read {}", rows.display()))?;
            let entities: Vec<Value> = serde_json::from_str(&document)
                .with_context(|| format!("parse rows from {}", rows.display()))?;
            let mut engine = TableEngine::new(&schema, row::normalize(&schema, entities)?);
            for (key, value) in filters {
                engine.set_filter(key, value)?;
            }
            if let Some(search) = search {
                engine.set_search(search);
            }
            engine.set_sort(sort.map(|key| Sort {
                key,
                direction: if desc {
                    Direction::Descending
                } else {
                    Direction::Ascending
                },
            }));

            if as_tree {
                for id in expand {
                    engine.set_expanded(&RowId::new(id), true);
                }
                let forest =
                    tree::build_forest(engine.sorted().into_iter().cloned().collect::<Vec<_>>());
                for node in tree::flatten_visible(&forest, engine.expanded()) {
                    println!(
                        "{}",
                        json!({
                            "depth": node.depth,
                            "has_children": node.has_children,
                            "row": node.row,
                        })
                    );
                }
            } else {
                engine.set_page(page);
                for row in engine.page_rows() {
                    println!("{}", serde_json::to_string(row)?);
                }
                info!(
                    page = engine.page() + 1,
                    pages = engine.page_count(),
                    matched = engine.filtered().len(),
                    "page printed"
                );
            }
        }
        Command::Delete { remote, ids } => {
            let (client, mut engine) = remote_engine(&schema, remote, &ids).await?;
            let outcome = BulkCoordinator::default()
                .submit_bulk_delete(&mut engine, &client)
                .await?;
            info!(submitted = outcome.submitted, message = ?outcome.message, "rows deleted");
        }
        Command::Update { remote, set, ids } => {
            let (client, mut engine) = remote_engine(&schema, remote, &ids).await?;
            let mut bulk = BulkCoordinator::default();
            let draft_ids = bulk
                .open_bulk_edit(&engine, &schema)
                .iter()
                .map(|draft| draft.id.clone())
                .collect::<Vec<_>>();
            for id in &draft_ids {
                for (key, value) in &set {
                    let value = serde_json::from_str(value)
                        .unwrap_or_else(|_| Value::String(value.clone()));
                    bulk.update_draft_field(id, key.as_str(), value)?;
                }
            }
            let outcome = bulk.submit_bulk_edit(&mut engine, &client).await?;
            info!(submitted = outcome.submitted, message = ?outcome.message, "rows updated");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let opts = Opts::parse();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    if let Err(e) = run(opts).await {
        error!(?e, "critical error");
        std::process::exit(1);
    }
}
