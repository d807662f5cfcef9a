//! modm-translate: translate legacy modular-odm queries into ORM filters
//!
//! Reads a query in the textual `Q('attr', 'op', value) & ...` form or as
//! JSON, translates it against an optional model from the catalog, and
//! prints the resulting filter.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use modm_compat::{translate, EntityType, ModelRegistry, QueryNode};
use orm_filter::{eval, Filter};
use serde_json::json;
use tracing::info;

mod config;
mod logging;

use config::{Config, OutputFormat};

#[derive(Debug, Parser)]
#[command(name = "modm-translate", version, about = "Translate legacy modular-odm queries into ORM filters")]
struct Cli {
    /// Query text, e.g. "Q('tags', 'eq', 'foo') & Q('_id', 'ne', None)". Read from stdin when omitted.
    query: Option<String>,

    /// Read the query from a file (JSON if it starts with '{')
    #[arg(short, long, conflicts_with = "query")]
    file: Option<PathBuf>,

    /// Configuration file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Model catalog (YAML), overrides the configured one
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Model to resolve aliases and field kinds against
    #[arg(short, long)]
    model: Option<String>,

    /// Output format, overrides the configured one
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// JSON array of records to evaluate the filter against
    #[arg(long)]
    records: Option<PathBuf>,

    /// List known models and exit
    #[arg(long)]
    list_models: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    config.apply_logging_env();
    logging::init();

    let registry = load_registry(&cli, &config)?;
    if cli.list_models {
        for name in registry.names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let node = read_query(&cli)?;
    let model = cli.model.as_deref().or(config.catalog.default_model.as_deref());
    let entity: Option<&dyn EntityType> = model.map(|name| registry.entity(name)).transpose()?;

    let filter = translate(&node, entity)?;
    let fingerprint = filter.fingerprint()?;
    info!(model = model.unwrap_or("-"), lookups = filter.lookups().len(), %fingerprint, "translated query");

    match cli.format.unwrap_or(config.output.format) {
        OutputFormat::Text => {
            println!("{}", filter);
            println!("fingerprint: {}", fingerprint);
        }
        OutputFormat::Json => {
            let out = json!({ "filter": filter, "fingerprint": fingerprint });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }

    if let Some(path) = &cli.records {
        print_matches(&filter, path)?;
    }
    Ok(())
}

fn load_registry(cli: &Cli, config: &Config) -> Result<ModelRegistry> {
    let catalog = cli
        .catalog
        .clone()
        .or_else(|| config.catalog.path.as_ref().map(PathBuf::from));
    match catalog {
        Some(path) if path.exists() || cli.catalog.is_some() => ModelRegistry::load(&path)
            .with_context(|| format!("loading catalog {}", path.display())),
        // A configured-but-absent catalog falls back to the builtins
        _ => Ok(ModelRegistry::with_builtins()),
    }
}

fn read_query(cli: &Cli) -> Result<QueryNode> {
    let source = match (&cli.query, &cli.file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        (None, None) => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).context("reading stdin")?;
            buf
        }
    };

    let source = source.trim();
    if source.is_empty() {
        bail!("no query given");
    }
    if source.starts_with('{') {
        let value: serde_json::Value = serde_json::from_str(source).context("parsing JSON query")?;
        return Ok(QueryNode::from_json(value)?);
    }
    Ok(QueryNode::Legacy(modm_query::parse(source)?))
}

fn print_matches(filter: &Filter, path: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let records: Vec<serde_json::Value> =
        serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;

    let matched = eval::filter_records(filter, &records);
    info!(total = records.len(), matched = matched.len(), "evaluated records");
    for record in matched {
        println!("{}", serde_json::to_string(record)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["modm-translate", "--model", "PreprintLog", "Q('user', 'eq', 'u1')"]).unwrap();
        assert_eq!(cli.model.as_deref(), Some("PreprintLog"));
        assert!(cli.file.is_none());

        let node = read_query(&cli).unwrap();
        let registry = ModelRegistry::with_builtins();
        let filter = translate(&node, Some(registry.entity("PreprintLog").unwrap())).unwrap();
        assert_eq!(filter, Filter::lookup("user__guids___id__exact", "u1"));
    }

    #[test]
    fn test_json_query_input() {
        let text = r#"{"compat": {"attribute": "_id", "operator": "eq", "argument": "x"}}"#;
        let cli = Cli::try_parse_from(["modm-translate", text]).unwrap();
        let filter = translate(&read_query(&cli).unwrap(), None).unwrap();
        assert_eq!(filter, Filter::lookup("pk__exact", "x"));
    }

    #[test]
    fn test_query_and_file_conflict() {
        assert!(Cli::try_parse_from(["modm-translate", "--file", "q.json", "Q('a', 'eq', 1)"]).is_err());
    }
}
