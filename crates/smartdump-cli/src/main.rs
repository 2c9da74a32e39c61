//! smartdump CLI - referentially-consistent partial MySQL dumps.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use smartdump::config::{parse_table_ref, validate_conditions};
use smartdump::{
    ConnectionConfig, DumpConfig, DumpError, DumpOptions, Dumper, MySqlStoreAdapter, TargetTable,
};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "smartdump")]
#[command(about = "Dump a set of tables and every row they reference")]
#[command(version)]
struct Cli {
    /// Path to a YAML configuration file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database host
    #[arg(long)]
    host: Option<String>,

    /// Database port
    #[arg(long)]
    port: Option<u16>,

    /// Username
    #[arg(short, long)]
    user: Option<String>,

    /// Password
    #[arg(short, long)]
    password: Option<String>,

    /// Database name; bare table names resolve against it
    #[arg(short, long)]
    database: Option<String>,

    /// Tables to dump in full: TABLE or SCHEMA.TABLE, optionally followed by
    /// :CONDITIONS appended to the table scan (e.g. "orders:LIMIT 10")
    #[arg(value_name = "TABLE")]
    tables: Vec<String>,

    /// Skip CREATE TABLE statements
    #[arg(long)]
    no_create_table: bool,

    /// Add DROP TABLE IF EXISTS before each CREATE TABLE
    #[arg(long)]
    add_drop_table: bool,

    /// Keep schema names in the output (prevents importing into a
    /// differently named schema)
    #[arg(long)]
    include_schema: bool,

    /// Emit upserts and no DDL, so the dump merges into existing data
    #[arg(long)]
    merge: bool,

    /// Write the dump to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "warn")]
    verbosity: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), DumpError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity)?;

    let (connection, targets, options) = resolve(&cli)?;

    let adapter = Arc::new(MySqlStoreAdapter::connect(&connection).await?);
    let dumper = Dumper::new(adapter);
    let mut stream = dumper.dump(&targets, options).await?;

    let mut out: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let mut statements = 0usize;
    while let Some(statement) = stream.next_statement().await {
        writeln!(out, "{}", statement?)?;
        statements += 1;
    }
    out.flush()?;

    info!("dump complete: {} statements", statements);
    Ok(())
}

/// Merge the config file (if any) with command-line overrides.
fn resolve(cli: &Cli) -> Result<(ConnectionConfig, Vec<TargetTable>, DumpOptions), DumpError> {
    let file = match &cli.config {
        Some(path) => Some(DumpConfig::load(path)?),
        None => None,
    };

    let mut connection = match &file {
        Some(config) => config.connection.clone(),
        None => ConnectionConfig {
            host: "localhost".to_string(),
            port: 3306,
            user: String::new(),
            password: String::new(),
            database: String::new(),
        },
    };

    if let Some(host) = &cli.host {
        connection.host = host.clone();
    }
    if let Some(port) = cli.port {
        connection.port = port;
    }
    if let Some(user) = &cli.user {
        connection.user = user.clone();
    }
    if let Some(password) = &cli.password {
        connection.password = password.clone();
    }
    if let Some(database) = &cli.database {
        connection.database = database.clone();
    }

    if connection.user.is_empty() {
        return Err(DumpError::config("No user specified (--user or config file)"));
    }
    if connection.database.is_empty() {
        return Err(DumpError::config(
            "No database specified (--database or config file)",
        ));
    }

    // Positional tables replace the config file's table list.
    let targets = if cli.tables.is_empty() {
        match &file {
            Some(config) => config.target_tables()?,
            None => Vec::new(),
        }
    } else {
        cli.tables
            .iter()
            .map(|spec| parse_table_spec(spec, &connection.database))
            .collect::<Result<_, _>>()?
    };

    if targets.is_empty() {
        return Err(DumpError::config("No tables requested"));
    }

    let mut options = file.map(|f| f.options).unwrap_or_default();
    if cli.no_create_table {
        options.add_create_table = false;
    }
    if cli.add_drop_table {
        options.add_drop_table = true;
    }
    if cli.include_schema {
        options.include_schema_name_in_output = true;
    }
    if cli.merge {
        options.merge = true;
    }

    Ok((connection, targets, options))
}

/// Parse a `TABLE[:CONDITIONS]` argument.
fn parse_table_spec(spec: &str, default_schema: &str) -> Result<TargetTable, DumpError> {
    let (name, conditions) = match spec.split_once(':') {
        Some((name, conditions)) => (name, Some(conditions)),
        None => (spec, None),
    };

    let table = parse_table_ref(name, default_schema)?;

    if let Some(conditions) = conditions {
        validate_conditions(conditions)?;
        Ok(TargetTable::with_conditions(table, conditions))
    } else {
        Ok(TargetTable::new(table))
    }
}

/// Route logs to stderr; stdout carries the dump.
fn setup_logging(verbosity: &str) -> Result<(), DumpError> {
    let level = match verbosity {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => {
            return Err(DumpError::config(format!(
                "Invalid verbosity: {} (expected debug, info, warn, or error)",
                other
            )))
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_table_spec_plain() {
        let target = parse_table_spec("orders", "shop").unwrap();
        assert_eq!(target.table.full_name(), "shop.orders");
        assert_eq!(target.conditions, None);
    }

    #[test]
    fn test_parse_table_spec_qualified_with_conditions() {
        let target = parse_table_spec("archive.events:WHERE user_id = 5", "shop").unwrap();
        assert_eq!(target.table.full_name(), "archive.events");
        assert_eq!(target.conditions.as_deref(), Some("WHERE user_id = 5"));
    }

    #[test]
    fn test_parse_table_spec_rejects_multi_statement_conditions() {
        assert!(parse_table_spec("orders:LIMIT 1; DROP TABLE x", "shop").is_err());
    }
}
