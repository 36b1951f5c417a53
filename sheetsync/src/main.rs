//! Excel to MySQL import/export tool.
//!
//! Thin CLI over `sheetsync-core`: argument parsing, password prompting,
//! and result presentation. All transfer logic lives in the core crate.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use sheetsync_core::db::MySqlSession;
use sheetsync_core::error::redact_database_url;
use sheetsync_core::{
    init_logging, ConnectionConfig, Result, SheetSyncError, TableOutcome, TransferOptions,
};
use tracing::{debug, error};

#[derive(Parser)]
#[command(name = "sheetsync")]
#[command(about = "Transfer data between Excel workbooks and MySQL tables")]
#[command(version)]
#[command(long_about = "
sheetsync - Excel <-> MySQL transfer tool

One-shot, whole-table transfers:
- import a spreadsheet's rows into a table (all-or-nothing per file)
- export one table, or every table, into workbook sheets

The database password is read from the variable named by --password-env,
or prompted for interactively. It is never accepted as a flag value.

EXAMPLES:
  sheetsync import --host db1 --user app --database sales --table orders --file orders.xlsx
  sheetsync export --url mysql://app@db1/sales --table orders
  sheetsync export-all --host db1 --user app --database sales --output sales.xlsx
")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct GlobalArgs {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Args)]
struct ConnectionArgs {
    /// Connection URL (mysql://user@host:port/database), alternative to
    /// the discrete flags below
    #[arg(long, env = "SHEETSYNC_URL", conflicts_with_all = ["user", "database"])]
    url: Option<String>,

    /// Database host
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Database port
    #[arg(long, default_value_t = 3306)]
    port: u16,

    /// Database username
    #[arg(short, long)]
    user: Option<String>,

    /// Database name
    #[arg(short, long)]
    database: Option<String>,

    /// Environment variable to read the password from (prompted
    /// interactively when unset)
    #[arg(long)]
    password_env: Option<String>,
}

impl ConnectionArgs {
    fn into_config(self) -> Result<ConnectionConfig> {
        let mut config = if let Some(url) = &self.url {
            debug!("Using connection URL {}", redact_database_url(url));
            ConnectionConfig::from_url(url)?
        } else {
            let user = self
                .user
                .ok_or_else(|| SheetSyncError::configuration("--user is required"))?;
            let database = self
                .database
                .ok_or_else(|| SheetSyncError::configuration("--database is required"))?;
            ConnectionConfig::new(self.host, user, database).with_port(self.port)
        };

        if config.password.is_empty() {
            config.password = read_password(self.password_env.as_deref())?;
        }
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Import an Excel file into a MySQL table
    Import(ImportArgs),
    /// Export one MySQL table to an Excel file
    Export(ExportArgs),
    /// Export every table of the database into one workbook
    ExportAll(ExportAllArgs),
    /// Test the database connection
    Test(TestArgs),
}

#[derive(Args)]
struct ImportArgs {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Name of the target table
    #[arg(short, long)]
    table: String,

    /// Path of the Excel file to import
    #[arg(short, long)]
    file: PathBuf,

    /// Rows per INSERT statement (1 reports the exact failing row)
    #[arg(long, default_value_t = 1)]
    batch_size: usize,
}

#[derive(Args)]
struct ExportArgs {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Name of the table to export
    #[arg(short, long)]
    table: String,

    /// Output file path (defaults to <table>.xlsx)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct ExportAllArgs {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Output file path (defaults to <database>_export.xlsx)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the per-table summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct TestArgs {
    #[command(flatten)]
    connection: ConnectionArgs,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.global.verbose, cli.global.quiet) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    match run(cli.command).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

async fn run(command: Command) -> Result<i32> {
    match command {
        Command::Import(args) => {
            let config = args.connection.into_config()?;
            let options = TransferOptions::default().with_batch_size(args.batch_size);
            let rows = sheetsync_core::import_file(&config, &args.table, &args.file, &options).await?;
            println!(
                "Successfully imported data from '{}' into table '{}'",
                args.file.display(),
                args.table
            );
            println!("{rows} row(s) were inserted");
            Ok(0)
        }
        Command::Export(args) => {
            let config = args.connection.into_config()?;
            let output = args
                .output
                .unwrap_or_else(|| PathBuf::from(format!("{}.xlsx", args.table)));
            let rows = sheetsync_core::export_one_table(&config, &args.table, &output).await?;
            println!(
                "Successfully exported {rows} row(s) from '{}' to '{}'",
                args.table,
                output.display()
            );
            Ok(0)
        }
        Command::ExportAll(args) => {
            let config = args.connection.into_config()?;
            let output = args
                .output
                .unwrap_or_else(|| PathBuf::from(format!("{}_export.xlsx", config.database)));
            let summary = sheetsync_core::export_all_tables(&config, &output).await?;

            if args.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&summary).map_err(|e| {
                        SheetSyncError::configuration(format!("summary serialization failed: {e}"))
                    })?
                );
            } else {
                report_summary(&summary, &output);
            }
            Ok(i32::from(summary.has_failures()))
        }
        Command::Test(args) => {
            let config = args.connection.into_config()?;
            let session = MySqlSession::connect(&config).await?;
            let result = session.ping().await;
            session.close().await;
            result?;
            println!("Connection to {config} successful");
            Ok(0)
        }
    }
}

fn report_summary(summary: &sheetsync_core::ExportSummary, output: &std::path::Path) {
    for (table, outcome) in summary.outcomes() {
        match outcome {
            TableOutcome::Exported { rows } => println!("  {table}: {rows} row(s)"),
            TableOutcome::Failed { reason } => println!("  {table}: FAILED ({reason})"),
        }
    }
    println!(
        "Exported {}/{} table(s) to '{}'",
        summary.exported_count(),
        summary.len(),
        output.display()
    );
}

fn read_password(password_env: Option<&str>) -> Result<String> {
    match password_env {
        Some(var) => std::env::var(var).map_err(|_| {
            SheetSyncError::configuration(format!("environment variable '{var}' is not set"))
        }),
        None => rpassword::prompt_password("Enter database password: ").map_err(|e| {
            SheetSyncError::configuration(format!("failed to read password: {e}"))
        }),
    }
}
