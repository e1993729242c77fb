//! xmlsql CLI - query XML documents with SQL

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use xmlsql::config::{default_config_path, load_config, write_config, ProjectConfig};
use xmlsql::mapping;
use xmlsql::source::XmlEventReader;
use xmlsql::storage::RelationalEngine;
use xmlsql::table::TableCatalog;
use xmlsql::ui::{self, Icons, Spinner};
use xmlsql::XmlDocument;

#[derive(Parser)]
#[command(name = "xmlsql")]
#[command(version)]
#[command(about = "Query XML documents with SQL")]
#[command(long_about = r#"
xmlsql maps an XML document onto SQLite tables:
  • every nested element path becomes a table (Shop_Item for <Shop><Item>)
  • attributes become columns, element text goes to _text
  • rows link to their parent element through _parentId

Example usage:
  xmlsql tables shop.xml
  xmlsql query shop.xml --sql "SELECT name FROM Shop_Item WHERE price > 10"
  xmlsql sync shop.xml -e "DELETE FROM Shop_Item WHERE stock = '0'" --in-place
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Project config (mapping options and declared tables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Keep the database in memory instead of a temporary file
    #[arg(long, global = true)]
    in_memory: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the SQL script a document converts to
    Script {
        /// XML document
        file: PathBuf,

        /// Write the script to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a query against a document
    Query {
        /// XML document
        file: PathBuf,

        /// SQL to run
        #[arg(short, long)]
        sql: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Show the tables a document maps to
    Tables {
        /// XML document
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Apply statements and write the document back
    Sync {
        /// XML document
        file: PathBuf,

        /// Statements to execute before writing back
        #[arg(short, long)]
        execute: Vec<String>,

        /// Write to a file instead of stdout
        #[arg(short, long, conflicts_with = "in_place")]
        output: Option<PathBuf>,

        /// Overwrite the source document
        #[arg(long)]
        in_place: bool,
    },

    /// Write a default xmlsql.toml
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    let mut project = match load_config(cli.config.as_deref())? {
        Some(project) => project,
        None => {
            if let Some(path) = &cli.config {
                ui::warn(&format!("{} not found, using default mapping", path.display()));
            }
            ProjectConfig::default()
        }
    };
    if cli.in_memory {
        project.mapping.use_in_memory_store = true;
    }

    run(cli.command, cli.config.as_deref(), project)
}

fn run(command: Commands, config_path: Option<&Path>, project: ProjectConfig) -> anyhow::Result<()> {
    match command {
        Commands::Script { file, output } => {
            let catalog = TableCatalog::from_definitions(project.tables)?;
            let mut source = XmlEventReader::from_path(&file)?;
            let (_, script) = mapping::convert(&mut source, catalog, &project.mapping)?;

            match output {
                Some(path) => {
                    fs::write(&path, script.to_string())?;
                    ui::status(Icons::SAVE, "Script", &path.display().to_string());
                    ui::info("Tables", &script.create_tables().len().to_string());
                    ui::info("Rows", &script.inserts().len().to_string());
                }
                None => print!("{}", script),
            }
        }

        Commands::Query { file, sql, format } => {
            let document = open(&file, project)?;
            let rows = document.query(&sql)?;

            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
                Format::Text if rows.columns.is_empty() => ui::success("Statement executed"),
                Format::Text => {
                    println!("{}", ui::rows_table(&rows));
                    println!("{}", ui::muted(&format!("{} rows", rows.len())));
                }
            }
        }

        Commands::Tables { file, format } => {
            let document = open(&file, project)?;
            let hierarchy = document.hierarchy()?;

            if format == Format::Json {
                let tables: Vec<_> = hierarchy
                    .iter()
                    .map(|t| {
                        serde_json::json!({
                            "name": t.name,
                            "tag": t.tag,
                            "parent": t.parent,
                            "columns": t.columns,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&tables)?);
                return Ok(());
            }

            ui::header(&format!("<{}> {}", document.envelope().tag, file.display()));
            ui::section("Hierarchy");
            for table in hierarchy.iter() {
                let rows = document.store().fetch_rows(&table.name, None, None)?.len();
                ui::hierarchy_line(hierarchy.depth(&table.name), &table.tag, rows);
            }
            ui::section("Tables");
            println!("{}", ui::hierarchy_table(&hierarchy, document.config()));
        }

        Commands::Sync {
            file,
            execute,
            output,
            in_place,
        } => {
            let document = open(&file, project)?;
            for statement in &execute {
                document.execute(statement)?;
                tracing::debug!("executed {}", statement);
            }

            if in_place {
                document.save()?;
                ui::status(Icons::SAVE, "Saved", &file.display().to_string());
            } else if let Some(path) = output {
                document.save_as(&path)?;
                ui::status(Icons::SAVE, "Written", &path.display().to_string());
            } else {
                let stdout = io::stdout();
                let mut out = BufWriter::new(stdout.lock());
                document.write_xml(&mut out)?;
                out.flush()?;
            }
        }

        Commands::Init { force } => {
            let path = config_path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
            write_config(&path, &ProjectConfig::default(), force)?;
            ui::success(&format!("Wrote {}", path.display()));
        }
    }

    Ok(())
}

fn open(file: &Path, project: ProjectConfig) -> anyhow::Result<XmlDocument> {
    let spinner = Spinner::new(&format!("Loading {}", file.display()));
    match XmlDocument::open(file, project.tables, project.mapping) {
        Ok(document) => {
            spinner.finish(&format!("Loaded {}", file.display()));
            Ok(document)
        }
        Err(e) => {
            spinner.abandon();
            Err(e.into())
        }
    }
}
