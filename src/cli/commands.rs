//! CLI command definitions for bookforge.
//!
//! Each subcommand is a thin driver over the library: it wires a store,
//! pipeline or auditor, runs exactly one operation and prints a summary.

use clap::Parser;
use serde::Serialize;
use tracing::info;

use crate::audit::StoreAudit;
use crate::llm::{OpenAiClient, DEFAULT_API_BASE, DEFAULT_MODEL};
use crate::pipeline::{ForgeConfig, ForgePipeline, PlaceholderGenerator};
use crate::schema::EntityKind;
use crate::store::RecordStore;

/// Default data directory for record tables.
const DEFAULT_DATA_DIR: &str = "./data";

/// Synthetic hotel-booking dataset generator.
#[derive(Parser)]
#[command(name = "bookforge")]
#[command(about = "Generate synthetic hotel-booking records with an LLM")]
#[command(version)]
#[command(
    long_about = "bookforge seeds placeholder records for a fixed hotel-booking schema, completes them through an OpenAI-compatible chat endpoint, and audits the resulting store.\n\nExample usage:\n  bookforge seed --entity hotel --count 3\n  bookforge complete --entity hotel\n  bookforge audit"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Seed placeholder records for an entity.
    Seed(SeedArgs),

    /// Complete stored placeholder records through the LLM endpoint.
    Complete(CompleteArgs),

    /// Generate fully-populated records from a configured prompt.
    #[command(alias = "gen")]
    Generate(GenerateArgs),

    /// Audit the store for integrity problems.
    Audit(AuditArgs),
}

/// Arguments for the seed command.
#[derive(Parser, Debug)]
pub struct SeedArgs {
    /// Entity to seed (hotel, room, option, room_option, hotel_option,
    /// stay_option, customer, reservation).
    #[arg(short = 'e', long)]
    pub entity: String,

    /// Number of placeholder records to create.
    #[arg(short = 'n', long, default_value = "1")]
    pub count: i64,

    /// Data directory holding the record tables.
    #[arg(short = 'd', long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: String,

    /// Fixed RNG seed for reproducible tag choices (BOOKFORGE_SEED
    /// applies when the flag is absent).
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output JSON summary.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for the complete command.
#[derive(Parser, Debug)]
pub struct CompleteArgs {
    /// Entity whose stored records should be completed.
    #[arg(short = 'e', long)]
    pub entity: String,

    /// Complete a single record by id instead of the whole pending table.
    #[arg(long)]
    pub id: Option<i64>,

    /// Data directory holding the record tables.
    #[arg(short = 'd', long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: String,

    /// Model to request from the endpoint.
    #[arg(short = 'm', long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// API key (can also be set via OPENAI_API_KEY env var).
    #[arg(long, env = "OPENAI_API_KEY")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint.
    #[arg(long, env = "OPENAI_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Maximum number of concurrent endpoint calls.
    #[arg(long, default_value = "4")]
    pub concurrency: usize,

    /// JSON file of per-entity completion instructions.
    #[arg(long)]
    pub instructions: Option<String>,

    /// JSON file of entity-to-context associations.
    #[arg(long)]
    pub associations: Option<String>,

    /// Output JSON summary.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for the generate command.
#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Entity to generate records for.
    #[arg(short = 'e', long)]
    pub entity: String,

    /// Number of records to generate.
    #[arg(short = 'n', long, default_value = "1")]
    pub count: i64,

    /// Data directory holding the record tables.
    #[arg(short = 'd', long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: String,

    /// Model to request from the endpoint.
    #[arg(short = 'm', long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// API key (can also be set via OPENAI_API_KEY env var).
    #[arg(long, env = "OPENAI_API_KEY")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint.
    #[arg(long, env = "OPENAI_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// JSON file of per-entity generation prompt pairs.
    #[arg(long)]
    pub prompts: Option<String>,

    /// Output JSON summary.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for the audit command.
#[derive(Parser, Debug)]
pub struct AuditArgs {
    /// Data directory holding the record tables.
    #[arg(short = 'd', long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: String,

    /// Output the full report as JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before
/// running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Seed(args) => run_seed_command(args).await,
        Commands::Complete(args) => run_complete_command(args).await,
        Commands::Generate(args) => run_generate_command(args).await,
        Commands::Audit(args) => run_audit_command(args).await,
    }
}

#[derive(Debug, Clone, Serialize)]
struct SeedOutput {
    status: String,
    entity: String,
    seeded: usize,
    ids: Vec<i64>,
    table_total: usize,
    path: String,
}

async fn run_seed_command(args: SeedArgs) -> anyhow::Result<()> {
    let kind: EntityKind = args.entity.parse()?;
    let store = RecordStore::new(&args.data_dir);
    let existing = store.read_records_or_default(kind).await?;

    let config = ForgeConfig::from_env()?;
    let generator = match args.seed.or(config.seed) {
        Some(seed) => PlaceholderGenerator::new().with_seed(seed),
        None => PlaceholderGenerator::new(),
    };
    let records = generator.generate(kind, args.count, &existing)?;
    let ids: Vec<i64> = records.iter().filter_map(RecordStore::record_id).collect();
    let table_total = store.append_records(kind, &records).await?;

    info!(
        entity = %kind,
        seeded = records.len(),
        table_total,
        "seeded placeholder records"
    );

    let output = SeedOutput {
        status: "success".to_string(),
        entity: kind.as_str().to_string(),
        seeded: records.len(),
        ids,
        table_total,
        path: store.record_path(kind).display().to_string(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!(
            "Seeded {} {} record(s) into {}",
            output.seeded, output.entity, output.path
        );
        println!(
            "Ids: {:?} (table now holds {} records)",
            output.ids, output.table_total
        );
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
struct CompleteFailure {
    id: i64,
    error: String,
}

#[derive(Debug, Clone, Serialize)]
struct CompleteOutput {
    status: String,
    entity: String,
    completed: usize,
    failed: Vec<CompleteFailure>,
    path: String,
}

async fn run_complete_command(args: CompleteArgs) -> anyhow::Result<()> {
    let kind: EntityKind = args.entity.parse()?;

    let mut config = ForgeConfig::new()
        .with_data_dir(&args.data_dir)
        .with_model(&args.model)
        .with_max_concurrent_completions(args.concurrency);
    if let Some(path) = &args.instructions {
        config = config.with_instructions_path(path);
    }
    if let Some(path) = &args.associations {
        config = config.with_associations_path(path);
    }

    let provider = OpenAiClient::new(args.api_base, args.api_key, args.model.clone());
    let pipeline = ForgePipeline::new(config, provider).await?;

    let (completed, failed) = match args.id {
        Some(id) => (vec![pipeline.complete_record(kind, id).await?], Vec::new()),
        None => {
            let outcome = pipeline.complete_batch(kind).await?;
            (outcome.completed, outcome.failed)
        }
    };
    let path = pipeline.persist_completed(kind, &completed).await?;

    let output = CompleteOutput {
        status: if failed.is_empty() {
            "success".to_string()
        } else {
            "partial".to_string()
        },
        entity: kind.as_str().to_string(),
        completed: completed.len(),
        failed: failed
            .into_iter()
            .map(|(id, error)| CompleteFailure { id, error })
            .collect(),
        path: path.display().to_string(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!(
            "Completed {} {} record(s), persisted to {}",
            output.completed, output.entity, output.path
        );
        for failure in &output.failed {
            println!("  id {} failed: {}", failure.id, failure.error);
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
struct GenerateOutput {
    status: String,
    entity: String,
    generated: usize,
    ids: Vec<i64>,
    table_total: usize,
}

async fn run_generate_command(args: GenerateArgs) -> anyhow::Result<()> {
    let kind: EntityKind = args.entity.parse()?;

    let mut config = ForgeConfig::new()
        .with_data_dir(&args.data_dir)
        .with_model(&args.model);
    if let Some(path) = &args.prompts {
        config = config.with_generation_prompts_path(path);
    }

    let provider = OpenAiClient::new(args.api_base, args.api_key, args.model.clone());
    let pipeline = ForgePipeline::new(config, provider).await?;

    let records = pipeline.generate_batch(kind, args.count).await?;
    let ids: Vec<i64> = records.iter().map(|record| record.id()).collect();
    let table_total = pipeline.persist_generated(kind, &records).await?;

    let output = GenerateOutput {
        status: "success".to_string(),
        entity: kind.as_str().to_string(),
        generated: records.len(),
        ids,
        table_total,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!(
            "Generated {} {} record(s) with ids {:?} (table now holds {} records)",
            output.generated, output.entity, output.ids, output.table_total
        );
    }
    Ok(())
}

async fn run_audit_command(args: AuditArgs) -> anyhow::Result<()> {
    let store = RecordStore::new(&args.data_dir);
    let report = StoreAudit::run(&store).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("\n=== Store Audit: {} ===", args.data_dir);
    println!(
        "Status:   {}",
        if report.clean { "clean" } else { "problems found" }
    );
    println!("Errors:   {}", report.errors.len());
    println!("Warnings: {}", report.warnings.len());
    for finding in &report.errors {
        match finding.id {
            Some(id) => println!("  [{} #{}] {}", finding.entity, id, finding.message),
            None => println!("  [{}] {}", finding.entity, finding.message),
        }
    }
    for warning in &report.warnings {
        println!("  (warning) {warning}");
    }

    if !report.clean {
        anyhow::bail!("audit found {} integrity problem(s)", report.errors.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        // Verify CLI definition is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn test_seed_command_defaults() {
        let args = vec!["bookforge", "seed", "--entity", "hotel"];
        let cli = Cli::try_parse_from(args).expect("should parse");

        match cli.command {
            Commands::Seed(args) => {
                assert_eq!(args.entity, "hotel");
                assert_eq!(args.count, 1);
                assert_eq!(args.data_dir, DEFAULT_DATA_DIR);
                assert!(args.seed.is_none());
                assert!(!args.json);
            }
            _ => panic!("Expected Seed command"),
        }
    }

    #[test]
    fn test_seed_command_with_all_options() {
        let args = vec![
            "bookforge",
            "seed",
            "-e",
            "reservation",
            "-n",
            "5",
            "-d",
            "./my-data",
            "--seed",
            "42",
            "-j",
        ];
        let cli = Cli::try_parse_from(args).expect("should parse");

        match cli.command {
            Commands::Seed(args) => {
                assert_eq!(args.entity, "reservation");
                assert_eq!(args.count, 5);
                assert_eq!(args.data_dir, "./my-data");
                assert_eq!(args.seed, Some(42));
                assert!(args.json);
            }
            _ => panic!("Expected Seed command"),
        }
    }

    #[test]
    fn test_complete_command_options() {
        let args = vec![
            "bookforge",
            "complete",
            "-e",
            "room",
            "--id",
            "3",
            "-m",
            "gpt-4o",
            "--concurrency",
            "8",
            "--associations",
            "./associations.json",
        ];
        let cli = Cli::try_parse_from(args).expect("should parse");

        match cli.command {
            Commands::Complete(args) => {
                assert_eq!(args.entity, "room");
                assert_eq!(args.id, Some(3));
                assert_eq!(args.model, "gpt-4o");
                assert_eq!(args.concurrency, 8);
                assert_eq!(args.associations, Some("./associations.json".to_string()));
                assert!(args.instructions.is_none());
            }
            _ => panic!("Expected Complete command"),
        }
    }

    #[test]
    fn test_generate_alias() {
        let args = vec!["bookforge", "gen", "-e", "hotel", "-n", "2"];
        let cli = Cli::try_parse_from(args).expect("should parse with alias");

        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.entity, "hotel");
                assert_eq!(args.count, 2);
            }
            _ => panic!("Expected Generate command"),
        }
    }

    #[test]
    fn test_seed_output_serialization() {
        let output = SeedOutput {
            status: "success".to_string(),
            entity: "hotel".to_string(),
            seeded: 3,
            ids: vec![1, 2, 3],
            table_total: 3,
            path: "./data/hotels.json".to_string(),
        };

        let json = serde_json::to_string_pretty(&output).expect("serialization should succeed");

        assert!(json.contains("\"entity\": \"hotel\""));
        assert!(json.contains("\"table_total\": 3"));
    }
}
