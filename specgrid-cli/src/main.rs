use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};

use specgrid_core::{export, AttributionPolicy, ParseConfig, RuleSet, SheetProcessor};

#[derive(Parser)]
#[command(name = "specgrid")]
#[command(about = "A rule-driven spec-sheet CSV parser for sales-assistant ingestion")]
struct Args {
    /// Path to the spec-sheet CSV file to process
    #[arg(short, long)]
    input: PathBuf,

    /// Path to the rule file (JSON; shape selects the extraction strategy)
    #[arg(short, long)]
    rules: PathBuf,

    /// Path to custom parse config file (YAML format)
    #[arg(short, long)]
    config: Option<String>,

    /// Output CSV path (if not specified, auto-generated based on input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also dump raw extraction records as JSON for audit
    #[arg(long)]
    audit: Option<PathBuf>,

    /// Override the model attribution policy: assign_to_all or strict
    #[arg(long)]
    attribution: Option<AttributionPolicy>,

    /// Show available config options and exit
    #[arg(long)]
    show_configs: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("specgrid_core=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    println!("🦀 Specgrid Spec-Sheet Parser");

    if args.show_configs {
        show_help();
        return Ok(());
    }

    // Load config using the fallback pattern, then apply CLI overrides
    let mut config = ParseConfig::load_with_fallback(args.config.as_deref());
    if let Some(config_path) = &args.config {
        println!("📋 Loaded config from: {config_path}");
    } else {
        println!("📋 Using default config");
    }
    if let Some(policy) = args.attribution {
        config.attribution = policy;
    }

    let rules = match RuleSet::load(&args.rules) {
        Ok(rules) => rules,
        Err(e) => {
            eprintln!("❌ Rule file rejected: {e}");
            std::process::exit(1);
        }
    };
    println!("📐 Loaded rules from: {}", args.rules.display());

    println!("📄 Processing: {}", args.input.display());
    let processor = SheetProcessor::new(config);
    match processor.process(args.input.as_path(), &rules) {
        Ok(output) => {
            println!("✅ Successfully processed spec sheet");
            println!("📊 Extraction metrics:");
            println!("   - Models: {}", output.records.len());
            println!("   - Columns: {}", output.columns.len());
            println!("   - Raw extractions: {}", output.extractions.len());

            let output_path = args
                .output
                .clone()
                .unwrap_or_else(|| default_output_path(&args.input));
            export::write_records_csv(&output_path, &output)?;
            println!("💾 Records saved to: {}", output_path.display());

            if let Some(audit_path) = &args.audit {
                export::write_extraction_audit(audit_path, &output.extractions)?;
                println!("💾 Audit export saved to: {}", audit_path.display());
            }
        }
        Err(e) => {
            eprintln!("❌ Processing failed: {e}");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    input.with_file_name(format!("{stem}_records.csv"))
}

fn show_help() {
    println!("\n📋 Available Configuration Options:");
    println!("  --config <path>         Load custom parse config (YAML)");
    println!("  --input <path>          Spec-sheet CSV file to process");
    println!("  --rules <path>          Rule file (JSON)");
    println!("  --output <path>         Output CSV path (auto-generated if not specified)");
    println!("  --audit <path>          Dump raw extraction records as JSON");
    println!("  --attribution <policy>  assign_to_all (default) or strict");

    println!("\n📐 Rule File Shapes:");
    println!("  object  - category → keyword/regex rules (cell-level field extraction)");
    println!("  array   - [metadata, rule list] pair (row-span block collection)");

    println!("\n📁 Example config files in ./configs/:");
    println!("  default.yaml            - Default merge tokens, junk list, offsets");

    println!("\n📝 Usage Examples:");
    println!("  cargo run -- -i specs.csv -r rules/block_rules.json");
    println!("  cargo run -- -i specs.csv -r rules/field_rules.json --audit audit.json");
    println!("  cargo run -- -i specs.csv -r rules.json -c configs/default.yaml -o out.csv");
}
