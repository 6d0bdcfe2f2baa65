use clap::Parser;
use diplo_draft::config::TomlConfig;
use diplo_draft::core::model_builder::ConstraintFamily;
use diplo_draft::core::{ConfigProvider, Pipeline};
use diplo_draft::utils::error::ErrorSeverity;
use diplo_draft::utils::{logger, validation::Validate};
use diplo_draft::{DraftEngine, DraftPipeline, LocalStorage};

#[derive(Parser)]
#[command(name = "toml-draft")]
#[command(about = "Country draft driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "draft.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Override the shuffle seed from config
    #[arg(long)]
    seed: Option<u64>,

    /// Read the roster and build the model, but do not solve or write anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 設定檔可指定 log level，所以先載入再初始化日誌
    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    if let Some(level) = config.log_level() {
        if let Err(e) = logger::validate_level(level) {
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    }
    logger::init_cli_logger_with_level(args.verbose, config.log_level());

    tracing::info!("🚀 Starting TOML-based draft");
    tracing::info!("📁 Loaded configuration from: {}", args.config);

    // 應用命令列覆蓋設定
    if let Some(seed) = args.seed {
        config.solver.seed = Some(seed);
        tracing::info!("🔧 Seed overridden to: {}", seed);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");
    display_config_summary(&config, &args);

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let pipeline = DraftPipeline::new(LocalStorage::current_dir(), config);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - nothing will be solved or written");
        if let Err(e) = perform_dry_run(&pipeline).await {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());
            std::process::exit(1);
        }
        return Ok(());
    }

    let engine = DraftEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Draft completed successfully!");
            println!("✅ Draft completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Draft failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!("  Draft: {}", config.draft_name());
    if let Some(description) = &config.draft.description {
        println!("  Description: {}", description);
    }
    println!("  Roster: {}", config.input_path());
    println!("  Output: {}", config.output_path());
    match config.seed() {
        Some(seed) => println!("  Seed: {}", seed),
        None => println!("  Seed: random"),
    }
    if let Some(limit) = config.time_limit() {
        println!("  Time limit: {}s", limit.as_secs());
    }
    println!("  Pairing weight: {}", config.pairing_weight());
    if !config.forced_roles().is_empty() {
        println!("  Overrides: {}", config.forced_roles().len());
    }

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

async fn perform_dry_run(
    pipeline: &DraftPipeline<LocalStorage, TomlConfig>,
) -> diplo_draft::Result<()> {
    println!("🔍 Dry Run Analysis:");
    println!();

    let roster = pipeline.extract().await?;
    let signed_up = roster.len();
    let prepared = pipeline.prepare(roster)?;

    println!("👥 Roster:");
    println!("  Players: {}", signed_up);
    println!("  Dummy players: {}", prepared.fillers);
    for (members, tiers) in &prepared.compatibility.merged_groups {
        println!("  Group {} -> {:?}", members.join(" + "), tiers.tiers());
    }
    for (player, partner) in &prepared.compatibility.missing_partners {
        println!("  ⚠️ {} asked for {}, who did not sign up", player, partner);
    }

    let plan = prepared.plan;
    println!();
    println!("🎲 Games: {}", plan.session_count());
    println!("  Beginner: {}", plan.beginner);
    println!("  Beginner/Mixed: {}", plan.beginner_mixed);
    println!("  Mixed: {}", plan.mixed);
    println!("  Experienced/Mixed: {}", plan.experienced_mixed);
    println!("  Experienced: {}", plan.experienced);

    let model = &prepared.model;
    let layout = model.layout();
    println!();
    println!("🧮 Model:");
    println!("  Variables: {} ({} assignment)", layout.total(), layout.assignment_count());
    println!("  Role rows: {}", model.rows_in(ConstraintFamily::RoleExclusivity));
    println!("  Placement rows: {}", model.rows_in(ConstraintFamily::Placement));
    println!("  Exclusion rows: {}", model.rows_in(ConstraintFamily::Exclusion));
    println!("  Pairing rows: {}", model.rows_in(ConstraintFamily::Pairing));

    println!();
    println!("✅ Dry run analysis complete.");
    Ok(())
}
