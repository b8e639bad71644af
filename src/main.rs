// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, debug, error, info, warn};
use serde_json::Value;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use linguarest::app_config::{self, Config};
use linguarest::database::{DatabaseConnection, Repository, TranslationStore};
use linguarest::errors::AppError;
use linguarest::fields::{FieldSpec, TranslatedFieldsField};
use linguarest::language_utils;
use linguarest::models::{ModelMeta, TranslationMeta};
use linguarest::serializers::{
    ModelSerializer, ModelSerializerBuilder, Serializer, SerializerContext, TranslatableFlatModelSerializer,
    TranslatableModelSerializer, TranslatableSave,
};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the configuration (if missing) and the tables of every model
    Init,

    /// Print a record as JSON
    Show(ShowArgs),

    /// Validate a JSON payload and create or update a record
    Save(SaveArgs),

    /// Generate shell completions for linguarest
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct ShowArgs {
    /// Model name, as declared in the configuration
    #[arg(value_name = "MODEL")]
    model: String,

    /// Record ID
    #[arg(value_name = "ID")]
    id: i64,

    /// Only output these languages (e.g., 'en,es')
    #[arg(long, value_delimiter = ',')]
    languages: Vec<String>,

    /// Active language (e.g., 'en', 'es', 'fr')
    #[arg(short = 'L', long)]
    language: Option<String>,

    /// Output the active language's fields at the top level
    #[arg(long)]
    flat: bool,

    /// Base URL used to build absolute URLs
    #[arg(long)]
    base_url: Option<url::Url>,
}

#[derive(Parser, Debug)]
struct SaveArgs {
    /// Model name, as declared in the configuration
    #[arg(value_name = "MODEL")]
    model: String,

    /// JSON payload file, or '-' for stdin
    #[arg(value_name = "PAYLOAD")]
    payload: PathBuf,

    /// Update the record with this ID instead of creating one
    #[arg(long)]
    id: Option<i64>,

    /// Only validate the fields present in the payload
    #[arg(long, requires = "id")]
    partial: bool,

    /// Payload carries the active language's fields at the top level
    #[arg(long)]
    flat: bool,

    /// Active language (e.g., 'en', 'es', 'fr')
    #[arg(short = 'L', long)]
    language: Option<String>,
}

/// linguarest - REST serializers for translatable records
///
/// Reads and writes multilingual records as JSON keyed by language code.
#[derive(Parser, Debug)]
#[command(name = "linguarest")]
#[command(version)]
#[command(about = "Serialize and save translatable records as JSON")]
#[command(long_about = "linguarest maps multilingual database records to JSON keyed by language code, and back.

EXAMPLES:
    linguarest init                                    # Create config and tables
    linguarest show country 1                          # All translations of Country 1
    linguarest show country 1 --languages en,es        # Only English and Spanish
    linguarest show country 1 --flat -L es             # Spanish fields at the top level
    linguarest save country france.json                # Create a Country
    linguarest save country fi.json --id 1 --partial   # Add a translation to Country 1
    linguarest completions bash > linguarest.bash      # Generate bash completions

CONFIGURATION:
    Configuration is stored in linguarest.json by default. It declares the
    languages, the database file and the translatable models. `init` writes
    an example configuration when the file doesn't exist.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "linguarest.json", global = true)]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation, filtering on the global max level
struct CustomLogger;

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let color = match record.level() {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        };
        let now = chrono::Local::now().format("%H:%M:%S.%3f");
        let _ = writeln!(
            std::io::stderr(),
            "\x1B[{}m{} {} {}\x1B[0m",
            color,
            now,
            Self::get_emoji_for_level(record.level()),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn main() {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    if let Err(e) = CustomLogger::init(LevelFilter::Info) {
        eprintln!("Failed to initialize logger: {}", e);
    }

    let cli = CommandLineOptions::parse();

    if let Err(e) = run(cli) {
        match e.downcast_ref::<AppError>() {
            // Validation errors are the command's output
            Some(AppError::Validation(errors)) => {
                println!("{}", serde_json::to_string_pretty(errors).unwrap_or_default());
                error!("Payload is invalid");
            }
            _ => error!("{:#}", e),
        }
        std::process::exit(1);
    }
}

fn run(cli: CommandLineOptions) -> Result<()> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &cli.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.into());
    }

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "linguarest", &mut std::io::stdout());
            Ok(())
        }
        Commands::Init => run_init(&cli.config_path),
        Commands::Show(args) => {
            let config = load_config(&cli.config_path, cli.log_level.is_none())?;
            run_show(&config, args)
        }
        Commands::Save(args) => {
            let config = load_config(&cli.config_path, cli.log_level.is_none())?;
            run_save(&config, args)
        }
    }
}

/// Load and validate the configuration, applying its log level unless overridden
fn load_config(config_path: &Path, apply_log_level: bool) -> Result<Config> {
    if !config_path.exists() {
        return Err(anyhow!(
            "Config file not found at {:?}, run `linguarest init` first",
            config_path
        ));
    }

    let config = Config::load(config_path)?;
    config.validate().context("Configuration validation failed")?;

    if apply_log_level {
        // Just update the max level without reinitializing the logger
        log::set_max_level(config.log_level.into());
    }
    debug!("Loaded configuration from {:?}", config_path);
    Ok(config)
}

/// Example configuration written by `init`
fn example_config() -> Config {
    Config {
        languages: vec!["en".to_string(), "es".to_string()],
        models: vec![
            ModelMeta::new("Country")
                .field(FieldSpec::char("country_code", 2).unique())
                .translated(TranslationMeta::new(
                    "translations",
                    vec![FieldSpec::char("name", 200), FieldSpec::url("url", 200).blank()],
                )),
        ],
        ..Config::default()
    }
}

fn open_repository(config: &Config) -> Result<Repository> {
    let db = DatabaseConnection::new(config.database_path()?)?;
    Ok(Repository::new(db).with_default_language(config.default_language.clone()))
}

fn run_init(config_path: &Path) -> Result<()> {
    let config = if config_path.exists() {
        Config::load(config_path)?
    } else {
        warn!("Config file not found at {:?}, creating example config.", config_path);
        let config = example_config();
        config.save(config_path)?;
        config
    };
    config.validate().context("Configuration validation failed")?;

    let repository = open_repository(&config)?;
    for model in &config.models {
        let meta = model.clone().build()?;
        repository.register(&meta)?;
    }

    let languages: Vec<String> = config
        .languages
        .iter()
        .map(|code| match language_utils::get_language_name(code) {
            Ok(name) => format!("{} ({})", code, name),
            Err(_) => code.clone(),
        })
        .collect();
    info!("Languages: {}", languages.join(", "));
    info!("Models: {}", repository.registered_models()?.join(", "));
    info!("Database: {:?} ({})", repository.connection().path(), repository.connection().stats()?);
    Ok(())
}

/// Normalize a language given on the command line
fn normalize_language(code: &str) -> Result<String> {
    language_utils::normalize_language_code(code).with_context(|| format!("Invalid language code: {}", code))
}

/// Serializer for a model with every field exposed
fn serializer_builder(config: &Config, meta: &Arc<ModelMeta>) -> ModelSerializerBuilder {
    let mut builder = ModelSerializer::builder(meta.clone()).config(config);
    for group in &meta.translations {
        builder = builder.declare(group.rel_name.clone(), TranslatedFieldsField::new());
    }
    builder
}

fn flat_serializer_builder(config: &Config, meta: &Arc<ModelMeta>) -> ModelSerializerBuilder {
    ModelSerializer::builder(meta.clone()).config(config)
}

fn run_show(config: &Config, args: ShowArgs) -> Result<()> {
    let meta = config.model(&args.model)?;
    let repository = open_repository(config)?;
    repository.register(&meta)?;

    let mut context = SerializerContext::new();
    if !args.languages.is_empty() {
        let languages = args
            .languages
            .iter()
            .map(|code| normalize_language(code))
            .collect::<Result<Vec<_>>>()?;
        context = context.with_languages(languages);
    }
    if let Some(language) = &args.language {
        context = context.with_language(normalize_language(language)?);
    }
    if let Some(base_url) = args.base_url {
        context = context.with_base_url(base_url);
    }

    let record = repository.get(&meta, args.id).map_err(AppError::from)?;
    let output = if args.flat {
        TranslatableFlatModelSerializer::new(flat_serializer_builder(config, &meta))?
            .to_representation(&record, &context)
            .map_err(AppError::from)?
    } else {
        TranslatableModelSerializer::new(serializer_builder(config, &meta))?
            .to_representation(&record, &context)
            .map_err(AppError::from)?
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn read_payload(path: &Path) -> Result<Value> {
    let mut content = String::new();
    if path == Path::new("-") {
        std::io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read payload from stdin")?;
    } else {
        content = std::fs::read_to_string(path).with_context(|| format!("Failed to read payload file: {:?}", path))?;
    }
    serde_json::from_str(&content).context("Payload is not valid JSON")
}

fn run_save(config: &Config, args: SaveArgs) -> Result<()> {
    let meta = config.model(&args.model)?;
    let repository = open_repository(config)?;
    repository.register(&meta)?;

    let payload = read_payload(&args.payload)?;
    let mut context = SerializerContext::new();
    if let Some(language) = &args.language {
        context = context.with_language(normalize_language(language)?);
    }

    let instance = match args.id {
        Some(id) => Some(repository.get(&meta, id).map_err(AppError::from)?),
        None => None,
    };

    let output = if args.flat {
        let serializer = TranslatableFlatModelSerializer::new(flat_serializer_builder(config, &meta))?;
        save_with(&serializer, &repository, instance, &payload, args.partial, &context)?
    } else {
        let serializer = TranslatableModelSerializer::new(serializer_builder(config, &meta))?;
        save_with(&serializer, &repository, instance, &payload, args.partial, &context)?
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Validate, save and serialize the saved record
fn save_with<T: TranslatableSave + Serializer>(
    serializer: &T,
    repository: &Repository,
    instance: Option<linguarest::TranslatableRecord>,
    payload: &Value,
    partial: bool,
    context: &SerializerContext,
) -> Result<Value, AppError> {
    let validated = serializer.validate(payload, partial, context)?;
    let record = serializer.save(repository, instance, validated, context)?;
    info!(
        "Saved {} {}",
        serializer.meta().name,
        record.id().unwrap_or_default()
    );
    Ok(serializer.to_representation(&record, context)?)
}
