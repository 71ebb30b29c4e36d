//! Artifact Registry CLI
//!
//! Entry point for the `artifact-registry` command-line tool. Runs one
//! operation per invocation and prints the result as JSON.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process;

use artifact_registry::{
    ArtifactKind, Capability, Catalog, ClientCode, ClientError, ConfigError, EnvOverrides,
    FileCatalog, ParseSettings, RegisteredInput, Registry, RegistryConfig, RegistryError,
    UploadPart,
};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Config file picked up from the current directory when `--config` is absent.
const DEFAULT_CONFIG_FILE: &str = "registry.toml";

#[derive(Parser)]
#[command(name = "artifact-registry")]
#[command(about = "Registry for profiling algorithms, engines and data inputs", version)]
struct Cli {
    /// Path to the config file (default: ./registry.toml when present)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Catalog file, overriding config and environment
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Working root, overriding config and environment
    #[arg(long, global = true)]
    working_root: Option<PathBuf>,

    /// More logging on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Algorithm and engine artifacts
    Artifacts {
        /// algorithm or engine
        #[arg(long, short = 'k', default_value = "algorithm")]
        kind: ArtifactKind,

        #[command(subcommand)]
        action: ArtifactCommands,
    },

    /// Data inputs
    Inputs {
        #[command(subcommand)]
        action: InputCommands,
    },

    /// Print the effective configuration
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum InputKind {
    File,
    Table,
    Database,
}

#[derive(Subcommand)]
enum ArtifactCommands {
    /// Register a file already in the managed directory
    Register { file_name: String },

    /// Copy a file into the managed directory and register it
    Upload { path: PathBuf },

    /// Re-read a registered artifact's metadata
    Update {
        /// File name of the artifact
        file_name: Option<String>,

        /// Catalog id instead of file name
        #[arg(long, conflicts_with = "file_name")]
        id: Option<u64>,
    },

    Get { id: u64 },

    /// Parameters an artifact declares
    Parameters {
        id: Option<u64>,

        /// Parameters of the configured default engine instead
        #[arg(long, conflicts_with = "id")]
        default: bool,
    },

    /// List registered artifacts
    List {
        /// Only algorithms declaring all of these capabilities (comma-separated)
        #[arg(long, value_delimiter = ',')]
        capability: Vec<String>,

        /// Only algorithms accepting this kind of input
        #[arg(long, value_enum, conflicts_with = "capability")]
        accepts: Option<InputKind>,

        /// Re-read metadata of every listed artifact first
        #[arg(long)]
        refresh: bool,
    },

    /// Artifact files present in the managed directory
    Files,

    /// Report files without records and records without files
    Reconcile,

    /// Delete a record
    Remove {
        id: u64,

        /// Also delete the file
        #[arg(long)]
        with_file: bool,
    },

    /// Delete every record of the kind and its file
    RemoveAll,
}

#[derive(Subcommand)]
enum InputCommands {
    /// Register a file by path
    Register {
        path: String,

        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        parse: ParseArgs,
    },

    /// Copy files into the input directory and register them
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Register a file, or every accepted file in a directory
    AddDir { path: String },

    /// Change name or parse settings of a registered input
    Update {
        id: u64,

        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        parse: ParseArgs,
    },

    List,

    Get { id: u64 },

    /// Accepted files under the input directory
    Files,

    Remove {
        id: u64,

        #[arg(long)]
        with_file: bool,
    },

    RemoveAll,

    /// Print the header and first rows of an input
    Preview {
        id: u64,

        /// Rows to read (0 uses the configured default)
        #[arg(long, short = 'n', default_value_t = 0)]
        lines: usize,
    },
}

#[derive(clap::Args)]
struct ParseArgs {
    #[arg(long)]
    separator: Option<char>,

    #[arg(long)]
    quote: Option<char>,

    #[arg(long)]
    escape: Option<char>,

    /// First line is data, not a header
    #[arg(long)]
    no_header: bool,

    #[arg(long)]
    skip_lines: Option<usize>,

    #[arg(long)]
    null_value: Option<String>,

    #[arg(long)]
    strict_quotes: bool,

    #[arg(long)]
    skip_differing_lines: bool,
}

impl ParseArgs {
    fn apply(&self, mut settings: ParseSettings) -> ParseSettings {
        if let Some(separator) = self.separator {
            settings.separator = separator;
        }
        if let Some(quote) = self.quote {
            settings.quote_char = Some(quote);
        }
        if let Some(escape) = self.escape {
            settings.escape_char = Some(escape);
        }
        if self.no_header {
            settings.has_header = false;
        }
        if let Some(skip) = self.skip_lines {
            settings.skip_lines = skip;
        }
        if let Some(null) = &self.null_value {
            settings.null_value = null.clone();
        }
        settings.strict_quotes |= self.strict_quotes;
        settings.skip_differing_lines |= self.skip_differing_lines;
        settings
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{0}")]
    Usage(String),

    #[error("cannot encode output: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    fn to_client_error(&self) -> ClientError {
        match self {
            Self::Registry(e) => e.to_client_error(),
            Self::Open { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                ClientError {
                    code: ClientCode::NotFound,
                    message: self.to_string(),
                }
            }
            _ => ClientError {
                code: ClientCode::BadRequest,
                message: self.to_string(),
            },
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        let client = e.to_client_error();
        match serde_json::to_string_pretty(&client) {
            Ok(json) => eprintln!("{}", json),
            Err(_) => eprintln!("{}", client.message),
        }
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = if verbose > 0 {
        EnvFilter::new(fallback)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

fn load_config(cli: &Cli) -> Result<RegistryConfig, CliError> {
    let default_file = Path::new(DEFAULT_CONFIG_FILE);
    let config_file = match &cli.config {
        Some(path) => Some(path.as_path()),
        None if default_file.is_file() => Some(default_file),
        None => None,
    };

    let mut overrides = serde_json::Map::new();
    if let Some(root) = &cli.working_root {
        overrides.insert("working_root".into(), root.display().to_string().into());
    }
    if let Some(catalog) = &cli.catalog {
        overrides.insert(
            "catalog".into(),
            serde_json::json!({ "path": catalog.display().to_string() }),
        );
    }
    let overrides = (!overrides.is_empty()).then(|| serde_json::Value::Object(overrides));

    Ok(RegistryConfig::load(
        config_file,
        &EnvOverrides::from_env(),
        overrides,
    )?)
}

fn emit<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn open(path: &Path) -> Result<File, CliError> {
    File::open(path).map_err(|source| CliError::Open {
        path: path.to_path_buf(),
        source,
    })
}

fn file_name_of(path: &Path) -> Result<String, CliError> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| CliError::Usage(format!("{} has no file name", path.display())))
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Config => emit(&config),
        Commands::Artifacts { kind, action } => {
            let registry = Registry::open(config)?;
            run_artifacts(&registry, kind, action)
        }
        Commands::Inputs { action } => {
            let registry = Registry::open(config)?;
            run_inputs(&registry, action)
        }
    }
}

fn run_artifacts(
    registry: &Registry<FileCatalog>,
    kind: ArtifactKind,
    action: ArtifactCommands,
) -> Result<(), CliError> {
    let artifacts = registry.artifacts();
    let deletion = registry.deletion();

    match action {
        ArtifactCommands::Register { file_name } => {
            emit(&artifacts.register_by_reference(kind, &file_name)?)
        }
        ArtifactCommands::Upload { path } => {
            let name = file_name_of(&path)?;
            let mut file = open(&path)?;
            emit(&artifacts.register_by_upload(&mut file, &name, kind)?)
        }
        ArtifactCommands::Update { file_name, id } => match (file_name, id) {
            (_, Some(id)) => emit(&artifacts.update_by_id(id)?),
            (Some(name), None) => emit(&artifacts.update(kind, &name)?),
            (None, None) => Err(CliError::Usage("give a file name or --id".to_string())),
        },
        ArtifactCommands::Get { id } => emit(&artifacts.get(id)?),
        ArtifactCommands::Parameters { id, default } => match (id, default) {
            (_, true) => emit(&artifacts.default_parameter_specs()?),
            (Some(id), false) => emit(&artifacts.parameter_specs(id)?),
            (None, false) => Err(CliError::Usage("give an id or --default".to_string())),
        },
        ArtifactCommands::List {
            capability,
            accepts,
            refresh,
        } => {
            let listed = match accepts {
                Some(InputKind::File) => artifacts.list_for_file_inputs()?,
                Some(InputKind::Table) => artifacts.list_for_table_inputs()?,
                Some(InputKind::Database) => artifacts.list_for_database_connections()?,
                None if !capability.is_empty() => {
                    let capabilities = capability
                        .iter()
                        .map(|tag| Capability::parse(tag))
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(|e| CliError::Usage(e.to_string()))?;
                    artifacts.list_with_capabilities(&capabilities)?
                }
                None if refresh => artifacts.list_refreshed(kind)?,
                None => artifacts.list(kind)?,
            };
            emit(&listed)
        }
        ArtifactCommands::Files => emit(&artifacts.available_files(kind)?),
        ArtifactCommands::Reconcile => emit(&artifacts.reconcile(kind)?),
        ArtifactCommands::Remove { id, with_file } => {
            if with_file {
                emit(&deletion.delete_with_file(id)?)
            } else {
                emit(&deletion.delete(id)?)
            }
        }
        ArtifactCommands::RemoveAll => emit(&deletion.delete_all_with_files(kind)?),
    }
}

fn run_inputs(
    registry: &Registry<FileCatalog>,
    action: InputCommands,
) -> Result<(), CliError> {
    let inputs = registry.inputs();
    let deletion = registry.deletion();

    match action {
        InputCommands::Register { path, name, parse } => {
            let input = RegisteredInput::new(path)
                .with_name(name)
                .with_settings(parse.apply(ParseSettings::default()));
            emit(&inputs.register(input)?)
        }
        InputCommands::Upload { paths } => {
            let mut parts = Vec::with_capacity(paths.len());
            for path in &paths {
                parts.push(UploadPart::new(file_name_of(path)?, open(path)?));
            }
            emit(&inputs.upload(parts)?)
        }
        InputCommands::AddDir { path } => emit(&inputs.register_directory(&path)?),
        InputCommands::Update { id, name, parse } => {
            let stored = registry
                .catalog()
                .retrieve::<RegisteredInput>(id)
                .map_err(RegistryError::from)?
                .ok_or_else(|| RegistryError::not_found("input", id))?;
            let settings = parse.apply(stored.settings.clone());
            let name = name.or_else(|| stored.name.clone());
            emit(&inputs.update(stored.with_name(name).with_settings(settings))?)
        }
        InputCommands::List => emit(&inputs.list()?),
        InputCommands::Get { id } => emit(&inputs.get(id)?),
        InputCommands::Files => emit(&inputs.available_files()?),
        InputCommands::Remove { id, with_file } => {
            if with_file {
                emit(&deletion.delete_input_with_file(id)?)
            } else {
                emit(&deletion.delete_input(id)?)
            }
        }
        InputCommands::RemoveAll => emit(&deletion.delete_all_inputs_with_files()?),
        InputCommands::Preview { id, lines } => emit(&registry.preview().preview(id, lines)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameters_takes_an_id_or_default() {
        let cli = Cli::try_parse_from([
            "artifact-registry",
            "artifacts",
            "-k",
            "engine",
            "parameters",
            "7",
        ])
        .unwrap();
        match cli.command {
            Commands::Artifacts {
                kind,
                action: ArtifactCommands::Parameters { id, default },
            } => {
                assert_eq!(kind, ArtifactKind::Engine);
                assert_eq!(id, Some(7));
                assert!(!default);
            }
            _ => panic!("expected artifacts parameters"),
        }

        let default =
            Cli::try_parse_from(["artifact-registry", "artifacts", "parameters", "--default"]);
        assert!(default.is_ok());
        let both =
            Cli::try_parse_from(["artifact-registry", "artifacts", "parameters", "7", "--default"]);
        assert!(both.is_err());
    }
}
