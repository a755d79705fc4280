use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use windows_parameters::{Hive, ParameterConfig, RegistryValue, SimpleParameter, ValueKind};

#[derive(Parser, Debug)]
#[command(
    name = "winparam",
    version,
    about = "Read, set and create Windows Registry parameters"
)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Registry hive, overrides the configuration file
    #[arg(long, global = true, value_enum)]
    hive: Option<HiveArg>,

    /// Do not run gpupdate after `set`
    #[arg(long, global = true)]
    no_policy_refresh: bool,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
#[cfg_attr(not(windows), allow(dead_code))]
enum Command {
    /// Print a value
    Get { path: String, name: String },
    /// Write a value under an existing key and refresh group policy
    Set {
        path: String,
        name: String,
        value: String,
        #[arg(long, value_enum, default_value_t = KindArg::String)]
        kind: KindArg,
    },
    /// Write a value, creating the key if needed
    Create {
        path: String,
        name: String,
        value: String,
        #[arg(long, value_enum, default_value_t = KindArg::String)]
        kind: KindArg,
    },
    /// Work with the sibling values of a parameter
    #[command(subcommand)]
    Additions(AdditionsCommand),
}

#[derive(Subcommand, Debug)]
#[cfg_attr(not(windows), allow(dead_code))]
enum AdditionsCommand {
    /// List every value under ADDITIONS_PATH
    Get {
        path: String,
        name: String,
        additions_path: String,
    },
    /// Write NAME=VALUE pairs under an existing ADDITIONS_PATH
    Set {
        path: String,
        name: String,
        additions_path: String,
        #[arg(required = true, value_parser = parse_assignment)]
        values: Vec<(String, String)>,
        #[arg(long, value_enum, default_value_t = KindArg::String)]
        kind: KindArg,
    },
    /// Write NAME=VALUE pairs, creating ADDITIONS_PATH if needed
    Create {
        path: String,
        name: String,
        additions_path: String,
        #[arg(required = true, value_parser = parse_assignment)]
        values: Vec<(String, String)>,
        #[arg(long, value_enum, default_value_t = KindArg::String)]
        kind: KindArg,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum HiveArg {
    Hkcu,
    Hklm,
    Hkcr,
    Hku,
    Hkcc,
}

impl From<HiveArg> for Hive {
    fn from(arg: HiveArg) -> Self {
        match arg {
            HiveArg::Hkcu => Hive::CurrentUser,
            HiveArg::Hklm => Hive::LocalMachine,
            HiveArg::Hkcr => Hive::ClassesRoot,
            HiveArg::Hku => Hive::Users,
            HiveArg::Hkcc => Hive::CurrentConfig,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    String,
    Expand,
    Multi,
    Dword,
    Qword,
    Binary,
}

impl From<KindArg> for ValueKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::String => ValueKind::String,
            KindArg::Expand => ValueKind::ExpandString,
            KindArg::Multi => ValueKind::MultiString,
            KindArg::Dword => ValueKind::Dword,
            KindArg::Qword => ValueKind::Qword,
            KindArg::Binary => ValueKind::Binary,
        }
    }
}

fn parse_assignment(text: &str) -> std::result::Result<(String, String), String> {
    text.split_once('=')
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected NAME=VALUE, got '{text}'"))
}

fn load_config(cli: &Cli) -> Result<ParameterConfig> {
    let mut config = match &cli.config {
        Some(path) => ParameterConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ParameterConfig::default(),
    };
    if let Some(hive) = cli.hive {
        config.hive = hive.into();
    }
    if cli.no_policy_refresh {
        config = config.without_policy_refresh();
    }
    Ok(config)
}

#[cfg_attr(not(windows), allow(dead_code))]
fn additions(
    additions_path: &str,
    values: &[(String, String)],
    kind: KindArg,
) -> Result<Vec<SimpleParameter>> {
    values
        .iter()
        .map(|(name, text)| -> Result<SimpleParameter> {
            let value = RegistryValue::parse(kind.into(), text)?;
            Ok(SimpleParameter::new(additions_path, name.as_str(), value)?)
        })
        .collect()
}

#[cfg_attr(not(windows), allow(dead_code))]
fn print_value(name: &str, value: Option<&RegistryValue>) {
    match value {
        Some(value) => println!("{} = {} ({})", name, value, value.kind().as_str()),
        None => println!("{} is not set", name),
    }
}

#[cfg(windows)]
fn run(command: Command, config: ParameterConfig) -> Result<()> {
    use windows_parameters::SystemParameter;

    match command {
        Command::Get { path, name } => {
            let mut param = SystemParameter::system(SimpleParameter::with_path(path, name)?, config);
            param.get_value()?;
            print_value(param.name(), param.value());
        }
        Command::Set {
            path,
            name,
            value,
            kind,
        } => {
            let value = RegistryValue::parse(kind.into(), &value)?;
            let mut param = SystemParameter::system(SimpleParameter::with_path(path, name)?, config);
            param.set_value(value)?;
            print_value(param.name(), param.value());
        }
        Command::Create {
            path,
            name,
            value,
            kind,
        } => {
            let value = RegistryValue::parse(kind.into(), &value)?;
            let mut param = SystemParameter::system(SimpleParameter::with_path(path, name)?, config);
            param.create_parameter(value)?;
            print_value(param.name(), param.value());
        }
        Command::Additions(sub) => run_additions(sub, config)?,
    }
    Ok(())
}

#[cfg(windows)]
fn run_additions(command: AdditionsCommand, config: ParameterConfig) -> Result<()> {
    use windows_parameters::SystemParameter;

    let (path, name) = match &command {
        AdditionsCommand::Get { path, name, .. }
        | AdditionsCommand::Set { path, name, .. }
        | AdditionsCommand::Create { path, name, .. } => (path.clone(), name.clone()),
    };
    let mut param = SystemParameter::system(SimpleParameter::with_path(path, name)?, config);

    match command {
        AdditionsCommand::Get { additions_path, .. } => {
            param.get_additions(&additions_path)?;
        }
        AdditionsCommand::Set {
            additions_path,
            values,
            kind,
            ..
        } => param.set_additions(&additions(&additions_path, &values, kind)?)?,
        AdditionsCommand::Create {
            additions_path,
            values,
            kind,
            ..
        } => param.create_additions(&additions(&additions_path, &values, kind)?)?,
    }

    for addition in param.additions() {
        print_value(addition.name(), addition.value());
    }
    Ok(())
}

#[cfg(not(windows))]
fn run(_command: Command, _config: ParameterConfig) -> Result<()> {
    Err(windows_parameters::ParameterError::Unsupported(
        "the Windows registry is not available on this platform".to_string(),
    )
    .into())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = load_config(&cli)?;
    log::debug!("Using {:?}", config);
    run(cli.command, config)
}
