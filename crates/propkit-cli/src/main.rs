//! `propkit` command-line front end

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use propkit_core::PropertyManager;
use propkit_service::{PropertyManagerDataService, RegistryConfig};
use propkit_workflow::{
    CharacterizationTable, DetermineCharacterizations, RunLogs, FREQUENCY_LOG_NAMES,
    REDUCTION_KEYS, REDUCTION_PROPERTIES, WAVELENGTH_LOG_NAMES,
};
use tracing_subscriber::{fmt, EnvFilter};

fn cli() -> Command {
    let config_arg = Arg::new("config")
        .long("config")
        .short('c')
        .value_parser(value_parser!(PathBuf))
        .help("Registry TOML describing named property managers");
    let json_arg = Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Print property histories as JSON");

    Command::new("propkit")
        .version(propkit_core::VERSION)
        .about("Typed property managers and the characterization workflow")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .global(true)
                .help("Log filter, overrides RUST_LOG (default: info)"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("show")
                .about("Load a registry config and list its managers")
                .arg(config_arg.clone().required(true))
                .arg(
                    Arg::new("manager")
                        .long("manager")
                        .short('m')
                        .help("Only show this manager"),
                )
                .arg(
                    Arg::new("all")
                        .long("all")
                        .action(ArgAction::SetTrue)
                        .help("Include hidden (__-prefixed) managers"),
                )
                .arg(json_arg.clone()),
        )
        .subcommand(
            Command::new("set")
                .about("Assign values in one manager and validate it")
                .arg(config_arg.clone().required(true))
                .arg(
                    Arg::new("manager")
                        .long("manager")
                        .short('m')
                        .required(true)
                        .help("Manager to assign into"),
                )
                .arg(
                    Arg::new("assign")
                        .long("assign")
                        .short('a')
                        .required(true)
                        .help("Assignments as Name=Value;Name=Value"),
                ),
        )
        .subcommand(
            Command::new("characterize")
                .about("Determine the characterizations of a run")
                .arg(config_arg)
                .arg(
                    Arg::new("table")
                        .long("table")
                        .value_parser(value_parser!(PathBuf))
                        .help("Characterization table (JSON array of rows)"),
                )
                .arg(
                    Arg::new("logs")
                        .long("logs")
                        .value_parser(value_parser!(PathBuf))
                        .help("Run logs (JSON object of name -> {units, values})"),
                )
                .arg(
                    Arg::new("manager")
                        .long("manager")
                        .short('m')
                        .help("Reduction manager name"),
                )
                .arg(run_arg("back-run", "Empty container run"))
                .arg(run_arg("norm-run", "Normalization run"))
                .arg(run_arg("norm-back-run", "Normalization background run"))
                .arg(
                    Arg::new("frequency-logs")
                        .long("frequency-logs")
                        .help("Candidate frequency log names, comma-separated"),
                )
                .arg(
                    Arg::new("wavelength-logs")
                        .long("wavelength-logs")
                        .help("Candidate wavelength log names, comma-separated"),
                )
                .arg(json_arg),
        )
}

fn run_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .value_parser(value_parser!(i32))
        .allow_negative_numbers(true)
        .help(format!("{help}; 0 uses the table value, negative clears it"))
}

fn init_logging(level: Option<&str>, json: bool) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_logging(
        matches.get_one::<String>("log-level").map(String::as_str),
        matches.get_flag("log-json"),
    );

    let service = PropertyManagerDataService::global();
    let mut out = io::stdout().lock();
    let outcome = match matches.subcommand() {
        Some(("show", args)) => show(service, args, &mut out),
        Some(("set", args)) => set(service, args, &mut out),
        Some(("characterize", args)) => characterize(service, args, &mut out),
        Some((other, _)) => Err(anyhow!("unknown command '{other}'")),
        None => Ok(true),
    };
    service.clear();

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_registry(service: &PropertyManagerDataService, args: &ArgMatches) -> Result<()> {
    if let Some(path) = args.get_one::<PathBuf>("config") {
        let config = RegistryConfig::from_file(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let names = config
            .load_into(service)
            .with_context(|| format!("failed to load {}", path.display()))?;
        tracing::info!("Loaded {} manager(s) from {}", names.len(), path.display());
    }
    Ok(())
}

fn write_manager(out: &mut impl Write, name: &str, manager: &PropertyManager) -> Result<()> {
    writeln!(out, "[{name}]")?;
    for property in manager.iter() {
        let default = if property.is_default() { ", default" } else { "" };
        write!(
            out,
            "  {} = {} ({}{})",
            property.name(),
            property.value(),
            property.type_name(),
            default
        )?;
        if !property.validator_type().is_empty() {
            write!(out, " [{}]", property.validator_type())?;
        }
        writeln!(out)?;
        let allowed = property.allowed_values();
        if !allowed.is_empty() {
            writeln!(out, "    allowed: {}", allowed.join(", "))?;
        }
        let message = property.is_valid();
        if !message.is_empty() {
            writeln!(out, "    invalid: {message}")?;
        }
    }
    Ok(())
}

fn write_history(out: &mut impl Write, name: &str, manager: &PropertyManager) -> Result<()> {
    let document = serde_json::json!({
        "manager": name,
        "properties": manager.history(),
    });
    writeln!(out, "{}", serde_json::to_string_pretty(&document)?)?;
    Ok(())
}

fn show(service: &PropertyManagerDataService, args: &ArgMatches, out: &mut impl Write) -> Result<bool> {
    load_registry(service, args)?;
    let names = match args.get_one::<String>("manager") {
        Some(name) => vec![name.clone()],
        None => service.names(args.get_flag("all")),
    };
    for name in names {
        let shared = service.retrieve(&name)?;
        let manager = shared.read();
        if args.get_flag("json") {
            write_history(out, &name, &manager)?;
        } else {
            write_manager(out, &name, &manager)?;
        }
    }
    Ok(true)
}

fn set(service: &PropertyManagerDataService, args: &ArgMatches, out: &mut impl Write) -> Result<bool> {
    load_registry(service, args)?;
    let name = args
        .get_one::<String>("manager")
        .context("--manager is required")?;
    let assignments = args
        .get_one::<String>("assign")
        .context("--assign is required")?;

    let shared = service.retrieve(name)?;
    let mut manager = shared.write();
    manager
        .set_properties(assignments)
        .with_context(|| format!("failed to assign into '{name}'"))?;
    writeln!(out, "{}", manager.as_string(true))?;

    let errors = manager.validation_errors();
    for (property, message) in &errors {
        tracing::warn!("{}: {}", property, message);
    }
    Ok(errors.is_empty())
}

fn characterize(
    service: &PropertyManagerDataService,
    args: &ArgMatches,
    out: &mut impl Write,
) -> Result<bool> {
    load_registry(service, args)?;

    let mut workflow = DetermineCharacterizations::new();
    let inputs = workflow.inputs_mut();
    for (flag, input) in [
        ("manager", REDUCTION_PROPERTIES),
        ("frequency-logs", FREQUENCY_LOG_NAMES),
        ("wavelength-logs", WAVELENGTH_LOG_NAMES),
    ] {
        if let Some(text) = args.get_one::<String>(flag) {
            inputs
                .set_property_value(input, text)
                .with_context(|| format!("invalid --{flag}"))?;
        }
    }
    for (flag, input) in [
        ("back-run", "BackRun"),
        ("norm-run", "NormRun"),
        ("norm-back-run", "NormBackRun"),
    ] {
        if let Some(run) = args.get_one::<i32>(flag) {
            inputs.set_property(input, *run)?;
        }
    }

    let table = args
        .get_one::<PathBuf>("table")
        .map(|path| CharacterizationTable::from_file(path))
        .transpose()
        .context("failed to read characterization table")?;
    let logs = args
        .get_one::<PathBuf>("logs")
        .map(|path| RunLogs::from_file(path))
        .transpose()
        .context("failed to read run logs")?;

    let shared = workflow.execute(service, table.as_ref(), logs.as_ref())?;
    let name = workflow.inputs().get_property_value(REDUCTION_PROPERTIES)?;
    let manager = shared.read();
    if args.get_flag("json") {
        write_history(out, &name, &manager)?;
    } else {
        writeln!(out, "[{name}]")?;
        for key in REDUCTION_KEYS {
            writeln!(out, "  {} = {}", key, manager.get_property_value(key)?)?;
        }
    }
    Ok(true)
}
