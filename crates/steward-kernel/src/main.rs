use anyhow::Context;
use clap::{value_parser, Arg, Command};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use steward_capability::{builtin, CapabilityRegistry};
use steward_kernel::{init_tracing, register_kernel, MemoryStore, StewardConfig};
use steward_policy::{PolicyEngine, PolicyRequest};

fn config_arg() -> Arg {
    Arg::new("config")
        .long("config")
        .short('c')
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Path to the TOML configuration file")
}

fn cli() -> Command {
    Command::new("steward")
        .version(steward_kernel::VERSION)
        .about("Plan-and-execute agent orchestration engine")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("check")
                .about("Validate configuration and print the capability manifest")
                .arg(config_arg()),
        )
        .subcommand(
            Command::new("policy")
                .about("Evaluate one capability invocation against the configured policy")
                .arg(config_arg())
                .arg(
                    Arg::new("capability")
                        .long("capability")
                        .required(true)
                        .help("Capability name"),
                )
                .arg(
                    Arg::new("args")
                        .long("args")
                        .default_value("{}")
                        .help("Serialized argument blob"),
                )
                .arg(
                    Arg::new("owner")
                        .long("owner")
                        .default_value("cli")
                        .help("Owner issuing the invocation"),
                ),
        )
}

fn load(path: &Path) -> anyhow::Result<StewardConfig> {
    let config = StewardConfig::load(path)
        .with_context(|| format!("loading {}", path.display()))?;
    init_tracing(&config.logging);
    Ok(config)
}

fn check(path: &Path) -> anyhow::Result<()> {
    let config = load(path)?;
    let policy = config.policy_engine()?;
    let directives = config.directives()?;

    let mut registry = CapabilityRegistry::new();
    register_kernel(&mut registry, Arc::new(MemoryStore::new()), &config.scheduler)?;

    println!("Configuration OK: {}", path.display());
    println!(
        "  policy: {} denied capabilities, {} argument patterns",
        policy.denied_capabilities().count(),
        policy.denied_patterns().count()
    );
    println!(
        "  directives: planner {} chars, worker {} chars",
        directives.planner.len(),
        directives.worker.len()
    );
    println!(
        "  scheduler: {} (min interval {}s)",
        if config.scheduler.enabled { "enabled" } else { "disabled" },
        config.scheduler.min_interval_secs
    );
    println!();
    println!("Capabilities:");
    for descriptor in registry.descriptors().chain(builtin::descriptors().iter()) {
        println!("  - {}: {}", descriptor.name, descriptor.description);
    }
    Ok(())
}

fn policy(path: &Path, capability: &str, args: &str, owner: &str) -> anyhow::Result<()> {
    let config = load(path)?;
    let engine = config.policy_engine()?;
    let decision = engine.evaluate(&PolicyRequest::new(capability, args, owner));

    println!("{}", serde_json::to_string(&decision.effect)?.trim_matches('"'));
    println!("{}", decision.reason);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("check", sub)) => {
            let path = sub
                .get_one::<PathBuf>("config")
                .context("--config is required")?;
            check(path)
        }
        Some(("policy", sub)) => {
            let path = sub
                .get_one::<PathBuf>("config")
                .context("--config is required")?;
            let capability = sub
                .get_one::<String>("capability")
                .context("--capability is required")?;
            let args = sub.get_one::<String>("args").map_or("{}", String::as_str);
            let owner = sub.get_one::<String>("owner").map_or("cli", String::as_str);
            policy(path, capability, args, owner)
        }
        _ => Ok(()),
    }
}
