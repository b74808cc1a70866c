//! Built-in sub-commands of the `jersey` binary.

use crate::cli::{Command, CommandFactory, Configuration, Execute, Options, StaticPlugins};
use crate::config::{ConfigLoader, JerseyConfig};
use crate::error::{CliError, CommandFailure};
use crate::inet::IpAddress;
use async_trait::async_trait;
use clap::{Arg, ArgAction};
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

/// All built-in commands, in help order.
pub fn builtin_plugins(settings: Arc<JerseyConfig>) -> StaticPlugins {
    StaticPlugins::new()
        .with(AddrFactory)
        .with(CompareFactory)
        .with(ConfigFactory::new(settings))
}

fn address_arg(id: &'static str, help: &'static str) -> Arg {
    Arg::new(id)
        .value_name("ADDR")
        .required(true)
        .value_parser(|s: &str| Options::parse_ip(s))
        .help(help)
}

fn address(config: &Configuration, id: &str) -> Result<IpAddress, CommandFailure> {
    config
        .get::<IpAddress>(id)
        .copied()
        .ok_or_else(|| CommandFailure::from(CliError::Usage(format!("Missing address: {}", id))))
}

// addr

/// Describe a single address: family, canonical form and network-order bytes.
pub fn describe(addr: &IpAddress, mapped: bool) -> String {
    let mut out = format!(
        "family: {}\naddress: {}\nbytes: {}",
        addr.family(),
        addr,
        hex::encode(addr.to_bytes())
    );
    if mapped {
        out.push_str(&format!("\nv6: {}", addr.to_v6()));
    }
    out
}

struct Addr;

#[async_trait]
impl Execute for Addr {
    async fn execute(&self, config: &Configuration) -> Result<Value, CommandFailure> {
        let addr = address(config, "address")?;
        println!("{}", describe(&addr, config.flag("v6")));
        Ok(json!(true))
    }
}

pub struct AddrFactory;

impl CommandFactory for AddrFactory {
    fn name(&self) -> &str {
        "addr"
    }

    fn shortcut(&self) -> Option<&str> {
        Some("a")
    }

    fn description(&self) -> &str {
        "Show an IP address in canonical form"
    }

    fn options(&self) -> clap::Command {
        clap::Command::new("addr")
            .arg(address_arg("address", "IPv4 or IPv6 address"))
            .arg(
                Arg::new("v6")
                    .long("v6")
                    .action(ArgAction::SetTrue)
                    .help("Also show the IPv6 form"),
            )
    }

    fn build_command(&self, config: Configuration) -> anyhow::Result<Command> {
        Ok(Command::new("addr", config, Addr))
    }
}

// compare

/// One line relating two addresses, e.g. `10.0.0.1 < 10.0.0.2`.
pub fn relation(a: &IpAddress, b: &IpAddress) -> String {
    let op = match a.cmp(b) {
        Ordering::Less => "<",
        Ordering::Equal => "==",
        Ordering::Greater => ">",
    };
    format!("{} {} {}", a, op, b)
}

struct Compare;

#[async_trait]
impl Execute for Compare {
    async fn execute(&self, config: &Configuration) -> Result<Value, CommandFailure> {
        let a = address(config, "left")?;
        let b = address(config, "right")?;
        println!("{}", relation(&a, &b));
        if a == b {
            Ok(json!(true))
        } else {
            debug!(left = %a, right = %b, "Addresses differ");
            Err(CommandFailure::Exit(1))
        }
    }
}

pub struct CompareFactory;

impl CommandFactory for CompareFactory {
    fn name(&self) -> &str {
        "compare"
    }

    fn shortcut(&self) -> Option<&str> {
        Some("c")
    }

    fn description(&self) -> &str {
        "Compare two IP addresses; exit status 1 when they differ"
    }

    fn options(&self) -> clap::Command {
        clap::Command::new("compare")
            .arg(address_arg("left", "First address"))
            .arg(address_arg("right", "Second address"))
    }

    fn build_command(&self, config: Configuration) -> anyhow::Result<Command> {
        Ok(Command::new("compare", config, Compare))
    }
}

// config

struct ShowConfig {
    settings: Arc<JerseyConfig>,
}

#[async_trait]
impl Execute for ShowConfig {
    async fn execute(&self, _config: &Configuration) -> Result<Value, CommandFailure> {
        let rendered = ConfigLoader::render(&self.settings)?;
        print!("{}", rendered);
        Ok(Value::Null)
    }
}

pub struct ConfigFactory {
    settings: Arc<JerseyConfig>,
}

impl ConfigFactory {
    pub fn new(settings: Arc<JerseyConfig>) -> Self {
        Self { settings }
    }
}

impl CommandFactory for ConfigFactory {
    fn name(&self) -> &str {
        "config"
    }

    fn shortcut(&self) -> Option<&str> {
        Some("g")
    }

    fn description(&self) -> &str {
        "Print the effective configuration as TOML"
    }

    fn build_command(&self, config: Configuration) -> anyhow::Result<Command> {
        Ok(Command::new(
            "config",
            config,
            ShowConfig {
                settings: Arc::clone(&self.settings),
            },
        ))
    }
}
