mod args;
mod logging;
mod output;

use std::collections::HashMap;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use serde::Deserialize;
use tracing::warn;

use drover::collab::{Credential, MemoryStore, StaticProfiles};
use drover::{Config, Orchestrator, TaskJob, TaskSpec};

use crate::args::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let config = load_config(&cli.config)?;

	if let Command::Grid = cli.command {
		let orchestrator = build_orchestrator(&config, MemoryStore::new());
		output::print_grid(&orchestrator.grid_info());
		return Ok(ExitCode::SUCCESS);
	}

	let profile_ids = select_profiles(&config, &cli.profiles)?;
	let spec = match &cli.command {
		Command::Grid => unreachable!("handled above"),
		Command::Scan => TaskSpec::Scan,
		Command::Post { media, caption } => TaskSpec::Post {
			media: media.clone(),
			caption: caption.clone(),
		},
		Command::Login { .. } => TaskSpec::Login,
		Command::Comment { url, text } => TaskSpec::Comment {
			url: url.clone(),
			text: text.clone(),
		},
	};

	let store = match &cli.command {
		Command::Login { credentials } => match credentials {
			Some(path) => MemoryStore::with_credentials(load_credentials(path)?),
			None => {
				warn!("no --credentials file; every profile will report a missing credential");
				MemoryStore::new()
			}
		},
		_ => MemoryStore::new(),
	};

	let orchestrator = build_orchestrator(&config, store);

	// Cooperative stop on Ctrl-C: workers finish their in-flight call
	// and resolve at the next state transition.
	let cancel = orchestrator.cancel_handle();
	tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			warn!("interrupt received, cancelling cooperatively");
			cancel.cancel();
		}
	});

	let jobs: Vec<TaskJob> = profile_ids
		.into_iter()
		.map(|profile_id| TaskJob {
			profile_id,
			spec: spec.clone(),
		})
		.collect();

	let results = orchestrator.run_all(jobs).await;
	for result in &results {
		output::print_result(result);
	}
	let clean = output::print_summary(&results);
	Ok(if clean { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn load_config(path: &str) -> anyhow::Result<Config> {
	if std::path::Path::new(path).exists() {
		Config::load(path).with_context(|| format!("loading {path}"))
	} else if path == "drover.toml" {
		// Default path absent: run on built-in defaults.
		Ok(Config::default())
	} else {
		bail!("config file {path} not found");
	}
}

fn build_orchestrator(config: &Config, store: MemoryStore) -> Orchestrator {
	let profiles = Arc::new(StaticProfiles::new(&config.profiles));
	Orchestrator::new(Arc::new(config.clone()), profiles, Arc::new(store))
}

fn select_profiles(config: &Config, requested: &[String]) -> anyhow::Result<Vec<String>> {
	let configured: Vec<String> = config.profiles.iter().map(|p| p.id.clone()).collect();
	if configured.is_empty() {
		bail!("no profiles configured; add [[profiles]] entries to the config");
	}
	if requested.is_empty() {
		return Ok(configured);
	}
	for id in requested {
		if !configured.contains(id) {
			bail!("profile {id} is not in the config");
		}
	}
	Ok(requested.to_vec())
}

#[derive(Debug, Deserialize)]
struct CredentialsFile {
	#[serde(default)]
	profiles: HashMap<String, CredentialEntry>,
}

#[derive(Debug, Deserialize)]
struct CredentialEntry {
	id: String,
	secret: String,
	#[serde(default)]
	totp_seed: Option<String>,
}

fn load_credentials(path: &str) -> anyhow::Result<HashMap<String, Credential>> {
	let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
	let file: CredentialsFile = toml::from_str(&text).with_context(|| format!("parsing {path}"))?;
	Ok(file
		.profiles
		.into_iter()
		.map(|(profile, entry)| {
			(
				profile,
				Credential {
					id: entry.id,
					secret: entry.secret,
					totp_seed: entry.totp_seed,
				},
			)
		})
		.collect())
}
