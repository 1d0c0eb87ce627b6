// essnap - command line front end for the snapshot administration client

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use essnap::SnapshotAdminClient;
use essnap_common::config::DEFAULT_CONFIG_PATH;
use essnap_common::{
    ClusterConfig, RepositorySettings, SnapshotRequest, SnapshotState, snapshot_name,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "essnap",
    version,
    about = "Manage Elasticsearch snapshot repositories and snapshots"
)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, env = "ESSNAP_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Cluster URL, overrides the configuration file
    #[arg(long, global = true)]
    url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a filesystem snapshot repository
    CreateRepo {
        name: String,
        #[command(flatten)]
        settings: RepositoryArgs,
    },
    /// Unregister a repository
    DeleteRepo { name: String },
    /// List registered repositories
    ListRepos,
    /// Snapshot indices into a repository and wait for completion
    CreateSnapshot {
        repository: String,
        /// Index name or pattern, e.g. graylog_*
        indices: String,
        /// Snapshot name (defaults to the current UTC time)
        #[arg(long)]
        name: Option<String>,
    },
    /// Delete a snapshot
    DeleteSnapshot { repository: String, snapshot: String },
    /// List the snapshots of a repository
    ListSnapshots { repository: String },
}

/// Repository settings given on the command line; unset flags keep the
/// values from the `[repository]` section of the configuration
#[derive(Args, Debug)]
struct RepositoryArgs {
    /// Storage location
    #[arg(long)]
    location: Option<String>,
    /// Compress metadata files
    #[arg(long)]
    compress: Option<bool>,
    /// Chunk size for large files, e.g. 10m
    #[arg(long)]
    chunk_size: Option<String>,
    /// Register read-only
    #[arg(long)]
    readonly: Option<bool>,
}

impl RepositoryArgs {
    fn apply(self, defaults: &RepositorySettings) -> RepositorySettings {
        let mut settings = defaults.clone();
        if let Some(location) = self.location {
            settings.location = location;
        }
        if let Some(compress) = self.compress {
            settings.compress = compress;
        }
        if let Some(chunk_size) = self.chunk_size {
            settings.chunk_size = chunk_size;
        }
        if let Some(readonly) = self.readonly {
            settings.readonly = readonly;
        }
        settings
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = ClusterConfig::load_with_env(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;

    if let Some(url) = cli.url {
        config.url = url;
    }

    let client = SnapshotAdminClient::from_config(&config)?;
    log::debug!("Using cluster at {}", client.transport().base_url());

    match cli.command {
        Command::CreateRepo { name, settings } => {
            let settings = settings.apply(&config.repository);

            client.create_repository_with(&name, &settings)?;
            println!("{name}");
        }
        Command::DeleteRepo { name } => {
            client.delete_repository(&name)?;
        }
        Command::ListRepos => {
            for name in client.list_repositories()? {
                println!("{name}");
            }
        }
        Command::CreateSnapshot {
            repository,
            indices,
            name,
        } => {
            let name = name.unwrap_or_else(|| snapshot_name(None, chrono::Utc::now()));
            let request = SnapshotRequest::new(indices, config.snapshot);

            let state = client.create_snapshot_named(&repository, &name, &request)?;
            println!("{name}");

            if let Some(state) = state.filter(|s| *s != SnapshotState::Success) {
                eprintln!("warning: snapshot {} finished with state {}", name, state.as_str());
            }
        }
        Command::DeleteSnapshot {
            repository,
            snapshot,
        } => {
            client.delete_snapshot(&repository, &snapshot)?;
        }
        Command::ListSnapshots { repository } => {
            for snapshot in client.list_snapshots(&repository)? {
                let started = snapshot
                    .start_time()
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{}\t{}\t{}\t{}",
                    snapshot.snapshot,
                    snapshot.state.as_str(),
                    started,
                    snapshot.indices.join(",")
                );
            }
        }
    }

    Ok(())
}
