//! Drive to GCS webhook mirror daemon (drivemirror)

use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod auth;
mod config;
mod drive;
mod gcs;
mod resolver;

use config::Config;

#[derive(Parser)]
#[command(name = "drivemirror")]
#[command(about = "Drive to GCS webhook mirror daemon", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server (runs in background)
    Serve {
        /// Run in foreground (don't daemonize)
        #[arg(long)]
        foreground: bool,
    },
    /// Stop the server
    Down,
    /// Show server status
    Status,
    /// Resolve a single file's mirror path without transferring it
    Resolve {
        /// Drive file id
        file_id: String,
    },
}

fn pid_file() -> PathBuf {
    dirs::runtime_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("drivemirror.pid")
}

fn is_server_running() -> Option<u32> {
    let pid_path = pid_file();
    if pid_path.exists() {
        if let Ok(pid_str) = fs::read_to_string(&pid_path) {
            if let Ok(pid) = pid_str.trim().parse::<u32>() {
                // Check if process is still running
                #[cfg(unix)]
                {
                    let result = Command::new("kill")
                        .args(["-0", &pid.to_string()])
                        .stdout(Stdio::null())
                        .stderr(Stdio::null())
                        .status();
                    if result.map(|s| s.success()).unwrap_or(false) {
                        return Some(pid);
                    }
                }
                #[cfg(not(unix))]
                {
                    return Some(pid);
                }
            }
        }
        // Stale pid file, remove it
        let _ = fs::remove_file(&pid_path);
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Commands that don't need full init
    match &cli.command {
        Commands::Down => {
            return stop_server();
        }
        Commands::Status => {
            return show_status();
        }
        Commands::Serve { foreground } if !foreground => {
            return start_daemon();
        }
        _ => {}
    }

    // Initialize logging for foreground commands
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "drivemirror=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    config.write_key_from_env()?;

    match cli.command {
        Commands::Serve { foreground: _ } => {
            // Running in foreground mode
            run_server(config).await?;
        }
        Commands::Down => unreachable!(),
        Commands::Status => unreachable!(),
        Commands::Resolve { file_id } => {
            resolve_file(&config, &file_id).await?;
        }
    }

    Ok(())
}

fn start_daemon() -> anyhow::Result<()> {
    // Check if already running
    if let Some(pid) = is_server_running() {
        println!("drivemirror already running (pid {})", pid);
        return Ok(());
    }

    // Get current executable path
    let exe = std::env::current_exe()?;

    // Spawn detached process with --foreground flag
    let child = Command::new(&exe)
        .args(["serve", "--foreground"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    let pid = child.id();

    // Save PID
    let pid_path = pid_file();
    if let Some(parent) = pid_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&pid_path, pid.to_string())?;

    // Load config to get the port
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    println!("drivemirror serving on localhost:{}", config.rest_port);
    println!("pid: {}", pid);

    Ok(())
}

fn stop_server() -> anyhow::Result<()> {
    if let Some(pid) = is_server_running() {
        #[cfg(unix)]
        {
            Command::new("kill").args([&pid.to_string()]).status()?;
        }
        #[cfg(not(unix))]
        {
            Command::new("taskkill")
                .args(["/PID", &pid.to_string(), "/F"])
                .status()?;
        }

        let _ = fs::remove_file(pid_file());
        println!("drivemirror stopped");
    } else {
        println!("drivemirror not running");
    }
    Ok(())
}

fn show_status() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    if let Some(pid) = is_server_running() {
        println!("drivemirror running");
        println!("  pid: {}", pid);
        println!("  rest: localhost:{}", config.rest_port);
        println!("  bucket: {}", config.bucket_name);
        println!("  shared folder: {}", config.shared_folder_id);
    } else {
        println!("drivemirror not running");
    }
    Ok(())
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    // Save PID for foreground mode too
    let pid_path = pid_file();
    if let Some(parent) = pid_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&pid_path, std::process::id().to_string())?;

    let app_state = api::AppState::new(config.clone());

    let rest_addr = format!("0.0.0.0:{}", config.rest_port).parse()?;
    tracing::info!("REST listening on {}", rest_addr);
    tracing::info!(
        bucket = %config.bucket_name,
        base_path = %config.gcs_base_path,
        shared_folder = %config.shared_folder_id,
        "mirror configuration"
    );
    api::rest::serve(rest_addr, app_state).await?;

    // Cleanup PID file
    let _ = fs::remove_file(pid_file());

    Ok(())
}

/// One-shot path resolution from the command line, the CLI counterpart of
/// `GET /test-file/<id>`.
async fn resolve_file(config: &Config, file_id: &str) -> anyhow::Result<()> {
    let http = reqwest::Client::new();
    let key = auth::ServiceAccountKey::from_file(&config.key_file)?;
    let client = drive::DriveClient::connect(http, &key).await?;

    let metadata = client.metadata(file_id).await?;

    let path_resolver = resolver::Resolver::new(&client, &config.shared_folder_id);
    let (chain, relative) = path_resolver.resolve(file_id).await?;

    println!("file: {} ({})", metadata.name, metadata.mime_type);
    println!("full path: {}", chain.full_path());
    match relative {
        Some(rel) => {
            let destination =
                resolver::object_key(&config.gcs_base_path, &rel.folder_path, &rel.file_name);
            println!("relative path: {}", rel.folder_path);
            println!("destination: gs://{}/{}", config.bucket_name, destination);
        }
        None => {
            println!("no relative path (file is the shared root)");
        }
    }

    Ok(())
}
