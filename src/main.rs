use clap::{Parser, Subcommand};
use photoshare_autoupload::config::DEFAULT_CONFIG_FILE;
use photoshare_autoupload::models::UserContext;
use photoshare_autoupload::{App, AppConfig, AppError};
use std::path::PathBuf;

/// Headless PhotoShare auto-upload runner
#[derive(Parser)]
#[command(name = "photoshare-autoupload")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE, env = "PHOTOSHARE_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload new photos for one event
    Check { event_id: String },
    /// Check every subscribed event once
    Sweep,
    /// Run the background sweep until interrupted
    Watch,
    /// Store the signed-in user and upload preferences
    SetUser {
        user_id: String,
        #[arg(long, env = "PHOTOSHARE_JWT")]
        token: Option<String>,
        #[arg(long)]
        auto_upload: bool,
        #[arg(long)]
        wifi_only: bool,
        #[arg(long)]
        background: bool,
    },
    /// Forget the signed-in user
    SignOut,
    /// Show the stored user context
    Status,
}

fn configure_logging() {
    #[cfg(target_os = "android")]
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(log::LevelFilter::Info)
            .with_tag("PhotoShareAutoUpload"),
    );

    #[cfg(not(target_os = "android"))]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    configure_logging();
    let args = Args::parse();

    if let Err(e) = run(args).await {
        log::error!("{}", e);
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), AppError> {
    let config = AppConfig::load(&args.config)?;
    let app = App::build(config)?;

    match args.command {
        Command::Check { event_id } => {
            let result = app.orchestrator.check_event(&event_id).await?;
            println!("{}: {}", event_id, result.summary());
        }
        Command::Sweep => {
            let results = app.orchestrator.check_all_subscribed_events().await?;
            if results.is_empty() {
                println!("No events checked");
            }
            for (event_id, result) in results {
                match result {
                    Ok(batch) => println!("{}: {}", event_id, batch.summary()),
                    Err(e) => println!("{}: failed ({})", event_id, e),
                }
            }
        }
        Command::Watch => {
            if !app.orchestrator.settings().background_upload_enabled {
                println!("Background upload is disabled for this user");
                return Ok(());
            }
            let uploader = app.background_uploader();
            let Some(handle) = uploader.start() else {
                return Ok(());
            };
            tokio::signal::ctrl_c().await?;
            log::info!("Interrupted, finishing current event");
            uploader.stop();
            handle
                .await
                .map_err(|e| AppError::Other(format!("Background task failed: {}", e)))?;
        }
        Command::SetUser {
            user_id,
            token,
            auto_upload,
            wifi_only,
            background,
        } => {
            let mut context = UserContext::new(user_id, token);
            context.auto_upload_enabled = auto_upload;
            context.wifi_only_upload = wifi_only;
            context.background_upload_enabled = background;
            app.set_user_context(&context)?;
            println!("Saved user context for {}", context.user_id);
        }
        Command::SignOut => {
            app.clear_user_context()?;
            println!("Signed out");
        }
        Command::Status => match app.user_context()? {
            Some(context) => {
                println!("User:        {}", context.user_id);
                println!("Token:       {}", if context.has_token() { "stored" } else { "none" });
                println!("Auto-upload: {}", context.auto_upload_enabled);
                println!("Wi-Fi only:  {}", context.wifi_only_upload);
                println!("Background:  {}", context.background_upload_enabled);
                println!("Device:      {}", context.device_id.unwrap_or_default());
            }
            None => println!("Not signed in"),
        },
    }

    Ok(())
}
