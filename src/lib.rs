pub mod app;
pub mod auth;
pub mod chat;
pub mod cli;
pub mod companion;
pub mod config;
pub mod device;
pub mod error;
pub mod llm;
pub mod models;
pub mod reminders;
pub mod storage;
pub mod view;

use app::App;
use cli::Args;
use log::info;
use std::error::Error;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Store Type: {}", args.store);
    info!("Data Directory: {}", args.data_dir.display());
    info!("Model: {}", args.model.as_deref().unwrap_or(llm::DEFAULT_MODEL));
    info!("Base URL: {}", args.base_url.as_deref().unwrap_or(llm::DEFAULT_BASE_URL));
    info!("API Key Set: {}", app::resolve_api_key(&args).is_some());
    info!("Prompts Path: {}", args.prompts_path.as_deref().unwrap_or("(built-in)"));
    info!("Request Timeout: {}s", args.request_timeout_secs);
    info!("Device Sync Delay: {}ms", args.sync_delay_ms);
    info!("-------------------------");

    let command = args.command.clone();
    let app = App::new(args)?;
    let output = app.execute(command).await?;
    println!("{}", output);
    Ok(())
}
