//! One-shot daily run: fetch the board, classify, notify, print the report
//!
//! Meant to be started once a day by cron or a systemd timer.

use board_alerts::app::{self, AppError};
use board_alerts::config::Settings;
use board_alerts::core::{today_utc, RunReport};
use board_alerts::logging;
use board_alerts::services::classifier::into_notices;
use board_alerts::services::NoticeClassifier;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init(&settings.logging);

    match run(&settings).await {
        Ok(report) => match serde_json::to_string_pretty(&report) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("Failed to serialize report: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            error!(error = %e, "Daily run failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: &Settings) -> Result<RunReport, AppError> {
    let today = today_utc();
    info!("Daily run for {}", today);

    let geocoder = Arc::new(app::build_geocoder(&settings.geocoder)?);
    let classifier = app::build_classifier(settings, geocoder)?;
    let board = app::build_board_client(settings)?;
    let orchestrator = app::build_orchestrator(settings, app::build_store(settings))?;

    let items = board.fetch().await?;
    let classifications = classifier.classify(&items).await;
    let notices = into_notices(items, classifications);

    info!("Classified {} notices", notices.len());

    Ok(orchestrator.run(&notices, today).await?)
}
