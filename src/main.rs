use std::process::ExitCode;

use crate::{
    config::App,
    crawler::pse::{quote::QuoteScraper, PseEdge},
    logging::Logger,
    producer::KafkaConnector,
};

pub mod config;
pub mod crawler;
pub mod declare;
pub mod dispatch;
pub mod logging;
pub mod producer;
pub mod util;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let logger = Logger::new("stock_data_fetcher");

    let settings = App::load(&logger);
    let connector = settings
        .as_ref()
        .map(|app| KafkaConnector {
            connect_timeout: app.kafka.connect_timeout(),
            message_timeout: app.kafka.message_timeout(),
        })
        .unwrap_or_default();

    let result = dispatch::launch(
        settings,
        &connector,
        |app| QuoteScraper::new(PseEdge::new(&app.edge.host), app.number_locale(&logger)),
        &logger,
    )
    .await;

    let code = match result {
        Ok(report) => {
            if !report.scrape_failures.is_empty() || !report.send_failures.is_empty() {
                logger.warn(format!(
                    "{} sent, failed to fetch: {:?}, failed to send: {:?}",
                    report.sent.len(),
                    report.scrape_failures,
                    report.send_failures
                ));
            }
            ExitCode::SUCCESS
        }
        Err(_) => ExitCode::FAILURE,
    };

    logger.close();
    code
}
