use chrono::Local;
use thiserror::Error;

use crate::{
    config::{App, ConfigError},
    crawler::StockScraper,
    logging::Logger,
    producer::{Connector, PublishError, Publisher},
};

/// Errors that stop a run before any symbol is processed.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Connection(PublishError),
}

/// Outcome of a completed run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub sent: Vec<String>,
    pub scrape_failures: Vec<String>,
    pub send_failures: Vec<String>,
    pub flushed: bool,
    pub closed: bool,
}

/// Loads the settings and runs one batch.
///
/// `settings` is the result of configuration loading, `build_scraper` is only
/// called once the settings are valid.
pub async fn launch<C, S, F>(
    settings: Result<App, ConfigError>,
    connector: &C,
    build_scraper: F,
    logger: &Logger,
) -> Result<RunReport, FatalError>
where
    C: Connector,
    S: StockScraper,
    F: FnOnce(&App) -> S,
{
    let app = settings.map_err(|why| {
        logger.critical(why.to_string());
        why
    })?;

    let scraper = build_scraper(&app);
    run(&app, connector, &scraper, logger).await
}

/// Sends one message per symbol, skipping symbols that fail.
///
/// Only a failed connection aborts the run. Once connected the producer is
/// flushed and closed no matter how many symbols failed.
pub async fn run<C, S>(
    app: &App,
    connector: &C,
    scraper: &S,
    logger: &Logger,
) -> Result<RunReport, FatalError>
where
    C: Connector,
    S: StockScraper + ?Sized,
{
    logger.info(format!(
        "Sending stock data for {} ...",
        Local::now().format("%Y-%m-%d")
    ));

    let producer = create_producer(connector, &app.kafka.server_addr, logger)
        .await
        .map_err(|why| {
            logger.critical(format!("Unable to start without a Kafka connection: {}", why));
            FatalError::Connection(why)
        })?;

    let mut report = RunReport::default();
    {
        // 離開區塊時一定會關閉連線
        let closed = &mut report.closed;
        let mut producer = scopeguard::guard(producer, |mut p| {
            *closed = close_producer(&mut p, logger);
        });

        for stock_code in &app.stock.codes {
            logger.info(format!("Fetching stock data for {} ...", stock_code));
            let sr = match scraper.scrape(stock_code).await {
                Ok(sr) => sr,
                Err(why) => {
                    logger.error(format!(
                        "Error fetching stock data for {}: {}",
                        stock_code, why.cause
                    ));
                    report.scrape_failures.push(stock_code.clone());
                    continue;
                }
            };
            logger.info(format!("Stock data fetched: {}", sr));

            logger.info(format!("Sending stock data for {} ...", stock_code));
            let payload = match sr.to_payload() {
                Ok(payload) => payload,
                Err(why) => {
                    logger.error(format!(
                        "Error sending stock data for {}: unable to encode the record: {}",
                        stock_code, why
                    ));
                    report.send_failures.push(stock_code.clone());
                    continue;
                }
            };

            match producer.send(&app.kafka.topic, payload).await {
                Ok(()) => {
                    logger.info(format!("Sent stock data for {}", stock_code));
                    report.sent.push(stock_code.clone());
                }
                Err(why) => {
                    logger.error(format!("Error sending stock data for {}: {}", stock_code, why));
                    report.send_failures.push(stock_code.clone());
                }
            }
        }

        match producer.flush(app.kafka.flush_timeout()).await {
            Ok(()) => report.flushed = true,
            Err(why) => logger.error(format!(
                "Failed to flush buffered records within timeout: {}",
                why
            )),
        }
    }

    logger.info("Done sending all stock data");

    Ok(report)
}

async fn create_producer<C: Connector>(
    connector: &C,
    server_addr: &str,
    logger: &Logger,
) -> Result<C::Publisher, PublishError> {
    logger.info(format!("Connecting to Kafka server at {} ...", server_addr));

    match connector.connect(server_addr).await {
        Ok(producer) => {
            logger.info("Connected to Kafka server");
            Ok(producer)
        }
        Err(why) => {
            logger.warn(format!(
                "Error connecting to Kafka server at {}: {}",
                server_addr, why
            ));
            Err(why)
        }
    }
}

fn close_producer<P: Publisher>(producer: &mut P, logger: &Logger) -> bool {
    match producer.close() {
        Ok(()) => {
            logger.info("Connection to Kafka server closed");
            true
        }
        Err(why) => {
            logger.error(format!("Error closing connection to Kafka server: {}", why));
            false
        }
    }
}
