use std::time::Duration;

use async_trait::async_trait;
use rdkafka::{
    config::ClientConfig,
    error::{KafkaError, RDKafkaErrorCode},
    producer::{FutureProducer, FutureRecord, Producer},
    util::Timeout,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("unable to connect to {server_addr}: {reason}")]
    Connection { server_addr: String, reason: String },
    #[error("timed out publishing to {topic}: {reason}")]
    Timeout { topic: String, reason: String },
    #[error("broker rejected the message for {topic}: {reason}")]
    Rejected { topic: String, reason: String },
    #[error("flush did not complete: {0}")]
    FlushTimeout(String),
    #[error("close failed: {0}")]
    Close(String),
}

/// A connection that publishes value-only messages to topics.
#[async_trait]
pub trait Publisher: Send {
    async fn send(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError>;
    /// Waits at most `timeout` for buffered messages to be acknowledged.
    async fn flush(&mut self, timeout: Duration) -> Result<(), PublishError>;
    fn close(&mut self) -> Result<(), PublishError>;
}

/// Opens publisher connections.
#[async_trait]
pub trait Connector: Send + Sync {
    type Publisher: Publisher;

    async fn connect(&self, server_addr: &str) -> Result<Self::Publisher, PublishError>;
}

/// Kafka 連線參數
#[derive(Debug, Clone, Copy)]
pub struct KafkaConnector {
    /// 等待 broker metadata 的時間，超過即視為無法連線
    pub connect_timeout: Duration,
    /// 單筆訊息的傳遞期限
    pub message_timeout: Duration,
}

impl Default for KafkaConnector {
    fn default() -> Self {
        KafkaConnector {
            connect_timeout: Duration::from_secs(5),
            message_timeout: Duration::from_secs(5),
        }
    }
}

#[async_trait]
impl Connector for KafkaConnector {
    type Publisher = KafkaPublisher;

    async fn connect(&self, server_addr: &str) -> Result<KafkaPublisher, PublishError> {
        let connection_error = |reason: String| PublishError::Connection {
            server_addr: server_addr.to_string(),
            reason,
        };

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", server_addr)
            .set(
                "message.timeout.ms",
                self.message_timeout.as_millis().to_string(),
            )
            .create()
            .map_err(|why| connection_error(format!("{:?}", why)))?;

        // 建立 producer 並不會連線，先取一次 metadata 確認 broker 可用
        let probe = producer.clone();
        let timeout = self.connect_timeout;
        tokio::task::spawn_blocking(move || {
            probe
                .client()
                .fetch_metadata(None, timeout)
                .map(|_| ())
                .map_err(|why| format!("{:?}", why))
        })
        .await
        .map_err(|why| connection_error(format!("{:?}", why)))?
        .map_err(connection_error)?;

        Ok(KafkaPublisher {
            producer,
            queue_timeout: self.message_timeout,
        })
    }
}

pub struct KafkaPublisher {
    producer: FutureProducer,
    queue_timeout: Duration,
}

#[async_trait]
impl Publisher for KafkaPublisher {
    async fn send(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        let record = FutureRecord::<(), [u8]>::to(topic).payload(&payload);

        self.producer
            .send(record, Timeout::After(self.queue_timeout))
            .await
            .map(|_| ())
            .map_err(|(why, _)| classify(topic, why))
    }

    async fn flush(&mut self, timeout: Duration) -> Result<(), PublishError> {
        let producer = self.producer.clone();

        tokio::task::spawn_blocking(move || {
            producer
                .flush(Timeout::After(timeout))
                .map_err(|why| format!("{:?}", why))
        })
        .await
        .map_err(|why| PublishError::FlushTimeout(format!("{:?}", why)))?
        .map_err(PublishError::FlushTimeout)
    }

    fn close(&mut self) -> Result<(), PublishError> {
        let in_flight = self.producer.in_flight_count();
        if in_flight > 0 {
            return Err(PublishError::Close(format!(
                "{} messages were still in flight and are discarded",
                in_flight
            )));
        }

        Ok(())
    }
}

/// 區分逾時與其他傳送失敗
fn classify(topic: &str, why: KafkaError) -> PublishError {
    let reason = format!("{:?}", why);

    match why.rdkafka_error_code() {
        Some(
            RDKafkaErrorCode::MessageTimedOut
            | RDKafkaErrorCode::QueueFull
            | RDKafkaErrorCode::RequestTimedOut
            | RDKafkaErrorCode::OperationTimedOut,
        ) => PublishError::Timeout {
            topic: topic.to_string(),
            reason,
        },
        _ => PublishError::Rejected {
            topic: topic.to_string(),
            reason,
        },
    }
}
