use std::sync::Arc;

use redis::aio::ConnectionManager;

use super::{config::Config, database::init_redis, sentiment::SentimentClassifier};

pub struct State {
    pub config: Config,
    pub classifier: SentimentClassifier,
    pub redis_connection: ConnectionManager,
}

impl State {
    pub async fn new() -> Arc<Self> {
        let config = Config::load();

        let redis_connection = init_redis(&config.redis_url).await;
        let classifier = SentimentClassifier::new(&config);

        Arc::new(Self {
            config,
            classifier,
            redis_connection,
        })
    }
}
