use std::sync::Arc;

use crate::board::StatusBoard;
use crate::classify::Classifier;
use crate::config::{Config, ConfigError};
use crate::issuer::HintIssuer;
use crate::links::LinkFeed;
use crate::scheduler::Scheduler;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub scheduler: Scheduler,
    pub feed: Arc<LinkFeed>,
    pub board: Arc<StatusBoard>,
}

impl AppState {
    /// Wires a scheduler, link feed and status board from `config`.
    pub fn new(config: Config, issuer: Arc<dyn HintIssuer>) -> Result<Self, ConfigError> {
        let document = config.document_origin()?;
        let scheduler = Scheduler::new(config.scheduler.policy(), issuer);
        let board = StatusBoard::attach(&scheduler, config.board.fadeout_delay.as_duration());
        let feed = LinkFeed::new(
            scheduler.clone(),
            Classifier::new(document, config.scheduler.allow_query_prefetch),
            config.network.gate(),
            config.links.boosts(),
            config.network.connection(),
        );

        Ok(Self {
            config: Arc::new(config),
            scheduler,
            feed: Arc::new(feed),
            board,
        })
    }
}
