//! The backbone context: one event bus and one service registry per game
//! session, shared as `Arc<Backbone>`.

use crate::config::BackboneConfig;
use crate::events::EventBus;
use crate::services::ServiceRegistry;

#[derive(Debug)]
pub struct Backbone {
    config: BackboneConfig,
    events: EventBus,
    services: ServiceRegistry,
}

impl Backbone {
    pub fn new(config: BackboneConfig) -> Self {
        tracing::debug!(
            scratch_pool_limit = config.scratch_pool_limit,
            max_retained_capacity = config.max_retained_capacity,
            "Backbone created"
        );

        Self {
            events: EventBus::with_config(&config),
            services: ServiceRegistry::new(),
            config,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn services(&self) -> &ServiceRegistry {
        &self.services
    }

    pub fn config(&self) -> &BackboneConfig {
        &self.config
    }

    /// Drop every subscription and every registered service.
    ///
    /// Called when a new set of subsystems takes over, e.g. on scene change.
    /// Subscriptions are cleared before services.
    pub fn reset(&self) {
        self.events.clear_all();
        let services = self.services.clear();
        tracing::info!(services, "Backbone reset");
    }
}

impl Default for Backbone {
    fn default() -> Self {
        Self::new(BackboneConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct Scoreboard;
    struct RoundStarted;

    #[test]
    fn backbone_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Backbone>();
    }

    #[test]
    fn reset_clears_bus_and_registry() {
        let backbone = Backbone::default();
        backbone.events().subscribe_fn(|_: &RoundStarted| {});
        backbone.services().register(Arc::new(Scoreboard)).unwrap();

        backbone.reset();

        assert_eq!(backbone.events().total_listener_count(), 0);
        assert!(!backbone.services().is_registered::<Scoreboard>());
    }

    #[test]
    fn config_is_kept() {
        let config = BackboneConfig {
            scratch_pool_limit: 1,
            ..BackboneConfig::default()
        };
        let backbone = Backbone::new(config.clone());

        assert_eq!(backbone.config(), &config);
    }
}
