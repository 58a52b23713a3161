use std::sync::Arc;
use std::time::Duration;

use minidek::{
    config::GameConfig,
    generator::CreatureGenerator,
    handlers,
    shared::AppState,
    store::{GameStore, InMemoryGameStore},
    GameSessionController,
};

use super::mocks::ScriptedGenerator;

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub store: Arc<dyn GameStore>,
    pub controller: Arc<GameSessionController>,
}

impl TestSetup {
    /// Router over the same controller, for HTTP-level tests
    pub fn router(&self) -> axum::Router {
        handlers::router(AppState::new(Arc::clone(&self.controller)))
    }

    pub async fn balance(&self) -> i64 {
        self.store.get_token_balance().await.unwrap()
    }

    pub async fn item_count(&self) -> usize {
        self.store.get_items().await.unwrap().len()
    }
}

pub struct TestSetupBuilder {
    store: Option<Arc<dyn GameStore>>,
    generator: Option<Arc<dyn CreatureGenerator>>,
    config: GameConfig,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            generator: None,
            config: GameConfig::default(),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn GameStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_generator(mut self, generator: Arc<dyn CreatureGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_generation_cost(mut self, cost: i64) -> Self {
        self.config.generation_cost = cost;
        self
    }

    pub fn with_generator_timeout(mut self, timeout: Duration) -> Self {
        self.config.generator_timeout = timeout;
        self
    }

    pub fn build(self) -> TestSetup {
        let store = self.store.unwrap_or_else(|| {
            Arc::new(InMemoryGameStore::new(self.config.starting_tokens))
        });
        let generator = self
            .generator
            .unwrap_or_else(|| Arc::new(ScriptedGenerator::new(vec![])));
        let controller = Arc::new(GameSessionController::new(
            Arc::clone(&store),
            generator,
            self.config,
        ));

        TestSetup { store, controller }
    }

    /// Builds and starts a fresh game
    pub async fn start(self) -> TestSetup {
        let setup = self.build();
        setup.controller.start_new_game(false).await.unwrap();
        setup
    }
}

impl Default for TestSetupBuilder {
    fn default() -> Self {
        Self::new()
    }
}
