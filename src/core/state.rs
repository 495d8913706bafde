use std::sync::Arc;

use time::PrimitiveDateTime;

use crate::core::time::Clock;
use crate::core::{config::Settings, redis::RedisHandle};
use crate::store::AttemptStore;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    store: Arc<dyn AttemptStore>,
    redis: RedisHandle,
    clock: Arc<dyn Clock>,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        store: Arc<dyn AttemptStore>,
        redis: RedisHandle,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { inner: Arc::new(InnerState { settings, store, redis, clock }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn store(&self) -> &dyn AttemptStore {
        self.inner.store.as_ref()
    }

    pub(crate) fn redis(&self) -> &RedisHandle {
        &self.inner.redis
    }

    pub(crate) fn now(&self) -> PrimitiveDateTime {
        self.inner.clock.now()
    }
}
