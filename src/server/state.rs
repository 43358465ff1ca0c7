use std::sync::Arc;

use crate::api::fetcher::{FetchError, HttpFetcher, TextFetcher};
use crate::api::sources::SourceCatalog;
use crate::config::Config;
use crate::models::cache::TtlCache;
use crate::services::open_data::OpenDataService;
use crate::services::pet_store::{MemoryPetStore, PetStore};

pub struct AppState {
    pub config: Config,
    pub pets: Arc<dyn PetStore>,
    pub open_data: OpenDataService,
}

impl AppState {
    /// Production wiring: reqwest fetcher and the in-memory store.
    pub fn new(config: Config) -> Result<Arc<Self>, FetchError> {
        let fetcher = Arc::new(HttpFetcher::new()?);
        Ok(Self::with_parts(config, fetcher, Arc::new(MemoryPetStore::new())))
    }

    pub fn with_parts(
        config: Config,
        fetcher: Arc<dyn TextFetcher>,
        pets: Arc<dyn PetStore>,
    ) -> Arc<Self> {
        let open_data = OpenDataService::new(
            fetcher,
            TtlCache::new(config.cache_ttl),
            SourceCatalog::new(config.open_data_base.clone(), config.mirrors.clone()),
            config.retry.clone(),
        );

        Arc::new(Self {
            config,
            pets,
            open_data,
        })
    }
}
