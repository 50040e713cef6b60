use crate::cache::TtlCache;
use crate::config::Config;
use crate::db::{DashboardStats, DbPool, Settings};
use crate::render::RenderOptions;
use std::sync::{Arc, Mutex};

pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<Config>,
    pub settings_cache: Mutex<TtlCache<Settings>>,
    pub stats_cache: Mutex<TtlCache<DashboardStats>>,
}

impl AppState {
    pub fn new(pool: DbPool, config: Arc<Config>) -> Self {
        Self {
            settings_cache: Mutex::new(TtlCache::new(config.settings_cache_ttl)),
            stats_cache: Mutex::new(TtlCache::new(config.stats_cache_ttl)),
            pool,
            config,
        }
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions::new(self.config.upload_folder.clone())
            .with_raster_scale(self.config.raster_scale)
    }
}
