use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::auth::events::AuthEvents;
use crate::config::Config;
use crate::storage::PhotoStorage;
use crate::store::sqlite::SqliteRecordStore;
use crate::store::RecordStore;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub store: Arc<dyn RecordStore>,
    pub photos: PhotoStorage,
    pub auth_events: AuthEvents,
}

impl AppState {
    pub fn new(db: DbPool, config: Config) -> Self {
        let store = Arc::new(SqliteRecordStore::new(db.clone()));
        let photos = PhotoStorage::new(config.uploads_path());
        Self {
            db,
            config,
            store,
            photos,
            auth_events: AuthEvents::new(),
        }
    }
}
