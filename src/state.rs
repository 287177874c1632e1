use std::sync::Arc;

use crate::database::Database;
use crate::storage::FileStorage;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub storage: Arc<dyn FileStorage>,
}
