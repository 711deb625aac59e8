use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AnalyticsService, AuthService, CourseService, EnrollmentService, SeaOrmAnalyticsService,
    SeaOrmAuthService, SeaOrmCourseService, SeaOrmEnrollmentService, SeaOrmUserService,
    UserService,
};
use crate::storage::{self, BlobStore};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub blobs: Arc<dyn BlobStore>,

    pub auth_service: Arc<dyn AuthService>,

    pub course_service: Arc<dyn CourseService>,

    pub enrollment_service: Arc<dyn EnrollmentService>,

    pub user_service: Arc<dyn UserService>,

    pub analytics_service: Arc<dyn AnalyticsService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let blobs = storage::from_config(&config.storage)
            .map_err(|e| anyhow::anyhow!("Failed to initialize storage: {e}"))?;

        Ok(Self::with_parts(config, store, blobs))
    }

    /// Wires the services over an existing store and blob backend.
    #[must_use]
    pub fn with_parts(config: Config, store: Store, blobs: Arc<dyn BlobStore>) -> Self {
        let config = Arc::new(config);

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            config.clone(),
            blobs.clone(),
        )) as Arc<dyn AuthService>;

        let course_service = Arc::new(SeaOrmCourseService::new(
            store.clone(),
            config.clone(),
            blobs.clone(),
        )) as Arc<dyn CourseService>;

        let enrollment_service =
            Arc::new(SeaOrmEnrollmentService::new(store.clone())) as Arc<dyn EnrollmentService>;

        let user_service = Arc::new(SeaOrmUserService::new(store.clone())) as Arc<dyn UserService>;

        let analytics_service = Arc::new(SeaOrmAnalyticsService::new(store.clone(), blobs.clone()))
            as Arc<dyn AnalyticsService>;

        Self {
            config,
            store,
            blobs,
            auth_service,
            course_service,
            enrollment_service,
            user_service,
            analytics_service,
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}
