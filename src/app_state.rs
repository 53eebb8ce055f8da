use std::sync::Arc;

use crate::{
    config::Config,
    infrastructure::{
        blob_storage::{BlobStore, LocalBlobStore},
        documents::Documents,
        sqlite_database::SqliteDocumentStore,
    },
    services::{
        AnalyticsService, BlogService, Counters, EventService, FeedService, UserService,
        VenueService,
    },
};

/// Public URL prefix the blob directory is served under
pub const BLOB_PUBLIC_PREFIX: &str = "/blobs";

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<SqliteDocumentStore>,
    pub docs: Documents,
    pub blobs: Arc<dyn BlobStore>,
    pub events: EventService,
    pub venues: VenueService,
    pub users: UserService,
    pub feed: FeedService,
    pub analytics: AnalyticsService,
    pub blog: BlogService,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Arc::new(
            SqliteDocumentStore::connect(&config.database.url, config.database.max_connections)
                .await?,
        );
        let docs = Documents::new(store.clone(), config.cache.capacity);
        let blobs: Arc<dyn BlobStore> =
            Arc::new(LocalBlobStore::new(&config.storage.root, BLOB_PUBLIC_PREFIX).await?);

        let counters = Counters::new(docs.clone());
        let feed = FeedService::new(docs.clone());
        let events = EventService::new(
            docs.clone(),
            blobs.clone(),
            counters.clone(),
            feed.clone(),
            config.queries,
        );
        let venues = VenueService::new(
            docs.clone(),
            blobs.clone(),
            counters.clone(),
            feed.clone(),
            config.queries,
        );
        let users = UserService::new(docs.clone(), counters, feed.clone());

        Ok(Self {
            analytics: AnalyticsService::new(docs.clone()),
            blog: BlogService::new(docs.clone()),
            config,
            store,
            docs,
            blobs,
            events,
            venues,
            users,
            feed,
        })
    }
}
