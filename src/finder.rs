//! The finder orchestrates fetch → decode → presentation.
//!
//! It owns the one piece of policy the lower layers deliberately avoid:
//! whether an outcome becomes a user-visible event. A load emits at most one
//! of items-loaded / error / silent no-op. The first load must succeed
//! visibly or fail visibly; once something is on screen, transient refresh
//! failures are logged and swallowed so stale-but-displayed data wins.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use reqwest::Url;

use crate::cache::CacheStore;
use crate::feed::{decode_features, FeedError, FeedGateway, FetchOutcome, LocationEntity};
use crate::handoff;
use crate::location::{LocationGateway, UserLocationStatus};
use crate::map::{Annotation, GeoCoordinate};

/// One restaurant as the presentation layer sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct FinderItem {
    pub coordinate: GeoCoordinate,
    pub name: String,
    pub postcode: String,
}

impl FinderItem {
    fn from_entity(entity: &LocationEntity) -> Self {
        Self {
            coordinate: GeoCoordinate {
                latitude: entity.latitude,
                longitude: entity.longitude,
            },
            name: entity.name.clone(),
            postcode: entity.postcode.clone(),
        }
    }
}

impl Annotation for FinderItem {
    fn coordinate(&self) -> GeoCoordinate {
        self.coordinate
    }
}

/// What the user can do about an error. Reloading is the only recovery this
/// app offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Re-invoke `load()`.
    Retry,
}

/// A user-facing error notice.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorNotice {
    pub title: String,
    pub message: String,
    pub action: ErrorAction,
}

impl ErrorNotice {
    fn data_error(err: &FeedError) -> Self {
        let message = match err {
            FeedError::Status { .. } | FeedError::Transport(_) => {
                "Could not download restaurant data. Check your connection and try again."
            }
            FeedError::DecompressionFailed(_) | FeedError::MalformedPayload(_) => {
                "The restaurant data could not be read. Try again later."
            }
            FeedError::Unexpected(_) => "An unexpected error occurred loading data. Try again later.",
        };
        Self {
            title: "Data Error".to_string(),
            message: message.to_string(),
            action: ErrorAction::Retry,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStateUi {
    InProgress,
    Finished,
}

/// State of the "enable location tracking" control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingControlUi {
    /// Tracking is active; the control gets out of the way.
    Hidden,
    /// Tappable while the user has not decided.
    Enabled,
    /// Permission denied; shown greyed out.
    Disabled,
}

/// Presentation boundary.
///
/// Implementations must be `Send + Sync`; calls arrive on the finder's async
/// task, and it is the implementation's job to hop onto its own UI context.
pub trait FinderOutlet: Send + Sync {
    fn show_items(&self, items: Vec<FinderItem>);
    fn show_error(&self, notice: ErrorNotice);
    fn show_url(&self, url: Url, title: &str);
    fn show_download_state(&self, state: DownloadStateUi);
    fn show_tracking_control(&self, control: TrackingControlUi);
    /// Begin following the user on the map.
    fn show_user_tracking(&self);
}

/// Orchestrator for the restaurant map.
pub struct Finder {
    gateway: Arc<dyn FeedGateway>,
    cache: Arc<dyn CacheStore>,
    location: Arc<LocationGateway>,
    outlet: Arc<dyn FinderOutlet>,
    /// Whether at least one load has completed successfully.
    loaded: AtomicBool,
}

impl Finder {
    pub fn new(
        gateway: Arc<dyn FeedGateway>,
        cache: Arc<dyn CacheStore>,
        location: Arc<LocationGateway>,
        outlet: Arc<dyn FinderOutlet>,
    ) -> Self {
        Self {
            gateway,
            cache,
            location,
            outlet,
            loaded: AtomicBool::new(false),
        }
    }

    pub fn has_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// Fetch, decode and publish the restaurant feed.
    ///
    /// Calls are not guarded against each other: invoking `load()` while a
    /// previous fetch is outstanding starts a second, unrelated fetch.
    /// Callers serialize loads (the CLI awaits each one).
    pub async fn load(&self) {
        self.outlet.show_download_state(DownloadStateUi::InProgress);
        match self.gateway.fetch().await {
            FetchOutcome::Fresh(bytes) => self.decode_and_publish(bytes).await,
            FetchOutcome::NotModified => self.handle_not_modified().await,
            FetchOutcome::Failed(err) => self.handle_failure(err),
        }
        self.outlet.show_download_state(DownloadStateUi::Finished);
    }

    /// Refresh the tracking control from the current permission state,
    /// without prompting.
    pub fn update_ui(&self) {
        self.request_tracking_ui(false);
    }

    /// The user asked for location tracking; prompt if necessary.
    pub fn update_location(&self) {
        self.request_tracking_ui(true);
    }

    /// The user picked a restaurant: hand off to a web search for it.
    pub fn did_select(&self, item: &FinderItem) {
        let url = handoff::search_url(&item.name, &item.postcode);
        tracing::debug!(%url, "handing off to web search");
        self.outlet.show_url(url, &item.name);
    }

    async fn decode_and_publish(&self, bytes: Vec<u8>) {
        let decoded = tokio::task::spawn_blocking(move || decode_features(&bytes)).await;
        let result = match decoded {
            Ok(result) => result,
            Err(join_err) => Err(FeedError::Unexpected(join_err.into())),
        };

        match result {
            Ok(entities) => self.publish(entities),
            Err(err) => {
                // A payload we cannot read must not keep answering 304.
                if let Err(clear_err) = self.cache.clear_validator().await {
                    tracing::warn!(error = %clear_err, "failed to clear validator after decode error");
                }
                self.handle_failure(err);
            }
        }
    }

    async fn handle_not_modified(&self) {
        if self.has_loaded() {
            tracing::debug!("feed unchanged, keeping current items");
            return;
        }

        // First load of this run answered 304: the payload copy persisted by
        // an earlier run stands in for the body.
        match self.cache.read_payload().await {
            Ok(Some(bytes)) => self.decode_and_publish(bytes).await,
            Ok(None) => self.handle_failure(FeedError::Unexpected(anyhow::anyhow!(
                "server reported no change but no cached payload exists"
            ))),
            Err(err) => self.handle_failure(err.into()),
        }
    }

    fn handle_failure(&self, err: FeedError) {
        if self.has_loaded() {
            tracing::warn!(error = %err, "feed refresh failed, keeping previously loaded items");
            return;
        }
        tracing::error!(error = %err, "initial feed load failed");
        self.outlet.show_error(ErrorNotice::data_error(&err));
    }

    fn publish(&self, entities: Vec<LocationEntity>) {
        self.loaded.store(true, Ordering::SeqCst);
        let items: Vec<FinderItem> = entities.iter().map(FinderItem::from_entity).collect();
        tracing::info!(count = items.len(), "restaurant feed loaded");
        self.outlet.show_items(items);
    }

    fn request_tracking_ui(&self, request_authorization: bool) {
        let reply = self.location.request_status(request_authorization);
        let outlet = Arc::clone(&self.outlet);
        tokio::spawn(async move {
            // A closed channel means a newer request superseded this one.
            let Ok(status) = reply.await else { return };
            match status {
                UserLocationStatus::Granted => {
                    outlet.show_tracking_control(TrackingControlUi::Hidden);
                    outlet.show_user_tracking();
                }
                UserLocationStatus::Undetermined => {
                    outlet.show_tracking_control(TrackingControlUi::Enabled);
                }
                UserLocationStatus::Denied => {
                    outlet.show_tracking_control(TrackingControlUi::Disabled);
                }
                // The gateway only replies with resolved statuses.
                UserLocationStatus::Initializing => {}
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::cache::SqliteCacheStore;
    use crate::location::AuthorizationLevel;

    use super::*;

    const DOG_AND_DUCK: &[u8] = br#"{"type":"FeatureCollection","features":[{"properties":{"name":"Dog and Duck","postcode":"AB1 2CD"},"geometry":{"coordinates":[-2.89,54.09]}}]}"#;

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join("eatout-rs")
            .join("finder_tests")
            .join(name);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    struct ScriptedGateway {
        outcomes: Mutex<VecDeque<FetchOutcome>>,
    }

    impl ScriptedGateway {
        fn new(outcomes: Vec<FetchOutcome>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
            })
        }
    }

    #[async_trait::async_trait]
    impl FeedGateway for ScriptedGateway {
        async fn fetch(&self) -> FetchOutcome {
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted outcome left")
        }
    }

    #[derive(Debug, PartialEq)]
    enum Event {
        Items(Vec<FinderItem>),
        Error(ErrorNotice),
        Url(String, String),
        Tracking(TrackingControlUi),
        UserTracking,
    }

    #[derive(Default)]
    struct RecordingOutlet {
        events: Mutex<Vec<Event>>,
    }

    impl RecordingOutlet {
        fn events(&self) -> std::sync::MutexGuard<'_, Vec<Event>> {
            self.events.lock().unwrap()
        }
    }

    impl FinderOutlet for RecordingOutlet {
        fn show_items(&self, items: Vec<FinderItem>) {
            self.events().push(Event::Items(items));
        }
        fn show_error(&self, notice: ErrorNotice) {
            self.events().push(Event::Error(notice));
        }
        fn show_url(&self, url: Url, title: &str) {
            self.events().push(Event::Url(url.to_string(), title.to_string()));
        }
        fn show_download_state(&self, _state: DownloadStateUi) {
            // Progress chrome, not a presentation event.
        }
        fn show_tracking_control(&self, control: TrackingControlUi) {
            self.events().push(Event::Tracking(control));
        }
        fn show_user_tracking(&self) {
            self.events().push(Event::UserTracking);
        }
    }

    struct Harness {
        finder: Finder,
        outlet: Arc<RecordingOutlet>,
        cache: Arc<SqliteCacheStore>,
        location: Arc<LocationGateway>,
    }

    fn harness(name: &str, outcomes: Vec<FetchOutcome>) -> Harness {
        let cache = Arc::new(SqliteCacheStore::open_in_memory(&test_dir(name)).unwrap());
        let (location, _prompts) = LocationGateway::new();
        let location = Arc::new(location);
        let outlet = Arc::new(RecordingOutlet::default());
        let finder = Finder::new(
            ScriptedGateway::new(outcomes),
            cache.clone(),
            location.clone(),
            outlet.clone(),
        );
        Harness {
            finder,
            outlet,
            cache,
            location,
        }
    }

    #[tokio::test]
    async fn test_fresh_outcome_publishes_items() {
        let h = harness(
            "fresh",
            vec![FetchOutcome::Fresh(DOG_AND_DUCK.to_vec())],
        );

        h.finder.load().await;

        let events = h.outlet.events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            Event::Items(items) => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].name, "Dog and Duck");
                assert_eq!(items[0].postcode, "AB1 2CD");
                assert_eq!(items[0].coordinate.latitude, 54.09);
                assert_eq!(items[0].coordinate.longitude, -2.89);
            }
            other => panic!("expected Items, got {other:?}"),
        }
        assert!(h.finder.has_loaded());
    }

    #[tokio::test]
    async fn test_not_modified_after_load_is_silent() {
        let h = harness(
            "nm_silent",
            vec![
                FetchOutcome::Fresh(DOG_AND_DUCK.to_vec()),
                FetchOutcome::NotModified,
            ],
        );

        h.finder.load().await;
        h.finder.load().await;

        let events = h.outlet.events();
        assert_eq!(events.len(), 1, "expected only the first load's items event");
        assert!(matches!(events[0], Event::Items(_)));
    }

    #[tokio::test]
    async fn test_first_load_failure_emits_one_retryable_error() {
        let h = harness(
            "first_fail",
            vec![FetchOutcome::Failed(FeedError::Status {
                status: 500,
                url: "https://example.com/feed.gz".into(),
            })],
        );

        h.finder.load().await;

        let events = h.outlet.events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            Event::Error(notice) => {
                assert_eq!(notice.title, "Data Error");
                assert_eq!(notice.action, ErrorAction::Retry);
            }
            other => panic!("expected Error, got {other:?}"),
        }
        assert!(!h.finder.has_loaded());
    }

    #[tokio::test]
    async fn test_failure_after_load_is_suppressed() {
        let h = harness(
            "later_fail",
            vec![
                FetchOutcome::Fresh(DOG_AND_DUCK.to_vec()),
                FetchOutcome::Failed(FeedError::Status {
                    status: 503,
                    url: "https://example.com/feed.gz".into(),
                }),
            ],
        );

        h.finder.load().await;
        h.finder.load().await;

        let events = h.outlet.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Event::Items(_)));
        assert!(h.finder.has_loaded());
    }

    #[tokio::test]
    async fn test_first_load_not_modified_falls_back_to_cached_payload() {
        let h = harness("nm_cached", vec![FetchOutcome::NotModified]);
        h.cache.write_payload(DOG_AND_DUCK).await.unwrap();

        h.finder.load().await;

        let events = h.outlet.events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            Event::Items(items) => assert_eq!(items[0].name, "Dog and Duck"),
            other => panic!("expected Items, got {other:?}"),
        }
        assert!(h.finder.has_loaded());
    }

    #[tokio::test]
    async fn test_first_load_not_modified_without_payload_errors() {
        let h = harness("nm_empty", vec![FetchOutcome::NotModified]);

        h.finder.load().await;

        let events = h.outlet.events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            Event::Error(notice) => assert_eq!(notice.action, ErrorAction::Retry),
            other => panic!("expected Error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_decode_failure_clears_validator() {
        let h = harness(
            "decode_fail",
            vec![FetchOutcome::Fresh(b"definitely not geojson".to_vec())],
        );
        h.cache.set_validator("stale").await.unwrap();

        h.finder.load().await;

        assert_eq!(h.cache.validator().await.unwrap(), None);
        let events = h.outlet.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Event::Error(_)));
    }

    #[tokio::test]
    async fn test_did_select_hands_off_to_search() {
        let h = harness("select", vec![]);
        let item = FinderItem {
            coordinate: GeoCoordinate {
                latitude: 54.09,
                longitude: -2.89,
            },
            name: "Dog and Duck".into(),
            postcode: "AB1 2CD".into(),
        };

        h.finder.did_select(&item);

        let events = h.outlet.events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            Event::Url(url, title) => {
                assert!(url.contains("duckduckgo.com"), "unexpected url {url}");
                assert_eq!(title, "Dog and Duck");
            }
            other => panic!("expected Url, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_location_granted_enables_tracking() {
        let h = harness("loc_granted", vec![]);
        h.location.authorization_changed(AuthorizationLevel::WhenInUse);

        h.finder.update_location();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let events = h.outlet.events();
        assert_eq!(
            *events,
            vec![
                Event::Tracking(TrackingControlUi::Hidden),
                Event::UserTracking
            ]
        );
    }

    #[tokio::test]
    async fn test_update_ui_denied_disables_control() {
        let h = harness("loc_denied", vec![]);
        h.location.authorization_changed(AuthorizationLevel::Denied);

        h.finder.update_ui();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let events = h.outlet.events();
        assert_eq!(*events, vec![Event::Tracking(TrackingControlUi::Disabled)]);
    }

    #[tokio::test]
    async fn test_update_ui_resolves_after_platform_answers() {
        let h = harness("loc_deferred", vec![]);

        h.finder.update_ui();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(h.outlet.events().is_empty());

        h.location.authorization_changed(AuthorizationLevel::NotDetermined);
        tokio::time::sleep(Duration::from_millis(20)).await;

        let events = h.outlet.events();
        assert_eq!(*events, vec![Event::Tracking(TrackingControlUi::Enabled)]);
    }
}
