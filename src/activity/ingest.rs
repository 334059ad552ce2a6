//! Event Ingestion
//!
//! `ActivityModel` turns lifecycle events into tree mutations. Every handler
//! returns whether the event was applied, and events that cannot be applied
//! because of races with eviction or a misbehaving producer (unknown id,
//! duplicate start, second terminal event) come back as `Ingest::Ignored`.
//! Only malformed payloads are errors.

use crate::activity::actions::{self, DesktopServices, RowAction};
use crate::activity::clock::{Clock, SystemClock};
use crate::activity::filter::ActivityFilter;
use crate::activity::node::{RequestRecord, Subtree};
use crate::activity::observer::{ChangeAspect, ModelChange, ModelObserver};
use crate::activity::registry::RequestRegistry;
use crate::activity::retention::RetentionPolicy;
use crate::activity::tree::{ActivityTree, NodeId};
use crate::common::error::{AppError, EventError};
use crate::config::InspectorConfig;
use crate::events::model::{
    DownloadProgress, NetworkEvent, RequestFinished, RequestId, RequestStarted, RequestTimedOut,
    SslErrors,
};
use crate::events::source::EventReceiver;

/// Outcome of a handler that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingest {
    Applied,
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// A start arrived while ingestion was paused
    Paused,
    DuplicateStart,
    /// Never seen, or already evicted
    UnknownRequest,
    AlreadyTerminal,
}

/// Counts from one `pump` call
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PumpSummary {
    pub applied: usize,
    pub ignored: usize,
    pub rejected: usize,
}

pub struct ActivityModel<C: Clock = SystemClock> {
    tree: ActivityTree,
    registry: RequestRegistry,
    retention: RetentionPolicy,
    filter: ActivityFilter,
    paused: bool,
    clock: C,
}

impl Default for ActivityModel<SystemClock> {
    fn default() -> Self {
        Self::new(RetentionPolicy::default())
    }
}

impl ActivityModel<SystemClock> {
    pub fn new(retention: RetentionPolicy) -> Self {
        Self::with_clock(retention, SystemClock)
    }

    pub fn from_config(config: &InspectorConfig) -> Self {
        let mut model = Self::new(RetentionPolicy::from_config(config));
        model.paused = config.start_paused;
        model.filter.show_successful = config.show_successful;
        model.filter.show_timeouts = config.show_timeouts;
        model
    }
}

impl<C: Clock> ActivityModel<C> {
    pub fn with_clock(retention: RetentionPolicy, clock: C) -> Self {
        Self {
            tree: ActivityTree::new(),
            registry: RequestRegistry::new(),
            retention,
            filter: ActivityFilter::default(),
            paused: false,
            clock,
        }
    }

    pub fn subscribe(&mut self, observer: impl ModelObserver + 'static) {
        self.tree.subscribe(observer);
    }

    // ==================== Handlers ====================

    pub fn on_request_started(&mut self, started: &RequestStarted) -> Result<Ingest, EventError> {
        if self.paused {
            return Ok(Ingest::Ignored(IgnoreReason::Paused));
        }
        let url = started.validate()?;
        if self.registry.contains(&started.id) {
            log::debug!("[Activity] Duplicate start for request {}", started.id);
            return Ok(Ingest::Ignored(IgnoreReason::DuplicateStart));
        }

        let record = RequestRecord::from_started(started, url, self.clock.now());
        let (node, _) = self.tree.insert_request(Subtree::request(record, started));
        self.registry.register(started.id.clone(), node);
        self.retention.enforce(&mut self.tree, &mut self.registry);
        Ok(Ingest::Applied)
    }

    pub fn on_progress(&mut self, progress: &DownloadProgress) -> Result<Ingest, EventError> {
        progress.validate()?;
        let node = match self.pending_node(&progress.id) {
            Ok(node) => node,
            Err(reason) => return Ok(Ingest::Ignored(reason)),
        };
        if let Some(record) = self.tree.record_mut(node) {
            record.set_progress(progress.received, progress.total);
        }
        self.tree.notify_data_changed(node, ChangeAspect::Tooltip);
        Ok(Ingest::Applied)
    }

    pub fn on_finished(&mut self, finished: &RequestFinished) -> Result<Ingest, EventError> {
        finished.validate()?;
        let node = match self.pending_node(&finished.id) {
            Ok(node) => node,
            Err(reason) => return Ok(Ingest::Ignored(reason)),
        };
        let now = self.clock.now();
        if let Some(record) = self.tree.record_mut(node) {
            record.apply_finished(finished, now);
        }
        self.tree.augment(node, Subtree::reply(finished));
        Ok(Ingest::Applied)
    }

    pub fn on_timed_out(&mut self, timed_out: &RequestTimedOut) -> Result<Ingest, EventError> {
        if timed_out.id.is_empty() {
            return Err(EventError::MissingId);
        }
        let node = match self.pending_node(&timed_out.id) {
            Ok(node) => node,
            Err(reason) => return Ok(Ingest::Ignored(reason)),
        };
        if let Some(record) = self.tree.record_mut(node) {
            record.set_timed_out();
        }
        self.tree.notify_data_changed(node, ChangeAspect::All);
        Ok(Ingest::Applied)
    }

    pub fn on_ssl_errors(&mut self, ssl: &SslErrors) -> Result<Ingest, EventError> {
        ssl.validate()?;
        let node = match self.pending_node(&ssl.id) {
            Ok(node) => node,
            Err(reason) => return Ok(Ingest::Ignored(reason)),
        };
        if let Some(record) = self.tree.record_mut(node) {
            record.ssl_errors = true;
        }
        self.tree.augment(node, Subtree::ssl_errors(&ssl.errors));
        Ok(Ingest::Applied)
    }

    pub fn dispatch(&mut self, event: &NetworkEvent) -> Result<Ingest, EventError> {
        match event {
            NetworkEvent::Started(e) => self.on_request_started(e),
            NetworkEvent::Progress(e) => self.on_progress(e),
            NetworkEvent::Finished(e) => self.on_finished(e),
            NetworkEvent::TimedOut(e) => self.on_timed_out(e),
            NetworkEvent::SslErrors(e) => self.on_ssl_errors(e),
        }
    }

    /// Apply everything queued on `events` so far.
    ///
    /// Malformed events are logged and counted, the rest of the queue is
    /// still applied.
    pub fn pump(&mut self, events: &EventReceiver) -> PumpSummary {
        let mut summary = PumpSummary::default();
        for event in events.drain() {
            match self.dispatch(&event) {
                Ok(Ingest::Applied) => summary.applied += 1,
                Ok(Ingest::Ignored(_)) => summary.ignored += 1,
                Err(e) => {
                    log::warn!("[Activity] Rejected event: {}", e);
                    summary.rejected += 1;
                }
            }
        }
        summary
    }

    /// Node of a registered request that can still take lifecycle events
    fn pending_node(&self, id: &RequestId) -> Result<NodeId, IgnoreReason> {
        let node = self
            .registry
            .lookup(id)
            .ok_or(IgnoreReason::UnknownRequest)?;
        match self.tree.record(node) {
            Some(record) if record.status.is_terminal() => Err(IgnoreReason::AlreadyTerminal),
            Some(_) => Ok(node),
            None => Err(IgnoreReason::UnknownRequest),
        }
    }

    // ==================== User Operations ====================

    /// Drop every request, regardless of pause.
    pub fn clear(&mut self) {
        log::info!("[Activity] Clearing {} requests", self.tree.len());
        self.registry.clear();
        self.tree.clear();
    }

    /// Skip new starts while paused; other events keep flowing.
    pub fn pause(&mut self, paused: bool) {
        if self.paused != paused {
            log::info!(
                "[Activity] Ingestion {}",
                if paused { "paused" } else { "resumed" }
            );
        }
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_filter_substring(&mut self, substring: &str) {
        self.filter.set_substring(substring);
        self.tree.emit(ModelChange::FilterChanged);
    }

    pub fn set_show_successful(&mut self, show: bool) {
        self.filter.show_successful = show;
        self.tree.emit(ModelChange::FilterChanged);
    }

    pub fn set_show_timeouts(&mut self, show: bool) {
        self.filter.show_timeouts = show;
        self.tree.emit(ModelChange::FilterChanged);
    }

    pub fn perform_action(
        &self,
        node: NodeId,
        action: RowAction,
        desktop: &mut dyn DesktopServices,
    ) -> Result<(), AppError> {
        let record = self
            .tree
            .record(node)
            .ok_or_else(|| AppError::Desktop(format!("No request row for {:?}", node)))?;
        actions::perform(action, record, desktop)
    }

    // ==================== Accessors ====================

    pub fn tree(&self) -> &ActivityTree {
        &self.tree
    }

    pub fn registry(&self) -> &RequestRegistry {
        &self.registry
    }

    pub fn retention(&self) -> &RetentionPolicy {
        &self.retention
    }

    pub fn filter(&self) -> &ActivityFilter {
        &self.filter
    }

    pub fn visible_rows(&self) -> Vec<NodeId> {
        self.filter.visible_rows(&self.tree)
    }

    pub fn record(&self, id: &RequestId) -> Option<&RequestRecord> {
        self.registry
            .lookup(id)
            .and_then(|node| self.tree.record(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::clock::ManualClock;
    use crate::activity::node::{NodeKind, RequestStatus};
    use crate::activity::observer::ChangeLog;
    use crate::events::model::{Header, HttpMethod, NetworkError};
    use crate::events::source::channel;
    use chrono::TimeZone;

    fn clock() -> ManualClock {
        ManualClock::new(chrono::Utc.timestamp_millis_opt(1_700_000_000_000).unwrap())
    }

    fn model() -> ActivityModel<ManualClock> {
        ActivityModel::with_clock(RetentionPolicy::default(), clock())
    }

    fn start(id: u64, url: &str) -> RequestStarted {
        RequestStarted::new(id, url, HttpMethod::Get)
    }

    fn replies(model: &ActivityModel<ManualClock>, id: u64) -> usize {
        let node = model.registry().lookup(&RequestId::from(id)).unwrap();
        model
            .tree()
            .count_children(node, |kind| matches!(kind, NodeKind::Reply))
    }

    fn status(model: &ActivityModel<ManualClock>, id: u64) -> Option<RequestStatus> {
        model.record(&RequestId::from(id)).map(|r| r.status)
    }

    #[test]
    fn test_start_then_finish_completes() {
        let clock = clock();
        let mut model = ActivityModel::with_clock(RetentionPolicy::default(), clock.clone());

        let applied = model.on_request_started(&start(1, "http://a.test/x")).unwrap();
        assert_eq!(applied, Ingest::Applied);
        assert_eq!(model.tree().len(), 1);
        assert_eq!(status(&model, 1), Some(RequestStatus::Pending));

        clock.advance_ms(120);
        model.on_finished(&RequestFinished::ok(1u64, 200)).unwrap();
        let record = model.record(&RequestId::from(1u64)).unwrap();
        assert_eq!(record.status, RequestStatus::Complete);
        assert_eq!(record.http_status, Some(200));
        assert_eq!(record.elapsed_ms, Some(120));
        assert_eq!(replies(&model, 1), 1);
    }

    #[test]
    fn test_timeout_produces_no_reply() {
        let mut model = model();
        let post = RequestStarted::new(2u64, "http://a.test/y", HttpMethod::Post).with_body("a=1");
        model.on_request_started(&post).unwrap();
        model
            .on_timed_out(&RequestTimedOut {
                id: RequestId::from(2u64),
            })
            .unwrap();

        assert_eq!(status(&model, 2), Some(RequestStatus::Timeout));
        assert_eq!(replies(&model, 2), 0);
        assert_eq!(model.record(&RequestId::from(2u64)).unwrap().elapsed_ms, None);
    }

    #[test]
    fn test_retention_over_sixty_starts() {
        let mut model = model();
        for id in 1..=55u64 {
            model.on_request_started(&start(id, "http://a.test/")).unwrap();
            assert!(model.tree().len() <= 54);
        }
        assert_eq!(model.tree().len(), 45);

        for id in 56..=60u64 {
            model.on_request_started(&start(id, "http://a.test/")).unwrap();
        }
        assert_eq!(model.tree().len(), 50);
        assert_eq!(model.registry().len(), 50);
        for id in 1..=10u64 {
            assert!(model.record(&RequestId::from(id)).is_none());
            let late = model.on_finished(&RequestFinished::ok(id, 200)).unwrap();
            assert_eq!(late, Ingest::Ignored(IgnoreReason::UnknownRequest));
        }
        assert!(model.record(&RequestId::from(11u64)).is_some());
    }

    #[test]
    fn test_duplicate_finish_is_a_no_op() {
        let mut model = model();
        model.on_request_started(&start(3, "http://a.test/z")).unwrap();
        model.on_finished(&RequestFinished::ok(3u64, 200)).unwrap();
        let before = model.record(&RequestId::from(3u64)).cloned();
        let nodes = model.tree().node_count();

        let second = model
            .on_finished(&RequestFinished::failed(3u64, NetworkError::Timeout, "late"))
            .unwrap();
        assert_eq!(second, Ingest::Ignored(IgnoreReason::AlreadyTerminal));
        assert_eq!(model.record(&RequestId::from(3u64)).cloned(), before);
        assert_eq!(model.tree().node_count(), nodes);
    }

    #[test]
    fn test_status_never_leaves_terminal() {
        let mut model = model();
        model.on_request_started(&start(4, "http://a.test/")).unwrap();
        model.on_finished(&RequestFinished::ok(4u64, 204)).unwrap();

        let timeout = RequestTimedOut {
            id: RequestId::from(4u64),
        };
        assert_eq!(
            model.on_timed_out(&timeout).unwrap(),
            Ingest::Ignored(IgnoreReason::AlreadyTerminal)
        );
        let progress = DownloadProgress {
            id: RequestId::from(4u64),
            received: 1,
            total: 2,
        };
        assert_eq!(
            model.on_progress(&progress).unwrap(),
            Ingest::Ignored(IgnoreReason::AlreadyTerminal)
        );
        assert_eq!(status(&model, 4), Some(RequestStatus::Complete));
        assert_eq!(replies(&model, 4), 1);
    }

    #[test]
    fn test_reply_presence_matches_status() {
        let mut model = model();
        for id in 1..=4u64 {
            model.on_request_started(&start(id, "http://a.test/")).unwrap();
        }
        model.on_finished(&RequestFinished::ok(1u64, 200)).unwrap();
        model
            .on_finished(&RequestFinished::failed(
                2u64,
                NetworkError::ConnectionRefused,
                "refused",
            ))
            .unwrap();
        model
            .on_finished(&RequestFinished::failed(
                3u64,
                NetworkError::OperationCanceled,
                "canceled",
            ))
            .unwrap();
        model
            .on_timed_out(&RequestTimedOut {
                id: RequestId::from(4u64),
            })
            .unwrap();

        for id in 1..=4u64 {
            let record_status = status(&model, id).unwrap();
            let expected = usize::from(record_status.has_reply());
            assert_eq!(replies(&model, id), expected, "request {}", id);
        }
        assert_eq!(status(&model, 2), Some(RequestStatus::Error));
        assert_eq!(status(&model, 3), Some(RequestStatus::Canceled));
    }

    #[test]
    fn test_progress_only_touches_tooltip() {
        let mut model = model();
        model.on_request_started(&start(5, "http://a.test/big")).unwrap();
        let log = ChangeLog::new();
        model.subscribe(log.clone());

        let progress = DownloadProgress {
            id: RequestId::from(5u64),
            received: 10,
            total: 100,
        };
        model.on_progress(&progress).unwrap();
        model.on_progress(&progress).unwrap();

        let changes = log.take();
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(|c| !c.is_structural()
            && matches!(
                c,
                ModelChange::DataChanged {
                    aspect: ChangeAspect::Tooltip,
                    ..
                }
            )));
        let record = model.record(&RequestId::from(5u64)).unwrap();
        assert_eq!(record.progress, Some((10, 100)));
        assert_eq!(record.progress_events, 2);
    }

    #[test]
    fn test_ssl_errors_keep_status() {
        let mut model = model();
        model.on_request_started(&start(6, "https://a.test/")).unwrap();
        let ssl = SslErrors {
            id: RequestId::from(6u64),
            errors: vec!["The certificate has expired".into(), "Host mismatch".into()],
        };
        model.on_ssl_errors(&ssl).unwrap();

        let record = model.record(&RequestId::from(6u64)).unwrap();
        assert!(record.ssl_errors);
        assert_eq!(record.status, RequestStatus::Pending);
        let node = model.registry().lookup(&RequestId::from(6u64)).unwrap();
        let group = *model.tree().children(node).last().unwrap();
        assert_eq!(model.tree().children(group).len(), 2);
    }

    #[test]
    fn test_duplicate_start_ignored() {
        let mut model = model();
        model.on_request_started(&start(7, "http://a.test/one")).unwrap();
        let again = model.on_request_started(&start(7, "http://a.test/two")).unwrap();
        assert_eq!(again, Ingest::Ignored(IgnoreReason::DuplicateStart));
        assert_eq!(model.tree().len(), 1);
        assert_eq!(
            model.record(&RequestId::from(7u64)).unwrap().url.as_str(),
            "http://a.test/one"
        );
    }

    #[test]
    fn test_unknown_ids_are_ignored() {
        let mut model = model();
        model.on_request_started(&start(1, "http://a.test/")).unwrap();
        let nodes = model.tree().node_count();
        let log = ChangeLog::new();
        model.subscribe(log.clone());

        let timeout = RequestTimedOut {
            id: RequestId::from(99u64),
        };
        assert_eq!(
            model.on_timed_out(&timeout).unwrap(),
            Ingest::Ignored(IgnoreReason::UnknownRequest)
        );
        let progress = DownloadProgress {
            id: RequestId::from(99u64),
            received: 10,
            total: 100,
        };
        assert_eq!(
            model.on_progress(&progress).unwrap(),
            Ingest::Ignored(IgnoreReason::UnknownRequest)
        );
        let ssl = SslErrors {
            id: RequestId::from(99u64),
            errors: vec!["The certificate has expired".into()],
        };
        assert_eq!(
            model.on_ssl_errors(&ssl).unwrap(),
            Ingest::Ignored(IgnoreReason::UnknownRequest)
        );

        assert_eq!(model.tree().len(), 1);
        assert_eq!(model.tree().node_count(), nodes);
        assert!(log.is_empty());
        let record = model.record(&RequestId::from(1u64)).unwrap();
        assert_eq!(record.progress, None);
        assert!(!record.ssl_errors);
    }

    #[test]
    fn test_progress_past_total_is_recorded() {
        let mut model = model();
        model.on_request_started(&start(1, "http://a.test/gz")).unwrap();
        let progress = DownloadProgress {
            id: RequestId::from(1u64),
            received: 120,
            total: 100,
        };
        assert_eq!(model.on_progress(&progress).unwrap(), Ingest::Applied);

        let record = model.record(&RequestId::from(1u64)).unwrap();
        assert_eq!(record.progress, Some((120, 100)));
        assert_eq!(record.progress_events, 1);
        let node = model.registry().lookup(&RequestId::from(1u64)).unwrap();
        assert!(model.tree().tooltip(node).contains(" - unknown bytes - "));
    }

    #[test]
    fn test_malformed_payloads_are_rejected() {
        let mut model = model();
        let no_url = start(8, "");
        assert_eq!(
            model.on_request_started(&no_url),
            Err(EventError::MissingUrl("8".into()))
        );
        let mut no_method = start(8, "http://a.test/");
        no_method.method = HttpMethod::Custom(String::new());
        assert!(model.on_request_started(&no_method).is_err());
        assert!(model.tree().is_empty());

        model.on_request_started(&start(8, "http://a.test/")).unwrap();
        let negative = DownloadProgress {
            id: RequestId::from(8u64),
            received: -1,
            total: 10,
        };
        assert!(matches!(
            model.on_progress(&negative),
            Err(EventError::InvalidProgress { .. })
        ));
        let empty = SslErrors {
            id: RequestId::from(8u64),
            errors: Vec::new(),
        };
        assert_eq!(
            model.on_ssl_errors(&empty),
            Err(EventError::EmptySslErrors("8".into()))
        );
    }

    #[test]
    fn test_pause_gates_only_new_starts() {
        let mut model = model();
        model.on_request_started(&start(1, "http://a.test/")).unwrap();
        model.pause(true);

        assert_eq!(
            model.on_request_started(&start(2, "http://a.test/")).unwrap(),
            Ingest::Ignored(IgnoreReason::Paused)
        );
        assert_eq!(
            model.on_finished(&RequestFinished::ok(1u64, 200)).unwrap(),
            Ingest::Applied
        );
        assert_eq!(model.tree().len(), 1);

        model.clear();
        assert!(model.tree().is_empty());
        assert!(model.registry().is_empty());
        assert!(model.is_paused());

        model.pause(false);
        model.on_request_started(&start(2, "http://a.test/")).unwrap();
        assert_eq!(model.tree().len(), 1);
    }

    #[test]
    fn test_clear_then_late_events_are_ignored() {
        let mut model = model();
        model.on_request_started(&start(1, "http://a.test/")).unwrap();
        let log = ChangeLog::new();
        model.subscribe(log.clone());

        model.clear();
        assert_eq!(log.take(), vec![ModelChange::Reset]);
        assert_eq!(
            model.on_finished(&RequestFinished::ok(1u64, 200)).unwrap(),
            Ingest::Ignored(IgnoreReason::UnknownRequest)
        );
        assert!(log.is_empty());
    }

    #[test]
    fn test_filter_setters_notify_and_project() {
        let mut model = model();
        model.on_request_started(&start(1, "http://y.test/page")).unwrap();
        model.on_request_started(&start(2, "http://x.test/page")).unwrap();
        model.on_request_started(&start(3, "http://y.test/slow")).unwrap();
        model.on_finished(&RequestFinished::ok(1u64, 200)).unwrap();
        let log = ChangeLog::new();
        model.subscribe(log.clone());

        model.set_filter_substring("y.test");
        model.set_show_successful(false);
        assert_eq!(log.take(), vec![ModelChange::FilterChanged; 2]);

        let visible = model.visible_rows();
        assert_eq!(visible.len(), 1);
        assert_eq!(
            model.tree().record(visible[0]).unwrap().id,
            RequestId::from(3u64)
        );

        model.set_show_timeouts(false);
        model
            .on_timed_out(&RequestTimedOut {
                id: RequestId::from(3u64),
            })
            .unwrap();
        assert!(model.visible_rows().is_empty());
        assert_eq!(model.tree().len(), 3);
    }

    #[test]
    fn test_pump_drains_channel() {
        let mut model = model();
        let (tx, rx) = channel();
        let mut finished = RequestFinished::ok(1u64, 200);
        finished
            .headers
            .push(Header::new("Content-Type", "application/json"));

        tx.send(NetworkEvent::Started(start(1, "http://a.test/")));
        tx.send(NetworkEvent::Finished(finished));
        tx.send(NetworkEvent::Finished(RequestFinished::ok(1u64, 200)));
        tx.send(NetworkEvent::Started(start(2, "")));

        let summary = model.pump(&rx);
        assert_eq!(
            summary,
            PumpSummary {
                applied: 2,
                ignored: 1,
                rejected: 1,
            }
        );
        assert_eq!(
            model.record(&RequestId::from(1u64)).unwrap().content_type,
            "application/json"
        );
        assert_eq!(model.pump(&rx), PumpSummary::default());
    }

    #[test]
    fn test_from_config_applies_toggles() {
        let config = InspectorConfig {
            max_retained: 2,
            burst_allowance_percent: 0,
            start_paused: true,
            show_timeouts: false,
            ..Default::default()
        };
        let model = ActivityModel::from_config(&config);
        assert!(model.is_paused());
        assert!(!model.filter().show_timeouts);
        assert_eq!(model.retention().max_retained, 2);
    }
}
