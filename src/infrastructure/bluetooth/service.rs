//! Scan Session Service
//!
//! [`ScanSessionController`] runs one discovery session at a time: it asks the
//! permission gate, opens the radio, funnels radio events through a single
//! pump task into the device registry, arms the auto-stop timer and publishes
//! every state change to observers over a `watch` channel.

use crate::domain::models::{Peripheral, ScanSnapshot, ScanStatus};
use crate::domain::registry::DeviceRegistry;
use crate::domain::settings::ScanSettings;
use crate::error::ScanError;
use crate::infrastructure::bluetooth::protocol;
use crate::infrastructure::bluetooth::scanner::{DiscoveryEventSource, RadioEvent, RadioHandle};
use crate::infrastructure::permissions::PermissionGate;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Result of a `start_scan` call that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStart {
    Started,
    /// A session was already scanning or awaiting permission; nothing changed.
    AlreadyActive,
    /// `stop_scan` ran while permission was pending; the radio was not opened.
    Cancelled,
}

struct Session {
    /// Bumped on every start attempt and on teardown; tasks of older sessions compare against it.
    id: u64,
    status: ScanStatus,
    status_message: Option<String>,
    registry: DeviceRegistry,
    radio: RadioHandle,
    timeout: Option<JoinHandle<()>>,
    pump: Option<JoinHandle<()>>,
    version: u64,
}

struct Shared {
    session: Mutex<Session>,
    state_tx: watch::Sender<ScanSnapshot>,
    settings: ScanSettings,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, session: &mut Session) {
        session.version += 1;
        self.state_tx.send_replace(ScanSnapshot {
            version: session.version,
            status: session.status.clone(),
            status_message: session.status_message.clone(),
            peripherals: session.registry.snapshot(),
        });
    }

    /// Cancel the timer, stop the pump and close the radio.
    fn halt(session: &mut Session) {
        if let Some(timeout) = session.timeout.take() {
            timeout.abort();
        }
        if let Some(pump) = session.pump.take() {
            pump.abort();
        }
        session.radio.close();
    }

    fn stop(&self, session: &mut Session) {
        Self::halt(session);
        session.status = ScanStatus::Stopped;
        session.status_message = Some(protocol::STOPPED_MESSAGE.to_string());
        self.publish(session);
    }

    fn expire(&self, session_id: u64) {
        let mut session = self.lock();
        if session.id != session_id || session.status != ScanStatus::Scanning {
            return;
        }
        info!("Scan timeout reached, stopping discovery");
        self.stop(&mut session);
    }

    /// Apply one radio event. Returns false once the session no longer accepts events.
    fn apply_event(&self, session_id: u64, event: RadioEvent) -> bool {
        let mut session = self.lock();
        if session.id != session_id || session.status != ScanStatus::Scanning {
            debug!("Dropping event for inactive session {}", session_id);
            return false;
        }

        match event {
            Err(radio_error) => {
                error!("Radio error during scan: {}", radio_error);
                Self::halt(&mut session);
                session.status_message = Some(protocol::failure_message(&radio_error));
                session.status = ScanStatus::Failed(radio_error.to_string());
                self.publish(&mut session);
                false
            }
            Ok(device) => {
                let peripheral =
                    Peripheral::from_event(device, self.settings.default_transfer_size);
                let id = peripheral.id().to_string();
                let changed = if self.settings.refresh_signal_strength
                    && session.registry.contains(&id)
                {
                    session.registry.refresh(&peripheral)
                } else {
                    let inserted = session.registry.insert_if_absent(peripheral);
                    if inserted {
                        info!("Discovered device {} ({} total)", id, session.registry.len());
                    }
                    inserted
                };
                if changed {
                    self.publish(&mut session);
                }
                true
            }
        }
    }
}

async fn pump_events(
    shared: Weak<Shared>,
    session_id: u64,
    mut events: mpsc::UnboundedReceiver<RadioEvent>,
) {
    while let Some(event) = events.recv().await {
        let Some(strong) = shared.upgrade() else {
            break;
        };
        if !strong.apply_event(session_id, event) {
            break;
        }
    }
    debug!("Event pump for session {} finished", session_id);
}

async fn expire_after(shared: Weak<Shared>, session_id: u64, timeout: Duration) {
    tokio::time::sleep(timeout).await;
    if let Some(shared) = shared.upgrade() {
        shared.expire(session_id);
    }
}

/// Returns an abandoned permission wait to Idle if the `start_scan` future is
/// dropped before the gate answers.
struct PendingStart {
    shared: Weak<Shared>,
    session_id: u64,
    armed: bool,
}

impl PendingStart {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingStart {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let mut session = shared.lock();
        if session.id == self.session_id && session.status == ScanStatus::AwaitingPermission {
            warn!("Scan start abandoned while awaiting permission");
            session.status = ScanStatus::Idle;
            shared.publish(&mut session);
        }
    }
}

/// Owner of the scan session lifecycle.
///
/// Dropping the controller cancels any pending timer and closes the radio.
pub struct ScanSessionController {
    shared: Arc<Shared>,
    gate: PermissionGate,
}

impl ScanSessionController {
    pub fn new(
        radio: Arc<dyn DiscoveryEventSource>,
        gate: PermissionGate,
        settings: ScanSettings,
    ) -> Self {
        let (state_tx, _) = watch::channel(ScanSnapshot::default());
        let session = Session {
            id: 0,
            status: ScanStatus::Idle,
            status_message: None,
            registry: DeviceRegistry::new(),
            radio: RadioHandle::new(radio),
            timeout: None,
            pump: None,
            version: 0,
        };
        Self {
            shared: Arc::new(Shared {
                session: Mutex::new(session),
                state_tx,
                settings,
            }),
            gate,
        }
    }

    /// Receive every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<ScanSnapshot> {
        self.shared.state_tx.subscribe()
    }

    pub fn snapshot(&self) -> ScanSnapshot {
        self.shared.state_tx.borrow().clone()
    }

    pub fn status(&self) -> ScanStatus {
        self.shared.state_tx.borrow().status.clone()
    }

    pub fn status_message(&self) -> Option<String> {
        self.shared.state_tx.borrow().status_message.clone()
    }

    pub fn peripherals(&self) -> Vec<Peripheral> {
        self.shared.state_tx.borrow().peripherals.clone()
    }

    pub fn is_scanning(&self) -> bool {
        self.shared.state_tx.borrow().is_scanning()
    }

    /// Start a session with the configured timeout.
    pub async fn start_scan(&self) -> Result<ScanStart, ScanError> {
        self.start_scan_for(self.shared.settings.timeout()).await
    }

    /// Start a session that stops itself after `timeout`.
    ///
    /// Suspends while the permission gate waits on the user.
    pub async fn start_scan_for(&self, timeout: Duration) -> Result<ScanStart, ScanError> {
        let session_id = {
            let mut session = self.shared.lock();
            if session.status.is_active() {
                debug!("Scan already active, ignoring start request");
                return Ok(ScanStart::AlreadyActive);
            }
            session.id += 1;
            session.status = ScanStatus::AwaitingPermission;
            session.status_message = None;
            self.shared.publish(&mut session);
            session.id
        };

        let pending = PendingStart {
            shared: Arc::downgrade(&self.shared),
            session_id,
            armed: true,
        };
        let permission = self.gate.check_and_request().await;
        pending.disarm();

        let mut session = self.shared.lock();
        if session.id != session_id || session.status != ScanStatus::AwaitingPermission {
            info!("Scan start cancelled while awaiting permission");
            return Ok(ScanStart::Cancelled);
        }

        if let Err(denied) = permission {
            warn!("Scan not started: {}", denied);
            session.status = ScanStatus::Idle;
            session.status_message = Some(denied.reason.clone());
            self.shared.publish(&mut session);
            return Err(denied.into());
        }

        session.registry.clear();
        let events = match session.radio.open() {
            Ok(events) => events,
            Err(radio_error) => {
                error!("Failed to open radio: {}", radio_error);
                session.status_message = Some(protocol::failure_message(&radio_error));
                session.status = ScanStatus::Failed(radio_error.to_string());
                self.shared.publish(&mut session);
                return Err(radio_error.into());
            }
        };

        let weak = Arc::downgrade(&self.shared);
        session.pump = Some(tokio::spawn(pump_events(weak.clone(), session_id, events)));
        session.timeout = Some(tokio::spawn(expire_after(weak, session_id, timeout)));
        session.status = ScanStatus::Scanning;
        session.status_message = Some(protocol::SCANNING_MESSAGE.to_string());
        self.shared.publish(&mut session);

        info!("Scan session {} started ({:?} timeout)", session_id, timeout);
        Ok(ScanStart::Started)
    }

    /// Stop discovery. Safe in every state.
    pub fn stop_scan(&self) {
        let mut session = self.shared.lock();
        self.shared.stop(&mut session);
        info!("Scan stopped");
    }
}

impl Drop for ScanSessionController {
    fn drop(&mut self) {
        let mut session = self.shared.lock();
        session.id += 1;
        Shared::halt(&mut session);
        debug!("Scan session controller torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{AuthorizationKind, DeviceEvent};
    use crate::domain::settings::Platform;
    use crate::error::RadioError;
    use crate::infrastructure::permissions::{
        AuthorizationOutcome, PermissionPolicy, PlatformAuthorizer, StaticAuthorizer,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Radio driven by the test: events are injected with `emit`.
    #[derive(Default)]
    struct ManualRadio {
        sender: Mutex<Option<mpsc::UnboundedSender<RadioEvent>>>,
        opens: AtomicUsize,
        closes: AtomicUsize,
        /// Keep the sender after `close`, like a misbehaving driver.
        ignore_close: bool,
        open_error: Option<RadioError>,
    }

    impl ManualRadio {
        fn emit(&self, event: RadioEvent) -> bool {
            self.sender
                .lock()
                .unwrap()
                .as_ref()
                .map(|tx| tx.send(event).is_ok())
                .unwrap_or(false)
        }

        fn device(&self, id: &str, rssi: i16) -> bool {
            self.emit(Ok(DeviceEvent::new(id).with_rssi(rssi)))
        }

        fn opens(&self) -> usize {
            self.opens.load(Ordering::SeqCst)
        }

        fn closes(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }
    }

    impl DiscoveryEventSource for ManualRadio {
        fn open(&self, events: mpsc::UnboundedSender<RadioEvent>) -> Result<(), RadioError> {
            if let Some(err) = &self.open_error {
                return Err(err.clone());
            }
            self.opens.fetch_add(1, Ordering::SeqCst);
            *self.sender.lock().unwrap() = Some(events);
            Ok(())
        }

        fn close(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
            if !self.ignore_close {
                self.sender.lock().unwrap().take();
            }
        }
    }

    /// Holds every authorization request until `release` is called.
    struct GatedAuthorizer {
        release: Notify,
        outcome: AuthorizationOutcome,
    }

    impl GatedAuthorizer {
        fn new(outcome: AuthorizationOutcome) -> Self {
            Self {
                release: Notify::new(),
                outcome,
            }
        }
    }

    #[async_trait]
    impl PlatformAuthorizer for GatedAuthorizer {
        async fn request_authorization(&self, _kind: AuthorizationKind) -> AuthorizationOutcome {
            self.release.notified().await;
            self.outcome
        }
    }

    /// Grants or denies depending on a flag the test flips.
    #[derive(Default)]
    struct ToggleAuthorizer {
        grant: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl PlatformAuthorizer for ToggleAuthorizer {
        async fn request_authorization(&self, _kind: AuthorizationKind) -> AuthorizationOutcome {
            if self.grant.load(Ordering::SeqCst) {
                AuthorizationOutcome::Granted
            } else {
                AuthorizationOutcome::Denied
            }
        }
    }

    fn android_gate(authorizer: Arc<dyn PlatformAuthorizer>) -> PermissionGate {
        // Version 29 needs only the location authorization.
        PermissionGate::new(PermissionPolicy::for_platform(Platform::Android, 29), authorizer)
    }

    fn granting_controller(radio: Arc<ManualRadio>) -> ScanSessionController {
        let authorizer = Arc::new(StaticAuthorizer::new([AuthorizationKind::FineLocation]));
        ScanSessionController::new(radio, android_gate(authorizer), ScanSettings::default())
    }

    fn ids(controller: &ScanSessionController) -> Vec<String> {
        controller
            .peripherals()
            .iter()
            .map(|p| p.id().to_string())
            .collect()
    }

    /// Let spawned tasks drain; virtual time only moves once everything is idle.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_dedups_then_stops() {
        let radio = Arc::new(ManualRadio::default());
        let controller = granting_controller(radio.clone());
        assert_eq!(controller.status(), ScanStatus::Idle);
        assert_eq!(controller.status_message(), None);

        assert_eq!(controller.start_scan().await, Ok(ScanStart::Started));
        assert!(controller.is_scanning());
        assert_eq!(
            controller.status_message().as_deref(),
            Some("Scanning for devices...")
        );

        assert!(radio.device("A", -70));
        assert!(radio.device("B", -60));
        assert!(radio.device("A", -20));
        settle().await;

        assert_eq!(ids(&controller), vec!["A", "B"]);
        assert_eq!(controller.peripherals()[0].signal_strength, Some(-70));

        controller.stop_scan();
        assert_eq!(controller.status(), ScanStatus::Stopped);
        assert_eq!(controller.status_message().as_deref(), Some("Scanning stopped"));
        assert_eq!(radio.closes(), 1);
        assert_eq!(ids(&controller), vec!["A", "B"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permission_denied_keeps_radio_closed() {
        let radio = Arc::new(ManualRadio::default());
        let authorizer = Arc::new(StaticAuthorizer::new([]));
        let controller = ScanSessionController::new(
            radio.clone(),
            android_gate(authorizer),
            ScanSettings::default(),
        );

        let err = controller.start_scan().await.unwrap_err();
        assert!(matches!(
            err,
            ScanError::PermissionDenied(ref d) if d.kind == AuthorizationKind::FineLocation
        ));
        assert_eq!(controller.status(), ScanStatus::Idle);
        assert_eq!(
            controller.status_message().as_deref(),
            Some("Location permission is required to scan for BLE devices.")
        );
        assert!(controller.peripherals().is_empty());
        assert_eq!(radio.opens(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_denied_restart_keeps_previous_devices() {
        let radio = Arc::new(ManualRadio::default());
        let authorizer = Arc::new(ToggleAuthorizer::default());
        authorizer.grant.store(true, Ordering::SeqCst);
        let controller = ScanSessionController::new(
            radio.clone(),
            android_gate(authorizer.clone()),
            ScanSettings::default(),
        );

        controller.start_scan().await.unwrap();
        radio.device("A", -50);
        settle().await;
        controller.stop_scan();

        authorizer.grant.store(false, Ordering::SeqCst);
        assert!(controller.start_scan().await.is_err());
        assert_eq!(controller.status(), ScanStatus::Idle);
        assert_eq!(ids(&controller), vec!["A"]);
        assert_eq!(radio.opens(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_while_scanning_is_noop() {
        let radio = Arc::new(ManualRadio::default());
        let controller = granting_controller(radio.clone());

        controller.start_scan().await.unwrap();
        radio.device("A", -50);
        settle().await;

        assert_eq!(controller.start_scan().await, Ok(ScanStart::AlreadyActive));
        assert_eq!(ids(&controller), vec!["A"]);
        assert_eq!(radio.opens(), 1);
        assert!(controller.is_scanning());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_starts_open_once() {
        let radio = Arc::new(ManualRadio::default());
        let authorizer = Arc::new(GatedAuthorizer::new(AuthorizationOutcome::Granted));
        let controller = ScanSessionController::new(
            radio.clone(),
            android_gate(authorizer.clone()),
            ScanSettings::default(),
        );

        let (first, second, _) = tokio::join!(
            controller.start_scan(),
            controller.start_scan(),
            async {
                settle().await;
                assert_eq!(controller.status(), ScanStatus::AwaitingPermission);
                authorizer.release.notify_one();
            }
        );

        assert_eq!(first, Ok(ScanStart::Started));
        assert_eq!(second, Ok(ScanStart::AlreadyActive));
        assert_eq!(radio.opens(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_while_awaiting_permission_cancels_start() {
        let radio = Arc::new(ManualRadio::default());
        let authorizer = Arc::new(GatedAuthorizer::new(AuthorizationOutcome::Granted));
        let controller = ScanSessionController::new(
            radio.clone(),
            android_gate(authorizer.clone()),
            ScanSettings::default(),
        );

        let (started, _) = tokio::join!(controller.start_scan(), async {
            settle().await;
            controller.stop_scan();
            authorizer.release.notify_one();
        });

        assert_eq!(started, Ok(ScanStart::Cancelled));
        assert_eq!(controller.status(), ScanStatus::Stopped);
        assert_eq!(radio.opens(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_start_returns_to_idle() {
        let radio = Arc::new(ManualRadio::default());
        let authorizer = Arc::new(GatedAuthorizer::new(AuthorizationOutcome::Granted));
        let controller = ScanSessionController::new(
            radio.clone(),
            android_gate(authorizer.clone()),
            ScanSettings::default(),
        );

        let abandoned =
            tokio::time::timeout(Duration::from_secs(30), controller.start_scan()).await;
        assert!(abandoned.is_err());
        assert_eq!(controller.status(), ScanStatus::Idle);
        assert_eq!(radio.opens(), 0);

        authorizer.release.notify_one();
        assert_eq!(controller.start_scan().await, Ok(ScanStart::Started));
        assert_eq!(radio.opens(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_awaiting_permission_clears_previous_message() {
        let radio = Arc::new(ManualRadio::default());
        let authorizer = Arc::new(GatedAuthorizer::new(AuthorizationOutcome::Granted));
        let controller = ScanSessionController::new(
            radio.clone(),
            android_gate(authorizer.clone()),
            ScanSettings::default(),
        );
        controller.stop_scan();
        assert_eq!(controller.status_message().as_deref(), Some("Scanning stopped"));

        let (started, _) = tokio::join!(controller.start_scan(), async {
            settle().await;
            let pending = controller.snapshot();
            assert_eq!(pending.status, ScanStatus::AwaitingPermission);
            assert_eq!(pending.status_message, None);
            authorizer.release.notify_one();
        });

        assert_eq!(started, Ok(ScanStart::Started));
        assert_eq!(
            controller.status_message().as_deref(),
            Some("Scanning for devices...")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent_in_any_state() {
        let radio = Arc::new(ManualRadio::default());
        let controller = granting_controller(radio.clone());

        controller.stop_scan();
        controller.stop_scan();
        assert_eq!(controller.status(), ScanStatus::Stopped);

        controller.start_scan().await.unwrap();
        controller.stop_scan();
        controller.stop_scan();
        assert_eq!(controller.status(), ScanStatus::Stopped);
        assert_eq!(controller.status_message().as_deref(), Some("Scanning stopped"));
        assert_eq!(radio.opens(), 1);
        assert!(!radio.device("late", -1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_stops_after_configured_delay() {
        let radio = Arc::new(ManualRadio::default());
        let controller = granting_controller(radio.clone());

        controller.start_scan().await.unwrap();
        tokio::time::sleep(Duration::from_millis(9_999)).await;
        assert_eq!(controller.status(), ScanStatus::Scanning);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(controller.status(), ScanStatus::Stopped);
        assert_eq!(controller.status_message().as_deref(), Some("Scanning stopped"));
        assert_eq!(radio.closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_call_timeout_override() {
        let radio = Arc::new(ManualRadio::default());
        let controller = granting_controller(radio.clone());

        controller
            .start_scan_for(Duration::from_millis(500))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(501)).await;
        assert_eq!(controller.status(), ScanStatus::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_timer_does_not_stop_next_session() {
        let radio = Arc::new(ManualRadio::default());
        let controller = granting_controller(radio.clone());

        controller.start_scan().await.unwrap();
        tokio::time::sleep(Duration::from_secs(6)).await;
        controller.stop_scan();
        controller.start_scan().await.unwrap();

        // First session's deadline passes; second session keeps running.
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(controller.status(), ScanStatus::Scanning);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(controller.status(), ScanStatus::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_clears_registry() {
        let radio = Arc::new(ManualRadio::default());
        let controller = granting_controller(radio.clone());

        controller.start_scan().await.unwrap();
        radio.device("A", -50);
        settle().await;
        controller.stop_scan();

        controller.start_scan().await.unwrap();
        assert!(controller.peripherals().is_empty());
        radio.device("B", -50);
        settle().await;
        assert_eq!(ids(&controller), vec!["B"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_radio_error_fails_session_and_ignores_later_events() {
        let radio = Arc::new(ManualRadio {
            ignore_close: true,
            ..ManualRadio::default()
        });
        let controller = granting_controller(radio.clone());

        controller.start_scan().await.unwrap();
        radio.device("A", -50);
        radio.emit(Err(RadioError::RadioDisabled));
        radio.device("B", -50);
        settle().await;

        assert_eq!(
            controller.status(),
            ScanStatus::Failed("Bluetooth radio is disabled".to_string())
        );
        assert_eq!(
            controller.status_message().as_deref(),
            Some("Scanning failed: Bluetooth radio is disabled")
        );
        assert_eq!(radio.closes(), 1);

        radio.device("C", -50);
        settle().await;
        assert_eq!(ids(&controller), vec!["A"]);

        // The timer was cancelled with the session.
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(matches!(controller.status(), ScanStatus::Failed(_)));

        // A fresh start recovers.
        assert_eq!(controller.start_scan().await, Ok(ScanStart::Started));
        assert_eq!(radio.opens(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_failure_reports_failed() {
        let radio = Arc::new(ManualRadio {
            open_error: Some(RadioError::AdapterUnavailable),
            ..ManualRadio::default()
        });
        let controller = granting_controller(radio.clone());

        let err = controller.start_scan().await.unwrap_err();
        assert_eq!(err, ScanError::Radio(RadioError::AdapterUnavailable));
        assert!(matches!(controller.status(), ScanStatus::Failed(_)));
        assert!(!controller.is_scanning());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_policy_updates_signal() {
        let radio = Arc::new(ManualRadio::default());
        let authorizer = Arc::new(StaticAuthorizer::new([AuthorizationKind::FineLocation]));
        let settings = ScanSettings {
            refresh_signal_strength: true,
            ..ScanSettings::default()
        };
        let controller =
            ScanSessionController::new(radio.clone(), android_gate(authorizer), settings);

        controller.start_scan().await.unwrap();
        radio.device("A", -80);
        radio.device("B", -70);
        radio.device("A", -30);
        settle().await;

        let peripherals = controller.peripherals();
        assert_eq!(ids(&controller), vec!["A", "B"]);
        assert_eq!(peripherals[0].signal_strength, Some(-30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_observers_see_each_transition() {
        let radio = Arc::new(ManualRadio::default());
        let controller = granting_controller(radio.clone());
        let mut updates = controller.subscribe();

        controller.start_scan().await.unwrap();
        radio.device("A", -50);
        settle().await;
        controller.stop_scan();

        let latest = updates.borrow_and_update().clone();
        assert_eq!(latest.status, ScanStatus::Stopped);
        assert_eq!(latest.peripherals.len(), 1);
        // AwaitingPermission, Scanning, device A, Stopped
        assert_eq!(latest.version, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_closes_radio_and_cancels_timer() {
        let radio = Arc::new(ManualRadio::default());
        let controller = granting_controller(radio.clone());
        let updates = controller.subscribe();

        controller.start_scan().await.unwrap();
        drop(controller);
        assert_eq!(radio.closes(), 1);

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(radio.closes(), 1);
        assert_eq!(updates.borrow().status, ScanStatus::Scanning);
    }
}
