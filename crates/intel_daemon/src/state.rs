use intel_core::{PlayerStore, Session, TickReport};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;

pub type SharedSession = Arc<Mutex<Session>>;
pub type SharedStore = Arc<Mutex<Box<dyn PlayerStore + Send>>>;
pub type ReportTx = broadcast::Sender<TickReport>;

/// Wall clock in epoch milliseconds. Swapped for a fixed clock in tests.
pub type Clock = fn() -> i64;

pub fn wall_clock() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Lock order is session before store.
#[derive(Clone)]
pub struct AppState {
    pub session: SharedSession,
    pub store: SharedStore,
    pub report_tx: ReportTx,
    pub clock: Clock,
    pub tick_ms: u64,
}

impl AppState {
    pub fn new(session: Session, store: Box<dyn PlayerStore + Send>, tick_ms: u64) -> Self {
        let (report_tx, _) = broadcast::channel(256);
        Self {
            session: Arc::new(Mutex::new(session)),
            store: Arc::new(Mutex::new(store)),
            report_tx,
            clock: wall_clock,
            tick_ms,
        }
    }

    pub fn now_ms(&self) -> i64 {
        (self.clock)()
    }

    /// Capture the session and write it to the store.
    pub fn save(&self) -> i64 {
        let now_ms = self.now_ms();
        let session = self.session.lock();
        let mut store = self.store.lock();
        session.save(store.as_mut(), now_ms);
        now_ms
    }
}
