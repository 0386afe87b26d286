use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};

use crate::constants::{
    EARLY_PROBE_DELAY_MS, PROBE_GRACE_MS, STEADY_PROBE_DELAY_MS, STEADY_PROBE_INTERVAL_MS,
};
use crate::core::domain::MemoryPeak;
use crate::core::traits::probe::MemoryProbe;

#[derive(Clone, Copy, Debug)]
pub struct SamplingCadence {
    /// First probe, to catch processes that exit almost immediately.
    pub early_delay: Duration,
    /// When the steady probes start.
    pub steady_delay: Duration,
    pub steady_interval: Duration,
    /// How long in-flight probes may still land after the process exited.
    pub grace: Duration,
}

impl Default for SamplingCadence {
    fn default() -> Self {
        Self {
            early_delay: Duration::from_millis(EARLY_PROBE_DELAY_MS),
            steady_delay: Duration::from_millis(STEADY_PROBE_DELAY_MS),
            steady_interval: Duration::from_millis(STEADY_PROBE_INTERVAL_MS),
            grace: Duration::from_millis(PROBE_GRACE_MS),
        }
    }
}

#[derive(Clone, Debug)]
pub struct MemorySampler {
    probe: Arc<dyn MemoryProbe>,
    cadence: SamplingCadence,
}

impl MemorySampler {
    pub fn new(probe: Arc<dyn MemoryProbe>) -> Self {
        Self {
            probe,
            cadence: SamplingCadence::default(),
        }
    }

    pub fn cadence(mut self, cadence: SamplingCadence) -> Self {
        self.cadence = cadence;
        self
    }

    /// Starts probing `pid` in the background. Every call gets its own peak.
    #[tracing::instrument(skip(self))]
    pub fn start(&self, pid: u32) -> SamplingSession {
        let tracker = Arc::new(PeakTracker::default());
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        let (stop_tx, stop_rx) = oneshot::channel();

        let task = tokio::spawn(sample_until_stopped(
            pid,
            self.probe.clone(),
            self.cadence,
            tracker.clone(),
            trigger_rx,
            stop_rx,
        ));

        SamplingSession {
            tracker,
            trigger_tx,
            stop_tx,
            task,
        }
    }
}

#[derive(Debug)]
pub struct SamplingSession {
    tracker: Arc<PeakTracker>,
    trigger_tx: mpsc::Sender<()>,
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SamplingSession {
    /// Requests an extra probe. Requests that arrive while one is already
    /// queued are merged into it.
    pub fn poke(&self) {
        let _ = self.trigger_tx.try_send(());
    }

    /// Largest sample observed so far.
    pub fn peak(&self) -> Option<f64> {
        self.tracker.peak()
    }

    /// Stops probing and returns the final peak, substituting the fallback
    /// value when no probe ever succeeded.
    pub async fn finish(self) -> MemoryPeak {
        let _ = self.stop_tx.send(());
        if let Err(e) = self.task.await {
            tracing::warn!("Memory sampling task failed: {}", e);
        }
        self.tracker.close();

        match self.tracker.peak() {
            Some(mb) => MemoryPeak::measured(mb),
            None => {
                tracing::warn!("No memory sample landed, reporting the fallback value");
                MemoryPeak::fallback()
            }
        }
    }
}

#[derive(Debug, Default)]
struct PeakTracker {
    state: Mutex<PeakState>,
}

#[derive(Debug, Default)]
struct PeakState {
    peak: Option<f64>,
    closed: bool,
}

impl PeakTracker {
    fn record(&self, mb: f64) {
        if !(mb > 0.0) {
            return;
        }
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if state.closed {
            return;
        }
        state.peak = Some(state.peak.map_or(mb, |peak| peak.max(mb)));
    }

    fn peak(&self) -> Option<f64> {
        self.state.lock().ok().and_then(|state| state.peak)
    }

    fn close(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.closed = true;
        }
    }
}

async fn sample_until_stopped(
    pid: u32,
    probe: Arc<dyn MemoryProbe>,
    cadence: SamplingCadence,
    tracker: Arc<PeakTracker>,
    mut trigger_rx: mpsc::Receiver<()>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut in_flight = JoinSet::new();
    let spawn_probe = |in_flight: &mut JoinSet<()>| {
        let probe = probe.clone();
        let tracker = tracker.clone();
        in_flight.spawn(async move {
            if let Some(mb) = probe.sample(pid).await {
                tracker.record(mb);
            }
        });
    };

    let early = tokio::time::sleep(cadence.early_delay);
    tokio::pin!(early);
    let mut early_fired = false;

    let mut ticker =
        tokio::time::interval_at(Instant::now() + cadence.steady_delay, cadence.steady_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            _ = &mut early, if !early_fired => {
                early_fired = true;
                spawn_probe(&mut in_flight);
            }
            _ = ticker.tick() => spawn_probe(&mut in_flight),
            Some(()) = trigger_rx.recv() => spawn_probe(&mut in_flight),
            Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
        }
    }

    let drained = tokio::time::timeout(cadence.grace, async {
        while in_flight.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        tracing::debug!("Dropping {} memory probes still in flight", in_flight.len());
        in_flight.abort_all();
    }
}
