/*!
Concurrent device polling.

One task per switch and per BMC is spawned on a [`JoinSet`]; a [`Semaphore`] caps how many run at
once and every poll is bounded by the configured timeout. Tasks hand back their slot index with
the result and the store is written only after the join barrier, so no state is shared between
tasks.
*/

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant, SystemTime},
};

use tokio::{
    sync::Semaphore,
    task::{Id, JoinSet},
    time::timeout,
};
use tracing::{debug, error, info, warn};

use crate::{
    config::PollingConfig,
    data_aquisition::core::{RawBmcPayload, RawSwitchPayload},
    topology::{
        source::{AcquisitionError, BmcSource, SwitchSource, TopologyError},
        store::PollStore,
    },
};

#[derive(Debug, Clone, Copy)]
enum Slot {
    Switch(usize),
    Bmc(usize),
}

enum PollOutcome {
    Switch(usize, Result<RawSwitchPayload, AcquisitionError>),
    Bmc(usize, Result<RawBmcPayload, AcquisitionError>),
}

pub struct Poller {
    workers: usize,
    timeout: Duration,
}

impl Poller {
    pub fn new(config: &PollingConfig) -> Self {
        Self {
            workers: config.workers.max(1),
            timeout: config.timeout,
        }
    }

    /// Polls every device once. Devices that fail, time out or whose task panics are marked
    /// lost in the returned store.
    pub async fn poll(
        &self,
        switches: Vec<Arc<dyn SwitchSource>>,
        bmcs: Vec<Arc<dyn BmcSource>>,
    ) -> PollStore {
        let mut store = PollStore::new(
            switches.iter().map(|s| s.hostname().to_string()),
            bmcs.iter().map(|b| b.address().to_string()),
        );
        let started = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks: JoinSet<PollOutcome> = JoinSet::new();
        let mut slots: HashMap<Id, Slot> = HashMap::new();

        for (index, source) in switches.into_iter().enumerate() {
            let semaphore = semaphore.clone();
            let deadline = self.timeout;
            let handle = tasks.spawn(async move {
                let result = bounded(&semaphore, deadline, source.fetch_raw()).await;
                log_outcome("switch", source.hostname(), &result);
                PollOutcome::Switch(index, result)
            });
            slots.insert(handle.id(), Slot::Switch(index));
        }
        for (index, source) in bmcs.into_iter().enumerate() {
            let semaphore = semaphore.clone();
            let deadline = self.timeout;
            let handle = tasks.spawn(async move {
                let result = bounded(&semaphore, deadline, source.fetch_raw()).await;
                log_outcome("BMC", source.address(), &result);
                PollOutcome::Bmc(index, result)
            });
            slots.insert(handle.id(), Slot::Bmc(index));
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            let now = SystemTime::now();
            match joined {
                Ok((_, PollOutcome::Switch(index, result))) => {
                    store.record_switch(index, result.map_err(TopologyError::from), now)
                }
                Ok((_, PollOutcome::Bmc(index, result))) => {
                    store.record_bmc(index, result.map_err(TopologyError::from), now)
                }
                Err(e) => {
                    error!(error = %e, "poll task failed");
                    let failure = || TopologyError::from(AcquisitionError::Task(e.to_string()));
                    match slots.get(&e.id()) {
                        Some(Slot::Switch(index)) => store.record_switch(*index, Err(failure()), now),
                        Some(Slot::Bmc(index)) => store.record_bmc(*index, Err(failure()), now),
                        None => {}
                    }
                }
            }
        }

        info!(
            devices = store.switches().len() + store.bmcs().len(),
            connected = store.connected_count(),
            elapsed = %humantime::format_duration(round_to_millis(started.elapsed())),
            "polling finished"
        );
        store
    }
}

async fn bounded<T, F>(semaphore: &Semaphore, deadline: Duration, fetch: F) -> Result<T, AcquisitionError>
where
    F: std::future::Future<Output = Result<T, AcquisitionError>>,
{
    let _permit = semaphore
        .acquire()
        .await
        .map_err(|e| AcquisitionError::Task(e.to_string()))?;
    // the deadline covers the device, not the wait for a worker
    match timeout(deadline, fetch).await {
        Ok(result) => result,
        Err(_) => Err(AcquisitionError::Timeout(deadline)),
    }
}

fn log_outcome<T>(kind: &str, device: &str, result: &Result<T, AcquisitionError>) {
    match result {
        Ok(_) => debug!(kind, device, "poll succeeded"),
        Err(e) => warn!(kind, device, error = %e, "poll failed"),
    }
}

fn round_to_millis(duration: Duration) -> Duration {
    Duration::from_millis(duration.as_millis() as u64)
}
