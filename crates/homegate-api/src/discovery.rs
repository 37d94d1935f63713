// Gateway discovery
//
// Resolves which address is serving the admin interface. Stored and
// configured addresses are tried one at a time; the common-address list is
// probed concurrently under a single deadline so an unreachable LAN costs one
// probe timeout, not one per candidate.

use std::collections::HashSet;
use std::sync::RwLock;
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::time::Instant;
use tracing::{debug, info};
use url::Url;

use crate::probe::{DEFAULT_PROBE_TIMEOUT, ProbeError, ProbeOutcome, Prober};

/// Private-network addresses commonly used by consumer gateways, in the order
/// they win ties.
pub const COMMON_GATEWAY_ADDRESSES: &[&str] = &[
    "http://192.168.0.1/",
    "http://192.168.1.1/",
    "http://10.0.0.1/",
    "http://10.0.1.1/",
    "http://192.168.1.254/",
    "http://192.168.2.1/",
    "http://192.168.100.1/",
    "http://172.16.0.1/",
];

/// Default overall deadline for the concurrent candidate sweep.
pub const DEFAULT_DISCOVERY_BUDGET: Duration = Duration::from_secs(3);

/// Parse [`COMMON_GATEWAY_ADDRESSES`] into URLs.
pub fn default_candidates() -> Vec<Url> {
    COMMON_GATEWAY_ADDRESSES
        .iter()
        .filter_map(|raw| Url::parse(raw).ok())
        .collect()
}

/// Resolves the gateway address.
pub struct GatewayDiscovery {
    prober: Prober,
    candidates: Vec<Url>,
    probe_timeout: Duration,
    budget: Duration,
    last_known_good: RwLock<Option<Url>>,
    last_error: RwLock<Option<ProbeError>>,
}

impl GatewayDiscovery {
    pub fn new(prober: Prober) -> Self {
        Self {
            prober,
            candidates: default_candidates(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            budget: DEFAULT_DISCOVERY_BUDGET,
            last_known_good: RwLock::new(None),
            last_error: RwLock::new(None),
        }
    }

    /// Replace the common-address list.
    pub fn with_candidates(mut self, candidates: Vec<Url>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Overall deadline for the concurrent sweep. Never shorter than one probe.
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_last_known_good(self, address: Option<Url>) -> Self {
        *self.last_known_good.write().expect("discovery lock poisoned") = address;
        self
    }

    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    pub fn prober(&self) -> &Prober {
        &self.prober
    }

    pub fn last_known_good(&self) -> Option<Url> {
        self.last_known_good
            .read()
            .expect("discovery lock poisoned")
            .clone()
    }

    /// Record an address that just answered.
    pub fn remember(&self, address: Url) {
        *self.last_known_good.write().expect("discovery lock poisoned") = Some(address);
    }

    /// Forget the known-good address (it stopped answering).
    pub fn forget(&self) {
        *self.last_known_good.write().expect("discovery lock poisoned") = None;
    }

    /// Resolve a reachable gateway address.
    ///
    /// Order: last known-good, then `configured`, then the candidate list in
    /// parallel. Addresses in `excluded` are never probed. Returns `None` when
    /// nothing answered within the budget.
    pub async fn resolve(&self, configured: &Url, excluded: &HashSet<Url>) -> Option<Url> {
        *self.last_error.write().expect("discovery lock poisoned") = None;
        let mut tried: HashSet<Url> = excluded.clone();

        if let Some(known) = self.last_known_good() {
            if tried.insert(known.clone()) && self.probe_one(&known).await {
                return Some(known);
            }
        }

        if tried.insert(configured.clone()) && self.probe_one(configured).await {
            self.remember(configured.clone());
            return Some(configured.clone());
        }

        let pending: Vec<Url> = self
            .candidates
            .iter()
            .filter(|c| !tried.contains(*c))
            .cloned()
            .collect();

        let found = self.sweep(pending).await;
        if let Some(ref address) = found {
            info!(%address, "discovered gateway");
            self.remember(address.clone());
        }
        found
    }

    /// Failure tag of the last stored or configured address that did not
    /// answer. Cleared by a successful resolve.
    pub fn last_probe_error(&self) -> Option<ProbeError> {
        *self.last_error.read().expect("discovery lock poisoned")
    }

    async fn probe_one(&self, address: &Url) -> bool {
        let outcome = self.prober.probe(address, self.probe_timeout).await;
        if let Some(error) = outcome.error {
            *self.last_error.write().expect("discovery lock poisoned") = Some(error);
        }
        outcome.reachable
    }

    /// Probe every candidate concurrently; first reachable answer wins, with
    /// list order breaking ties among answers that are ready together.
    async fn sweep(&self, candidates: Vec<Url>) -> Option<Url> {
        if candidates.is_empty() {
            return None;
        }

        debug!(count = candidates.len(), budget = ?self.budget, "sweeping candidate addresses");

        // Each probe runs as its own task so stragglers may finish after a
        // winner is picked; their results are dropped with the handles.
        let mut pending: FuturesUnordered<_> = candidates
            .into_iter()
            .enumerate()
            .map(|(index, address)| {
                let prober = self.prober.clone();
                let timeout = self.probe_timeout;
                tokio::spawn(async move { (index, prober.probe(&address, timeout).await) })
            })
            .collect();

        let deadline = Instant::now() + self.budget.max(self.probe_timeout);

        loop {
            let next = tokio::time::timeout_at(deadline, pending.next()).await;
            let (index, outcome) = match next {
                Ok(Some(Ok(result))) => result,
                Ok(Some(Err(join_err))) => {
                    debug!(error = %join_err, "probe task failed");
                    continue;
                }
                Ok(None) => return None,
                Err(_) => {
                    debug!("discovery budget exhausted");
                    return None;
                }
            };

            if outcome.reachable {
                return Some(Self::break_tie(index, outcome, &mut pending));
            }
        }
    }

    /// Among results that are already complete, prefer the earliest list entry.
    fn break_tie<S>(index: usize, outcome: ProbeOutcome, pending: &mut S) -> Url
    where
        S: futures_util::Stream<Item = Result<(usize, ProbeOutcome), tokio::task::JoinError>>
            + Unpin,
    {
        let mut best = (index, outcome.address);
        while let Some(Some(Ok((other_index, other)))) = pending.next().now_or_never() {
            if other.reachable && other_index < best.0 {
                best = (other_index, other.address);
            }
        }
        best.1
    }
}
