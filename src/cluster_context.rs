use crate::api_client::{ApiClient, Cluster};
use crate::error::ApiError;
use crate::system::fetcher::DataFetcher;
use crate::system::navigation::NavigationController;
use tracing::info;

/// Whether setting the active cluster actually switched context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextChange {
    Unchanged,
    Switched { from: Option<i64>, to: i64 },
}

impl ContextChange {
    pub fn is_switch(&self) -> bool {
        matches!(self, ContextChange::Switched { .. })
    }

    /// Reset `navigation` if the cluster switched. Returns whether it did.
    pub fn apply_to<F: DataFetcher>(&self, navigation: &mut NavigationController<F>) -> bool {
        if self.is_switch() {
            navigation.reset_on_context_change();
        }
        self.is_switch()
    }
}

/// Tracks the cluster every introspection call runs against.
///
/// Callers must reset navigation and reload the catalog on a switch; levels
/// and stored functions are per cluster.
#[derive(Debug, Clone, Default)]
pub struct ClusterContext {
    active: Option<Cluster>,
}

impl ClusterContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&Cluster> {
        self.active.as_ref()
    }

    pub fn active_id(&self) -> Option<i64> {
        self.active.as_ref().map(|c| c.id)
    }

    pub fn label(&self) -> String {
        match &self.active {
            Some(cluster) => cluster.name.clone(),
            None => "no cluster".to_string(),
        }
    }

    pub fn set_active(&mut self, cluster: Cluster) -> ContextChange {
        let from = self.active_id();
        let to = cluster.id;
        self.active = Some(cluster);

        if from == Some(to) {
            ContextChange::Unchanged
        } else {
            info!(target: "cluster", "active cluster {:?} -> {}", from, to);
            ContextChange::Switched { from, to }
        }
    }

    /// Ask the backend which cluster is active.
    pub fn sync(&mut self, api: &ApiClient) -> Result<ContextChange, ApiError> {
        let cluster = api.active_cluster()?;
        Ok(self.set_active(cluster))
    }

    /// Activate the cluster after the current one in `clusters`, wrapping around.
    pub fn cycle(&mut self, api: &ApiClient) -> Result<ContextChange, ApiError> {
        let clusters = api.list_clusters()?;
        let next = next_cluster(&clusters, self.active_id()).ok_or(ApiError::NoActiveCluster)?;
        let activated = api.activate_cluster(next.id)?;
        Ok(self.set_active(activated))
    }
}

fn next_cluster(clusters: &[Cluster], current: Option<i64>) -> Option<&Cluster> {
    let position = current.and_then(|id| clusters.iter().position(|c| c.id == id));
    match position {
        Some(i) => clusters.get((i + 1) % clusters.len()),
        None => clusters.first(),
    }
}
