//! Region hierarchy navigator
//!
//! Owns the region tree and drives lazy expansion against the data source.
//! The tree lock is only held for state transitions, never across a fetch,
//! so sibling expansions may be outstanding at the same time. Each fetch
//! result is applied through its ticket and therefore only to its own node.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::application::services::reconciliation::{ReconciliationService, SubdistrictView};
use crate::application::{ApplicationError, ApplicationResult, SourceResultExt};
use crate::domain::{
    Applied, DistrictDetail, DomainError, FetchState, FetchTicket, RegionLevel, RegionSummary,
    RegionTree, Toggle, TreeRow,
};
use crate::infrastructure::traits::{RegionSource, SourceError};

/// Result of an expand or toggle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandOutcome {
    Collapsed,
    /// Expanded from cached children, no fetch issued
    Cached { children: usize },
    /// Children fetched; `visible` is false when the node was collapsed meanwhile
    Fetched { children: usize, visible: bool },
    /// A fetch for this node is already in flight
    InFlight,
    /// Sub-districts cannot be expanded
    Leaf,
    /// The node was invalidated while fetching; result dropped
    Discarded,
}

/// Result of a root load request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootLoad {
    /// Provinces are in the tree, loaded now or earlier
    Loaded { provinces: usize },
    /// Another load is in flight; nothing fetched
    InFlight,
}

/// Read-only view of the cached tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeSnapshot {
    pub root: FetchState,
    /// Pre-order rows of every cached node
    pub rows: Vec<TreeRow>,
}

impl TreeSnapshot {
    /// Rows below collapsed nodes removed.
    pub fn visible_rows(&self) -> Vec<&TreeRow> {
        let mut hidden_below: Option<usize> = None;
        self.rows
            .iter()
            .filter(|row| {
                if let Some(depth) = hidden_below {
                    if row.depth > depth {
                        return false;
                    }
                    hidden_below = None;
                }
                if !row.expanded {
                    hidden_below = Some(row.depth);
                }
                true
            })
            .collect()
    }
}

/// Outcome of a selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "level", rename_all = "snake_case")]
pub enum Selection {
    Province {
        node: TreeRow,
    },
    District {
        node: TreeRow,
        detail: DistrictDetail,
    },
    Subdistrict {
        node: TreeRow,
        #[serde(flatten)]
        view: SubdistrictView,
    },
}

impl Selection {
    pub fn node(&self) -> &TreeRow {
        match self {
            Selection::Province { node }
            | Selection::District { node, .. }
            | Selection::Subdistrict { node, .. } => node,
        }
    }
}

pub struct NavigatorService {
    tree: Mutex<RegionTree>,
    source: Arc<dyn RegionSource>,
    reconciliation: ReconciliationService,
    reload_retry_delay: Duration,
}

impl NavigatorService {
    pub fn new(
        source: Arc<dyn RegionSource>,
        reconciliation: ReconciliationService,
        reload_retry_delay: Duration,
    ) -> Self {
        Self {
            tree: Mutex::new(RegionTree::new()),
            source,
            reconciliation,
            reload_retry_delay,
        }
    }

    pub fn reconciliation(&self) -> &ReconciliationService {
        &self.reconciliation
    }

    /// Fetch all provinces in one call; all-or-nothing.
    ///
    /// A second call while a load is outstanding returns [`RootLoad::InFlight`].
    #[instrument(level = "debug", skip(self))]
    pub async fn load_root(&self) -> ApplicationResult<RootLoad> {
        {
            let mut tree = self.tree.lock().await;
            if tree.is_loaded() {
                return Ok(RootLoad::Loaded {
                    provinces: tree.roots().len(),
                });
            }
            if !tree.begin_root_fetch() {
                debug!("load_root: already in flight");
                return Ok(RootLoad::InFlight);
            }
        }

        let fetched = self
            .source
            .list_provinces()
            .await
            .with_source_context("list provinces", "root");

        let mut tree = self.tree.lock().await;
        let provinces = match fetched {
            Ok(provinces) if provinces.is_empty() => {
                tree.fail_root_fetch();
                warn!("load_root: empty province list");
                return Err(ApplicationError::DataUnavailable {
                    context: "list provinces: root".into(),
                    source: SourceError::Empty("province list".into()),
                });
            }
            Ok(provinces) => provinces,
            Err(e) => {
                tree.fail_root_fetch();
                warn!("load_root: {}", e);
                return Err(e);
            }
        };
        let count = tree.set_roots(provinces)?;
        info!("Loaded {} provinces", count);
        Ok(RootLoad::Loaded { provinces: count })
    }

    /// User-initiated root load with one retry on `DataUnavailable`.
    pub async fn reload_root(&self) -> ApplicationResult<RootLoad> {
        match self.load_root().await {
            Err(e) if e.is_data_unavailable() => {
                warn!(
                    "reload_root: {}, retrying in {:?}",
                    e, self.reload_retry_delay
                );
                tokio::time::sleep(self.reload_retry_delay).await;
                self.load_root().await
            }
            other => other,
        }
    }

    /// Collapse an expanded node, expand a collapsed one.
    #[instrument(level = "debug", skip(self))]
    pub async fn toggle_expand(&self, code: &str) -> ApplicationResult<ExpandOutcome> {
        let toggle = self.tree.lock().await.toggle(code)?;
        self.settle(code, toggle).await
    }

    /// Ensure a node is expanded; an expanded node without children fetches again.
    #[instrument(level = "debug", skip(self))]
    pub async fn expand(&self, code: &str) -> ApplicationResult<ExpandOutcome> {
        let toggle = self.tree.lock().await.expand(code)?;
        self.settle(code, toggle).await
    }

    async fn settle(&self, code: &str, toggle: Toggle) -> ApplicationResult<ExpandOutcome> {
        match toggle {
            Toggle::Collapsed => Ok(ExpandOutcome::Collapsed),
            Toggle::Leaf => Ok(ExpandOutcome::Leaf),
            Toggle::AlreadyFetching => Ok(ExpandOutcome::InFlight),
            Toggle::Expanded => {
                let tree = self.tree.lock().await;
                let children = tree
                    .find(code)
                    .and_then(|idx| tree.get_node(idx))
                    .map(|node| node.children.len())
                    .unwrap_or(0);
                Ok(ExpandOutcome::Cached { children })
            }
            Toggle::NeedsFetch(ticket) => self.fetch_children(ticket).await,
        }
    }

    async fn fetch_children(&self, ticket: FetchTicket) -> ApplicationResult<ExpandOutcome> {
        debug!("fetch_children: {} ({})", ticket.code, ticket.level);
        let fetched = self.list_children(&ticket).await;

        let mut tree = self.tree.lock().await;
        let children = match fetched {
            Ok(children) => children,
            Err(e) => {
                if !tree.fail_fetch(&ticket) {
                    return Ok(ExpandOutcome::Discarded);
                }
                warn!("fetch_children: {}", e);
                return Err(e);
            }
        };

        match tree.apply_children(&ticket, children)? {
            Applied::Stored { count, visible } => {
                debug!(
                    "fetch_children: {} stored {} children (visible={})",
                    ticket.code, count, visible
                );
                Ok(ExpandOutcome::Fetched {
                    children: count,
                    visible,
                })
            }
            Applied::Stale => Ok(ExpandOutcome::Discarded),
        }
    }

    async fn list_children(&self, ticket: &FetchTicket) -> ApplicationResult<Vec<RegionSummary>> {
        match ticket.level {
            RegionLevel::District => self
                .source
                .list_districts(&ticket.code)
                .await
                .with_source_context("list districts", &ticket.code),
            RegionLevel::Subdistrict => self
                .source
                .list_subdistricts(&ticket.code)
                .await
                .with_source_context("list sub-districts", &ticket.code),
            RegionLevel::Province => Err(DomainError::NotExpandable(ticket.code.clone()).into()),
        }
    }

    /// Clear the expanded flag; cached children are kept.
    pub async fn collapse(&self, code: &str) -> ApplicationResult<()> {
        Ok(self.tree.lock().await.collapse(code)?)
    }

    pub async fn collapse_all(&self) {
        self.tree.lock().await.collapse_all();
    }

    /// Drop cached children so the next expansion fetches again.
    pub async fn invalidate(&self, code: &str) -> ApplicationResult<usize> {
        let removed = self.tree.lock().await.invalidate(code)?;
        debug!("invalidate: {} dropped {} cached nodes", code, removed);
        Ok(removed)
    }

    /// Resolve `code` in the cached tree and build its detail view.
    #[instrument(level = "debug", skip(self))]
    pub async fn select(&self, code: &str) -> ApplicationResult<Selection> {
        let node = {
            let tree = self.tree.lock().await;
            tree.find(code)
                .and_then(|idx| tree.row(idx))
                .ok_or_else(|| DomainError::NotFound(code.to_string()))?
        };
        info!("Selected {} {} ({})", node.level, node.name, node.code);

        match node.level {
            RegionLevel::Province => Ok(Selection::Province { node }),
            RegionLevel::District => {
                let detail = self
                    .source
                    .get_district_detail(code)
                    .await
                    .with_source_context("district detail", code)?;
                Ok(Selection::District { node, detail })
            }
            RegionLevel::Subdistrict => {
                let view = self.reconciliation.subdistrict(code).await?;
                Ok(Selection::Subdistrict { node, view })
            }
        }
    }

    /// Case-insensitive match over cached district and sub-district names.
    pub async fn filter(&self, query: &str) -> Vec<TreeRow> {
        self.tree.lock().await.filter(query)
    }

    pub async fn path_of(&self, code: &str) -> ApplicationResult<Vec<String>> {
        Ok(self.tree.lock().await.path_of(code)?)
    }

    pub async fn snapshot(&self) -> TreeSnapshot {
        let tree = self.tree.lock().await;
        TreeSnapshot {
            root: tree.root_fetch(),
            rows: tree.iter().filter_map(|(idx, _)| tree.row(idx)).collect(),
        }
    }

    /// Rows of the expanded part of the tree.
    pub async fn visible_rows(&self) -> Vec<TreeRow> {
        let tree = self.tree.lock().await;
        tree.iter_visible()
            .filter_map(|(idx, _)| tree.row(idx))
            .collect()
    }
}
