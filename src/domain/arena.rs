use std::collections::HashSet;

use generational_arena::{Arena, Index};
use serde::Serialize;
use tracing::{debug, instrument, trace};

use crate::domain::entities::{RegionLevel, RegionSummary};
use crate::domain::error::DomainError;

/// Child fetch state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchState {
    #[default]
    Unfetched,
    Fetching,
    Fetched,
    Failed,
}

/// Region node in the arena-based hierarchy.
#[derive(Debug)]
pub struct RegionNode {
    pub summary: RegionSummary,
    pub level: RegionLevel,
    /// Index of parent node in the arena, None for provinces
    pub parent: Option<Index>,
    /// Indices of child nodes in upstream order
    pub children: Vec<Index>,
    pub expanded: bool,
    pub fetch: FetchState,
    /// Bumped on invalidation; fetches started under an older epoch are discarded
    epoch: u64,
}

impl RegionNode {
    fn new(summary: RegionSummary, level: RegionLevel, parent: Option<Index>) -> Self {
        Self {
            summary,
            level,
            parent,
            children: Vec::new(),
            expanded: false,
            fetch: FetchState::Unfetched,
            epoch: 0,
        }
    }

    pub fn code(&self) -> &str {
        &self.summary.code
    }

    pub fn name(&self) -> &str {
        &self.summary.name
    }
}

/// Handle for one in-flight child fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub index: Index,
    pub code: String,
    pub level: RegionLevel,
    epoch: u64,
}

/// Result of a toggle request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toggle {
    Collapsed,
    /// Expanded from cached children
    Expanded,
    /// Expanded; children must be fetched with the ticket
    NeedsFetch(FetchTicket),
    /// A fetch is already in flight; nothing changed
    AlreadyFetching,
    /// Sub-districts have no children
    Leaf,
}

/// Outcome of applying a fetch result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Children stored; `visible` is true when the node is still expanded
    Stored { count: usize, visible: bool },
    /// Node was invalidated or removed meanwhile; result dropped
    Stale,
}

/// One row of a rendered tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeRow {
    pub depth: usize,
    pub code: String,
    pub name: String,
    pub level: RegionLevel,
    pub expanded: bool,
    pub fetch: FetchState,
    pub child_count: u32,
    pub population: u64,
    pub loaded_children: usize,
}

/// Arena-based region tree (province -> district -> sub-district).
///
/// Expansion state lives on each node; there is no global expanded set.
#[derive(Debug, Default)]
pub struct RegionTree {
    arena: Arena<RegionNode>,
    /// Province nodes in upstream order
    roots: Vec<Index>,
    root_fetch: FetchState,
}

impl RegionTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        !self.roots.is_empty()
    }

    pub fn roots(&self) -> &[Index] {
        &self.roots
    }

    pub fn root_fetch(&self) -> FetchState {
        self.root_fetch
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Mark the root level as fetching. Returns false if already fetching or loaded.
    pub fn begin_root_fetch(&mut self) -> bool {
        if self.root_fetch == FetchState::Fetching || self.is_loaded() {
            return false;
        }
        self.root_fetch = FetchState::Fetching;
        true
    }

    /// Insert the province level, all-or-nothing.
    #[instrument(level = "debug", skip(self, provinces), fields(count = provinces.len()))]
    pub fn set_roots(&mut self, provinces: Vec<RegionSummary>) -> Result<usize, DomainError> {
        if let Err(e) = self.validate_children("<root>", &provinces) {
            self.root_fetch = FetchState::Failed;
            return Err(e);
        }
        if provinces.is_empty() {
            self.root_fetch = FetchState::Failed;
            return Err(DomainError::MalformedChildren {
                code: "<root>".into(),
                message: "empty province list".into(),
            });
        }
        for summary in provinces {
            let idx = self
                .arena
                .insert(RegionNode::new(summary, RegionLevel::Province, None));
            self.roots.push(idx);
        }
        self.root_fetch = FetchState::Fetched;
        Ok(self.roots.len())
    }

    pub fn fail_root_fetch(&mut self) {
        self.root_fetch = FetchState::Failed;
    }

    #[instrument(level = "trace", skip(self))]
    pub fn get_node(&self, idx: Index) -> Option<&RegionNode> {
        self.arena.get(idx)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn get_node_mut(&mut self, idx: Index) -> Option<&mut RegionNode> {
        self.arena.get_mut(idx)
    }

    /// Locate a node by code with a tree walk.
    pub fn find(&self, code: &str) -> Option<Index> {
        self.iter()
            .find(|(_, node)| node.code() == code)
            .map(|(idx, _)| idx)
    }

    fn require(&self, code: &str) -> Result<Index, DomainError> {
        self.find(code)
            .ok_or_else(|| DomainError::NotFound(code.to_string()))
    }

    /// Toggle expansion of `code`.
    ///
    /// Collapsing keeps cached children. Expanding fetches only when no
    /// children are cached; at most one fetch per node is in flight.
    #[instrument(level = "debug", skip(self))]
    pub fn toggle(&mut self, code: &str) -> Result<Toggle, DomainError> {
        let idx = self.require(code)?;
        let node = self
            .arena
            .get_mut(idx)
            .ok_or_else(|| DomainError::NotFound(code.to_string()))?;

        let Some(child_level) = node.level.child() else {
            return Ok(Toggle::Leaf);
        };
        if node.fetch == FetchState::Fetching {
            trace!("toggle: {} already fetching", code);
            return Ok(Toggle::AlreadyFetching);
        }
        if node.expanded {
            node.expanded = false;
            return Ok(Toggle::Collapsed);
        }
        Ok(Self::open(idx, code, child_level, node))
    }

    /// Ensure `code` is expanded; an expanded node without children fetches again.
    #[instrument(level = "debug", skip(self))]
    pub fn expand(&mut self, code: &str) -> Result<Toggle, DomainError> {
        let idx = self.require(code)?;
        let node = self
            .arena
            .get_mut(idx)
            .ok_or_else(|| DomainError::NotFound(code.to_string()))?;

        let Some(child_level) = node.level.child() else {
            return Ok(Toggle::Leaf);
        };
        if node.fetch == FetchState::Fetching {
            return Ok(Toggle::AlreadyFetching);
        }
        Ok(Self::open(idx, code, child_level, node))
    }

    fn open(idx: Index, code: &str, child_level: RegionLevel, node: &mut RegionNode) -> Toggle {
        node.expanded = true;
        if !node.children.is_empty() {
            return Toggle::Expanded;
        }
        node.fetch = FetchState::Fetching;
        Toggle::NeedsFetch(FetchTicket {
            index: idx,
            code: code.to_string(),
            level: child_level,
            epoch: node.epoch,
        })
    }

    /// Clear the expanded flag; cached children and fetch state are kept.
    pub fn collapse(&mut self, code: &str) -> Result<(), DomainError> {
        let idx = self.require(code)?;
        if let Some(node) = self.arena.get_mut(idx) {
            node.expanded = false;
        }
        Ok(())
    }

    pub fn collapse_all(&mut self) {
        for (_, node) in self.arena.iter_mut() {
            node.expanded = false;
        }
    }

    /// Store the children fetched for `ticket`, all-or-nothing.
    ///
    /// A duplicate or already-known code rejects the whole batch and counts
    /// as a failed fetch.
    #[instrument(level = "debug", skip(self, children), fields(code = %ticket.code, count = children.len()))]
    pub fn apply_children(
        &mut self,
        ticket: &FetchTicket,
        children: Vec<RegionSummary>,
    ) -> Result<Applied, DomainError> {
        if !self.is_current(ticket) {
            debug!("apply_children: stale result for {}", ticket.code);
            return Ok(Applied::Stale);
        }
        if let Err(e) = self.validate_children(&ticket.code, &children) {
            self.fail_fetch(ticket);
            return Err(e);
        }

        let mut indices = Vec::with_capacity(children.len());
        for summary in children {
            indices.push(self.arena.insert(RegionNode::new(
                summary,
                ticket.level,
                Some(ticket.index),
            )));
        }

        let Some(node) = self.arena.get_mut(ticket.index) else {
            return Ok(Applied::Stale);
        };
        node.children = indices;
        node.fetch = FetchState::Fetched;
        Ok(Applied::Stored {
            count: node.children.len(),
            visible: node.expanded,
        })
    }

    /// Record a failed fetch: no children, collapsed.
    ///
    /// Returns false when the ticket is stale and nothing was recorded.
    pub fn fail_fetch(&mut self, ticket: &FetchTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        match self.arena.get_mut(ticket.index) {
            Some(node) => {
                node.children.clear();
                node.expanded = false;
                node.fetch = FetchState::Failed;
                true
            }
            None => false,
        }
    }

    fn is_current(&self, ticket: &FetchTicket) -> bool {
        self.arena
            .get(ticket.index)
            .is_some_and(|n| n.epoch == ticket.epoch && n.fetch == FetchState::Fetching)
    }

    /// Drop cached children of `code` so the next expansion fetches again.
    #[instrument(level = "debug", skip(self))]
    pub fn invalidate(&mut self, code: &str) -> Result<usize, DomainError> {
        let idx = self.require(code)?;
        let removed: Vec<Index> = self.descendants(idx);
        for child in &removed {
            self.arena.remove(*child);
        }
        if let Some(node) = self.arena.get_mut(idx) {
            node.children.clear();
            node.expanded = false;
            node.fetch = FetchState::Unfetched;
            node.epoch += 1;
        }
        Ok(removed.len())
    }

    fn descendants(&self, idx: Index) -> Vec<Index> {
        let mut result = Vec::new();
        let mut stack: Vec<Index> = self
            .arena
            .get(idx)
            .map(|n| n.children.clone())
            .unwrap_or_default();
        while let Some(current) = stack.pop() {
            if let Some(node) = self.arena.get(current) {
                stack.extend(node.children.iter().copied());
            }
            result.push(current);
        }
        result
    }

    fn validate_children(&self, code: &str, children: &[RegionSummary]) -> Result<(), DomainError> {
        let mut seen = HashSet::with_capacity(children.len());
        for child in children {
            if child.code.is_empty() {
                return Err(DomainError::MalformedChildren {
                    code: code.to_string(),
                    message: format!("child '{}' has an empty code", child.name),
                });
            }
            if !seen.insert(child.code.as_str()) {
                return Err(DomainError::MalformedChildren {
                    code: code.to_string(),
                    message: format!("duplicate child code {}", child.code),
                });
            }
        }
        if let Some((_, existing)) = self.iter().find(|(_, n)| seen.contains(n.code())) {
            return Err(DomainError::MalformedChildren {
                code: code.to_string(),
                message: format!("code {} already present in tree", existing.code()),
            });
        }
        Ok(())
    }

    /// Names from the province down to `code`.
    pub fn path_of(&self, code: &str) -> Result<Vec<String>, DomainError> {
        let mut current = Some(self.require(code)?);
        let mut names = Vec::new();
        while let Some(idx) = current {
            let Some(node) = self.arena.get(idx) else { break };
            names.push(node.name().to_string());
            current = node.parent;
        }
        names.reverse();
        Ok(names)
    }

    pub fn row(&self, idx: Index) -> Option<TreeRow> {
        self.arena.get(idx).map(|node| TreeRow {
            depth: node.level.depth(),
            code: node.code().to_string(),
            name: node.name().to_string(),
            level: node.level,
            expanded: node.expanded,
            fetch: node.fetch,
            child_count: node.summary.child_count,
            population: node.summary.population,
            loaded_children: node.children.len(),
        })
    }

    /// Pre-order walk over every cached node.
    #[instrument(level = "trace", skip(self))]
    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self, false)
    }

    /// Pre-order walk that only descends into expanded nodes.
    pub fn iter_visible(&self) -> TreeIterator<'_> {
        TreeIterator::new(self, true)
    }

    /// Case-insensitive substring match over cached district and sub-district names.
    pub fn filter(&self, query: &str) -> Vec<TreeRow> {
        let needle = query.trim().to_lowercase();
        self.iter()
            .filter(|(_, node)| node.level != RegionLevel::Province)
            .filter(|(_, node)| needle.is_empty() || node.name().to_lowercase().contains(&needle))
            .filter_map(|(idx, _)| self.row(idx))
            .collect()
    }
}

pub struct TreeIterator<'a> {
    tree: &'a RegionTree,
    stack: Vec<Index>,
    visible_only: bool,
}

impl<'a> TreeIterator<'a> {
    fn new(tree: &'a RegionTree, visible_only: bool) -> Self {
        let stack = tree.roots.iter().rev().copied().collect();
        Self {
            tree,
            stack,
            visible_only,
        }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (Index, &'a RegionNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.tree.get_node(current_idx) {
                if !self.visible_only || node.expanded {
                    // Push children in reverse order for left-to-right traversal
                    for &child in node.children.iter().rev() {
                        self.stack.push(child);
                    }
                }
                return Some((current_idx, node));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summaries(codes: &[(&str, &str)]) -> Vec<RegionSummary> {
        codes
            .iter()
            .map(|(code, name)| RegionSummary::new(*code, *name))
            .collect()
    }

    fn loaded_tree() -> RegionTree {
        let mut tree = RegionTree::new();
        tree.set_roots(summaries(&[("11", "Seoul"), ("26", "Busan")]))
            .unwrap();
        tree
    }

    fn expand_with(tree: &mut RegionTree, code: &str, children: &[(&str, &str)]) {
        let Toggle::NeedsFetch(ticket) = tree.toggle(code).unwrap() else {
            panic!("expected fetch for {code}");
        };
        tree.apply_children(&ticket, summaries(children)).unwrap();
    }

    #[test]
    fn given_empty_province_list_when_setting_roots_then_tree_stays_unloaded() {
        let mut tree = RegionTree::new();

        let result = tree.set_roots(Vec::new());

        assert!(result.is_err());
        assert!(!tree.is_loaded());
        assert_eq!(tree.root_fetch(), FetchState::Failed);
    }

    #[test]
    fn given_duplicate_province_codes_when_setting_roots_then_nothing_inserted() {
        let mut tree = RegionTree::new();

        let result = tree.set_roots(summaries(&[("11", "Seoul"), ("11", "Seoul again")]));

        assert!(result.is_err());
        assert!(tree.is_empty());
    }

    #[test]
    fn given_collapsed_node_when_toggled_then_requests_fetch_and_marks_fetching() {
        let mut tree = loaded_tree();

        let toggle = tree.toggle("11").unwrap();

        let Toggle::NeedsFetch(ticket) = toggle else {
            panic!("expected fetch, got {toggle:?}");
        };
        assert_eq!(ticket.level, RegionLevel::District);
        let node = tree.get_node(ticket.index).unwrap();
        assert!(node.expanded);
        assert_eq!(node.fetch, FetchState::Fetching);
        assert_eq!(tree.toggle("11").unwrap(), Toggle::AlreadyFetching);
    }

    #[test]
    fn given_fetched_node_when_collapsed_and_reexpanded_then_uses_cache() {
        let mut tree = loaded_tree();
        expand_with(&mut tree, "11", &[("11010", "Jongno-gu"), ("11020", "Jung-gu")]);

        assert_eq!(tree.toggle("11").unwrap(), Toggle::Collapsed);
        assert_eq!(tree.toggle("11").unwrap(), Toggle::Expanded);

        let idx = tree.find("11").unwrap();
        let codes: Vec<_> = tree
            .get_node(idx)
            .unwrap()
            .children
            .iter()
            .map(|c| tree.get_node(*c).unwrap().code().to_string())
            .collect();
        assert_eq!(codes, vec!["11010", "11020"]);
    }

    #[test]
    fn given_failed_fetch_when_recorded_then_node_is_collapsed_without_children() {
        let mut tree = loaded_tree();
        let Toggle::NeedsFetch(ticket) = tree.toggle("26").unwrap() else {
            panic!("expected fetch");
        };

        assert!(tree.fail_fetch(&ticket));

        let node = tree.get_node(ticket.index).unwrap();
        assert!(!node.expanded);
        assert!(node.children.is_empty());
        assert_eq!(node.fetch, FetchState::Failed);
        assert!(matches!(tree.toggle("26").unwrap(), Toggle::NeedsFetch(_)));
    }

    #[test]
    fn given_invalidated_node_when_old_fetch_fails_then_nothing_recorded() {
        let mut tree = loaded_tree();
        let Toggle::NeedsFetch(ticket) = tree.toggle("26").unwrap() else {
            panic!("expected fetch");
        };
        tree.invalidate("26").unwrap();

        assert!(!tree.fail_fetch(&ticket));

        let node = tree.get_node(ticket.index).unwrap();
        assert_eq!(node.fetch, FetchState::Unfetched);
    }

    #[test]
    fn given_invalidated_node_when_old_fetch_completes_then_result_is_stale() {
        let mut tree = loaded_tree();
        let Toggle::NeedsFetch(ticket) = tree.toggle("11").unwrap() else {
            panic!("expected fetch");
        };

        tree.invalidate("11").unwrap();
        let applied = tree
            .apply_children(&ticket, summaries(&[("11010", "Jongno-gu")]))
            .unwrap();

        assert_eq!(applied, Applied::Stale);
        assert!(tree.find("11010").is_none());
    }

    #[test]
    fn given_expanded_node_with_empty_children_when_expanding_then_fetches_again() {
        let mut tree = loaded_tree();
        expand_with(&mut tree, "11", &[]);
        let idx = tree.find("11").unwrap();
        assert!(tree.get_node(idx).unwrap().expanded);

        let Toggle::NeedsFetch(ticket) = tree.expand("11").unwrap() else {
            panic!("expected fetch");
        };
        tree.apply_children(&ticket, summaries(&[("11010", "Jongno-gu")]))
            .unwrap();

        assert_eq!(tree.get_node(idx).unwrap().children.len(), 1);
        assert_eq!(tree.expand("11").unwrap(), Toggle::Expanded);
    }

    #[test]
    fn given_subdistrict_when_toggled_then_leaf() {
        let mut tree = loaded_tree();
        expand_with(&mut tree, "11", &[("11010", "Jongno-gu")]);
        expand_with(&mut tree, "11010", &[("1101053", "Sajik-dong")]);

        assert_eq!(tree.toggle("1101053").unwrap(), Toggle::Leaf);
        assert_eq!(
            tree.path_of("1101053").unwrap(),
            vec!["Seoul", "Jongno-gu", "Sajik-dong"]
        );
    }

    #[test]
    fn given_collapsed_parent_when_iterating_visible_then_children_hidden() {
        let mut tree = loaded_tree();
        expand_with(&mut tree, "11", &[("11010", "Jongno-gu")]);
        tree.collapse("11").unwrap();

        let visible: Vec<_> = tree.iter_visible().map(|(_, n)| n.code().to_string()).collect();
        let all: Vec<_> = tree.iter().map(|(_, n)| n.code().to_string()).collect();

        assert_eq!(visible, vec!["11", "26"]);
        assert_eq!(all, vec!["11", "11010", "26"]);
    }

    #[test]
    fn given_cached_nodes_when_filtering_then_matches_case_insensitive_below_province() {
        let mut tree = loaded_tree();
        expand_with(&mut tree, "11", &[("11010", "Jongno-gu"), ("11020", "Jung-gu")]);

        let hits: Vec<_> = tree.filter("JONG").into_iter().map(|r| r.code).collect();

        assert_eq!(hits, vec!["11010"]);
        assert!(tree.filter("seoul").is_empty());
    }
}
