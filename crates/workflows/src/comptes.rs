//! Account list view-model
//!
//! Composes the base account list with an optional type-filtered list
//! and selects which one is displayed. The view subscribes to cache
//! entries; it never owns query results.

use guichet_cache::{QueryCache, QuerySnapshot};
use guichet_core::{Compte, CompteType};
use guichet_gateway::{QueryData, QuerySpec};
use log::debug;
use tokio::sync::watch;

/// What the account table renders
#[derive(Debug, Clone, Default)]
pub struct CompteListState {
    pub comptes: Vec<Compte>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Selects between the base list and the active filtered list
pub struct CompteView {
    cache: QueryCache,
    base: watch::Receiver<QuerySnapshot>,
    filter: Option<CompteType>,
    filtered: Option<watch::Receiver<QuerySnapshot>>,
    /// Last list actually displayed; stays visible while a newly
    /// selected query is still in flight
    last_shown: Vec<Compte>,
}

impl CompteView {
    /// Subscribes to the base list and triggers its initial fetch
    pub fn new(cache: QueryCache) -> Self {
        let base = cache.subscribe(&QuerySpec::AllComptes);
        let view = Self {
            cache,
            base,
            filter: None,
            filtered: None,
            last_shown: Vec::new(),
        };
        view.spawn_fetch(QuerySpec::AllComptes);
        view
    }

    pub fn filter(&self) -> Option<CompteType> {
        self.filter
    }

    /// Change the active type filter
    ///
    /// Clearing the filter re-executes the base query rather than
    /// reusing a cached copy: balances may have changed since the base
    /// list was last loaded.
    pub fn set_filter(&mut self, filter: Option<CompteType>) {
        self.filter = filter;
        match filter {
            Some(compte_type) => {
                debug!("filtering comptes by {compte_type:?}");
                let spec = QuerySpec::FindByType { compte_type };
                self.filtered = Some(self.cache.subscribe(&spec));
                self.spawn_fetch(spec);
            }
            None => {
                debug!("clearing compte filter");
                self.filtered = None;
                let cache = self.cache.clone();
                tokio::spawn(async move { cache.refetch(QuerySpec::AllComptes).await });
            }
        }
    }

    /// The list to display
    ///
    /// Selection rule: the filtered result when a filter is active, the
    /// base result otherwise. Data from the selected entry replaces the
    /// displayed list; while the selected entry has produced none yet,
    /// the previously displayed list remains visible.
    pub fn state(&mut self) -> CompteListState {
        let snapshot = match (&self.filter, &self.filtered) {
            (Some(_), Some(filtered)) => filtered.borrow().clone(),
            _ => self.base.borrow().clone(),
        };

        if let Some(QueryData::Comptes(comptes)) = snapshot.data {
            self.last_shown = comptes;
        }

        CompteListState {
            comptes: self.last_shown.clone(),
            loading: snapshot.loading,
            error: snapshot.error,
        }
    }

    fn spawn_fetch(&self, spec: QuerySpec) {
        let cache = self.cache.clone();
        tokio::spawn(async move { cache.fetch(spec).await });
    }
}
