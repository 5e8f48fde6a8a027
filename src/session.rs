//! Reader session: the context object that ties the navigation core together
//!
//! Owns the catalog, navigation state, fragment history, theme store and
//! offline cache, and drives a rendering target through the [`SidebarView`]
//! and [`ContentView`] capability traits. The session is the single mutator:
//! loader completions are applied here and nowhere else, and overlapping
//! loads are resolved by comparing request tickets so the last-issued load
//! always wins.

use crate::cache::{OFFLINE_DOCUMENT, OfflineCache};
use crate::catalog::{Catalog, ChapterGroup, group_by_part};
use crate::history::{FragmentHistory, HistoryEntry, InMemoryHistory};
use crate::loader::{ChapterFetcher, LoadError, LoadResult, prepare_fragment};
use crate::navigation::{Direction, NavigationState};
use crate::theme::{Theme, ThemeStore};
use crate::toc::{Toc, build_toc};

/// A view capable of rendering the grouped chapter list, highlighting one
/// entry, and toggling entry visibility. Implementable against any rendering
/// target.
pub trait SidebarView {
    fn render(&mut self, groups: &[ChapterGroup]);
    fn highlight(&mut self, id: Option<&str>);
    /// One flag per catalog index; filtering toggles visibility only, it
    /// never re-renders the list.
    fn apply_filter(&mut self, visible: &[bool]);
    fn show_catalog_error(&mut self, message: &str);
}

/// A view capable of displaying chapter content, loading and error states,
/// and the derived table of contents.
pub trait ContentView {
    fn show_loading(&mut self, id: &str);
    fn show_chapter(&mut self, id: &str, toc: &Toc);
    fn show_error(&mut self, message: &str);
    fn scroll_to_top(&mut self);
    fn apply_theme(&mut self, theme: Theme);
}

/// Combined rendering target for the session.
pub trait ReaderView: SidebarView + ContentView {}
impl<T: SidebarView + ContentView> ReaderView for T {}

/// Token identifying one load request. Monotonically increasing; results
/// carrying a stale ticket are discarded at apply time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadTicket(u64);

/// What happened when a load result was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Result rendered; navigation state and history updated
    Rendered,
    /// A newer load was issued meanwhile; result dropped
    Stale,
    /// Load failed; inline error shown, navigation state untouched
    Failed,
}

/// Fetch a chapter document, falling back to the offline cache on transport
/// failure. Successful fetches refresh the cache. A transport failure with
/// nothing cached surfaces the designated offline document as the error.
pub async fn fetch_document<F: ChapterFetcher>(
    fetcher: &F,
    cache: Option<&OfflineCache>,
    id: &str,
) -> LoadResult {
    match fetcher.fetch(id).await {
        Ok(document) => {
            if let Some(cache) = cache {
                cache.store(id, &document);
            }
            Ok(prepare_fragment(&document))
        }
        Err(LoadError::Transport { id, detail }) => {
            if let Some(cached) = cache.and_then(|c| c.lookup(&id)) {
                tracing::info!("serving {id} from offline cache");
                return Ok(prepare_fragment(&cached));
            }
            Err(LoadError::Transport { id, detail })
        }
        Err(e) => Err(e),
    }
}

pub struct ReaderSession<F, V> {
    catalog: Catalog,
    groups: Vec<ChapterGroup>,
    nav: NavigationState,
    history: InMemoryHistory,
    theme: ThemeStore,
    cache: Option<OfflineCache>,
    fetcher: F,
    view: V,
    next_ticket: u64,
    /// Ticket of the most recently issued, not-yet-applied load
    latest: Option<LoadTicket>,
    search_term: String,
}

impl<F: ChapterFetcher, V: ReaderView> ReaderSession<F, V> {
    pub fn new(
        catalog: Catalog,
        fetcher: F,
        theme: ThemeStore,
        cache: Option<OfflineCache>,
        mut view: V,
    ) -> Self {
        let groups = group_by_part(catalog.list());
        view.render(&groups);
        view.apply_theme(theme.get());
        Self {
            nav: NavigationState::new(catalog.len()),
            catalog,
            groups,
            history: InMemoryHistory::new(),
            theme,
            cache,
            fetcher,
            view,
            next_ticket: 0,
            latest: None,
            search_term: String::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn groups(&self) -> &[ChapterGroup] {
        &self.groups
    }

    pub fn nav(&self) -> &NavigationState {
        &self.nav
    }

    pub fn theme(&self) -> Theme {
        self.theme.get()
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn cache(&self) -> Option<&OfflineCache> {
        self.cache.as_ref()
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// Degraded startup: catalog could not be loaded. The sidebar shows the
    /// error; everything else stays inert.
    pub fn surface_catalog_error(&mut self, message: &str) {
        tracing::error!("catalog load failed: {message}");
        self.view.show_catalog_error(message);
    }

    /// Issue a new load for the chapter at `index`. Returns the ticket and
    /// chapter id to fetch, or `None` for an out-of-range index. Marks the
    /// content view as loading; navigation state is not touched until the
    /// result is applied.
    pub fn begin_load(&mut self, index: usize) -> Option<(LoadTicket, String)> {
        let id = self.catalog.get(index)?.id.clone();
        self.next_ticket += 1;
        let ticket = LoadTicket(self.next_ticket);
        self.latest = Some(ticket);
        self.view.show_loading(&id);
        Some((ticket, id))
    }

    /// Apply a completed load. Results whose ticket is not the most recently
    /// issued one are discarded, so two racing loads settle on the
    /// last-issued winner regardless of completion order.
    pub fn apply_load(
        &mut self,
        ticket: LoadTicket,
        index: usize,
        id: &str,
        result: LoadResult,
    ) -> Applied {
        if self.latest != Some(ticket) {
            tracing::debug!("discarding stale load result for {id}");
            return Applied::Stale;
        }
        self.latest = None;

        match result {
            Ok(fragment) => {
                let toc = build_toc(&fragment);
                self.nav.select_index(index);
                self.view.show_chapter(id, &toc);
                self.view.scroll_to_top();
                self.view.highlight(Some(id));
                // A restore triggered by history traversal must not push a
                // duplicate entry on top of the one it restored.
                if self.history.current_fragment() != Some(id) {
                    self.history.push(HistoryEntry {
                        fragment: id.to_string(),
                        index,
                    });
                }
                Applied::Rendered
            }
            Err(e) => {
                let message = match &e {
                    LoadError::Transport { .. } => OFFLINE_DOCUMENT.to_string(),
                    LoadError::NotFound { .. } => e.to_string(),
                };
                self.view.show_error(&message);
                Applied::Failed
            }
        }
    }

    /// Select and load the chapter at `index`, end to end.
    pub async fn load_index(&mut self, index: usize) -> Applied {
        let Some((ticket, id)) = self.begin_load(index) else {
            return Applied::Failed;
        };
        let result = fetch_document(&self.fetcher, self.cache.as_ref(), &id).await;
        self.apply_load(ticket, index, &id, result)
    }

    /// Prev/next navigation honoring the no-wraparound boundary policy.
    /// Out-of-range steps load nothing and change nothing.
    pub async fn step(&mut self, direction: Direction) -> Applied {
        let can = match direction {
            Direction::Prev => self.nav.can_go_prev(),
            Direction::Next => self.nav.can_go_next(),
        };
        if !can {
            return Applied::Failed;
        }
        // can_go_* guarantee a selection and an in-range target
        let current = match self.nav.current_index() {
            Some(i) => i,
            None => return Applied::Failed,
        };
        let target = match direction {
            Direction::Prev => current - 1,
            Direction::Next => current + 1,
        };
        self.load_index(target).await
    }

    /// Restore from a fragment identifier (initial page load, or a
    /// back/forward traversal). Unknown or absent fragments leave the
    /// session in its empty state.
    pub async fn restore_fragment(&mut self, fragment: Option<&str>) -> Applied {
        let Some(id) = fragment else {
            return Applied::Failed;
        };
        let Some(index) = self.catalog.index_of(id) else {
            return Applied::Failed;
        };
        self.load_index(index).await
    }

    /// Move the history cursor back and return the catalog index to restore,
    /// or `None` when there is nowhere to go. The caller issues the load.
    pub fn begin_back(&mut self) -> Option<usize> {
        let fragment = self.history.back()?.fragment.clone();
        self.catalog.index_of(&fragment)
    }

    /// Move the history cursor forward and return the catalog index to
    /// restore, or `None` when there is nowhere to go.
    pub fn begin_forward(&mut self) -> Option<usize> {
        let fragment = self.history.forward()?.fragment.clone();
        self.catalog.index_of(&fragment)
    }

    /// History back, like the browser back button.
    pub async fn go_back(&mut self) -> Applied {
        match self.begin_back() {
            Some(index) => self.load_index(index).await,
            None => Applied::Failed,
        }
    }

    /// History forward.
    pub async fn go_forward(&mut self) -> Applied {
        match self.begin_forward() {
            Some(index) => self.load_index(index).await,
            None => Applied::Failed,
        }
    }

    pub fn current_fragment(&self) -> Option<&str> {
        self.history.current_fragment()
    }

    /// Case-insensitive substring filter over chapter titles. Empty term
    /// shows everything.
    pub fn filter(&mut self, term: &str) {
        self.search_term = term.to_lowercase();
        let visible: Vec<bool> = self
            .catalog
            .list()
            .iter()
            .map(|c| {
                self.search_term.is_empty()
                    || c.title.to_lowercase().contains(&self.search_term)
            })
            .collect();
        self.view.apply_filter(&visible);
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    /// Flip the theme, persist it, and apply it to the view.
    pub fn toggle_theme(&mut self) -> Theme {
        match self.theme.toggle() {
            Ok(theme) => {
                self.view.apply_theme(theme);
                theme
            }
            Err(e) => {
                tracing::warn!("failed to persist theme preference: {e}");
                let theme = self.theme.get();
                self.view.apply_theme(theme);
                theme
            }
        }
    }
}
