use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::collection::{
    dedupe_by_id, extract_listing, position_of, CollectionItem, Fence, FetchState, FetchTicket,
    ItemId,
};
use crate::gateway::{ApiRequest, Fetch, FetchError};
use crate::pagination::{self, PageCursor, PaginationMode};
use crate::resources::Resource;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewError {
    #[error("collection is not loaded")]
    NotLoaded,

    #[error("no item with id {id} in the current collection")]
    UnknownItem { id: String },

    #[error("view has not been mounted")]
    NotMounted,

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ItemAction<I> {
    /// Navigate to the item's detail route.
    Open(I),
    Delete(I),
    /// `PUT` the body, then merge its top-level fields into the local item.
    Update { id: I, body: Value },
    /// `POST <item>/<command>`, then apply `patch` locally if given.
    Command {
        id: I,
        command: String,
        patch: Option<Value>,
    },
}

impl<I> ItemAction<I> {
    pub fn id(&self) -> &I {
        match self {
            Self::Open(id) | Self::Delete(id) => id,
            Self::Update { id, .. } | Self::Command { id, .. } => id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionOutcome {
    Navigate(String),
    Removed,
    Updated,
    /// The mutation went through but the local copy could not be patched, so
    /// the collection was fetched again.
    Refreshed,
}

#[derive(Debug, PartialEq)]
pub struct PageView<'a, T> {
    pub items: &'a [T],
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    /// 1-based position of `items[0]` in the whole collection.
    pub first_index: usize,
}

/// What the view shows right now. Loading, error and empty are separate
/// states and never collapse into each other.
#[derive(Debug, PartialEq)]
pub enum ViewSnapshot<'a, T> {
    Loading,
    Error(&'a str),
    Empty(&'a str),
    Page(PageView<'a, T>),
}

/// Owns the fetch state and page cursor of one collection view.
pub struct ViewController<R: Resource, F: Fetch> {
    resource: R,
    fetcher: F,
    state: FetchState<R::Item>,
    cursor: PageCursor,
    fence: Fence<R::Key>,
    dependency: Option<R::Key>,
    notice: Option<String>,
    server_total: Option<usize>,
}

impl<R, F> ViewController<R, F>
where
    R: Resource,
    F: Fetch,
{
    pub fn new(resource: R, fetcher: F, page_size: usize) -> Self {
        Self {
            resource,
            fetcher,
            state: FetchState::Idle,
            cursor: PageCursor::new(page_size),
            fence: Fence::new(),
            dependency: None,
            notice: None,
            server_total: None,
        }
    }

    pub fn resource(&self) -> &R {
        &self.resource
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn state(&self) -> &FetchState<R::Item> {
        &self.state
    }

    pub fn cursor(&self) -> &PageCursor {
        &self.cursor
    }

    pub fn dependency(&self) -> Option<&R::Key> {
        self.dependency.as_ref()
    }

    /// Fetches for `key` on first mount, or when `key` differs from the
    /// current dependency. Returns whether a fetch happened.
    pub async fn set_dependency(&mut self, key: R::Key) -> bool {
        let unchanged = self.dependency.as_ref() == Some(&key)
            && !matches!(self.state, FetchState::Idle | FetchState::Failed(_));
        if unchanged {
            return false;
        }
        if self.dependency.as_ref() != Some(&key) {
            self.cursor.reset();
        }
        self.load(key).await;
        true
    }

    pub async fn mount(&mut self, key: R::Key) -> &FetchState<R::Item> {
        self.set_dependency(key).await;
        &self.state
    }

    /// Fetches the current dependency again.
    pub async fn refresh(&mut self) -> Result<&FetchState<R::Item>, ViewError> {
        let key = self.dependency.clone().ok_or(ViewError::NotMounted)?;
        self.load(key).await;
        Ok(&self.state)
    }

    pub async fn load(&mut self, key: R::Key) -> &FetchState<R::Item> {
        let ticket = self.begin(key);
        let request = self.request_for(&ticket);
        let result = self.fetcher.send(request).await;
        self.complete(ticket, result);
        &self.state
    }

    /// Enters `Loading` for `key` and hands out the ticket the response must
    /// present to [`complete`](Self::complete).
    pub fn begin(&mut self, key: R::Key) -> FetchTicket<R::Key> {
        self.state = FetchState::Loading;
        self.dependency = Some(key.clone());
        let ticket = self.fence.issue(key);
        debug!(
            "{}: fetch #{} for {:?}",
            self.resource.name(),
            ticket.generation(),
            ticket.key()
        );
        ticket
    }

    pub fn request_for(&self, ticket: &FetchTicket<R::Key>) -> ApiRequest {
        let request = ApiRequest::get(self.resource.list_endpoint(ticket.key()));
        match self.resource.pagination() {
            PaginationMode::Client => request,
            PaginationMode::Server => request
                .with_query("page", self.cursor.page())
                .with_query("limit", self.cursor.page_size()),
        }
    }

    /// Applies a response if its ticket is still current. Stale responses
    /// are dropped and `false` is returned.
    pub fn complete(
        &mut self,
        ticket: FetchTicket<R::Key>,
        result: Result<Value, FetchError>,
    ) -> bool {
        if !self.fence.is_current(&ticket) {
            debug!(
                "{}: discarding stale response #{} (current #{})",
                self.resource.name(),
                ticket.generation(),
                self.fence.generation()
            );
            return false;
        }

        let listing = result.and_then(|body| {
            extract_listing::<R::Item>(body, self.resource.envelope())
        });
        match listing {
            Ok(listing) => {
                let (items, _) = dedupe_by_id(listing.items);
                match (self.resource.pagination(), listing.page_info) {
                    (PaginationMode::Server, Some(info)) => {
                        self.cursor.apply_page_info(&info);
                        self.server_total = Some(info.total);
                    }
                    _ => {
                        self.cursor.reclamp(items.len());
                        self.server_total = None;
                    }
                }
                info!("{}: loaded {} items", self.resource.name(), items.len());
                self.notice = listing.notice;
                self.state = FetchState::Loaded(items);
            }
            Err(e) => {
                warn!("{}: fetch failed: {e}", self.resource.name());
                self.notice = None;
                self.state = FetchState::Failed(e.to_string());
            }
        }
        true
    }

    pub fn is_server_paginated(&self) -> bool {
        self.resource.pagination() == PaginationMode::Server
    }

    /// Moves to `page`. Client-paginated views only re-slice; server
    /// paginated views fetch the page. Returns whether the page changed.
    pub async fn go_to_page(&mut self, page: usize) -> Result<bool, ViewError> {
        if self.state.items().is_none() {
            return Err(ViewError::NotLoaded);
        }
        if !self.cursor.go_to(page) {
            return Ok(false);
        }
        self.fetch_page_if_remote().await?;
        Ok(true)
    }

    pub async fn next_page(&mut self) -> Result<bool, ViewError> {
        if self.state.items().is_none() {
            return Err(ViewError::NotLoaded);
        }
        if !self.cursor.next() {
            return Ok(false);
        }
        self.fetch_page_if_remote().await?;
        Ok(true)
    }

    pub async fn previous_page(&mut self) -> Result<bool, ViewError> {
        if self.state.items().is_none() {
            return Err(ViewError::NotLoaded);
        }
        if !self.cursor.previous() {
            return Ok(false);
        }
        self.fetch_page_if_remote().await?;
        Ok(true)
    }

    /// A server-paged resource that answered with a bare list is paged
    /// locally from then on.
    fn pages_remotely(&self) -> bool {
        self.is_server_paginated() && self.server_total.is_some()
    }

    async fn fetch_page_if_remote(&mut self) -> Result<(), ViewError> {
        if !self.pages_remotely() {
            return Ok(());
        }
        let key = self.dependency.clone().ok_or(ViewError::NotMounted)?;
        self.load(key).await;
        Ok(())
    }

    /// Items on the current page.
    pub fn page_items(&self) -> &[R::Item] {
        let Some(items) = self.state.items() else {
            return &[];
        };
        if self.pages_remotely() {
            return items;
        }
        pagination::slice(items, self.cursor.page(), self.cursor.page_size()).0
    }

    pub fn render(&self) -> ViewSnapshot<'_, R::Item> {
        match &self.state {
            FetchState::Idle | FetchState::Loading => ViewSnapshot::Loading,
            FetchState::Failed(message) => ViewSnapshot::Error(message.as_str()),
            FetchState::Loaded(items) if items.is_empty() => ViewSnapshot::Empty(
                self.notice
                    .as_deref()
                    .unwrap_or_else(|| self.resource.empty_message()),
            ),
            FetchState::Loaded(items) => {
                let page = self.cursor.page();
                let total_items = self.server_total.unwrap_or(items.len());
                ViewSnapshot::Page(PageView {
                    items: self.page_items(),
                    page,
                    total_pages: self.cursor.total_pages(),
                    total_items,
                    first_index: (page - 1) * self.cursor.page_size() + 1,
                })
            }
        }
    }

    /// Runs an item action. Mutations update the local collection on
    /// success and fall back to a full re-fetch on failure.
    pub async fn dispatch(
        &mut self,
        action: ItemAction<ItemId<R::Item>>,
    ) -> Result<ActionOutcome, ViewError> {
        let items = self.state.items().ok_or(ViewError::NotLoaded)?;
        if position_of(items, action.id()).is_none() {
            return Err(ViewError::UnknownItem {
                id: action.id().to_string(),
            });
        }

        match action {
            ItemAction::Open(id) => Ok(ActionOutcome::Navigate(self.resource.detail_route(&id))),
            ItemAction::Delete(id) => {
                let request = ApiRequest::delete(self.resource.item_endpoint(&id));
                self.mutate(request).await?;
                self.remove_local(&id).await;
                Ok(ActionOutcome::Removed)
            }
            ItemAction::Update { id, body } => {
                let request = ApiRequest::put(self.resource.item_endpoint(&id), body.clone());
                self.mutate(request).await?;
                Ok(self.patch_local(&id, Some(&body)).await)
            }
            ItemAction::Command { id, command, patch } => {
                let request = ApiRequest::post(self.resource.command_endpoint(&id, &command), None);
                self.mutate(request).await?;
                Ok(self.patch_local(&id, patch.as_ref()).await)
            }
        }
    }

    async fn mutate(&mut self, request: ApiRequest) -> Result<Value, ViewError> {
        let label = format!("{} {}", request.method, request.endpoint);
        match self.fetcher.send(request).await {
            Ok(body) => Ok(body),
            Err(e) => {
                warn!("{label} failed, re-fetching {}: {e}", self.resource.name());
                if let Some(key) = self.dependency.clone() {
                    self.load(key).await;
                }
                Err(ViewError::Fetch(e))
            }
        }
    }

    async fn remove_local(&mut self, id: &ItemId<R::Item>) {
        let Some(items) = self.state.items_mut() else {
            return;
        };
        if let Some(idx) = position_of(items, id) {
            items.remove(idx);
        }
        let remaining = items.len();
        match self.server_total.as_mut() {
            Some(total) => {
                *total = total.saturating_sub(1);
                let page = self.cursor.page();
                let pages = pagination::total_pages(*total, self.cursor.page_size());
                self.cursor.set_total_pages(pages);
                // Only the current page is held locally; refill it from the server.
                if (remaining == 0 && *total > 0) || self.cursor.page() != page {
                    if let Some(key) = self.dependency.clone() {
                        self.load(key).await;
                    }
                }
            }
            None => self.cursor.reclamp(remaining),
        }
    }

    async fn patch_local(&mut self, id: &ItemId<R::Item>, patch: Option<&Value>) -> ActionOutcome {
        let patched = patch.and_then(|patch| {
            let items = self.state.items()?;
            let idx = position_of(items, id)?;
            let merged = merge_fields(&items[idx], patch)?;
            Some((idx, merged))
        });
        match patched {
            Some((idx, merged)) if merged.id() == *id => {
                if let Some(items) = self.state.items_mut() {
                    items[idx] = merged;
                }
                ActionOutcome::Updated
            }
            _ => {
                debug!("{}: local patch not possible, re-fetching", self.resource.name());
                if let Some(key) = self.dependency.clone() {
                    self.load(key).await;
                }
                ActionOutcome::Refreshed
            }
        }
    }
}

/// Overwrites the top-level fields of `item` with those in `patch`.
pub fn merge_fields<T>(item: &T, patch: &Value) -> Option<T>
where
    T: Serialize + DeserializeOwned,
{
    let Value::Object(changes) = patch else {
        return None;
    };
    let mut current = serde_json::to_value(item).ok()?;
    let fields = current.as_object_mut()?;
    for (k, v) in changes {
        fields.insert(k.clone(), v.clone());
    }
    serde_json::from_value(current).ok()
}
