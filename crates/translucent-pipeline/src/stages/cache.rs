//! Response caching for repeated reads.
//!
//! Only successful `GET` responses are stored. A hit sets the response and
//! short-circuits the rest of the chain.

use crate::context::ResourceContext;
use crate::middleware::{Activate, BoxFuture, Middleware, RequestDelegate};
use crate::types::{Request, Response};
use dashmap::DashMap;
use http::Method;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use translucent_core::{Inject, PipelineResult};

/// Cache limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long an entry stays fresh.
    pub ttl: Duration,
    /// Maximum number of entries.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            max_entries: 1024,
        }
    }
}

/// Whether the response in a context came from the cache.
///
/// Set as a context extension by [`CacheMiddleware`] for cacheable requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from the cache.
    Hit,
    /// Produced downstream.
    Miss,
}

#[derive(Debug)]
struct Entry {
    response: Response,
    stored_at: Instant,
}

/// A concurrent, TTL and capacity bounded response store.
#[derive(Debug)]
pub struct ResourceCache {
    entries: DashMap<String, Entry>,
    config: CacheConfig,
}

impl ResourceCache {
    /// Creates an empty cache.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
        }
    }

    /// Returns the cache key for `request`, or `None` if it is not cacheable.
    pub fn key(request: &Request) -> Option<String> {
        (request.method == Method::GET).then(|| format!("{} {}", request.method, request.uri))
    }

    /// Returns a fresh entry, evicting it if it has expired.
    pub fn get(&self, key: &str) -> Option<Response> {
        let expired = match self.entries.get(key) {
            Some(entry) if !self.is_expired(&entry) => return Some(entry.response.clone()),
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove_if(key, |_, entry| self.is_expired(entry));
        }
        None
    }

    /// Stores a response.
    ///
    /// When full, expired entries are dropped first, then the oldest ones.
    /// Finding the oldest entry scans every shard, so inserting into a cache
    /// full of fresh entries costs `O(max_entries)`.
    pub fn insert(&self, key: String, response: Response) {
        let max_entries = self.config.max_entries;
        if self.entries.len() >= max_entries && !self.entries.contains_key(&key) {
            self.evict_expired();
            if self.entries.len() >= max_entries {
                self.evict_oldest();
            }
        }

        self.entries.insert(
            key,
            Entry {
                response,
                stored_at: Instant::now(),
            },
        );

        // Concurrent inserts can all pass the check above.
        while self.entries.len() > max_entries {
            self.evict_oldest();
        }
    }

    /// Drops every expired entry.
    pub fn evict_expired(&self) {
        let ttl = self.config.ttl;
        self.entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Returns the number of stored entries, fresh or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the limits.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        entry.stored_at.elapsed() >= self.config.ttl
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.stored_at)
            .map(|entry| entry.key().clone());

        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

/// Serves cacheable requests from a shared [`ResourceCache`].
pub struct CacheMiddleware {
    next: RequestDelegate<ResourceContext>,
    cache: Inject<ResourceCache>,
}

impl Middleware for CacheMiddleware {
    type Context = ResourceContext;
    type Services = ();

    fn name(&self) -> &'static str {
        "cache"
    }

    fn invoke<'a>(
        &'a self,
        ctx: &'a mut ResourceContext,
        _: (),
    ) -> BoxFuture<'a, PipelineResult<()>> {
        Box::pin(async move {
            let Some(key) = ResourceCache::key(ctx.request()) else {
                return self.next.invoke(ctx).await;
            };

            if let Some(response) = self.cache.get(&key) {
                debug!(key = %key, "cache hit");
                ctx.set_extension(CacheStatus::Hit);
                ctx.set_response(response);
                return Ok(());
            }

            ctx.set_extension(CacheStatus::Miss);
            self.next.invoke(ctx).await?;

            if let Some(response) = ctx.response().filter(|response| response.is_success()) {
                self.cache.insert(key, response.clone());
            }
            Ok(())
        })
    }
}

impl Activate for CacheMiddleware {
    type Dependencies = (Inject<ResourceCache>,);

    fn activate(next: RequestDelegate<ResourceContext>, (cache,): Self::Dependencies) -> Self {
        Self { next, cache }
    }
}
