use super::{
    CoinUpdate,
    GameGateway,
    Player,
};
use color_eyre::eyre::Result;
use std::{
    collections::HashMap,
    sync::{
        Mutex,
        MutexGuard,
    },
};
use tracing::debug;

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum CacheKey {
    User(String),
}

/// Query results keyed by operation and arguments.
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: HashMap<CacheKey, Player>,
}

impl QueryCache {
    pub fn get(&self, key: &CacheKey) -> Option<&Player> {
        self.entries.get(key)
    }

    pub fn store(&mut self, player: Player) {
        self.entries
            .insert(CacheKey::User(player.username.clone()), player);
    }

    /// Writes a confirmed balance into every cached record with that id.
    ///
    /// Balances only grow, so an acknowledgement that lands after a newer one
    /// never lowers the cached value.
    pub fn apply_coin_update(&mut self, update: &CoinUpdate) -> bool {
        let mut touched = false;
        for player in self.entries.values_mut().filter(|p| p.id == update.id) {
            player.coins = player.coins.max(update.coins);
            touched = true;
        }
        touched
    }

    pub fn invalidate(&mut self, key: &CacheKey) -> Option<Player> {
        self.entries.remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Wraps a gateway with an explicit cache.
///
/// - `get_user` is cache-first; only present players are stored.
/// - `create_user` stores the new player under its username.
/// - `update_coins` writes the confirmed balance through to the cached record,
///   keeping the highest balance seen when acknowledgements arrive out of order.
/// - failed calls leave the cache untouched.
pub struct CachedGateway<G> {
    inner: G,
    cache: Mutex<QueryCache>,
}

impl<G> CachedGateway<G> {
    pub fn new(inner: G) -> Self {
        Self {
            inner,
            cache: Mutex::new(QueryCache::default()),
        }
    }

    pub fn cached_user(&self, username: &str) -> Option<Player> {
        self.lock()
            .get(&CacheKey::User(username.to_string()))
            .cloned()
    }

    pub fn invalidate(&self, username: &str) -> Option<Player> {
        self.lock().invalidate(&CacheKey::User(username.to_string()))
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, QueryCache> {
        // the cache holds plain data, a poisoned lock is still usable
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<G: GameGateway> GameGateway for CachedGateway<G> {
    async fn get_user(&self, username: &str) -> Result<Option<Player>> {
        if let Some(player) = self.cached_user(username) {
            debug!(%username, "getUser served from cache");
            return Ok(Some(player));
        }
        let fetched = self.inner.get_user(username).await?;
        if let Some(player) = &fetched {
            self.lock().store(player.clone());
        }
        Ok(fetched)
    }

    async fn create_user(&self, username: &str) -> Result<Player> {
        let player = self.inner.create_user(username).await?;
        self.lock().store(player.clone());
        Ok(player)
    }

    async fn update_coins(&self, id: &str, coins: u64) -> Result<CoinUpdate> {
        let update = self.inner.update_coins(id, coins).await?;
        if !self.lock().apply_coin_update(&update) {
            debug!(%id, "coin update for uncached player");
        }
        Ok(update)
    }
}
