//! Bridge coordinator and shared context.
//!
//! [`Bridge`] is the entry point the tool front end calls into. Every
//! inventory query is one `ping`/`pong` round trip followed by a pure
//! derivation in [`crate::query`]; every transfer is one `transfer_items`
//! round trip classified into a [`TransferOutcome`].
//!
//! # Example
//!
//! ```no_run
//! use dim_inventory_bridge::{Bridge, BridgeConfig};
//!
//! # async fn example() -> dim_inventory_bridge::Result<()> {
//! let bridge = Bridge::new(BridgeConfig::default());
//! let server = bridge.serve().await?;
//!
//! // ... once the inventory client has connected:
//! let weapons = bridge.weapons_for_current_character().await?;
//! println!("{} weapons", weapons.len());
//!
//! server.shutdown().await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::BridgeConfig;
use crate::error::{Error, Result};
use crate::identifiers::{ItemId, StoreId};
use crate::protocol::{
    InventorySnapshot, Item, ItemKind, OutboundMessage, Reply, RequestKind, Store,
    TransferRequest, TransferTarget,
};
use crate::query::{self, ItemSummary};
use crate::transport::{BridgeServer, ConnectionRegistry, ServerHandle};

use super::cache::SnapshotCache;
use super::correlator::RequestCorrelator;
use super::transfer::{self, TransferOutcome};

// ============================================================================
// BridgeContext
// ============================================================================

/// State shared by the request path and the dispatcher.
///
/// One per bridge; handed to every connection by `Arc`.
pub struct BridgeContext {
    /// Validated configuration.
    config: BridgeConfig,
    /// The current client connection.
    registry: ConnectionRegistry,
    /// Pending request slots.
    correlator: RequestCorrelator,
    /// Latest pushed or pulled inventory.
    cache: SnapshotCache,
}

impl BridgeContext {
    /// Creates an idle context.
    #[must_use]
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            registry: ConnectionRegistry::new(),
            correlator: RequestCorrelator::new(),
            cache: SnapshotCache::new(),
        }
    }

    /// Returns the configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Returns the connection registry.
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Returns the request correlator.
    #[inline]
    #[must_use]
    pub fn correlator(&self) -> &RequestCorrelator {
        &self.correlator
    }

    /// Returns the snapshot cache.
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }
}

// ============================================================================
// Bridge
// ============================================================================

/// Bridge between tool calls and the inventory client.
///
/// Cheap to clone; clones share one connection, one correlator and one
/// cache.
#[derive(Clone)]
pub struct Bridge {
    context: Arc<BridgeContext>,
}

// ============================================================================
// Bridge - Display
// ============================================================================

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("port", &self.context.config.port)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Bridge - Lifecycle
// ============================================================================

impl Bridge {
    /// Creates a bridge. Nothing is bound until [`Bridge::serve`].
    #[must_use]
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            context: Arc::new(BridgeContext::new(config)),
        }
    }

    /// Returns the configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.context.config
    }

    /// Binds the WebSocket server and starts accepting clients.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if the port cannot be bound
    /// - [`Error::Tls`] if the certificate pair is invalid
    /// - [`Error::Config`] if TLS is required but unavailable
    pub async fn serve(&self) -> Result<ServerHandle> {
        let server = BridgeServer::bind(Arc::clone(&self.context)).await?;
        Ok(server.spawn())
    }

    /// Returns `true` if an inventory client is connected.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.context.registry.is_connected()
    }

    /// Returns the cached inventory without a round trip.
    #[must_use]
    pub fn cached_snapshot(&self) -> InventorySnapshot {
        self.context.cache.snapshot()
    }

    /// Returns the snapshot cache, with per-list provenance.
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &SnapshotCache {
        &self.context.cache
    }
}

// ============================================================================
// Bridge - Queries
// ============================================================================

impl Bridge {
    /// Fetches a full snapshot from the client and records it in the cache.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if no client is connected
    /// - [`Error::Timeout`] if the client does not answer in time; a `pong`
    ///   with a malformed body is dropped and counts as no answer
    pub async fn fetch_inventory(&self) -> Result<InventorySnapshot> {
        let reply = self
            .context
            .correlator
            .request(
                &self.context.registry,
                RequestKind::Pong,
                OutboundMessage::ping,
                self.context.config.inventory_timeout,
            )
            .await?;

        let Reply::Inventory(snapshot) = reply else {
            return Err(Error::protocol("ping answered with a non-inventory reply"));
        };

        debug!(
            weapons = snapshot.weapons.len(),
            armor = snapshot.armor.len(),
            stores = snapshot.stores.len(),
            "Inventory fetched"
        );
        self.context.cache.record_snapshot(&snapshot);

        Ok(snapshot)
    }

    /// Weapons owned by the named character, with every field the client
    /// sent.
    ///
    /// # Errors
    ///
    /// Same as [`Bridge::fetch_inventory`].
    pub async fn weapons_for_character(&self, name: &str) -> Result<Vec<Item>> {
        let snapshot = self.fetch_inventory().await?;
        Ok(owned_by(&snapshot, ItemKind::Weapon, name))
    }

    /// Armor owned by the named character.
    ///
    /// # Errors
    ///
    /// Same as [`Bridge::fetch_inventory`].
    pub async fn armor_for_character(&self, name: &str) -> Result<Vec<Item>> {
        let snapshot = self.fetch_inventory().await?;
        Ok(owned_by(&snapshot, ItemKind::Armor, name))
    }

    /// Weapons owned by the most recently played character.
    ///
    /// # Errors
    ///
    /// Same as [`Bridge::current_character`].
    pub async fn weapons_for_current_character(&self) -> Result<Vec<Item>> {
        self.for_current_character(ItemKind::Weapon).await
    }

    /// Armor owned by the most recently played character.
    ///
    /// # Errors
    ///
    /// Same as [`Bridge::current_character`].
    pub async fn armor_for_current_character(&self) -> Result<Vec<Item>> {
        self.for_current_character(ItemKind::Armor).await
    }

    /// Every weapon on the account, vault included, reduced to summaries.
    ///
    /// # Errors
    ///
    /// Same as [`Bridge::fetch_inventory`].
    pub async fn weapons_all(&self) -> Result<Vec<ItemSummary>> {
        let snapshot = self.fetch_inventory().await?;
        Ok(query::project(&snapshot.weapons, ItemKind::Weapon))
    }

    /// Every armor piece on the account, vault included.
    ///
    /// # Errors
    ///
    /// Same as [`Bridge::fetch_inventory`].
    pub async fn armor_all(&self) -> Result<Vec<ItemSummary>> {
        let snapshot = self.fetch_inventory().await?;
        Ok(query::project(&snapshot.armor, ItemKind::Armor))
    }

    /// Full items whose id is in `ids`: weapons first, then armor.
    ///
    /// # Errors
    ///
    /// Same as [`Bridge::fetch_inventory`].
    pub async fn items_by_ids<I>(&self, ids: I) -> Result<Vec<Item>>
    where
        I: IntoIterator<Item = ItemId>,
    {
        let ids: Vec<ItemId> = ids.into_iter().collect();
        let snapshot = self.fetch_inventory().await?;

        let items: Vec<Item> = query::select_by_ids(&snapshot.weapons, ids.iter().cloned())
            .into_iter()
            .chain(query::select_by_ids(&snapshot.armor, ids.iter().cloned()))
            .cloned()
            .collect();

        debug!(requested = ids.len(), found = items.len(), "Items selected by id");
        Ok(items)
    }

    /// The non-vault store with the latest `lastPlayed`.
    ///
    /// Uses the stores of a fresh snapshot, or the last cached stores when
    /// the client omits them from `pong`.
    ///
    /// # Errors
    ///
    /// - [`Error::NoCharacterFound`] if no character store is known
    /// - otherwise same as [`Bridge::fetch_inventory`]
    pub async fn current_character(&self) -> Result<Store> {
        self.fetch_inventory().await?;
        self.cached_current_character()
    }

    async fn for_current_character(&self, kind: ItemKind) -> Result<Vec<Item>> {
        let snapshot = self.fetch_inventory().await?;
        let character = self.cached_current_character()?;

        debug!(character = %character.name, kind = kind.as_str(), "Filtering by current character");
        Ok(owned_by(&snapshot, kind, &character.name))
    }

    fn cached_current_character(&self) -> Result<Store> {
        let stores = self.context.cache.stores();
        query::most_recent_character(&stores).cloned()
    }
}

/// Full items of `kind` owned by `name`, unprojected.
fn owned_by(snapshot: &InventorySnapshot, kind: ItemKind, name: &str) -> Vec<Item> {
    query::select_by_owner(snapshot.items(kind), name)
        .into_iter()
        .cloned()
        .collect()
}

// ============================================================================
// Bridge - Transfers
// ============================================================================

impl Bridge {
    /// Moves items to a store.
    ///
    /// Remote rejections are not errors; they come back as
    /// [`TransferOutcome::Failed`] or [`TransferOutcome::Partial`].
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if no client is connected
    /// - [`Error::Timeout`] if the client does not answer in time
    pub async fn transfer(&self, request: TransferRequest) -> Result<TransferOutcome> {
        transfer::execute(&self.context, request).await
    }

    /// Moves items to a character.
    ///
    /// # Errors
    ///
    /// Same as [`Bridge::transfer`].
    pub async fn transfer_to_character<I>(&self, ids: I, store: StoreId) -> Result<TransferOutcome>
    where
        I: IntoIterator<Item = ItemId>,
    {
        self.transfer(TransferRequest::new(ids, TransferTarget::from(store)))
            .await
    }

    /// Moves items to the vault.
    ///
    /// # Errors
    ///
    /// Same as [`Bridge::transfer`].
    pub async fn transfer_to_vault<I>(&self, ids: I) -> Result<TransferOutcome>
    where
        I: IntoIterator<Item = ItemId>,
    {
        self.transfer(TransferRequest::new(ids, TransferTarget::Vault))
            .await
    }

    /// Moves items to the most recently played character.
    ///
    /// Costs one `ping` round trip to resolve the character first.
    ///
    /// # Errors
    ///
    /// Same as [`Bridge::current_character`] and [`Bridge::transfer`].
    pub async fn transfer_to_current_character<I>(&self, ids: I) -> Result<TransferOutcome>
    where
        I: IntoIterator<Item = ItemId>,
    {
        let character = self.current_character().await?;
        info!(character = %character.name, store = %character.id, "Transferring to current character");
        self.transfer_to_character(ids, character.id).await
    }
}

// ============================================================================
// Tests
// ============================================================================
