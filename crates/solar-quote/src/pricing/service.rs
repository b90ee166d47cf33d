use std::collections::HashSet;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::catalog::{
    CatalogDocument, FlatVariant, Phase, ProductFamily, RemovalError, Variant, VariantLocation,
};
use super::ids::VariantId;
use super::product::{ProductInput, ProductSpec};
use super::rebates::RebateCalculator;
use super::store::{CatalogStore, StoreError};

/// Sole gateway to the pricing document.
///
/// One mutex guards the parsed-document cache and every
/// load, mutate, rewrite, invalidate sequence, so concurrent admin edits
/// serialize instead of clobbering each other.
pub struct CatalogService<S> {
    store: Arc<S>,
    cache: Mutex<Option<Arc<CatalogDocument>>>,
}

/// Identifier rewritten by a normalization pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdMigration {
    /// `None` when the option had no identifier at all.
    pub previous: Option<String>,
    pub assigned: VariantId,
}

/// Cheapest post-rebate price per family, used for "from $X" teasers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MinimumPrices {
    pub solar: Option<f64>,
    pub battery: Option<f64>,
    pub ev: Option<f64>,
    pub inverter: Option<f64>,
}

/// Error raised by catalog reads and mutations.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("pricing catalog unavailable: {0}")]
    Unavailable(#[source] StoreError),
    #[error("failed to persist pricing catalog: {0}")]
    Persist(#[source] StoreError),
    #[error("product {id} not found")]
    ProductNotFound { id: String },
    #[error("brand '{brand_key}' not found under {phase} {family}")]
    BrandNotFound {
        phase: Phase,
        family: ProductFamily,
        brand_key: String,
    },
    #[error("no {family} option {id} at {phase} {brand_key}[{index}]")]
    VariantNotFound {
        id: String,
        phase: Phase,
        family: ProductFamily,
        brand_key: String,
        index: usize,
    },
    #[error("invalid product: {0}")]
    InvalidProduct(String),
}

type CacheSlot = Option<Arc<CatalogDocument>>;

impl<S> CatalogService<S>
where
    S: CatalogStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            cache: Mutex::new(None),
        }
    }

    /// Cached document, parsing the backing store on first use.
    ///
    /// The cache lock is held across that first read, so an async caller
    /// blocks its worker thread until the store returns. Later calls only
    /// clone the cached `Arc`. Move calls onto a blocking pool if the store
    /// can be slow.
    pub fn load_catalog(&self) -> Result<Arc<CatalogDocument>, CatalogError> {
        let mut cache = self.cache.lock();
        self.load_locked(&mut cache)
    }

    /// Drop the cached document and parse the backing store again.
    pub fn reload_catalog(&self) -> Result<Arc<CatalogDocument>, CatalogError> {
        let mut cache = self.cache.lock();
        *cache = None;
        self.load_locked(&mut cache)
    }

    /// Exact-size lookup. `Ok(None)` covers unknown brands and sizes alike.
    pub fn find_variant(
        &self,
        phase: Phase,
        family: ProductFamily,
        brand_key: &str,
        size: f64,
    ) -> Result<Option<Variant>, CatalogError> {
        let catalog = self.load_catalog()?;
        Ok(catalog.find_variant(phase, family, brand_key, size))
    }

    /// Exact-size lookup projected into the admin record shape.
    pub fn find_record(
        &self,
        phase: Phase,
        family: ProductFamily,
        brand_key: &str,
        size: f64,
    ) -> Result<Option<FlatVariant>, CatalogError> {
        let catalog = self.load_catalog()?;
        Ok(catalog
            .find_location(phase, family, brand_key, size)
            .and_then(|location| catalog.flat_at(&location)))
    }

    /// Every option as a flat record, assigning UUIDs to any option still
    /// carrying a legacy or missing identifier.
    pub fn list_all_variants(&self) -> Result<Vec<FlatVariant>, CatalogError> {
        let mut cache = self.cache.lock();
        let (catalog, _) = self.normalize_locked(&mut cache)?;
        Ok(catalog.flatten())
    }

    /// Run the identifier migration on its own, returning what changed.
    pub fn normalize_ids(&self) -> Result<Vec<IdMigration>, CatalogError> {
        let mut cache = self.cache.lock();
        let (_, migrations) = self.normalize_locked(&mut cache)?;
        Ok(migrations)
    }

    pub fn min_prices(&self) -> Result<MinimumPrices, CatalogError> {
        let catalog = self.load_catalog()?;
        Ok(MinimumPrices {
            solar: catalog.min_price(ProductFamily::Solar),
            battery: catalog.min_price(ProductFamily::Battery),
            ev: catalog.min_price(ProductFamily::EvCharger),
            inverter: catalog.min_price(ProductFamily::Inverter),
        })
    }

    /// Calculator bound to the rule constants of the current document.
    pub fn rebate_calculator(&self) -> Result<RebateCalculator, CatalogError> {
        let catalog = self.load_catalog()?;
        Ok(RebateCalculator::new(catalog.rebates.clone()))
    }

    pub fn add_variant(&self, input: ProductInput) -> Result<FlatVariant, CatalogError> {
        input.validate().map_err(CatalogError::InvalidProduct)?;

        let mut cache = self.cache.lock();
        let current = self.load_locked(&mut cache)?;
        let mut document = (*current).clone();

        let rebate = rebate_for(&document, &input);
        let brand_key = input.brand_key();
        let variant = input.to_variant(VariantId::generate(), rebate);
        let profile = document
            .brand_profile(input.phase, input.family(), &brand_key)
            .map(|existing| existing.overlaid_with(input.brand_update()))
            .unwrap_or_else(|| input.brand_update().into());
        let location = document.insert(input.phase, &brand_key, profile, variant);

        let catalog = self.persist_locked(&mut cache, document)?;
        let record = flat_record(&catalog, &location)?;
        info!(
            id = %record.id,
            phase = %location.phase,
            family = %location.family,
            brand = %location.brand_key,
            "added catalog option"
        );
        Ok(record)
    }

    /// Replace an option, moving it when phase, family, or brand changed.
    /// The stored identifier is carried over unchanged.
    pub fn update_variant(
        &self,
        raw_id: &str,
        input: ProductInput,
    ) -> Result<FlatVariant, CatalogError> {
        input.validate().map_err(CatalogError::InvalidProduct)?;

        let mut cache = self.cache.lock();
        let current = self.load_locked(&mut cache)?;
        let mut document = (*current).clone();

        let source = document
            .locate(raw_id, &Phase::ALL, &ProductFamily::ALL)
            .ok_or_else(|| CatalogError::ProductNotFound {
                id: raw_id.to_string(),
            })?;

        let rebate = rebate_for(&document, &input);
        let brand_key = input.brand_key();
        // Computed before removal so emptying the source brand cannot drop
        // metadata the destination entry should inherit.
        let profile = document
            .brand_profile(input.phase, input.family(), &brand_key)
            .or_else(|| {
                (source.brand_key == brand_key)
                    .then(|| document.brand_profile(source.phase, source.family, &brand_key))
                    .flatten()
            })
            .map(|existing| existing.overlaid_with(input.brand_update()))
            .unwrap_or_else(|| input.brand_update().into());

        let (mut previous, _) =
            document
                .remove_at(&source)
                .map_err(|_| CatalogError::ProductNotFound {
                    id: raw_id.to_string(),
                })?;

        let mut replacement = input.to_variant(previous.id().clone(), rebate);
        replacement
            .extra_mut()
            .extend(std::mem::take(previous.extra_mut()));
        let destination = document.insert(input.phase, &brand_key, profile, replacement);

        let catalog = self.persist_locked(&mut cache, document)?;
        let record = flat_record(&catalog, &destination)?;
        if source.family != destination.family
            || source.phase != destination.phase
            || source.brand_key != destination.brand_key
        {
            let from = format!("{}/{}/{}", source.phase, source.family, source.brand_key);
            let to = format!(
                "{}/{}/{}",
                destination.phase, destination.family, destination.brand_key
            );
            info!(id = %record.id, %from, %to, "moved catalog option");
        } else {
            info!(id = %record.id, "updated catalog option");
        }
        Ok(record)
    }

    /// Remove the option at a position taken from [`Self::list_all_variants`].
    /// The identifier must still sit at that position.
    pub fn delete_variant(
        &self,
        raw_id: &str,
        phase: Phase,
        family: ProductFamily,
        brand_key: &str,
        index: usize,
    ) -> Result<FlatVariant, CatalogError> {
        let mut cache = self.cache.lock();
        let current = self.load_locked(&mut cache)?;
        let mut document = (*current).clone();

        let location = VariantLocation {
            phase,
            family,
            brand_key: brand_key.to_string(),
            index,
        };
        let not_found = || CatalogError::VariantNotFound {
            id: raw_id.to_string(),
            phase,
            family,
            brand_key: brand_key.to_string(),
            index,
        };

        if document.brand_profile(phase, family, brand_key).is_none() {
            return Err(CatalogError::BrandNotFound {
                phase,
                family,
                brand_key: brand_key.to_string(),
            });
        }

        let record = document.flat_at(&location).ok_or_else(not_found)?;
        if !record.id.matches(raw_id) {
            return Err(not_found());
        }

        document.remove_at(&location).map_err(|err| match err {
            RemovalError::Brand => CatalogError::BrandNotFound {
                phase,
                family,
                brand_key: brand_key.to_string(),
            },
            RemovalError::Index => not_found(),
        })?;

        self.persist_locked(&mut cache, document)?;
        info!(id = %record.id, %phase, %family, brand = brand_key, "deleted catalog option");
        Ok(record)
    }

    fn load_locked(&self, cache: &mut CacheSlot) -> Result<Arc<CatalogDocument>, CatalogError> {
        if let Some(catalog) = cache.as_ref() {
            return Ok(Arc::clone(catalog));
        }

        let catalog = Arc::new(self.store.load().map_err(CatalogError::Unavailable)?);
        debug!(version = %catalog.version, "pricing catalog cached");
        *cache = Some(Arc::clone(&catalog));
        Ok(catalog)
    }

    fn normalize_locked(
        &self,
        cache: &mut CacheSlot,
    ) -> Result<(Arc<CatalogDocument>, Vec<IdMigration>), CatalogError> {
        let current = self.load_locked(cache)?;
        let mut document = (*current).clone();
        let migrations = assign_uuids(&mut document);

        if migrations.is_empty() {
            return Ok((current, migrations));
        }

        for migration in &migrations {
            match &migration.previous {
                Some(previous) => warn!(
                    previous = %previous,
                    assigned = %migration.assigned,
                    "migrated catalog identifier"
                ),
                None => warn!(
                    assigned = %migration.assigned,
                    "assigned missing catalog identifier"
                ),
            }
        }

        let catalog = self.persist_locked(cache, document)?;
        info!(count = migrations.len(), "normalized catalog identifiers");
        Ok((catalog, migrations))
    }

    /// Stamp, rewrite, invalidate, and reload.
    fn persist_locked(
        &self,
        cache: &mut CacheSlot,
        mut document: CatalogDocument,
    ) -> Result<Arc<CatalogDocument>, CatalogError> {
        document.last_updated = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        self.store.save(&document).map_err(CatalogError::Persist)?;
        *cache = None;
        self.load_locked(cache)
    }
}

fn flat_record(
    catalog: &CatalogDocument,
    location: &VariantLocation,
) -> Result<FlatVariant, CatalogError> {
    catalog
        .flat_at(location)
        .ok_or_else(|| CatalogError::VariantNotFound {
            id: String::new(),
            phase: location.phase,
            family: location.family,
            brand_key: location.brand_key.clone(),
            index: location.index,
        })
}

/// Rebate to record for a new or edited option: the form's figure when
/// given, otherwise computed from the document's rule constants.
fn rebate_for(document: &CatalogDocument, input: &ProductInput) -> Option<f64> {
    if let Some(rebate) = input.rebate() {
        return Some(rebate);
    }

    let calculator = RebateCalculator::new(document.rebates.clone());
    match input.spec {
        ProductSpec::Solar { size_kw, .. } => Some(calculator.calculate_solar_rebate(size_kw)),
        ProductSpec::Battery { capacity_kwh, .. } => {
            let brand_key = input.brand_key();
            let flagged = input.state_rebate_excluded.unwrap_or_else(|| {
                document
                    .section(input.phase)
                    .battery_brand_flagged(&brand_key)
            });
            let excluded = calculator.is_excluded_brand(&brand_key, flagged);
            Some(
                calculator
                    .calculate_battery_rebate(capacity_kwh, excluded)
                    .total,
            )
        }
        ProductSpec::Inverter { .. } | ProductSpec::EvCharger { .. } => None,
    }
}

/// Give every option a unique UUID. Legacy, missing, and duplicate
/// identifiers are replaced; the first holder of a duplicate keeps it.
fn assign_uuids(document: &mut CatalogDocument) -> Vec<IdMigration> {
    let mut seen = HashSet::new();
    document.visit_ids_mut(|id| {
        if let VariantId::Uuid(uuid) = id {
            seen.insert(*uuid);
        }
    });

    let mut kept = HashSet::new();
    let mut migrations = Vec::new();
    document.visit_ids_mut(|id| {
        if let VariantId::Uuid(uuid) = id {
            if kept.insert(*uuid) {
                return;
            }
        }

        let fresh = loop {
            let candidate = Uuid::new_v4();
            if seen.insert(candidate) {
                break candidate;
            }
        };
        kept.insert(fresh);

        let previous = id.to_string();
        *id = VariantId::Uuid(fresh);
        migrations.push(IdMigration {
            previous: (!previous.is_empty()).then_some(previous),
            assigned: id.clone(),
        });
    });

    migrations
}
