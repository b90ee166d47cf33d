use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ids::{legacy_slug, VariantId};
use super::rebates::RebateRules;

/// Electrical supply configuration a catalog section is priced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    #[serde(
        rename = "single_phase",
        alias = "single",
        alias = "single-phase",
        alias = "1"
    )]
    SinglePhase,
    #[serde(
        rename = "three_phase",
        alias = "three",
        alias = "three-phase",
        alias = "3"
    )]
    ThreePhase,
}

impl Phase {
    pub const ALL: [Phase; 2] = [Phase::SinglePhase, Phase::ThreePhase];

    pub fn key(&self) -> &'static str {
        match self {
            Phase::SinglePhase => "single_phase",
            Phase::ThreePhase => "three_phase",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// The four product families a phase section lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProductFamily {
    #[serde(rename = "solar", alias = "solar_panels")]
    Solar,
    #[serde(rename = "inverter", alias = "hybrid_inverters")]
    Inverter,
    #[serde(rename = "battery", alias = "batteries")]
    Battery,
    #[serde(rename = "ev", alias = "ev_charger", alias = "ev_chargers")]
    EvCharger,
}

impl ProductFamily {
    pub const ALL: [ProductFamily; 4] = [
        ProductFamily::Solar,
        ProductFamily::Inverter,
        ProductFamily::Battery,
        ProductFamily::EvCharger,
    ];

    /// Tag used by request payloads and legacy identifiers.
    pub fn product_type(&self) -> &'static str {
        match self {
            ProductFamily::Solar => "solar",
            ProductFamily::Inverter => "inverter",
            ProductFamily::Battery => "battery",
            ProductFamily::EvCharger => "ev",
        }
    }

    /// Key of the brand map inside a phase section.
    pub fn catalog_key(&self) -> &'static str {
        match self {
            ProductFamily::Solar => "solar_panels",
            ProductFamily::Inverter => "hybrid_inverters",
            ProductFamily::Battery => "batteries",
            ProductFamily::EvCharger => "ev_chargers",
        }
    }
}

impl fmt::Display for ProductFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.product_type())
    }
}

/// Root pricing document. Unknown fields survive a rewrite untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub version: String,
    #[serde(rename = "lastUpdated", default)]
    pub last_updated: String,
    pub single_phase: PhaseSection,
    pub three_phase: PhaseSection,
    #[serde(default)]
    pub rebates: RebateRules,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_in: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseSection {
    #[serde(default)]
    pub solar_panels: BTreeMap<String, BrandEntry<SolarPackage>>,
    #[serde(default)]
    pub hybrid_inverters: BTreeMap<String, BrandEntry<InverterOption>>,
    #[serde(default)]
    pub batteries: BTreeMap<String, BrandEntry<BatteryOption>>,
    #[serde(default)]
    pub ev_chargers: BTreeMap<String, BrandEntry<EvChargerOption>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Manufacturer or series listing owning an ordered list of priced options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandEntry<V> {
    pub brand: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warranty_years: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_warranty_years: Option<u32>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub requires_hybrid_inverter: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chemistry: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub state_rebate_excluded: bool,
    #[serde(default = "Vec::new")]
    pub options: Vec<V>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl<V> BrandEntry<V> {
    pub fn from_profile(profile: BrandProfile) -> Self {
        Self {
            brand: profile.brand,
            model: profile.model,
            warranty_years: profile.warranty_years,
            performance_warranty_years: profile.performance_warranty_years,
            requires_hybrid_inverter: profile.requires_hybrid_inverter,
            chemistry: profile.chemistry,
            state_rebate_excluded: profile.state_rebate_excluded,
            options: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Overwrite the brand-level metadata, leaving options untouched.
    pub fn apply_profile(&mut self, profile: BrandProfile) {
        self.brand = profile.brand;
        self.model = profile.model;
        self.warranty_years = profile.warranty_years;
        self.performance_warranty_years = profile.performance_warranty_years;
        self.requires_hybrid_inverter = profile.requires_hybrid_inverter;
        self.chemistry = profile.chemistry;
        self.state_rebate_excluded = profile.state_rebate_excluded;
    }

    pub fn profile(&self) -> BrandProfile {
        BrandProfile {
            brand: self.brand.clone(),
            model: self.model.clone(),
            warranty_years: self.warranty_years,
            performance_warranty_years: self.performance_warranty_years,
            requires_hybrid_inverter: self.requires_hybrid_inverter,
            chemistry: self.chemistry.clone(),
            state_rebate_excluded: self.state_rebate_excluded,
        }
    }
}

/// Brand-level metadata used when a mutation has to create a brand entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrandProfile {
    pub brand: String,
    pub model: Option<String>,
    pub warranty_years: Option<u32>,
    pub performance_warranty_years: Option<u32>,
    pub requires_hybrid_inverter: bool,
    pub chemistry: Option<String>,
    pub state_rebate_excluded: bool,
}

/// Brand metadata carried by an admin edit. `None` leaves the stored value
/// alone, including for the two flags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrandUpdate {
    pub brand: String,
    pub model: Option<String>,
    pub warranty_years: Option<u32>,
    pub performance_warranty_years: Option<u32>,
    pub requires_hybrid_inverter: Option<bool>,
    pub chemistry: Option<String>,
    pub state_rebate_excluded: Option<bool>,
}

impl BrandProfile {
    /// Apply form-supplied metadata on top of an existing profile, keeping
    /// whatever the form leaves blank.
    pub fn overlaid_with(self, update: BrandUpdate) -> BrandProfile {
        BrandProfile {
            brand: if update.brand.is_empty() {
                self.brand
            } else {
                update.brand
            },
            model: update.model.or(self.model),
            warranty_years: update.warranty_years.or(self.warranty_years),
            performance_warranty_years: update
                .performance_warranty_years
                .or(self.performance_warranty_years),
            requires_hybrid_inverter: update
                .requires_hybrid_inverter
                .unwrap_or(self.requires_hybrid_inverter),
            chemistry: update.chemistry.or(self.chemistry),
            state_rebate_excluded: update
                .state_rebate_excluded
                .unwrap_or(self.state_rebate_excluded),
        }
    }
}

impl From<BrandUpdate> for BrandProfile {
    fn from(update: BrandUpdate) -> Self {
        BrandProfile::default().overlaid_with(update)
    }
}

/// Shared accessors over the four family-specific option records.
pub trait CatalogVariant {
    const FAMILY: ProductFamily;

    fn id(&self) -> &VariantId;
    fn id_mut(&mut self) -> &mut VariantId;
    /// The figure point lookups match against (kW or kWh).
    fn size(&self) -> f64;
    fn price_after_rebate(&self) -> f64;
    fn rrp(&self) -> Option<f64>;

    fn recorded_rebate(&self) -> Option<f64> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolarPackage {
    #[serde(default)]
    pub id: VariantId,
    pub size_kw: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panel_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panel_watts: Option<u32>,
    pub price_after_rebate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rrp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rebate: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InverterOption {
    #[serde(default)]
    pub id: VariantId,
    pub power_kw: f64,
    pub price_after_rebate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rrp: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryOption {
    #[serde(default)]
    pub id: VariantId,
    pub capacity_kwh: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_kw: Option<f64>,
    pub price_after_rebate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rrp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rebate: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvChargerOption {
    #[serde(default)]
    pub id: VariantId,
    pub power_kw: f64,
    pub price_after_rebate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rrp: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CatalogVariant for SolarPackage {
    const FAMILY: ProductFamily = ProductFamily::Solar;

    fn id(&self) -> &VariantId {
        &self.id
    }
    fn id_mut(&mut self) -> &mut VariantId {
        &mut self.id
    }
    fn size(&self) -> f64 {
        self.size_kw
    }
    fn price_after_rebate(&self) -> f64 {
        self.price_after_rebate
    }
    fn rrp(&self) -> Option<f64> {
        self.rrp
    }
    fn recorded_rebate(&self) -> Option<f64> {
        self.rebate
    }
}

impl CatalogVariant for InverterOption {
    const FAMILY: ProductFamily = ProductFamily::Inverter;

    fn id(&self) -> &VariantId {
        &self.id
    }
    fn id_mut(&mut self) -> &mut VariantId {
        &mut self.id
    }
    fn size(&self) -> f64 {
        self.power_kw
    }
    fn price_after_rebate(&self) -> f64 {
        self.price_after_rebate
    }
    fn rrp(&self) -> Option<f64> {
        self.rrp
    }
}

impl CatalogVariant for BatteryOption {
    const FAMILY: ProductFamily = ProductFamily::Battery;

    fn id(&self) -> &VariantId {
        &self.id
    }
    fn id_mut(&mut self) -> &mut VariantId {
        &mut self.id
    }
    fn size(&self) -> f64 {
        self.capacity_kwh
    }
    fn price_after_rebate(&self) -> f64 {
        self.price_after_rebate
    }
    fn rrp(&self) -> Option<f64> {
        self.rrp
    }
    fn recorded_rebate(&self) -> Option<f64> {
        self.rebate
    }
}

impl CatalogVariant for EvChargerOption {
    const FAMILY: ProductFamily = ProductFamily::EvCharger;

    fn id(&self) -> &VariantId {
        &self.id
    }
    fn id_mut(&mut self) -> &mut VariantId {
        &mut self.id
    }
    fn size(&self) -> f64 {
        self.power_kw
    }
    fn price_after_rebate(&self) -> f64 {
        self.price_after_rebate
    }
    fn rrp(&self) -> Option<f64> {
        self.rrp
    }
}

/// A priced option of any family.
#[derive(Debug, Clone, PartialEq)]
pub enum Variant {
    Solar(SolarPackage),
    Inverter(InverterOption),
    Battery(BatteryOption),
    EvCharger(EvChargerOption),
}

impl Variant {
    pub fn family(&self) -> ProductFamily {
        match self {
            Variant::Solar(_) => ProductFamily::Solar,
            Variant::Inverter(_) => ProductFamily::Inverter,
            Variant::Battery(_) => ProductFamily::Battery,
            Variant::EvCharger(_) => ProductFamily::EvCharger,
        }
    }

    pub fn id(&self) -> &VariantId {
        match self {
            Variant::Solar(option) => option.id(),
            Variant::Inverter(option) => option.id(),
            Variant::Battery(option) => option.id(),
            Variant::EvCharger(option) => option.id(),
        }
    }

    pub fn size(&self) -> f64 {
        match self {
            Variant::Solar(option) => option.size(),
            Variant::Inverter(option) => option.size(),
            Variant::Battery(option) => option.size(),
            Variant::EvCharger(option) => option.size(),
        }
    }

    pub fn price_after_rebate(&self) -> f64 {
        match self {
            Variant::Solar(option) => option.price_after_rebate(),
            Variant::Inverter(option) => option.price_after_rebate(),
            Variant::Battery(option) => option.price_after_rebate(),
            Variant::EvCharger(option) => option.price_after_rebate(),
        }
    }

    /// List price, falling back to the post-rebate price when none is recorded.
    pub fn rrp(&self) -> f64 {
        let rrp = match self {
            Variant::Solar(option) => option.rrp(),
            Variant::Inverter(option) => option.rrp(),
            Variant::Battery(option) => option.rrp(),
            Variant::EvCharger(option) => option.rrp(),
        };
        rrp.unwrap_or_else(|| self.price_after_rebate())
    }

    pub fn recorded_rebate(&self) -> Option<f64> {
        match self {
            Variant::Solar(option) => option.recorded_rebate(),
            Variant::Battery(option) => option.recorded_rebate(),
            Variant::Inverter(_) | Variant::EvCharger(_) => None,
        }
    }

    /// Discount between list and post-rebate price, if there is one to show.
    pub fn discount(&self) -> Option<f64> {
        let savings = self.rrp() - self.price_after_rebate();
        (savings > 0.0).then_some(savings)
    }

    /// Fields the typed record does not model, carried across rewrites.
    pub fn extra_mut(&mut self) -> &mut Map<String, Value> {
        match self {
            Variant::Solar(option) => &mut option.extra,
            Variant::Inverter(option) => &mut option.extra,
            Variant::Battery(option) => &mut option.extra,
            Variant::EvCharger(option) => &mut option.extra,
        }
    }
}

/// Position of an option inside the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantLocation {
    pub phase: Phase,
    pub family: ProductFamily,
    pub brand_key: String,
    pub index: usize,
}

/// Uniform projection of an option used by admin listings and exports.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatVariant {
    pub id: VariantId,
    pub phase: Phase,
    pub product_type: ProductFamily,
    pub brand: String,
    pub brand_key: String,
    pub model: Option<String>,
    pub size_kw: Option<f64>,
    pub capacity_kwh: Option<f64>,
    pub power_kw: Option<f64>,
    pub panel_count: Option<u32>,
    pub panel_watts: Option<u32>,
    pub price_after_rebate: f64,
    pub rrp: f64,
    pub rebate: Option<f64>,
    pub warranty_years: Option<u32>,
    pub performance_warranty_years: Option<u32>,
    pub index: usize,
}

impl FlatVariant {
    fn new(location: &VariantLocation, profile: &BrandProfile, variant: &Variant) -> Self {
        let (size_kw, capacity_kwh, power_kw, panel_count, panel_watts) = match variant {
            Variant::Solar(option) => (
                Some(option.size_kw),
                None,
                None,
                option.panel_count,
                option.panel_watts,
            ),
            Variant::Inverter(option) => (None, None, Some(option.power_kw), None, None),
            Variant::Battery(option) => (
                None,
                Some(option.capacity_kwh),
                option.power_kw,
                None,
                None,
            ),
            Variant::EvCharger(option) => (None, None, Some(option.power_kw), None, None),
        };

        Self {
            id: variant.id().clone(),
            phase: location.phase,
            product_type: location.family,
            brand: profile.brand.clone(),
            brand_key: location.brand_key.clone(),
            model: profile.model.clone(),
            size_kw,
            capacity_kwh,
            power_kw,
            panel_count,
            panel_watts,
            price_after_rebate: variant.price_after_rebate(),
            rrp: variant.rrp(),
            rebate: variant.recorded_rebate(),
            warranty_years: profile.warranty_years,
            performance_warranty_years: profile.performance_warranty_years,
            index: location.index,
        }
    }
}

/// Sizes compare exactly; the tolerance only absorbs float parsing noise.
fn same_size(left: f64, right: f64) -> bool {
    (left - right).abs() < 1e-9
}

fn collect_family<V>(
    phase: Phase,
    brands: &BTreeMap<String, BrandEntry<V>>,
    wrap: fn(V) -> Variant,
    out: &mut Vec<FlatVariant>,
) where
    V: CatalogVariant + Clone,
{
    for (brand_key, entry) in brands {
        let profile = entry.profile();
        for (index, option) in entry.options.iter().enumerate() {
            let location = VariantLocation {
                phase,
                family: V::FAMILY,
                brand_key: brand_key.clone(),
                index,
            };
            out.push(FlatVariant::new(&location, &profile, &wrap(option.clone())));
        }
    }
}

type LocateMatch<'a> = dyn Fn(Phase, ProductFamily, &str, &VariantId, f64) -> bool + 'a;

fn locate_in_family<V>(
    phase: Phase,
    brands: &BTreeMap<String, BrandEntry<V>>,
    matches: &LocateMatch<'_>,
) -> Option<VariantLocation>
where
    V: CatalogVariant,
{
    brands.iter().find_map(|(brand_key, entry)| {
        entry
            .options
            .iter()
            .position(|option| matches(phase, V::FAMILY, brand_key, option.id(), option.size()))
            .map(|index| VariantLocation {
                phase,
                family: V::FAMILY,
                brand_key: brand_key.clone(),
                index,
            })
    })
}

fn remove_from_family<V>(
    brands: &mut BTreeMap<String, BrandEntry<V>>,
    brand_key: &str,
    index: usize,
) -> Result<(V, BrandProfile), RemovalError> {
    let entry = brands.get_mut(brand_key).ok_or(RemovalError::Brand)?;
    if index >= entry.options.len() {
        return Err(RemovalError::Index);
    }

    let option = entry.options.remove(index);
    let profile = entry.profile();
    if entry.options.is_empty() {
        brands.remove(brand_key);
    }

    Ok((option, profile))
}

fn insert_into_family<V>(
    brands: &mut BTreeMap<String, BrandEntry<V>>,
    brand_key: &str,
    profile: BrandProfile,
    option: V,
) -> usize {
    let entry = match brands.entry(brand_key.to_string()) {
        Entry::Occupied(occupied) => {
            let entry = occupied.into_mut();
            entry.apply_profile(profile);
            entry
        }
        Entry::Vacant(vacant) => vacant.insert(BrandEntry::from_profile(profile)),
    };
    entry.options.push(option);
    entry.options.len() - 1
}

fn ids_in_family<V>(
    brands: &mut BTreeMap<String, BrandEntry<V>>,
    visit: &mut dyn FnMut(&mut VariantId),
) where
    V: CatalogVariant,
{
    for entry in brands.values_mut() {
        for option in entry.options.iter_mut() {
            visit(option.id_mut());
        }
    }
}

/// Why a positional removal failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalError {
    Brand,
    Index,
}

impl PhaseSection {
    /// Whether the battery brand carries the state-rebate exclusion flag.
    pub fn battery_brand_flagged(&self, brand_key: &str) -> bool {
        self.batteries
            .get(brand_key)
            .map(|entry| entry.state_rebate_excluded)
            .unwrap_or(false)
    }
}

impl CatalogDocument {
    pub fn section(&self, phase: Phase) -> &PhaseSection {
        match phase {
            Phase::SinglePhase => &self.single_phase,
            Phase::ThreePhase => &self.three_phase,
        }
    }

    pub fn section_mut(&mut self, phase: Phase) -> &mut PhaseSection {
        match phase {
            Phase::SinglePhase => &mut self.single_phase,
            Phase::ThreePhase => &mut self.three_phase,
        }
    }

    /// Exact-size lookup under one brand. Returns `None` for unknown brands.
    pub fn find_variant(
        &self,
        phase: Phase,
        family: ProductFamily,
        brand_key: &str,
        size: f64,
    ) -> Option<Variant> {
        self.find_location(phase, family, brand_key, size)
            .and_then(|location| self.variant_at(&location))
    }

    pub fn find_location(
        &self,
        phase: Phase,
        family: ProductFamily,
        brand_key: &str,
        size: f64,
    ) -> Option<VariantLocation> {
        self.locate_with(&[phase], &[family], &|_, _, key, _, option_size| {
            key == brand_key && same_size(option_size, size)
        })
    }

    pub fn variant_at(&self, location: &VariantLocation) -> Option<Variant> {
        let section = self.section(location.phase);
        let key = location.brand_key.as_str();
        let index = location.index;
        match location.family {
            ProductFamily::Solar => section
                .solar_panels
                .get(key)
                .and_then(|entry| entry.options.get(index))
                .cloned()
                .map(Variant::Solar),
            ProductFamily::Inverter => section
                .hybrid_inverters
                .get(key)
                .and_then(|entry| entry.options.get(index))
                .cloned()
                .map(Variant::Inverter),
            ProductFamily::Battery => section
                .batteries
                .get(key)
                .and_then(|entry| entry.options.get(index))
                .cloned()
                .map(Variant::Battery),
            ProductFamily::EvCharger => section
                .ev_chargers
                .get(key)
                .and_then(|entry| entry.options.get(index))
                .cloned()
                .map(Variant::EvCharger),
        }
    }

    pub fn brand_profile(
        &self,
        phase: Phase,
        family: ProductFamily,
        brand_key: &str,
    ) -> Option<BrandProfile> {
        let section = self.section(phase);
        match family {
            ProductFamily::Solar => section.solar_panels.get(brand_key).map(BrandEntry::profile),
            ProductFamily::Inverter => section
                .hybrid_inverters
                .get(brand_key)
                .map(BrandEntry::profile),
            ProductFamily::Battery => section.batteries.get(brand_key).map(BrandEntry::profile),
            ProductFamily::EvCharger => section.ev_chargers.get(brand_key).map(BrandEntry::profile),
        }
    }

    pub fn flat_at(&self, location: &VariantLocation) -> Option<FlatVariant> {
        let variant = self.variant_at(location)?;
        let profile = self.brand_profile(location.phase, location.family, &location.brand_key)?;
        Some(FlatVariant::new(location, &profile, &variant))
    }

    /// Locate an option by identifier within the given phases and families.
    ///
    /// Exact identifier matches win; otherwise the identifier is compared
    /// against the legacy slug each option would have been given.
    pub fn locate(
        &self,
        raw_id: &str,
        phases: &[Phase],
        families: &[ProductFamily],
    ) -> Option<VariantLocation> {
        let raw_id = raw_id.trim();
        if raw_id.is_empty() {
            return None;
        }

        self.locate_with(phases, families, &|_, _, _, id, _| id.matches(raw_id))
            .or_else(|| {
                self.locate_with(phases, families, &|phase, family, brand_key, _, size| {
                    legacy_slug(family.product_type(), phase.key(), brand_key, size) == raw_id
                })
            })
    }

    fn locate_with(
        &self,
        phases: &[Phase],
        families: &[ProductFamily],
        matches: &LocateMatch<'_>,
    ) -> Option<VariantLocation> {
        phases.iter().find_map(|phase| {
            let section = self.section(*phase);
            families.iter().find_map(|family| match family {
                ProductFamily::Solar => locate_in_family(*phase, &section.solar_panels, matches),
                ProductFamily::Inverter => {
                    locate_in_family(*phase, &section.hybrid_inverters, matches)
                }
                ProductFamily::Battery => locate_in_family(*phase, &section.batteries, matches),
                ProductFamily::EvCharger => locate_in_family(*phase, &section.ev_chargers, matches),
            })
        })
    }

    /// Remove the option at `location`, dropping its brand entry once empty.
    pub fn remove_at(
        &mut self,
        location: &VariantLocation,
    ) -> Result<(Variant, BrandProfile), RemovalError> {
        let section = self.section_mut(location.phase);
        let key = location.brand_key.as_str();
        let index = location.index;
        match location.family {
            ProductFamily::Solar => remove_from_family(&mut section.solar_panels, key, index)
                .map(|(option, profile)| (Variant::Solar(option), profile)),
            ProductFamily::Inverter => remove_from_family(&mut section.hybrid_inverters, key, index)
                .map(|(option, profile)| (Variant::Inverter(option), profile)),
            ProductFamily::Battery => remove_from_family(&mut section.batteries, key, index)
                .map(|(option, profile)| (Variant::Battery(option), profile)),
            ProductFamily::EvCharger => remove_from_family(&mut section.ev_chargers, key, index)
                .map(|(option, profile)| (Variant::EvCharger(option), profile)),
        }
    }

    /// Append an option under `brand_key`. The brand entry is created from
    /// `profile`, or has its metadata replaced by it when it already exists.
    pub fn insert(
        &mut self,
        phase: Phase,
        brand_key: &str,
        profile: BrandProfile,
        variant: Variant,
    ) -> VariantLocation {
        let family = variant.family();
        let section = self.section_mut(phase);
        let index = match variant {
            Variant::Solar(option) => {
                insert_into_family(&mut section.solar_panels, brand_key, profile, option)
            }
            Variant::Inverter(option) => {
                insert_into_family(&mut section.hybrid_inverters, brand_key, profile, option)
            }
            Variant::Battery(option) => {
                insert_into_family(&mut section.batteries, brand_key, profile, option)
            }
            Variant::EvCharger(option) => {
                insert_into_family(&mut section.ev_chargers, brand_key, profile, option)
            }
        };

        VariantLocation {
            phase,
            family,
            brand_key: brand_key.to_string(),
            index,
        }
    }

    /// Visit every option identifier in document order.
    pub fn visit_ids_mut(&mut self, mut visit: impl FnMut(&mut VariantId)) {
        for phase in Phase::ALL {
            let section = self.section_mut(phase);
            ids_in_family(&mut section.solar_panels, &mut visit);
            ids_in_family(&mut section.hybrid_inverters, &mut visit);
            ids_in_family(&mut section.batteries, &mut visit);
            ids_in_family(&mut section.ev_chargers, &mut visit);
        }
    }

    /// Project every option into a flat record, in document order.
    pub fn flatten(&self) -> Vec<FlatVariant> {
        let mut records = Vec::new();
        for phase in Phase::ALL {
            let section = self.section(phase);
            collect_family(phase, &section.solar_panels, Variant::Solar, &mut records);
            collect_family(phase, &section.hybrid_inverters, Variant::Inverter, &mut records);
            collect_family(phase, &section.batteries, Variant::Battery, &mut records);
            collect_family(phase, &section.ev_chargers, Variant::EvCharger, &mut records);
        }
        records
    }

    /// Lowest post-rebate price in a family across both phases.
    pub fn min_price(&self, family: ProductFamily) -> Option<f64> {
        self.flatten()
            .into_iter()
            .filter(|record| record.product_type == family)
            .map(|record| record.price_after_rebate)
            .fold(None, |lowest: Option<f64>, price| match lowest {
                Some(current) if current <= price => Some(current),
                _ => Some(price),
            })
    }
}
