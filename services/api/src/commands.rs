use crate::infra::{
    file_catalog_service, parse_non_negative, parse_phase, parse_system, FileCatalogService,
};
use clap::Args;
use solar_quote::config::AppConfig;
use solar_quote::error::AppError;
use solar_quote::pricing::{
    brand_slug, calculate_pricing, calculate_submission_pricing, export_to_path, FlatVariant,
    Phase, PricingBreakdown, PricingSelection, QuotedProduct, RebateCalculator, RebateRules,
    SystemType,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct CatalogArgs {
    /// Pricing catalog to read instead of the configured one
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    #[command(flatten)]
    pub(crate) source: CatalogArgs,
    /// Destination CSV file
    #[arg(long)]
    pub(crate) output: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct QuoteArgs {
    #[command(flatten)]
    pub(crate) source: CatalogArgs,
    /// Systems to price, comma separated (solar,battery,ev)
    #[arg(long, value_delimiter = ',', value_parser = parse_system, required = true)]
    pub(crate) systems: Vec<SystemType>,
    /// Electrical supply of the property
    #[arg(long, value_parser = parse_phase, default_value = "single_phase")]
    pub(crate) phase: Phase,
    /// Solar package identifier
    #[arg(long)]
    pub(crate) solar: Option<String>,
    /// Battery option identifier
    #[arg(long)]
    pub(crate) battery: Option<String>,
    /// EV charger option identifier
    #[arg(long)]
    pub(crate) ev: Option<String>,
    /// Fail instead of pricing unresolved selections at zero
    #[arg(long)]
    pub(crate) strict: bool,
}

#[derive(Args, Debug)]
pub(crate) struct SolarRebateArgs {
    #[command(flatten)]
    pub(crate) source: CatalogArgs,
    /// System size in kW
    #[arg(long, value_parser = parse_non_negative)]
    pub(crate) size_kw: f64,
}

#[derive(Args, Debug)]
pub(crate) struct BatteryRebateArgs {
    #[command(flatten)]
    pub(crate) source: CatalogArgs,
    /// Usable capacity in kWh
    #[arg(long, value_parser = parse_non_negative)]
    pub(crate) capacity_kwh: f64,
    /// Battery brand, used for the state scheme exclusion list
    #[arg(long)]
    pub(crate) brand: Option<String>,
}

fn catalog_service(args: &CatalogArgs) -> Result<Arc<FileCatalogService>, AppError> {
    let path = match &args.catalog {
        Some(path) => path.clone(),
        None => AppConfig::load()?.catalog.path,
    };
    Ok(file_catalog_service(&path))
}

pub(crate) fn run_catalog_list(args: CatalogArgs) -> Result<(), AppError> {
    let service = catalog_service(&args)?;
    let records = service.list_all_variants()?;

    println!("{} priced options", records.len());
    for record in &records {
        println!("- {}", format_option(record));
    }
    Ok(())
}

pub(crate) fn run_catalog_migrate(args: CatalogArgs) -> Result<(), AppError> {
    let service = catalog_service(&args)?;
    let migrations = service.normalize_ids()?;

    if migrations.is_empty() {
        println!("Every option already carries a UUID");
        return Ok(());
    }

    println!("Assigned {} identifiers", migrations.len());
    for migration in &migrations {
        let previous = migration.previous.as_deref().unwrap_or("<missing>");
        println!("- {} -> {}", previous, migration.assigned);
    }
    Ok(())
}

pub(crate) fn run_catalog_export(args: ExportArgs) -> Result<(), AppError> {
    let service = catalog_service(&args.source)?;
    let records = service.load_catalog()?.flatten();
    let written = export_to_path(&args.output, &records)?;
    println!("Exported {} options to {}", written, args.output.display());
    Ok(())
}

pub(crate) fn run_quote(args: QuoteArgs) -> Result<(), AppError> {
    let service = catalog_service(&args.source)?;
    let catalog = service.load_catalog()?;

    let selection = PricingSelection {
        selected_systems: args.systems,
        solar_package: args.solar,
        battery_system: args.battery,
        ev_charger: args.ev,
        power_supply: args.phase,
    };

    let priced = if args.strict {
        calculate_submission_pricing(&catalog, &selection)?
    } else {
        calculate_pricing(&catalog, &selection)
    };

    for line in format_breakdown(&priced) {
        println!("{line}");
    }
    Ok(())
}

fn rebate_calculator(service: &FileCatalogService) -> RebateCalculator {
    match service.rebate_calculator() {
        Ok(calculator) => calculator,
        Err(err) => {
            eprintln!("using default rebate constants: {err}");
            RebateCalculator::new(RebateRules::default())
        }
    }
}

pub(crate) fn run_solar_rebate(args: SolarRebateArgs) -> Result<(), AppError> {
    let size_kw = args.size_kw;
    let service = catalog_service(&args.source)?;
    let calculator = rebate_calculator(&service);

    let rebate = calculator.calculate_solar_rebate(size_kw);
    println!("Solar rebate for {size_kw} kW: ${rebate:.0}");
    Ok(())
}

pub(crate) fn run_battery_rebate(args: BatteryRebateArgs) -> Result<(), AppError> {
    let capacity_kwh = args.capacity_kwh;
    let service = catalog_service(&args.source)?;
    let calculator = rebate_calculator(&service);

    let brand_key = args.brand.as_deref().map(brand_slug).unwrap_or_default();
    let flagged = service
        .load_catalog()
        .map(|catalog| {
            Phase::ALL
                .iter()
                .any(|phase| catalog.section(*phase).battery_brand_flagged(&brand_key))
        })
        .unwrap_or(false);
    let excluded = !brand_key.is_empty() && calculator.is_excluded_brand(&brand_key, flagged);
    let rebate = calculator.calculate_battery_rebate(capacity_kwh, excluded);

    println!("Battery rebate for {capacity_kwh} kWh");
    if excluded {
        println!("- state: $0 ({brand_key} is excluded from the state scheme)");
    } else {
        println!("- state: ${:.0}", rebate.state);
    }
    println!("- national: ${:.0}", rebate.national);
    println!("- total: ${:.0}", rebate.total);
    Ok(())
}

fn option_size(record: &FlatVariant) -> String {
    match (record.size_kw, record.capacity_kwh, record.power_kw) {
        (Some(size_kw), _, _) => format!("{size_kw} kW"),
        (None, Some(capacity_kwh), _) => format!("{capacity_kwh} kWh"),
        (None, None, Some(power_kw)) => format!("{power_kw} kW"),
        (None, None, None) => "unsized".to_string(),
    }
}

pub(crate) fn format_option(record: &FlatVariant) -> String {
    format!(
        "{} {} {} {} | ${:.0} (RRP ${:.0}) | {}[{}] | id {}",
        record.phase,
        record.product_type,
        record.brand,
        option_size(record),
        record.price_after_rebate,
        record.rrp,
        record.brand_key,
        record.index,
        record.id
    )
}

fn format_line(label: &str, item: &Option<QuotedProduct>) -> String {
    match item {
        Some(item) => format!(
            "- {label}: {} {} | ${:.0} less ${:.0} rebate",
            item.brand, item.size, item.price, item.rebate
        ),
        None => format!("- {label}: not priced"),
    }
}

pub(crate) fn format_breakdown(priced: &PricingBreakdown) -> Vec<String> {
    let mut lines = vec![
        "Quote breakdown".to_string(),
        format_line("solar", &priced.breakdown.solar),
        format_line("battery", &priced.breakdown.battery),
        format_line("ev", &priced.breakdown.ev),
        format!("Total ${:.0}", priced.total_price),
        format!("Rebates ${:.0}", priced.rebate_amount),
        format!("Final ${:.0}", priced.final_price),
    ];

    if let Some(estimates) = &priced.estimates {
        let payback = estimates
            .payback_years
            .map(|years| format!("{years:.1} years"))
            .unwrap_or_else(|| "n/a".to_string());
        lines.push(format!(
            "Estimated savings ${:.0}/yr | payback {} | {:.1} t CO2/yr",
            estimates.annual_savings, payback, estimates.co2_reduction_tonnes
        ));
    }

    lines
}
