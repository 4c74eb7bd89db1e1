use std::env;
use std::path::PathBuf;

use stockroom_core::models::{
    Category, Customer, Order, OrderLine, Product, Record, RecordId, Supply, SyncEntity,
};
use stockroom_core::services::InventoryService;

use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

/// Global options every command runs with
#[derive(Debug, Clone)]
pub struct Context {
    pub db_path: PathBuf,
    pub profile: Option<String>,
    pub offline: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenMode {
    /// Ping the API, then refresh every collection when it answers
    Refresh,
    /// Only ping the API
    CheckOnly,
}

pub async fn open_service(ctx: &Context, mode: OpenMode) -> Result<InventoryService, CliError> {
    let mut settings = CliProfilesConfig::load()?.effective_settings(ctx.profile.as_deref());
    if ctx.offline {
        settings.force_offline = true;
    }

    let service = InventoryService::open(&ctx.db_path, settings).await?;
    let online = service.check_connection().await;
    if service.has_remote() && !online {
        tracing::warn!("Stock API unreachable; working offline");
    }
    if online && mode == OpenMode::Refresh {
        service.refresh_all().await;
    }
    Ok(service)
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_db_path.or_else(|| env::var_os("STOCKROOM_DB_PATH").map(PathBuf::from))
    {
        return Ok(path);
    }
    default_db_path()
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("stockroom").join("stockroom.db"))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI data directory".to_string()))
}

pub fn normalize_record_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyRecordId)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Join words given on the command line into one name
pub fn join_name(parts: &[String]) -> String {
    parts.join(" ").trim().to_string()
}

/// Find a record by exact id or unique id prefix
pub fn resolve_record<'a, E: SyncEntity>(
    query: &str,
    records: &'a [Record<E>],
) -> Result<&'a Record<E>, CliError> {
    let query = normalize_record_identifier(query)?;
    if let Some(record) = records.iter().find(|record| record.id.as_str() == query) {
        return Ok(record);
    }

    let matches: Vec<&Record<E>> = records
        .iter()
        .filter(|record| record.id.as_str().starts_with(&query))
        .collect();

    match matches.as_slice() {
        [] => Err(CliError::RecordNotFound {
            kind: E::KIND,
            query,
        }),
        [record] => Ok(record),
        _ => {
            let options = matches
                .iter()
                .take(3)
                .map(|record| record.id.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousRecordId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

/// Resolve an id query to the id of a live record
pub fn resolve_id<E: SyncEntity>(query: &str, records: &[Record<E>]) -> Result<RecordId, CliError> {
    resolve_record(query, records).map(|record| record.id.clone())
}

/// Parse `PRODUCT_ID:QUANTITY[@PRICE]`, returning the product query
pub fn parse_order_line(raw: &str) -> Result<(String, i64, Option<f64>), CliError> {
    let invalid = || CliError::InvalidOrderLine(raw.to_string());

    let (product, rest) = raw.trim().split_once(':').ok_or_else(invalid)?;
    let (quantity, price) = match rest.split_once('@') {
        Some((quantity, price)) => (quantity, Some(price)),
        None => (rest, None),
    };

    let product = normalize_record_identifier(product).map_err(|_| invalid())?;
    let quantity = quantity.trim().parse::<i64>().map_err(|_| invalid())?;
    let price = price
        .map(|price| price.trim().parse::<f64>().map_err(|_| invalid()))
        .transpose()?;
    Ok((product, quantity, price))
}

/// Parse order lines and resolve each product against the live products
pub fn build_order_lines(
    raw_lines: &[String],
    products: &[Record<Product>],
) -> Result<Vec<OrderLine>, CliError> {
    raw_lines
        .iter()
        .map(|raw| {
            let (product, quantity, price) = parse_order_line(raw)?;
            Ok(OrderLine {
                product_id: resolve_id(&product, products)?,
                quantity,
                price,
            })
        })
        .collect()
}

/// One-line human description of a record's fields
pub trait Describe {
    fn describe(&self) -> String;
}

impl Describe for Category {
    fn describe(&self) -> String {
        self.name.clone()
    }
}

impl Describe for Product {
    fn describe(&self) -> String {
        format!(
            "{:<24}  {:>6} in stock  {:>10.2}  category={}",
            self.name, self.quantity, self.price, self.category_id
        )
    }
}

impl Describe for Supply {
    fn describe(&self) -> String {
        format!("+{:<6}  product={}", self.quantity, self.product_id)
    }
}

impl Describe for Customer {
    fn describe(&self) -> String {
        let contact = [self.phone.as_deref(), self.address.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ");
        if contact.is_empty() {
            self.name.clone()
        } else {
            format!("{:<24}  {contact}", self.name)
        }
    }
}

impl Describe for Order {
    fn describe(&self) -> String {
        format!(
            "customer={}  {} line(s), {} unit(s)",
            self.customer_id,
            self.products.len(),
            self.total_units()
        )
    }
}

/// Render records as aligned lines; pending records are marked with `*`
pub fn format_record_lines<E: Describe>(records: &[Record<E>]) -> Vec<String> {
    records
        .iter()
        .map(|record| {
            let marker = if record.unsynced { '*' } else { ' ' };
            format!("{:<18} {marker} {}", record.id, record.fields.describe())
        })
        .collect()
}

/// Suffix telling the user a write is still waiting for the API
pub const fn pending_note<E>(record: &Record<E>) -> &'static str {
    if record.unsynced {
        " (pending sync)"
    } else {
        ""
    }
}
