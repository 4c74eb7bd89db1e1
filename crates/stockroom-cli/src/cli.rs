use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use stockroom_core::sync::RefreshPolicy;

#[derive(Parser)]
#[command(name = "stock")]
#[command(about = "Manage stock offline and sync it with the stock API")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// CLI profile name to read sync settings from
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,

    /// Work offline: never contact the API
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage product categories
    #[command(alias = "cat")]
    Category {
        #[command(subcommand)]
        command: CategoryCommands,
    },
    /// Manage products
    Product {
        #[command(subcommand)]
        command: ProductCommands,
    },
    /// Record stock deliveries
    Supply {
        #[command(subcommand)]
        command: SupplyCommands,
    },
    /// Manage customers
    Customer {
        #[command(subcommand)]
        command: CustomerCommands,
    },
    /// Manage customer orders
    Order {
        #[command(subcommand)]
        command: OrderCommands,
    },
    /// Push pending local changes to the API
    Sync,
    /// Reload every collection from the API
    Refresh,
    /// Show stock figures and pending changes
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Keep syncing in the foreground until Ctrl-C
    Watch {
        /// Seconds between connectivity checks
        #[arg(long, default_value = "30", value_name = "SECS")]
        check_interval: u64,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Sign in to the stock API and keep the token in the profile
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

/// Output options shared by every `list` command
#[derive(Args, Clone, Copy, Debug, Default)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
    /// Only show records not yet synced
    #[arg(long)]
    pub pending: bool,
}

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// Create a category
    Add {
        /// Category name
        name: Vec<String>,
    },
    /// List categories
    List {
        #[command(flatten)]
        list: ListArgs,
    },
    /// Rename a category
    Edit {
        /// Category ID or unique ID prefix
        id: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Delete a category
    Delete {
        /// Category ID or unique ID prefix
        id: String,
        /// Delete even if products still reference it
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum ProductCommands {
    /// Create a product
    Add {
        /// Product name
        name: String,
        /// Category ID or unique ID prefix
        #[arg(long, value_name = "ID")]
        category: String,
        /// Unit price
        #[arg(long)]
        price: f64,
        /// Units in stock
        #[arg(long, default_value = "0")]
        quantity: i64,
        #[arg(long)]
        description: Option<String>,
    },
    /// List products
    List {
        /// Only products of this category
        #[arg(long, value_name = "ID")]
        category: Option<String>,
        #[command(flatten)]
        list: ListArgs,
    },
    /// Change product fields
    Edit {
        /// Product ID or unique ID prefix
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_name = "ID")]
        category: Option<String>,
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        quantity: Option<i64>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a product
    Delete {
        /// Product ID or unique ID prefix
        id: String,
    },
}

#[derive(Subcommand)]
pub enum SupplyCommands {
    /// Record a delivery; the product's stock goes up immediately
    Add {
        /// Product ID or unique ID prefix
        #[arg(long, value_name = "ID")]
        product: String,
        /// Units received
        #[arg(long)]
        quantity: i64,
    },
    /// List deliveries
    List {
        #[command(flatten)]
        list: ListArgs,
    },
    /// Correct a delivery's quantity
    Edit {
        /// Supply ID or unique ID prefix
        id: String,
        #[arg(long)]
        quantity: Option<i64>,
    },
    /// Delete a delivery record
    Delete {
        /// Supply ID or unique ID prefix
        id: String,
    },
}

#[derive(Subcommand)]
pub enum CustomerCommands {
    /// Create a customer
    Add {
        /// Customer name
        name: Vec<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },
    /// List customers
    List {
        #[command(flatten)]
        list: ListArgs,
    },
    /// Change customer fields
    Edit {
        /// Customer ID or unique ID prefix
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },
    /// Delete a customer
    Delete {
        /// Customer ID or unique ID prefix
        id: String,
    },
}

#[derive(Subcommand)]
pub enum OrderCommands {
    /// Place an order
    Add {
        /// Customer ID or unique ID prefix
        #[arg(long, value_name = "ID")]
        customer: String,
        /// Order line as PRODUCT_ID:QUANTITY[@PRICE] (repeatable)
        #[arg(long = "line", value_name = "LINE", required = true)]
        lines: Vec<String>,
    },
    /// List orders
    List {
        #[command(flatten)]
        list: ListArgs,
    },
    /// Change an order's customer or lines
    Edit {
        /// Order ID or unique ID prefix
        id: String,
        #[arg(long, value_name = "ID")]
        customer: Option<String>,
        /// Replacement order lines (repeatable)
        #[arg(long = "line", value_name = "LINE")]
        lines: Vec<String>,
    },
    /// Delete an order
    Delete {
        /// Order ID or unique ID prefix
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Profile name to initialize
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Stock API base URL (e.g. <https://stock.example.com/api>)
        #[arg(long, value_name = "URL")]
        api_base_url: Option<String>,
        /// Bearer token for the stock API
        #[arg(long, value_name = "TOKEN")]
        api_token: Option<String>,
        /// Per-request timeout
        #[arg(long, value_name = "SECS")]
        request_timeout_secs: Option<u64>,
        /// Interval between background sweeps
        #[arg(long, value_name = "SECS")]
        sweep_interval_secs: Option<u64>,
        /// How refresh treats changes not yet pushed
        #[arg(long, value_enum)]
        refresh_policy: Option<RefreshPolicyArg>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Print the effective settings of a profile
    Show {
        /// Profile name to show
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in with email and password and store the API token
    Login {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Account email
        #[arg(long, value_name = "EMAIL")]
        email: String,
        /// Account password
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Show whether the profile holds an API token
    Status {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
    /// Revoke the API token and remove it from the profile
    Logout {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum RefreshPolicyArg {
    Replace,
    SweepFirst,
    PreservePending,
}

impl From<RefreshPolicyArg> for RefreshPolicy {
    fn from(value: RefreshPolicyArg) -> Self {
        match value {
            RefreshPolicyArg::Replace => Self::Replace,
            RefreshPolicyArg::SweepFirst => Self::SweepFirst,
            RefreshPolicyArg::PreservePending => Self::PreservePending,
        }
    }
}
