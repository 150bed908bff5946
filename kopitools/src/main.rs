use clap::{Args, Parser, Subcommand};
use dotenvy::dotenv;

mod app;
mod auth;
mod cart;
mod checkout;
mod format;
mod orders;
mod widget;

use app::App;

#[derive(Parser, Debug)]
#[command(version, about = "Command-line storefront for the Pasar Kopi marketplace")]
pub struct Arguments {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage the local cart
    #[command(subcommand)]
    Cart(CartCommand),
    /// Place the orders in the cart
    Checkout(CheckoutParams),
    /// Fetch an order once and print it
    Status {
        /// The order id, without the leading #
        order_id: String,
    },
    /// Follow an order until it reaches a terminal status
    Track(TrackParams),
    /// Re-open the payment session stored on an unpaid gateway order
    Retry {
        order_id: String,
    },
    /// Cancel an order
    Cancel(CancelParams),
    /// Store the bearer credential for the order service
    Login {
        token: String,
    },
    /// Forget the stored credential
    Logout,
    /// Show whether a credential is stored
    Whoami,
}

#[derive(Debug, Subcommand)]
pub enum CartCommand {
    /// Add a menu item to the cart. Re-adding the same item from the same warkop merges quantities
    Add(AddParams),
    /// Print the cart and its per-warkop totals
    Show(ShowParams),
    /// Change the quantity of a cart line. Zero removes the line
    Qty {
        line_id: String,
        quantity: i64,
    },
    /// Replace the notes on a cart line. Omit the note to clear it
    Note {
        line_id: String,
        note: Option<String>,
    },
    /// Remove a cart line
    Remove {
        line_id: String,
    },
    /// Empty the cart
    Clear,
}

#[derive(Debug, Args)]
pub struct AddParams {
    /// The menu item id
    #[arg(short = 'i', long = "item")]
    pub item_id: String,
    /// The menu item name, as it should appear on the order
    #[arg(short = 'm', long = "name")]
    pub name: String,
    /// Unit price in whole rupiah
    #[arg(short = 'p', long = "price")]
    pub price: i64,
    /// The warkop (vendor) id
    #[arg(short = 'w', long = "warkop")]
    pub vendor_id: String,
    /// The warkop display name
    #[arg(short = 'W', long = "warkop-name")]
    pub vendor_name: String,
    #[arg(short = 'q', long = "qty", default_value = "1")]
    pub quantity: u32,
    #[arg(short = 'n', long = "notes")]
    pub notes: Option<String>,
}

#[derive(Debug, Args)]
pub struct ShowParams {
    /// Delivery method to preview fees for (delivery or pickup)
    #[arg(short = 'd', long = "method", default_value = "delivery")]
    pub method: String,
}

#[derive(Debug, Args)]
pub struct CheckoutParams {
    /// Recipient name
    #[arg(short = 'n', long = "name")]
    pub name: String,
    /// Recipient phone number
    #[arg(short = 'p', long = "phone")]
    pub phone: String,
    /// Delivery address. Required when the method is delivery
    #[arg(short = 'a', long = "address")]
    pub address: Option<String>,
    /// Notes for the courier or the warkop
    #[arg(long = "notes")]
    pub notes: Option<String>,
    /// Delivery method: delivery or pickup
    #[arg(short = 'd', long = "method", default_value = "delivery")]
    pub method: String,
    /// Payment method: cash or gateway
    #[arg(short = 'y', long = "pay", default_value = "cash")]
    pub payment: String,
}

#[derive(Debug, Args)]
pub struct TrackParams {
    pub order_id: String,
    /// Seconds between status fetches
    #[arg(short = 'i', long = "interval", default_value = "30")]
    pub interval: u64,
}

#[derive(Debug, Args)]
pub struct CancelParams {
    pub order_id: String,
    #[arg(short = 'r', long = "reason", default_value = "Cancelled by the buyer")]
    pub reason: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();
    let cli = Arguments::parse();
    let app = App::new()?;
    match cli.command {
        Command::Cart(cmd) => cart::handle(&app, cmd),
        Command::Checkout(params) => checkout::run_checkout(&app, params).await,
        Command::Status { order_id } => orders::status(&app, &order_id).await,
        Command::Track(params) => orders::track(&app, params).await,
        Command::Retry { order_id } => orders::retry_payment(&app, &order_id).await,
        Command::Cancel(params) => orders::cancel(&app, params).await,
        Command::Login { token } => auth::login(&app, &token),
        Command::Logout => auth::logout(&app),
        Command::Whoami => auth::whoami(&app),
    }
}
