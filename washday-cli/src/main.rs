//! washday - order laundry pickup and delivery from the command line

mod order;
mod output;
mod session;

use std::io::{self, BufRead};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use libwashday::backend::AuthUser;
use libwashday::error::AuthError;
use libwashday::logging::{self, LogFormat, LoggingConfig};
use libwashday::service::discrepancy::pending_items;
use libwashday::types::{NewAddress, Profile};
use libwashday::{Config, WashdayError, WashdayService};
use serde_json::json;

use crate::order::{DetailsArgs, OrderArgs};
use crate::output::OutputFormat;
use crate::session::SessionFile;

#[derive(Parser, Debug)]
#[command(name = "washday")]
#[command(version)]
#[command(about = "Order laundry pickup and delivery")]
#[command(long_about = "\
washday - Order laundry pickup and delivery

DESCRIPTION:
    Browse the service catalog, place pickup-and-delivery orders and follow
    them until they come back clean. Orders go through the same six checkout
    steps as the app: service, items, cart, time slots, addresses, summary.

USAGE EXAMPLES:
    # Browse the catalog
    washday services
    washday categories <SERVICE_ID>
    washday items <CATEGORY_ID>

    # Sign in (password prompt, or --password-stdin for scripts)
    washday login ada@example.com

    # Preview, then place an order
    washday order --service washiron --item shirt=3 --item duvet=1 --dry-run
    washday order --service washiron --item shirt=3 --pickup 2025-06-02 --delivery 2025-06-04

    # Follow it
    washday orders
    washday track <ORDER_ID>

CONFIGURATION:
    Configuration file: ~/.config/washday/config.toml
    Override with --config or WASHDAY_CONFIG.

EXIT CODES:
    0 - Success
    1 - Operation failed (backend, configuration)
    2 - Authentication required or rejected
    3 - Invalid input (unknown item, incomplete checkout, bad date)
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the configuration file
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List active services
    Services {
        /// Only popular services
        #[arg(long)]
        popular: bool,
    },

    /// List the categories of a service
    Categories { service_id: String },

    /// List the items of a category, or of every category of a service
    Items {
        #[arg(required_unless_present = "service")]
        category_id: Option<String>,

        /// All items of this service
        #[arg(long, conflicts_with = "category_id")]
        service: Option<String>,
    },

    /// Sign in with email and password
    Login {
        email: String,

        /// Read the password from stdin instead of prompting
        #[arg(long)]
        password_stdin: bool,
    },

    /// Create an account
    Signup {
        email: String,

        /// First and last name, e.g. "Ada Lovelace"
        full_name: String,

        #[arg(long)]
        password_stdin: bool,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Change the password of the signed-in user
    Password {
        #[arg(long)]
        password_stdin: bool,
    },

    /// Walk through checkout and place an order
    Order(OrderArgs),

    /// List your orders, newest first
    Orders,

    /// Show where an order is
    Track { order_id: String },

    /// Cancel an order
    Cancel { order_id: String },

    /// Order the same items again
    Reorder {
        order_id: String,

        #[command(flatten)]
        details: DetailsArgs,
    },

    /// Totals over your orders
    Stats,

    /// Manage saved addresses
    Addresses {
        #[command(subcommand)]
        command: AddressCommand,
    },

    /// Review items the facility changed
    Discrepancies {
        #[command(subcommand)]
        command: DiscrepancyCommand,
    },

    /// Add an item to your favorites, or remove it if already there
    Favorite { item_id: String },
}

#[derive(Subcommand, Debug)]
enum AddressCommand {
    /// List saved addresses, default first
    List,

    /// Save a new address
    Add {
        /// Label, e.g. "Home"
        name: String,
        street: String,
        house_number: String,
        postal_code: String,
        city: String,

        /// Floor, door code and the like
        #[arg(long)]
        info: Option<String>,

        /// Make it the default address
        #[arg(long)]
        default: bool,
    },

    /// Delete a saved address
    Delete { address_id: String },

    /// Make an address the default
    Default { address_id: String },
}

#[derive(Subcommand, Debug)]
enum DiscrepancyCommand {
    /// Orders with changed items
    List,

    /// Accept a changed item
    Approve { order_id: String, index: usize },

    /// Reject a changed item
    Decline {
        order_id: String,
        index: usize,

        #[arg(long)]
        reason: String,
    },
}

/// Signed-in user with the profile orders are placed under
pub struct Customer {
    pub profile: Profile,
    pub email: String,
}

/// Everything a command needs
pub struct App {
    pub service: WashdayService,
    pub sessions: SessionFile,
    pub format: OutputFormat,
}

impl App {
    /// Restore the stored session, or fail with "not signed in"
    pub async fn signed_in(&mut self) -> Result<Customer> {
        let session = self
            .sessions
            .load()?
            .ok_or(WashdayError::Auth(AuthError::NotSignedIn))?;

        let auth = self.service.auth_mut();
        let user = auth.restore(session).await?;
        let profile = auth
            .profile()
            .cloned()
            .unwrap_or_else(|| bare_profile(&user));

        Ok(Customer {
            email: user.email.unwrap_or_default(),
            profile,
        })
    }

    pub fn pricing(&self) -> &libwashday::config::PricingConfig {
        &self.service.config().pricing
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}

fn bare_profile(user: &AuthUser) -> Profile {
    Profile {
        id: user.id.clone(),
        first_name: String::new(),
        last_name: String::new(),
        phone: String::new(),
        address: None,
        city: None,
        postal_code: None,
        preferences: json!({}),
        created_at: None,
        updated_at: None,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        LoggingConfig::new(LogFormat::Text, "debug".to_string(), true).init();
    } else {
        logging::init_default();
    }

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<WashdayError>()
            .map_or(1, WashdayError::exit_code);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    let sessions = SessionFile::new(config.session_path());
    let service = WashdayService::from_config(config)?;
    let mut app = App {
        service,
        sessions,
        format: cli.format,
    };

    match cli.command {
        Commands::Services { popular } => services(&app, popular).await,
        Commands::Categories { service_id } => categories(&app, &service_id).await,
        Commands::Items {
            category_id,
            service,
        } => items(&app, category_id, service).await,
        Commands::Login {
            email,
            password_stdin,
        } => login(&mut app, &email, password_stdin).await,
        Commands::Signup {
            email,
            full_name,
            password_stdin,
        } => signup(&mut app, &email, &full_name, password_stdin).await,
        Commands::Logout => logout(&mut app).await,
        Commands::Whoami => whoami(&mut app).await,
        Commands::Password { password_stdin } => change_password(&mut app, password_stdin).await,
        Commands::Order(args) => order::place(&mut app, args).await,
        Commands::Orders => orders(&mut app).await,
        Commands::Track { order_id } => track(&mut app, &order_id).await,
        Commands::Cancel { order_id } => cancel(&mut app, &order_id).await,
        Commands::Reorder { order_id, details } => order::reorder(&mut app, &order_id, details).await,
        Commands::Stats => stats(&mut app).await,
        Commands::Addresses { command } => addresses(&mut app, command).await,
        Commands::Discrepancies { command } => discrepancies(&mut app, command).await,
        Commands::Favorite { item_id } => favorite(&mut app, &item_id).await,
    }
}

fn read_password(from_stdin: bool, prompt: &str) -> Result<String> {
    let password = if from_stdin {
        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .context("Failed to read password from stdin")?;
        line.trim_end_matches(['\r', '\n']).to_string()
    } else {
        rpassword::prompt_password(prompt).context("Failed to read password")?
    };

    if password.is_empty() {
        return Err(WashdayError::InvalidInput("Password cannot be empty".to_string()).into());
    }
    Ok(password)
}

async fn services(app: &App, popular: bool) -> Result<()> {
    let catalog = app.service.catalog();
    let fetched = if popular {
        catalog.popular_services().await
    } else {
        catalog.active_services().await
    };
    let services = output::list(fetched)?;

    if app.is_json() {
        output::json(&services)
    } else {
        output::services(&services, app.pricing());
        Ok(())
    }
}

async fn categories(app: &App, service_id: &str) -> Result<()> {
    let categories = output::list(app.service.catalog().categories(service_id).await)?;
    if app.is_json() {
        output::json(&categories)
    } else {
        output::categories(&categories);
        Ok(())
    }
}

async fn items(app: &App, category_id: Option<String>, service: Option<String>) -> Result<()> {
    let catalog = app.service.catalog();
    let fetched = match (category_id, service) {
        (_, Some(service_id)) => catalog.service_items(&service_id).await,
        (Some(category_id), None) => catalog.items(&category_id).await,
        (None, None) => {
            return Err(WashdayError::InvalidInput("Give a category id or --service".to_string()).into())
        }
    };
    let items = output::list(fetched)?;

    if app.is_json() {
        output::json(&items)
    } else {
        output::items(&items, app.pricing());
        Ok(())
    }
}

async fn login(app: &mut App, email: &str, password_stdin: bool) -> Result<()> {
    let password = read_password(password_stdin, "Password: ")?;
    let session = app.service.auth_mut().sign_in(email, &password).await?;
    app.sessions.save(&session)?;

    if app.is_json() {
        output::json(&session.user)
    } else {
        println!("Signed in as {}", email);
        Ok(())
    }
}

async fn signup(app: &mut App, email: &str, full_name: &str, password_stdin: bool) -> Result<()> {
    let password = read_password(password_stdin, "Choose a password: ")?;
    let session = app
        .service
        .auth_mut()
        .sign_up(email, &password, full_name)
        .await?;
    app.sessions.save(&session)?;

    if app.is_json() {
        output::json(&session.user)
    } else {
        println!("Account created for {}", email);
        Ok(())
    }
}

async fn logout(app: &mut App) -> Result<()> {
    if let Some(session) = app.sessions.load()? {
        let auth = app.service.auth_mut();
        match auth.restore(session).await {
            Ok(_) => {
                if let Err(e) = auth.sign_out().await {
                    tracing::warn!(error = %e, "server sign out failed");
                }
            }
            Err(e) => tracing::debug!(error = %e, "stored session no longer valid"),
        }
    }
    app.sessions.clear()?;

    if !app.is_json() {
        println!("Signed out");
    }
    Ok(())
}

async fn whoami(app: &mut App) -> Result<()> {
    let customer = app.signed_in().await?;
    if app.is_json() {
        return output::json(&json!({
            "email": customer.email,
            "profile": customer.profile,
        }));
    }

    let name = customer.profile.full_name();
    if name.is_empty() {
        println!("{}", customer.email);
    } else {
        println!("{} <{}>", name, customer.email);
    }
    Ok(())
}

async fn change_password(app: &mut App, password_stdin: bool) -> Result<()> {
    app.signed_in().await?;
    let password = read_password(password_stdin, "New password: ")?;
    app.service.auth().update_password(&password).await?;
    if !app.is_json() {
        println!("Password updated");
    }
    Ok(())
}

async fn orders(app: &mut App) -> Result<()> {
    let customer = app.signed_in().await?;
    let orders = output::list(app.service.orders().list_for_user(&customer.profile.id).await)?;
    if app.is_json() {
        output::json(&orders)
    } else {
        output::orders(&orders, app.pricing());
        Ok(())
    }
}

async fn track(app: &mut App, order_id: &str) -> Result<()> {
    app.signed_in().await?;
    let order = output::one(app.service.orders().order(order_id).await, "orders")?;
    if app.is_json() {
        output::json(&json!({
            "order": order,
            "tracking": libwashday::service::orders::tracking(&order),
        }))
    } else {
        output::tracking_text(&order);
        Ok(())
    }
}

async fn cancel(app: &mut App, order_id: &str) -> Result<()> {
    app.signed_in().await?;
    let order = app.service.orders().cancel(order_id).await?;
    if app.is_json() {
        output::json(&order)
    } else {
        println!("Order {} cancelled", order.order_number);
        Ok(())
    }
}

async fn stats(app: &mut App) -> Result<()> {
    let customer = app.signed_in().await?;
    let stats = output::one(app.service.orders().stats(&customer.profile.id).await, "orders")?;
    if app.is_json() {
        output::json(&stats)
    } else {
        output::stats(&stats, app.pricing());
        Ok(())
    }
}

async fn addresses(app: &mut App, command: AddressCommand) -> Result<()> {
    let customer = app.signed_in().await?;
    let user_id = customer.profile.id;
    let service = app.service.addresses();

    match command {
        AddressCommand::List => {
            let addresses = output::list(service.list(&user_id).await)?;
            if app.is_json() {
                return output::json(&addresses);
            }
            output::addresses(&addresses);
        }
        AddressCommand::Add {
            name,
            street,
            house_number,
            postal_code,
            city,
            info,
            default,
        } => {
            let mut address = service
                .add(&NewAddress {
                    user_id: user_id.clone(),
                    name,
                    street,
                    house_number,
                    additional_info: info,
                    city,
                    postal_code,
                    is_default: false,
                })
                .await?;
            if default {
                address = service.set_default(&user_id, &address.id).await?;
            }
            if app.is_json() {
                return output::json(&address);
            }
            println!("Saved {} ({})", address.name, address.id);
        }
        AddressCommand::Delete { address_id } => {
            service.delete(&address_id).await?;
            if !app.is_json() {
                println!("Deleted {}", address_id);
            }
        }
        AddressCommand::Default { address_id } => {
            let address = service.set_default(&user_id, &address_id).await?;
            if app.is_json() {
                return output::json(&address);
            }
            println!("{} is now your default address", address.name);
        }
    }
    Ok(())
}

async fn discrepancies(app: &mut App, command: DiscrepancyCommand) -> Result<()> {
    let customer = app.signed_in().await?;
    let service = app.service.discrepancies();

    let order = match command {
        DiscrepancyCommand::List => {
            let orders = output::list(service.list(&customer.profile.id).await)?;
            if app.is_json() {
                return output::json(&orders);
            }
            for order in &orders {
                println!("{}  {}", order.id, order.order_number);
                if let Some(notes) = order.facility_notes.as_deref() {
                    println!("  facility: {}", notes);
                }
                for (index, item) in order.facility_updated_items.iter().flatten().enumerate() {
                    println!(
                        "  #{} {} x {} ({}) {}",
                        index, item.quantity, item.item_name, item.service_type, item.status
                    );
                }
                let pending = pending_items(order).len();
                if pending > 0 {
                    println!("  {} awaiting your decision", pending);
                }
            }
            return Ok(());
        }
        DiscrepancyCommand::Approve { order_id, index } => service.approve(&order_id, index).await?,
        DiscrepancyCommand::Decline {
            order_id,
            index,
            reason,
        } => service.decline(&order_id, index, &reason).await?,
    };

    if app.is_json() {
        output::json(&order)
    } else {
        println!("Recorded decision on order {}", order.order_number);
        Ok(())
    }
}

async fn favorite(app: &mut App, item_id: &str) -> Result<()> {
    let customer = app.signed_in().await?;
    let profile = app
        .service
        .profiles()
        .toggle_favorite(&customer.profile, item_id)
        .await?;

    let favorites = profile.favorites();
    if app.is_json() {
        return output::json(&favorites);
    }
    if favorites.iter().any(|id| id == item_id) {
        println!("Added {} to favorites", item_id);
    } else {
        println!("Removed {} from favorites", item_id);
    }
    Ok(())
}
