use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast::Receiver;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rental_client::api::UserQuery;
use rental_client::model::{
    EquipmentQuery, NewRental, OfflineApproval, OfflinePaymentRequest, PageRequest, PaymentType,
    RentalWindow,
};
use rental_client::validation::{LoginForm, PaymentForm, RegisterForm, RentalForm};
use rental_client::{
    ApiClient, ClientConfig, ClientError, PaymentIntentId, ProviderToken, RestoreOutcome,
    SessionEvent, SessionManager, TokenClaims, create_session, resolve_session_dir,
};

#[derive(Parser)]
#[command(name = "rental-client")]
#[command(about = "Command-line client for the equipment rental service")]
struct Cli {
    /// Base URL of the rental API
    #[arg(long, global = true, env = "RENTAL_API_URL")]
    api_url: Option<String>,
    /// Directory holding the persisted session
    #[arg(long, global = true, env = "RENTAL_SESSION_DIR")]
    session_dir: Option<PathBuf>,
    /// Per-request timeout in seconds
    #[arg(long, global = true, env = "RENTAL_API_TIMEOUT_SECS")]
    timeout: Option<u64>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login {
        email: String,
        #[arg(long, env = "RENTAL_PASSWORD")]
        password: String,
    },
    /// Sign in with a Google ID token
    GoogleLogin { id_token: String },
    /// Create an account
    Register {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "RENTAL_PASSWORD")]
        password: String,
        /// Password confirmation (defaults to the password)
        #[arg(long)]
        confirm: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        /// Accept the terms of service
        #[arg(long, default_value_t = false)]
        accept_terms: bool,
    },
    /// End the session
    Logout,
    /// Verify the stored session and show the signed-in user
    Whoami,
    /// Browse the equipment catalog
    Equipment {
        #[arg(short, long)]
        search: Option<String>,
        /// Category, e.g. "drilling" or "power_tools"
        #[arg(long)]
        category: Option<String>,
        #[arg(long, default_value_t = false)]
        available_only: bool,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        size: Option<u32>,
    },
    /// Show one equipment item
    Show { id: i64 },
    /// Check availability for a period
    Availability {
        equipment_id: i64,
        start: NaiveDate,
        end: NaiveDate,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Price a rental without booking it
    Quote {
        equipment_id: i64,
        start: NaiveDate,
        end: NaiveDate,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Book equipment
    Rent {
        equipment_id: i64,
        start: NaiveDate,
        end: NaiveDate,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        pickup_address: Option<String>,
        #[arg(long, default_value_t = false)]
        delivery: bool,
    },
    /// List my rentals
    Rentals {
        /// pending, confirmed, active, completed, cancelled or overdue
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        size: Option<u32>,
    },
    /// Cancel a pending or confirmed rental
    Cancel { rental_id: i64 },
    /// Start a card payment
    Pay {
        #[arg(long)]
        rental_id: Option<i64>,
        amount: f64,
        #[arg(long)]
        currency: Option<String>,
    },
    /// Sync a card payment's status from the processor
    Confirm { payment_intent_id: String },
    /// List my payments
    Payments {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        size: Option<u32>,
    },
    /// Show one payment
    Payment { id: i64 },
    /// Administrator commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Summary statistics
    Dashboard,
    /// List users
    Users {
        #[arg(short, long)]
        search: Option<String>,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        size: Option<u32>,
    },
    /// Block a user
    Block { user_id: i64 },
    /// Unblock a user
    Unblock { user_id: i64 },
    /// Payments awaiting a decision
    PendingPayments {
        #[arg(long)]
        page: Option<u32>,
    },
    /// Rentals awaiting confirmation
    PendingRentals {
        #[arg(long)]
        page: Option<u32>,
    },
    /// All rentals
    Rentals {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        page: Option<u32>,
    },
    /// All payments
    AllPayments {
        #[arg(long)]
        page: Option<u32>,
    },
    /// Cancel a payment that has not completed
    CancelPayment { payment_id: i64 },
    /// Withdraw an equipment item from the catalog
    RemoveEquipment { equipment_id: i64 },
    /// Approve an offline payment
    Approve {
        payment_id: i64,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Record a cash or bank-transfer payment
    OfflinePayment {
        amount: f64,
        #[arg(long)]
        rental_id: Option<i64>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Revenue over a period (default: last 30 days)
    Revenue {
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("rental_client=info".parse()?)
                .add_directive("reqwest=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.api_url {
        Some(url) => ClientConfig::with_base_url(url)?,
        None => ClientConfig::default(),
    };
    if let Some(secs) = cli.timeout {
        config = config.timeout(Duration::from_secs(secs));
    }
    let fallback = config.fallback_message.clone();

    let session_dir = cli.session_dir.clone().unwrap_or_else(resolve_session_dir);
    info!("Using API at {}", config.base_url);
    let manager = create_session(config, &session_dir)
        .with_context(|| format!("opening session in {}", session_dir.display()))?;
    let mut events = manager.subscribe();

    let outcome = run(cli.command, &manager).await;
    report_session_events(&mut events);

    match outcome {
        Ok(()) => Ok(()),
        Err(e) => {
            warn!("Command failed: {:?}", e);
            bail!("{}", e.to_api_error(&fallback))
        }
    }
}

fn report_session_events(events: &mut Receiver<SessionEvent>) {
    while let Ok(event) = events.try_recv() {
        match event {
            SessionEvent::Refreshed => info!("Session tokens were refreshed"),
            SessionEvent::Expired => {
                eprintln!("Your session has expired. Run `rental-client login` to sign in again.")
            }
        }
    }
}

async fn run(command: Commands, manager: &SessionManager) -> Result<(), ClientError> {
    let client = manager.client();

    match command {
        Commands::Login { email, password } => {
            let form = LoginForm {
                email,
                password,
                accept: true,
            };
            let credentials = form.validate().map_err(ClientError::Validation)?;
            let user = manager.login(&credentials).await?;
            println!("Signed in as {}", user.profile.display_name());
            if user.is_admin {
                println!("Administrator access enabled.");
            }
        }
        Commands::GoogleLogin { id_token } => {
            let user = manager
                .federated_login(&ProviderToken::new(id_token))
                .await?;
            println!("Signed in as {}", user.profile.display_name());
        }
        Commands::Register {
            first_name,
            last_name,
            email,
            password,
            confirm,
            phone,
            accept_terms,
        } => {
            let form = RegisterForm {
                first_name,
                last_name,
                email,
                confirm: confirm.unwrap_or_else(|| password.clone()),
                password,
                accept: accept_terms,
                phone,
            };
            let profile = manager.register(&form).await?;
            println!("Account created for {} (id {})", profile.email, profile.id);
            if !manager.is_authenticated()? {
                println!("Run `rental-client login {}` to sign in.", profile.email);
            }
        }
        Commands::Logout => {
            manager.logout().await?;
            println!("Signed out.");
        }
        Commands::Whoami => match manager.restore().await? {
            RestoreOutcome::Anonymous => println!("Not signed in."),
            RestoreOutcome::Authenticated(user) => {
                print_json(&user)?;
                if let Some(token) = client.store().access_token()? {
                    if let Some(exp) = TokenClaims::peek(&token).and_then(|c| c.expires_at()) {
                        println!("Access token expires at {}", exp.format("%Y-%m-%d %H:%M:%S UTC"));
                    }
                }
            }
            RestoreOutcome::Expired(_) => println!("Not signed in (session expired)."),
            RestoreOutcome::Deferred { cached, error } => {
                println!("Could not reach the server: {}", error);
                match cached {
                    Some(user) => println!("Last known user: {}", user.profile.display_name()),
                    None => println!("No cached profile."),
                }
            }
        },
        Commands::Equipment {
            search,
            category,
            available_only,
            page,
            size,
        } => {
            let query = EquipmentQuery {
                search,
                category: category.as_deref().map(parse_wire_enum).transpose()?,
                available_only,
                page: PageRequest { page, size },
            };
            let listing = client.equipment().list(&query).await?;
            for item in &listing.items {
                println!(
                    "{:>5}  {:<40} {:>10.2}/day  {}/{} available",
                    item.id, item.name, item.daily_rate, item.quantity_available, item.quantity_total
                );
            }
            println!("Page {} of {} ({} items)", listing.page, listing.pages, listing.total);
        }
        Commands::Show { id } => print_json(&client.equipment().get(id).await?)?,
        Commands::Availability {
            equipment_id,
            start,
            end,
            quantity,
        } => {
            let window = RentalWindow::from_dates(equipment_id, start, end, quantity);
            print_json(&client.rentals().check_availability(&window).await?)?;
        }
        Commands::Quote {
            equipment_id,
            start,
            end,
            quantity,
        } => {
            let window = RentalWindow::from_dates(equipment_id, start, end, quantity);
            print_json(&client.rentals().pricing_preview(&window).await?)?;
        }
        Commands::Rent {
            equipment_id,
            start,
            end,
            quantity,
            notes,
            pickup_address,
            delivery,
        } => {
            let equipment = client.equipment().get(equipment_id).await?;
            let form = RentalForm {
                equipment_id,
                start: Some(start),
                end: Some(end),
                quantity,
            };
            let window = form
                .validate(Utc::now().date_naive(), equipment.quantity_available)
                .map_err(ClientError::Validation)?;

            let rental = NewRental {
                notes,
                pickup_address,
                delivery_required: delivery,
                ..NewRental::new(&window)
            };
            let created = client.rentals().create(&rental).await?;
            println!(
                "Rental {} created: {} x {} for {:.2} ({})",
                created.id,
                created.quantity,
                equipment.name,
                created.total_price,
                created.status.as_str()
            );
        }
        Commands::Rentals { status, page, size } => {
            let status = status.as_deref().map(parse_wire_enum).transpose()?;
            let listing = client
                .rentals()
                .list(status, PageRequest { page, size })
                .await?;
            for rental in &listing.items {
                println!(
                    "{:>5}  {:<30} {} -> {}  {:<10} {:>10.2}",
                    rental.id,
                    rental.equipment_name,
                    rental.start_date.format("%Y-%m-%d"),
                    rental.end_date.format("%Y-%m-%d"),
                    rental.status.as_str(),
                    rental.total_price
                );
            }
            println!("Page {} of {}", listing.page, listing.pages);
        }
        Commands::Cancel { rental_id } => {
            println!("{}", client.rentals().cancel(rental_id).await?.message)
        }
        Commands::Pay {
            rental_id,
            amount,
            currency,
        } => {
            let form = PaymentForm {
                rental_id,
                amount,
                currency,
            };
            let intent = form.validate().map_err(ClientError::Validation)?;
            print_json(&client.payments().create_payment_intent(&intent).await?)?;
        }
        Commands::Confirm { payment_intent_id } => {
            let id = PaymentIntentId::new(payment_intent_id);
            print_json(&client.payments().confirm_payment(&id).await?)?;
        }
        Commands::Payments { page, size } => {
            print_json(&client.payments().list(PageRequest { page, size }).await?)?;
        }
        Commands::Payment { id } => print_json(&client.payments().get(id).await?)?,
        Commands::Admin { command } => run_admin(command, client).await?,
    }

    Ok(())
}

async fn run_admin(command: AdminCommands, client: &ApiClient) -> Result<(), ClientError> {
    let admin = client.admin();

    match command {
        AdminCommands::Dashboard => print_json(&admin.dashboard().await?)?,
        AdminCommands::Users {
            search,
            role,
            page,
            size,
        } => {
            let query = UserQuery {
                search,
                role,
                page: PageRequest { page, size },
            };
            for user in admin.users(&query).await? {
                println!(
                    "{:>5}  {:<35} {:<10} {}",
                    user.id,
                    user.email,
                    user.role.as_str(),
                    user.display_name()
                );
            }
        }
        AdminCommands::Block { user_id } => println!("{}", admin.block_user(user_id).await?.message),
        AdminCommands::Unblock { user_id } => {
            println!("{}", admin.unblock_user(user_id).await?.message)
        }
        AdminCommands::PendingPayments { page } => {
            print_json(&admin.pending_payments(PageRequest { page, size: None }).await?)?
        }
        AdminCommands::PendingRentals { page } => {
            print_json(&admin.pending_rentals(PageRequest { page, size: None }).await?)?
        }
        AdminCommands::Rentals { status, page } => {
            let status = status.as_deref().map(parse_wire_enum).transpose()?;
            print_json(&admin.rentals(status, PageRequest { page, size: None }).await?)?
        }
        AdminCommands::AllPayments { page } => {
            print_json(&admin.all_payments(PageRequest { page, size: None }).await?)?
        }
        AdminCommands::CancelPayment { payment_id } => {
            println!("{}", admin.cancel_payment(payment_id).await?.message)
        }
        AdminCommands::RemoveEquipment { equipment_id } => {
            println!("{}", client.equipment().delete(equipment_id).await?.message)
        }
        AdminCommands::Approve { payment_id, notes } => {
            let approval = OfflineApproval { payment_id, notes };
            print_json(&client.payments().approve_offline(&approval).await?)?
        }
        AdminCommands::OfflinePayment {
            amount,
            rental_id,
            description,
        } => {
            let payment = OfflinePaymentRequest {
                rental_id,
                amount,
                payment_type: PaymentType::Rental,
                description,
            };
            print_json(&client.payments().create_offline(&payment).await?)?
        }
        AdminCommands::Revenue { start, end } => {
            let start = start.map(|d| d.and_time(NaiveTime::MIN).and_utc());
            let end = end.map(|d| d.and_time(NaiveTime::MIN).and_utc());
            print_json(&admin.revenue_report(start, end).await?)?
        }
    }

    Ok(())
}

/// Parse a snake_case wire name into one of the model enums.
fn parse_wire_enum<T: DeserializeOwned>(raw: &str) -> Result<T, ClientError> {
    serde_json::from_value(serde_json::Value::String(raw.to_lowercase()))
        .map_err(|_| ClientError::InvalidRequest(format!("unknown value {:?}", raw)))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), ClientError> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|e| ClientError::Decode(e.to_string()))?;
    println!("{}", out);
    Ok(())
}
