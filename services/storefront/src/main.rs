use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use log::debug;
use rust_decimal::Decimal;

use common::models::{GameId, PaymentProvider, RegisterForm};
use common::utils::{cart_total, format_vnd, image_url};

use storefront::catalog::CatalogFilter;
use storefront::config::{parse_base_url, CartMode, Config};
use storefront::download::GameAccess;
use storefront::navigation::{Navigator, Route};
use storefront::storage::LocalStorage;
use storefront::{landing, reviews, stats, AppState, StorefrontError};

#[derive(Parser)]
#[command(name = "storefront", about = "Browse and buy games from the marketplace")]
struct Cli {
    /// Backend REST root
    #[arg(long, env = "API_BASE_URL", global = true)]
    api_url: Option<String>,

    /// File backing local device storage
    #[arg(long, env = "STOREFRONT_STORAGE", global = true)]
    storage: Option<PathBuf>,

    /// Where the cart lives: server or local
    #[arg(long, env = "CART_MODE", global = true)]
    cart_mode: Option<CartMode>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List games matching a filter
    Games {
        #[arg(long)]
        q: Option<String>,
        #[arg(long)]
        category: Option<u64>,
        #[arg(long)]
        tag: Option<u64>,
        #[arg(long)]
        min: Option<Decimal>,
        #[arg(long)]
        max: Option<Decimal>,
        /// How many pages to load
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Show a game with its reviews and download status
    Game { id: GameId },
    Categories,
    Tags,
    #[command(subcommand)]
    Cart(CartCommand),
    /// Pay for the given games, or for the whole cart when none are given
    Checkout {
        #[arg(long, default_value = "momo")]
        provider: PaymentProvider,
        ids: Vec<GameId>,
    },
    /// Pay for a single game right away
    Buy {
        id: GameId,
        #[arg(long, default_value = "momo")]
        provider: PaymentProvider,
    },
    Login {
        username: String,
        #[arg(long, env = "STOREFRONT_PASSWORD")]
        password: String,
    },
    Logout,
    Whoami,
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        avatar: Option<PathBuf>,
    },
    /// Review a game you bought
    Review {
        game: GameId,
        rating: u8,
        comment: String,
    },
    /// Seller revenue statistics
    Stats {
        #[arg(long)]
        period: Option<String>,
    },
    /// Open an in-app path such as "/?category_id=2" or "/games/5"
    Open { path: String },
    /// Serve the page payment providers return to
    Serve,
}

#[derive(Subcommand)]
enum CartCommand {
    List,
    Add { id: GameId },
    Remove { id: GameId },
}

struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn navigate(&self, route: Route) {
        debug!("navigate {:?}", route);
        println!("-> {}", route.to_path());
    }

    fn redirect_external(&self, url: &str) {
        println!("Open this page to complete payment:\n  {}", url);
    }
}

fn load_config(cli: &Cli) -> Result<Config, StorefrontError> {
    let mut config = Config::from_env()?;
    if let Some(url) = &cli.api_url {
        config.api_base_url = parse_base_url(url)?;
    }
    if let Some(path) = &cli.storage {
        config.storage_path = path.clone();
    }
    if let Some(mode) = cli.cart_mode {
        config.cart_mode = mode;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let storage = LocalStorage::open(&config.storage_path);
    let app = Arc::new(AppState::new(&config, storage, Arc::new(ConsoleNavigator))?);
    app.start().await;

    if let Err(e) = dispatch(&app, &config, cli.command).await {
        eprintln!("{}", e.user_message());
        debug!("{:?}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn dispatch(app: &Arc<AppState>, config: &Config, command: Command) -> Result<(), StorefrontError> {
    match command {
        Command::Games { q, category, tag, min, max, pages } => {
            let filter = CatalogFilter {
                q,
                category_id: category,
                tag_id: tag,
                price_min: min,
                price_max: max,
            };
            list_games(app, filter, pages).await
        }
        Command::Game { id } => show_game(app, id).await,
        Command::Categories => {
            for category in app.api.categories().await? {
                println!("{:>4}  {}", category.id, category.name);
            }
            Ok(())
        }
        Command::Tags => {
            for tag in app.api.tags().await? {
                println!("{:>4}  {}", tag.id, tag.name);
            }
            Ok(())
        }
        Command::Cart(CartCommand::List) => show_cart(app).await,
        Command::Cart(CartCommand::Add { id }) => {
            app.add_to_cart(id).await?;
            println!("Added to cart ({} item(s))", app.refresh_cart_count().await);
            Ok(())
        }
        Command::Cart(CartCommand::Remove { id }) => {
            app.remove_from_cart(id).await?;
            println!("Removed from cart ({} item(s))", app.refresh_cart_count().await);
            Ok(())
        }
        Command::Checkout { provider, ids } => {
            let outcome = if ids.is_empty() {
                app.checkout_cart(provider).await?
            } else {
                app.checkout(&ids, provider).await?
            };
            println!("Order {} created, paying with {}", outcome.order_id, outcome.provider);
            Ok(())
        }
        Command::Buy { id, provider } => {
            let outcome = app.buy_now(id, provider).await?;
            println!("Order {} created, paying with {}", outcome.order_id, outcome.provider);
            Ok(())
        }
        Command::Login { username, password } => {
            app.login(&username, &password).await?;
            match app.session.current_user() {
                Some(account) => println!("Signed in as {}", account.username),
                None => println!("Signed in"),
            }
            Ok(())
        }
        Command::Logout => {
            app.logout();
            println!("Signed out");
            Ok(())
        }
        Command::Whoami => {
            match app.session.current_user() {
                Some(account) => {
                    println!("{}", account.username);
                    if let Some(email) = account.email {
                        println!("  email: {}", email);
                    }
                    if let Some(role) = account.role {
                        println!("  role:  {}", role.as_str());
                    }
                    println!("  cart:  {} item(s)", app.session.cart_count());
                }
                None => println!("Not signed in"),
            }
            Ok(())
        }
        Command::Register {
            email,
            username,
            password,
            confirm,
            phone,
            first_name,
            last_name,
            avatar,
        } => {
            let form = RegisterForm {
                email,
                username,
                password,
                confirm,
                phone_number: phone,
                first_name,
                last_name,
                role: None,
                avatar,
            };
            let account = app.session.register(&form).await?;
            println!("Account {} created, you can now log in", account.username);
            Ok(())
        }
        Command::Review { game, rating, comment } => {
            app.submit_review(game, rating, &comment).await?;
            println!("Thanks for your review");
            Ok(())
        }
        Command::Stats { period } => {
            let data = app.revenue_stats(period.as_deref()).await?;
            print!("{}", stats::render(&data));
            Ok(())
        }
        Command::Open { path } => open(app, Route::parse(&path)).await,
        Command::Serve => {
            landing::serve(Arc::clone(app), config.landing_addr, config.allowed_origin.clone())
                .await
                .map_err(|e| StorefrontError::Config(format!("landing server stopped: {}", e)))
        }
    }
}

async fn open(app: &Arc<AppState>, route: Route) -> Result<(), StorefrontError> {
    match route {
        Route::Home(filter) => list_games(app, filter, 1).await,
        Route::GameDetail(id) => show_game(app, id).await,
        Route::Cart => show_cart(app).await,
        Route::Checkout(ids) => {
            let outcome = app.checkout(&ids, PaymentProvider::Momo).await?;
            println!("Order {} created, paying with {}", outcome.order_id, outcome.provider);
            Ok(())
        }
        Route::Stats => {
            let data = app.revenue_stats(None).await?;
            print!("{}", stats::render(&data));
            Ok(())
        }
        Route::ThankYou => {
            println!("Thank you! {} item(s) left in cart", app.refresh_cart_count().await);
            Ok(())
        }
        other => {
            app.navigator.navigate(other);
            Ok(())
        }
    }
}

async fn list_games(app: &AppState, filter: CatalogFilter, pages: u32) -> Result<(), StorefrontError> {
    println!("{}", Route::Home(filter.clone()).to_path());
    app.catalog.apply_filter(filter).await?;
    for _ in 1..pages {
        if !app.catalog.load_more().await? {
            break;
        }
    }

    let games = app.catalog.games();
    if games.is_empty() {
        println!("No games to show.");
    }
    for game in &games {
        println!("{:>5}  {:<40} {:>16}", game.id, game.title, format_vnd(game.price));
    }
    if app.catalog.has_more() {
        println!("(page {}, more available with --pages)", app.catalog.page());
    }
    Ok(())
}

async fn show_game(app: &AppState, id: GameId) -> Result<(), StorefrontError> {
    let detail = app.game_detail(id).await?;
    let game = &detail.game;

    println!("{} ({})", game.title, format_vnd(game.price));
    if let Some(developer) = &game.developer {
        println!("by {}", developer);
    }
    let cover = image_url(app.api.base_url().as_str(), game.image.as_deref());
    if !cover.is_empty() {
        println!("cover: {}", cover);
    }
    if let Some(created) = game.created_at {
        println!("released {}", created.format("%Y-%m-%d"));
    }
    println!(
        "categories: {}",
        game.categories.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(", ")
    );
    println!(
        "tags: {}",
        game.tags.iter().map(|t| t.name.as_str()).collect::<Vec<_>>().join(", ")
    );
    println!("{} views, {} purchases", game.view_count, game.purchase_count);
    println!();
    println!("{}", game.description);
    println!();

    match &detail.access {
        GameAccess::Download(link) => println!("Download: {}", link),
        GameAccess::Buy => println!("Buy with: storefront buy {} --provider momo|vnpay", game.id),
    }

    match reviews::average_rating(&detail.reviews) {
        Some(avg) => println!("\n{} review(s), average {:.1}/5", detail.reviews.len(), avg),
        None => println!("\nNo reviews yet"),
    }
    for review in &detail.reviews {
        println!(
            "  [{}/5] {}: {}",
            review.rating,
            review.customer.as_deref().unwrap_or("anonymous"),
            review.comment
        );
    }
    Ok(())
}

async fn show_cart(app: &AppState) -> Result<(), StorefrontError> {
    let entries = app.cart_entries().await?;
    if entries.is_empty() {
        println!("Your cart is empty");
        return Ok(());
    }
    for entry in &entries {
        println!("{:>5}  {:<40} {:>16}", entry.game_id, entry.title, format_vnd(entry.price));
    }
    println!("Total: {}", format_vnd(cart_total(entries.iter().map(|e| &e.price))));
    Ok(())
}
