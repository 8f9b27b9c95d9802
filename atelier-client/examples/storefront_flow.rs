// atelier-client/examples/storefront_flow.rs
// End-to-end storefront flow against a running API server.

use std::sync::Arc;

use atelier_client::cart::metrics;
use atelier_client::{AuthSession, CartService, ClientConfig, LocalStore};
use shared::cart::CartLineInput;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().collect();
    let base_url = std::env::var("ATELIER_API_URL")
        .unwrap_or_else(|_| "http://localhost:8000".to_string());

    let config = ClientConfig::new(&base_url).with_storage_dir(".atelier-example");
    let store = LocalStore::open(config.storage_dir.clone())?;
    let session = Arc::new(AuthSession::new(config.build_http_client(), store.clone()));

    // Optional login: `cargo run --example storefront_flow -- email password`
    if args.len() >= 3 {
        let user = session.login(&args[1], &args[2]).await?;
        tracing::info!(email = %user.email, "Logged in");
    } else {
        match session.restore().await {
            Ok(Some(user)) => tracing::info!(email = %user.email, "Session restored"),
            Ok(None) => tracing::info!("Browsing as guest"),
            Err(e) => tracing::warn!("Session restore failed: {}", e),
        }
    }

    let cart = CartService::new(session.clone(), store)?;

    // Guests pass the display snapshot they already hold from the catalog;
    // for authenticated sessions only the variant id matters.
    let pick = CartLineInput {
        variant_id: 10,
        name: "Wool coat".to_string(),
        price: 12900.0,
        image_url: None,
    };

    let snapshot = cart.add_item(&pick, 2, None).await?;
    tracing::info!(
        lines = snapshot.items.len(),
        total_items = snapshot.summary.total_items,
        "Added to cart"
    );

    let m = metrics::calculate_metrics(&snapshot.items, Some(&snapshot.summary));
    println!("Cart total: {}", metrics::format_price(m.total_value));

    let validation = metrics::validate_for_checkout(&snapshot.items, &snapshot.summary);
    if validation.is_valid {
        println!("Ready for checkout");
    } else {
        for error in &validation.errors {
            println!("Blocked: {error}");
        }
    }
    for hint in metrics::recommendations(&snapshot.items, &snapshot.summary) {
        println!("Hint: {hint}");
    }

    Ok(())
}
