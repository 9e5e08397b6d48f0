//! Storefront Session Example
//!
//! Simulates a few page loads of the demo storefront against a profile file,
//! clicks the tracked buttons, and prints the report and export.
//!
//! Run with: cargo run --example storefront_session [profile.json]
//! Set `RUST_LOG=debug` to see every recorded event.

use anyhow::{Context, Result};
use storefront_experiments::analytics::{AnalyticsSnapshot, PageContext, DEFAULT_RECENT_EVENTS};
use storefront_experiments::dom::{ElementSpec, MemoryDocument};
use storefront_experiments::kv::FileKvStore;
use storefront_experiments::{EngineConfig, ExperimentCatalog, ExperimentEngine, PageSession};
use tracing_subscriber::EnvFilter;

const USER_AGENT: &str = "storefront-demo/0.1";

fn home_page() -> MemoryDocument {
    let mut doc = MemoryDocument::new()
        .with(ElementSpec::new("h1").text("Welcome to TestStore"))
        .with(ElementSpec::new("button").id("hero-cta-primary").text("Shop Now"))
        .with(ElementSpec::new("a").id("about-cta").text("About us"));
    for i in 1..=3 {
        doc.push(ElementSpec::new("button").id(&format!("product-cta-{i}")).text("View"));
        doc.push(ElementSpec::new("button").id(&format!("product-add-cart-{i}")).text("Add to cart"));
    }
    doc
}

fn checkout_page() -> MemoryDocument {
    MemoryDocument::new()
        .with(ElementSpec::new("h1").text("Checkout"))
        .with(ElementSpec::new("button").id("checkout-complete-btn").text("Complete Order"))
}

fn visit(
    profile: &FileKvStore,
    url: &str,
    mut page: MemoryDocument,
    clicks: &[&str],
) -> Result<()> {
    let engine = ExperimentEngine::builder(profile.clone(), ExperimentCatalog::storefront())
        .config(EngineConfig::default())
        .context(PageContext::new(url).with_user_agent(USER_AGENT))
        .build();
    let mut session = PageSession::new(engine);

    let summary = session.load(&mut page);
    for outcome in summary.outcomes() {
        println!(
            "   {:<22} {:<10} {:?} ({} elements)",
            outcome.experiment_id, outcome.variant_id, outcome.source, outcome.elements
        );
    }

    session.mount_complete();
    for id in clicks {
        let element = page
            .element_by_id(id)
            .with_context(|| format!("no element #{id} on {url}"))?;
        for credit in session.click(&page, &element) {
            println!(
                "   click #{} -> {} / {}",
                credit.element_id, credit.experiment_id, credit.variant_id
            );
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let dir = demo_dir()?;
    let path = std::env::args()
        .nth(1)
        .map_or_else(|| dir.join("profile.json"), Into::into);
    let profile = FileKvStore::open(&path);
    println!("=== Storefront Experiments ===\n");
    println!("Profile: {}\n", path.display());

    println!("1. Home page");
    visit(
        &profile,
        "http://localhost:3000/",
        home_page(),
        &["hero-cta-primary", "product-add-cart-2", "about-cta"],
    )?;

    println!("\n2. Checkout page");
    visit(
        &profile,
        "http://localhost:3000/checkout",
        checkout_page(),
        &["checkout-complete-btn"],
    )?;

    println!("\n3. Report");
    let snapshot = AnalyticsSnapshot::load(&profile, &EngineConfig::default().storage);
    let report = snapshot.report();
    for experiment in report.experiments() {
        println!(
            "   {} (assigned {}): {} clicks, {} conversions, {}%",
            experiment.experiment_id,
            experiment.assigned_variant,
            experiment.total_clicks,
            experiment.total_conversions,
            experiment.conversion_rate
        );
        for variant in &experiment.variants {
            let marker = if variant.is_current { "*" } else { " " };
            println!(
                "     {marker} {:<10} events={} clicks={} conversions={} rate={}%",
                variant.variant_id,
                variant.total_events,
                variant.clicks,
                variant.conversions,
                variant.conversion_rate
            );
        }
    }
    println!("   Recent:");
    for event in report.recent_events(DEFAULT_RECENT_EVENTS).iter().take(5) {
        println!(
            "     {} {} {}",
            event.kind().as_str(),
            event.experiment_id(),
            event.variant_id()
        );
    }

    println!("\n4. Export");
    let export = snapshot.export(chrono::Utc::now(), Some(USER_AGENT.to_string()));
    let written = export
        .write_to_dir(&dir)
        .context("failed to write analytics export")?;
    println!("   {} events -> {}", export.events.len(), written.display());

    println!("\n=== Done ===");
    Ok(())
}

fn demo_dir() -> Result<std::path::PathBuf> {
    let dir = std::env::temp_dir().join("storefront-experiments-demo");
    std::fs::create_dir_all(&dir).context("failed to create demo directory")?;
    Ok(dir)
}
