//! End-to-end batch review demo.
//!
//! Seeds an in-memory backend with a month of worklogs, walks the full
//! review flow (load, exclude, summarize, confirm), and shows the
//! staleness handling when a second reviewer wins the race.
//!
//! Run with: cargo run --example review_flow

use batch_kit::{
    BatchService, DateRange, Error, InMemoryApi, LineItem, LineItemId, Money, Result,
    StaticCredential,
};
use chrono::NaiveDate;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("Failed to build date")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .try_init()
        .ok();

    println!("\n=== Batch Kit - Review Flow Example ===\n");

    // 1. Seed the backend with January worklogs
    println!("1. Seeding in-memory backend...");
    let api = InMemoryApi::new(StaticCredential::new("demo-token"));
    api.insert(
        LineItem::new("wl_1", "fl_ada", Money::from_minor_units(12_500), 300)
            .with_label("Landing page copy"),
        date(2024, 1, 5),
    );
    api.insert(
        LineItem::new("wl_2", "fl_grace", Money::from_minor_units(48_000), 960)
            .with_label("Billing service"),
        date(2024, 1, 12),
    );
    api.insert(
        LineItem::new("wl_3", "fl_ada", Money::from_minor_units(8_000), 180)
            .with_label("Revisions"),
        date(2024, 1, 20),
    );
    println!("   ✓ {} worklogs stored\n", api.len());

    let service = BatchService::new(api.clone(), api.clone());

    // 2. Load the month and review
    println!("2. Loading January...");
    let mut session = service.open_session();
    let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 31))?;
    session.load(range).await?;

    let summary = session.summary();
    println!(
        "   ✓ {} items, total {} across {} freelancer(s)\n",
        summary.included.len(),
        summary.total_amount,
        summary.freelancer_count
    );

    // 3. Exclude one item and show the recomputed numbers
    println!("3. Excluding wl_3 (held for rework):");
    session.toggle_item(LineItemId::from("wl_3"))?;
    for group in session.summary().grouped() {
        println!(
            "   {} -> {} item(s), subtotal {}",
            group.freelancer_id,
            group.items.len(),
            group.subtotal
        );
    }
    println!();

    // A second reviewer loads the same range before we commit.
    let mut rival = service.open_session();
    rival.load(range).await?;

    // 4. Confirm the batch
    println!("4. Confirming:");
    let outcome = session.confirm().await?;
    println!(
        "   ✓ Batch {} committed: {} item(s), total {}\n",
        outcome.result.batch_id, outcome.result.included_count, outcome.result.total_amount
    );

    // 5. The second reviewer's snapshot is now stale
    println!("5. Second reviewer confirming a stale snapshot:");
    match rival.confirm().await {
        Err(Error::StaleBatch(msg)) => println!("   ✗ Rejected as stale: {}", msg),
        other => println!("   Unexpected outcome: {:?}", other.map(|o| o.result)),
    }
    rival.load(range).await?;
    println!(
        "   ✓ After reload: {} item(s) left to review\n",
        rival.summary().included.len()
    );

    println!("=== Done ===\n");
    Ok(())
}
