//! Integration tests for batch-kit
//!
//! These tests drive complete review sessions over the in-memory API,
//! verifying the aggregation numbers, the issue rules, and the full
//! selecting → reviewing → confirming lifecycle including its failure
//! paths.

use batch_kit::{
    BatchResult, BatchService, ConfirmOperation, ConfirmRequest, DateRange, EligibilityProvider,
    Error, FreelancerId, InMemoryApi, IssueKind, LineItem, LineItemId, Money, ReviewSession,
    SessionPhase, StaticCredential,
};
use chrono::NaiveDate;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn date(s: &str) -> NaiveDate {
    s.parse().expect("Failed to parse date")
}

fn january() -> DateRange {
    DateRange::new(date("2024-01-01"), date("2024-01-31")).expect("Failed to build range")
}

/// Two freelancers, three worklogs in January, one in February.
fn seeded_api() -> InMemoryApi {
    let api = InMemoryApi::new(StaticCredential::new("secret"));
    api.insert(
        LineItem::new("wl_1", "fl_a", Money::from_minor_units(1000), 60).with_label("Copywriting"),
        date("2024-01-05"),
    );
    api.insert(
        LineItem::new("wl_2", "fl_b", Money::from_minor_units(2000), 120).with_label("Backend API"),
        date("2024-01-12"),
    );
    api.insert(
        LineItem::new("wl_3", "fl_a", Money::from_minor_units(1500), 90).with_label("Revisions"),
        date("2024-01-20"),
    );
    api.insert(
        LineItem::new("wl_4", "fl_c", Money::from_minor_units(3000), 240).with_label("February work"),
        date("2024-02-02"),
    );
    api
}

fn open_session(api: &InMemoryApi) -> ReviewSession<InMemoryApi, InMemoryApi> {
    BatchService::new(api.clone(), api.clone()).open_session()
}

/// Test 1: full happy path.
///
/// Load a range, exclude nothing, confirm, and verify the backend paid
/// exactly the items the summary promised.
#[tokio::test]
async fn test_full_review_flow() {
    let api = seeded_api();
    let mut session = open_session(&api);

    session.load(january()).await.expect("Failed to load");
    assert_eq!(session.phase(), SessionPhase::Reviewing);

    let summary = session.summary();
    assert_eq!(summary.included.len(), 3);
    assert_eq!(summary.total_amount, Money::from_minor_units(4500));
    assert_eq!(summary.total_duration_mins, 270);
    assert_eq!(summary.freelancer_count, 2);
    assert!(summary.can_process);

    let outcome = session.confirm().await.expect("Failed to confirm");
    assert_eq!(session.phase(), SessionPhase::Confirmed);
    assert!(!outcome.discrepancy);
    assert_eq!(outcome.result.included_count, 3);
    assert_eq!(outcome.result.total_amount, Money::from_minor_units(4500));

    // The backend actually marked those items paid; February is untouched.
    assert!(api.is_paid(&LineItemId::from("wl_1")));
    assert!(api.is_paid(&LineItemId::from("wl_2")));
    assert!(api.is_paid(&LineItemId::from("wl_3")));
    assert!(!api.is_paid(&LineItemId::from("wl_4")));
}

/// Test 2: excluding one item versus excluding its (single-item)
/// freelancer produces identical numbers.
#[tokio::test]
async fn test_item_and_freelancer_exclusion_routes_match() {
    let api = seeded_api();

    let mut by_item = open_session(&api);
    by_item.load(january()).await.expect("Failed to load");
    by_item
        .toggle_item(LineItemId::from("wl_2"))
        .expect("Failed to toggle");

    let mut by_freelancer = open_session(&api);
    by_freelancer.load(january()).await.expect("Failed to load");
    by_freelancer
        .toggle_freelancer(FreelancerId::from("fl_b"))
        .expect("Failed to toggle");

    let a = by_item.summary();
    let b = by_freelancer.summary();
    assert_eq!(a.included, b.included);
    assert_eq!(a.total_amount, Money::from_minor_units(2500));
    assert_eq!(a.freelancer_count, 1);
}

/// Test 3: excluding everything blocks confirmation with EMPTY_BATCH.
#[tokio::test]
async fn test_empty_batch_blocks_confirmation() {
    let api = seeded_api();
    let mut session = open_session(&api);
    session.load(january()).await.expect("Failed to load");

    session
        .toggle_freelancer(FreelancerId::from("fl_a"))
        .expect("Failed to toggle");
    session
        .toggle_freelancer(FreelancerId::from("fl_b"))
        .expect("Failed to toggle");

    let summary = session.summary();
    assert!(summary.included.is_empty());
    assert_eq!(summary.total_amount, Money::ZERO);
    assert!(summary.issues.iter().any(|i| i.kind == IssueKind::EmptyBatch));
    assert!(!summary.can_process);

    assert!(matches!(
        session.confirm().await,
        Err(Error::NotProcessable(_))
    ));
    assert_eq!(session.phase(), SessionPhase::Reviewing);
}

/// Test 4: zero-duration items warn but still pay; negative amounts block.
#[tokio::test]
async fn test_issue_severities() {
    let api = seeded_api();
    api.insert(
        LineItem::new("wl_5", "fl_d", Money::from_minor_units(500), 0),
        date("2024-01-25"),
    );
    let mut session = open_session(&api);
    session.load(january()).await.expect("Failed to load");

    let summary = session.summary();
    let zero = summary
        .issues
        .iter()
        .find(|i| i.kind == IssueKind::ZeroDuration)
        .expect("Expected a zero-duration warning");
    assert_eq!(zero.item, Some(LineItemId::from("wl_5")));
    assert!(summary.can_process, "warnings must not block payment");

    // Now a negative amount arrives; the batch is blocked until the
    // offending item is excluded.
    api.insert(
        LineItem::new("wl_6", "fl_d", Money::from_minor_units(-100), 30),
        date("2024-01-26"),
    );
    session.load(january()).await.expect("Failed to reload");
    assert!(!session.summary().can_process);

    session
        .toggle_item(LineItemId::from("wl_6"))
        .expect("Failed to toggle");
    assert!(session.summary().can_process);
    session.confirm().await.expect("Failed to confirm");
    assert!(!api.is_paid(&LineItemId::from("wl_6")));
}

/// Test 5: a transport failure during confirm leaves the session
/// reviewable with exclusions intact; the retry reuses the same
/// idempotency key and succeeds.
#[tokio::test]
async fn test_confirm_transport_failure_then_retry() {
    let api = seeded_api();
    let mut session = open_session(&api);
    session.load(january()).await.expect("Failed to load");
    session
        .toggle_item(LineItemId::from("wl_3"))
        .expect("Failed to toggle");

    let key_before = session.idempotency_key().expect("Expected a key");

    api.fail_next_confirm(Error::Transport("timeout".to_string()));
    let failed = session.confirm().await;
    assert!(matches!(failed, Err(Error::Transport(_))));
    assert_eq!(session.phase(), SessionPhase::Reviewing);
    assert!(!session.exclusions().is_empty());
    assert!(!api.is_paid(&LineItemId::from("wl_1")));

    // Same state, same key, successful retry.
    assert_eq!(session.idempotency_key().expect("Expected a key"), key_before);
    let outcome = session.confirm().await.expect("Failed to retry confirm");
    assert_eq!(outcome.result.included_count, 2);
    assert!(api.is_paid(&LineItemId::from("wl_1")));
    assert!(!api.is_paid(&LineItemId::from("wl_3")));
}

/// Test 6: two sessions race over the same items; the loser gets a
/// staleness rejection, reloads, and sees what is left.
#[tokio::test]
async fn test_concurrent_sessions_staleness() {
    let api = seeded_api();
    let mut winner = open_session(&api);
    let mut loser = open_session(&api);

    winner.load(january()).await.expect("Failed to load");
    loser.load(january()).await.expect("Failed to load");

    // Winner pays fl_a's items only.
    winner
        .toggle_freelancer(FreelancerId::from("fl_b"))
        .expect("Failed to toggle");
    winner.confirm().await.expect("Failed to confirm");

    // Loser still believes all three items are payable.
    let stale = loser.confirm().await;
    assert!(matches!(stale, Err(Error::StaleBatch(_))));
    assert!(loser.needs_reload());
    assert!(matches!(loser.confirm().await, Err(Error::NeedsReload)));

    // After reloading, only fl_b's item remains and payment goes through.
    loser.load(january()).await.expect("Failed to reload");
    let summary = loser.summary();
    assert_eq!(summary.included_ids(), vec![LineItemId::from("wl_2")]);
    let outcome = loser.confirm().await.expect("Failed to confirm remainder");
    assert_eq!(outcome.result.total_amount, Money::from_minor_units(2000));
}

/// Delegates to the real API, but hangs forever on the next fetch when
/// armed, standing in for a query the backend never answers.
#[derive(Clone)]
struct HangingFetch {
    inner: InMemoryApi,
    hang_next: Arc<AtomicBool>,
}

impl EligibilityProvider for HangingFetch {
    async fn fetch_eligible(&self, range: &DateRange) -> batch_kit::Result<Vec<LineItem>> {
        if self.hang_next.swap(false, Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.inner.fetch_eligible(range).await
    }
}

/// Test 7: a load future abandoned mid-flight changes nothing.
///
/// The user opens a new query, the backend stalls, and the UI drops the
/// load to move on. The reviewing snapshot, its exclusions, and the
/// generation counter must all survive untouched, and the session must
/// accept a fresh load afterwards.
#[tokio::test(start_paused = true)]
async fn test_dropped_load_leaves_snapshot_intact() {
    let api = seeded_api();
    let hang_next = Arc::new(AtomicBool::new(false));
    let provider = HangingFetch {
        inner: api.clone(),
        hang_next: Arc::clone(&hang_next),
    };
    let mut session = ReviewSession::new(Arc::new(provider), Arc::new(api.clone()));

    session.load(january()).await.expect("Failed to load");
    session
        .toggle_item(LineItemId::from("wl_1"))
        .expect("Failed to toggle");
    let generation = session.generation();

    // The next query stalls; the caller gives up and drops the future.
    hang_next.store(true, Ordering::SeqCst);
    let february =
        DateRange::new(date("2024-02-01"), date("2024-02-29")).expect("Failed to build range");
    let abandoned = tokio::time::timeout(
        std::time::Duration::from_millis(50),
        session.load(february),
    )
    .await;
    assert!(abandoned.is_err(), "the stalled load must not complete");

    // The reviewing snapshot is exactly as it was before the attempt.
    assert_eq!(session.phase(), SessionPhase::Reviewing);
    assert_eq!(session.generation(), generation);
    assert_eq!(session.range(), Some(january()));
    assert_eq!(session.items().len(), 3);
    assert!(!session.exclusions().is_empty());

    // A fresh load still works and bumps the generation as usual.
    session.load(january()).await.expect("Failed to reload");
    assert_eq!(session.generation(), generation + 1);
    assert!(session.exclusions().is_empty());
}

/// Test 8: submitting the same key twice pays once.
///
/// Simulates the client retrying after a response was lost in transit: the
/// confirm committed server-side, the retry replays the recorded result.
#[tokio::test]
async fn test_idempotent_confirm_replay() {
    let api = seeded_api();
    let mut session = open_session(&api);
    session.load(january()).await.expect("Failed to load");

    let summary = session.summary();
    let request = ConfirmRequest {
        idempotency_key: session.idempotency_key().expect("Expected a key"),
        range: january(),
        included_ids: summary.included_ids(),
        excluded_item_ids: Vec::new(),
        excluded_freelancer_ids: Vec::new(),
    };

    let first = api.confirm(&request).await.expect("Failed to confirm");
    let replay = api.confirm(&request).await.expect("Failed to replay");
    assert_eq!(first, replay);
}

/// Test 9: when the server pays different totals than promised, the
/// outcome carries a discrepancy flag instead of failing.
#[tokio::test]
async fn test_server_total_discrepancy_is_flagged() {
    /// Confirms against the real API but reports a shaved total, as a
    /// backend racing concurrent payment activity would.
    #[derive(Clone)]
    struct ShavedConfirm {
        inner: InMemoryApi,
    }

    impl ConfirmOperation for ShavedConfirm {
        async fn confirm(&self, request: &ConfirmRequest) -> batch_kit::Result<BatchResult> {
            let mut result = self.inner.confirm(request).await?;
            result.total_amount = Money::from_minor_units(
                result.total_amount.minor_units() - 1000,
            );
            result.included_count -= 1;
            Ok(result)
        }
    }

    let api = seeded_api();
    let service = BatchService::new(api.clone(), ShavedConfirm { inner: api.clone() });
    let mut session = service.open_session();
    session.load(january()).await.expect("Failed to load");

    let outcome = session.confirm().await.expect("Failed to confirm");
    assert!(outcome.discrepancy);
    assert_eq!(session.phase(), SessionPhase::Confirmed);
}

/// Test 10: reloading with a different range drops exclusions that were
/// keyed against the previous query.
#[tokio::test]
async fn test_reload_prevents_stale_exclusions() {
    let api = seeded_api();
    // A February item that happens to share an id prefix pattern with
    // January's; only identity matters here.
    let mut session = open_session(&api);
    session.load(january()).await.expect("Failed to load");
    session
        .toggle_item(LineItemId::from("wl_1"))
        .expect("Failed to toggle");

    let february =
        DateRange::new(date("2024-02-01"), date("2024-02-29")).expect("Failed to build range");
    session.load(february).await.expect("Failed to reload");

    assert!(session.exclusions().is_empty());
    let summary = session.summary();
    assert_eq!(summary.included_ids(), vec![LineItemId::from("wl_4")]);
    assert!(summary.can_process);
}

/// Test 11: item ids are opaque strings; UUID-shaped ids flow through
/// loading, keying, and confirmation unchanged.
#[tokio::test]
async fn test_opaque_uuid_item_ids() {
    let api = InMemoryApi::new(StaticCredential::new("secret"));
    let ids: Vec<String> = (0..5).map(|_| uuid::Uuid::now_v7().to_string()).collect();
    for (i, id) in ids.iter().enumerate() {
        api.insert(
            LineItem::new(
                id.clone(),
                "fl_a",
                Money::from_minor_units(100 * (i as i64 + 1)),
                30,
            ),
            date("2024-01-10"),
        );
    }

    let mut session = open_session(&api);
    session.load(january()).await.expect("Failed to load");
    assert_eq!(session.summary().included.len(), 5);

    let key = session.idempotency_key().expect("Expected a key");
    assert!(key.starts_with("batch:2024-01-01:2024-01-31:"));

    let outcome = session.confirm().await.expect("Failed to confirm");
    assert_eq!(outcome.result.included_count, 5);
    assert_eq!(outcome.result.total_amount, Money::from_minor_units(1500));
}

/// Test 12: grouped display view keeps first-appearance freelancer order
/// across a realistic load.
#[tokio::test]
async fn test_grouped_view_over_loaded_batch() {
    let api = seeded_api();
    let mut session = open_session(&api);
    session.load(january()).await.expect("Failed to load");

    let groups = session.summary().grouped();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].freelancer_id, FreelancerId::from("fl_a"));
    assert_eq!(groups[0].subtotal, Money::from_minor_units(2500));
    assert_eq!(groups[0].duration_mins, 150);
    assert_eq!(groups[1].freelancer_id, FreelancerId::from("fl_b"));
    assert_eq!(groups[1].items.len(), 1);
}
