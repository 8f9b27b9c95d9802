//! Cart synchronizer integration tests
//!
//! The guest backend runs against a temp-dir local store; the server
//! backend runs against an in-memory `CartApi` implementing the same
//! semantics as the real API (dedup by variant, clamped increments,
//! authoritative snapshots).

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use atelier_client::storage::{CART_KEY, TOKENS_KEY, USER_KEY};
use atelier_client::{
    AuthSession, CartApi, CartService, ClientConfig, ClientError, ClientResult, LocalStore,
};
use shared::auth::{Profile, TokenPair};
use shared::cart::{
    CartLine, CartLineCreate, CartLineInput, CartLineUpdate, CartSnapshot, ItemSummary,
    MAX_LINE_QUANTITY, VariantInfo,
};

// ============================================================================
// In-memory server cart
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Failure {
    Rejected,
    Unauthorized,
    ServerDown,
}

impl Failure {
    fn into_error(self) -> ClientError {
        match self {
            Self::Rejected => ClientError::Rejected {
                status: 400,
                message: "Недостаточно товара на складе".to_string(),
            },
            Self::Unauthorized => ClientError::Unauthorized,
            Self::ServerDown => ClientError::Server {
                status: 503,
                message: "unavailable".to_string(),
            },
        }
    }
}

#[derive(Default)]
struct FakeCartApi {
    lines: Mutex<Vec<CartLine>>,
    next_id: AtomicI64,
    fetch_calls: AtomicU32,
    add_calls: AtomicU32,
    remove_calls: AtomicU32,
    fail_next: Mutex<Option<Failure>>,
}

impl FakeCartApi {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicI64::new(1),
            ..Self::default()
        })
    }

    fn fail_next(&self, failure: Failure) {
        *self.fail_next.lock().unwrap() = Some(failure);
    }

    fn take_failure(&self) -> Option<Failure> {
        self.fail_next.lock().unwrap().take()
    }

    fn snapshot_locked(lines: &[CartLine]) -> CartSnapshot {
        CartSnapshot::from_lines(lines.to_vec())
    }

    fn new_line(&self, req: &CartLineCreate) -> CartLine {
        CartLine {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            variant_id: req.variant_id,
            quantity: req.quantity.min(MAX_LINE_QUANTITY),
            price_at_time: Some(100.0),
            subtotal: Some(100.0 * f64::from(req.quantity.min(MAX_LINE_QUANTITY))),
            is_available: true,
            is_reserved: false,
            reserved_until: None,
            notes: req.notes.clone(),
            added_at: Utc::now(),
            updated_at: None,
            variant: VariantInfo {
                id: req.variant_id,
                price: Some(100.0),
                available_stock: Some(100),
                ..VariantInfo::default()
            },
            item: ItemSummary {
                id: req.variant_id,
                name: format!("Variant {}", req.variant_id),
                ..ItemSummary::default()
            },
        }
    }
}

#[async_trait]
impl CartApi for FakeCartApi {
    async fn fetch_cart(&self) -> ClientResult<CartSnapshot> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = self.take_failure() {
            return Err(failure.into_error());
        }
        Ok(Self::snapshot_locked(&self.lines.lock().unwrap()))
    }

    async fn add_line(&self, req: &CartLineCreate) -> ClientResult<CartSnapshot> {
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = self.take_failure() {
            return Err(failure.into_error());
        }

        let mut lines = self.lines.lock().unwrap();
        match lines.iter_mut().find(|l| l.variant_id == req.variant_id) {
            Some(line) => {
                line.quantity = line
                    .quantity
                    .saturating_add(req.quantity)
                    .min(MAX_LINE_QUANTITY);
                line.subtotal = Some(100.0 * f64::from(line.quantity));
            }
            None => {
                let line = self.new_line(req);
                lines.push(line);
            }
        }
        Ok(Self::snapshot_locked(&lines))
    }

    async fn update_line(&self, line_id: i64, req: &CartLineUpdate) -> ClientResult<CartSnapshot> {
        if let Some(failure) = self.take_failure() {
            return Err(failure.into_error());
        }

        let mut lines = self.lines.lock().unwrap();
        let line = lines
            .iter_mut()
            .find(|l| l.id == line_id)
            .ok_or_else(|| ClientError::NotFound(format!("line {line_id}")))?;

        if let Some(quantity) = req.quantity {
            line.quantity = quantity.min(MAX_LINE_QUANTITY);
            line.subtotal = Some(100.0 * f64::from(line.quantity));
        }
        if req.notes.is_some() {
            line.notes = req.notes.clone();
        }
        Ok(Self::snapshot_locked(&lines))
    }

    async fn remove_line(&self, line_id: i64) -> ClientResult<()> {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = self.take_failure() {
            return Err(failure.into_error());
        }

        let mut lines = self.lines.lock().unwrap();
        let before = lines.len();
        lines.retain(|l| l.id != line_id);
        if lines.len() == before {
            return Err(ClientError::NotFound(format!("line {line_id}")));
        }
        Ok(())
    }

    async fn clear(&self) -> ClientResult<()> {
        if let Some(failure) = self.take_failure() {
            return Err(failure.into_error());
        }
        self.lines.lock().unwrap().clear();
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

fn profile() -> Profile {
    Profile {
        id: 1,
        email: "ada@example.com".into(),
        is_admin: false,
        avatar: None,
        first_name: None,
        last_name: None,
        phone_number: None,
        date_of_birth: None,
        height: None,
        weight: None,
        chest: None,
        waist: None,
        hips: None,
        favorite_colors: None,
        favorite_brands: None,
    }
}

fn input(variant_id: i64) -> CartLineInput {
    CartLineInput {
        variant_id,
        name: format!("Variant {variant_id}"),
        price: 100.0,
        image_url: None,
    }
}

struct Harness {
    _tmp: tempfile::TempDir,
    store: LocalStore,
    session: Arc<AuthSession>,
    api: Arc<FakeCartApi>,
    cart: CartService,
}

async fn harness(authenticated: bool) -> Harness {
    let tmp = tempfile::tempdir().unwrap();
    let store = LocalStore::open(tmp.path()).unwrap();

    let config = ClientConfig::new("http://localhost:9").with_storage_dir(tmp.path());
    let session = Arc::new(AuthSession::new(config.build_http_client(), store.clone()));

    if authenticated {
        store.put(USER_KEY, &profile()).unwrap();
        store
            .put(
                TOKENS_KEY,
                &TokenPair {
                    access_token: "acc".into(),
                    refresh_token: "ref".into(),
                    token_type: "bearer".into(),
                },
            )
            .unwrap();
        session.load_cached_user().await.unwrap();
        assert!(session.is_authenticated().await);
    }

    let api = FakeCartApi::new();
    let cart = CartService::with_api(api.clone(), session.clone(), store.clone()).unwrap();

    Harness {
        _tmp: tmp,
        store,
        session,
        api,
        cart,
    }
}

// ============================================================================
// Guest backend
// ============================================================================

#[tokio::test]
async fn guest_duplicate_adds_merge_into_one_persisted_line() {
    let h = harness(false).await;

    h.cart.add_item(&input(10), 1, None).await.unwrap();
    let snapshot = h.cart.add_item(&input(10), 1, None).await.unwrap();

    assert_eq!(snapshot.items.len(), 1);
    assert_eq!(snapshot.items[0].quantity, 2);
    assert_eq!(snapshot.summary.total_items, 2);

    // Durable: a fresh service over the same store sees the same cart.
    let reloaded = CartService::with_api(h.api.clone(), h.session.clone(), h.store.clone()).unwrap();
    let persisted = reloaded.snapshot().await.unwrap();
    assert_eq!(persisted.items.len(), 1);
    assert_eq!(persisted.items[0].quantity, 2);

    // Guest mutations never touch the server.
    assert_eq!(h.api.add_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn guest_add_then_remove_round_trips_to_empty() {
    let h = harness(false).await;

    let snapshot = h.cart.add_item(&input(5), 2, None).await.unwrap();
    let line_id = snapshot.items[0].id;

    let after = h.cart.remove_item(line_id).await.unwrap();
    assert!(after.items.is_empty());
    assert_eq!(after.summary.total_items, 0);
}

#[tokio::test]
async fn guest_lines_are_not_merged_on_login() {
    let h = harness(false).await;

    h.cart.add_item(&input(10), 2, None).await.unwrap();

    // Simulated login: the session gains a user, the synchronizer starts
    // serving the (empty) server cart.
    h.store.put(USER_KEY, &profile()).unwrap();
    h.session.load_cached_user().await.unwrap();

    let snapshot = h.cart.snapshot().await.unwrap();
    assert!(snapshot.items.is_empty(), "server cart starts empty");

    // The guest lines survive untouched in local storage.
    let stored: Option<Vec<shared::cart::StoredCartLine>> = h.store.get(CART_KEY).unwrap();
    let stored = stored.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].quantity, 2);
}

#[tokio::test]
async fn adopt_guest_cart_transfers_and_clears_stored_lines() {
    let h = harness(false).await;

    h.cart.add_item(&input(10), 2, None).await.unwrap();
    h.cart.add_item(&input(11), 1, None).await.unwrap();

    h.store.put(USER_KEY, &profile()).unwrap();
    h.session.load_cached_user().await.unwrap();

    let snapshot = h.cart.adopt_guest_cart().await.unwrap();
    assert_eq!(snapshot.items.len(), 2);
    assert_eq!(snapshot.summary.total_items, 3);

    let stored: Option<Vec<shared::cart::StoredCartLine>> = h.store.get(CART_KEY).unwrap();
    assert!(stored.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn adopting_as_guest_is_an_auth_error() {
    let h = harness(false).await;
    let result = h.cart.adopt_guest_cart().await;
    assert!(matches!(result, Err(ClientError::Unauthorized)));
}

// ============================================================================
// Server backend
// ============================================================================

#[tokio::test]
async fn sequential_adds_clamp_at_the_line_cap() {
    let h = harness(true).await;

    h.cart.add_item(&input(10), 60, None).await.unwrap();
    let snapshot = h.cart.add_item(&input(10), 60, None).await.unwrap();

    assert_eq!(snapshot.items.len(), 1);
    assert_eq!(snapshot.items[0].quantity, MAX_LINE_QUANTITY);
}

#[tokio::test]
async fn zero_quantity_update_equals_removal() {
    let h = harness(true).await;

    let snapshot = h.cart.add_item(&input(10), 3, None).await.unwrap();
    let line_id = snapshot.items[0].id;

    let after = h.cart.update_quantity(line_id, 0).await.unwrap();
    assert!(after.items.is_empty());
    assert_eq!(after.summary.total_items, 0);

    // And removal of the now-absent line stays a no-op.
    let again = h.cart.remove_item(line_id).await.unwrap();
    assert!(again.items.is_empty());
}

#[tokio::test]
async fn mutation_response_is_authoritative_and_cached() {
    let h = harness(true).await;

    h.cart.add_item(&input(10), 1, None).await.unwrap();
    let fetches_after_add = h.api.fetch_calls.load(Ordering::SeqCst);

    // The add response replaced the cache; a read inside the freshness
    // window must not refetch.
    let snapshot = h.cart.snapshot().await.unwrap();
    assert_eq!(snapshot.items.len(), 1);
    assert_eq!(h.api.fetch_calls.load(Ordering::SeqCst), fetches_after_add);
}

#[tokio::test]
async fn failed_mutation_rolls_back_to_last_known_good_state() {
    let h = harness(true).await;

    let before = h.cart.add_item(&input(10), 2, None).await.unwrap();

    h.api.fail_next(Failure::Rejected);
    let result = h.cart.add_item(&input(11), 1, None).await;

    match result {
        Err(ClientError::Rejected { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "Недостаточно товара на складе");
        }
        other => panic!("expected Rejected, got {other:?}"),
    }

    let after = h.cart.snapshot().await.unwrap();
    assert_eq!(after.items.len(), before.items.len());
    assert_eq!(after.items[0].quantity, before.items[0].quantity);
    assert_eq!(after.summary.total_items, before.summary.total_items);
}

#[tokio::test]
async fn transient_failures_are_distinguishable_from_rejections() {
    let h = harness(true).await;

    h.api.fail_next(Failure::ServerDown);
    let err = h.cart.add_item(&input(10), 1, None).await.unwrap_err();
    assert!(err.is_transient());
    assert!(!err.is_rejection());

    h.api.fail_next(Failure::Rejected);
    let err = h.cart.add_item(&input(10), 1, None).await.unwrap_err();
    assert!(err.is_rejection());
    assert!(!err.is_transient());
}

#[tokio::test]
async fn removing_an_absent_line_skips_the_server_call() {
    let h = harness(true).await;

    h.cart.add_item(&input(10), 1, None).await.unwrap();
    let removes_before = h.api.remove_calls.load(Ordering::SeqCst);

    let snapshot = h.cart.remove_item(777).await.unwrap();
    assert_eq!(snapshot.items.len(), 1);
    assert_eq!(h.api.remove_calls.load(Ordering::SeqCst), removes_before);
}

#[tokio::test]
async fn validation_rejects_bad_quantities_before_any_network_call() {
    let h = harness(true).await;

    let err = h.cart.add_item(&input(10), 0, None).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));

    let err = h
        .cart
        .add_item(&input(10), MAX_LINE_QUANTITY + 1, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));

    assert_eq!(h.api.add_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn rejected_session_falls_back_to_guest_for_reads() {
    let h = harness(false).await;
    h.cart.add_item(&input(10), 1, None).await.unwrap();

    h.store.put(USER_KEY, &profile()).unwrap();
    h.session.load_cached_user().await.unwrap();

    h.api.fail_next(Failure::Unauthorized);
    let snapshot = h.cart.snapshot().await.unwrap();

    // Reads degrade to the guest view instead of erroring.
    assert_eq!(snapshot.items.len(), 1);
    assert_eq!(snapshot.items[0].variant_id, 10);
}

#[tokio::test]
async fn clear_empties_the_server_cart() {
    let h = harness(true).await;

    h.cart.add_item(&input(10), 2, None).await.unwrap();
    h.cart.add_item(&input(11), 1, None).await.unwrap();

    let snapshot = h.cart.clear().await.unwrap();
    assert!(snapshot.items.is_empty());
    assert_eq!(snapshot.summary.total_items, 0);
}

#[tokio::test]
async fn lookup_helpers_reflect_the_active_backend() {
    let h = harness(true).await;

    h.cart.add_item(&input(10), 2, None).await.unwrap();

    assert!(h.cart.contains_variant(10).await.unwrap());
    assert!(!h.cart.contains_variant(11).await.unwrap());
    assert_eq!(h.cart.variant_quantity(10).await.unwrap(), 2);
    assert_eq!(h.cart.variant_quantity(11).await.unwrap(), 0);

    let line = h.cart.line_for_variant(10).await.unwrap().unwrap();
    assert_eq!(line.quantity, 2);
}
