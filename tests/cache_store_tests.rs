use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jyotish::clock::ManualClock;
use jyotish::config::Config;
use jyotish::db::{NewProfile, Store};
use jyotish::domain::{CacheError, CacheFamily, Caller, NewCacheRecord, Subject, cache_key};
use jyotish::services::freshness::{self, Freshness};
use jyotish::services::{
    CacheService, ChartCalculator, Computation, FillRequest, Lookup, SeaOrmCacheService,
    ServedFrom,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

fn start() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-10-19T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

struct Fixture {
    store: Store,
    clock: ManualClock,
    alice: Caller,
    bob: Caller,
}

async fn setup() -> Fixture {
    let clock = ManualClock::new(start());
    let store = Store::with_pool_options("sqlite::memory:", 1, 1)
        .await
        .expect("Failed to open in-memory store")
        .with_clock(Arc::new(clock.clone()));

    Fixture {
        store,
        clock,
        alice: Caller::authenticated("user-alice"),
        bob: Caller::authenticated("user-bob"),
    }
}

async fn add_profile(store: &Store, caller: &Caller, name: &str) -> String {
    store
        .profiles(caller)
        .create(NewProfile {
            name: name.to_string(),
            birth_date: "1991-02-03".to_string(),
            birth_time: "04:05".to_string(),
            birth_place: None,
            latitude: 12.97,
            longitude: 77.59,
            timezone: "Asia/Kolkata".to_string(),
        })
        .await
        .unwrap()
        .id
}

fn draft(owner: &Caller, subject: Subject, key: &str, expires_at: DateTime<Utc>) -> NewCacheRecord {
    NewCacheRecord {
        owner_id: owner.id().to_string(),
        subject,
        cache_key: key.to_string(),
        payload: json!({"lagna": "Vrishchika", "dasha": ["Saturn", "Mercury"]}),
        auxiliary_inputs: None,
        expires_at,
    }
}

fn service(store: &Store) -> SeaOrmCacheService {
    SeaOrmCacheService::new(store.clone(), Arc::new(RwLock::new(Config::default())))
}

struct CountingCalculator {
    calls: AtomicUsize,
}

impl CountingCalculator {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChartCalculator for CountingCalculator {
    async fn compute(
        &self,
        family: CacheFamily,
        subject: &Subject,
        inputs: &Value,
    ) -> anyhow::Result<Computation> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Computation {
            payload: json!({
                "family": family.as_str(),
                "profile": subject.primary(),
                "inputs": inputs,
                "call": call,
            }),
            auxiliary_inputs: Some(json!({"ephemeris": "swiss"})),
        })
    }
}

#[tokio::test]
async fn put_then_get_returns_stored_payload() {
    let fx = setup().await;
    let profile = add_profile(&fx.store, &fx.alice, "Alice").await;
    let cache = fx.store.cache(CacheFamily::LifeSnapshot, &fx.alice);

    let expires_at = start() + Duration::hours(24);
    let stored = cache
        .put(draft(&fx.alice, Subject::profile(&profile), "k1", expires_at))
        .await
        .unwrap();

    assert_eq!(stored.owner_id, fx.alice.id());
    assert_eq!(stored.generated_at, start());

    let fetched = cache.get_by_key("k1").await.unwrap().unwrap();
    assert_eq!(fetched.id, stored.id);
    assert_eq!(fetched.payload, stored.payload);
    assert_eq!(fetched.expires_at, expires_at);
    assert_eq!(fetched.subject, Subject::profile(&profile));

    assert!(cache.get_by_key("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn put_rejects_expiry_not_in_future() {
    let fx = setup().await;
    let profile = add_profile(&fx.store, &fx.alice, "Alice").await;
    let cache = fx.store.cache(CacheFamily::Varshaphal, &fx.alice);

    let at_now = cache
        .put(draft(&fx.alice, Subject::profile(&profile), "k1", start()))
        .await;
    assert!(matches!(at_now, Err(CacheError::InvalidExpiry { .. })));

    let past = cache
        .put(draft(
            &fx.alice,
            Subject::profile(&profile),
            "k1",
            start() - Duration::days(1),
        ))
        .await;
    assert!(matches!(past, Err(CacheError::InvalidExpiry { .. })));

    assert!(cache.get_by_key("k1").await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_key_is_rejected_and_original_kept() {
    let fx = setup().await;
    let profile = add_profile(&fx.store, &fx.alice, "Alice").await;
    let cache = fx.store.cache(CacheFamily::Varshaphal, &fx.alice);
    let expires_at = start() + Duration::days(30);

    let first = cache
        .put(draft(&fx.alice, Subject::profile(&profile), "k1", expires_at))
        .await
        .unwrap();

    let mut second = draft(&fx.alice, Subject::profile(&profile), "k1", expires_at);
    second.payload = json!({"other": true});
    let err = cache.put(second).await.unwrap_err();
    assert!(matches!(err, CacheError::DuplicateKey(ref key) if key == "varshaphal:k1"));

    let kept = cache.get_by_key("k1").await.unwrap().unwrap();
    assert_eq!(kept.id, first.id);
    assert_eq!(kept.payload, first.payload);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_fills_converge_on_one_record() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("race.db").display());
    let store = Store::with_pool_options(&url, 5, 1)
        .await
        .expect("Failed to open file-backed store")
        .with_clock(Arc::new(ManualClock::new(start())));
    let alice = Caller::authenticated("user-alice");
    let profile = add_profile(&store, &alice, "Alice").await;
    let svc = Arc::new(service(&store));

    let fills: Vec<_> = (0..16)
        .map(|writer| {
            let svc = Arc::clone(&svc);
            let alice = alice.clone();
            let subject = Subject::profile(&profile);
            tokio::spawn(async move {
                svc.fill(
                    &alice,
                    CacheFamily::Varshaphal,
                    FillRequest {
                        subject,
                        cache_key: "race".to_string(),
                        payload: json!({"writer": writer}),
                        auxiliary_inputs: None,
                        expires_at: None,
                    },
                )
                .await
            })
        })
        .collect();

    let mut served = Vec::new();
    for fill in fills {
        served.push(fill.await.unwrap().unwrap());
    }

    let winner = &served[0].record;
    for s in &served {
        assert_eq!(s.record.id, winner.id);
        assert_eq!(s.record.payload, winner.payload);
    }
    let inserted = served
        .iter()
        .filter(|s| s.source == ServedFrom::Inserted)
        .count();
    assert_eq!(inserted, 1);
    assert_eq!(served.len() - inserted, 15);

    let stats = store.cache_stats().await.unwrap();
    let varsha = stats
        .iter()
        .find(|s| s.family == CacheFamily::Varshaphal)
        .unwrap();
    assert_eq!((varsha.live, varsha.expired), (1, 0));
}

#[tokio::test]
async fn fill_onto_an_expired_key_stores_a_successor() {
    let fx = setup().await;
    let profile = add_profile(&fx.store, &fx.alice, "Alice").await;
    let svc = service(&fx.store);

    let request = |payload: Value, expires_at: Option<DateTime<Utc>>| FillRequest {
        subject: Subject::profile(&profile),
        cache_key: "k1".to_string(),
        payload,
        auxiliary_inputs: None,
        expires_at,
    };

    let old = svc
        .fill(
            &fx.alice,
            CacheFamily::LifeSnapshot,
            request(json!({"v": "old"}), Some(start() + Duration::hours(1))),
        )
        .await
        .unwrap();

    fx.clock.advance(Duration::hours(2));

    let fresh = svc
        .fill(&fx.alice, CacheFamily::LifeSnapshot, request(json!({"v": "new"}), None))
        .await
        .unwrap();
    assert_eq!(fresh.source, ServedFrom::Inserted);
    assert_eq!(fresh.record.payload, json!({"v": "new"}));
    assert_eq!(
        fresh.record.cache_key,
        cache_key::successor(&old.record.cache_key, old.record.generated_at)
    );
    assert!(fresh.record.is_valid_at(fx.store.clock().now()));

    // The live successor is what later fills of the same key land on.
    let again = svc
        .fill(&fx.alice, CacheFamily::LifeSnapshot, request(json!({"v": "newer"}), None))
        .await
        .unwrap();
    assert_eq!(again.source, ServedFrom::Converged);
    assert_eq!(again.record.id, fresh.record.id);
    assert_eq!(again.record.payload, json!({"v": "new"}));

    let stale = svc
        .lookup(&fx.alice, CacheFamily::LifeSnapshot, "k1")
        .await
        .unwrap();
    assert!(matches!(stale, Lookup::Expired(ref r) if r.id == old.record.id));
}

#[tokio::test]
async fn windowed_record_expires_with_its_window() {
    let fx = setup().await;
    let profile = add_profile(&fx.store, &fx.alice, "Alice").await;
    let svc = service(&fx.store);
    let calc = CountingCalculator::new();
    let inputs = json!({"year": 2026});
    let horizon = Config::default().cache.horizon(CacheFamily::Varshaphal);
    let end = cache_key::window_end(start(), horizon);

    fx.clock.set(end - Duration::minutes(1));
    let first = svc
        .get_or_compute(
            &fx.alice,
            CacheFamily::Varshaphal,
            Subject::profile(&profile),
            &inputs,
            &calc,
        )
        .await
        .unwrap();
    assert_eq!(first.source, ServedFrom::Inserted);
    assert_eq!(first.record.expires_at, end);

    fx.clock.advance(Duration::minutes(2));

    let latest = svc
        .latest(&fx.alice, CacheFamily::Varshaphal, &profile)
        .await
        .unwrap();
    assert_eq!(latest.freshness(), Freshness::Expired);

    let second = svc
        .get_or_compute(
            &fx.alice,
            CacheFamily::Varshaphal,
            Subject::profile(&profile),
            &inputs,
            &calc,
        )
        .await
        .unwrap();
    assert_eq!(second.source, ServedFrom::Inserted);
    assert_eq!(second.record.expires_at, end + horizon);
    assert_eq!(calc.calls(), 2);

    let stats = fx.store.cache_stats().await.unwrap();
    let varsha = stats
        .iter()
        .find(|s| s.family == CacheFamily::Varshaphal)
        .unwrap();
    assert_eq!((varsha.live, varsha.expired), (1, 1));
}

#[tokio::test]
async fn explicit_keys_are_scoped_by_family_tag() {
    let fx = setup().await;
    let profile = add_profile(&fx.store, &fx.alice, "Alice").await;
    let expires_at = start() + Duration::days(1);
    let life = fx.store.cache(CacheFamily::LifeSnapshot, &fx.alice);
    let varsha = fx.store.cache(CacheFamily::Varshaphal, &fx.alice);

    let a = life
        .put(draft(&fx.alice, Subject::profile(&profile), "shared", expires_at))
        .await
        .unwrap();
    let b = varsha
        .put(draft(&fx.alice, Subject::profile(&profile), "shared", expires_at))
        .await
        .unwrap();

    assert_eq!(a.cache_key, "life_snapshot:shared");
    assert_eq!(b.cache_key, "varshaphal:shared");

    assert_eq!(life.get_by_key("shared").await.unwrap().unwrap().id, a.id);
    assert_eq!(varsha.get_by_key("shared").await.unwrap().unwrap().id, b.id);
    assert_eq!(
        varsha.get_by_key("varshaphal:shared").await.unwrap().unwrap().id,
        b.id
    );
    assert!(life.get_by_key("varshaphal:shared").await.unwrap().is_none());
}

#[tokio::test]
async fn fill_defaults_expiry_to_family_horizon() {
    let fx = setup().await;
    let profile = add_profile(&fx.store, &fx.alice, "Alice").await;
    let served = service(&fx.store)
        .fill(
            &fx.alice,
            CacheFamily::Comparison,
            FillRequest {
                subject: Subject::pair(&profile, add_profile(&fx.store, &fx.alice, "Ravi").await)
                    .unwrap(),
                cache_key: "cmp".to_string(),
                payload: json!({"guna_milan": 27}),
                auxiliary_inputs: None,
                expires_at: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(served.source, ServedFrom::Inserted);
    assert_eq!(served.record.expires_at, start() + Duration::days(90));
}

#[tokio::test]
async fn other_owners_are_forbidden() {
    let fx = setup().await;
    let alice_profile = add_profile(&fx.store, &fx.alice, "Alice").await;
    let bob_profile = add_profile(&fx.store, &fx.bob, "Bob").await;
    let expires_at = start() + Duration::days(30);

    let record = fx
        .store
        .cache(CacheFamily::Varshaphal, &fx.alice)
        .put(draft(&fx.alice, Subject::profile(&alice_profile), "alice-k", expires_at))
        .await
        .unwrap();

    let as_bob = fx.store.cache(CacheFamily::Varshaphal, &fx.bob);

    assert!(matches!(
        as_bob.get_by_key("alice-k").await,
        Err(CacheError::Forbidden { .. })
    ));
    assert!(matches!(
        as_bob.get_by_id(&record.id).await,
        Err(CacheError::Forbidden { .. })
    ));
    assert!(matches!(
        as_bob.delete(&record.id).await,
        Err(CacheError::Forbidden { .. })
    ));
    assert!(matches!(
        as_bob
            .get_latest_for_subject(fx.alice.id(), &alice_profile)
            .await,
        Err(CacheError::Forbidden { .. })
    ));
    assert!(matches!(
        as_bob
            .set_auxiliary_inputs(&record.id, Some(json!({"x": 1})))
            .await,
        Err(CacheError::Forbidden { .. })
    ));

    // Claiming to be alice in the record doesn't help.
    assert!(matches!(
        as_bob
            .put(draft(&fx.alice, Subject::profile(&bob_profile), "forged", expires_at))
            .await,
        Err(CacheError::Forbidden { .. })
    ));

    // Neither does caching a chart about alice's profile under bob's name.
    assert!(matches!(
        as_bob
            .put(draft(&fx.bob, Subject::profile(&alice_profile), "snoop", expires_at))
            .await,
        Err(CacheError::Forbidden { .. })
    ));

    let still_there = fx
        .store
        .cache(CacheFamily::Varshaphal, &fx.alice)
        .get_by_key("alice-k")
        .await
        .unwrap();
    assert!(still_there.is_some());

    assert!(matches!(
        fx.store.profiles(&fx.bob).get(&alice_profile).await,
        Err(CacheError::Forbidden { .. })
    ));
}

#[tokio::test]
async fn delete_is_idempotent() {
    let fx = setup().await;
    let profile = add_profile(&fx.store, &fx.alice, "Alice").await;
    let cache = fx.store.cache(CacheFamily::LifeSnapshot, &fx.alice);

    let record = cache
        .put(draft(
            &fx.alice,
            Subject::profile(&profile),
            "k1",
            start() + Duration::hours(1),
        ))
        .await
        .unwrap();

    assert!(cache.delete(&record.id).await.unwrap());
    assert!(!cache.delete(&record.id).await.unwrap());
    assert!(!cache.delete("never-existed").await.unwrap());
    assert!(cache.get_by_key("k1").await.unwrap().is_none());
}

#[tokio::test]
async fn deleting_a_profile_removes_its_cached_charts() {
    let fx = setup().await;
    let main = add_profile(&fx.store, &fx.alice, "Alice").await;
    let partner = add_profile(&fx.store, &fx.alice, "Ravi").await;
    let other = add_profile(&fx.store, &fx.alice, "Meera").await;
    let expires_at = start() + Duration::days(1);

    let life = fx.store.cache(CacheFamily::LifeSnapshot, &fx.alice);
    let varsha = fx.store.cache(CacheFamily::Varshaphal, &fx.alice);
    let comparison = fx.store.cache(CacheFamily::Comparison, &fx.alice);

    life.put(draft(&fx.alice, Subject::profile(&main), "life", expires_at))
        .await
        .unwrap();
    varsha
        .put(draft(&fx.alice, Subject::profile(&main), "varsha", expires_at))
        .await
        .unwrap();
    comparison
        .put(draft(
            &fx.alice,
            Subject::pair(&main, &partner).unwrap(),
            "as-primary",
            expires_at,
        ))
        .await
        .unwrap();
    comparison
        .put(draft(
            &fx.alice,
            Subject::pair(&other, &main).unwrap(),
            "as-counterpart",
            expires_at,
        ))
        .await
        .unwrap();
    life.put(draft(&fx.alice, Subject::profile(&other), "unrelated", expires_at))
        .await
        .unwrap();

    assert!(fx.store.profiles(&fx.alice).delete(&main).await.unwrap());

    assert!(life.get_by_key("life").await.unwrap().is_none());
    assert!(varsha.get_by_key("varsha").await.unwrap().is_none());
    assert!(comparison.get_by_key("as-primary").await.unwrap().is_none());
    assert!(comparison.get_by_key("as-counterpart").await.unwrap().is_none());
    assert!(life.get_by_key("unrelated").await.unwrap().is_some());
}

#[tokio::test]
async fn put_for_unknown_profile_fails() {
    let fx = setup().await;
    let cache = fx.store.cache(CacheFamily::LifeSnapshot, &fx.alice);

    let result = cache
        .put(draft(
            &fx.alice,
            Subject::profile("no-such-profile"),
            "k1",
            start() + Duration::hours(1),
        ))
        .await;

    assert!(matches!(result, Err(CacheError::SubjectNotFound(_))));
}

#[tokio::test]
async fn expired_record_is_returned_but_not_served() {
    let fx = setup().await;
    let profile = add_profile(&fx.store, &fx.alice, "Alice").await;
    let cache = fx.store.cache(CacheFamily::LifeSnapshot, &fx.alice);

    cache
        .put(draft(
            &fx.alice,
            Subject::profile(&profile),
            "k1",
            start() + Duration::hours(1),
        ))
        .await
        .unwrap();

    fx.clock.advance(Duration::hours(2));

    let raw = cache.get_by_key("k1").await.unwrap();
    assert!(raw.is_some());

    let lookup = freshness::evaluate(raw, fx.store.clock().now());
    assert_eq!(lookup.freshness(), Freshness::Expired);

    let via_service = service(&fx.store)
        .lookup(&fx.alice, CacheFamily::LifeSnapshot, "k1")
        .await
        .unwrap();
    assert!(matches!(via_service, Lookup::Expired(_)));
}

#[tokio::test]
async fn get_or_compute_serves_cached_until_the_window_rolls() {
    let fx = setup().await;
    let profile = add_profile(&fx.store, &fx.alice, "Alice").await;
    let svc = service(&fx.store);
    let calc = CountingCalculator::new();
    let inputs = json!({"year": 2026, "ayanamsa": "lahiri"});

    let first = svc
        .get_or_compute(
            &fx.alice,
            CacheFamily::Varshaphal,
            Subject::profile(&profile),
            &inputs,
            &calc,
        )
        .await
        .unwrap();
    assert_eq!(first.source, ServedFrom::Inserted);
    assert_eq!(calc.calls(), 1);

    fx.clock.advance(Duration::hours(1));
    let second = svc
        .get_or_compute(
            &fx.alice,
            CacheFamily::Varshaphal,
            Subject::profile(&profile),
            &inputs,
            &calc,
        )
        .await
        .unwrap();
    assert_eq!(second.source, ServedFrom::Cache);
    assert_eq!(second.record.id, first.record.id);
    assert_eq!(calc.calls(), 1);

    fx.clock.advance(Duration::days(31));
    let third = svc
        .get_or_compute(
            &fx.alice,
            CacheFamily::Varshaphal,
            Subject::profile(&profile),
            &inputs,
            &calc,
        )
        .await
        .unwrap();
    assert_eq!(third.source, ServedFrom::Inserted);
    assert_ne!(third.record.cache_key, first.record.cache_key);
    assert_eq!(calc.calls(), 2);

    // The stale row is still there under its own key.
    let old = svc
        .lookup(&fx.alice, CacheFamily::Varshaphal, &first.record.cache_key)
        .await
        .unwrap();
    assert!(matches!(old, Lookup::Expired(_)));

    let latest = svc
        .latest(&fx.alice, CacheFamily::Varshaphal, &profile)
        .await
        .unwrap();
    assert_eq!(latest.into_hit().unwrap().id, third.record.id);
}

#[tokio::test]
async fn short_lived_record_is_replaced_under_a_successor_key() {
    let fx = setup().await;
    let profile = add_profile(&fx.store, &fx.alice, "Alice").await;
    let svc = service(&fx.store);
    let calc = CountingCalculator::new();
    let inputs = json!({"age": 35});
    let subject = Subject::profile(&profile);

    let horizon = Config::default().cache.horizon(CacheFamily::LifeSnapshot);
    let base = cache_key::derive_windowed(
        CacheFamily::LifeSnapshot,
        &subject,
        &inputs,
        start(),
        horizon,
    );

    let short = svc
        .fill(
            &fx.alice,
            CacheFamily::LifeSnapshot,
            FillRequest {
                subject: subject.clone(),
                cache_key: base.clone(),
                payload: json!({"quick": true}),
                auxiliary_inputs: None,
                expires_at: Some(start() + Duration::minutes(5)),
            },
        )
        .await
        .unwrap();

    fx.clock.advance(Duration::minutes(10));
    assert_eq!(
        cache_key::window_index(fx.store.clock().now(), horizon),
        cache_key::window_index(start(), horizon)
    );

    let replaced = svc
        .get_or_compute(&fx.alice, CacheFamily::LifeSnapshot, subject, &inputs, &calc)
        .await
        .unwrap();

    assert_eq!(replaced.source, ServedFrom::Inserted);
    assert_eq!(
        replaced.record.cache_key,
        cache_key::successor(&base, short.record.generated_at)
    );
    assert_eq!(calc.calls(), 1);

    let stale = svc
        .lookup(&fx.alice, CacheFamily::LifeSnapshot, &base)
        .await
        .unwrap();
    assert!(matches!(stale, Lookup::Expired(_)));
}

#[tokio::test]
async fn comparison_with_itself_is_rejected() {
    let fx = setup().await;
    let profile = add_profile(&fx.store, &fx.alice, "Alice").await;

    assert!(matches!(
        Subject::pair(&profile, &profile),
        Err(CacheError::SelfComparison(_))
    ));

    let forged = Subject::Pair {
        profile_id: profile.clone(),
        counterpart_profile_id: profile.clone(),
    };
    let result = fx
        .store
        .cache(CacheFamily::Comparison, &fx.alice)
        .put(draft(&fx.alice, forged, "self", start() + Duration::days(1)))
        .await;
    assert!(matches!(result, Err(CacheError::SelfComparison(_))));
}

#[tokio::test]
async fn subject_shape_must_match_family() {
    let fx = setup().await;
    let a = add_profile(&fx.store, &fx.alice, "Alice").await;
    let b = add_profile(&fx.store, &fx.alice, "Ravi").await;
    let expires_at = start() + Duration::days(1);

    let pair_in_life = fx
        .store
        .cache(CacheFamily::LifeSnapshot, &fx.alice)
        .put(draft(&fx.alice, Subject::pair(&a, &b).unwrap(), "x", expires_at))
        .await;
    assert!(matches!(pair_in_life, Err(CacheError::InvalidSubject(_))));

    let single_in_comparison = fx
        .store
        .cache(CacheFamily::Comparison, &fx.alice)
        .put(draft(&fx.alice, Subject::profile(&a), "y", expires_at))
        .await;
    assert!(matches!(
        single_in_comparison,
        Err(CacheError::InvalidSubject(_))
    ));
}

#[tokio::test]
async fn latest_for_subject_picks_newest_and_matches_either_side() {
    let fx = setup().await;
    let a = add_profile(&fx.store, &fx.alice, "Alice").await;
    let b = add_profile(&fx.store, &fx.alice, "Ravi").await;
    let comparison = fx.store.cache(CacheFamily::Comparison, &fx.alice);
    let expires_at = start() + Duration::days(90);

    comparison
        .put(draft(&fx.alice, Subject::pair(&a, &b).unwrap(), "older", expires_at))
        .await
        .unwrap();
    fx.clock.advance(Duration::minutes(1));
    comparison
        .put(draft(&fx.alice, Subject::pair(&b, &a).unwrap(), "newer", expires_at))
        .await
        .unwrap();

    let latest_a = comparison
        .get_latest_for_subject(fx.alice.id(), &a)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest_a.cache_key, "comparison:newer");

    let latest_b = comparison
        .get_latest_for_subject(fx.alice.id(), &b)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest_b.cache_key, "comparison:newer");

    let none = fx
        .store
        .cache(CacheFamily::Varshaphal, &fx.alice)
        .get_latest_for_subject(fx.alice.id(), &a)
        .await
        .unwrap();
    assert!(none.is_none());
}

#[tokio::test]
async fn auxiliary_inputs_update_touches_updated_at_only() {
    let fx = setup().await;
    let profile = add_profile(&fx.store, &fx.alice, "Alice").await;
    let cache = fx.store.cache(CacheFamily::Varshaphal, &fx.alice);

    let record = cache
        .put(draft(
            &fx.alice,
            Subject::profile(&profile),
            "k1",
            start() + Duration::days(30),
        ))
        .await
        .unwrap();

    fx.clock.advance(Duration::minutes(3));

    let updated = cache
        .set_auxiliary_inputs(&record.id, Some(json!({"transits": ["Jupiter"]})))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.auxiliary_inputs, Some(json!({"transits": ["Jupiter"]})));
    assert_eq!(updated.updated_at, start() + Duration::minutes(3));
    assert_eq!(updated.created_at, record.created_at);
    assert_eq!(updated.generated_at, record.generated_at);
    assert_eq!(updated.expires_at, record.expires_at);
    assert_eq!(updated.payload, record.payload);

    assert!(
        cache
            .set_auxiliary_inputs("missing", None)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn sweep_removes_only_long_expired_rows() {
    let fx = setup().await;
    let profile = add_profile(&fx.store, &fx.alice, "Alice").await;
    let cache = fx.store.cache(CacheFamily::LifeSnapshot, &fx.alice);

    cache
        .put(draft(
            &fx.alice,
            Subject::profile(&profile),
            "short",
            start() + Duration::hours(1),
        ))
        .await
        .unwrap();
    cache
        .put(draft(
            &fx.alice,
            Subject::profile(&profile),
            "long",
            start() + Duration::days(30),
        ))
        .await
        .unwrap();

    fx.clock.advance(Duration::days(2));

    let stats = fx.store.cache_stats().await.unwrap();
    let life = stats
        .iter()
        .find(|s| s.family == CacheFamily::LifeSnapshot)
        .unwrap();
    assert_eq!((life.live, life.expired), (1, 1));

    let swept = jyotish::services::sweep::sweep_once(&fx.store, Duration::days(1))
        .await
        .unwrap();
    let removed: u64 = swept.iter().map(|(_, n)| n).sum();
    assert_eq!(removed, 1);

    assert!(cache.get_by_key("short").await.unwrap().is_none());
    assert!(cache.get_by_key("long").await.unwrap().is_some());
}
