use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;
use scifiweb_core::config::RuntimeConfig;
use scifiweb_core::eval::Value;
use scifiweb_core::runtime::{CallerContext, EventRuntime, InvocationError, SideEffect};
use scifiweb_core::store::{EconomyStore, Entity, InMemoryStore};
use scifiweb_core::{parse, resolve};

const PROGRAM: &str = r#"
collectable Coin has amount;
collectable Gem has amount;
collectable Key has amount;
collectable Chest {
    property opened switch = off;
}

distribution ChestLoot {
    amount range 10 to 20;
    group range 1 to 1;
    weighted [100% for Coin];
}

remote event ChestOpened [chest Chest, opener user];

event OpenChest {
    params [chest Chest, opener user];
    authorize chest.owner;
    assert chest.opened = off;
    option:
        timer 10 seconds
    or
        cost 5 x Gem
    end;
    award ChestLoot to opener;
    notify opener of ChestOpened with [chest, opener];
}

event Grant {
    params [grantee user];
    authorize gameserver;
    award 100 x Coin to grantee;
}

event Fine {
    params [culprit user];
    authorize gameserver;
    award 10 x Coin to culprit;
    award -50 x Gem to culprit;
    award 1 x Key to culprit;
}

event Enter {
    params [player user, level integer >= 3];
    authorize user;
    assert level < 100;
}

event Payout {
    params [first user, second user];
    authorize gameserver;
    award 5 x Coin to [first, second];
}

event Collect {
    params [first user, second user];
    authorize gameserver;
    award -5 x Gem to [first, second];
}
"#;

fn runtime_with(store: Arc<InMemoryStore>) -> EventRuntime {
    let file = parse(PROGRAM).expect("program parses");
    let program = Arc::new(resolve(vec![file]).expect("program resolves"));
    EventRuntime::new(program, store, RuntimeConfig::default())
}

fn chest(id: &str, owner: &str, opened: bool) -> Entity {
    Entity {
        id: id.to_string(),
        kind: "Chest".to_string(),
        owner: owner.to_string(),
        attributes: HashMap::from([("opened".to_string(), Value::Boolean(opened))]),
    }
}

fn rng() -> StdRng {
    StdRng::seed_from_u64(42)
}

#[tokio::test]
async fn test_grant_credits_target() {
    let store = Arc::new(InMemoryStore::new());
    let runtime = runtime_with(store.clone());

    let outcome = runtime
        .run_event(
            "Grant",
            vec![Value::Owner("alice".to_string())],
            &CallerContext::role("srv-1", "gameserver"),
            rng(),
        )
        .await
        .unwrap();

    assert_eq!(
        outcome.effects,
        vec![SideEffect::Credit {
            owner: "alice".to_string(),
            collectable: "Coin".to_string(),
            amount: 100,
        }]
    );
    assert_eq!(store.balance("alice", "Coin").await.unwrap(), 100);
}

#[tokio::test]
async fn test_failed_authorize_means_zero_mutations() {
    let store = Arc::new(InMemoryStore::new());
    let runtime = runtime_with(store.clone());

    let err = runtime
        .run_event(
            "Grant",
            vec![Value::Owner("alice".to_string())],
            &CallerContext::user("mallory"),
            rng(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, InvocationError::NotAuthorized { .. }));
    assert_eq!(store.balance("alice", "Coin").await.unwrap(), 0);
}

#[tokio::test]
async fn test_owner_authorize_rejects_non_owner() {
    let store = Arc::new(InMemoryStore::new());
    store.set_balance("mallory", "Gem", 100);
    let runtime = runtime_with(store.clone());

    let err = runtime
        .run_event(
            "OpenChest",
            vec![
                Value::Entity(chest("chest-1", "alice", false)),
                Value::Owner("mallory".to_string()),
            ],
            &CallerContext::user("mallory"),
            rng(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, InvocationError::NotAuthorized { .. }));
    // chest state and balances untouched
    assert_eq!(store.balance("mallory", "Gem").await.unwrap(), 100);
    assert_eq!(store.balance("mallory", "Coin").await.unwrap(), 0);
    assert!(store.notifications().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cost_branch_wins_instantly() {
    let store = Arc::new(InMemoryStore::new());
    store.set_balance("alice", "Gem", 10);
    let runtime = runtime_with(store.clone());

    let started = tokio::time::Instant::now();
    let outcome = runtime
        .run_event(
            "OpenChest",
            vec![
                Value::Entity(chest("chest-1", "alice", false)),
                Value::Owner("alice".to_string()),
            ],
            &CallerContext::user("alice"),
            rng(),
        )
        .await
        .unwrap();

    // the cost branch resolved synchronously, no time elapsed for the timer
    assert_eq!(started.elapsed(), Duration::ZERO);
    assert_eq!(store.balance("alice", "Gem").await.unwrap(), 5);
    assert!(matches!(
        outcome.effects[0],
        SideEffect::Debit { ref collectable, amount: 5, .. } if collectable == "Gem"
    ));
    // loot arrived
    let coins = store.balance("alice", "Coin").await.unwrap();
    assert!((10..=20).contains(&coins), "coins: {}", coins);
}

#[tokio::test(start_paused = true)]
async fn test_timer_branch_wins_when_cost_fails() {
    let store = Arc::new(InMemoryStore::new());
    // no gems: the cost trigger fails and drops out of the race
    let runtime = runtime_with(store.clone());

    let started = tokio::time::Instant::now();
    let outcome = runtime
        .run_event(
            "OpenChest",
            vec![
                Value::Entity(chest("chest-1", "alice", false)),
                Value::Owner("alice".to_string()),
            ],
            &CallerContext::user("alice"),
            rng(),
        )
        .await
        .unwrap();

    assert_eq!(started.elapsed(), Duration::from_secs(10));
    // no debit happened, only the loot credit
    assert!(
        outcome
            .effects
            .iter()
            .all(|e| !matches!(e, SideEffect::Debit { .. })),
        "{:?}",
        outcome.effects
    );
    assert!(store.balance("alice", "Coin").await.unwrap() >= 10);
}

#[tokio::test]
async fn test_assert_aborts_without_rolling_back() {
    let store = Arc::new(InMemoryStore::new());
    store.set_balance("alice", "Gem", 5);
    let runtime = runtime_with(store.clone());

    // opened chest fails the assert before the option block
    let err = runtime
        .run_event(
            "OpenChest",
            vec![
                Value::Entity(chest("chest-1", "alice", true)),
                Value::Owner("alice".to_string()),
            ],
            &CallerContext::user("alice"),
            rng(),
        )
        .await
        .unwrap_err();

    match err {
        InvocationError::AssertionFailed { statement, .. } => assert_eq!(statement, 0),
        other => panic!("expected assertion failure, got {:?}", other),
    }
    assert_eq!(store.balance("alice", "Gem").await.unwrap(), 5);
}

#[tokio::test]
async fn test_mid_event_debit_failure_keeps_earlier_effects() {
    let store = Arc::new(InMemoryStore::new());
    // no gems: the -50 x Gem award fails after the coin credit applied
    let runtime = runtime_with(store.clone());

    let err = runtime
        .run_event(
            "Fine",
            vec![Value::Owner("bob".to_string())],
            &CallerContext::role("srv-1", "gameserver"),
            rng(),
        )
        .await
        .unwrap_err();

    match err {
        InvocationError::InsufficientBalance {
            statement,
            ref collectable,
            ..
        } => {
            assert_eq!(statement, 1);
            assert_eq!(collectable, "Gem");
        }
        other => panic!("expected insufficient balance, got {:?}", other),
    }
    // the earlier statement's credit persists, the later one never ran
    assert_eq!(store.balance("bob", "Coin").await.unwrap(), 10);
    assert_eq!(store.balance("bob", "Key").await.unwrap(), 0);
}

#[tokio::test]
async fn test_award_to_a_set_credits_each_owner() {
    let store = Arc::new(InMemoryStore::new());
    let runtime = runtime_with(store.clone());

    runtime
        .run_event(
            "Payout",
            vec![
                Value::Owner("alice".to_string()),
                Value::Owner("bob".to_string()),
            ],
            &CallerContext::role("srv-1", "gameserver"),
            rng(),
        )
        .await
        .unwrap();

    assert_eq!(store.balance("alice", "Coin").await.unwrap(), 5);
    assert_eq!(store.balance("bob", "Coin").await.unwrap(), 5);
}

#[tokio::test]
async fn test_set_debit_applies_partially_on_mid_set_failure() {
    let store = Arc::new(InMemoryStore::new());
    store.set_balance("alice", "Gem", 5);
    // bob holds nothing; his transaction fails after alice's applied
    let runtime = runtime_with(store.clone());

    let err = runtime
        .run_event(
            "Collect",
            vec![
                Value::Owner("alice".to_string()),
                Value::Owner("bob".to_string()),
            ],
            &CallerContext::role("srv-1", "gameserver"),
            rng(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        InvocationError::InsufficientBalance { ref owner, .. } if owner == "bob"
    ));
    // each owner's transaction is independent: alice's debit stands
    assert_eq!(store.balance("alice", "Gem").await.unwrap(), 0);
}

#[tokio::test]
async fn test_param_guard_rejects_binding() {
    let store = Arc::new(InMemoryStore::new());
    let runtime = runtime_with(store.clone());

    let err = runtime
        .run_event(
            "Enter",
            vec![Value::Owner("alice".to_string()), Value::Integer(2)],
            &CallerContext::user("alice"),
            rng(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, InvocationError::ParamBinding { .. }));

    let ok = runtime
        .run_event(
            "Enter",
            vec![Value::Owner("alice".to_string()), Value::Integer(3)],
            &CallerContext::user("alice"),
            rng(),
        )
        .await;
    assert!(ok.is_ok());
}

#[tokio::test]
async fn test_wrong_argument_kind_aborts_binding() {
    let store = Arc::new(InMemoryStore::new());
    let runtime = runtime_with(store.clone());

    let err = runtime
        .run_event(
            "Grant",
            vec![Value::Integer(7)],
            &CallerContext::role("srv-1", "gameserver"),
            rng(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, InvocationError::ParamBinding { .. }));
    assert!(store.notifications().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_notification_is_delivered() {
    let store = Arc::new(InMemoryStore::new());
    store.set_balance("alice", "Gem", 10);
    let runtime = runtime_with(store.clone());

    let outcome = runtime
        .run_event(
            "OpenChest",
            vec![
                Value::Entity(chest("chest-1", "alice", false)),
                Value::Owner("alice".to_string()),
            ],
            &CallerContext::user("alice"),
            rng(),
        )
        .await
        .unwrap();

    assert!(
        outcome
            .effects
            .iter()
            .any(|e| matches!(e, SideEffect::Notify { event } if event == "ChestOpened"))
    );
    // the outbound send is fire-and-forget; give the spawned task a turn
    tokio::time::sleep(Duration::from_millis(1)).await;
    let notifications = store.notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].event, "ChestOpened");
    assert_eq!(notifications[0].args.len(), 2);
}

#[tokio::test]
async fn test_unknown_event() {
    let store = Arc::new(InMemoryStore::new());
    let runtime = runtime_with(store);
    let err = runtime
        .run_event("Missing", vec![], &CallerContext::user("alice"), rng())
        .await
        .unwrap_err();
    assert!(matches!(err, InvocationError::UnknownEvent { .. }));
}

const FIND_PROGRAM: &str = r#"
collectable Chest {
    property opened switch = off;
}

remote event Claimed [chest Chest];

event Claim {
    params [chest Chest];
    authorize chest.owner;
    set server = find one gameserver with chest;
    notify server of Claimed with [chest];
}

event TryClaim {
    params [chest Chest];
    authorize chest.owner;
    set server = find any gameserver with chest or continue;
    assert server != chest;
}
"#;

fn find_runtime(store: Arc<InMemoryStore>) -> EventRuntime {
    let file = parse(FIND_PROGRAM).expect("program parses");
    let program = Arc::new(resolve(vec![file]).expect("program resolves"));
    EventRuntime::new(program, store, RuntimeConfig::default())
}

fn gameserver(id: &str, chest: &Entity) -> Entity {
    Entity {
        id: id.to_string(),
        kind: "gameserver".to_string(),
        owner: "host".to_string(),
        attributes: HashMap::from([("chest".to_string(), Value::Entity(chest.clone()))]),
    }
}

#[tokio::test]
async fn test_find_exactly_one_binds_entity() {
    let store = Arc::new(InMemoryStore::new());
    let chest = chest("chest-1", "alice", false);
    store.add_entity(chest.clone());
    store.add_entity(gameserver("gs-1", &chest));
    let runtime = find_runtime(store.clone());

    let outcome = runtime
        .run_event(
            "Claim",
            vec![Value::Entity(chest)],
            &CallerContext::user("alice"),
            rng(),
        )
        .await
        .unwrap();
    assert_eq!(outcome.effects.len(), 1);
}

#[tokio::test]
async fn test_find_violation_aborts() {
    let store = Arc::new(InMemoryStore::new());
    let chest = chest("chest-1", "alice", false);
    // no matching gameserver registered
    let runtime = find_runtime(store.clone());

    let err = runtime
        .run_event(
            "Claim",
            vec![Value::Entity(chest)],
            &CallerContext::user("alice"),
            rng(),
        )
        .await
        .unwrap_err();
    match err {
        InvocationError::Find { statement, .. } => assert_eq!(statement, 0),
        other => panic!("expected find error, got {:?}", other),
    }
    assert!(store.notifications().is_empty());
}

#[tokio::test]
async fn test_find_or_continue_binds_null() {
    let store = Arc::new(InMemoryStore::new());
    let chest = chest("chest-1", "alice", false);
    let runtime = find_runtime(store.clone());

    // zero matches is within `any` cardinality; execution continues with
    // the variable bound to nothing
    let outcome = runtime
        .run_event(
            "TryClaim",
            vec![Value::Entity(chest)],
            &CallerContext::user("alice"),
            rng(),
        )
        .await
        .unwrap();
    assert!(outcome.effects.is_empty());
}

#[tokio::test]
async fn test_same_seed_same_loot() {
    let store_a = Arc::new(InMemoryStore::new());
    let store_b = Arc::new(InMemoryStore::new());
    for store in [&store_a, &store_b] {
        store.set_balance("alice", "Gem", 10);
    }
    let args = || {
        vec![
            Value::Entity(chest("chest-1", "alice", false)),
            Value::Owner("alice".to_string()),
        ]
    };

    let outcome_a = runtime_with(store_a.clone())
        .run_event(
            "OpenChest",
            args(),
            &CallerContext::user("alice"),
            StdRng::seed_from_u64(7),
        )
        .await
        .unwrap();
    let outcome_b = runtime_with(store_b.clone())
        .run_event(
            "OpenChest",
            args(),
            &CallerContext::user("alice"),
            StdRng::seed_from_u64(7),
        )
        .await
        .unwrap();

    assert_eq!(outcome_a.effects, outcome_b.effects);
    assert_eq!(
        store_a.balance("alice", "Coin").await.unwrap(),
        store_b.balance("alice", "Coin").await.unwrap()
    );
}

#[tokio::test(start_paused = true)]
async fn test_invocation_timeout() {
    let store = Arc::new(InMemoryStore::new());
    let file = parse(PROGRAM).expect("program parses");
    let program = Arc::new(resolve(vec![file]).expect("program resolves"));
    let runtime = EventRuntime::new(
        program,
        store,
        RuntimeConfig {
            invocation_timeout: Some(Duration::from_secs(5)),
        },
    );

    // no gems: only the 10 second timer branch remains, which outlives the
    // 5 second invocation timeout
    let err = runtime
        .run_event(
            "OpenChest",
            vec![
                Value::Entity(chest("chest-1", "alice", false)),
                Value::Owner("alice".to_string()),
            ],
            &CallerContext::user("alice"),
            rng(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, InvocationError::Timeout { .. }));
}
