use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use keysync_core::{Environment, StorageEvent, StorageManager, StoreScope};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Counter {
    count: i64,
}

fn recorded<T: Clone + Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl Fn(&T) + Send + Sync + 'static)
{
    let seen: Arc<Mutex<Vec<T>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |value: &T| {
        sink.lock().expect("listener sink").push(value.clone())
    })
}

#[test]
fn test_set_then_get_round_trip() {
    let env = Environment::in_memory();
    let manager = StorageManager::new(
        &env,
        "profile",
        Counter { count: 0 },
        StoreScope::Local,
    )
    .expect("manager should construct");

    let value = Counter { count: 42 };
    manager.set_value(&value).expect("set should succeed");
    assert_eq!(manager.get_value(), value);
}

#[test]
fn test_malformed_stored_data_falls_back_to_initial() {
    let env = Environment::in_memory();
    env.area(StoreScope::Local)
        .set_item("x", "not json")
        .expect("seed should succeed");

    let manager =
        StorageManager::new(&env, "x", 42i64, StoreScope::Local).expect("manager should construct");
    assert_eq!(manager.get_value(), 42);
}

#[test]
fn test_unsubscribed_listener_never_fires() {
    let env = Environment::in_memory();
    let manager =
        StorageManager::new(&env, "k", 0i64, StoreScope::Local).expect("manager should construct");

    let calls = Arc::new(AtomicUsize::new(0));
    let calls_listener = Arc::clone(&calls);
    let subscription = manager.subscribe(move |_| {
        calls_listener.fetch_add(1, Ordering::SeqCst);
    });

    subscription.unsubscribe();
    // Idempotent.
    subscription.unsubscribe();

    manager.set_value(&1).expect("set should succeed");
    env.announce(StorageEvent::new("k", Some("2".into()), StoreScope::Local));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_events_for_other_keys_are_ignored() {
    let env = Environment::in_memory();
    let manager =
        StorageManager::new(&env, "a", 0i64, StoreScope::Local).expect("manager should construct");

    let (seen, listener) = recorded::<i64>();
    manager.subscribe(listener);

    env.announce(StorageEvent::new("b", Some("1".into()), StoreScope::Local));
    assert!(seen.lock().expect("listener sink").is_empty());

    env.announce(StorageEvent::new("a", Some("1".into()), StoreScope::Local));
    assert_eq!(*seen.lock().expect("listener sink"), vec![1]);
}

#[test]
fn test_events_for_other_scope_are_ignored() {
    let env = Environment::in_memory();
    let session_manager = StorageManager::new(&env, "k", 0i64, StoreScope::Session)
        .expect("manager should construct");
    let local_manager =
        StorageManager::new(&env, "k", 0i64, StoreScope::Local).expect("manager should construct");

    let (session_seen, session_listener) = recorded::<i64>();
    session_manager.subscribe(session_listener);
    let (local_seen, local_listener) = recorded::<i64>();
    local_manager.subscribe(local_listener);

    env.announce(StorageEvent::new("k", Some("1".into()), StoreScope::Local));
    assert!(session_seen.lock().expect("listener sink").is_empty());
    assert_eq!(*local_seen.lock().expect("listener sink"), vec![1]);

    env.announce(StorageEvent::new("k", Some("2".into()), StoreScope::Session));
    assert_eq!(*session_seen.lock().expect("listener sink"), vec![2]);
    assert_eq!(*local_seen.lock().expect("listener sink"), vec![1]);
}

#[test]
fn test_destroyed_manager_persists_but_stays_silent() {
    let env = Environment::in_memory();
    let manager =
        StorageManager::new(&env, "k", 0i64, StoreScope::Local).expect("manager should construct");

    let calls = Arc::new(AtomicUsize::new(0));
    let calls_listener = Arc::clone(&calls);
    manager.subscribe(move |_| {
        calls_listener.fetch_add(1, Ordering::SeqCst);
    });

    manager.destroy();

    manager.set_value(&7).expect("set should still succeed");
    env.announce(StorageEvent::new("k", Some("8".into()), StoreScope::Local));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // The write reached the backend: a fresh manager sees it.
    let fresh =
        StorageManager::new(&env, "k", 0i64, StoreScope::Local).expect("manager should construct");
    assert_eq!(fresh.get_value(), 7);
}

#[test]
fn test_counter_scenario() {
    let env = Environment::in_memory();
    let manager = StorageManager::new(
        &env,
        "counter",
        Counter { count: 0 },
        StoreScope::Local,
    )
    .expect("manager should construct");

    let (seen, listener) = recorded::<Counter>();
    manager.subscribe(listener);

    manager
        .set_value(&Counter { count: 1 })
        .expect("set should succeed");

    let raw = env
        .area(StoreScope::Local)
        .get_item("counter")
        .expect("get should succeed");
    assert_eq!(raw, Some("{\"count\":1}".to_string()));
    assert_eq!(manager.get_value(), Counter { count: 1 });
    assert_eq!(
        *seen.lock().expect("listener sink"),
        vec![Counter { count: 1 }]
    );
}

#[test]
fn test_cross_context_notification_between_managers() {
    let env = Environment::in_memory();
    let manager_a = StorageManager::new(&env, "shared", 0i64, StoreScope::Local)
        .expect("manager should construct");
    let manager_b = StorageManager::new(&env, "shared", 0i64, StoreScope::Local)
        .expect("manager should construct");

    let (seen, listener) = recorded::<i64>();
    manager_b.subscribe(listener);

    manager_a.set_value(&5).expect("set should succeed");
    // Managers are independent; B only hears about A's write once the
    // platform notification arrives.
    assert!(seen.lock().expect("listener sink").is_empty());

    let raw = env
        .area(StoreScope::Local)
        .get_item("shared")
        .expect("get should succeed");
    env.announce(StorageEvent::new("shared", raw, StoreScope::Local));
    assert_eq!(*seen.lock().expect("listener sink"), vec![5]);
}

#[test]
fn test_removal_event_derives_initial_value() {
    let env = Environment::in_memory();
    let manager =
        StorageManager::new(&env, "k", 3i64, StoreScope::Local).expect("manager should construct");

    let (seen, listener) = recorded::<i64>();
    manager.subscribe(listener);

    env.announce(StorageEvent::new("k", None, StoreScope::Local));
    assert_eq!(*seen.lock().expect("listener sink"), vec![3]);
}

#[test]
fn test_malformed_event_payload_derives_initial_value() {
    let env = Environment::in_memory();
    let manager =
        StorageManager::new(&env, "k", 3i64, StoreScope::Local).expect("manager should construct");

    let (seen, listener) = recorded::<i64>();
    manager.subscribe(listener);

    env.announce(StorageEvent::new(
        "k",
        Some("{{garbage".into()),
        StoreScope::Local,
    ));
    assert_eq!(*seen.lock().expect("listener sink"), vec![3]);
}

#[test]
fn test_listeners_fire_in_registration_order() {
    let env = Environment::in_memory();
    let manager =
        StorageManager::new(&env, "k", 0i64, StoreScope::Local).expect("manager should construct");

    let order = Arc::new(Mutex::new(Vec::new()));
    for tag in ["first", "second", "third"] {
        let order = Arc::clone(&order);
        manager.subscribe(move |_: &i64| order.lock().expect("order sink").push(tag));
    }

    manager.set_value(&1).expect("set should succeed");
    assert_eq!(
        *order.lock().expect("order sink"),
        vec!["first", "second", "third"]
    );
}

#[test]
fn test_serialization_failure_leaves_backend_untouched() {
    // A type whose Serialize implementation always errors, standing in
    // for values JSON cannot encode.
    struct Unencodable;

    impl serde::Serialize for Unencodable {
        fn serialize<S>(&self, _serializer: S) -> Result<S::Ok, S::Error>
        where
            S: serde::Serializer,
        {
            Err(serde::ser::Error::custom("refuses to serialize"))
        }
    }

    impl<'de> serde::Deserialize<'de> for Unencodable {
        fn deserialize<D>(_deserializer: D) -> Result<Self, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            Ok(Unencodable)
        }
    }

    impl Clone for Unencodable {
        fn clone(&self) -> Self {
            Unencodable
        }
    }

    let env = Environment::in_memory();
    env.area(StoreScope::Local)
        .set_item("k", "\"prior\"")
        .expect("seed should succeed");

    let manager = StorageManager::new(&env, "k", Unencodable, StoreScope::Local)
        .expect("manager should construct");

    let result = manager.set_value(&Unencodable);
    assert!(result.is_err());

    let raw = env
        .area(StoreScope::Local)
        .get_item("k")
        .expect("get should succeed");
    assert_eq!(raw, Some("\"prior\"".to_string()));
}
