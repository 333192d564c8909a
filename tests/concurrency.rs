//! Concurrency tests for the nickname registry.
//!
//! Many clients race for the same or overlapping nicks; the registry must
//! never bind one canonical key to two clients.

mod common;

use common::TestServer;
use slircd_identity::NickError;
use slircd_identity::handlers::{handle_nick, login, randomly_rename};
use slircd_identity::history::HistoryKind;
use slircd_identity::state::{AttachResult, NickChange};
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;
use tokio::sync::mpsc;

#[test]
fn exactly_one_thread_wins_a_contested_nick() {
    const CONTENDERS: usize = 16;

    for round in 0..20 {
        let server = TestServer::new();
        let clients: Vec<_> = (0..CONTENDERS).map(|_| server.connect()).collect();
        let barrier = Arc::new(Barrier::new(CONTENDERS));

        let handles: Vec<_> = clients
            .iter()
            .map(|test_client| {
                let matrix = Arc::clone(&server.matrix);
                let client = Arc::clone(&test_client.client);
                let barrier = Arc::clone(&barrier);
                let nick = if round % 2 == 0 { "Target" } else { "TARGET" };
                thread::spawn(move || {
                    barrier.wait();
                    matrix.nicks.set_nick(&client, nick)
                })
            })
            .collect();

        let results: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().expect("thread panicked"))
            .collect();

        let winners = results
            .iter()
            .filter(|r| matches!(r, Ok(NickChange::Changed { .. })))
            .count();
        let losers = results
            .iter()
            .filter(|r| matches!(r, Err(NickError::NicknameInUse(_))))
            .count();
        assert_eq!(winners, 1, "round {round}");
        assert_eq!(losers, CONTENDERS - 1, "round {round}");

        let holder = server.matrix.nicks.get("target").expect("nick held");
        let holders: Vec<_> = clients.iter().filter(|c| c.client.has_nick()).collect();
        assert_eq!(holders.len(), 1);
        assert_eq!(holders[0].client.id(), holder.id());
    }
}

#[test]
fn churning_renames_keep_the_map_consistent() {
    const THREADS: usize = 8;
    const ROUNDS: usize = 500;
    const POOL: usize = 12;

    let server = TestServer::new();
    let clients: Vec<_> = (0..THREADS).map(|_| server.connect()).collect();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = clients
        .iter()
        .enumerate()
        .map(|(t, test_client)| {
            let matrix = Arc::clone(&server.matrix);
            let client = Arc::clone(&test_client.client);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..ROUNDS {
                    let nick = format!("Nick{}", (i * 7 + t * 3) % POOL);
                    match matrix.nicks.set_nick(&client, &nick) {
                        Ok(_) | Err(NickError::NicknameInUse(_)) => {}
                        Err(e) => panic!("unexpected error: {e}"),
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread panicked");
    }

    let keys = server.matrix.nicks.keys();
    let mut seen = HashSet::new();
    for key in &keys {
        let holder = server.matrix.nicks.get_cf(key).expect("key has holder");
        assert_eq!(&holder.nick_cf(), key);
        assert!(seen.insert(holder.id()), "client holds two keys");
    }

    let named: Vec<_> = clients.iter().filter(|c| c.client.has_nick()).collect();
    assert_eq!(named.len(), keys.len());
    for test_client in named {
        let key = test_client.client.nick_cf();
        assert_eq!(
            server.matrix.nicks.get_cf(&key).map(|c| c.id()),
            Some(test_client.client.id())
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_nick_commands_with_fanout() {
    const CONTENDERS: usize = 8;

    let server = TestServer::new();
    let mut observer = server.register("Observer").await;
    server.matrix.channels.join(&observer.client, "#room").unwrap();

    let mut contenders = Vec::new();
    for i in 0..CONTENDERS {
        let contender = server.register(&format!("User{i}")).await;
        server.matrix.channels.join(&contender.client, "#room").unwrap();
        contenders.push(contender);
    }
    observer.drain();

    let tasks: Vec<_> = contenders
        .iter()
        .map(|c| {
            let matrix = Arc::clone(&server.matrix);
            let client = Arc::clone(&c.client);
            let session = c.session(0);
            tokio::spawn(async move { handle_nick(&matrix, &client, session, "Winner").await })
        })
        .collect();

    let mut winners = 0;
    for task in tasks {
        match task.await.expect("task panicked") {
            Ok(NickChange::Changed { .. }) => winners += 1,
            Err(NickError::NicknameInUse(_)) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }
    assert_eq!(winners, 1);

    // The observer saw exactly one rename.
    let lines = observer.take(0);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with(" NICK Winner"));
}

/// Split `:Old!user@host NICK New` into `(Old, New)`.
fn parse_rename(line: &str) -> (String, String) {
    let (prefix, new) = line.split_once(" NICK ").expect("NICK line");
    let old = prefix
        .trim_start_matches(':')
        .split('!')
        .next()
        .expect("origin nick");
    (old.to_string(), new.to_string())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn same_client_renames_announce_a_consistent_chain() {
    const TASKS: usize = 6;
    const RENAMES: usize = 6;

    let server = TestServer::new();
    let mut alice = server.register("Alice").await;
    login(&server.matrix, &alice.client, None, "alice").await.unwrap();
    server.attach(&mut alice);
    server.attach(&mut alice);
    let mut bob = server.register("Bob").await;
    server.matrix.channels.join(&alice.client, "#a").unwrap();
    server.matrix.channels.join(&bob.client, "#a").unwrap();
    alice.drain();
    bob.drain();

    let tasks: Vec<_> = (0..TASKS)
        .map(|t| {
            let matrix = Arc::clone(&server.matrix);
            let client = Arc::clone(&alice.client);
            let session = alice.session(t % 3);
            tokio::spawn(async move {
                for i in 0..RENAMES {
                    let result = handle_nick(&matrix, &client, session, &format!("T{t}r{i}")).await;
                    assert!(matches!(result, Ok(NickChange::Changed { .. })), "{result:?}");
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.expect("task panicked");
    }

    // Every NICK line names the nick the previous one moved to.
    let lines = bob.take(0);
    assert_eq!(lines.len(), TASKS * RENAMES);
    let mut current = "Alice".to_string();
    for line in &lines {
        let (old, new) = parse_rename(line);
        assert_eq!(old, current, "{line}");
        current = new;
    }
    assert_eq!(current, alice.client.nick());

    // History agrees with what was sent.
    let items: Vec<_> = server
        .matrix
        .channels
        .get("#a")
        .unwrap()
        .history_latest(1000)
        .into_iter()
        .filter(|item| item.kind == HistoryKind::Nick)
        .collect();
    assert_eq!(items.len(), TASKS * RENAMES);
    let mut current = "Alice".to_string();
    for item in &items {
        assert_eq!(item.origin, format!("{current}!alice@test.host"));
        current = item.params[0].clone();
    }
    assert_eq!(current, alice.client.nick());

    assert_eq!(server.matrix.whowas.len(), TASKS * RENAMES);
    assert_eq!(server.matrix.nicks.len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn renames_racing_the_last_detach_never_leak_a_key() {
    for round in 0..50 {
        let server = TestServer::new();
        let alice = server.register("Alice").await;
        let _bob = server.register("Bob").await;
        let session = alice.session(0);

        let setter = {
            let matrix = Arc::clone(&server.matrix);
            let client = Arc::clone(&alice.client);
            tokio::task::spawn_blocking(move || {
                for i in 0..200 {
                    if matrix.nicks.set_nick(&client, &format!("Racer{i}")) == Ok(NickChange::Unchanged)
                        && client.is_destroyed()
                    {
                        break;
                    }
                }
            })
        };
        let sweeper = {
            let matrix = Arc::clone(&server.matrix);
            let client = Arc::clone(&alice.client);
            tokio::spawn(async move {
                for _ in 0..20 {
                    if randomly_rename(&matrix, &client).await == Ok(NickChange::Unchanged) {
                        break;
                    }
                }
            })
        };

        server.matrix.detach_session(session, None).await;
        setter.await.expect("setter panicked");
        sweeper.await.expect("sweeper panicked");

        // Only Bob's key remains, and every key belongs to a live client.
        assert_eq!(server.matrix.nicks.keys(), vec!["bob".to_string()], "round {round}");
        for key in server.matrix.nicks.keys() {
            let holder = server.matrix.nicks.get_cf(&key).expect("key has holder");
            assert!(server.matrix.clients.get(holder.id()).is_some(), "round {round}");
        }
        assert!(alice.client.is_destroyed());
        assert!(!alice.client.has_nick());
    }
}

#[test]
fn concurrent_attaches_respect_the_session_cap() {
    const CONTENDERS: usize = 8;

    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let server = TestServer::with_config(|config| config.multiclient.max_sessions_per_client = 3);
    let alice = runtime.block_on(async {
        let alice = server.register("Alice").await;
        login(&server.matrix, &alice.client, None, "alice").await.unwrap();
        alice
    });
    let barrier = Arc::new(Barrier::new(CONTENDERS));

    let handles: Vec<_> = (0..CONTENDERS)
        .map(|_| {
            let matrix = Arc::clone(&server.matrix);
            let client = Arc::clone(&alice.client);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let (tx, rx) = mpsc::channel(8);
                barrier.wait();
                (matrix.attach_session(&client, tx), rx)
            })
        })
        .collect();
    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread panicked"))
        .collect();

    let attached = results
        .iter()
        .filter(|(r, _)| matches!(r, AttachResult::Attached { .. }))
        .count();
    let refused = results
        .iter()
        .filter(|(r, _)| *r == AttachResult::TooManySessions)
        .count();
    assert_eq!(attached, 2);
    assert_eq!(refused, CONTENDERS - 2);
    assert_eq!(alice.client.session_count(), 3);
    assert_eq!(server.matrix.clients.session_total(), 3);
}
