mod support;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use strata_hierarchy::TokenHierarchy;
use support::{counting, doc, identities};

/// Many threads demanding a fresh hierarchy's root sequence must observe
/// one single build: the classifier is constructed exactly once and every
/// thread sees the same first token.
#[test]
fn concurrent_root_build_runs_once() {
    let builds = Arc::new(AtomicUsize::new(0));
    let hierarchy =
        TokenHierarchy::new("alpha beta gamma delta", counting(&builds));

    let barrier = std::sync::Barrier::new(8);
    let first_ids = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let hierarchy = hierarchy.clone();
                let barrier = &barrier;
                scope.spawn(move || {
                    barrier.wait();
                    let mut sequence = hierarchy.token_sequence().unwrap();
                    assert!(sequence.move_next());
                    sequence.token().unwrap().id()
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect::<Vec<_>>()
    });

    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert!(first_ids.windows(2).all(|pair| pair[0] == pair[1]));
}

/// Racing `embedded()` calls at the same token must converge on a single
/// child list: one build, identical token identities everywhere.
#[test]
fn concurrent_embedded_creation_is_idempotent() {
    let builds = Arc::new(AtomicUsize::new(0));
    let embedded_language = counting(&builds);
    let hierarchy = TokenHierarchy::new("/**abc def*/", doc(&embedded_language));

    let barrier = std::sync::Barrier::new(8);
    let id_sets = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let hierarchy = hierarchy.clone();
                let barrier = &barrier;
                scope.spawn(move || {
                    barrier.wait();
                    let mut sequence = hierarchy.token_sequence().unwrap();
                    assert!(sequence.move_next());
                    let mut embedded =
                        sequence.embedded().unwrap().expect("doc comments embed");
                    identities(&mut embedded)
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect::<Vec<_>>()
    });

    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert!(id_sets.windows(2).all(|pair| pair[0] == pair[1]));
}

/// Readers racing an edit either see the old consistent snapshot or the
/// new one, and expired cursors are reported as such, never torn.
#[test]
fn readers_race_a_writer() {
    let hierarchy = TokenHierarchy::new("one two three four five", support::plain());
    let _ = hierarchy.token_sequence().unwrap();

    thread::scope(|scope| {
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let hierarchy = hierarchy.clone();
                scope.spawn(move || {
                    for _ in 0..200 {
                        let Ok(mut sequence) = hierarchy.token_sequence() else { continue };
                        while sequence.move_next() {
                            match sequence.token() {
                                Ok(token) => {
                                    // A snapshot read is internally consistent.
                                    assert!(!token.text().is_empty());
                                }
                                Err(strata_hierarchy::Error::Expired { .. }) => break,
                                Err(err) => panic!("unexpected error: {err}"),
                            }
                        }
                    }
                })
            })
            .collect();

        let writer = {
            let hierarchy = hierarchy.clone();
            scope.spawn(move || {
                for round in 0..100 {
                    let offset = text_size::TextSize::new(4);
                    hierarchy.insert(offset, "x").unwrap();
                    if round % 2 == 0 {
                        hierarchy.remove(offset, text_size::TextSize::new(1)).unwrap();
                    }
                }
            })
        };

        for reader in readers {
            reader.join().unwrap();
        }
        writer.join().unwrap();
    });
}
