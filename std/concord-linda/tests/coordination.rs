use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use concord_linda::{Computed, EvalArg, Template, TupleSpace, Value, ValueKind, template, tuple};

fn wait_until_blocked(space: &TupleSpace, template: &Template) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while space.waiters_on(&template.shape()).unwrap() == 0 {
        assert!(Instant::now() < deadline, "reader never blocked");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn test_wildcard_kind_scopes_the_shape() {
    let space = TupleSpace::new();
    space.out(tuple!("k", 42)).unwrap();

    let float_template = template!("k", ?f64);
    assert!(space.inp(&float_template).unwrap().is_none());
    assert!(
        space
            .in_timeout(&float_template, Duration::from_millis(20))
            .unwrap()
            .is_none()
    );
    let found = space.inp(&template!("k", ?i64)).unwrap().unwrap();
    assert_eq!(found.capture::<i64>(0).unwrap(), 42);
}

#[test]
fn test_blocked_in_survives_non_matching_outs() {
    let space = Arc::new(TupleSpace::new());
    let wanted = template!("x", 7);

    let reader = {
        let space = Arc::clone(&space);
        let wanted = wanted.clone();
        thread::spawn(move || space.in_(&wanted).unwrap().into_tuple())
    };

    wait_until_blocked(&space, &wanted);
    space.out(tuple!("x", 1)).unwrap();
    space.out(tuple!("x", 2)).unwrap();
    thread::sleep(Duration::from_millis(20));
    assert!(!reader.is_finished());

    space.out(tuple!("x", 7)).unwrap();
    assert_eq!(reader.join().unwrap(), tuple!("x", 7));
    assert_eq!(space.len_of(&wanted.shape()).unwrap(), 2);
}

#[test]
fn test_blocked_readers_and_taker_share_one_out() {
    let space = Arc::new(TupleSpace::new());
    let wanted = template!("x", ?i64);

    let readers: Vec<_> = (0..2)
        .map(|_| {
            let space = Arc::clone(&space);
            let wanted = wanted.clone();
            thread::spawn(move || space.rd(&wanted).unwrap().capture::<i64>(0).unwrap())
        })
        .collect();
    let deadline = Instant::now() + Duration::from_secs(5);
    while space.waiters_on(&wanted.shape()).unwrap() < 2 {
        assert!(Instant::now() < deadline, "readers never blocked");
        thread::sleep(Duration::from_millis(1));
    }

    space.out(tuple!("x", 5)).unwrap();
    for reader in readers {
        assert_eq!(reader.join().unwrap(), 5);
    }
    assert_eq!(space.len_of(&wanted.shape()).unwrap(), 1);

    let taker = {
        let space = Arc::clone(&space);
        let wanted = wanted.clone();
        thread::spawn(move || space.in_(&wanted).unwrap().into_tuple())
    };
    assert_eq!(taker.join().unwrap(), tuple!("x", 5));
    assert_eq!(space.len_of(&wanted.shape()).unwrap(), 0);
}

#[test]
fn test_many_readers_one_match_each() {
    let space = Arc::new(TupleSpace::new());
    let wanted = template!("token", ?i64);

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let space = Arc::clone(&space);
            let wanted = wanted.clone();
            thread::spawn(move || space.in_(&wanted).unwrap().capture::<i64>(0).unwrap())
        })
        .collect();

    for i in 0..3 {
        space.out(tuple!("token", i)).unwrap();
    }

    let mut got: Vec<i64> = readers.into_iter().map(|r| r.join().unwrap()).collect();
    got.sort_unstable();
    assert_eq!(got, vec![0, 1, 2]);
}

#[test]
fn test_eval_returns_before_the_computation_finishes() {
    let space = TupleSpace::new();
    let release = Arc::new(AtomicBool::new(false));
    let gate = Arc::clone(&release);

    let start = Instant::now();
    let handle = space
        .eval(vec![
            EvalArg::value("slow"),
            EvalArg::thunk(move || {
                while !gate.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_millis(1));
                }
                99i64
            }),
        ])
        .unwrap();
    assert!(start.elapsed() < Duration::from_secs(1));

    let result_template = template!("slow", ?i64);
    assert!(space.rdp(&result_template).unwrap().is_none());
    assert_eq!(space.pending_evals(), 1);

    release.store(true, Ordering::SeqCst);
    let found = space.in_(&result_template).unwrap();
    assert_eq!(found.capture::<i64>(0).unwrap(), 99);
    assert_eq!(handle.join().unwrap(), tuple!("slow", 99));
    assert!(space.wait_evals_timeout(Duration::from_secs(5)));
}

struct Fibonacci(u32);

impl Computed for Fibonacci {
    fn kind(&self) -> ValueKind {
        ValueKind::Int
    }

    fn compute(self: Box<Self>) -> Value {
        let (mut a, mut b) = (0i64, 1i64);
        for _ in 0..self.0 {
            (a, b) = (b, a + b);
        }
        Value::Int(a)
    }
}

#[test]
fn test_eval_with_computed_task() {
    let space = TupleSpace::new();
    space
        .eval(vec![
            EvalArg::value("fib"),
            EvalArg::value(20),
            EvalArg::task(Fibonacci(20)),
        ])
        .unwrap();

    let found = space.rd(&template!("fib", 20, ?i64)).unwrap();
    assert_eq!(found.capture::<i64>(0).unwrap(), 6765);
    space.wait_evals();
}

#[test]
fn test_global_space_free_functions() {
    concord_linda::out(tuple!("global-unique-key", 'z')).unwrap();
    let found = concord_linda::rd(&template!("global-unique-key", ?char)).unwrap();
    assert_eq!(found.capture::<char>(0).unwrap(), 'z');

    let taken = concord_linda::inp(&template!("global-unique-key", ?char)).unwrap();
    assert!(taken.is_some());
    let again = concord_linda::rdp(&template!("global-unique-key", ?char)).unwrap();
    assert!(again.is_none());

    let handle = concord_linda::eval(vec![
        EvalArg::value("global-unique-eval"),
        EvalArg::thunk(|| true),
    ])
    .unwrap();
    handle.join().unwrap();
    let found = concord_linda::in_(&template!("global-unique-eval", ?bool)).unwrap();
    assert!(found.capture::<bool>(0).unwrap());
}
