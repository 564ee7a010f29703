use rhythmforge_core::{JobKind, JobRegistry};
use std::sync::mpsc;

#[test]
fn finished_job_leaves_the_active_table() {
    let jobs = JobRegistry::new();
    let handle = jobs.spawn(JobKind::GenerateChart, |_, _| {}).unwrap();
    let id = handle.id;
    handle.join().unwrap();
    assert!(!jobs.is_active(id));
    assert_eq!(jobs.active_count(), 0);
}

#[test]
fn panicking_job_is_deregistered() {
    let jobs = JobRegistry::new();
    let handle = jobs
        .spawn(JobKind::FetchMedia, |_, _| panic!("job body failed"))
        .unwrap();
    let id = handle.id;

    assert!(handle.join().is_err());
    assert!(!jobs.is_active(id));
    assert!(!jobs.cancel(id));
}

#[test]
fn cancel_reaches_a_running_job() {
    let jobs = JobRegistry::new();
    let (ready_tx, ready_rx) = mpsc::channel();
    let (seen_tx, seen_rx) = mpsc::channel();
    let handle = jobs
        .spawn(JobKind::GenerateChart, move |_, token| {
            let _ = ready_tx.send(());
            while !token.is_cancelled() {
                std::thread::yield_now();
            }
            let _ = seen_tx.send(token.is_cancelled());
        })
        .unwrap();

    ready_rx.recv().unwrap();
    assert!(jobs.cancel(handle.id));
    assert!(seen_rx.recv().unwrap());
    handle.join().unwrap();
}
