mod common;

use common::{client, request, wait_for};
use rtms::{Event, PollMode, SessionState, Submission};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use testing_tools::Call;

#[test]
fn engine_is_driven_from_a_single_polling_thread() {
    let (client, probe) = client(PollMode::Background);
    let confirmed = Arc::new(AtomicBool::new(false));
    let seen = Arc::clone(&confirmed);
    client.on_join_confirm(move |_| seen.store(true, Ordering::SeqCst));

    let receipt = match client.submit_join(request()).unwrap() {
        Submission::Deferred(receipt) => receipt,
        Submission::Completed(_) => panic!("join should run on the polling thread"),
    };
    assert_eq!(receipt.wait(), Some(true));
    assert!(client.is_polling());
    assert!(wait_for(|| confirmed.load(Ordering::SeqCst)));

    assert!(client.leave().unwrap());
    assert_eq!(client.state(), SessionState::Released);
    assert!(!client.is_polling());

    let engine_threads: Vec<_> = probe
        .recorded()
        .into_iter()
        .filter(|recorded| !matches!(recorded.call, Call::Initialize(_)))
        .map(|recorded| recorded.thread)
        .collect();
    assert!(!engine_threads.is_empty());
    assert!(engine_threads.iter().all(|id| *id == engine_threads[0]));
    assert_ne!(engine_threads[0], thread::current().id());
    assert_eq!(probe.count(|call| *call == Call::Release), 1);

    assert!(client.leave().unwrap());
}

#[test]
fn handlers_run_on_the_polling_thread() {
    let (client, probe) = client(PollMode::Background);
    let handler_thread = Arc::new(Mutex::new(None));
    let seen = Arc::clone(&handler_thread);
    client.on_transcript_data(move |_| {
        *seen.lock().unwrap() = Some(thread::current().id());
    });

    client.join(request()).unwrap();
    probe.push_poll(vec![Event::TranscriptData(rtms::MediaFrame {
        data: b"hello".to_vec(),
        timestamp: 3,
        metadata: Default::default(),
    })]);
    assert!(wait_for(|| handler_thread.lock().unwrap().is_some()));

    let handler_thread = handler_thread.lock().unwrap().unwrap();
    assert_ne!(handler_thread, thread::current().id());
    assert_eq!(probe.joined().map(|j| j.stream_id), Some("stream-id".to_string()));
    client.leave().unwrap();
}

#[test]
fn handler_can_leave_from_the_polling_thread() {
    let (client, probe) = client(PollMode::Background);
    let leaver = client.clone();
    client.on_join_confirm(move |_| leaver.leave().map(|_| ()));

    client.join(request()).unwrap();
    assert!(wait_for(|| client.state() == SessionState::Released));
    assert!(wait_for(|| !client.is_polling()));

    assert!(client.leave().unwrap());
    assert_eq!(probe.count(|call| *call == Call::Release), 1);
}

#[test]
fn remote_leave_ends_polling() {
    let (client, probe) = client(PollMode::Background);
    let left = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&left);
    client.on_leave(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    client.join(request()).unwrap();
    assert!(wait_for(|| client.state() == SessionState::Active));
    probe.push_poll(vec![Event::Leave { reason: 0 }]);

    assert!(wait_for(|| !client.is_polling()));
    assert_eq!(client.state(), SessionState::Released);
    assert_eq!(left.load(Ordering::SeqCst), 1);
    assert!(client.join(request()).is_err());
    assert!(client.leave().unwrap());
    assert_eq!(probe.count(|call| *call == Call::Release), 1);
}

#[test]
fn rejected_join_is_reported_through_the_receipt() {
    let (client, probe) = client(PollMode::Background);
    probe.fail_join(Some(rtms::SdkStatus::Timeout));

    let receipt = match client.submit_join(request()).unwrap() {
        Submission::Deferred(receipt) => receipt,
        Submission::Completed(_) => panic!("join should run on the polling thread"),
    };
    assert_eq!(receipt.wait(), Some(false));
    assert_eq!(client.state(), SessionState::Initialized);
    client.leave().unwrap();
}

#[test]
fn first_join_from_another_thread_is_queued() {
    let (client, probe) = client(PollMode::Background);
    assert!(client.is_polling());

    let remote = client.clone();
    let accepted = thread::spawn(move || remote.join(request()))
        .join()
        .unwrap()
        .unwrap();
    assert!(accepted);
    assert!(wait_for(|| client.state() == SessionState::Active));

    let joined_on = probe
        .recorded()
        .into_iter()
        .find(|recorded| matches!(recorded.call, Call::Join(_)))
        .map(|recorded| recorded.thread)
        .unwrap();
    assert_ne!(joined_on, thread::current().id());
    assert!(client.leave().unwrap());
}

#[test]
fn media_can_be_configured_before_the_first_join() {
    let (client, probe) = client(PollMode::Background);
    client.enable_transcript(true).unwrap();

    let receipt = match client.submit_join(request()).unwrap() {
        Submission::Deferred(receipt) => receipt,
        Submission::Completed(_) => panic!("join should run on the polling thread"),
    };
    assert_eq!(receipt.wait(), Some(true));

    let configured = probe
        .calls()
        .into_iter()
        .find_map(|call| match call {
            Call::Configure(media) => Some(media.media_types),
            _ => None,
        })
        .unwrap();
    assert_eq!(configured, rtms::MediaType::TRANSCRIPT);
    client.leave().unwrap();
}

#[test]
fn leave_is_bounded_with_a_long_poll_interval() {
    let (engine, probe) = testing_tools::ScriptedEngine::new();
    let config = common::config(PollMode::Background).with_poll_interval(Duration::from_secs(20));
    let client = rtms::Client::new(config, engine).unwrap();
    thread::sleep(Duration::from_millis(20));

    // The poller sleeps through the queued leave, so it is stopped instead.
    let started = Instant::now();
    assert!(client.leave().unwrap());
    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(!client.is_polling());
    assert_eq!(client.state(), SessionState::Released);
    assert_eq!(probe.count(|call| *call == Call::Release), 1);
}
