//! Recording progress monitor

mod common;

use common::*;
use emaccel_lib::{MonitorOutcome, RecordingMonitor};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

#[tokio::test]
async fn test_monitor_completes_after_duration() {
    let (_state_tx, state_rx) = watch::channel(true);
    let (progress_tx, mut progress_rx) = mpsc::channel(1024);

    let monitor = RecordingMonitor::spawn(
        state_rx,
        Duration::from_millis(60),
        Duration::from_millis(5),
        progress_tx,
    );
    assert_eq!(monitor.wait().await, MonitorOutcome::Completed);

    let mut last = None;
    while let Some(progress) = progress_rx.recv().await {
        assert!((0.0..=1.0).contains(&progress.fraction));
        if let Some(previous) = last {
            assert!(progress.fraction >= previous);
        }
        last = Some(progress.fraction);
    }
    assert_eq!(last, Some(1.0));
}

#[tokio::test]
async fn test_monitor_observes_cancellation() {
    let (state_tx, state_rx) = watch::channel(true);
    let (progress_tx, mut progress_rx) = mpsc::channel(1024);

    let monitor = RecordingMonitor::spawn(
        state_rx,
        Duration::from_secs(30),
        Duration::from_millis(5),
        progress_tx,
    );

    tokio::time::sleep(Duration::from_millis(30)).await;
    state_tx.send(false).unwrap();

    let outcome = tokio::time::timeout(Duration::from_secs(1), monitor.wait())
        .await
        .expect("monitor did not stop after cancellation");
    assert_eq!(outcome, MonitorOutcome::Cancelled);

    // Nothing close to completion was ever reported
    while let Some(progress) = progress_rx.recv().await {
        assert!(progress.fraction < 0.5);
    }
}

#[tokio::test]
async fn test_monitor_not_recording_at_start() {
    let (_state_tx, state_rx) = watch::channel(false);
    let (progress_tx, mut progress_rx) = mpsc::channel(16);

    let monitor = RecordingMonitor::spawn(state_rx, Duration::from_secs(5), Duration::from_millis(5), progress_tx);
    assert_eq!(monitor.wait().await, MonitorOutcome::Cancelled);
    assert!(progress_rx.recv().await.is_none());
}

#[tokio::test]
async fn test_engine_stop_cancels_monitor() {
    let (mut engine, mut device) = attached_engine(test_config()).await;

    device.reply("sls\r\n").await;
    engine.start_recording(30).await.unwrap();
    device.expect_command("l30\n").await;

    let (progress_tx, _progress_rx) = mpsc::channel(1024);
    let monitor = RecordingMonitor::spawn(
        engine.subscribe(),
        Duration::from_secs(30),
        Duration::from_millis(5),
        progress_tx,
    );

    tokio::time::sleep(Duration::from_millis(20)).await;
    device.reply("slf\r\n").await;
    engine.stop_recording().await.unwrap();

    let outcome = tokio::time::timeout(Duration::from_secs(1), monitor.wait())
        .await
        .expect("monitor did not observe the stop");
    assert_eq!(outcome, MonitorOutcome::Cancelled);
}

#[tokio::test]
async fn test_engine_cancel_recording_without_device() {
    let (mut engine, mut device) = attached_engine(test_config()).await;

    device.reply("sls\r\n").await;
    engine.start_recording(30).await.unwrap();

    let (progress_tx, _progress_rx) = mpsc::channel(1024);
    let monitor = RecordingMonitor::spawn(
        engine.subscribe(),
        Duration::from_secs(30),
        Duration::from_millis(5),
        progress_tx,
    );

    engine.cancel_recording();
    assert!(!engine.is_recording());
    assert_eq!(monitor.wait().await, MonitorOutcome::Cancelled);
}

#[tokio::test]
async fn test_aborted_monitor_reports_cancelled() {
    let (_state_tx, state_rx) = watch::channel(true);
    let (progress_tx, _progress_rx) = mpsc::channel(1024);

    let monitor = RecordingMonitor::spawn(
        state_rx,
        Duration::from_secs(30),
        Duration::from_millis(5),
        progress_tx,
    );
    monitor.abort();

    let outcome = tokio::time::timeout(Duration::from_secs(1), monitor.wait())
        .await
        .expect("aborted monitor did not finish");
    assert_eq!(outcome, MonitorOutcome::Cancelled);
}
