//! End-to-end behavior of the dispatch loop with fake collaborators

mod helpers;

use chrono::NaiveDate;
use helpers::*;
use seek_common::config::Platform;
use seek_common::events::{CapturePhase, ErrorKind, PipelineEvent, RouteDecision};
use seek_common::taxa::Rank;
use seek_vision::capture::backend::GALLERY_PERMISSION_DENIED;
use seek_vision::NativeEvent;
use std::sync::atomic::Ordering;
use std::time::Duration;

fn phases(events: &[PipelineEvent]) -> Vec<CapturePhase> {
    events
        .iter()
        .filter_map(|event| match event {
            PipelineEvent::CaptureChanged { new_phase, .. } => Some(*new_phase),
            _ => None,
        })
        .collect()
}

fn routes(events: &[PipelineEvent]) -> Vec<RouteDecision> {
    events
        .iter()
        .filter_map(|event| match event {
            PipelineEvent::Routed { decision, .. } => Some((**decision).clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_focus_resumes_camera_and_first_frame_reports_ready() {
    let mut harness = HarnessBuilder::default().start();
    harness.handle.focus();
    harness.settle().await;
    assert_eq!(harness.camera.resume_calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.camera.arm_calls.load(Ordering::SeqCst), 1);

    harness.handle.native(NativeEvent::TaxaDetected(kingdom_frame()));
    harness.handle.native(NativeEvent::TaxaDetected(kingdom_frame()));
    harness.settle().await;

    let ready = harness
        .drain()
        .iter()
        .filter(|e| matches!(e, PipelineEvent::ClassifierReady { .. }))
        .count();
    assert_eq!(ready, 1);
}

#[tokio::test(start_paused = true)]
async fn test_denied_camera_permission_sets_permissions_error() {
    let mut harness = HarnessBuilder {
        camera_permission: false,
        ..Default::default()
    }
    .start();
    harness.handle.focus();
    harness.settle().await;

    let errors = errors(&harness.drain());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].as_ref().map(|e| e.kind), Some(ErrorKind::Permissions));
    assert_eq!(harness.camera.arm_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_species_wins_over_genus() {
    let mut harness = HarnessBuilder::default().start().focused().await;
    harness.handle.native(NativeEvent::TaxaDetected(species_frame()));
    harness.settle().await;

    let states = predictions(&harness.drain());
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].active_rank(), Some(Rank::Species));
    assert_eq!(states[0].taxon().map(|t| t.taxon_id), Some(48662));
}

#[tokio::test(start_paused = true)]
async fn test_common_name_arrives_as_second_update() {
    let mut harness = HarnessBuilder {
        names: FakeNames::with(48661, "Monarchs"),
        ..Default::default()
    }
    .start()
    .focused()
    .await;

    harness.handle.native(NativeEvent::TaxaDetected(genus_frame()));
    harness.settle().await;

    let states = predictions(&harness.drain());
    assert_eq!(states.len(), 2);
    assert!(states[0].common_name().is_none());
    assert_eq!(states[1].common_name(), Some("Monarchs"));
}

#[tokio::test(start_paused = true)]
async fn test_kingdom_only_frame_resets_prediction() {
    let mut harness = HarnessBuilder::default().start().focused().await;
    harness.handle.native(NativeEvent::TaxaDetected(genus_frame()));
    harness.settle().await;
    harness.drain();

    harness.handle.native(NativeEvent::TaxaDetected(kingdom_frame()));
    harness.settle().await;

    let states = predictions(&harness.drain());
    assert_eq!(states.len(), 1);
    assert!(states[0].is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reset_of_empty_state_publishes_nothing() {
    let mut harness = HarnessBuilder::default().start().focused().await;
    harness.handle.native(NativeEvent::TaxaDetected(kingdom_frame()));
    harness.handle.native(NativeEvent::TaxaDetected(kingdom_frame()));
    harness.settle().await;

    assert!(predictions(&harness.drain()).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_rearmed_hold_fires_once_from_last_detection() {
    let mut harness = HarnessBuilder::default().start().focused().await;

    harness.handle.native(NativeEvent::TaxaDetected(species_frame()));
    harness.settle().await;
    tokio::time::sleep(Duration::from_millis(1000)).await;

    // Re-detect and then lose the subject; the pending hold governs the reset
    harness.handle.native(NativeEvent::TaxaDetected(species_frame()));
    harness.handle.native(NativeEvent::TaxaDetected(kingdom_frame()));
    harness.settle().await;
    harness.drain();

    // Past the first detection's hold, before the second's
    tokio::time::sleep(Duration::from_millis(1700)).await;
    assert!(predictions(&harness.drain()).is_empty());

    tokio::time::sleep(Duration::from_millis(1000)).await;
    let states = predictions(&harness.drain());
    assert_eq!(states.len(), 1);
    assert!(states[0].is_empty());

    tokio::time::sleep(Duration::from_millis(5000)).await;
    assert!(predictions(&harness.drain()).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_frames_dropped_while_capturing() {
    let camera = FakeCamera::default();
    *camera.capture_delay.lock().unwrap() = Some(Duration::from_millis(500));
    let mut harness = HarnessBuilder {
        camera,
        ..Default::default()
    }
    .start()
    .focused()
    .await;

    harness.handle.native(NativeEvent::TaxaDetected(species_frame()));
    harness.settle().await;
    harness.handle.shutter();
    harness.settle().await;
    harness.drain();

    harness.handle.native(NativeEvent::TaxaDetected(genus_frame()));
    harness.settle().await;
    assert!(predictions(&harness.drain()).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_capture_with_predictions_routes_offline() {
    let mut harness = HarnessBuilder::default().start().focused().await;
    harness.handle.native(NativeEvent::TaxaDetected(species_frame()));
    harness.settle().await;
    harness.drain();

    harness.handle.shutter();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let events = harness.drain();
    assert_eq!(
        phases(&events),
        vec![CapturePhase::Capturing, CapturePhase::Saving, CapturePhase::Idle]
    );
    assert_eq!(harness.scorer.call_count(), 0);

    let offline = harness.navigator.offline.lock().unwrap().clone();
    assert_eq!(offline.len(), 1);
    assert_eq!(offline[0].photo.uri, SAVED_URI);
    assert_eq!(offline[0].predictions.len(), 1);
    assert_eq!(offline[0].predictions[0].taxon_id, 48662);
    assert!(matches!(routes(&events).as_slice(), [RouteDecision::Offline(_)]));
}

#[tokio::test(start_paused = true)]
async fn test_new_species_online_is_recorded_once() {
    let mut harness = HarnessBuilder {
        names: FakeNames::with(48662, "monarch"),
        ..Default::default()
    }
    .start()
    .focused()
    .await;

    harness.handle.shutter();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(harness.scorer.call_count(), 1);
    assert_eq!(harness.seen.add_calls(), 1);

    let matches = harness.navigator.matches.lock().unwrap().clone();
    assert_eq!(matches.len(), 1);
    assert!(matches[0].result.is_species_match());
    assert_eq!(matches[0].display_name.as_deref(), Some("Monarch"));
    assert!(matches[0].seen_date.is_none());

    let events = harness.drain();
    assert_eq!(phases(&events).last(), Some(&CapturePhase::Idle));
    assert!(matches!(routes(&events).as_slice(), [RouteDecision::Match(_)]));
}

#[tokio::test(start_paused = true)]
async fn test_previously_seen_species_is_not_recorded_again() {
    let first_seen = NaiveDate::from_ymd_opt(2023, 9, 14).unwrap();
    let harness = HarnessBuilder {
        seen: FakeSeen::seen_on(48662, first_seen),
        ..Default::default()
    }
    .start()
    .focused()
    .await;

    harness.handle.shutter();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(harness.seen.add_calls(), 0);
    let matches = harness.navigator.matches.lock().unwrap().clone();
    assert_eq!(matches[0].seen_date, Some(first_seen));
}

#[tokio::test(start_paused = true)]
async fn test_downtime_sets_error_and_errors_session() {
    let mut harness = HarnessBuilder {
        script: Scripted::Status(503, None),
        ..Default::default()
    }
    .start()
    .focused()
    .await;

    harness.handle.shutter();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let events = harness.drain();
    let errors = errors(&events);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].as_ref().map(|e| e.kind), Some(ErrorKind::Downtime));
    assert_eq!(phases(&events).last(), Some(&CapturePhase::Errored));
    assert!(harness.navigator.matches.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_take_failure_is_take_error() {
    let camera = FakeCamera::default();
    *camera.take_failure.lock().unwrap() = Some("capture interrupted".to_string());
    let mut harness = HarnessBuilder {
        camera,
        ..Default::default()
    }
    .start()
    .focused()
    .await;

    harness.handle.shutter();
    harness.settle().await;

    let events = harness.drain();
    assert_eq!(
        errors(&events)[0].as_ref().map(|e| e.kind),
        Some(ErrorKind::Take)
    );
    assert_eq!(phases(&events), vec![CapturePhase::Capturing, CapturePhase::Errored]);

    // Errored is terminal until the screen is re-entered
    harness.handle.shutter();
    harness.settle().await;
    assert_eq!(harness.camera.take_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_capture_releases_prediction_processing() {
    let camera = FakeCamera::default();
    *camera.take_failure.lock().unwrap() = Some("shutter jammed".to_string());
    let mut harness = HarnessBuilder {
        camera,
        ..Default::default()
    }
    .start()
    .focused()
    .await;

    harness.handle.shutter();
    harness.settle().await;
    harness.drain();

    harness.handle.native(NativeEvent::TaxaDetected(genus_frame()));
    harness.settle().await;

    let states = predictions(&harness.drain());
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].active_rank(), Some(Rank::Genus));
}

#[tokio::test(start_paused = true)]
async fn test_shutter_ignored_while_unfocused() {
    let mut harness = HarnessBuilder::default().start();

    harness.handle.shutter();
    harness.settle().await;

    assert!(phases(&harness.drain()).is_empty());
    assert_eq!(harness.camera.take_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_android_gallery_denial_is_gallery_error() {
    let mut harness = HarnessBuilder {
        platform: Platform::Android,
        gallery: FakeGallery {
            permission: false,
            ..Default::default()
        },
        ..Default::default()
    }
    .start()
    .focused()
    .await;

    harness.handle.shutter();
    harness.settle().await;

    let errors = errors(&harness.drain());
    let error = errors[0].clone().unwrap();
    assert_eq!(error.kind, ErrorKind::Gallery);
    assert_eq!(error.detail.as_deref(), Some(GALLERY_PERMISSION_DENIED));
    assert!(harness.gallery.saved.lock().unwrap().is_empty());
    assert!(harness.camera.options.lock().unwrap()[0].pause_after_capture);
}

#[tokio::test(start_paused = true)]
async fn test_other_save_failure_is_save_error() {
    let gallery = FakeGallery::default();
    *gallery.save_failure.lock().unwrap() = Some("disk full".to_string());
    let mut harness = HarnessBuilder {
        gallery,
        ..Default::default()
    }
    .start()
    .focused()
    .await;

    harness.handle.shutter();
    harness.settle().await;

    let errors = errors(&harness.drain());
    assert_eq!(errors[0].as_ref().map(|e| e.kind), Some(ErrorKind::Save));
}

#[tokio::test(start_paused = true)]
async fn test_device_error_is_sticky_until_blur() {
    let mut harness = HarnessBuilder::default().start().focused().await;

    harness
        .handle
        .native(NativeEvent::DeviceNotSupported(Some("no neural engine".to_string())));
    harness.handle.native(NativeEvent::CameraPermissionMissing);
    harness
        .handle
        .native(NativeEvent::ClassifierError(Some("model missing".to_string())));
    harness.settle().await;

    let errors = errors(&harness.drain());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].as_ref().map(|e| e.kind), Some(ErrorKind::Device));

    // Shutter is blocked while an error is showing
    harness.handle.shutter();
    harness.settle().await;
    assert_eq!(harness.camera.take_calls.load(Ordering::SeqCst), 0);

    harness.handle.blur();
    harness.handle.focus();
    harness.handle.native(NativeEvent::CameraPermissionMissing);
    harness.settle().await;

    let errors = helpers::errors(&harness.drain());
    assert_eq!(errors.len(), 2);
    assert!(errors[0].is_none());
    assert_eq!(errors[1].as_ref().map(|e| e.kind), Some(ErrorKind::Permissions));
}

async fn assert_blur_resets_and_stops(platform: Platform) {
    let mut harness = HarnessBuilder {
        platform,
        ..Default::default()
    }
    .start()
    .focused()
    .await;

    harness.handle.native(NativeEvent::TaxaDetected(species_frame()));
    harness
        .handle
        .native(NativeEvent::CameraError("camera in use".to_string()));
    harness.settle().await;
    harness.drain();

    harness.handle.blur();
    harness.settle().await;

    let events = harness.drain();
    let states = predictions(&events);
    assert_eq!(states.len(), 1);
    assert!(states[0].is_empty());
    assert_eq!(errors(&events), vec![None]);
    assert_eq!(harness.camera.stop_calls.load(Ordering::SeqCst), 1);

    // The species hold was cancelled with the reset
    tokio::time::sleep(Duration::from_millis(5000)).await;
    assert!(harness.drain().is_empty());

    // Frames after leaving the screen are ignored
    harness.handle.native(NativeEvent::TaxaDetected(species_frame()));
    harness.settle().await;
    assert!(harness.drain().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_blur_resets_everything_and_stops_classifier_android() {
    assert_blur_resets_and_stops(Platform::Android).await;
}

#[tokio::test(start_paused = true)]
async fn test_blur_resets_everything_and_stops_classifier_ios() {
    assert_blur_resets_and_stops(Platform::Ios).await;
}

#[tokio::test(start_paused = true)]
async fn test_blur_mid_capture_abandons_session() {
    let camera = FakeCamera::default();
    *camera.capture_delay.lock().unwrap() = Some(Duration::from_millis(500));
    let mut harness = HarnessBuilder {
        camera,
        ..Default::default()
    }
    .start()
    .focused()
    .await;

    harness.handle.native(NativeEvent::TaxaDetected(species_frame()));
    harness.handle.shutter();
    harness.settle().await;
    harness.drain();
    harness.handle.blur();
    tokio::time::sleep(Duration::from_millis(1000)).await;

    let events = harness.drain();
    assert_eq!(phases(&events), vec![CapturePhase::Idle]);
    assert!(harness.gallery.saved.lock().unwrap().is_empty());
    assert!(harness.navigator.offline.lock().unwrap().is_empty());
}
