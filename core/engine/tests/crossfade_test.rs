//! Variant changes land on sentence boundaries, never mid-utterance.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use playback_engine::{
    next_boundary_after, AudioManifest, ChunkFetcher, LessonManifest, LessonPlayerBuilder,
    PlayerEvent, PlayerResult, SimulatedAudioBackend, Slide, VariantParams, VariantResolver,
};

struct EchoFetcher;

#[async_trait]
impl ChunkFetcher for EchoFetcher {
    async fn fetch(&self, url: &str) -> PlayerResult<Vec<u8>> {
        Ok(url.as_bytes().to_vec())
    }
}

struct FixedResolver {
    manifest: LessonManifest,
}

#[async_trait]
impl VariantResolver for FixedResolver {
    async fn resolve(&self, _params: &VariantParams) -> PlayerResult<LessonManifest> {
        Ok(self.manifest.clone())
    }
}

fn manifest_with_audio_prefix(prefix: &str) -> LessonManifest {
    let slides = (0..5)
        .map(|i| Slide {
            slide_index: i,
            audio_manifest: AudioManifest {
                chunks: vec![format!("{}/{}_000.opus", prefix, i)],
                ..Default::default()
            },
            captions_vtt_uri: Some(format!("/captions/{}.vtt", i)),
            sentence_boundaries_ms: vec![0, 2000, 4500],
            target_duration_ms: 6000,
            ..Default::default()
        })
        .collect();
    LessonManifest {
        slides,
        ..Default::default()
    }
}

#[test]
fn boundary_selection_is_strictly_after_the_clock() {
    let boundaries = [0u64, 2000, 4500];
    assert_eq!(next_boundary_after(&boundaries, 6000, 1800), 2000);
    // A boundary exactly at the clock is already in the past.
    assert_eq!(next_boundary_after(&boundaries, 6000, 2000), 4500);
    assert_eq!(next_boundary_after(&boundaries, 6000, 4600), 6000);
    assert_eq!(next_boundary_after(&boundaries, 6000, -50), 0);
    // No boundaries authored: the only safe point is the slide end.
    assert_eq!(next_boundary_after(&[], 7000, 1000), 7000);
}

#[tokio::test(start_paused = true)]
async fn imminent_boundary_applies_the_swap_immediately() {
    let backend = Arc::new(SimulatedAudioBackend::new(60.0));
    let player = LessonPlayerBuilder::new()
        .manifest(manifest_with_audio_prefix("/audio"))
        .backend(backend.clone())
        .fetcher(Arc::new(EchoFetcher))
        .resolver(Arc::new(FixedResolver {
            manifest: manifest_with_audio_prefix("/variant"),
        }))
        .build()
        .unwrap();

    let mut rx = player.subscribe().await;
    player.start().await.unwrap();
    backend.advance(1.8).await;

    let applied = player
        .request_variant_change(VariantParams::default())
        .await
        .unwrap();
    assert_eq!(applied.applied_boundary_ms, 2000);

    // The boundary is closer than the fade window, so the swap starts now.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(backend.crossfade_count().await, 1);
    assert!(backend
        .appended()
        .await
        .contains(&b"/variant/0_000.opus".to_vec()));

    let snapshot = player.snapshot().await;
    assert_eq!(snapshot.slide_index, 0);
    // The clock restarts at the fresh variant's first buffer.
    assert_eq!(snapshot.elapsed_ms, 0);

    let event = rx.try_recv().expect("slide started");
    assert_eq!(event, PlayerEvent::SlideStarted { slide_index: 0 });
    let event = rx.try_recv().expect("variant changed");
    assert_eq!(
        event,
        PlayerEvent::VariantChanged {
            applied_boundary_ms: 2000
        }
    );
}

#[tokio::test(start_paused = true)]
async fn distant_boundary_waits_for_the_fade_lead() {
    let backend = Arc::new(SimulatedAudioBackend::new(60.0));
    let player = LessonPlayerBuilder::new()
        .manifest(manifest_with_audio_prefix("/audio"))
        .backend(backend.clone())
        .fetcher(Arc::new(EchoFetcher))
        .resolver(Arc::new(FixedResolver {
            manifest: manifest_with_audio_prefix("/variant"),
        }))
        .build()
        .unwrap();

    player.start().await.unwrap();
    backend.advance(1.0).await;

    let applied = player
        .request_variant_change(VariantParams::default())
        .await
        .unwrap();
    assert_eq!(applied.applied_boundary_ms, 2000);

    // The fade needs 200ms, so the swap is held until 800ms from now.
    tokio::time::sleep(Duration::from_millis(700)).await;
    assert_eq!(backend.crossfade_count().await, 0);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(backend.crossfade_count().await, 1);
}

#[tokio::test(start_paused = true)]
async fn seeking_before_the_boundary_abandons_the_swap() {
    let backend = Arc::new(SimulatedAudioBackend::new(60.0));
    let player = LessonPlayerBuilder::new()
        .manifest(manifest_with_audio_prefix("/audio"))
        .backend(backend.clone())
        .fetcher(Arc::new(EchoFetcher))
        .resolver(Arc::new(FixedResolver {
            manifest: manifest_with_audio_prefix("/variant"),
        }))
        .build()
        .unwrap();

    let mut rx = player.subscribe().await;
    player.start().await.unwrap();

    player
        .request_variant_change(VariantParams::default())
        .await
        .unwrap();
    player.seek_to_slide(1).await.unwrap();

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(backend.crossfade_count().await, 0);
    let mut saw_variant_change = false;
    while let Ok(event) = rx.try_recv() {
        if matches!(event, PlayerEvent::VariantChanged { .. }) {
            saw_variant_change = true;
        }
    }
    assert!(!saw_variant_change);
}

#[tokio::test(start_paused = true)]
async fn unconfigured_resolver_leaves_playback_untouched() {
    let backend = Arc::new(SimulatedAudioBackend::new(60.0));
    let player = LessonPlayerBuilder::new()
        .manifest(manifest_with_audio_prefix("/audio"))
        .backend(backend.clone())
        .fetcher(Arc::new(EchoFetcher))
        .build()
        .unwrap();

    player.start().await.unwrap();
    backend.advance(1.8).await;

    // The request itself succeeds; the deferred swap fails at resolution
    // and is dropped without disturbing the running slide.
    player
        .request_variant_change(VariantParams::default())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(backend.crossfade_count().await, 0);
    assert!(player.snapshot().await.playing);
}
