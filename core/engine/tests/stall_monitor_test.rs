//! Underrun detection: edge-triggered, silent while paused.

use std::sync::Arc;

use async_trait::async_trait;

use playback_engine::{
    AudioBackend, AudioManifest, ChunkFetcher, LessonManifest, LessonPlayerBuilder, PlayerEvent,
    PlayerResult, SimulatedAudioBackend, Slide, StallMonitor,
};

struct EchoFetcher;

#[async_trait]
impl ChunkFetcher for EchoFetcher {
    async fn fetch(&self, url: &str) -> PlayerResult<Vec<u8>> {
        Ok(url.as_bytes().to_vec())
    }
}

fn one_long_slide() -> LessonManifest {
    let mut slides = vec![Slide {
        audio_manifest: AudioManifest {
            chunks: vec!["/audio/0_000.opus".to_string()],
            ..Default::default()
        },
        captions_vtt_uri: Some("/captions/0.vtt".to_string()),
        target_duration_ms: 60_000,
        ..Default::default()
    }];
    slides.extend((1..5).map(|i| Slide {
        slide_index: i,
        ..Default::default()
    }));
    LessonManifest {
        slides,
        ..Default::default()
    }
}

fn stall_events(rx: &mut tokio::sync::mpsc::UnboundedReceiver<PlayerEvent>) -> Vec<f64> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let PlayerEvent::PlaybackStalled { buffered_seconds } = event {
            out.push(buffered_seconds);
        }
    }
    out
}

#[tokio::test(start_paused = true)]
async fn stall_fires_once_and_rearms_after_recovery() {
    let backend = Arc::new(SimulatedAudioBackend::new(2.0));
    let player = LessonPlayerBuilder::new()
        .manifest(one_long_slide())
        .backend(backend.clone())
        .fetcher(Arc::new(EchoFetcher))
        .build()
        .unwrap();
    let monitor = StallMonitor::new(&player);

    let mut rx = player.subscribe().await;
    player.start().await.unwrap();

    // Healthy buffer: no event.
    monitor.tick().await;
    assert!(stall_events(&mut rx).is_empty());

    // Drain below the threshold: exactly one event, however long it lasts.
    backend.advance(1.9).await;
    monitor.tick().await;
    monitor.tick().await;
    monitor.tick().await;
    let fired = stall_events(&mut rx);
    assert_eq!(fired.len(), 1);
    assert!(fired[0] < 0.2);

    // Recovery re-arms; the next underrun reports again.
    backend.schedule_complete(b"recovered").await.unwrap();
    monitor.tick().await;
    assert!(stall_events(&mut rx).is_empty());
    backend.advance(2.0).await;
    monitor.tick().await;
    assert_eq!(stall_events(&mut rx).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn stall_is_silent_while_paused() {
    let backend = Arc::new(SimulatedAudioBackend::new(2.0));
    let player = LessonPlayerBuilder::new()
        .manifest(one_long_slide())
        .backend(backend.clone())
        .fetcher(Arc::new(EchoFetcher))
        .build()
        .unwrap();
    let monitor = StallMonitor::new(&player);

    let mut rx = player.subscribe().await;
    player.start().await.unwrap();
    player.pause().await.unwrap();

    // Force the buffer down regardless of the pause.
    backend.resume().await.unwrap();
    backend.advance(1.9).await;
    monitor.tick().await;
    assert!(stall_events(&mut rx).is_empty());
}
