use voiceforms::audio::{tone, AudioSource, ScriptedSource};
use voiceforms::visual::{Canvas, DrawingSurface};
use voiceforms::{TickOutcome, Visualizer, VisualizerConfig, VisualizerError};

fn seeded_config() -> VisualizerConfig {
    VisualizerConfig {
        seed: Some(7),
        ..VisualizerConfig::default()
    }
}

fn voice_block() -> Vec<i16> {
    tone(880.0, 6000.0, 44100, 1024)
}

#[test]
fn test_steady_stream_stays_bounded() {
    let mut viz: Visualizer<Canvas> = Visualizer::new(seeded_config()).unwrap();
    viz.start(
        Some(Box::new(ScriptedSource::repeating(44100, voice_block()))),
        Canvas::new(800.0, 600.0),
    )
    .unwrap();

    // Four simulated seconds at 50 ms per tick.
    for i in 0..80 {
        let now = i as f64 * 0.05;
        assert!(matches!(viz.tick_at(now), TickOutcome::Rendered { .. }));
        assert!(viz.animator().len() <= 15);
        for entity in viz.animator().entities() {
            assert!(entity.age(now) <= 1.5);
        }
    }

    let stats = viz.stats();
    assert_eq!(stats.ticks, 80);
    assert_eq!(stats.skipped, 0);
    assert_eq!(stats.spawned, 80);
    assert_eq!(
        stats.spawned,
        viz.animator().len() + stats.expired + stats.evicted
    );
}

#[test]
fn test_errors_skip_ticks_without_stopping() {
    let mut source = ScriptedSource::new(44100);
    source
        .push_block(voice_block())
        .push_error(VisualizerError::DeviceReadTransient("overflow".into()))
        .push_block(vec![0; 512])
        .push_block(voice_block());

    let mut viz: Visualizer<Canvas> = Visualizer::new(seeded_config()).unwrap();
    viz.start(Some(Box::new(source)), Canvas::new(800.0, 600.0))
        .unwrap();

    let outcomes: Vec<TickOutcome> = (0..4).map(|i| viz.tick_at(i as f64 * 0.05)).collect();
    assert!(matches!(outcomes[0], TickOutcome::Rendered { .. }));
    assert!(matches!(outcomes[1], TickOutcome::Skipped(_)));
    assert!(matches!(
        outcomes[2],
        TickOutcome::Skipped(VisualizerError::InvalidBlockLength {
            expected: 1024,
            actual: 512
        })
    ));
    assert!(matches!(outcomes[3], TickOutcome::Rendered { .. }));

    assert!(viz.is_running());
    assert_eq!(viz.stats().skipped, 2);
    assert_eq!(viz.animator().len(), 2);
    assert!(matches!(
        viz.last_error(),
        Some(VisualizerError::InvalidBlockLength { .. })
    ));
}

#[test]
fn test_start_without_device_fails() {
    let mut viz: Visualizer<Canvas> = Visualizer::new(seeded_config()).unwrap();
    let result = viz.start(None, Canvas::new(800.0, 600.0));
    assert!(matches!(result, Err(VisualizerError::DeviceUnavailable(_))));
    assert!(!viz.is_running());
    assert!(viz.surface().is_none());
}

#[test]
fn test_invalid_config_rejected() {
    let config = VisualizerConfig {
        max_entities: 0,
        ..VisualizerConfig::default()
    };
    assert!(matches!(
        Visualizer::<Canvas>::new(config),
        Err(VisualizerError::InvalidConfig(_))
    ));
}

#[test]
fn test_restart_reuses_controller() {
    let mut viz: Visualizer<Canvas> = Visualizer::new(seeded_config()).unwrap();
    viz.start(
        Some(Box::new(ScriptedSource::repeating(44100, voice_block()))),
        Canvas::new(800.0, 600.0),
    )
    .unwrap();
    for i in 0..5 {
        viz.tick_at(i as f64 * 0.05);
    }
    viz.stop();
    viz.stop();
    assert_eq!(viz.tick_at(1.0), TickOutcome::Stopped);

    viz.start(
        Some(Box::new(ScriptedSource::repeating(44100, voice_block()))),
        Canvas::new(320.0, 240.0),
    )
    .unwrap();
    assert!(viz.animator().is_empty());
    assert!(matches!(viz.tick_at(2.0), TickOutcome::Rendered { .. }));
    assert_eq!(viz.animator().len(), 1);
    assert_eq!(viz.surface().unwrap().width(), 320.0);
}

#[test]
fn test_sample_rate_change_redesigns_filter() {
    let mut viz: Visualizer<Canvas> = Visualizer::new(seeded_config()).unwrap();
    viz.start(
        Some(Box::new(ScriptedSource::repeating(48000, tone(1000.0, 6000.0, 48000, 1024)))),
        Canvas::new(800.0, 600.0),
    )
    .unwrap();
    match viz.tick_at(0.0) {
        TickOutcome::Rendered { features, .. } => {
            assert!((features.dominant_frequency_hz - 1000.0).abs() <= 48000.0 / 1024.0);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn test_scripted_source_is_closed_on_stop() {
    struct Probe {
        inner: ScriptedSource,
        closed: std::rc::Rc<std::cell::Cell<bool>>,
    }

    impl AudioSource for Probe {
        fn sample_rate(&self) -> u32 {
            self.inner.sample_rate()
        }
        fn read(&mut self, n: usize) -> voiceforms::Result<Vec<i16>> {
            self.inner.read(n)
        }
        fn close(&mut self) {
            self.inner.close();
            self.closed.set(true);
        }
    }

    let closed = std::rc::Rc::new(std::cell::Cell::new(false));
    let probe = Probe {
        inner: ScriptedSource::repeating(44100, voice_block()),
        closed: closed.clone(),
    };

    let mut viz: Visualizer<Canvas> = Visualizer::new(seeded_config()).unwrap();
    viz.start(Some(Box::new(probe)), Canvas::new(800.0, 600.0))
        .unwrap();
    viz.tick_at(0.0);
    assert!(!closed.get());
    viz.stop();
    assert!(closed.get());
}
