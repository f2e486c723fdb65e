//! Tick orchestration: the controller that owns the audio source, the
//! drawing surface and every piece of per-run state.

pub mod schedule;

use crate::audio::AudioSource;
use crate::config::{DecorationPolicy, RenderMode, VisualizerConfig};
use crate::dsp::{BandpassFilter, SpectralAnalyzer, SpectralFeatures};
use crate::error::{Result, VisualizerError};
use crate::visual::{
    AnimationReport, DrawingSurface, EntityAnimator, FeatureToVisualMapper, Rgb, StrokeSpawner,
    VisualEntitySpawner,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use schedule::RepeatingTask;
use std::time::{Duration, Instant};

/// Width of the level readout in pixels.
pub const METER_WIDTH: f32 = 200.0;
/// Level units per pixel of meter.
const METER_SCALE: f32 = 50.0;

/// Filled bar whose length follows the block level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelMeter {
    pub length: f32,
    pub color: Rgb,
}

impl Default for LevelMeter {
    fn default() -> Self {
        Self {
            length: 0.0,
            color: Rgb::GREEN,
        }
    }
}

impl LevelMeter {
    pub fn update(&mut self, level: f32, color: Rgb) {
        self.length = (level / METER_SCALE).clamp(0.0, METER_WIDTH);
        self.color = color;
    }

    /// Filled share of the meter, in [0, 1].
    pub fn fraction(&self) -> f32 {
        self.length / METER_WIDTH
    }
}

/// Counters since start (or since the last stats line, for the window copy).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    pub ticks: usize,
    pub skipped: usize,
    pub spawned: usize,
    pub expired: usize,
    pub evicted: usize,
}

impl TickStats {
    fn record(&mut self, outcome: &TickOutcome) {
        self.ticks += 1;
        match outcome {
            TickOutcome::Rendered {
                evicted, animation, ..
            } => {
                self.spawned += 1;
                self.evicted += usize::from(*evicted);
                self.expired += animation.expired;
            }
            TickOutcome::Skipped(_) => self.skipped += 1,
            TickOutcome::Stopped => {}
        }
    }
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// A new entity was drawn and the registry animated.
    Rendered {
        features: SpectralFeatures,
        evicted: bool,
        animation: AnimationReport,
    },
    /// Per-tick error; nothing was drawn this tick.
    Skipped(VisualizerError),
    /// The loop is not running.
    Stopped,
}

/// Owning controller with an explicit `start`/`stop` lifecycle.
pub struct Visualizer<S: DrawingSurface> {
    config: VisualizerConfig,
    filter: Option<BandpassFilter>,
    analyzer: SpectralAnalyzer,
    mapper: FeatureToVisualMapper,
    spawner: VisualEntitySpawner,
    strokes: StrokeSpawner,
    animator: EntityAnimator,
    rng: StdRng,

    source: Option<Box<dyn AudioSource>>,
    surface: Option<S>,
    task: RepeatingTask,
    epoch: Instant,

    meter: LevelMeter,
    stats: TickStats,
    window: TickStats,
    last_stats_log: f64,
    last_trail_clear: f64,
    last_features: Option<SpectralFeatures>,
    last_error: Option<VisualizerError>,
}

impl<S: DrawingSurface> Visualizer<S> {
    pub fn new(config: VisualizerConfig) -> Result<Self> {
        config.validate()?;

        let analyzer = SpectralAnalyzer::new(
            config.block_size,
            config.fft_bins,
            config.low_freq_hz,
            config.high_freq_hz,
        )?;
        let mapper =
            FeatureToVisualMapper::new(config.low_freq_hz, config.high_freq_hz, config.size_scaling);
        let spawner = VisualEntitySpawner::new(config.particle_density)?;
        let animator =
            EntityAnimator::new(config.max_entities, config.ttl_seconds, config.decorations);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let task = RepeatingTask::new(Duration::from_millis(config.tick_period_ms));

        Ok(Self {
            config,
            filter: None,
            analyzer,
            mapper,
            spawner,
            strokes: StrokeSpawner::default(),
            animator,
            rng,
            source: None,
            surface: None,
            task,
            epoch: Instant::now(),
            meter: LevelMeter::default(),
            stats: TickStats::default(),
            window: TickStats::default(),
            last_stats_log: 0.0,
            last_trail_clear: 0.0,
            last_features: None,
            last_error: None,
        })
    }

    /// Takes ownership of the audio source and drawing surface and arms the
    /// tick loop. Fails without arming when no source was selected.
    pub fn start(&mut self, source: Option<Box<dyn AudioSource>>, surface: S) -> Result<()> {
        let source = source.ok_or_else(|| {
            VisualizerError::DeviceUnavailable("no input device selected".into())
        })?;
        if self.is_running() {
            self.stop();
        }

        log::info!(
            "Starting visualizer: {:?} mode, {} ms ticks, {} Hz input",
            self.config.mode,
            self.config.tick_period_ms,
            source.sample_rate()
        );

        // Handles from a previous surface mean nothing on the new one.
        self.animator.forget_all();
        self.source = Some(source);
        self.surface = Some(surface);
        self.last_error = None;
        let now = self.clock();
        self.last_trail_clear = now;
        self.last_stats_log = now;
        self.task.start(Instant::now());
        Ok(())
    }

    /// Halts future ticks and releases the audio source. Idempotent.
    pub fn stop(&mut self) {
        self.task.cancel();
        if let Some(mut source) = self.source.take() {
            source.close();
            log::info!("Visualizer stopped after {} ticks", self.stats.ticks);
        }
    }

    /// Stops and hands back the drawing surface.
    pub fn shutdown(&mut self) -> Option<S> {
        self.stop();
        self.animator.forget_all();
        self.surface.take()
    }

    pub fn is_running(&self) -> bool {
        self.task.is_running()
    }

    /// Seconds since the controller was created.
    pub fn clock(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Event-loop entry point: runs a tick if one is due and returns the
    /// delay until the next one (`None` once stopped).
    pub fn on_frame(&mut self) -> Option<Duration> {
        if self.task.poll(Instant::now()) {
            let now = self.clock();
            self.tick_at(now);
            self.task.reschedule(Instant::now());
        }
        self.task.time_until_due(Instant::now())
    }

    /// Runs one capture, analyze, spawn, animate iteration at time `now`.
    /// Per-tick errors are absorbed and reported as [`TickOutcome::Skipped`].
    pub fn tick_at(&mut self, now: f64) -> TickOutcome {
        if !self.is_running() {
            return TickOutcome::Stopped;
        }

        let outcome = match self.render(now) {
            Ok(outcome) => outcome,
            Err(e) => {
                if e.is_tick_recoverable() {
                    log::warn!("Skipping tick: {}", e);
                } else {
                    log::error!("Skipping tick after unexpected error: {}", e);
                }
                self.last_error = Some(e.clone());
                TickOutcome::Skipped(e)
            }
        };

        self.stats.record(&outcome);
        self.window.record(&outcome);
        self.log_stats(now);
        outcome
    }

    fn render(&mut self, now: f64) -> Result<TickOutcome> {
        let (Some(source), Some(surface)) = (self.source.as_mut(), self.surface.as_mut()) else {
            return Err(VisualizerError::DeviceUnavailable("not started".into()));
        };
        let cfg = &self.config;

        //
        // Capture.
        //
        let sample_rate = source.sample_rate();
        let block = source.read(cfg.block_size)?;
        if block.len() != cfg.block_size {
            return Err(VisualizerError::InvalidBlockLength {
                expected: cfg.block_size,
                actual: block.len(),
            });
        }

        //
        // Band-limit and analyze.
        //
        let filter = filter_for(&mut self.filter, cfg, sample_rate)?;
        let filtered = filter.filter(&block);
        let features = self.analyzer.analyze(&filtered, sample_rate as f32)?;
        self.last_features = Some(features);

        //
        // Nothing below may run on a surface that cannot be drawn on; such a
        // tick leaves the registry and the surface untouched.
        //
        let (width, height) = (surface.width(), surface.height());
        if !(width >= 1.0 && height >= 1.0) {
            return Err(VisualizerError::EmptySurface { width, height });
        }

        if cfg.decorations == DecorationPolicy::Trail
            && now - self.last_trail_clear >= cfg.trail_clear_seconds
        {
            surface.clear();
            let dropped = self.animator.forget_all();
            self.last_trail_clear = now;
            log::debug!("Trail cleared ({} tracked entities dropped)", dropped);
        }

        //
        // Spawn and animate.
        //
        let (entity, meter_color) = match cfg.mode {
            RenderMode::Rich => {
                let style = self.mapper.map(&features);
                let entity = self.spawner.spawn(&style, surface, &mut self.rng, now)?;
                (entity, style.primary_color)
            }
            RenderMode::Simple => {
                let size = self.mapper.base_size(features.level);
                let entity = self.strokes.spawn(size, surface, &mut self.rng, now)?;
                (entity, Rgb::GREEN)
            }
        };
        let evicted = self.animator.admit(entity, surface).is_some();
        let animation = self.animator.tick(surface, now);
        self.meter.update(features.level, meter_color);

        Ok(TickOutcome::Rendered {
            features,
            evicted,
            animation,
        })
    }

    fn log_stats(&mut self, now: f64) {
        if now - self.last_stats_log < 1.0 {
            return;
        }
        log::info!(
            "TICK | ticks: {} | skipped: {} | entities: {} | level: {:.1}",
            self.window.ticks,
            self.window.skipped,
            self.animator.len(),
            self.last_features.map(|f| f.level).unwrap_or(0.0)
        );
        self.window = TickStats::default();
        self.last_stats_log = now;
    }

    pub fn config(&self) -> &VisualizerConfig {
        &self.config
    }

    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> Option<&mut S> {
        self.surface.as_mut()
    }

    pub fn animator(&self) -> &EntityAnimator {
        &self.animator
    }

    pub fn meter(&self) -> &LevelMeter {
        &self.meter
    }

    pub fn stats(&self) -> TickStats {
        self.stats
    }

    pub fn last_features(&self) -> Option<SpectralFeatures> {
        self.last_features
    }

    pub fn last_error(&self) -> Option<&VisualizerError> {
        self.last_error.as_ref()
    }
}

/// Designs the band-pass for `sample_rate` once and reuses it while the
/// rate stays the same.
fn filter_for<'a>(
    slot: &'a mut Option<BandpassFilter>,
    cfg: &VisualizerConfig,
    sample_rate: u32,
) -> Result<&'a BandpassFilter> {
    let stale = slot
        .as_ref()
        .map_or(true, |f| f.sample_rate() != sample_rate as f32);
    if stale {
        *slot = None;
        let filter = BandpassFilter::design(
            cfg.low_freq_hz,
            cfg.high_freq_hz,
            sample_rate as f32,
            cfg.filter_order,
        )?;
        log::info!(
            "Designed band-pass {}..{} Hz, order {} @ {} Hz",
            cfg.low_freq_hz,
            cfg.high_freq_hz,
            cfg.filter_order,
            sample_rate
        );
        *slot = Some(filter);
    }
    slot.as_ref().ok_or_else(|| VisualizerError::InvalidFilterSpec {
        low_hz: cfg.low_freq_hz,
        high_hz: cfg.high_freq_hz,
        order: cfg.filter_order,
        reason: "filter unavailable".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{tone, ScriptedSource};
    use crate::visual::Canvas;

    fn config() -> VisualizerConfig {
        VisualizerConfig {
            seed: Some(42),
            ..VisualizerConfig::default()
        }
    }

    fn started(source: ScriptedSource) -> Visualizer<Canvas> {
        let mut viz = Visualizer::new(config()).unwrap();
        viz.start(Some(Box::new(source)), Canvas::new(800.0, 600.0))
            .unwrap();
        viz
    }

    #[test]
    fn test_start_requires_device() {
        let mut viz: Visualizer<Canvas> = Visualizer::new(config()).unwrap();
        let err = viz.start(None, Canvas::new(800.0, 600.0)).unwrap_err();
        assert!(matches!(err, VisualizerError::DeviceUnavailable(_)));
        assert!(!viz.is_running());
        assert_eq!(viz.tick_at(0.0), TickOutcome::Stopped);
    }

    #[test]
    fn test_tick_renders_and_meters() {
        let block = tone(1000.0, 8000.0, 44100, 1024);
        let mut viz = started(ScriptedSource::repeating(44100, block));
        match viz.tick_at(0.0) {
            TickOutcome::Rendered { features, .. } => {
                assert!(features.level > 0.0);
                assert!((300.0..=3400.0).contains(&features.dominant_frequency_hz));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(viz.animator().len(), 1);
        assert!(viz.meter().length > 0.0);
        assert!(viz.meter().length <= METER_WIDTH);
        assert!(!viz.surface().unwrap().is_empty());
    }

    #[test]
    fn test_transient_read_skips_tick() {
        let mut source = ScriptedSource::new(44100);
        source
            .push_error(VisualizerError::DeviceReadTransient("overflow".into()))
            .push_block(vec![0; 17])
            .push_block(vec![0; 1024]);
        let mut viz = started(source);

        assert!(matches!(
            viz.tick_at(0.0),
            TickOutcome::Skipped(VisualizerError::DeviceReadTransient(_))
        ));
        assert!(matches!(
            viz.tick_at(0.05),
            TickOutcome::Skipped(VisualizerError::InvalidBlockLength { .. })
        ));
        assert!(matches!(viz.tick_at(0.1), TickOutcome::Rendered { .. }));
        assert!(viz.is_running());

        let stats = viz.stats();
        assert_eq!(stats.ticks, 3);
        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.spawned, 1);
    }

    #[test]
    fn test_infeasible_filter_skips_tick() {
        // 3400 Hz is above Nyquist at 6 kHz.
        let mut viz = started(ScriptedSource::repeating(6000, vec![0; 1024]));
        assert!(matches!(
            viz.tick_at(0.0),
            TickOutcome::Skipped(VisualizerError::InvalidFilterSpec { .. })
        ));
        assert!(viz.animator().is_empty());
        assert!(viz.is_running());
    }

    #[test]
    fn test_empty_surface_is_noop_tick() {
        let mut viz = Visualizer::new(config()).unwrap();
        viz.start(
            Some(Box::new(ScriptedSource::repeating(44100, vec![0; 1024]))),
            Canvas::new(0.0, 0.0),
        )
        .unwrap();
        assert!(matches!(
            viz.tick_at(0.0),
            TickOutcome::Skipped(VisualizerError::EmptySurface { .. })
        ));
        assert!(viz.surface().unwrap().is_empty());
    }

    #[test]
    fn test_undrawable_surface_keeps_registry() {
        let mut cfg = config();
        cfg.max_entities = 3;
        cfg.ttl_seconds = 100.0;
        let mut viz = Visualizer::new(cfg).unwrap();
        viz.start(
            Some(Box::new(ScriptedSource::repeating(
                44100,
                tone(1000.0, 8000.0, 44100, 1024),
            ))),
            Canvas::new(800.0, 600.0),
        )
        .unwrap();
        for i in 0..3 {
            assert!(matches!(
                viz.tick_at(i as f64 * 0.05),
                TickOutcome::Rendered { .. }
            ));
        }
        let drawn = viz.surface().unwrap().len();

        viz.surface_mut().unwrap().resize(0.0, 0.0);
        assert!(matches!(
            viz.tick_at(0.2),
            TickOutcome::Skipped(VisualizerError::EmptySurface { .. })
        ));
        assert_eq!(viz.animator().len(), 3);
        assert_eq!(viz.surface().unwrap().len(), drawn);
        assert_eq!(viz.stats().evicted, 0);

        // Back to a usable size: the next spawn evicts exactly one.
        viz.surface_mut().unwrap().resize(800.0, 600.0);
        match viz.tick_at(0.25) {
            TickOutcome::Rendered { evicted, .. } => assert!(evicted),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(viz.animator().len(), 3);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut viz = started(ScriptedSource::repeating(44100, vec![0; 1024]));
        viz.stop();
        viz.stop();
        assert!(!viz.is_running());
        assert_eq!(viz.tick_at(1.0), TickOutcome::Stopped);
        assert_eq!(viz.on_frame(), None);
        assert!(viz.shutdown().is_some());
        assert!(viz.surface().is_none());
    }

    #[test]
    fn test_simple_mode_uses_green_meter() {
        let mut cfg = VisualizerConfig::for_mode(RenderMode::Simple);
        cfg.seed = Some(5);
        let mut viz = Visualizer::new(cfg).unwrap();
        viz.start(
            Some(Box::new(ScriptedSource::repeating(
                44100,
                tone(700.0, 4000.0, 44100, 1024),
            ))),
            Canvas::new(640.0, 480.0),
        )
        .unwrap();
        assert!(matches!(viz.tick_at(0.0), TickOutcome::Rendered { .. }));
        assert_eq!(viz.meter().color, Rgb::GREEN);
        let e = viz.animator().entities().next().unwrap();
        assert_eq!((e.dx, e.dy), (0.0, 0.0));
    }

    #[test]
    fn test_trail_policy_clears_periodically() {
        let mut cfg = config();
        cfg.decorations = DecorationPolicy::Trail;
        cfg.trail_clear_seconds = 1.0;
        cfg.ttl_seconds = 100.0;
        let mut viz = Visualizer::new(cfg).unwrap();
        viz.start(
            Some(Box::new(ScriptedSource::repeating(
                44100,
                tone(1000.0, 8000.0, 44100, 1024),
            ))),
            Canvas::new(800.0, 600.0),
        )
        .unwrap();
        let start = viz.clock();
        for i in 0..5 {
            viz.tick_at(start + i as f64 * 0.1);
        }
        assert_eq!(viz.animator().len(), 5);

        viz.tick_at(start + 2.0);
        // Everything older was wiped; only the new entity is tracked.
        assert_eq!(viz.animator().len(), 1);
    }

    #[test]
    fn test_meter_is_capped() {
        let mut meter = LevelMeter::default();
        meter.update(1.0e9, Rgb::WHITE);
        assert_eq!(meter.length, METER_WIDTH);
        assert_eq!(meter.fraction(), 1.0);
        meter.update(500.0, Rgb::WHITE);
        assert_eq!(meter.length, 10.0);
    }
}
