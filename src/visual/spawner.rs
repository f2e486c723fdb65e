use super::animator::VisualEntity;
use super::color::Rgb;
use super::mapper::VisualStyle;
use super::surface::{CircleStyle, DrawingSurface, Handle, Paint, Point};
use crate::error::{Result, VisualizerError};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use rand_distr::StandardNormal;
use std::f32::consts::TAU;

/// Default archetype weights, in [`Archetype::ALL`] order.
pub const DEFAULT_WEIGHTS: [f32; 4] = [0.3, 0.3, 0.2, 0.2];

/// Keep-probability for points of an ordinary particle scatter.
const NOISE_DENSITY: f32 = 0.3;

/// The four visual compositions, each with its layering parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Archetype {
    /// Solid disc, concentric glow rings, secondary-colored scatter.
    GlowCircle { layers: usize, growth: f32 },
    /// Small disc surrounded by jittered scatter clusters.
    ParticleCloud { clusters: usize },
    /// Ring outline with radial spokes and an inner secondary glow.
    StripedCircle { spoke_step_deg: usize },
    /// Small disc inside a dense cloud of micro scatters.
    NoiseSphere { particles: usize, noise_density: f32 },
}

impl Archetype {
    pub const GLOW_CIRCLE: Archetype = Archetype::GlowCircle {
        layers: 3,
        growth: 0.3,
    };
    pub const PARTICLE_CLOUD: Archetype = Archetype::ParticleCloud { clusters: 5 };
    pub const STRIPED_CIRCLE: Archetype = Archetype::StripedCircle { spoke_step_deg: 20 };
    pub const NOISE_SPHERE: Archetype = Archetype::NoiseSphere {
        particles: 50,
        noise_density: 0.5,
    };

    pub const ALL: [Archetype; 4] = [
        Self::GLOW_CIRCLE,
        Self::PARTICLE_CLOUD,
        Self::STRIPED_CIRCLE,
        Self::NOISE_SPHERE,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Archetype::GlowCircle { .. } => "glow_circle",
            Archetype::ParticleCloud { .. } => "particle_cloud",
            Archetype::StripedCircle { .. } => "striped_circle",
            Archetype::NoiseSphere { .. } => "noise_sphere",
        }
    }
}

/// Initial motion of a freshly spawned entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub dx: f32,
    pub dy: f32,
    pub rotation_rate: f32,
    pub scale_direction: i8,
}

impl Motion {
    /// Direction uniform in [0, 2pi), speed uniform in [2, 5].
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let angle: f32 = rng.gen_range(0.0..TAU);
        let speed: f32 = rng.gen_range(2.0..=5.0);
        Self {
            dx: speed * angle.cos(),
            dy: speed * angle.sin(),
            rotation_rate: rng.gen_range(-5.0..=5.0),
            scale_direction: if rng.gen_bool(0.5) { 1 } else { -1 },
        }
    }

    pub fn still() -> Self {
        Self {
            dx: 0.0,
            dy: 0.0,
            rotation_rate: 0.0,
            scale_direction: 1,
        }
    }
}

fn gaussian<R: Rng + ?Sized>(rng: &mut R, mean: f32, std_dev: f32) -> f32 {
    let z: f32 = rng.sample(StandardNormal);
    mean + std_dev * z
}

fn ensure_drawable<S: DrawingSurface + ?Sized>(surface: &S) -> Result<()> {
    let (width, height) = (surface.width(), surface.height());
    if width >= 1.0 && height >= 1.0 {
        Ok(())
    } else {
        Err(VisualizerError::EmptySurface { width, height })
    }
}

/// Builds archetype compositions on the surface and wraps them into entities.
#[derive(Debug, Clone)]
pub struct VisualEntitySpawner {
    particle_density: usize,
    selector: WeightedIndex<f32>,
}

impl VisualEntitySpawner {
    pub fn new(particle_density: usize) -> Result<Self> {
        Self::with_weights(particle_density, DEFAULT_WEIGHTS)
    }

    /// Weights are relative and given in [`Archetype::ALL`] order.
    pub fn with_weights(particle_density: usize, weights: [f32; 4]) -> Result<Self> {
        let selector = WeightedIndex::new(weights)
            .map_err(|e| VisualizerError::InvalidConfig(format!("archetype weights: {}", e)))?;
        Ok(Self {
            particle_density,
            selector,
        })
    }

    pub fn choose_archetype<R: Rng + ?Sized>(&self, rng: &mut R) -> Archetype {
        Archetype::ALL[self.selector.sample(rng)]
    }

    /// Draws a random archetype at a random point and returns its entity.
    pub fn spawn<S, R>(
        &self,
        style: &VisualStyle,
        surface: &mut S,
        rng: &mut R,
        now: f64,
    ) -> Result<VisualEntity>
    where
        S: DrawingSurface + ?Sized,
        R: Rng + ?Sized,
    {
        ensure_drawable(surface)?;
        let center = Point::new(
            rng.gen_range(0.0..surface.width()),
            rng.gen_range(0.0..surface.height()),
        );
        let archetype = self.choose_archetype(rng);
        Ok(self.spawn_archetype(archetype, style, center, surface, rng, now))
    }

    /// Draws `archetype` centred on `center`.
    pub fn spawn_archetype<S, R>(
        &self,
        archetype: Archetype,
        style: &VisualStyle,
        center: Point,
        surface: &mut S,
        rng: &mut R,
        now: f64,
    ) -> VisualEntity
    where
        S: DrawingSurface + ?Sized,
        R: Rng + ?Sized,
    {
        let motion = Motion::random(rng);
        let size = style.base_size;
        let primary = style.primary_color;
        let mut decorations = Vec::new();

        let handle = match archetype {
            Archetype::GlowCircle { layers, growth } => {
                let handle =
                    surface.draw_circle(center, size, CircleStyle::Filled(Paint::solid(primary)));
                decorations.extend(glow_rings(surface, center, size, primary, layers, growth));
                decorations.extend(self.particle_scatter(
                    surface,
                    rng,
                    center,
                    size / 2.0,
                    style.secondary_color,
                    NOISE_DENSITY,
                ));
                handle
            }
            Archetype::ParticleCloud { clusters } => {
                let handle = surface.draw_circle(
                    center,
                    size / 2.0,
                    CircleStyle::Filled(Paint::solid(primary)),
                );
                for _ in 0..clusters {
                    let at = Point::new(
                        gaussian(rng, center.x, size / 3.0),
                        gaussian(rng, center.y, size / 3.0),
                    );
                    decorations.extend(self.particle_scatter(
                        surface,
                        rng,
                        at,
                        size / 3.0,
                        primary,
                        NOISE_DENSITY,
                    ));
                }
                handle
            }
            Archetype::StripedCircle { spoke_step_deg } => {
                let handle = surface.draw_circle(
                    center,
                    size,
                    CircleStyle::Outline {
                        paint: Paint::solid(primary),
                        width: 2.0,
                    },
                );
                for deg in (0..360).step_by(spoke_step_deg.max(1)) {
                    let rim = center.polar(size, (deg as f32).to_radians());
                    decorations.push(surface.draw_line(
                        &[center, rim],
                        2.0,
                        Paint::translucent(primary, 0.5),
                    ));
                }
                decorations.extend(glow_rings(
                    surface,
                    center,
                    size / 2.0,
                    style.secondary_color,
                    3,
                    0.3,
                ));
                handle
            }
            Archetype::NoiseSphere {
                particles,
                noise_density,
            } => {
                let handle = surface.draw_circle(
                    center,
                    size / 2.0,
                    CircleStyle::Filled(Paint::solid(primary)),
                );
                for _ in 0..particles {
                    let angle = rng.gen_range(0.0..TAU);
                    let radius = gaussian(rng, size / 2.0, size / 6.0);
                    let micro: f32 = rng.gen_range(2.0..=6.0);
                    decorations.extend(self.particle_scatter(
                        surface,
                        rng,
                        center.polar(radius, angle),
                        micro,
                        primary,
                        noise_density,
                    ));
                }
                handle
            }
        };

        log::debug!(
            "spawned {} at ({:.0}, {:.0}) size {:.1} hue {:.0} with {} decorations",
            archetype.name(),
            center.x,
            center.y,
            size,
            style.primary_hue,
            decorations.len()
        );

        VisualEntity::new(handle, decorations, now, motion)
    }

    /// Polar scatter around `center`: up to `min(5 * size, particle_density)`
    /// candidates, each kept with probability `noise_density`. Returns `None`
    /// when no point survives.
    pub fn particle_scatter<S, R>(
        &self,
        surface: &mut S,
        rng: &mut R,
        center: Point,
        size: f32,
        color: Rgb,
        noise_density: f32,
    ) -> Option<Handle>
    where
        S: DrawingSurface + ?Sized,
        R: Rng + ?Sized,
    {
        let candidates = ((size * 5.0).max(0.0) as usize).min(self.particle_density);
        let mut points = Vec::with_capacity(candidates);
        for _ in 0..candidates {
            let angle: f32 = rng.gen_range(0.0..TAU);
            let distance = gaussian(rng, size / 2.0, size / 4.0);
            let p = center.polar(distance, angle);
            if rng.gen::<f32>() < noise_density {
                points.push(p);
            }
        }

        if points.is_empty() {
            return None;
        }
        Some(surface.draw_scatter(&points, 1.0, Paint::translucent(color, 0.5)))
    }
}

/// Concentric rings `size * (1 + i * growth)`, fading toward white.
fn glow_rings<S: DrawingSurface + ?Sized>(
    surface: &mut S,
    center: Point,
    size: f32,
    color: Rgb,
    layers: usize,
    growth: f32,
) -> Vec<Handle> {
    (0..layers)
        .map(|i| {
            let radius = size * (1.0 + i as f32 * growth);
            let alpha = (0.3 - i as f32 * 0.1).max(0.0);
            let paint = Paint::translucent(color.blend_toward_white(alpha), 0.25);
            surface.draw_circle(center, radius, CircleStyle::Filled(paint))
        })
        .collect()
}

/// Fixed palette used by the stroke renderer.
pub const STROKE_PALETTE: [Rgb; 6] = [
    Rgb::new(255, 99, 71),
    Rgb::new(30, 144, 255),
    Rgb::new(34, 139, 34),
    Rgb::new(255, 215, 0),
    Rgb::new(138, 43, 226),
    Rgb::new(220, 20, 60),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrokeOrientation {
    Horizontal,
    Vertical,
    Diagonal,
    Curved,
}

impl StrokeOrientation {
    pub const ALL: [StrokeOrientation; 4] = [
        StrokeOrientation::Horizontal,
        StrokeOrientation::Vertical,
        StrokeOrientation::Diagonal,
        StrokeOrientation::Curved,
    ];
}

/// Simple-mode renderer: one palette-colored stroke per tick, with an
/// orientation that is redrawn at a fixed interval.
#[derive(Debug, Clone)]
pub struct StrokeSpawner {
    orientation: StrokeOrientation,
    changed_at: Option<f64>,
    change_every: f64,
}

impl Default for StrokeSpawner {
    fn default() -> Self {
        Self::new(5.0)
    }
}

impl StrokeSpawner {
    pub fn new(change_every: f64) -> Self {
        Self {
            orientation: StrokeOrientation::Horizontal,
            changed_at: None,
            change_every,
        }
    }

    pub fn orientation(&self) -> StrokeOrientation {
        self.orientation
    }

    fn update_orientation<R: Rng + ?Sized>(&mut self, rng: &mut R, now: f64) {
        match self.changed_at {
            None => self.changed_at = Some(now),
            Some(at) if now - at > self.change_every => {
                self.orientation = StrokeOrientation::ALL[rng.gen_range(0..4)];
                self.changed_at = Some(now);
            }
            Some(_) => {}
        }
    }

    pub fn spawn<S, R>(
        &mut self,
        size: f32,
        surface: &mut S,
        rng: &mut R,
        now: f64,
    ) -> Result<VisualEntity>
    where
        S: DrawingSurface + ?Sized,
        R: Rng + ?Sized,
    {
        ensure_drawable(surface)?;
        self.update_orientation(rng, now);

        let color = STROKE_PALETTE[rng.gen_range(0..STROKE_PALETTE.len())];
        let width = rng.gen_range(8..=15) as f32;
        let start = Point::new(
            rng.gen_range(0..surface.width() as u32) as f32,
            rng.gen_range(0..surface.height() as u32) as f32,
        );

        let points = match self.orientation {
            StrokeOrientation::Horizontal => vec![start, start.offset(size, 0.0)],
            StrokeOrientation::Vertical => vec![start, start.offset(0.0, size)],
            StrokeOrientation::Diagonal => vec![start, start.offset(size, size)],
            StrokeOrientation::Curved => {
                let reach = size.max(1.0) as i32;
                let control = start.offset(
                    rng.gen_range(-reach..=reach) as f32,
                    rng.gen_range(-reach..=reach) as f32,
                );
                quadratic_curve(start, control, start.offset(size, size), 16)
            }
        };

        let handle = surface.draw_line(&points, width, Paint::solid(color));
        log::debug!(
            "stroke {:?} at ({:.0}, {:.0}) size {:.1} color {}",
            self.orientation,
            start.x,
            start.y,
            size,
            color.to_hex()
        );
        Ok(VisualEntity::new(handle, Vec::new(), now, Motion::still()))
    }
}

/// Samples a quadratic Bezier from `a` to `c` pulled toward `b`.
fn quadratic_curve(a: Point, b: Point, c: Point, segments: usize) -> Vec<Point> {
    (0..=segments)
        .map(|i| {
            let t = i as f32 / segments as f32;
            let u = 1.0 - t;
            Point::new(
                u * u * a.x + 2.0 * u * t * b.x + t * t * c.x,
                u * u * a.y + 2.0 * u * t * b.y + t * t * c.y,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visual::surface::{Canvas, Primitive};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn style(size: f32) -> VisualStyle {
        VisualStyle {
            primary_color: Rgb::new(229, 45, 45),
            secondary_color: Rgb::new(61, 204, 204),
            base_size: size,
            primary_hue: 0.0,
            secondary_hue: 180.0,
        }
    }

    fn setup() -> (VisualEntitySpawner, Canvas, StdRng) {
        (
            VisualEntitySpawner::new(20).unwrap(),
            Canvas::new(800.0, 600.0),
            StdRng::seed_from_u64(7),
        )
    }

    #[test]
    fn test_glow_circle_layers() {
        let (spawner, mut canvas, mut rng) = setup();
        let center = Point::new(400.0, 300.0);
        let e = spawner.spawn_archetype(
            Archetype::GLOW_CIRCLE,
            &style(20.0),
            center,
            &mut canvas,
            &mut rng,
            0.0,
        );

        match canvas.get(e.handle) {
            Some(Primitive::Circle { radius, style, .. }) => {
                assert_eq!(*radius, 20.0);
                assert_eq!(*style, CircleStyle::Filled(Paint::solid(Rgb::new(229, 45, 45))));
            }
            other => panic!("unexpected primary {:?}", other),
        }

        let radii: Vec<f32> = e.decorations[..3]
            .iter()
            .map(|h| match canvas.get(*h) {
                Some(Primitive::Circle { radius, .. }) => *radius,
                other => panic!("unexpected glow {:?}", other),
            })
            .collect();
        for (got, want) in radii.iter().zip([20.0, 26.0, 32.0]) {
            assert!((got - want).abs() < 1e-3, "ring radius {} != {}", got, want);
        }
        // Primary, 3 glow rings, at most one scatter.
        assert!(canvas.len() == 4 || canvas.len() == 5);
    }

    #[test]
    fn test_striped_circle_has_eighteen_spokes() {
        let (spawner, mut canvas, mut rng) = setup();
        let e = spawner.spawn_archetype(
            Archetype::STRIPED_CIRCLE,
            &style(30.0),
            Point::new(100.0, 100.0),
            &mut canvas,
            &mut rng,
            0.0,
        );
        let spokes = e
            .decorations
            .iter()
            .filter(|h| matches!(canvas.get(**h), Some(Primitive::Line { .. })))
            .count();
        assert_eq!(spokes, 18);
        assert!(matches!(
            canvas.get(e.handle),
            Some(Primitive::Circle {
                style: CircleStyle::Outline { .. },
                ..
            })
        ));
        // Spoke tips sit on the ring.
        if let Some(Primitive::Line { points, .. }) = canvas.get(e.decorations[0]) {
            assert!((points[1].x - 130.0).abs() < 1e-3);
            assert!((points[1].y - 100.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_small_primaries() {
        let (spawner, mut canvas, mut rng) = setup();
        for (archetype, max_decorations) in
            [(Archetype::PARTICLE_CLOUD, 5), (Archetype::NOISE_SPHERE, 50)]
        {
            let e = spawner.spawn_archetype(
                archetype,
                &style(40.0),
                Point::new(200.0, 200.0),
                &mut canvas,
                &mut rng,
                0.0,
            );
            match canvas.get(e.handle) {
                Some(Primitive::Circle { radius, .. }) => assert_eq!(*radius, 20.0),
                other => panic!("unexpected primary {:?}", other),
            }
            assert!(e
                .decorations
                .iter()
                .all(|h| matches!(canvas.get(*h), Some(Primitive::Scatter { .. }))));
            assert!(
                e.decorations.len() <= max_decorations,
                "{} drew {} clusters",
                archetype.name(),
                e.decorations.len()
            );
        }
    }

    #[test]
    fn test_cluster_counts() {
        assert_eq!(Archetype::PARTICLE_CLOUD, Archetype::ParticleCloud { clusters: 5 });
        assert_eq!(
            Archetype::NOISE_SPHERE,
            Archetype::NoiseSphere {
                particles: 50,
                noise_density: 0.5
            }
        );

        // With every point kept, each micro particle yields one scatter.
        let (spawner, mut canvas, mut rng) = setup();
        let dense = Archetype::NoiseSphere {
            particles: 50,
            noise_density: 1.0,
        };
        let e = spawner.spawn_archetype(
            dense,
            &style(40.0),
            Point::new(200.0, 200.0),
            &mut canvas,
            &mut rng,
            0.0,
        );
        assert_eq!(e.decorations.len(), 50);
    }

    #[test]
    fn test_scatter_respects_density_cap() {
        let spawner = VisualEntitySpawner::new(20).unwrap();
        let mut canvas = Canvas::new(800.0, 600.0);
        let mut rng = StdRng::seed_from_u64(1);
        let h = spawner
            .particle_scatter(&mut canvas, &mut rng, Point::new(50.0, 50.0), 100.0, Rgb::WHITE, 1.0)
            .unwrap();
        match canvas.get(h) {
            Some(Primitive::Scatter { points, .. }) => assert_eq!(points.len(), 20),
            other => panic!("unexpected scatter {:?}", other),
        }

        assert!(spawner
            .particle_scatter(&mut canvas, &mut rng, Point::new(50.0, 50.0), 100.0, Rgb::WHITE, 0.0)
            .is_none());
    }

    #[test]
    fn test_motion_ranges() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let m = Motion::random(&mut rng);
            let speed = (m.dx * m.dx + m.dy * m.dy).sqrt();
            assert!((2.0 - 1e-4..=5.0 + 1e-4).contains(&speed));
            assert!((-5.0..=5.0).contains(&m.rotation_rate));
            assert!(m.scale_direction == 1 || m.scale_direction == -1);
        }
    }

    #[test]
    fn test_weighted_choice_favours_first_two() {
        let (spawner, _, mut rng) = setup();
        let mut counts = [0usize; 4];
        for _ in 0..10_000 {
            let a = spawner.choose_archetype(&mut rng);
            let i = Archetype::ALL.iter().position(|x| *x == a).unwrap();
            counts[i] += 1;
        }
        assert!(counts[0] > counts[2] && counts[0] > counts[3]);
        assert!(counts[1] > counts[2] && counts[1] > counts[3]);
        assert!(counts.iter().all(|&c| c > 1000));
    }

    #[test]
    fn test_spawn_inside_bounds() {
        let (spawner, mut canvas, mut rng) = setup();
        for i in 0..50 {
            let e = spawner.spawn(&style(20.0), &mut canvas, &mut rng, i as f64).unwrap();
            let bbox = canvas.bbox(e.handle).unwrap();
            let cx = (bbox.min_x + bbox.max_x) / 2.0;
            let cy = (bbox.min_y + bbox.max_y) / 2.0;
            assert!((0.0..800.0).contains(&cx));
            assert!((0.0..600.0).contains(&cy));
            assert_eq!(e.created_at, i as f64);
        }
    }

    #[test]
    fn test_empty_surface_is_rejected() {
        let (spawner, _, mut rng) = setup();
        let mut canvas = Canvas::new(0.0, 600.0);
        let err = spawner.spawn(&style(20.0), &mut canvas, &mut rng, 0.0).unwrap_err();
        assert!(matches!(err, VisualizerError::EmptySurface { .. }));
        assert!(canvas.is_empty());
    }

    #[test]
    fn test_rejects_zero_weights() {
        assert!(VisualEntitySpawner::with_weights(20, [0.0; 4]).is_err());
    }

    #[test]
    fn test_stroke_orientation_rotates() {
        let mut strokes = StrokeSpawner::new(5.0);
        let mut canvas = Canvas::new(800.0, 600.0);
        let mut rng = StdRng::seed_from_u64(11);

        let first = strokes.spawn(30.0, &mut canvas, &mut rng, 0.0).unwrap();
        assert_eq!(strokes.orientation(), StrokeOrientation::Horizontal);
        match canvas.get(first.handle) {
            Some(Primitive::Line { points, width, paint }) => {
                assert_eq!(points.len(), 2);
                assert_eq!(points[1].x - points[0].x, 30.0);
                assert!((8.0..=15.0).contains(width));
                assert!(STROKE_PALETTE.contains(&paint.color));
            }
            other => panic!("unexpected stroke {:?}", other),
        }
        assert_eq!((first.dx, first.dy), (0.0, 0.0));

        strokes.spawn(30.0, &mut canvas, &mut rng, 4.0).unwrap();
        assert_eq!(strokes.orientation(), StrokeOrientation::Horizontal);
        assert_eq!(strokes.changed_at, Some(0.0));

        strokes.spawn(30.0, &mut canvas, &mut rng, 5.5).unwrap();
        assert_eq!(strokes.changed_at, Some(5.5));
    }

    #[test]
    fn test_curve_endpoints() {
        let pts = quadratic_curve(
            Point::new(0.0, 0.0),
            Point::new(5.0, -5.0),
            Point::new(10.0, 10.0),
            8,
        );
        assert_eq!(pts.len(), 9);
        assert_eq!(pts[0], Point::new(0.0, 0.0));
        assert_eq!(pts[8], Point::new(10.0, 10.0));
    }
}
