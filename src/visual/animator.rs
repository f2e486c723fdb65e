use super::spawner::Motion;
use super::surface::{DrawingSurface, Handle};
use crate::config::DecorationPolicy;
use std::collections::VecDeque;

/// Lifecycle of a tracked entity. `Expired` and `Evicted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    Active,
    Expired,
    Evicted,
}

/// One animated visual object.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualEntity {
    /// Primary drawable; moved, bounced and used for removal.
    pub handle: Handle,
    /// Decorative drawables created alongside the primary.
    pub decorations: Vec<Handle>,
    /// Seconds on the controller clock.
    pub created_at: f64,
    pub dx: f32,
    pub dy: f32,
    pub rotation_rate: f32,
    pub scale_factor: f32,
    pub scale_direction: i8,
    pub state: EntityState,
}

impl VisualEntity {
    pub fn new(handle: Handle, decorations: Vec<Handle>, created_at: f64, motion: Motion) -> Self {
        Self {
            handle,
            decorations,
            created_at,
            dx: motion.dx,
            dy: motion.dy,
            rotation_rate: motion.rotation_rate,
            scale_factor: 1.0,
            scale_direction: motion.scale_direction,
            state: EntityState::Active,
        }
    }

    pub fn age(&self, now: f64) -> f64 {
        now - self.created_at
    }
}

/// Counts from one animation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnimationReport {
    pub moved: usize,
    pub bounced: usize,
    pub expired: usize,
}

/// Owns the live entities in age order (oldest first) and advances them.
#[derive(Debug)]
pub struct EntityAnimator {
    entities: VecDeque<VisualEntity>,
    max_entities: usize,
    ttl_seconds: f64,
    decorations: DecorationPolicy,
}

impl EntityAnimator {
    pub fn new(max_entities: usize, ttl_seconds: f64, decorations: DecorationPolicy) -> Self {
        Self {
            entities: VecDeque::with_capacity(max_entities),
            max_entities: max_entities.max(1),
            ttl_seconds,
            decorations,
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn max_entities(&self) -> usize {
        self.max_entities
    }

    /// Live entities, oldest first.
    pub fn entities(&self) -> impl Iterator<Item = &VisualEntity> {
        self.entities.iter()
    }

    /// Evicts the oldest entity when the registry is full, so that one more
    /// can be appended without exceeding the cap.
    pub fn make_room<S: DrawingSurface + ?Sized>(&mut self, surface: &mut S) -> Option<VisualEntity> {
        if self.entities.len() < self.max_entities {
            return None;
        }
        let mut oldest = self.entities.pop_front()?;
        self.discard(&oldest, surface);
        oldest.state = EntityState::Evicted;
        Some(oldest)
    }

    /// Appends `entity` as the newest, evicting the oldest if at capacity.
    pub fn admit<S: DrawingSurface + ?Sized>(
        &mut self,
        entity: VisualEntity,
        surface: &mut S,
    ) -> Option<VisualEntity> {
        let evicted = self.make_room(surface);
        self.entities.push_back(entity);
        evicted
    }

    /// One move / bounce / expire pass over every entity, followed by a
    /// single batched removal of the expired ones.
    pub fn tick<S: DrawingSurface + ?Sized>(&mut self, surface: &mut S, now: f64) -> AnimationReport {
        let width = surface.width();
        let height = surface.height();
        let move_group = self.decorations == DecorationPolicy::Grouped;
        let mut report = AnimationReport::default();

        for entity in self.entities.iter_mut() {
            surface.move_by(entity.handle, entity.dx, entity.dy);
            if move_group {
                for &d in &entity.decorations {
                    surface.move_by(d, entity.dx, entity.dy);
                }
            }
            report.moved += 1;

            if let Some(bbox) = surface.bbox(entity.handle) {
                let (dx, dy) = (entity.dx, entity.dy);
                entity.dx = reflect(dx, bbox.min_x <= 0.0, bbox.max_x >= width);
                entity.dy = reflect(dy, bbox.min_y <= 0.0, bbox.max_y >= height);
                if entity.dx != dx || entity.dy != dy {
                    report.bounced += 1;
                }
            }

            if entity.age(now) > self.ttl_seconds {
                entity.state = EntityState::Expired;
            }
        }

        let (expired, live): (VecDeque<_>, VecDeque<_>) = self
            .entities
            .drain(..)
            .partition(|e| e.state == EntityState::Expired);
        self.entities = live;
        for entity in &expired {
            self.discard(entity, surface);
        }
        report.expired = expired.len();
        report
    }

    /// Drops every entity without touching the surface; used after the
    /// surface itself was cleared.
    pub fn forget_all(&mut self) -> usize {
        let n = self.entities.len();
        self.entities.clear();
        n
    }

    /// Removes every entity and its drawables from the surface.
    pub fn clear<S: DrawingSurface + ?Sized>(&mut self, surface: &mut S) {
        for entity in std::mem::take(&mut self.entities) {
            self.discard(&entity, surface);
        }
    }

    fn discard<S: DrawingSurface + ?Sized>(&self, entity: &VisualEntity, surface: &mut S) {
        surface.delete(entity.handle);
        if self.decorations == DecorationPolicy::Grouped {
            for &d in &entity.decorations {
                surface.delete(d);
            }
        }
    }
}

/// One axis of edge reflection. Each edge is checked on its own and flips
/// the component only while it still points into that edge, so a box
/// leaving an edge it touches is not flipped back.
fn reflect(velocity: f32, touches_low: bool, touches_high: bool) -> f32 {
    if touches_low && velocity < 0.0 {
        -velocity
    } else if touches_high && velocity > 0.0 {
        -velocity
    } else {
        velocity
    }
}
