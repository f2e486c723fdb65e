use super::color::Rgb;
use std::collections::BTreeMap;

/// Opaque identifier of a drawn primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(u64);

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Point at `distance` from `self` along `angle` (radians).
    pub fn polar(self, distance: f32, angle: f32) -> Self {
        self.offset(distance * angle.cos(), distance * angle.sin())
    }
}

/// Axis-aligned bounding box in surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl BBox {
    fn around(points: &[Point], pad: f32) -> Option<Self> {
        let first = points.first()?;
        let mut bbox = BBox {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        for p in &points[1..] {
            bbox.min_x = bbox.min_x.min(p.x);
            bbox.min_y = bbox.min_y.min(p.y);
            bbox.max_x = bbox.max_x.max(p.x);
            bbox.max_y = bbox.max_y.max(p.y);
        }
        Some(bbox.pad(pad))
    }

    fn pad(self, pad: f32) -> Self {
        BBox {
            min_x: self.min_x - pad,
            min_y: self.min_y - pad,
            max_x: self.max_x + pad,
            max_y: self.max_y + pad,
        }
    }
}

/// Color plus coverage; `opacity < 1` stands in for stippled fills.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paint {
    pub color: Rgb,
    pub opacity: f32,
}

impl Paint {
    pub const fn solid(color: Rgb) -> Self {
        Self {
            color,
            opacity: 1.0,
        }
    }

    pub const fn translucent(color: Rgb, opacity: f32) -> Self {
        Self { color, opacity }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CircleStyle {
    Filled(Paint),
    Outline { paint: Paint, width: f32 },
}

/// Retained primitive as stored by [`Canvas`].
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Circle {
        center: Point,
        radius: f32,
        style: CircleStyle,
    },
    /// Open polyline; two points make a segment.
    Line {
        points: Vec<Point>,
        width: f32,
        paint: Paint,
    },
    Polygon {
        points: Vec<Point>,
        paint: Paint,
    },
    /// Cluster of small dots drawn as one shape.
    Scatter {
        points: Vec<Point>,
        dot_radius: f32,
        paint: Paint,
    },
}

impl Primitive {
    fn translate(&mut self, dx: f32, dy: f32) {
        match self {
            Primitive::Circle { center, .. } => *center = center.offset(dx, dy),
            Primitive::Line { points, .. }
            | Primitive::Polygon { points, .. }
            | Primitive::Scatter { points, .. } => {
                points.iter_mut().for_each(|p| *p = p.offset(dx, dy))
            }
        }
    }

    fn bbox(&self) -> Option<BBox> {
        match self {
            Primitive::Circle {
                center,
                radius,
                style,
            } => {
                let pad = match style {
                    CircleStyle::Filled(_) => 0.0,
                    CircleStyle::Outline { width, .. } => width / 2.0,
                };
                BBox::around(&[*center], radius + pad)
            }
            Primitive::Line { points, width, .. } => BBox::around(points, width / 2.0),
            Primitive::Polygon { points, .. } => BBox::around(points, 0.0),
            Primitive::Scatter {
                points, dot_radius, ..
            } => BBox::around(points, *dot_radius),
        }
    }
}

/// Drawing target the visual engine renders into.
pub trait DrawingSurface {
    fn width(&self) -> f32;
    fn height(&self) -> f32;

    fn draw_circle(&mut self, center: Point, radius: f32, style: CircleStyle) -> Handle;
    fn draw_line(&mut self, points: &[Point], width: f32, paint: Paint) -> Handle;
    fn draw_polygon(&mut self, points: &[Point], paint: Paint) -> Handle;
    fn draw_scatter(&mut self, points: &[Point], dot_radius: f32, paint: Paint) -> Handle;

    /// Translates a primitive; unknown handles are ignored.
    fn move_by(&mut self, handle: Handle, dx: f32, dy: f32);

    /// Bounding box of a live primitive.
    fn bbox(&self, handle: Handle) -> Option<BBox>;

    /// Removes a primitive; unknown handles are ignored.
    fn delete(&mut self, handle: Handle);

    /// Removes every primitive.
    fn clear(&mut self);
}

/// In-memory retained-mode surface. Primitives paint in creation order.
#[derive(Debug, Default)]
pub struct Canvas {
    width: f32,
    height: f32,
    next_id: u64,
    items: BTreeMap<Handle, Primitive>,
}

impl Canvas {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Tracks the size of the widget the canvas is shown in.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
    }

    pub fn get(&self, handle: Handle) -> Option<&Primitive> {
        self.items.get(&handle)
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.items.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Primitives in paint order.
    pub fn primitives(&self) -> impl Iterator<Item = (Handle, &Primitive)> {
        self.items.iter().map(|(h, p)| (*h, p))
    }

    fn insert(&mut self, primitive: Primitive) -> Handle {
        let handle = Handle(self.next_id);
        self.next_id += 1;
        self.items.insert(handle, primitive);
        handle
    }
}

impl DrawingSurface for Canvas {
    fn width(&self) -> f32 {
        self.width
    }

    fn height(&self) -> f32 {
        self.height
    }

    fn draw_circle(&mut self, center: Point, radius: f32, style: CircleStyle) -> Handle {
        self.insert(Primitive::Circle {
            center,
            radius: radius.abs(),
            style,
        })
    }

    fn draw_line(&mut self, points: &[Point], width: f32, paint: Paint) -> Handle {
        self.insert(Primitive::Line {
            points: points.to_vec(),
            width,
            paint,
        })
    }

    fn draw_polygon(&mut self, points: &[Point], paint: Paint) -> Handle {
        self.insert(Primitive::Polygon {
            points: points.to_vec(),
            paint,
        })
    }

    fn draw_scatter(&mut self, points: &[Point], dot_radius: f32, paint: Paint) -> Handle {
        self.insert(Primitive::Scatter {
            points: points.to_vec(),
            dot_radius,
            paint,
        })
    }

    fn move_by(&mut self, handle: Handle, dx: f32, dy: f32) {
        if let Some(item) = self.items.get_mut(&handle) {
            item.translate(dx, dy);
        }
    }

    fn bbox(&self, handle: Handle) -> Option<BBox> {
        self.items.get(&handle).and_then(Primitive::bbox)
    }

    fn delete(&mut self, handle: Handle) {
        self.items.remove(&handle);
    }

    fn clear(&mut self) {
        self.items.clear();
    }
}
