use eframe::egui;
use voiceforms::visual::{CircleStyle, Paint, Point, Primitive, Rgb};
use voiceforms::LevelMeter;

pub const PLATINUM_BG: egui::Color32 = egui::Color32::from_rgb(212, 208, 200);
pub const PLATINUM_DARK: egui::Color32 = egui::Color32::from_rgb(128, 128, 128);
pub const CANVAS_BG: egui::Color32 = egui::Color32::BLACK;

pub fn setup_global_style(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();

    //
    // Set global background fill colors.
    //
    style.visuals.panel_fill = PLATINUM_BG;
    style.visuals.window_fill = PLATINUM_BG;

    //
    // Square widgets throughout.
    //
    style.visuals.widgets.noninteractive.rounding = egui::Rounding::ZERO;
    style.visuals.widgets.active.rounding = egui::Rounding::ZERO;
    style.visuals.widgets.inactive.rounding = egui::Rounding::ZERO;
    style.visuals.widgets.hovered.rounding = egui::Rounding::ZERO;

    ctx.set_style(style);
}

/// Draws the title bar with the current mode on the right.
pub fn draw_menu_bar(ui: &mut egui::Ui, mode_label: &str) {
    egui::TopBottomPanel::top("menubar").show_inside(ui, |ui| {
        ui.visuals_mut().widgets.noninteractive.bg_fill = PLATINUM_BG;
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("voiceforms").strong());

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(egui::RichText::new(mode_label).italics().size(10.0));
            });
        });
    });
}

/// Draws a window styled with the "Platinum" retro frame.
pub fn draw_platinum_window<F: FnOnce(&mut egui::Ui)>(ui: &mut egui::Ui, title: &str, content: F) {
    let frame = egui::Frame::none()
        .fill(PLATINUM_BG)
        .stroke(egui::Stroke::new(1.0, egui::Color32::BLACK))
        .inner_margin(2.0);

    frame.show(ui, |ui| {
        let title_height = 18.0;
        let (rect, _response) = ui.allocate_exact_size(
            egui::vec2(ui.available_width(), title_height),
            egui::Sense::hover(),
        );

        //
        // Pinstriped title bar.
        //
        ui.painter()
            .rect_filled(rect, 0.0, egui::Color32::from_rgb(200, 200, 200));
        for i in (0..rect.width() as i32).step_by(2) {
            let x = rect.min.x + i as f32;
            ui.painter().line_segment(
                [
                    egui::Pos2::new(x, rect.min.y),
                    egui::Pos2::new(x, rect.max.y),
                ],
                egui::Stroke::new(
                    1.0,
                    egui::Color32::from_rgba_premultiplied(255, 255, 255, 50),
                ),
            );
        }

        ui.painter().text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            title,
            egui::FontId::proportional(14.0),
            egui::Color32::BLACK,
        );

        ui.add_space(4.0);
        egui::Frame::group(ui.style())
            .stroke(egui::Stroke::new(1.0, PLATINUM_DARK))
            .inner_margin(6.0)
            .show(ui, content);
    });
}

pub fn color32(rgb: Rgb) -> egui::Color32 {
    egui::Color32::from_rgb(rgb.r, rgb.g, rgb.b)
}

fn paint_color(paint: &Paint) -> egui::Color32 {
    let alpha = (paint.opacity.clamp(0.0, 1.0) * 255.0) as u8;
    egui::Color32::from_rgba_unmultiplied(paint.color.r, paint.color.g, paint.color.b, alpha)
}

/// Converts one canvas primitive into an egui shape anchored at `origin`.
pub fn primitive_shape(primitive: &Primitive, origin: egui::Pos2) -> egui::Shape {
    let pos = |p: &Point| egui::pos2(origin.x + p.x, origin.y + p.y);

    match primitive {
        Primitive::Circle {
            center,
            radius,
            style,
        } => match style {
            CircleStyle::Filled(paint) => {
                egui::Shape::circle_filled(pos(center), *radius, paint_color(paint))
            }
            CircleStyle::Outline { paint, width } => egui::Shape::circle_stroke(
                pos(center),
                *radius,
                egui::Stroke::new(*width, paint_color(paint)),
            ),
        },
        Primitive::Line {
            points,
            width,
            paint,
        } => egui::Shape::line(
            points.iter().map(pos).collect(),
            egui::Stroke::new(*width, paint_color(paint)),
        ),
        Primitive::Polygon { points, paint } => egui::Shape::convex_polygon(
            points.iter().map(pos).collect(),
            paint_color(paint),
            egui::Stroke::NONE,
        ),
        Primitive::Scatter {
            points,
            dot_radius,
            paint,
        } => {
            let color = paint_color(paint);
            egui::Shape::Vec(
                points
                    .iter()
                    .map(|p| egui::Shape::circle_filled(pos(p), *dot_radius, color))
                    .collect(),
            )
        }
    }
}

/// Draws the level meter as a filled bar inside a sunken frame.
pub fn draw_level_meter(ui: &mut egui::Ui, meter: &LevelMeter) {
    let (rect, _response) = ui.allocate_exact_size(
        egui::vec2(voiceforms::engine::METER_WIDTH, 12.0),
        egui::Sense::hover(),
    );
    let painter = ui.painter();
    painter.rect_filled(rect, 0.0, egui::Color32::WHITE);

    let mut filled = rect;
    filled.set_width(meter.length);
    painter.rect_filled(filled, 0.0, color32(meter.color));

    painter.rect_stroke(
        rect,
        egui::Rounding::ZERO,
        egui::Stroke::new(1.0, PLATINUM_DARK),
    );
}
