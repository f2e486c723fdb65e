pub mod theme;

use eframe::egui;
use std::time::Duration;
use voiceforms::audio::{self, AudioSource, CpalSource};
use voiceforms::visual::Canvas;
use voiceforms::{RenderMode, Visualizer, VisualizerConfig};

pub struct VisualizerApp {
    visualizer: Visualizer<Canvas>,

    //
    // Device picker state.
    //
    devices: Vec<String>,
    selected_device: Option<usize>,

    //
    // Last user-facing failure (device open, start).
    //
    status: Option<String>,
}

impl VisualizerApp {
    pub fn new(
        _cc: &eframe::CreationContext,
        visualizer: Visualizer<Canvas>,
        preselected_device: Option<usize>,
    ) -> Self {
        let devices = audio::list_input_devices();
        let selected_device = preselected_device.filter(|&i| i < devices.len());
        if preselected_device.is_some() && selected_device.is_none() {
            log::warn!(
                "Device index {:?} not available ({} input devices)",
                preselected_device,
                devices.len()
            );
        }

        Self {
            visualizer,
            devices,
            selected_device,
            status: None,
        }
    }

    fn start(&mut self, canvas_size: egui::Vec2) {
        let config: &VisualizerConfig = self.visualizer.config();
        let source = match self.selected_device {
            None => None,
            Some(index) => match CpalSource::open(
                Some(index),
                config.sample_rate_hz,
                config.block_size,
                Duration::from_millis(config.read_timeout_ms),
            ) {
                Ok(source) => Some(Box::new(source) as Box<dyn AudioSource>),
                Err(e) => {
                    log::warn!("Cannot open input device {}: {}", index, e);
                    self.status = Some(e.to_string());
                    return;
                }
            },
        };

        let canvas = Canvas::new(canvas_size.x, canvas_size.y);
        match self.visualizer.start(source, canvas) {
            Ok(()) => self.status = None,
            Err(e) => {
                log::warn!("Cannot start visualizer: {}", e);
                self.status = Some(e.to_string());
            }
        }
    }

    fn draw_controls(&mut self, ui: &mut egui::Ui, canvas_size: egui::Vec2) {
        ui.horizontal(|ui| {
            let running = self.visualizer.is_running();
            let selected_text = self
                .selected_device
                .and_then(|i| self.devices.get(i))
                .map(String::as_str)
                .unwrap_or("Select input device");

            ui.add_enabled_ui(!running, |ui| {
                egui::ComboBox::from_id_salt("device")
                    .selected_text(selected_text)
                    .width(260.0)
                    .show_ui(ui, |ui| {
                        for (i, name) in self.devices.iter().enumerate() {
                            ui.selectable_value(&mut self.selected_device, Some(i), name);
                        }
                    });
            });

            if running {
                if ui.button("Stop").clicked() {
                    self.visualizer.stop();
                }
            } else if ui.button("Start").clicked() {
                self.start(canvas_size);
            }

            ui.separator();
            theme::draw_level_meter(ui, self.visualizer.meter());

            if let Some(features) = self.visualizer.last_features() {
                ui.label(format!("{:.0} Hz", features.dominant_frequency_hz));
            }
        });

        if let Some(status) = &self.status {
            ui.colored_label(egui::Color32::DARK_RED, status);
        }
    }
}

impl eframe::App for VisualizerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        //
        // Drive the tick loop and schedule the next repaint to match it.
        //
        match self.visualizer.on_frame() {
            Some(delay) => ctx.request_repaint_after(delay),
            None => ctx.request_repaint_after(Duration::from_millis(250)),
        }

        let mode_label = match self.visualizer.config().mode {
            RenderMode::Rich => "rich",
            RenderMode::Simple => "simple",
        };

        egui::CentralPanel::default().show(ctx, |ui| {
            theme::draw_menu_bar(ui, mode_label);
            ui.add_space(4.0);

            theme::draw_platinum_window(ui, "Voice Forms", |ui| {
                //
                // Reserve the canvas below the controls; its size is what a
                // new run starts with.
                //
                let controls_height = 48.0;
                let canvas_size = egui::vec2(
                    ui.available_width(),
                    (ui.available_height() - controls_height).max(0.0),
                );

                self.draw_controls(ui, canvas_size);
                ui.separator();

                let (response, painter) = ui.allocate_painter(
                    egui::vec2(ui.available_width(), ui.available_height()),
                    egui::Sense::hover(),
                );
                let rect = response.rect;
                painter.rect_filled(rect, 0.0, theme::CANVAS_BG);

                if let Some(canvas) = self.visualizer.surface_mut() {
                    canvas.resize(rect.width(), rect.height());
                    let shapes: Vec<egui::Shape> = canvas
                        .primitives()
                        .map(|(_, p)| theme::primitive_shape(p, rect.min))
                        .collect();
                    painter.with_clip_rect(rect).extend(shapes);
                }
            });
        });
    }
}
