/// 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const GREEN: Rgb = Rgb::new(0, 128, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// HSV to RGB with `hue` in degrees and `saturation`/`value` in [0, 1].
    /// Channels are truncated into 0..=255.
    pub fn from_hsv(hue: f32, saturation: f32, value: f32) -> Self {
        let h = hue.rem_euclid(360.0) / 60.0;
        let s = saturation.clamp(0.0, 1.0);
        let v = value.clamp(0.0, 1.0);

        let sector = h.floor();
        let f = h - sector;
        let p = v * (1.0 - s);
        let q = v * (1.0 - s * f);
        let t = v * (1.0 - s * (1.0 - f));

        let (r, g, b) = match sector as u32 % 6 {
            0 => (v, t, p),
            1 => (q, v, p),
            2 => (p, v, t),
            3 => (p, q, v),
            4 => (t, p, v),
            _ => (v, p, q),
        };

        Self::new(channel(r), channel(g), channel(b))
    }

    /// Mixes the color toward white: `alpha = 1` keeps it, `alpha = 0` gives white.
    pub fn blend_toward_white(self, alpha: f32) -> Self {
        let a = alpha.clamp(0.0, 1.0);
        let mix = |c: u8| (c as f32 * a + 255.0 * (1.0 - a)) as u8;
        Self::new(mix(self.r), mix(self.g), mix(self.b))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

fn channel(unit: f32) -> u8 {
    (unit * 255.0).clamp(0.0, 255.0) as u8
}
