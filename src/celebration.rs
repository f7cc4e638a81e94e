use rand::seq::SliceRandom;
use rand::Rng;

const FRAME_DT: f64 = 0.1;
const GRAVITY: f64 = 15.0;

/// Particle for the new-record burst
#[derive(Debug, Clone)]
pub struct Particle {
    pub x: f64,
    pub y: f64,
    pub vel_x: f64,
    pub vel_y: f64,
    pub symbol: char,
    pub color_index: usize,
    pub age: f64,
    pub max_age: f64,
    /// Part of the banner text; drifts to its slot and stays there
    pub is_text: bool,
    pub target_x: f64,
    pub target_y: f64,
}

impl Particle {
    fn spark<R: Rng>(x: f64, y: f64, rng: &mut R) -> Self {
        Self {
            x,
            y,
            vel_x: rng.gen_range(-3.0..3.0),
            vel_y: rng.gen_range(-4.0..-1.0),
            symbol: *['*', '+', '✦', '✧', '•', '★']
                .choose(rng)
                .unwrap_or(&'*'),
            color_index: rng.gen_range(0..7),
            age: 0.0,
            max_age: rng.gen_range(1.5..3.0),
            is_text: false,
            target_x: x,
            target_y: y,
        }
    }

    fn letter<R: Rng>(from: (f64, f64), to: (f64, f64), symbol: char, rng: &mut R) -> Self {
        Self {
            x: from.0,
            y: from.1,
            vel_x: to.0 - from.0,
            vel_y: to.1 - from.1,
            symbol,
            color_index: rng.gen_range(0..7),
            age: 0.0,
            max_age: rng.gen_range(3.0..4.0),
            is_text: true,
            target_x: to.0,
            target_y: to.1,
        }
    }

    /// Returns false once the particle has burned out
    fn update(&mut self, dt: f64) -> bool {
        if self.is_text {
            let dist = ((self.target_x - self.x).powi(2) + (self.target_y - self.y).powi(2)).sqrt();
            if dist > 1.0 {
                self.x += self.vel_x * dt;
                self.y += self.vel_y * dt;
                self.vel_x *= 0.95;
                self.vel_y *= 0.95;
            } else {
                self.x = self.target_x;
                self.y = self.target_y;
                self.vel_x = 0.0;
                self.vel_y = 0.0;
            }
        } else {
            self.x += self.vel_x * dt;
            self.y += self.vel_y * dt;
            self.vel_y += GRAVITY * dt;
        }

        self.age += dt;
        self.age < self.max_age
    }
}

/// Short particle animation played over the results screen on a new high score.
/// Advanced one frame per UI tick.
#[derive(Debug, Default)]
pub struct Celebration {
    pub particles: Vec<Particle>,
    pub is_active: bool,
    frames_left: u32,
    width: f64,
    height: f64,
}

impl Celebration {
    pub const FRAMES: u32 = 30;

    pub fn start(&mut self, width: u16, height: u16) {
        let mut rng = rand::thread_rng();
        self.start_with(width, height, &mut rng);
    }

    pub fn start_with<R: Rng>(&mut self, width: u16, height: u16, rng: &mut R) {
        self.particles.clear();
        self.is_active = true;
        self.frames_left = Self::FRAMES;
        self.width = f64::from(width);
        self.height = f64::from(height);

        let center_x = self.width / 2.0;
        let center_y = self.height / 2.0;
        let banner = *["NEW RECORD!", "HIGH SCORE!", "BEST EVER!"]
            .choose(rng)
            .unwrap_or(&"NEW RECORD!");

        let spacing = 2.0;
        let text_width = (banner.chars().count() as f64 - 1.0) * spacing;
        let left = center_x - text_width / 2.0;
        for (i, ch) in banner.chars().enumerate() {
            if ch == ' ' {
                continue;
            }
            let from = (
                center_x + rng.gen_range(-10.0..10.0),
                center_y + rng.gen_range(-5.0..5.0),
            );
            let to = (left + i as f64 * spacing, center_y - 4.0);
            self.particles.push(Particle::letter(from, to, ch, rng));
        }

        for _ in 0..25 {
            let x = center_x + rng.gen_range(-15.0..15.0);
            let y = center_y + rng.gen_range(-8.0..8.0);
            self.particles.push(Particle::spark(x, y, rng));
        }
    }

    pub fn update(&mut self) {
        if !self.is_active {
            return;
        }

        self.frames_left = self.frames_left.saturating_sub(1);
        if self.frames_left == 0 {
            self.stop();
            return;
        }

        let (width, height) = (self.width, self.height);
        self.particles.retain_mut(|p| {
            let alive = p.update(FRAME_DT);
            let margin = 5.0;
            let off_screen = !p.is_text
                && (p.y > height + margin || p.x < -margin || p.x > width + margin);
            alive && !off_screen
        });
    }

    pub fn stop(&mut self) {
        self.is_active = false;
        self.particles.clear();
    }
}
