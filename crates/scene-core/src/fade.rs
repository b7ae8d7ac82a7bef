/// Linear gain ramp anchored to the audio clock.
///
/// Both paths of the graph describe fades with this type: the connected path
/// hands it to the platform as a scheduled automation, the element-only path
/// evaluates it on a timer.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Ramp {
    pub from: f32,
    pub to: f32,
    pub start: f64,
    pub duration: f64,
}

impl Ramp {
    /// A ramp that has already arrived at `value`.
    pub fn hold(value: f32) -> Self {
        Self {
            from: value,
            to: value,
            start: 0.0,
            duration: 0.0,
        }
    }

    pub fn new(from: f32, to: f32, start: f64, duration: f64) -> Self {
        Self {
            from,
            to,
            start,
            duration: duration.max(0.0),
        }
    }

    #[inline]
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    pub fn value_at(&self, now: f64) -> f32 {
        if self.duration <= 0.0 || now >= self.end() {
            return self.to;
        }
        if now <= self.start {
            return self.from;
        }
        let t = ((now - self.start) / self.duration) as f32;
        self.from + (self.to - self.from) * t
    }

    pub fn is_done(&self, now: f64) -> bool {
        self.from == self.to || now >= self.end()
    }
}
