use super::frame::StereoFrame;

// The master chain is lowpass -> gain, same as the host graph the songs were
// written against. Both stages work in place on a rendered block.
pub trait Effect: Send {
    fn process(&mut self, buf: &mut [StereoFrame]);
}

//lowpass (RBJ biquad)
pub struct Lowpass {
    sample_rate: f32,
    q: f32,
    cutoff: f32,
    enabled: bool,
    coeffs: [f32; 5], // b0 b1 b2 a1 a2, normalised by a0
    state: [StereoFrame; 4], // x1 x2 y1 y2
}

impl Lowpass {
    pub fn new(sample_rate: u32, cutoff: f32, q: f32) -> Self {
        let mut f = Self {
            sample_rate: sample_rate.max(1) as f32,
            q: q.max(0.01),
            cutoff,
            enabled: false,
            coeffs: [1.0, 0.0, 0.0, 0.0, 0.0],
            state: [StereoFrame::zero(); 4],
        };
        f.set_cutoff(cutoff);
        f
    }

    pub fn set_enabled(&mut self, on: bool) {
        if on && !self.enabled {
            self.state = [StereoFrame::zero(); 4];
        }
        self.enabled = on;
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    pub fn set_cutoff(&mut self, cutoff: f32) {
        // keep below nyquist or the coefficients blow up
        self.cutoff = cutoff.clamp(10.0, self.sample_rate * 0.49);
        let w0 = std::f32::consts::TAU * self.cutoff / self.sample_rate;
        let (sin, cos) = w0.sin_cos();
        let alpha = sin / (2.0 * self.q);
        let a0 = 1.0 + alpha;
        let b1 = (1.0 - cos) / a0;
        self.coeffs = [b1 * 0.5, b1, b1 * 0.5, (-2.0 * cos) / a0, (1.0 - alpha) / a0];
    }
}

impl Effect for Lowpass {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        if !self.enabled {
            return;
        }
        let [b0, b1, b2, a1, a2] = self.coeffs;
        let [mut x1, mut x2, mut y1, mut y2] = self.state;
        for f in buf.iter_mut() {
            let x0 = *f;
            let l = b0 * x0.left + b1 * x1.left + b2 * x2.left - a1 * y1.left - a2 * y2.left;
            let r = b0 * x0.right + b1 * x1.right + b2 * x2.right - a1 * y1.right - a2 * y2.right;
            x2 = x1;
            x1 = x0;
            y2 = y1;
            y1 = StereoFrame { left: l, right: r };
            *f = y1;
        }
        self.state = [x1, x2, y1, y2];
    }
}

//master gain
pub struct Gain {
    gain: f32,
}

impl Gain {
    pub fn new(gain: f32) -> Self {
        Self { gain }
    }
}

impl Effect for Gain {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        for f in buf.iter_mut() {
            *f = f.scaled(self.gain);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, rate: u32, len: usize) -> Vec<StereoFrame> {
        (0..len)
            .map(|i| StereoFrame::mono((std::f32::consts::TAU * freq * i as f32 / rate as f32).sin()))
            .collect()
    }

    fn peak(buf: &[StereoFrame]) -> f32 {
        buf.iter().map(|f| f.left.abs()).fold(0.0, f32::max)
    }

    #[test]
    fn bypassed_when_disabled() {
        let mut lp = Lowpass::new(22050, 300.0, 1.0);
        let mut buf = sine(5000.0, 22050, 512);
        let before = buf.clone();
        lp.process(&mut buf);
        assert_eq!(buf, before);
    }

    #[test]
    fn attenuates_highs_when_enabled() {
        let mut lp = Lowpass::new(22050, 300.0, 1.0);
        lp.set_enabled(true);
        let mut buf = sine(5000.0, 22050, 4096);
        lp.process(&mut buf);
        assert!(peak(&buf[2048..]) < 0.05);
    }

    #[test]
    fn cutoff_is_clamped_below_nyquist() {
        let lp = Lowpass::new(22050, 20000.0, 0.1);
        assert!(lp.cutoff() < 11025.0);
    }

    #[test]
    fn gain_scales() {
        let mut g = Gain::new(0.9);
        let mut buf = vec![StereoFrame::mono(1.0)];
        g.process(&mut buf);
        assert!((buf[0].left - 0.9).abs() < 1e-6);
    }
}
