use std::sync::atomic::{AtomicU32, Ordering};

/// Single-slot animation time shared between host scripting and the render thread.
///
/// One writer (the exported time setter) and one reader (the draw). The value
/// is stored as `f32` bits with relaxed ordering; the host delivers the next
/// render event after the write, which is all the ordering the draw needs.
#[derive(Debug)]
pub struct AnimationClock {
    bits: AtomicU32,
}

impl AnimationClock {
    pub const fn new() -> Self {
        Self {
            bits: AtomicU32::new(0),
        }
    }

    pub fn set(&self, time: f32) {
        self.bits.store(time.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

impl Default for AnimationClock {
    fn default() -> Self {
        Self::new()
    }
}
