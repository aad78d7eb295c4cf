// PCG32 (XSH-RR): small, fast and reproducible across platforms, which keeps a
// chain's trajectory fixed for a given seed.
#[derive(Clone, Debug)]
pub struct Pcg32 {
    state: u64,
    inc: u64,
}

const MULTIPLIER: u64 = 6364136223846793005;

// stream selector for the master generator of a run
const MASTER_STREAM: u64 = 0xcc;

impl Pcg32 {
    fn new(seed: u64, stream: u64) -> Self {
        let mut pcg = Pcg32 { state: 0, inc: (stream << 1) | 1 };
        pcg.next_u32();
        pcg.state = pcg.state.wrapping_add(seed);
        pcg.next_u32();
        pcg
    }

    pub fn seeded(seed: u64) -> Self {
        Pcg32::new(seed, MASTER_STREAM)
    }

    // Child generator on its own stream; advances this one.
    pub fn split(&mut self) -> Self {
        let seed = self.next_u64();
        let stream = self.next_u64();
        Pcg32::new(seed, stream)
    }

    #[inline]
    fn next_u32(&mut self) -> u32 {
        let old = self.state;
        self.state = old.wrapping_mul(MULTIPLIER).wrapping_add(self.inc);
        let xorshifted = (((old >> 18) ^ old) >> 27) as u32;
        let rot = (old >> 59) as u32;
        xorshifted.rotate_right(rot)
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        let hi = self.next_u32() as u64;
        let lo = self.next_u32() as u64;
        (hi << 32) | lo
    }

    /// Uniform in [0, 1) with 53 bits of precision.
    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Uniform in [0, hi).
    #[inline]
    pub fn uniform(&mut self, hi: f64) -> f64 {
        self.next_f64() * hi
    }

    /// Unbiased integer in [0, n); returns 0 when n is 0.
    #[inline]
    pub fn next_usize(&mut self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        let m = (u32::MAX as u64 + 1) / (n as u64);
        let t = m * (n as u64);
        loop {
            let x = self.next_u32() as u64;
            if x < t {
                return (x / m) as usize;
            }
        }
    }
}
