/// The cycle and instructions-retired counters.
///
/// `mcycle`/`minstret` (and their `h` halves) are writable from machine mode; `cycle`/`instret`
/// are read-only shadows of them. A write suppresses the increment that would otherwise happen in
/// the same cycle, so the written value is what the next read returns.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Counters {
    mcycle: u64,
    minstret: u64,
    skip_next_mcycle_increment: bool,
    skip_next_minstret_increment: bool,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_cycle(&mut self) {
        if self.skip_next_mcycle_increment {
            self.skip_next_mcycle_increment = false;
            return;
        }
        self.mcycle = self.mcycle.wrapping_add(1);
    }

    pub fn increment_instret(&mut self) {
        if self.skip_next_minstret_increment {
            self.skip_next_minstret_increment = false;
            return;
        }
        self.minstret = self.minstret.wrapping_add(1);
    }

    pub fn cycle(&self) -> u64 {
        self.mcycle
    }

    pub fn instret(&self) -> u64 {
        self.minstret
    }

    pub fn read_mcycle(&self) -> u32 {
        self.mcycle as u32
    }

    pub fn read_mcycleh(&self) -> u32 {
        (self.mcycle >> 32) as u32
    }

    pub fn read_minstret(&self) -> u32 {
        self.minstret as u32
    }

    pub fn read_minstreth(&self) -> u32 {
        (self.minstret >> 32) as u32
    }

    pub fn write_mcycle(&mut self, value: u32, mask: u32) {
        self.mcycle = write_low(self.mcycle, value, mask);
        self.skip_next_mcycle_increment = true;
    }

    pub fn write_mcycleh(&mut self, value: u32, mask: u32) {
        self.mcycle = write_high(self.mcycle, value, mask);
        self.skip_next_mcycle_increment = true;
    }

    pub fn write_minstret(&mut self, value: u32, mask: u32) {
        self.minstret = write_low(self.minstret, value, mask);
        self.skip_next_minstret_increment = true;
    }

    pub fn write_minstreth(&mut self, value: u32, mask: u32) {
        self.minstret = write_high(self.minstret, value, mask);
        self.skip_next_minstret_increment = true;
    }
}

fn write_low(counter: u64, value: u32, mask: u32) -> u64 {
    let low = counter as u32 & !mask | value & mask;
    counter & 0xFFFF_FFFF_0000_0000 | low as u64
}

fn write_high(counter: u64, value: u32, mask: u32) -> u64 {
    let high = (counter >> 32) as u32 & !mask | value & mask;
    (high as u64) << 32 | counter & 0xFFFF_FFFF
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_carry_into_high_half() {
        let mut counters = Counters::new();
        counters.write_mcycle(u32::MAX, u32::MAX);
        counters.increment_cycle();
        assert_eq!(u32::MAX, counters.read_mcycle());
        counters.increment_cycle();
        assert_eq!(0, counters.read_mcycle());
        assert_eq!(1, counters.read_mcycleh());
    }

    #[test]
    fn test_write_skips_one_increment() {
        let mut counters = Counters::new();
        counters.increment_instret();
        counters.write_minstreth(2, u32::MAX);
        counters.increment_instret();
        assert_eq!(0x2_0000_0001, counters.instret());
        counters.increment_instret();
        assert_eq!(0x2_0000_0002, counters.instret());
    }
}
