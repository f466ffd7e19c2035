use crate::models::{Filter, Laptop};

impl Filter {
    /// Whether `laptop` satisfies every bound of this filter.
    pub fn is_qualified(&self, laptop: &Laptop) -> bool {
        let min_ram_bits = self.min_ram.map_or(0, |ram| ram.to_bits());

        laptop.price_usd <= self.max_price_usd
            && laptop.cpu.number_cores >= self.min_cpu_cores
            && laptop.cpu.min_ghz >= self.min_cpu_ghz
            && laptop.ram.to_bits() >= min_ram_bits
    }
}
