//! Proto ↔ domain conversions for the catalog.
//!
//! Proto → domain is fallible (`TryFrom` with a `String` error that handlers
//! turn into `InvalidArgument`): `UNKNOWN` enum values and missing required
//! sub-messages are rejected. Domain → proto always succeeds.

use chrono::{DateTime, Utc};
use rpc::catalog as proto;
use rpc::catalog::{keyboard, laptop, memory, screen, storage};

use crate::models::{
    Cpu, Filter, Gpu, Keyboard, KeyboardLayout, Laptop, Memory, MemoryUnit, Panel, Resolution,
    Screen, Storage, StorageDriver, Weight,
};

// ============================================================================
// Timestamp helpers
// ============================================================================

pub fn datetime_to_timestamp(dt: DateTime<Utc>) -> i64 {
    dt.timestamp()
}

pub fn timestamp_to_datetime(ts: i64) -> Result<DateTime<Utc>, String> {
    DateTime::from_timestamp(ts, 0).ok_or_else(|| format!("Invalid timestamp: {}", ts))
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, String> {
    value.ok_or_else(|| format!("{} is required", field))
}

// ============================================================================
// Enum conversions
// ============================================================================

impl From<MemoryUnit> for i32 {
    fn from(unit: MemoryUnit) -> Self {
        let unit = match unit {
            MemoryUnit::Bit => memory::Unit::Bit,
            MemoryUnit::Byte => memory::Unit::Byte,
            MemoryUnit::Kilobyte => memory::Unit::Kilobyte,
            MemoryUnit::Megabyte => memory::Unit::Megabyte,
            MemoryUnit::Gigabyte => memory::Unit::Gigabyte,
            MemoryUnit::Terabyte => memory::Unit::Terabyte,
        };
        unit as i32
    }
}

impl TryFrom<i32> for MemoryUnit {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match memory::Unit::try_from(value) {
            Ok(memory::Unit::Bit) => Ok(MemoryUnit::Bit),
            Ok(memory::Unit::Byte) => Ok(MemoryUnit::Byte),
            Ok(memory::Unit::Kilobyte) => Ok(MemoryUnit::Kilobyte),
            Ok(memory::Unit::Megabyte) => Ok(MemoryUnit::Megabyte),
            Ok(memory::Unit::Gigabyte) => Ok(MemoryUnit::Gigabyte),
            Ok(memory::Unit::Terabyte) => Ok(MemoryUnit::Terabyte),
            Ok(memory::Unit::Unknown) | Err(_) => Err(format!("Invalid memory unit: {}", value)),
        }
    }
}

impl From<StorageDriver> for i32 {
    fn from(driver: StorageDriver) -> Self {
        match driver {
            StorageDriver::Hdd => storage::Driver::Hdd as i32,
            StorageDriver::Ssd => storage::Driver::Ssd as i32,
        }
    }
}

impl TryFrom<i32> for StorageDriver {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match storage::Driver::try_from(value) {
            Ok(storage::Driver::Hdd) => Ok(StorageDriver::Hdd),
            Ok(storage::Driver::Ssd) => Ok(StorageDriver::Ssd),
            Ok(storage::Driver::Unknown) | Err(_) => {
                Err(format!("Invalid storage driver: {}", value))
            }
        }
    }
}

impl From<Panel> for i32 {
    fn from(panel: Panel) -> Self {
        match panel {
            Panel::Ips => screen::Panel::Ips as i32,
            Panel::Oled => screen::Panel::Oled as i32,
        }
    }
}

impl TryFrom<i32> for Panel {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match screen::Panel::try_from(value) {
            Ok(screen::Panel::Ips) => Ok(Panel::Ips),
            Ok(screen::Panel::Oled) => Ok(Panel::Oled),
            Ok(screen::Panel::Unknown) | Err(_) => Err(format!("Invalid screen panel: {}", value)),
        }
    }
}

impl From<KeyboardLayout> for i32 {
    fn from(layout: KeyboardLayout) -> Self {
        match layout {
            KeyboardLayout::Qwerty => keyboard::Layout::Qwerty as i32,
            KeyboardLayout::Qwertz => keyboard::Layout::Qwertz as i32,
            KeyboardLayout::Azerty => keyboard::Layout::Azerty as i32,
        }
    }
}

impl TryFrom<i32> for KeyboardLayout {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match keyboard::Layout::try_from(value) {
            Ok(keyboard::Layout::Qwerty) => Ok(KeyboardLayout::Qwerty),
            Ok(keyboard::Layout::Qwertz) => Ok(KeyboardLayout::Qwertz),
            Ok(keyboard::Layout::Azerty) => Ok(KeyboardLayout::Azerty),
            Ok(keyboard::Layout::Unknown) | Err(_) => {
                Err(format!("Invalid keyboard layout: {}", value))
            }
        }
    }
}

// ============================================================================
// Component conversions
// ============================================================================

impl From<Memory> for proto::Memory {
    fn from(memory: Memory) -> Self {
        proto::Memory {
            value: memory.value,
            unit: memory.unit.into(),
        }
    }
}

impl TryFrom<proto::Memory> for Memory {
    type Error = String;

    fn try_from(memory: proto::Memory) -> Result<Self, Self::Error> {
        Ok(Memory::new(memory.value, memory.unit.try_into()?))
    }
}

impl From<Cpu> for proto::Cpu {
    fn from(cpu: Cpu) -> Self {
        proto::Cpu {
            brand: cpu.brand,
            name: cpu.name,
            number_cores: cpu.number_cores,
            number_threads: cpu.number_threads,
            min_ghz: cpu.min_ghz,
            max_ghz: cpu.max_ghz,
        }
    }
}

impl From<proto::Cpu> for Cpu {
    fn from(cpu: proto::Cpu) -> Self {
        Cpu {
            brand: cpu.brand,
            name: cpu.name,
            number_cores: cpu.number_cores,
            number_threads: cpu.number_threads,
            min_ghz: cpu.min_ghz,
            max_ghz: cpu.max_ghz,
        }
    }
}

impl From<Gpu> for proto::Gpu {
    fn from(gpu: Gpu) -> Self {
        proto::Gpu {
            brand: gpu.brand,
            name: gpu.name,
            min_ghz: gpu.min_ghz,
            max_ghz: gpu.max_ghz,
            memory: Some(gpu.memory.into()),
        }
    }
}

impl TryFrom<proto::Gpu> for Gpu {
    type Error = String;

    fn try_from(gpu: proto::Gpu) -> Result<Self, Self::Error> {
        Ok(Gpu {
            brand: gpu.brand,
            name: gpu.name,
            min_ghz: gpu.min_ghz,
            max_ghz: gpu.max_ghz,
            memory: required(gpu.memory, "gpu.memory")?.try_into()?,
        })
    }
}

impl From<Storage> for proto::Storage {
    fn from(storage: Storage) -> Self {
        proto::Storage {
            driver: storage.driver.into(),
            memory: Some(storage.memory.into()),
        }
    }
}

impl TryFrom<proto::Storage> for Storage {
    type Error = String;

    fn try_from(storage: proto::Storage) -> Result<Self, Self::Error> {
        Ok(Storage {
            driver: storage.driver.try_into()?,
            memory: required(storage.memory, "storage.memory")?.try_into()?,
        })
    }
}

impl From<Screen> for proto::Screen {
    fn from(screen: Screen) -> Self {
        proto::Screen {
            size_inch: screen.size_inch,
            resolution: Some(screen::Resolution {
                width: screen.resolution.width,
                height: screen.resolution.height,
            }),
            panel: screen.panel.into(),
            multitouch: screen.multitouch,
        }
    }
}

impl TryFrom<proto::Screen> for Screen {
    type Error = String;

    fn try_from(screen: proto::Screen) -> Result<Self, Self::Error> {
        let resolution = required(screen.resolution, "screen.resolution")?;
        Ok(Screen {
            size_inch: screen.size_inch,
            resolution: Resolution {
                width: resolution.width,
                height: resolution.height,
            },
            panel: screen.panel.try_into()?,
            multitouch: screen.multitouch,
        })
    }
}

impl From<Keyboard> for proto::Keyboard {
    fn from(keyboard: Keyboard) -> Self {
        proto::Keyboard {
            layout: keyboard.layout.into(),
            backlit: keyboard.backlit,
        }
    }
}

impl TryFrom<proto::Keyboard> for Keyboard {
    type Error = String;

    fn try_from(keyboard: proto::Keyboard) -> Result<Self, Self::Error> {
        Ok(Keyboard {
            layout: keyboard.layout.try_into()?,
            backlit: keyboard.backlit,
        })
    }
}

impl From<Weight> for laptop::Weight {
    fn from(weight: Weight) -> Self {
        match weight {
            Weight::Kilograms(kg) => laptop::Weight::WeightKg(kg),
            Weight::Pounds(lb) => laptop::Weight::WeightLb(lb),
        }
    }
}

impl From<laptop::Weight> for Weight {
    fn from(weight: laptop::Weight) -> Self {
        match weight {
            laptop::Weight::WeightKg(kg) => Weight::Kilograms(kg),
            laptop::Weight::WeightLb(lb) => Weight::Pounds(lb),
        }
    }
}

// ============================================================================
// Laptop and filter
// ============================================================================

impl From<Laptop> for proto::Laptop {
    fn from(laptop: Laptop) -> Self {
        proto::Laptop {
            id: laptop.id,
            brand: laptop.brand,
            name: laptop.name,
            cpu: Some(laptop.cpu.into()),
            ram: Some(laptop.ram.into()),
            gpus: laptop.gpus.into_iter().map(Into::into).collect(),
            storages: laptop.storages.into_iter().map(Into::into).collect(),
            screen: Some(laptop.screen.into()),
            keyboard: Some(laptop.keyboard.into()),
            price_usd: laptop.price_usd,
            release_year: laptop.release_year,
            updated_at: datetime_to_timestamp(laptop.updated_at),
            weight: laptop.weight.map(Into::into),
        }
    }
}

impl TryFrom<proto::Laptop> for Laptop {
    type Error = String;

    fn try_from(laptop: proto::Laptop) -> Result<Self, Self::Error> {
        Ok(Laptop {
            id: laptop.id,
            brand: laptop.brand,
            name: laptop.name,
            cpu: required(laptop.cpu, "laptop.cpu")?.into(),
            ram: required(laptop.ram, "laptop.ram")?.try_into()?,
            gpus: laptop
                .gpus
                .into_iter()
                .map(Gpu::try_from)
                .collect::<Result<_, _>>()?,
            storages: laptop
                .storages
                .into_iter()
                .map(Storage::try_from)
                .collect::<Result<_, _>>()?,
            screen: required(laptop.screen, "laptop.screen")?.try_into()?,
            keyboard: required(laptop.keyboard, "laptop.keyboard")?.try_into()?,
            weight: laptop.weight.map(Into::into),
            price_usd: laptop.price_usd,
            release_year: laptop.release_year,
            updated_at: timestamp_to_datetime(laptop.updated_at)?,
        })
    }
}

impl From<Filter> for proto::Filter {
    fn from(filter: Filter) -> Self {
        proto::Filter {
            max_price_usd: filter.max_price_usd,
            min_cpu_cores: filter.min_cpu_cores,
            min_cpu_ghz: filter.min_cpu_ghz,
            min_ram: filter.min_ram.map(Into::into),
        }
    }
}

impl TryFrom<proto::Filter> for Filter {
    type Error = String;

    /// A `min_ram` of zero with no unit is treated like an absent floor.
    fn try_from(filter: proto::Filter) -> Result<Self, Self::Error> {
        let min_ram = match filter.min_ram {
            None => None,
            Some(ram) if ram.value == 0 && ram.unit == memory::Unit::Unknown as i32 => None,
            Some(ram) => Some(Memory::try_from(ram)?),
        };

        Ok(Filter {
            max_price_usd: filter.max_price_usd,
            min_cpu_cores: filter.min_cpu_cores,
            min_cpu_ghz: filter.min_cpu_ghz,
            min_ram,
        })
    }
}
