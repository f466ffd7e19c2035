use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Memory size unit. Every step is a power of two above the previous one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MemoryUnit {
    Bit,
    Byte,
    Kilobyte,
    Megabyte,
    Gigabyte,
    Terabyte,
}

impl MemoryUnit {
    /// Left shift that converts one unit of `self` into bits.
    pub const fn bit_shift(self) -> u32 {
        match self {
            MemoryUnit::Bit => 0,
            MemoryUnit::Byte => 3,
            MemoryUnit::Kilobyte => 13,
            MemoryUnit::Megabyte => 23,
            MemoryUnit::Gigabyte => 33,
            MemoryUnit::Terabyte => 43,
        }
    }
}

/// A memory amount, e.g. 16 GB of RAM or a 512 GB SSD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    pub value: u64,
    pub unit: MemoryUnit,
}

impl Memory {
    pub const fn new(value: u64, unit: MemoryUnit) -> Self {
        Self { value, unit }
    }

    /// Size normalised to bits.
    ///
    /// Computed in `u128` so the largest `u64` terabyte value still orders
    /// correctly against everything smaller.
    pub fn to_bits(&self) -> u128 {
        u128::from(self.value) << self.unit.bit_shift()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cpu {
    pub brand: String,
    pub name: String,
    pub number_cores: u32,
    pub number_threads: u32,
    pub min_ghz: f64,
    pub max_ghz: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gpu {
    pub brand: String,
    pub name: String,
    pub min_ghz: f64,
    pub max_ghz: f64,
    pub memory: Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StorageDriver {
    Hdd,
    Ssd,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Storage {
    pub driver: StorageDriver,
    pub memory: Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Panel {
    Ips,
    Oled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screen {
    pub size_inch: f32,
    pub resolution: Resolution,
    pub panel: Panel,
    pub multitouch: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum KeyboardLayout {
    Qwerty,
    Qwertz,
    Azerty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyboard {
    pub layout: KeyboardLayout,
    pub backlit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weight {
    Kilograms(f64),
    Pounds(f64),
}

/// Laptop entity, the record kept by the laptop store.
///
/// `Clone` is a full structural copy: the GPU and storage lists are owned
/// vectors, so a clone never shares state with the original.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Laptop {
    pub id: String,
    pub brand: String,
    pub name: String,
    pub cpu: Cpu,
    pub ram: Memory,
    pub gpus: Vec<Gpu>,
    pub storages: Vec<Storage>,
    pub screen: Screen,
    pub keyboard: Keyboard,
    pub weight: Option<Weight>,
    pub price_usd: f64,
    pub release_year: u32,
    pub updated_at: DateTime<Utc>,
}

/// Search bounds. All four bounds are inclusive and must hold together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub max_price_usd: f64,
    pub min_cpu_cores: u32,
    pub min_cpu_ghz: f64,
    /// `None` means no memory floor
    pub min_ram: Option<Memory>,
}

/// Running aggregate of the scores given to one laptop.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rating {
    pub count: u32,
    pub sum: f64,
}

impl Rating {
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / f64::from(self.count)
        }
    }
}

/// Metadata for an uploaded laptop image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub id: String,
    pub laptop_id: String,
    pub image_type: String,
    pub path: std::path::PathBuf,
}
