//! Random sample laptops for tests and the demo client.

use chrono::{SubsecRound, Utc};
use rand::Rng;
use rand::seq::IndexedRandom;
use uuid::Uuid;

use crate::models::{
    Cpu, Gpu, Keyboard, KeyboardLayout, Laptop, Memory, MemoryUnit, Panel, Resolution, Screen,
    Storage, StorageDriver, Weight,
};

fn pick<'a>(rng: &mut impl Rng, options: &'a [&'a str]) -> &'a str {
    options.choose(rng).copied().unwrap_or_default()
}

fn cpu_name(rng: &mut impl Rng, brand: &str) -> String {
    let names: &[&str] = match brand {
        "Intel" => &[
            "Xeon E-2286M",
            "Core i9-9980HK",
            "Core i7-9750H",
            "Core i5-9400F",
            "Core i3-1005G1",
        ],
        _ => &[
            "Ryzen 7 PRO 2700U",
            "Ryzen 5 PRO 3500U",
            "Ryzen 3 PRO 3200GE",
        ],
    };
    pick(rng, names).to_string()
}

fn gpu_name(rng: &mut impl Rng, brand: &str) -> String {
    let names: &[&str] = match brand {
        "NVIDIA" => &["RTX 2060", "RTX 2070", "GTX 1660-Ti", "GTX 1070"],
        _ => &["RX 590", "RX 580", "RX 5700-XT", "RX Vega-56"],
    };
    pick(rng, names).to_string()
}

fn laptop_name(rng: &mut impl Rng, brand: &str) -> String {
    let names: &[&str] = match brand {
        "Apple" => &["Macbook Air", "Macbook Pro"],
        "Dell" => &["Latitude", "Vostro", "XPS", "Alienware"],
        _ => &["Thinkpad X1", "Thinkpad P1", "Thinkpad P53"],
    };
    pick(rng, names).to_string()
}

pub fn new_keyboard() -> Keyboard {
    let mut rng = rand::rng();
    let layout = match rng.random_range(0..3) {
        0 => KeyboardLayout::Qwerty,
        1 => KeyboardLayout::Qwertz,
        _ => KeyboardLayout::Azerty,
    };
    Keyboard {
        layout,
        backlit: rng.random_bool(0.5),
    }
}

pub fn new_cpu() -> Cpu {
    let mut rng = rand::rng();
    let brand = pick(&mut rng, &["Intel", "AMD"]).to_string();
    let name = cpu_name(&mut rng, &brand);

    let number_cores = rng.random_range(2..=8);
    let number_threads = rng.random_range(number_cores..=12);
    let min_ghz = rng.random_range(2.0..3.5);
    let max_ghz = rng.random_range(min_ghz..5.0);

    Cpu {
        brand,
        name,
        number_cores,
        number_threads,
        min_ghz,
        max_ghz,
    }
}

pub fn new_gpu() -> Gpu {
    let mut rng = rand::rng();
    let brand = pick(&mut rng, &["NVIDIA", "AMD"]).to_string();
    let name = gpu_name(&mut rng, &brand);

    let min_ghz = rng.random_range(1.0..1.5);
    let max_ghz = rng.random_range(min_ghz..2.0);

    Gpu {
        brand,
        name,
        min_ghz,
        max_ghz,
        memory: Memory::new(rng.random_range(2..=6), MemoryUnit::Gigabyte),
    }
}

pub fn new_ram() -> Memory {
    Memory::new(rand::rng().random_range(4..=64), MemoryUnit::Gigabyte)
}

pub fn new_ssd() -> Storage {
    Storage {
        driver: StorageDriver::Ssd,
        memory: Memory::new(rand::rng().random_range(128..=1024), MemoryUnit::Gigabyte),
    }
}

pub fn new_hdd() -> Storage {
    Storage {
        driver: StorageDriver::Hdd,
        memory: Memory::new(rand::rng().random_range(1..=6), MemoryUnit::Terabyte),
    }
}

pub fn new_screen() -> Screen {
    let mut rng = rand::rng();
    let height = rng.random_range(1080..=4320);
    let width = height * 16 / 9;

    Screen {
        size_inch: rng.random_range(13.0..17.0),
        resolution: Resolution { width, height },
        panel: if rng.random_bool(0.5) {
            Panel::Ips
        } else {
            Panel::Oled
        },
        multitouch: rng.random_bool(0.5),
    }
}

/// A fully populated laptop with a fresh UUID.
///
/// `updated_at` is truncated to whole seconds, the precision the wire format
/// carries.
pub fn new_laptop() -> Laptop {
    let mut rng = rand::rng();
    let brand = pick(&mut rng, &["Apple", "Dell", "Lenovo"]).to_string();
    let name = laptop_name(&mut rng, &brand);

    Laptop {
        id: Uuid::new_v4().to_string(),
        brand,
        name,
        cpu: new_cpu(),
        ram: new_ram(),
        gpus: vec![new_gpu()],
        storages: vec![new_ssd(), new_hdd()],
        screen: new_screen(),
        keyboard: new_keyboard(),
        weight: Some(Weight::Kilograms(rng.random_range(1.0..3.0))),
        price_usd: rng.random_range(1500.0..3500.0),
        release_year: rng.random_range(2015..=2019),
        updated_at: Utc::now().trunc_subsecs(0),
    }
}

/// A whole-number score between 1 and 10.
pub fn random_laptop_score() -> f64 {
    f64::from(rand::rng().random_range(1..=10u32))
}
