// Subcommand implementations for goldrl

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use tracing::debug;

use goldrl_env::{GoldConfig, Plan, TaskProgression};
use goldrl_state::decode::decode_field;
use goldrl_state::{flags, FlagCodec, GameSnapshot, MemoryImage, RomMapper, StateExtractor, EVENT_FLAGS, GOLD};

/// Accepts decimal or `0x`-prefixed hex
pub fn parse_u16(text: &str) -> Result<u16, String> {
    let value = parse_u32(text)?;
    u16::try_from(value).map_err(|_| format!("{text} does not fit in 16 bits"))
}

/// Accepts decimal or `0x`-prefixed hex
pub fn parse_u32(text: &str) -> Result<u32, String> {
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|e| format!("invalid number {text:?}: {e}"))
}

pub fn load_config(path: Option<&Path>) -> Result<GoldConfig> {
    match path {
        Some(path) => GoldConfig::load(path).with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(GoldConfig::default().with_env_overrides()),
    }
}

fn read_ram(path: &Path, base: u16) -> Result<MemoryImage> {
    let image = MemoryImage::from_file(path, base)
        .with_context(|| format!("Failed to read RAM dump {}", path.display()))?;
    debug!(bytes = image.len(), base, "loaded RAM dump");
    Ok(image)
}

fn decode(path: &Path, base: u16, rom: Option<&Path>) -> Result<GameSnapshot> {
    let mem = read_ram(path, base)?;
    Ok(StateExtractor::with_rom_path(rom).get_state_dict(&mem))
}

pub fn snapshot(config: &GoldConfig, ram: &Path, base: u16, rom: Option<PathBuf>, compact: bool) -> Result<()> {
    let rom = rom.or_else(|| config.rom_path.clone());
    let snapshot = decode(ram, base, rom.as_deref())?;
    let json = if compact { serde_json::to_string(&snapshot)? } else { serde_json::to_string_pretty(&snapshot)? };
    println!("{json}");
    Ok(())
}

/// Registry name or numeric id
fn resolve_flag(flag: &str) -> Result<(Option<&'static str>, u32)> {
    if let Some(entry) = flags::lookup(flag) {
        return Ok((Some(entry.name), entry.id));
    }
    let id = parse_u32(flag).map_err(|_| anyhow!("unknown flag {flag:?}; try `goldrl flags --pattern`"))?;
    let name = EVENT_FLAGS.iter().find(|f| f.id == id).map(|f| f.name);
    Ok((name, id))
}

pub fn flag(flag: &str, ram: Option<&Path>, base: u16) -> Result<()> {
    let (name, id) = resolve_flag(flag)?;
    let codec = FlagCodec::default();
    if let Some(name) = name {
        println!("{name}");
    }
    match ram {
        Some(path) => {
            let mem = read_ram(path, base)?;
            println!("{}", codec.get_flag_details(&mem, id));
        }
        None => {
            let loc = codec.locate(id);
            println!(
                "flag 0x{id:04X} -> 0x{:04X} bit {} (mask 0x{:02X}){}",
                loc.address,
                loc.bit,
                loc.bit_mask(),
                if loc.is_valid() { "" } else { " [invalid address]" }
            );
        }
    }
    Ok(())
}

pub fn flags(pattern: Option<&str>) {
    let matches = match pattern {
        Some(p) => flags::search(p),
        None => EVENT_FLAGS.iter().collect(),
    };
    for f in &matches {
        println!("{:<40} 0x{:04X}  {:?}", f.name, f.id, f.category);
    }
    println!("{} flag(s)", matches.len());
}

pub fn connections(config: &GoldConfig, rom: Option<PathBuf>, bank: u8, map: u8) -> Result<()> {
    let path = rom
        .or_else(|| config.rom_path.clone())
        .ok_or_else(|| anyhow!("no ROM given; pass --rom or set GOLDRL_ROM"))?;
    let mapper = RomMapper::open(&path).with_context(|| format!("Failed to open ROM {}", path.display()))?;
    let connections = mapper.map_connections(bank, map);
    if connections.is_empty() {
        println!("Map ({bank}, {map}) has no connections");
    }
    for c in connections {
        println!(
            "{:<6} -> map ({}, {}) at ({}, {})",
            format!("{:?}", c.direction),
            c.dest_bank,
            c.dest_map,
            c.target_x,
            c.target_y
        );
    }
    Ok(())
}

pub fn plan(config: &GoldConfig, plan: Option<PathBuf>, ram: Option<&Path>, base: u16, init: bool) -> Result<()> {
    let path = plan.unwrap_or_else(|| config.plan_path.clone());
    if init && !path.exists() {
        Plan::opening().save(&path)?;
        println!("✅ Wrote opening plan to {}", path.display());
    }
    let mut progression = TaskProgression::load(&path)?;
    if let Some(ram) = ram {
        let snapshot = decode(ram, base, config.rom_path.as_deref())?;
        let skipped = progression.sync_with_initial_state(&snapshot);
        println!("{skipped} task(s) already complete in {}", ram.display());
    }

    println!("Goal: {}", progression.goal());
    for (i, task) in progression.plan().tasks.iter().enumerate() {
        let marker = match i.cmp(&progression.current_index()) {
            std::cmp::Ordering::Less => "[x]",
            std::cmp::Ordering::Equal => "[>]",
            std::cmp::Ordering::Greater => "[ ]",
        };
        println!("  {marker} {}", task.description);
    }
    println!("Current: {}", progression.current_task_description());
    Ok(())
}

/// Rows of 16 bytes keyed by their aligned start address
fn hex_rows(bytes: &BTreeMap<u16, u8>) -> Vec<String> {
    let mut rows: BTreeMap<u16, Vec<String>> = BTreeMap::new();
    for (&address, &value) in bytes {
        rows.entry(address & !0xF).or_default().push(format!("{value:02X}"));
    }
    rows.into_iter().map(|(start, values)| format!("0x{start:04X}: {}", values.join(" "))).collect()
}

pub fn peek(ram: &Path, base: u16, start: u16, end: u16) -> Result<()> {
    if end < start {
        bail!("end 0x{end:04X} is before start 0x{start:04X}");
    }
    let mem = read_ram(ram, base)?;
    let bytes = StateExtractor::default().debug_memory_range(&mem, start, end);
    for row in hex_rows(&bytes) {
        println!("{row}");
    }
    Ok(())
}

pub fn fields(ram: Option<&Path>, base: u16) -> Result<()> {
    let mem = ram.map(|path| read_ram(path, base)).transpose()?;
    for field in GOLD.fields() {
        let value = match &mem {
            Some(mem) => serde_json::to_string(&decode_field(mem, &field))?,
            None => String::new(),
        };
        println!("{:<24} 0x{:04X}  {:>2}  {:<20} {value}", field.name, field.address, field.width, format!("{:?}", field.encoding));
    }
    Ok(())
}

pub fn config(config: &GoldConfig, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            config.save(path)?;
            println!("✅ Wrote configuration to {}", path.display());
        }
        None => print!("{}", config.to_toml_string()?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_parsing() {
        assert_eq!(parse_u16("0xD7B7"), Ok(0xD7B7));
        assert_eq!(parse_u16("4096"), Ok(4096));
        assert!(parse_u16("0x10000").is_err());
        assert!(parse_u32("twelve").is_err());
    }

    #[test]
    fn test_flag_resolution() {
        assert_eq!(resolve_flag("starter_received").unwrap(), (Some("starter_received"), 0x1A00));
        let (_, id) = resolve_flag("0x1A00").unwrap();
        assert_eq!(id, 0x1A00);
        assert!(resolve_flag("not_a_flag").is_err());
    }

    #[test]
    fn test_hex_rows_align_to_16() {
        let bytes: BTreeMap<u16, u8> = (0xD0FEu16..=0xD101).map(|a| (a, (a & 0xFF) as u8)).collect();
        assert_eq!(hex_rows(&bytes), vec!["0xD0F0: FE FF", "0xD100: 00 01"]);
    }

    #[test]
    fn test_plan_init_writes_opening_plan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.json");
        plan(&GoldConfig::default(), Some(path.clone()), None, 0, true).unwrap();
        assert_eq!(Plan::load(&path).unwrap(), Plan::opening());
    }
}
