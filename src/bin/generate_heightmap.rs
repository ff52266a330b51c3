use anyhow::{bail, Context};
use heightfield::terrain::{
    export_grayscale, ParameterSet, RadialPeakSpec, RandomRange, TerrainOperation,
    TerrainSettings,
};
use std::path::PathBuf;

fn usage() -> &'static str {
    "usage: generate_heightmap [SETTINGS.json] [--output PREVIEW.png] [--print-settings]"
}

fn demo_settings() -> TerrainSettings {
    TerrainSettings {
        seed: Some(42),
        operations: vec![
            TerrainOperation::Voronoi {
                peak: RadialPeakSpec::default(),
            },
            TerrainOperation::MultiplePerlin {
                layers: ParameterSet::new(),
            },
            TerrainOperation::Random {
                range: RandomRange::new(0.0, 0.01),
            },
        ],
        ..Default::default()
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut settings_path: Option<PathBuf> = None;
    let mut output: Option<PathBuf> = None;
    let mut print_settings = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-o" | "--output" => {
                let path = args.next().context("--output needs a path")?;
                output = Some(PathBuf::from(path));
            }
            "--print-settings" => print_settings = true,
            "-h" | "--help" => {
                println!("{}", usage());
                return Ok(());
            }
            _ if arg.starts_with('-') => bail!("unknown flag {}\n{}", arg, usage()),
            _ => settings_path = Some(PathBuf::from(arg)),
        }
    }

    let settings = match &settings_path {
        Some(path) => TerrainSettings::from_file(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => demo_settings(),
    };

    if print_settings {
        println!("{}", settings.to_json()?);
        return Ok(());
    }

    let grid = settings.generate().context("terrain generation failed")?;
    let stats = grid.heights().stats();
    let cells = settings.width * settings.height;

    println!("Height stats ({}x{}):", settings.width, settings.height);
    println!("  Min: {:.4}", stats.min);
    println!("  Max: {:.4}", stats.max);
    println!("  Mean: {:.4}", stats.mean);
    println!(
        "  Outside [0, 1]: {} ({:.1}%)",
        stats.out_of_range,
        stats.out_of_range as f32 * 100.0 / cells as f32
    );

    if let Some(path) = output {
        export_grayscale(grid.heights())
            .save(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        log::info!("Wrote preview to {}", path.display());
    }

    Ok(())
}
