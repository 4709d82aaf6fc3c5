use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use species_quiz::{GameConfig, GameMode, SpeciesSelector};

#[derive(Parser, Debug)]
#[command(name = "species_quiz")]
#[command(about = "Select a playable species from the GBIF occurrence index")]
struct Args {
    /// Game mode: popular, discovery, expert or thematic
    #[arg(short, long, default_value = "popular")]
    mode: String,

    /// Taxon filter key for thematic rounds (e.g. 212 for birds)
    #[arg(short, long)]
    taxon: Option<String>,

    /// Two-letter country code to restrict the search region
    #[arg(short, long)]
    country: Option<String>,

    /// Random seed (uses entropy if not specified)
    #[arg(short, long)]
    seed: Option<u64>,
}

fn parse_mode(value: &str) -> Option<GameMode> {
    match value.to_lowercase().as_str() {
        "popular" => Some(GameMode::Popular),
        "discovery" => Some(GameMode::Discovery),
        "expert" => Some(GameMode::Expert),
        "thematic" => Some(GameMode::Thematic),
        _ => None,
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    let Some(mode) = parse_mode(&args.mode) else {
        eprintln!("Unknown mode '{}'", args.mode);
        std::process::exit(2);
    };

    let mut rng = match args.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };

    let selector = SpeciesSelector::new(GameConfig::default());
    let result = selector
        .select_species(mode, args.taxon.as_deref(), args.country.as_deref(), &mut rng)
        .await;

    let species = match result {
        Ok(species) => species,
        Err(err) => {
            eprintln!("Selection failed: {}", err);
            std::process::exit(1);
        }
    };

    println!("Scientific name:  {}", species.scientific_name);
    if let Some(name) = &species.vernacular_name {
        println!("Common name:      {}", name);
    }
    println!("Occurrences:      {}", species.occurrence_count);
    if let Some(class) = &species.taxonomy.class {
        println!("Class:            {}", class);
    }
    if let Some(family) = &species.taxonomy.family {
        println!("Family:           {}", family);
    }
    if let Some(image) = &species.image {
        println!("Image:            {}", image.url);
    }
    if !species.descriptions.is_empty() {
        let mut categories: Vec<&String> = species.descriptions.keys().collect();
        categories.sort();
        println!(
            "Descriptions:     {}",
            categories
                .iter()
                .map(|category| category.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    if species.is_offline {
        println!("(offline catalog species)");
    }
}
