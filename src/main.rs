use model_atlas::config::PipelineConfig;
use model_atlas::export::ModelEmbedding;
use model_atlas::{embedding, fetch, plotting, table};

fn main() {
    if let Err(err) = run() {
        eprintln!("❌ {}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = PipelineConfig::from_env();

    println!("🚀 Building model embedding map...");
    println!("Configuration:");
    println!("  - Round window: {}..={}", config.first_round, config.last_round);
    println!(
        "  - Embedding: t-SNE (seed={}, perplexity={})",
        config.embedding.seed, config.embedding.perplexity
    );
    println!(
        "  - Color scale: [{}, {}]",
        config.color_min, config.color_max
    );
    println!("  - Data: {}", config.data_url);
    println!();

    fetch::fetch_round_data(&config.data_url, &config.cache_path)?;

    let records = table::read_records(&config.cache_path)?;
    println!("📊 Loaded {} round records", records.len());

    let (round_corrs, _round_mmcs) = table::pivot(&records);
    println!(
        "📊 Pivoted to {} models over {} rounds",
        round_corrs.models.len(),
        round_corrs.rounds.len()
    );

    let windowed = round_corrs.window(config.first_round, config.last_round);
    if windowed.rounds.is_empty() {
        let covered = match (round_corrs.rounds.first(), round_corrs.rounds.last()) {
            (Some(first), Some(last)) => format!("{}..={}", first, last),
            _ => "none".to_string(),
        };
        return Err(format!(
            "no data in rounds {}..={}: the dataset covers rounds {}",
            config.first_round, config.last_round, covered
        )
        .into());
    }

    let filtered = windowed.drop_incomplete();
    println!(
        "🔍 {} of {} models have a complete record in rounds {}..={}",
        filtered.models.len(),
        windowed.models.len(),
        config.first_round,
        config.last_round
    );

    if filtered.models.is_empty() {
        return Err(format!(
            "no eligible models: every model has at least one missing round in {}..={}",
            config.first_round, config.last_round
        )
        .into());
    }

    println!("🧮 Computing 2D embedding ({} models)...", filtered.models.len());
    let coords = embedding::embed(&filtered.dense_rows(), &config.embedding)?;
    let mean_corrs = filtered.row_means();

    let export = ModelEmbedding::new(
        config.first_round,
        config.last_round,
        config.embedding.seed,
        &filtered.models,
        &coords,
        &mean_corrs,
    );
    export.save_json(&config.export_path)?;
    println!("💾 Embedding exported to: {}", config.export_path.display());

    plotting::plot_model_map(
        &coords,
        &mean_corrs,
        &filtered,
        &config,
        &config.chart_path.display().to_string(),
    )?;

    println!();
    println!("✅ Done!");
    println!("📂 Output files:");
    println!("  {}   - annotated embedding chart", config.chart_path.display());
    println!("  {}  - embedding coordinates (JSON)", config.export_path.display());

    Ok(())
}
