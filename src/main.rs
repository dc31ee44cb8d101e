//! Casino Engine CLI
//!
//! Offline helpers around the game codecs and payout math. Nothing here talks to
//! a node.

use casino_engine::{
    aggregator,
    config::{EngineConfig, LogLevel, MonitoringConfig},
    errors::{ConfigurationError, DecodeError},
    games::{CoinFace, EncodedInput, KenoConfiguration, WeightedGameConfiguration},
    math::{format_multiplier, net_multiplier},
    telemetry, CasinoGame, CodecContext, CodecRegistry, GameChoice, GameConfigRegistry,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Casino Engine CLI
#[derive(Parser)]
#[command(name = "casino-engine")]
#[command(about = "Codec and payout tooling for on-chain casino games")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file with chains and game configurations
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Chain whose configurations are used
    #[arg(long, global = true, default_value = "8453")]
    chain: u64,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a choice and show its multiplier and win chance
    Encode {
        #[arg(short, long)]
        game: CasinoGame,

        /// heads|tails, a dice cap, comma separated numbers or a config id
        #[arg(long)]
        choice: String,

        /// House edge in basis points for weighted net multipliers
        #[arg(long, default_value = "0")]
        house_edge: u16,
    },

    /// Decode an on-chain input value
    Decode {
        #[arg(short, long)]
        game: CasinoGame,

        #[arg(long)]
        value: u64,
    },

    /// Gross and net multiplier for a house edge
    Multiplier {
        /// Gross multiplier in basis points
        #[arg(short, long)]
        multiplier: u32,

        #[arg(long, default_value = "0")]
        house_edge: u16,
    },

    /// Aggregated buckets of a weighted configuration, as JSON
    Outputs {
        #[arg(short, long, default_value = "wheel")]
        game: CasinoGame,

        #[arg(long)]
        config_id: u32,

        #[arg(long, default_value = "0")]
        house_edge: u16,
    },

    /// Validate a configuration file
    CheckConfig { file: PathBuf },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    telemetry::init_tracing(&MonitoringConfig {
        log_level: if cli.verbose { LogLevel::Debug } else { LogLevel::Warn },
        ..Default::default()
    });

    match &cli.command {
        Commands::Encode {
            game,
            choice,
            house_edge,
        } => encode(&cli, *game, choice, *house_edge),
        Commands::Decode { game, value } => decode(&cli, *game, *value),
        Commands::Multiplier {
            multiplier,
            house_edge,
        } => {
            let net = net_multiplier(*multiplier, *house_edge);
            println!("gross: {} ({})", multiplier, format_multiplier(*multiplier));
            println!("net:   {} ({})", net, format_multiplier(net));
            Ok(())
        }
        Commands::Outputs {
            game,
            config_id,
            house_edge,
        } => {
            let registry = load_registry(&cli)?;
            let config = weighted_config(&registry, cli.chain, *game, *config_id)?;
            let outputs = aggregator::unique_outputs(config, *house_edge)?;
            println!("{}", serde_json::to_string_pretty(&outputs)?);
            Ok(())
        }
        Commands::CheckConfig { file } => {
            let config = EngineConfig::load(file)?;
            let registry = GameConfigRegistry::from_config(&config)?;
            println!(
                "✅ {} valid: {} chain(s), {} weighted configuration(s)",
                file.display(),
                config.chains.len(),
                registry.weighted_count()
            );
            Ok(())
        }
    }
}

fn encode(
    cli: &Cli,
    game: CasinoGame,
    raw: &str,
    house_edge: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let choice = parse_choice(game, raw)?;
    let registry = if needs_configuration(game) {
        load_registry(cli)?
    } else {
        GameConfigRegistry::new()
    };
    let (keno, weighted) = configurations(&registry, cli.chain, game, Some(&choice))?;
    let ctx = CodecContext {
        house_edge,
        keno,
        weighted,
    };

    let codecs = CodecRegistry::new();
    let input = codecs.encode(game, &choice, &ctx)?;
    let multiplier = codecs.multiplier(game, &choice, &ctx)?;
    let chance = codecs.win_chance(game, &choice, &ctx)?;

    println!("choice:     {}", choice.label());
    println!("encoded:    {}", serde_json::to_string(&input)?);
    println!("multiplier: {} ({})", multiplier, format_multiplier(multiplier));
    println!("win chance: {}%", chance);
    Ok(())
}

fn decode(cli: &Cli, game: CasinoGame, value: u64) -> Result<(), Box<dyn std::error::Error>> {
    let input = match game {
        CasinoGame::CoinToss => EncodedInput::Bool(value != 0),
        CasinoGame::Dice => EncodedInput::Uint8(narrow(value, "dice cap")?),
        CasinoGame::Roulette | CasinoGame::Keno => EncodedInput::Mask(value),
        _ => EncodedInput::ConfigId(narrow(value, "config id")?),
    };
    let registry = if game == CasinoGame::Keno {
        load_registry(cli)?
    } else {
        GameConfigRegistry::new()
    };
    let (keno, _) = configurations(&registry, cli.chain, game, None)?;
    let ctx = CodecContext {
        keno,
        ..Default::default()
    };

    let choice = CodecRegistry::new().decode(game, &input, &ctx)?;
    println!("{}", serde_json::to_string_pretty(&choice)?);
    println!("label: {}", choice.label());
    Ok(())
}

fn needs_configuration(game: CasinoGame) -> bool {
    game == CasinoGame::Keno || game.is_weighted()
}

fn load_registry(cli: &Cli) -> Result<GameConfigRegistry, Box<dyn std::error::Error>> {
    let path = cli.config.as_ref().ok_or_else(|| {
        ConfigurationError::ValidationFailed("--config is required for keno and weighted games".to_string())
    })?;
    let config = EngineConfig::load(path)?;
    config.chain(cli.chain)?;
    Ok(GameConfigRegistry::from_config(&config)?)
}

fn configurations<'a>(
    registry: &'a GameConfigRegistry,
    chain_id: u64,
    game: CasinoGame,
    choice: Option<&GameChoice>,
) -> Result<(Option<&'a KenoConfiguration>, Option<&'a WeightedGameConfiguration>), DecodeError> {
    let keno = match game {
        CasinoGame::Keno => Some(
            registry
                .keno(chain_id)
                .ok_or(DecodeError::MissingConfiguration("keno"))?,
        ),
        _ => None,
    };
    let weighted = match choice {
        Some(GameChoice::Weighted { config_id }) if game.is_weighted() => {
            Some(weighted_config(registry, chain_id, game, *config_id)?)
        }
        _ => None,
    };
    Ok((keno, weighted))
}

fn weighted_config(
    registry: &GameConfigRegistry,
    chain_id: u64,
    game: CasinoGame,
    config_id: u32,
) -> Result<&WeightedGameConfiguration, DecodeError> {
    registry
        .weighted(chain_id, game, config_id)
        .ok_or(DecodeError::MissingConfiguration("weighted game"))
}

fn parse_choice(game: CasinoGame, raw: &str) -> Result<GameChoice, ConfigurationError> {
    let invalid = |reason: &str| ConfigurationError::InvalidValue {
        field: "choice".to_string(),
        value: raw.to_string(),
        reason: reason.to_string(),
    };

    match game {
        CasinoGame::CoinToss => match raw.to_ascii_lowercase().as_str() {
            "heads" | "h" => Ok(GameChoice::coin(CoinFace::Heads)),
            "tails" | "t" => Ok(GameChoice::coin(CoinFace::Tails)),
            _ => Err(invalid("expected heads or tails")),
        },
        CasinoGame::Dice => raw
            .trim()
            .parse()
            .map(GameChoice::dice)
            .map_err(|_| invalid("expected a cap between 1 and 99")),
        CasinoGame::Roulette | CasinoGame::Keno => {
            let numbers = raw
                .split(',')
                .map(|n| n.trim().parse::<u8>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| invalid("expected comma separated numbers"))?;
            Ok(if game == CasinoGame::Roulette {
                GameChoice::roulette(numbers)
            } else {
                GameChoice::keno(numbers)
            })
        }
        _ => raw
            .trim()
            .parse()
            .map(GameChoice::weighted)
            .map_err(|_| invalid("expected a configuration id")),
    }
}

fn narrow<T: TryFrom<u64>>(value: u64, what: &'static str) -> Result<T, DecodeError> {
    T::try_from(value).map_err(|_| DecodeError::ValueOutOfRange {
        what,
        value: value.to_string(),
    })
}
