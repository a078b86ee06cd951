use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use lotto645::chance::estimate_chance;
use lotto645::config::{self, Config};
use lotto645::database::SqliteStore;
use lotto645::draws::{DrawSource, hot_numbers, number_frequency};
use lotto645::history::{HistoryFilter, ModeFilter};
use lotto645::rank::{evaluate_rank, matched_numbers};
use lotto645::service::LottoService;
use lotto645::types::{Constraints, Gender, NumberSet, UserInfo, WinningTarget};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const SET_LABELS: [char; 5] = ['A', 'B', 'C', 'D', 'E'];

type Service = LottoService<SqliteStore>;

#[derive(Parser)]
#[command(name = "lotto645", version, about = "Birth-date seeded 6/45 lottery numbers")]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate five sets for the next draw and record the run
    Generate {
        #[command(flatten)]
        user: UserArgs,
        #[command(flatten)]
        constraints: ConstraintArgs,
    },
    /// Generate five sets and rank them against your own winning numbers
    Game {
        #[command(flatten)]
        user: UserArgs,
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        constraints: ConstraintArgs,
    },
    /// Show the estimated chance for a person
    Chance {
        #[command(flatten)]
        user: UserArgs,
    },
    /// Rank one set against winning numbers
    Rank {
        /// The six numbers to rank
        #[arg(long, required = true, value_delimiter = ',', value_parser = lotto_number())]
        set: Vec<u8>,
        #[command(flatten)]
        target: TargetArgs,
    },
    /// List recorded runs, newest first
    History {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Count recorded runs by mode
    Summary {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Rank a stored run against its draw or its game target
    Check { id: String },
    /// Delete one stored run
    Delete { id: String },
    /// Delete every stored run
    Clear,
    /// Import every *.json drawing result in a directory
    ImportDraws { dir: PathBuf },
    /// Show the most recent imported draws
    Draws {
        #[arg(default_value_t = 10)]
        count: usize,
    },
    /// Show number frequency over the most recent imported draws
    Frequency {
        #[arg(default_value_t = 50)]
        count: usize,
    },
    /// Show the draw number and date the next run is generated for
    NextDraw,
}

#[derive(Args)]
struct UserArgs {
    /// Birth date as YYYYMMDD
    birth_date: String,
    /// male or female
    gender: Gender,
}

impl UserArgs {
    fn user(&self) -> Result<UserInfo> {
        Ok(UserInfo::new(&self.birth_date, self.gender)?)
    }
}

#[derive(Args)]
struct ConstraintArgs {
    /// Numbers that must not appear, comma separated
    #[arg(long, value_delimiter = ',', value_parser = lotto_number())]
    exclude: Vec<u8>,
    /// Numbers that must appear in every set, comma separated
    #[arg(long, value_delimiter = ',', value_parser = lotto_number())]
    include: Vec<u8>,
    /// Reject sets containing two consecutive numbers
    #[arg(long)]
    no_consecutive: bool,
}

impl ConstraintArgs {
    fn constraints(&self) -> Result<Constraints> {
        let constraints = Constraints::new()
            .with_excluded(self.exclude.iter().copied())
            .with_included(self.include.iter().copied())
            .with_prevent_consecutive(self.no_consecutive);
        constraints.validate()?;
        Ok(constraints)
    }
}

#[derive(Args)]
struct TargetArgs {
    /// The six winning numbers, comma separated
    #[arg(long, required = true, value_delimiter = ',', value_parser = lotto_number())]
    numbers: Vec<u8>,
    /// Bonus number
    #[arg(long, value_parser = lotto_number())]
    bonus: u8,
}

impl TargetArgs {
    fn target(&self) -> Result<WinningTarget> {
        Ok(WinningTarget::new(&self.numbers, self.bonus)?)
    }
}

#[derive(Args)]
struct FilterArgs {
    /// Only runs for this birth date
    #[arg(long)]
    birth_date: Option<String>,
    /// Only runs for this gender
    #[arg(long)]
    gender: Option<Gender>,
    /// all, normal or game
    #[arg(long, default_value = "all")]
    mode: ModeFilter,
}

impl FilterArgs {
    fn filter(&self) -> HistoryFilter {
        HistoryFilter {
            birth_date: self.birth_date.clone(),
            gender: self.gender,
            mode: self.mode,
        }
    }
}

fn lotto_number() -> clap::builder::RangedI64ValueParser<u8> {
    clap::value_parser!(u8).range(1..=45)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let config = config::load()?;
    let store = SqliteStore::open(&config.database_url)
        .with_context(|| format!("opening {}", config.database_url))?;
    let mut service = LottoService::new(store, config.clone());

    match cli.command {
        Commands::Generate { user, constraints } => {
            cmd_generate(&mut service, &user.user()?, &constraints.constraints()?, &config)?
        }
        Commands::Game {
            user,
            target,
            constraints,
        } => cmd_game(&mut service, &user.user()?, target.target()?, &constraints.constraints()?)?,
        Commands::Chance { user } => {
            let user = user.user()?;
            let chance = estimate_chance(&user.birth_date, user.gender);
            println!("🍀 Estimated chance for {} ({}): {:.2}%", user.birth_date, user.gender, chance);
        }
        Commands::Rank { set, target } => cmd_rank(&NumberSet::new(&set)?, &target.target()?),
        Commands::History { filter } => cmd_history(&service, &filter.filter())?,
        Commands::Summary { filter } => {
            let summary = service.summary(&filter.filter())?;
            println!(
                "📊 {} runs ({} normal, {} game), {} winning game runs",
                summary.total, summary.normal_runs, summary.game_runs, summary.wins
            );
        }
        Commands::Check { id } => cmd_check(&service, &id)?,
        Commands::Delete { id } => {
            if service.remove(&id)? {
                println!("🗑️ Removed entry {}", id);
            } else {
                println!("⚠ No entry with id {}", id);
            }
        }
        Commands::Clear => {
            service.clear()?;
            println!("🧹 History cleared.");
        }
        Commands::ImportDraws { dir } => cmd_import_draws(service.store(), &dir)?,
        Commands::Draws { count } => cmd_draws(service.store(), count)?,
        Commands::Frequency { count } => cmd_frequency(service.store(), count)?,
        Commands::NextDraw => {
            let next = service.upcoming_draw(Local::now().date_naive());
            println!("📅 Next draw #{} on {}", next.draw_no, next.draw_date);
        }
    }

    Ok(())
}

fn cmd_generate(
    service: &mut Service,
    user: &UserInfo,
    constraints: &Constraints,
    config: &Config,
) -> Result<()> {
    let draw = service.upcoming_draw(Local::now().date_naive());
    let delay = Duration::from_millis(config.reveal_delay_ms);

    println!("🎲 Numbers for draw #{} ({})", draw.draw_no, draw.draw_date);
    let entry = service.generate_with(user, constraints, draw, |index, set| {
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        println!("  {}  {}", SET_LABELS[index % SET_LABELS.len()], set);
    })?;

    println!("🍀 Estimated chance: {:.2}%", entry.estimated_chance);
    println!("🧾 Saved as {} at {}", entry.id, entry.created_at_local);
    Ok(())
}

fn cmd_game(
    service: &mut Service,
    user: &UserInfo,
    target: WinningTarget,
    constraints: &Constraints,
) -> Result<()> {
    let outcome = service.play_game(user, constraints, target)?;
    println!("🎯 Target: {}", target);
    for (index, (set, rank)) in outcome.entry.numbers.iter().zip(&outcome.ranks).enumerate() {
        let matched = matched_numbers(set, &target);
        println!(
            "  {}  {}  → {} (matched {:?})",
            SET_LABELS[index % SET_LABELS.len()],
            set,
            rank,
            matched
        );
    }
    match outcome.entry.rank_result {
        Some(rank) if rank.is_win() => println!("🏆 Best result: {}", rank),
        _ => println!("😢 No prize this time."),
    }
    Ok(())
}

fn cmd_rank(set: &NumberSet, target: &WinningTarget) {
    let rank = evaluate_rank(set, target);
    println!(
        "🎟️ {} vs {} → {} (matched {:?})",
        set,
        target,
        rank,
        matched_numbers(set, target)
    );
}

fn cmd_history(service: &Service, filter: &HistoryFilter) -> Result<()> {
    let entries = service.history(filter)?;
    if entries.is_empty() {
        println!("⚠ No history entries.");
        return Ok(());
    }
    for entry in entries {
        let draw = if entry.is_game_mode {
            "game".to_string()
        } else {
            format!("#{} {}", entry.draw_no, entry.draw_date)
        };
        let rank = entry
            .rank_result
            .map(|r| format!(" best {}", r))
            .unwrap_or_default();
        println!("📜 {} [{}] {} {}{}", entry.created_at_local, draw, entry.birth_date, entry.gender, rank);
        println!("   id {}", entry.id);
        for (index, set) in entry.numbers.iter().enumerate() {
            println!("   {}  {}", SET_LABELS[index % SET_LABELS.len()], set);
        }
    }
    Ok(())
}

fn cmd_check(service: &Service, id: &str) -> Result<()> {
    match service.check_stored_entry(id)? {
        Some(check) => match check.rank {
            Some(rank) => println!("🎟️ Entry {} → {}", id, rank),
            None => println!(
                "⏳ Draw #{} for entry {} has not been imported yet.",
                check.entry.draw_no, id
            ),
        },
        None => println!("⚠ No entry with id {}", id),
    }
    Ok(())
}

fn cmd_import_draws(store: &SqliteStore, dir: &Path) -> Result<()> {
    let mut imported = 0;

    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }

        println!("Reading file: {:?}", path);
        let mut file = File::open(&path)?;
        let mut raw_json_string = String::new();
        file.read_to_string(&mut raw_json_string)?;

        match store.parse_and_insert_draw_json(&raw_json_string) {
            Ok(draw_no) => {
                imported += 1;
                println!("🎟️ Draw #{} inserted successfully.", draw_no);
            }
            Err(e) => println!("❌ Skipped {:?}: {}", path, e),
        }
    }

    println!("\n✅ Imported {} draw(s).", imported);
    Ok(())
}

fn cmd_draws(store: &SqliteStore, count: usize) -> Result<()> {
    let draws = store.recent_draws(count)?;
    if draws.is_empty() {
        println!("⚠ No draw results found. Run import-draws first.");
        return Ok(());
    }
    for draw in draws {
        println!(
            "🎱 #{} {}  {} + {}  (1st: {} winner(s), {} KRW each)",
            draw.draw_no,
            draw.draw_date,
            draw.numbers,
            draw.bonus_number,
            draw.first_winner_count,
            draw.first_prize_amount
        );
    }
    Ok(())
}

fn cmd_frequency(store: &SqliteStore, count: usize) -> Result<()> {
    let draws = store.recent_draws(count)?;
    if draws.is_empty() {
        println!("⚠ No draw results found. Run import-draws first.");
        return Ok(());
    }
    let frequency = number_frequency(&draws);
    println!("📈 Hot numbers over the last {} draw(s):", draws.len());
    for (number, count) in hot_numbers(&frequency, 10) {
        println!("  {:02}  {}", number, count);
    }
    let cold: Vec<String> = frequency
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(n, _)| format!("{:02}", n))
        .collect();
    if !cold.is_empty() {
        println!("🧊 Not drawn: {}", cold.join(" "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn generate_parses_number_lists() {
        let cli = Cli::try_parse_from([
            "lotto645",
            "generate",
            "19900101",
            "female",
            "--exclude",
            "1,2,3",
            "--include",
            "7",
            "--no-consecutive",
        ])
        .unwrap();
        let Commands::Generate { user, constraints } = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(user.gender, Gender::Female);
        let constraints = constraints.constraints().unwrap();
        assert_eq!(constraints.exclude.len(), 3);
        assert!(constraints.include.contains(&7));
        assert!(constraints.prevent_consecutive);
    }

    #[test]
    fn game_requires_a_full_target() {
        let cli = Cli::try_parse_from([
            "lotto645", "game", "19900101", "male", "--numbers", "5,11,17,23,29,35", "--bonus", "41",
        ])
        .unwrap();
        let Commands::Game { target, .. } = cli.command else {
            panic!("expected game");
        };
        assert_eq!(target.target().unwrap().bonus_number, 41);

        assert!(Cli::try_parse_from(["lotto645", "game", "19900101", "male", "--bonus", "41"]).is_err());
        assert!(
            Cli::try_parse_from([
                "lotto645", "rank", "--set", "1,2,3,4,5,46", "--numbers", "1,2,3,4,5,6", "--bonus", "7",
            ])
            .is_err()
        );
    }

    #[test]
    fn filters_and_counts_have_defaults() {
        let cli = Cli::try_parse_from(["lotto645", "history", "--mode", "game"]).unwrap();
        let Commands::History { filter } = cli.command else {
            panic!("expected history");
        };
        assert_eq!(filter.filter().mode, ModeFilter::Game);
        assert_eq!(filter.filter().gender, None);

        let cli = Cli::try_parse_from(["lotto645", "draws"]).unwrap();
        assert!(matches!(cli.command, Commands::Draws { count: 10 }));
        assert!(Cli::try_parse_from(["lotto645", "summary", "--gender", "x"]).is_err());
    }
}
