use anyhow::{Context, Result, bail, ensure};
use quizbrawl_game::constants::{PLAYER_KEY, STARTING_GOLD, STARTING_LEVEL};
use quizbrawl_game::{
    Collection, EngineOptions, GameConfig, Offline, Player, ProgressionEngine, PurchaseOutcome,
    Rarity, RecordStore, RemoteSession, StatsCache, buy_upgrade, is_maxed, roll_item_drop,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::json;
use std::cell::Cell;
use std::convert::Infallible;
use std::path::Path;

use crate::logic::{PlayStyle, SimulatedPlayer, check_vitals};
use crate::store::{FileStore, ScenarioStore};

const EPOCH_MS: u64 = 1_700_000_000_000;
const DROP_SAMPLES: u32 = 100_000;
const DROP_TOLERANCE: f64 = 0.01;
const SESSION_RUNS: u32 = 10;

/// Shared inputs for every scenario iteration.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioCtx<'a> {
    pub config: &'a GameConfig,
    /// Write stores as JSON files here instead of keeping them in memory.
    pub store_dir: Option<&'a Path>,
    pub verbose: bool,
}

#[derive(Clone, Copy)]
pub struct Scenario {
    pub key: &'static str,
    pub description: &'static str,
    exec: fn(&ScenarioCtx<'_>, u64) -> Result<()>,
}

impl Scenario {
    /// Run one iteration with `seed`.
    ///
    /// # Errors
    ///
    /// Returns the first broken expectation.
    pub fn run(&self, ctx: &ScenarioCtx<'_>, seed: u64) -> Result<()> {
        (self.exec)(ctx, seed).with_context(|| format!("scenario {}", self.key))
    }
}

static CATALOG: [Scenario; 6] = [
    Scenario {
        key: "smoke",
        description: "Create a player, play one run, save and reload",
        exec: smoke,
    },
    Scenario {
        key: "economy",
        description: "Buy every upgrade to its cap and audit the price curve",
        exec: economy,
    },
    Scenario {
        key: "drops",
        description: "Sample rarity rolls and compare against configured rates",
        exec: drops,
    },
    Scenario {
        key: "session",
        description: "Simulate a multi-run session and cross-check derived stats",
        exec: session,
    },
    Scenario {
        key: "migration",
        description: "Load a legacy record and verify the one-off remote re-sync",
        exec: migration,
    },
    Scenario {
        key: "persistence",
        description: "Round-trip progress through the JSON file store",
        exec: persistence,
    },
];

pub fn list_scenarios() -> impl Iterator<Item = (&'static str, &'static str)> {
    CATALOG.iter().map(|s| (s.key, s.description))
}

pub fn all_keys() -> Vec<String> {
    CATALOG.iter().map(|s| s.key.to_string()).collect()
}

pub fn find_scenario(key: &str) -> Option<Scenario> {
    CATALOG.iter().find(|s| s.key == key).copied()
}

fn open_engine<S: RecordStore>(
    store: S,
    ctx: &ScenarioCtx<'_>,
    seed: u64,
) -> Result<ProgressionEngine<S, Offline>> {
    let engine = ProgressionEngine::load(
        store,
        Offline,
        ctx.config.clone(),
        EngineOptions {
            seed,
            epoch_ms: EPOCH_MS,
        },
    )?;
    Ok(engine)
}

fn seed_player<S: RecordStore>(store: &S, player: &Player) -> Result<()> {
    let value = serde_json::to_value(player)?;
    store
        .put(Collection::Player, PLAYER_KEY, &value)
        .map_err(|err| anyhow::anyhow!("seeding player failed: {err}"))
}

fn smoke(ctx: &ScenarioCtx<'_>, seed: u64) -> Result<()> {
    let store = ScenarioStore::for_run(ctx.store_dir, &format!("smoke-{seed}"))?;
    let mut engine = open_engine(store, ctx, seed)?;
    ensure!(
        engine.player().current_hp == engine.player().max_hp,
        "new player must start at full health"
    );

    let mut sim = SimulatedPlayer::new(seed, PlayStyle::default());
    let record = sim.play_run(&mut engine, 1)?;
    ensure!(
        engine.player().stats.total_runs == 1,
        "run was not counted"
    );
    ensure!(record.end_time.is_some(), "finished run has no end time");

    let snapshot = engine.player().clone();
    let store = engine.store();
    let reloaded = open_engine(store, ctx, seed)?;
    ensure!(
        reloaded.player().gold == snapshot.gold && reloaded.player().exp == snapshot.exp,
        "reload lost progress"
    );
    Ok(())
}

fn economy(ctx: &ScenarioCtx<'_>, seed: u64) -> Result<()> {
    let store = ScenarioStore::for_run(ctx.store_dir, &format!("economy-{seed}"))?;
    let mut rich = Player::new("main", EPOCH_MS);
    rich.gold = 1_000_000_000;
    seed_player(&store, &rich)?;
    let mut engine = open_engine(store, ctx, seed)?;

    let ids: Vec<String> = ctx.config.upgrades.keys().cloned().collect();
    for id in ids {
        let max_level = ctx.config.upgrades[&id].max_level;
        let mut last_price = 0;
        loop {
            match buy_upgrade(&mut engine, &id)? {
                PurchaseOutcome::Purchased { price } => {
                    ensure!(price % 10 == 0, "{id} price {price} is not a multiple of 10");
                    ensure!(
                        price >= last_price,
                        "{id} price fell from {last_price} to {price}"
                    );
                    last_price = price;
                }
                PurchaseOutcome::Maxed => break,
                other => bail!("buying {id} returned {other:?}"),
            }
            check_vitals(&engine)?;
        }
        ensure!(
            engine.player().upgrade_level(&id) == max_level,
            "{id} stopped at level {} of {max_level}",
            engine.player().upgrade_level(&id)
        );
        ensure!(is_maxed(engine.player(), ctx.config, &id), "{id} not maxed");
        if ctx.verbose {
            println!("   {id}: maxed at {max_level}, last price {last_price}");
        }
    }
    Ok(())
}

fn drops(ctx: &ScenarioCtx<'_>, seed: u64) -> Result<()> {
    let table = &ctx.config.rarities;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut counts = [0_u32; 4];
    for _ in 0..DROP_SAMPLES {
        let roll = roll_item_drop(table, &mut rng).context("rarity pool is empty")?;
        let slot = match roll.rarity {
            Rarity::Legendary => 0,
            Rarity::Epic => 1,
            Rarity::Rare => 2,
            Rarity::Normal => 3,
        };
        counts[slot] += 1;
    }

    let weighted: f64 = Rarity::WEIGHTED
        .iter()
        .map(|&r| table.tier(r).drop_rate)
        .sum();
    let expected = [
        table.legendary.drop_rate,
        table.epic.drop_rate,
        table.rare.drop_rate,
        (1.0 - weighted).max(0.0),
    ];
    for (slot, (&count, &want)) in counts.iter().zip(expected.iter()).enumerate() {
        let observed = f64::from(count) / f64::from(DROP_SAMPLES);
        ensure!(
            (observed - want).abs() <= DROP_TOLERANCE,
            "rarity slot {slot}: observed {observed:.4}, expected {want:.4}"
        );
    }
    Ok(())
}

fn session(ctx: &ScenarioCtx<'_>, seed: u64) -> Result<()> {
    let store = ScenarioStore::for_run(ctx.store_dir, &format!("session-{seed}"))?;
    let mut engine = open_engine(store, ctx, seed)?;
    let mut sim = SimulatedPlayer::new(seed, PlayStyle::default());

    for run in 0..SESSION_RUNS {
        let difficulty = u8::try_from(run % 3 + 1)?;
        sim.play_run(&mut engine, difficulty)?;
        sim.shop(&mut engine)?;
        engine.drain_feedback();
    }

    let mut cache = StatsCache::new();
    let snapshot = cache.refresh(engine.store())?;
    let player = engine.player();
    let summary = sim.summary();
    ensure!(
        snapshot.total_runs == player.stats.total_runs,
        "history has {} runs, player counted {}",
        snapshot.total_runs,
        player.stats.total_runs
    );
    ensure!(
        snapshot.total_clears == u64::from(summary.clears),
        "history has {} clears, simulation saw {}",
        snapshot.total_clears,
        summary.clears
    );
    ensure!(
        snapshot.total_correct == player.total_correct_answers,
        "history has {} correct answers, player counted {}",
        snapshot.total_correct,
        player.total_correct_answers
    );
    ensure!(
        snapshot.best_combo == player.stats.best_combo,
        "best combo mismatch"
    );
    ensure!(
        summary.runs == SESSION_RUNS && summary.clears + summary.fails == summary.runs,
        "simulation closed {} runs ({} clears, {} fails)",
        summary.runs,
        summary.clears,
        summary.fails
    );
    ensure!(
        player.level == STARTING_LEVEL + summary.levels_gained,
        "player is level {} after {} level-ups",
        player.level,
        summary.levels_gained
    );
    let expected_gold = (STARTING_GOLD + player.total_gold_earned).checked_sub(summary.gold_spent);
    ensure!(
        expected_gold == Some(player.gold),
        "gold {} does not reconcile: earned {}, spent {}",
        player.gold,
        player.total_gold_earned,
        summary.gold_spent
    );

    let report = serde_json::to_string(summary)?;
    if ctx.verbose {
        println!("   session seed {seed}: {report}");
    }
    log::info!("session seed {seed}: level {}, {report}", player.level);
    Ok(())
}

/// Logged-in remote that only counts pushes.
#[derive(Debug, Default)]
struct CountingRemote {
    pushes: Cell<u32>,
}

impl RemoteSession for &CountingRemote {
    type Error = Infallible;

    fn is_logged_in(&self) -> bool {
        true
    }

    fn put_player(&self, _player: &Player) -> Result<(), Self::Error> {
        self.pushes.set(self.pushes.get() + 1);
        Ok(())
    }
}

fn migration(ctx: &ScenarioCtx<'_>, seed: u64) -> Result<()> {
    let store = ScenarioStore::for_run(ctx.store_dir, &format!("migration-{seed}"))?;
    let legacy = json!({
        "id": "legacy",
        "level": 4,
        "exp": 12,
        "gold": 340,
        "permanentUpgrades": { "hp": 2 },
        "achievements": []
    });
    store
        .put(Collection::Player, PLAYER_KEY, &legacy)
        .map_err(|err| anyhow::anyhow!("seeding legacy record failed: {err}"))?;

    let remote = CountingRemote::default();
    let options = EngineOptions {
        seed,
        epoch_ms: EPOCH_MS,
    };
    let engine = ProgressionEngine::load(&store, &remote, ctx.config.clone(), options)?;
    let report = engine.migration();
    ensure!(report.cosmetics_synthesized, "legacy cosmetics not synthesized");
    ensure!(report.inventory_initialized, "legacy inventory not initialized");
    ensure!(remote.pushes.get() == 1, "expected one re-sync push");
    ensure!(engine.player().gold == 340, "legacy gold lost");
    check_vitals(&engine)?;
    drop(engine);

    let engine = ProgressionEngine::load(&store, &remote, ctx.config.clone(), options)?;
    ensure!(engine.migration().is_clean(), "migrated record still dirty");
    ensure!(
        remote.pushes.get() == 1,
        "clean reload pushed to the remote again"
    );
    Ok(())
}

fn persistence(ctx: &ScenarioCtx<'_>, seed: u64) -> Result<()> {
    let fallback = std::env::temp_dir().join("quizbrawl-tester");
    let dir = ctx.store_dir.unwrap_or(&fallback);
    let label = format!("persistence-{seed}");
    let store = ScenarioStore::for_run(Some(dir), &label)?;
    let mut engine = open_engine(store, ctx, seed)?;

    let mut sim = SimulatedPlayer::new(seed, PlayStyle::default());
    sim.play_run(&mut engine, 2)?;
    sim.shop(&mut engine)?;
    let expected = engine.player().clone();
    drop(engine);

    let reopened = FileStore::open(dir.join(format!("{label}.json")))?;
    let runs = reopened.get_all(Collection::Runs)?;
    ensure!(runs.len() == 1, "expected one stored run, found {}", runs.len());
    let engine = open_engine(reopened, ctx, seed)?;
    let player = engine.player();
    ensure!(player.gold == expected.gold, "gold did not survive reload");
    ensure!(
        player.permanent_upgrades == expected.permanent_upgrades,
        "upgrades did not survive reload"
    );
    ensure!(
        player.current_hp == player.max_hp,
        "reload must restore full health"
    );
    Ok(())
}
