//! tactica-sim - plays a short scripted encounter through the reaction engine.

use std::sync::Arc;

use tactica_domain::{CheckTag, GridPosition};
use tactica_engine::{
    infrastructure::{
        battlefield::Combatant,
        ports::RandomPort,
        random::{FixedRandom, SystemRandom},
        settings::SchedulerSettings,
    },
    use_cases::reactions::{HookPoint, HookReport, TracingObserver},
    App,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv_from_repo_root();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tactica_engine=debug,tactica_sim=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = SchedulerSettings::from_env()?;
    tracing::info!(settings = ?settings, "Starting tactica-sim");

    // TACTICA_SEED pins every d20 to one value, for reproducible runs.
    let random: Arc<dyn RandomPort> = match std::env::var("TACTICA_SEED")
        .ok()
        .and_then(|v| v.parse::<i32>().ok())
    {
        Some(fixed) => Arc::new(FixedRandom(fixed)),
        None => Arc::new(SystemRandom::new()),
    };

    let mut app = App::in_memory(settings, random);
    app.scheduler.observe_all(Arc::new(TracingObserver));
    app.scheduler.observe(
        HookPoint::ActionCompleted,
        Arc::new(|report: &HookReport| {
            if report.fired_count() > 0 {
                tracing::info!(fired = report.fired_count(), "Movement provoked reactions");
            }
        }),
    );

    let aria = app.battlefield.add(
        Combatant::new("Aria", GridPosition::new(0, 0), 1)
            .with_weapon("Glaive", 2)
            .with_check_bonus(7),
    );
    let bram = app.battlefield.add(
        Combatant::new("Bram", GridPosition::new(1, 0), 1)
            .with_shield("Steel Shield")
            .with_hp(24),
    );
    let grusk = app.battlefield.add(
        Combatant::new("Grusk", GridPosition::new(7, 0), 2)
            .with_weapon("Club", 1)
            .with_hp(18)
            .with_check_bonus(6),
    );

    app.begin_encounter().await;
    app.scheduler.grant_pool(
        bram,
        app.abilities.shield_block_pool,
        tactica_engine::use_cases::StandardAbilities::shield_block_permits(),
    )?;

    // Round 1: Aria readies and aids, Bram forces the door.
    app.start_turn(aria).await;
    app.scheduler.arm(app.abilities.brace(aria)).await?;
    app.scheduler
        .arm(app.abilities.aid(aria, bram, CheckTag::new("athletics"), 15))
        .await?;
    app.end_turn(aria).await;

    app.start_turn(bram).await;
    app.scheduler.arm(app.abilities.shield_block(bram, 5)).await?;
    app.scheduler.arm(app.abilities.reactive_shield(bram)).await?;
    let door = app
        .attempt_check(bram, CheckTag::new("athletics"), 20)
        .await?;
    tracing::info!(degree = ?door.degree, aided = door.reactions.fired_count(), "Bram forces the door");
    app.end_turn(bram).await;

    // Grusk charges into Aria's reach and swings at Bram.
    app.start_turn(grusk).await;
    let charge = (1..=7).rev().map(|x| GridPosition::new(x, 1)).collect();
    app.move_along(grusk, charge).await?;
    if app.battlefield.combatant(grusk).is_some() {
        let swing = app.strike(grusk, bram).await?;
        if swing.degree.is_success() {
            let hit = app.apply_damage(Some(grusk), bram, 9).await;
            tracing::info!(
                dealt = hit.dealt,
                prevented = hit.prevented,
                bram_hp = ?hit.remaining_hp,
                "Grusk hits Bram"
            );
        } else {
            tracing::info!("Grusk misses Bram");
        }
    }
    app.end_turn(grusk).await;

    for actor in [aria, bram] {
        let armed = app.scheduler.armed_for(actor).len();
        tracing::info!(actor = %app.battlefield.name(actor), armed = armed, "Reactions still armed");
    }

    app.scheduler.end_encounter();
    tracing::info!("Encounter over");
    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
