//! Dungeon — templates from JSON, a turn-order collection and a few turns of
//! goblins bumping into the player.
//!
//! Run with `RUST_LOG=debug cargo run --example dungeon` to watch the
//! manager's bookkeeping.

use std::cmp::Ordering;

use serde::Deserialize;
use warren::prelude::*;

const MANIFEST: &str = r#"{
  "templates": [
    {
      "id": "actor",
      "components": { "Position": [0, 0], "Speed": 10, "ActionPoints": 0 }
    },
    {
      "id": "player",
      "inherits": "actor",
      "components": { "Sprite": "@", "Health": 20, "Speed": 12 }
    },
    {
      "id": "goblin",
      "inherits": "actor",
      "components": { "Sprite": "g", "Health": 5, "Speed": 8 }
    },
    { "id": "potion", "components": { "Sprite": "!", "Position": [0, 0], "Heals": 6 } }
  ]
}"#;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
struct Position(i32, i32);

#[derive(Debug, Clone, Deserialize)]
struct Sprite(String);

#[derive(Debug, Clone, Deserialize)]
struct Speed(i32);

#[derive(Debug, Clone, Deserialize)]
struct ActionPoints(i32);

#[derive(Debug, Clone, Deserialize)]
struct Health(i32);

#[derive(Debug, Clone, Deserialize)]
struct Heals(i32);

/// Most action points acts first.
fn by_action_points(a: EntityRef<'_>, b: EntityRef<'_>) -> Ordering {
    let points = |e: EntityRef<'_>| e.get::<ActionPoints>().map_or(0, |p| p.0);
    points(b).cmp(&points(a))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut em = EntityManager::new();
    em.register::<Position>();
    em.register::<Sprite>();
    em.register::<Speed>();
    em.register::<ActionPoints>();
    em.register::<Health>();
    em.register::<Heals>();

    let mut loader = TemplateRegistry::new();
    loader
        .register::<Position>()
        .register::<Sprite>()
        .register::<Speed>()
        .register::<ActionPoints>()
        .register::<Health>()
        .register::<Heals>();

    let mut factory = EntityFactory::new();
    loader.load_str(&mut factory, MANIFEST)?;
    factory.compile()?;

    // Collections requested before anything exists are filled as we go.
    let turn_order =
        em.query_sorted::<(ActionPoints, Speed)>(SortBy::new("action_points", by_action_points))?;
    let drawable = em.query::<(Sprite, Position)>()?;
    let living = em.query::<(Health,)>()?;
    em.observe(living, |event, entity| {
        if let CollectionEvent::Removed(id) = event {
            let sprite = entity.get::<Sprite>().map_or("?", |s| s.0.as_str());
            println!("  {sprite} {id} is gone");
        }
    })?;

    let player = factory.create("player", &mut em)?;
    em.tag(player, "player")?;
    for x in [3, 5] {
        let goblin = factory.create("goblin", &mut em)?;
        *em.get_mut::<Position>(goblin).ok_or("goblin without position")? = Position(x, 0);
        em.set_group("goblins", goblin)?;
    }
    let potion = factory.create("potion", &mut em)?;
    *em.get_mut::<Position>(potion).ok_or("potion without position")? = Position(1, 1);

    for turn in 1..=4 {
        println!("turn {turn}");

        // Everyone earns action points, then the order is refreshed.
        em.for_each(turn_order, |mut actor| {
            let speed = actor.get::<Speed>().map_or(0, |s| s.0);
            if let Some(points) = actor.get_mut::<ActionPoints>() {
                points.0 += speed;
            }
        })?;
        em.resort(turn_order)?;

        let player = em.tagged("player")?;
        em.for_each(turn_order, |mut actor| {
            let Some(points) = actor.get_mut::<ActionPoints>() else {
                return;
            };
            if points.0 < 10 {
                return;
            }
            points.0 -= 10;

            let is_player = actor.id() == player;
            let Some(&Position(x, y)) = actor.get::<Position>() else {
                return;
            };
            let step = if is_player { 1 } else { -1 };
            if let Some(pos) = actor.get_mut::<Position>() {
                *pos = Position(x + step, y);
            }
            let name = actor.get::<Sprite>().map_or("?", |s| s.0.as_str()).to_string();
            println!("  {name} {} moves to ({}, {y})", actor.id(), x + step);

            // The player cuts down any goblin on the square it steps onto.
            if is_player {
                let manager = actor.manager();
                let struck: Vec<Identity> = manager
                    .group_members("goblins")
                    .map(|goblins| {
                        goblins
                            .iter()
                            .copied()
                            .filter(|&g| manager.get::<Position>(g) == Some(&Position(x + step, y)))
                            .collect()
                    })
                    .unwrap_or_default();
                for goblin in struck {
                    let _ = manager.remove(goblin);
                }
                return;
            }

            // Goblins tire: every move costs them health.
            let exhausted = match actor.get_mut::<Health>() {
                Some(health) => {
                    health.0 -= 3;
                    health.0 <= 0
                }
                None => false,
            };
            if exhausted {
                let _ = actor.destroy();
            }
        })?;
    }

    // The player drinks the potion.
    if let Some(Heals(amount)) = em.take_component::<Heals>(potion)? {
        if let Some(health) = em.get_mut::<Health>(player) {
            health.0 += amount;
        }
        em.remove(potion)?;
    }

    println!("\nmap:");
    for id in em.collection(drawable)?.iter() {
        let entity = em.entity(id)?;
        if let (Some(sprite), Some(pos)) = (entity.get::<Sprite>(), entity.get::<Position>()) {
            println!("  {} at ({}, {})", sprite.0, pos.0, pos.1);
        }
    }
    match em.group_members("goblins") {
        Ok(goblins) => println!("goblins left: {}", goblins.len()),
        Err(err) => println!("{err}"),
    }

    println!("\n{}", em.diagnostics().to_json()?);
    Ok(())
}
