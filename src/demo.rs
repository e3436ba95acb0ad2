//! A small hand-built world for `mudlark play` without a world file
//!
//! A roadside tavern: the taproom, a kitchen to the east, a locked cellar
//! below and the street outside.

use mudlark_core::{Graph, GraphBuilder, GridLocation, ObjectData, Result};
use mudlark_events::WorldConfig;

fn gettable(build: impl FnOnce(&mut ObjectData)) -> ObjectData {
    let mut data = ObjectData {
        is_gettable: true,
        ..Default::default()
    };
    build(&mut data);
    data
}

/// Build the tavern. Agents get their stats from `config`.
pub fn tavern(config: &WorldConfig) -> Result<Graph> {
    let mut b = GraphBuilder::new();

    let taproom = b.room(
        "taproom",
        "Low beams, a smoky hearth and a long oak counter.",
        GridLocation::new(0, 0, 0),
    )?;
    let kitchen = b.room(
        "kitchen",
        "Copper pots hang over a scarred table.",
        GridLocation::new(1, 0, 0),
    )?;
    let cellar = b.room(
        "cellar",
        "Cool and damp. Barrels line the walls.",
        GridLocation::new(0, 0, -1),
    )?;
    let street = b.room(
        "street",
        "A rutted road runs past the tavern door.",
        GridLocation::new(0, -1, 0),
    )?;
    b.connect(&taproom, &kitchen, "the east", "the west")?;
    b.connect(&taproom, &cellar, "the cellar stairs", "the stairs up")?;
    b.connect(&taproom, &street, "the door", "the tavern")?;

    let wren = b.agent(
        "Wren",
        "A dusty traveller with a walking stick.",
        config.agent_template(),
        &taproom,
    )?;
    let odo = b.agent("Odo", "The barkeep, wiping a mug.", config.agent_template(), &taproom)?;
    let maud = b.agent("Maud", "The cook, flour to the elbows.", config.agent_template(), &kitchen)?;
    let mut guard = config.agent_template();
    guard.damage = 3;
    guard.defense = 2;
    guard.health = 15;
    b.agent("Sten", "A watchman leaning on a spear.", guard, &street)?;

    let iron_key = b.object("iron key", "Heavy and cold.", gettable(|_| {}), &odo)?;
    b.lock_path(&taproom, &cellar, &iron_key, true)?;

    b.object(
        "mug of ale",
        "Foam spills over the rim.",
        gettable(|o| {
            o.is_drink = true;
            o.food_energy = 2;
        }),
        &taproom,
    )?;
    b.object(
        "loaf of bread",
        "Still warm.",
        gettable(|o| {
            o.is_food = true;
            o.food_energy = 4;
        }),
        &kitchen,
    )?;
    b.object(
        "grey mushroom",
        "It smells wrong.",
        gettable(|o| {
            o.is_food = true;
            o.food_energy = -6;
        }),
        &cellar,
    )?;
    b.object(
        "kitchen knife",
        "Sharp enough.",
        gettable(|o| {
            o.is_weapon = true;
            o.stats.insert("damage".into(), 2);
        }),
        &maud,
    )?;
    b.object(
        "wool cloak",
        "Patched but thick.",
        gettable(|o| {
            o.is_wearable = true;
            o.stats.insert("defense".into(), 1);
        }),
        &wren,
    )?;
    b.object("walking stick", "Worn smooth.", gettable(|_| {}), &wren)?;

    let strongbox = b.object(
        "strongbox",
        "Banded with iron.",
        ObjectData {
            is_container: true,
            ..Default::default()
        },
        &cellar,
    )?;
    let brass_key = b.object("brass key", "Small and bright.", gettable(|_| {}), &maud)?;
    b.lock_container(&strongbox, &brass_key, true)?;
    b.object(
        "silver coin",
        "Stamped with a crown.",
        gettable(|o| o.value = 10),
        &strongbox,
    )?;

    b.finish()
}
