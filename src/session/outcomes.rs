//! Fight consequences, per variant
//!
//! The turn algorithm never looks at the variant. Everything that differs
//! between a hunt, an arena match, an inn raid, a mayor duel and a dungeon
//! room is decided here, once the fight is over.

use rand::{Rng, RngCore};
use tracing::{debug, info, warn};

use crate::combat::combatant::Skill;
use crate::combat::damage::chance;
use crate::combat::guards::process_guard_recovery;
use crate::combat::machine::{CombatContext, FightOutcome};
use crate::combat::variant::{FightVariant, MayorPhase};
use crate::core::types::{now_unix, GameMessage, MessageCategory, WorldId};
use crate::session::engine::Engine;
use crate::session::handlers::{dungeon, hunt, respond, town};
use crate::session::protocol::GameResponse;
use crate::session::session::{PendingInteraction, Session, UiState};
use crate::world::arena::{rating_change, ArenaEntry};
use crate::world::character::{scaled_xp, Character};
use crate::world::item::{Item, PotionSize};
use crate::world::monster::Monster;
use crate::world::snapshot::SharedWorld;
use crate::world::town::{AttackLogEntry, Mayor};
use crate::world::village::VillagerRole;

/// Percent of rescued villagers who take up guard duty
const RESCUED_GUARD_CHANCE: u32 = 30;

/// What a resolved hunt fight produced
#[derive(Debug, Default)]
pub(crate) struct HuntSettlement {
    pub xp: i32,
    pub messages: Vec<GameMessage>,
    /// Skill offered by a beaten skill guardian
    pub reward: Option<Skill>,
}

/// Add experience, announcing any level-ups
pub(crate) fn grant_xp<R: Rng + ?Sized>(rng: &mut R, player: &mut Character, xp: i32, messages: &mut Vec<GameMessage>) {
    if xp <= 0 {
        return;
    }
    messages.push(GameMessage::new(format!("You gain {} experience.", xp), MessageCategory::Levelup));
    if player.gain_experience(rng, xp) > 0 {
        messages.push(GameMessage::new(
            format!("LEVEL UP! You are now level {}!", player.level()),
            MessageCategory::Levelup,
        ));
    }
}

/// Wear whatever is an upgrade, stash the rest
pub(crate) fn take_loot(player: &mut Character, items: Vec<Item>, messages: &mut Vec<GameMessage>) {
    for item in items {
        let name = item.name.clone();
        let text = if player.equip(item) {
            format!("You equip {}.", name)
        } else {
            format!("You stash {}.", name)
        };
        messages.push(GameMessage::new(text, MessageCategory::Loot));
    }
}

/// Record progress on the player's active quests
///
/// Completed quests pay out, move to the completed list, and the next
/// quest from the world's catalog becomes active.
pub(crate) fn advance_quests<R: Rng + ?Sized>(
    world: &SharedWorld,
    rng: &mut R,
    player: &mut Character,
    kill: Option<&str>,
) -> (i32, Vec<GameMessage>) {
    let mut completed = Vec::new();
    {
        let mut snapshot = world.write();
        for id in &player.active_quests {
            let Some(quest) = snapshot.quests.get_mut(id) else {
                continue;
            };
            let done = quest.completed
                || kill.map(|t| quest.record_kill(t)).unwrap_or(false)
                || quest.check_level(player.level());
            if done {
                completed.push((id.clone(), quest.name.clone(), quest.reward_xp));
            }
        }
        if completed.is_empty() {
            return (0, Vec::new());
        }
        for (id, _, _) in &completed {
            player.active_quests.retain(|q| q != id);
            player.completed_quests.push(id.clone());
        }
        let next = snapshot
            .quests
            .keys()
            .find(|id| !player.completed_quests.contains(id) && !player.active_quests.contains(id))
            .cloned();
        if let Some(next) = next {
            player.active_quests.push(next);
        }
    }

    let mut xp = 0;
    let mut messages = Vec::new();
    for (_, name, reward) in completed {
        messages.push(GameMessage::new(format!("Quest complete: {}!", name), MessageCategory::System));
        grant_xp(rng, player, reward, &mut messages);
        xp += reward;
    }
    (xp, messages)
}

/// Put a beaten player back on their feet
///
/// Lethal variants count a death; the others only heal.
pub(crate) fn recover_after_loss(variant: &FightVariant, player: &mut Character) {
    if variant.is_lethal() {
        player.resurrect();
    } else {
        player.refresh();
    }
}

/// Apply a hunt result to the player, the village and the location roster
pub(crate) fn resolve_hunt<R: RngCore>(
    engine: &Engine,
    world: &SharedWorld,
    rng: &mut R,
    player: &mut Character,
    ctx: &mut CombatContext,
    outcome: FightOutcome,
) -> HuntSettlement {
    let outcome = ctx.variant.score(outcome);
    let config = engine.config();
    let content = engine.content();
    let mut settlement = HuntSettlement::default();
    let messages = &mut settlement.messages;
    player.stats.fights += 1;

    match outcome {
        FightOutcome::Won => {
            player.stats.monsters_killed += 1;
            let foe = &mut ctx.opponent;
            let xp = scaled_xp(player.level(), foe.level());
            settlement.xp += xp;
            grant_xp(rng, player, xp, messages);
            take_loot(player, foe.equipment.take_all(), messages);

            if chance(rng, config.potion_drop_chance) {
                let potion = Item::health_potion(PotionSize::roll(rng));
                messages.push(GameMessage::new(format!("You found a {}!", potion.name), MessageCategory::Loot));
                player.inventory.push(potion);
            }

            let material = content.material_drop(rng, &foe.monster_type);
            let rescued = if chance(rng, config.villager_rescue_chance) {
                let role = if chance(rng, RESCUED_GUARD_CHANCE) {
                    VillagerRole::Guard
                } else {
                    VillagerRole::Harvester
                };
                Some(content.villager(rng, role))
            } else {
                None
            };

            {
                let mut snapshot = world.write();
                if let Some(village) = snapshot.villages.get_mut(&player.village_name) {
                    if let Some(material) = &material {
                        village.add_resource(material, 1);
                        messages.push(GameMessage::new(
                            format!("You harvest 1 {} for your village.", material),
                            MessageCategory::Loot,
                        ));
                    }
                    if let Some(villager) = rescued {
                        messages.push(GameMessage::new(
                            format!("You rescued {}! They join your village.", villager.name),
                            MessageCategory::Narrative,
                        ));
                        village.villagers.push(villager);
                        village.experience += config.villager_rescue_xp;
                        for tier in village.upgrade() {
                            messages.push(GameMessage::new(
                                format!("Your village reached level {}! Unlocked: {}", village.level, tier),
                                MessageCategory::Levelup,
                            ));
                        }
                    }
                }
                if let Some((name, id)) = &ctx.origin {
                    if let Some(location) = snapshot.locations.get_mut(name) {
                        if location.monster_mut(*id).is_some() {
                            let replacement = content.monster(rng, location.level_max, location.rarity_max);
                            location.replace_by_id(*id, replacement);
                        } else {
                            debug!(location = %name, "beaten monster already left the roster");
                        }
                    }
                }
            }

            if chance(rng, config.location_discovery_chance) && !player.locked_locations.is_empty() {
                let index = rng.gen_range(0..player.locked_locations.len());
                let name = player.locked_locations[index].clone();
                if player.discover_location(&name) {
                    messages.push(GameMessage::new(
                        format!("You discovered a new location: {}!", name),
                        MessageCategory::Narrative,
                    ));
                }
            }
            if let Some(name) = foe.unlocks_location.clone() {
                if player.discover_location(&name) {
                    messages.push(GameMessage::new(
                        format!("With its guardian fallen, {} is open to you!", name),
                        MessageCategory::Narrative,
                    ));
                }
            }
            settlement.reward = foe.guarded_skill.clone();

            let monster_type = foe.monster_type.clone();
            let (quest_xp, quest_messages) = advance_quests(world, rng, player, Some(&monster_type));
            settlement.xp += quest_xp;
            settlement.messages.extend(quest_messages);
        }
        FightOutcome::Lost => {
            if let Some((name, id)) = &ctx.origin {
                let mut snapshot = world.write();
                let victor = snapshot.locations.get_mut(name).and_then(|l| l.monster_mut(*id));
                if let Some(victor) = victor {
                    let items = player.equipment.take_all();
                    player.recompute();
                    if !items.is_empty() {
                        messages.push(GameMessage::new(
                            format!("{} takes your equipment!", victor.name()),
                            MessageCategory::Damage,
                        ));
                    }
                    victor.equip_all(items);
                    victor.player_kills += 1;
                    victor.gain_experience(rng, player.level() * config.monster_kill_xp_per_level);
                }
            }
            recover_after_loss(&ctx.variant, player);
            settlement.messages.push(GameMessage::system(format!(
                "You have been resurrected. (Resurrections: {})",
                player.resurrections
            )));
        }
        FightOutcome::Fled => player.stats.fled += 1,
        FightOutcome::TimedOut | FightOutcome::Ongoing => {}
    }

    let guards = ctx.take_guards();
    let boss = ctx.opponent.is_boss;
    let mut snapshot = world.write();
    if let Some(village) = snapshot.villages.get_mut(&player.village_name) {
        for guard in guards {
            if boss && guard.fighter.hp.current <= 0 {
                settlement.messages.push(GameMessage::new(
                    format!("{} has fallen in battle and will not return.", guard.name()),
                    MessageCategory::Damage,
                ));
            } else {
                village.active_guards.push(guard);
            }
        }
        settlement
            .messages
            .extend(process_guard_recovery(&mut village.active_guards));
    }
    settlement
}

/// Settle a finished fight and render whatever comes next
pub(crate) fn settle(
    engine: &Engine,
    session: &mut Session,
    outcome: FightOutcome,
    mut messages: Vec<GameMessage>,
) -> GameResponse {
    let Some(ctx) = session.combat.take() else {
        return respond(engine, session, messages);
    };
    let outcome = ctx.variant.score(outcome);
    debug!(variant = ctx.variant.label(), ?outcome, turns = ctx.turn, "settling fight");

    // Hunts count fights and recover the player in `resolve_hunt`, shared with autoplay
    if !matches!(ctx.variant, FightVariant::Hunt { .. }) {
        if let Some(player) = session.character.as_mut() {
            player.stats.fights += 1;
            if outcome == FightOutcome::Lost {
                recover_after_loss(&ctx.variant, player);
            }
        }
    }

    match ctx.variant.clone() {
        FightVariant::Hunt { remaining } => settle_hunt(engine, session, ctx, outcome, remaining, &mut messages),
        FightVariant::Arena { world, opponent } => {
            settle_arena(engine, session, &world, &opponent, outcome, &mut messages)
        }
        FightVariant::PvP { guest } => settle_raid(engine, session, &guest, outcome, &mut messages),
        FightVariant::MayorDuel { phase } => settle_duel(engine, session, phase, outcome, &mut messages),
        FightVariant::Dungeon => settle_dungeon(session, ctx, outcome, &mut messages),
    }

    messages.extend(engine.autosave(session));
    respond(engine, session, messages)
}

fn settle_hunt(
    engine: &Engine,
    session: &mut Session,
    mut ctx: CombatContext,
    outcome: FightOutcome,
    remaining: u32,
    messages: &mut Vec<GameMessage>,
) {
    let location = ctx
        .origin
        .as_ref()
        .map(|(name, _)| name.clone())
        .or_else(|| session.location.clone());
    let guards_joined = ctx.guards_joined;

    let settlement = {
        let Session {
            character, world, rng, ..
        } = &mut *session;
        match character.as_mut() {
            Some(player) => resolve_hunt(engine, world, rng, player, &mut ctx, outcome),
            None => HuntSettlement::default(),
        }
    };
    messages.extend(settlement.messages);

    if let Some(skill) = settlement.reward {
        if remaining > 0 {
            messages.push(GameMessage::system("The guardian's challenge ends your hunt."));
        }
        session.ui = UiState::GuardianReward;
        session.pending = PendingInteraction::GuardianReward { skill };
        return;
    }

    let continues = remaining > 0
        && matches!(outcome, FightOutcome::Won | FightOutcome::Lost);
    if let (true, Some(location)) = (continues, location) {
        messages.push(GameMessage::system(format!("{} fights remaining.", remaining)));
        match hunt::begin_fight(engine, session, &location, remaining - 1, guards_joined) {
            Ok(opening) => {
                messages.extend(opening);
                return;
            }
            Err(err) => messages.push(err.to_message()),
        }
    }
    session.go(UiState::MainMenu);
}

fn settle_arena(
    engine: &Engine,
    session: &mut Session,
    opponent_world: &WorldId,
    opponent: &str,
    outcome: FightOutcome,
    messages: &mut Vec<GameMessage>,
) {
    session.go(UiState::ArenaMain);
    let world_id = session.world_id().clone();
    let Some(player) = session.character.as_mut() else {
        return;
    };
    let config = engine.config();
    let store = engine.store();
    let now = now_unix();

    let lookup = |world: &WorldId, name: &str| match store.arena_entry(world, name) {
        Ok(entry) => entry,
        Err(err) => {
            warn!(%err, name, "arena entry lookup failed");
            None
        }
    };
    let mut mine = lookup(&world_id, player.name())
        .unwrap_or_else(|| ArenaEntry::register(world_id.clone(), player, config, now));
    let mut theirs = lookup(opponent_world, opponent);
    let their_rating = theirs.as_ref().map(|t| t.rating).unwrap_or(config.arena_start_rating);

    mine.roll_day(now);
    mine.battles_today += 1;

    match outcome {
        FightOutcome::Won => {
            let (gain, loss) = rating_change(mine.rating, their_rating, config);
            mine.record_win(gain);
            if let Some(theirs) = theirs.as_mut() {
                theirs.record_loss(loss);
            }
            player.stats.arena_wins += 1;
            messages.push(GameMessage::new(
                format!("Arena victory! +{} rating (now {}).", gain, mine.rating),
                MessageCategory::System,
            ));
        }
        FightOutcome::Lost | FightOutcome::Fled => {
            let (gain, loss) = rating_change(their_rating, mine.rating, config);
            mine.record_loss(loss);
            if let Some(theirs) = theirs.as_mut() {
                theirs.record_win(gain);
            }
            messages.push(GameMessage::new(
                format!("Arena defeat. -{} rating (now {}).", loss, mine.rating),
                MessageCategory::System,
            ));
        }
        FightOutcome::TimedOut => {
            messages.push(GameMessage::system("The match ends in a draw. Ratings are unchanged."));
        }
        FightOutcome::Ongoing => {}
    }

    player.refresh();
    mine.refresh_snapshot(player);
    let saved = store
        .upsert_arena_entry(&mine)
        .and_then(|()| theirs.as_ref().map_or(Ok(()), |t| store.upsert_arena_entry(t)));
    if let Err(err) = saved {
        warn!(%err, "failed to save arena result");
        messages.push(err.to_message());
    }
    messages.push(GameMessage::system(format!(
        "Battles left today: {}",
        mine.battles_remaining(config)
    )));
}

fn settle_raid(
    engine: &Engine,
    session: &mut Session,
    guest_name: &str,
    outcome: FightOutcome,
    messages: &mut Vec<GameMessage>,
) {
    session.go(UiState::Inn);
    let Session { character, rng, .. } = &mut *session;
    let Some(player) = character.as_mut() else {
        return;
    };

    let (attacker_won, details) = match outcome {
        FightOutcome::Won => {
            let guest = engine.town().remove_guest(guest_name);
            match guest {
                Some(mut guest) => {
                    let count = rng.gen_range(1..=3);
                    let stolen = guest.equipment.take_random(rng, count);
                    let names: Vec<String> = stolen.iter().map(|i| i.name.clone()).collect();
                    take_loot(player, stolen, messages);
                    if guest.is_npc() && guest.gold_carried > 0 {
                        player.gold += guest.gold_carried;
                        messages.push(GameMessage::new(
                            format!("You take {} gold from {}.", guest.gold_carried, guest_name),
                            MessageCategory::Loot,
                        ));
                    }
                    player.stats.pvp_wins += 1;
                    let details = if names.is_empty() {
                        "found nothing worth taking".to_string()
                    } else {
                        format!("stole {}", names.join(", "))
                    };
                    (true, details)
                }
                None => {
                    messages.push(GameMessage::system(format!("{} has already left the inn.", guest_name)));
                    (true, "found an empty room".to_string())
                }
            }
        }
        FightOutcome::Lost => {
            messages.push(GameMessage::system("You wake up in the street, bruised and resurrected."));
            (false, "was driven off".to_string())
        }
        FightOutcome::TimedOut => {
            messages.push(GameMessage::system("Neither of you gives ground; you slip away."));
            (false, "fought to a standstill".to_string())
        }
        FightOutcome::Fled | FightOutcome::Ongoing => {
            player.stats.fled += 1;
            (false, "fled".to_string())
        }
    };

    let snapshot = {
        let mut town = engine.town();
        town.log_attack(AttackLogEntry {
            attacker: player.name().to_string(),
            defender: guest_name.to_string(),
            attacker_won,
            details,
            time: now_unix(),
        });
        town.clone()
    };
    if let Err(err) = engine.store().save_town(&snapshot) {
        warn!(%err, "failed to save the town after a raid");
    }
}

fn settle_duel(
    engine: &Engine,
    session: &mut Session,
    phase: MayorPhase,
    outcome: FightOutcome,
    messages: &mut Vec<GameMessage>,
) {
    session.go(UiState::MayorChallenge);
    let account = session.account;
    let Some(player) = session.character.as_mut() else {
        return;
    };

    let mut next_fight: Option<(MayorPhase, Monster)> = None;
    let snapshot = {
        let mut town = engine.town();
        let defender = town.mayor.as_ref().map(|m| m.name().to_string()).unwrap_or_default();
        let (won, details) = match outcome {
            FightOutcome::Won => match town.mayor.as_mut() {
                Some(mayor) => match phase {
                    MayorPhase::Mayor => {
                        let old = mayor.name().to_string();
                        town.mayor = Some(Mayor::from_character(player, account));
                        info!(mayor = %player.name(), previous = %old, "new mayor installed");
                        messages.push(GameMessage::new(
                            format!("You defeated {} and are now the mayor of {}!", old, town.name),
                            MessageCategory::Levelup,
                        ));
                        (true, format!("took the office from {}", old))
                    }
                    MayorPhase::Guards | MayorPhase::Monsters => {
                        match phase {
                            MayorPhase::Guards if !mayor.guards.is_empty() => {
                                mayor.guards.remove(0);
                            }
                            MayorPhase::Monsters if !mayor.monsters.is_empty() => {
                                mayor.monsters.remove(0);
                            }
                            _ => {}
                        }
                        next_fight = Some(town::duel_opponent(mayor, phase));
                        (true, String::new())
                    }
                },
                None => {
                    messages.push(GameMessage::system("The office is empty; nobody is left to fight."));
                    (true, String::new())
                }
            },
            FightOutcome::Lost => {
                messages.push(GameMessage::system("Your challenge has failed. You are resurrected."));
                (false, "failed the challenge".to_string())
            }
            FightOutcome::Fled => {
                player.stats.fled += 1;
                (false, "fled the challenge".to_string())
            }
            FightOutcome::TimedOut | FightOutcome::Ongoing => (false, String::new()),
        };

        if !details.is_empty() {
            town.log_attack(AttackLogEntry {
                attacker: player.name().to_string(),
                defender,
                attacker_won: won,
                details,
                time: now_unix(),
            });
        }
        town.clone()
    };
    if let Err(err) = engine.store().save_town(&snapshot) {
        warn!(%err, "failed to save the town after a duel");
    }

    if let Some((phase, opponent)) = next_fight {
        messages.push(GameMessage::combat(format!("{} steps forward!", opponent.name())));
        session.combat = Some(CombatContext::new(opponent, FightVariant::MayorDuel { phase }));
        session.go(UiState::Combat);
    }
}

fn settle_dungeon(session: &mut Session, mut ctx: CombatContext, outcome: FightOutcome, messages: &mut Vec<GameMessage>) {
    let Session { character, rng, .. } = &mut *session;
    let Some(player) = character.as_mut() else {
        session.go(UiState::MainMenu);
        return;
    };

    let next = match outcome {
        FightOutcome::Won => {
            player.stats.monsters_killed += 1;
            let xp = scaled_xp(player.level(), ctx.opponent.level());
            grant_xp(rng, player, xp, messages);
            take_loot(player, ctx.opponent.equipment.take_all(), messages);
            if let Some(dungeon) = player.active_dungeon.as_mut() {
                if let Some(room) = dungeon.current_mut() {
                    room.monster = None;
                }
                dungeon.clear_current();
            }
            dungeon::enter_rooms(rng, player, messages);
            if player.active_dungeon.is_some() {
                UiState::DungeonRoom
            } else {
                UiState::MainMenu
            }
        }
        FightOutcome::Lost => {
            player.active_dungeon = None;
            messages.push(GameMessage::system(
                "You were carried out of the dungeon and resurrected. The dungeon is lost.",
            ));
            UiState::MainMenu
        }
        FightOutcome::Fled => {
            player.stats.fled += 1;
            UiState::DungeonRoom
        }
        FightOutcome::TimedOut | FightOutcome::Ongoing => UiState::DungeonRoom,
    };
    session.go(next);
}
