use std::time::Duration;

use anyhow::Result;
use brew_core::config::HintConfig;
use brew_core::host::{Anchor, RepresentationKind};
use brew_core::{
    simulated_session, InteractionError, NpcPhase, ObjectKind, OrderState, Session,
    SessionConfig, SimulatedHost,
};
use glam::Vec3;

/// 1/64 s, exact in binary so timer deadlines land on tick boundaries.
const TICK: Duration = Duration::from_micros(15_625);

fn quick_config() -> SessionConfig {
    let mut config = SessionConfig::default();
    config.order.brew_time_secs = 0.5;
    config.dialogue.lines = vec!["Hi".to_string()];
    config.dialogue.char_delay_secs = 0.125;
    config.dialogue.line_pause_secs = 0.25;
    config.dialogue.end_delay_secs = 0.25;
    config.npc.reaction_secs = 0.5;
    config.npc.reset_delay_secs = 1.0;
    config
}

fn started(config: SessionConfig) -> Result<(Session, SimulatedHost)> {
    let (mut session, host) = simulated_session(config)?;
    session.on_session_start();
    Ok((session, host))
}

fn run(session: &mut Session, host: &SimulatedHost, seconds: f32) {
    let ticks = (seconds / TICK.as_secs_f32()).round() as u32;
    for _ in 0..ticks {
        host.step(TICK);
        session.tick(TICK);
    }
}

fn brew_sealed_coffee(session: &mut Session, host: &SimulatedHost) -> Result<()> {
    session.interact(ObjectKind::CupStack)?;
    session.interact(ObjectKind::CoffeeMachine)?;
    run(session, host, 0.75);
    session.interact(ObjectKind::LidStack)?;
    session.interact(ObjectKind::CoffeeMachine)?;
    session.interact(ObjectKind::CoffeeMachine)?;
    assert_eq!(session.order().state(), OrderState::CoffeeReady);
    Ok(())
}

fn held_cup_id(session: &Session) -> Option<String> {
    session.order().held().cup().map(|cup| cup.id().to_string())
}

fn count_events(session: &Session, prefix: &str) -> usize {
    session
        .events()
        .iter()
        .filter(|event| event.starts_with(prefix))
        .count()
}

#[test]
fn unsealed_order_cannot_be_thrown() -> Result<()> {
    let (mut session, host) = started(quick_config())?;
    assert_eq!(session.order().state(), OrderState::CanTakeCup);

    session.interact(ObjectKind::CupStack)?;
    assert_eq!(session.order().state(), OrderState::HasEmptyCup);
    assert_eq!(
        host.state().attached_at(Anchor::Hand),
        vec![RepresentationKind::EmptyCup]
    );

    let first = held_cup_id(&session);
    let err = session.interact(ObjectKind::CupStack).unwrap_err();
    assert_eq!(err, InteractionError::invalid("take_cup", "has_empty_cup"));
    assert_eq!(session.order().state(), OrderState::HasEmptyCup);
    assert_eq!(held_cup_id(&session), first);
    assert_eq!(host.state().attached_at(Anchor::Hand).len(), 1);

    session.interact(ObjectKind::CoffeeMachine)?;
    assert_eq!(session.order().state(), OrderState::CupInMachine);
    assert!(session.order().appliance().is_brewing());
    assert!(session.order().held().is_empty());
    assert!(session.order().hand_matches_state());
    assert!(session.interact(ObjectKind::CoffeeMachine).is_err());

    run(&mut session, &host, 0.25);
    assert!(session.order().appliance().is_brewing());
    run(&mut session, &host, 0.5);
    assert!(!session.order().appliance().is_brewing());
    assert_eq!(
        host.state().attached_at(Anchor::Appliance),
        vec![RepresentationKind::FilledCup]
    );

    session.interact(ObjectKind::CoffeeMachine)?;
    assert_eq!(session.order().state(), OrderState::HasFilledCup);
    assert!(session.order().appliance().cup().is_none());
    assert!(session.order().hand_matches_state());

    session.interact(ObjectKind::LidStack)?;
    assert_eq!(session.order().state(), OrderState::HasLid);
    assert_eq!(
        host.state().attached_at(Anchor::Hand),
        vec![RepresentationKind::Lid]
    );

    let err = session.throw_pressed().unwrap_err();
    assert_eq!(err, InteractionError::invalid("throw", "has_lid"));
    assert_eq!(session.order().state(), OrderState::HasLid);
    assert!(host.state().launches.is_empty());
    assert!(!session.npc().phase().is_pursuing());
    assert!(host.state().audio.cues.contains(&"coffee_brew".to_string()));
    Ok(())
}

#[test]
fn clearing_the_appliance_suppresses_the_brew_swap() -> Result<()> {
    let (mut session, host) = started(quick_config())?;
    session.interact(ObjectKind::CupStack)?;
    session.interact(ObjectKind::CoffeeMachine)?;
    let cup = session
        .order()
        .appliance()
        .cup()
        .map(|cup| cup.id())
        .expect("cup placed in appliance");

    assert!(session.drive_order(|order, rt| order.clear_appliance(rt)));
    run(&mut session, &host, 1.0);
    assert!(host.state().attached_at(Anchor::Appliance).is_empty());
    assert!(!session.events().iter().any(|e| e.contains("brewed")));

    let stale = session.drive_order(|order, rt| order.on_brew_complete(cup, rt));
    assert_eq!(stale, Err(InteractionError::StaleCallback("brew_complete")));
    Ok(())
}

#[test]
fn lid_taken_while_brewing_seals_after_the_brew() -> Result<()> {
    let (mut session, host) = started(quick_config())?;
    session.interact(ObjectKind::CupStack)?;
    session.interact(ObjectKind::CoffeeMachine)?;
    assert!(session.order().appliance().is_brewing());

    session.interact(ObjectKind::LidStack)?;
    assert_eq!(session.order().state(), OrderState::HasLid);
    assert_eq!(
        host.state().attached_at(Anchor::Hand),
        vec![RepresentationKind::Lid]
    );

    let err = session.interact(ObjectKind::CoffeeMachine).unwrap_err();
    assert_eq!(err, InteractionError::invalid("use_appliance", "brewing"));
    assert_eq!(session.order().state(), OrderState::HasLid);
    assert!(!session.order().appliance().is_sealed());

    run(&mut session, &host, 0.75);
    assert!(!session.order().appliance().is_brewing());
    assert_eq!(
        host.state().attached_at(Anchor::Appliance),
        vec![RepresentationKind::FilledCup]
    );

    session.interact(ObjectKind::CoffeeMachine)?;
    assert_eq!(session.order().state(), OrderState::CupInMachine);
    assert!(session.order().appliance().is_sealed());
    assert!(host.state().attached_at(Anchor::Hand).is_empty());
    assert_eq!(
        host.state().attached_at(Anchor::Appliance),
        vec![RepresentationKind::SealedCup]
    );

    session.interact(ObjectKind::CoffeeMachine)?;
    assert_eq!(session.order().state(), OrderState::CoffeeReady);
    assert_eq!(
        host.state().attached_at(Anchor::Hand),
        vec![RepresentationKind::SealedCup]
    );
    assert!(session.order().hand_matches_state());

    session.throw_pressed()?;
    assert_eq!(host.state().launches.len(), 1);
    assert_eq!(session.order().state(), OrderState::CanTakeCup);
    Ok(())
}

#[test]
fn second_hint_gets_its_full_duration() -> Result<()> {
    let (mut session, host) = started(quick_config())?;
    let hint = |message: &str| HintConfig {
        message: message.to_string(),
        duration_secs: 1.0,
    };

    session.drive_order(|_, rt| rt.show_hint(&hint("first")));
    run(&mut session, &host, 0.5);
    session.drive_order(|_, rt| rt.show_hint(&hint("second")));
    run(&mut session, &host, 0.75);
    assert!(host.state().panel_visible("hint"));
    assert_eq!(session.hints().active_message(), Some("second"));
    assert_eq!(host.state().texts.get("hint").map(String::as_str), Some("second"));

    run(&mut session, &host, 0.5);
    assert!(!host.state().panel_visible("hint"));
    assert_eq!(count_events(&session, "timer.stale hint_expired"), 0);
    Ok(())
}

#[test]
fn npc_walks_in_talks_and_waits() -> Result<()> {
    let (mut session, host) = started(quick_config())?;
    assert_eq!(session.npc().phase(), NpcPhase::Approaching);
    assert!(host.state().flag("isWalking"));

    run(&mut session, &host, 4.75);
    assert_eq!(session.npc().phase(), NpcPhase::InDialogue);
    assert!(!host.state().flag("isWalking"));
    assert!(host.state().panel_visible("dialogue"));
    assert_eq!(host.state().texts.get("dialogue").map(String::as_str), Some("Hi"));
    assert_eq!(host.state().one_shots, vec!["dialogue".to_string()]);
    assert!(!host.state().audio.cues.contains(&"dialogue".to_string()));

    run(&mut session, &host, 0.5);
    assert_eq!(session.npc().phase(), NpcPhase::Idle);
    assert!(!host.state().panel_visible("dialogue"));
    assert_eq!(
        session.hints().active_message(),
        Some(session.config().npc.idle_hint.message.as_str())
    );
    Ok(())
}

#[test]
fn threat_starts_chase_and_catch_disables_player_once() -> Result<()> {
    let (mut session, host) = started(quick_config())?;
    run(&mut session, &host, 6.0);
    assert_eq!(session.npc().phase(), NpcPhase::Idle);

    brew_sealed_coffee(&mut session, &host)?;
    session.throw_pressed()?;
    assert_eq!(session.order().state(), OrderState::CanTakeCup);
    assert_eq!(session.npc().phase(), NpcPhase::ReactionPending);
    assert!(session.effects().is_active());
    assert!(session.audio().is_chasing());
    {
        let state = host.state();
        assert_eq!(state.launches.len(), 1);
        assert_eq!(state.launches[0].kind, RepresentationKind::SealedCup);
        assert_eq!(state.launches[0].direction, [0.0, 0.2, -1.0]);
        assert_eq!(state.launches[0].impulse, 10.0);
        assert!(state.attached_at(Anchor::Hand).is_empty());
    }

    run(&mut session, &host, 0.25);
    assert_eq!(session.npc().phase(), NpcPhase::ReactionPending);
    run(&mut session, &host, 0.5);
    assert_eq!(session.npc().phase(), NpcPhase::Chasing);
    assert_eq!(host.state().npc_speed, 6.0);
    assert!(host.state().flag("isRunning"));

    run(&mut session, &host, 1.0);
    assert_eq!(session.npc().phase(), NpcPhase::Caught);
    let caught_at = session.npc().last_distance().expect("distance sampled");
    assert!(caught_at <= session.config().npc.catch_distance);
    {
        let state = host.state();
        assert_eq!(state.disable_calls, 1);
        assert_eq!(state.triggers, vec!["catch".to_string()]);
        assert!(state.panel_visible("caught"));
        assert!(state.audio.stops >= 1);
        assert_eq!(state.reload_requests, 0);
    }
    assert!(!session.effects().is_active());
    assert!(!session.audio().is_running());

    assert!(session.throw_pressed().is_err());
    assert!(session.interact(ObjectKind::CupStack).is_err());
    run(&mut session, &host, 1.0);
    assert_eq!(host.state().reload_requests, 1);
    assert_eq!(host.state().disable_calls, 1);
    Ok(())
}

#[test]
fn catch_distance_is_inclusive() -> Result<()> {
    let mut config = quick_config();
    config.npc.goal = None;
    config.npc.spawn = [0.0, 0.0, -2.0];
    config.npc.catch_distance = 2.0;
    config.npc.chase_speed = 0.0;
    config.dialogue.lines.clear();
    let (mut session, host) = started(config)?;
    run(&mut session, &host, 0.5);
    assert_eq!(session.npc().phase(), NpcPhase::Idle);

    brew_sealed_coffee(&mut session, &host)?;
    session.throw_pressed()?;
    run(&mut session, &host, 0.5);
    assert_eq!(session.npc().phase(), NpcPhase::Caught);
    assert_eq!(session.npc().last_distance(), Some(2.0));
    Ok(())
}

#[test]
fn chase_holds_just_outside_catch_distance() -> Result<()> {
    let mut config = quick_config();
    config.npc.goal = None;
    config.npc.spawn = [0.0, 0.0, -2.5];
    config.npc.catch_distance = 2.0;
    config.npc.chase_speed = 0.0;
    config.dialogue.lines.clear();
    let (mut session, host) = started(config)?;
    run(&mut session, &host, 0.5);

    brew_sealed_coffee(&mut session, &host)?;
    session.throw_pressed()?;
    run(&mut session, &host, 2.0);
    assert_eq!(session.npc().phase(), NpcPhase::Chasing);
    assert_eq!(session.npc().last_distance(), Some(2.5));
    assert_eq!(host.state().disable_calls, 0);
    Ok(())
}

#[test]
fn second_throw_mid_chase_is_ignored() -> Result<()> {
    let mut config = quick_config();
    config.npc.goal = None;
    config.npc.spawn = [0.0, 0.0, -10.0];
    config.npc.chase_speed = 0.0;
    let (mut session, host) = started(config)?;
    run(&mut session, &host, 1.0);
    assert_eq!(session.npc().phase(), NpcPhase::Idle);

    brew_sealed_coffee(&mut session, &host)?;
    session.throw_pressed()?;
    run(&mut session, &host, 0.75);
    assert_eq!(session.npc().phase(), NpcPhase::Chasing);

    brew_sealed_coffee(&mut session, &host)?;
    session.throw_pressed()?;
    assert_eq!(session.npc().phase(), NpcPhase::Chasing);
    assert_eq!(host.state().launches.len(), 2);
    assert_eq!(count_events(&session, "npc.threat ignored chasing"), 1);
    Ok(())
}

#[test]
fn threat_interrupts_dialogue() -> Result<()> {
    let mut config = quick_config();
    config.npc.goal = None;
    config.dialogue = Default::default();
    let (mut session, host) = started(config)?;
    assert_eq!(session.npc().phase(), NpcPhase::InDialogue);
    assert_eq!(count_events(&session, "npc.missing npc goal"), 1);

    brew_sealed_coffee(&mut session, &host)?;
    assert_eq!(session.npc().phase(), NpcPhase::InDialogue);
    session.throw_pressed()?;
    assert_eq!(session.npc().phase(), NpcPhase::ReactionPending);
    assert!(!host.state().panel_visible("dialogue"));
    assert!(session.npc().cursor().is_none());

    run(&mut session, &host, 3.0);
    assert_eq!(count_events(&session, "timer.stale dialogue"), 0);
    Ok(())
}

#[test]
fn missing_target_is_reported_once_and_chase_waits() -> Result<()> {
    let mut config = quick_config();
    config.npc.goal = None;
    config.dialogue.lines.clear();
    let (mut session, host) = simulated_session(config)?;
    host.remove_player();
    session.on_session_start();
    run(&mut session, &host, 0.5);

    brew_sealed_coffee(&mut session, &host)?;
    session.throw_pressed()?;
    run(&mut session, &host, 2.0);
    assert_eq!(session.npc().phase(), NpcPhase::Chasing);
    assert_eq!(session.npc().last_distance(), None);
    assert_eq!(count_events(&session, "npc.missing pursuit target"), 1);

    host.set_player_position(Vec3::new(0.0, 0.0, -12.5));
    run(&mut session, &host, 0.25);
    assert_eq!(session.npc().phase(), NpcPhase::Caught);
    Ok(())
}

#[test]
fn reload_starts_a_fresh_session() -> Result<()> {
    let (mut session, host) = started(quick_config())?;
    run(&mut session, &host, 6.0);
    brew_sealed_coffee(&mut session, &host)?;
    session.throw_pressed()?;
    run(&mut session, &host, 4.0);
    assert_eq!(host.state().reload_requests, 1);

    session.on_session_end();
    assert!(session.timers().is_empty());
    host.reload();
    session.on_session_start();

    assert_eq!(session.sessions_started(), 2);
    assert_eq!(session.order().state(), OrderState::CanTakeCup);
    assert_eq!(session.npc().phase(), NpcPhase::Approaching);
    assert!(session.audio().is_running());
    assert!(!session.effects().is_active());
    assert!(session.hints().active_message().is_none());

    session.interact(ObjectKind::CupStack)?;
    assert_eq!(session.order().state(), OrderState::HasEmptyCup);
    assert_eq!(count_events(&session, "session.start"), 2);
    Ok(())
}

#[test]
fn unused_representations_degrade_to_nothing_attached() -> Result<()> {
    let mut config = quick_config();
    config.order.representations.empty_cup = None;
    let (mut session, host) = started(config)?;
    assert_eq!(
        count_events(&session, "session.missing no representation configured for empty_cup"),
        1
    );

    session.interact(ObjectKind::CupStack)?;
    assert_eq!(session.order().state(), OrderState::HasEmptyCup);
    assert!(host.state().attached_at(Anchor::Hand).is_empty());
    assert!(session.order().held().cup().is_some());
    Ok(())
}
