mod common;

use approx::assert_relative_eq;

use common::{set_member, ScriptedEmulator, MAP_BANK, PARTY_COUNT};
use goldrl_env::{CategoryLedger, CategoryWeights, RewardComposer, SkillAssignment};
use goldrl_state::{GameSnapshot, MemoryImage, StateExtractor};

fn snapshot(ram: &MemoryImage) -> GameSnapshot {
    StateExtractor::default().get_state_dict(ram)
}

fn party_of(hp: [u16; 2]) -> GameSnapshot {
    let mut ram = ScriptedEmulator::new_bark().ram;
    ram.write_byte(PARTY_COUNT, 2);
    set_member(&mut ram, 0, 155, 8, hp[0], 25);
    set_member(&mut ram, 1, 16, 4, hp[1], 15);
    snapshot(&ram)
}

#[test]
fn test_party_wipe_is_penalised_once() {
    let healthy = party_of([25, 15]);
    let wiped = party_of([0, 0]);
    assert_eq!(healthy.party_info.party_hp_sum, 40);

    let mut composer = RewardComposer::default();
    let mut skill = SkillAssignment::default();
    composer.compose(&healthy, &healthy, &mut skill);

    let fall = composer.compose(&healthy, &wiped, &mut skill);
    assert_relative_eq!(fall.faint, -50.0, epsilon = 1e-9);
    assert_relative_eq!(fall.hp_loss, -0.4, epsilon = 1e-9);

    let still_down = composer.compose(&wiped, &wiped, &mut skill);
    assert_relative_eq!(still_down.faint, 0.0, epsilon = 1e-9);
    assert_relative_eq!(still_down.total, 0.0, epsilon = 1e-9);
}

#[test]
fn test_each_tile_pays_once_per_episode() {
    let mut ram = ScriptedEmulator::new_bark().ram;
    let start = snapshot(&ram);
    ram.write_bytes(MAP_BANK, &[26, 3, 10, 10]);
    let route = snapshot(&ram);

    let mut composer = RewardComposer::default();
    let mut skill = SkillAssignment::default();

    let arrive = composer.compose(&start, &route, &mut skill);
    assert_relative_eq!(arrive.exploration, 5.1, epsilon = 1e-9);
    let again = composer.compose(&route, &route, &mut skill);
    assert_relative_eq!(again.exploration, 0.0, epsilon = 1e-9);
    assert_eq!(composer.maps_seen(), 1);

    composer.reset();
    let fresh = composer.compose(&start, &route, &mut skill);
    assert_relative_eq!(fresh.exploration, 5.1, epsilon = 1e-9);
}

#[test]
fn test_ledger_seeded_from_reset_snapshot() {
    let start = party_of([25, 15]);
    let mut stronger = start.clone();
    stronger.party_info.party_level_sum += 3;
    stronger.player_info.johto_badges_count = 1;

    let mut ledger = CategoryLedger::seeded(CategoryWeights::default(), &start);
    let gained = ledger.record(&start, &stronger);
    assert_relative_eq!(gained.level_up, 6.0, epsilon = 1e-9);
    assert_relative_eq!(gained.badge, 50.0, epsilon = 1e-9);

    let repeat = ledger.record(&start, &stronger);
    assert_relative_eq!(repeat.level_up, 0.0, epsilon = 1e-9);
    assert_relative_eq!(repeat.badge, 0.0, epsilon = 1e-9);
}
