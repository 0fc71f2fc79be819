use goldrl_core::MemorySource;
use goldrl_env::tasks::ALL_GOALS_SATISFIED;
use goldrl_env::{PlanError, TaskProgression};
use goldrl_state::{flags, FlagCodec, MemoryImage, StateExtractor};

const PLAN: &str = r#"{
  "goal": "Become the Johto Champion",
  "tasks": [
    "receive Mystery Egg and Pokédex",
    "defeat Falkner, receive Zephyr Badge",
    "defeat Bugsy, receive Hive Badge"
  ]
}"#;

fn write_plan(dir: &tempfile::TempDir, json: &str) -> std::path::PathBuf {
    let path = dir.path().join("plan.json");
    std::fs::write(&path, json).unwrap();
    path
}

fn set_flag(ram: &mut MemoryImage, name: &str) {
    let id = flags::flag_id(name).unwrap();
    let loc = FlagCodec::default().locate(id);
    let address = u16::try_from(loc.address).unwrap();
    let byte = ram.read_byte(address);
    ram.write_byte(address, byte | loc.bit_mask());
}

#[test]
fn test_resume_skips_tasks_already_done_in_ram() {
    let dir = tempfile::tempdir().unwrap();
    let mut progression = TaskProgression::load(write_plan(&dir, PLAN)).unwrap();

    let mut ram = MemoryImage::zeroed();
    set_flag(&mut ram, "got_pokedex");
    ram.write_byte(0xD57C, 0b0000_0001);
    let snapshot = StateExtractor::default().get_state_dict(&ram);
    assert!(snapshot.event_statuses.is_set("got_pokedex"));

    assert_eq!(progression.sync_with_initial_state(&snapshot), 2);
    assert_eq!(progression.current_index(), 2);
    assert_eq!(progression.current_task_description(), "defeat Bugsy, receive Hive Badge");

    ram.write_byte(0xD57C, 0b0000_0011);
    let later = StateExtractor::default().get_state_dict(&ram);
    assert_eq!(progression.advance_while_completed(&later), 1);
    assert!(progression.is_finished());
    assert_eq!(progression.current_task_description(), ALL_GOALS_SATISFIED);
}

#[test]
fn test_structured_plan_with_unknown_flag_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_plan(
        &dir,
        r#"{"goal": "g", "tasks": [
            {"description": "find the lost key", "condition": {"type": "flag", "name": "no_such_flag"}}
        ]}"#,
    );
    let err = TaskProgression::load(path).unwrap_err();
    assert!(matches!(err, PlanError::UnknownFlag { ref flag, .. } if flag == "no_such_flag"));
}

#[test]
fn test_missing_plan_file_reports_io_error() {
    let err = TaskProgression::load("/nonexistent/plan.json").unwrap_err();
    assert!(matches!(err, PlanError::Io { .. }));
}
