//! Long-run properties of the win/loss engine through the public API

use std::io::Write;
use wager_engine::{
    config::EngineConfig, ConfigLoader, GameOutcome, PlayMetrics, PlayRejection, PlayRequest,
    SessionEngines, SharedEngine, WinLossEngine,
};

#[test]
fn test_ratio_converges_over_many_draws() {
    for seed in [1u64, 17, 4242] {
        let mut engine = WinLossEngine::seeded(&EngineConfig::default(), seed).unwrap();
        let draws = 10_000;
        let wins = (0..draws).filter(|_| engine.decide_outcome()).count();
        let ratio = wins as f64 / draws as f64;
        assert!((ratio - 0.20).abs() <= 0.03, "seed {} ratio {}", seed, ratio);
    }
}

#[test]
fn test_queue_counts_never_exceed_generation() {
    let mut engine = WinLossEngine::seeded(&EngineConfig::default(), 5).unwrap();
    for _ in 0..5_000 {
        engine.decide_outcome();
        let stats = engine.get_win_loss_stats();
        assert!(stats.wins_remaining <= 2);
        assert!(stats.losses_remaining <= 8);
        assert!(stats.total_in_queue <= 10);
    }
}

#[test]
fn test_player_session_until_broke() {
    let metrics = PlayMetrics::new().unwrap();
    let mut engine = WinLossEngine::seeded(&EngineConfig::default(), 99)
        .unwrap()
        .with_metrics(metrics.clone());

    let mut balance = 200.0;
    let mut settled = 0;
    loop {
        let result = engine.play(&PlayRequest::new(10.0, balance, "dice"));
        match result.outcome() {
            GameOutcome::Rejected => {
                assert!(matches!(
                    result.rejection,
                    Some(PlayRejection::InsufficientBalance { .. })
                ));
                assert_eq!(result.resulting_balance, balance);
                break;
            }
            GameOutcome::Win => assert_eq!(result.resulting_balance, balance - 10.0 + result.payout as f64),
            GameOutcome::Loss => assert_eq!(result.resulting_balance, balance - 10.0),
        }
        balance = result.resulting_balance;
        settled += 1;
        assert!(settled < 100_000, "session never ended");
    }

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.wins + snapshot.losses, settled);
    assert_eq!(snapshot.rejections, 1);
    assert!(balance < 10.0);
}

#[test]
fn test_shared_and_session_engines_agree_on_rules() {
    let shared = SharedEngine::new(WinLossEngine::seeded(&EngineConfig::default(), 3).unwrap());
    let sessions = SessionEngines::new(EngineConfig::default()).unwrap();

    assert!(!shared.can_play(0.0, 100.0));
    assert!(shared.validate_stake_bounds(4.0, "slots").is_err());

    let from_shared = shared.play(&PlayRequest::new(4.0, 100.0, "slots"));
    let from_session = sessions.play("s1", &PlayRequest::new(4.0, 100.0, "slots")).unwrap();
    assert_eq!(from_shared.rejection, from_session.rejection);
    assert!(matches!(from_shared.rejection, Some(PlayRejection::BelowMinimumBet { .. })));
}

#[test]
fn test_loaded_config_drives_engine() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[pattern]
cycle_length = 4
wins_per_cycle = 4
pattern_follow_probability = 1.0

[tables.multipliers]
dice = [3.0]
"#
    )
    .unwrap();

    // Resolve overrides from an empty environment so stray WAGER_* vars don't leak in
    let config = ConfigLoader::new()
        .with_path(file.path())
        .load_with(|_| None)
        .unwrap();
    let mut engine = WinLossEngine::seeded(&config, 1).unwrap();
    let result = engine.compute_result(10.0, 100.0, "dice", Some(1.0));
    assert!(result.won);
    assert_eq!(result.payout, 30);
    assert_eq!(result.resulting_balance, 120.0);
}

#[test]
fn test_injected_overrides_apply_over_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[payout]\nweight_decay = 0.5").unwrap();

    let config = ConfigLoader::new()
        .with_path(file.path())
        .load_with(|key| (key == "WAGER_WEIGHT_DECAY").then(|| "0.8".to_string()))
        .unwrap();
    assert_eq!(config.payout.weight_decay, 0.8);
    assert_eq!(config.pattern.cycle_length, 10);
}
