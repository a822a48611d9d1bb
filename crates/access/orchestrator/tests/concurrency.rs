//! Concurrent attempts against a shared orchestrator.

use access_catalog::MissionCatalog;
use access_ledger::AccessLedger;
use access_orchestrator::UnlockOrchestrator;
use access_types::{AccessStatus, MissionId, Tier, UserContext};
use std::sync::Arc;

fn shared() -> Arc<UnlockOrchestrator> {
    Arc::new(UnlockOrchestrator::new(
        Arc::new(MissionCatalog::with_defaults()),
        Arc::new(AccessLedger::new()),
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn same_pair_attempts_are_serialized() {
    let orchestrator = shared();
    let mission = MissionId::new("verifier-onboarding");
    let user = UserContext::new("citizen", Tier::Citizen, 70);

    let mut handles = Vec::new();
    for _ in 0..32 {
        let orchestrator = orchestrator.clone();
        let mission = mission.clone();
        let user = user.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            orchestrator.attempt_unlock(&mission, &user)
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let history = orchestrator
        .ledger()
        .history(&mission, &user.user_id)
        .unwrap();
    assert_eq!(history.len(), 32);

    // Counters are gap-free and ordered like the ledger.
    let counters: Vec<u32> = history
        .iter()
        .map(|entry| entry.metadata.unlock_attempts)
        .collect();
    assert_eq!(counters, (1..=32).collect::<Vec<_>>());

    let current = orchestrator
        .ledger()
        .current(&mission, &user.user_id)
        .unwrap()
        .unwrap();
    assert_eq!(current.metadata.unlock_attempts, 32);
    assert_eq!(current.status, AccessStatus::TierInsufficient);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn distinct_pairs_proceed_independently() {
    let orchestrator = shared();
    let mission = MissionId::new("orientation");

    let mut handles = Vec::new();
    for n in 0..16 {
        let orchestrator = orchestrator.clone();
        let mission = mission.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let user = UserContext::new(format!("user-{n}"), Tier::Citizen, 10);
            for _ in 0..4 {
                orchestrator.attempt_unlock(&mission, &user)?;
            }
            Ok::<_, access_orchestrator::AccessError>(user.user_id)
        }));
    }

    for handle in handles {
        let user_id = handle.await.unwrap().unwrap();
        assert_eq!(
            orchestrator.ledger().attempt_count(&mission, &user_id).unwrap(),
            4
        );
        assert_eq!(orchestrator.attempt_history(&user_id).len(), 4);
    }

    assert_eq!(orchestrator.ledger().len(), 64);
    let stats = orchestrator.get_mission_access_statistics().unwrap();
    assert_eq!(stats.total_attempts, 64);
    assert_eq!(stats.ledger.by_status.get(&AccessStatus::Unlocked), Some(&64));
}
