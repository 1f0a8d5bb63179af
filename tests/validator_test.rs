mod common;

use serde_json::json;
use std::sync::Arc;

use factory_deploy::domain::models::{AccountRole, AgentStatus, Coin, ValidatorConfig};
use factory_deploy::services::{
    sweep_tasks, AgentsClient, DeployedContracts, DeploymentPipeline, LifecycleValidator, NetworkSession,
    RegistryClient, StepOutcome, TasksClient, ValidationReport,
};

use common::{
    address_of, session, setup_test_logging, FakeBuild, FakeChain, DENOM, REWARD_PER_CALL,
};

const DEPLOY_GAS: u64 = 555_000;

fn fast_config() -> ValidatorConfig {
    ValidatorConfig {
        nomination_timeout_ms: 300,
        nomination_initial_backoff_ms: 10,
        nomination_max_backoff_ms: 50,
        ..ValidatorConfig::default()
    }
}

/// Deploy the core contracts and resolve them through the registry
async fn deployed(chain: &Arc<FakeChain>) -> (NetworkSession, DeployedContracts) {
    let session = session(chain);
    let build = FakeBuild::default();
    let report = DeploymentPipeline::new(&build, Vec::new(), DEPLOY_GAS)
        .run(&session)
        .await;
    assert!(report.is_complete(), "deploy failed: {:?}", report.failure);
    let factory = report.factory().expect("factory").address.clone();
    let contracts = DeployedContracts::resolve(&RegistryClient::new(&session, &factory, DEPLOY_GAS))
        .await
        .unwrap();
    (session, contracts)
}

fn outcome<'a>(report: &'a ValidationReport, step: &str) -> &'a StepOutcome {
    &report
        .steps
        .iter()
        .find(|s| s.step == step)
        .unwrap_or_else(|| panic!("step {step} not recorded"))
        .outcome
}

#[tokio::test]
async fn test_full_scenario_passes() {
    setup_test_logging();
    let chain = FakeChain::funded(1_000_000_000);
    let (session, contracts) = deployed(&chain).await;
    let config = fast_config();

    let report = LifecycleValidator::new(&config, DEPLOY_GAS)
        .run(&session, &contracts)
        .await;

    let failures: Vec<_> = report.failures().collect();
    assert!(report.passed(), "failed steps: {failures:?}");
    let steps: Vec<&str> = report.steps.iter().map(|s| s.step.as_str()).collect();
    assert_eq!(
        steps,
        [
            "register_agent1",
            "create_factory_task",
            "create_task_1",
            "register_agent2",
            "create_task_2",
            "create_task_3",
            "await_agent2_nomination",
            "check_in_agent2",
            "proxy_call_agent1",
            "proxy_call_agent2",
            "withdraw_agent1",
            "withdraw_agent2",
            "unregister_agent1",
            "unregister_agent2",
            "assert_no_agents",
            "cleanup_tasks",
        ]
    );
    assert_eq!(outcome(&report, "withdraw_agent1"), &StepOutcome::Passed);
    assert_eq!(
        chain.balance_of(&address_of(AccountRole::Agent(1))),
        REWARD_PER_CALL
    );

    // only the factory-owned task survives the cleanup
    assert_eq!(chain.task_owners(&contracts.tasks), [contracts.factory.clone()]);
}

#[tokio::test]
async fn test_missed_nomination_times_out_without_stopping() {
    setup_test_logging();
    let chain = FakeChain::funded(1_000_000_000);
    let (session, contracts) = deployed(&chain).await;
    // unfunded tasks are rejected, so the task count never exceeds one agent's share
    let config = ValidatorConfig {
        task_funds: vec![100_000, 0, 0],
        ..fast_config()
    };

    let report = LifecycleValidator::new(&config, DEPLOY_GAS)
        .run(&session, &contracts)
        .await;

    assert!(!report.passed());
    assert_eq!(report.steps.len(), 16);
    assert!(outcome(&report, "create_task_2").is_failure());
    match outcome(&report, "await_agent2_nomination") {
        StepOutcome::Failed(reason) => {
            assert!(reason.contains("timed out"), "{reason}");
            assert!(reason.contains("pending"), "{reason}");
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert!(outcome(&report, "check_in_agent2").is_failure());
    assert_eq!(outcome(&report, "proxy_call_agent1"), &StepOutcome::Passed);
    assert_eq!(outcome(&report, "unregister_agent2"), &StepOutcome::Passed);
    assert_eq!(outcome(&report, "assert_no_agents"), &StepOutcome::Passed);
    assert_eq!(outcome(&report, "cleanup_tasks"), &StepOutcome::Passed);
}

#[tokio::test]
async fn test_rejected_unregister_does_not_skip_the_other_agent() {
    setup_test_logging();
    let chain = FakeChain::funded(1_000_000_000);
    let (session, contracts) = deployed(&chain).await;
    let agent1 = address_of(AccountRole::Agent(1));
    let agent2 = address_of(AccountRole::Agent(2));
    chain.reject_execute(&agent1, "unregister_agent", "account sequence mismatch");
    let config = fast_config();

    let report = LifecycleValidator::new(&config, DEPLOY_GAS)
        .run(&session, &contracts)
        .await;

    match outcome(&report, "unregister_agent1") {
        StepOutcome::Failed(reason) => assert!(reason.contains("sequence mismatch"), "{reason}"),
        other => panic!("expected rejection, got {other:?}"),
    }
    assert_eq!(outcome(&report, "unregister_agent2"), &StepOutcome::Passed);
    // agent1 is still listed, so the listing assertion runs and fails
    assert!(outcome(&report, "assert_no_agents").is_failure());
    assert_eq!(outcome(&report, "cleanup_tasks"), &StepOutcome::Passed);

    let agents = AgentsClient::new(&session, &contracts.agents);
    assert_eq!(agents.status(&agent2).await.unwrap(), AgentStatus::Unregistered);
    assert_eq!(agents.status(&agent1).await.unwrap(), AgentStatus::Active);
}

#[tokio::test]
async fn test_withdraw_without_reward_is_skipped() {
    let chain = FakeChain::funded(1_000_000_000);
    let (session, contracts) = deployed(&chain).await;
    // without any task the manager refuses proxy calls, so no reward accrues
    let config = ValidatorConfig {
        factory_task_funds: 0,
        task_funds: vec![0],
        ..fast_config()
    };

    let report = LifecycleValidator::new(&config, DEPLOY_GAS)
        .run(&session, &contracts)
        .await;

    assert!(outcome(&report, "proxy_call_agent1").is_failure());
    assert!(matches!(
        outcome(&report, "withdraw_agent1"),
        StepOutcome::Skipped(reason) if reason == "no reward accrued"
    ));
}

#[tokio::test]
async fn test_sweep_reports_tasks_of_foreign_owners() {
    let chain = FakeChain::funded(1_000_000_000);
    let (session, contracts) = deployed(&chain).await;
    let stranger = "juno1stranger";
    chain.set_balance(stranger, 1_000_000);

    let task = json!({
        "interval": "once",
        "boundary": null,
        "stop_on_fail": false,
        "actions": [],
        "queries": null,
        "transforms": null,
    });
    session
        .signer()
        .execute(
            stranger,
            &contracts.tasks,
            &json!({ "create_task": { "task": task } }),
            &[Coin::new(1_000, DENOM)],
            None,
        )
        .await
        .unwrap();
    let tasks = TasksClient::new(&session, &contracts.tasks);
    let (_, own_hash) = tasks
        .create(
            session.deployer(),
            serde_json::from_value(task.clone()).unwrap(),
            &[Coin::new(1_000, DENOM)],
        )
        .await
        .unwrap();

    let sweep = sweep_tasks(&session, &contracts).await.unwrap();

    assert_eq!(sweep.removed, [own_hash.expect("task hash emitted")]);
    assert!(sweep.kept.is_empty());
    assert_eq!(sweep.failed.len(), 1);
    assert!(sweep.failed[0].1.contains(stranger));
    assert_eq!(chain.task_owners(&contracts.tasks), [stranger]);
}
